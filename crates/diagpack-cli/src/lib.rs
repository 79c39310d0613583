#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::redundant_pub_crate)]

//! Command-line client producing diagnostic bundles for backup-system commands.
//!
//! Layout:
//! - `cli.rs`: argument parsing, logging setup, dispatch, and interrupt handling
//! - `commands/`: command handlers
//! - `client.rs`: HTTP client construction, credentials, and CLI errors
//! - `backend.rs`: HTTP implementation of the diagnostic source and log cursor
//! - `output.rs`: confirmation rendering
//! - `main.rs`: thin entrypoint delegating to `run()`

pub(crate) mod backend;
pub(crate) mod cli;
pub(crate) mod client;
pub(crate) mod commands;
pub(crate) mod output;

pub use cli::run;
