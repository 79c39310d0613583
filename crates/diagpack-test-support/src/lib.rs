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

//! Shared test helpers used across crate test suites.
//! Layout: fixtures.rs (sample documents, temp dirs), source.rs (in-memory backend and cursor).

pub mod fixtures;
pub mod source;

pub use source::{CursorScript, Fault, InMemorySource, ScriptedCursor, ScriptedEntry, SourceCall};
