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
#![allow(clippy::module_name_repetitions)]

//! Diagnostic bundle generation for previously issued backup-system commands.
//!
//! Layout:
//! - `service.rs`: the `DiagnosticBundler` orchestrator and its step sequencing
//! - `resolve.rs`: identifier resolution (operation id or human-readable name)
//! - `artifact.rs`: pretty-printed JSON artifact writer
//! - `log_export.rs`: streaming log exporter with remove-on-failure cleanup
//! - `archive.rs`: zip archiver staging through a temp file and atomic rename
//! - `model.rs`: request, resolved context, bundle file naming, summary
//! - `config.rs`: bundler configuration
//! - `error.rs`: error taxonomy and classification

pub mod archive;
pub mod artifact;
pub mod config;
pub mod error;
pub mod log_export;
pub mod model;
pub mod resolve;
pub mod service;

pub use archive::Archiver;
pub use artifact::write_artifact;
pub use config::BundlerConfig;
pub use error::{BundleError, BundleResult, ErrorKind};
pub use log_export::{LogExport, LogExporter};
pub use model::{BundleFile, BundleRequest, BundleSummary, ResolvedContext};
pub use resolve::resolve_context;
pub use service::DiagnosticBundler;
