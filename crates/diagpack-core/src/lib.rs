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

//! Domain model and collaborator interfaces for diagnostic bundle generation.
//!
//! Layout:
//! - `model.rs`: operation identifiers, command reports, backup/restore metadata
//! - `log.rs`: structured log records and their line rendering
//! - `service.rs`: the backing-service trait and log cursor abstraction
//! - `error.rs`: backend error taxonomy

pub mod error;
pub mod log;
pub mod model;
pub mod service;

pub use error::{BackendError, BackendResult};
pub use log::{LogRecord, RenderOptions, Severity, TimestampZone};
pub use model::{
    BackupFetchOptions, BackupKind, BackupRecord, CommandKind, CommandRef, OperationId, Report,
    RestoreRecord, StorageSpec,
};
pub use service::{DiagnosticSource, LogCursor};
