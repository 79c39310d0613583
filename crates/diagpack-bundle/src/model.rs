//! # Design
//!
//! - Requests carry optional identifiers exactly as the caller supplied them.
//! - Bundle file names are derived from one prefix so every artifact of a run shares it.
//! - The summary lists files in write order for logging and assertions.

use std::path::{Path, PathBuf};

use diagpack_core::OperationId;

/// Input for one bundle generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleRequest {
    /// Operation identifier; wins over `operation_name` when both are set.
    pub operation_id: Option<String>,
    /// Human-readable command name, resolved through the backend.
    pub operation_name: Option<String>,
    /// Directory receiving the bundle files.
    pub output_path: PathBuf,
    /// Whether to pack the directory into `{prefix}.zip`.
    pub produce_archive: bool,
}

impl BundleRequest {
    /// Request keyed by operation identifier.
    pub fn by_id(operation_id: impl Into<String>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            operation_id: Some(operation_id.into()),
            output_path: output_path.into(),
            ..Self::default()
        }
    }

    /// Request keyed by command name.
    pub fn by_name(operation_name: impl Into<String>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            operation_name: Some(operation_name.into()),
            output_path: output_path.into(),
            ..Self::default()
        }
    }

    /// Toggle archive production.
    #[must_use]
    pub const fn with_archive(mut self, produce_archive: bool) -> Self {
        self.produce_archive = produce_archive;
        self
    }
}

/// Identifier and file prefix used by every later stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedContext {
    operation_id: OperationId,
    prefix: String,
}

impl ResolvedContext {
    pub(crate) fn new(operation_id: OperationId, prefix: impl Into<String>) -> Self {
        Self {
            operation_id,
            prefix: prefix.into(),
        }
    }

    /// Resolved operation identifier.
    #[must_use]
    pub const fn operation_id(&self) -> &OperationId {
        &self.operation_id
    }

    /// Prefix shared by all bundle file names.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

/// Files a bundle may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BundleFile {
    /// Command execution report.
    Report,
    /// Backup metadata.
    Backup,
    /// Restore metadata.
    Restore,
    /// Rendered operation log.
    Log,
    /// Archive of the directory.
    Archive,
}

impl BundleFile {
    /// File name suffix, including the leading dot.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Report => ".report.json",
            Self::Backup => ".backup.json",
            Self::Restore => ".restore.json",
            Self::Log => ".log",
            Self::Archive => ".zip",
        }
    }

    /// File name for the given prefix.
    #[must_use]
    pub fn file_name(self, prefix: &str) -> String {
        format!("{prefix}{}", self.suffix())
    }

    /// Full path for the given directory and prefix.
    #[must_use]
    pub fn path_in(self, directory: &Path, prefix: &str) -> PathBuf {
        directory.join(self.file_name(prefix))
    }
}

/// Outcome of a successful bundle generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleSummary {
    /// Operation the bundle describes.
    pub operation_id: OperationId,
    /// Prefix used for file names.
    pub prefix: String,
    /// Directory holding the bundle.
    pub directory: PathBuf,
    /// Files written, in write order.
    pub files: Vec<PathBuf>,
    /// Archive path when one was produced.
    pub archive: Option<PathBuf>,
}
