//! # Design
//!
//! - Provide structured errors for the bundle pipeline with operation context in fields.
//! - Wrapped messages name the failing operation so the rendered chain reads like a trace.
//! - Classification walks the wrapping chain, so callers can test for "not found" at any depth.

use std::io;
use std::path::{Path, PathBuf};

use diagpack_core::BackendError;
use thiserror::Error;

/// Result type for bundle operations.
pub type BundleResult<T> = Result<T, BundleError>;

/// Coarse classification of a [`BundleError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request itself is unusable.
    Validation,
    /// The command, backup, or restore does not exist.
    NotFound,
    /// The request targets something the bundler cannot diagnose.
    Unsupported,
    /// Local filesystem, serialization, or archive failure.
    Io,
    /// The backing service failed for a reason other than absence.
    Backend,
}

/// Errors produced while generating a diagnostic bundle.
#[derive(Debug, Error)]
pub enum BundleError {
    /// Request validation failures.
    #[error("{reason}")]
    InvalidInput {
        /// Field that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
    /// The output path exists but is not a directory.
    #[error("{} is not a directory", path.display())]
    NotADirectory {
        /// Offending path.
        path: PathBuf,
    },
    /// The requested entity does not exist.
    #[error("{what} not found")]
    NotFound {
        /// Kind of the missing entity.
        what: &'static str,
        /// Identifier or name used for the lookup.
        value: Option<String>,
    },
    /// The request targets a capability the bundler does not provide.
    #[error("{operation} are unsupported")]
    Unsupported {
        /// Unsupported capability, as a plural noun phrase.
        operation: &'static str,
        /// Optional value that triggered the unsupported error.
        value: Option<String>,
    },
    /// IO failures while interacting with the filesystem.
    #[error("{operation}")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// A write accepted fewer bytes than requested.
    #[error("{operation}: short write")]
    ShortWrite {
        /// Operation that triggered the short write.
        operation: &'static str,
        /// Path being written.
        path: PathBuf,
        /// Bytes accepted by the sink.
        written: usize,
        /// Bytes requested.
        expected: usize,
    },
    /// JSON serialization failures for artifacts.
    #[error("{operation}")]
    Json {
        /// Operation that triggered the JSON failure.
        operation: &'static str,
        /// Path involved in the JSON failure.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
    /// Walkdir traversal failures.
    #[error("{operation}")]
    Walkdir {
        /// Operation that triggered the walkdir failure.
        operation: &'static str,
        /// Path involved in the walkdir failure.
        path: PathBuf,
        /// Underlying walkdir error.
        source: walkdir::Error,
    },
    /// Zip archive failures.
    #[error("{operation}")]
    Zip {
        /// Operation that triggered the archive failure.
        operation: &'static str,
        /// Path involved in the archive failure.
        path: PathBuf,
        /// Underlying zip error.
        source: zip::result::ZipError,
    },
    /// Backing-service failures.
    #[error("{operation}")]
    Backend {
        /// Operation that triggered the backend call.
        operation: &'static str,
        /// Underlying backend error.
        source: BackendError,
    },
    /// Persisting a JSON artifact failed.
    #[error("failed to save {}", path.display())]
    Save {
        /// Artifact path.
        path: PathBuf,
        /// Underlying failure.
        source: Box<BundleError>,
    },
    /// Exporting the operation log failed.
    #[error("failed to save command log")]
    LogExport {
        /// Underlying failure.
        source: Box<BundleError>,
    },
    /// Building the bundle archive failed.
    #[error("create archive")]
    Archive {
        /// Underlying failure.
        source: Box<BundleError>,
    },
}

impl BundleError {
    /// Classify the error, looking through stage wrappers.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. } | Self::NotADirectory { .. } => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Unsupported { .. } => ErrorKind::Unsupported,
            Self::Io { .. }
            | Self::ShortWrite { .. }
            | Self::Json { .. }
            | Self::Walkdir { .. }
            | Self::Zip { .. } => ErrorKind::Io,
            Self::Backend { source, .. } => {
                if source.is_not_found() {
                    ErrorKind::NotFound
                } else {
                    ErrorKind::Backend
                }
            }
            Self::Save { source, .. } | Self::LogExport { source } | Self::Archive { source } => {
                source.kind()
            }
        }
    }

    /// Whether the error ultimately reports an absent entity.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: serde_json::Error,
    ) -> Self {
        Self::Json {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn walkdir(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: walkdir::Error,
    ) -> Self {
        Self::Walkdir {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn zip(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: zip::result::ZipError,
    ) -> Self {
        Self::Zip {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) const fn backend(operation: &'static str, source: BackendError) -> Self {
        Self::Backend { operation, source }
    }

    pub(crate) fn save(path: &Path, source: Self) -> Self {
        Self::Save {
            path: path.to_path_buf(),
            source: Box::new(source),
        }
    }

    pub(crate) fn log_export(source: Self) -> Self {
        Self::LogExport {
            source: Box::new(source),
        }
    }

    pub(crate) fn archive(source: Self) -> Self {
        Self::Archive {
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn classification_survives_wrapping() {
        let inner = BundleError::backend(
            "open log cursor",
            BackendError::not_found("command", "65a0"),
        );
        let wrapped = BundleError::log_export(inner);
        assert_eq!(wrapped.kind(), ErrorKind::NotFound);
        assert!(wrapped.is_not_found());

        let save = BundleError::save(
            Path::new("/tmp/x.report.json"),
            BundleError::io("write", "/tmp/x.report.json", io::Error::other("disk")),
        );
        assert_eq!(save.kind(), ErrorKind::Io);
        assert!(save.source().is_some());
    }

    #[test]
    fn backend_failures_other_than_absence_are_backend_kind() {
        let err = BundleError::backend(
            "get backup meta",
            BackendError::Status {
                operation: "fetch_backup_by_id",
                status: 500,
            },
        );
        assert_eq!(err.kind(), ErrorKind::Backend);
        assert!(!err.is_not_found());
    }

    #[test]
    fn messages_carry_operation_context() {
        let err = BundleError::archive(BundleError::io(
            "rename archive",
            "/tmp/out/x.zip",
            io::Error::other("cross-device link"),
        ));
        assert_eq!(err.to_string(), "create archive");
        let inner = err.source().map(ToString::to_string);
        assert_eq!(inner.as_deref(), Some("rename archive"));

        let missing = BundleError::NotFound {
            what: "command",
            value: Some("daily".into()),
        };
        assert_eq!(missing.to_string(), "command not found");
    }

    #[test]
    fn validation_variants_classify_as_validation() {
        let err = BundleError::NotADirectory {
            path: PathBuf::from("/tmp/file"),
        };
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.to_string(), "/tmp/file is not a directory");
    }
}
