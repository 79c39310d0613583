//! # Design
//!
//! - Classify backend failures so callers can tell "absent" apart from "broken".
//! - Keep messages constant; operation and key context travel in fields.

use std::error::Error;

use thiserror::Error;

/// Result alias for collaborator calls.
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors surfaced by the backing service.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The requested entity does not exist.
    #[error("not found")]
    NotFound {
        /// Kind of entity that was looked up.
        resource: &'static str,
        /// Identifier or name used for the lookup.
        key: String,
    },
    /// The request could not be delivered or the response could not be read.
    #[error("backend transport failure")]
    Transport {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Underlying transport error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The backend answered with an unexpected status.
    #[error("backend returned status {status}")]
    Status {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Status code returned by the backend.
        status: u16,
    },
    /// A backend payload could not be decoded.
    #[error("backend payload decode failure")]
    Decode {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
}

impl BackendError {
    /// Build a not-found error for the given resource kind and key.
    pub fn not_found(resource: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            key: key.into(),
        }
    }

    /// Wrap an arbitrary transport failure.
    pub fn transport(
        operation: &'static str,
        source: impl Into<Box<dyn Error + Send + Sync>>,
    ) -> Self {
        Self::Transport {
            operation,
            source: source.into(),
        }
    }

    /// Whether the error reports an absent entity.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn not_found_is_classified() {
        let err = BackendError::not_found("command", "daily");
        assert!(err.is_not_found());
        assert!(err.source().is_none());
    }

    #[test]
    fn transport_preserves_source() {
        let err = BackendError::transport("open_log_cursor", io::Error::other("reset"));
        assert!(!err.is_not_found());
        assert!(err.source().is_some());
    }

    #[test]
    fn status_message_names_code() {
        let err = BackendError::Status {
            operation: "fetch_report",
            status: 503,
        };
        assert_eq!(err.to_string(), "backend returned status 503");
    }
}
