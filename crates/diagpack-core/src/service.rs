//! Backing-service interface consumed by the bundler.

use async_trait::async_trait;

use crate::error::{BackendError, BackendResult};
use crate::log::LogRecord;
use crate::model::{BackupFetchOptions, BackupRecord, OperationId, Report, RestoreRecord};

/// Read-only view of the backup system needed to assemble a diagnostic bundle.
///
/// Every lookup that targets a single entity fails with
/// [`BackendError::NotFound`] when the entity is absent.
#[async_trait]
pub trait DiagnosticSource: Send + Sync {
    /// Resolve the operation id of the command issued under `name`.
    async fn resolve_id_by_name(&self, name: &str) -> BackendResult<OperationId>;

    /// Fetch the execution report of a command.
    async fn fetch_report(&self, id: &OperationId) -> BackendResult<Report>;

    /// Fetch backup metadata by the operation that produced it.
    async fn fetch_backup_by_id(
        &self,
        id: &OperationId,
        options: BackupFetchOptions,
    ) -> BackendResult<BackupRecord>;

    /// Fetch backup metadata by backup name.
    async fn fetch_backup_by_name(
        &self,
        name: &str,
        options: BackupFetchOptions,
    ) -> BackendResult<BackupRecord>;

    /// Fetch restore metadata by the operation that performed it.
    async fn fetch_restore_by_id(&self, id: &OperationId) -> BackendResult<RestoreRecord>;

    /// Fetch restore metadata by restore name.
    async fn fetch_restore_by_name(&self, name: &str) -> BackendResult<RestoreRecord>;

    /// Open a forward-only cursor over the log records of an operation.
    async fn open_log_cursor(&self, id: &OperationId) -> BackendResult<Box<dyn LogCursor>>;
}

/// Forward-only, lazily fetched sequence of log records.
///
/// Iteration stops when [`advance`](Self::advance) returns `false`; callers
/// must then consult [`terminal_error`](Self::terminal_error), since transport
/// failures surface only there.
#[async_trait]
pub trait LogCursor: Send {
    /// Move to the next record. Returns `false` when exhausted or failed.
    async fn advance(&mut self) -> bool;

    /// Decode the record the cursor currently points at.
    ///
    /// # Errors
    ///
    /// Returns an error when the current record is malformed or the cursor is
    /// not positioned on a record.
    fn decode(&self) -> BackendResult<LogRecord>;

    /// Take the error that ended iteration, if any.
    fn terminal_error(&mut self) -> Option<BackendError>;

    /// Release backend resources held by the cursor.
    async fn close(&mut self);
}
