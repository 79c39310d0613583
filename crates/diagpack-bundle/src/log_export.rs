//! # Design
//!
//! - Stream records from the cursor straight to disk; nothing beyond one line is buffered in memory.
//! - The log file is removed on every exit path that did not reach the explicit close, including
//!   a dropped (cancelled) future.
//! - The cursor is closed on both success and failure before the result propagates.

use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use diagpack_core::{DiagnosticSource, LogCursor, OperationId, RenderOptions};
use tracing::{debug, warn};

use crate::artifact::write_checked;
use crate::error::{BundleError, BundleResult};
use crate::model::BundleFile;

/// Result of a successful log export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogExport {
    /// Path of the written `.log` file.
    pub path: PathBuf,
    /// Number of records written, one line each.
    pub records: usize,
}

/// Writes the log stream of one operation into `{prefix}.log`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogExporter {
    render: RenderOptions,
}

impl LogExporter {
    /// Exporter rendering lines with `render`.
    #[must_use]
    pub const fn new(render: RenderOptions) -> Self {
        Self { render }
    }

    /// Export every log record of `operation_id` into `{directory}/{prefix}.log`.
    ///
    /// # Errors
    ///
    /// Returns an IO error when the file cannot be created, written, or closed,
    /// and a wrapped backend error when the cursor cannot be opened, a record
    /// fails to decode, or the cursor ends with a terminal error. The log file
    /// does not exist after any failure.
    pub async fn export<S>(
        &self,
        source: &S,
        directory: &Path,
        prefix: &str,
        operation_id: &OperationId,
    ) -> BundleResult<LogExport>
    where
        S: DiagnosticSource + ?Sized,
    {
        let path = BundleFile::Log.path_in(directory, prefix);
        let file = File::create(&path).map_err(|err| BundleError::io("create log file", &path, err))?;
        let guard = RemoveOnDrop::new(&path);
        let mut writer = BufWriter::new(file);

        let mut cursor = source
            .open_log_cursor(operation_id)
            .await
            .map_err(|err| BundleError::backend("open log cursor", err))?;
        let drained = self.drain(cursor.as_mut(), &mut writer, &path).await;
        cursor.close().await;
        let records = drained?;

        let file = writer
            .into_inner()
            .map_err(|err| BundleError::io("flush log file", &path, err.into_error()))?;
        file.sync_all()
            .map_err(|err| BundleError::io("close log file", &path, err))?;
        drop(file);
        guard.disarm();

        debug!(path = %path.display(), records, "log exported");
        Ok(LogExport { path, records })
    }

    async fn drain(
        &self,
        cursor: &mut dyn LogCursor,
        writer: &mut BufWriter<File>,
        path: &Path,
    ) -> BundleResult<usize> {
        let mut records = 0_usize;
        while cursor.advance().await {
            let record = cursor
                .decode()
                .map_err(|err| BundleError::backend("decode log record", err))?;
            let line = record.render(self.render);
            write_checked(writer, line.as_bytes(), "write log line", path)?;
            write_checked(writer, b"\n", "write log line", path)?;
            records += 1;
        }

        if let Some(err) = cursor.terminal_error() {
            return Err(BundleError::backend("log cursor", err));
        }
        Ok(records)
    }
}

/// Deletes `path` when dropped unless disarmed.
///
/// Must be declared before the file handle it covers so the handle is
/// released first.
#[derive(Debug)]
struct RemoveOnDrop {
    path: PathBuf,
    armed: bool,
}

impl RemoveOnDrop {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for RemoveOnDrop {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed partial log file"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!(
                path = %self.path.display(),
                error = %err,
                "failed to remove partial log file"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use anyhow::Result;
    use diagpack_test_support::fixtures::{log_records, temp_dir};
    use diagpack_test_support::{CursorScript, Fault, InMemorySource, ScriptedEntry, SourceCall};

    #[tokio::test]
    async fn writes_one_line_per_record_in_order() -> Result<()> {
        let dir = temp_dir()?;
        let records = log_records("65a0", 7);
        let source = InMemorySource::new().with_log("65a0", records.clone());
        let export = LogExporter::default()
            .export(&source, dir.path(), "daily", &OperationId::from("65a0"))
            .await?;

        assert_eq!(export.records, 7);
        assert_eq!(export.path, dir.path().join("daily.log"));
        let text = fs::read_to_string(&export.path)?;
        let expected: String = records
            .iter()
            .map(|record| format!("{}\n", record.render(RenderOptions::diagnostic())))
            .collect();
        assert_eq!(text, expected);
        assert_eq!(source.cursors_closed(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn empty_stream_leaves_empty_file() -> Result<()> {
        let dir = temp_dir()?;
        let source = InMemorySource::new();
        let export = LogExporter::default()
            .export(&source, dir.path(), "65a0", &OperationId::from("65a0"))
            .await?;
        assert_eq!(export.records, 0);
        assert_eq!(fs::read(&export.path)?.len(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn terminal_error_removes_file() -> Result<()> {
        let dir = temp_dir()?;
        let script = CursorScript::records(log_records("65a0", 3)).failing_with(Fault::Unavailable);
        let source = InMemorySource::new().with_log_script("65a0", script);
        let err = LogExporter::default()
            .export(&source, dir.path(), "65a0", &OperationId::from("65a0"))
            .await
            .err();

        assert_eq!(err.as_ref().map(ToString::to_string).as_deref(), Some("log cursor"));
        assert!(!dir.path().join("65a0.log").exists());
        assert_eq!(source.cursors_closed(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn decode_failure_removes_file() -> Result<()> {
        let dir = temp_dir()?;
        let mut script = CursorScript::records(log_records("65a0", 2));
        script.entries.push(ScriptedEntry::Malformed);
        let source = InMemorySource::new().with_log_script("65a0", script);
        let err = LogExporter::default()
            .export(&source, dir.path(), "65a0", &OperationId::from("65a0"))
            .await
            .err();

        assert_eq!(err.map(|err| err.kind()), Some(ErrorKind::Backend));
        assert!(!dir.path().join("65a0.log").exists());
        assert_eq!(source.cursors_closed(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn cursor_open_failure_removes_file() -> Result<()> {
        let dir = temp_dir()?;
        let source = InMemorySource::new().with_fault(SourceCall::OpenLogCursor, Fault::Status(500));
        let err = LogExporter::default()
            .export(&source, dir.path(), "65a0", &OperationId::from("65a0"))
            .await
            .err();

        assert_eq!(
            err.as_ref().map(ToString::to_string).as_deref(),
            Some("open log cursor")
        );
        assert!(!dir.path().join("65a0.log").exists());
        Ok(())
    }

    #[test]
    fn disarmed_guard_keeps_file() -> Result<()> {
        let dir = temp_dir()?;
        let kept = dir.path().join("kept.log");
        let removed = dir.path().join("removed.log");
        fs::write(&kept, "x")?;
        fs::write(&removed, "x")?;

        RemoveOnDrop::new(&kept).disarm();
        drop(RemoveOnDrop::new(&removed));

        assert!(kept.exists());
        assert!(!removed.exists());
        Ok(())
    }
}
