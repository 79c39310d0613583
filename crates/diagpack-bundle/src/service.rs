//! Diagnostic bundle orchestration.
//!
//! Stages run strictly in sequence: validate, resolve, fetch report, prepare
//! the directory, save the report, collect metadata, export the log, and
//! optionally archive. The first fatal error aborts the run; files written
//! before it stay on disk.

use std::fs;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};

use diagpack_core::{
    BackendResult, BackupFetchOptions, BackupRecord, CommandKind, DiagnosticSource, OperationId,
};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::archive::Archiver;
use crate::artifact::write_artifact;
use crate::config::BundlerConfig;
use crate::error::{BundleError, BundleResult};
use crate::log_export::LogExporter;
use crate::model::{BundleFile, BundleRequest, BundleSummary, ResolvedContext};
use crate::resolve::{require_identifier, resolve_context};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StepKind {
    ValidateRequest,
    Resolve,
    FetchReport,
    PrepareDirectory,
    SaveReport,
    CollectMetadata,
    ExportLog,
    Archive,
}

impl StepKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::ValidateRequest => "validate_request",
            Self::Resolve => "resolve",
            Self::FetchReport => "fetch_report",
            Self::PrepareDirectory => "prepare_directory",
            Self::SaveReport => "save_report",
            Self::CollectMetadata => "collect_metadata",
            Self::ExportLog => "export_log",
            Self::Archive => "archive",
        }
    }
}

/// Which optional metadata a command kind contributes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MetadataPlan {
    /// Nothing beyond the report and log.
    None,
    /// The backup produced by the operation.
    Backup,
    /// The restore performed by the operation and the backup it came from.
    Restore,
}

impl MetadataPlan {
    const fn for_kind(kind: CommandKind) -> Self {
        match kind {
            CommandKind::Backup => Self::Backup,
            CommandKind::Restore => Self::Restore,
            CommandKind::Unspecified => Self::None,
        }
    }
}

/// Generates diagnostic bundles from a [`DiagnosticSource`].
pub struct DiagnosticBundler<S> {
    source: S,
    config: BundlerConfig,
    exporter: LogExporter,
    archiver: Archiver,
}

impl<S> DiagnosticBundler<S>
where
    S: DiagnosticSource,
{
    /// Bundler with default configuration.
    pub fn new(source: S) -> Self {
        Self::with_config(source, BundlerConfig::default())
    }

    /// Bundler with explicit configuration.
    pub fn with_config(source: S, config: BundlerConfig) -> Self {
        Self {
            exporter: LogExporter::new(config.render),
            archiver: Archiver::new(config.staging_dir.clone()),
            source,
            config,
        }
    }

    /// Backing source, mainly for inspection in tests.
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Generate one bundle.
    ///
    /// Dropping the returned future cancels the run; a partially written log
    /// file or staged archive is removed when that happens.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error. Use [`BundleError::kind`] to classify it.
    #[instrument(
        name = "diagnostic_bundler.generate",
        skip(self, request),
        fields(path = %request.output_path.display(), archive = request.produce_archive)
    )]
    pub async fn generate(&self, request: BundleRequest) -> BundleResult<BundleSummary> {
        execute_step(StepKind::ValidateRequest, async {
            require_identifier(&request)?;
            check_output_path(&request.output_path)
        })
        .await?;

        let ctx = execute_step(StepKind::Resolve, resolve_context(&self.source, &request)).await?;
        let directory = request.output_path.clone();
        let mut files = Vec::new();

        let report = execute_step(StepKind::FetchReport, async {
            self.source
                .fetch_report(ctx.operation_id())
                .await
                .map_err(|err| BundleError::backend("get diagnostic report", err))
        })
        .await?;

        execute_step(StepKind::PrepareDirectory, async {
            prepare_directory(&directory, self.config.dir_mode)
        })
        .await?;

        files.push(
            execute_step(StepKind::SaveReport, async {
                save(&directory, BundleFile::Report, ctx.prefix(), &report)
            })
            .await?,
        );

        let plan = MetadataPlan::for_kind(report.command_kind());
        execute_step(
            StepKind::CollectMetadata,
            self.collect_metadata(plan, &ctx, &directory, &mut files),
        )
        .await?;

        let export = execute_step(StepKind::ExportLog, async {
            self.exporter
                .export(&self.source, &directory, ctx.prefix(), ctx.operation_id())
                .await
                .map_err(BundleError::log_export)
        })
        .await?;
        files.push(export.path);

        let archive = if request.produce_archive {
            let path = execute_step(StepKind::Archive, async {
                self.archiver
                    .archive(&directory, ctx.prefix())
                    .map_err(BundleError::archive)
            })
            .await?;
            files.push(path.clone());
            Some(path)
        } else {
            None
        };

        info!(
            operation_id = %ctx.operation_id(),
            files = files.len(),
            "diagnostic bundle created"
        );
        Ok(BundleSummary {
            operation_id: ctx.operation_id().clone(),
            prefix: ctx.prefix().to_string(),
            directory,
            files,
            archive,
        })
    }

    async fn collect_metadata(
        &self,
        plan: MetadataPlan,
        ctx: &ResolvedContext,
        directory: &Path,
        files: &mut Vec<PathBuf>,
    ) -> BundleResult<()> {
        let id = ctx.operation_id();
        match plan {
            MetadataPlan::None => Ok(()),
            MetadataPlan::Backup => {
                let backup = optional(
                    "get backup meta",
                    id,
                    self.source
                        .fetch_backup_by_id(id, BackupFetchOptions::default())
                        .await,
                )?;
                if let Some(backup) = backup {
                    files.push(save_backup(directory, ctx.prefix(), backup)?);
                }
                Ok(())
            }
            MetadataPlan::Restore => {
                let Some(restore) =
                    optional("get restore meta", id, self.source.fetch_restore_by_id(id).await)?
                else {
                    return Ok(());
                };
                files.push(save(directory, BundleFile::Restore, ctx.prefix(), &restore)?);

                if restore.backup.is_empty() {
                    warn!(operation_id = %id, "restore record names no source backup");
                    return Ok(());
                }
                let backup = optional(
                    "get backup meta",
                    id,
                    self.source
                        .fetch_backup_by_name(&restore.backup, BackupFetchOptions::default())
                        .await,
                )?;
                if let Some(backup) = backup {
                    files.push(save_backup(directory, ctx.prefix(), backup)?);
                }
                Ok(())
            }
        }
    }
}

async fn execute_step<T, F>(step: StepKind, op: F) -> BundleResult<T>
where
    F: Future<Output = BundleResult<T>>,
{
    info!(step = step.as_str(), "bundle step started");
    match op.await {
        Ok(value) => {
            info!(step = step.as_str(), "bundle step completed");
            Ok(value)
        }
        Err(err) => {
            warn!(
                step = step.as_str(),
                kind = ?err.kind(),
                error = %err,
                "bundle step failed"
            );
            Err(err)
        }
    }
}

/// Swallow not-found for metadata that may legitimately be absent.
fn optional<T>(
    operation: &'static str,
    id: &OperationId,
    result: BackendResult<T>,
) -> BundleResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_not_found() => {
            warn!(operation_id = %id, operation, "metadata not found; omitting from bundle");
            Ok(None)
        }
        Err(err) => Err(BundleError::backend(operation, err)),
    }
}

fn save<T>(directory: &Path, file: BundleFile, prefix: &str, value: &T) -> BundleResult<PathBuf>
where
    T: Serialize + ?Sized,
{
    write_artifact(directory, &file.file_name(prefix), value)
        .map_err(|err| BundleError::save(&file.path_in(directory, prefix), err))
}

fn save_backup(directory: &Path, prefix: &str, mut backup: BackupRecord) -> BundleResult<PathBuf> {
    backup.strip_storage();
    save(directory, BundleFile::Backup, prefix, &backup)
}

fn check_output_path(path: &Path) -> BundleResult<()> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(BundleError::NotADirectory {
            path: path.to_path_buf(),
        }),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(BundleError::io("inspect output path", path, err)),
    }
}

fn prepare_directory(path: &Path, mode: u32) -> BundleResult<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;
    builder
        .create(path)
        .map_err(|err| BundleError::io("create output directory", path, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use anyhow::Result;
    use diagpack_test_support::fixtures::{log_records, report_for, report_without_command, temp_dir};
    use diagpack_test_support::{InMemorySource, SourceCall};

    #[test]
    fn command_kind_selects_metadata_plan() {
        assert_eq!(MetadataPlan::for_kind(CommandKind::Backup), MetadataPlan::Backup);
        assert_eq!(MetadataPlan::for_kind(CommandKind::Restore), MetadataPlan::Restore);
        assert_eq!(MetadataPlan::for_kind(CommandKind::Unspecified), MetadataPlan::None);
    }

    #[test]
    fn regular_file_is_not_an_output_directory() -> Result<()> {
        let dir = temp_dir()?;
        let file = dir.path().join("taken");
        fs::write(&file, "x")?;
        let err = check_output_path(&file).err().map(|err| err.kind());
        assert_eq!(err, Some(ErrorKind::Validation));
        check_output_path(dir.path())?;
        check_output_path(&dir.path().join("absent"))?;
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn prepared_directory_respects_mode() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let dir = temp_dir()?;
        let target = dir.path().join("a").join("b");
        prepare_directory(&target, 0o700)?;
        let mode = fs::metadata(&target)?.permissions().mode() & 0o777;
        assert_eq!(mode, 0o700);
        prepare_directory(&target, 0o700)?;
        Ok(())
    }

    #[tokio::test]
    async fn step_failure_is_propagated() {
        let result: BundleResult<()> = execute_step(StepKind::Archive, async {
            Err(BundleError::InvalidInput {
                field: "test_step",
                reason: "forced failure",
                value: None,
            })
        })
        .await;
        assert!(matches!(result, Err(BundleError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn unspecified_command_writes_report_and_log_only() -> Result<()> {
        let dir = temp_dir()?;
        let source = InMemorySource::new()
            .with_report("65a0", report_for("resync"))
            .with_log("65a0", log_records("65a0", 2));
        let bundler = DiagnosticBundler::new(source);
        let summary = bundler
            .generate(BundleRequest::by_id("65a0", dir.path().join("out")))
            .await?;

        assert_eq!(
            summary.files,
            vec![
                dir.path().join("out").join("65a0.report.json"),
                dir.path().join("out").join("65a0.log"),
            ]
        );
        assert_eq!(summary.archive, None);
        assert_eq!(bundler.source().calls(SourceCall::FetchBackupById), 0);
        assert_eq!(bundler.source().calls(SourceCall::FetchRestoreById), 0);
        Ok(())
    }

    #[tokio::test]
    async fn report_without_command_is_unspecified() -> Result<()> {
        let dir = temp_dir()?;
        let source = InMemorySource::new().with_report("65a0", report_without_command());
        let bundler = DiagnosticBundler::new(source);
        let summary = bundler
            .generate(BundleRequest::by_id("65a0", dir.path()))
            .await?;
        assert_eq!(summary.files.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn missing_report_is_fatal_and_creates_nothing() -> Result<()> {
        let dir = temp_dir()?;
        let out = dir.path().join("out");
        let bundler = DiagnosticBundler::new(InMemorySource::new());
        let err = bundler.generate(BundleRequest::by_id("65a0", &out)).await.err();

        assert_eq!(err.as_ref().map(BundleError::kind), Some(ErrorKind::NotFound));
        assert_eq!(
            err.map(|err| err.to_string()).as_deref(),
            Some("get diagnostic report")
        );
        assert!(!out.exists());
        Ok(())
    }
}
