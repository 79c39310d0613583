//! Sample documents and filesystem helpers.

use anyhow::Result;
use diagpack_core::{
    BackupKind, BackupRecord, CommandRef, LogRecord, Report, RestoreRecord, Severity, StorageSpec,
};
use serde_json::{Map, Value, json};
use tempfile::TempDir;

/// Fresh temporary directory with a recognisable prefix.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn temp_dir() -> Result<TempDir> {
    Ok(tempfile::Builder::new().prefix("diagpack-").tempdir()?)
}

/// Report for a command named `cmd` (e.g. `backup`, `restore`, `resync`).
#[must_use]
pub fn report_for(cmd: &str) -> Report {
    let mut details = Map::new();
    details.insert("replsets".into(), json!([{"name": "rs0", "nodes": []}]));
    details.insert("opid".into(), Value::String("65a00000".into()));
    Report {
        command: Some(CommandRef {
            cmd: cmd.to_string(),
            details: Map::new(),
        }),
        details,
    }
}

/// Report whose command has already been purged by the backend.
#[must_use]
pub fn report_without_command() -> Report {
    let mut details = Map::new();
    details.insert("replsets".into(), json!([]));
    Report {
        command: None,
        details,
    }
}

/// Storage location carrying credentials that must never be exported.
#[must_use]
pub fn secret_storage() -> StorageSpec {
    let mut config = Map::new();
    config.insert(
        "s3".into(),
        json!({
            "endpointUrl": "https://s3.internal.example",
            "bucket": "backups",
            "credentials": {"access-key-id": "AKIA-SECRET", "secret-access-key": "hunter2"}
        }),
    );
    StorageSpec {
        kind: "s3".into(),
        config,
    }
}

/// Backup metadata with a populated storage location.
#[must_use]
pub fn backup_record(name: &str, opid: &str, kind: BackupKind) -> BackupRecord {
    let mut details = Map::new();
    details.insert("status".into(), Value::String("done".into()));
    details.insert("size".into(), json!(1024));
    BackupRecord {
        name: name.to_string(),
        opid: opid.to_string(),
        kind,
        store: secret_storage(),
        details,
    }
}

/// Restore metadata pointing at `backup`.
#[must_use]
pub fn restore_record(name: &str, opid: &str, backup: &str, kind: BackupKind) -> RestoreRecord {
    let mut details = Map::new();
    details.insert("status".into(), Value::String("done".into()));
    RestoreRecord {
        name: name.to_string(),
        opid: opid.to_string(),
        backup: backup.to_string(),
        kind,
        details,
    }
}

/// `count` log records for `opid` with increasing timestamps.
#[must_use]
pub fn log_records(opid: &str, count: usize) -> Vec<LogRecord> {
    (0..count)
        .map(|index| LogRecord {
            ts: 1_704_067_200 + i64::try_from(index).unwrap_or(i64::MAX - 1_704_067_200),
            severity: if index % 5 == 4 {
                Severity::Warning
            } else {
                Severity::Info
            },
            replset: "rs0".into(),
            node: format!("db-{}:27017", index % 3),
            event: "backup".into(),
            object: "2024-01-01T00:00:00Z".into(),
            opid: opid.to_string(),
            msg: format!("step {index}"),
        })
        .collect()
}
