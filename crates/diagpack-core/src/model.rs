//! Domain models exchanged with the backing service.
//!
//! # Design
//! - Metadata documents stay opaque: only the fields the bundler branches on or
//!   rewrites are typed, everything else round-trips through a JSON map.
//! - Kind fields keep their raw wire value so unknown kinds survive persistence.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier assigned to one issued backup or restore command.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(String);

impl OperationId {
    /// Wrap a raw identifier.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for OperationId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl From<String> for OperationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for OperationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Kind of command a report describes, used to decide which metadata to collect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// A backup command.
    Backup,
    /// A restore command.
    Restore,
    /// Any other command, or a report without a command reference.
    Unspecified,
}

/// Command reference embedded in a report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandRef {
    /// Raw command name as recorded by the backend.
    #[serde(default)]
    pub cmd: String,
    /// Remaining command fields, persisted untouched.
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl CommandRef {
    /// Classify the raw command name.
    #[must_use]
    pub fn kind(&self) -> CommandKind {
        match self.cmd.as_str() {
            "backup" => CommandKind::Backup,
            "restore" => CommandKind::Restore,
            _ => CommandKind::Unspecified,
        }
    }
}

/// Execution report for one command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Command the report belongs to, when the backend still has it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<CommandRef>,
    /// Remaining report fields, persisted untouched.
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl Report {
    /// Kind of the embedded command, or [`CommandKind::Unspecified`] when absent.
    #[must_use]
    pub fn command_kind(&self) -> CommandKind {
        self.command
            .as_ref()
            .map_or(CommandKind::Unspecified, CommandRef::kind)
    }
}

/// Backup flavour recorded on backup and restore metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BackupKind {
    /// Logical (document-level) backup.
    Logical,
    /// Physical (file-level) backup.
    Physical,
    /// Incremental physical backup.
    Incremental,
    /// Externally produced physical backup.
    External,
    /// Unrecognised kind, kept verbatim.
    Other(String),
}

impl BackupKind {
    /// Wire name of the kind.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Logical => "logical",
            Self::Physical => "physical",
            Self::Incremental => "incremental",
            Self::External => "external",
            Self::Other(raw) => raw,
        }
    }
}

impl Default for BackupKind {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<String> for BackupKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "logical" => Self::Logical,
            "physical" => Self::Physical,
            "incremental" => Self::Incremental,
            "external" => Self::External,
            _ => Self::Other(value),
        }
    }
}

impl From<BackupKind> for String {
    fn from(value: BackupKind) -> Self {
        match value {
            BackupKind::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

/// Storage location attached to a backup. May hold endpoints and credentials.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageSpec {
    /// Storage backend type.
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    /// Backend-specific configuration.
    #[serde(flatten)]
    pub config: Map<String, Value>,
}

impl StorageSpec {
    /// Whether no storage location is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kind.is_empty() && self.config.is_empty()
    }
}

/// Metadata describing one backup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackupRecord {
    /// Backup name.
    #[serde(default)]
    pub name: String,
    /// Operation that produced the backup.
    #[serde(default)]
    pub opid: String,
    /// Backup flavour.
    #[serde(rename = "type", default)]
    pub kind: BackupKind,
    /// Storage the backup was written to.
    #[serde(default)]
    pub store: StorageSpec,
    /// Remaining metadata fields, persisted untouched.
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl BackupRecord {
    /// Reset the storage location so it can be exported safely.
    pub fn strip_storage(&mut self) {
        self.store = StorageSpec::default();
    }
}

/// Metadata describing one restore.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RestoreRecord {
    /// Restore name.
    #[serde(default)]
    pub name: String,
    /// Operation that performed the restore.
    #[serde(default)]
    pub opid: String,
    /// Name of the backup the restore was taken from.
    #[serde(default)]
    pub backup: String,
    /// Flavour of the source backup.
    #[serde(rename = "type", default)]
    pub kind: BackupKind,
    /// Remaining metadata fields, persisted untouched.
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl RestoreRecord {
    /// Whether the restore came from a logical backup.
    #[must_use]
    pub fn is_logical(&self) -> bool {
        self.kind == BackupKind::Logical
    }
}

/// Options controlling how much of a backup record the backend resolves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackupFetchOptions {
    /// Resolve the full increment chain for incremental backups.
    pub fetch_increments: bool,
    /// Resolve per-file listings.
    pub fetch_filelist: bool,
}
