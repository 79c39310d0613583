//! In-memory [`DiagnosticSource`] with call accounting and injectable faults.

use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use diagpack_core::{
    BackendError, BackendResult, BackupFetchOptions, BackupRecord, DiagnosticSource, LogCursor,
    LogRecord, OperationId, Report, RestoreRecord,
};

/// Collaborator calls tracked by [`InMemorySource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceCall {
    /// `resolve_id_by_name`.
    ResolveIdByName,
    /// `fetch_report`.
    FetchReport,
    /// `fetch_backup_by_id`.
    FetchBackupById,
    /// `fetch_backup_by_name`.
    FetchBackupByName,
    /// `fetch_restore_by_id`.
    FetchRestoreById,
    /// `fetch_restore_by_name`.
    FetchRestoreByName,
    /// `open_log_cursor`.
    OpenLogCursor,
}

impl SourceCall {
    const ALL: [Self; 7] = [
        Self::ResolveIdByName,
        Self::FetchReport,
        Self::FetchBackupById,
        Self::FetchBackupByName,
        Self::FetchRestoreById,
        Self::FetchRestoreByName,
        Self::OpenLogCursor,
    ];

    const fn index(self) -> usize {
        match self {
            Self::ResolveIdByName => 0,
            Self::FetchReport => 1,
            Self::FetchBackupById => 2,
            Self::FetchBackupByName => 3,
            Self::FetchRestoreById => 4,
            Self::FetchRestoreByName => 5,
            Self::OpenLogCursor => 6,
        }
    }

    const fn operation(self) -> &'static str {
        match self {
            Self::ResolveIdByName => "resolve_id_by_name",
            Self::FetchReport => "fetch_report",
            Self::FetchBackupById => "fetch_backup_by_id",
            Self::FetchBackupByName => "fetch_backup_by_name",
            Self::FetchRestoreById => "fetch_restore_by_id",
            Self::FetchRestoreByName => "fetch_restore_by_name",
            Self::OpenLogCursor => "open_log_cursor",
        }
    }
}

/// Failure injected in place of a collaborator answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Answer with [`BackendError::NotFound`].
    NotFound,
    /// Answer with a transport failure.
    Unavailable,
    /// Answer with an unexpected status code.
    Status(u16),
}

impl Fault {
    fn to_error(self, operation: &'static str, key: &str) -> BackendError {
        match self {
            Self::NotFound => BackendError::not_found(operation, key),
            Self::Unavailable => {
                BackendError::transport(operation, io::Error::other("backend unavailable"))
            }
            Self::Status(status) => BackendError::Status { operation, status },
        }
    }
}

/// One scripted cursor position.
#[derive(Debug, Clone)]
pub enum ScriptedEntry {
    /// A well-formed record.
    Record(LogRecord),
    /// A position whose decode fails.
    Malformed,
}

/// Records and terminal state replayed by a [`ScriptedCursor`].
#[derive(Debug, Clone, Default)]
pub struct CursorScript {
    /// Positions yielded in order.
    pub entries: Vec<ScriptedEntry>,
    /// Error reported once the entries are exhausted.
    pub terminal: Option<Fault>,
}

impl CursorScript {
    /// Script yielding the given records and ending cleanly.
    #[must_use]
    pub fn records(records: Vec<LogRecord>) -> Self {
        Self {
            entries: records.into_iter().map(ScriptedEntry::Record).collect(),
            terminal: None,
        }
    }

    /// End the script with the given terminal error.
    #[must_use]
    pub const fn failing_with(mut self, fault: Fault) -> Self {
        self.terminal = Some(fault);
        self
    }
}

/// Cursor replaying a [`CursorScript`].
#[derive(Debug)]
pub struct ScriptedCursor {
    entries: Vec<ScriptedEntry>,
    position: Option<usize>,
    terminal: Option<Fault>,
    terminal_taken: bool,
    closes: Arc<AtomicUsize>,
}

impl ScriptedCursor {
    /// Build a cursor over a script; `closes` is bumped on every `close`.
    #[must_use]
    pub fn new(script: CursorScript, closes: Arc<AtomicUsize>) -> Self {
        Self {
            entries: script.entries,
            position: None,
            terminal: script.terminal,
            terminal_taken: false,
            closes,
        }
    }
}

#[async_trait]
impl LogCursor for ScriptedCursor {
    async fn advance(&mut self) -> bool {
        let next = self.position.map_or(0, |index| index + 1);
        self.position = Some(next);
        next < self.entries.len()
    }

    fn decode(&self) -> BackendResult<LogRecord> {
        let entry = self
            .position
            .and_then(|index| self.entries.get(index))
            .ok_or_else(|| BackendError::not_found("log_record", "cursor position"))?;
        match entry {
            ScriptedEntry::Record(record) => Ok(record.clone()),
            ScriptedEntry::Malformed => Err(BackendError::Decode {
                operation: "log_cursor.decode",
                source: malformed_json(),
            }),
        }
    }

    fn terminal_error(&mut self) -> Option<BackendError> {
        if self.terminal_taken {
            return None;
        }
        self.terminal_taken = true;
        self.terminal
            .map(|fault| fault.to_error("log_cursor.next", "stream"))
    }

    async fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

fn malformed_json() -> serde_json::Error {
    match serde_json::from_str::<LogRecord>("{") {
        Ok(_) => serde::de::Error::custom("expected malformed record"),
        Err(err) => err,
    }
}

/// Backend fake holding every document in memory.
#[derive(Debug, Default)]
pub struct InMemorySource {
    commands: HashMap<String, OperationId>,
    reports: HashMap<OperationId, Report>,
    backups: Vec<BackupRecord>,
    restores: Vec<RestoreRecord>,
    logs: HashMap<OperationId, CursorScript>,
    faults: HashMap<SourceCall, Fault>,
    calls: [AtomicUsize; 7],
    closes: Arc<AtomicUsize>,
}

impl InMemorySource {
    /// Empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named command.
    #[must_use]
    pub fn with_command(mut self, name: &str, id: &str) -> Self {
        self.commands.insert(name.to_string(), OperationId::from(id));
        self
    }

    /// Register the report of a command.
    #[must_use]
    pub fn with_report(mut self, id: &str, report: Report) -> Self {
        self.reports.insert(OperationId::from(id), report);
        self
    }

    /// Register backup metadata.
    #[must_use]
    pub fn with_backup(mut self, record: BackupRecord) -> Self {
        self.backups.push(record);
        self
    }

    /// Register restore metadata.
    #[must_use]
    pub fn with_restore(mut self, record: RestoreRecord) -> Self {
        self.restores.push(record);
        self
    }

    /// Register a clean log stream for an operation.
    #[must_use]
    pub fn with_log(self, id: &str, records: Vec<LogRecord>) -> Self {
        self.with_log_script(id, CursorScript::records(records))
    }

    /// Register an arbitrary log script for an operation.
    #[must_use]
    pub fn with_log_script(mut self, id: &str, script: CursorScript) -> Self {
        self.logs.insert(OperationId::from(id), script);
        self
    }

    /// Make every invocation of `call` fail with `fault`.
    #[must_use]
    pub fn with_fault(mut self, call: SourceCall, fault: Fault) -> Self {
        self.faults.insert(call, fault);
        self
    }

    /// Number of times `call` was invoked.
    #[must_use]
    pub fn calls(&self, call: SourceCall) -> usize {
        self.calls[call.index()].load(Ordering::SeqCst)
    }

    /// Number of collaborator invocations of any kind.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        SourceCall::ALL.iter().map(|call| self.calls(*call)).sum()
    }

    /// Number of cursors closed so far.
    #[must_use]
    pub fn cursors_closed(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn enter(&self, call: SourceCall, key: &str) -> BackendResult<()> {
        self.calls[call.index()].fetch_add(1, Ordering::SeqCst);
        match self.faults.get(&call) {
            Some(fault) => Err(fault.to_error(call.operation(), key)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DiagnosticSource for InMemorySource {
    async fn resolve_id_by_name(&self, name: &str) -> BackendResult<OperationId> {
        self.enter(SourceCall::ResolveIdByName, name)?;
        self.commands
            .get(name)
            .cloned()
            .ok_or_else(|| BackendError::not_found("command", name))
    }

    async fn fetch_report(&self, id: &OperationId) -> BackendResult<Report> {
        self.enter(SourceCall::FetchReport, id.as_str())?;
        self.reports
            .get(id)
            .cloned()
            .ok_or_else(|| BackendError::not_found("command", id.as_str()))
    }

    async fn fetch_backup_by_id(
        &self,
        id: &OperationId,
        _options: BackupFetchOptions,
    ) -> BackendResult<BackupRecord> {
        self.enter(SourceCall::FetchBackupById, id.as_str())?;
        self.backups
            .iter()
            .find(|record| record.opid == id.as_str())
            .cloned()
            .ok_or_else(|| BackendError::not_found("backup", id.as_str()))
    }

    async fn fetch_backup_by_name(
        &self,
        name: &str,
        _options: BackupFetchOptions,
    ) -> BackendResult<BackupRecord> {
        self.enter(SourceCall::FetchBackupByName, name)?;
        self.backups
            .iter()
            .find(|record| record.name == name)
            .cloned()
            .ok_or_else(|| BackendError::not_found("backup", name))
    }

    async fn fetch_restore_by_id(&self, id: &OperationId) -> BackendResult<RestoreRecord> {
        self.enter(SourceCall::FetchRestoreById, id.as_str())?;
        self.restores
            .iter()
            .find(|record| record.opid == id.as_str())
            .cloned()
            .ok_or_else(|| BackendError::not_found("restore", id.as_str()))
    }

    async fn fetch_restore_by_name(&self, name: &str) -> BackendResult<RestoreRecord> {
        self.enter(SourceCall::FetchRestoreByName, name)?;
        self.restores
            .iter()
            .find(|record| record.name == name)
            .cloned()
            .ok_or_else(|| BackendError::not_found("restore", name))
    }

    async fn open_log_cursor(&self, id: &OperationId) -> BackendResult<Box<dyn LogCursor>> {
        self.enter(SourceCall::OpenLogCursor, id.as_str())?;
        let script = self.logs.get(id).cloned().unwrap_or_default();
        Ok(Box::new(ScriptedCursor::new(
            script,
            Arc::clone(&self.closes),
        )))
    }
}
