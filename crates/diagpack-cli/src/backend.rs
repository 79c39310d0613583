//! HTTP implementation of the diagnostic source.

use async_trait::async_trait;
use diagpack_core::{
    BackendError, BackendResult, BackupFetchOptions, BackupRecord, DiagnosticSource, LogCursor,
    LogRecord, OperationId, Report, RestoreRecord,
};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

#[derive(Debug, Deserialize)]
struct CommandLookup {
    opid: OperationId,
}

/// Diagnostic source backed by the service's REST surface.
#[derive(Clone)]
pub(crate) struct HttpDiagnosticSource {
    client: Client,
    base_url: Url,
}

impl HttpDiagnosticSource {
    pub(crate) const fn new(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    fn endpoint(&self, operation: &'static str, segments: &[&str]) -> BackendResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| BackendError::transport(operation, "API URL cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get(
        &self,
        operation: &'static str,
        resource: &'static str,
        key: &str,
        url: Url,
    ) -> BackendResult<Response> {
        debug!(operation, url = %url, "backend request");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| BackendError::transport(operation, err))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(BackendError::not_found(resource, key));
        }
        if !status.is_success() {
            return Err(BackendError::Status {
                operation,
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn get_json<T>(
        &self,
        operation: &'static str,
        resource: &'static str,
        key: &str,
        url: Url,
    ) -> BackendResult<T>
    where
        T: DeserializeOwned,
    {
        let bytes = self
            .get(operation, resource, key, url)
            .await?
            .bytes()
            .await
            .map_err(|err| BackendError::transport(operation, err))?;
        serde_json::from_slice(&bytes).map_err(|source| BackendError::Decode { operation, source })
    }

    async fn fetch_backup(
        &self,
        operation: &'static str,
        segments: &[&str],
        key: &str,
        options: BackupFetchOptions,
    ) -> BackendResult<BackupRecord> {
        let mut url = self.endpoint(operation, segments)?;
        url.query_pairs_mut()
            .append_pair("increments", bool_param(options.fetch_increments))
            .append_pair("filelist", bool_param(options.fetch_filelist));
        self.get_json(operation, "backup", key, url).await
    }
}

const fn bool_param(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

#[async_trait]
impl DiagnosticSource for HttpDiagnosticSource {
    async fn resolve_id_by_name(&self, name: &str) -> BackendResult<OperationId> {
        let operation = "resolve_id_by_name";
        let mut url = self.endpoint(operation, &["v1", "commands"])?;
        url.query_pairs_mut().append_pair("name", name);
        let lookup: CommandLookup = self.get_json(operation, "command", name, url).await?;
        Ok(lookup.opid)
    }

    async fn fetch_report(&self, id: &OperationId) -> BackendResult<Report> {
        let operation = "fetch_report";
        let url = self.endpoint(operation, &["v1", "commands", id.as_str(), "report"])?;
        self.get_json(operation, "command", id.as_str(), url).await
    }

    async fn fetch_backup_by_id(
        &self,
        id: &OperationId,
        options: BackupFetchOptions,
    ) -> BackendResult<BackupRecord> {
        self.fetch_backup(
            "fetch_backup_by_id",
            &["v1", "backups", "by-opid", id.as_str()],
            id.as_str(),
            options,
        )
        .await
    }

    async fn fetch_backup_by_name(
        &self,
        name: &str,
        options: BackupFetchOptions,
    ) -> BackendResult<BackupRecord> {
        self.fetch_backup("fetch_backup_by_name", &["v1", "backups", name], name, options)
            .await
    }

    async fn fetch_restore_by_id(&self, id: &OperationId) -> BackendResult<RestoreRecord> {
        let operation = "fetch_restore_by_id";
        let url = self.endpoint(operation, &["v1", "restores", "by-opid", id.as_str()])?;
        self.get_json(operation, "restore", id.as_str(), url).await
    }

    async fn fetch_restore_by_name(&self, name: &str) -> BackendResult<RestoreRecord> {
        let operation = "fetch_restore_by_name";
        let url = self.endpoint(operation, &["v1", "restores", name])?;
        self.get_json(operation, "restore", name, url).await
    }

    async fn open_log_cursor(&self, id: &OperationId) -> BackendResult<Box<dyn LogCursor>> {
        let operation = "open_log_cursor";
        let url = self.endpoint(operation, &["v1", "commands", id.as_str(), "logs"])?;
        let response = self.get(operation, "command", id.as_str(), url).await?;
        Ok(Box::new(HttpLogCursor::new(response)))
    }
}

/// Cursor over a newline-delimited JSON log stream.
///
/// The body is read chunk by chunk; only the bytes of the line being
/// assembled are buffered. Lines are kept as raw bytes so malformed UTF-8
/// surfaces as a decode failure.
pub(crate) struct HttpLogCursor {
    response: Option<Response>,
    buffer: Vec<u8>,
    /// Start of the first unconsumed line in `buffer`.
    start: usize,
    /// Bytes before this offset are known to hold no newline.
    scanned: usize,
    current: Option<Vec<u8>>,
    terminal: Option<BackendError>,
    exhausted: bool,
    lines: usize,
}

impl HttpLogCursor {
    fn new(response: Response) -> Self {
        Self::from_parts(Some(response), Vec::new())
    }

    fn from_parts(response: Option<Response>, buffer: Vec<u8>) -> Self {
        Self {
            response,
            buffer,
            start: 0,
            scanned: 0,
            current: None,
            terminal: None,
            exhausted: false,
            lines: 0,
        }
    }

    fn next_complete_line(&mut self) -> Option<Vec<u8>> {
        while let Some(offset) = self.buffer[self.scanned..]
            .iter()
            .position(|byte| *byte == b'\n')
        {
            let end = self.scanned + offset;
            let line = non_blank(&self.buffer[self.start..end]);
            self.start = end + 1;
            self.scanned = self.start;
            if line.is_some() {
                return line;
            }
        }
        self.scanned = self.buffer.len();
        self.compact();
        None
    }

    fn compact(&mut self) {
        if self.start > 0 {
            self.buffer.drain(..self.start);
            self.scanned -= self.start;
            self.start = 0;
        }
    }

    fn take_remainder(&mut self) -> Option<Vec<u8>> {
        let line = non_blank(&self.buffer[self.start..]);
        self.reset_buffer();
        line
    }

    fn reset_buffer(&mut self) {
        self.buffer.clear();
        self.start = 0;
        self.scanned = 0;
    }

    async fn fill(&mut self) {
        let Some(response) = self.response.as_mut() else {
            self.exhausted = true;
            return;
        };
        match response.chunk().await {
            Ok(Some(chunk)) => self.buffer.extend_from_slice(&chunk),
            Ok(None) => {
                self.exhausted = true;
                self.response = None;
            }
            Err(err) => {
                self.terminal = Some(BackendError::transport("read log stream", err));
                self.exhausted = true;
                self.response = None;
                self.reset_buffer();
            }
        }
    }
}

fn non_blank(raw: &[u8]) -> Option<Vec<u8>> {
    let line = raw.strip_suffix(b"\r").unwrap_or(raw);
    if line.trim_ascii().is_empty() {
        None
    } else {
        Some(line.to_vec())
    }
}

#[async_trait]
impl LogCursor for HttpLogCursor {
    async fn advance(&mut self) -> bool {
        loop {
            if let Some(line) = self.next_complete_line() {
                self.current = Some(line);
                self.lines += 1;
                return true;
            }
            if self.exhausted {
                self.current = self.take_remainder();
                if self.current.is_some() {
                    self.lines += 1;
                }
                return self.current.is_some();
            }
            self.fill().await;
        }
    }

    fn decode(&self) -> BackendResult<LogRecord> {
        let line = self
            .current
            .as_deref()
            .ok_or_else(|| BackendError::not_found("log_record", "cursor position"))?;
        serde_json::from_slice(line).map_err(|source| BackendError::Decode {
            operation: "decode log record",
            source,
        })
    }

    fn terminal_error(&mut self) -> Option<BackendError> {
        self.terminal.take()
    }

    async fn close(&mut self) {
        debug!(lines = self.lines, "closing log stream");
        self.response = None;
        self.reset_buffer();
        self.current = None;
    }
}
