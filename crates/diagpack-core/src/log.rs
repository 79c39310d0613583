//! Structured log records and their single-line text rendering.

use std::fmt::Write as _;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

const UTC_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
const LOCAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

/// Severity of a log record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    /// Unrecoverable failure.
    #[serde(rename = "F")]
    Fatal,
    /// Error.
    #[serde(rename = "E")]
    Error,
    /// Warning.
    #[serde(rename = "W")]
    Warning,
    /// Informational message.
    #[default]
    #[serde(rename = "I")]
    Info,
    /// Debug output.
    #[serde(rename = "D")]
    Debug,
}

impl Severity {
    /// Single-letter tag used in rendered lines.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fatal => "F",
            Self::Error => "E",
            Self::Warning => "W",
            Self::Info => "I",
            Self::Debug => "D",
        }
    }
}

/// One entry of an operation's log stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Unix timestamp in seconds.
    pub ts: i64,
    /// Record severity.
    #[serde(rename = "s", default)]
    pub severity: Severity,
    /// Replica set the emitting node belongs to.
    #[serde(rename = "rs", default)]
    pub replset: String,
    /// Emitting node.
    #[serde(default)]
    pub node: String,
    /// Event the record belongs to (e.g. `backup`).
    #[serde(rename = "e", default)]
    pub event: String,
    /// Object the event acts upon (e.g. a backup name).
    #[serde(rename = "eobj", default)]
    pub object: String,
    /// Operation the record belongs to.
    #[serde(default)]
    pub opid: String,
    /// Message text.
    #[serde(default)]
    pub msg: String,
}

/// Time zone used for rendered timestamps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimestampZone {
    /// Coordinated universal time, `Z` suffix.
    #[default]
    Utc,
    /// The host's local zone, numeric offset suffix.
    Local,
}

/// Rendering switches for [`LogRecord::render`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Zone used for the leading timestamp.
    pub zone: TimestampZone,
    /// Append `[replset/node]` after the timestamp.
    pub show_node: bool,
    /// Append the operation id to the event tag.
    pub show_opid: bool,
}

impl RenderOptions {
    /// Options used for diagnostic bundles: UTC with node and operation tags.
    #[must_use]
    pub const fn diagnostic() -> Self {
        Self {
            zone: TimestampZone::Utc,
            show_node: true,
            show_opid: true,
        }
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::diagnostic()
    }
}

impl LogRecord {
    /// Render the record as one line of text, without a trailing newline.
    #[must_use]
    pub fn render(&self, options: RenderOptions) -> String {
        let mut line = self.format_timestamp(options.zone);

        if options.show_node {
            let _ = write!(line, " [{}/{}]", self.replset, self.node);
        }

        line.push(' ');
        line.push_str(self.severity.as_str());

        if !self.event.is_empty() || !self.object.is_empty() {
            let mut tags = Vec::with_capacity(3);
            if !self.event.is_empty() {
                tags.push(self.event.as_str());
            }
            if !self.object.is_empty() {
                tags.push(self.object.as_str());
            }
            if options.show_opid {
                tags.push(self.opid.as_str());
            }
            let _ = write!(line, " [{}]", tags.join("/"));
        }

        line.push(' ');
        line.push_str(&self.msg);
        line
    }

    fn format_timestamp(&self, zone: TimestampZone) -> String {
        let Some(utc) = DateTime::<Utc>::from_timestamp(self.ts, 0) else {
            return self.ts.to_string();
        };
        match zone {
            TimestampZone::Utc => utc.format(UTC_FORMAT).to_string(),
            TimestampZone::Local => utc.with_timezone(&Local).format(LOCAL_FORMAT).to_string(),
        }
    }
}
