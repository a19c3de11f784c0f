use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::error::{CoreError, Result};
use crate::record::RecordId;

/// Durable classification of a record within a run.
///
/// `already_done` and `updated` are tallied in memory but never re-appended:
/// `already_done` rows are already durable from a prior run, and `updated`
/// rows reuse the `done` log with an update detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeCategory {
    Done,
    Error,
    Ignored,
}

impl OutcomeCategory {
    /// Header line written on first append to a category log.
    pub fn header(&self) -> &'static str {
        match self {
            Self::Done => "id|related|detail|recorded_at",
            Self::Error => "id|related|error_message|recorded_at",
            Self::Ignored => "id|related|ignored_reason|recorded_at",
        }
    }
}

impl std::fmt::Display for OutcomeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Done => write!(f, "done"),
            Self::Error => write!(f, "error"),
            Self::Ignored => write!(f, "ignored"),
        }
    }
}

/// One appended audit line: which record, any related identifiers (parent
/// patient key, remote object id, …), a human-readable detail, and when it
/// was recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeEntry {
    pub record_id: RecordId,
    pub related: Vec<String>,
    pub detail: String,
    #[serde(with = "time::serde::rfc3339")]
    pub recorded_at: OffsetDateTime,
}

impl OutcomeEntry {
    pub fn new(
        record_id: impl Into<RecordId>,
        related: Vec<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            record_id: record_id.into(),
            related,
            detail: detail.into(),
            recorded_at: OffsetDateTime::now_utc(),
        }
    }

    /// Serializes the entry as one pipe-delimited line (no trailing newline).
    ///
    /// Field layout: `id|related…|detail|recorded_at`. Pipes and newlines in
    /// the free-text fields are flattened so one entry is always one line.
    pub fn to_line(&self) -> String {
        let mut parts = Vec::with_capacity(self.related.len() + 3);
        parts.push(sanitize_field(self.record_id.as_str()));
        for related in &self.related {
            parts.push(sanitize_field(related));
        }
        parts.push(sanitize_field(&self.detail));
        parts.push(
            self.recorded_at
                .format(&Rfc3339)
                .unwrap_or_else(|_| self.recorded_at.unix_timestamp().to_string()),
        );
        parts.join("|")
    }

    /// Parses one log line back into an entry.
    ///
    /// A line is well-formed when it has at least `id|detail|recorded_at` and
    /// the trailing field is an RFC 3339 timestamp. Anything else (headers,
    /// partially written trailers) is rejected so readers can skip it.
    pub fn parse_line(line: &str) -> Result<Self> {
        let parts: Vec<&str> = line.split('|').collect();
        if parts.len() < 3 || parts[0].is_empty() {
            return Err(CoreError::malformed_line(line));
        }

        let recorded_at = OffsetDateTime::parse(parts[parts.len() - 1], &Rfc3339)
            .map_err(|_| CoreError::malformed_line(line))?;

        Ok(Self {
            record_id: RecordId::new(parts[0]),
            related: parts[1..parts.len() - 2]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            detail: parts[parts.len() - 2].to_string(),
            recorded_at,
        })
    }
}

fn sanitize_field(value: &str) -> String {
    value
        .replace(['\n', '\r'], " ")
        .replace('|', "/")
        .trim()
        .to_string()
}

/// Terminal classification returned by a processor's per-record step.
///
/// The closed set keeps unexpected error types from being swallowed: anything
/// that is not one of these is a [`RecordError`] and lands in the error log.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    /// Record was created downstream; detail carries the created reference.
    Created(String),
    /// Record already existed and was updated in place (update mode).
    Updated(String),
    /// Record was deliberately excluded; detail carries the reason.
    Ignored(String),
}

/// A per-record processing failure. Never propagates past the chunk
/// processor; it is recorded and the run continues.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct RecordError {
    pub message: String,
    pub related: Vec<String>,
}

impl RecordError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            related: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_related(mut self, related: impl Into<String>) -> Self {
        self.related.push(related.into());
        self
    }
}

impl From<String> for RecordError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for RecordError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Monotonic tallies of each outcome category.
///
/// At the end of a run `total()` equals the number of records submitted to
/// the dispatcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterTotals {
    pub done: u64,
    pub error: u64,
    pub ignored: u64,
    pub already_done: u64,
    pub updated: u64,
}

impl CounterTotals {
    pub fn total(&self) -> u64 {
        self.done + self.error + self.ignored + self.already_done + self.updated
    }
}
