//! Bounded operator journal.
//!
//! This is the log the operator reads in the console, not process tracing.
//! Every append is mirrored to `tracing` under the `door_console::journal`
//! target so headless deployments keep a record too.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;

/// Maximum number of retained entries.
pub const LOG_CAPACITY: usize = 100;

/// Severity of a journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    /// Normal operational event.
    Info,
    /// Something the operator should notice.
    Error,
}

/// Represents a single journal entry. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    timestamp: DateTime<Local>,
    message: String,
    severity: Severity,
}

impl LogEntry {
    /// Wall-clock time of the append.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    /// Entry text.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Entry severity.
    #[must_use]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Whether this entry should be highlighted as an error.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.timestamp.format("%H:%M:%S"), self.message)
    }
}

/// A fixed-capacity, append-only journal. Oldest entries are evicted silently.
#[derive(Debug, Clone)]
pub struct Journal {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    revision: u64,
}

impl Default for Journal {
    fn default() -> Self {
        Self::new()
    }
}

impl Journal {
    /// Empty journal holding at most [`LOG_CAPACITY`] entries.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(LOG_CAPACITY)
    }

    /// Empty journal with a custom bound.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            revision: 0,
        }
    }

    /// Append an info entry.
    pub fn info(&mut self, message: impl Into<String>) {
        self.append(message, Severity::Info);
    }

    /// Append an error entry.
    pub fn error(&mut self, message: impl Into<String>) {
        self.append(message, Severity::Error);
    }

    /// Append an entry stamped with the local time, evicting from the head
    /// until the journal is back within capacity.
    pub fn append(&mut self, message: impl Into<String>, severity: Severity) {
        let message = message.into();

        match severity {
            Severity::Info => tracing::info!(target: "door_console::journal", "{}", message),
            Severity::Error => tracing::warn!(target: "door_console::journal", "{}", message),
        }

        self.entries.push_back(LogEntry {
            timestamp: Local::now(),
            message,
            severity,
        });
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        self.revision += 1;
    }

    /// Entries in insertion order, oldest first.
    pub fn entries(&self) -> impl DoubleEndedIterator<Item = &LogEntry> + ExactSizeIterator {
        self.entries.iter()
    }

    /// Most recent entry.
    #[must_use]
    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total appends since creation. Views scroll to the newest entry whenever it changes.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether any retained entry has exactly this text.
    #[must_use]
    pub fn contains(&self, message: &str) -> bool {
        self.entries.iter().any(|entry| entry.message == message)
    }
}
