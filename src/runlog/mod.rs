//! Run log
//!
//! Operator-facing, append-only record of every run:
//! - One file per calendar day: `<prefix>_<YYYYMMDD>.log`
//! - One line per entry: `<timestamp> <SEVERITY>: <message>`
//! - Entries are never edited; old days are removed only by [`rotate`]

mod rotation;

pub use rotation::{daily_files, rotate};

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate};

use crate::observability::Severity;

/// Timestamp format of a run log line
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single run log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// When the entry was produced
    pub timestamp: DateTime<Local>,
    /// Entry severity
    pub severity: Severity,
    /// Free-form message
    pub message: String,
}

impl LogEntry {
    /// Create an entry stamped with the current local time
    pub fn now(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            severity,
            message: message.into(),
        }
    }

    /// Render to log lines.
    ///
    /// Multi-line messages become one prefixed line per message line so
    /// every line of the file keeps the `<timestamp> <SEVERITY>: ` shape.
    pub fn to_lines(&self) -> Vec<String> {
        let stamp = self.timestamp.format(TIMESTAMP_FORMAT);
        let mut lines: Vec<String> = self
            .message
            .lines()
            .map(|line| format!("{} {}: {}", stamp, self.severity, line))
            .collect();

        if lines.is_empty() {
            lines.push(format!("{} {}: ", stamp, self.severity));
        }

        lines
    }
}

/// Daily, append-only run log files in one directory.
#[derive(Debug, Clone)]
pub struct RunLog {
    dir: PathBuf,
    prefix: String,
}

impl RunLog {
    /// Create a run log writing into `dir`.
    ///
    /// Nothing is created until the first append.
    pub fn new(dir: impl AsRef<Path>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            prefix: prefix.into(),
        }
    }

    /// Path of the file for a given day
    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("{}_{}.log", self.prefix, date.format("%Y%m%d")))
    }

    /// Path of today's file
    pub fn current_path(&self) -> PathBuf {
        self.path_for(Local::now().date_naive())
    }

    /// Append an entry to the file of the entry's day.
    pub fn append(&self, entry: &LogEntry) -> io::Result<()> {
        let path = self.path_for(entry.timestamp.date_naive());
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;

        let mut buffer = String::new();
        for line in entry.to_lines() {
            buffer.push_str(&line);
            buffer.push('\n');
        }

        file.write_all(buffer.as_bytes())?;
        file.flush()
    }

    /// Keep the `retain` most recent daily files, removing the rest
    pub fn rotate(&self, retain: usize) -> io::Result<Vec<PathBuf>> {
        rotate(&self.dir, &self.prefix, retain)
    }
}
