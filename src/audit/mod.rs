//! Post-restore engine log audit
//!
//! A restore can exit cleanly while the engine logs errors. The audit
//! scans every file under the engine log directory for lines containing
//! `ERROR`, `FATAL` or `PANIC` (case-sensitive), then drops lines matching
//! a benign pattern (case-insensitive, `autovacuum` by default).
//!
//! Findings are warnings. They are reported, but the run still proceeds to
//! stats and cleanup.
//!
//! # Scope
//!
//! A [`LogCursor`] taken before the restore records how long each log file
//! was. Scanning with that cursor reads only what was appended afterwards,
//! so errors from earlier runs are not reported again. Scanning without a
//! cursor reads every file in full.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use regex::{Regex, RegexBuilder};

/// Markers that make a line a finding
pub const ERROR_MARKERS: &str = "ERROR|FATAL|PANIC";

/// Benign pattern applied when none is configured
pub const DEFAULT_BENIGN_PATTERN: &str = "autovacuum";

/// One offending engine log line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditFinding {
    pub file: PathBuf,
    pub line: String,
}

impl fmt::Display for AuditFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.file.display(), self.line)
    }
}

/// Length of every log file at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogCursor {
    offsets: BTreeMap<PathBuf, u64>,
}

impl LogCursor {
    /// Record the current length of every file under `log_dir`
    pub fn capture(log_dir: &Path) -> io::Result<Self> {
        let mut offsets = BTreeMap::new();
        for path in log_files(log_dir)? {
            let len = fs::metadata(&path)?.len();
            offsets.insert(path, len);
        }
        Ok(Self { offsets })
    }

    /// Where to start reading `path`, given its current length.
    ///
    /// New files start at 0. A file shorter than recorded was rotated or
    /// truncated and is read from the start.
    pub fn start_offset(&self, path: &Path, current_len: u64) -> u64 {
        match self.offsets.get(path) {
            Some(&recorded) if recorded <= current_len => recorded,
            _ => 0,
        }
    }

    /// Number of files recorded
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

/// Every regular file under `dir`, recursively, sorted by path
pub fn log_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_files(dir, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_files(&entry.path(), files)?;
        } else if file_type.is_file() {
            files.push(entry.path());
        }
    }
    Ok(())
}

fn read_from(path: &Path, offset: u64) -> io::Result<String> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(offset))?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Classifies engine log lines and scans log trees.
#[derive(Debug, Clone)]
pub struct LogAuditor {
    markers: Regex,
    benign: Vec<Regex>,
}

impl LogAuditor {
    /// Build an auditor ignoring lines that match any of `benign_patterns`.
    pub fn new<S: AsRef<str>>(benign_patterns: &[S]) -> Result<Self, regex::Error> {
        let markers = Regex::new(ERROR_MARKERS)?;
        let benign = benign_patterns
            .iter()
            .map(|p| RegexBuilder::new(p.as_ref()).case_insensitive(true).build())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { markers, benign })
    }

    /// Whether a single line is a finding
    pub fn is_finding(&self, line: &str) -> bool {
        self.markers.is_match(line) && !self.benign.iter().any(|b| b.is_match(line))
    }

    /// Scan `log_dir`. With a cursor, only text written after it is read.
    pub fn scan(&self, log_dir: &Path, since: Option<&LogCursor>) -> io::Result<Vec<AuditFinding>> {
        let mut findings = Vec::new();

        for path in log_files(log_dir)? {
            let offset = match since {
                Some(cursor) => cursor.start_offset(&path, fs::metadata(&path)?.len()),
                None => 0,
            };

            let text = read_from(&path, offset)?;
            findings.extend(
                text.lines()
                    .filter(|line| self.is_finding(line))
                    .map(|line| AuditFinding {
                        file: path.clone(),
                        line: line.to_string(),
                    }),
            );
        }

        Ok(findings)
    }
}
