//! Dump selection
//!
//! Backups are directory-format dumps named `YYYYMMDD_<suffix>` under one
//! backup directory. The selector keeps every entry whose name contains the
//! suffix and picks the one that sorts last by full path. Because names
//! start with a fixed-width date, that is the most recent dump.
//!
//! Selection looks only at the directory as it is at call time.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::preflight::{PreconditionError, PreconditionResult};
use crate::stats::disk_usage;

/// A dump chosen for restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpArtifact {
    path: PathBuf,
}

impl DumpArtifact {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Full path of the dump
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Final path component
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Date encoded in the leading `YYYYMMDD` of the name, if any
    pub fn date(&self) -> Option<NaiveDate> {
        let name = self.name();
        let prefix = name.get(..8)?;
        if !prefix.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        NaiveDate::parse_from_str(prefix, "%Y%m%d").ok()
    }

    /// On-disk size, measured when asked
    pub fn size(&self) -> io::Result<u64> {
        disk_usage(&self.path)
    }
}

/// List entries of `backup_dir` whose name contains `suffix`, sorted by path.
pub fn matching_dumps(backup_dir: &Path, suffix: &str) -> io::Result<Vec<PathBuf>> {
    let mut matches = Vec::new();

    for entry in fs::read_dir(backup_dir)? {
        let entry = entry?;
        if entry.file_name().to_string_lossy().contains(suffix) {
            matches.push(entry.path());
        }
    }

    matches.sort();
    Ok(matches)
}

/// Pick the most recent dump matching `suffix`.
pub fn select_latest(backup_dir: &Path, suffix: &str) -> PreconditionResult<DumpArtifact> {
    let mut matches =
        matching_dumps(backup_dir, suffix).map_err(|e| PreconditionError::PathUnavailable {
            path: backup_dir.to_path_buf(),
            detail: e.to_string(),
        })?;

    matches
        .pop()
        .map(DumpArtifact::new)
        .ok_or_else(|| PreconditionError::NoDumpMatch {
            backup_dir: backup_dir.to_path_buf(),
            suffix: suffix.to_string(),
        })
}
