//! Retention of daily run log files
//!
//! Files are recognized by name only (`<prefix>_<YYYYMMDD>.log`). Because
//! the date is embedded in a fixed-width form, name order is age order.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use regex::Regex;

fn daily_file_pattern(prefix: &str) -> io::Result<Regex> {
    Regex::new(&format!(r"^{}_\d{{8}}\.log$", regex::escape(prefix)))
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))
}

/// List the daily files of `prefix` in `dir`, oldest first.
pub fn daily_files(dir: &Path, prefix: &str) -> io::Result<Vec<PathBuf>> {
    let pattern = daily_file_pattern(prefix)?;
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }

        let name = entry.file_name();
        if pattern.is_match(&name.to_string_lossy()) {
            files.push(entry.path());
        }
    }

    files.sort();
    Ok(files)
}

/// Keep the `retain` most recent daily files and remove older ones.
///
/// Returns the removed paths. Stops at the first removal error; callers
/// treat rotation as best-effort.
pub fn rotate(dir: &Path, prefix: &str, retain: usize) -> io::Result<Vec<PathBuf>> {
    let files = daily_files(dir, prefix)?;
    if files.len() <= retain {
        return Ok(Vec::new());
    }

    let excess = files.len() - retain;
    let mut removed = Vec::with_capacity(excess);

    for path in files.into_iter().take(excess) {
        fs::remove_file(&path)?;
        removed.push(path);
    }

    Ok(removed)
}
