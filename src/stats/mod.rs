//! Size and timing statistics of a restore
//!
//! Sizes are gathered after the restore and rendered the way `du -h` shows
//! them. A size that cannot be measured is reported as `unknown`; it never
//! changes the outcome of a run.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::dump::DumpArtifact;

/// Placeholder for a value that could not be measured
pub const UNKNOWN: &str = "unknown";

const UNITS: [&str; 6] = ["B", "K", "M", "G", "T", "P"];

/// Statistics reported for a completed restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stats {
    /// On-disk size of the dump artifact
    pub dump_size: Option<u64>,
    /// On-disk size of the engine data directory after restore
    pub cluster_size: Option<u64>,
    /// From restore start to end of cleanup
    pub duration: Duration,
}

impl Stats {
    pub fn dump_size_display(&self) -> String {
        self.dump_size.map(format_size).unwrap_or_else(|| UNKNOWN.to_string())
    }

    pub fn cluster_size_display(&self) -> String {
        self.cluster_size
            .map(format_size)
            .unwrap_or_else(|| UNKNOWN.to_string())
    }

    pub fn duration_display(&self) -> String {
        format_duration(self.duration)
    }
}

/// A size that could not be measured
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not measure {what} at {}: {detail}", .path.display())]
pub struct StatsError {
    pub what: &'static str,
    pub path: PathBuf,
    pub detail: String,
}

/// Sizes gathered after a restore, with the failures encountered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SizeReport {
    pub dump_size: Option<u64>,
    pub cluster_size: Option<u64>,
    pub failures: Vec<StatsError>,
}

impl SizeReport {
    /// Combine with the final duration
    pub fn into_stats(self, duration: Duration) -> Stats {
        Stats {
            dump_size: self.dump_size,
            cluster_size: self.cluster_size,
            duration,
        }
    }
}

/// Measure the dump and the engine data directory.
pub fn measure(dump: &DumpArtifact, data_dir: &Path) -> SizeReport {
    let mut report = SizeReport::default();

    match dump.size() {
        Ok(size) => report.dump_size = Some(size),
        Err(e) => report.failures.push(StatsError {
            what: "dump size",
            path: dump.path().to_path_buf(),
            detail: e.to_string(),
        }),
    }

    match disk_usage(data_dir) {
        Ok(size) => report.cluster_size = Some(size),
        Err(e) => report.failures.push(StatsError {
            what: "cluster size",
            path: data_dir.to_path_buf(),
            detail: e.to_string(),
        }),
    }

    report
}

/// Total size of the regular files under `path`.
///
/// Symlinks are not followed and count as zero. Entries that disappear
/// while the tree is walked are skipped; a missing `path` is an error.
pub fn disk_usage(path: &Path) -> io::Result<u64> {
    let metadata = fs::symlink_metadata(path)?;
    if metadata.is_file() {
        return Ok(metadata.len());
    }
    if !metadata.is_dir() {
        return Ok(0);
    }

    let mut total = 0u64;
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        match disk_usage(&entry.path()) {
            Ok(size) => total += size,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }

    Ok(total)
}

/// Human-readable size, rounded up like `du -h` (`512B`, `1.5K`, `23M`).
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{}{}", bytes, UNITS[0]);
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if value < 10.0 {
        let rounded = (value * 10.0).ceil() / 10.0;
        if rounded < 10.0 {
            return format!("{:.1}{}", rounded, UNITS[unit]);
        }
        return format!("{}{}", rounded as u64, UNITS[unit]);
    }

    let rounded = value.ceil();
    if rounded >= 1024.0 && unit < UNITS.len() - 1 {
        return format!("1.0{}", UNITS[unit + 1]);
    }
    format!("{}{}", rounded as u64, UNITS[unit])
}

/// Elapsed time as `HH:MM:SS`; hours grow past 24 rather than wrapping.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}
