//! Run context
//!
//! Everything a verification run needs to know, resolved once before the
//! first stage executes and shared by reference afterwards. Nothing in the
//! pipeline mutates it.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

/// Which part of the engine log the post-restore audit reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuditScope {
    /// Only what was written after the restore started
    #[default]
    SinceRestore,
    /// Every file under the log directory, in full
    Full,
}

impl AuditScope {
    /// Parse the configuration spelling
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "since_restore" => Some(AuditScope::SinceRestore),
            "full" => Some(AuditScope::Full),
            _ => None,
        }
    }

    /// Returns the configuration spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditScope::SinceRestore => "since_restore",
            AuditScope::Full => "full",
        }
    }
}

/// Where the database engine lives on the recovery host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Directory holding the engine client binaries (`pg_ctl`, `psql`, ...).
    /// `None` resolves binaries through `PATH`.
    pub bin_dir: Option<PathBuf>,
    /// Engine data directory (the cluster)
    pub data_dir: PathBuf,
    /// Directory the engine writes its logs to
    pub log_dir: PathBuf,
    /// Port override
    pub port: Option<u16>,
    /// Connection user override
    pub user: Option<String>,
    /// Database used as the connection target for `CREATE DATABASE` during restore
    pub maintenance_db: String,
}

/// Immutable configuration of one verification run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    /// Identity of the machine this process runs on
    pub actual_host: String,
    /// Identity of the machine allowed to run destructive steps
    pub expected_host: String,
    /// Directory holding `YYYYMMDD_<suffix>` dumps
    pub backup_dir: PathBuf,
    /// Substring a dump name must contain
    pub dump_suffix: String,
    /// Database the dump recreates and cleanup drops
    pub database: String,
    /// Worker count passed to the restore
    pub restore_jobs: u32,
    /// Bound on the restore invocation
    pub restore_timeout: Option<Duration>,
    /// Engine location
    pub engine: EngineSettings,
    /// Directory of the daily run log files
    pub run_log_dir: PathBuf,
    /// File name prefix of the daily run log files
    pub run_log_prefix: String,
    /// Number of daily run log files kept
    pub log_retention: usize,
    /// Operator address
    pub notify_recipient: String,
    /// Whether notifications are delivered at all
    pub notify_enabled: bool,
    /// Audit window
    pub audit_scope: AuditScope,
    /// Case-insensitive patterns whose lines the audit ignores
    pub benign_patterns: Vec<String>,
}

impl RunContext {
    /// Directories that must exist and be readable before anything else runs
    pub fn required_paths(&self) -> Vec<PathBuf> {
        vec![
            self.engine.data_dir.clone(),
            self.engine.log_dir.clone(),
            self.backup_dir.clone(),
            self.run_log_dir.clone(),
        ]
    }
}

/// Resolve the identity of the local machine.
///
/// Reads the kernel hostname where available and falls back to the
/// `hostname` binary.
pub fn resolve_hostname() -> io::Result<String> {
    if let Ok(name) = fs::read_to_string("/proc/sys/kernel/hostname") {
        let name = name.trim();
        if !name.is_empty() {
            return Ok(name.to_string());
        }
    }

    let output = Command::new("hostname").output()?;
    if !output.status.success() {
        return Err(io::Error::new(
            io::ErrorKind::Other,
            format!("hostname exited with {}", output.status),
        ));
    }

    let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if name.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "hostname returned an empty name",
        ));
    }

    Ok(name)
}
