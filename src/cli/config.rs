//! Configuration file
//!
//! One JSON document, read once per invocation. Omitted optional fields
//! take the defaults below; `validate` rejects anything the pipeline could
//! not run with, before any check or probe executes.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::errors::{CliError, CliResult};
use crate::audit::{LogAuditor, DEFAULT_BENIGN_PATTERN};
use crate::context::{AuditScope, EngineSettings, RunContext};
use crate::notify::{EmailConfig, MailTransport};

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Host allowed to run destructive steps (required)
    pub expected_host: String,

    /// Directory holding the dumps (required)
    pub backup_dir: PathBuf,

    /// Substring identifying this database's dumps (required)
    pub dump_suffix: String,

    /// Database the dump recreates (required)
    pub database: String,

    /// Parallel restore workers (optional, default 1)
    #[serde(default = "default_restore_jobs")]
    pub restore_jobs: u32,

    /// Restore time limit in seconds (optional, default unbounded)
    #[serde(default)]
    pub restore_timeout_secs: Option<u64>,

    /// Engine location (required)
    pub engine: EngineSection,

    /// Run log location (required)
    pub run_log: RunLogSection,

    /// Engine log audit (optional)
    #[serde(default)]
    pub audit: AuditSection,

    /// Operator notifications (optional, default disabled)
    #[serde(default)]
    pub notify: NotifySection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSection {
    /// Client binary directory; `PATH` when absent
    #[serde(default)]
    pub bin_dir: Option<PathBuf>,
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default = "default_maintenance_db")]
    pub maintenance_db: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunLogSection {
    pub dir: PathBuf,
    #[serde(default = "default_run_log_prefix")]
    pub prefix: String,
    #[serde(default = "default_retain")]
    pub retain: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSection {
    /// "since_restore" or "full"
    #[serde(default = "default_audit_scope")]
    pub scope: String,
    #[serde(default = "default_benign")]
    pub benign: Vec<String>,
}

impl Default for AuditSection {
    fn default() -> Self {
        Self {
            scope: default_audit_scope(),
            benign: default_benign(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifySection {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub recipient: String,
    #[serde(default = "default_from_email")]
    pub from_email: String,
    #[serde(default = "default_from_name")]
    pub from_name: String,
    /// "smtp" or "sendmail"
    #[serde(default = "default_transport")]
    pub transport: String,
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_user: String,
    #[serde(default)]
    pub smtp_password: String,
    #[serde(default)]
    pub sendmail_command: Option<PathBuf>,
}

impl Default for NotifySection {
    fn default() -> Self {
        Self {
            enabled: false,
            recipient: String::new(),
            from_email: default_from_email(),
            from_name: default_from_name(),
            transport: default_transport(),
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            smtp_user: String::new(),
            smtp_password: String::new(),
            sendmail_command: None,
        }
    }
}

fn default_restore_jobs() -> u32 {
    1
}
fn default_maintenance_db() -> String {
    "postgres".to_string()
}
fn default_run_log_prefix() -> String {
    "restore_verify".to_string()
}
fn default_retain() -> usize {
    7
}
fn default_audit_scope() -> String {
    AuditScope::SinceRestore.as_str().to_string()
}
fn default_benign() -> Vec<String> {
    vec![DEFAULT_BENIGN_PATTERN.to_string()]
}
fn default_from_email() -> String {
    "restore-verify@localhost".to_string()
}
fn default_from_name() -> String {
    "restore-verify".to_string()
}
fn default_transport() -> String {
    "smtp".to_string()
}
fn default_smtp_host() -> String {
    "localhost".to_string()
}
fn default_smtp_port() -> u16 {
    25
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CliError::config_error(format!("Failed to read config {}: {}", path.display(), e))
        })?;

        Self::parse(&content)
    }

    /// Parse and validate a configuration document
    pub fn parse(content: &str) -> CliResult<Self> {
        let config: Config = serde_json::from_str(content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        for (name, value) in [
            ("expected_host", &self.expected_host),
            ("dump_suffix", &self.dump_suffix),
            ("database", &self.database),
            ("run_log.prefix", &self.run_log.prefix),
            ("engine.maintenance_db", &self.engine.maintenance_db),
        ] {
            if value.trim().is_empty() {
                return Err(CliError::config_error(format!("{} must not be empty", name)));
            }
        }

        if self.restore_jobs == 0 {
            return Err(CliError::config_error("restore_jobs must be >= 1"));
        }

        if self.restore_timeout_secs == Some(0) {
            return Err(CliError::config_error("restore_timeout_secs must be > 0"));
        }

        if self.run_log.retain == 0 {
            return Err(CliError::config_error("run_log.retain must be >= 1"));
        }

        self.audit_scope()?;

        if self.audit.benign.iter().any(|p| p.trim().is_empty()) {
            return Err(CliError::config_error(
                "audit.benign patterns must be non-empty strings",
            ));
        }
        LogAuditor::new(self.audit.benign.as_slice())
            .map_err(|e| CliError::config_error(format!("Invalid audit.benign pattern: {}", e)))?;

        if self.notify.enabled && self.notify.recipient.trim().is_empty() {
            return Err(CliError::config_error(
                "notify.recipient is required when notifications are enabled",
            ));
        }

        self.mail_transport()?;

        Ok(())
    }

    fn audit_scope(&self) -> CliResult<AuditScope> {
        AuditScope::parse(&self.audit.scope).ok_or_else(|| {
            CliError::config_error(format!(
                "Invalid audit.scope: '{}'. Must be 'since_restore' or 'full'.",
                self.audit.scope
            ))
        })
    }

    fn mail_transport(&self) -> CliResult<MailTransport> {
        match self.notify.transport.as_str() {
            "smtp" => Ok(MailTransport::Smtp {
                host: self.notify.smtp_host.clone(),
                port: self.notify.smtp_port,
                user: self.notify.smtp_user.clone(),
                password: self.notify.smtp_password.clone(),
            }),
            "sendmail" => Ok(MailTransport::Sendmail {
                command: self.notify.sendmail_command.clone(),
            }),
            other => Err(CliError::config_error(format!(
                "Invalid notify.transport: '{}'. Must be 'smtp' or 'sendmail'.",
                other
            ))),
        }
    }

    /// Build the run context for the machine identified as `actual_host`
    pub fn to_context(&self, actual_host: impl Into<String>) -> CliResult<RunContext> {
        Ok(RunContext {
            actual_host: actual_host.into(),
            expected_host: self.expected_host.clone(),
            backup_dir: self.backup_dir.clone(),
            dump_suffix: self.dump_suffix.clone(),
            database: self.database.clone(),
            restore_jobs: self.restore_jobs,
            restore_timeout: self.restore_timeout_secs.map(Duration::from_secs),
            engine: EngineSettings {
                bin_dir: self.engine.bin_dir.clone(),
                data_dir: self.engine.data_dir.clone(),
                log_dir: self.engine.log_dir.clone(),
                port: self.engine.port,
                user: self.engine.user.clone(),
                maintenance_db: self.engine.maintenance_db.clone(),
            },
            run_log_dir: self.run_log.dir.clone(),
            run_log_prefix: self.run_log.prefix.clone(),
            log_retention: self.run_log.retain,
            notify_recipient: self.notify.recipient.clone(),
            notify_enabled: self.notify.enabled,
            audit_scope: self.audit_scope()?,
            benign_patterns: self.audit.benign.clone(),
        })
    }

    /// Mail settings for the notifier
    pub fn email_config(&self) -> CliResult<EmailConfig> {
        Ok(EmailConfig {
            from_email: self.notify.from_email.clone(),
            from_name: self.notify.from_name.clone(),
            recipient: self.notify.recipient.clone(),
            transport: self.mail_transport()?,
        })
    }
}
