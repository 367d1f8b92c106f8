//! Email delivery through `lettre`

use std::path::PathBuf;

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SendmailTransport, SmtpTransport, Transport};

use super::{Notification, Notifier, NotifyError, NotifyResult};

/// How mail leaves the recovery host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailTransport {
    /// SMTP relay; plain connection when no user is given
    Smtp {
        host: String,
        port: u16,
        user: String,
        password: String,
    },
    /// Local sendmail-compatible binary
    Sendmail { command: Option<PathBuf> },
}

/// Email configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailConfig {
    /// From address
    pub from_email: String,
    /// From display name
    pub from_name: String,
    /// Operator address
    pub recipient: String,
    /// Delivery path
    pub transport: MailTransport,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            from_email: "restore-verify@localhost".to_string(),
            from_name: "restore-verify".to_string(),
            recipient: "root@localhost".to_string(),
            transport: MailTransport::Smtp {
                host: "localhost".to_string(),
                port: 25,
                user: String::new(),
                password: String::new(),
            },
        }
    }
}

/// Sends notifications as plain-text email
pub struct EmailNotifier {
    config: EmailConfig,
}

impl EmailNotifier {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn build_message(&self, notification: &Notification) -> NotifyResult<Message> {
        let from: Mailbox = format!("{} <{}>", self.config.from_name, self.config.from_email)
            .parse()
            .map_err(|e| NotifyError::InvalidAddress(format!("from: {}", e)))?;
        let to: Mailbox = self
            .config
            .recipient
            .parse()
            .map_err(|e| NotifyError::InvalidAddress(format!("to: {}", e)))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(notification.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(notification.body.clone())
            .map_err(|e| NotifyError::Build(e.to_string()))
    }
}

impl Notifier for EmailNotifier {
    fn send(&self, notification: &Notification) -> NotifyResult<()> {
        let email = self.build_message(notification)?;

        match &self.config.transport {
            MailTransport::Smtp {
                host,
                port,
                user,
                password,
            } => {
                let mailer = if user.is_empty() {
                    SmtpTransport::builder_dangerous(host).port(*port).build()
                } else {
                    let creds = Credentials::new(user.clone(), password.clone());
                    SmtpTransport::relay(host)
                        .map_err(|e| NotifyError::Transport(format!("SMTP relay error: {}", e)))?
                        .credentials(creds)
                        .port(*port)
                        .build()
                };

                mailer
                    .send(&email)
                    .map_err(|e| NotifyError::Transport(e.to_string()))?;
            }
            MailTransport::Sendmail { command } => {
                let mailer = match command {
                    Some(command) => SendmailTransport::new_with_command(command.as_os_str()),
                    None => SendmailTransport::new(),
                };

                mailer
                    .send(&email)
                    .map_err(|e| NotifyError::Transport(e.to_string()))?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification() -> Notification {
        Notification::new(
            "[restore-verify] recovery01: SUCCESS",
            "host: recovery01\ndump: /backups/20180329_test_db\n",
        )
    }

    #[test]
    fn test_message_builds_with_valid_addresses() {
        let notifier = EmailNotifier::new(EmailConfig {
            recipient: "dba@example.com".into(),
            ..EmailConfig::default()
        });

        let message = notifier.build_message(&notification()).unwrap();
        let formatted = String::from_utf8(message.formatted()).unwrap();
        assert!(formatted.contains("dba@example.com"));
        assert!(formatted.contains("Subject: [restore-verify] recovery01: SUCCESS"));
    }

    #[test]
    fn test_invalid_recipient_is_rejected() {
        let notifier = EmailNotifier::new(EmailConfig {
            recipient: "not an address".into(),
            ..EmailConfig::default()
        });

        let err = notifier.build_message(&notification()).unwrap_err();
        assert!(matches!(err, NotifyError::InvalidAddress(_)));
    }

    #[test]
    fn test_unreachable_sendmail_is_transport_error() {
        let notifier = EmailNotifier::new(EmailConfig {
            recipient: "dba@example.com".into(),
            transport: MailTransport::Sendmail {
                command: Some(PathBuf::from("/nonexistent/sendmail")),
            },
            ..EmailConfig::default()
        });

        let err = notifier.send(&notification()).unwrap_err();
        assert!(matches!(err, NotifyError::Transport(_)));
    }
}
