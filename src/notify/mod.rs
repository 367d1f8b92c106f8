//! Operator notifications
//!
//! One plain-text message per terminal outcome, plus interim messages for
//! post-restore warnings. Delivery is fire-and-forget: failures are
//! reported to the caller, logged there, and never retried.

mod email;
mod memory;

pub use email::{EmailConfig, EmailNotifier, MailTransport};
pub use memory::MemoryNotifier;

use thiserror::Error;

/// A rendered message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
}

impl Notification {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
        }
    }
}

/// Notification delivery errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    /// Sender or recipient could not be parsed
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Message could not be assembled
    #[error("Failed to build message: {0}")]
    Build(String),

    /// Transport refused or failed to deliver
    #[error("Failed to send message: {0}")]
    Transport(String),
}

/// Result type for notification delivery
pub type NotifyResult<T> = Result<T, NotifyError>;

/// Delivers a notification to the configured recipient.
pub trait Notifier {
    fn send(&self, notification: &Notification) -> NotifyResult<()>;
}

impl<N: Notifier + ?Sized> Notifier for &N {
    fn send(&self, notification: &Notification) -> NotifyResult<()> {
        (**self).send(notification)
    }
}
