//! Recording notifier for tests

use std::cell::RefCell;

use super::{Notification, Notifier, NotifyError, NotifyResult};

/// Keeps every notification instead of delivering it
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    sent: RefCell<Vec<Notification>>,
    fail_with: Option<String>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose transport always fails
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            sent: RefCell::new(Vec::new()),
            fail_with: Some(reason.into()),
        }
    }

    /// Delivered notifications, in order
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.borrow().clone()
    }

    /// Number of delivered notifications
    pub fn sent_count(&self) -> usize {
        self.sent.borrow().len()
    }

    /// The most recent notification
    pub fn last(&self) -> Option<Notification> {
        self.sent.borrow().last().cloned()
    }

    /// Forget delivered notifications
    pub fn clear(&self) {
        self.sent.borrow_mut().clear();
    }
}

impl Notifier for MemoryNotifier {
    fn send(&self, notification: &Notification) -> NotifyResult<()> {
        if let Some(reason) = &self.fail_with {
            return Err(NotifyError::Transport(reason.clone()));
        }
        self.sent.borrow_mut().push(notification.clone());
        Ok(())
    }
}
