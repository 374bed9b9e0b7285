//! User-visible notifications raised by queries and mutations.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
    Success,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationAction {
    /// The failed read can be refetched.
    Retry,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub action: Option<NotificationAction>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            action: None,
            created_at: Utc::now(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Error, message)
    }

    pub fn with_action(mut self, action: NotificationAction) -> Self {
        self.action = Some(action);
        self
    }
}

/// Receives notifications. Implementations must not block.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Bounded in-memory queue; the oldest notification is dropped when full.
#[derive(Clone)]
pub struct NotificationCenter {
    queue: Arc<Mutex<VecDeque<Notification>>>,
    capacity: usize,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new(64)
    }
}

impl NotificationCenter {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            queue: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Notification>> {
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Take every queued notification, oldest first.
    pub fn drain(&self) -> Vec<Notification> {
        self.lock().drain(..).collect()
    }

    pub fn latest(&self) -> Option<Notification> {
        self.lock().back().cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl Notifier for NotificationCenter {
    fn notify(&self, notification: Notification) {
        let mut queue = self.lock();
        if queue.len() == self.capacity {
            queue.pop_front();
        }
        queue.push_back(notification);
    }
}

/// Writes notifications to the log instead of queueing them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Error => tracing::error!(text = %notification.message, "Notification"),
            NotificationLevel::Warning => tracing::warn!(text = %notification.message, "Notification"),
            NotificationLevel::Info | NotificationLevel::Success => {
                tracing::info!(text = %notification.message, level = ?notification.level, "Notification")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_is_bounded() {
        let center = NotificationCenter::new(2);
        center.notify(Notification::new(NotificationLevel::Info, "one"));
        center.notify(Notification::success("two"));
        center.notify(Notification::error("three"));
        let drained: Vec<String> = center.drain().into_iter().map(|n| n.message).collect();
        assert_eq!(drained, vec!["two", "three"]);
        assert!(center.is_empty());
    }

    #[test]
    fn test_latest_does_not_consume() {
        let center = NotificationCenter::default();
        center.notify(Notification::success("saved"));
        assert_eq!(center.latest().map(|n| n.message).as_deref(), Some("saved"));
        assert_eq!(center.len(), 1);
    }

    #[test]
    fn test_log_notifier_handles_every_level() {
        let subscriber = tracing_subscriber::fmt().with_test_writer().finish();
        tracing::subscriber::with_default(subscriber, || {
            for level in [
                NotificationLevel::Info,
                NotificationLevel::Warning,
                NotificationLevel::Error,
                NotificationLevel::Success,
            ] {
                LogNotifier.notify(Notification::new(level, "Cash log saved"));
            }
        });
    }

    #[test]
    fn test_with_action() {
        let n = Notification::error("failed").with_action(NotificationAction::Retry);
        assert_eq!(n.action, Some(NotificationAction::Retry));
        assert_eq!(n.level, NotificationLevel::Error);
    }
}
