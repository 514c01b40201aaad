//! User notifications raised by the run flow.
//!
//! The orchestrator reports to a [`NotificationSink`] it is handed at
//! construction, instead of broadcasting process-wide events.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Capacity for the broadcast channel.
/// Toasts are short-lived; a receiver that falls this far behind only loses old ones.
const NOTIFICATION_CHANNEL_CAPACITY: usize = 64;

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Receives notifications from the run flow.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl NotificationSink for NullNotifier {
    fn notify(&self, _notification: Notification) {}
}

/// Fans notifications out to any number of subscribers.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<Notification>,
}

impl BroadcastNotifier {
    /// Create a notifier and its first receiver.
    pub fn new() -> (Self, broadcast::Receiver<Notification>) {
        let (tx, rx) = broadcast::channel(NOTIFICATION_CHANNEL_CAPACITY);
        (Self { tx }, rx)
    }

    /// Subscribe to notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }
}

impl NotificationSink for BroadcastNotifier {
    fn notify(&self, notification: Notification) {
        // No subscribers is not an error.
        let _ = self.tx.send(notification);
    }
}
