//! User-facing notifications.
//!
//! Recoverable failures are broadcast as dismissible notifications; nothing
//! here blocks the sender.

use serde::Serialize;
use tokio::sync::broadcast;

/// Default number of notifications buffered per subscriber.
pub const DEFAULT_CAPACITY: usize = 64;

/// Notification severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational.
    Info,
    /// Something degraded but work continues.
    Warning,
    /// An operation failed.
    Error,
}

/// A single notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Severity.
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
    /// Whether the user can dismiss it.
    pub dismissible: bool,
}

/// Broadcasts notifications to any number of subscribers.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Notifier {
    /// Create a notifier buffering `capacity` notifications per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to future notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    /// Publish a notification. Having no subscribers is not an error.
    pub fn publish(&self, severity: Severity, message: impl Into<String>) {
        let notification = Notification {
            severity,
            message: message.into(),
            dismissible: true,
        };
        match severity {
            Severity::Error => tracing::warn!("{}", notification.message),
            Severity::Warning | Severity::Info => tracing::debug!("{}", notification.message),
        }
        // No receivers is fine.
        let _ = self.tx.send(notification);
    }

    /// Publish an error notification.
    pub fn error(&self, message: impl Into<String>) {
        self.publish(Severity::Error, message);
    }

    /// Publish a warning notification.
    pub fn warning(&self, message: impl Into<String>) {
        self.publish(Severity::Warning, message);
    }

    /// Publish an informational notification.
    pub fn info(&self, message: impl Into<String>) {
        self.publish(Severity::Info, message);
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
