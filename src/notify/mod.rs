//! notify
//!
//! User-facing notifications.
//!
//! # Design
//!
//! The core never blocks on notification delivery: [`NotificationSink::show`]
//! is fire-and-forget. The CLI wires in [`LogNotifier`]; tests use
//! [`CollectingNotifier`] to assert on what would have been shown.

use std::sync::Mutex;

/// How serious a notification is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A recorded notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub severity: Severity,
}

/// Fire-and-forget notification delivery.
pub trait NotificationSink: Send + Sync {
    fn show(&self, title: &str, body: &str, severity: Severity);
}

/// Routes notifications to the log.
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn show(&self, title: &str, body: &str, severity: Severity) {
        match severity {
            Severity::Info => log::info!("{}: {}", title, body),
            Severity::Warning => log::warn!("{}: {}", title, body),
            Severity::Error => log::error!("{}: {}", title, body),
        }
    }
}

/// Records notifications for assertions in tests.
#[derive(Default)]
pub struct CollectingNotifier {
    notes: Mutex<Vec<Notification>>,
}

impl CollectingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notes.lock().expect("notifier lock poisoned").clone()
    }

    pub fn titles(&self) -> Vec<String> {
        self.notifications().into_iter().map(|n| n.title).collect()
    }
}

impl NotificationSink for CollectingNotifier {
    fn show(&self, title: &str, body: &str, severity: Severity) {
        self.notes.lock().expect("notifier lock poisoned").push(Notification {
            title: title.to_string(),
            body: body.to_string(),
            severity,
        });
    }
}
