use std::sync::Mutex;

use tracing::{error, info};

/// Fire-and-forget user notifications
pub trait Notifier: Send + Sync {
    fn notify_info(&self, message: &str);

    fn notify_error(&self, message: &str);
}

/// Default notifier: messages go to the log
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify_info(&self, message: &str) {
        info!(target: "mlndash::notify", "{}", message);
    }

    fn notify_error(&self, message: &str) {
        error!(target: "mlndash::notify", "{}", message);
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Notification {
    Info(String),
    Error(String),
}

/// Keeps every notification in order, for tests
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    entries: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<Notification> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter_map(|n| match n {
                Notification::Error(message) => Some(message),
                Notification::Info(_) => None,
            })
            .collect()
    }

    fn record(&self, notification: Notification) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(notification);
    }
}

impl Notifier for RecordingNotifier {
    fn notify_info(&self, message: &str) {
        self.record(Notification::Info(message.to_string()));
    }

    fn notify_error(&self, message: &str) {
        self.record(Notification::Error(message.to_string()));
    }
}
