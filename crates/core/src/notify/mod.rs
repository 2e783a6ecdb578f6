//! Warning and error notifications raised while merging.
//!
//! The engine never talks to a UI directly. Components receive a
//! [`NotificationSink`] at construction and report soft warnings and hard
//! failures through it; the caller decides how to show them.

use std::fmt;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{error, warn};

/// Title for warning text returned by an otherwise successful merge.
pub const TITLE_MERGE_WARNINGS: &str = "Warnings during merge";
/// Title for a merge that reported a warning through the error channel.
pub const TITLE_MERGE_WARNING: &str = "Warning during merge";
/// Title for a hard merge failure.
pub const TITLE_MERGE_EXCEPTION: &str = "Exception during merge";
/// Title for a merge target that yields no incoming revision.
pub const TITLE_MERGE_ERROR: &str = "Merge error";
/// Title for a failed ancestor query.
pub const TITLE_ANCESTOR_QUERY: &str = "Error while querying common ancestor";

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Warning,
    Error,
}

impl fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A single notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub body: String,
}

/// Destination for user-facing warnings and errors.
pub trait NotificationSink: Send + Sync {
    fn notify_warning(&self, title: &str, body: &str);
    fn notify_error(&self, title: &str, body: &str);
}

/// Sink that forwards notifications to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn notify_warning(&self, title: &str, body: &str) {
        warn!(title, body, "merge notification");
    }

    fn notify_error(&self, title: &str, body: &str) {
        error!(title, body, "merge notification");
    }
}

/// Sink that keeps notifications in memory until the caller drains them.
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    entries: Mutex<Vec<Notification>>,
}

impl CollectingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn notifications(&self) -> Vec<Notification> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Remove and return everything recorded so far.
    pub fn drain(&self) -> Vec<Notification> {
        self.entries
            .lock()
            .map(|mut entries| std::mem::take(&mut *entries))
            .unwrap_or_default()
    }

    fn push(&self, level: NotificationLevel, title: &str, body: &str) {
        match self.entries.lock() {
            Ok(mut entries) => entries.push(Notification {
                level,
                title: title.to_string(),
                body: body.to_string(),
            }),
            Err(e) => warn!(error = %e, title, "dropping notification, lock poisoned"),
        }
    }
}

impl NotificationSink for CollectingNotifier {
    fn notify_warning(&self, title: &str, body: &str) {
        self.push(NotificationLevel::Warning, title, body);
    }

    fn notify_error(&self, title: &str, body: &str) {
        self.push(NotificationLevel::Error, title, body);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_notifier_records_in_order() {
        let sink = CollectingNotifier::new();
        sink.notify_warning(TITLE_MERGE_WARNINGS, "3 files unresolved");
        sink.notify_error(TITLE_MERGE_ERROR, "invalid merge target");

        let entries = sink.notifications();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].level, NotificationLevel::Warning);
        assert_eq!(entries[0].body, "3 files unresolved");
        assert_eq!(entries[1].level, NotificationLevel::Error);
        assert_eq!(entries[1].title, "Merge error");
    }

    #[test]
    fn test_drain_empties_the_sink() {
        let sink = CollectingNotifier::new();
        sink.notify_warning("t", "b");
        assert_eq!(sink.drain().len(), 1);
        assert!(sink.notifications().is_empty());
    }

    #[test]
    fn test_level_display() {
        assert_eq!(NotificationLevel::Warning.to_string(), "warning");
        assert_eq!(NotificationLevel::Error.to_string(), "error");
    }
}
