//! Notification sinks for sync status messages.

use colored::Colorize;

/// Receives human-readable status strings from the sync engine.
pub trait NotificationSink: Send + Sync {
    /// Deliver a status message.
    fn notify(&self, message: &str);
}

/// Prints notifications to stdout.
pub struct ConsoleNotifier;

impl NotificationSink for ConsoleNotifier {
    fn notify(&self, message: &str) {
        println!("{} {}", "↻".cyan().bold(), message);
    }
}

/// Routes notifications into the log.
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn notify(&self, message: &str) {
        tracing::info!(target: "quote_manager::notify", "{message}");
    }
}
