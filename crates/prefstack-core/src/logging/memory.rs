//! Recording logger implementation

use parking_lot::Mutex;

use super::traits::{LogLevel, Logger};

/// A single recorded log entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Context passed to `diagnostic`, empty for plain log calls
    pub context: String,
}

/// A logger that keeps every entry in memory
///
/// Useful in tests that assert on reported diagnostics, and for hosts that
/// surface recent messages in their own UI.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, level: LogLevel, message: &str, context: &str) {
        self.entries.lock().push(LogEntry {
            level,
            message: message.to_string(),
            context: context.to_string(),
        });
    }

    /// All recorded entries, oldest first
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    /// Entries of one level
    pub fn entries_at(&self, level: LogLevel) -> Vec<LogEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.level == level)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Logger for MemoryLogger {
    fn debug(&self, message: &str) {
        self.record(LogLevel::Debug, message, "");
    }

    fn info(&self, message: &str) {
        self.record(LogLevel::Info, message, "");
    }

    fn warn(&self, message: &str) {
        self.record(LogLevel::Warn, message, "");
    }

    fn error(&self, message: &str) {
        self.record(LogLevel::Error, message, "");
    }

    fn diagnostic(&self, message: &str, context: &str) {
        self.record(LogLevel::Diagnostic, message, context);
    }
}
