//! Console logger implementation

use super::traits::{LogLevel, Logger};

/// Writes messages at or above a threshold to stderr
///
/// Stdout is left to the host application.
#[derive(Debug, Clone)]
pub struct ConsoleLogger {
    prefix: String,
    min_level: LogLevel,
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleLogger {
    /// `[prefstack]` prefix, info and above
    pub fn new() -> Self {
        Self {
            prefix: "[prefstack]".to_string(),
            min_level: LogLevel::Info,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    fn format(&self, level: LogLevel, message: &str) -> String {
        format!("{} {}: {}", self.prefix, level, message)
    }

    fn emit(&self, level: LogLevel, message: &str) {
        if self.enabled(level) {
            eprintln!("{}", self.format(level, message));
        }
    }
}

impl Logger for ConsoleLogger {
    fn debug(&self, message: &str) {
        self.emit(LogLevel::Debug, message);
    }

    fn info(&self, message: &str) {
        self.emit(LogLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.emit(LogLevel::Warn, message);
    }

    fn error(&self, message: &str) {
        self.emit(LogLevel::Error, message);
    }

    fn diagnostic(&self, message: &str, context: &str) {
        self.emit(LogLevel::Diagnostic, &format!("{} ({})", message, context));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold() {
        let logger = ConsoleLogger::new();
        assert!(!logger.enabled(LogLevel::Debug));
        assert!(logger.enabled(LogLevel::Info));
        assert!(logger.enabled(LogLevel::Diagnostic));

        let quiet = ConsoleLogger::new().with_min_level(LogLevel::Error);
        assert!(!quiet.enabled(LogLevel::Warn));
        assert!(quiet.enabled(LogLevel::Diagnostic));
    }

    #[test]
    fn test_format() {
        let logger = ConsoleLogger::new().with_prefix("[editor]");
        assert_eq!(logger.format(LogLevel::Warn, "scope failed"), "[editor] WARN: scope failed");
    }

    #[test]
    fn test_console_logger_does_not_panic() {
        let logger = ConsoleLogger::new().with_min_level(LogLevel::Debug);
        logger.debug("debug message");
        logger.info("info message");
        logger.diagnostic("diagnostic message", "key=editor.fontSize");
    }
}
