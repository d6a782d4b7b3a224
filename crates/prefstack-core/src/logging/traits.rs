//! Logger trait and severity levels

use std::sync::Arc;

/// Severity of a log message
///
/// `Diagnostic` ranks above `Error`: it marks internal failures the service
/// recovered from but that a host usually wants surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    Diagnostic,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Diagnostic => "DIAGNOSTIC",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logging and diagnostic sink of the preference service
///
/// Non-fatal internal failures (a malformed value met during change
/// aggregation, a scope whose file could not be loaded) are reported through
/// [`Logger::diagnostic`] instead of being returned to a caller.
///
/// Implementations:
/// - `NoOpLogger`: discards everything
/// - `ConsoleLogger`: writes to stderr above a threshold
/// - `MemoryLogger`: records entries for later inspection
pub trait Logger: Send + Sync {
    fn debug(&self, message: &str);

    fn info(&self, message: &str);

    fn warn(&self, message: &str);

    fn error(&self, message: &str);

    /// Report a recovered internal failure with its context (scope, key)
    ///
    /// Must never panic. Defaults to a warning.
    fn diagnostic(&self, message: &str, context: &str) {
        self.warn(&format!("{} [{}]", message, context));
    }
}

/// Logger shared between the service, its aggregator and file-backed scopes
pub type SharedLogger = Arc<dyn Logger>;

/// Convenience macros for logging
#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)*) => {
        $logger.debug(&format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($arg:tt)*) => {
        $logger.info(&format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $($arg:tt)*) => {
        $logger.warn(&format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($logger:expr, $($arg:tt)*) => {
        $logger.error(&format!($($arg)*))
    };
}

/// `log_diagnostic!(logger, context = "key={}", key; "failed: {}", err)`
#[macro_export]
macro_rules! log_diagnostic {
    ($logger:expr, context = $ctx:literal $(, $carg:expr)*; $($arg:tt)*) => {
        $logger.diagnostic(&format!($($arg)*), &format!($ctx $(, $carg)*))
    };
}
