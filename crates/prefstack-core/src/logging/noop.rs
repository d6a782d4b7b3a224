//! Silent logger

use super::traits::Logger;

/// Discards every message, diagnostics included
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    fn debug(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
    fn diagnostic(&self, _message: &str, _context: &str) {}
}
