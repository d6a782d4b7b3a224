//! Preference error types

use thiserror::Error;

/// Errors that can occur while reading, resolving or writing preferences
#[derive(Error, Debug)]
pub enum PreferenceError {
    /// A scope holds a value that cannot be used for resolution
    #[error("Malformed value for {key}: {reason}")]
    Malformed { key: String, reason: String },

    /// Backing store IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Write attempted before the scope finished its initial load
    #[error("Scope {0} is not ready")]
    NotReady(String),
}

impl PreferenceError {
    /// Create a malformed value error
    pub fn malformed(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

pub type PreferenceResult<T> = Result<T, PreferenceError>;
