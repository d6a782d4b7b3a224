//! Configuration errors

/// Errors that can occur while loading service configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
