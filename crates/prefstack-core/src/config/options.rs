//! Preference service options (YAML)
//!
//! ```yaml
//! pending_events: buffer
//! initialize_on_first_read: true
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{ConfigError, ConfigResult};

/// What happens to effective changes observed before the service is ready
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PendingEventPolicy {
    /// Deliver immediately, best effort, no replay
    #[default]
    Deliver,
    /// Discard; consumers read the settled state after `ready`
    Drop,
    /// Hold and replay once when the service becomes ready
    Buffer,
}

impl PendingEventPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PendingEventPolicy::Deliver => "deliver",
            PendingEventPolicy::Drop => "drop",
            PendingEventPolicy::Buffer => "buffer",
        }
    }
}

/// Options of a [`PreferenceService`](crate::service::PreferenceService)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Handling of change events during the pending window
    pub pending_events: PendingEventPolicy,
    /// Start provider initialization on the first read issued while pending
    pub initialize_on_first_read: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            pending_events: PendingEventPolicy::Deliver,
            initialize_on_first_read: true,
        }
    }
}

impl ServiceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pending-window policy
    pub fn with_pending_events(mut self, policy: PendingEventPolicy) -> Self {
        self.pending_events = policy;
        self
    }

    /// Enable or disable lazy initialization on first read
    pub fn with_initialize_on_first_read(mut self, enabled: bool) -> Self {
        self.initialize_on_first_read = enabled;
        self
    }

    /// Parse options from a YAML document
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| ConfigError::Yaml(e.to_string()))
    }

    /// Load options from a YAML file, falling back to defaults when it does not exist
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Serialize options to YAML
    pub fn to_yaml(&self) -> ConfigResult<String> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::Yaml(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.pending_events, PendingEventPolicy::Deliver);
        assert!(config.initialize_on_first_read);
    }

    #[test]
    fn test_from_yaml() {
        let config = ServiceConfig::from_yaml_str(
            "pending_events: buffer\ninitialize_on_first_read: false\n",
        )
        .unwrap();
        assert_eq!(config.pending_events, PendingEventPolicy::Buffer);
        assert!(!config.initialize_on_first_read);

        // Missing fields fall back to defaults
        let partial = ServiceConfig::from_yaml_str("pending_events: drop").unwrap();
        assert_eq!(partial.pending_events, PendingEventPolicy::Drop);
        assert!(partial.initialize_on_first_read);

        assert_eq!(ServiceConfig::from_yaml_str("  \n").unwrap(), ServiceConfig::default());
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(
            ServiceConfig::from_yaml_str("pending_events: sometimes"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_load_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefstack.yaml");

        // Missing file is not an error
        assert_eq!(ServiceConfig::load(&path).unwrap(), ServiceConfig::default());

        let config = ServiceConfig::new()
            .with_pending_events(PendingEventPolicy::Buffer)
            .with_initialize_on_first_read(false);
        fs::write(&path, config.to_yaml().unwrap()).unwrap();

        assert_eq!(ServiceConfig::load(&path).unwrap(), config);
    }
}
