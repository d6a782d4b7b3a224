//! Preference scopes

use std::fmt;

use serde::{Deserialize, Serialize};

/// A named source of preferences with its own precedence level
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreferenceScope {
    /// User-level preferences (~/.config/prefstack/settings.json)
    User,
    /// Workspace-level preferences (.prefstack/settings.json in the workspace root)
    Workspace,
    /// Any other scope, e.g. a remote or folder-level source
    Named(String),
}

impl PreferenceScope {
    pub fn as_str(&self) -> &str {
        match self {
            PreferenceScope::User => "user",
            PreferenceScope::Workspace => "workspace",
            PreferenceScope::Named(name) => name,
        }
    }
}

impl From<&str> for PreferenceScope {
    fn from(s: &str) -> Self {
        match s {
            "user" => PreferenceScope::User,
            "workspace" => PreferenceScope::Workspace,
            other => PreferenceScope::Named(other.to_string()),
        }
    }
}

impl fmt::Display for PreferenceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
