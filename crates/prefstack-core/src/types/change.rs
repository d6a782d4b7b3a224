//! Raw and effective change records

use serde::{Deserialize, Serialize};

use super::PreferenceValue;

/// A change to one key inside a single provider
///
/// `None` means the key is absent from that provider's scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawChange {
    pub key: String,
    pub old_value: Option<PreferenceValue>,
    pub new_value: Option<PreferenceValue>,
}

impl RawChange {
    pub fn new(
        key: impl Into<String>,
        old_value: Option<PreferenceValue>,
        new_value: Option<PreferenceValue>,
    ) -> Self {
        Self {
            key: key.into(),
            old_value,
            new_value,
        }
    }
}

/// A batch of raw changes emitted by one provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeBatch {
    /// Scope of the emitting provider
    pub scope: String,
    /// Provider generation after the batch was applied
    pub generation: u64,
    pub changes: Vec<RawChange>,
}

impl ChangeBatch {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// A change of an effective (cross-scope) value, as seen by consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceChange {
    pub key: String,
    /// New effective value, `None` when no scope defines the key anymore
    pub new_value: Option<PreferenceValue>,
    /// Effective value before the change
    pub old_value: Option<PreferenceValue>,
    /// Scope whose raw change produced this effective change
    pub scope: String,
}

impl PreferenceChange {
    /// Whether the key became undefined in every scope
    pub fn is_removal(&self) -> bool {
        self.new_value.is_none()
    }
}
