//! Preference provider trait definition

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::event::Subscription;
use crate::types::{ChangeBatch, PreferenceValue};
use super::error::PreferenceResult;

/// Listener for raw change batches of one provider
pub type ChangeListener = Arc<dyn Fn(&ChangeBatch) + Send + Sync>;

/// Listener for the one-time ready transition of a provider
pub type ReadyListener = Arc<dyn Fn() + Send + Sync>;

/// One scope of raw preferences
///
/// Implementations:
/// - `MemoryPreferenceProvider`: In-memory scope, also the test double
/// - `FilePreferenceProvider`: JSON settings file (user/workspace level)
/// - Host adapters: editor settings, remote configuration, ...
///
/// A provider must become ready exactly once, even when its initial load
/// fails (it then reports an empty mapping). It must emit every raw change
/// through `on_did_change` after releasing its own locks, since listeners
/// read the provider again while handling the batch.
#[async_trait]
pub trait PreferenceProvider: Send + Sync {
    /// Scope name, e.g. "user" or "workspace"
    fn scope(&self) -> &str;

    /// Snapshot of all raw values currently known to this scope
    ///
    /// May be empty before the initial load completes.
    fn get_preferences(&self) -> HashMap<String, PreferenceValue>;

    /// Raw value of one key
    ///
    /// `Ok(None)` means the key is not defined in this scope. An error means
    /// the scope holds a value for the key that cannot be used.
    fn get_preference(&self, key: &str) -> PreferenceResult<Option<PreferenceValue>> {
        Ok(self.get_preferences().remove(key))
    }

    /// Counter advanced on every raw mutation
    fn generation(&self) -> u64;

    /// Whether the initial load has completed
    fn is_ready(&self) -> bool;

    /// Wait until the initial load has completed
    async fn ready(&self);

    /// Start the initial load
    ///
    /// Idempotent; concurrent or repeated calls wait for the same load.
    async fn initialize(&self);

    /// Register for raw change batches
    fn on_did_change(&self, listener: ChangeListener) -> Subscription;

    /// Register for the ready transition
    ///
    /// Called once, after the initial values are in place. A listener
    /// registered after the transition is never called; check `is_ready`
    /// after registering.
    fn on_did_become_ready(&self, listener: ReadyListener) -> Subscription;
}
