//! In-memory preference provider

use std::collections::HashMap;

use async_trait::async_trait;

use crate::event::Subscription;
use crate::types::{ChangeBatch, PreferenceScope, PreferenceValue};
use super::error::PreferenceResult;
use super::state::ScopeState;
use super::traits::{ChangeListener, PreferenceProvider, ReadyListener};

/// In-memory preference scope
///
/// Used for embedding hosts that push settings in themselves and as the test
/// double of the provider contract. A provider created with [`deferred`]
/// stays pending until [`complete_load`] or [`fail_load`] is called, which
/// models a backing store that is still loading.
///
/// [`deferred`]: MemoryPreferenceProvider::deferred
/// [`complete_load`]: MemoryPreferenceProvider::complete_load
/// [`fail_load`]: MemoryPreferenceProvider::fail_load
///
/// # Example
///
/// ```
/// use prefstack_core::providers::{MemoryPreferenceProvider, PreferenceProvider};
/// use prefstack_core::PreferenceScope;
/// use serde_json::json;
///
/// let user = MemoryPreferenceProvider::new(PreferenceScope::User);
/// user.set("editor.lineNumbers", json!("on"));
/// assert_eq!(user.get_preference("editor.lineNumbers").unwrap(), Some(json!("on")));
/// assert!(user.is_ready());
/// ```
pub struct MemoryPreferenceProvider {
    state: ScopeState,
}

impl MemoryPreferenceProvider {
    /// Create an empty scope that is ready immediately
    pub fn new(scope: PreferenceScope) -> Self {
        let provider = Self::deferred(scope);
        provider.state.mark_ready();
        provider
    }

    /// Create a scope with initial values that is ready immediately
    pub fn with_preferences(scope: PreferenceScope, initial: HashMap<String, PreferenceValue>) -> Self {
        let provider = Self::deferred(scope);
        provider.state.replace_all(initial);
        provider.state.mark_ready();
        provider
    }

    /// Create an empty scope whose initial load has not completed yet
    pub fn deferred(scope: PreferenceScope) -> Self {
        Self {
            state: ScopeState::new(scope.as_str()),
        }
    }

    /// Finish the initial load with the given values
    ///
    /// Emits the loaded values as one batch, then becomes ready. Calling it
    /// again after readiness just replaces the values.
    pub fn complete_load(&self, values: HashMap<String, PreferenceValue>) -> Option<ChangeBatch> {
        let batch = self.state.replace_all(values);
        self.state.mark_ready();
        batch
    }

    /// Finish the initial load as failed: the scope becomes ready and empty
    pub fn fail_load(&self) {
        self.state.mark_ready();
    }

    /// Set a value
    pub fn set(&self, key: impl Into<String>, value: PreferenceValue) -> Option<ChangeBatch> {
        self.state.update(vec![(key.into(), Some(value))])
    }

    /// Remove a value
    pub fn remove(&self, key: &str) -> Option<ChangeBatch> {
        self.state.update(vec![(key.to_string(), None)])
    }

    /// Apply several updates as one coalesced batch (`None` removes)
    pub fn set_many<I, K>(&self, updates: I) -> Option<ChangeBatch>
    where
        I: IntoIterator<Item = (K, Option<PreferenceValue>)>,
        K: Into<String>,
    {
        self.state
            .update(updates.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Remove all values
    pub fn clear(&self) -> Option<ChangeBatch> {
        self.state.replace_all(HashMap::new())
    }

    /// Number of keys defined in this scope
    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for MemoryPreferenceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryPreferenceProvider")
            .field("scope", &self.state.scope())
            .field("keys", &self.state.len())
            .field("generation", &self.state.generation())
            .field("ready", &self.state.ready_signal().is_ready())
            .finish()
    }
}

#[async_trait]
impl PreferenceProvider for MemoryPreferenceProvider {
    fn scope(&self) -> &str {
        self.state.scope()
    }

    fn get_preferences(&self) -> HashMap<String, PreferenceValue> {
        self.state.snapshot()
    }

    fn get_preference(&self, key: &str) -> PreferenceResult<Option<PreferenceValue>> {
        Ok(self.state.get(key))
    }

    fn generation(&self) -> u64 {
        self.state.generation()
    }

    fn is_ready(&self) -> bool {
        self.state.ready_signal().is_ready()
    }

    async fn ready(&self) {
        self.state.ready_signal().wait().await;
    }

    async fn initialize(&self) {
        // Nothing to load; deferred scopes are completed by their owner.
    }

    fn on_did_change(&self, listener: ChangeListener) -> Subscription {
        self.state.subscribe(listener)
    }

    fn on_did_become_ready(&self, listener: ReadyListener) -> Subscription {
        self.state.subscribe_ready(listener)
    }
}
