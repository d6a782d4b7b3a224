//! Test doubles shared by unit tests

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::event::Subscription;
use crate::providers::{
    ChangeListener, MemoryPreferenceProvider, PreferenceError, PreferenceProvider, PreferenceResult,
    ReadyListener,
};
use crate::types::{ChangeBatch, PreferenceScope, PreferenceValue};

/// Memory scope that reports selected keys as malformed
pub(crate) struct FaultyProvider {
    inner: MemoryPreferenceProvider,
    broken: RwLock<HashSet<String>>,
}

impl FaultyProvider {
    pub fn new<'a>(scope: &str, broken: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            inner: MemoryPreferenceProvider::new(PreferenceScope::from(scope)),
            broken: RwLock::new(broken.into_iter().map(str::to_string).collect()),
        }
    }

    pub fn set(&self, key: &str, value: PreferenceValue) -> Option<ChangeBatch> {
        self.inner.set(key, value)
    }

    pub fn set_many(&self, updates: Vec<(&str, Option<PreferenceValue>)>) -> Option<ChangeBatch> {
        self.inner.set_many(updates)
    }

    pub fn heal(&self, key: &str) {
        self.broken.write().remove(key);
    }
}

#[async_trait]
impl PreferenceProvider for FaultyProvider {
    fn scope(&self) -> &str {
        self.inner.scope()
    }

    fn get_preferences(&self) -> HashMap<String, PreferenceValue> {
        self.inner.get_preferences()
    }

    fn get_preference(&self, key: &str) -> PreferenceResult<Option<PreferenceValue>> {
        if self.broken.read().contains(key) {
            return Err(PreferenceError::malformed(key, "unreadable raw value"));
        }
        self.inner.get_preference(key)
    }

    fn generation(&self) -> u64 {
        self.inner.generation()
    }

    fn is_ready(&self) -> bool {
        self.inner.is_ready()
    }

    async fn ready(&self) {
        self.inner.ready().await;
    }

    async fn initialize(&self) {
        self.inner.initialize().await;
    }

    fn on_did_change(&self, listener: ChangeListener) -> Subscription {
        self.inner.on_did_change(listener)
    }

    fn on_did_become_ready(&self, listener: ReadyListener) -> Subscription {
        self.inner.on_did_become_ready(listener)
    }
}
