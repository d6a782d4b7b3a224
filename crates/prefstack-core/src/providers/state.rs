//! Raw key/value state shared by the built-in providers

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::event::{Emitter, Subscription};
use crate::types::{ChangeBatch, PreferenceValue, RawChange, ReadySignal};
use super::traits::{ChangeListener, ReadyListener};

/// Raw values, generation counter, readiness and change source of one scope
pub(crate) struct ScopeState {
    scope: String,
    values: RwLock<HashMap<String, PreferenceValue>>,
    generation: AtomicU64,
    ready: ReadySignal,
    emitter: Emitter<ChangeBatch>,
    ready_emitter: Emitter<()>,
}

impl ScopeState {
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            values: RwLock::new(HashMap::new()),
            generation: AtomicU64::new(0),
            ready: ReadySignal::new(),
            emitter: Emitter::new(),
            ready_emitter: Emitter::new(),
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn snapshot(&self) -> HashMap<String, PreferenceValue> {
        self.values.read().clone()
    }

    pub fn get(&self, key: &str) -> Option<PreferenceValue> {
        self.values.read().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn ready_signal(&self) -> &ReadySignal {
        &self.ready
    }

    /// Returns `true` for the call that made the scope ready
    pub fn mark_ready(&self) -> bool {
        if !self.ready.set() {
            return false;
        }
        self.ready_emitter.fire(&());
        true
    }

    pub fn subscribe(&self, listener: ChangeListener) -> Subscription {
        self.emitter.subscribe_listener(listener)
    }

    pub fn subscribe_ready(&self, listener: ReadyListener) -> Subscription {
        self.ready_emitter.subscribe(move |_: &()| listener())
    }

    /// Apply updates (`None` removes) and build the resulting batch
    ///
    /// Repeated updates to the same key are coalesced into one change
    /// carrying the first old value and the last new value; keys that end
    /// where they started are left out.
    fn apply(&self, updates: Vec<(String, Option<PreferenceValue>)>) -> Option<ChangeBatch> {
        let mut order: Vec<String> = Vec::new();
        let mut pending: HashMap<String, RawChange> = HashMap::new();

        let mut values = self.values.write();
        for (key, new_value) in updates {
            let old_value = match &new_value {
                Some(value) => values.insert(key.clone(), value.clone()),
                None => values.remove(&key),
            };
            if old_value == new_value {
                continue;
            }
            self.generation.fetch_add(1, Ordering::SeqCst);

            match pending.get_mut(&key) {
                Some(change) => change.new_value = new_value,
                None => {
                    order.push(key.clone());
                    pending.insert(key.clone(), RawChange::new(key, old_value, new_value));
                }
            }
        }
        drop(values);

        let changes: Vec<RawChange> = order
            .into_iter()
            .filter_map(|key| pending.remove(&key))
            .filter(|change| change.old_value != change.new_value)
            .collect();

        if changes.is_empty() {
            return None;
        }
        Some(ChangeBatch {
            scope: self.scope.clone(),
            generation: self.generation(),
            changes,
        })
    }

    /// Apply updates and emit the batch, if any, with no lock held
    pub fn update(&self, updates: Vec<(String, Option<PreferenceValue>)>) -> Option<ChangeBatch> {
        let batch = self.apply(updates)?;
        self.emitter.fire(&batch);
        Some(batch)
    }

    /// Replace the whole mapping, emitting additions, updates and removals
    pub fn replace_all(&self, next: HashMap<String, PreferenceValue>) -> Option<ChangeBatch> {
        let mut updates: Vec<(String, Option<PreferenceValue>)> = self
            .values
            .read()
            .keys()
            .filter(|key| !next.contains_key(*key))
            .map(|key| (key.clone(), None))
            .collect();
        updates.extend(next.into_iter().map(|(key, value)| (key, Some(value))));
        self.update(updates)
    }
}
