//! Merges raw provider changes into one effective change feed
//!
//! A raw change only reaches consumers when it moves the effective value of
//! its key. The new effective value is resolved from the providers' current
//! state, so a batch that arrives late cannot roll a key back. The previous
//! effective value comes from a per-key cache; for a key seen for the first
//! time it is derived from the old raw value carried by the batch.
//!
//! The aggregator also owns provider readiness: it listens for each
//! provider's ready transition and replays buffered changes when the last
//! one becomes ready.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::PendingEventPolicy;
use crate::providers::PreferenceResult;
use crate::event::{Emitter, Subscription};
use crate::{log_debug, log_diagnostic, log_info};
use crate::logging::SharedLogger;
use crate::resolver::PreferenceResolver;
use crate::types::{ChangeBatch, PreferenceChange, PreferenceValue, RawChange};
use super::readiness::ReadinessCoordinator;

/// Change aggregator over every provider of a resolver
///
/// Subscribes to each provider once, at construction. Listeners are called
/// with no internal lock held, so they may read preferences, mutate
/// providers or dispose subscriptions.
pub struct ChangeAggregator {
    resolver: PreferenceResolver,
    readiness: Arc<ReadinessCoordinator>,
    policy: PendingEventPolicy,
    /// Last known effective value per key; `None` means undefined
    cache: Mutex<HashMap<String, Option<PreferenceValue>>>,
    buffered: Mutex<Vec<PreferenceChange>>,
    emitter: Emitter<Vec<PreferenceChange>>,
    provider_subscriptions: Mutex<Vec<Subscription>>,
    disposed: AtomicBool,
    logger: SharedLogger,
}

impl ChangeAggregator {
    pub fn new(
        resolver: PreferenceResolver,
        readiness: Arc<ReadinessCoordinator>,
        policy: PendingEventPolicy,
        logger: SharedLogger,
    ) -> Arc<Self> {
        let aggregator = Arc::new(Self {
            resolver,
            readiness,
            policy,
            cache: Mutex::new(HashMap::new()),
            buffered: Mutex::new(Vec::new()),
            emitter: Emitter::new(),
            provider_subscriptions: Mutex::new(Vec::new()),
            disposed: AtomicBool::new(false),
            logger,
        });

        // Providers only get a weak handle, they must not keep the aggregator alive.
        let mut subscriptions: Vec<Subscription> = Vec::new();
        for (index, provider) in aggregator.resolver.providers().iter().enumerate() {
            let weak = Arc::downgrade(&aggregator);
            subscriptions.push(provider.on_did_change(Arc::new(move |batch: &ChangeBatch| {
                if let Some(aggregator) = weak.upgrade() {
                    aggregator.handle_batch(index, batch);
                }
            })));

            let weak = Arc::downgrade(&aggregator);
            subscriptions.push(provider.on_did_become_ready(Arc::new(move || {
                if let Some(aggregator) = weak.upgrade() {
                    aggregator.mark_provider_ready(index);
                }
            })));
        }
        *aggregator.provider_subscriptions.lock() = subscriptions;

        // Providers that were ready before the listeners were registered
        aggregator.sync_readiness();
        aggregator
    }

    /// Record that the provider at `index` finished its initial load
    ///
    /// Returns `true` for the call that made the service ready; buffered
    /// changes are replayed at that point.
    pub fn mark_provider_ready(&self, index: usize) -> bool {
        if !self.readiness.mark_ready(index) {
            return false;
        }
        log_info!(self.logger, "Preference service ready ({} scopes)", self.resolver.providers().len());
        self.flush_pending();
        true
    }

    /// Pick up providers that report ready, returns service readiness
    pub fn sync_readiness(&self) -> bool {
        if self.readiness.is_ready() {
            return true;
        }
        for (index, provider) in self.resolver.providers().iter().enumerate() {
            if provider.is_ready() {
                self.mark_provider_ready(index);
            }
        }
        self.readiness.is_ready()
    }

    pub fn readiness(&self) -> &ReadinessCoordinator {
        &self.readiness
    }

    /// Process a raw batch from the provider at precedence `index`
    pub fn handle_batch(&self, index: usize, batch: &ChangeBatch) {
        if self.is_disposed() {
            return;
        }

        let changes: Vec<PreferenceChange> = batch
            .changes
            .iter()
            .filter_map(|raw| self.effective_change(index, &batch.scope, raw))
            .collect();

        if !changes.is_empty() {
            self.publish(changes);
        }
    }

    /// Translate one raw change; `None` when the effective value is unchanged
    /// or could not be computed
    ///
    /// Failures are reported to the diagnostic sink and invalidate the cached
    /// value of the key.
    fn effective_change(&self, index: usize, scope: &str, raw: &RawChange) -> Option<PreferenceChange> {
        let outcome = {
            // One guard: concurrent batches for the same key compare and store in turn
            let mut cache = self.cache.lock();
            let transition = self.transition(&cache, index, raw);
            match &transition {
                Ok((_, new_value)) => {
                    cache.insert(raw.key.clone(), new_value.clone());
                }
                Err(_) => {
                    cache.remove(&raw.key);
                }
            }
            transition
        };

        match outcome {
            Ok((old_value, new_value)) if old_value != new_value => Some(PreferenceChange {
                key: raw.key.clone(),
                new_value,
                old_value,
                scope: scope.to_string(),
            }),
            Ok(_) => None,
            Err(e) => {
                log_diagnostic!(self.logger, context = "scope={} key={}", scope, raw.key;
                    "Failed to recompute preference {}: {}", raw.key, e);
                None
            }
        }
    }

    /// `(old, new)` effective values of the key touched by `raw`
    fn transition(
        &self,
        cache: &HashMap<String, Option<PreferenceValue>>,
        index: usize,
        raw: &RawChange,
    ) -> PreferenceResult<(Option<PreferenceValue>, Option<PreferenceValue>)> {
        let new_value = self.resolver.resolve(&raw.key)?.map(|r| r.value);
        let old_value = match cache.get(&raw.key) {
            Some(value) => value.clone(),
            None => self
                .resolver
                .resolve_overriding(&raw.key, index, raw.old_value.as_ref())?
                .map(|r| r.value),
        };
        Ok((old_value, new_value))
    }

    fn publish(&self, changes: Vec<PreferenceChange>) {
        if self.readiness.is_ready() || self.policy == PendingEventPolicy::Deliver {
            self.emitter.fire(&changes);
            return;
        }

        match self.policy {
            PendingEventPolicy::Drop => {
                log_debug!(self.logger, "Dropped {} preference changes before readiness", changes.len());
            }
            PendingEventPolicy::Buffer => {
                self.buffered.lock().extend(changes);
                // Readiness may have flipped while buffering
                if self.readiness.is_ready() {
                    self.flush_pending();
                }
            }
            PendingEventPolicy::Deliver => {}
        }
    }

    /// Replay changes buffered during the pending window
    ///
    /// Changes are coalesced per key (first old value, last new value) and
    /// keys that ended where they started are skipped.
    pub fn flush_pending(&self) {
        let buffered: Vec<PreferenceChange> = std::mem::take(&mut *self.buffered.lock());
        if buffered.is_empty() || self.is_disposed() {
            return;
        }

        let mut order: Vec<String> = Vec::new();
        let mut merged: HashMap<String, PreferenceChange> = HashMap::new();
        for change in buffered {
            match merged.get_mut(&change.key) {
                Some(existing) => {
                    existing.new_value = change.new_value;
                    existing.scope = change.scope;
                }
                None => {
                    order.push(change.key.clone());
                    merged.insert(change.key.clone(), change);
                }
            }
        }

        let changes: Vec<PreferenceChange> = order
            .into_iter()
            .filter_map(|key| merged.remove(&key))
            .filter(|change| change.old_value != change.new_value)
            .collect();

        if !changes.is_empty() {
            log_debug!(self.logger, "Replaying {} buffered preference changes", changes.len());
            self.emitter.fire(&changes);
        }
    }

    /// Register for effective change batches
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Vec<PreferenceChange>) + Send + Sync + 'static,
    {
        if self.is_disposed() {
            return Subscription::inert();
        }
        self.emitter.subscribe(callback)
    }

    /// Cached effective value of a key, if the key has been seen
    pub fn cached(&self, key: &str) -> Option<Option<PreferenceValue>> {
        self.cache.lock().get(key).cloned()
    }

    /// Number of changes waiting for readiness
    pub fn buffered_len(&self) -> usize {
        self.buffered.lock().len()
    }

    pub fn listener_count(&self) -> usize {
        self.emitter.listener_count()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Unsubscribe from providers and release the change bus
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        let subscriptions: Vec<Subscription> = self.provider_subscriptions.lock().drain(..).collect();
        for subscription in subscriptions {
            subscription.dispose();
        }
        self.emitter.dispose();
        self.cache.lock().clear();
        self.buffered.lock().clear();
    }
}

impl std::fmt::Debug for ChangeAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeAggregator")
            .field("scopes", &self.resolver.providers().scopes())
            .field("policy", &self.policy)
            .field("cached_keys", &self.cache.lock().len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{LogLevel, MemoryLogger, NoOpLogger};
    use crate::providers::{MemoryPreferenceProvider, PreferenceProvider, ProviderRegistry};
    use crate::testing::FaultyProvider;
    use crate::types::PreferenceScope;
    use serde_json::json;

    type Recorded = Arc<Mutex<Vec<Vec<PreferenceChange>>>>;

    struct Fixture {
        user: Arc<MemoryPreferenceProvider>,
        workspace: Arc<MemoryPreferenceProvider>,
        readiness: Arc<ReadinessCoordinator>,
        aggregator: Arc<ChangeAggregator>,
        recorded: Recorded,
        _subscription: Subscription,
    }

    /// Two memory scopes; with `ready == false` both are still loading
    fn fixture(policy: PendingEventPolicy, ready: bool) -> Fixture {
        let scope = |scope: PreferenceScope| {
            Arc::new(if ready {
                MemoryPreferenceProvider::new(scope)
            } else {
                MemoryPreferenceProvider::deferred(scope)
            })
        };
        let user = scope(PreferenceScope::User);
        let workspace = scope(PreferenceScope::Workspace);
        let registry = ProviderRegistry::builder()
            .with_provider(user.clone())
            .with_provider(workspace.clone())
            .build();

        let readiness = Arc::new(ReadinessCoordinator::new(2));

        let aggregator = ChangeAggregator::new(
            PreferenceResolver::new(registry),
            readiness.clone(),
            policy,
            Arc::new(NoOpLogger),
        );
        let recorded: Recorded = Arc::new(Mutex::new(Vec::new()));
        let sink = recorded.clone();
        let subscription = aggregator.subscribe(move |changes: &Vec<PreferenceChange>| {
            sink.lock().push(changes.clone());
        });

        Fixture {
            user,
            workspace,
            readiness,
            aggregator,
            recorded,
            _subscription: subscription,
        }
    }

    fn keys(recorded: &Recorded) -> Vec<Vec<String>> {
        recorded
            .lock()
            .iter()
            .map(|batch| batch.iter().map(|c| c.key.clone()).collect())
            .collect()
    }

    #[test]
    fn test_unshadowed_change_is_emitted() {
        let f = fixture(PendingEventPolicy::Deliver, true);
        f.user.set("editor.lineNumbers", json!("on"));

        let recorded = f.recorded.lock();
        assert_eq!(recorded.len(), 1);
        let change = &recorded[0][0];
        assert_eq!(change.key, "editor.lineNumbers");
        assert_eq!(change.old_value, None);
        assert_eq!(change.new_value, Some(json!("on")));
        assert_eq!(change.scope, "user");
    }

    #[test]
    fn test_override_is_emitted_once() {
        let f = fixture(PendingEventPolicy::Deliver, true);
        f.user.set("editor.lineNumbers", json!("on"));
        f.workspace.set("editor.lineNumbers", json!("off"));

        let recorded = f.recorded.lock();
        assert_eq!(recorded.len(), 2);
        let change = &recorded[1][0];
        assert_eq!(change.old_value, Some(json!("on")));
        assert_eq!(change.new_value, Some(json!("off")));
        assert_eq!(change.scope, "workspace");
    }

    #[test]
    fn test_masked_change_is_not_emitted() {
        let f = fixture(PendingEventPolicy::Deliver, true);
        f.workspace.set("editor.lineNumbers", json!("off"));
        f.recorded.lock().clear();

        f.user.set("editor.lineNumbers", json!("relative"));
        f.user.remove("editor.lineNumbers");
        f.user.set("editor.lineNumbers", json!(null));

        assert!(f.recorded.lock().is_empty());
        assert_eq!(f.aggregator.cached("editor.lineNumbers"), Some(Some(json!("off"))));
    }

    #[test]
    fn test_masked_change_without_cache_is_not_emitted() {
        let f = fixture(PendingEventPolicy::Deliver, true);
        f.workspace.set("k", json!(1));
        // Forget the key so the old value has to be derived from the batch
        f.aggregator.cache.lock().clear();
        f.recorded.lock().clear();

        f.user.set("k", json!(2));
        assert!(f.recorded.lock().is_empty());
        assert_eq!(f.aggregator.cached("k"), Some(Some(json!(1))));
    }

    #[test]
    fn test_removing_override_reveals_lower_value() {
        let f = fixture(PendingEventPolicy::Deliver, true);
        f.user.set("editor.tabSize", json!(2));
        f.workspace.set("editor.tabSize", json!(4));
        f.recorded.lock().clear();

        f.workspace.remove("editor.tabSize");

        let recorded = f.recorded.lock();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0][0].old_value, Some(json!(4)));
        assert_eq!(recorded[0][0].new_value, Some(json!(2)));
    }

    #[test]
    fn test_removal_to_undefined() {
        let f = fixture(PendingEventPolicy::Deliver, true);
        f.user.set("a", json!(false));
        f.user.remove("a");

        let recorded = f.recorded.lock();
        assert_eq!(recorded.len(), 2);
        assert!(recorded[1][0].is_removal());
        assert_eq!(recorded[1][0].old_value, Some(json!(false)));
    }

    #[test]
    fn test_override_with_same_value_is_not_emitted() {
        let f = fixture(PendingEventPolicy::Deliver, true);
        f.user.set("a", json!("same"));
        f.recorded.lock().clear();

        f.workspace.set("a", json!("same"));
        assert!(f.recorded.lock().is_empty());
    }

    #[test]
    fn test_batch_keeps_only_effective_changes() {
        let f = fixture(PendingEventPolicy::Deliver, true);
        f.workspace.set("masked", json!(1));
        f.recorded.lock().clear();

        f.user.set_many(vec![
            ("masked", Some(json!(2))),
            ("visible", Some(json!(3))),
        ]);

        assert_eq!(keys(&f.recorded), vec![vec!["visible".to_string()]]);
    }

    #[test]
    fn test_malformed_key_is_isolated() {
        let user = Arc::new(MemoryPreferenceProvider::new(PreferenceScope::User));
        let faulty = Arc::new(FaultyProvider::new("workspace", ["broken"]));
        let registry = ProviderRegistry::builder()
            .with_provider(user.clone())
            .with_provider(faulty.clone())
            .build();
        let logger = Arc::new(MemoryLogger::new());
        let aggregator = ChangeAggregator::new(
            PreferenceResolver::new(registry),
            Arc::new(ReadinessCoordinator::new(2)),
            PendingEventPolicy::Deliver,
            logger.clone(),
        );
        let recorded: Recorded = Arc::new(Mutex::new(Vec::new()));
        let sink = recorded.clone();
        let _sub = aggregator.subscribe(move |c: &Vec<PreferenceChange>| sink.lock().push(c.clone()));

        user.set_many(vec![("broken", Some(json!(1))), ("fine", Some(json!(2)))]);

        assert_eq!(keys(&recorded), vec![vec!["fine".to_string()]]);
        let diagnostics = logger.entries_at(LogLevel::Diagnostic);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].context, "scope=user key=broken");
        assert_eq!(aggregator.cached("broken"), None);

        // Once the scope is readable again the key flows normally
        faulty.heal("broken");
        faulty.set("broken", json!(5));
        assert_eq!(recorded.lock().len(), 2);
        assert_eq!(recorded.lock()[1][0].new_value, Some(json!(5)));
    }

    #[test]
    fn test_disposed_aggregator_drops_events() {
        let f = fixture(PendingEventPolicy::Deliver, true);
        f.aggregator.dispose();
        f.aggregator.dispose();

        f.user.set("a", json!(1));
        f.aggregator.handle_batch(
            0,
            &ChangeBatch {
                scope: "user".into(),
                generation: 9,
                changes: vec![RawChange::new("b", None, Some(json!(1)))],
            },
        );

        assert!(f.recorded.lock().is_empty());
        assert_eq!(f.aggregator.listener_count(), 0);
        assert!(!f.aggregator.subscribe(|_| {}).is_active());
    }

    #[test]
    fn test_drop_policy_discards_pending_changes() {
        let f = fixture(PendingEventPolicy::Drop, false);
        f.user.set("a", json!(1));
        assert!(f.recorded.lock().is_empty());

        // The cache still tracks the value, so later changes compare correctly
        assert_eq!(f.aggregator.cached("a"), Some(Some(json!(1))));
        f.user.fail_load();
        f.workspace.fail_load();
        assert!(f.readiness.is_ready());
        f.user.set("a", json!(2));

        let recorded = f.recorded.lock();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0][0].old_value, Some(json!(1)));
    }

    #[test]
    fn test_buffer_policy_replays_coalesced_changes() {
        let f = fixture(PendingEventPolicy::Buffer, false);
        f.user.set("a", json!(1));
        f.user.set("a", json!(2));
        f.user.set("b", json!(true));
        f.user.remove("b");
        f.workspace.set("c", json!("x"));
        assert!(f.recorded.lock().is_empty());
        assert_eq!(f.aggregator.buffered_len(), 5);

        // Replayed by the last ready transition, nothing else drives it
        f.user.fail_load();
        assert!(f.recorded.lock().is_empty());
        f.workspace.fail_load();

        let recorded = f.recorded.lock();
        assert_eq!(recorded.len(), 1);
        let replayed: Vec<(String, Option<PreferenceValue>)> = recorded[0]
            .iter()
            .map(|c| (c.key.clone(), c.new_value.clone()))
            .collect();
        assert_eq!(
            replayed,
            vec![("a".to_string(), Some(json!(2))), ("c".to_string(), Some(json!("x")))]
        );
        assert_eq!(f.aggregator.buffered_len(), 0);
    }

    #[test]
    fn test_buffer_policy_delivers_load_and_later_changes() {
        let f = fixture(PendingEventPolicy::Buffer, false);
        f.workspace.fail_load();
        f.workspace.set("x", json!(1));
        f.user.complete_load(HashMap::from([("b".to_string(), json!(2))]));

        assert!(f.readiness.is_ready());
        assert_eq!(keys(&f.recorded), vec![vec!["x".to_string(), "b".to_string()]]);

        f.user.set("a", json!(3));
        assert_eq!(f.recorded.lock().len(), 2);
        assert_eq!(f.aggregator.buffered_len(), 0);
    }

    #[test]
    fn test_drop_policy_delivers_once_every_scope_loaded() {
        let f = fixture(PendingEventPolicy::Drop, false);
        f.workspace.fail_load();
        f.user.complete_load(HashMap::new());
        assert!(f.readiness.is_ready());

        f.user.set("a", json!(1));
        assert_eq!(keys(&f.recorded), vec![vec!["a".to_string()]]);
    }

    #[test]
    fn test_scopes_ready_before_construction() {
        let f = fixture(PendingEventPolicy::Buffer, true);
        assert!(f.readiness.is_ready());
        f.user.set("a", json!(1));
        assert_eq!(f.recorded.lock().len(), 1);
    }

    #[test]
    fn test_late_batch_does_not_roll_back() {
        let user = Arc::new(MemoryPreferenceProvider::new(PreferenceScope::User));

        // Runs before the aggregator and mutates the scope again while the
        // first batch is still being dispatched.
        let scope = user.clone();
        let _bump = user.on_did_change(Arc::new(move |batch: &ChangeBatch| {
            if batch.changes.iter().any(|c| c.new_value == Some(json!(1))) {
                scope.set("k", json!(2));
            }
        }));

        let aggregator = ChangeAggregator::new(
            PreferenceResolver::new(ProviderRegistry::builder().with_provider(user.clone()).build()),
            Arc::new(ReadinessCoordinator::new(1)),
            PendingEventPolicy::Deliver,
            Arc::new(NoOpLogger),
        );
        let recorded: Recorded = Arc::new(Mutex::new(Vec::new()));
        let sink = recorded.clone();
        let _sub = aggregator.subscribe(move |c: &Vec<PreferenceChange>| sink.lock().push(c.clone()));

        user.set("k", json!(1));

        // The batch for k=1 reaches the aggregator after the one for k=2
        assert_eq!(user.get_preference("k").unwrap(), Some(json!(2)));
        assert_eq!(aggregator.cached("k"), Some(Some(json!(2))));
        let recorded = recorded.lock();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0][0].old_value, Some(json!(1)));
        assert_eq!(recorded[0][0].new_value, Some(json!(2)));
    }

    #[test]
    fn test_deliver_policy_emits_while_pending() {
        let f = fixture(PendingEventPolicy::Deliver, false);
        f.user.set("a", json!(1));
        assert_eq!(f.recorded.lock().len(), 1);
    }

    #[test]
    fn test_listener_may_read_during_dispatch() {
        let f = fixture(PendingEventPolicy::Deliver, true);
        let resolver = f.aggregator.resolver.clone();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _sub = f.aggregator.subscribe(move |changes: &Vec<PreferenceChange>| {
            for change in changes {
                let value = resolver.resolve(&change.key).unwrap().map(|r| r.value);
                sink.lock().push(value);
            }
        });

        f.user.set("a", json!(1));
        assert_eq!(*seen.lock(), vec![Some(json!(1))]);
    }

    #[test]
    fn test_dropping_aggregator_detaches_from_providers() {
        let f = fixture(PendingEventPolicy::Deliver, true);
        let user = f.user.clone();
        drop(f);
        // The provider's listener only holds a weak handle
        user.set("a", json!(1));
    }
}
