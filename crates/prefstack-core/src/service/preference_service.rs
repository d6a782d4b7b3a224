//! Preference service facade
//!
//! Composes the resolver, the readiness coordinator and the change
//! aggregator behind the consumer API. The service is an explicitly
//! constructed, cheaply cloneable handle; hand it to the components that
//! need preferences instead of reaching for a global.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use futures::future::{join_all, select};
use serde::de::DeserializeOwned;

use crate::config::ServiceConfig;
use crate::event::Subscription;
use crate::logging::SharedLogger;
use crate::providers::ProviderRegistry;
use crate::resolver::{PreferenceInspection, PreferenceResolver};
use crate::types::{PreferenceChange, PreferenceValue, ReadySignal};
use crate::{log_debug, log_diagnostic};
use super::aggregator::ChangeAggregator;
use super::readiness::{ProviderState, ReadinessCoordinator, ServiceState};

struct ServiceInner {
    resolver: PreferenceResolver,
    readiness: Arc<ReadinessCoordinator>,
    aggregator: Arc<ChangeAggregator>,
    config: ServiceConfig,
    initialize_started: AtomicBool,
    lazy_initialize_spawned: AtomicBool,
    /// Set once by `dispose`
    shutdown: ReadySignal,
    logger: SharedLogger,
}

/// Unified preference service over layered scopes
///
/// Reads never block: before every scope has loaded they are answered from
/// whatever raw data is available, after [`dispose`](Self::dispose) they
/// return `None`. Await [`ready`](Self::ready) when complete data is needed.
///
/// # Example
///
/// ```
/// use prefstack_core::{MemoryPreferenceProvider, PreferenceScope, PreferenceService, ProviderRegistry};
/// use prefstack_core::logging::NoOpLogger;
/// use serde_json::json;
/// use std::sync::Arc;
///
/// let user = Arc::new(MemoryPreferenceProvider::new(PreferenceScope::User));
/// let workspace = Arc::new(MemoryPreferenceProvider::new(PreferenceScope::Workspace));
/// let registry = ProviderRegistry::builder()
///     .with_provider(user.clone())
///     .with_provider(workspace.clone())
///     .build();
/// let service = PreferenceService::new(registry, Arc::new(NoOpLogger));
///
/// user.set("editor.lineNumbers", json!("on"));
/// workspace.set("editor.lineNumbers", json!("off"));
/// assert_eq!(service.get("editor.lineNumbers"), Some(json!("off")));
/// assert_eq!(service.get("missing.key"), None);
/// ```
#[derive(Clone)]
pub struct PreferenceService {
    inner: Arc<ServiceInner>,
}

/// Non-owning handle to a [`PreferenceService`]
///
/// Useful inside change callbacks, which would otherwise keep the service
/// alive through its own listener table.
#[derive(Clone)]
pub struct WeakPreferenceService {
    inner: Weak<ServiceInner>,
}

impl WeakPreferenceService {
    pub fn upgrade(&self) -> Option<PreferenceService> {
        self.inner.upgrade().map(|inner| PreferenceService { inner })
    }
}

impl PreferenceService {
    /// Create a service with default options
    pub fn new(providers: ProviderRegistry, logger: SharedLogger) -> Self {
        Self::with_config(providers, ServiceConfig::default(), logger)
    }

    /// Create a service with explicit options
    pub fn with_config(providers: ProviderRegistry, config: ServiceConfig, logger: SharedLogger) -> Self {
        let readiness = Arc::new(ReadinessCoordinator::new(providers.len()));
        let resolver = PreferenceResolver::new(providers);
        let aggregator = ChangeAggregator::new(
            resolver.clone(),
            readiness.clone(),
            config.pending_events,
            logger.clone(),
        );

        let service = Self {
            inner: Arc::new(ServiceInner {
                resolver,
                readiness,
                aggregator,
                config,
                initialize_started: AtomicBool::new(false),
                lazy_initialize_spawned: AtomicBool::new(false),
                shutdown: ReadySignal::new(),
                logger,
            }),
        };
        service
    }

    pub fn downgrade(&self) -> WeakPreferenceService {
        WeakPreferenceService {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn providers(&self) -> &ProviderRegistry {
        self.inner.resolver.providers()
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.inner.config
    }

    /// Effective value of a key
    ///
    /// `None` when no scope defines the key, when its value cannot be read
    /// (reported to the logger), or after disposal.
    pub fn get(&self, key: &str) -> Option<PreferenceValue> {
        if self.is_disposed() {
            return None;
        }
        if !self.sync_readiness() {
            self.maybe_start_initialize();
        }

        match self.inner.resolver.resolve(key) {
            Ok(resolved) => resolved.map(|r| r.value),
            Err(e) => {
                log_diagnostic!(self.inner.logger, context = "key={}", key; "Failed to resolve preference {}: {}", key, e);
                None
            }
        }
    }

    /// Effective value, or `default` when undefined
    pub fn get_or(&self, key: &str, default: PreferenceValue) -> PreferenceValue {
        self.get(key).unwrap_or(default)
    }

    /// Effective value deserialized into `T`
    ///
    /// A value of the wrong shape is reported and read as `None`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key)?;
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(e) => {
                log_diagnostic!(self.inner.logger, context = "key={}", key; "Preference {} has an unexpected type: {}", key, e);
                None
            }
        }
    }

    /// Every effective value
    pub fn get_all(&self) -> HashMap<String, PreferenceValue> {
        if self.is_disposed() {
            return HashMap::new();
        }
        self.inner.resolver.resolve_all()
    }

    /// Per-scope values of a key
    pub fn inspect(&self, key: &str) -> Option<PreferenceInspection> {
        if self.is_disposed() {
            return None;
        }
        match self.inner.resolver.inspect(key) {
            Ok(inspection) => Some(inspection),
            Err(e) => {
                log_diagnostic!(self.inner.logger, context = "key={}", key; "Failed to inspect preference {}: {}", key, e);
                None
            }
        }
    }

    /// Register for effective change batches
    ///
    /// After disposal the returned subscription is inert and never fires.
    pub fn on_preference_changed<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&[PreferenceChange]) + Send + Sync + 'static,
    {
        if self.is_disposed() {
            return Subscription::inert();
        }
        self.inner
            .aggregator
            .subscribe(move |changes: &Vec<PreferenceChange>| callback(changes))
    }

    /// Whether every scope has finished its initial load
    pub fn is_ready(&self) -> bool {
        self.sync_readiness()
    }

    pub fn service_state(&self) -> ServiceState {
        self.sync_readiness();
        self.inner.readiness.service_state()
    }

    pub fn provider_states(&self) -> Vec<ProviderState> {
        self.sync_readiness();
        self.inner.readiness.provider_states()
    }

    /// Wait until every scope has finished its initial load
    ///
    /// Does not start loading by itself; see [`initialize`](Self::initialize).
    /// Returns early if the service is disposed while waiting.
    pub async fn ready(&self) {
        if self.sync_readiness() || self.is_disposed() {
            return;
        }

        let all_ready = async {
            let waits = self
                .providers()
                .iter()
                .enumerate()
                .map(|(index, provider)| async move {
                    provider.ready().await;
                    self.mark_provider_ready(index);
                });
            join_all(waits).await;
            self.inner.readiness.wait().await;
        };
        let disposed = self.inner.shutdown.wait();

        futures::pin_mut!(all_ready, disposed);
        select(all_ready, disposed).await;
    }

    /// Start the initial load of every scope and wait for readiness
    ///
    /// Idempotent: later calls only wait for readiness.
    pub async fn initialize(&self) {
        if self.is_disposed() {
            return;
        }
        if self.inner.initialize_started.swap(true, Ordering::SeqCst) {
            self.ready().await;
            return;
        }

        log_debug!(self.inner.logger, "Initializing {} preference scopes", self.providers().len());
        let loads = self
            .providers()
            .iter()
            .enumerate()
            .map(|(index, provider)| async move {
                self.inner.readiness.mark_initializing(index);
                provider.initialize().await;
                if provider.is_ready() {
                    self.mark_provider_ready(index);
                }
            });
        join_all(loads).await;

        self.ready().await;
    }

    fn maybe_start_initialize(&self) {
        if !self.inner.config.initialize_on_first_read
            || self.inner.initialize_started.load(Ordering::SeqCst)
        {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        if self.inner.lazy_initialize_spawned.swap(true, Ordering::SeqCst) {
            return;
        }

        let service = self.clone();
        handle.spawn(async move {
            service.initialize().await;
        });
    }

    /// Catch up with providers whose ready transition was not observed
    fn sync_readiness(&self) -> bool {
        self.inner.aggregator.sync_readiness()
    }

    fn mark_provider_ready(&self, index: usize) {
        self.inner.aggregator.mark_provider_ready(index);
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.shutdown.is_ready()
    }

    /// Release provider subscriptions and the change bus
    ///
    /// Idempotent and terminal. Never panics.
    pub fn dispose(&self) {
        if !self.inner.shutdown.set() {
            return;
        }
        self.inner.aggregator.dispose();
        log_debug!(self.inner.logger, "Preference service disposed");
    }
}

impl std::fmt::Debug for PreferenceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreferenceService")
            .field("scopes", &self.providers().scopes())
            .field("state", &self.inner.readiness.service_state())
            .field("config", &self.inner.config)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
