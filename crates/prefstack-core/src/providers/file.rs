//! File-based preference provider (JSON)
//!
//! Supports user-level (~/.config/prefstack/settings.json) and workspace-level
//! (.prefstack/settings.json) scopes. The file holds one flat JSON object of
//! preference keys.

use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex as AsyncMutex;

use crate::event::Subscription;
use crate::logging::SharedLogger;
use crate::types::{PreferenceScope, PreferenceValue};
use crate::{log_debug, log_diagnostic, log_info};
use super::error::{PreferenceError, PreferenceResult};
use super::state::ScopeState;
use super::traits::{ChangeListener, PreferenceProvider, ReadyListener};

/// File-based preference provider
///
/// The initial load runs on [`initialize`](PreferenceProvider::initialize).
/// A missing file is an empty scope. An unreadable or malformed file is
/// reported to the logger and also loads as an empty scope, so readiness is
/// always reached.
///
/// # Example
///
/// ```no_run
/// use prefstack_core::providers::FilePreferenceProvider;
/// use prefstack_core::logging::NoOpLogger;
/// use std::sync::Arc;
///
/// // User-level settings
/// let user = FilePreferenceProvider::user(Arc::new(NoOpLogger));
///
/// // Workspace-level settings
/// let workspace = FilePreferenceProvider::workspace("/path/to/workspace", Arc::new(NoOpLogger));
/// ```
pub struct FilePreferenceProvider {
    path: PathBuf,
    scope: PreferenceScope,
    state: ScopeState,
    load_started: AtomicBool,
    write_lock: AsyncMutex<()>,
    logger: SharedLogger,
}

impl FilePreferenceProvider {
    /// Create a new file provider for a specific path
    pub fn new(path: impl Into<PathBuf>, scope: PreferenceScope, logger: SharedLogger) -> Self {
        Self {
            path: path.into(),
            state: ScopeState::new(scope.as_str()),
            scope,
            load_started: AtomicBool::new(false),
            write_lock: AsyncMutex::new(()),
            logger,
        }
    }

    /// Create a user-level provider (~/.config/prefstack/settings.json)
    pub fn user(logger: SharedLogger) -> Self {
        // Use XDG config directory (~/.config on Linux, ~/Library/Application Support on macOS)
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".config"));
        let path = config_dir.join("prefstack").join("settings.json");
        Self::new(path, PreferenceScope::User, logger)
    }

    /// Create a workspace-level provider (.prefstack/settings.json)
    pub fn workspace(workspace_root: impl AsRef<Path>, logger: SharedLogger) -> Self {
        let path = workspace_root.as_ref().join(".prefstack").join("settings.json");
        Self::new(path, PreferenceScope::Workspace, logger)
    }

    /// Get the settings file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn preference_scope(&self) -> &PreferenceScope {
        &self.scope
    }

    /// Check if the settings file exists
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    async fn read_file(&self) -> PreferenceResult<HashMap<String, PreferenceValue>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(HashMap::new());
        }

        let object: serde_json::Map<String, PreferenceValue> = serde_json::from_str(&content)?;
        Ok(object.into_iter().collect())
    }

    async fn load(&self) {
        let values = match self.read_file().await {
            Ok(values) => values,
            Err(e) => {
                log_diagnostic!(self.logger, context = "{}", self.path.display();
                    "Failed to load {} preferences: {}", self.scope, e);
                HashMap::new()
            }
        };

        log_debug!(self.logger, "Loaded {} {} preferences from {}", values.len(), self.scope, self.path.display());
        self.state.replace_all(values);
        self.state.mark_ready();
    }

    /// Re-read the file and emit the difference
    ///
    /// Unlike the initial load, errors are returned to the caller and the
    /// current values are kept.
    pub async fn reload(&self) -> PreferenceResult<()> {
        let _guard = self.write_lock.lock().await;
        let values = self.read_file().await?;
        self.load_started.store(true, Ordering::SeqCst);
        self.state.replace_all(values);
        self.state.mark_ready();
        Ok(())
    }

    /// Set (`Some`) or remove (`None`) a value and persist the file
    ///
    /// The file is written first; memory and listeners only see the change
    /// once it is on disk.
    pub async fn set_preference(
        &self,
        key: &str,
        value: Option<PreferenceValue>,
    ) -> PreferenceResult<()> {
        if !self.is_ready() {
            return Err(PreferenceError::NotReady(self.scope.to_string()));
        }

        let _guard = self.write_lock.lock().await;
        let mut next = self.state.snapshot();
        match &value {
            Some(v) => next.insert(key.to_string(), v.clone()),
            None => next.remove(key),
        };
        self.save(next).await?;
        self.state.update(vec![(key.to_string(), value)]);
        Ok(())
    }

    async fn save(&self, values: HashMap<String, PreferenceValue>) -> PreferenceResult<()> {
        // Sorted keys keep the file stable across writes
        let sorted: BTreeMap<String, PreferenceValue> = values.into_iter().collect();
        let content = serde_json::to_string_pretty(&sorted)?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, content).await?;

        log_info!(self.logger, "Saved {} preferences to {}", self.scope, self.path.display());
        Ok(())
    }
}

impl std::fmt::Debug for FilePreferenceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilePreferenceProvider")
            .field("path", &self.path)
            .field("scope", &self.scope)
            .field("exists", &self.exists())
            .field("ready", &self.state.ready_signal().is_ready())
            .finish()
    }
}

#[async_trait]
impl PreferenceProvider for FilePreferenceProvider {
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
        if self.load_started.swap(true, Ordering::SeqCst) {
            self.state.ready_signal().wait().await;
            return;
        }
        self.load().await;
    }

    fn on_did_change(&self, listener: ChangeListener) -> Subscription {
        self.state.subscribe(listener)
    }

    fn on_did_become_ready(&self, listener: ReadyListener) -> Subscription {
        self.state.subscribe_ready(listener)
    }
}
