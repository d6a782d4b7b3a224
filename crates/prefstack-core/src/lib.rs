//! prefstack Core
//!
//! Layered preferences for editor-style applications.
//! Each scope (user, workspace, ...) is a provider holding raw values; the
//! service answers reads with the value of the highest-precedence scope that
//! defines a key and reports only changes that move an effective value.
//!
//! ## Layering
//!
//! Providers are registered lowest precedence first. A scope that defines a
//! key masks every scope below it, whatever the lower value is:
//!
//! ```rust
//! use prefstack_core::{MemoryPreferenceProvider, PreferenceScope, PreferenceService, ProviderRegistry};
//! use prefstack_core::logging::NoOpLogger;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let user = Arc::new(MemoryPreferenceProvider::new(PreferenceScope::User));
//! let workspace = Arc::new(MemoryPreferenceProvider::new(PreferenceScope::Workspace));
//! let service = PreferenceService::new(
//!     ProviderRegistry::builder()
//!         .with_provider(user.clone())
//!         .with_provider(workspace.clone())
//!         .build(),
//!     Arc::new(NoOpLogger),
//! );
//!
//! let sub = service.on_preference_changed(|changes| {
//!     for change in changes {
//!         println!("{} -> {:?}", change.key, change.new_value);
//!     }
//! });
//!
//! workspace.set("editor.tabSize", json!(4));
//! user.set("editor.tabSize", json!(2)); // masked, no event
//! assert_eq!(service.get("editor.tabSize"), Some(json!(4)));
//!
//! sub.dispose();
//! service.dispose();
//! ```
//!
//! ## Readiness
//!
//! Reads never block. File-backed scopes load asynchronously; until they all
//! have, `get` answers from whatever is loaded. Await
//! [`PreferenceService::initialize`] (or [`PreferenceService::ready`] when
//! loading is driven elsewhere) before reads that need complete data.

pub mod types;
pub mod event;
pub mod logging;
pub mod config;
pub mod providers;
pub mod resolver;
pub mod service;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use types::{
    PreferenceScope, PreferenceValue,
    RawChange, ChangeBatch, PreferenceChange,
    ReadySignal,
};

pub use event::Subscription;

pub use logging::{Logger, SharedLogger, NoOpLogger, ConsoleLogger, MemoryLogger};

pub use config::{ServiceConfig, PendingEventPolicy, ConfigError, ConfigResult};

pub use providers::{
    PreferenceProvider, PreferenceError, PreferenceResult, ReadyListener,
    MemoryPreferenceProvider, FilePreferenceProvider,
    ProviderRegistry, ProviderRegistryBuilder,
};

pub use resolver::{PreferenceResolver, ResolvedPreference, PreferenceInspection, ScopedValue};

pub use service::{PreferenceService, WeakPreferenceService, ProviderState, ServiceState};
