//! Preference service
//!
//! - `ReadinessCoordinator`: per-provider and service-level readiness
//! - `ChangeAggregator`: raw provider changes to effective change batches
//! - `PreferenceService`: the consumer facade

mod readiness;
mod aggregator;
mod preference_service;

pub use readiness::{ReadinessCoordinator, ProviderState, ServiceState};
pub use aggregator::ChangeAggregator;
pub use preference_service::{PreferenceService, WeakPreferenceService};
