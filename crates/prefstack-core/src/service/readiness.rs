//! Per-provider and service-level readiness

use parking_lot::Mutex;

use crate::types::ReadySignal;

/// Lifecycle of one provider's initial load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderState {
    Uninitialized,
    Initializing,
    /// Terminal
    Ready,
}

/// Combined readiness of all providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// At least one provider is not ready; reads are best effort
    Pending,
    /// Every provider is ready; terminal
    Ready,
}

/// Tracks provider readiness and derives the service-level signal
///
/// Transitions only move forward. A service without providers is ready from
/// the start.
#[derive(Debug)]
pub struct ReadinessCoordinator {
    states: Mutex<Vec<ProviderState>>,
    signal: ReadySignal,
}

impl ReadinessCoordinator {
    pub fn new(provider_count: usize) -> Self {
        let signal = ReadySignal::new();
        if provider_count == 0 {
            signal.set();
        }
        Self {
            states: Mutex::new(vec![ProviderState::Uninitialized; provider_count]),
            signal,
        }
    }

    pub fn provider_state(&self, index: usize) -> Option<ProviderState> {
        self.states.lock().get(index).copied()
    }

    pub fn provider_states(&self) -> Vec<ProviderState> {
        self.states.lock().clone()
    }

    /// Record that a provider started loading; ignored once it is ready
    pub fn mark_initializing(&self, index: usize) {
        if let Some(state) = self.states.lock().get_mut(index) {
            if *state == ProviderState::Uninitialized {
                *state = ProviderState::Initializing;
            }
        }
    }

    /// Record that a provider finished loading
    ///
    /// Returns `true` only for the call that moved the service to ready.
    pub fn mark_ready(&self, index: usize) -> bool {
        let all_ready = {
            let mut states = self.states.lock();
            match states.get_mut(index) {
                Some(state) => *state = ProviderState::Ready,
                None => return false,
            }
            states.iter().all(|s| *s == ProviderState::Ready)
        };
        all_ready && self.signal.set()
    }

    pub fn service_state(&self) -> ServiceState {
        if self.signal.is_ready() {
            ServiceState::Ready
        } else {
            ServiceState::Pending
        }
    }

    pub fn is_ready(&self) -> bool {
        self.signal.is_ready()
    }

    /// Wait for service-level readiness
    pub async fn wait(&self) {
        self.signal.wait().await;
    }
}
