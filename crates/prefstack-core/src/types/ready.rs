//! One-shot readiness signal

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Signal that transitions from pending to ready exactly once
///
/// Cloned signals share state. Waiting on an already-ready signal returns
/// immediately; there is no way back to pending.
#[derive(Clone)]
pub struct ReadySignal {
    inner: Arc<ReadySignalInner>,
}

struct ReadySignalInner {
    ready: AtomicBool,
    notify: Notify,
}

impl Default for ReadySignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadySignal {
    /// Create a pending signal
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ReadySignalInner {
                ready: AtomicBool::new(false),
                notify: Notify::new(),
            }),
        }
    }

    /// Create a signal that is already ready
    pub fn ready() -> Self {
        let signal = Self::new();
        signal.set();
        signal
    }

    pub fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::SeqCst)
    }

    /// Mark the signal ready
    ///
    /// Returns `true` only for the call that performed the transition.
    pub fn set(&self) -> bool {
        if self.inner.ready.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.inner.notify.notify_waiters();
        true
    }

    /// Wait until the signal is ready
    pub async fn wait(&self) {
        loop {
            // Register before checking the flag so a concurrent `set` is not missed.
            let notified = self.inner.notify.notified();
            if self.is_ready() {
                return;
            }
            notified.await;
        }
    }
}

impl std::fmt::Debug for ReadySignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadySignal")
            .field("is_ready", &self.is_ready())
            .finish()
    }
}
