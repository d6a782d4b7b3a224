//! Disposable subscription handle

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Something a subscription can detach itself from
pub(crate) trait Unsubscribe: Send + Sync {
    fn unsubscribe(&self, id: u64);

    /// Whether the source stopped accepting and delivering events
    fn is_closed(&self) -> bool;
}

/// Handle binding a listener to an event source
///
/// Disposing stops all future callbacks, including callbacks of a dispatch
/// that is currently in progress but has not reached this listener yet.
/// Disposal is idempotent and keeps working after the source is gone.
/// Dropping the handle does not dispose it.
///
/// Closing the source itself only stops later events; a dispatch already in
/// progress still reaches every listener that was not disposed individually.
#[must_use = "dropping a Subscription keeps the listener registered; call dispose() to remove it"]
pub struct Subscription {
    id: u64,
    active: Arc<AtomicBool>,
    owner: Option<Weak<dyn Unsubscribe>>,
}

impl Subscription {
    pub(crate) fn new(id: u64, active: Arc<AtomicBool>, owner: Weak<dyn Unsubscribe>) -> Self {
        Self {
            id,
            active,
            owner: Some(owner),
        }
    }

    /// A subscription that is not attached to anything and never fires
    pub fn inert() -> Self {
        Self {
            id: 0,
            active: Arc::new(AtomicBool::new(false)),
            owner: None,
        }
    }

    /// Whether the listener can still receive new events
    pub fn is_active(&self) -> bool {
        if !self.active.load(Ordering::SeqCst) {
            return false;
        }
        match self.owner.as_ref().and_then(Weak::upgrade) {
            Some(owner) => !owner.is_closed(),
            None => false,
        }
    }

    /// Stop receiving events
    pub fn dispose(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(owner) = self.owner.as_ref().and_then(Weak::upgrade) {
            owner.unsubscribe(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
