//! Synchronous multi-listener emitter
//!
//! Listeners run on the thread that fires the event. The listener table is
//! locked only to take a snapshot, so a listener may subscribe, dispose or
//! fire again while it is being called.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::subscription::{Subscription, Unsubscribe};

/// Listener callback type
pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct ListenerEntry<T> {
    id: u64,
    active: Arc<AtomicBool>,
    callback: Listener<T>,
}

impl<T> Clone for ListenerEntry<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            active: self.active.clone(),
            callback: self.callback.clone(),
        }
    }
}

struct EmitterInner<T> {
    listeners: Mutex<Vec<ListenerEntry<T>>>,
    next_id: AtomicU64,
    fired: AtomicU64,
    disposed: AtomicBool,
}

impl<T> Unsubscribe for EmitterInner<T> {
    fn unsubscribe(&self, id: u64) {
        self.listeners.lock().retain(|entry| entry.id != id);
    }

    fn is_closed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

/// Event source delivering `&T` to every active listener
///
/// # Example
///
/// ```
/// use prefstack_core::event::Emitter;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let emitter = Emitter::<u32>::new();
/// let seen = Arc::new(AtomicUsize::new(0));
/// let counter = seen.clone();
/// let sub = emitter.subscribe(move |n: &u32| {
///     counter.fetch_add(*n as usize, Ordering::SeqCst);
/// });
///
/// emitter.fire(&2);
/// sub.dispose();
/// emitter.fire(&5);
/// assert_eq!(seen.load(Ordering::SeqCst), 2);
/// ```
pub struct Emitter<T> {
    inner: Arc<EmitterInner<T>>,
}

impl<T: 'static> Default for Emitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Emitter<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(EmitterInner {
                listeners: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
                fired: AtomicU64::new(0),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Register a listener
    ///
    /// Returns an inert subscription if the emitter was disposed.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.subscribe_listener(Arc::new(callback))
    }

    /// Register an already shared listener
    pub fn subscribe_listener(&self, callback: Listener<T>) -> Subscription {
        if self.is_disposed() {
            return Subscription::inert();
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let active = Arc::new(AtomicBool::new(true));
        self.inner.listeners.lock().push(ListenerEntry {
            id,
            active: active.clone(),
            callback,
        });

        let owner: Weak<dyn Unsubscribe> = Arc::downgrade(&self.inner) as Weak<dyn Unsubscribe>;
        Subscription::new(id, active, owner)
    }

    /// Deliver an event to every active listener
    pub fn fire(&self, event: &T) {
        if self.is_disposed() {
            return;
        }
        self.inner.fired.fetch_add(1, Ordering::Relaxed);

        let snapshot: Vec<ListenerEntry<T>> = self.inner.listeners.lock().clone();
        for entry in snapshot {
            // A listener disposed earlier in this dispatch must not run.
            if entry.active.load(Ordering::SeqCst) {
                (entry.callback)(event);
            }
        }
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }

    /// Total number of events fired
    pub fn total_fired(&self) -> u64 {
        self.inner.fired.load(Ordering::Relaxed)
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Release every listener and refuse new events
    ///
    /// A dispatch that already took its snapshot runs to completion, so a
    /// listener disposing the emitter does not cut off the listeners after it.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.listeners.lock().clear();
    }
}

impl<T> std::fmt::Debug for Emitter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("listeners", &self.inner.listeners.lock().len())
            .field("disposed", &self.inner.disposed.load(Ordering::SeqCst))
            .finish()
    }
}
