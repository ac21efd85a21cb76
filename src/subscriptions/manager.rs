//! Subscription manager for broadcasting source events.

use crate::types::{Event, SubscriptionId};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::trace;

use super::types::{Observer, Subscription};

/// Internal subscriber state.
struct Subscriber<T> {
    observer: Observer<T>,
    /// Shared with the subscriber's handle.
    closed: Arc<AtomicBool>,
}

impl<T> Subscriber<T> {
    /// Deliver unless the handle was torn down, even mid-broadcast.
    fn deliver(&self, event: Event<T>) {
        if !self.closed.load(Ordering::Acquire) {
            self.observer.emit(event);
        }
    }
}

impl<T> Clone for Subscriber<T> {
    fn clone(&self) -> Self {
        Self {
            observer: self.observer.clone(),
            closed: Arc::clone(&self.closed),
        }
    }
}

/// Manages subscribers and broadcasts events to them in registration order.
///
/// Locks are released before any observer runs, so observers may subscribe,
/// unsubscribe or emit re-entrantly.
pub struct SubscriptionManager<T> {
    /// Active subscribers by ID. IDs are monotonic, so map order is
    /// registration order.
    subscribers: RwLock<BTreeMap<SubscriptionId, Subscriber<T>>>,
    /// Counter for generating subscription IDs.
    next_id: AtomicU64,
}

impl<T: Clone + Send + 'static> SubscriptionManager<T> {
    /// Create a new subscription manager.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            subscribers: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        })
    }

    /// Register an observer.
    ///
    /// The returned handle removes the observer when released.
    pub fn subscribe(self: &Arc<Self>, observer: Observer<T>) -> Subscription {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let closed = Arc::new(AtomicBool::new(false));

        self.subscribers.write().insert(
            id,
            Subscriber {
                observer,
                closed: Arc::clone(&closed),
            },
        );
        trace!(%id, "subscriber registered");

        let manager: Weak<Self> = Arc::downgrade(self);
        Subscription::with_flag(closed, move || {
            if let Some(manager) = manager.upgrade() {
                manager.unsubscribe(id);
            }
        })
    }

    /// Remove a subscriber.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        if let Some(sub) = self.subscribers.write().remove(&id) {
            sub.closed.store(true, Ordering::Release);
            trace!(%id, "subscriber removed");
        }
    }

    /// Get subscriber count.
    pub fn subscription_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Broadcast a value to every subscriber.
    pub fn broadcast(&self, value: T) {
        let subs: Vec<Subscriber<T>> = self.subscribers.read().values().cloned().collect();
        for sub in subs {
            sub.deliver(Event::Next(value.clone()));
        }
    }

    /// Broadcast a terminal event and drop every subscriber.
    pub fn terminate(&self, event: Event<T>) {
        let subs = std::mem::take(&mut *self.subscribers.write());
        for (_, sub) in subs {
            sub.deliver(event.clone());
            sub.closed.store(true, Ordering::Release);
        }
    }
}
