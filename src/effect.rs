//! Side-effect-only subscriptions tied to a rendering unit.

use crate::deps::{Identity, Memo, SourceDeps};
use crate::error::SourceError;
use crate::sources::{SharedSource, Source};
use crate::subscriptions::{Observer, Subscription};
use crate::types::{EffectStats, Event};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

/// Keeps a source subscribed for its side effects while a rendering unit is
/// mounted.
///
/// Values are ignored. The subscription is released when the unit unmounts
/// (or the value is dropped) and when the dependencies change, in which case
/// the old subscription is always released before the new source is
/// derived and subscribed.
pub struct EffectSubscription<D> {
    memo: Memo<D>,
    active: Option<Subscription>,
    last_error: Arc<Mutex<Option<SourceError>>>,
    stats: EffectStats,
}

impl<D: PartialEq> EffectSubscription<D> {
    pub fn new() -> Self {
        Self {
            memo: Memo::new(),
            active: None,
            last_error: Arc::new(Mutex::new(None)),
            stats: EffectStats::default(),
        }
    }

    /// Establish the subscription for `deps`.
    ///
    /// Does nothing if `deps` equals the previous call's. Otherwise releases
    /// the current subscription, then derives and subscribes the new source.
    /// A derivation returning `None` leaves the effect unsubscribed.
    pub fn update<T, F>(&mut self, deps: D, derive: F)
    where
        T: Clone + Send + 'static,
        F: FnOnce() -> Option<SharedSource<T>>,
    {
        if self.memo.is_current(&deps) {
            return;
        }

        self.release();
        self.memo.store(deps);
        *self.last_error.lock() = None;

        let Some(source) = derive() else {
            return;
        };

        let last_error = Arc::clone(&self.last_error);
        let subscription = source.subscribe(Observer::new(move |event: Event<T>| {
            if let Event::Error(err) = event {
                warn!(error = %err, "effect source failed");
                *last_error.lock() = Some(err);
            }
        }));

        self.stats.subscribes += 1;
        debug!(subscribes = self.stats.subscribes, "effect subscribed");
        self.active = Some(subscription);
    }

    /// Release the subscription and forget the dependencies.
    pub fn unmount(&mut self) {
        self.release();
        self.memo.clear();
    }

    /// True while subscribed to a source that has not terminated.
    pub fn is_active(&self) -> bool {
        self.active.as_ref().is_some_and(|sub| !sub.is_closed())
    }

    /// Terminal error from the current source.
    pub fn last_error(&self) -> Option<SourceError> {
        self.last_error.lock().clone()
    }

    pub fn stats(&self) -> EffectStats {
        self.stats.clone()
    }

    fn release(&mut self) {
        if let Some(mut subscription) = self.active.take() {
            subscription.unsubscribe();
            self.stats.teardowns += 1;
            debug!(teardowns = self.stats.teardowns, "effect released");
        }
    }
}

impl<T: Clone + Send + 'static> EffectSubscription<SourceDeps<T>> {
    /// Use `source` directly; its identity is the dependency.
    pub fn use_source(&mut self, source: Option<SharedSource<T>>) {
        let deps = source.as_ref().map(Identity::of);
        self.update(deps, || source);
    }
}

impl<D: PartialEq> Default for EffectSubscription<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> Drop for EffectSubscription<D> {
    fn drop(&mut self) {
        if let Some(mut subscription) = self.active.take() {
            subscription.unsubscribe();
        }
    }
}
