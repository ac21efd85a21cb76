//! Observer and subscription handle types.

use crate::types::Event;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Receives events from a source.
///
/// Cheap to clone; clones share the same handler.
pub struct Observer<T> {
    handler: Arc<dyn Fn(Event<T>) + Send + Sync>,
}

impl<T> Observer<T> {
    /// Observe every event.
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(Event<T>) + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
        }
    }

    /// Observe values only. Errors and completion are dropped.
    pub fn on_next<F>(f: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
        T: 'static,
    {
        Self::new(move |event| {
            if let Event::Next(value) = event {
                f(value);
            }
        })
    }

    /// Observer that ignores everything (side-effect-only subscriptions).
    pub fn noop() -> Self
    where
        T: 'static,
    {
        Self::new(|_| {})
    }

    /// Deliver an event.
    pub fn emit(&self, event: Event<T>) {
        (self.handler)(event)
    }

    pub fn next(&self, value: T) {
        self.emit(Event::Next(value))
    }
}

impl<T> Clone for Observer<T> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<T> fmt::Debug for Observer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer").finish_non_exhaustive()
    }
}

/// Ownership token for a live subscription.
///
/// `unsubscribe` stops further notifications and releases whatever the
/// source holds for this subscriber. It runs at most once; later calls are
/// no-ops. Dropping the handle unsubscribes.
pub struct Subscription {
    closed: Arc<AtomicBool>,
    teardown: Option<Box<dyn FnOnce() + Send>>,
    children: Vec<Subscription>,
}

impl Subscription {
    /// Subscription that runs `teardown` when released.
    pub fn new<F>(teardown: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::with_flag(Arc::new(AtomicBool::new(false)), teardown)
    }

    /// Subscription sharing its closed flag with the source, so the source
    /// can see the teardown before the teardown closure runs, and can mark
    /// the handle closed when it terminates.
    pub(crate) fn with_flag<F>(closed: Arc<AtomicBool>, teardown: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            closed,
            teardown: Some(Box::new(teardown)),
            children: Vec::new(),
        }
    }

    /// Subscription that holds nothing and is already closed.
    pub fn empty() -> Self {
        Self {
            closed: Arc::new(AtomicBool::new(true)),
            teardown: None,
            children: Vec::new(),
        }
    }

    /// Tie `child` to this subscription: it is released together with it.
    pub fn add(&mut self, mut child: Subscription) {
        if self.is_closed() {
            child.unsubscribe();
        } else {
            self.children.push(child);
        }
    }

    /// True once torn down, or once the source terminated.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Tear down. Idempotent.
    pub fn unsubscribe(&mut self) {
        self.closed.store(true, Ordering::Release);
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
        for mut child in self.children.drain(..) {
            child.unsubscribe();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("closed", &self.is_closed())
            .field("children", &self.children.len())
            .finish()
    }
}
