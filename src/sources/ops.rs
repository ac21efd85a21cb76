//! Source constructors and operators.

use crate::subscriptions::{Observer, Subscription};
use crate::types::Event;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use super::{SharedSource, Source};

/// Emits one value synchronously, then completes.
pub struct Just<T> {
    value: T,
}

/// Source that emits `value` once to each subscriber and completes.
pub fn just<T: Clone + Send + Sync + 'static>(value: T) -> Just<T> {
    Just { value }
}

impl<T: Clone + Send + Sync + 'static> Source<T> for Just<T> {
    fn subscribe(&self, observer: Observer<T>) -> Subscription {
        observer.next(self.value.clone());
        observer.emit(Event::Complete);
        Subscription::empty()
    }
}

/// Never emits and has no current value.
pub struct Never;

pub fn never() -> Never {
    Never
}

impl<T> Source<T> for Never {
    fn subscribe(&self, _observer: Observer<T>) -> Subscription {
        Subscription::new(|| {})
    }
}

type Producer<T> = dyn Fn(Observer<T>) -> Subscription + Send + Sync;

/// Source defined by a producer closure, run once per subscriber.
pub struct FnSource<T> {
    producer: Arc<Producer<T>>,
}

/// Build a source from a closure that starts producing into the observer and
/// returns the teardown for that production.
pub fn from_fn<T, F>(producer: F) -> FnSource<T>
where
    F: Fn(Observer<T>) -> Subscription + Send + Sync + 'static,
{
    FnSource {
        producer: Arc::new(producer),
    }
}

impl<T> Source<T> for FnSource<T> {
    fn subscribe(&self, observer: Observer<T>) -> Subscription {
        (self.producer)(observer)
    }
}

impl<T> Clone for FnSource<T> {
    fn clone(&self) -> Self {
        Self {
            producer: Arc::clone(&self.producer),
        }
    }
}

/// Delivers at most `count` values, then completes and releases upstream.
pub struct Take<T> {
    upstream: SharedSource<T>,
    count: usize,
}

impl<T: Clone + Send + 'static> Take<T> {
    pub fn new(upstream: SharedSource<T>, count: usize) -> Self {
        Self { upstream, count }
    }
}

impl<T: Clone + Send + 'static> Source<T> for Take<T> {
    fn subscribe(&self, observer: Observer<T>) -> Subscription {
        if self.count == 0 {
            observer.emit(Event::Complete);
            return Subscription::empty();
        }

        let remaining = Arc::new(AtomicUsize::new(self.count));
        // Set when the limit is hit, upstream terminates, or downstream
        // unsubscribes. Shared with the returned handle.
        let closed = Arc::new(AtomicBool::new(false));
        let upstream_slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let handler = {
            let closed = Arc::clone(&closed);
            let upstream_slot = Arc::clone(&upstream_slot);
            move |event: Event<T>| {
                if closed.load(Ordering::Acquire) {
                    return;
                }
                match event {
                    Event::Next(value) => {
                        let before = remaining.fetch_sub(1, Ordering::AcqRel);
                        observer.next(value);
                        if before == 1 {
                            closed.store(true, Ordering::Release);
                            observer.emit(Event::Complete);
                            let upstream = upstream_slot.lock().take();
                            drop(upstream);
                        }
                    }
                    terminal => {
                        closed.store(true, Ordering::Release);
                        observer.emit(terminal);
                    }
                }
            }
        };

        let upstream = self.upstream.subscribe(Observer::new(handler));
        if closed.load(Ordering::Acquire) {
            // Finished during the synchronous part of subscribe.
            drop(upstream);
            return Subscription::empty();
        }
        *upstream_slot.lock() = Some(upstream);

        Subscription::with_flag(closed, move || {
            let upstream = upstream_slot.lock().take();
            drop(upstream);
        })
    }
}

/// Transforms each value with a function.
pub struct Map<T, U> {
    upstream: SharedSource<T>,
    f: Arc<dyn Fn(T) -> U + Send + Sync>,
}

impl<T: 'static, U: 'static> Map<T, U> {
    pub fn new<F>(upstream: SharedSource<T>, f: F) -> Self
    where
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        Self {
            upstream,
            f: Arc::new(f),
        }
    }
}

impl<T: 'static, U: 'static> Source<U> for Map<T, U> {
    fn subscribe(&self, observer: Observer<U>) -> Subscription {
        let f = Arc::clone(&self.f);
        self.upstream
            .subscribe(Observer::new(move |event: Event<T>| observer.emit(event.map(|v| f(v)))))
    }

    fn current_value(&self) -> Option<U> {
        self.upstream.current_value().map(|v| (self.f)(v))
    }
}
