//! Multicast sources driven by explicit calls.

use crate::error::{BridgeError, Result, SourceError};
use crate::subscriptions::{Observer, Subscription, SubscriptionManager};
use crate::types::Event;
use parking_lot::Mutex;
use std::sync::Arc;

use super::Source;

/// Plain multicast source.
///
/// Values are delivered only to observers subscribed at the time of the
/// call. Once terminated (`error` or `complete`), late subscribers receive
/// the terminal event immediately.
pub struct Subject<T> {
    subscribers: Arc<SubscriptionManager<T>>,
    terminal: Arc<Mutex<Option<Event<T>>>>,
}

impl<T: Clone + Send + 'static> Subject<T> {
    pub fn new() -> Self {
        Self {
            subscribers: SubscriptionManager::new(),
            terminal: Arc::new(Mutex::new(None)),
        }
    }

    /// Emit a value to all current subscribers.
    pub fn next(&self, value: T) -> Result<()> {
        self.next_with(|| value)
    }

    /// Produce a value under the terminal lock, then emit it. `produce` does
    /// not run once the source has terminated.
    fn next_with(&self, produce: impl FnOnce() -> T) -> Result<()> {
        let value = {
            let terminal = self.terminal.lock();
            if terminal.is_some() {
                return Err(BridgeError::Terminated);
            }
            produce()
        };
        self.subscribers.broadcast(value);
        Ok(())
    }

    /// Fail the source.
    pub fn error(&self, error: SourceError) -> Result<()> {
        self.finish(Event::Error(error))
    }

    /// Complete the source.
    pub fn complete(&self) -> Result<()> {
        self.finish(Event::Complete)
    }

    pub fn is_terminated(&self) -> bool {
        self.terminal.lock().is_some()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.subscription_count()
    }

    fn finish(&self, event: Event<T>) -> Result<()> {
        {
            let mut terminal = self.terminal.lock();
            if terminal.is_some() {
                return Err(BridgeError::Terminated);
            }
            *terminal = Some(event.clone());
        }
        self.subscribers.terminate(event);
        Ok(())
    }
}

impl<T: Clone + Send + 'static> Source<T> for Subject<T> {
    fn subscribe(&self, observer: Observer<T>) -> Subscription {
        // Registration happens under the terminal lock so a concurrent
        // `finish` either sees this subscriber or is seen by it.
        let terminal = self.terminal.lock();
        if let Some(event) = (*terminal).clone() {
            drop(terminal);
            observer.emit(event);
            return Subscription::empty();
        }
        self.subscribers.subscribe(observer)
    }
}

impl<T: Clone + Send + 'static> Default for Subject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            subscribers: Arc::clone(&self.subscribers),
            terminal: Arc::clone(&self.terminal),
        }
    }
}

/// Stateful multicast source.
///
/// Holds a current value that is readable synchronously and replayed to each
/// new subscriber before any later emission.
pub struct StateSubject<T> {
    subject: Subject<T>,
    value: Arc<Mutex<T>>,
}

impl<T: Clone + Send + 'static> StateSubject<T> {
    pub fn new(initial: T) -> Self {
        Self {
            subject: Subject::new(),
            value: Arc::new(Mutex::new(initial)),
        }
    }

    /// Current value.
    pub fn value(&self) -> T {
        self.value.lock().clone()
    }

    /// Replace the current value and emit it. Leaves the value untouched
    /// once terminated.
    pub fn set(&self, value: T) -> Result<()> {
        self.subject.next_with(|| {
            *self.value.lock() = value.clone();
            value
        })
    }

    /// Modify the current value in place and emit the result.
    ///
    /// `f` runs with the subject locked and must not call back into it.
    pub fn update(&self, f: impl FnOnce(&mut T)) -> Result<()> {
        self.subject.next_with(|| {
            let mut current = self.value.lock();
            f(&mut current);
            current.clone()
        })
    }

    /// True if no other handle to this subject exists.
    pub(crate) fn is_unshared(&self) -> bool {
        Arc::strong_count(&self.value) == 1
    }

    pub fn error(&self, error: SourceError) -> Result<()> {
        self.subject.error(error)
    }

    pub fn complete(&self) -> Result<()> {
        self.subject.complete()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subject.subscriber_count()
    }
}

impl<T: Clone + Send + 'static> Source<T> for StateSubject<T> {
    fn subscribe(&self, observer: Observer<T>) -> Subscription {
        let current = self.value();
        let subscription = self.subject.subscribe(observer.clone());
        if !subscription.is_closed() {
            observer.next(current);
        }
        subscription
    }

    fn current_value(&self) -> Option<T> {
        Some(self.value())
    }
}

impl<T> Clone for StateSubject<T> {
    fn clone(&self) -> Self {
        Self {
            subject: self.subject.clone(),
            value: Arc::clone(&self.value),
        }
    }
}
