//! Push-based sources.
//!
//! A [`Source`] delivers [`Event`]s to observers over time. A *stateful*
//! source additionally exposes its current value synchronously through
//! [`Source::current_value`] and replays it to every new subscriber.
//!
//! - [`Subject`]: plain multicast source
//! - [`StateSubject`]: stateful multicast source
//! - [`just`], [`never`], [`from_fn`]: one-off constructors
//! - [`SourceExt::take`] and [`SourceExt::map`]: operators
//! - [`channel`]: hands values from producer threads to the render thread

mod channel;
mod ops;
mod subject;

use crate::subscriptions::{Observer, Subscription};
use std::sync::Arc;

pub use channel::{channel, unbounded_channel, ChannelSource, Emitter};
pub use ops::{from_fn, just, never, FnSource, Just, Map, Never, Take};
pub use subject::{StateSubject, Subject};

/// A push-based producer of values.
pub trait Source<T>: Send + Sync {
    /// Start delivering events to `observer` until the returned handle is
    /// released or the source terminates.
    fn subscribe(&self, observer: Observer<T>) -> Subscription;

    /// Synchronously readable current value.
    ///
    /// `Some` marks a stateful source; plain sources keep the default.
    fn current_value(&self) -> Option<T> {
        None
    }
}

/// Type-erased, shareable source.
pub type SharedSource<T> = Arc<dyn Source<T>>;

impl<T, S> Source<T> for Arc<S>
where
    S: Source<T> + ?Sized,
{
    fn subscribe(&self, observer: Observer<T>) -> Subscription {
        (**self).subscribe(observer)
    }

    fn current_value(&self) -> Option<T> {
        (**self).current_value()
    }
}

/// Operators available on every concrete source.
pub trait SourceExt<T>: Source<T> + Sized + 'static
where
    T: Clone + Send + 'static,
{
    /// Deliver at most `count` values, then complete and release the
    /// upstream subscription.
    fn take(self, count: usize) -> Take<T> {
        Take::new(Arc::new(self), count)
    }

    /// Transform each value. Stateful sources stay stateful.
    fn map<U: 'static, F>(self, f: F) -> Map<T, U>
    where
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        Map::new(Arc::new(self), f)
    }

    /// Erase the concrete type.
    fn shared(self) -> SharedSource<T> {
        Arc::new(self)
    }
}

impl<T, S> SourceExt<T> for S
where
    S: Source<T> + Sized + 'static,
    T: Clone + Send + 'static,
{
}
