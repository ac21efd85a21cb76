//! Channel-backed source for values produced off the render thread.
//!
//! Producers hold an [`Emitter`] and may run on any thread. Events queue in a
//! crossbeam channel until the render thread calls [`ChannelSource::pump`],
//! which delivers them to subscribers in send order. Observers therefore
//! always run on the thread that pumps.

use crate::error::{BridgeError, Result, SourceError};
use crate::subscriptions::{Observer, Subscription};
use crate::types::Event;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use tracing::trace;

use super::{Source, Subject};

/// Producer end of a [`ChannelSource`].
pub struct Emitter<T> {
    sender: Sender<Event<T>>,
}

impl<T> Emitter<T> {
    /// Queue a value. Blocks while a bounded buffer is full.
    pub fn send(&self, value: T) -> Result<()> {
        self.sender
            .send(Event::Next(value))
            .map_err(|_| BridgeError::Disconnected)
    }

    /// Queue a value without blocking.
    pub fn try_send(&self, value: T) -> Result<()> {
        match self.sender.try_send(Event::Next(value)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(BridgeError::Full(self.sender.len())),
            Err(TrySendError::Disconnected(_)) => Err(BridgeError::Disconnected),
        }
    }

    /// Queue a terminal error.
    pub fn fail(&self, error: SourceError) -> Result<()> {
        self.sender
            .send(Event::Error(error))
            .map_err(|_| BridgeError::Disconnected)
    }

    /// Queue completion.
    pub fn complete(&self) -> Result<()> {
        self.sender
            .send(Event::Complete)
            .map_err(|_| BridgeError::Disconnected)
    }
}

impl<T> Clone for Emitter<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

/// Consumer end: a plain source fed by [`Emitter`]s.
pub struct ChannelSource<T> {
    receiver: Receiver<Event<T>>,
    subject: Subject<T>,
}

/// Create a channel source holding at most `capacity` undelivered events.
pub fn channel<T: Clone + Send + 'static>(capacity: usize) -> (Emitter<T>, ChannelSource<T>) {
    let (sender, receiver) = bounded(capacity);
    (Emitter { sender }, ChannelSource::from_receiver(receiver))
}

/// Create a channel source with no buffer limit.
pub fn unbounded_channel<T: Clone + Send + 'static>() -> (Emitter<T>, ChannelSource<T>) {
    let (sender, receiver) = unbounded();
    (Emitter { sender }, ChannelSource::from_receiver(receiver))
}

impl<T: Clone + Send + 'static> ChannelSource<T> {
    fn from_receiver(receiver: Receiver<Event<T>>) -> Self {
        Self {
            receiver,
            subject: Subject::new(),
        }
    }

    /// Deliver every queued event to current subscribers.
    ///
    /// Returns the number of events drained. Events after a terminal event
    /// are discarded.
    pub fn pump(&self) -> usize {
        let mut drained = 0;
        while let Ok(event) = self.receiver.try_recv() {
            drained += 1;
            let delivered = match event {
                Event::Next(value) => self.subject.next(value),
                Event::Error(err) => self.subject.error(err),
                Event::Complete => self.subject.complete(),
            };
            if delivered.is_err() {
                trace!("discarding event queued after termination");
            }
        }
        drained
    }

    /// Events waiting to be pumped.
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subject.subscriber_count()
    }
}

impl<T: Clone + Send + 'static> Source<T> for ChannelSource<T> {
    fn subscribe(&self, observer: Observer<T>) -> Subscription {
        self.subject.subscribe(observer)
    }
}
