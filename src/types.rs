//! Core types shared by sources, bridges and effect subscriptions.

use crate::error::SourceError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Something a source delivers to an observer.
#[derive(Clone, Debug)]
pub enum Event<T> {
    /// A new value.
    Next(T),
    /// The source failed. Terminal.
    Error(SourceError),
    /// The source finished. Terminal.
    Complete,
}

impl<T> Event<T> {
    /// True for `Error` and `Complete`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Event::Next(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Event<U> {
        match self {
            Event::Next(value) => Event::Next(f(value)),
            Event::Error(err) => Event::Error(err),
            Event::Complete => Event::Complete,
        }
    }
}

/// Execution context a bridge reads snapshots in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderContext {
    /// The renderer can re-render on change; subscriptions persist.
    #[default]
    Interactive,
    /// A single render pass (e.g. producing an initial page); nothing persists.
    NonInteractive,
}

/// Unique identifier for a subscription to a source.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

impl fmt::Debug for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriptionId({})", self.0)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifetime counters for a [`SnapshotBridge`](crate::SnapshotBridge).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeStats {
    /// Times the source was (re)derived from its dependencies.
    pub derivations: u64,
    /// Persistent subscriptions opened on the source.
    pub subscriptions_opened: u64,
    /// Persistent subscriptions torn down.
    pub subscriptions_closed: u64,
    /// Values observed from the source.
    pub emissions: u64,
    /// Take-one reads performed in a non-interactive context.
    pub one_shot_reads: u64,
    /// Notifier invocations.
    pub notifications: u64,
}

/// Lifetime counters for an [`EffectSubscription`](crate::EffectSubscription).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectStats {
    pub subscribes: u64,
    pub teardowns: u64,
}
