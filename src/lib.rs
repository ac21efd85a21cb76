//! # Store Bridge
//!
//! Lets a renderer that pulls state ("give me the current snapshot, and tell
//! me when it changes") consume state pushed by asynchronous sources.
//!
//! ## Core Concepts
//!
//! - **Sources**: push-based producers; stateful ones expose a current value
//! - **SnapshotBridge**: a `(subscribe, get_snapshot)` pair over one source
//! - **EffectSubscription**: keeps a source subscribed for its side effects
//! - **SharedStore**: an injected store that effects fill and sources read
//!
//! ## Example
//!
//! ```ignore
//! use store_bridge::{BridgeConfig, EffectSubscription, SharedStore, SnapshotBridge, SourceExt};
//!
//! let store = SharedStore::new();
//!
//! // Populate the store while mounted
//! let mut loader = EffectSubscription::new();
//! loader.update(relay.clone(), || Some(load_events(&relay, store.clone()).shared()));
//!
//! // Render from it
//! let mut events = SnapshotBridge::new(BridgeConfig::default());
//! events.use_source_with((), || Some(store.timeline().shared()));
//! let snapshot = events.get_snapshot();
//! let mut teardown = events.subscribe(move || schedule_render());
//! ```

pub mod bridge;
pub mod deps;
pub mod effect;
pub mod error;
pub mod sources;
pub mod store;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use bridge::{BridgeConfig, SnapshotBridge, Teardown};
pub use deps::{Identity, SourceDeps};
pub use effect::EffectSubscription;
pub use error::{BridgeError, Result, SourceError};
pub use sources::{
    channel, from_fn, just, never, unbounded_channel, ChannelSource, Emitter, FnSource, Just, Map,
    Never, SharedSource, Source, SourceExt, StateSubject, Subject, Take,
};
pub use store::SharedStore;
pub use subscriptions::{Observer, Subscription, SubscriptionManager};
pub use types::*;
