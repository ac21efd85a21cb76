//! Observers, subscription handles and subscriber bookkeeping.
//!
//! Every source hands out a [`Subscription`] per observer. Releasing the
//! handle (explicitly or by dropping it) stops delivery synchronously: a
//! broadcast already in progress skips subscribers torn down before their
//! turn.
//!
//! # Example
//!
//! ```ignore
//! let manager = SubscriptionManager::new();
//!
//! let mut handle = manager.subscribe(Observer::on_next(|v: u32| println!("got {v}")));
//! manager.broadcast(1);
//!
//! handle.unsubscribe();
//! manager.broadcast(2); // not delivered
//! ```

mod manager;
mod types;

pub use manager::SubscriptionManager;
pub use types::{Observer, Subscription};
