//! Shared keyed store that sources read from and effects write into.
//!
//! The store is an injected collaborator: callers create one and hand clones
//! to whatever derives sources or runs effects. Nothing here is global.

use crate::sources::StateSubject;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::trace;

struct StoreInner<K, V> {
    entries: RwLock<BTreeMap<K, V>>,
    /// Per-key stateful sources, created on first watch.
    watchers: Mutex<BTreeMap<K, StateSubject<Option<V>>>>,
    /// All values in key order.
    timeline: StateSubject<Vec<V>>,
}

/// Cloneable handle to a keyed in-memory store.
pub struct SharedStore<K, V> {
    inner: Arc<StoreInner<K, V>>,
}

impl<K, V> SharedStore<K, V>
where
    K: Ord + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StoreInner {
                entries: RwLock::new(BTreeMap::new()),
                watchers: Mutex::new(BTreeMap::new()),
                timeline: StateSubject::new(Vec::new()),
            }),
        }
    }

    /// Insert or replace a value. Returns the previous value.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        let (previous, all) = {
            let mut entries = self.inner.entries.write();
            let previous = entries.insert(key.clone(), value.clone());
            (previous, entries.values().cloned().collect())
        };
        self.publish(&key, Some(value), all);
        previous
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        let (removed, all) = {
            let mut entries = self.inner.entries.write();
            let removed = entries.remove(key);
            (removed, entries.values().cloned().collect())
        };
        if removed.is_some() {
            self.publish(key, None, all);
        }
        self.evict_watcher(key);
        removed
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.entries.read().get(key).cloned()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.entries.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stateful source of the value under `key`.
    ///
    /// Watchers live until their key is removed while no handle to them is
    /// held elsewhere; keys that are watched and never removed keep theirs.
    pub fn watch(&self, key: K) -> StateSubject<Option<V>> {
        let mut watchers = self.inner.watchers.lock();
        watchers
            .entry(key)
            .or_insert_with_key(|key| StateSubject::new(self.get(key)))
            .clone()
    }

    /// Stateful source of every value, in key order.
    pub fn timeline(&self) -> StateSubject<Vec<V>> {
        self.inner.timeline.clone()
    }

    fn evict_watcher(&self, key: &K) {
        let mut watchers = self.inner.watchers.lock();
        if watchers.get(key).is_some_and(|watcher| watcher.is_unshared()) {
            watchers.remove(key);
            trace!("idle watcher evicted");
        }
    }

    fn publish(&self, key: &K, value: Option<V>, all: Vec<V>) {
        let watcher = self.inner.watchers.lock().get(key).cloned();
        if let Some(watcher) = watcher {
            if watcher.set(value).is_err() {
                trace!("watcher already terminated");
            }
        }
        if self.inner.timeline.set(all).is_err() {
            trace!("timeline already terminated");
        }
    }
}

impl<K, V> Clone for SharedStore<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> Default for SharedStore<K, V>
where
    K: Ord + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
