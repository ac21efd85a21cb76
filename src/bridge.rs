//! Snapshot bridge: exposes a push-based source as a pull-based store.

use crate::deps::{Identity, Memo, SourceDeps};
use crate::error::{Result, SourceError};
use crate::sources::{SharedSource, Source, Take};
use crate::subscriptions::{Observer, Subscription};
use crate::types::{BridgeStats, Event, RenderContext};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

/// Bridge configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Context snapshots are read in.
    pub context: RenderContext,
}

impl BridgeConfig {
    /// Config for a single render pass with no later updates.
    pub fn non_interactive() -> Self {
        Self {
            context: RenderContext::NonInteractive,
        }
    }

    /// Parse a JSON config, e.g. `{"context": "non_interactive"}`.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Shape of the current source, resolved once per derivation.
enum SourceShape<T> {
    Stateful(SharedSource<T>),
    Plain(SharedSource<T>),
    Absent,
}

impl<T> SourceShape<T> {
    /// Classify `source` by capability; returns the seed value for stateful
    /// sources.
    fn resolve(source: Option<SharedSource<T>>) -> (Self, Option<T>) {
        match source {
            None => (SourceShape::Absent, None),
            Some(source) => match source.current_value() {
                Some(current) => (SourceShape::Stateful(source), Some(current)),
                None => (SourceShape::Plain(source), None),
            },
        }
    }

    fn source(&self) -> Option<&SharedSource<T>> {
        match self {
            SourceShape::Stateful(source) | SourceShape::Plain(source) => Some(source),
            SourceShape::Absent => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            SourceShape::Stateful(_) => "stateful",
            SourceShape::Plain(_) => "plain",
            SourceShape::Absent => "absent",
        }
    }
}

type Notifier = Arc<dyn Fn() + Send + Sync>;

/// State shared between the bridge, its emission handler and its teardowns.
struct BridgeState<T> {
    /// Snapshot cell.
    value: Option<T>,
    /// Cached callback slot: the notifier the live subscription invokes.
    notifier: Option<Notifier>,
    /// The single persistent subscription to the current source.
    subscription: Option<Subscription>,
    /// Set while `Source::subscribe` runs, so re-entrant reads do not open a
    /// second subscription.
    subscribing: bool,
    /// Identifies the persistent subscription. Bumped whenever it is
    /// released; handlers carrying an older generation are inert.
    generation: u64,
    /// Identifies the notifier registration. Bumped on teardown; teardown
    /// handles from older registrations are inert.
    epoch: u64,
    /// Terminal error from the current source.
    error: Option<SourceError>,
    stats: BridgeStats,
}

impl<T> BridgeState<T> {
    fn new() -> Self {
        Self {
            value: None,
            notifier: None,
            subscription: None,
            subscribing: false,
            generation: 0,
            epoch: 0,
            error: None,
            stats: BridgeStats::default(),
        }
    }

    /// Detach the persistent subscription. The caller drops it after
    /// releasing the lock.
    fn detach(&mut self) -> Option<Subscription> {
        self.generation += 1;
        let subscription = self.subscription.take();
        if subscription.is_some() {
            self.stats.subscriptions_closed += 1;
        }
        subscription
    }
}

/// Handle returned by [`SnapshotBridge::subscribe`].
///
/// Calling [`Teardown::teardown`] releases the bridge's subscription and
/// clears its notifier. Only the first call does anything, and only if no
/// other teardown ran since this handle was issued. Dropping the handle does
/// not tear down.
#[must_use = "a dropped Teardown can no longer release the subscription"]
pub struct Teardown {
    action: Option<Box<dyn FnOnce() + Send>>,
}

impl Teardown {
    pub fn teardown(&mut self) {
        if let Some(action) = self.action.take() {
            action();
        }
    }

    /// True once this handle has been used.
    pub fn is_spent(&self) -> bool {
        self.action.is_none()
    }
}

impl fmt::Debug for Teardown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Teardown")
            .field("spent", &self.is_spent())
            .finish()
    }
}

/// Exposes a push-based source as a `(subscribe, get_snapshot)` pair for a
/// renderer's external-store mechanism.
///
/// One bridge belongs to one rendering unit. Per render, the unit calls
/// [`use_source`](SnapshotBridge::use_source) or
/// [`use_source_with`](SnapshotBridge::use_source_with); the source is only
/// re-derived when the dependencies change. The renderer then reads
/// [`get_snapshot`](SnapshotBridge::get_snapshot) and, after commit, calls
/// [`subscribe`](SnapshotBridge::subscribe). Dropping the bridge releases its
/// subscription.
///
/// Guarantees:
/// - at most one subscription to the current source exists at a time
/// - each emission updates the snapshot before the notifier runs
/// - once torn down, a subscription can no longer touch the snapshot or the
///   notifier
/// - the notifier invoked is always the one most recently registered
pub struct SnapshotBridge<T, D = SourceDeps<T>> {
    config: BridgeConfig,
    memo: Memo<D>,
    shape: SourceShape<T>,
    state: Arc<Mutex<BridgeState<T>>>,
}

impl<T, D> SnapshotBridge<T, D>
where
    T: Clone + Send + 'static,
    D: PartialEq,
{
    /// Create a bridge with no source yet. Snapshots read `None`.
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            memo: Memo::new(),
            shape: SourceShape::Absent,
            state: Arc::new(Mutex::new(BridgeState::new())),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Derive the source lazily from `deps`.
    ///
    /// `derive` runs only when `deps` differs from the previous call. On a
    /// change, the subscription to the old source is released before the
    /// new source is derived; the registered notifier carries over.
    pub fn use_source_with<F>(&mut self, deps: D, derive: F)
    where
        F: FnOnce() -> Option<SharedSource<T>>,
    {
        if self.memo.is_current(&deps) {
            return;
        }

        let released = self.state.lock().detach();
        drop(released);

        let (shape, seed) = SourceShape::resolve(derive());
        {
            let mut state = self.state.lock();
            match &shape {
                SourceShape::Stateful(_) => state.value = seed,
                SourceShape::Absent => state.value = None,
                // Keep the last value until the new source emits.
                SourceShape::Plain(_) => {}
            }
            state.error = None;
            state.stats.derivations += 1;
        }
        debug!(shape = shape.name(), "source derived");

        self.shape = shape;
        self.memo.store(deps);
    }

    /// Register `notify` as the change notifier and make sure the source is
    /// subscribed.
    ///
    /// Repeated calls never stack subscriptions; each call replaces the
    /// notifier the existing subscription invokes.
    pub fn subscribe<N>(&self, notify: N) -> Teardown
    where
        N: Fn() + Send + Sync + 'static,
    {
        let epoch = {
            let mut state = self.state.lock();
            state.notifier = Some(Arc::new(notify));
            state.epoch
        };
        self.ensure_subscribed();

        let state = Arc::downgrade(&self.state);
        Teardown {
            action: Some(Box::new(move || release(&state, epoch))),
        }
    }

    /// Read the last observed value.
    ///
    /// Interactive: opens the persistent subscription on first need, so the
    /// value is current and later changes reach the notifier. Non-interactive:
    /// takes one value through a take-one subscription that is released
    /// before returning.
    pub fn get_snapshot(&self) -> Option<T> {
        match self.config.context {
            RenderContext::Interactive => self.ensure_subscribed(),
            RenderContext::NonInteractive => self.read_once(),
        }
        self.state.lock().value.clone()
    }

    /// Terminal error signalled by the current source, if any.
    pub fn error(&self) -> Option<SourceError> {
        self.state.lock().error.clone()
    }

    /// True while a persistent subscription is held.
    pub fn is_subscribed(&self) -> bool {
        self.state.lock().subscription.is_some()
    }

    /// True if the current source exposes a current value.
    pub fn is_stateful(&self) -> bool {
        matches!(self.shape, SourceShape::Stateful(_))
    }

    pub fn stats(&self) -> BridgeStats {
        self.state.lock().stats.clone()
    }

    fn ensure_subscribed(&self) {
        let Some(source) = self.shape.source() else {
            return;
        };

        let generation = {
            let mut state = self.state.lock();
            if state.subscription.is_some() || state.subscribing {
                return;
            }
            state.subscribing = true;
            state.generation
        };

        let handler = emission_handler(Arc::downgrade(&self.state), generation);
        let subscription = source.subscribe(Observer::new(handler));

        let stale = {
            let mut state = self.state.lock();
            state.subscribing = false;
            if state.generation == generation {
                state.subscription = Some(subscription);
                state.stats.subscriptions_opened += 1;
                None
            } else {
                // Torn down while subscribing.
                Some(subscription)
            }
        };
        match stale {
            Some(subscription) => drop(subscription),
            None => debug!(generation, "source subscribed"),
        }
    }

    fn read_once(&self) {
        let Some(source) = self.shape.source() else {
            return;
        };
        if self.state.lock().subscription.is_some() {
            return;
        }

        let state = Arc::downgrade(&self.state);
        let once = Take::new(Arc::clone(source), 1);
        let subscription = once.subscribe(Observer::new(move |event: Event<T>| {
            let Some(state) = state.upgrade() else {
                return;
            };
            let mut state = state.lock();
            match event {
                Event::Next(value) => state.value = Some(value),
                Event::Error(err) => state.error = Some(err),
                Event::Complete => {}
            }
        }));
        drop(subscription);

        self.state.lock().stats.one_shot_reads += 1;
        trace!("one-shot snapshot read");
    }
}

impl<T> SnapshotBridge<T, SourceDeps<T>>
where
    T: Clone + Send + 'static,
{
    /// Bridge over a directly supplied source.
    pub fn from_source(source: Option<SharedSource<T>>, config: BridgeConfig) -> Self {
        let mut bridge = Self::new(config);
        bridge.use_source(source);
        bridge
    }

    /// Use `source` directly; its identity is the dependency.
    pub fn use_source(&mut self, source: Option<SharedSource<T>>) {
        let deps = source.as_ref().map(Identity::of);
        self.use_source_with(deps, || source);
    }
}

/// Handler for the persistent subscription of `generation`.
fn emission_handler<T>(
    state: Weak<Mutex<BridgeState<T>>>,
    generation: u64,
) -> impl Fn(Event<T>) + Send + Sync + 'static
where
    T: Send + 'static,
{
    move |event: Event<T>| {
        let Some(state) = state.upgrade() else {
            return;
        };
        let notifier = {
            let mut state = state.lock();
            if state.generation != generation {
                return;
            }
            match event {
                Event::Next(value) => {
                    state.value = Some(value);
                    state.stats.emissions += 1;
                    trace!(generation, "emission observed");
                }
                Event::Error(err) => {
                    debug!(generation, error = %err, "source failed");
                    state.error = Some(err);
                }
                Event::Complete => {
                    debug!(generation, "source completed");
                    return;
                }
            }
            let notifier = state.notifier.clone();
            if notifier.is_some() {
                state.stats.notifications += 1;
            }
            notifier
        };
        if let Some(notify) = notifier {
            notify();
        }
    }
}

/// Teardown action for a registration made at `epoch`.
fn release<T>(state: &Weak<Mutex<BridgeState<T>>>, epoch: u64) {
    let Some(state) = state.upgrade() else {
        return;
    };
    let released = {
        let mut state = state.lock();
        if state.epoch != epoch {
            return;
        }
        state.epoch += 1;
        state.notifier = None;
        state.detach()
    };
    if released.is_some() {
        debug!("source unsubscribed");
    }
    drop(released);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{just, SourceExt, StateSubject, Subject};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        (count, move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_config_from_json() {
        let config = BridgeConfig::from_json(r#"{"context": "non_interactive"}"#).unwrap();
        assert_eq!(config, BridgeConfig::non_interactive());

        let config = BridgeConfig::from_json("{}").unwrap();
        assert_eq!(config.context, RenderContext::Interactive);

        assert!(BridgeConfig::from_json(r#"{"ctx": 1}"#).is_err());
    }

    #[test]
    fn test_absent_source_reads_none() {
        let bridge = SnapshotBridge::<u32>::from_source(None, BridgeConfig::default());
        assert_eq!(bridge.get_snapshot(), None);
        assert!(!bridge.is_subscribed());

        let mut teardown = bridge.subscribe(|| {});
        teardown.teardown();
        assert_eq!(bridge.get_snapshot(), None);
    }

    #[test]
    fn test_shape_resolved_by_capability() {
        let state = StateSubject::new(1u32);
        let bridge = SnapshotBridge::from_source(Some(state.shared()), BridgeConfig::default());
        assert!(bridge.is_stateful());

        let bridge =
            SnapshotBridge::from_source(Some(Subject::<u32>::new().shared()), BridgeConfig::default());
        assert!(!bridge.is_stateful());
    }

    #[test]
    fn test_stateful_seed_before_subscription() {
        let state = StateSubject::new(5u32);
        let bridge = SnapshotBridge::from_source(Some(state.clone().shared()), BridgeConfig::default());

        assert_eq!(bridge.state.lock().value, Some(5));
        assert_eq!(bridge.get_snapshot(), Some(5));
        assert_eq!(state.subscriber_count(), 1);
    }

    #[test]
    fn test_replay_during_subscribe_notifies() {
        let state = StateSubject::new(5u32);
        let bridge = SnapshotBridge::from_source(Some(state.shared()), BridgeConfig::default());
        let (count, notify) = counter();

        let _teardown = bridge.subscribe(notify);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(bridge.stats().subscriptions_opened, 1);
    }

    #[test]
    fn test_notifier_reading_snapshot_reentrantly() {
        let subject = Subject::<u32>::new();
        let bridge = Arc::new(SnapshotBridge::from_source(
            Some(subject.clone().shared()),
            BridgeConfig::default(),
        ));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let reader = Arc::downgrade(&bridge);
        let sink = Arc::clone(&seen);
        let _teardown = bridge.subscribe(move || {
            if let Some(bridge) = reader.upgrade() {
                sink.lock().push(bridge.get_snapshot());
            }
        });

        subject.next(1).unwrap();
        subject.next(2).unwrap();

        assert_eq!(*seen.lock(), vec![Some(1), Some(2)]);
        assert_eq!(subject.subscriber_count(), 1);
    }

    #[test]
    fn test_completed_source_is_not_resubscribed() {
        let bridge = SnapshotBridge::from_source(Some(just(3u32).shared()), BridgeConfig::default());

        assert_eq!(bridge.get_snapshot(), Some(3));
        assert_eq!(bridge.get_snapshot(), Some(3));
        assert_eq!(bridge.stats().subscriptions_opened, 1);
    }

    #[test]
    fn test_teardown_from_old_registration_is_inert() {
        let subject = Subject::<u32>::new();
        let bridge =
            SnapshotBridge::from_source(Some(subject.clone().shared()), BridgeConfig::default());

        let mut first = bridge.subscribe(|| {});
        first.teardown();
        assert!(first.is_spent());

        let (count, notify) = counter();
        let _second = bridge.subscribe(notify);

        // Re-running a spent handle leaves the new registration alone.
        first.teardown();
        subject.next(1).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dropping_bridge_releases_subscription() {
        let subject = Subject::<u32>::new();
        let bridge =
            SnapshotBridge::from_source(Some(subject.clone().shared()), BridgeConfig::default());
        let mut teardown = bridge.subscribe(|| {});
        assert_eq!(subject.subscriber_count(), 1);

        drop(bridge);
        assert_eq!(subject.subscriber_count(), 0);

        teardown.teardown();
    }
}
