//! EffectSubscription lifecycle tests.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use store_bridge::{from_fn, EffectSubscription, Observer, SharedSource, SourceExt, Subscription};

/// Source per relay that records lifecycle transitions and tracks how many
/// relay subscriptions are live at once.
struct RelayProbe {
    log: Arc<Mutex<Vec<String>>>,
    live: Arc<AtomicUsize>,
    max_live: Arc<AtomicUsize>,
}

impl RelayProbe {
    fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(Vec::new())),
            live: Arc::new(AtomicUsize::new(0)),
            max_live: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn source(&self, relay: &'static str) -> SharedSource<()> {
        let log = Arc::clone(&self.log);
        let live = Arc::clone(&self.live);
        let max_live = Arc::clone(&self.max_live);
        from_fn(move |_observer: Observer<()>| {
            let now = live.fetch_add(1, Ordering::SeqCst) + 1;
            max_live.fetch_max(now, Ordering::SeqCst);
            log.lock().push(format!("subscribe {relay}"));

            let log = Arc::clone(&log);
            let live = Arc::clone(&live);
            Subscription::new(move || {
                live.fetch_sub(1, Ordering::SeqCst);
                log.lock().push(format!("unsubscribe {relay}"));
            })
        })
        .shared()
    }
}

#[test]
fn test_dependency_change_tears_down_before_resubscribing() {
    let probe = RelayProbe::new();
    let mut effect = EffectSubscription::new();

    effect.update(("A",), || Some(probe.source("A")));
    effect.update(("A",), || Some(probe.source("A")));
    effect.update(("B",), || Some(probe.source("B")));
    effect.unmount();

    assert_eq!(
        *probe.log.lock(),
        vec!["subscribe A", "unsubscribe A", "subscribe B", "unsubscribe B"]
    );
    assert_eq!(probe.max_live.load(Ordering::SeqCst), 1);
    assert_eq!(probe.live.load(Ordering::SeqCst), 0);

    let stats = effect.stats();
    assert_eq!(stats.subscribes, 2);
    assert_eq!(stats.teardowns, 2);
}

#[test]
fn test_dependency_change_to_no_source() {
    let probe = RelayProbe::new();
    let mut effect = EffectSubscription::new();

    effect.update(Some("A"), || Some(probe.source("A")));
    effect.update::<(), _>(None, || None);

    assert!(!effect.is_active());
    assert_eq!(probe.live.load(Ordering::SeqCst), 0);
}

#[test]
fn test_values_are_ignored_but_side_effects_happen() {
    let writes = Arc::new(AtomicUsize::new(0));

    let source = {
        let writes = Arc::clone(&writes);
        from_fn(move |observer: Observer<u32>| {
            writes.fetch_add(1, Ordering::SeqCst);
            observer.next(99);
            Subscription::empty()
        })
    };

    let mut effect = EffectSubscription::new();
    effect.update(1u8, || Some(source.shared()));
    assert_eq!(writes.load(Ordering::SeqCst), 1);

    // Completed synchronously: nothing left to hold
    assert!(!effect.is_active());
    assert!(effect.last_error().is_none());
}

#[test]
fn test_drop_is_unmount() {
    let probe = RelayProbe::new();
    {
        let mut effect = EffectSubscription::new();
        effect.update("A", || Some(probe.source("A")));
        assert_eq!(probe.live.load(Ordering::SeqCst), 1);
    }
    assert_eq!(probe.live.load(Ordering::SeqCst), 0);
}
