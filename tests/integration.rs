//! Integration tests composing effects, a shared store and bridges.

use std::sync::Arc;
use store_bridge::{
    from_fn, unbounded_channel, BridgeConfig, EffectSubscription, Emitter, Observer, SharedSource,
    SharedStore, SnapshotBridge, Source, SourceExt, Subscription,
};

#[derive(Clone, Debug, PartialEq)]
struct Note {
    id: u32,
    relay: &'static str,
    content: String,
}

/// Loader that copies every note arriving from `feed` into `store`.
fn load_into(store: SharedStore<u32, Note>, feed: SharedSource<Note>) -> SharedSource<()> {
    from_fn(move |_observer: Observer<()>| {
        let store = store.clone();
        feed.subscribe(Observer::on_next(move |note: Note| {
            store.insert(note.id, note);
        }))
    })
    .shared()
}

fn note(id: u32, relay: &'static str) -> Note {
    Note {
        id,
        relay,
        content: format!("note {id}"),
    }
}

// --- Realistic Workflow Tests ---

#[test]
fn test_live_feed_renders_from_store() {
    let store = SharedStore::new();
    let (relay_a, feed_a) = unbounded_channel::<Note>();
    let feed_a = Arc::new(feed_a);

    // Effect: keep the relay feed flowing into the store while mounted
    let mut loader = EffectSubscription::new();
    loader.update("A", || {
        Some(load_into(store.clone(), Arc::clone(&feed_a) as SharedSource<Note>))
    });

    // Bridge: render the store's timeline
    let mut timeline: SnapshotBridge<Vec<Note>, ()> = SnapshotBridge::new(BridgeConfig::default());
    timeline.use_source_with((), || Some(store.timeline().shared()));
    assert_eq!(timeline.get_snapshot(), Some(vec![]));

    let renders = Arc::new(parking_lot::Mutex::new(0usize));
    let counter = Arc::clone(&renders);
    let mut teardown = timeline.subscribe(move || *counter.lock() += 1);
    let after_subscribe = *renders.lock();

    relay_a.send(note(2, "A")).unwrap();
    relay_a.send(note(1, "A")).unwrap();
    feed_a.pump();

    let notes = timeline.get_snapshot().unwrap();
    assert_eq!(notes.iter().map(|n| n.id).collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(*renders.lock(), after_subscribe + 2);

    // Unmount both
    loader.unmount();
    teardown.teardown();
    assert_eq!(feed_a.subscriber_count(), 0);
}

#[test]
fn test_switching_relays_stops_old_feed() {
    let store = SharedStore::new();
    let (relay_a, feed_a) = unbounded_channel::<Note>();
    let (relay_b, feed_b) = unbounded_channel::<Note>();
    let feeds: Vec<(Emitter<Note>, Arc<_>)> =
        vec![(relay_a, Arc::new(feed_a)), (relay_b, Arc::new(feed_b))];

    let mut loader = EffectSubscription::new();
    let mount = |loader: &mut EffectSubscription<usize>, relay: usize| {
        let feed = Arc::clone(&feeds[relay].1) as SharedSource<Note>;
        let store = store.clone();
        loader.update(relay, move || Some(load_into(store, feed)));
    };

    mount(&mut loader, 0);
    mount(&mut loader, 1);

    feeds[0].0.send(note(1, "A")).unwrap();
    feeds[1].0.send(note(2, "B")).unwrap();
    feeds[0].1.pump();
    feeds[1].1.pump();

    assert_eq!(store.len(), 1);
    assert_eq!(store.get(&2).map(|n| n.relay), Some("B"));
    assert_eq!(feeds[0].1.subscriber_count(), 0);
}

#[test]
fn test_watch_single_key_through_bridge() {
    let store: SharedStore<u32, Note> = SharedStore::new();
    let mut bridge: SnapshotBridge<Option<Note>, u32> = SnapshotBridge::new(BridgeConfig::default());

    bridge.use_source_with(7, || Some(store.watch(7).shared()));
    assert_eq!(bridge.get_snapshot(), Some(None));

    store.insert(7, note(7, "A"));
    assert_eq!(bridge.get_snapshot().flatten().map(|n| n.id), Some(7));

    // Other keys never reach this bridge
    store.insert(8, note(8, "A"));
    assert_eq!(bridge.stats().emissions, 2);
}

#[test]
fn test_non_interactive_render_of_populated_store() {
    let store = SharedStore::new();
    store.insert(1, note(1, "A"));
    store.insert(2, note(2, "A"));

    let mut page: SnapshotBridge<usize, ()> = SnapshotBridge::new(BridgeConfig::non_interactive());
    page.use_source_with((), || Some(store.timeline().map(|notes| notes.len()).shared()));

    assert_eq!(page.get_snapshot(), Some(2));
    assert_eq!(store.timeline().subscriber_count(), 0);
    assert!(!page.is_subscribed());
}

#[test]
fn test_effect_with_custom_teardown() {
    let released = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let flag = Arc::clone(&released);
    let source = from_fn(move |_observer: Observer<()>| {
        let flag = Arc::clone(&flag);
        Subscription::new(move || flag.store(true, std::sync::atomic::Ordering::SeqCst))
    });

    let mut effect = EffectSubscription::new();
    effect.update((), || Some(source.shared()));
    assert!(effect.is_active());

    effect.unmount();
    assert!(released.load(std::sync::atomic::Ordering::SeqCst));
}
