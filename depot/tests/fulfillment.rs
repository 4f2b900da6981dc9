//! Asynchronous population of registry entries through fulfillers.

use depot::{Cache, Callback, Resource, WorkerFulfiller};
use foundation::latch::latch;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct Texture {
    extent: Option<(u32, u32)>,
}

impl Resource for Texture {
    type Params = (u32, u32);

    fn initialize(&mut self, params: (u32, u32)) {
        self.extent = Some(params);
    }

    fn reset(&mut self) {
        self.extent = None;
    }

    fn initialized(&self) -> bool {
        self.extent.is_some()
    }
}

#[test]
fn closure_fulfiller_creates_and_delivers() {
    let cache = Cache::new();
    let registry = cache.registry::<u32, Texture>();

    let producer = registry.clone();
    registry.add_fulfiller(
        move |key, callback: Callback<u32, Texture>| {
            let handle = producer.create(key, (4, 4));
            callback.call(key, handle);
        },
        7,
    );

    let slot = Arc::new(Mutex::new(None));
    let delivered = slot.clone();
    registry.request(
        move |key, handle| {
            *delivered.lock() = Some((key, handle));
        },
        7,
    );

    // the closure fulfiller resolves synchronously
    let (key, handle) = slot.lock().take().expect("request was not fulfilled");
    assert_eq!(key, 7);
    assert!(handle.is_valid());
    assert_eq!(handle.get().extent, Some((4, 4)));
    assert!(registry.has(&7));
}

#[test]
fn worker_fulfiller_delivers_from_background_thread() {
    let cache = Cache::new();
    let registry = cache.registry::<u32, Texture>();

    let producer = registry.clone();
    let workers = WorkerFulfiller::new(2, move |key: &u32| producer.create(*key, (8, 8)));
    registry.add_fulfiller(workers, 1);

    let (trigger, waiter) = latch();
    let slot = Arc::new(Mutex::new(None));
    let delivered = slot.clone();

    registry.request(
        move |key, handle| {
            *delivered.lock() = Some((key, handle));
            trigger.open();
        },
        1,
    );

    assert!(waiter.wait_timeout(Duration::from_secs(5)));

    let (key, handle) = slot.lock().take().expect("worker did not deliver");
    assert_eq!(key, 1);
    assert!(handle.is_valid());
    assert!(registry.has(&1));
}

#[test]
fn request_blocking_returns_the_delivered_handle() {
    let cache = Cache::new();
    let registry = cache.registry::<u32, Texture>();

    let producer = registry.clone();
    registry.add_fulfiller(
        WorkerFulfiller::new(1, move |key: &u32| producer.create(*key, (2, 2))),
        3,
    );

    let handle = registry.request_blocking(3);

    assert!(handle.is_valid());
    assert_eq!(handle.get().extent, Some((2, 2)));
    assert!(registry.has(&3));
}

#[test]
fn request_blocking_without_fulfiller_returns_empty_handle() {
    let cache = Cache::new();
    let registry = cache.registry::<u32, Texture>();

    let handle = registry.request_blocking(9);

    assert!(!handle.is_valid());
    assert_eq!(handle.ref_count(), 0);
    assert!(!registry.has(&9));
}

#[test]
fn registering_a_fulfiller_twice_drops_the_previous_one() {
    let cache = Cache::new();
    let registry = cache.registry::<u32, Texture>();

    let sentinel = Arc::new(());
    let held = sentinel.clone();
    registry.add_fulfiller(
        move |_key, _callback: Callback<u32, Texture>| {
            let _alive = &held;
        },
        0,
    );
    assert_eq!(Arc::strong_count(&sentinel), 2);

    registry.add_fulfiller(move |_key, _callback: Callback<u32, Texture>| {}, 0);
    assert_eq!(Arc::strong_count(&sentinel), 1);
}

#[test]
fn removing_a_fulfiller_drops_it() {
    let cache = Cache::new();
    let registry = cache.registry::<u32, Texture>();

    let sentinel = Arc::new(());
    let held = sentinel.clone();
    registry.add_fulfiller(
        move |_key, _callback: Callback<u32, Texture>| {
            let _alive = &held;
        },
        0,
    );
    assert_eq!(Arc::strong_count(&sentinel), 2);

    registry.remove_fulfiller(&0);
    assert_eq!(Arc::strong_count(&sentinel), 1);
}
