//! Small runnable tour of the cache: pool recycling, registry
//! bookkeeping and worker-backed fulfillment.

use depot::{Cache, Pool, Resource, WorkerFulfiller};
use log::info;

#[derive(Default)]
struct Glyph {
    codepoint: Option<char>,
}

impl Resource for Glyph {
    type Params = char;

    fn initialize(&mut self, params: char) {
        self.codepoint = Some(params);
    }

    fn reset(&mut self) {
        self.codepoint = None;
    }

    fn initialized(&self) -> bool {
        self.codepoint.is_some()
    }
}

fn main() {
    // initialize logging at start of the application
    simple_logger::init().unwrap();

    let cache = Cache::new();

    // transient instances come from the pool and go back to it
    let pool = cache.pool::<Glyph>();
    let glyph = pool.create('a');
    info!(
        "pooled glyph {:?} with {} owner(s)",
        glyph.get().codepoint,
        glyph.ref_count()
    );
    pool.destroy(glyph);
    info!("{} instance(s) waiting on the free list", pool.free_count());
    pool.cleanup();
    assert!(pool.free_count() <= Pool::<Glyph>::MIN_SIZE);

    // durable instances live in the registry under application keys
    let registry = cache.registry::<u32, Glyph>();
    let producer = registry.clone();
    registry.add_fulfiller(
        WorkerFulfiller::new(1, move |key: &u32| producer.create(*key, 'x')),
        9,
    );

    let handle = registry.request_blocking(9);
    info!(
        "fulfilled key 9 with {:?}, valid: {}",
        handle.get().codepoint,
        handle.is_valid()
    );

    // the registry is the sole owner after the handle is dropped, so
    // an explicit cleanup pass evicts the entry
    drop(handle);
    registry.cleanup();
    info!("key 9 still present: {}", registry.has(&9));
}
