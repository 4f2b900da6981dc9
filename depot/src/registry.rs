//! Key-addressed registries with reference-count driven eviction and
//! asynchronous fulfillment.

use crate::handle::{Handle, Instance};
use crate::report::{self, Fault};
use crate::Resource;
use foundation::latch::latch;
use log::{trace, warn};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

/// One-shot delivery target invoked when an asynchronous fulfillment
/// completes.
pub struct Callback<K, T>(Box<dyn FnOnce(K, Handle<T>) + Send>);

impl<K, T> Callback<K, T> {
    /// Wraps a delivery closure.
    pub fn new<F>(handler: F) -> Self
    where
        F: FnOnce(K, Handle<T>) + Send + 'static,
    {
        Self(Box::new(handler))
    }

    /// Delivers the resolved handle to the requester.
    pub fn call(self, key: K, handle: Handle<T>) {
        (self.0)(key, handle)
    }
}

/// Agent capable of asynchronously producing a resource for a key.
///
/// Closures of shape `Fn(K, Callback<K, T>)` implement this trait, so
/// a fulfiller can be registered without a dedicated type. A
/// fulfiller is expected to eventually produce the resource (usually
/// through [`Registry::create`]) and invoke the callback; there is no
/// completion deadline and cancellation is the fulfiller's own
/// concern.
pub trait Fulfiller<K, T>: Send + Sync {
    fn fulfill(&self, key: K, callback: Callback<K, T>);
}

impl<K, T, F> Fulfiller<K, T> for F
where
    F: Fn(K, Callback<K, T>) + Send + Sync,
{
    fn fulfill(&self, key: K, callback: Callback<K, T>) {
        self(key, callback)
    }
}

/// Both maps live behind one lock: concurrent `create`/`cleanup` on
/// the same key is otherwise a double-allocation or use-after-evict
/// hazard.
struct State<K, T> {
    entries: HashMap<K, Handle<T>>,
    fulfillers: HashMap<K, Arc<dyn Fulfiller<K, T>>>,
}

/// Keyed store of shared resource instances.
///
/// Every key present in the registry maps to a valid handle; entries
/// are evicted only by an explicit [`cleanup`](Registry::cleanup)
/// pass, never behind the back of other holders. One registry per
/// (key, resource) pair is shared through a [`Cache`](crate::Cache).
pub struct Registry<K, T> {
    state: Mutex<State<K, T>>,
    fallback: Instance<T>,
}

impl<K, T> Registry<K, T>
where
    K: Eq + Hash,
    T: Resource,
{
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                entries: HashMap::new(),
                fulfillers: HashMap::new(),
            }),
            fallback: Arc::new(RwLock::new(T::default())),
        }
    }

    /// Returns a copy of the handle stored under `key`, adding an
    /// owner.
    ///
    /// A missing key or an invalid stored handle reports
    /// [`Fault::InvalidReference`] and returns an empty handle.
    #[track_caller]
    pub fn reference(&self, key: &K) -> Handle<T> {
        {
            let state = self.state.lock();
            if let Some(handle) = state.entries.get(key) {
                if handle.is_valid() {
                    return handle.clone();
                }
            }
        }

        report::report(Fault::InvalidReference);
        Handle::empty(self.fallback.clone())
    }

    /// Pure membership test: no side effects, no fault reporting.
    pub fn has(&self, key: &K) -> bool {
        self.state.lock().entries.contains_key(key)
    }

    /// Allocates a fresh instance, initializes it with `params` and
    /// stores it under `key`.
    ///
    /// If `key` is already present the existing handle is returned
    /// unchanged and [`Fault::DoubleReference`] is reported; creation
    /// never silently overwrites. The lookup and the insert execute
    /// under one lock acquisition, so racing `create` calls for the
    /// same key never allocate twice.
    #[track_caller]
    pub fn create(&self, key: K, params: T::Params) -> Handle<T> {
        let mut state = self.state.lock();
        if let Some(existing) = state.entries.get(&key) {
            let existing = existing.clone();
            drop(state);

            report::report(Fault::DoubleReference);
            return existing;
        }

        // initialization stays under the lock: the entry-map
        // invariant requires inserted handles to already be valid
        let handle = Handle::fresh(self.fallback.clone());
        handle
            .instance()
            .expect("fresh handles always own an instance")
            .write()
            .initialize(params);
        state.entries.insert(key, handle.clone());

        handle
    }

    /// Evicts every entry this registry is the sole remaining owner
    /// of (owner count of the stored handle ≤ 1). Evicted instances
    /// are reset before their storage is released.
    ///
    /// This is the registry's garbage-collection pass; invoke it
    /// explicitly at safe points, it never runs on its own.
    pub fn cleanup(&self) {
        let mut state = self.state.lock();
        let before = state.entries.len();

        state.entries.retain(|_, handle| {
            if handle.ref_count() > 1 {
                return true;
            }
            if let Some(instance) = handle.instance() {
                instance.write().reset();
            }
            false
        });

        let evicted = before - state.entries.len();
        if evicted > 0 {
            trace!("cleanup evicted {} registry entries", evicted);
        }
    }

    /// Registers `fulfiller` for `key`, dropping any fulfiller
    /// previously registered for that key.
    pub fn add_fulfiller<F>(&self, fulfiller: F, key: K)
    where
        F: Fulfiller<K, T> + 'static,
    {
        self.state.lock().fulfillers.insert(key, Arc::new(fulfiller));
    }

    /// Drops the fulfiller registered for `key`, if any.
    pub fn remove_fulfiller(&self, key: &K) {
        self.state.lock().fulfillers.remove(key);
    }

    /// Asynchronous resolution entry point: hands `key` and the
    /// wrapped `handler` to the fulfiller registered for `key`.
    ///
    /// There is no synchronous return value; the handler runs
    /// whenever the fulfiller delivers. If no fulfiller is registered
    /// for `key` the request is dropped with a warning.
    pub fn request<F>(&self, handler: F, key: K)
    where
        F: FnOnce(K, Handle<T>) + Send + 'static,
    {
        let fulfiller = self.state.lock().fulfillers.get(&key).cloned();

        match fulfiller {
            // invoked outside the registry lock so the fulfiller may
            // call back into `create` synchronously
            Some(fulfiller) => fulfiller.fulfill(key, Callback::new(handler)),
            None => warn!("request for a key with no registered fulfiller"),
        }
    }

    /// Blocks the current thread until the fulfiller registered for
    /// `key` delivers, then returns the delivered handle.
    ///
    /// If no fulfiller is registered for `key` an empty handle is
    /// returned immediately.
    pub fn request_blocking(&self, key: K) -> Handle<T>
    where
        K: Send + 'static,
    {
        let fulfiller = self.state.lock().fulfillers.get(&key).cloned();
        let fulfiller = match fulfiller {
            Some(fulfiller) => fulfiller,
            None => {
                warn!("blocking request for a key with no registered fulfiller");
                return Handle::empty(self.fallback.clone());
            }
        };

        let (trigger, waiter) = latch();
        let slot: Arc<Mutex<Option<Handle<T>>>> = Arc::new(Mutex::new(None));
        let delivered = slot.clone();

        fulfiller.fulfill(
            key,
            Callback::new(move |_key, handle| {
                *delivered.lock() = Some(handle);
                trigger.open();
            }),
        );

        waiter.wait();
        let handle = slot.lock().take();
        handle.unwrap_or_else(|| Handle::empty(self.fallback.clone()))
    }
}

impl<K, T> Default for Registry<K, T>
where
    K: Eq + Hash,
    T: Resource,
{
    fn default() -> Self {
        Self::new()
    }
}
