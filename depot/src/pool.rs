//! Free-list object pools that recycle resource instances.

use crate::handle::{Handle, Instance};
use crate::Resource;
use log::trace;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

/// Per-type object pool backed by a LIFO free list.
///
/// The pool hands out ready-to-use handles and takes them back for
/// recycling instead of allocating a fresh instance per request. One
/// pool per resource type is shared through a
/// [`Cache`](crate::Cache).
///
/// None of the pool's operations can fail observably; failures during
/// resource-level initialization are the resource type's own concern.
pub struct Pool<T> {
    free: Mutex<Vec<Handle<T>>>,
    fallback: Instance<T>,
}

impl<T: Resource> Pool<T> {
    /// Number of fresh instances the free list is refilled with when
    /// it runs empty, and the bound `cleanup` trims it back to.
    pub const MIN_SIZE: usize = 10;

    /// Creates an empty pool. The free list is populated lazily by
    /// the first `create` call.
    pub fn new() -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            fallback: Arc::new(RwLock::new(T::default())),
        }
    }

    /// Returns a ready-to-use instance initialized with `params`.
    ///
    /// The empty-check, the refill and the pop execute as a single
    /// critical section so two racing callers never both observe an
    /// empty list and both refill. `initialize` runs after the pool
    /// lock is released so expensive setup work for one caller does
    /// not serialize unrelated callers.
    pub fn create(&self, params: T::Params) -> Handle<T> {
        let handle = {
            let mut free = self.free.lock();
            if free.is_empty() {
                trace!("free list empty, pre-warming {} instances", Self::MIN_SIZE);
                for _ in 0..Self::MIN_SIZE {
                    free.push(Handle::fresh(self.fallback.clone()));
                }
            }
            free.pop().expect("free list is non-empty after refill")
        };

        handle
            .instance()
            .expect("pooled handles always own an instance")
            .write()
            .initialize(params);

        handle
    }

    /// Resets the instance and returns it to the free list.
    ///
    /// The handle is consumed; copies of it that are still live keep
    /// the instance alive but observe the reset state. Destroying an
    /// empty handle has no effect.
    pub fn destroy(&self, handle: Handle<T>) {
        match handle.instance() {
            Some(instance) => instance.write().reset(),
            None => return,
        }

        self.free.lock().push(handle);
    }

    /// Pops and discards free-list entries until at most `MIN_SIZE`
    /// remain. Discarded instances are freed once their last owner is
    /// gone.
    ///
    /// Intended for occasional invocation at safe points, not per
    /// frame; it trades memory for future allocation cost.
    pub fn cleanup(&self) {
        let mut free = self.free.lock();
        let excess = free.len().saturating_sub(Self::MIN_SIZE);
        if excess > 0 {
            free.truncate(Self::MIN_SIZE);
            trace!("cleanup discarded {} pooled instances", excess);
        }
    }

    /// Current number of recycled instances waiting on the free list.
    pub fn free_count(&self) -> usize {
        self.free.lock().len()
    }
}

impl<T: Resource> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}
