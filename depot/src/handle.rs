//! Shared-ownership handles to cached resource instances.

use crate::report::{self, Fault};
use crate::Resource;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;

/// Shared instance storage: one resource value behind its own lock.
pub(crate) type Instance<T> = Arc<RwLock<T>>;

/// Shared-ownership reference to a single resource instance, or the
/// empty state.
///
/// A handle is *valid* iff it owns an instance and that instance
/// reports `initialized()`. Cloning a handle adds an owner, dropping
/// or [`release`](Handle::release)-ing it removes one; the instance
/// itself is freed when the last owner is gone.
///
/// Dereferencing an invalid handle never faults at the call site: the
/// access reports [`Fault::InvalidAccess`] and yields a guard over
/// the issuing container's default-constructed fallback instance.
pub struct Handle<T> {
    slot: Option<Instance<T>>,
    fallback: Instance<T>,
}

impl<T: Resource> Handle<T> {
    /// Handle in the empty state.
    pub(crate) fn empty(fallback: Instance<T>) -> Self {
        Self {
            slot: None,
            fallback,
        }
    }

    /// Handle owning a fresh, uninitialized instance.
    pub(crate) fn fresh(fallback: Instance<T>) -> Self {
        Self {
            slot: Some(Arc::new(RwLock::new(T::default()))),
            fallback,
        }
    }

    /// The owned instance storage, if any.
    pub(crate) fn instance(&self) -> Option<&Instance<T>> {
        self.slot.as_ref()
    }

    /// Whether this handle owns an instance that reports itself
    /// initialized.
    pub fn is_valid(&self) -> bool {
        match self.slot {
            Some(ref instance) => instance.read().initialized(),
            None => false,
        }
    }

    /// Number of live owners of the underlying instance, including
    /// the copies held by pools and registries. Zero for an empty
    /// handle.
    pub fn ref_count(&self) -> usize {
        self.slot.as_ref().map(Arc::strong_count).unwrap_or(0)
    }

    /// Read access to the resource.
    ///
    /// An invalid handle reports [`Fault::InvalidAccess`] and returns
    /// a guard over the fallback instance instead; execution
    /// continues at the call site.
    #[track_caller]
    pub fn get(&self) -> RwLockReadGuard<'_, T> {
        if let Some(ref instance) = self.slot {
            let guard = instance.read();
            if guard.initialized() {
                return guard;
            }
        }

        report::report(Fault::InvalidAccess);
        self.fallback.read()
    }

    /// Write access to the resource, with the same fallback behavior
    /// as [`get`](Handle::get).
    #[track_caller]
    pub fn get_mut(&self) -> RwLockWriteGuard<'_, T> {
        if let Some(ref instance) = self.slot {
            let guard = instance.write();
            if guard.initialized() {
                return guard;
            }
        }

        report::report(Fault::InvalidAccess);
        self.fallback.write()
    }

    /// Explicitly clears this handle to the empty state, giving up
    /// its share of ownership without returning the instance to any
    /// pool.
    pub fn release(&mut self) {
        self.slot = None;
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
            fallback: self.fallback.clone(),
        }
    }
}
