//! Application-level context owning the per-type pools and
//! registries.

use crate::pool::Pool;
use crate::registry::Registry;
use crate::Resource;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

type TypeMap = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

/// Explicit owner of the process's pools and registries.
///
/// Replaces per-type static singletons: construct one `Cache` at
/// application start and hand it to the subsystems that obtain
/// resources. Within one cache each resource type gets exactly one
/// shared [`Pool`] and each (key, resource) pair exactly one shared
/// [`Registry`]; different type pairs never contend with each other.
pub struct Cache {
    pools: RwLock<TypeMap>,
    registries: RwLock<TypeMap>,
}

impl Cache {
    /// Creates an empty cache. Pools and registries are constructed
    /// lazily on first access.
    pub fn new() -> Self {
        Self {
            pools: RwLock::new(HashMap::new()),
            registries: RwLock::new(HashMap::new()),
        }
    }

    /// The shared pool for resource type `T`.
    pub fn pool<T: Resource>(&self) -> Arc<Pool<T>> {
        if let Some(pool) = self.pools.read().get(&TypeId::of::<T>()) {
            return Arc::downcast(pool.clone()).expect("pool typemap entry has the wrong type");
        }

        let mut pools = self.pools.write();
        let pool = pools
            .entry(TypeId::of::<T>())
            .or_insert_with(|| {
                let pool: Arc<dyn Any + Send + Sync> = Arc::new(Pool::<T>::new());
                pool
            })
            .clone();

        Arc::downcast(pool).expect("pool typemap entry has the wrong type")
    }

    /// The shared registry for key type `K` and resource type `T`.
    pub fn registry<K, T>(&self) -> Arc<Registry<K, T>>
    where
        K: Eq + Hash + Send + 'static,
        T: Resource,
    {
        let id = TypeId::of::<(K, T)>();

        if let Some(registry) = self.registries.read().get(&id) {
            return Arc::downcast(registry.clone())
                .expect("registry typemap entry has the wrong type");
        }

        let mut registries = self.registries.write();
        let registry = registries
            .entry(id)
            .or_insert_with(|| {
                let registry: Arc<dyn Any + Send + Sync> = Arc::new(Registry::<K, T>::new());
                registry
            })
            .clone();

        Arc::downcast(registry).expect("registry typemap entry has the wrong type")
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use crate::cache::Cache;
    use crate::Resource;
    use std::sync::Arc;

    #[derive(Default)]
    struct Mesh {
        vertices: Option<usize>,
    }

    impl Resource for Mesh {
        type Params = usize;

        fn initialize(&mut self, params: usize) {
            self.vertices = Some(params);
        }

        fn reset(&mut self) {
            self.vertices = None;
        }

        fn initialized(&self) -> bool {
            self.vertices.is_some()
        }
    }

    #[derive(Default)]
    struct Sampler {
        bound: bool,
    }

    impl Resource for Sampler {
        type Params = ();

        fn initialize(&mut self, _params: ()) {
            self.bound = true;
        }

        fn reset(&mut self) {
            self.bound = false;
        }

        fn initialized(&self) -> bool {
            self.bound
        }
    }

    #[test]
    fn pool_is_shared_per_resource_type() {
        let cache = Cache::new();

        let first = cache.pool::<Mesh>();
        let second = cache.pool::<Mesh>();
        assert!(Arc::ptr_eq(&first, &second));

        // shared free list: a destroy through one reference is
        // visible through the other
        let handle = first.create(12);
        let before = second.free_count();
        second.destroy(handle);
        assert_eq!(second.free_count(), before + 1);
    }

    #[test]
    fn pools_are_independent_per_type() {
        let cache = Cache::new();

        let _mesh = cache.pool::<Mesh>().create(3);
        assert_eq!(cache.pool::<Sampler>().free_count(), 0);
    }

    #[test]
    fn registry_is_shared_per_key_and_resource_pair() {
        let cache = Cache::new();

        let first = cache.registry::<u32, Mesh>();
        let second = cache.registry::<u32, Mesh>();
        assert!(Arc::ptr_eq(&first, &second));

        let _handle = first.create(1, 9);
        assert!(second.has(&1));
    }

    #[test]
    fn registries_differ_per_key_type() {
        let cache = Cache::new();

        let by_u32 = cache.registry::<u32, Mesh>();
        let by_string = cache.registry::<String, Mesh>();

        let _handle = by_u32.create(1, 4);
        assert!(!by_string.has(&"1".to_string()));
    }
}
