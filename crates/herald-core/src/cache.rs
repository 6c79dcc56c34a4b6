//! TypeCache - 型ごとの導出データのキャッシュ
//!
//! Process-lifetime `TypeId -> V` map. Entries are pure derived data, so
//! there is no eviction: the key set is bounded by the program's types.

use std::any::TypeId;

use dashmap::DashMap;

/// Concurrent insert-or-fetch cache keyed by type identity.
///
/// # 競合時の挙動
/// Two callers racing on the same missing key may both run `factory`, but the
/// first value inserted wins and every caller gets that value back. The
/// factory must therefore be idempotent.
pub struct TypeCache<V> {
    entries: DashMap<TypeId, V>,
}

impl<V: Clone> TypeCache<V> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn get_or_create<T: ?Sized + 'static>(&self, factory: impl FnOnce() -> V) -> V {
        self.get_or_create_by_id(TypeId::of::<T>(), factory)
    }

    pub fn get_or_create_by_id(&self, key: TypeId, factory: impl FnOnce() -> V) -> V {
        if let Some(hit) = self.entries.get(&key) {
            return hit.value().clone();
        }

        // factory はロックの外で実行する
        let created = factory();
        self.entries.entry(key).or_insert(created).value().clone()
    }

    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Clone> Default for TypeCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};

    struct Alpha;
    struct Beta;

    #[test]
    fn factory_runs_once_per_type() {
        let cache: TypeCache<usize> = TypeCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            cache.get_or_create::<Alpha>(|| calls.fetch_add(1, Ordering::SeqCst) + 10);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get_or_create::<Alpha>(|| 0), 10);
        assert!(cache.contains::<Alpha>());
        assert!(!cache.contains::<Beta>());
    }

    #[test]
    fn types_do_not_collide() {
        let cache: TypeCache<&'static str> = TypeCache::new();
        assert_eq!(cache.get_or_create::<Alpha>(|| "alpha"), "alpha");
        assert_eq!(cache.get_or_create::<Beta>(|| "beta"), "beta");
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn racing_first_access_yields_one_value() {
        const THREADS: usize = 16;
        let cache: TypeCache<Arc<String>> = TypeCache::new();
        let barrier = Barrier::new(THREADS);

        let seen: Vec<Arc<String>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..THREADS)
                .map(|i| {
                    let cache = &cache;
                    let barrier = &barrier;
                    s.spawn(move || {
                        barrier.wait();
                        cache.get_or_create::<Alpha>(|| Arc::new(format!("from-{i}")))
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let first = &seen[0];
        assert!(seen.iter().all(|v| Arc::ptr_eq(v, first)));
        assert_eq!(cache.len(), 1);
    }
}
