use lru::LruCache;
use std::{
    hash::Hash,
    num::NonZeroUsize,
    sync::{Mutex, PoisonError},
};

/// 方案缓存容量配置。
#[derive(Clone, Debug)]
pub struct SchemeCacheSize {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

impl Default for SchemeCacheSize {
    fn default() -> Self {
        Self {
            low: 4,
            medium: 16,
            high: 64,
        }
    }
}

/// 算子可能遇到的方案多样性。
#[derive(Clone, Copy, Debug)]
pub enum SchemeDiversity {
    Low,
    Medium,
    High,
}

impl SchemeCacheSize {
    pub(crate) fn new_cache<K: Hash + Eq, V: Copy>(&self, level: SchemeDiversity) -> SchemeCache<K, V> {
        let size = match level {
            SchemeDiversity::Low => self.low,
            SchemeDiversity::Medium => self.medium,
            SchemeDiversity::High => self.high,
        };
        SchemeCache(Mutex::new(LruCache::new(
            NonZeroUsize::new(size).unwrap_or(NonZeroUsize::MIN),
        )))
    }
}

/// 线程安全的方案缓存，淘汰最久未用的方案。
pub(crate) struct SchemeCache<K: Hash + Eq, V: Copy>(Mutex<LruCache<K, V>>);

impl<K: Hash + Eq, V: Copy> SchemeCache<K, V> {
    pub fn get_or_insert(&self, key: K, f: impl FnOnce() -> V) -> V {
        // 方案只在插入时计算一次，持锁线程 panic 不会留下不一致的条目
        let mut cache = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        *cache.get_or_insert(key, f)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[test]
fn test_eviction() {
    let cache = SchemeCacheSize {
        low: 2,
        ..Default::default()
    }
    .new_cache::<usize, usize>(SchemeDiversity::Low);

    assert_eq!(cache.get_or_insert(1, || 10), 10);
    assert_eq!(cache.get_or_insert(2, || 20), 20);
    assert_eq!(cache.get_or_insert(1, || unreachable!()), 10);
    assert_eq!(cache.get_or_insert(3, || 30), 30);
    assert_eq!(cache.len(), 2);
    // 2 最久未用，已被淘汰
    assert_eq!(cache.get_or_insert(2, || 21), 21);
}
