//! Bounded key/value cache with explicit eviction policy
//!
//! Structure: IndexMap<K, V>
//! - Front of the map = next eviction candidate
//! - O(1) lookup by key, O(n) reorder on promotion (n is small: ~100)
//!
//! Both the query cache and the thumbnail cache sit on top of this type.

use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Which entry goes first when the cache is full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// Evict the oldest insertion; hits do not refresh an entry (FIFO cap)
    #[default]
    InsertionOrder,
    /// Evict the least recently read or written entry (true LRU)
    LeastRecentlyUsed,
}

/// Hit/miss counters, shareable across clones of a cache handle
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        self.hits() + self.misses()
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 { 0.0 } else { self.hits() as f64 / total as f64 }
    }

    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

/// Capacity-bounded map. Never holds more than `capacity` entries.
#[derive(Debug, Clone)]
pub struct BoundedCache<K, V> {
    entries: IndexMap<K, V>,
    capacity: usize,
    policy: EvictionPolicy,
}

impl<K, V> BoundedCache<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Create an empty cache. Capacity 0 is a configuration error.
    pub fn new(capacity: usize, policy: EvictionPolicy) -> Result<Self, EngineError> {
        if capacity == 0 {
            return Err(EngineError::InvalidCapacity { what: "bounded cache" });
        }
        Ok(Self {
            entries: IndexMap::with_capacity(capacity),
            capacity,
            policy,
        })
    }

    /// Infallible constructor for capacities known at compile time
    pub fn with_capacity(capacity: NonZeroUsize, policy: EvictionPolicy) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity.get()),
            capacity: capacity.get(),
            policy,
        }
    }

    /// Look up an entry. Promotes it under `LeastRecentlyUsed`.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        if self.policy == EvictionPolicy::LeastRecentlyUsed {
            let index = self.entries.get_index_of(key)?;
            let last = self.entries.len() - 1;
            self.entries.move_index(index, last);
            return self.entries.get_index(last).map(|(_, v)| v);
        }
        self.entries.get(key)
    }

    /// Look up without touching eviction order
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert or replace. Returns the entries evicted to make room.
    ///
    /// Replacing an existing key never evicts. Under `InsertionOrder` the
    /// replaced entry keeps its original slot.
    pub fn insert(&mut self, key: K, value: V) -> Vec<(K, V)> {
        if let Some(index) = self.entries.get_index_of(&key) {
            if let Some((_, slot)) = self.entries.get_index_mut(index) {
                *slot = value;
            }
            if self.policy == EvictionPolicy::LeastRecentlyUsed {
                let last = self.entries.len() - 1;
                self.entries.move_index(index, last);
            }
            return Vec::new();
        }

        let mut evicted = Vec::new();
        while self.entries.len() >= self.capacity {
            match self.entries.shift_remove_index(0) {
                Some(pair) => evicted.push(pair),
                None => break,
            }
        }
        self.entries.insert(key, value);
        evicted
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.shift_remove(key)
    }

    /// Change capacity. Shrinking evicts from the front until `len <= capacity`.
    pub fn set_capacity(&mut self, capacity: usize) -> Result<Vec<(K, V)>, EngineError> {
        if capacity == 0 {
            return Err(EngineError::InvalidCapacity { what: "bounded cache" });
        }
        self.capacity = capacity;
        let mut evicted = Vec::new();
        while self.entries.len() > self.capacity {
            match self.entries.shift_remove_index(0) {
                Some(pair) => evicted.push(pair),
                None => break,
            }
        }
        Ok(evicted)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    /// Keys from next-to-evict to most recent
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_capacity_rejected() {
        let cache: Result<BoundedCache<u32, u32>, _> = BoundedCache::new(0, EvictionPolicy::default());
        assert!(matches!(cache, Err(EngineError::InvalidCapacity { .. })));
    }

    #[test]
    fn test_insertion_order_evicts_oldest_insert() {
        let mut cache = BoundedCache::new(100, EvictionPolicy::InsertionOrder).unwrap();
        for i in 0..100u32 {
            cache.insert(i, i * 10);
        }

        // A hit must not refresh entry 0 under FIFO
        assert_eq!(cache.get(&0), Some(&0));

        let evicted = cache.insert(100, 1000);
        assert_eq!(evicted, vec![(0, 0)]);
        assert_eq!(cache.len(), 100);
        assert!(!cache.contains(&0));
        assert!(cache.contains(&1));
        assert!(cache.contains(&100));
    }

    #[test]
    fn test_lru_promotes_on_hit() {
        let mut cache = BoundedCache::new(3, EvictionPolicy::LeastRecentlyUsed).unwrap();
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("c", 3);

        assert_eq!(cache.get(&"a"), Some(&1));
        let evicted = cache.insert("d", 4);

        assert_eq!(evicted, vec![("b", 2)]);
        assert!(cache.contains(&"a"));
    }

    #[test]
    fn test_peek_does_not_promote() {
        let mut cache = BoundedCache::new(2, EvictionPolicy::LeastRecentlyUsed).unwrap();
        cache.insert(1, "one");
        cache.insert(2, "two");
        assert_eq!(cache.peek(&1), Some(&"one"));
        cache.insert(3, "three");
        assert!(!cache.contains(&1));
    }

    #[test]
    fn test_replace_does_not_evict() {
        let mut cache = BoundedCache::new(2, EvictionPolicy::InsertionOrder).unwrap();
        cache.insert(1, 1);
        cache.insert(2, 2);
        assert!(cache.insert(1, 11).is_empty());
        assert_eq!(cache.peek(&1), Some(&11));
        assert_eq!(cache.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_shrink_evicts_oldest_first() {
        let mut cache = BoundedCache::new(5, EvictionPolicy::InsertionOrder).unwrap();
        for i in 0..5 {
            cache.insert(i, i);
        }
        let evicted = cache.set_capacity(2).unwrap();
        assert_eq!(evicted.iter().map(|(k, _)| *k).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(cache.len(), 2);
        assert!(cache.set_capacity(0).is_err());
    }

    #[test]
    fn test_cache_statistics() {
        let stats = CacheStats::new();
        assert_eq!(stats.hit_rate(), 0.0);
        stats.record_hit();
        stats.record_miss();
        assert_eq!(stats.total(), 2);
        assert_eq!(stats.hit_rate(), 0.5);
        stats.reset();
        assert_eq!(stats.total(), 0);
    }
}
