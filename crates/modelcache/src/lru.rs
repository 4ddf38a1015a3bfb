//! LRU (Least Recently Used) cache implementation
//!
//! Recency is a logical clock: every hit and every insert stamps the entry
//! with the next clock value. Stamps are never reused, so the entry with the
//! smallest stamp is always a unique eviction victim.

use std::collections::HashMap;
use std::hash::Hash;

use ahash::RandomState;

use crate::error::KeyNotFound;

/// Value plus its last-access stamp
struct Slot<V> {
    value: V,
    recency: u64,
}

/// LRU cache with fixed capacity
pub struct LruCache<K, V> {
    entries: HashMap<K, Slot<V>, RandomState>,
    clock: u64,
    capacity: usize,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Create a new LRU cache with the given capacity
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than 0");

        Self {
            entries: HashMap::with_capacity_and_hasher(capacity, RandomState::new()),
            clock: 0,
            capacity,
        }
    }

    /// True if `key` has an entry. Does not count as an access.
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Get a value from the cache, marking it most recently used
    pub fn get(&mut self, key: &K) -> Result<&V, KeyNotFound> {
        let stamp = self.clock;
        match self.entries.get_mut(key) {
            Some(slot) => {
                slot.recency = stamp;
                self.clock += 1;
                Ok(&slot.value)
            }
            None => Err(KeyNotFound),
        }
    }

    /// Insert or overwrite a value, marking it most recently used
    ///
    /// Inserting a new key into a full cache evicts the least recently used
    /// entry first; that entry is returned.
    pub fn put(&mut self, key: K, value: V) -> Option<(K, V)> {
        let stamp = self.clock;
        self.clock += 1;

        if let Some(slot) = self.entries.get_mut(&key) {
            slot.value = value;
            slot.recency = stamp;
            return None;
        }

        let evicted = if self.entries.len() >= self.capacity {
            self.evict()
        } else {
            None
        };

        self.entries.insert(
            key,
            Slot {
                value,
                recency: stamp,
            },
        );

        evicted
    }

    /// Remove `key`, returning its value. Does not advance the clock.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|slot| slot.value)
    }

    /// Last-access stamp of `key`, if present
    pub fn recency(&self, key: &K) -> Option<u64> {
        self.entries.get(key).map(|slot| slot.recency)
    }

    /// Current clock value (the stamp the next access will receive)
    pub fn clock(&self) -> u64 {
        self.clock
    }

    /// Keys currently held, in no particular order
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    /// Get the current size of the cache
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn evict(&mut self) -> Option<(K, V)> {
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, slot)| slot.recency)
            .map(|(key, _)| key.clone())?;

        self.entries
            .remove_entry(&victim)
            .map(|(key, slot)| (key, slot.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lru_basic() {
        let mut cache = LruCache::new(2);

        cache.put(1, "a");
        cache.put(2, "b");

        assert_eq!(cache.get(&1), Ok(&"a"));
        assert_eq!(cache.get(&2), Ok(&"b"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_lru_eviction() {
        let mut cache = LruCache::new(2);

        cache.put(1, "a");
        cache.put(2, "b");
        let evicted = cache.put(3, "c");

        assert_eq!(evicted, Some((1, "a")));
        assert_eq!(cache.get(&1), Err(KeyNotFound));
        assert_eq!(cache.get(&2), Ok(&"b"));
        assert_eq!(cache.get(&3), Ok(&"c"));
    }

    #[test]
    fn test_lru_recency_scenario() {
        let mut cache = LruCache::new(2);

        cache.put('A', 1);
        cache.put('B', 2);
        assert!(cache.get(&'A').is_ok());
        let evicted = cache.put('C', 3);

        assert_eq!(evicted, Some(('B', 2)));
        assert!(cache.contains(&'A'));
        assert!(cache.contains(&'C'));
        assert!(!cache.contains(&'B'));
    }

    #[test]
    fn test_lru_capacity_one() {
        let mut cache = LruCache::new(1);

        cache.put('A', 1);
        cache.put('B', 2);

        assert!(!cache.contains(&'A'));
        assert!(cache.contains(&'B'));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_lru_overwrite() {
        let mut cache = LruCache::new(2);

        cache.put(1, "a");
        let evicted = cache.put(1, "b");

        assert_eq!(evicted, None);
        assert_eq!(cache.get(&1), Ok(&"b"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_lru_overwrite_counts_as_access() {
        let mut cache = LruCache::new(2);

        cache.put(1, "a");
        cache.put(2, "b");
        cache.put(1, "a2");
        cache.put(3, "c");

        assert!(cache.contains(&1));
        assert!(!cache.contains(&2));
    }

    #[test]
    fn test_contains_does_not_touch_recency() {
        let mut cache = LruCache::new(2);

        cache.put(1, "a");
        cache.put(2, "b");
        let clock = cache.clock();
        let stamp = cache.recency(&1);

        assert!(cache.contains(&1));
        assert_eq!(cache.clock(), clock);
        assert_eq!(cache.recency(&1), stamp);

        cache.put(3, "c");
        assert!(!cache.contains(&1));
    }

    #[test]
    fn test_miss_does_not_advance_clock() {
        let mut cache: LruCache<u32, &str> = LruCache::new(2);

        cache.put(1, "a");
        let clock = cache.clock();
        assert_eq!(cache.get(&9), Err(KeyNotFound));
        assert_eq!(cache.clock(), clock);
    }

    #[test]
    fn test_clock_strictly_increasing_and_stamps_unique() {
        let mut cache = LruCache::new(4);
        let mut last = cache.clock();

        for i in 0..20u32 {
            cache.put(i % 6, i);
            assert!(cache.clock() > last);
            last = cache.clock();
            if cache.get(&(i % 3)).is_ok() {
                assert!(cache.clock() > last);
                last = cache.clock();
            }

            let mut stamps: Vec<_> = cache.keys().filter_map(|k| cache.recency(k)).collect();
            let total = stamps.len();
            stamps.sort_unstable();
            stamps.dedup();
            assert_eq!(stamps.len(), total);
        }
    }

    #[test]
    fn test_capacity_bound_and_single_eviction() {
        let mut cache: LruCache<u32, u32> = LruCache::new(3);

        for i in 0..50u32 {
            let before = cache.len();
            let oldest = cache
                .keys()
                .min_by_key(|k| cache.recency(k))
                .copied();
            let evicted = cache.put(i, i * 10);

            assert!(cache.len() <= cache.capacity());
            if before == 3 {
                assert_eq!(evicted.map(|(k, _)| k), oldest);
                assert_eq!(cache.len(), 3);
            } else {
                assert!(evicted.is_none());
            }
        }
    }

    #[test]
    fn test_remove_frees_a_slot() {
        let mut cache = LruCache::new(2);

        cache.put(1, "a");
        cache.put(2, "b");
        let clock = cache.clock();

        assert_eq!(cache.remove(&1), Some("a"));
        assert_eq!(cache.remove(&1), None);
        assert_eq!(cache.clock(), clock);

        assert_eq!(cache.put(3, "c"), None);
        assert!(cache.contains(&2));
        assert!(cache.contains(&3));
    }

    #[test]
    #[should_panic(expected = "Capacity must be greater than 0")]
    fn test_zero_capacity_rejected() {
        let _cache: LruCache<u32, u32> = LruCache::new(0);
    }
}
