// TTL cache entries shared by every read-coordination unit.
// An entry without a timestamp has never been populated and is always a miss.

use std::time::Duration;
use tokio::time::Instant;

/// A cached value plus the instant it was fetched.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub data: T,
    /// Completion time of the fetch that produced `data`; `None` until first store
    pub timestamp: Option<Instant>,
}

impl<T> CacheEntry<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            timestamp: None,
        }
    }

    pub fn is_populated(&self) -> bool {
        self.timestamp.is_some()
    }

    /// True iff populated and `now - timestamp < ttl`.
    pub fn is_valid(&self, ttl: Duration, now: Instant) -> bool {
        match self.timestamp {
            Some(fetched_at) => now.saturating_duration_since(fetched_at) < ttl,
            None => false,
        }
    }

    /// Overwrite the data and stamp it with `now`. Empty results are stored like any other.
    pub fn store(&mut self, data: T, now: Instant) {
        self.data = data;
        self.timestamp = Some(now);
    }

    pub fn age(&self, now: Instant) -> Option<Duration> {
        self.timestamp
            .map(|fetched_at| now.saturating_duration_since(fetched_at))
    }
}

impl<T: Default> Default for CacheEntry<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// A cache entry that is only valid for the exact key it was produced from.
#[derive(Debug, Clone)]
pub struct KeyedCacheEntry<K, T> {
    pub entry: CacheEntry<T>,
    pub key: K,
}

impl<K: PartialEq, T> KeyedCacheEntry<K, T> {
    pub fn new(key: K, data: T) -> Self {
        Self {
            entry: CacheEntry::new(data),
            key,
        }
    }

    /// Time condition and key identity must both hold.
    pub fn is_valid_for(&self, key: &K, ttl: Duration, now: Instant) -> bool {
        self.key == *key && self.entry.is_valid(ttl, now)
    }

    pub fn matches(&self, key: &K) -> bool {
        self.entry.is_populated() && self.key == *key
    }

    pub fn store(&mut self, key: K, data: T, now: Instant) {
        self.key = key;
        self.entry.store(data, now);
    }

    pub fn data(&self) -> &T {
        &self.entry.data
    }
}

impl<K: Default + PartialEq, T: Default> Default for KeyedCacheEntry<K, T> {
    fn default() -> Self {
        Self::new(K::default(), T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_unpopulated_entry_is_always_a_miss() {
        let entry: CacheEntry<Vec<String>> = CacheEntry::default();
        let now = Instant::now();
        assert!(!entry.is_valid(Duration::from_secs(3600), now));
        assert!(!entry.is_valid(Duration::MAX, now));
        assert!(entry.age(now).is_none());
    }

    #[test]
    fn test_ttl_boundary_ticks() {
        let ttl = Duration::from_millis(1000);
        let start = Instant::now();
        let mut entry = CacheEntry::new(0u32);
        entry.store(7, start);

        for offset_ms in [0u64, 1, 998, 999] {
            assert!(
                entry.is_valid(ttl, start + Duration::from_millis(offset_ms)),
                "entry should be fresh at +{}ms",
                offset_ms
            );
        }
        for offset_ms in [1000u64, 1001, 5000] {
            assert!(
                !entry.is_valid(ttl, start + Duration::from_millis(offset_ms)),
                "entry should be stale at +{}ms",
                offset_ms
            );
        }
    }

    #[test]
    fn test_empty_result_is_cached() {
        let mut entry: CacheEntry<Vec<String>> = CacheEntry::default();
        let now = Instant::now();
        entry.store(Vec::new(), now);
        assert!(entry.is_populated());
        assert!(entry.is_valid(Duration::from_secs(1), now));
    }

    #[test]
    fn test_keyed_entry_requires_same_key() {
        let now = Instant::now();
        let ttl = Duration::from_secs(120);
        let ab: BTreeSet<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
        let ba: BTreeSet<String> = ["b", "a"].iter().map(|s| s.to_string()).collect();
        let ac: BTreeSet<String> = ["a", "c"].iter().map(|s| s.to_string()).collect();

        let mut entry: KeyedCacheEntry<BTreeSet<String>, usize> = KeyedCacheEntry::default();
        entry.store(ab.clone(), 2, now);

        assert!(entry.is_valid_for(&ba, ttl, now));
        assert!(!entry.is_valid_for(&ac, ttl, now));
        assert!(!entry.is_valid_for(&ab, ttl, now + ttl));
        assert!(entry.matches(&ab));
    }
}
