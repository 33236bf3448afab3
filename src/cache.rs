//! Short-TTL cache for rendered card images.
//!
//! Live stats go stale fast, so entries expire after seconds, not minutes.
//! The workload that matters is a burst of duplicate queries in one chat
//! window; even a short TTL absorbs most of those. When capacity is hit,
//! entries closest to expiry go first, which approximates LRU closely enough
//! for a cache this small.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::Fingerprint;

struct CacheEntry {
    bytes: Arc<Vec<u8>>,
    expires_at: Instant,
}

/// Fingerprint-keyed image cache with TTL and capacity bounds.
///
/// Internally synchronized; callers share it freely without external locking.
pub struct RenderCache {
    ttl: Duration,
    capacity: usize,
    entries: Mutex<HashMap<Fingerprint, CacheEntry>>,
}

impl RenderCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached image if it has not expired at `now`.
    ///
    /// A found-but-expired entry is removed as a side effect and reported as
    /// a miss.
    pub fn get(&self, key: &Fingerprint, now: Instant) -> Option<Arc<Vec<u8>>> {
        let mut entries = self.entries.lock().unwrap();
        let expired = match entries.get(key) {
            Some(entry) if now < entry.expires_at => return Some(Arc::clone(&entry.bytes)),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(key);
        }
        None
    }

    /// Inserts a freshly rendered image, expiring `ttl` from `now`.
    ///
    /// After the insert, every expired entry is purged; if the count still
    /// exceeds capacity, entries are evicted soonest-expiry-first.
    pub fn put(&self, key: Fingerprint, bytes: Arc<Vec<u8>>, now: Instant) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            key,
            CacheEntry {
                bytes,
                expires_at: now + self.ttl,
            },
        );

        entries.retain(|_, entry| now < entry.expires_at);

        while entries.len() > self.capacity {
            let soonest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.expires_at)
                .map(|(key, _)| *key);
            match soonest {
                Some(key) => {
                    entries.remove(&key);
                }
                None => break,
            }
        }
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> Fingerprint {
        Fingerprint::of(name)
    }

    fn image(name: &str) -> Arc<Vec<u8>> {
        Arc::new(name.as_bytes().to_vec())
    }

    #[test]
    fn hit_before_expiry_miss_at_and_after() {
        let cache = RenderCache::new(Duration::from_secs(60), 8);
        let t0 = Instant::now();

        cache.put(key("a"), image("a"), t0);
        assert!(cache.get(&key("a"), t0 + Duration::from_secs(59)).is_some());
        assert!(cache.get(&key("a"), t0 + Duration::from_secs(60)).is_none());
        // The expired entry was dropped on the failed lookup.
        assert!(cache.is_empty());
    }

    #[test]
    fn capacity_evicts_soonest_expiry_first() {
        let cache = RenderCache::new(Duration::from_secs(60), 2);
        let t0 = Instant::now();

        cache.put(key("a"), image("a"), t0);
        cache.put(key("b"), image("b"), t0 + Duration::from_secs(10));
        cache.put(key("c"), image("c"), t0 + Duration::from_secs(20));

        assert_eq!(cache.len(), 2);
        let now = t0 + Duration::from_secs(21);
        assert!(cache.get(&key("a"), now).is_none());
        assert!(cache.get(&key("b"), now).is_some());
        assert!(cache.get(&key("c"), now).is_some());

        // Expiry is anchored to each entry's own write time: B (written at
        // t=10) lives until t=70, C (written at t=20) until t=80.
        assert!(cache.get(&key("b"), t0 + Duration::from_secs(69)).is_some());
        assert!(cache.get(&key("b"), t0 + Duration::from_secs(70)).is_none());
        assert!(cache.get(&key("c"), t0 + Duration::from_secs(79)).is_some());
        assert!(cache.get(&key("c"), t0 + Duration::from_secs(80)).is_none());
    }

    #[test]
    fn count_never_exceeds_capacity_after_put() {
        let cache = RenderCache::new(Duration::from_secs(60), 3);
        let t0 = Instant::now();

        for i in 0..20 {
            cache.put(
                key(&format!("card-{i}")),
                image("img"),
                t0 + Duration::from_millis(i),
            );
            assert!(cache.len() <= 3);
        }
    }

    #[test]
    fn put_purges_already_expired_entries() {
        let cache = RenderCache::new(Duration::from_secs(60), 8);
        let t0 = Instant::now();

        cache.put(key("old"), image("old"), t0);
        cache.put(key("new"), image("new"), t0 + Duration::from_secs(61));

        assert_eq!(cache.len(), 1);
        assert!(cache
            .get(&key("new"), t0 + Duration::from_secs(62))
            .is_some());
    }

    #[test]
    fn overwrite_refreshes_expiry() {
        let cache = RenderCache::new(Duration::from_secs(60), 8);
        let t0 = Instant::now();

        cache.put(key("a"), image("v1"), t0);
        cache.put(key("a"), image("v2"), t0 + Duration::from_secs(30));

        let got = cache.get(&key("a"), t0 + Duration::from_secs(80)).unwrap();
        assert_eq!(*got, b"v2".to_vec());
    }

    #[test]
    fn zero_capacity_is_clamped_to_one() {
        let cache = RenderCache::new(Duration::from_secs(60), 0);
        let t0 = Instant::now();
        cache.put(key("a"), image("a"), t0);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn clear_empties_the_cache() {
        let cache = RenderCache::new(Duration::from_secs(60), 8);
        let t0 = Instant::now();
        cache.put(key("a"), image("a"), t0);
        cache.clear();
        assert!(cache.is_empty());
    }
}
