//! TTL + capacity-bounded cache for ranked result sets.
//!
//! Keys are filter fingerprints; values are the final ordered listing
//! vectors, never mutated after insertion. Eviction beyond capacity is
//! insertion-order FIFO, a documented simplification rather than true LRU.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::listing::StandardListing;

/// Configuration for the result cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long an entry stays servable after insertion.
    pub ttl: Duration,
    /// Maximum number of entries before the oldest is evicted.
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            capacity: 100,
        }
    }
}

/// Counters for cache introspection.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

struct CacheEntry {
    listings: Vec<StandardListing>,
    inserted_at: Instant,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    /// Keys in insertion order; drives FIFO eviction.
    order: VecDeque<String>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

/// Thread-safe memoization of final ranked result sets.
#[derive(Clone)]
pub struct ResultCache {
    config: CacheConfig,
    inner: Arc<Mutex<CacheInner>>,
}

impl ResultCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            inner: Arc::new(Mutex::new(CacheInner::default())),
        }
    }

    /// Acquires the inner mutex lock, recovering from poison if necessary.
    ///
    /// A poisoned cache is treated like any other corrupt entry: recovered
    /// and carried on, never fatal to a search.
    fn lock_inner(&self) -> std::sync::MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Recovered from poisoned cache mutex");
            poisoned.into_inner()
        })
    }

    /// Fetch a live entry. Expired entries are evicted and reported as a miss.
    pub fn get(&self, key: &str) -> Option<Vec<StandardListing>> {
        let mut guard = self.lock_inner();
        let inner = &mut *guard;
        match inner.entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() < self.config.ttl => {
                let listings = entry.listings.clone();
                inner.hits += 1;
                tracing::debug!(key = %&key[..8.min(key.len())], "Cache hit");
                Some(listings)
            }
            Some(_) => {
                inner.entries.remove(key);
                inner.order.retain(|k| k != key);
                inner.misses += 1;
                tracing::debug!(key = %&key[..8.min(key.len())], "Cache entry expired");
                None
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    /// Insert a result set, evicting oldest-inserted entries beyond capacity.
    pub fn insert(&self, key: impl Into<String>, listings: Vec<StandardListing>) {
        let key = key.into();
        let mut inner = self.lock_inner();

        if inner.entries.insert(
            key.clone(),
            CacheEntry {
                listings,
                inserted_at: Instant::now(),
            },
        ).is_some()
        {
            // Re-insert counts as a fresh entry for eviction ordering.
            inner.order.retain(|k| k != &key);
        }
        inner.order.push_back(key);

        while inner.entries.len() > self.config.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.entries.remove(&oldest);
                inner.evictions += 1;
                tracing::debug!(key = %&oldest[..8.min(oldest.len())], "Cache entry evicted");
            } else {
                break;
            }
        }
    }

    /// Drop every entry. Counters are kept.
    pub fn clear(&self) {
        let mut inner = self.lock_inner();
        inner.entries.clear();
        inner.order.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock_inner();
        CacheStats {
            entries: inner.entries.len(),
            capacity: self.config.capacity,
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
        }
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::sample_listing;

    fn listings(n: u32) -> Vec<StandardListing> {
        (0..n).map(|i| sample_listing("cache", i, 700)).collect()
    }

    #[test]
    fn test_hit_within_ttl() {
        let cache = ResultCache::default();
        cache.insert("k1", listings(2));

        let hit = cache.get("k1").unwrap();
        assert_eq!(hit.len(), 2);
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_miss_when_absent() {
        let cache = ResultCache::default();
        assert!(cache.get("nope").is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_expired_entry_is_a_miss_and_evicted() {
        let cache = ResultCache::new(CacheConfig {
            ttl: Duration::from_millis(10),
            capacity: 100,
        });
        cache.insert("k1", listings(1));

        std::thread::sleep(Duration::from_millis(20));

        assert!(cache.get("k1").is_none());
        assert_eq!(cache.stats().entries, 0);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_capacity_evicts_oldest_inserted() {
        let cache = ResultCache::new(CacheConfig {
            ttl: Duration::from_secs(60),
            capacity: 100,
        });

        for i in 0..101 {
            cache.insert(format!("key-{i}"), listings(1));
        }

        let stats = cache.stats();
        assert_eq!(stats.entries, 100);
        assert_eq!(stats.evictions, 1);
        assert!(cache.get("key-0").is_none(), "oldest entry should be gone");
        assert!(cache.get("key-1").is_some());
        assert!(cache.get("key-100").is_some());
    }

    #[test]
    fn test_reinsert_refreshes_eviction_order() {
        let cache = ResultCache::new(CacheConfig {
            ttl: Duration::from_secs(60),
            capacity: 2,
        });

        cache.insert("a", listings(1));
        cache.insert("b", listings(1));
        cache.insert("a", listings(2));
        cache.insert("c", listings(1));

        // "b" became the oldest after "a" was refreshed.
        assert!(cache.get("b").is_none());
        assert_eq!(cache.get("a").unwrap().len(), 2);
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn test_clear_drops_everything() {
        let cache = ResultCache::default();
        cache.insert("k1", listings(1));
        cache.insert("k2", listings(1));

        cache.clear();

        assert_eq!(cache.stats().entries, 0);
        assert!(cache.get("k1").is_none());
    }
}
