use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::trace;
use crate::core::config::{CacheConfig, EvictionStrategy};
use crate::core::error::Result;
use crate::core::stats::CacheStats;
use crate::search::options::SearchOptions;
use crate::search::results::SearchResults;

/// Normalized query text plus the serialized options it ran with
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(normalized_query: &str, options: &SearchOptions) -> Result<Self> {
        let options = serde_json::to_string(options)?;
        Ok(CacheKey(format!("{}\u{1f}{}", normalized_query, options)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub data: SearchResults,
    pub inserted_at: Instant,
    pub ttl: Duration,
    pub hits: u64,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.inserted_at) >= self.ttl
    }
}

/// Ranked result sets keyed by query, with TTL and bounded size.
///
/// Expiry is lazy: a stale entry is dropped when it is read, or when the
/// cache is full and needs room. Hits never reset an entry's TTL.
pub struct QueryCache {
    entries: Mutex<LruCache<CacheKey, CacheEntry>>,
    pub strategy: EvictionStrategy,
    pub ttl: Duration,
    pub size_limit: usize,
    hit_count: AtomicUsize,
    miss_count: AtomicUsize,
    eviction_count: AtomicUsize,
    expiration_count: AtomicUsize,
}

impl QueryCache {
    pub fn new(config: &CacheConfig) -> Self {
        let cap = NonZeroUsize::new(config.max_size).unwrap_or(NonZeroUsize::MIN);
        QueryCache {
            entries: Mutex::new(LruCache::new(cap)),
            strategy: config.strategy,
            ttl: Duration::from_millis(config.ttl_ms),
            size_limit: cap.get(),
            hit_count: AtomicUsize::new(0),
            miss_count: AtomicUsize::new(0),
            eviction_count: AtomicUsize::new(0),
            expiration_count: AtomicUsize::new(0),
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<SearchResults> {
        let mut entries = self.entries.lock();
        let now = Instant::now();

        let expired = match entries.peek(key) {
            Some(entry) => entry.is_expired(now),
            None => {
                self.miss_count.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        if expired {
            entries.pop(key);
            self.expiration_count.fetch_add(1, Ordering::Relaxed);
            self.miss_count.fetch_add(1, Ordering::Relaxed);
            trace!(key = key.as_str(), "cache entry expired");
            return None;
        }

        // Only LRU lets a hit change the eviction order
        let entry = match self.strategy {
            EvictionStrategy::Lru => entries.get_mut(key),
            EvictionStrategy::Fifo | EvictionStrategy::Lfu => entries.peek_mut(key),
        }?;
        entry.hits += 1;
        self.hit_count.fetch_add(1, Ordering::Relaxed);
        Some(entry.data.clone())
    }

    /// Insert or overwrite `key`, evicting first if the cache is full
    pub fn set(&self, key: CacheKey, data: SearchResults) {
        let mut entries = self.entries.lock();
        let now = Instant::now();

        if !entries.contains(&key) && entries.len() >= self.size_limit {
            self.purge_expired(&mut entries, now);
            if entries.len() >= self.size_limit {
                self.evict_one(&mut entries);
            }
        }

        let entry = CacheEntry {
            data,
            inserted_at: now,
            ttl: self.ttl,
            hits: 0,
        };

        match self.strategy {
            EvictionStrategy::Lru | EvictionStrategy::Lfu => {
                entries.put(key, entry);
            }
            EvictionStrategy::Fifo => {
                // An overwrite keeps its original queue position
                if let Some(existing) = entries.peek_mut(&key) {
                    *existing = entry;
                } else {
                    entries.put(key, entry);
                }
            }
        }
    }

    fn purge_expired(&self, entries: &mut LruCache<CacheKey, CacheEntry>, now: Instant) {
        let stale: Vec<CacheKey> = entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in stale {
            entries.pop(&key);
            self.expiration_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn evict_one(&self, entries: &mut LruCache<CacheKey, CacheEntry>) {
        let victim = match self.strategy {
            EvictionStrategy::Lru | EvictionStrategy::Fifo => entries.pop_lru().map(|(key, _)| key),
            EvictionStrategy::Lfu => {
                // Least hits; among equals the oldest in recency order
                let key = entries
                    .iter()
                    .rev()
                    .min_by_key(|(_, entry)| entry.hits)
                    .map(|(key, _)| key.clone());
                key.and_then(|key| entries.pop_entry(&key)).map(|(key, _)| key)
            }
        };

        if let Some(key) = victim {
            self.eviction_count.fetch_add(1, Ordering::Relaxed);
            trace!(key = key.as_str(), strategy = ?self.strategy, "cache entry evicted");
        }
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn get_size(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn get_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hit_count.load(Ordering::Relaxed),
            misses: self.miss_count.load(Ordering::Relaxed),
            evictions: self.eviction_count.load(Ordering::Relaxed),
            expirations: self.expiration_count.load(Ordering::Relaxed),
            size: self.get_size(),
            capacity: self.size_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::DocId;
    use crate::search::results::SearchResult;
    use std::thread;

    fn cache(max_size: usize, ttl_ms: u64, strategy: EvictionStrategy) -> QueryCache {
        QueryCache::new(&CacheConfig::new(max_size, ttl_ms, strategy))
    }

    fn key(query: &str) -> CacheKey {
        CacheKey::new(query, &SearchOptions::default()).unwrap()
    }

    fn results(id: &str) -> SearchResults {
        SearchResults {
            hits: vec![SearchResult::new(DocId::new(id), 1.0)],
            total_hits: 1,
            max_score: 1.0,
            ..SearchResults::default()
        }
    }

    #[test]
    fn overflow_evicts_least_recently_used() {
        let cache = cache(3, 60_000, EvictionStrategy::Lru);
        cache.set(key("a"), results("a"));
        cache.set(key("b"), results("b"));
        cache.set(key("c"), results("c"));

        // Touch "a" so "b" becomes the oldest
        assert!(cache.get(&key("a")).is_some());
        cache.set(key("d"), results("d"));

        assert_eq!(cache.get_size(), 3);
        assert!(cache.get(&key("b")).is_none());
        assert!(cache.get(&key("a")).is_some());
        assert_eq!(cache.get_stats().evictions, 1);
    }

    #[test]
    fn fifo_ignores_hits() {
        let cache = cache(2, 60_000, EvictionStrategy::Fifo);
        cache.set(key("a"), results("a"));
        cache.set(key("b"), results("b"));
        assert!(cache.get(&key("a")).is_some());
        cache.set(key("c"), results("c"));

        assert!(cache.get(&key("a")).is_none());
        assert!(cache.get(&key("b")).is_some());
    }

    #[test]
    fn lfu_evicts_least_hit() {
        let cache = cache(2, 60_000, EvictionStrategy::Lfu);
        cache.set(key("a"), results("a"));
        cache.set(key("b"), results("b"));
        cache.get(&key("a"));
        cache.get(&key("a"));
        cache.get(&key("b"));
        cache.set(key("c"), results("c"));

        assert!(cache.get(&key("b")).is_none());
        assert!(cache.get(&key("a")).is_some());
        assert!(cache.get(&key("c")).is_some());
    }

    #[test]
    fn expired_entries_read_as_absent() {
        let cache = cache(4, 30, EvictionStrategy::Lru);
        cache.set(key("a"), results("a"));
        assert!(cache.get(&key("a")).is_some());

        thread::sleep(Duration::from_millis(60));
        assert!(cache.get(&key("a")).is_none());
        assert_eq!(cache.get_size(), 0);
        assert_eq!(cache.get_stats().expirations, 1);
    }

    #[test]
    fn lru_hit_does_not_extend_ttl() {
        let cache = cache(4, 200, EvictionStrategy::Lru);
        cache.set(key("a"), results("a"));

        thread::sleep(Duration::from_millis(120));
        assert!(cache.get(&key("a")).is_some());

        // Expiry still counts from the original insert
        thread::sleep(Duration::from_millis(120));
        assert!(cache.get(&key("a")).is_none());
        assert_eq!(cache.get_stats().expirations, 1);
    }

    #[test]
    fn keys_include_options() {
        let exact = CacheKey::new("fox", &SearchOptions::exact()).unwrap();
        let prefix = CacheKey::new("fox", &SearchOptions::prefix()).unwrap();
        assert_ne!(exact, prefix);
    }

    #[test]
    fn stats_count_hits_and_misses() {
        let cache = cache(4, 60_000, EvictionStrategy::Lru);
        cache.set(key("a"), results("a"));
        cache.get(&key("a"));
        cache.get(&key("missing"));
        cache.clear();

        let stats = cache.get_stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 0);
        assert_eq!(stats.capacity, 4);
    }
}
