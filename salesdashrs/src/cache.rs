use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::config::CacheConfig;
use crate::executor::QueryResult;
use crate::sql_ast::RenderedQuery;

/// Cache entry with timestamp for TTL tracking.
#[derive(Debug, Clone)]
struct CacheEntry {
    result: QueryResult,
    inserted_at: Instant,
}

/// Query-result cache keyed by normalized query, with TTL and size limits.
///
/// Entries are never invalidated by writes to the store; they live until the
/// TTL passes, the size limit evicts them, or [`QueryCache::invalidate`] /
/// [`QueryCache::clear`] is called.
#[derive(Debug)]
pub struct QueryCache {
    results: HashMap<String, CacheEntry>,
    /// `None` means entries never expire.
    ttl: Option<Duration>,
    max_size: usize,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryCache {
    pub fn new() -> Self {
        Self::with_config(&CacheConfig::default())
    }

    /// Create a cache with configuration.
    pub fn with_config(config: &CacheConfig) -> Self {
        Self {
            results: HashMap::new(),
            ttl: (config.ttl_secs > 0).then(|| Duration::from_secs(config.ttl_secs)),
            max_size: config.max_size.max(1),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        match self.ttl {
            Some(ttl) => entry.inserted_at.elapsed() < ttl,
            None => true,
        }
    }

    /// Store `result`, sweeping expired entries first.
    pub fn insert(&mut self, query: &RenderedQuery, result: QueryResult) {
        self.evict_expired();
        let key = query.cache_key();
        // Evict oldest entry if at capacity
        if !self.results.contains_key(&key) && self.results.len() >= self.max_size {
            self.evict_oldest();
        }

        self.results.insert(
            key,
            CacheEntry {
                result,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn get(&self, query: &RenderedQuery) -> Option<&QueryResult> {
        self.results.get(&query.cache_key()).and_then(|entry| {
            if self.is_fresh(entry) {
                Some(&entry.result)
            } else {
                // Expired - treat as cache miss
                None
            }
        })
    }

    /// Drop one query's result. Returns whether it was cached.
    pub fn invalidate(&mut self, query: &RenderedQuery) -> bool {
        self.results.remove(&query.cache_key()).is_some()
    }

    /// Remove expired entries from the cache.
    pub fn evict_expired(&mut self) {
        if let Some(ttl) = self.ttl {
            self.results
                .retain(|_, entry| entry.inserted_at.elapsed() < ttl);
        }
    }

    /// Remove the oldest entry from the cache.
    fn evict_oldest(&mut self) {
        if let Some(oldest_key) = self
            .results
            .iter()
            .min_by_key(|(_, entry)| entry.inserted_at)
            .map(|(k, _)| k.clone())
        {
            tracing::debug!(key = %oldest_key, "evicting oldest query result from cache");
            self.results.remove(&oldest_key);
        }
    }

    /// Get current cache size.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Check if cache is empty.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Clear all cached results.
    pub fn clear(&mut self) {
        self.results.clear();
    }
}
