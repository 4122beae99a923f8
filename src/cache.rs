//! Time-expiring retrieval memo.
//!
//! Keyed by index generation plus query signature, so swapping in a new
//! snapshot makes every older entry unreachable without an explicit flush.
//! moka's sync cache does its own internal locking; it is the only shared
//! mutable structure on the request path.

use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;

use crate::config::RetrievalConfig;
use crate::models::RetrievalResult;

pub struct RetrievalCache {
    cache: Cache<String, Arc<Vec<RetrievalResult>>>,
}

impl RetrievalCache {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();
        Self { cache }
    }

    pub fn from_config(config: &RetrievalConfig) -> Self {
        Self::new(
            config.cache_capacity,
            Duration::from_secs(config.cache_ttl_secs),
        )
    }

    pub fn key(generation: u64, top_k: usize, filters: &str, query: &str) -> String {
        format!("{}|{}|{}|{}", generation, top_k, filters, query.trim().to_lowercase())
    }

    pub fn get(&self, key: &str) -> Option<Arc<Vec<RetrievalResult>>> {
        self.cache.get(key)
    }

    pub fn insert(&self, key: String, results: Arc<Vec<RetrievalResult>>) {
        self.cache.insert(key, results);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let cache = RetrievalCache::new(16, Duration::from_secs(60));
        let key = RetrievalCache::key(1, 4, "", "Passive Voice ");
        cache.insert(key.clone(), Arc::new(Vec::new()));
        assert!(cache.get(&key).is_some());
        assert_eq!(key, "1|4||passive voice");
    }

    #[test]
    fn test_generation_changes_key() {
        let cache = RetrievalCache::new(16, Duration::from_secs(60));
        cache.insert(RetrievalCache::key(1, 4, "", "q"), Arc::new(Vec::new()));
        assert!(cache.get(&RetrievalCache::key(2, 4, "", "q")).is_none());
    }
}
