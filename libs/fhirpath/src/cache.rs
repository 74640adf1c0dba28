//! Compiled-expression LRU cache.
//!
//! Maps source text to shared compiled ASTs with hit/miss counters. One
//! mutex critical section per lookup; hits promote the entry to
//! most-recently-used. A process-wide default cache with capacity 1000 backs
//! the convenience entry points.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use lru::LruCache;
use once_cell::sync::Lazy;

use crate::ast::Expression;
use crate::error::Result;
use crate::parser::parse;

const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Cache counters and occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub size: usize,
    /// `None` when the cache is unbounded.
    pub limit: Option<usize>,
    pub hits: u64,
    pub misses: u64,
}

struct CacheInner {
    entries: LruCache<String, Arc<Expression>>,
    hits: u64,
    misses: u64,
}

/// Thread-safe LRU cache over compiled expressions.
pub struct ExpressionCache {
    inner: Mutex<CacheInner>,
    limit: Option<usize>,
}

impl ExpressionCache {
    /// A cache holding at most `limit` entries; 0 means unbounded.
    pub fn new(limit: usize) -> Self {
        let entries = match NonZeroUsize::new(limit) {
            Some(n) => LruCache::new(n),
            None => LruCache::unbounded(),
        };
        Self {
            inner: Mutex::new(CacheInner {
                entries,
                hits: 0,
                misses: 0,
            }),
            limit: NonZeroUsize::new(limit).map(NonZeroUsize::get),
        }
    }

    /// Fetch the compiled form of `source`, compiling and inserting on miss.
    /// Parse failures are not cached.
    pub fn get(&self, source: &str) -> Result<Arc<Expression>> {
        {
            let mut inner = self.inner.lock().unwrap();
            if let Some(expr) = inner.entries.get(source) {
                let expr = expr.clone();
                inner.hits += 1;
                return Ok(expr);
            }
            inner.misses += 1;
        }

        // Compile outside the lock so slow parses do not serialize readers.
        let expr = Arc::new(parse(source)?);

        let mut inner = self.inner.lock().unwrap();
        inner.entries.put(source.to_string(), expr.clone());
        Ok(expr)
    }

    /// Drop all entries and reset the counters.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.entries.clear();
        inner.hits = 0;
        inner.misses = 0;
    }

    pub fn size(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().unwrap();
        CacheStats {
            size: inner.entries.len(),
            limit: self.limit,
            hits: inner.hits,
            misses: inner.misses,
        }
    }

    /// Hit percentage over all lookups so far; 0.0 before the first lookup.
    pub fn hit_rate(&self) -> f64 {
        let inner = self.inner.lock().unwrap();
        let total = inner.hits + inner.misses;
        if total == 0 {
            0.0
        } else {
            (inner.hits as f64 / total as f64) * 100.0
        }
    }

    /// True when `source` is currently cached; does not touch recency.
    pub fn contains(&self, source: &str) -> bool {
        self.inner.lock().unwrap().entries.peek(source).is_some()
    }
}

static DEFAULT_CACHE: Lazy<ExpressionCache> =
    Lazy::new(|| ExpressionCache::new(DEFAULT_CACHE_CAPACITY));

/// The process-wide default cache (capacity 1000).
pub fn default_cache() -> &'static ExpressionCache {
    &DEFAULT_CACHE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_and_miss_counters() {
        let cache = ExpressionCache::new(10);
        cache.get("1 + 1").unwrap();
        cache.get("1 + 1").unwrap();
        cache.get("2 + 2").unwrap();

        let stats = cache.stats();
        assert_eq!(stats.size, 2);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert!((cache.hit_rate() - 33.333).abs() < 0.01);
    }

    #[test]
    fn test_lru_eviction_order() {
        let cache = ExpressionCache::new(2);
        cache.get("1").unwrap();
        cache.get("2").unwrap();
        // Touch "1" so "2" becomes the eviction candidate.
        cache.get("1").unwrap();
        cache.get("3").unwrap();

        assert_eq!(cache.size(), 2);
        assert!(cache.contains("1"));
        assert!(cache.contains("3"));
        assert!(!cache.contains("2"));
    }

    #[test]
    fn test_zero_limit_is_unbounded() {
        let cache = ExpressionCache::new(0);
        for i in 0..100 {
            cache.get(&format!("{i} + 0")).unwrap();
        }
        assert_eq!(cache.size(), 100);
        assert_eq!(cache.stats().limit, None);
    }

    #[test]
    fn test_parse_errors_not_cached() {
        let cache = ExpressionCache::new(10);
        assert!(cache.get("1 +").is_err());
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_clear_resets_counters() {
        let cache = ExpressionCache::new(10);
        cache.get("true").unwrap();
        cache.get("true").unwrap();
        cache.clear();
        let stats = cache.stats();
        assert_eq!(stats.size, 0);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
    }
}
