//! LRU cache for compiled wildcard patterns
//!
//! Policies are evaluated far more often than they change, so each distinct
//! pattern string is compiled once and reused. Only compiled patterns are
//! cached, never evaluation results.

use super::PatternMatcher;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;

/// Default number of compiled patterns kept per engine
pub const DEFAULT_PATTERN_CACHE_CAPACITY: usize = 1024;

/// Shared LRU cache of compiled patterns
pub struct PatternCache {
    cache: Mutex<LruCache<String, PatternMatcher>>,
}

impl PatternCache {
    /// Create a new pattern cache with given capacity (zero is treated as one)
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        PatternCache {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Match `actual` against `pattern`, compiling the pattern on first use
    pub fn matches(&self, actual: &str, pattern: &str) -> bool {
        self.get_or_compile(pattern).is_match(actual)
    }

    /// Get the compiled form of a pattern
    pub fn get_or_compile(&self, pattern: &str) -> PatternMatcher {
        let mut cache = self.cache.lock();
        if let Some(matcher) = cache.get(pattern) {
            return matcher.clone();
        }

        let matcher = PatternMatcher::new(pattern);
        cache.put(pattern.to_string(), matcher.clone());
        matcher
    }

    /// Clear the cache
    pub fn clear(&self) {
        self.cache.lock().clear();
    }

    /// Number of compiled patterns held
    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }
}

impl Default for PatternCache {
    fn default() -> Self {
        Self::new(DEFAULT_PATTERN_CACHE_CAPACITY)
    }
}

impl std::fmt::Debug for PatternCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternCache")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_basic() {
        let cache = PatternCache::new(10);
        assert!(cache.is_empty());

        assert!(cache.matches("s3:GetObject", "s3:*"));
        assert_eq!(cache.len(), 1);

        // Second use of the same pattern hits the cache
        assert!(!cache.matches("iam:GetUser", "s3:*"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_lru_eviction() {
        let cache = PatternCache::new(2);

        cache.get_or_compile("a*");
        cache.get_or_compile("b*");
        cache.get_or_compile("c*"); // Should evict a*

        assert_eq!(cache.len(), 2);
        assert!(cache.matches("apple", "a*")); // Recompiled transparently
    }

    #[test]
    fn test_cache_clear() {
        let cache = PatternCache::new(10);

        cache.get_or_compile("x?");
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert_eq!(cache.len(), 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_capacity() {
        let cache = PatternCache::new(0);
        assert!(cache.matches("ab", "a?"));
        assert_eq!(cache.len(), 1);
    }
}
