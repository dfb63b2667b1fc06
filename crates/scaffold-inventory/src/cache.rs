//! Content-addressed summary cache using moka
//!
//! Summaries are keyed by the file's content hash together with its language
//! and relative path: identical bytes at two paths still get two summaries,
//! since the module path is part of every qualified name.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use moka::future::Cache;
use scaffold_model::{ContentHash, FileSummary, Language};

/// Cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SummaryKey {
    hash: ContentHash,
    language: Language,
    path: PathBuf,
}

impl SummaryKey {
    /// Key for a file's bytes at a path
    #[inline]
    #[must_use]
    pub fn new(hash: ContentHash, language: Language, path: impl Into<PathBuf>) -> Self {
        Self {
            hash,
            language,
            path: path.into(),
        }
    }
}

/// Hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that had to summarize
    pub misses: u64,
    /// Entries currently held
    pub entry_count: u64,
}

/// Shared, lock-free summary cache. Clones share storage.
#[derive(Debug, Clone)]
pub struct SummaryCache {
    inner: Cache<SummaryKey, Arc<FileSummary>>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl SummaryCache {
    /// Cache holding at most `max_capacity` summaries
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::new(max_capacity),
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Cached summary, counting the hit or miss
    pub async fn get(&self, key: &SummaryKey) -> Option<Arc<FileSummary>> {
        let found = self.inner.get(key).await;
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Store a summary
    pub async fn insert(&self, key: SummaryKey, summary: Arc<FileSummary>) {
        self.inner.insert(key, summary).await;
    }

    /// Drop every entry
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }

    /// Current counters
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: self.inner.entry_count(),
        }
    }
}

impl Default for SummaryCache {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hit_after_insert() {
        let cache = SummaryCache::default();
        let hash = ContentHash::of(b"def f(): pass\n");
        let key = SummaryKey::new(hash, Language::Python, "a.py");
        assert!(cache.get(&key).await.is_none());

        cache
            .insert(key.clone(), Arc::new(FileSummary::new("a.py", Language::Python, hash)))
            .await;
        assert!(cache.get(&key).await.is_some());

        let other_path = SummaryKey::new(hash, Language::Python, "b.py");
        assert!(cache.get(&other_path).await.is_none());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
    }
}
