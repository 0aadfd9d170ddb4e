use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

use crate::error::Result;

/// Capability set the coordinator consumes from a parsed query cache.
///
/// Parsed queries are segment-independent, so the trait carries no
/// segment-scoped clear; invalidation is always total.
pub trait QueryParserCache: Send + Sync {
    /// Drop all parsed queries
    fn clear(&self) -> Result<()>;

    /// Release the cache's resources
    fn close(&self) -> Result<()>;
}

/// A query after parsing, ready for execution.
///
/// Term resolution may embed schema-dependent decisions, which is why the
/// whole cache is dropped when mappings change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuery {
    /// The source query string
    pub original: String,

    /// Resolved query terms
    pub terms: Vec<String>,
}

/// In-memory parsed query cache, bounded by entry count
pub struct InMemoryQueryParserCache {
    inner: Mutex<LruCache<String, Arc<ParsedQuery>>>,
}

impl InMemoryQueryParserCache {
    /// Create a new query parser cache holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::MIN.saturating_add(capacity.saturating_sub(1));
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Get a parsed query from the cache
    pub fn get(&self, query: &str) -> Option<Arc<ParsedQuery>> {
        self.inner.lock().get(query).cloned()
    }

    /// Put a parsed query in the cache
    pub fn put(&self, query: &str, parsed: ParsedQuery) -> Arc<ParsedQuery> {
        let parsed = Arc::new(parsed);
        self.inner.lock().put(query.to_string(), parsed.clone());
        parsed
    }

    /// Get the number of cached parsed queries
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl Default for InMemoryQueryParserCache {
    fn default() -> Self {
        Self::new(crate::config::IndexCacheConfig::default().query_parser_cache_entries)
    }
}

impl QueryParserCache for InMemoryQueryParserCache {
    fn clear(&self) -> Result<()> {
        self.inner.lock().clear();
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.inner.lock().clear();
        Ok(())
    }
}
