use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::segment::SegmentId;

/// Capability set the coordinator consumes from a document id cache
pub trait IdCache: Send + Sync {
    /// Resident size of the cache in bytes
    fn size_in_bytes(&self) -> u64;

    /// Resident size broken down by document category
    fn size_in_bytes_by_category(&self) -> FxHashMap<String, u64>;

    /// Drop all entries scoped to one segment
    fn clear_segment(&self, segment: &SegmentId) -> Result<()>;

    /// Drop all entries
    fn clear_all(&self) -> Result<()>;

    /// Release the cache's resources
    fn close(&self) -> Result<()>;
}

type CategoryIds = FxHashMap<String, FxHashMap<String, u64>>;

/// In-memory document id cache
///
/// Maps document ids to their segment-local ordinals, grouped by document
/// category. Entries are loaded per segment and dropped per segment; there is
/// no eviction, the working set is bounded by the open segments.
#[derive(Default)]
pub struct InMemoryIdCache {
    segments: RwLock<FxHashMap<SegmentId, CategoryIds>>,
}

impl InMemoryIdCache {
    /// Create a new empty id cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the ordinal for a document id within a segment and category
    pub fn get(&self, segment: &SegmentId, category: &str, doc_id: &str) -> Option<u64> {
        self.segments
            .read()
            .get(segment)
            .and_then(|categories| categories.get(category))
            .and_then(|ids| ids.get(doc_id))
            .copied()
    }

    /// Record the ordinal for a document id within a segment and category
    pub fn put(&self, segment: SegmentId, category: &str, doc_id: &str, ordinal: u64) {
        self.segments
            .write()
            .entry(segment)
            .or_default()
            .entry(category.to_string())
            .or_default()
            .insert(doc_id.to_string(), ordinal);
    }

    /// Get the number of cached id mappings
    pub fn len(&self) -> usize {
        self.segments
            .read()
            .values()
            .flat_map(|categories| categories.values())
            .map(|ids| ids.len())
            .sum()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl IdCache for InMemoryIdCache {
    fn size_in_bytes(&self) -> u64 {
        self.segments
            .read()
            .values()
            .flat_map(|categories| categories.iter())
            .map(|(category, ids)| estimate_category_size(category, ids))
            .sum()
    }

    fn size_in_bytes_by_category(&self) -> FxHashMap<String, u64> {
        let mut by_category = FxHashMap::default();
        for categories in self.segments.read().values() {
            for (category, ids) in categories {
                *by_category.entry(category.clone()).or_insert(0) +=
                    estimate_category_size(category, ids);
            }
        }
        by_category
    }

    fn clear_segment(&self, segment: &SegmentId) -> Result<()> {
        self.segments.write().remove(segment);
        Ok(())
    }

    fn clear_all(&self) -> Result<()> {
        self.segments.write().clear();
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.segments.write().clear();
        Ok(())
    }
}

/// Estimate the size of one category's id mappings in bytes
fn estimate_category_size(category: &str, ids: &FxHashMap<String, u64>) -> u64 {
    let mut size = std::mem::size_of::<String>() + category.len();
    for doc_id in ids.keys() {
        size += std::mem::size_of::<String>() + doc_id.len();
        size += std::mem::size_of::<u64>();
    }
    size as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_and_get() {
        let cache = InMemoryIdCache::new();
        let segment = SegmentId::new(1);

        cache.put(segment, "article", "doc-1", 42);

        assert_eq!(cache.get(&segment, "article", "doc-1"), Some(42));
        assert_eq!(cache.get(&segment, "article", "doc-2"), None);
        assert_eq!(cache.get(&segment, "comment", "doc-1"), None);
    }

    #[test]
    fn test_size_by_category_spans_segments() {
        let cache = InMemoryIdCache::new();

        cache.put(SegmentId::new(1), "article", "doc-1", 0);
        cache.put(SegmentId::new(2), "article", "doc-2", 0);
        cache.put(SegmentId::new(1), "comment", "doc-3", 1);

        let by_category = cache.size_in_bytes_by_category();
        assert_eq!(by_category.len(), 2);
        assert!(by_category["article"] > by_category["comment"]);
        assert_eq!(by_category.values().sum::<u64>(), cache.size_in_bytes());
    }

    #[test]
    fn test_clear_segment_is_targeted() {
        let cache = InMemoryIdCache::new();

        cache.put(SegmentId::new(1), "article", "doc-1", 0);
        cache.put(SegmentId::new(2), "article", "doc-2", 0);

        cache.clear_segment(&SegmentId::new(1)).unwrap();

        assert_eq!(cache.get(&SegmentId::new(1), "article", "doc-1"), None);
        assert_eq!(cache.get(&SegmentId::new(2), "article", "doc-2"), Some(0));
    }

    #[test]
    fn test_clear_all() {
        let cache = InMemoryIdCache::new();

        cache.put(SegmentId::new(1), "article", "doc-1", 0);
        cache.clear_all().unwrap();

        assert!(cache.is_empty());
        assert_eq!(cache.size_in_bytes(), 0);
        assert!(cache.size_in_bytes_by_category().is_empty());
    }
}
