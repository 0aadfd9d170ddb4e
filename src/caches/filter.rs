use bytesize::ByteSize;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::debug;

use crate::error::Result;
use crate::segment::SegmentId;

/// Doc ids matched by one cached filter within one segment
pub type FilterDocs = SmallVec<[u32; 8]>;

/// Size and entry count reported by a filter cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntriesStats {
    /// Resident size of all cached filter results in bytes
    pub size_in_bytes: u64,

    /// Number of cached filter results
    pub count: u64,
}

/// Capability set the coordinator consumes from a filter result cache
pub trait FilterCache: Send + Sync {
    /// Number of entries evicted since the cache was opened
    fn evictions(&self) -> u64;

    /// Resident size of the cache in bytes
    fn size_in_bytes(&self) -> u64;

    /// Size and count of the cached entries
    fn entries_stats(&self) -> EntriesStats;

    /// Drop all entries scoped to one segment
    fn clear_segment(&self, segment: &SegmentId) -> Result<()>;

    /// Drop all entries, tagged with a human-readable reason
    fn clear(&self, reason: &str) -> Result<()>;

    /// Release the cache's resources
    fn close(&self) -> Result<()>;
}

#[derive(Default)]
struct FilterInner {
    segments: FxHashMap<SegmentId, FxHashMap<String, FilterDocs>>,
    size_in_bytes: u64,
    evictions: u64,
}

/// In-memory filter result cache
///
/// Stores per-segment filter results under a byte budget. When the budget is
/// exceeded, whole cold segments are evicted; segment-scoped clears stay
/// targeted and cheap.
pub struct InMemoryFilterCache {
    max_size: u64,
    inner: RwLock<FilterInner>,
}

impl InMemoryFilterCache {
    /// Create a new filter cache with the specified maximum size
    pub fn new(max_size: ByteSize) -> Self {
        Self {
            max_size: max_size.as_u64(),
            inner: RwLock::new(FilterInner::default()),
        }
    }

    /// Get the cached doc ids for a filter key within a segment
    pub fn get(&self, segment: &SegmentId, filter_key: &str) -> Option<FilterDocs> {
        self.inner
            .read()
            .segments
            .get(segment)
            .and_then(|entries| entries.get(filter_key))
            .cloned()
    }

    /// Cache the doc ids matched by a filter key within a segment
    pub fn put(&self, segment: SegmentId, filter_key: &str, doc_ids: FilterDocs) {
        let size = estimate_entry_size(filter_key, &doc_ids);
        let mut inner = self.inner.write();
        let FilterInner {
            segments,
            size_in_bytes,
            evictions,
        } = &mut *inner;

        let entries = segments.entry(segment).or_default();
        if let Some(old) = entries.remove(filter_key) {
            *size_in_bytes = size_in_bytes.saturating_sub(estimate_entry_size(filter_key, &old));
        }
        entries.insert(filter_key.to_string(), doc_ids);
        *size_in_bytes += size;

        // Over budget: evict whole segments, sparing the one just written
        if *size_in_bytes > self.max_size {
            let victims: Vec<SegmentId> = segments
                .keys()
                .filter(|s| **s != segment)
                .copied()
                .collect();

            for victim in victims {
                if *size_in_bytes <= self.max_size {
                    break;
                }
                if let Some(evicted) = segments.remove(&victim) {
                    for (key, docs) in &evicted {
                        *size_in_bytes =
                            size_in_bytes.saturating_sub(estimate_entry_size(key, docs));
                        *evictions += 1;
                    }
                }
            }
        }
    }

    /// Get the number of cached filter results
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .segments
            .values()
            .map(|entries| entries.len())
            .sum()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryFilterCache {
    fn default() -> Self {
        Self::new(crate::config::IndexCacheConfig::default().filter_cache_size)
    }
}

impl FilterCache for InMemoryFilterCache {
    fn evictions(&self) -> u64 {
        self.inner.read().evictions
    }

    fn size_in_bytes(&self) -> u64 {
        self.inner.read().size_in_bytes
    }

    fn entries_stats(&self) -> EntriesStats {
        let inner = self.inner.read();
        EntriesStats {
            size_in_bytes: inner.size_in_bytes,
            count: inner.segments.values().map(|e| e.len() as u64).sum(),
        }
    }

    fn clear_segment(&self, segment: &SegmentId) -> Result<()> {
        let mut inner = self.inner.write();
        if let Some(entries) = inner.segments.remove(segment) {
            for (key, docs) in &entries {
                inner.size_in_bytes = inner
                    .size_in_bytes
                    .saturating_sub(estimate_entry_size(key, docs));
            }
        }
        Ok(())
    }

    fn clear(&self, reason: &str) -> Result<()> {
        debug!(reason, "clearing filter cache");
        let mut inner = self.inner.write();
        inner.segments.clear();
        inner.size_in_bytes = 0;
        Ok(())
    }

    fn close(&self) -> Result<()> {
        let mut inner = self.inner.write();
        inner.segments.clear();
        inner.size_in_bytes = 0;
        Ok(())
    }
}

/// Estimate the size of one cached filter result in bytes
fn estimate_entry_size(filter_key: &str, doc_ids: &FilterDocs) -> u64 {
    let mut size = std::mem::size_of::<String>() + filter_key.len();
    size += std::mem::size_of::<FilterDocs>();
    if doc_ids.spilled() {
        size += doc_ids.len() * std::mem::size_of::<u32>();
    }
    size as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn test_put_and_get() {
        let cache = InMemoryFilterCache::new(ByteSize::kib(64));
        let segment = SegmentId::new(1);

        cache.put(segment, "status:published", smallvec![1, 5, 9]);

        let docs = cache.get(&segment, "status:published").unwrap();
        assert_eq!(docs.as_slice(), &[1, 5, 9]);
        assert!(cache.get(&segment, "status:draft").is_none());
        assert!(cache.size_in_bytes() > 0);
    }

    #[test]
    fn test_replace_does_not_grow_size() {
        let cache = InMemoryFilterCache::new(ByteSize::kib(64));
        let segment = SegmentId::new(1);

        cache.put(segment, "status:published", smallvec![1, 2, 3]);
        let size = cache.size_in_bytes();

        cache.put(segment, "status:published", smallvec![4, 5, 6]);
        assert_eq!(cache.size_in_bytes(), size);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_eviction_spares_current_segment() {
        // Budget fits roughly two entries
        let cache = InMemoryFilterCache::new(ByteSize::b(150));

        cache.put(SegmentId::new(1), "a", smallvec![1]);
        cache.put(SegmentId::new(2), "b", smallvec![2]);
        cache.put(SegmentId::new(3), "c", smallvec![3]);

        assert!(cache.evictions() > 0);
        assert!(cache.get(&SegmentId::new(3), "c").is_some());
        assert!(cache.size_in_bytes() <= 150);
    }

    #[test]
    fn test_clear_segment_is_targeted() {
        let cache = InMemoryFilterCache::new(ByteSize::kib(64));

        cache.put(SegmentId::new(1), "a", smallvec![1]);
        cache.put(SegmentId::new(2), "b", smallvec![2]);

        cache.clear_segment(&SegmentId::new(1)).unwrap();

        assert!(cache.get(&SegmentId::new(1), "a").is_none());
        assert!(cache.get(&SegmentId::new(2), "b").is_some());
        assert_eq!(cache.entries_stats().count, 1);
    }

    #[test]
    fn test_clear_with_reason_is_total() {
        let cache = InMemoryFilterCache::new(ByteSize::kib(64));

        cache.put(SegmentId::new(1), "a", smallvec![1]);
        cache.put(SegmentId::new(2), "b", smallvec![2]);

        cache.clear("mapping-update").unwrap();

        assert!(cache.is_empty());
        assert_eq!(cache.size_in_bytes(), 0);
        assert_eq!(cache.entries_stats(), EntriesStats::default());
    }
}
