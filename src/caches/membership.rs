use std::hash::Hasher;

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHasher};

use crate::error::Result;
use crate::segment::SegmentId;

/// Capability set the coordinator consumes from a probabilistic membership cache
pub trait MembershipCache: Send + Sync {
    /// Resident size of the cache in bytes
    fn size_in_bytes(&self) -> u64;

    /// Drop all filters scoped to one segment
    fn clear_segment(&self, segment: &SegmentId) -> Result<()>;

    /// Drop all filters
    fn clear_all(&self) -> Result<()>;

    /// Release the cache's resources
    fn close(&self) -> Result<()>;
}

const NUM_HASHES: u64 = 4;

/// Fixed-width bloom filter over document keys
struct BloomFilter {
    bits: Vec<u64>,
    num_bits: u64,
}

impl BloomFilter {
    fn new(num_bits: usize) -> Self {
        let num_bits = num_bits.max(64);
        Self {
            bits: vec![0; num_bits.div_ceil(64)],
            num_bits: num_bits as u64,
        }
    }

    fn insert(&mut self, key: &str) {
        for seed in 0..NUM_HASHES {
            let bit = self.bit_for(seed, key);
            self.bits[(bit / 64) as usize] |= 1 << (bit % 64);
        }
    }

    fn maybe_contains(&self, key: &str) -> bool {
        (0..NUM_HASHES).all(|seed| {
            let bit = self.bit_for(seed, key);
            self.bits[(bit / 64) as usize] & (1 << (bit % 64)) != 0
        })
    }

    fn bit_for(&self, seed: u64, key: &str) -> u64 {
        let mut hasher = FxHasher::default();
        hasher.write_u64(seed);
        hasher.write(key.as_bytes());
        hasher.finish() % self.num_bits
    }
}

/// In-memory probabilistic membership cache
///
/// Keeps one bloom filter per segment so query execution can skip segments
/// that definitely do not contain a document key. False positives are
/// possible, false negatives are not.
pub struct InMemoryMembershipCache {
    bits_per_segment: usize,
    segments: RwLock<FxHashMap<SegmentId, BloomFilter>>,
}

impl InMemoryMembershipCache {
    /// Create a new membership cache with the specified filter width per segment
    pub fn new(bits_per_segment: usize) -> Self {
        Self {
            bits_per_segment,
            segments: RwLock::new(FxHashMap::default()),
        }
    }

    /// Record a document key as present in a segment
    pub fn insert(&self, segment: SegmentId, key: &str) {
        let mut segments = self.segments.write();
        segments
            .entry(segment)
            .or_insert_with(|| BloomFilter::new(self.bits_per_segment))
            .insert(key);
    }

    /// Check whether a segment may contain a document key.
    ///
    /// Returns false only when the key is definitely absent; a segment with no
    /// filter yet is reported as definitely absent.
    pub fn maybe_contains(&self, segment: &SegmentId, key: &str) -> bool {
        self.segments
            .read()
            .get(segment)
            .map(|filter| filter.maybe_contains(key))
            .unwrap_or(false)
    }

    /// Get the number of segments with a filter
    pub fn segment_count(&self) -> usize {
        self.segments.read().len()
    }
}

impl Default for InMemoryMembershipCache {
    fn default() -> Self {
        Self::new(crate::config::IndexCacheConfig::default().membership_bits_per_segment)
    }
}

impl MembershipCache for InMemoryMembershipCache {
    fn size_in_bytes(&self) -> u64 {
        self.segments
            .read()
            .values()
            .map(|filter| (filter.bits.len() * std::mem::size_of::<u64>()) as u64)
            .sum()
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_false_negatives() {
        let cache = InMemoryMembershipCache::new(1 << 12);
        let segment = SegmentId::new(1);

        for i in 0..100 {
            cache.insert(segment, &format!("doc-{i}"));
        }
        for i in 0..100 {
            assert!(cache.maybe_contains(&segment, &format!("doc-{i}")));
        }
    }

    #[test]
    fn test_unknown_segment_is_definitely_absent() {
        let cache = InMemoryMembershipCache::new(1 << 12);
        assert!(!cache.maybe_contains(&SegmentId::new(9), "doc-1"));
    }

    #[test]
    fn test_mostly_rejects_absent_keys() {
        let cache = InMemoryMembershipCache::new(1 << 14);
        let segment = SegmentId::new(1);

        for i in 0..50 {
            cache.insert(segment, &format!("doc-{i}"));
        }

        // A sparse filter should reject the bulk of absent keys
        let false_positives = (0..1000)
            .filter(|i| cache.maybe_contains(&segment, &format!("other-{i}")))
            .count();
        assert!(false_positives < 100);
    }

    #[test]
    fn test_size_tracks_segments() {
        let cache = InMemoryMembershipCache::new(1 << 12);
        assert_eq!(cache.size_in_bytes(), 0);

        cache.insert(SegmentId::new(1), "doc-1");
        cache.insert(SegmentId::new(2), "doc-2");

        let per_segment = (1u64 << 12) / 8;
        assert_eq!(cache.size_in_bytes(), 2 * per_segment);

        cache.clear_segment(&SegmentId::new(1)).unwrap();
        assert_eq!(cache.size_in_bytes(), per_segment);

        cache.clear_all().unwrap();
        assert_eq!(cache.segment_count(), 0);
    }
}
