use std::sync::Arc;

use bytesize::ByteSize;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::Result;
use crate::segment::SegmentId;

/// Capability set the coordinator consumes from a field value cache
pub trait FieldValueCache: Send + Sync {
    /// Number of entries evicted since the cache was opened
    fn evictions(&self) -> u64;

    /// Resident size of the cache in bytes
    fn size_in_bytes(&self) -> u64;

    /// Drop all entries scoped to one segment
    fn clear_segment(&self, segment: &SegmentId) -> Result<()>;

    /// Drop all entries, tagged with a human-readable reason
    fn clear(&self, reason: &str) -> Result<()>;

    /// Release the cache's resources
    fn close(&self) -> Result<()>;
}

#[derive(Default)]
struct FieldValueInner {
    segments: FxHashMap<SegmentId, FxHashMap<String, Arc<Vec<String>>>>,
    size_in_bytes: u64,
    evictions: u64,
}

/// In-memory field value cache
///
/// Holds per-segment, per-field loaded values behind shared handles so query
/// execution can keep using a value array after it has been evicted. Whole
/// cold segments are dropped when the byte budget is exceeded.
pub struct InMemoryFieldValueCache {
    max_size: u64,
    inner: RwLock<FieldValueInner>,
}

impl InMemoryFieldValueCache {
    /// Create a new field value cache with the specified maximum size
    pub fn new(max_size: ByteSize) -> Self {
        Self {
            max_size: max_size.as_u64(),
            inner: RwLock::new(FieldValueInner::default()),
        }
    }

    /// Get the loaded values for a field within a segment
    pub fn get(&self, segment: &SegmentId, field: &str) -> Option<Arc<Vec<String>>> {
        self.inner
            .read()
            .segments
            .get(segment)
            .and_then(|fields| fields.get(field))
            .cloned()
    }

    /// Cache the loaded values for a field within a segment
    pub fn put(&self, segment: SegmentId, field: &str, values: Vec<String>) -> Arc<Vec<String>> {
        let size = estimate_field_size(field, &values);
        let values = Arc::new(values);

        let mut inner = self.inner.write();
        let FieldValueInner {
            segments,
            size_in_bytes,
            evictions,
        } = &mut *inner;

        let fields = segments.entry(segment).or_default();
        if let Some(old) = fields.remove(field) {
            *size_in_bytes = size_in_bytes.saturating_sub(estimate_field_size(field, &old));
        }
        fields.insert(field.to_string(), values.clone());
        *size_in_bytes += size;

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
                    for (name, old) in &evicted {
                        *size_in_bytes =
                            size_in_bytes.saturating_sub(estimate_field_size(name, old));
                        *evictions += 1;
                    }
                }
            }
        }

        values
    }

    /// Get the number of cached field entries
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .segments
            .values()
            .map(|fields| fields.len())
            .sum()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryFieldValueCache {
    fn default() -> Self {
        Self::new(crate::config::IndexCacheConfig::default().field_value_cache_size)
    }
}

impl FieldValueCache for InMemoryFieldValueCache {
    fn evictions(&self) -> u64 {
        self.inner.read().evictions
    }

    fn size_in_bytes(&self) -> u64 {
        self.inner.read().size_in_bytes
    }

    fn clear_segment(&self, segment: &SegmentId) -> Result<()> {
        let mut inner = self.inner.write();
        if let Some(fields) = inner.segments.remove(segment) {
            for (name, values) in &fields {
                inner.size_in_bytes = inner
                    .size_in_bytes
                    .saturating_sub(estimate_field_size(name, values));
            }
        }
        Ok(())
    }

    fn clear(&self, reason: &str) -> Result<()> {
        debug!(reason, "clearing field value cache");
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

/// Estimate the size of one cached field in bytes
fn estimate_field_size(field: &str, values: &[String]) -> u64 {
    let mut size = std::mem::size_of::<String>() + field.len();
    size += std::mem::size_of::<Vec<String>>();
    for value in values {
        size += std::mem::size_of::<String>() + value.len();
    }
    size as u64
}
