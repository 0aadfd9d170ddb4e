use rustc_hash::FxHashMap;
use serde::Serialize;

/// Point-in-time statistics aggregated across all sub-caches of one index.
///
/// A snapshot is immutable once assembled; the coordinator replaces the whole
/// value when it refreshes, it never patches individual fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Entries evicted from the field value cache since it was opened
    pub field_value_evictions: u64,

    /// Entries evicted from the filter cache since it was opened
    pub filter_evictions: u64,

    /// Resident size of the field value cache in bytes
    pub field_value_size_in_bytes: u64,

    /// Resident size of the filter cache in bytes
    pub filter_size_in_bytes: u64,

    /// Number of entries in the filter cache
    pub filter_count: u64,

    /// Resident size of the membership cache in bytes
    pub membership_size_in_bytes: u64,

    /// Resident size of the id cache in bytes
    pub id_cache_size_in_bytes: u64,

    /// Id cache size broken down by document category
    pub id_cache_size_by_category: FxHashMap<String, u64>,
}
