use std::time::Duration;

use bytesize::ByteSize;
use serde::{Deserialize, Serialize};

/// Index cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexCacheConfig {
    /// How long an aggregated statistics snapshot stays fresh
    pub stats_refresh_interval: Duration,

    /// Maximum resident size of the filter cache
    pub filter_cache_size: ByteSize,

    /// Maximum resident size of the field value cache
    pub field_value_cache_size: ByteSize,

    /// Maximum number of parsed queries kept by the query parser cache
    pub query_parser_cache_entries: usize,

    /// Bloom filter width, in bits, allocated per segment by the membership cache
    pub membership_bits_per_segment: usize,
}

impl Default for IndexCacheConfig {
    fn default() -> Self {
        Self {
            stats_refresh_interval: Duration::from_secs(1),
            filter_cache_size: ByteSize::mib(64),
            field_value_cache_size: ByteSize::mib(256),
            query_parser_cache_entries: 512,
            membership_bits_per_segment: 1 << 16,
        }
    }
}

impl IndexCacheConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the statistics refresh interval
    pub fn with_stats_refresh_interval(mut self, interval: Duration) -> Self {
        self.stats_refresh_interval = interval;
        self
    }

    /// Set the filter cache size
    pub fn with_filter_cache_size(mut self, size: ByteSize) -> Self {
        self.filter_cache_size = size;
        self
    }

    /// Set the field value cache size
    pub fn with_field_value_cache_size(mut self, size: ByteSize) -> Self {
        self.field_value_cache_size = size;
        self
    }

    /// Set the query parser cache capacity
    pub fn with_query_parser_cache_entries(mut self, entries: usize) -> Self {
        self.query_parser_cache_entries = entries;
        self
    }

    /// Set the membership cache bloom filter width per segment
    pub fn with_membership_bits_per_segment(mut self, bits: usize) -> Self {
        self.membership_bits_per_segment = bits;
        self
    }

    /// Create a low-memory configuration for resource-constrained environments
    pub fn low_memory() -> Self {
        Self {
            stats_refresh_interval: Duration::from_secs(5),
            filter_cache_size: ByteSize::mib(8),
            field_value_cache_size: ByteSize::mib(32),
            query_parser_cache_entries: 64,
            membership_bits_per_segment: 1 << 12,
        }
    }
}
