//! # Index Cache
//!
//! Index Cache is the per-index cache coordinator for an embedded search
//! engine. It aggregates the five cache subsystems attached to one logical
//! index — filter results, field values, parsed queries, document ids, and
//! probabilistic membership — behind a single lifecycle, a two-tier
//! invalidation protocol, and a memoized statistics view.
//!
//! ## Features
//!
//! - Unified open/close lifecycle over all five sub-caches
//! - Segment-scoped and reason-scoped invalidation
//! - Cluster-metadata-driven invalidation of parsed queries
//! - Time-windowed statistics memoization for cheap stats on the query path
//! - Bundled in-memory sub-cache implementations
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use index_cache::{
//!     IndexCache, InMemoryFieldValueCache, InMemoryFilterCache, InMemoryIdCache,
//!     InMemoryMembershipCache, InMemoryQueryParserCache, SegmentId,
//! };
//!
//! // Open a coordinator over the bundled in-memory caches
//! let cache = IndexCache::builder()
//!     .filter(Arc::new(InMemoryFilterCache::default()))
//!     .field_value(Arc::new(InMemoryFieldValueCache::default()))
//!     .query_parser(Arc::new(InMemoryQueryParserCache::default()))
//!     .id_cache(Arc::new(InMemoryIdCache::new()))
//!     .membership(Arc::new(InMemoryMembershipCache::default()))
//!     .open()
//!     .unwrap();
//!
//! // A segment was merged away: drop its entries everywhere
//! cache.clear_for_segment(&SegmentId::new(3)).unwrap();
//!
//! // Aggregated statistics, memoized under the refresh interval
//! let stats = cache.stats();
//! assert_eq!(stats.filter_count, 0);
//!
//! cache.close().unwrap();
//! ```

mod caches;
mod cluster;
mod config;
mod error;
mod index_cache;
mod segment;
mod stats;

// Re-export public API
pub use config::IndexCacheConfig;
pub use error::{IndexCacheError, Result};
pub use index_cache::{IndexCache, IndexCacheBuilder};
pub use segment::SegmentId;
pub use stats::CacheStats;

// Re-export sub-cache API
pub use caches::{
    EntriesStats,
    FieldValueCache,
    FilterCache,
    FilterDocs,
    IdCache,
    InMemoryFieldValueCache,
    InMemoryFilterCache,
    InMemoryIdCache,
    InMemoryMembershipCache,
    InMemoryQueryParserCache,
    MembershipCache,
    ParsedQuery,
    QueryParserCache,
};

// Re-export cluster API
pub use cluster::{
    ClusterStateWatcher,
    ClusterTopologyWatcher,
    ListenerId,
    TopologyEvent,
    TopologyListener,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
