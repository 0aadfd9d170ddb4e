use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::caches::{FieldValueCache, FilterCache, IdCache, MembershipCache, QueryParserCache};
use crate::cluster::{ClusterTopologyWatcher, ListenerId, TopologyEvent, TopologyListener};
use crate::config::IndexCacheConfig;
use crate::error::{IndexCacheError, Result};
use crate::stats::CacheStats;
use crate::segment::SegmentId;

type Registration = (Arc<dyn ClusterTopologyWatcher>, ListenerId);

/// Per-index cache coordinator
///
/// Aggregates the five sub-caches attached to one logical index behind a
/// single lifecycle, invalidation protocol, and memoized statistics view.
/// One instance exists per index, shared by reference between query execution
/// and administration code.
pub struct IndexCache {
    filter: Arc<dyn FilterCache>,
    field_value: Arc<dyn FieldValueCache>,
    query_parser: Arc<dyn QueryParserCache>,
    id_cache: Arc<dyn IdCache>,
    membership: Arc<dyn MembershipCache>,

    /// How long a memoized stats snapshot stays fresh
    refresh_interval: Duration,

    /// Memoized stats snapshot and the instant it was computed. The pair is
    /// only ever read or replaced as a unit, under this mutex.
    memo: Mutex<Option<(CacheStats, Instant)>>,

    /// Taken exactly once, by the close that deregisters
    registration: Mutex<Option<Registration>>,

    closed: AtomicBool,
}

/// Builder assembling an [`IndexCache`] from its collaborators
#[derive(Default)]
pub struct IndexCacheBuilder {
    filter: Option<Arc<dyn FilterCache>>,
    field_value: Option<Arc<dyn FieldValueCache>>,
    query_parser: Option<Arc<dyn QueryParserCache>>,
    id_cache: Option<Arc<dyn IdCache>>,
    membership: Option<Arc<dyn MembershipCache>>,
    watcher: Option<Arc<dyn ClusterTopologyWatcher>>,
    config: IndexCacheConfig,
}

impl IndexCacheBuilder {
    /// Set the filter result cache
    pub fn filter(mut self, cache: Arc<dyn FilterCache>) -> Self {
        self.filter = Some(cache);
        self
    }

    /// Set the field value cache
    pub fn field_value(mut self, cache: Arc<dyn FieldValueCache>) -> Self {
        self.field_value = Some(cache);
        self
    }

    /// Set the parsed query cache
    pub fn query_parser(mut self, cache: Arc<dyn QueryParserCache>) -> Self {
        self.query_parser = Some(cache);
        self
    }

    /// Set the document id cache
    pub fn id_cache(mut self, cache: Arc<dyn IdCache>) -> Self {
        self.id_cache = Some(cache);
        self
    }

    /// Set the probabilistic membership cache
    pub fn membership(mut self, cache: Arc<dyn MembershipCache>) -> Self {
        self.membership = Some(cache);
        self
    }

    /// Subscribe the coordinator to a cluster topology watcher
    pub fn watcher(mut self, watcher: Arc<dyn ClusterTopologyWatcher>) -> Self {
        self.watcher = Some(watcher);
        self
    }

    /// Set the configuration
    pub fn config(mut self, config: IndexCacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Open the coordinator.
    ///
    /// All five sub-caches are required; a missing one is a wiring error
    /// surfaced immediately. If a watcher was supplied, the coordinator
    /// registers itself as a topology listener before returning.
    pub fn open(self) -> Result<Arc<IndexCache>> {
        let filter = self
            .filter
            .ok_or(IndexCacheError::MissingCollaborator("filter"))?;
        let field_value = self
            .field_value
            .ok_or(IndexCacheError::MissingCollaborator("field value"))?;
        let query_parser = self
            .query_parser
            .ok_or(IndexCacheError::MissingCollaborator("query parser"))?;
        let id_cache = self
            .id_cache
            .ok_or(IndexCacheError::MissingCollaborator("id"))?;
        let membership = self
            .membership
            .ok_or(IndexCacheError::MissingCollaborator("membership"))?;

        debug!(
            refresh_interval = ?self.config.stats_refresh_interval,
            "opening index cache"
        );

        let cache = Arc::new(IndexCache {
            filter,
            field_value,
            query_parser,
            id_cache,
            membership,
            refresh_interval: self.config.stats_refresh_interval,
            memo: Mutex::new(None),
            registration: Mutex::new(None),
            closed: AtomicBool::new(false),
        });

        if let Some(watcher) = self.watcher {
            let id = watcher.register(cache.clone());
            *cache.registration.lock() = Some((watcher, id));
        }

        Ok(cache)
    }
}

impl IndexCache {
    /// Start building an index cache
    pub fn builder() -> IndexCacheBuilder {
        IndexCacheBuilder::default()
    }

    /// Get the filter result cache
    pub fn filter(&self) -> &Arc<dyn FilterCache> {
        &self.filter
    }

    /// Get the field value cache
    pub fn field_value(&self) -> &Arc<dyn FieldValueCache> {
        &self.field_value
    }

    /// Get the parsed query cache
    pub fn query_parser(&self) -> &Arc<dyn QueryParserCache> {
        &self.query_parser
    }

    /// Get the document id cache
    pub fn id_cache(&self) -> &Arc<dyn IdCache> {
        &self.id_cache
    }

    /// Get the probabilistic membership cache
    pub fn membership(&self) -> &Arc<dyn MembershipCache> {
        &self.membership
    }

    /// Drop all cache entries scoped to one segment.
    ///
    /// Dispatched to the filter, field value, id, and membership caches. The
    /// parsed query cache holds no segment-scoped data and is left alone.
    /// A sub-cache failure propagates immediately, leaving later caches in
    /// the dispatch order un-cleared.
    pub fn clear_for_segment(&self, segment: &SegmentId) -> Result<()> {
        self.filter.clear_segment(segment)?;
        self.field_value.clear_segment(segment)?;
        self.id_cache.clear_segment(segment)?;
        self.membership.clear_segment(segment)?;
        Ok(())
    }

    /// Drop everything across all five caches.
    ///
    /// The filter and field value caches receive the reason for diagnostics;
    /// the remaining caches only support an unconditional full clear.
    pub fn clear_all(&self, reason: &str) -> Result<()> {
        debug!(reason, "clearing all index caches");
        self.filter.clear(reason)?;
        self.field_value.clear(reason)?;
        self.id_cache.clear_all()?;
        self.query_parser.clear()?;
        self.membership.clear_all()?;
        Ok(())
    }

    /// Get aggregated cache statistics.
    ///
    /// Aggregation queries every sub-cache and is called far more often than
    /// the numbers change, so the result is memoized: a snapshot younger than
    /// the refresh interval is returned unchanged.
    pub fn stats(&self) -> CacheStats {
        let mut memo = self.memo.lock();
        if let Some((snapshot, computed_at)) = memo.as_ref() {
            if computed_at.elapsed() <= self.refresh_interval {
                return snapshot.clone();
            }
        }

        let snapshot = self.aggregate_stats();
        *memo = Some((snapshot.clone(), Instant::now()));
        snapshot
    }

    /// Force the memoized stats snapshot to be recomputed now, regardless of
    /// how recently it was refreshed. Called after operations known to change
    /// cache contents materially, so stale numbers are never served just
    /// because the window has not elapsed.
    pub fn invalidate_cache(&self) {
        let mut memo = self.memo.lock();
        let snapshot = self.aggregate_stats();
        *memo = Some((snapshot, Instant::now()));
    }

    /// Query every sub-cache and assemble a fresh snapshot.
    ///
    /// Callers must hold the memo lock: aggregation passes are mutually
    /// exclusive, so a snapshot never mixes fields from two passes.
    fn aggregate_stats(&self) -> CacheStats {
        let field_value_evictions = self.field_value.evictions();
        let filter_evictions = self.filter.evictions();
        let field_value_size_in_bytes = self.field_value.size_in_bytes();
        let filter_entries = self.filter.entries_stats();

        CacheStats {
            field_value_evictions,
            filter_evictions,
            field_value_size_in_bytes,
            filter_size_in_bytes: filter_entries.size_in_bytes,
            filter_count: filter_entries.count,
            membership_size_in_bytes: self.membership.size_in_bytes(),
            id_cache_size_in_bytes: self.id_cache.size_in_bytes(),
            id_cache_size_by_category: self.id_cache.size_in_bytes_by_category(),
        }
    }

    /// Close all five sub-caches and deregister from the topology watcher.
    ///
    /// Shutdown is best-effort and total: every sub-cache is closed in a
    /// fixed order even if an earlier one fails, and the first failure is
    /// returned afterwards. Calling close again is a no-op.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let mut first_error = None;
        let results = [
            ("filter", self.filter.close()),
            ("field value", self.field_value.close()),
            ("id", self.id_cache.close()),
            ("query parser", self.query_parser.close()),
            ("membership", self.membership.close()),
        ];
        for (name, result) in results {
            if let Err(err) = result {
                warn!(cache = name, %err, "failed to close sub-cache");
                first_error.get_or_insert(err);
            }
        }

        if let Some((watcher, id)) = self.registration.lock().take() {
            watcher.deregister(id);
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl TopologyListener for IndexCache {
    /// Parsed queries may embed schema-dependent resolution, so a metadata
    /// change drops the parsed query cache. Every other topology change is a
    /// no-op at this layer.
    fn on_topology_change(&self, event: &TopologyEvent) -> Result<()> {
        if event.metadata_changed {
            self.query_parser.clear()?;
        }
        Ok(())
    }
}
