use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;
use tracing::warn;

use crate::error::{IndexCacheError, Result};

/// A change in the cluster's view of index configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TopologyEvent {
    /// Whether index metadata (schema/mappings) may have changed
    pub metadata_changed: bool,

    /// Whether cluster node membership changed
    pub nodes_changed: bool,
}

impl TopologyEvent {
    /// An event indicating a metadata (schema/mapping) change
    pub fn metadata_change() -> Self {
        Self {
            metadata_changed: true,
            nodes_changed: false,
        }
    }

    /// An event indicating a node membership change only
    pub fn node_change() -> Self {
        Self {
            metadata_changed: false,
            nodes_changed: true,
        }
    }
}

/// Handle identifying one registered topology listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Receives topology change notifications.
///
/// Listeners run on the watcher's delivery thread and must be safe to call
/// concurrently with the listener's other operations. A returned error is
/// surfaced on the watcher's error channel, not retried.
pub trait TopologyListener: Send + Sync {
    /// Handle one topology change notification
    fn on_topology_change(&self, event: &TopologyEvent) -> Result<()>;
}

/// Capability to subscribe to topology change notifications
pub trait ClusterTopologyWatcher: Send + Sync {
    /// Register a listener, returning the handle needed to deregister it
    fn register(&self, listener: Arc<dyn TopologyListener>) -> ListenerId;

    /// Remove a previously registered listener; unknown handles are ignored
    fn deregister(&self, id: ListenerId);
}

/// In-process topology watcher.
///
/// Notifications are delivered synchronously on the publishing thread, in
/// registration order. Listener failures are logged and forwarded to the
/// error channel so the embedder can observe incomplete deliveries.
pub struct ClusterStateWatcher {
    listeners: RwLock<Vec<(ListenerId, Arc<dyn TopologyListener>)>>,
    next_id: AtomicU64,
    error_sender: Sender<IndexCacheError>,
    error_receiver: Receiver<IndexCacheError>,
}

impl ClusterStateWatcher {
    /// Create a new watcher with no listeners
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
            error_sender: sender,
            error_receiver: receiver,
        }
    }

    /// Deliver an event to every registered listener
    pub fn publish(&self, event: &TopologyEvent) {
        // Snapshot under the read lock so a listener may deregister itself
        // during delivery without deadlocking.
        let listeners: Vec<Arc<dyn TopologyListener>> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        for listener in listeners {
            if let Err(err) = listener.on_topology_change(event) {
                warn!(%err, "topology listener failed");
                let _ = self.error_sender.send(err);
            }
        }
    }

    /// Get a receiver for listener failures
    pub fn errors(&self) -> Receiver<IndexCacheError> {
        self.error_receiver.clone()
    }

    /// Get the number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }
}

impl Default for ClusterStateWatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ClusterTopologyWatcher for ClusterStateWatcher {
    fn register(&self, listener: Arc<dyn TopologyListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, listener));
        id
    }

    fn deregister(&self, id: ListenerId) {
        self.listeners.write().retain(|(lid, _)| *lid != id);
    }
}
