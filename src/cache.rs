//! Bounded LRU cache of immutable snapshots, keyed by revision.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

use crate::event::Revision;
use crate::snapshot::Snapshot;

/// LRU cache of shared [`Snapshot`] handles.
///
/// All operations are serialized by a single mutex. Handed-out snapshots
/// are immutable shared state; request-local graphs are built via
/// [`Snapshot::base_graph`] or
/// [`crate::snapshot::replay_from_snapshot`].
pub struct SnapshotCache {
    inner: Mutex<LruCache<Revision, Arc<Snapshot>>>,
}

impl SnapshotCache {
    /// Creates a cache holding at most `capacity` snapshots. A zero
    /// capacity is coerced to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        SnapshotCache {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Inserts or refreshes the snapshot under its own revision, promoting
    /// it to most-recently used. Evicts the least-recently-used entry when
    /// the cache is full.
    pub fn put(&self, snapshot: Arc<Snapshot>) {
        let revision = snapshot.revision();
        self.inner.lock().put(revision, snapshot);
    }

    /// Returns the snapshot for `revision` if cached, promoting it to
    /// most-recently used.
    pub fn get(&self, revision: Revision) -> Option<Arc<Snapshot>> {
        self.inner.lock().get(&revision).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Event, EventLog};
    use crate::model::{Attrs, NodeType};

    fn log_with_nodes(n: usize) -> EventLog {
        let mut log = EventLog::new();
        for i in 0..n {
            log.append(Event::NodeAdded {
                node_id: format!("n{i}").into(),
                node_type: NodeType::Field,
                attrs: Attrs::new(),
            });
        }
        log
    }

    #[test]
    fn put_get_update_and_evict() {
        let log = log_with_nodes(2);
        let cache = SnapshotCache::new(2);
        assert!(cache.is_empty());

        let s0 = Arc::new(Snapshot::from_log(&log, 0));
        let s1 = Arc::new(Snapshot::from_log(&log, 1));
        cache.put(s0.clone());
        cache.put(s1);
        assert_eq!(cache.len(), 2);

        // Same revision refreshes in place.
        cache.put(Arc::new(Snapshot::from_log(&log, 1)));
        assert_eq!(cache.len(), 2);

        assert!(cache.get(0).is_some());
        assert!(cache.get(99).is_none());
    }

    #[test]
    fn get_promotes_against_eviction() {
        let log = log_with_nodes(3);
        let cache = SnapshotCache::new(2);

        cache.put(Arc::new(Snapshot::from_log(&log, 0)));
        cache.put(Arc::new(Snapshot::from_log(&log, 1)));
        // Touch revision 0 so revision 1 becomes the LRU entry.
        assert!(cache.get(0).is_some());
        cache.put(Arc::new(Snapshot::from_log(&log, 2)));

        assert!(cache.get(1).is_none());
        assert!(cache.get(0).is_some());
        assert!(cache.get(2).is_some());
    }

    #[test]
    fn zero_capacity_coerces_to_one() {
        let log = log_with_nodes(1);
        let cache = SnapshotCache::new(0);
        cache.put(Arc::new(Snapshot::from_log(&log, 0)));
        assert_eq!(cache.len(), 1);
    }
}
