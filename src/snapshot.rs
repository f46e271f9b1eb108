//! Immutable revisioned graph checkpoints.

use crate::event::{EventLog, Revision};
use crate::graph::Graph;
use crate::replay::{incremental_replay, replay};

/// An immutable graph checkpoint at a specific revision.
///
/// Snapshots are safe to share between requests (typically as
/// `Arc<Snapshot>` handles from the cache); request-local work goes through
/// [`Snapshot::base_graph`], which hands out an independent clone.
#[derive(Clone, Debug)]
pub struct Snapshot {
    revision: Revision,
    graph: Graph,
}

impl Snapshot {
    /// Replays the log up to `revision` and captures the result.
    pub fn from_log(log: &EventLog, revision: Revision) -> Snapshot {
        let graph = replay(log, revision);
        Snapshot {
            revision: graph.revision(),
            graph,
        }
    }

    /// Captures the current state of `graph` as a read-only checkpoint,
    /// independent of later mutations to the source.
    pub fn from_graph(graph: &Graph) -> Snapshot {
        Snapshot {
            revision: graph.revision(),
            graph: graph.clone(),
        }
    }

    pub fn revision(&self) -> Revision {
        self.revision
    }

    /// Returns a deep, independent clone of the underlying graph. The
    /// caller owns it and may mutate freely.
    pub fn base_graph(&self) -> Graph {
        self.graph.clone()
    }

}

/// Builds a graph at `to` by cloning the snapshot and applying the log
/// tail. Falls back to a full replay when `to` precedes the snapshot
/// revision, since a snapshot cannot witness earlier states.
pub fn replay_from_snapshot(snapshot: &Snapshot, log: &EventLog, to: Revision) -> Graph {
    if to < snapshot.revision() {
        return replay(log, to);
    }
    let mut graph = snapshot.base_graph();
    incremental_replay(&mut graph, log, to);
    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use crate::model::{Attrs, EdgeLabel, NodeType};
    use crate::value::Value;

    fn seeded_log() -> EventLog {
        let mut log = EventLog::new();
        log.append(Event::NodeAdded {
            node_id: "a".into(),
            node_type: NodeType::Field,
            attrs: Attrs::new(),
        });
        log.append(Event::NodeAdded {
            node_id: "b".into(),
            node_type: NodeType::Field,
            attrs: Attrs::new(),
        });
        log.append(Event::EdgeAdded {
            from: "a".into(),
            to: "b".into(),
            label: EdgeLabel::Uses,
        });
        log.append(Event::AttrUpdated {
            node_id: "a".into(),
            attrs: [("x".to_owned(), Value::from(1.0))].into(),
        });
        log
    }

    fn assert_same_projection(a: &Graph, b: &Graph) {
        assert_eq!(a.revision(), b.revision());
        assert_eq!(a.node_count(), b.node_count());
        for id in a.all_node_ids() {
            assert_eq!(a.get_node(&id), b.get_node(&id));
        }
    }

    #[test]
    fn snapshot_plus_tail_matches_full_replay() {
        let log = seeded_log();
        let snap = Snapshot::from_log(&log, 1);
        let from_snap = replay_from_snapshot(&snap, &log, 3);
        let full = replay(&log, 3);
        assert_same_projection(&from_snap, &full);
    }

    #[test]
    fn earlier_target_falls_back_to_full_replay() {
        let log = seeded_log();
        let snap = Snapshot::from_log(&log, 2);
        let from_snap = replay_from_snapshot(&snap, &log, 1);
        let full = replay(&log, 1);
        assert_same_projection(&from_snap, &full);
    }

    #[test]
    fn target_at_snapshot_revision_is_exact() {
        let log = seeded_log();
        let snap = Snapshot::from_log(&log, 2);
        let from_snap = replay_from_snapshot(&snap, &log, 2);
        let full = replay(&log, 2);
        assert_same_projection(&from_snap, &full);
    }

    #[test]
    fn base_graph_mutation_does_not_leak_into_snapshot() {
        let log = seeded_log();
        let snap = Snapshot::from_log(&log, log.latest_revision());
        let before = snap.base_graph();

        let mut scratch = snap.base_graph();
        scratch.add_node("x".into(), NodeType::Field, Attrs::new());

        assert_same_projection(&before, &snap.base_graph());
    }

    #[test]
    fn snapshot_from_graph_is_isolated() {
        let log = seeded_log();
        let mut g = crate::replay::replay_latest(&log);
        let snap = Snapshot::from_graph(&g);
        g.add_node("c".into(), NodeType::Field, Attrs::new());
        assert!(!snap.base_graph().has_node(&"c".into()));
    }
}
