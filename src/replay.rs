//! Folding log events into a graph projection.
//!
//! Replay is deliberately permissive, unlike the strict apply path in
//! [`crate::delta`]: edge additions with a missing endpoint are dropped and
//! duplicate edge additions are skipped, so that every log prefix replays to
//! a well-formed graph. Both tolerances are logged at `warn` because the
//! strict path would have rejected the same event.

use tracing::{debug, warn};

use crate::event::{Event, EventLog, Revision};
use crate::graph::Graph;

/// Builds a graph by folding events `0..=up_to`, clamping to the log tail.
/// A negative revision yields the empty graph.
pub fn replay(log: &EventLog, up_to: Revision) -> Graph {
    let mut g = Graph::new();
    if up_to < 0 {
        return g;
    }
    let up_to = up_to.min(log.latest_revision());
    for event in log.range(0, up_to + 1) {
        apply_permissive(&mut g, &event);
    }
    g.set_revision(up_to);
    debug!(revision = up_to, nodes = g.node_count(), "replay.completed");
    g
}

/// Builds a graph from the entire log.
pub fn replay_latest(log: &EventLog) -> Graph {
    replay(log, log.latest_revision())
}

/// Applies events `graph.revision + 1 ..= to` in place. No-op unless the
/// graph is behind `to`; `to` is clamped to the log tail.
pub fn incremental_replay(graph: &mut Graph, log: &EventLog, to: Revision) {
    let from = graph.revision();
    if to <= from {
        return;
    }
    let to = to.min(log.latest_revision());
    for event in log.range(from + 1, to + 1) {
        apply_permissive(graph, &event);
    }
    graph.set_revision(to);
}

/// Permissive single-event application used by replay.
fn apply_permissive(graph: &mut Graph, event: &Event) {
    match event {
        Event::NodeAdded {
            node_id,
            node_type,
            attrs,
        } => {
            graph.add_node(node_id.clone(), *node_type, attrs.clone());
        }
        Event::NodeRemoved { node_id } => {
            graph.remove_node(node_id);
        }
        Event::AttrUpdated { node_id, attrs } => {
            graph.update_attrs(node_id, attrs);
        }
        Event::EdgeAdded { from, to, label } => {
            if !graph.add_edge(from.clone(), to.clone(), *label) {
                if graph.has_edge(from, to, *label) {
                    warn!(%from, %to, %label, "replay.duplicate_edge");
                } else {
                    warn!(%from, %to, %label, "replay.dangling_edge_dropped");
                }
            }
        }
        Event::EdgeRemoved { from, to, label } => {
            graph.remove_edge(from, to, *label);
        }
        // Audit boundary only.
        Event::TransactionMarker { .. } => {}
    }
}
