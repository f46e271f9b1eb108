//! Strict event application with exact inverse records.
//!
//! [`apply_event`] is the strict counterpart of permissive replay: every
//! precondition that could make the mutation irreversible is rejected up
//! front, and the returned [`Delta`] captures exactly what changed. This
//! keeps speculative simulation allocation-bounded by the event's footprint
//! instead of requiring a shadow graph.

use std::collections::HashSet;

use crate::error::{GraphError, Result};
use crate::event::{Event, Revision};
use crate::graph::Graph;
use crate::model::{Edge, Node, NodeId};
use crate::value::Value;

/// A single attribute update, recorded with enough context to invert it.
#[derive(Clone, Debug, PartialEq)]
pub struct AttrChange {
    pub node_id: NodeId,
    pub key: String,
    /// Previous value; `None` when the key did not exist.
    pub before: Option<Value>,
    /// New value as carried by the event; null means deletion.
    pub after: Value,
    pub deleted: bool,
}

/// Rollback record for one applied event. Consumed exactly once by
/// [`rollback_delta`].
#[derive(Clone, Debug)]
pub struct Delta {
    pub event: Event,
    pub before_rev: Revision,
    pub added_nodes: Vec<NodeId>,
    /// Full pre-removal node snapshots, adjacency included.
    pub removed_nodes: Vec<Node>,
    pub updated_attrs: Vec<AttrChange>,
    pub added_edges: Vec<Edge>,
    pub removed_edges: Vec<Edge>,
}

impl Delta {
    fn for_event(event: &Event, before_rev: Revision) -> Self {
        Delta {
            event: event.clone(),
            before_rev,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
            updated_attrs: Vec::new(),
            added_edges: Vec::new(),
            removed_edges: Vec::new(),
        }
    }
}

/// Deduplicated union of a node's outgoing and incoming edges.
fn collect_incident_edges(node: &Node) -> Vec<Edge> {
    let mut seen: HashSet<&Edge> = HashSet::new();
    let mut edges = Vec::with_capacity(node.outgoing.len() + node.incoming.len());
    for edge in node.outgoing.iter().chain(node.incoming.iter()) {
        if seen.insert(edge) {
            edges.push(edge.clone());
        }
    }
    edges
}

/// Applies `event` to the graph under strict preconditions and returns the
/// delta needed to undo it. The graph revision is untouched; revisions
/// advance only by replaying appended events.
pub fn apply_event(graph: &mut Graph, event: &Event) -> Result<Delta> {
    let mut delta = Delta::for_event(event, graph.revision());

    match event {
        Event::NodeAdded {
            node_id,
            node_type,
            attrs,
        } => {
            if graph.has_node(node_id) {
                return Err(GraphError::NodeExists(node_id.clone()));
            }
            graph.add_node(node_id.clone(), *node_type, attrs.clone());
            delta.added_nodes.push(node_id.clone());
        }
        Event::NodeRemoved { node_id } => {
            let node = graph
                .get_node(node_id)
                .ok_or_else(|| GraphError::MissingNode(node_id.clone()))?;
            delta.removed_edges = collect_incident_edges(&node);
            delta.removed_nodes.push(node);
            graph.remove_node(node_id);
        }
        Event::AttrUpdated { node_id, attrs } => {
            let node = graph
                .node(node_id)
                .ok_or_else(|| GraphError::MissingNode(node_id.clone()))?;
            for (key, value) in attrs {
                delta.updated_attrs.push(AttrChange {
                    node_id: node_id.clone(),
                    key: key.clone(),
                    before: node.attrs.get(key).cloned(),
                    after: value.clone(),
                    deleted: value.is_null(),
                });
            }
            graph.update_attrs(node_id, attrs);
        }
        Event::EdgeAdded { from, to, label } => {
            if !graph.has_node(from) || !graph.has_node(to) {
                return Err(GraphError::MissingEndpoint {
                    from: from.clone(),
                    to: to.clone(),
                });
            }
            if graph.has_edge(from, to, *label) {
                return Err(GraphError::DuplicateEdge {
                    from: from.clone(),
                    to: to.clone(),
                    label: *label,
                });
            }
            graph.add_edge(from.clone(), to.clone(), *label);
            delta.added_edges.push(Edge {
                from: from.clone(),
                to: to.clone(),
                label: *label,
            });
        }
        Event::EdgeRemoved { from, to, label } => {
            if !graph.has_node(from) || !graph.has_node(to) {
                return Err(GraphError::MissingEndpoint {
                    from: from.clone(),
                    to: to.clone(),
                });
            }
            let matching: Vec<Edge> = graph
                .outgoing_edges(from)
                .into_iter()
                .filter(|e| e.to == *to && e.label == *label)
                .collect();
            if matching.is_empty() {
                return Err(GraphError::MissingEdge {
                    from: from.clone(),
                    to: to.clone(),
                    label: *label,
                });
            }
            graph.remove_edge(from, to, *label);
            delta.removed_edges = matching;
        }
        Event::TransactionMarker { .. } => {}
    }

    Ok(delta)
}

/// Reverses a delta, restoring the exact pre-apply state.
///
/// Restore order: removed nodes, attribute changes, added edges (removed),
/// removed edges (re-added), added nodes (removed). Any failure means the
/// graph no longer matches the delta; it must be treated as corrupted and
/// discarded by the caller.
pub fn rollback_delta(graph: &mut Graph, delta: Delta) -> Result<()> {
    for node in &delta.removed_nodes {
        if graph.has_node(&node.id) {
            return Err(GraphError::RollbackInconsistent(format!(
                "node already exists during rollback: {}",
                node.id
            )));
        }
        graph.add_node(node.id.clone(), node.node_type, node.attrs.clone());
    }

    for change in &delta.updated_attrs {
        let restore = [(
            change.key.clone(),
            change.before.clone().unwrap_or(Value::Null),
        )]
        .into();
        graph.update_attrs(&change.node_id, &restore);
    }

    for edge in &delta.added_edges {
        graph.remove_edge(&edge.from, &edge.to, edge.label);
    }

    for edge in &delta.removed_edges {
        if !graph.has_node(&edge.from) || !graph.has_node(&edge.to) {
            return Err(GraphError::RollbackInconsistent(format!(
                "edge endpoints missing during rollback: {} -> {}",
                edge.from, edge.to
            )));
        }
        graph.add_edge(edge.from.clone(), edge.to.clone(), edge.label);
    }

    for id in &delta.added_nodes {
        if !graph.has_node(id) {
            return Err(GraphError::RollbackInconsistent(format!(
                "node missing during rollback: {id}"
            )));
        }
        graph.remove_node(id);
    }

    Ok(())
}
