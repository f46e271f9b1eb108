//! In-memory multigraph projection of an event-log prefix.
//!
//! A `Graph` serves any number of concurrent readers through `&self`
//! methods; the single-writer contract is enforced by Rust ownership, since
//! every mutation primitive takes `&mut self`. Mutation primitives are
//! crate-private and driven only by replay ([`crate::replay`]) and the
//! strict apply path ([`crate::delta`]).
//!
//! The mirrored-adjacency invariant (each edge present in its provider's
//! `outgoing` and its consumer's `incoming`) holds between mutating
//! operations, not necessarily in the middle of one.

use std::collections::HashMap;

use crate::event::{Revision, EMPTY_REVISION};
use crate::model::{Attrs, Edge, EdgeLabel, Node, NodeId, NodeType};

/// Configuration state at a given revision.
#[derive(Clone, Debug)]
pub struct Graph {
    nodes: HashMap<NodeId, Node>,
    revision: Revision,
}

impl Default for Graph {
    fn default() -> Self {
        Graph::new()
    }
}

impl Graph {
    /// Empty graph at revision −1.
    pub fn new() -> Self {
        Graph {
            nodes: HashMap::new(),
            revision: EMPTY_REVISION,
        }
    }

    /// The log offset this graph was last replayed to.
    pub fn revision(&self) -> Revision {
        self.revision
    }

    pub fn has_node(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// All node ids, in no particular order.
    pub fn all_node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().cloned().collect()
    }

    pub fn node_type_of(&self, id: &NodeId) -> Option<NodeType> {
        self.nodes.get(id).map(|n| n.node_type)
    }

    /// Returns a defensive deep copy of the node, adjacency included.
    pub fn get_node(&self, id: &NodeId) -> Option<Node> {
        self.nodes.get(id).cloned()
    }

    pub fn outgoing_edges(&self, id: &NodeId) -> Vec<Edge> {
        self.nodes
            .get(id)
            .map(|n| n.outgoing.clone())
            .unwrap_or_default()
    }

    pub fn incoming_edges(&self, id: &NodeId) -> Vec<Edge> {
        self.nodes
            .get(id)
            .map(|n| n.incoming.clone())
            .unwrap_or_default()
    }

    /// Consumers of `id`: targets of its outgoing edges, in insertion order.
    pub fn successors(&self, id: &NodeId) -> Vec<NodeId> {
        self.nodes
            .get(id)
            .map(|n| n.outgoing.iter().map(|e| e.to.clone()).collect())
            .unwrap_or_default()
    }

    /// Providers `id` depends on: sources of its incoming edges.
    pub fn predecessors(&self, id: &NodeId) -> Vec<NodeId> {
        self.nodes
            .get(id)
            .map(|n| n.incoming.iter().map(|e| e.from.clone()).collect())
            .unwrap_or_default()
    }

    /// Borrowed node access for the analysis passes in this crate.
    pub(crate) fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    // --- Mutation primitives, driven by replay and apply only ---

    /// Inserts or replaces a node with empty adjacency. Null attribute
    /// values are dropped on entry: a null only ever means deletion, so a
    /// stored attribute is never null.
    pub(crate) fn add_node(&mut self, id: NodeId, node_type: NodeType, attrs: Attrs) {
        let attrs = attrs.into_iter().filter(|(_, v)| !v.is_null()).collect();
        let node = Node::new(id.clone(), node_type, attrs);
        self.nodes.insert(id, node);
    }

    /// Removes a node and rewrites every neighbour's adjacency to drop the
    /// incident edges. No-op when the node is absent.
    pub(crate) fn remove_node(&mut self, id: &NodeId) {
        let Some(node) = self.nodes.remove(id) else {
            return;
        };
        for edge in &node.outgoing {
            if edge.to == *id {
                continue;
            }
            if let Some(target) = self.nodes.get_mut(&edge.to) {
                target.incoming.retain(|e| e.from != *id);
            }
        }
        for edge in &node.incoming {
            if edge.from == *id {
                continue;
            }
            if let Some(source) = self.nodes.get_mut(&edge.from) {
                source.outgoing.retain(|e| e.to != *id);
            }
        }
    }

    /// Merges `attrs` into the node, deleting keys whose value is null.
    /// Whole-key replace: nested objects and arrays are never merged.
    /// No-op when the node is absent.
    pub(crate) fn update_attrs(&mut self, id: &NodeId, attrs: &Attrs) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        for (key, value) in attrs {
            if value.is_null() {
                node.attrs.remove(key);
            } else {
                node.attrs.insert(key.clone(), value.clone());
            }
        }
    }

    pub(crate) fn has_edge(&self, from: &NodeId, to: &NodeId, label: EdgeLabel) -> bool {
        self.nodes
            .get(from)
            .is_some_and(|n| n.outgoing.iter().any(|e| e.to == *to && e.label == label))
    }

    /// Appends the edge to both endpoints' adjacency. Returns `false`
    /// without mutating when either endpoint is absent or an identical edge
    /// already exists; this tolerance keeps partial-prefix replays valid.
    pub(crate) fn add_edge(&mut self, from: NodeId, to: NodeId, label: EdgeLabel) -> bool {
        if !self.nodes.contains_key(&from) || !self.nodes.contains_key(&to) {
            return false;
        }
        if self.has_edge(&from, &to, label) {
            return false;
        }
        let edge = Edge {
            from: from.clone(),
            to: to.clone(),
            label,
        };
        if from == to {
            if let Some(node) = self.nodes.get_mut(&from) {
                node.outgoing.push(edge.clone());
                node.incoming.push(edge);
            }
            return true;
        }
        if let Some(source) = self.nodes.get_mut(&from) {
            source.outgoing.push(edge.clone());
        }
        if let Some(target) = self.nodes.get_mut(&to) {
            target.incoming.push(edge);
        }
        true
    }

    /// Removes every edge matching `(from, to, label)` from both adjacency
    /// lists. Tolerates absent endpoints.
    pub(crate) fn remove_edge(&mut self, from: &NodeId, to: &NodeId, label: EdgeLabel) {
        if let Some(source) = self.nodes.get_mut(from) {
            source.outgoing.retain(|e| !(e.to == *to && e.label == label));
        }
        if let Some(target) = self.nodes.get_mut(to) {
            target
                .incoming
                .retain(|e| !(e.from == *from && e.label == label));
        }
    }

    pub(crate) fn set_revision(&mut self, revision: Revision) {
        self.revision = revision;
    }
}
