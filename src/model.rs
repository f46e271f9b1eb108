//! Core graph element types shared across the engine.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Opaque node identifier, unique within a graph.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        NodeId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        NodeId(value.to_owned())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        NodeId(value)
    }
}

/// Kind of configuration element a node represents.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum NodeType {
    Entity,
    Field,
    Form,
    List,
    Expression,
    Role,
    Relation,
    Param,
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeType::Entity => "Entity",
            NodeType::Field => "Field",
            NodeType::Form => "Form",
            NodeType::List => "List",
            NodeType::Expression => "Expression",
            NodeType::Role => "Role",
            NodeType::Relation => "Relation",
            NodeType::Param => "Param",
        };
        f.write_str(name)
    }
}

/// Dependency label on a directed edge, oriented provider → consumer.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeLabel {
    /// Data dependency.
    Uses,
    /// Structural inheritance.
    Derives,
    /// Behavioral control.
    Controls,
    /// Validation constraint.
    Constrains,
}

impl fmt::Display for EdgeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EdgeLabel::Uses => "uses",
            EdgeLabel::Derives => "derives",
            EdgeLabel::Controls => "controls",
            EdgeLabel::Constrains => "constrains",
        };
        f.write_str(name)
    }
}

/// Node attributes. Updating a key to [`Value::Null`] deletes it; updates
/// replace whole keys, nested values are never merged.
pub type Attrs = BTreeMap<String, Value>;

/// Labeled directed edge. Parallel edges with an identical
/// `(from, to, label)` triple are rejected at the apply boundary, so the
/// projection stores at most one.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub label: EdgeLabel,
}

impl Edge {
    pub fn new(from: impl Into<NodeId>, to: impl Into<NodeId>, label: EdgeLabel) -> Self {
        Edge {
            from: from.into(),
            to: to.into(),
            label,
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} ({})", self.from, self.to, self.label)
    }
}

/// A configuration element and its adjacency.
///
/// `outgoing` holds edges where this node is the provider, `incoming` where
/// it is the consumer. Between mutations, every edge in one node's list is
/// mirrored in the other endpoint's opposite list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub node_type: NodeType,
    pub attrs: Attrs,
    pub outgoing: Vec<Edge>,
    pub incoming: Vec<Edge>,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, node_type: NodeType, attrs: Attrs) -> Self {
        Node {
            id: id.into(),
            node_type,
            attrs,
            outgoing: Vec::new(),
            incoming: Vec::new(),
        }
    }
}
