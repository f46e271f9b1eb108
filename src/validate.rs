//! Graph invariants and event preconditions.
//!
//! Validation failures are aggregated into structured results rather than
//! raised as errors. Three granularities: whole-graph referential
//! integrity ([`validate`]), seed-local adjacency checks
//! ([`validate_seeds`]), and the pre-apply gate ([`validate_event`]).
//! [`validate_event_with`] extends the gate with caller-supplied
//! validators.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::event::{Event, Revision};
use crate::graph::Graph;
use crate::model::{Edge, EdgeLabel, NodeId, NodeType};

/// Classification of a single validation finding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// An edge references a node that does not exist.
    DanglingEdge,
    /// NodeAdded targets an id that already exists.
    NodeExists,
    /// The referenced node does not exist.
    MissingNode,
    /// NodeRemoved targets a node that still has incident edges.
    NodeInUse,
    /// An edge event references a missing endpoint.
    MissingEndpoint,
    /// EdgeRemoved targets an edge that is not present.
    MissingEdge,
    /// Direct entity-to-entity use/derivation requires an intervening
    /// Relation node.
    RelationRequired,
    /// Produced by a caller-supplied validator.
    Custom(String),
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationErrorKind::DanglingEdge => f.write_str("dangling_edge"),
            ValidationErrorKind::NodeExists => f.write_str("node_exists"),
            ValidationErrorKind::MissingNode => f.write_str("missing_node"),
            ValidationErrorKind::NodeInUse => f.write_str("node_in_use"),
            ValidationErrorKind::MissingEndpoint => f.write_str("missing_endpoint"),
            ValidationErrorKind::MissingEdge => f.write_str("missing_edge"),
            ValidationErrorKind::RelationRequired => f.write_str("relation_required"),
            ValidationErrorKind::Custom(kind) => f.write_str(kind),
        }
    }
}

/// One constraint violation.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    /// The node the finding is anchored to, when there is one.
    pub node_id: Option<NodeId>,
    pub message: String,
    pub from: Option<NodeId>,
    pub to: Option<NodeId>,
    pub label: Option<EdgeLabel>,
}

impl ValidationError {
    pub fn node(kind: ValidationErrorKind, node_id: NodeId, message: impl Into<String>) -> Self {
        ValidationError {
            kind,
            node_id: Some(node_id),
            message: message.into(),
            from: None,
            to: None,
            label: None,
        }
    }

    pub fn edge(
        kind: ValidationErrorKind,
        anchor: Option<NodeId>,
        edge: &Edge,
        message: impl Into<String>,
    ) -> Self {
        ValidationError {
            kind,
            node_id: anchor,
            message: message.into(),
            from: Some(edge.from.clone()),
            to: Some(edge.to.clone()),
            label: Some(edge.label),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Aggregated validation findings.
#[derive(Clone, Debug)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub revision: Revision,
    pub cancelled: bool,
}

impl ValidationResult {
    pub fn new(revision: Revision) -> Self {
        ValidationResult {
            valid: true,
            errors: Vec::new(),
            revision,
            cancelled: false,
        }
    }

    pub fn push(&mut self, error: ValidationError) {
        self.valid = false;
        self.errors.push(error);
    }

    /// Folds another result into this one. Errors accumulate; a cancelled
    /// part marks the whole result cancelled.
    pub fn merge(&mut self, other: ValidationResult) {
        if !other.valid {
            self.valid = false;
        }
        if other.cancelled {
            self.cancelled = true;
        }
        self.errors.extend(other.errors);
    }
}

/// Caller-supplied event validator, run after the built-in checks.
///
/// Implementations may append findings but can never remove built-in ones.
pub trait EventValidator {
    fn validate(&self, graph: &Graph, event: &Event) -> Vec<ValidationError>;
}

fn is_cancelled(cancel: Option<&AtomicBool>) -> bool {
    cancel.is_some_and(|flag| flag.load(Ordering::SeqCst))
}

fn check_node_adjacency(graph: &Graph, id: &NodeId, result: &mut ValidationResult) {
    let Some(node) = graph.node(id) else {
        return;
    };
    for edge in &node.outgoing {
        if !graph.has_node(&edge.to) {
            result.push(ValidationError::edge(
                ValidationErrorKind::DanglingEdge,
                Some(id.clone()),
                edge,
                "edge references non-existent target node",
            ));
        }
    }
    for edge in &node.incoming {
        if !graph.has_node(&edge.from) {
            result.push(ValidationError::edge(
                ValidationErrorKind::DanglingEdge,
                Some(id.clone()),
                edge,
                "edge references non-existent source node",
            ));
        }
    }
}

/// Whole-graph referential integrity: every outgoing and incoming edge must
/// target an existing node. Polls cancellation once per node.
pub fn validate(graph: &Graph, cancel: Option<&AtomicBool>) -> ValidationResult {
    let mut result = ValidationResult::new(graph.revision());
    for id in graph.all_node_ids() {
        if is_cancelled(cancel) {
            result.cancelled = true;
            return result;
        }
        check_node_adjacency(graph, &id, &mut result);
    }
    result
}

/// The same integrity check restricted to the seed nodes' adjacency.
/// Missing seed nodes are silently skipped, which keeps NodeRemoved
/// scenarios checkable.
pub fn validate_seeds(
    graph: &Graph,
    seeds: &[NodeId],
    cancel: Option<&AtomicBool>,
) -> ValidationResult {
    let mut result = ValidationResult::new(graph.revision());
    let mut checked: HashSet<&NodeId> = HashSet::new();
    for id in seeds {
        if !checked.insert(id) {
            continue;
        }
        if is_cancelled(cancel) {
            result.cancelled = true;
            return result;
        }
        check_node_adjacency(graph, id, &mut result);
    }
    result
}

/// Pre-apply gate: event-local preconditions, merged with the seed-local
/// invariant check for edge and node-removal events.
pub fn validate_event(
    graph: &Graph,
    event: &Event,
    cancel: Option<&AtomicBool>,
) -> ValidationResult {
    let mut result = ValidationResult::new(graph.revision());
    if is_cancelled(cancel) {
        result.cancelled = true;
        return result;
    }

    match event {
        Event::NodeAdded { node_id, .. } => {
            if graph.has_node(node_id) {
                result.push(ValidationError::node(
                    ValidationErrorKind::NodeExists,
                    node_id.clone(),
                    format!("node already exists: {node_id}"),
                ));
            }
        }
        Event::NodeRemoved { node_id } => {
            match graph.node(node_id) {
                None => result.push(ValidationError::node(
                    ValidationErrorKind::MissingNode,
                    node_id.clone(),
                    format!("node does not exist: {node_id}"),
                )),
                Some(node) => {
                    let incident = node.outgoing.len() + node.incoming.len();
                    if incident > 0 {
                        result.push(ValidationError::node(
                            ValidationErrorKind::NodeInUse,
                            node_id.clone(),
                            format!("node has {incident} incident edges: {node_id}"),
                        ));
                    }
                }
            }
            result.merge(validate_seeds(graph, &event.validation_seeds(), cancel));
        }
        Event::AttrUpdated { node_id, .. } => {
            if !graph.has_node(node_id) {
                result.push(ValidationError::node(
                    ValidationErrorKind::MissingNode,
                    node_id.clone(),
                    format!("node does not exist: {node_id}"),
                ));
            }
        }
        Event::EdgeAdded { from, to, label } => {
            let edge = Edge {
                from: from.clone(),
                to: to.clone(),
                label: *label,
            };
            for endpoint in [from, to] {
                if !graph.has_node(endpoint) {
                    result.push(ValidationError::edge(
                        ValidationErrorKind::MissingEndpoint,
                        Some(endpoint.clone()),
                        &edge,
                        format!("edge endpoint does not exist: {endpoint}"),
                    ));
                }
            }
            if result.valid
                && matches!(label, EdgeLabel::Uses | EdgeLabel::Derives)
                && graph.node_type_of(from) == Some(NodeType::Entity)
                && graph.node_type_of(to) == Some(NodeType::Entity)
            {
                result.push(ValidationError::edge(
                    ValidationErrorKind::RelationRequired,
                    None,
                    &edge,
                    "direct entity-to-entity dependency requires a Relation node",
                ));
            }
            result.merge(validate_seeds(graph, &event.validation_seeds(), cancel));
        }
        Event::EdgeRemoved { from, to, label } => {
            let edge = Edge {
                from: from.clone(),
                to: to.clone(),
                label: *label,
            };
            let mut endpoints_ok = true;
            for endpoint in [from, to] {
                if !graph.has_node(endpoint) {
                    endpoints_ok = false;
                    result.push(ValidationError::edge(
                        ValidationErrorKind::MissingEndpoint,
                        Some(endpoint.clone()),
                        &edge,
                        format!("edge endpoint does not exist: {endpoint}"),
                    ));
                }
            }
            if endpoints_ok && !graph.has_edge(from, to, *label) {
                result.push(ValidationError::edge(
                    ValidationErrorKind::MissingEdge,
                    None,
                    &edge,
                    format!("edge not found: {edge}"),
                ));
            }
            result.merge(validate_seeds(graph, &event.validation_seeds(), cancel));
        }
        Event::TransactionMarker { .. } => {}
    }

    result
}

/// Runs the built-in gate, then each custom validator in order, polling
/// cancellation between validators.
pub fn validate_event_with(
    graph: &Graph,
    event: &Event,
    validators: &[&dyn EventValidator],
    cancel: Option<&AtomicBool>,
) -> ValidationResult {
    let mut result = validate_event(graph, event, cancel);
    if result.cancelled {
        return result;
    }
    for validator in validators {
        if is_cancelled(cancel) {
            result.cancelled = true;
            return result;
        }
        for error in validator.validate(graph, event) {
            result.push(error);
        }
    }
    result
}
