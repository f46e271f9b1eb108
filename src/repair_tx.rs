//! Repair plans with concrete event proposals, including cascade deletes.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::event::Event;
use crate::graph::Graph;
use crate::impact::{impact_from_event, ImpactResult};
use crate::model::{Attrs, Edge, EdgeLabel, NodeId, NodeType};
use crate::repair::{format_summary, severity_for_type, Severity};
use crate::value::Value;

/// How safely a proposed event can be applied without a human in the loop.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum AutoLevel {
    NeedsReview,
    AutoFixable,
    ManualOnly,
}

impl fmt::Display for AutoLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AutoLevel::NeedsReview => "needs-review",
            AutoLevel::AutoFixable => "auto-fixable",
            AutoLevel::ManualOnly => "manual-only",
        };
        f.write_str(name)
    }
}

/// A suggested event. `applyable = false` marks a placeholder hint that
/// needs human interpretation before it could be appended.
#[derive(Clone, Debug)]
pub struct ProposedEvent {
    pub event: Event,
    pub note: String,
    pub applyable: bool,
    pub auto_level: AutoLevel,
}

/// A concrete suggestion for one affected node.
#[derive(Clone, Debug)]
pub struct RepairAction {
    pub node_id: NodeId,
    pub node_type: NodeType,
    pub severity: Severity,
    pub title: String,
    pub detail: String,
    pub evidence: String,
    pub proposals: Vec<ProposedEvent>,
}

/// Plan with concrete (possibly non-applyable) proposals.
#[derive(Clone, Debug)]
pub struct RepairPlanTx {
    pub event: Event,
    pub summary: String,
    pub actions: Vec<RepairAction>,
}

/// Computes impact and derives the transactional plan from it.
pub fn compute_repair_plan_tx(
    graph: &Graph,
    event: &Event,
    cancel: Option<&AtomicBool>,
) -> RepairPlanTx {
    let impact = impact_from_event(graph, event, cancel);
    compute_repair_plan_tx_from_impact(graph, event, &impact, cancel)
}

/// Derives a transactional plan from a precomputed impact.
///
/// NodeRemoved events with impact get a cascade-delete action instead of
/// per-node review hints: remove every incident edge, then the node.
pub fn compute_repair_plan_tx_from_impact(
    graph: &Graph,
    event: &Event,
    impact: &ImpactResult,
    cancel: Option<&AtomicBool>,
) -> RepairPlanTx {
    let mut plan = RepairPlanTx {
        event: event.clone(),
        summary: String::new(),
        actions: Vec::new(),
    };
    if impact.cancelled {
        plan.summary = "cancelled".to_owned();
        return plan;
    }

    if let Event::NodeRemoved { node_id } = event {
        if impact.impacted.is_empty() {
            plan.summary = "no impacted nodes (excluding seeds)".to_owned();
            return plan;
        }
        if !impact.is_impacted(node_id) {
            return plan;
        }
        if let Some(action) = propose_cascade_delete(graph, node_id) {
            plan.summary = summary_of(&[&action]);
            plan.actions = vec![action];
            return plan;
        }
    }

    let mut actions = Vec::new();
    for node_id in &impact.impacted {
        if cancel.is_some_and(|flag| flag.load(Ordering::SeqCst)) {
            plan.summary = "cancelled".to_owned();
            plan.actions = Vec::new();
            return plan;
        }
        if impact.seeds.contains(node_id) {
            continue;
        }
        let Some(node_type) = graph.node_type_of(node_id) else {
            continue;
        };
        let (title, detail, proposals) = propose_for_type(node_id, node_type);
        let explain = impact.explain(node_id);
        let evidence = if explain == "not impacted" {
            String::new()
        } else {
            explain
        };
        actions.push(RepairAction {
            node_id: node_id.clone(),
            node_type,
            severity: severity_for_type(node_type),
            title,
            detail,
            evidence,
            proposals,
        });
    }

    actions.sort_by(|a, b| (a.severity, &a.node_id).cmp(&(b.severity, &b.node_id)));
    plan.summary = summary_of(&actions.iter().collect::<Vec<_>>());
    plan.actions = actions;
    plan
}

fn summary_of(actions: &[&RepairAction]) -> String {
    let mut counts: BTreeMap<Severity, usize> = BTreeMap::new();
    for action in actions {
        *counts.entry(action.severity).or_default() += 1;
    }
    format_summary(&counts)
}

/// Builds the cascade action for a node that still has incident edges:
/// every referencing edge removed first (sorted for determinism), then the
/// node itself. The final removal always needs review.
fn propose_cascade_delete(graph: &Graph, node_id: &NodeId) -> Option<RepairAction> {
    if !graph.has_node(node_id) {
        return None;
    }
    let mut edges = graph.incoming_edges(node_id);
    edges.extend(graph.outgoing_edges(node_id));
    if edges.is_empty() {
        return None;
    }
    edges.sort();
    edges.dedup();

    let mut proposals: Vec<ProposedEvent> = edges
        .iter()
        .map(|edge| ProposedEvent {
            event: Event::EdgeRemoved {
                from: edge.from.clone(),
                to: edge.to.clone(),
                label: edge.label,
            },
            note: "remove the referencing edge".to_owned(),
            applyable: true,
            auto_level: auto_level_for_edge(graph, edge),
        })
        .collect();
    proposals.push(ProposedEvent {
        event: Event::NodeRemoved {
            node_id: node_id.clone(),
        },
        note: "delete once dependencies are cleared".to_owned(),
        applyable: true,
        auto_level: AutoLevel::NeedsReview,
    });

    let node_type = graph.node_type_of(node_id).unwrap_or(NodeType::Field);
    Some(RepairAction {
        node_id: node_id.clone(),
        node_type,
        severity: Severity::Critical,
        title: "cascade delete".to_owned(),
        detail: "remove referencing edges first, then delete the target node".to_owned(),
        evidence: String::new(),
        proposals,
    })
}

/// Conservative defaults: control and constraint edges always need review,
/// as do edges into expressions; only presentation surfaces (forms, lists)
/// are safe to auto-fix.
fn auto_level_for_edge(graph: &Graph, edge: &Edge) -> AutoLevel {
    if matches!(edge.label, EdgeLabel::Controls | EdgeLabel::Constrains) {
        return AutoLevel::NeedsReview;
    }
    match graph.node_type_of(&edge.to) {
        Some(NodeType::Form | NodeType::List) => AutoLevel::AutoFixable,
        _ => AutoLevel::NeedsReview,
    }
}

fn hint(node_id: &NodeId, hint: &str, note: &str, auto_level: AutoLevel) -> Vec<ProposedEvent> {
    let attrs: Attrs = [("repair_hint".to_owned(), Value::from(hint))].into();
    vec![ProposedEvent {
        event: Event::AttrUpdated {
            node_id: node_id.clone(),
            attrs,
        },
        note: note.to_owned(),
        applyable: false,
        auto_level,
    }]
}

fn propose_for_type(node_id: &NodeId, node_type: NodeType) -> (String, String, Vec<ProposedEvent>) {
    let (title, detail, hint_key, note, auto_level) = match node_type {
        NodeType::Expression => (
            "update the expression",
            "the formula is affected and needs rework",
            "update formula",
            "formula needs an update",
            AutoLevel::ManualOnly,
        ),
        NodeType::Field => (
            "review the field",
            "check its type, constraints, and default",
            "review field",
            "affected field needs review",
            AutoLevel::NeedsReview,
        ),
        NodeType::Form => (
            "review the form",
            "check display and input consistency",
            "review form",
            "form consistency check",
            AutoLevel::NeedsReview,
        ),
        NodeType::List => (
            "review the list",
            "check column definitions and contents",
            "review list",
            "list consistency check",
            AutoLevel::NeedsReview,
        ),
        NodeType::Role => (
            "review the role",
            "check access control",
            "review role",
            "access rules need review",
            AutoLevel::NeedsReview,
        ),
        NodeType::Entity => (
            "review the entity",
            "check structural consistency of related elements",
            "review entity",
            "structure needs review",
            AutoLevel::NeedsReview,
        ),
        NodeType::Relation => (
            "review the relation",
            "check relationship consistency",
            "review relation",
            "relationship needs review",
            AutoLevel::NeedsReview,
        ),
        NodeType::Param => (
            "review the parameter",
            "check consistency with dependents",
            "review param",
            "parameter needs review",
            AutoLevel::NeedsReview,
        ),
    };
    (
        title.to_owned(),
        detail.to_owned(),
        hint(node_id, hint_key, note, auto_level),
    )
}
