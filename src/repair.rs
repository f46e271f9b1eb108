//! Rule-based repair suggestions derived from an impact result.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::event::Event;
use crate::graph::Graph;
use crate::impact::{impact_from_event, ImpactResult};
use crate::model::{NodeId, NodeType};

/// How urgently an affected node needs attention. Ordering is by urgency,
/// most severe first, so sorting ascending puts critical items on top.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        };
        f.write_str(name)
    }
}

/// One affected node with a localized message and its evidence chain.
#[derive(Clone, Debug)]
pub struct RepairSuggestion {
    pub node_id: NodeId,
    pub node_type: NodeType,
    pub severity: Severity,
    pub message: String,
    pub evidence: String,
}

/// Ordered suggestions for the nodes an event would affect.
#[derive(Clone, Debug)]
pub struct RepairPlan {
    pub event: Event,
    pub summary: String,
    pub suggestions: Vec<RepairSuggestion>,
}

pub(crate) fn severity_for_type(node_type: NodeType) -> Severity {
    match node_type {
        NodeType::Expression => Severity::Critical,
        NodeType::Field => Severity::High,
        NodeType::Form | NodeType::List => Severity::Medium,
        NodeType::Entity | NodeType::Role | NodeType::Relation | NodeType::Param => Severity::Low,
    }
}

fn message_for_type(node_type: NodeType) -> &'static str {
    match node_type {
        NodeType::Expression => "expression is affected; review the formula",
        NodeType::Field => "field is affected; check its type, constraints, and default",
        NodeType::Form => "form is affected; check display and input consistency",
        NodeType::List => "list is affected; check column definitions and contents",
        NodeType::Role => "role is affected; review access control",
        NodeType::Entity => "entity is affected; review the related structure",
        NodeType::Relation => "relation is affected; review the relationship",
        NodeType::Param => "parameter change has downstream effects; check dependents",
    }
}

pub(crate) fn format_summary(counts: &BTreeMap<Severity, usize>) -> String {
    if counts.is_empty() {
        return "no impacted nodes (excluding seeds)".to_owned();
    }
    let parts: Vec<String> = counts
        .iter()
        .filter(|(_, n)| **n > 0)
        .map(|(severity, n)| format!("{severity}:{n}"))
        .collect();
    format!("repair suggestions generated ({})", parts.join(", "))
}

/// Computes impact for the event and derives a plan from it.
pub fn compute_repair_plan(graph: &Graph, event: &Event, cancel: Option<&AtomicBool>) -> RepairPlan {
    let impact = impact_from_event(graph, event, cancel);
    compute_repair_plan_from_impact(graph, event, &impact, cancel)
}

/// Derives a plan from a precomputed impact result. Seeds are excluded:
/// they are the change itself, not collateral damage.
pub fn compute_repair_plan_from_impact(
    graph: &Graph,
    event: &Event,
    impact: &ImpactResult,
    cancel: Option<&AtomicBool>,
) -> RepairPlan {
    let mut plan = RepairPlan {
        event: event.clone(),
        summary: String::new(),
        suggestions: Vec::new(),
    };
    if impact.cancelled {
        plan.summary = "cancelled".to_owned();
        return plan;
    }

    for node_id in &impact.impacted {
        if cancel.is_some_and(|flag| flag.load(Ordering::SeqCst)) {
            plan.summary = "cancelled".to_owned();
            return plan;
        }
        if impact.seeds.contains(node_id) {
            continue;
        }
        let Some(node_type) = graph.node_type_of(node_id) else {
            continue;
        };
        let explain = impact.explain(node_id);
        let evidence = if explain == "not impacted" {
            String::new()
        } else {
            explain
        };
        plan.suggestions.push(RepairSuggestion {
            node_id: node_id.clone(),
            node_type,
            severity: severity_for_type(node_type),
            message: message_for_type(node_type).to_owned(),
            evidence,
        });
    }

    plan.suggestions
        .sort_by(|a, b| (a.severity, &a.node_id).cmp(&(b.severity, &b.node_id)));

    let mut counts: BTreeMap<Severity, usize> = BTreeMap::new();
    for suggestion in &plan.suggestions {
        *counts.entry(suggestion.severity).or_default() += 1;
    }
    plan.summary = format_summary(&counts);
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventLog;
    use crate::model::{Attrs, EdgeLabel};
    use crate::replay::replay_latest;
    use crate::value::Value;

    fn seeded_graph() -> Graph {
        let mut log = EventLog::new();
        log.append(Event::NodeAdded {
            node_id: "field:a".into(),
            node_type: NodeType::Field,
            attrs: Attrs::new(),
        });
        log.append(Event::NodeAdded {
            node_id: "expr:x".into(),
            node_type: NodeType::Expression,
            attrs: Attrs::new(),
        });
        log.append(Event::NodeAdded {
            node_id: "form:f".into(),
            node_type: NodeType::Form,
            attrs: Attrs::new(),
        });
        log.append(Event::EdgeAdded {
            from: "field:a".into(),
            to: "expr:x".into(),
            label: EdgeLabel::Uses,
        });
        log.append(Event::EdgeAdded {
            from: "expr:x".into(),
            to: "form:f".into(),
            label: EdgeLabel::Uses,
        });
        replay_latest(&log)
    }

    #[test]
    fn suggestions_exclude_seeds_and_sort_by_severity() {
        let graph = seeded_graph();
        let event = Event::AttrUpdated {
            node_id: "field:a".into(),
            attrs: [("t".to_owned(), Value::from("currency"))].into(),
        };
        let plan = compute_repair_plan(&graph, &event, None);

        assert_eq!(plan.suggestions.len(), 2);
        assert_eq!(plan.suggestions[0].node_id, NodeId::from("expr:x"));
        assert_eq!(plan.suggestions[0].severity, Severity::Critical);
        assert_eq!(plan.suggestions[1].severity, Severity::Medium);
        assert!(plan.suggestions[0].evidence.starts_with("impacted via:"));
        assert_eq!(plan.summary, "repair suggestions generated (critical:1, medium:1)");
    }

    #[test]
    fn no_collateral_impact_yields_empty_plan() {
        let graph = seeded_graph();
        let event = Event::AttrUpdated {
            node_id: "form:f".into(),
            attrs: Attrs::new(),
        };
        let plan = compute_repair_plan(&graph, &event, None);
        assert!(plan.suggestions.is_empty());
        assert_eq!(plan.summary, "no impacted nodes (excluding seeds)");
    }
}
