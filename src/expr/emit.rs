//! Turning a dependency summary into graph events.

use std::collections::HashSet;

use crate::event::Event;
use crate::expr::analysis::DepSummary;
use crate::model::{EdgeLabel, NodeId};

/// Converts a [`DepSummary`] into deduplicated `EdgeAdded(uses)` events:
/// one edge per dependency into the expression node, then one edge from
/// the expression to its target field. The graph layer uses a single
/// `uses` label; the exact/schema distinction lives only in the summary.
///
/// Returns nothing when the summary has no expression node or no target
/// field to anchor the edges on.
pub fn build_dep_events(summary: &DepSummary) -> Vec<Event> {
    if summary.self_id.is_empty() || summary.target_field.is_empty() {
        return Vec::new();
    }

    let mut seen: HashSet<(NodeId, NodeId)> = HashSet::new();
    let mut events = Vec::with_capacity(summary.exact_deps.len() + summary.schema_deps.len() + 1);
    let mut push = |from: &NodeId, to: &NodeId, events: &mut Vec<Event>| {
        if seen.insert((from.clone(), to.clone())) {
            events.push(Event::EdgeAdded {
                from: from.clone(),
                to: to.clone(),
                label: EdgeLabel::Uses,
            });
        }
    };

    for dep in &summary.exact_deps {
        push(&dep.node_id, &summary.self_id, &mut events);
    }
    for dep in &summary.schema_deps {
        push(&dep.node_id, &summary.self_id, &mut events);
    }
    push(&summary.self_id, &summary.target_field, &mut events);
    events
}
