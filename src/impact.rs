//! BFS impact analysis with evidence-path reconstruction.
//!
//! Impact(S) is the set of nodes reachable from the seed set S by following
//! outgoing (provider → consumer) edges. BFS guarantees that the recorded
//! parent pointers describe shortest evidence paths measured in edges.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::event::{Event, Revision};
use crate::graph::Graph;
use crate::model::{EdgeLabel, NodeId, NodeType};

/// A shortest provider → consumer path from a seed to an impacted node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvidencePath {
    pub seed: NodeId,
    pub target: NodeId,
    /// Full path including both seed and target.
    pub path: Vec<NodeId>,
}

/// Optional traversal restrictions.
///
/// `edge_labels` restricts which edges BFS follows. `node_types` restricts
/// which nodes are *included* in the impacted set but never prunes
/// traversal, so evidence paths may legitimately pass through excluded
/// nodes; callers must not elide those intermediate nodes.
#[derive(Clone, Debug, Default)]
pub struct ImpactFilter {
    pub edge_labels: Option<HashSet<EdgeLabel>>,
    pub node_types: Option<HashSet<NodeType>>,
}

impl ImpactFilter {
    fn allows_label(&self, label: EdgeLabel) -> bool {
        self.edge_labels
            .as_ref()
            .map_or(true, |labels| labels.contains(&label))
    }

    fn includes_type(&self, node_type: Option<NodeType>) -> bool {
        match &self.node_types {
            None => true,
            Some(types) => node_type.is_some_and(|t| types.contains(&t)),
        }
    }
}

/// Result of one BFS run. Evidence paths are materialized lazily from the
/// recorded parent pointers.
#[derive(Clone, Debug)]
pub struct ImpactResult {
    pub seeds: Vec<NodeId>,
    /// Reachable nodes, seeds included (a seed is "directly modified").
    pub impacted: HashSet<NodeId>,
    pub revision: Revision,
    pub cancelled: bool,
    parent: HashMap<NodeId, NodeId>,
    seed_of: HashMap<NodeId, NodeId>,
}

impl ImpactResult {
    fn new(seeds: Vec<NodeId>, revision: Revision) -> Self {
        ImpactResult {
            seeds,
            impacted: HashSet::new(),
            revision,
            cancelled: false,
            parent: HashMap::new(),
            seed_of: HashMap::new(),
        }
    }

    pub fn is_impacted(&self, id: &NodeId) -> bool {
        self.impacted.contains(id)
    }

    /// Which seed reached `id`, if any.
    pub fn seed_of(&self, id: &NodeId) -> Option<&NodeId> {
        self.seed_of.get(id)
    }

    /// Reconstructs the seed → `id` path by walking parent pointers back to
    /// the seed and reversing. Returns `None` for unreached nodes.
    pub fn path(&self, id: &NodeId) -> Option<Vec<NodeId>> {
        let seed = self.seed_of.get(id)?;
        let mut path = vec![id.clone()];
        let mut current = id;
        while current != seed {
            current = self.parent.get(current)?;
            path.push(current.clone());
        }
        path.reverse();
        Some(path)
    }

    pub fn evidence_path(&self, id: &NodeId) -> Option<EvidencePath> {
        let seed = self.seed_of.get(id)?;
        let path = self.path(id)?;
        Some(EvidencePath {
            seed: seed.clone(),
            target: id.clone(),
            path,
        })
    }

    /// Human-readable explanation of why `id` is impacted.
    pub fn explain(&self, id: &NodeId) -> String {
        match self.seed_of.get(id) {
            None => "not impacted".to_owned(),
            Some(seed) if seed == id => "directly modified (seed)".to_owned(),
            Some(_) => {
                let path = self.path(id).unwrap_or_default();
                let joined = path
                    .iter()
                    .map(NodeId::as_str)
                    .collect::<Vec<_>>()
                    .join(" → ");
                format!("impacted via: {joined}")
            }
        }
    }
}

fn is_cancelled(cancel: Option<&AtomicBool>) -> bool {
    cancel.is_some_and(|flag| flag.load(Ordering::SeqCst))
}

/// BFS reachability from `seeds` over provider → consumer edges.
///
/// The cancellation flag is polled between dequeues; on cancellation the
/// partial result is returned with `cancelled = true`. Neighbour order
/// follows stored outgoing-edge order, so results are deterministic for a
/// deterministic log.
pub fn compute_impact(
    graph: &Graph,
    seeds: &[NodeId],
    cancel: Option<&AtomicBool>,
) -> ImpactResult {
    compute_impact_filtered(graph, seeds, &ImpactFilter::default(), cancel)
}

/// [`compute_impact`] with traversal and inclusion restrictions.
pub fn compute_impact_filtered(
    graph: &Graph,
    seeds: &[NodeId],
    filter: &ImpactFilter,
    cancel: Option<&AtomicBool>,
) -> ImpactResult {
    let mut result = ImpactResult::new(seeds.to_vec(), graph.revision());
    if seeds.is_empty() {
        return result;
    }

    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut queue: VecDeque<NodeId> = VecDeque::with_capacity(seeds.len());

    for seed in seeds {
        if !graph.has_node(seed) || !visited.insert(seed.clone()) {
            continue;
        }
        result.seed_of.insert(seed.clone(), seed.clone());
        if filter.includes_type(graph.node_type_of(seed)) {
            result.impacted.insert(seed.clone());
        }
        queue.push_back(seed.clone());
    }

    while let Some(current) = queue.pop_front() {
        if is_cancelled(cancel) {
            result.cancelled = true;
            return result;
        }

        let Some(node) = graph.node(&current) else {
            continue;
        };
        let origin = result.seed_of[&current].clone();
        for edge in &node.outgoing {
            if !filter.allows_label(edge.label) {
                continue;
            }
            let next = &edge.to;
            if !visited.insert(next.clone()) {
                continue;
            }
            result.parent.insert(next.clone(), current.clone());
            result.seed_of.insert(next.clone(), origin.clone());
            if filter.includes_type(graph.node_type_of(next)) {
                result.impacted.insert(next.clone());
            }
            queue.push_back(next.clone());
        }
    }

    result
}

/// Impact of a single event, seeded per the event's seed rules.
pub fn impact_from_event(graph: &Graph, event: &Event, cancel: Option<&AtomicBool>) -> ImpactResult {
    compute_impact(graph, &event.impact_seeds(), cancel)
}

pub fn impact_from_event_filtered(
    graph: &Graph,
    event: &Event,
    filter: &ImpactFilter,
    cancel: Option<&AtomicBool>,
) -> ImpactResult {
    compute_impact_filtered(graph, &event.impact_seeds(), filter, cancel)
}

/// Combined impact of a batch: one BFS over the union of all seed sets,
/// deduplicated in first-seen order.
pub fn impact_from_events(
    graph: &Graph,
    events: &[Event],
    cancel: Option<&AtomicBool>,
) -> ImpactResult {
    compute_impact(graph, &union_seeds(events), cancel)
}

pub fn impact_from_events_filtered(
    graph: &Graph,
    events: &[Event],
    filter: &ImpactFilter,
    cancel: Option<&AtomicBool>,
) -> ImpactResult {
    compute_impact_filtered(graph, &union_seeds(events), filter, cancel)
}

fn union_seeds(events: &[Event]) -> Vec<NodeId> {
    let mut seen = HashSet::new();
    let mut seeds = Vec::new();
    for event in events {
        for seed in event.impact_seeds() {
            if seen.insert(seed.clone()) {
                seeds.push(seed);
            }
        }
    }
    seeds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventLog;
    use crate::model::Attrs;
    use crate::replay::replay_latest;
    use std::sync::atomic::AtomicBool;

    fn chain_graph(ids: &[&str]) -> Graph {
        let mut log = EventLog::new();
        for id in ids {
            log.append(Event::NodeAdded {
                node_id: (*id).into(),
                node_type: NodeType::Field,
                attrs: Attrs::new(),
            });
        }
        for pair in ids.windows(2) {
            log.append(Event::EdgeAdded {
                from: pair[0].into(),
                to: pair[1].into(),
                label: EdgeLabel::Uses,
            });
        }
        replay_latest(&log)
    }

    #[test]
    fn seeds_are_impacted_and_upstream_is_not() {
        let g = chain_graph(&["a", "b", "c"]);
        let result = compute_impact(&g, &["b".into()], None);
        assert!(result.is_impacted(&"b".into()));
        assert!(result.is_impacted(&"c".into()));
        assert!(!result.is_impacted(&"a".into()));
        assert_eq!(result.explain(&"b".into()), "directly modified (seed)");
        assert_eq!(result.explain(&"a".into()), "not impacted");
    }

    #[test]
    fn path_is_lazily_reconstructed() {
        let g = chain_graph(&["a", "b", "c", "d"]);
        let result = compute_impact(&g, &["a".into()], None);
        let path = result.path(&"d".into()).unwrap();
        let expected: Vec<NodeId> = ["a", "b", "c", "d"].iter().map(|s| (*s).into()).collect();
        assert_eq!(path, expected);
        assert_eq!(
            result.explain(&"c".into()),
            "impacted via: a → b → c"
        );
    }

    #[test]
    fn missing_seed_nodes_are_skipped() {
        let g = chain_graph(&["a", "b"]);
        let result = compute_impact(&g, &["ghost".into(), "a".into()], None);
        assert!(!result.is_impacted(&"ghost".into()));
        assert!(result.is_impacted(&"a".into()));
        assert!(result.path(&"ghost".into()).is_none());
    }

    #[test]
    fn label_filter_restricts_traversal() {
        let mut log = EventLog::new();
        for id in ["a", "b", "c"] {
            log.append(Event::NodeAdded {
                node_id: id.into(),
                node_type: NodeType::Field,
                attrs: Attrs::new(),
            });
        }
        log.append(Event::EdgeAdded {
            from: "a".into(),
            to: "b".into(),
            label: EdgeLabel::Uses,
        });
        log.append(Event::EdgeAdded {
            from: "a".into(),
            to: "c".into(),
            label: EdgeLabel::Controls,
        });
        let g = replay_latest(&log);

        let filter = ImpactFilter {
            edge_labels: Some([EdgeLabel::Uses].into()),
            node_types: None,
        };
        let result = compute_impact_filtered(&g, &["a".into()], &filter, None);
        assert!(result.is_impacted(&"b".into()));
        assert!(!result.is_impacted(&"c".into()));
    }

    #[test]
    fn type_filter_restricts_inclusion_but_not_traversal() {
        let mut log = EventLog::new();
        log.append(Event::NodeAdded {
            node_id: "f".into(),
            node_type: NodeType::Field,
            attrs: Attrs::new(),
        });
        log.append(Event::NodeAdded {
            node_id: "form".into(),
            node_type: NodeType::Form,
            attrs: Attrs::new(),
        });
        log.append(Event::NodeAdded {
            node_id: "x".into(),
            node_type: NodeType::Expression,
            attrs: Attrs::new(),
        });
        log.append(Event::EdgeAdded {
            from: "f".into(),
            to: "form".into(),
            label: EdgeLabel::Uses,
        });
        log.append(Event::EdgeAdded {
            from: "form".into(),
            to: "x".into(),
            label: EdgeLabel::Uses,
        });
        let g = replay_latest(&log);

        let filter = ImpactFilter {
            edge_labels: None,
            node_types: Some([NodeType::Field, NodeType::Expression].into()),
        };
        let result = compute_impact_filtered(&g, &["f".into()], &filter, None);
        // "form" is excluded from the impacted set but still traversed,
        // and stays on the evidence path to "x".
        assert!(!result.is_impacted(&"form".into()));
        assert!(result.is_impacted(&"x".into()));
        let path = result.path(&"x".into()).unwrap();
        let expected: Vec<NodeId> = ["f", "form", "x"].iter().map(|s| (*s).into()).collect();
        assert_eq!(path, expected);
    }

    #[test]
    fn cancellation_returns_partial_result() {
        let g = chain_graph(&["a", "b", "c"]);
        let cancel = AtomicBool::new(true);
        let result = compute_impact(&g, &["a".into()], Some(&cancel));
        assert!(result.cancelled);
    }

    #[test]
    fn batch_seeds_union_in_first_seen_order() {
        let events = vec![
            Event::AttrUpdated {
                node_id: "a".into(),
                attrs: Attrs::new(),
            },
            Event::EdgeAdded {
                from: "a".into(),
                to: "b".into(),
                label: EdgeLabel::Uses,
            },
            Event::AttrUpdated {
                node_id: "a".into(),
                attrs: Attrs::new(),
            },
        ];
        let seeds = union_seeds(&events);
        let expected: Vec<NodeId> = vec!["a".into(), "b".into()];
        assert_eq!(seeds, expected);
    }
}
