//! Simulation protocol and sandbox isolation.

use std::sync::Arc;

use palimpsest::{
    replay_latest, simulate_event, simulate_tx, Attrs, EdgeLabel, Event, EventLog, Graph, Node,
    NodeType, Sandbox, Snapshot, SnapshotCache, Value,
};

fn node(id: &str, node_type: NodeType) -> Event {
    Event::NodeAdded {
        node_id: id.into(),
        node_type,
        attrs: Attrs::new(),
    }
}

fn edge(from: &str, to: &str, label: EdgeLabel) -> Event {
    Event::EdgeAdded {
        from: from.into(),
        to: to.into(),
        label,
    }
}

fn graph_snapshot(graph: &Graph) -> Vec<Node> {
    let mut ids = graph.all_node_ids();
    ids.sort();
    ids.into_iter()
        .filter_map(|id| graph.get_node(&id))
        .collect()
}

#[test]
fn empty_graph_tx_with_intra_dependencies() {
    let mut graph = Graph::new();
    let events = vec![
        node("a", NodeType::Field),
        node("b", NodeType::Field),
        edge("a", "b", EdgeLabel::Uses),
    ];

    let result = simulate_tx(&mut graph, &events, None);

    assert!(result.applied);
    assert!(result.error.is_none());
    assert_eq!(result.after_rev, result.before_rev + 3);
    assert_eq!(graph.node_count(), 0, "rollback must leave the graph empty");
}

#[test]
fn failed_tx_rolls_back_lifo() {
    let mut log = EventLog::new();
    log.append(node("a", NodeType::Field));
    let mut graph = replay_latest(&log);
    let before = graph_snapshot(&graph);

    // Third event re-adds "a", which the evolving-graph gate rejects.
    let events = vec![
        node("b", NodeType::Field),
        edge("a", "b", EdgeLabel::Uses),
        node("a", NodeType::Field),
    ];
    let result = simulate_tx(&mut graph, &events, None);

    assert!(!result.applied);
    assert!(!result.pre_validate.as_ref().unwrap().valid);
    assert_eq!(before, graph_snapshot(&graph));
}

#[test]
fn simulate_reports_would_be_state() {
    let mut log = EventLog::new();
    log.append(node("field:a", NodeType::Field));
    log.append(node("expr:x", NodeType::Expression));
    log.append(edge("field:a", "expr:x", EdgeLabel::Uses));
    let mut graph = replay_latest(&log);
    let before = graph_snapshot(&graph);

    let result = simulate_event(
        &mut graph,
        &Event::AttrUpdated {
            node_id: "field:a".into(),
            attrs: [("type".to_owned(), Value::from("text"))].into(),
        },
        None,
    );

    assert!(result.applied);
    assert!(result.pre_validate.as_ref().unwrap().valid);
    assert!(result.post_validate.as_ref().unwrap().valid);
    assert!(result
        .post_impact
        .as_ref()
        .unwrap()
        .is_impacted(&"expr:x".into()));
    assert_eq!(before, graph_snapshot(&graph));
}

#[test]
fn sandbox_from_cached_snapshot_never_mutates_shared_state() {
    let mut log = EventLog::new();
    log.append(node("a", NodeType::Field));
    log.append(node("b", NodeType::Field));
    log.append(edge("a", "b", EdgeLabel::Uses));

    let cache = SnapshotCache::new(4);
    cache.put(Arc::new(Snapshot::from_log(&log, log.latest_revision())));
    let snapshot = cache.get(log.latest_revision()).unwrap();
    let before = graph_snapshot(&snapshot.base_graph());

    let sandbox = Sandbox::new(Some(snapshot.clone()), &log, log.latest_revision());
    let tx = sandbox.simulate_tx(
        &[
            node("c", NodeType::Field),
            edge("b", "c", EdgeLabel::Derives),
            Event::NodeRemoved { node_id: "c".into() },
        ],
        None,
    );
    // The last event fails (node in use), so the tx is rejected; either
    // way the shared snapshot must be untouched.
    assert!(!tx.applied);
    assert_eq!(before, graph_snapshot(&snapshot.base_graph()));

    let single = sandbox.simulate_event(
        &Event::AttrUpdated {
            node_id: "a".into(),
            attrs: [("x".to_owned(), Value::from(1.0))].into(),
        },
        None,
    );
    assert!(single.applied);
    assert_eq!(before, graph_snapshot(&snapshot.base_graph()));
}

#[test]
fn rejected_event_reports_reasons_without_applying() {
    let mut graph = Graph::new();
    let result = simulate_event(
        &mut graph,
        &Event::EdgeAdded {
            from: "a".into(),
            to: "b".into(),
            label: EdgeLabel::Uses,
        },
        None,
    );
    assert!(!result.applied);
    assert_eq!(result.after_rev, result.before_rev);
    let gate = result.pre_validate.as_ref().unwrap();
    assert!(!gate.valid);
    assert_eq!(gate.errors.len(), 2, "both endpoints are missing");
    assert!(result.post_validate.is_none());
    assert!(result.post_impact.is_none());
}
