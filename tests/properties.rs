//! Property-based tests over generated event sequences.

use std::collections::BTreeMap;

use palimpsest::{
    apply_event, replay, replay_from_snapshot, replay_latest, rollback_delta, validate_event,
    Attrs, Edge, EdgeLabel, Event, EventLog, Graph, GraphError, NodeType, Snapshot, Value,
};
use proptest::prelude::*;

const IDS: &[&str] = &["n0", "n1", "n2", "n3", "n4", "n5"];

fn arb_node_type() -> impl Strategy<Value = NodeType> {
    prop_oneof![
        Just(NodeType::Entity),
        Just(NodeType::Field),
        Just(NodeType::Form),
        Just(NodeType::List),
        Just(NodeType::Expression),
        Just(NodeType::Role),
        Just(NodeType::Relation),
        Just(NodeType::Param),
    ]
}

fn arb_label() -> impl Strategy<Value = EdgeLabel> {
    prop_oneof![
        Just(EdgeLabel::Uses),
        Just(EdgeLabel::Derives),
        Just(EdgeLabel::Controls),
        Just(EdgeLabel::Constrains),
    ]
}

fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-1000i32..1000).prop_map(|n| Value::Number(n as f64)),
        "[a-z]{1,6}".prop_map(Value::String),
    ]
}

fn arb_attrs() -> impl Strategy<Value = Attrs> {
    prop::collection::btree_map("[a-d]", arb_value(), 0..3)
}

fn arb_id() -> impl Strategy<Value = &'static str> {
    (0..IDS.len()).prop_map(|i| IDS[i])
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        (arb_id(), arb_node_type(), arb_attrs()).prop_map(|(id, node_type, attrs)| {
            Event::NodeAdded {
                node_id: id.into(),
                node_type,
                attrs,
            }
        }),
        arb_id().prop_map(|id| Event::NodeRemoved { node_id: id.into() }),
        (arb_id(), arb_attrs()).prop_map(|(id, attrs)| Event::AttrUpdated {
            node_id: id.into(),
            attrs,
        }),
        (arb_id(), arb_id(), arb_label()).prop_map(|(from, to, label)| Event::EdgeAdded {
            from: from.into(),
            to: to.into(),
            label,
        }),
        (arb_id(), arb_id(), arb_label()).prop_map(|(from, to, label)| Event::EdgeRemoved {
            from: from.into(),
            to: to.into(),
            label,
        }),
    ]
}

/// Canonical projection: per node, attrs plus sorted edge multisets.
fn canonical(graph: &Graph) -> BTreeMap<String, (Attrs, Vec<Edge>, Vec<Edge>)> {
    let mut out = BTreeMap::new();
    for id in graph.all_node_ids() {
        let node = graph.get_node(&id).unwrap();
        let mut outgoing = node.outgoing.clone();
        let mut incoming = node.incoming.clone();
        outgoing.sort();
        incoming.sort();
        out.insert(id.to_string(), (node.attrs, outgoing, incoming));
    }
    out
}

fn log_from(events: &[Event]) -> EventLog {
    let mut log = EventLog::new();
    for event in events {
        log.append(event.clone());
    }
    log
}

proptest! {
    /// Replaying to r matches snapshot-at-k plus tail replay for any k <= r.
    #[test]
    fn replay_determinism(events in prop::collection::vec(arb_event(), 1..40), split in 0usize..40) {
        let log = log_from(&events);
        let r = log.latest_revision();
        let k = (split as i64).min(r);

        let full = replay(&log, r);
        let snap = Snapshot::from_log(&log, k);
        let resumed = replay_from_snapshot(&snap, &log, r);

        prop_assert_eq!(full.revision(), resumed.revision());
        prop_assert_eq!(canonical(&full), canonical(&resumed));
    }

    /// A successful apply followed by its rollback restores the graph.
    #[test]
    fn apply_rollback_is_identity(
        base in prop::collection::vec(arb_event(), 0..30),
        event in arb_event(),
    ) {
        let log = log_from(&base);
        let mut graph = replay_latest(&log);
        let before = canonical(&graph);

        match apply_event(&mut graph, &event) {
            Ok(delta) => {
                rollback_delta(&mut graph, delta).expect("rollback of a fresh delta");
                prop_assert_eq!(before, canonical(&graph));
            }
            Err(_) => {
                // A rejected apply must leave the graph untouched.
                prop_assert_eq!(before, canonical(&graph));
            }
        }
    }

    /// The validation gate predicts apply success, except that apply alone
    /// rejects parallel edges.
    #[test]
    fn validation_gates_apply(
        base in prop::collection::vec(arb_event(), 0..30),
        event in arb_event(),
    ) {
        let log = log_from(&base);
        let mut graph = replay_latest(&log);

        let gate = validate_event(&graph, &event, None);
        if gate.valid {
            match apply_event(&mut graph, &event) {
                Ok(_) => {}
                Err(GraphError::DuplicateEdge { .. }) => {}
                Err(other) => prop_assert!(false, "gate passed but apply failed: {other}"),
            }
        }
    }
}
