//! Formula compiler feeding the dependency graph: parse → analyze →
//! emit events → replay → impact.

use std::collections::HashMap;

use palimpsest::expr::{analyze, build_dep_events, parse, Resolver};
use palimpsest::{
    impact_from_event, replay_latest, Attrs, Event, EventLog, NodeId, NodeType, Value,
};

struct CatalogResolver {
    refs: HashMap<String, NodeId>,
    fields: HashMap<String, NodeId>,
}

impl Resolver for CatalogResolver {
    fn resolve_ref(&self, namespace: &str, path: &[String]) -> Option<NodeId> {
        self.refs.get(&format!("{namespace}:{}", path.join("."))).cloned()
    }

    fn resolve_entity_field(&self, entity: &NodeId, column: &str) -> Option<NodeId> {
        self.fields.get(&format!("{entity}.{column}")).cloned()
    }
}

fn catalog() -> CatalogResolver {
    let mut refs = HashMap::new();
    for id in [
        "entity:products",
        "field:order.product_id",
        "field:order.quantity",
    ] {
        refs.insert(id.to_owned(), NodeId::from(id));
    }
    let mut fields = HashMap::new();
    fields.insert(
        "entity:products.unit_price".to_owned(),
        NodeId::from("field:products.unit_price"),
    );
    CatalogResolver { refs, fields }
}

#[test]
fn lookup_formula_wires_the_dependency_graph() {
    let source =
        r#"LOOKUP($entity:products, $field:order.product_id, "unit_price") * $field:order.quantity"#;
    let (expr, diags) = parse(source);
    assert!(diags.is_empty(), "{diags:?}");

    let summary = analyze(
        &expr.unwrap(),
        &catalog(),
        &"expr:line_total".into(),
        &"field:order.line_total".into(),
    );
    assert!(summary.diagnostics.is_empty(), "{:?}", summary.diagnostics);
    assert!(summary.schema_deps.is_empty());

    let dep_events = build_dep_events(&summary);
    // 4 deps into the expression plus the expression -> target edge.
    assert_eq!(dep_events.len(), 5);

    // Materialize the catalog nodes plus emitted edges, then ask what a
    // price change touches.
    let mut log = EventLog::new();
    for (id, node_type) in [
        ("entity:products", NodeType::Entity),
        ("field:order.product_id", NodeType::Field),
        ("field:order.quantity", NodeType::Field),
        ("field:products.unit_price", NodeType::Field),
        ("expr:line_total", NodeType::Expression),
        ("field:order.line_total", NodeType::Field),
    ] {
        log.append(Event::NodeAdded {
            node_id: id.into(),
            node_type,
            attrs: Attrs::new(),
        });
    }
    for event in dep_events {
        log.append(event);
    }
    let graph = replay_latest(&log);

    let price_change = Event::AttrUpdated {
        node_id: "field:products.unit_price".into(),
        attrs: [("precision".to_owned(), Value::from(4.0))].into(),
    };
    let impact = impact_from_event(&graph, &price_change, None);
    assert!(impact.is_impacted(&"expr:line_total".into()));
    assert!(impact.is_impacted(&"field:order.line_total".into()));
    assert!(!impact.is_impacted(&"field:order.quantity".into()));

    let path = impact.path(&"field:order.line_total".into()).unwrap();
    let expected: Vec<NodeId> = [
        "field:products.unit_price",
        "expr:line_total",
        "field:order.line_total",
    ]
    .iter()
    .map(|s| (*s).into())
    .collect();
    assert_eq!(path, expected);
}

#[test]
fn filter_with_unresolvable_table_still_wires_predicate_deps() {
    let (expr, diags) = parse("FILTER($rel:bogus.path, $field:order.quantity > 0)");
    assert!(diags.is_empty(), "{diags:?}");

    let summary = analyze(
        &expr.unwrap(),
        &catalog(),
        &"expr:x".into(),
        &"field:order.line_total".into(),
    );
    // The unknown FILTER table is dropped silently: no unresolved entry,
    // no diagnostic, and the predicate dependency still comes through.
    assert!(summary.unresolved.is_empty());
    assert!(summary.diagnostics.is_empty(), "{:?}", summary.diagnostics);
    assert_eq!(summary.exact_deps.len(), 1);
    assert_eq!(
        summary.exact_deps[0].node_id,
        NodeId::from("field:order.quantity")
    );

    // quantity -> expr, expr -> target.
    let dep_events = build_dep_events(&summary);
    assert_eq!(dep_events.len(), 2);
}

#[test]
fn emitted_events_pass_the_validation_gate() {
    use palimpsest::validate_event;

    let (expr, _) = parse("$field:order.quantity + 1");
    let summary = analyze(
        &expr.unwrap(),
        &catalog(),
        &"expr:x".into(),
        &"field:order.line_total".into(),
    );
    let dep_events = build_dep_events(&summary);

    let mut log = EventLog::new();
    for (id, node_type) in [
        ("field:order.quantity", NodeType::Field),
        ("expr:x", NodeType::Expression),
        ("field:order.line_total", NodeType::Field),
    ] {
        log.append(Event::NodeAdded {
            node_id: id.into(),
            node_type,
            attrs: Attrs::new(),
        });
    }
    let graph = replay_latest(&log);

    for event in &dep_events {
        assert!(
            validate_event(&graph, event, None).valid,
            "emitted event should be appendable: {event}"
        );
    }
}
