use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use palimpsest::{
    compute_impact, replay_latest, simulate_event, Attrs, EdgeLabel, Event, EventLog, Graph,
    NodeType, Snapshot, SnapshotCache, Value,
};
use std::sync::Arc;

fn node(id: String) -> Event {
    Event::NodeAdded {
        node_id: id.into(),
        node_type: NodeType::Field,
        attrs: Attrs::new(),
    }
}

fn chain_log(length: usize) -> EventLog {
    let mut log = EventLog::new();
    for i in 0..length {
        log.append(node(format!("n{i}")));
    }
    for i in 1..length {
        log.append(Event::EdgeAdded {
            from: format!("n{}", i - 1).into(),
            to: format!("n{i}").into(),
            label: EdgeLabel::Uses,
        });
    }
    log
}

fn fanout_log(providers: usize, consumers_each: usize) -> EventLog {
    let mut log = EventLog::new();
    let mut rng = StdRng::seed_from_u64(7);
    for i in 0..providers {
        log.append(node(format!("p{i}")));
        for j in 0..consumers_each {
            log.append(node(format!("c{i}_{j}")));
        }
    }
    for i in 0..providers {
        for j in 0..consumers_each {
            log.append(Event::EdgeAdded {
                from: format!("p{i}").into(),
                to: format!("c{i}_{j}").into(),
                label: if rng.gen_bool(0.8) {
                    EdgeLabel::Uses
                } else {
                    EdgeLabel::Derives
                },
            });
        }
    }
    log
}

fn bench_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("replay");
    for size in [100, 1_000, 5_000] {
        let log = chain_log(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &log, |b, log| {
            b.iter(|| black_box(replay_latest(log)));
        });
    }
    group.finish();
}

fn bench_impact(c: &mut Criterion) {
    let mut group = c.benchmark_group("impact");

    let chain = replay_latest(&chain_log(2_000));
    group.bench_function("chain_2000", |b| {
        b.iter(|| black_box(compute_impact(&chain, &["n0".into()], None)));
    });

    let fanout = replay_latest(&fanout_log(50, 40));
    group.bench_function("fanout_50x40", |b| {
        let seeds: Vec<_> = (0..50).map(|i| format!("p{i}").into()).collect();
        b.iter(|| black_box(compute_impact(&fanout, &seeds, None)));
    });

    group.finish();
}

fn bench_simulation(c: &mut Criterion) {
    let log = chain_log(500);
    let mut graph = replay_latest(&log);
    let event = Event::AttrUpdated {
        node_id: "n250".into(),
        attrs: [("x".to_owned(), Value::from(1.0))].into(),
    };
    c.bench_function("simulate_event_chain_500", |b| {
        b.iter(|| black_box(simulate_event(&mut graph, &event, None)));
    });
}

fn bench_snapshot_cache(c: &mut Criterion) {
    let log = chain_log(200);
    let cache = SnapshotCache::new(8);
    for offset in 0..8 {
        let rev = log.latest_revision() - offset * 10;
        cache.put(Arc::new(Snapshot::from_log(&log, rev)));
    }
    let hot = log.latest_revision();
    c.bench_function("snapshot_cache_hit", |b| {
        b.iter(|| black_box(cache.get(hot)));
    });
}

fn bench_clone(c: &mut Criterion) {
    let graph: Graph = replay_latest(&fanout_log(40, 40));
    c.bench_function("graph_clone_fanout_40x40", |b| {
        b.iter(|| black_box(graph.clone()));
    });
}

criterion_group!(
    benches,
    bench_replay,
    bench_impact,
    bench_simulation,
    bench_snapshot_cache,
    bench_clone
);
criterion_main!(benches);
