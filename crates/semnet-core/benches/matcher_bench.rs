//! # Matcher Benchmarks
//!
//! Template search, entity resolution and scheme linearization.
//!
//! Run with: `cargo bench -p semnet-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use semnet_core::primitives::keynodes;
use semnet_core::{
    Addr, EdgeType, Graph, GraphStore, Keynodes, LinkContent, Matcher, NodeKind,
    SchemeLinearizer, Template, Term, resolve_entity,
};
use std::hint::black_box;

/// `size` named entities under one hub, linked by `nrel_inclusion`.
fn create_taxonomy(size: usize) -> (Graph, Keynodes, Addr) {
    let mut graph = Graph::new();
    let kn = Keynodes::bootstrap(&mut graph).expect("bootstrap");
    let main = kn.resolve(&graph, keynodes::NREL_MAIN_IDTF).expect("main");
    let inclusion = kn.resolve(&graph, keynodes::NREL_INCLUSION).expect("inclusion");
    let hub = graph.create_node(NodeKind::Plain).expect("hub");

    for i in 0..size {
        let node = graph.create_node(NodeKind::Plain).expect("node");
        let link = graph
            .create_link(LinkContent::text(format!("entity {i}")))
            .expect("link");
        let pair = graph.create_edge(EdgeType::COMMON, node, link).expect("pair");
        graph
            .create_edge(EdgeType::ACCESS_POS_PERM, main, pair)
            .expect("idtf");
        let child = graph.create_edge(EdgeType::COMMON, hub, node).expect("child");
        graph
            .create_edge(EdgeType::ACCESS_POS_PERM, inclusion, child)
            .expect("inclusion");
    }

    (graph, kn, hub)
}

/// A linear scheme of `size` unit steps after the start node.
fn create_scheme(size: usize) -> (Graph, Keynodes, Addr) {
    let mut graph = Graph::new();
    let kn = Keynodes::bootstrap(&mut graph).expect("bootstrap");
    let scheme = graph.create_node(NodeKind::Structure).expect("scheme");
    let resolve = |idtf| kn.resolve(&graph, idtf).expect("keynode");
    let start_class = resolve(keynodes::PROCEDURE_STARTING_IMAGE);
    let unit_class = resolve(keynodes::UNIT_PROCEDURE_IMAGE);
    let sign = resolve(keynodes::NREL_IMAGE_SIGN);
    let lang = resolve(keynodes::LANG_RU);
    let incidence = resolve(keynodes::NREL_INCIDENCE);

    let mut previous: Option<Addr> = None;
    for i in 0..=size {
        let node = graph.create_node(NodeKind::Plain).expect("step");
        let class = if i == 0 { start_class } else { unit_class };
        graph
            .create_edge(EdgeType::ACCESS_POS_PERM, class, node)
            .expect("class");
        graph
            .create_edge(EdgeType::ACCESS_POS_PERM, scheme, node)
            .expect("member");
        let text = graph
            .create_link(LinkContent::text(format!("step {i}")))
            .expect("text");
        let pair = graph.create_edge(EdgeType::COMMON, node, text).expect("pair");
        graph
            .create_edge(EdgeType::ACCESS_POS_PERM, sign, pair)
            .expect("sign");
        graph
            .create_edge(EdgeType::ACCESS_POS_PERM, lang, text)
            .expect("lang");

        if let Some(prev) = previous {
            let connection = graph.create_node(NodeKind::Plain).expect("connection");
            for (s, t) in [(prev, connection), (connection, node)] {
                let edge = graph.create_edge(EdgeType::COMMON, s, t).expect("edge");
                graph
                    .create_edge(EdgeType::ACCESS_POS_PERM, incidence, edge)
                    .expect("incidence");
            }
        }
        previous = Some(node);
    }

    (graph, kn, scheme)
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_children_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("children_search");

    for size in [100, 1000, 10000].iter() {
        let (graph, kn, hub) = create_taxonomy(*size);
        let inclusion = kn.resolve(&graph, keynodes::NREL_INCLUSION).expect("inclusion");
        let template = Template::new().quintuple(
            hub,
            Term::edge_var(EdgeType::COMMON),
            Term::node("child"),
            Term::edge_var(EdgeType::ACCESS_POS_PERM),
            inclusion,
        );

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(Matcher::search(&graph, &template)));
        });
    }

    group.finish();
}

fn bench_resolve_entity(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_entity");

    for size in [100, 1000, 10000].iter() {
        let (graph, kn, _) = create_taxonomy(*size);
        let name = format!("entity {}", size / 2);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(resolve_entity(&graph, &kn, &name)));
        });
    }

    group.finish();
}

fn bench_linearize(c: &mut Criterion) {
    let mut group = c.benchmark_group("linearize");

    for size in [10, 100, 500].iter() {
        let (graph, kn, scheme) = create_scheme(*size);
        let linearizer = SchemeLinearizer::default();

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(linearizer.linearize(&graph, &kn, scheme)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_children_search,
    bench_resolve_entity,
    bench_linearize
);
criterion_main!(benches);
