//! # Property-Based Tests
//!
//! Matcher, resolver and linearizer invariants over generated graphs.

use proptest::collection::vec;
use proptest::prelude::*;
use semnet_core::primitives::keynodes;
use semnet_core::{
    Addr, EdgeType, Element, Graph, GraphStore, Keynodes, LinkContent, Matcher, NodeKind,
    SchemeLinearizer, Template, Term, resolve_entity,
};
use std::collections::BTreeSet;

// =============================================================================
// FIXTURES
// =============================================================================

/// Plain nodes, access edges between them, and one relation that
/// qualifies the edges flagged `true`.
struct Generated {
    graph: Graph,
    relation: Addr,
}

fn generate(node_count: usize, edges: &[(usize, usize, bool)]) -> Generated {
    let mut graph = Graph::new();
    let relation = graph.create_node(NodeKind::Relation).expect("relation");
    let nodes: Vec<Addr> = (0..node_count)
        .map(|_| graph.create_node(NodeKind::Plain).expect("node"))
        .collect();
    for &(s, t, qualified) in edges {
        let edge = graph
            .create_edge(EdgeType::ACCESS_POS_PERM, nodes[s % node_count], nodes[t % node_count])
            .expect("edge");
        if qualified {
            graph
                .create_edge(EdgeType::ACCESS_POS_PERM, relation, edge)
                .expect("qualifier");
        }
    }
    Generated { graph, relation }
}

/// `(edge, source, target)` of every access edge between two nodes.
fn access_pairs(graph: &Graph) -> Vec<(Addr, Addr, Addr)> {
    graph
        .iter()
        .filter_map(|(addr, element)| match element {
            Element::Edge { ty, source, target } if *ty == EdgeType::ACCESS_POS_PERM => {
                let is_node = |a: &Addr| matches!(graph.get(*a), Some(Element::Node(_)));
                (is_node(source) && is_node(target)).then_some((addr, *source, *target))
            }
            _ => None,
        })
        .collect()
}

fn has_edge(graph: &Graph, from: Addr, to: Addr) -> bool {
    access_pairs(graph)
        .iter()
        .any(|&(_, s, t)| s == from && t == to)
}

fn is_qualified(graph: &Graph, relation: Addr, edge: Addr) -> bool {
    graph
        .outgoing(relation)
        .expect("outgoing")
        .iter()
        .any(|e| graph.get(*e).and_then(Element::as_edge).map(|x| x.2) == Some(edge))
}

fn edge_strategy() -> impl Strategy<Value = Vec<(usize, usize, bool)>> {
    vec((0usize..12, 0usize..12, any::<bool>()), 0..30)
}

// =============================================================================
// MATCHER
// =============================================================================

proptest! {
    /// Every binding satisfies every clause when re-checked against the graph.
    #[test]
    fn matcher_bindings_are_sound(count in 2usize..12, edges in edge_strategy()) {
        let g = generate(count, &edges);
        let template = Template::new()
            .quintuple(
                Term::node("x"),
                Term::edge("e", EdgeType::ACCESS_POS_PERM),
                Term::node("y"),
                Term::edge_var(EdgeType::ACCESS_POS_PERM),
                g.relation,
            )
            .triple("y", Term::edge_var(EdgeType::ACCESS_POS_PERM), Term::node("z"));

        for binding in Matcher::search(&g.graph, &template).expect("search") {
            let x = binding.require("x").expect("x");
            let y = binding.require("y").expect("y");
            let z = binding.require("z").expect("z");
            let e = binding.require("e").expect("e");
            prop_assert_eq!(
                g.graph.get(e).and_then(Element::as_edge),
                Some((EdgeType::ACCESS_POS_PERM, x, y))
            );
            prop_assert!(is_qualified(&g.graph, g.relation, e));
            prop_assert!(has_edge(&g.graph, y, z));
        }
    }

    /// The matcher finds exactly the assignments a brute-force scan finds.
    #[test]
    fn matcher_equals_brute_force(count in 2usize..12, edges in edge_strategy()) {
        let g = generate(count, &edges);
        let template = Template::new()
            .quintuple(
                Term::node("x"),
                Term::edge("e", EdgeType::ACCESS_POS_PERM),
                Term::node("y"),
                Term::edge_var(EdgeType::ACCESS_POS_PERM),
                g.relation,
            );

        let found: BTreeSet<(Addr, Addr, Addr)> = Matcher::search(&g.graph, &template)
            .expect("search")
            .iter()
            .map(|b| {
                (
                    b.require("e").expect("e"),
                    b.require("x").expect("x"),
                    b.require("y").expect("y"),
                )
            })
            .collect();
        let expected: BTreeSet<(Addr, Addr, Addr)> = access_pairs(&g.graph)
            .into_iter()
            .filter(|&(e, _, _)| is_qualified(&g.graph, g.relation, e))
            .collect();
        prop_assert_eq!(found, expected);
    }

    /// A variable reused across clauses is bound to one element in both.
    #[test]
    fn reused_variable_unifies(count in 2usize..12, edges in edge_strategy()) {
        let g = generate(count, &edges);
        let template = Template::new()
            .triple(Term::node("x"), Term::edge_var(EdgeType::ACCESS_POS_PERM), Term::node("y"))
            .triple("y", Term::edge_var(EdgeType::ACCESS_POS_PERM), "x");

        let found: BTreeSet<(Addr, Addr)> = Matcher::search(&g.graph, &template)
            .expect("search")
            .iter()
            .map(|b| (b.require("x").expect("x"), b.require("y").expect("y")))
            .collect();
        let expected: BTreeSet<(Addr, Addr)> = access_pairs(&g.graph)
            .into_iter()
            .filter(|&(_, s, t)| has_edge(&g.graph, t, s))
            .map(|(_, s, t)| (s, t))
            .collect();
        prop_assert_eq!(found, expected);
    }

    /// Searching an unchanged graph twice gives the same bindings.
    #[test]
    fn matcher_is_repeatable(count in 2usize..12, edges in edge_strategy()) {
        let g = generate(count, &edges);
        let template = Template::new()
            .triple(Term::node("x"), Term::edge_var(EdgeType::ACCESS_POS_PERM), Term::node("y"));
        prop_assert_eq!(
            Matcher::search(&g.graph, &template).expect("first"),
            Matcher::search(&g.graph, &template).expect("second")
        );
    }
}

// =============================================================================
// RESOLVER
// =============================================================================

proptest! {
    /// Resolving the same name twice returns the same node.
    #[test]
    fn resolver_is_deterministic(
        names in vec("[a-zа-я]{1,6}", 1..8),
        pick in any::<prop::sample::Index>(),
    ) {
        let mut graph = Graph::new();
        let kn = Keynodes::bootstrap(&mut graph).expect("bootstrap");
        let main = kn.resolve(&graph, keynodes::NREL_MAIN_IDTF).expect("main");
        for name in &names {
            let node = graph.create_node(NodeKind::Plain).expect("node");
            let link = graph.create_link(LinkContent::text(name.as_str())).expect("link");
            let pair = graph.create_edge(EdgeType::COMMON, node, link).expect("pair");
            graph.create_edge(EdgeType::ACCESS_POS_PERM, main, pair).expect("rel");
        }

        let name = pick.get(&names);
        let first = resolve_entity(&graph, &kn, name).expect("first");
        let second = resolve_entity(&graph, &kn, name).expect("second");
        prop_assert_eq!(first, second);
    }
}

// =============================================================================
// LINEARIZER
// =============================================================================

/// A scheme whose steps are all unit procedures, connected by `links`.
fn scheme_with(steps: usize, links: &[(usize, usize)]) -> (Graph, Keynodes, Addr, Vec<Addr>) {
    let mut graph = Graph::new();
    let kn = Keynodes::bootstrap(&mut graph).expect("bootstrap");
    let scheme = graph.create_node(NodeKind::Structure).expect("scheme");
    let start_class = kn
        .resolve(&graph, keynodes::PROCEDURE_STARTING_IMAGE)
        .expect("start");
    let unit_class = kn.resolve(&graph, keynodes::UNIT_PROCEDURE_IMAGE).expect("unit");
    let sign = kn.resolve(&graph, keynodes::NREL_IMAGE_SIGN).expect("sign");
    let lang = kn.resolve(&graph, keynodes::LANG_RU).expect("lang");
    let incidence = kn.resolve(&graph, keynodes::NREL_INCIDENCE).expect("incidence");

    let mut nodes = Vec::new();
    for i in 0..steps {
        let node = graph.create_node(NodeKind::Plain).expect("node");
        let class = if i == 0 { start_class } else { unit_class };
        graph.create_edge(EdgeType::ACCESS_POS_PERM, class, node).expect("class");
        graph.create_edge(EdgeType::ACCESS_POS_PERM, scheme, node).expect("member");
        let text = graph.create_link(LinkContent::text(format!("шаг {i}"))).expect("text");
        let pair = graph.create_edge(EdgeType::COMMON, node, text).expect("pair");
        graph.create_edge(EdgeType::ACCESS_POS_PERM, sign, pair).expect("sign");
        graph.create_edge(EdgeType::ACCESS_POS_PERM, lang, text).expect("lang");
        nodes.push(node);
    }
    for &(from, to) in links {
        let connection = graph.create_node(NodeKind::Plain).expect("connection");
        for (s, t) in [(nodes[from % steps], connection), (connection, nodes[to % steps])] {
            let pair = graph.create_edge(EdgeType::COMMON, s, t).expect("pair");
            graph.create_edge(EdgeType::ACCESS_POS_PERM, incidence, pair).expect("rel");
        }
    }
    (graph, kn, scheme, nodes)
}

/// Nodes reachable from `nodes[0]` by following `links`.
fn reachable(steps: usize, links: &[(usize, usize)]) -> BTreeSet<usize> {
    let mut seen = BTreeSet::from([0]);
    let mut stack = vec![0];
    while let Some(n) = stack.pop() {
        for &(from, to) in links {
            if from % steps == n && seen.insert(to % steps) {
                stack.push(to % steps);
            }
        }
    }
    seen
}

proptest! {
    /// Linearization terminates on arbitrary (cyclic) schemes, never repeats
    /// a node, and visits exactly the reachable ones.
    #[test]
    fn linearization_is_complete_and_duplicate_free(
        steps in 1usize..10,
        links in vec((0usize..10, 0usize..10), 0..25),
    ) {
        let (graph, kn, scheme, nodes) = scheme_with(steps, &links);
        let lin = SchemeLinearizer::default()
            .linearize(&graph, &kn, scheme)
            .expect("linearize");

        let unique: BTreeSet<Addr> = lin.order.iter().copied().collect();
        prop_assert_eq!(unique.len(), lin.order.len());

        let expected: BTreeSet<Addr> = reachable(steps, &links)
            .into_iter()
            .map(|i| nodes[i])
            .collect();
        prop_assert_eq!(unique, expected);
        prop_assert_eq!(lin.order.first().copied(), Some(nodes[0]));
        prop_assert_eq!(lin.rendered.lines().count(), lin.order.len());
    }
}
