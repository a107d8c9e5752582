//! End-to-end scenarios over small graphs whose automorphism groups are
//! known exactly.

use std::collections::HashSet;

use symmetry::{Engine, Stats};
use symmetry_builder::{ColoredGraph, GraphBuilder};

fn undirected(n: usize, edges: &[(usize, usize)]) -> ColoredGraph {
    GraphBuilder::new()
        .node_count(n)
        .edges(edges.iter().copied())
        .build()
        .unwrap()
}

fn directed(n: usize, edges: &[(usize, usize)]) -> ColoredGraph {
    GraphBuilder::new()
        .directed(true)
        .node_count(n)
        .edges(edges.iter().copied())
        .build()
        .unwrap()
}

fn collect(graph: &ColoredGraph) -> (Vec<Vec<usize>>, Stats) {
    let mut engine = Engine::new(graph.node_count());
    let mut generators = Vec::new();
    let stats = engine.search(graph, |automorphism| {
        assert_automorphism(graph, automorphism.perm);
        assert_support(automorphism.perm, automorphism.support);
        generators.push(automorphism.perm.to_vec());
        true
    });
    (generators, stats)
}

fn group_size(stats: &Stats) -> f64 {
    stats.grpsize_base * 10f64.powi(stats.grpsize_exp as i32)
}

/// Independent re-verification: gamma must map the neighborhood of every
/// vertex onto the neighborhood of its image, in both directions for
/// digraphs.
fn assert_automorphism(graph: &ColoredGraph, gamma: &[usize]) {
    let n = graph.node_count();
    assert_eq!(gamma.len(), n);

    let sorted = |mut v: Vec<usize>| {
        v.sort_unstable();
        v
    };

    for v in 0..n {
        let mapped: Vec<usize> = graph.out_neighbors(v).iter().map(|&u| gamma[u]).collect();
        assert_eq!(
            sorted(mapped),
            sorted(graph.out_neighbors(gamma[v]).to_vec()),
            "out-neighborhood of {v} not preserved"
        );
        if graph.is_directed() {
            let mapped: Vec<usize> = graph.in_neighbors(v).iter().map(|&u| gamma[u]).collect();
            assert_eq!(
                sorted(mapped),
                sorted(graph.in_neighbors(gamma[v]).to_vec()),
                "in-neighborhood of {v} not preserved"
            );
        }
    }
}

/// The support must list exactly the non-fixed points, sorted ascending,
/// and be closed under the permutation.
fn assert_support(gamma: &[usize], support: &[usize]) {
    let expected: Vec<usize> = (0..gamma.len()).filter(|&v| gamma[v] != v).collect();
    assert_eq!(support, expected.as_slice());
    for &v in support {
        assert!(support.contains(&gamma[v]));
    }
}

/// Brute-force closure of the generators under composition; only usable
/// when the full group is tiny.
fn closure_order(n: usize, generators: &[Vec<usize>]) -> usize {
    let identity: Vec<usize> = (0..n).collect();
    let mut group: HashSet<Vec<usize>> = HashSet::new();
    group.insert(identity.clone());
    let mut frontier = vec![identity];

    while let Some(perm) = frontier.pop() {
        for generator in generators {
            let composed: Vec<usize> = perm.iter().map(|&v| generator[v]).collect();
            if group.insert(composed.clone()) {
                frontier.push(composed);
            }
        }
    }

    group.len()
}

#[test]
fn triangle() {
    let graph = undirected(3, &[(0, 1), (0, 2), (1, 2)]);
    let (generators, stats) = collect(&graph);

    assert_eq!(stats.gens, 2);
    assert_eq!(stats.support, 5);
    assert_eq!((stats.grpsize_base, stats.grpsize_exp), (6.0, 0));
    assert_eq!(closure_order(3, &generators), 6);
}

#[test]
fn path_on_three_vertices() {
    let graph = undirected(3, &[(0, 1), (1, 2)]);
    let (generators, stats) = collect(&graph);

    assert_eq!(stats.gens, 1);
    assert_eq!(stats.support, 2);
    assert_eq!((stats.grpsize_base, stats.grpsize_exp), (2.0, 0));
    // The only symmetry swaps the endpoints.
    assert_eq!(generators[0], vec![2, 1, 0]);
}

#[test]
fn distinctly_colored_clique_is_rigid() {
    let graph = GraphBuilder::new()
        .edges(vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)])
        .colors(vec![0, 1, 2, 3])
        .build()
        .unwrap();
    let (generators, stats) = collect(&graph);

    assert!(generators.is_empty());
    assert_eq!(stats.gens, 0);
    assert_eq!((stats.grpsize_base, stats.grpsize_exp), (1.0, 0));
    assert_eq!(stats.nodes, 1);
}

#[test]
fn two_disjoint_triangles() {
    let graph = undirected(6, &[(0, 1), (0, 2), (1, 2), (3, 4), (3, 5), (4, 5)]);
    let (generators, stats) = collect(&graph);

    // S3 x S3 plus the swap of the two components.
    assert_eq!(group_size(&stats), 72.0);
    assert!(stats.gens >= 3);
    assert_eq!(closure_order(6, &generators), 72);
}

#[test]
fn directed_three_cycle() {
    let graph = directed(3, &[(0, 1), (1, 2), (2, 0)]);
    let (generators, stats) = collect(&graph);

    assert_eq!(stats.gens, 1);
    assert_eq!((stats.grpsize_base, stats.grpsize_exp), (3.0, 0));
    assert_eq!(closure_order(3, &generators), 3);
}

#[test]
fn undirected_four_cycle() {
    let graph = undirected(4, &[(0, 1), (1, 2), (2, 3), (3, 0)]);
    let (generators, stats) = collect(&graph);

    // The dihedral group of the square.
    assert_eq!(stats.gens, 2);
    assert_eq!(group_size(&stats), 8.0);
    assert_eq!(closure_order(4, &generators), 8);
}

#[test]
fn single_vertex() {
    let graph = undirected(1, &[]);
    let (generators, stats) = collect(&graph);

    assert!(generators.is_empty());
    assert_eq!((stats.grpsize_base, stats.grpsize_exp), (1.0, 0));
    assert_eq!(stats.nodes, 1);
}

#[test]
fn asymmetric_digraph_is_rigid() {
    let graph = directed(3, &[(0, 1), (0, 2), (1, 2)]);
    let (_, stats) = collect(&graph);

    assert_eq!(stats.gens, 0);
    assert_eq!((stats.grpsize_base, stats.grpsize_exp), (1.0, 0));
    assert_eq!(stats.nodes, 1);
}

#[test]
fn generator_count_is_bounded() {
    let graph = undirected(6, &[(0, 1), (0, 2), (1, 2), (3, 4), (3, 5), (4, 5)]);
    let (generators, stats) = collect(&graph);

    assert!(stats.gens as usize <= graph.node_count());
    assert!(stats.support <= stats.gens * graph.node_count() as u64);
    assert_eq!(generators.len() as u64, stats.gens);
}

#[test]
fn repeated_searches_are_identical() {
    let graph = undirected(6, &[(0, 1), (0, 2), (1, 2), (3, 4), (3, 5), (4, 5)]);
    let mut engine = Engine::new(6);

    let first = engine.search(&graph, |_| true);
    let second = engine.search(&graph, |_| true);

    assert_eq!(first, second);
}

#[test]
fn abort_stops_after_the_current_generator() {
    let graph = undirected(3, &[(0, 1), (0, 2), (1, 2)]);
    let mut engine = Engine::new(3);

    let mut seen = 0;
    let stats = engine.search(&graph, |_| {
        seen += 1;
        false
    });

    assert_eq!(seen, 1);
    assert_eq!(stats.gens, 1);

    // An aborted search leaves the engine reusable.
    let stats = engine.search(&graph, |_| true);
    assert_eq!(stats.gens, 2);
    assert_eq!((stats.grpsize_base, stats.grpsize_exp), (6.0, 0));
}

#[test]
fn colors_restrict_the_group() {
    // A 4-cycle whose opposite corners share a color: the reflections
    // swapping color classes disappear.
    let graph = GraphBuilder::new()
        .edges(vec![(0, 1), (1, 2), (2, 3), (3, 0)])
        .colors(vec![0, 1, 0, 1])
        .build()
        .unwrap();
    let (generators, stats) = collect(&graph);

    assert_eq!(group_size(&stats), 4.0);
    assert_eq!(closure_order(4, &generators), 4);
}

#[test]
fn generators_come_in_deterministic_order() {
    let graph = undirected(4, &[(0, 1), (1, 2), (2, 3), (3, 0)]);

    let (first, _) = collect(&graph);
    let (second, _) = collect(&graph);

    assert_eq!(first, second);
}
