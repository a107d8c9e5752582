//! Automorphism group search for vertex-colored graphs.
//!
//! Given a [`ColoredGraph`](symmetry_builder::ColoredGraph), the [`Engine`]
//! enumerates a generating set of its automorphism group and reports the
//! group's order. The search is a depth-first individualization-refinement
//! walk over ordered partitions of the vertex set, pruned by the coset
//! structure relative to the leftmost branch and by the orbit partition of
//! the generators found so far.
//!
//! The engine reports generators, not the whole group: the number of
//! callbacks is at most the number of vertices, while the group they
//! generate can be astronomically larger. The group order is accumulated
//! exactly as a decimal mantissa and exponent.
//!
//! # Example
//!
//! ```
//! use symmetry::Engine;
//! use symmetry_builder::GraphBuilder;
//!
//! // A triangle with indistinguishable vertices.
//! let graph = GraphBuilder::new()
//!     .edges(vec![(0, 1), (0, 2), (1, 2)])
//!     .build()
//!     .unwrap();
//!
//! let mut engine = Engine::new(graph.node_count());
//! let mut generators = Vec::new();
//! let stats = engine.search(&graph, |automorphism| {
//!     generators.push(automorphism.perm.to_vec());
//!     true
//! });
//!
//! // Two generators suffice for the full symmetric group on 3 points.
//! assert_eq!(stats.gens, 2);
//! assert_eq!((stats.grpsize_base, stats.grpsize_exp), (6.0, 0));
//! ```
//!
//! Generators are emitted in discovery order, which is deterministic for a
//! fixed input. The consumer may return `false` to abort the search; the
//! statistics then cover what was found up to that point.

mod coloring;
mod orbits;
mod refine;
mod search;

pub use crate::search::Automorphism;
pub use crate::search::Engine;
pub use crate::search::Stats;
