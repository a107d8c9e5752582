//! A building block for graph symmetry detection.
//!
//! This crate provides the input side of an automorphism search: a read-only
//! [`ColoredGraph`] in Compressed-Sparse-Row (CSR) form, a validating
//! [`GraphBuilder`], and readers for the three text formats commonly used to
//! exchange colored graphs (a plain colored edge list, the GAP-style
//! bracketed format, and a DIMACS CNF encoding).
//!
//! # What is a colored graph?
//!
//! A colored graph is a graph together with an integer color per vertex.
//! Automorphisms are required to preserve colors, so the colors act as an
//! initial partition of the vertex set: two vertices can only ever be mapped
//! onto each other if they carry the same color.
//!
//! In a directed graph each vertex `u` has outgoing and incoming neighbors
//! and both adjacencies are stored; in an undirected graph an edge `(u, v)`
//! contributes `v` to the neighbor list of `u` and `u` to the neighbor list
//! of `v`.
//!
//! # How to build a graph
//!
//! ```
//! use symmetry_builder::GraphBuilder;
//!
//! let graph = GraphBuilder::new()
//!     .edges(vec![(0, 1), (0, 2), (1, 2)])
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(graph.node_count(), 3);
//! assert_eq!(graph.edge_count(), 3);
//! assert_eq!(graph.out_neighbors(0), &[1, 2]);
//! ```
//!
//! Colors default to a single color class; arbitrary color values are
//! normalized to a dense range while preserving their relative order:
//!
//! ```
//! use symmetry_builder::GraphBuilder;
//!
//! let graph = GraphBuilder::new()
//!     .edges(vec![(0, 1)])
//!     .colors(vec![7, 3])
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(graph.colors(), &[1, 0]);
//! ```

pub mod graph;
pub mod input;

pub use crate::graph::ColoredGraph;
pub use crate::graph::GraphBuilder;
pub use crate::input::DimacsInfo;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("error while loading graph")]
    IoError {
        #[from]
        source: std::io::Error,
    },
    #[error("invalid vertex in input: {vertex}")]
    InvalidVertex { vertex: usize },
    #[error("duplicate edge in input: ({u}, {v})")]
    DuplicateEdge { u: usize, v: usize },
    #[error("number of colors must be the same as node count")]
    InvalidColors,
    #[error("invalid {format} header")]
    InvalidHeader { format: &'static str },
    #[error("malformed {format} input at byte {at}")]
    Malformed { format: &'static str, at: usize },
    #[error("literal out of range: {0}")]
    InvalidLiteral(i64),
    #[error("empty clause in input")]
    EmptyClause,
}
