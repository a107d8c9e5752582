//! The plain colored graph format.
//!
//! A header `n e p` (vertex count, edge count, color count) is followed by
//! `p - 1` ascending color boundaries and `e` edge pairs. Colors are
//! implicit: color `i` covers the vertices between boundary `i - 1` and
//! boundary `i`. In digraph mode the edge pairs are read as arcs.
//!
//! ```text
//! 4 3 2
//! 2
//! 0 1
//! 1 2
//! 2 3
//! ```
//!
//! describes a path on four vertices where vertices `0..2` have color 0 and
//! vertices `2..4` have color 1.

use std::path::Path;

use log::debug;

use crate::input::Scanner;
use crate::{ColoredGraph, Error, GraphBuilder};

const FORMAT: &str = "plain";

/// Reads a plain colored graph from a byte buffer.
pub fn read(bytes: &[u8], directed: bool) -> Result<ColoredGraph, Error> {
    let mut scanner = Scanner::new(bytes, FORMAT);

    let node_count = scanner.next_usize()?;
    let edge_count = scanner.next_usize()?;
    let color_count = scanner.next_usize()?;

    let mut colors = vec![0usize; node_count];
    let mut vertex = 0;
    let mut color = 0;
    while color + 1 < color_count {
        let boundary = scanner.next_usize()?;
        if boundary > node_count {
            return Err(scanner.malformed());
        }
        while vertex < boundary {
            colors[vertex] = color;
            vertex += 1;
        }
        color += 1;
    }
    while vertex < node_count {
        colors[vertex] = color;
        vertex += 1;
    }

    let mut edges = Vec::with_capacity(edge_count);
    for _ in 0..edge_count {
        let u = scanner.next_usize()?;
        let v = scanner.next_usize()?;
        edges.push((u, v));
    }

    debug!("plain input: {node_count} nodes, {edge_count} edges, {color_count} colors");

    GraphBuilder::new()
        .directed(directed)
        .node_count(node_count)
        .edges(edges)
        .colors(colors)
        .build()
}

/// Reads a plain colored graph from a file.
pub fn read_from_path<P: AsRef<Path>>(path: P, directed: bool) -> Result<ColoredGraph, Error> {
    let bytes = std::fs::read(path)?;
    read(&bytes, directed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_with_two_colors() {
        let graph = read(b"4 3 2\n2\n0 1\n1 2\n2 3\n", false).unwrap();

        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(graph.colors(), &[0, 0, 1, 1]);
        assert_eq!(graph.out_neighbors(1), &[0, 2]);
    }

    #[test]
    fn single_color_needs_no_boundaries() {
        let graph = read(b"3 3 1\n0 1\n0 2\n1 2\n", false).unwrap();

        assert_eq!(graph.colors(), &[0, 0, 0]);
        assert_eq!(graph.out_neighbors(0), &[1, 2]);
    }

    #[test]
    fn digraph_mode_keeps_arcs_asymmetric() {
        let graph = read(b"3 3 1\n0 1\n1 2\n2 0\n", true).unwrap();

        assert!(graph.is_directed());
        assert_eq!(graph.out_neighbors(0), &[1]);
        assert_eq!(graph.in_neighbors(0), &[2]);
    }

    #[test]
    fn comment_lines_are_skipped() {
        let graph = read(b"c tiny\n2 1 1\n0 1\n", false).unwrap();

        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn out_of_range_edge_is_rejected() {
        let err = read(b"2 1 1\n0 5\n", false).unwrap_err();

        assert!(matches!(err, Error::InvalidVertex { vertex: 5 }));
    }

    #[test]
    fn truncated_input_is_rejected() {
        assert!(read(b"3 3 1\n0 1\n", false).is_err());
    }

    #[test]
    fn reads_from_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"3 2 1\n0 1\n1 2\n").unwrap();

        let graph = read_from_path(file.path(), false).unwrap();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
    }
}
