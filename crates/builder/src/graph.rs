//! Vertex-colored graphs in Compressed-Sparse-Row form.

use crate::Error;

/// A finite vertex-colored graph with CSR adjacency.
///
/// Vertices are numbered `0..node_count`. For undirected graphs a single
/// offset/target pair holds both endpoint directions; for directed graphs
/// the out-adjacency and the in-adjacency are stored separately. Neighbor
/// lists preserve input order and contain no duplicate edges (a self-loop is
/// permitted at most once per vertex).
#[derive(Debug)]
pub struct ColoredGraph {
    node_count: usize,
    edge_count: usize,
    directed: bool,
    out_offsets: Box<[usize]>,
    out_targets: Box<[usize]>,
    in_offsets: Box<[usize]>,
    in_targets: Box<[usize]>,
    colors: Box<[usize]>,
}

impl ColoredGraph {
    /// Returns the number of vertices in the graph.
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Returns the number of input edges. For undirected graphs each edge is
    /// counted once even though it is stored from both endpoints.
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn is_directed(&self) -> bool {
        self.directed
    }

    /// The dense color rank of every vertex, cells ordered by the original
    /// color values.
    pub fn colors(&self) -> &[usize] {
        &self.colors
    }

    /// Returns the out-neighbors of `node`. For undirected graphs this is
    /// the full neighbor list.
    pub fn out_neighbors(&self, node: usize) -> &[usize] {
        &self.out_targets[self.out_offsets[node]..self.out_offsets[node + 1]]
    }

    /// Returns the in-neighbors of `node`. For undirected graphs the
    /// adjacency is symmetric and this equals [`Self::out_neighbors`].
    pub fn in_neighbors(&self, node: usize) -> &[usize] {
        if self.directed {
            &self.in_targets[self.in_offsets[node]..self.in_offsets[node + 1]]
        } else {
            self.out_neighbors(node)
        }
    }
}

/// A builder to create a [`ColoredGraph`] from a list of edges.
///
/// # Examples
///
/// ```
/// use symmetry_builder::GraphBuilder;
///
/// let graph = GraphBuilder::new()
///     .directed(true)
///     .edges(vec![(0, 1), (1, 2), (2, 0)])
///     .build()
///     .unwrap();
///
/// assert_eq!(graph.out_neighbors(0), &[1]);
/// assert_eq!(graph.in_neighbors(0), &[2]);
/// ```
pub struct GraphBuilder {
    edges: Vec<(usize, usize)>,
    colors: Option<Vec<usize>>,
    node_count: Option<usize>,
    directed: bool,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            edges: Vec::new(),
            colors: None,
            node_count: None,
            directed: false,
        }
    }

    /// Treat edges as arcs with distinct out- and in-adjacency.
    pub fn directed(mut self, directed: bool) -> Self {
        self.directed = directed;
        self
    }

    /// Sets an explicit node count. Without it, the node count is inferred
    /// from the largest edge endpoint and the color vector length.
    pub fn node_count(mut self, node_count: usize) -> Self {
        self.node_count = Some(node_count);
        self
    }

    pub fn edges<I>(mut self, edges: I) -> Self
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        self.edges.extend(edges);
        self
    }

    /// Sets one integer color per vertex. Values are normalized to a dense
    /// `0..k` range preserving their numeric order.
    pub fn colors(mut self, colors: Vec<usize>) -> Self {
        self.colors = Some(colors);
        self
    }

    pub fn build(self) -> Result<ColoredGraph, Error> {
        let node_count = match self.node_count {
            Some(n) => n,
            None => {
                let from_edges = self
                    .edges
                    .iter()
                    .map(|&(u, v)| u.max(v) + 1)
                    .max()
                    .unwrap_or(0);
                let from_colors = self.colors.as_ref().map_or(0, Vec::len);
                from_edges.max(from_colors)
            }
        };

        for &(u, v) in &self.edges {
            if u >= node_count {
                return Err(Error::InvalidVertex { vertex: u });
            }
            if v >= node_count {
                return Err(Error::InvalidVertex { vertex: v });
            }
        }

        let colors = match self.colors {
            Some(colors) => {
                if colors.len() != node_count {
                    return Err(Error::InvalidColors);
                }
                normalize_colors(colors)
            }
            None => vec![0; node_count].into_boxed_slice(),
        };

        let (out_offsets, out_targets) =
            build_csr(node_count, &self.edges, self.directed, Direction::Out);
        let (in_offsets, in_targets) = if self.directed {
            build_csr(node_count, &self.edges, self.directed, Direction::In)
        } else {
            (Box::default(), Box::default())
        };

        dupe_check(node_count, &out_offsets, &out_targets)?;

        log::debug!(
            "built {} graph: {} nodes, {} edges",
            if self.directed { "directed" } else { "undirected" },
            node_count,
            self.edges.len()
        );

        Ok(ColoredGraph {
            node_count,
            edge_count: self.edges.len(),
            directed: self.directed,
            out_offsets,
            out_targets,
            in_offsets,
            in_targets,
            colors,
        })
    }
}

enum Direction {
    Out,
    In,
}

/// Classic two-pass CSR assembly: count degrees, prefix-sum the counts into
/// offsets, then fill targets in input order.
fn build_csr(
    node_count: usize,
    edges: &[(usize, usize)],
    directed: bool,
    direction: Direction,
) -> (Box<[usize]>, Box<[usize]>) {
    let mut offsets = vec![0usize; node_count + 1];

    for &(u, v) in edges {
        match direction {
            Direction::Out => {
                offsets[u] += 1;
                if !directed {
                    offsets[v] += 1;
                }
            }
            Direction::In => offsets[v] += 1,
        }
    }

    let mut sum = 0;
    for offset in offsets.iter_mut() {
        let count = *offset;
        *offset = sum;
        sum += count;
    }

    let mut cursor = offsets.clone();
    let mut targets = vec![0usize; sum];
    for &(u, v) in edges {
        match direction {
            Direction::Out => {
                targets[cursor[u]] = v;
                cursor[u] += 1;
                if !directed {
                    targets[cursor[v]] = u;
                    cursor[v] += 1;
                }
            }
            Direction::In => {
                targets[cursor[v]] = u;
                cursor[v] += 1;
            }
        }
    }

    (offsets.into_boxed_slice(), targets.into_boxed_slice())
}

/// Rank colors into a dense `0..k` range, preserving numeric order.
fn normalize_colors(colors: Vec<usize>) -> Box<[usize]> {
    let mut distinct = colors.clone();
    distinct.sort_unstable();
    distinct.dedup();

    colors
        .into_iter()
        .map(|color| distinct.partition_point(|&d| d < color))
        .collect()
}

/// Scan every adjacency list with a per-target stamp. An undirected
/// self-loop legitimately produces two identical entries, so only a third
/// hit of the own vertex counts as a duplicate.
fn dupe_check(node_count: usize, offsets: &[usize], targets: &[usize]) -> Result<(), Error> {
    let mut last_seen = vec![usize::MAX; node_count];

    for u in 0..node_count {
        let mut self_loops = 0;
        for &v in &targets[offsets[u]..offsets[u + 1]] {
            if v == u {
                self_loops += 1;
                if self_loops > 2 {
                    return Err(Error::DuplicateEdge { u, v });
                }
            } else if last_seen[v] == u {
                return Err(Error::DuplicateEdge { u, v });
            } else {
                last_seen[v] = u;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undirected_csr() {
        let graph = GraphBuilder::new()
            .edges(vec![(0, 1), (0, 2), (1, 2), (1, 3)])
            .build()
            .unwrap();

        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 4);
        assert!(!graph.is_directed());
        assert_eq!(graph.out_neighbors(0), &[1, 2]);
        assert_eq!(graph.out_neighbors(1), &[0, 2, 3]);
        assert_eq!(graph.in_neighbors(1), &[0, 2, 3]);
        assert_eq!(graph.out_neighbors(3), &[1]);
    }

    #[test]
    fn directed_csr() {
        let graph = GraphBuilder::new()
            .directed(true)
            .edges(vec![(0, 1), (1, 2), (2, 0)])
            .build()
            .unwrap();

        assert_eq!(graph.out_neighbors(1), &[2]);
        assert_eq!(graph.in_neighbors(1), &[0]);
        assert_eq!(graph.out_neighbors(2), &[0]);
        assert_eq!(graph.in_neighbors(0), &[2]);
    }

    #[test]
    fn explicit_node_count_keeps_isolated_nodes() {
        let graph = GraphBuilder::new()
            .node_count(5)
            .edges(vec![(0, 1)])
            .build()
            .unwrap();

        assert_eq!(graph.node_count(), 5);
        assert_eq!(graph.out_neighbors(4), &[] as &[usize]);
    }

    #[test]
    fn colors_are_normalized_dense() {
        let graph = GraphBuilder::new()
            .edges(vec![(0, 1), (1, 2)])
            .colors(vec![10, 10, 3])
            .build()
            .unwrap();

        assert_eq!(graph.colors(), &[1, 1, 0]);
    }

    #[test]
    fn color_count_must_match() {
        let err = GraphBuilder::new()
            .edges(vec![(0, 1)])
            .colors(vec![0])
            .build()
            .unwrap_err();

        assert!(matches!(err, Error::InvalidColors));
    }

    #[test]
    fn out_of_range_vertex_is_rejected() {
        let err = GraphBuilder::new()
            .node_count(2)
            .edges(vec![(0, 2)])
            .build()
            .unwrap_err();

        assert!(matches!(err, Error::InvalidVertex { vertex: 2 }));
    }

    #[test]
    fn duplicate_edge_is_rejected() {
        let err = GraphBuilder::new()
            .edges(vec![(0, 1), (1, 0)])
            .build()
            .unwrap_err();

        assert!(matches!(err, Error::DuplicateEdge { .. }));
    }

    #[test]
    fn single_self_loop_is_allowed() {
        let graph = GraphBuilder::new()
            .node_count(2)
            .edges(vec![(0, 0), (0, 1)])
            .build()
            .unwrap();

        assert_eq!(graph.out_neighbors(0), &[0, 0, 1]);
    }

    #[test]
    fn repeated_self_loop_is_rejected() {
        let err = GraphBuilder::new()
            .node_count(1)
            .edges(vec![(0, 0), (0, 0)])
            .build()
            .unwrap_err();

        assert!(matches!(err, Error::DuplicateEdge { u: 0, v: 0 }));
    }
}
