//! The GAP-style bracketed format.
//!
//! After any leading chaff, a bracketed list of 1-indexed edge pairs is
//! followed by the vertex count and a bracketed list of color cells:
//!
//! ```text
//! Graph( ..., [[1,2],[2,3],[3,1]], 3)), [[1,2,3]]
//! ```
//!
//! Everything outside brackets and digits is insignificant. An empty cell
//! consumes no color index; vertices not listed in any cell keep color 0.

use std::path::Path;

use atoi::FromRadix10;
use log::debug;

use crate::{ColoredGraph, Error, GraphBuilder};

const FORMAT: &str = "GAP";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Token {
    Int(usize),
    Open,
    Close,
}

struct Lexer<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn malformed(&self) -> Error {
        Error::Malformed {
            format: FORMAT,
            at: self.pos,
        }
    }

    fn next(&mut self) -> Option<Token> {
        loop {
            let byte = *self.buf.get(self.pos)?;
            match byte {
                b'[' => {
                    self.pos += 1;
                    return Some(Token::Open);
                }
                b']' => {
                    self.pos += 1;
                    return Some(Token::Close);
                }
                b'0'..=b'9' => {
                    let (value, used) = usize::from_radix_10(&self.buf[self.pos..]);
                    self.pos += used;
                    return Some(Token::Int(value));
                }
                _ => self.pos += 1,
            }
        }
    }

    fn peek(&mut self) -> Option<Token> {
        let save = self.pos;
        let token = self.next();
        self.pos = save;
        token
    }

    fn expect_open(&mut self) -> Result<(), Error> {
        match self.next() {
            Some(Token::Open) => Ok(()),
            _ => Err(self.malformed()),
        }
    }

    fn expect_close(&mut self) -> Result<(), Error> {
        match self.next() {
            Some(Token::Close) => Ok(()),
            _ => Err(self.malformed()),
        }
    }

    fn expect_int(&mut self) -> Result<usize, Error> {
        match self.next() {
            Some(Token::Int(value)) => Ok(value),
            _ => Err(self.malformed()),
        }
    }
}

fn to_vertex(one_indexed: usize) -> Result<usize, Error> {
    one_indexed
        .checked_sub(1)
        .ok_or(Error::InvalidVertex { vertex: 0 })
}

/// Reads a GAP-style graph from a byte buffer.
pub fn read(bytes: &[u8]) -> Result<ColoredGraph, Error> {
    let mut lexer = Lexer::new(bytes);

    lexer.expect_open()?;

    let mut edges = Vec::new();
    while lexer.peek() == Some(Token::Open) {
        lexer.expect_open()?;
        let u = lexer.expect_int()?;
        let v = lexer.expect_int()?;
        lexer.expect_close()?;
        edges.push((to_vertex(u)?, to_vertex(v)?));
    }
    lexer.expect_close()?;

    let node_count = lexer.expect_int()?;

    lexer.expect_open()?;
    let mut colors = vec![0usize; node_count];
    let mut cell = 0;
    while lexer.peek() == Some(Token::Open) {
        lexer.expect_open()?;
        let mut nonempty = false;
        while let Some(Token::Int(value)) = lexer.peek() {
            let vertex = to_vertex(lexer.expect_int()?)?;
            if vertex >= node_count {
                return Err(Error::InvalidVertex { vertex });
            }
            colors[vertex] = cell;
            nonempty = true;
        }
        lexer.expect_close()?;
        if nonempty {
            cell += 1;
        }
    }

    debug!(
        "GAP input: {node_count} nodes, {} edges, {cell} color cells",
        edges.len()
    );

    GraphBuilder::new()
        .node_count(node_count)
        .edges(edges)
        .colors(colors)
        .build()
}

/// Reads a GAP-style graph from a file.
pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<ColoredGraph, Error> {
    let bytes = std::fs::read(path)?;
    read(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_with_one_cell() {
        let graph = read(b"Graph([[1,2],[2,3],[3,1]], 3)), [[1,2,3]]").unwrap();

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(graph.colors(), &[0, 0, 0]);
        assert_eq!(graph.out_neighbors(0), &[1, 2]);
    }

    #[test]
    fn cells_assign_colors() {
        let graph = read(b"[[1,2],[3,4]], 4)), [[1,2],[3],[4]]").unwrap();

        assert_eq!(graph.colors(), &[0, 0, 1, 2]);
    }

    #[test]
    fn empty_cell_consumes_no_color() {
        let graph = read(b"[[1,2]], 2)), [[],[1],[2]]").unwrap();

        assert_eq!(graph.colors(), &[0, 1]);
    }

    #[test]
    fn zero_vertex_is_rejected() {
        let err = read(b"[[0,1]], 2)), [[1,2]]").unwrap_err();

        assert!(matches!(err, Error::InvalidVertex { vertex: 0 }));
    }

    #[test]
    fn missing_edge_component_is_rejected() {
        assert!(read(b"[[1]], 2)), [[1,2]]").is_err());
    }
}
