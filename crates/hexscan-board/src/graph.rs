//! Pin adjacency derived from the nominal pin spacing.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::pins::PinPosition;

/// Undirected edge between two pins, stored as indices into the pin slice
/// with `a < b`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AdjacencyEdge {
    pub a: usize,
    pub b: usize,
}

/// Adjacency graph over a pin set. Built once, never mutated.
#[derive(Clone, Debug)]
pub struct AdjacencyGraph {
    edges: Vec<AdjacencyEdge>,
    neighbours: Vec<Vec<usize>>,
}

impl AdjacencyGraph {
    /// Connect every unordered pair whose distance lies within `tolerance`
    /// of `spacing`.
    pub fn build(pins: &[PinPosition], spacing: f32, tolerance: f32) -> Self {
        let mut edges = Vec::new();
        let mut neighbours = vec![Vec::new(); pins.len()];
        for i in 0..pins.len() {
            for j in (i + 1)..pins.len() {
                if (pins[i].distance(&pins[j]) - spacing).abs() <= tolerance {
                    edges.push(AdjacencyEdge { a: i, b: j });
                    neighbours[i].push(j);
                    neighbours[j].push(i);
                }
            }
        }
        for n in &mut neighbours {
            n.sort_unstable();
        }
        Self { edges, neighbours }
    }

    pub fn edges(&self) -> &[AdjacencyEdge] {
        &self.edges
    }

    pub fn neighbours(&self, idx: usize) -> &[usize] {
        self.neighbours.get(idx).map(Vec::as_slice).unwrap_or(&[])
    }

    #[inline]
    pub fn are_adjacent(&self, i: usize, j: usize) -> bool {
        self.neighbours(i).binary_search(&j).is_ok()
    }

    /// All 3-cliques as index triples `i < j < k`, in lexicographic order.
    pub fn triangles(&self) -> Vec<[usize; 3]> {
        let mut out = Vec::new();
        for e in &self.edges {
            for &k in self.neighbours(e.b) {
                if k > e.b && self.are_adjacent(e.a, k) {
                    out.push([e.a, e.b, k]);
                }
            }
        }
        out.sort_unstable();
        out
    }
}

/// Centroid of every pin triangle, in the order of
/// [`AdjacencyGraph::triangles`].
pub fn triangle_centers(pins: &[PinPosition], graph: &AdjacencyGraph) -> Vec<Point2<f32>> {
    graph
        .triangles()
        .into_iter()
        .map(|[i, j, k]| {
            Point2::new(
                (pins[i].x + pins[j].x + pins[k].x) / 3.0,
                (pins[i].y + pins[j].y + pins[k].y) / 3.0,
            )
        })
        .collect()
}
