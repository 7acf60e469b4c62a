//! Tier boundary crossings.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::edge::{EdgeId, GraphEdge};
use super::node::GraphNode;

/// Which side of the tier boundary the edge's directed end falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// A non-tier0 principal has an edge pointing at a tier0 node.
    IntoT0,
    /// A tier0 principal has an edge pointing at a non-tier0 node.
    IntoT1,
}

impl Direction {
    /// Both directions, in policy document order.
    pub const ALL: [Direction; 2] = [Self::IntoT0, Self::IntoT1];

    /// Name used in policy documents and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IntoT0 => "IntoT0",
            Self::IntoT1 => "IntoT1",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One raw `(tier0 node, edge, other node)` match returned by a graph store.
///
/// The edge may point either way; direction has not been derived yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryRow {
    /// The tier0 endpoint.
    pub tier0: GraphNode,
    /// The connecting edge.
    pub edge: GraphEdge,
    /// The eligible non-tier0 endpoint.
    pub other: GraphNode,
}

/// A single edge crossing the tier0 boundary, oriented along the edge.
///
/// `start` and `end` follow the edge's own direction, so `start -> end` reads
/// the same way as the relationship in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crossing {
    /// Node the edge starts at.
    pub start: GraphNode,
    /// The crossing edge.
    pub edge: GraphEdge,
    /// Node the edge ends at.
    pub end: GraphNode,
    /// Danger pattern that applies to this crossing.
    pub direction: Direction,
}

impl Crossing {
    /// Create a crossing from already-oriented parts.
    pub fn new(start: GraphNode, edge: GraphEdge, end: GraphNode, direction: Direction) -> Self {
        Self {
            start,
            edge,
            end,
            direction,
        }
    }

    /// Identity of this crossing within one run.
    pub fn key(&self) -> (EdgeId, Direction) {
        (self.edge.id, self.direction)
    }
}

impl fmt::Display for Crossing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -[{}]-> {} ({})",
            self.start.name, self.edge.edge_type, self.end.name, self.direction
        )
    }
}
