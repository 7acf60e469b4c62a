//! Core types for the tier0 auditor.

pub mod node;
pub mod edge;
pub mod crossing;

pub use node::{NodeId, GraphNode};
pub use edge::{EdgeId, EdgeType, GraphEdge};
pub use crossing::{BoundaryRow, Crossing, Direction};
