//! In-memory graph store for testing.

use std::collections::BTreeMap;
use async_trait::async_trait;
use parking_lot::RwLock;

use crate::membership::TierPattern;
use crate::types::{BoundaryRow, GraphEdge, GraphNode, NodeId};
use super::GraphStore;

/// Error type for in-memory store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InMemoryError {
    /// Edge references a node that was never added.
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),
}

/// In-memory graph store for testing.
///
/// Uses a BTreeMap for deterministic node iteration. Nodes sit behind a lock
/// so marker updates can run through `&self` like a real database.
#[derive(Debug, Default)]
pub struct InMemoryGraphStore {
    /// Nodes by ID.
    nodes: RwLock<BTreeMap<NodeId, GraphNode>>,
    /// All edges, in insertion order.
    edges: Vec<GraphEdge>,
}

impl InMemoryGraphStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node to the store, replacing any node with the same id.
    pub fn add_node(&mut self, node: GraphNode) {
        self.nodes.get_mut().insert(node.id, node);
    }

    /// Add an edge to the store. Both endpoints must already exist.
    pub fn add_edge(&mut self, edge: GraphEdge) -> Result<(), InMemoryError> {
        let nodes = self.nodes.get_mut();
        for id in [edge.start, edge.end] {
            if !nodes.contains_key(&id) {
                return Err(InMemoryError::NodeNotFound(id));
            }
        }
        self.edges.push(edge);
        Ok(())
    }

    /// Names of all tier0 nodes, sorted.
    pub fn tier0_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .nodes
            .read()
            .values()
            .filter(|n| n.tier0)
            .map(|n| n.name.clone())
            .collect();
        names.sort();
        names
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    type Error = InMemoryError;

    async fn clear_tier0(&self) -> Result<u64, Self::Error> {
        let mut cleared = 0;
        for node in self.nodes.write().values_mut().filter(|n| n.tier0) {
            node.tier0 = false;
            cleared += 1;
        }
        Ok(cleared)
    }

    async fn mark_tier0(&self, pattern: &TierPattern) -> Result<u64, Self::Error> {
        let mut touched = 0;
        for node in self.nodes.write().values_mut() {
            if pattern.matches(&node.name) {
                node.tier0 = true;
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn boundary_rows(&self, eligibility_attribute: &str) -> Result<Vec<BoundaryRow>, Self::Error> {
        let nodes = self.nodes.read();
        let mut rows = Vec::new();

        for edge in &self.edges {
            let (Some(a), Some(b)) = (nodes.get(&edge.start), nodes.get(&edge.end)) else {
                continue;
            };
            // At most one orientation can hold since exactly one side is tier0.
            for (m, x) in [(a, b), (b, a)] {
                if m.tier0 && !x.tier0 && x.has_property(eligibility_attribute) {
                    rows.push(BoundaryRow {
                        tier0: m.clone(),
                        edge: edge.clone(),
                        other: x.clone(),
                    });
                }
            }
        }

        Ok(rows)
    }
}
