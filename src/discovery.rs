//! Crossing discovery.
//!
//! Issues the single boundary query and turns each `(tier0, edge, other)`
//! match into an oriented [`Crossing`]:
//!
//! ```text
//! tier0 -[edge]-> other   => IntoT1  (tier0 reaching outward)
//! other -[edge]-> tier0   => IntoT0  (outsider reaching tier0)
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::store::GraphStore;
use crate::types::{BoundaryRow, Crossing, Direction, EdgeId};

/// Error type for discovery.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// The boundary query failed.
    #[error("Store error: {0}")]
    StoreError(String),
}

impl DiscoveryError {
    /// Create a store error from any error type.
    pub fn from_store<E: std::error::Error>(e: E) -> Self {
        Self::StoreError(e.to_string())
    }
}

/// A boundary row that could not be oriented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossingFailure {
    /// Edge of the rejected row.
    pub edge_id: EdgeId,
    /// Edge type of the rejected row.
    pub edge_type: String,
    /// Tier0 endpoint name.
    pub tier0: String,
    /// Other endpoint name.
    pub other: String,
    /// Reason for rejection.
    pub reason: String,
}

/// Everything one discovery pass produced.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Oriented crossings, in query order.
    pub crossings: Vec<Crossing>,
    /// Rows whose edge did not connect the pair it was returned with.
    pub rejected: Vec<CrossingFailure>,
}

/// Orient one boundary row.
///
/// Fails when the edge does not run between the two nodes it was returned
/// with, which means the store broke its contract for this row.
pub fn orient(row: BoundaryRow) -> Result<Crossing, CrossingFailure> {
    let BoundaryRow { tier0, edge, other } = row;

    if tier0.id == other.id || !edge.touches(tier0.id) || !edge.touches(other.id) {
        return Err(CrossingFailure {
            reason: format!(
                "edge runs {} -> {}, expected endpoints {} and {}",
                edge.start, edge.end, tier0.id, other.id
            ),
            edge_id: edge.id,
            edge_type: edge.edge_type,
            tier0: tier0.name,
            other: other.name,
        });
    }

    if edge.start == tier0.id {
        Ok(Crossing::new(tier0, edge, other, Direction::IntoT1))
    } else {
        Ok(Crossing::new(other, edge, tier0, Direction::IntoT0))
    }
}

/// Finds edges crossing the tier0 boundary.
pub struct CrossingDiscoverer<S: GraphStore> {
    store: Arc<S>,
    eligibility_attribute: String,
}

impl<S: GraphStore> CrossingDiscoverer<S> {
    /// Create a discoverer.
    pub fn new(store: Arc<S>, eligibility_attribute: impl Into<String>) -> Self {
        Self {
            store,
            eligibility_attribute: eligibility_attribute.into(),
        }
    }

    /// Run the boundary query once and orient every row.
    pub async fn discover(&self) -> Result<Discovery, DiscoveryError> {
        let rows = self
            .store
            .boundary_rows(&self.eligibility_attribute)
            .await
            .map_err(DiscoveryError::from_store)?;

        let mut discovery = Discovery::default();
        for row in rows {
            match orient(row) {
                Ok(crossing) => discovery.crossings.push(crossing),
                Err(failure) => {
                    warn!(
                        edge_id = %failure.edge_id,
                        edge_type = %failure.edge_type,
                        tier0 = %failure.tier0,
                        other = %failure.other,
                        reason = %failure.reason,
                        "Rejected boundary row"
                    );
                    discovery.rejected.push(failure);
                }
            }
        }

        info!(
            crossings = discovery.crossings.len(),
            rejected = discovery.rejected.len(),
            eligibility_attribute = %self.eligibility_attribute,
            "Boundary discovery complete"
        );

        Ok(discovery)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::membership::TierPattern;
    use crate::store::InMemoryGraphStore;
    use crate::types::{GraphEdge, GraphNode, NodeId};

    fn row(start: i64, end: i64) -> BoundaryRow {
        let mut tier0 = GraphNode::new(1, "ALICE@CORP.LOCAL").with_domain("CORP.LOCAL");
        tier0.tier0 = true;
        BoundaryRow {
            tier0,
            edge: GraphEdge::new(100, "AdminTo", NodeId::new(start), NodeId::new(end), false),
            other: GraphNode::new(2, "WORKSTATION1").with_domain("CORP.LOCAL"),
        }
    }

    #[test]
    fn test_edge_ending_at_outsider_is_into_t1() {
        let crossing = orient(row(1, 2)).unwrap();
        assert_eq!(crossing.direction, Direction::IntoT1);
        assert_eq!(crossing.start.name, "ALICE@CORP.LOCAL");
        assert_eq!(crossing.end.name, "WORKSTATION1");
    }

    #[test]
    fn test_edge_ending_at_tier0_is_into_t0() {
        let crossing = orient(row(2, 1)).unwrap();
        assert_eq!(crossing.direction, Direction::IntoT0);
        assert_eq!(crossing.start.name, "WORKSTATION1");
        assert_eq!(crossing.end.name, "ALICE@CORP.LOCAL");
    }

    #[test]
    fn test_edge_touching_one_endpoint_is_rejected() {
        let failure = orient(row(1, 1)).unwrap_err();
        assert_eq!(failure.edge_id, EdgeId::new(100));
        assert_eq!(failure.other, "WORKSTATION1");
    }

    #[test]
    fn test_detached_edge_is_rejected() {
        let failure = orient(row(2, 3)).unwrap_err();
        assert_eq!(failure.edge_id, EdgeId::new(100));
        assert_eq!(failure.tier0, "ALICE@CORP.LOCAL");
    }

    #[tokio::test]
    async fn test_parallel_edges_yield_separate_crossings() {
        let mut store = InMemoryGraphStore::new();
        store.add_node(GraphNode::new(1, "ALICE@CORP.LOCAL").with_domain("CORP.LOCAL"));
        store.add_node(GraphNode::new(2, "WORKSTATION1").with_domain("CORP.LOCAL"));
        store.add_edge(GraphEdge::new(10, "AdminTo", NodeId::new(2), NodeId::new(1), false)).unwrap();
        store.add_edge(GraphEdge::new(11, "HasSession", NodeId::new(2), NodeId::new(1), false)).unwrap();
        store.add_edge(GraphEdge::new(12, "GenericAll", NodeId::new(1), NodeId::new(2), true)).unwrap();
        let store = Arc::new(store);
        store.mark_tier0(&TierPattern::new("alice@corp.local").unwrap()).await.unwrap();

        let discovery = CrossingDiscoverer::new(store, "domain").discover().await.unwrap();

        let directions: Vec<_> = discovery.crossings.iter().map(|c| c.direction).collect();
        assert_eq!(directions, vec![Direction::IntoT0, Direction::IntoT0, Direction::IntoT1]);
        assert!(discovery.rejected.is_empty());
    }

    #[tokio::test]
    async fn test_eligibility_attribute_is_configurable() {
        let mut store = InMemoryGraphStore::new();
        store.add_node(GraphNode::new(1, "ALICE@CORP.LOCAL"));
        store.add_node(GraphNode::new(2, "SUB-ROLE").with_property("tenantid", "abc"));
        store.add_edge(GraphEdge::new(10, "AZRunsAs", NodeId::new(2), NodeId::new(1), false)).unwrap();
        let store = Arc::new(store);
        store.mark_tier0(&TierPattern::new("alice@corp.local").unwrap()).await.unwrap();

        let by_domain = CrossingDiscoverer::new(Arc::clone(&store), "domain").discover().await.unwrap();
        let by_tenant = CrossingDiscoverer::new(store, "tenantid").discover().await.unwrap();

        assert!(by_domain.crossings.is_empty());
        assert_eq!(by_tenant.crossings.len(), 1);
    }
}
