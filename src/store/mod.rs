//! Graph storage backends.

pub mod memory;

#[cfg(feature = "postgres")]
pub mod postgres;

use async_trait::async_trait;
use crate::membership::TierPattern;
use crate::types::BoundaryRow;

/// Trait for graph storage backends.
///
/// Every method runs as its own unit of work: an implementation acquires a
/// session, runs one transaction and releases the session before returning,
/// so concurrent callers never share a session.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Error type for store operations.
    type Error: std::error::Error + Send + Sync;

    /// Remove the tier0 marker from every node carrying it.
    ///
    /// Returns the number of nodes cleared.
    async fn clear_tier0(&self) -> Result<u64, Self::Error>;

    /// Set the tier0 marker on every node whose name matches the pattern.
    ///
    /// Returns the number of nodes the pattern touched, including nodes that
    /// were already marked by an earlier pattern.
    async fn mark_tier0(&self, pattern: &TierPattern) -> Result<u64, Self::Error>;

    /// Fetch every edge joining a tier0 node to an unmarked node that carries
    /// `eligibility_attribute`, in either direction.
    async fn boundary_rows(&self, eligibility_attribute: &str) -> Result<Vec<BoundaryRow>, Self::Error>;
}

pub use memory::InMemoryGraphStore;

#[cfg(feature = "postgres")]
pub use postgres::PostgresGraphStore;
