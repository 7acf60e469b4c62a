//! # tier0-audit
//!
//! Boundary-crossing audit for identity and privilege graphs.
//!
//! The auditor answers one question:
//!
//! > Which single edges let something outside tier0 reach into it, or let
//! > tier0 reach out to something it should not touch?
//!
//! ## Core Contract
//!
//! 1. Reset and re-apply the tier0 marker from a membership list
//! 2. Find every edge joining a tier0 node to an eligible non-tier0 node
//! 3. Classify each crossing against a direction-aware policy matrix
//! 4. Emit the dangerous crossings as a deterministically ordered report
//!
//! ## Architecture
//!
//! ```text
//! MembershipList → TierTagger → CrossingDiscoverer → ClassificationEngine → Report
//!                       ↓               ↓                    ↓
//!                  GraphStore (Postgres or Memory)      PolicyMatrix, FindingsSet
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Same membership list → same tier0 set, regardless of earlier runs
//! - Same findings → same report rows in the same order, whatever the
//!   worker count or scheduling

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod policy;
pub mod membership;
pub mod config;
pub mod store;
pub mod pool;
pub mod tagger;
pub mod discovery;
pub mod findings;
pub mod engine;
pub mod report;
pub mod audit;
pub mod canonical;

// Re-exports
pub use types::{NodeId, GraphNode, EdgeId, EdgeType, GraphEdge, BoundaryRow, Crossing, Direction};
pub use policy::{PolicyMatrix, DirectionPolicy, PolicyError};
pub use membership::{MembershipList, TierPattern, MatchMode, MembershipError};
pub use config::AuditConfig;
pub use store::{GraphStore, InMemoryGraphStore};
#[cfg(feature = "postgres")]
pub use store::PostgresGraphStore;
pub use pool::{WorkerPool, WorkerFailure};
pub use tagger::{TierTagger, TaggingSummary, BroadPattern, PatternFailure, TaggerError};
pub use discovery::{CrossingDiscoverer, Discovery, CrossingFailure, DiscoveryError, orient};
pub use findings::FindingsSet;
pub use engine::{ClassificationEngine, ClassificationSummary, ClassificationFailure, Verdict};
pub use report::{Report, ReportRow, ReportFormat, report_file_name, CSV_HEADER};
pub use audit::{AuditRun, AuditOutcome, AuditError};
pub use canonical::{to_canonical_bytes, canonical_hash, canonical_hash_hex};
