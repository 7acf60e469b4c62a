//! Audit run orchestration.
//!
//! ```text
//! clear ─► tag patterns (pool) ─► barrier ─► discover ─► classify (pool) ─► barrier ─► report
//! ```
//!
//! Discovery reads the markers tagging writes, so it only starts once every
//! tagging worker has finished. The report is only built once every
//! classification worker has finished.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::config::AuditConfig;
use crate::discovery::{CrossingDiscoverer, CrossingFailure, DiscoveryError};
use crate::engine::{ClassificationEngine, ClassificationSummary};
use crate::findings::FindingsSet;
use crate::membership::MembershipList;
use crate::policy::PolicyMatrix;
use crate::pool::WorkerPool;
use crate::report::Report;
use crate::store::GraphStore;
use crate::tagger::{TaggerError, TaggingSummary, TierTagger};
use crate::types::Direction;

/// Error type for failures that abort a run.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// Tier0 markers could not be reset.
    #[error(transparent)]
    Tagging(#[from] TaggerError),
    /// The boundary query failed.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
}

/// Everything a completed run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditOutcome {
    /// Identifier of the run (also on its tracing span).
    pub run_id: Uuid,
    /// Ordered dangerous crossings.
    pub report: Report,
    /// Tagging results.
    pub tagging: TaggingSummary,
    /// Boundary rows that could not be oriented.
    pub rejected_crossings: Vec<CrossingFailure>,
    /// Classification results.
    pub classification: ClassificationSummary,
}

impl AuditOutcome {
    /// Number of dangerous crossings found.
    pub fn dangerous_crossings(&self) -> usize {
        self.report.len()
    }

    /// Items that failed and are missing from the report.
    pub fn failed_items(&self) -> usize {
        self.tagging.failures.len()
            + self.rejected_crossings.len()
            + self.classification.failures.len()
    }

    /// Whether any item failed.
    pub fn is_complete(&self) -> bool {
        self.failed_items() == 0
    }
}

/// Context for one audit run.
///
/// Holds the store, the loaded policy and the findings aggregate for the
/// duration of the run. Nothing here outlives [`AuditRun::execute`] except
/// the tier0 markers in the graph itself.
pub struct AuditRun<S: GraphStore + 'static> {
    run_id: Uuid,
    store: Arc<S>,
    policy: Arc<PolicyMatrix>,
    config: AuditConfig,
    findings: FindingsSet,
}

impl<S: GraphStore + 'static> AuditRun<S> {
    /// Create a run context.
    pub fn new(store: Arc<S>, policy: PolicyMatrix, config: AuditConfig) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            store,
            policy: Arc::new(policy),
            config,
            findings: FindingsSet::new(),
        }
    }

    /// Identifier of this run.
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Tag, discover, classify and shape the report.
    pub async fn execute(self, membership: &MembershipList) -> Result<AuditOutcome, AuditError> {
        let span = info_span!("audit", run_id = %self.run_id);
        self.execute_inner(membership).instrument(span).await
    }

    async fn execute_inner(self, membership: &MembershipList) -> Result<AuditOutcome, AuditError> {
        let pool = WorkerPool::new(self.config.max_concurrency);
        info!(
            policy_fingerprint = %self.policy.fingerprint(),
            patterns = membership.len(),
            workers = pool.size(),
            "Starting tier0 audit"
        );
        for direction in Direction::ALL {
            let flagged: Vec<&str> = self
                .policy
                .direction(direction)
                .dangerous_types()
                .iter()
                .map(|t| t.as_str())
                .collect();
            info!(%direction, dangerous_types = ?flagged, "Policy direction loaded");
        }

        let tagger = TierTagger::new(
            Arc::clone(&self.store),
            pool.clone(),
            self.config.broad_match_threshold,
        );
        let tagging = tagger.tag_all(membership).await?;

        let discoverer = CrossingDiscoverer::new(
            Arc::clone(&self.store),
            self.config.eligibility_attribute.clone(),
        );
        let discovery = discoverer.discover().await?;

        let engine = ClassificationEngine::new(Arc::clone(&self.policy), pool);
        let classification = engine.classify_all(discovery.crossings, &self.findings).await;

        let report = Report::from_findings(&self.findings);
        let outcome = AuditOutcome {
            run_id: self.run_id,
            report,
            tagging,
            rejected_crossings: discovery.rejected,
            classification,
        };

        info!(
            dangerous_crossings = outcome.dangerous_crossings(),
            failed_items = outcome.failed_items(),
            report_fingerprint = %outcome.report.fingerprint(),
            "Tier0 audit complete"
        );

        Ok(outcome)
    }
}
