//! Classification engine.
//!
//! Each crossing is looked up in the policy matrix by its direction and edge
//! type. Edge types outside the vocabulary are never dangerous: one odd
//! relationship in the graph must not take down the whole audit.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::findings::FindingsSet;
use crate::policy::PolicyMatrix;
use crate::pool::WorkerPool;
use crate::types::Crossing;

/// Result of classifying one crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    /// The policy flags this crossing.
    Dangerous,
    /// The policy allows this crossing.
    Allowed,
    /// The edge type is not in the vocabulary; treated as allowed.
    Unlisted,
}

/// A crossing whose classification worker failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationFailure {
    /// Human-readable crossing.
    pub crossing: String,
    /// Error message.
    pub error: String,
}

/// Outcome of classifying a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationSummary {
    /// Crossings with a verdict.
    pub evaluated: usize,
    /// Crossings newly recorded as findings.
    pub dangerous: usize,
    /// Crossings the policy allows.
    pub allowed: usize,
    /// Unlisted edge types and how often each was seen.
    pub unlisted: BTreeMap<String, usize>,
    /// Dangerous crossings already present in the findings set.
    pub duplicates: usize,
    /// Crossings whose worker failed.
    pub failures: Vec<ClassificationFailure>,
}

/// Classifies crossings against an immutable policy matrix.
pub struct ClassificationEngine {
    policy: Arc<PolicyMatrix>,
    pool: WorkerPool,
}

impl ClassificationEngine {
    /// Create an engine.
    pub fn new(policy: Arc<PolicyMatrix>, pool: WorkerPool) -> Self {
        Self { policy, pool }
    }

    /// Classify one crossing without recording it.
    pub fn classify(&self, crossing: &Crossing) -> Verdict {
        verdict_for(&self.policy, crossing)
    }

    /// Classify every crossing through the worker pool, inserting dangerous
    /// ones into `findings`.
    ///
    /// Returns after all workers have finished.
    pub async fn classify_all(&self, crossings: Vec<Crossing>, findings: &FindingsSet) -> ClassificationSummary {
        let labels: Vec<String> = crossings.iter().map(ToString::to_string).collect();
        let edge_types: Vec<String> = crossings.iter().map(|c| c.edge.edge_type.clone()).collect();

        let outcomes = self
            .pool
            .run(crossings, |crossing| {
                let policy = Arc::clone(&self.policy);
                let findings = findings.clone();
                async move {
                    let verdict = verdict_for(&policy, &crossing);
                    let inserted = verdict == Verdict::Dangerous && findings.insert(crossing);
                    (verdict, inserted)
                }
            })
            .await;

        let mut summary = ClassificationSummary::default();
        for ((label, edge_type), outcome) in labels.into_iter().zip(edge_types).zip(outcomes) {
            match outcome {
                Ok((verdict, inserted)) => {
                    summary.evaluated += 1;
                    match verdict {
                        Verdict::Dangerous if inserted => summary.dangerous += 1,
                        Verdict::Dangerous => {
                            debug!(crossing = %label, "Crossing already recorded");
                            summary.duplicates += 1;
                        }
                        Verdict::Allowed => summary.allowed += 1,
                        Verdict::Unlisted => {
                            *summary.unlisted.entry(edge_type).or_default() += 1;
                        }
                    }
                }
                Err(e) => {
                    warn!(crossing = %label, error = %e, "Failed to classify crossing");
                    summary.failures.push(ClassificationFailure {
                        crossing: label,
                        error: e.to_string(),
                    });
                }
            }
        }

        if !summary.unlisted.is_empty() {
            let edge_types: Vec<&String> = summary.unlisted.keys().collect();
            info!(
                edge_types = ?edge_types,
                "Edge types outside the policy vocabulary were treated as allowed"
            );
        }
        info!(
            evaluated = summary.evaluated,
            dangerous = summary.dangerous,
            allowed = summary.allowed,
            failed = summary.failures.len(),
            workers = self.pool.size(),
            "Classification complete"
        );

        summary
    }
}

fn verdict_for(policy: &PolicyMatrix, crossing: &Crossing) -> Verdict {
    match policy.is_dangerous(crossing.direction, &crossing.edge.edge_type) {
        Some(true) => Verdict::Dangerous,
        Some(false) => Verdict::Allowed,
        None => {
            debug!(edge_type = %crossing.edge.edge_type, "Unlisted edge type");
            Verdict::Unlisted
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Direction, EdgeType, GraphEdge, GraphNode, NodeId};

    fn crossing(edge_id: i64, edge_type: &str, direction: Direction) -> Crossing {
        Crossing::new(
            GraphNode::new(1, "WORKSTATION1"),
            GraphEdge::new(edge_id, edge_type, NodeId::new(1), NodeId::new(2), false),
            GraphNode::new(2, "ALICE@CORP.LOCAL"),
            direction,
        )
    }

    fn engine(workers: usize) -> ClassificationEngine {
        let policy = PolicyMatrix::permissive()
            .with_flag(Direction::IntoT0, EdgeType::AdminTo, true)
            .with_flag(Direction::IntoT1, EdgeType::HasSession, true);
        ClassificationEngine::new(Arc::new(policy), WorkerPool::new(workers))
    }

    #[test]
    fn test_verdict_depends_on_direction() {
        let engine = engine(1);
        assert_eq!(engine.classify(&crossing(1, "AdminTo", Direction::IntoT0)), Verdict::Dangerous);
        assert_eq!(engine.classify(&crossing(2, "AdminTo", Direction::IntoT1)), Verdict::Allowed);
        assert_eq!(engine.classify(&crossing(3, "HasSession", Direction::IntoT1)), Verdict::Dangerous);
    }

    #[test]
    fn test_unknown_edge_type_fails_open() {
        let engine = engine(1);
        assert_eq!(engine.classify(&crossing(1, "HasSIDHistory", Direction::IntoT0)), Verdict::Unlisted);
    }

    #[tokio::test]
    async fn test_classify_all_counts() {
        let engine = engine(3);
        let findings = FindingsSet::new();
        let crossings = vec![
            crossing(1, "AdminTo", Direction::IntoT0),
            crossing(2, "MemberOf", Direction::IntoT0),
            crossing(3, "HasSession", Direction::IntoT1),
            crossing(4, "HasSIDHistory", Direction::IntoT0),
            crossing(5, "HasSIDHistory", Direction::IntoT1),
        ];

        let summary = engine.classify_all(crossings, &findings).await;

        assert_eq!(summary.evaluated, 5);
        assert_eq!(summary.dangerous, 2);
        assert_eq!(summary.allowed, 1);
        assert_eq!(summary.unlisted.get("HasSIDHistory"), Some(&2));
        assert!(summary.failures.is_empty());
        assert_eq!(findings.len(), 2);
    }

    #[tokio::test]
    async fn test_repeated_crossing_recorded_once() {
        let engine = engine(4);
        let findings = FindingsSet::new();
        let crossings = vec![
            crossing(1, "AdminTo", Direction::IntoT0),
            crossing(1, "AdminTo", Direction::IntoT0),
        ];

        let summary = engine.classify_all(crossings, &findings).await;

        assert_eq!(summary.dangerous, 1);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(findings.len(), 1);
    }
}
