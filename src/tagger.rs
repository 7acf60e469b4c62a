//! Tier tagger.
//!
//! Clears every tier0 marker, then applies the membership list one pattern
//! per worker. Clearing first makes tagging idempotent: the same list always
//! leaves the same set of marked nodes, whatever earlier runs did.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::membership::{MembershipList, TierPattern};
use crate::pool::WorkerPool;
use crate::store::GraphStore;

/// Error type for tagger operations that abort the run.
#[derive(Debug, thiserror::Error)]
pub enum TaggerError {
    /// Clearing the previous markers failed; tagging on top of stale markers
    /// would not be idempotent.
    #[error("Failed to clear tier0 markers: {0}")]
    Clear(String),
}

/// A pattern that marked more nodes than the broad-match threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadPattern {
    /// Pattern text.
    pub pattern: String,
    /// Nodes it touched.
    pub nodes: u64,
}

/// A pattern whose update failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternFailure {
    /// Pattern text.
    pub pattern: String,
    /// Error message.
    pub error: String,
}

/// Outcome of applying a whole membership list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggingSummary {
    /// Markers removed before tagging.
    pub cleared: u64,
    /// Patterns applied successfully.
    pub patterns_applied: usize,
    /// Sum of nodes touched per pattern (overlaps count once per pattern).
    pub nodes_marked: u64,
    /// Patterns flagged as likely false positives, in list order.
    pub broad_patterns: Vec<BroadPattern>,
    /// Patterns that failed, in list order.
    pub failures: Vec<PatternFailure>,
}

/// Applies and clears tier0 markers.
pub struct TierTagger<S: GraphStore + 'static> {
    store: Arc<S>,
    pool: WorkerPool,
    broad_match_threshold: u64,
}

impl<S: GraphStore + 'static> TierTagger<S> {
    /// Create a tagger.
    pub fn new(store: Arc<S>, pool: WorkerPool, broad_match_threshold: u64) -> Self {
        Self {
            store,
            pool,
            broad_match_threshold,
        }
    }

    /// Remove every tier0 marker.
    pub async fn clear_tier0(&self) -> Result<u64, TaggerError> {
        let cleared = self
            .store
            .clear_tier0()
            .await
            .map_err(|e| TaggerError::Clear(e.to_string()))?;
        info!(cleared, "Cleared existing tier0 markers");
        Ok(cleared)
    }

    /// Apply a single pattern.
    ///
    /// Returns the number of nodes touched and whether the pattern counts as
    /// broad.
    pub async fn tag(&self, pattern: &TierPattern) -> Result<(u64, bool), String> {
        tag_one(self.store.as_ref(), pattern, self.broad_match_threshold).await
    }

    /// Clear all markers, then apply every pattern through the worker pool.
    ///
    /// Returns once every pattern has an outcome. Individual pattern failures
    /// are collected in the summary and do not stop the others.
    pub async fn tag_all(&self, list: &MembershipList) -> Result<TaggingSummary, TaggerError> {
        let cleared = self.clear_tier0().await?;

        let threshold = self.broad_match_threshold;
        let outcomes = self
            .pool
            .run(list.patterns().iter().cloned(), |pattern| {
                let store = Arc::clone(&self.store);
                async move { tag_one(store.as_ref(), &pattern, threshold).await }
            })
            .await;

        let mut summary = TaggingSummary {
            cleared,
            ..TaggingSummary::default()
        };

        for (pattern, outcome) in list.patterns().iter().zip(outcomes) {
            match outcome.map_err(|e| e.to_string()).and_then(|r| r) {
                Ok((nodes, broad)) => {
                    summary.patterns_applied += 1;
                    summary.nodes_marked += nodes;
                    if broad {
                        summary.broad_patterns.push(BroadPattern {
                            pattern: pattern.to_string(),
                            nodes,
                        });
                    }
                }
                Err(error) => {
                    warn!(pattern = %pattern, error = %error, "Failed to apply tier0 pattern");
                    summary.failures.push(PatternFailure {
                        pattern: pattern.to_string(),
                        error,
                    });
                }
            }
        }

        info!(
            patterns = list.len(),
            skipped_short = list.skipped(),
            applied = summary.patterns_applied,
            failed = summary.failures.len(),
            broad = summary.broad_patterns.len(),
            nodes_marked = summary.nodes_marked,
            "Tier0 tagging complete"
        );

        Ok(summary)
    }
}

async fn tag_one<S: GraphStore>(store: &S, pattern: &TierPattern, threshold: u64) -> Result<(u64, bool), String> {
    let nodes = store.mark_tier0(pattern).await.map_err(|e| e.to_string())?;
    let broad = nodes > threshold;
    if broad {
        warn!(
            pattern = %pattern,
            nodes,
            threshold,
            "High false positive marked rate for tier0 pattern"
        );
    } else {
        debug!(pattern = %pattern, nodes, "Applied tier0 pattern");
    }
    Ok((nodes, broad))
}
