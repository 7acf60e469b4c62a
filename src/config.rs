//! Run configuration.
//!
//! All settings can be configured via environment variables:
//! - `AUDIT_MAX_CONCURRENCY`: Worker pool size for tagging and classification (default: 16)
//! - `AUDIT_ELIGIBILITY_ATTRIBUTE`: Node attribute a non-tier0 node needs to be
//!   considered by discovery (default: `domain`)
//! - `AUDIT_BROAD_MATCH_THRESHOLD`: Nodes a single pattern may mark before it is
//!   reported as a likely false positive (default: 5)

use serde::{Deserialize, Serialize};

/// Default worker pool size.
pub const DEFAULT_MAX_CONCURRENCY: usize = 16;

/// Default eligibility attribute.
pub const DEFAULT_ELIGIBILITY_ATTRIBUTE: &str = "domain";

/// Default broad-pattern threshold.
pub const DEFAULT_BROAD_MATCH_THRESHOLD: u64 = 5;

/// Tunables for one audit run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Maximum concurrent workers per batch. Also caps concurrent store sessions.
    pub max_concurrency: usize,
    /// Attribute a non-tier0 node must carry to be in scope.
    pub eligibility_attribute: String,
    /// A pattern marking more nodes than this is flagged as broad.
    pub broad_match_threshold: u64,
}

impl AuditConfig {
    /// Load configuration from environment variables with defaults.
    pub fn from_env() -> Self {
        Self {
            max_concurrency: std::env::var("AUDIT_MAX_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MAX_CONCURRENCY),
            eligibility_attribute: std::env::var("AUDIT_ELIGIBILITY_ATTRIBUTE")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_ELIGIBILITY_ATTRIBUTE.to_string()),
            broad_match_threshold: std::env::var("AUDIT_BROAD_MATCH_THRESHOLD")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_BROAD_MATCH_THRESHOLD),
        }
        .normalized()
    }

    /// Override the worker pool size.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self.normalized()
    }

    /// Override the eligibility attribute.
    pub fn with_eligibility_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.eligibility_attribute = attribute.into();
        self
    }

    /// A pool of zero workers would never make progress.
    fn normalized(mut self) -> Self {
        self.max_concurrency = self.max_concurrency.max(1);
        self
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            eligibility_attribute: DEFAULT_ELIGIBILITY_ATTRIBUTE.to_string(),
            broad_match_threshold: DEFAULT_BROAD_MATCH_THRESHOLD,
        }
    }
}
