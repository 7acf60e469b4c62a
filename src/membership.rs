//! Tier0 membership list.
//!
//! One pattern per line. A pattern containing `@` names a principal exactly
//! (`alice@corp.local`); anything else matches every node whose name contains
//! it (`db-admins` matches `DB-ADMINS-GROUP@CORP.LOCAL`). Both comparisons
//! ignore case. Lines shorter than three characters are skipped because they
//! would match almost everything.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Patterns shorter than this are ignored.
pub const MIN_PATTERN_LEN: usize = 3;

/// Separator that turns a pattern into an exact principal name.
pub const QUALIFIER_SEPARATOR: char = '@';

/// Error type for membership list loading.
#[derive(Debug, thiserror::Error)]
pub enum MembershipError {
    /// Membership file could not be read.
    #[error("Cannot read membership file {path}: {source}")]
    Io {
        /// Path that failed.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// How a pattern is compared against node names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchMode {
    /// Case-insensitive equality.
    Exact,
    /// Case-insensitive substring containment.
    Contains,
}

/// A single membership pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TierPattern {
    text: String,
    mode: MatchMode,
}

impl TierPattern {
    /// Build a pattern, choosing the match mode from its text.
    ///
    /// Returns `None` for patterns that are too short to be useful.
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        if text.chars().count() < MIN_PATTERN_LEN {
            return None;
        }
        let mode = if text.contains(QUALIFIER_SEPARATOR) {
            MatchMode::Exact
        } else {
            MatchMode::Contains
        };
        Some(Self { text, mode })
    }

    /// Pattern text as written in the list.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Match mode.
    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Whether a node name is selected by this pattern.
    pub fn matches(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        let pattern = self.text.to_lowercase();
        match self.mode {
            MatchMode::Exact => name == pattern,
            MatchMode::Contains => name.contains(&pattern),
        }
    }
}

impl fmt::Display for TierPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Parsed membership list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipList {
    patterns: Vec<TierPattern>,
    skipped: usize,
}

impl MembershipList {
    /// Parse a newline-separated membership document.
    pub fn parse(content: &str) -> Self {
        let mut patterns = Vec::new();
        let mut skipped = 0;

        for line in content.split('\n') {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match TierPattern::new(line) {
                Some(pattern) => patterns.push(pattern),
                None => skipped += 1,
            }
        }

        Self { patterns, skipped }
    }

    /// Read and parse a membership file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, MembershipError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| MembershipError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::parse(&content))
    }

    /// Usable patterns, in file order.
    pub fn patterns(&self) -> &[TierPattern] {
        &self.patterns
    }

    /// Number of non-blank lines dropped as too short.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Number of usable patterns.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether there are no usable patterns.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
