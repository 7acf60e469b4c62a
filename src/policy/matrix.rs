//! Direction-aware policy matrix.
//!
//! ## Document Shape
//!
//! ```json
//! {
//!   "IntoT0": { "AdminTo": true, "MemberOf": true, "HasSession": false },
//!   "IntoT1": { "HasSession": true }
//! }
//! ```
//!
//! Both direction sections are required. Edge types a section leaves out
//! are not dangerous. Keys must come from the [`EdgeType`] vocabulary: a
//! misspelled type would otherwise silently disable a rule.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::canonical::canonical_hash_hex;
use crate::types::{Direction, EdgeType};

/// Error type for policy loading.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    /// Policy file could not be read.
    #[error("Cannot read policy file {path}: {source}")]
    Io {
        /// Path that failed.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Policy document is not valid JSON or has the wrong shape.
    #[error("Malformed policy document: {0}")]
    Malformed(#[from] serde_json::Error),
    /// Policy names an edge type outside the vocabulary.
    #[error("Unknown edge type {name:?} in {direction} policy")]
    UnknownEdgeType {
        /// Section the key appeared in.
        direction: Direction,
        /// The offending key.
        name: String,
    },
}

/// Danger flags for one direction.
///
/// Always holds an entry for every vocabulary type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DirectionPolicy {
    flags: BTreeMap<EdgeType, bool>,
}

impl DirectionPolicy {
    /// A policy where nothing is dangerous.
    pub fn permissive() -> Self {
        Self {
            flags: EdgeType::ALL.iter().map(|t| (*t, false)).collect(),
        }
    }

    /// Danger flag for a vocabulary type.
    pub fn get(&self, edge_type: EdgeType) -> bool {
        self.flags.get(&edge_type).copied().unwrap_or(false)
    }

    /// Set the danger flag for a vocabulary type.
    pub fn set(&mut self, edge_type: EdgeType, dangerous: bool) {
        self.flags.insert(edge_type, dangerous);
    }

    /// Edge types flagged as dangerous, in vocabulary order.
    pub fn dangerous_types(&self) -> Vec<EdgeType> {
        self.flags
            .iter()
            .filter(|(_, dangerous)| **dangerous)
            .map(|(t, _)| *t)
            .collect()
    }

    fn from_raw(direction: Direction, raw: BTreeMap<String, bool>) -> Result<Self, PolicyError> {
        let mut policy = Self::permissive();
        for (name, dangerous) in raw {
            let edge_type = EdgeType::parse(&name)
                .ok_or(PolicyError::UnknownEdgeType { direction, name })?;
            policy.set(edge_type, dangerous);
        }
        Ok(policy)
    }
}

impl Default for DirectionPolicy {
    fn default() -> Self {
        Self::permissive()
    }
}

/// Wire form of the policy document.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPolicyDocument {
    #[serde(rename = "IntoT0")]
    into_t0: BTreeMap<String, bool>,
    #[serde(rename = "IntoT1")]
    into_t1: BTreeMap<String, bool>,
}

/// Immutable lookup table from `(direction, edge type)` to "is dangerous".
///
/// Built once at startup and shared read-only (behind an `Arc`) by every
/// classification worker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PolicyMatrix {
    #[serde(rename = "IntoT0")]
    into_t0: DirectionPolicy,
    #[serde(rename = "IntoT1")]
    into_t1: DirectionPolicy,
}

impl PolicyMatrix {
    /// A matrix where nothing is dangerous.
    pub fn permissive() -> Self {
        Self::default()
    }

    /// Parse and validate a policy document.
    pub fn from_json(json: &str) -> Result<Self, PolicyError> {
        let raw: RawPolicyDocument = serde_json::from_str(json)?;
        Ok(Self {
            into_t0: DirectionPolicy::from_raw(Direction::IntoT0, raw.into_t0)?,
            into_t1: DirectionPolicy::from_raw(Direction::IntoT1, raw.into_t1)?,
        })
    }

    /// Read, parse and validate a policy file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Set a flag (builder style).
    pub fn with_flag(mut self, direction: Direction, edge_type: EdgeType, dangerous: bool) -> Self {
        self.direction_mut(direction).set(edge_type, dangerous);
        self
    }

    /// Policy for one direction.
    pub fn direction(&self, direction: Direction) -> &DirectionPolicy {
        match direction {
            Direction::IntoT0 => &self.into_t0,
            Direction::IntoT1 => &self.into_t1,
        }
    }

    fn direction_mut(&mut self, direction: Direction) -> &mut DirectionPolicy {
        match direction {
            Direction::IntoT0 => &mut self.into_t0,
            Direction::IntoT1 => &mut self.into_t1,
        }
    }

    /// Look up a raw edge type string.
    ///
    /// Returns `None` when the type is outside the vocabulary; callers treat
    /// that as not dangerous.
    pub fn is_dangerous(&self, direction: Direction, edge_type: &str) -> Option<bool> {
        EdgeType::parse(edge_type).map(|t| self.direction(direction).get(t))
    }

    /// Stable hash of the matrix contents.
    pub fn fingerprint(&self) -> String {
        canonical_hash_hex(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "IntoT0": { "AdminTo": true, "MemberOf": true, "HasSession": false },
        "IntoT1": { "HasSession": true }
    }"#;

    #[test]
    fn test_from_json_applies_flags() {
        let matrix = PolicyMatrix::from_json(SAMPLE).unwrap();

        assert_eq!(matrix.is_dangerous(Direction::IntoT0, "AdminTo"), Some(true));
        assert_eq!(matrix.is_dangerous(Direction::IntoT0, "HasSession"), Some(false));
        assert_eq!(matrix.is_dangerous(Direction::IntoT1, "HasSession"), Some(true));
        assert_eq!(matrix.is_dangerous(Direction::IntoT1, "AdminTo"), Some(false));
    }

    #[test]
    fn test_omitted_types_default_to_safe() {
        let matrix = PolicyMatrix::from_json(SAMPLE).unwrap();
        assert_eq!(matrix.is_dangerous(Direction::IntoT0, "DCSync"), Some(false));
    }

    #[test]
    fn test_unknown_type_lookup_is_none() {
        let matrix = PolicyMatrix::from_json(SAMPLE).unwrap();
        assert_eq!(matrix.is_dangerous(Direction::IntoT0, "HasSIDHistory"), None);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = PolicyMatrix::from_json(r#"{"IntoT0": {"AdminT0": true}, "IntoT1": {}}"#)
            .unwrap_err();
        match err {
            PolicyError::UnknownEdgeType { direction, name } => {
                assert_eq!(direction, Direction::IntoT0);
                assert_eq!(name, "AdminT0");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_section_is_malformed() {
        let err = PolicyMatrix::from_json(r#"{"IntoT0": {}}"#).unwrap_err();
        assert!(matches!(err, PolicyError::Malformed(_)));
    }

    #[test]
    fn test_non_boolean_flag_is_malformed() {
        let err = PolicyMatrix::from_json(r#"{"IntoT0": {"AdminTo": "yes"}, "IntoT1": {}}"#)
            .unwrap_err();
        assert!(matches!(err, PolicyError::Malformed(_)));
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = PolicyMatrix::from_json(SAMPLE).unwrap();
        let b = PolicyMatrix::from_json(SAMPLE).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());

        let c = a.clone().with_flag(Direction::IntoT1, EdgeType::Owns, true);
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_shipped_config_is_valid() {
        let matrix = PolicyMatrix::from_json(include_str!("../../config.json")).unwrap();
        assert_eq!(matrix.is_dangerous(Direction::IntoT0, "DCSync"), Some(true));
        assert_eq!(matrix.is_dangerous(Direction::IntoT0, "TrustedBy"), Some(false));
    }

    #[test]
    fn test_dangerous_types_sorted() {
        let matrix = PolicyMatrix::from_json(SAMPLE).unwrap();
        assert_eq!(
            matrix.direction(Direction::IntoT0).dangerous_types(),
            vec![EdgeType::AdminTo, EdgeType::MemberOf]
        );
    }
}
