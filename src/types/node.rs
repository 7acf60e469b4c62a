//! Node types for the privilege graph.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Database-assigned identifier of a graph node.
///
/// Implements `Ord` so node collections iterate deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(i64);

impl NodeId {
    /// Create a new NodeId.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw database id.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for NodeId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A principal or resource in the privilege graph (account, group, host, cloud role).
///
/// Only the tier tagger changes `tier0`; everything else is read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Database-assigned identity.
    pub id: NodeId,
    /// Display name, compared case-insensitively.
    pub name: String,
    /// Free-form node attributes (`domain`, `objectid`, ...).
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
    /// Tier0 marker.
    #[serde(default)]
    pub tier0: bool,
}

impl GraphNode {
    /// Create a node with no attributes.
    pub fn new(id: impl Into<NodeId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            properties: BTreeMap::new(),
            tier0: false,
        }
    }

    /// Set an attribute (builder style).
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Set the `domain` attribute (builder style).
    pub fn with_domain(self, domain: impl Into<String>) -> Self {
        let domain: String = domain.into();
        self.with_property("domain", domain)
    }

    /// Whether the node carries the named attribute at all.
    ///
    /// A JSON `null` counts as absent, matching graph databases that drop
    /// null-valued properties.
    pub fn has_property(&self, key: &str) -> bool {
        self.properties
            .get(key)
            .map(|v| !v.is_null())
            .unwrap_or(false)
    }

    /// The `domain` attribute, if present and a string.
    pub fn domain(&self) -> Option<&str> {
        self.properties.get("domain").and_then(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_property_treats_null_as_absent() {
        let node = GraphNode::new(1, "HOST1")
            .with_property("domain", serde_json::Value::Null)
            .with_property("enabled", true);

        assert!(!node.has_property("domain"));
        assert!(node.has_property("enabled"));
        assert!(!node.has_property("missing"));
    }

    #[test]
    fn test_domain_accessor() {
        let node = GraphNode::new(7, "ALICE@CORP.LOCAL").with_domain("CORP.LOCAL");
        assert_eq!(node.domain(), Some("CORP.LOCAL"));
        assert!(!node.tier0);
    }
}
