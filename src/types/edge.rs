//! Edge types for the privilege graph.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::node::NodeId;

/// Known relationship kinds between principals.
///
/// This is the closed vocabulary a policy matrix may name. Edges in the graph
/// may still carry a type outside this set; those are kept as raw strings on
/// [`GraphEdge`] and never classified as dangerous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum EdgeType {
    AdminTo,
    MemberOf,
    HasSession,
    ForceChangePassword,
    AddMembers,
    AddSelf,
    CanRDP,
    CanPSRemote,
    ExecuteDCOM,
    SQLAdmin,
    AllowedToDelegate,
    DCSync,
    GetChanges,
    GetChangesAll,
    GenericAll,
    WriteDacl,
    GenericWrite,
    WriteOwner,
    WriteSPN,
    Owns,
    AddKeyCredentialLink,
    ReadLAPSPassword,
    ReadGMSAPassword,
    Contains,
    AllExtendedRights,
    GPLink,
    AllowedToAct,
    AddAllowedToAct,
    TrustedBy,
    SyncLAPSPassword,
    AZAddMembers,
    AZAppAdmin,
    AZCloudAppAdmin,
    AZContains,
    AZContributor,
    AZGetCertificates,
    AZGetKeys,
    AZGetSecrets,
    AZGlobalAdmin,
    AZPrivilegedRoleAdmin,
    AZResetPassword,
    AZRunsAs,
    AZUserAccessAdministrator,
}

impl EdgeType {
    /// Every edge type in the vocabulary, in declaration order.
    pub const ALL: [EdgeType; 43] = [
        Self::AdminTo,
        Self::MemberOf,
        Self::HasSession,
        Self::ForceChangePassword,
        Self::AddMembers,
        Self::AddSelf,
        Self::CanRDP,
        Self::CanPSRemote,
        Self::ExecuteDCOM,
        Self::SQLAdmin,
        Self::AllowedToDelegate,
        Self::DCSync,
        Self::GetChanges,
        Self::GetChangesAll,
        Self::GenericAll,
        Self::WriteDacl,
        Self::GenericWrite,
        Self::WriteOwner,
        Self::WriteSPN,
        Self::Owns,
        Self::AddKeyCredentialLink,
        Self::ReadLAPSPassword,
        Self::ReadGMSAPassword,
        Self::Contains,
        Self::AllExtendedRights,
        Self::GPLink,
        Self::AllowedToAct,
        Self::AddAllowedToAct,
        Self::TrustedBy,
        Self::SyncLAPSPassword,
        Self::AZAddMembers,
        Self::AZAppAdmin,
        Self::AZCloudAppAdmin,
        Self::AZContains,
        Self::AZContributor,
        Self::AZGetCertificates,
        Self::AZGetKeys,
        Self::AZGetSecrets,
        Self::AZGlobalAdmin,
        Self::AZPrivilegedRoleAdmin,
        Self::AZResetPassword,
        Self::AZRunsAs,
        Self::AZUserAccessAdministrator,
    ];

    /// Canonical name as it appears in the graph and in policy documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AdminTo => "AdminTo",
            Self::MemberOf => "MemberOf",
            Self::HasSession => "HasSession",
            Self::ForceChangePassword => "ForceChangePassword",
            Self::AddMembers => "AddMembers",
            Self::AddSelf => "AddSelf",
            Self::CanRDP => "CanRDP",
            Self::CanPSRemote => "CanPSRemote",
            Self::ExecuteDCOM => "ExecuteDCOM",
            Self::SQLAdmin => "SQLAdmin",
            Self::AllowedToDelegate => "AllowedToDelegate",
            Self::DCSync => "DCSync",
            Self::GetChanges => "GetChanges",
            Self::GetChangesAll => "GetChangesAll",
            Self::GenericAll => "GenericAll",
            Self::WriteDacl => "WriteDacl",
            Self::GenericWrite => "GenericWrite",
            Self::WriteOwner => "WriteOwner",
            Self::WriteSPN => "WriteSPN",
            Self::Owns => "Owns",
            Self::AddKeyCredentialLink => "AddKeyCredentialLink",
            Self::ReadLAPSPassword => "ReadLAPSPassword",
            Self::ReadGMSAPassword => "ReadGMSAPassword",
            Self::Contains => "Contains",
            Self::AllExtendedRights => "AllExtendedRights",
            Self::GPLink => "GPLink",
            Self::AllowedToAct => "AllowedToAct",
            Self::AddAllowedToAct => "AddAllowedToAct",
            Self::TrustedBy => "TrustedBy",
            Self::SyncLAPSPassword => "SyncLAPSPassword",
            Self::AZAddMembers => "AZAddMembers",
            Self::AZAppAdmin => "AZAppAdmin",
            Self::AZCloudAppAdmin => "AZCloudAppAdmin",
            Self::AZContains => "AZContains",
            Self::AZContributor => "AZContributor",
            Self::AZGetCertificates => "AZGetCertificates",
            Self::AZGetKeys => "AZGetKeys",
            Self::AZGetSecrets => "AZGetSecrets",
            Self::AZGlobalAdmin => "AZGlobalAdmin",
            Self::AZPrivilegedRoleAdmin => "AZPrivilegedRoleAdmin",
            Self::AZResetPassword => "AZResetPassword",
            Self::AZRunsAs => "AZRunsAs",
            Self::AZUserAccessAdministrator => "AZUserAccessAdministrator",
        }
    }

    /// Parse an edge type by exact (case-sensitive) name.
    ///
    /// Graph relationship types are case-sensitive, so `adminto` is not `AdminTo`.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Database-assigned identifier of a graph edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeId(i64);

impl EdgeId {
    /// Create a new EdgeId.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw database id.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for EdgeId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Directed relationship in the privilege graph.
///
/// Edges are never modified by the auditor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Database-assigned identity.
    pub id: EdgeId,
    /// Relationship type exactly as stored.
    pub edge_type: String,
    /// Directed start node.
    pub start: NodeId,
    /// Directed end node.
    pub end: NodeId,
    /// Whether the relationship comes from an access control entry.
    #[serde(default)]
    pub is_acl: bool,
}

impl GraphEdge {
    /// Create a new edge.
    pub fn new(
        id: impl Into<EdgeId>,
        edge_type: impl Into<String>,
        start: NodeId,
        end: NodeId,
        is_acl: bool,
    ) -> Self {
        Self {
            id: id.into(),
            edge_type: edge_type.into(),
            start,
            end,
            is_acl,
        }
    }

    /// Whether this edge touches the given node at either end.
    pub fn touches(&self, node: NodeId) -> bool {
        self.start == node || self.end == node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_vocabulary_names_round_trip() {
        for t in EdgeType::ALL {
            assert_eq!(EdgeType::parse(t.as_str()), Some(t));
        }
        let unique: BTreeSet<_> = EdgeType::ALL.iter().map(|t| t.as_str()).collect();
        assert_eq!(unique.len(), EdgeType::ALL.len());
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert_eq!(EdgeType::parse("AdminTo"), Some(EdgeType::AdminTo));
        assert_eq!(EdgeType::parse("adminto"), None);
        assert_eq!(EdgeType::parse("HasSIDHistory"), None);
    }

    #[test]
    fn test_serde_uses_canonical_names() {
        let json = serde_json::to_string(&EdgeType::AZGlobalAdmin).unwrap();
        assert_eq!(json, "\"AZGlobalAdmin\"");
    }

    #[test]
    fn test_edge_touches() {
        let edge = GraphEdge::new(1, "AdminTo", NodeId::new(10), NodeId::new(20), false);
        assert!(edge.touches(NodeId::new(10)));
        assert!(edge.touches(NodeId::new(20)));
        assert!(!edge.touches(NodeId::new(30)));
    }
}
