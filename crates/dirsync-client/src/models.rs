//! Request and response types for the directory API.
//!
//! Every endpoint gets an explicit typed body; nothing is sent as an untyped
//! key/value map.

use serde::{Deserialize, Serialize};

/// A directory user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryUser {
    /// Opaque remote object ID.
    #[serde(rename = "_id")]
    pub id: String,

    /// Primary email address; the human key users are declared by.
    pub email: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub firstname: Option<String>,

    #[serde(default)]
    pub lastname: Option<String>,
}

/// Envelope returned by the paginated user list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct UserListEnvelope {
    #[serde(default)]
    pub results: Vec<DirectoryUser>,

    #[serde(rename = "totalCount", default)]
    pub total_count: u64,
}

/// A directory user group.
///
/// Group names are not guaranteed unique remotely; callers that look up by
/// name must re-filter for an exact match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryGroup {
    pub id: String,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Body for group create and update calls.
#[derive(Debug, Clone, Serialize)]
pub struct GroupWriteBody {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl GroupWriteBody {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }
}

/// The far end of a graph edge.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphObject {
    pub id: String,

    #[serde(rename = "type", default)]
    pub object_type: String,
}

/// A membership or association edge returned by the graph list endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphEdge {
    pub to: GraphObject,
}

/// Direction of an edge mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeOp {
    Add,
    Remove,
}

impl std::fmt::Display for EdgeOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Add => f.write_str("add"),
            Self::Remove => f.write_str("remove"),
        }
    }
}

/// Body for the group membership mutation endpoint: toggles one
/// user↔group edge.
#[derive(Debug, Clone, Serialize)]
pub struct MemberRequest {
    pub op: EdgeOp,

    #[serde(rename = "type")]
    pub member_type: String,

    /// The user object ID being added to or removed from the group.
    pub id: String,
}

impl MemberRequest {
    /// Edge mutation for a user member.
    pub fn user(op: EdgeOp, user_id: impl Into<String>) -> Self {
        Self {
            op,
            member_type: "user".to_string(),
            id: user_id.into(),
        }
    }
}

/// Body for the group association mutation endpoint: toggles one
/// group↔object edge (applications, LDAP servers, policies, ...).
#[derive(Debug, Clone, Serialize)]
pub struct AssociationRequest {
    pub op: EdgeOp,

    #[serde(rename = "type")]
    pub object_type: String,

    pub id: String,
}
