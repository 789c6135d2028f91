//! Group-to-object association edges.
//!
//! An association binds a group to a non-user object (an application, a
//! policy, an LDAP server, ...). The remote API has no get-by-pair call, so
//! existence is checked by paging the group's association edges for the
//! object's kind.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::info;

use dirsync_client::models::{AssociationRequest, EdgeOp};
use dirsync_client::DirectoryClient;

use crate::config::SyncTuning;
use crate::error::{ProviderError, ProviderResult};
use crate::membership::{MAX_PAGES, PAGE_SIZE};

/// Kinds of objects a group can be associated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationKind {
    ActiveDirectory,
    Application,
    Command,
    GSuite,
    LdapServer,
    #[serde(rename = "office_365")]
    Office365,
    Policy,
    RadiusServer,
    System,
    SystemGroup,
}

impl AssociationKind {
    /// Wire name used in request bodies and the `targets` query parameter.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ActiveDirectory => "active_directory",
            Self::Application => "application",
            Self::Command => "command",
            Self::GSuite => "g_suite",
            Self::LdapServer => "ldap_server",
            Self::Office365 => "office_365",
            Self::Policy => "policy",
            Self::RadiusServer => "radius_server",
            Self::System => "system",
            Self::SystemGroup => "system_group",
        }
    }
}

impl fmt::Display for AssociationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssociationKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active_directory" => Ok(Self::ActiveDirectory),
            "application" => Ok(Self::Application),
            "command" => Ok(Self::Command),
            "g_suite" => Ok(Self::GSuite),
            "ldap_server" => Ok(Self::LdapServer),
            "office_365" => Ok(Self::Office365),
            "policy" => Ok(Self::Policy),
            "radius_server" => Ok(Self::RadiusServer),
            "system" => Ok(Self::System),
            "system_group" => Ok(Self::SystemGroup),
            other => Err(ProviderError::InvalidImportKey(format!(
                "unknown association kind {other:?}"
            ))),
        }
    }
}

/// One group-to-object association edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association {
    pub group_id: String,
    pub object_id: String,
    pub kind: AssociationKind,
}

impl Association {
    /// Stable import key: `<group_id>/<object_id>/<kind>`.
    #[must_use]
    pub fn import_key(&self) -> String {
        format!("{}/{}/{}", self.group_id, self.object_id, self.kind)
    }

    /// Parse an import key back into an association.
    pub fn parse_import_key(key: &str) -> ProviderResult<Self> {
        let parts: Vec<&str> = key.split('/').collect();
        match parts.as_slice() {
            [group_id, object_id, kind] if !group_id.is_empty() && !object_id.is_empty() => {
                Ok(Self {
                    group_id: (*group_id).to_string(),
                    object_id: (*object_id).to_string(),
                    kind: kind.parse()?,
                })
            }
            _ => Err(ProviderError::InvalidImportKey(format!(
                "{key:?}, expected <group_id>/<object_id>/<kind>"
            ))),
        }
    }
}

/// Lifecycle engine for one association edge.
#[derive(Debug, Clone)]
pub struct AssociationResource {
    client: DirectoryClient,
    tuning: SyncTuning,
}

impl AssociationResource {
    pub fn new(client: DirectoryClient, tuning: SyncTuning) -> Self {
        Self { client, tuning }
    }

    /// Create the edge. An edge that already exists is the desired state.
    pub async fn create(&self, assoc: &Association) -> ProviderResult<()> {
        let body = AssociationRequest {
            op: EdgeOp::Add,
            object_type: assoc.kind.as_str().to_string(),
            id: assoc.object_id.clone(),
        };
        match self
            .tuning
            .retry
            .execute("add association", || {
                self.client.modify_group_association(&assoc.group_id, &body)
            })
            .await
        {
            Ok(()) => {
                info!(
                    group_id = %assoc.group_id,
                    object_id = %assoc.object_id,
                    kind = %assoc.kind,
                    "created association"
                );
                Ok(())
            }
            Err(e) if e.is_conflict() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether the edge currently exists remotely.
    pub async fn exists(&self, assoc: &Association) -> ProviderResult<bool> {
        for page in 0..MAX_PAGES {
            let skip = page * PAGE_SIZE;
            let edges = match self
                .client
                .group_association_edges(&assoc.group_id, assoc.kind.as_str(), PAGE_SIZE, skip)
                .await
            {
                Ok(edges) => edges,
                Err(e) if e.is_not_found() => return Ok(false),
                Err(e) => return Err(e.into()),
            };

            let page_len = edges.len();
            if edges.iter().any(|edge| edge.to.id == assoc.object_id) {
                return Ok(true);
            }
            if (page_len as u32) < PAGE_SIZE {
                return Ok(false);
            }
            sleep(self.tuning.page_delay).await;
        }
        Err(ProviderError::PageLimit {
            anchor: assoc.group_id.clone(),
        })
    }

    /// Remove the edge. An edge already gone is the desired state.
    pub async fn delete(&self, assoc: &Association) -> ProviderResult<()> {
        let body = AssociationRequest {
            op: EdgeOp::Remove,
            object_type: assoc.kind.as_str().to_string(),
            id: assoc.object_id.clone(),
        };
        match self
            .tuning
            .retry
            .execute("remove association", || {
                self.client.modify_group_association(&assoc.group_id, &body)
            })
            .await
        {
            Ok(()) => {
                info!(
                    group_id = %assoc.group_id,
                    object_id = %assoc.object_id,
                    kind = %assoc.kind,
                    "deleted association"
                );
                Ok(())
            }
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
