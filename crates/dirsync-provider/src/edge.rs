//! A single user-to-group membership edge.
//!
//! Unlike the set-valued reconcilers, this resource manages exactly one
//! edge. The remote API has no get-by-pair call, so existence is checked by
//! paging the group's member list.

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::info;

use dirsync_client::models::{EdgeOp, MemberRequest};
use dirsync_client::DirectoryClient;

use crate::config::SyncTuning;
use crate::error::{ProviderError, ProviderResult};
use crate::membership::{MAX_PAGES, PAGE_SIZE};

/// One user-to-group membership edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipEdge {
    pub group_id: String,
    pub user_id: String,
}

impl MembershipEdge {
    /// Stable import key: `<group_id>/<user_id>`.
    #[must_use]
    pub fn import_key(&self) -> String {
        format!("{}/{}", self.group_id, self.user_id)
    }

    /// Parse an import key back into an edge.
    pub fn parse_import_key(key: &str) -> ProviderResult<Self> {
        let parts: Vec<&str> = key.split('/').collect();
        match parts.as_slice() {
            [group_id, user_id] if !group_id.is_empty() && !user_id.is_empty() => Ok(Self {
                group_id: (*group_id).to_string(),
                user_id: (*user_id).to_string(),
            }),
            _ => Err(ProviderError::InvalidImportKey(format!(
                "{key:?}, expected <group_id>/<user_id>"
            ))),
        }
    }
}

/// Lifecycle engine for one membership edge.
#[derive(Debug, Clone)]
pub struct MembershipEdgeResource {
    client: DirectoryClient,
    tuning: SyncTuning,
}

impl MembershipEdgeResource {
    pub fn new(client: DirectoryClient, tuning: SyncTuning) -> Self {
        Self { client, tuning }
    }

    /// Create the edge. An edge that already exists is the desired state.
    pub async fn create(&self, edge: &MembershipEdge) -> ProviderResult<()> {
        let body = MemberRequest::user(EdgeOp::Add, &edge.user_id);
        match self
            .tuning
            .retry
            .execute("add member", || {
                self.client.modify_group_members(&edge.group_id, &body)
            })
            .await
        {
            Ok(()) => {
                info!(group_id = %edge.group_id, user_id = %edge.user_id, "created membership edge");
                Ok(())
            }
            Err(e) if e.is_conflict() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether the edge currently exists remotely.
    pub async fn exists(&self, edge: &MembershipEdge) -> ProviderResult<bool> {
        for page in 0..MAX_PAGES {
            let skip = page * PAGE_SIZE;
            let edges = match self
                .client
                .group_member_edges(&edge.group_id, PAGE_SIZE, skip)
                .await
            {
                Ok(edges) => edges,
                Err(e) if e.is_not_found() => return Ok(false),
                Err(e) => return Err(e.into()),
            };

            let page_len = edges.len();
            if edges.iter().any(|e| e.to.id == edge.user_id) {
                return Ok(true);
            }
            if (page_len as u32) < PAGE_SIZE {
                return Ok(false);
            }
            sleep(self.tuning.page_delay).await;
        }
        Err(ProviderError::PageLimit {
            anchor: edge.group_id.clone(),
        })
    }

    /// Remove the edge. An edge already gone is the desired state.
    pub async fn delete(&self, edge: &MembershipEdge) -> ProviderResult<()> {
        let body = MemberRequest::user(EdgeOp::Remove, &edge.user_id);
        match self
            .tuning
            .retry
            .execute("remove member", || {
                self.client.modify_group_members(&edge.group_id, &body)
            })
            .await
        {
            Ok(()) => {
                info!(group_id = %edge.group_id, user_id = %edge.user_id, "deleted membership edge");
                Ok(())
            }
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
