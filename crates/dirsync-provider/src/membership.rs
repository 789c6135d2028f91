//! Paginated fetch of the current membership edges for an anchor object.

use std::collections::BTreeSet;

use tokio::time::sleep;
use tracing::debug;

use dirsync_client::models::GraphEdge;
use dirsync_client::{DirectoryClient, DirectoryResult};

use crate::config::SyncTuning;
use crate::error::{ProviderError, ProviderResult};

/// Page size for edge list calls.
pub const PAGE_SIZE: u32 = 100;

/// Hard cap on pages fetched for a single anchor. Hitting it means the
/// remote list never returned a short page, so the fetch is aborted rather
/// than looping forever.
pub const MAX_PAGES: u32 = 100;

enum EdgeSource<'a> {
    UserGroups(&'a str),
    GroupMembers(&'a str),
}

impl EdgeSource<'_> {
    fn anchor(&self) -> &str {
        match self {
            Self::UserGroups(id) | Self::GroupMembers(id) => id,
        }
    }
}

/// Reads the full current edge set for a user or a group, page by page.
#[derive(Debug, Clone)]
pub struct MembershipFetcher {
    client: DirectoryClient,
    tuning: SyncTuning,
}

impl MembershipFetcher {
    pub fn new(client: DirectoryClient, tuning: SyncTuning) -> Self {
        Self { client, tuning }
    }

    /// IDs of every group the user currently belongs to.
    ///
    /// An unknown user yields an empty set: the caller treats a vanished
    /// anchor as "no memberships" and decides separately whether the
    /// resource itself is gone.
    pub async fn user_group_ids(&self, user_id: &str) -> ProviderResult<BTreeSet<String>> {
        self.fetch_all(EdgeSource::UserGroups(user_id)).await
    }

    /// IDs of every user currently in the group.
    pub async fn group_member_ids(&self, group_id: &str) -> ProviderResult<BTreeSet<String>> {
        self.fetch_all(EdgeSource::GroupMembers(group_id)).await
    }

    async fn fetch_page(&self, source: &EdgeSource<'_>, skip: u32) -> DirectoryResult<Vec<GraphEdge>> {
        match source {
            EdgeSource::UserGroups(user_id) => {
                self.client.user_group_edges(user_id, PAGE_SIZE, skip).await
            }
            EdgeSource::GroupMembers(group_id) => {
                self.client
                    .group_member_edges(group_id, PAGE_SIZE, skip)
                    .await
            }
        }
    }

    async fn fetch_all(&self, source: EdgeSource<'_>) -> ProviderResult<BTreeSet<String>> {
        let mut ids = BTreeSet::new();
        for page in 0..MAX_PAGES {
            let skip = page * PAGE_SIZE;
            let edges = match self.fetch_page(&source, skip).await {
                Ok(edges) => edges,
                // A missing anchor has no edges.
                Err(e) if e.is_not_found() => return Ok(BTreeSet::new()),
                Err(e) => return Err(e.into()),
            };

            let page_len = edges.len();
            for edge in edges {
                if !edge.to.id.is_empty() {
                    ids.insert(edge.to.id);
                }
            }

            debug!(
                anchor = source.anchor(),
                page,
                page_len,
                total = ids.len(),
                "fetched edge page"
            );

            // A short page is the end of the list.
            if (page_len as u32) < PAGE_SIZE {
                return Ok(ids);
            }
            sleep(self.tuning.page_delay).await;
        }
        Err(ProviderError::PageLimit {
            anchor: source.anchor().to_string(),
        })
    }
}
