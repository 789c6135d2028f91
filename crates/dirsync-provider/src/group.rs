//! Group-anchored lifecycle: the group object plus its member set.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::info;

use dirsync_client::models::GroupWriteBody;
use dirsync_client::DirectoryClient;

use crate::apply::ApplyEngine;
use crate::config::SyncTuning;
use crate::delta::diff;
use crate::error::{ProviderError, ProviderResult};
use crate::membership::MembershipFetcher;
use crate::resolver::Resolver;

/// Observed state of a managed group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupState {
    pub group_id: String,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Emails of the group's members.
    pub members: BTreeSet<String>,
}

/// Desired attributes and membership for a group.
#[derive(Debug, Clone)]
pub struct GroupSpec {
    pub name: String,
    pub description: Option<String>,
    pub members: BTreeSet<String>,
}

/// Lifecycle engine for a group and its member set.
#[derive(Debug, Clone)]
pub struct GroupResource {
    client: DirectoryClient,
    resolver: Resolver,
    fetcher: MembershipFetcher,
    apply: ApplyEngine,
    tuning: SyncTuning,
}

impl GroupResource {
    pub fn new(client: DirectoryClient, tuning: SyncTuning) -> Self {
        Self {
            resolver: Resolver::new(client.clone(), tuning.clone()),
            fetcher: MembershipFetcher::new(client.clone(), tuning.clone()),
            apply: ApplyEngine::new(client.clone(), tuning.clone()),
            client,
            tuning,
        }
    }

    /// Create the group, then converge its member set.
    pub async fn create(&self, spec: &GroupSpec) -> ProviderResult<GroupState> {
        let mut body = GroupWriteBody::new(&spec.name);
        body.description = spec.description.clone();
        let group = self
            .tuning
            .retry
            .execute("create group", || self.client.create_group(&body))
            .await?;
        info!(group_id = %group.id, name = %group.name, "created group");

        self.sync_members(&group.id, &spec.members).await?;
        self.read_back(&group.id).await
    }

    /// Read the group and its members. Returns `None` when the group no
    /// longer exists remotely.
    pub async fn read(&self, group_id: &str) -> ProviderResult<Option<GroupState>> {
        match self
            .tuning
            .retry
            .execute("read group", || self.client.get_group(group_id))
            .await
        {
            Ok(_) => {}
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e.into()),
        }
        let state = self.read_back(group_id).await?;
        Ok(Some(state))
    }

    /// Replace the group's attributes and converge its member set.
    pub async fn update(&self, group_id: &str, spec: &GroupSpec) -> ProviderResult<GroupState> {
        let mut body = GroupWriteBody::new(&spec.name);
        body.description = spec.description.clone();
        self.tuning
            .retry
            .execute("update group", || self.client.update_group(group_id, &body))
            .await?;
        info!(group_id, name = %spec.name, "updated group");

        self.sync_members(group_id, &spec.members).await?;
        self.read_back(group_id).await
    }

    /// Delete the group. A group already deleted remotely is a no-op.
    pub async fn delete(&self, group_id: &str) -> ProviderResult<()> {
        match self
            .tuning
            .retry
            .execute("delete group", || self.client.delete_group(group_id))
            .await
        {
            Ok(()) => {
                info!(group_id, "deleted group");
                Ok(())
            }
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn sync_members(
        &self,
        group_id: &str,
        desired_emails: &BTreeSet<String>,
    ) -> ProviderResult<()> {
        let email_to_id = self.resolver.user_emails_to_ids(desired_emails).await?;
        let desired_ids: BTreeSet<String> = email_to_id.values().cloned().collect();
        let labels: BTreeMap<String, String> = email_to_id
            .into_iter()
            .map(|(email, id)| (id, email))
            .collect();

        let current = self.fetcher.group_member_ids(group_id).await?;
        let ops = diff(&current, &desired_ids, &labels);
        if ops.is_empty() {
            return Ok(());
        }

        let failures = self.apply.sync_group_members(group_id, ops).await;
        if failures.is_empty() {
            Ok(())
        } else {
            Err(ProviderError::PartialSync(failures))
        }
    }

    async fn read_back(&self, group_id: &str) -> ProviderResult<GroupState> {
        let group = self
            .tuning
            .retry
            .execute("read group", || self.client.get_group(group_id))
            .await?;
        let member_ids = self.fetcher.group_member_ids(group_id).await?;
        let id_to_email = self.resolver.user_ids_to_emails(&member_ids).await?;

        Ok(GroupState {
            group_id: group.id,
            name: group.name,
            description: group.description,
            members: id_to_email.into_values().collect(),
        })
    }
}
