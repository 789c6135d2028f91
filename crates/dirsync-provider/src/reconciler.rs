//! User-anchored membership reconciliation.
//!
//! The managed resource is "the set of groups this user belongs to". Desired
//! state names groups by name; remote state is fetched as IDs and converged
//! with the minimal set of add/remove edges.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::info;

use dirsync_client::{DirectoryClient, DirectoryError};

use crate::apply::ApplyEngine;
use crate::config::SyncTuning;
use crate::delta::diff;
use crate::error::{ProviderError, ProviderResult};
use crate::membership::MembershipFetcher;
use crate::resolver::Resolver;

/// Observed state of a user's group memberships.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MembershipState {
    pub user_email: String,
    pub user_id: String,

    /// Names of the groups the user belongs to.
    pub groups: BTreeSet<String>,

    /// Name to remote ID, for the groups in `groups`.
    pub group_ids: BTreeMap<String, String>,
}

/// Lifecycle engine for a user's group memberships.
#[derive(Debug, Clone)]
pub struct MembershipReconciler {
    client: DirectoryClient,
    resolver: Resolver,
    fetcher: MembershipFetcher,
    apply: ApplyEngine,
    tuning: SyncTuning,
}

impl MembershipReconciler {
    pub fn new(client: DirectoryClient, tuning: SyncTuning) -> Self {
        Self {
            resolver: Resolver::new(client.clone(), tuning.clone()),
            fetcher: MembershipFetcher::new(client.clone(), tuning.clone()),
            apply: ApplyEngine::new(client.clone(), tuning.clone()),
            client,
            tuning,
        }
    }

    /// Bring the user's memberships to exactly `desired_groups` and return
    /// the observed state.
    pub async fn create(
        &self,
        email: &str,
        desired_groups: &BTreeSet<String>,
    ) -> ProviderResult<MembershipState> {
        let user_id = self.resolver.find_user_by_email(email).await?;
        info!(email, user_id = %user_id, groups = desired_groups.len(), "creating membership set");
        self.converge(&user_id, desired_groups).await?;
        self.read_back(email, &user_id).await
    }

    /// Read the current membership state. Returns `None` when the user no
    /// longer exists remotely, so the host can drop the resource.
    pub async fn read(&self, user_id: &str) -> ProviderResult<Option<MembershipState>> {
        let user = match self
            .tuning
            .retry
            .execute("read user", || self.client.get_user(user_id))
            .await
        {
            Ok(user) => user,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let state = self.read_back(&user.email, user_id).await?;
        Ok(Some(state))
    }

    /// Converge from a previously observed state to `desired_groups`.
    ///
    /// Every group named by either the old or the new set must still resolve;
    /// a group renamed or deleted out of band fails the whole update before
    /// anything is mutated. Old and new names are resolved in one batch and
    /// the delta is computed between those two declared sets, so memberships
    /// added outside this resource are never touched.
    pub async fn update(
        &self,
        state: &MembershipState,
        desired_groups: &BTreeSet<String>,
    ) -> ProviderResult<MembershipState> {
        let mut all_names = state.groups.clone();
        all_names.extend(desired_groups.iter().cloned());
        let name_to_id = self.resolver.group_names_to_ids(&all_names).await?;

        // Strict resolution above guarantees every name has an entry.
        let ids_for = |names: &BTreeSet<String>| -> BTreeSet<String> {
            names
                .iter()
                .filter_map(|name| name_to_id.get(name).cloned())
                .collect()
        };
        let old_ids = ids_for(&state.groups);
        let new_ids = ids_for(desired_groups);
        let labels: BTreeMap<String, String> = name_to_id
            .into_iter()
            .map(|(name, id)| (id, name))
            .collect();

        info!(
            user_id = %state.user_id,
            desired = desired_groups.len(),
            "updating membership set"
        );
        let ops = diff(&old_ids, &new_ids, &labels);
        if !ops.is_empty() {
            let failures = self
                .apply
                .sync_user_memberships(&state.user_id, ops)
                .await;
            if !failures.is_empty() {
                return Err(ProviderError::PartialSync(failures));
            }
        }
        self.read_back(&state.user_email, &state.user_id).await
    }

    /// Remove the user from every group. A user already deleted remotely is
    /// a no-op.
    pub async fn delete(&self, user_id: &str) -> ProviderResult<()> {
        let current = self.fetcher.user_group_ids(user_id).await?;
        info!(user_id, memberships = current.len(), "deleting membership set");
        let ops = diff(&current, &BTreeSet::new(), &BTreeMap::new());
        if ops.is_empty() {
            return Ok(());
        }
        let failures = self.apply.sync_user_memberships(user_id, ops).await;
        if failures.is_empty() {
            Ok(())
        } else {
            Err(ProviderError::PartialSync(failures))
        }
    }

    /// Adopt an existing user's memberships by email without mutating them.
    pub async fn import(&self, email: &str) -> ProviderResult<MembershipState> {
        let user_id = self.resolver.find_user_by_email(email).await?;
        self.read_back(email, &user_id).await
    }

    async fn converge(
        &self,
        user_id: &str,
        desired_groups: &BTreeSet<String>,
    ) -> ProviderResult<()> {
        let name_to_id = self.resolver.group_names_to_ids(desired_groups).await?;
        let desired_ids: BTreeSet<String> = name_to_id.values().cloned().collect();
        let labels: BTreeMap<String, String> = name_to_id
            .into_iter()
            .map(|(name, id)| (id, name))
            .collect();

        let current = self.fetcher.user_group_ids(user_id).await?;
        let ops = diff(&current, &desired_ids, &labels);
        if ops.is_empty() {
            return Ok(());
        }

        let failures = self.apply.sync_user_memberships(user_id, ops).await;
        if failures.is_empty() {
            Ok(())
        } else {
            Err(ProviderError::PartialSync(failures))
        }
    }

    /// Re-read remote state after a mutation. The user vanishing mid-call is
    /// an error here, unlike in [`read`](Self::read).
    async fn read_back(&self, email: &str, user_id: &str) -> ProviderResult<MembershipState> {
        let group_ids = self.fetcher.user_group_ids(user_id).await?;
        let id_to_name = self.resolver.group_ids_to_names(&group_ids).await?;

        let mut groups = BTreeSet::new();
        let mut name_to_id = BTreeMap::new();
        for (id, name) in id_to_name {
            groups.insert(name.clone());
            name_to_id.insert(name, id);
        }

        // Confirm the anchor still exists so stale state is never returned.
        match self
            .tuning
            .retry
            .execute("read user", || self.client.get_user(user_id))
            .await
        {
            Ok(_) => Ok(MembershipState {
                user_email: email.to_string(),
                user_id: user_id.to_string(),
                groups,
                group_ids: name_to_id,
            }),
            Err(e) if e.is_not_found() => Err(ProviderError::Directory(DirectoryError::NotFound(
                format!("user {user_id} vanished during reconciliation"),
            ))),
            Err(e) => Err(e.into()),
        }
    }
}
