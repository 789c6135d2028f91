//! Name/ID resolution against the directory.
//!
//! Humans declare users by email and groups by name; the API mutates edges
//! by opaque ID. Every resolver runs its lookups through the bounded pool,
//! retries transient failures, and reports all failures jointly after every
//! item has been attempted, so one bad name never hides the others.

use std::collections::{BTreeMap, BTreeSet};

use tokio::time::sleep;
use tracing::debug;

use dirsync_client::{eq_filter, DirectoryClient};

use crate::config::SyncTuning;
use crate::error::{ProviderError, ProviderResult};
use crate::pool::{effective_workers, fan_out};

// List lookups are filtered server-side; a handful of partial matches is the
// most a page needs to hold.
const LOOKUP_LIMIT: u32 = 10;

enum Resolved {
    Found { key: String, value: String },
    Absent { key: String },
    Failed { message: String },
}

/// Resolves human keys to remote IDs and back.
#[derive(Debug, Clone)]
pub struct Resolver {
    client: DirectoryClient,
    tuning: SyncTuning,
}

impl Resolver {
    pub fn new(client: DirectoryClient, tuning: SyncTuning) -> Self {
        Self { client, tuning }
    }

    /// Resolve group names to IDs. Every name must resolve to exactly one
    /// group; unknown names and lookup failures are aggregated into a single
    /// error after all names have been attempted.
    pub async fn group_names_to_ids(
        &self,
        names: &BTreeSet<String>,
    ) -> ProviderResult<BTreeMap<String, String>> {
        let client = self.client.clone();
        let tuning = self.tuning.clone();
        let outcomes = fan_out(
            effective_workers(self.tuning.worker_pool_size, names.len()),
            names.iter().cloned().collect(),
            move |name: String| {
                let client = client.clone();
                let tuning = tuning.clone();
                async move {
                    let filter = eq_filter("name", &name);
                    let result = tuning
                        .retry
                        .execute("resolve group name", || {
                            client.list_groups(Some(&filter), LOOKUP_LIMIT, 0)
                        })
                        .await;
                    sleep(tuning.op_delay).await;
                    match result {
                        // The remote filter can match partially; keep only
                        // the exact name.
                        Ok(groups) => match groups.into_iter().find(|g| g.name == name) {
                            Some(group) => Resolved::Found {
                                key: name,
                                value: group.id,
                            },
                            None => Resolved::Absent { key: name },
                        },
                        Err(e) => Resolved::Failed {
                            message: format!("group {name:?}: {e}"),
                        },
                    }
                }
            },
        )
        .await;
        collect_strict(outcomes, "group")
    }

    /// Resolve group IDs back to names. Groups deleted out of band are
    /// skipped silently; the caller's state simply no longer mentions them.
    pub async fn group_ids_to_names(
        &self,
        ids: &BTreeSet<String>,
    ) -> ProviderResult<BTreeMap<String, String>> {
        let client = self.client.clone();
        let tuning = self.tuning.clone();
        let outcomes = fan_out(
            effective_workers(self.tuning.worker_pool_size, ids.len()),
            ids.iter().cloned().collect(),
            move |id: String| {
                let client = client.clone();
                let tuning = tuning.clone();
                async move {
                    let result = tuning
                        .retry
                        .execute("resolve group id", || client.get_group(&id))
                        .await;
                    sleep(tuning.op_delay).await;
                    match result {
                        Ok(group) => Resolved::Found {
                            key: id,
                            value: group.name,
                        },
                        Err(e) if e.is_not_found() => {
                            debug!(group_id = %id, "group vanished, skipping");
                            Resolved::Absent { key: id }
                        }
                        Err(e) => Resolved::Failed {
                            message: format!("group {id}: {e}"),
                        },
                    }
                }
            },
        )
        .await;
        collect_lenient(outcomes)
    }

    /// Resolve user emails to IDs. Every email must match exactly one user.
    pub async fn user_emails_to_ids(
        &self,
        emails: &BTreeSet<String>,
    ) -> ProviderResult<BTreeMap<String, String>> {
        let client = self.client.clone();
        let tuning = self.tuning.clone();
        let outcomes = fan_out(
            effective_workers(self.tuning.worker_pool_size, emails.len()),
            emails.iter().cloned().collect(),
            move |email: String| {
                let client = client.clone();
                let tuning = tuning.clone();
                async move {
                    let filter = eq_filter("email", &email);
                    let result = tuning
                        .retry
                        .execute("resolve user email", || {
                            client.list_users(Some(&filter), LOOKUP_LIMIT, 0)
                        })
                        .await;
                    sleep(tuning.op_delay).await;
                    match result {
                        Ok(envelope) => {
                            match envelope.results.into_iter().find(|u| u.email == email) {
                                Some(user) => Resolved::Found {
                                    key: email,
                                    value: user.id,
                                },
                                None => Resolved::Absent { key: email },
                            }
                        }
                        Err(e) => Resolved::Failed {
                            message: format!("user {email:?}: {e}"),
                        },
                    }
                }
            },
        )
        .await;
        collect_strict(outcomes, "user")
    }

    /// Resolve user IDs back to emails, skipping users deleted out of band.
    pub async fn user_ids_to_emails(
        &self,
        ids: &BTreeSet<String>,
    ) -> ProviderResult<BTreeMap<String, String>> {
        let client = self.client.clone();
        let tuning = self.tuning.clone();
        let outcomes = fan_out(
            effective_workers(self.tuning.worker_pool_size, ids.len()),
            ids.iter().cloned().collect(),
            move |id: String| {
                let client = client.clone();
                let tuning = tuning.clone();
                async move {
                    let result = tuning
                        .retry
                        .execute("resolve user id", || client.get_user(&id))
                        .await;
                    sleep(tuning.op_delay).await;
                    match result {
                        Ok(user) => Resolved::Found {
                            key: id,
                            value: user.email,
                        },
                        Err(e) if e.is_not_found() => {
                            debug!(user_id = %id, "user vanished, skipping");
                            Resolved::Absent { key: id }
                        }
                        Err(e) => Resolved::Failed {
                            message: format!("user {id}: {e}"),
                        },
                    }
                }
            },
        )
        .await;
        collect_lenient(outcomes)
    }

    /// Find the single user with the given email.
    pub async fn find_user_by_email(&self, email: &str) -> ProviderResult<String> {
        let filter = eq_filter("email", email);
        let envelope = self
            .tuning
            .retry
            .execute("resolve user email", || {
                self.client.list_users(Some(&filter), LOOKUP_LIMIT, 0)
            })
            .await?;
        envelope
            .results
            .into_iter()
            .find(|u| u.email == email)
            .map(|u| u.id)
            .ok_or_else(|| ProviderError::Resolution(vec![format!("user {email:?} not found")]))
    }
}

/// Absent keys are errors: the declared item must exist remotely.
fn collect_strict(
    outcomes: Vec<Resolved>,
    noun: &str,
) -> ProviderResult<BTreeMap<String, String>> {
    let mut map = BTreeMap::new();
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome {
            Resolved::Found { key, value } => {
                map.insert(key, value);
            }
            Resolved::Absent { key } => failures.push(format!("{noun} {key:?} not found")),
            Resolved::Failed { message } => failures.push(message),
        }
    }
    if failures.is_empty() {
        Ok(map)
    } else {
        failures.sort();
        Err(ProviderError::Resolution(failures))
    }
}

/// Absent keys are skipped: the item was deleted out of band.
fn collect_lenient(outcomes: Vec<Resolved>) -> ProviderResult<BTreeMap<String, String>> {
    let mut map = BTreeMap::new();
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome {
            Resolved::Found { key, value } => {
                map.insert(key, value);
            }
            Resolved::Absent { .. } => {}
            Resolved::Failed { message } => failures.push(message),
        }
    }
    if failures.is_empty() {
        Ok(map)
    } else {
        failures.sort();
        Err(ProviderError::Resolution(failures))
    }
}
