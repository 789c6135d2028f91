//! Parallel application of membership edge mutations.

use tokio::time::sleep;
use tracing::{debug, warn};

use dirsync_client::models::{EdgeOp, MemberRequest};
use dirsync_client::{DirectoryClient, DirectoryError};

use crate::config::SyncTuning;
use crate::delta::MembershipOp;
use crate::pool::{effective_workers, fan_out};

/// One edge mutation that failed after retries.
#[derive(Debug, Clone)]
pub struct SyncFailure {
    /// Remote ID of the object on the far side of the edge.
    pub object_id: String,

    /// Human-readable label for the object, when known.
    pub label: Option<String>,

    pub action: EdgeOp,

    pub message: String,
}

impl std::fmt::Display for SyncFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.label {
            Some(label) => write!(
                f,
                "{} {} ({}): {}",
                self.action, label, self.object_id, self.message
            ),
            None => write!(f, "{} {}: {}", self.action, self.object_id, self.message),
        }
    }
}

/// Applies a batch of edge mutations through the bounded pool.
///
/// Failures are isolated per operation: every operation is attempted even
/// when siblings fail, and the failures come back as a batch.
#[derive(Debug, Clone)]
pub struct ApplyEngine {
    client: DirectoryClient,
    tuning: SyncTuning,
}

impl ApplyEngine {
    pub fn new(client: DirectoryClient, tuning: SyncTuning) -> Self {
        Self { client, tuning }
    }

    /// Apply user-anchored operations: each op's `object_id` is a group the
    /// user is added to or removed from.
    pub async fn sync_user_memberships(
        &self,
        user_id: &str,
        ops: Vec<MembershipOp>,
    ) -> Vec<SyncFailure> {
        let user_id = user_id.to_string();
        self.run(ops, move |op| {
            let user_id = user_id.clone();
            (op.object_id.clone(), MemberRequest::user(op.action, user_id))
        })
        .await
    }

    /// Apply group-anchored operations: each op's `object_id` is a user
    /// added to or removed from the group.
    pub async fn sync_group_members(
        &self,
        group_id: &str,
        ops: Vec<MembershipOp>,
    ) -> Vec<SyncFailure> {
        let group_id = group_id.to_string();
        self.run(ops, move |op| {
            (
                group_id.clone(),
                MemberRequest::user(op.action, op.object_id.clone()),
            )
        })
        .await
    }

    async fn run<F>(&self, ops: Vec<MembershipOp>, to_request: F) -> Vec<SyncFailure>
    where
        F: Fn(&MembershipOp) -> (String, MemberRequest) + Clone + Send + 'static,
    {
        let client = self.client.clone();
        let tuning = self.tuning.clone();
        let outcomes = fan_out(
            effective_workers(self.tuning.worker_pool_size, ops.len()),
            ops,
            move |op: MembershipOp| {
                let client = client.clone();
                let tuning = tuning.clone();
                let (group_id, request) = to_request(&op);
                async move {
                    let result = tuning
                        .retry
                        .execute("modify group members", || {
                            client.modify_group_members(&group_id, &request)
                        })
                        .await;
                    sleep(tuning.op_delay).await;
                    match result {
                        Ok(()) => None,
                        Err(e) if already_converged(op.action, &e) => {
                            debug!(
                                group_id = %group_id,
                                op = %op.action,
                                object_id = %op.object_id,
                                "edge already in desired state"
                            );
                            None
                        }
                        Err(e) => {
                            warn!(
                                group_id = %group_id,
                                op = %op.action,
                                object_id = %op.object_id,
                                error = %e,
                                "edge mutation failed"
                            );
                            Some(SyncFailure {
                                object_id: op.object_id,
                                label: op.label,
                                action: op.action,
                                message: e.to_string(),
                            })
                        }
                    }
                }
            },
        )
        .await;
        outcomes.into_iter().flatten().collect()
    }
}

/// An edge already present (add) or already gone (remove) is the desired
/// state; the mutation is idempotent.
fn already_converged(action: EdgeOp, error: &DirectoryError) -> bool {
    match action {
        EdgeOp::Add => error.is_conflict(),
        EdgeOp::Remove => error.is_not_found(),
    }
}
