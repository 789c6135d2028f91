//! Set difference between current and desired membership.

use std::collections::{BTreeMap, BTreeSet};

use dirsync_client::models::EdgeOp;

/// One edge mutation to bring remote state toward the desired set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipOp {
    /// Remote ID of the object on the far side of the edge.
    pub object_id: String,

    /// Human-readable label for the object, when one is known. Only used in
    /// failure messages.
    pub label: Option<String>,

    pub action: EdgeOp,
}

/// Compute the edge mutations that transform `current` into `desired`.
///
/// Adds come first, then removes; within each half the ordered set keeps the
/// output deterministic. IDs present in both sets produce no operation.
#[must_use]
pub fn diff(
    current: &BTreeSet<String>,
    desired: &BTreeSet<String>,
    labels: &BTreeMap<String, String>,
) -> Vec<MembershipOp> {
    let mut ops = Vec::new();
    for id in desired.difference(current) {
        ops.push(MembershipOp {
            object_id: id.clone(),
            label: labels.get(id).cloned(),
            action: EdgeOp::Add,
        });
    }
    for id in current.difference(desired) {
        ops.push(MembershipOp {
            object_id: id.clone(),
            label: labels.get(id).cloned(),
            action: EdgeOp::Remove,
        });
    }
    ops
}
