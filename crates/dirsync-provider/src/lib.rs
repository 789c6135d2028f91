//! Group-membership reconciliation against a remote directory.
//!
//! Desired state declares memberships by human keys (user emails, group
//! names); remote state is keyed by opaque IDs. Each lifecycle call resolves
//! the keys, fetches the current edge set, computes the minimal add/remove
//! delta, and applies it through a bounded worker pool with per-operation
//! retry and pacing.
//!
//! Four resource shapes are covered:
//! - [`MembershipReconciler`]: the set of groups one user belongs to.
//! - [`GroupResource`]: a group object plus its member set.
//! - [`MembershipEdgeResource`]: one user-to-group membership edge.
//! - [`AssociationResource`]: one group-to-object association edge.
//!
//! All engines are stateless between calls; tuning is passed explicitly via
//! [`SyncTuning`].

pub mod apply;
pub mod association;
pub mod config;
pub mod delta;
pub mod edge;
pub mod error;
pub mod group;
pub mod membership;
pub(crate) mod pool;
pub mod reconciler;
pub mod resolver;

pub use apply::{ApplyEngine, SyncFailure};
pub use association::{Association, AssociationKind, AssociationResource};
pub use config::SyncTuning;
pub use delta::{diff, MembershipOp};
pub use edge::{MembershipEdge, MembershipEdgeResource};
pub use error::{ProviderError, ProviderResult};
pub use group::{GroupResource, GroupSpec, GroupState};
pub use membership::{MembershipFetcher, MAX_PAGES, PAGE_SIZE};
pub use reconciler::{MembershipReconciler, MembershipState};
pub use resolver::Resolver;
