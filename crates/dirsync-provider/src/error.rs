//! Error types for the reconciliation engine.

use dirsync_client::DirectoryError;
use thiserror::Error;

use crate::apply::SyncFailure;
use crate::membership::MAX_PAGES;

/// Result type alias using [`ProviderError`].
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors surfaced to the host runtime by lifecycle calls.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// One or more name/ID lookups exhausted retries or found no match.
    /// Reported jointly after every item has been attempted; nothing was
    /// mutated, so the whole call is safe to retry.
    #[error("identifier resolution failed:\n{}", .0.join("\n"))]
    Resolution(Vec<String>),

    /// One or more add/remove operations failed after retries. Remote state
    /// may be partially converged; re-read before retrying.
    #[error("membership synchronization partially failed:\n{}", join_failures(.0))]
    PartialSync(Vec<SyncFailure>),

    /// The paginated edge fetch never returned a short page.
    #[error("edge fetch for {anchor} exceeded {MAX_PAGES} pages")]
    PageLimit { anchor: String },

    /// An import key did not have the expected shape.
    #[error("invalid import key: {0}")]
    InvalidImportKey(String),

    /// Any other directory API failure.
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

fn join_failures(failures: &[SyncFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
