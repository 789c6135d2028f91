//! Tuning knobs for one reconciliation call.

use std::time::Duration;

use dirsync_client::RetryPolicy;

/// Concurrency, pacing, and retry settings.
///
/// Constructed per reconciliation call; the defaults match the behavior the
/// remote API is known to tolerate without throttling.
#[derive(Debug, Clone)]
pub struct SyncTuning {
    /// Upper bound on concurrent workers per fan-out.
    pub worker_pool_size: usize,

    /// Pause after each individual worker's API call.
    pub op_delay: Duration,

    /// Pause between pages of an edge fetch.
    pub page_delay: Duration,

    /// Retry policy for lookups and edge mutations.
    pub retry: RetryPolicy,
}

impl Default for SyncTuning {
    fn default() -> Self {
        Self {
            worker_pool_size: 5,
            op_delay: Duration::from_millis(20),
            page_delay: Duration::from_millis(100),
            retry: RetryPolicy::default(),
        }
    }
}
