//! Bounded fan-out over a set of independent tasks.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

/// Number of workers actually spun up for a task count: the pool cap, or
/// fewer when there is less work than workers.
#[must_use]
pub(crate) fn effective_workers(pool_size: usize, task_count: usize) -> usize {
    pool_size.min(task_count)
}

/// Run `task` over every item with at most `workers` in flight at once.
///
/// Results are aggregated in completion order; no ordering is guaranteed
/// across workers. Each task is isolated: one task's outcome never stops the
/// others. The join barrier at the end means every task has finished (or
/// been aborted) before this returns. Dropping the returned future aborts
/// all outstanding tasks, so a host-side timeout cannot leak workers.
pub(crate) async fn fan_out<I, T, F, Fut>(workers: usize, items: Vec<I>, task: F) -> Vec<T>
where
    I: Send + 'static,
    T: Send + 'static,
    F: Fn(I) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = T> + Send + 'static,
{
    if items.is_empty() {
        return Vec::new();
    }

    debug!(tasks = items.len(), workers, "starting bounded fan-out");

    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let mut set = JoinSet::new();
    for item in items {
        let semaphore = semaphore.clone();
        let task = task.clone();
        set.spawn(async move {
            // Permit is held for the task's full duration.
            let _permit = semaphore.acquire_owned().await.ok();
            task(item).await
        });
    }

    let mut results = Vec::with_capacity(set.len());
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(value) => results.push(value),
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => {} // task aborted during shutdown
        }
    }
    results
}
