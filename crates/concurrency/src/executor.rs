//! Bounded-concurrency execution of independent operations
//!
//! `run_all` drives at most `max_concurrency` operations at a time from a
//! larger queue. Workers are plain futures polled in the caller's task, so
//! the bound limits in-flight asynchronous work, not threads.

use futures::future::try_join_all;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Run every operation, at most `max_concurrency` at once.
///
/// The returned vector has one entry per operation, at the operation's
/// index, whatever order they complete in. The first failure is returned
/// and the remaining workers are dropped; operations already started are
/// not rolled back. A bound of 0 is treated as 1.
pub async fn run_all<T, E, F, Fut>(operations: Vec<F>, max_concurrency: usize) -> Result<Vec<T>, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let total = operations.len();
    if total == 0 {
        return Ok(Vec::new());
    }

    let workers = max_concurrency.clamp(1, total);
    let next = AtomicUsize::new(0);
    let pending: Mutex<Vec<Option<F>>> = Mutex::new(operations.into_iter().map(Some).collect());
    let results: Mutex<Vec<Option<T>>> = Mutex::new((0..total).map(|_| None).collect());

    tracing::trace!(target: "fireman::executor", total, workers, "Starting bounded run");

    try_join_all((0..workers).map(|_| drain(&next, &pending, &results))).await?;

    let results: Vec<T> = results.into_inner().into_iter().flatten().collect();
    debug_assert_eq!(results.len(), total);
    Ok(results)
}

/// Worker loop: claim the next unclaimed index until none remain
async fn drain<T, E, F, Fut>(
    next: &AtomicUsize,
    pending: &Mutex<Vec<Option<F>>>,
    results: &Mutex<Vec<Option<T>>>,
) -> Result<(), E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    loop {
        let index = next.fetch_add(1, Ordering::Relaxed);
        let Some(operation) = pending.lock().get_mut(index).and_then(Option::take) else {
            return Ok(());
        };
        let value = operation().await?;
        results.lock()[index] = Some(value);
    }
}
