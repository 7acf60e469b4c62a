//! Bounded worker pool shared by tagging and classification.
//!
//! A permit is taken before a task is spawned, so at most `size` tasks are
//! alive at any moment regardless of how many items a batch has. `run`
//! returns only after every spawned task has finished, which is the batch
//! barrier both pipeline stages rely on.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::Instrument;

/// Why a worker produced no result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkerFailure {
    /// The worker panicked.
    #[error("worker panicked: {0}")]
    Panicked(String),
    /// The worker was cancelled before finishing.
    #[error("worker cancelled")]
    Cancelled,
}

/// Fixed-size pool of async workers.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    /// Create a pool running at most `size` workers at once (minimum 1).
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    /// Maximum concurrent workers.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Run `work` once per item and wait for all of them.
    ///
    /// Outcomes come back in item order. A failed worker never cancels its
    /// siblings. Workers run inside the caller's current span.
    pub async fn run<I, T, F, Fut>(&self, items: impl IntoIterator<Item = I>, work: F) -> Vec<Result<T, WorkerFailure>>
    where
        F: Fn(I) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let mut handles = Vec::new();

        for item in items {
            // The semaphore is never closed, so a permit is always granted.
            let permit = Arc::clone(&self.semaphore).acquire_owned().await.ok();
            let task = work(item);
            handles.push(tokio::spawn(
                async move {
                    let output = task.await;
                    drop(permit);
                    output
                }
                .in_current_span(),
            ));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            outcomes.push(handle.await.map_err(|e| {
                if e.is_panic() {
                    WorkerFailure::Panicked(e.to_string())
                } else {
                    WorkerFailure::Cancelled
                }
            }));
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_outcomes_in_item_order() {
        let pool = WorkerPool::new(3);
        let outcomes = pool.run(0..10u64, |i| async move {
            tokio::time::sleep(Duration::from_millis(10 - i)).await;
            i * 2
        }).await;

        let values: Vec<u64> = outcomes.into_iter().map(|o| o.unwrap()).collect();
        assert_eq!(values, (0..10).map(|i| i * 2).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let pool = WorkerPool::new(2);
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        pool.run(0..12, |_| {
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }
        }).await;

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(active.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_panic_does_not_cancel_siblings() {
        let pool = WorkerPool::new(4);
        let outcomes = pool.run(0..5, |i| async move {
            if i == 2 {
                panic!("boom");
            }
            i
        }).await;

        assert_eq!(outcomes.len(), 5);
        assert!(matches!(outcomes[2], Err(WorkerFailure::Panicked(_))));
        let ok: Vec<_> = outcomes.iter().filter_map(|o| o.as_ref().ok().copied()).collect();
        assert_eq!(ok, vec![0, 1, 3, 4]);
    }

    #[test]
    fn test_zero_size_is_clamped() {
        assert_eq!(WorkerPool::new(0).size(), 1);
    }
}
