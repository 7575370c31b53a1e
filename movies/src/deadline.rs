//! Explicit time budgets for store operations.
//!
//! A [`Deadline`] is fixed when an operation is entered and handed down to
//! the backend call. When it expires the in-flight future is dropped, which
//! cancels that call only; the pool and any other in-flight operation are
//! unaffected.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::StorageError;

/// Stand-in expiry for budgets too large to add to the current instant.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// A point in time after which an operation is abandoned.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
    budget: Duration,
}

impl Deadline {
    /// Deadline `budget` from now. A budget past the clock's range is
    /// clamped to roughly thirty years.
    pub fn after(budget: Duration) -> Self {
        let now = Instant::now();
        let at = now
            .checked_add(budget)
            .unwrap_or_else(|| now + FAR_FUTURE);
        Self { at, budget }
    }

    /// Drive `fut` to completion unless the deadline passes first.
    ///
    /// Expiry is reported as [`StorageError::DeadlineExceeded`] tagged with
    /// `operation`.
    pub async fn run<T, E, F>(self, operation: &'static str, fut: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: From<StorageError>,
    {
        match tokio::time::timeout_at(self.at, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(operation, after = ?self.budget, "Deadline exceeded");
                Err(StorageError::DeadlineExceeded {
                    operation,
                    after: self.budget,
                }
                .into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[tokio::test(start_paused = true)]
    async fn test_slow_future_is_abandoned_at_deadline() {
        let started = Instant::now();
        let deadline = Deadline::after(Duration::from_millis(50));

        let result: Result<(), StoreError> = deadline
            .run("get", async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok::<_, StoreError>(())
            })
            .await;

        let elapsed = started.elapsed();
        assert!(result.unwrap_err().is_deadline_exceeded());
        assert!(elapsed >= Duration::from_millis(50));
        assert!(elapsed < Duration::from_millis(60), "took {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_future_passes_through() {
        let deadline = Deadline::after(Duration::from_secs(3));
        let value = deadline
            .run("get", async { Ok::<_, StoreError>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_inner_error_is_preserved() {
        let deadline = Deadline::after(Duration::from_secs(1));
        let result: Result<(), StoreError> = deadline
            .run("delete", async { Err(StoreError::NotFound) })
            .await;
        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_oversized_budget_does_not_overflow() {
        let deadline = Deadline::after(Duration::MAX);
        let value = deadline
            .run("get", async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok::<_, StoreError>("done")
            })
            .await
            .unwrap();
        assert_eq!(value, "done");
    }
}
