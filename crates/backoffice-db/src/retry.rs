//! # Conflict Retry
//!
//! Re-runs an operation that failed with a lock conflict.
//!
//! ```text
//! attempt 1 ── Concurrency ──► sleep 50ms
//! attempt 2 ── Concurrency ──► sleep ~100ms
//! attempt 3 ── Ok / other error ──► return
//! ```
//!
//! Only [`CoreError::Concurrency`] is retried. Business rejections
//! (insufficient stock, duplicates, invalid state) are returned at once:
//! running them again cannot change the answer.

use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use tracing::warn;

use backoffice_core::{CoreError, CoreResult};

use crate::config::RetrySettings;

/// Retry policy for [`retry_on_conflict`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::from(&RetrySettings::default())
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        RetryPolicy {
            max_retries: settings.max_retries,
            initial_backoff: Duration::from_millis(settings.initial_backoff_ms),
            max_backoff: Duration::from_millis(settings.max_backoff_ms),
        }
    }
}

impl RetryPolicy {
    /// Creates the exponential backoff configuration.
    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.initial_backoff,
            max_interval: self.max_backoff,
            multiplier: 2.0,
            max_elapsed_time: None, // bounded by max_retries instead
            ..Default::default()
        }
    }
}

/// Runs `operation` until it succeeds, fails with a non-retryable error,
/// or `policy.max_retries` retries are used up.
///
/// ## Example
/// ```rust,ignore
/// let invoice = retry_on_conflict(&policy, || {
///     db.orders().confirm_order(&actor, &order_id, "cash")
/// })
/// .await?;
/// ```
pub async fn retry_on_conflict<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> CoreResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = CoreResult<T>>,
{
    let mut backoff = policy.create_backoff();
    let mut attempt: u32 = 0;

    loop {
        match operation().await {
            Err(err @ CoreError::Concurrency(_)) if attempt < policy.max_retries => {
                attempt += 1;
                let delay = backoff.next_backoff().unwrap_or(policy.max_backoff);
                warn!(
                    attempt,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Lock conflict, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            result => return result,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
        }
    }

    #[tokio::test]
    async fn test_retries_conflicts_until_success() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = retry_on_conflict(&fast_policy(3), || async move {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(CoreError::Concurrency("database is locked".to_string()))
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: CoreResult<()> = retry_on_conflict(&fast_policy(2), || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(CoreError::Concurrency("database is locked".to_string()))
        })
        .await;

        assert!(matches!(result, Err(CoreError::Concurrency(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_business_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: CoreResult<()> = retry_on_conflict(&fast_policy(5), || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(CoreError::InsufficientStock { shortages: vec![] })
        })
        .await;

        assert!(matches!(result, Err(CoreError::InsufficientStock { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
