//! Exponential-backoff retry wrapper with a caller-supplied classifier.
//!
//! Nothing is retried by default: the classifier decides which failures are
//! transient. Backoff sleeps race the ambient cancellation token so a
//! shutdown never waits out a 30-second delay.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Extra attempts after the first; 3 means up to 4 calls total.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub factor: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            factor: 2,
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after failed attempt `k` (0-indexed):
    /// `min(initial_delay * factor^k, max_delay)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.min(16);
        let scaled = self
            .initial_delay
            .saturating_mul(self.factor.saturating_pow(exp));
        scaled.min(self.max_delay)
    }
}

#[derive(Debug, Error)]
pub enum RetryError<E> {
    #[error("operation cancelled")]
    Cancelled,

    #[error("{0}")]
    Operation(E),
}

impl<E> RetryError<E> {
    pub fn into_operation(self) -> Option<E> {
        match self {
            Self::Operation(err) => Some(err),
            Self::Cancelled => None,
        }
    }
}

/// Run `op`, retrying failures the classifier marks transient.
///
/// The final attempt's error propagates unchanged and without a trailing
/// sleep; a non-retryable error propagates immediately.
pub async fn with_retry<T, E, Op, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    label: &str,
    is_retryable: impl Fn(&E) -> bool,
    mut op: Op,
) -> Result<T, RetryError<E>>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt: u32 = 0;
    loop {
        if cancel.is_cancelled() {
            return Err(RetryError::Cancelled);
        }
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= policy.max_retries || !is_retryable(&err) {
                    return Err(RetryError::Operation(err));
                }
                let delay = policy.delay_for(attempt);
                log::warn!(
                    "{}: attempt {} failed ({}), retrying in {:?}",
                    label,
                    attempt + 1,
                    err,
                    delay
                );
                tokio::select! {
                    _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn quick_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            factor: 2,
        }
    }

    #[test]
    fn delay_doubles_then_caps() {
        let policy = quick_policy();
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(10), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_failures_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_in_op = Arc::clone(&calls);
        let result = with_retry(
            &quick_policy(),
            &CancellationToken::new(),
            "test",
            |_: &String| true,
            move || {
                let calls = Arc::clone(&calls_in_op);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err("transient".to_string())
                    } else {
                        Ok(41 + 1)
                    }
                }
            },
        )
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_propagates_after_one_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_in_op = Arc::clone(&calls);
        let started = tokio::time::Instant::now();
        let result: Result<(), _> = with_retry(
            &quick_policy(),
            &CancellationToken::new(),
            "test",
            |_: &String| false,
            move || {
                let calls = Arc::clone(&calls_in_op);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("permanent".to_string())
                }
            },
        )
        .await;
        assert!(matches!(result, Err(RetryError::Operation(e)) if e == "permanent"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        // No backoff sleep happened.
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_returns_last_error_without_extra_sleep() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_in_op = Arc::clone(&calls);
        let started = tokio::time::Instant::now();
        let result: Result<(), _> = with_retry(
            &quick_policy(),
            &CancellationToken::new(),
            "test",
            |_: &String| true,
            move || {
                let calls = Arc::clone(&calls_in_op);
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    Err(format!("fail {}", n))
                }
            },
        )
        .await;
        // 4 attempts, sleeps of 1 + 2 + 4 seconds between them.
        assert!(matches!(result, Err(RetryError::Operation(e)) if e == "fail 3"));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(started.elapsed(), Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_abandons_backoff() {
        let cancel = CancellationToken::new();
        let cancel_for_op = cancel.clone();
        let result: Result<(), _> = with_retry(
            &quick_policy(),
            &cancel,
            "test",
            |_: &String| true,
            move || {
                let cancel = cancel_for_op.clone();
                async move {
                    // Fail, then cancel while the wrapper is backing off.
                    cancel.cancel();
                    Err("transient".to_string())
                }
            },
        )
        .await;
        assert!(matches!(result, Err(RetryError::Cancelled)));
    }
}
