//! Exponential backoff with jitter for transient embedder/vector-store
//! failures, per `SPEC_FULL.md` §4.5 and §5.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::domain::IndexError;

/// Retry policy: up to `max_attempts` tries total, with delay doubling
/// from `base_delay` each attempt (capped at `max_delay`) and up to 50%
/// jitter added to avoid synchronized retries across concurrent workers.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts including the first, non-retried call.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound on any single retry's delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 4, base_delay: Duration::from_millis(200), max_delay: Duration::from_secs(10) }
    }
}

impl RetryPolicy {
    fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let scaled = self.base_delay.saturating_mul(1u32.checked_shl(exponent).unwrap_or(u32::MAX));
        let capped = scaled.min(self.max_delay);
        let jitter_fraction = rand::rng().random_range(0.0..0.5);
        capped.mul_f64(1.0 + jitter_fraction)
    }

    /// Run `operation`, retrying while it returns a transient
    /// [`IndexError`] and attempts remain. A non-transient error is
    /// returned immediately without further attempts.
    pub async fn run<F, Fut, T>(&self, mut operation: F) -> Result<T, IndexError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, IndexError>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    tokio::time::sleep(self.delay_for(attempt)).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let policy = RetryPolicy { max_attempts: 3, base_delay: Duration::from_millis(1), max_delay: Duration::from_millis(5) };
        let calls = AtomicU32::new(0);
        let result = policy
            .run(|| async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(IndexError::transient("test", "not yet"))
                } else {
                    Ok(42)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stops_immediately_on_non_transient_error() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);
        let result: Result<(), IndexError> = policy
            .run(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(IndexError::per_file("f.rs", "syntax error"))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let policy = RetryPolicy { max_attempts: 2, base_delay: Duration::from_millis(1), max_delay: Duration::from_millis(2) };
        let calls = AtomicU32::new(0);
        let result: Result<(), IndexError> = policy
            .run(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(IndexError::transient("test", "still failing"))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
