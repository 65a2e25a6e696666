//! Bounded exponential backoff around remote calls.
//!
//! [`with_backoff`] retries an operation only while its failure is
//! classified transient ([`EngineError::is_retryable`]: 429, 5xx, or a
//! network-level failure). Validation, authorization, and other permanent
//! failures propagate immediately, and once the attempt budget is spent the
//! last observed error propagates unchanged so callers can still inspect
//! its status code.
//!
//! Each call's backoff is independent; there is no cross-call rate limit.

use std::future::Future;
use std::time::Duration;

use rand::Rng as _;
use tracing::debug;

use crate::error::{EngineError, EngineResult};

/// Backoff configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum attempts, including the first.
    pub max_attempts: u32,
    /// Initial backoff delay.
    pub base_delay: Duration,
    /// Delay cap.
    pub max_delay: Duration,
    /// Draw the actual wait uniformly from `[0, delay]` instead of sleeping
    /// the full delay.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(300),
            max_delay: Duration::from_millis(8000),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the given attempt budget and default delays.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// Builder: set the base delay.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Builder: set the delay cap.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Builder: disable jitter (sleep the full computed delay).
    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// The capped exponential delay after the given failed attempt
    /// (1-based): `min(cap, base * 2^(attempt-1))`.
    fn delay_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(20);
        let exponential = self.base_delay.saturating_mul(1u32 << shift);
        exponential.min(self.max_delay)
    }
}

/// Runs `operation`, retrying transient failures with capped exponential
/// backoff per `policy`.
pub async fn with_backoff<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> EngineResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = EngineResult<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                if !err.is_retryable() || attempt >= policy.max_attempts {
                    return Err(err);
                }

                let delay = policy.delay_for(attempt);
                let wait = if policy.jitter {
                    delay.mul_f64(rand::rng().random::<f64>())
                } else {
                    delay
                };
                debug!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    ?wait,
                    "transient failure, backing off: {err}"
                );
                tokio::time::sleep(wait).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::default()
            .with_base_delay(Duration::from_millis(1))
            .with_max_delay(Duration::from_millis(2))
            .without_jitter()
    }

    #[test]
    fn default_policy_matches_contract() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.base_delay, Duration::from_millis(300));
        assert_eq!(policy.max_delay, Duration::from_millis(8000));
        assert!(policy.jitter);
    }

    #[test]
    fn delay_doubles_until_the_cap() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_millis(300));
        assert_eq!(policy.delay_for(2), Duration::from_millis(600));
        assert_eq!(policy.delay_for(3), Duration::from_millis(1200));
        assert_eq!(policy.delay_for(4), Duration::from_millis(2400));
        assert_eq!(policy.delay_for(10), Duration::from_millis(8000));
        assert_eq!(policy.delay_for(100), Duration::from_millis(8000));
    }

    #[tokio::test]
    async fn server_error_exhausts_the_attempt_budget() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: EngineResult<()> = with_backoff(&fast_policy(), || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(EngineError::server("boom").with_status(500))
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 5);
        let err = result.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.message(), "boom");
    }

    #[tokio::test]
    async fn bad_request_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: EngineResult<()> = with_backoff(&fast_policy(), || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(EngineError::bad_request("nope").with_status(400))
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.unwrap_err().status(), Some(400));
    }

    #[tokio::test]
    async fn rate_limit_then_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result = with_backoff(&fast_policy(), || {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(EngineError::rate_limited("slow down"))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn validation_error_is_never_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: EngineResult<()> = with_backoff(&fast_policy(), || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(EngineError::validation("end before start"))
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(result.is_err());
    }
}
