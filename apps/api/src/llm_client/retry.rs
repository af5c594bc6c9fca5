//! Bounded retry with exponential backoff for LLM calls.
//!
//! Only transient failures (rate limits, overload, 5xx, timeouts) are retried.
//! Permanent failures are returned on the attempt that produced them.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::llm_client::LlmError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Always at least 1.
    pub max_attempts: u32,
    /// Delay after the first failed attempt; doubles after each further failure.
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Upper bound for a single attempt; expiry counts as a transient failure.
    pub attempt_timeout: Duration,
    /// Upper bound for the whole call, retries and backoff included.
    pub deadline: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(16),
            attempt_timeout: Duration::from_secs(120),
            deadline: None,
        }
    }
}

impl RetryPolicy {
    /// Backoff after `failed_attempts` consecutive failures (1-based):
    /// base, 2×base, 4×base, … capped at `max_delay`.
    pub fn delay_for(&self, failed_attempts: u32) -> Duration {
        let exponent = failed_attempts.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    /// Runs `op` until it succeeds, fails permanently, or attempts run out.
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, op: F) -> Result<T, LlmError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        match self.deadline {
            Some(deadline) => tokio::time::timeout(deadline, self.attempts(op))
                .await
                .map_err(|_| LlmError::Deadline(deadline))?,
            None => self.attempts(op).await,
        }
    }

    async fn attempts<T, F, Fut>(&self, mut op: F) -> Result<T, LlmError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let error = match tokio::time::timeout(self.attempt_timeout, op(attempt)).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => e,
                Err(_) => LlmError::Timeout(self.attempt_timeout),
            };

            if !error.is_transient() {
                return Err(error);
            }
            if attempt >= max_attempts {
                return Err(LlmError::Exhausted {
                    attempts: attempt,
                    last: Box::new(error),
                });
            }

            let delay = self.delay_for(attempt);
            warn!(
                "LLM call attempt {}/{} failed ({}), retrying after {}ms...",
                attempt,
                max_attempts,
                error,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
            attempt_timeout: Duration::from_secs(10),
            deadline: None,
        }
    }

    fn rate_limited() -> LlmError {
        LlmError::Api {
            status: 429,
            message: "slow down".to_string(),
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let p = policy();
        let delays: Vec<u128> = (1..=5).map(|n| p.delay_for(n).as_millis()).collect();
        assert_eq!(delays, vec![100, 200, 400, 500, 500]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_are_retried_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result = policy()
            .run(|attempt| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    if attempt < 3 {
                        Err(rate_limited())
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<(), _> = policy()
            .run(|_| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(LlmError::Api {
                        status: 401,
                        message: "invalid x-api-key".to_string(),
                    })
                }
            })
            .await;
        assert!(matches!(result, Err(LlmError::Api { status: 401, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_reports_attempts() {
        let result: Result<(), _> = policy().run(|_| async { Err(rate_limited()) }).await;
        match result {
            Err(LlmError::Exhausted { attempts, last }) => {
                assert_eq!(attempts, 5);
                assert!(matches!(*last, LlmError::Api { status: 429, .. }));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_attempt_times_out_and_is_retried() {
        let p = RetryPolicy {
            attempt_timeout: Duration::from_secs(1),
            ..policy()
        };
        let result = p
            .run(|attempt| async move {
                if attempt == 1 {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                }
                Ok(attempt)
            })
            .await;
        assert_eq!(result.unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_bounds_the_whole_call() {
        let p = RetryPolicy {
            max_attempts: 100,
            deadline: Some(Duration::from_secs(2)),
            ..policy()
        };
        let result: Result<(), _> = p.run(|_| async { Err(rate_limited()) }).await;
        assert!(matches!(result, Err(LlmError::Deadline(_))));
    }
}
