//! Exponential backoff for retryable adapter calls.

use std::time::Duration;

use retrieval_types::RetrievalError;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = self.base_delay.as_millis().saturating_mul(1u128 << attempt.min(16));
        Duration::from_millis(exp.min(self.max_delay.as_millis()) as u64)
    }

    /// Runs `f` up to `max_attempts` times, retrying only on
    /// [`RetrievalError::is_retryable`] outcomes, sleeping with
    /// exponential backoff between attempts.
    pub async fn run<T, F, Fut>(&self, mut f: F) -> Result<T, RetrievalError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, RetrievalError>>,
    {
        let mut attempt = 0;
        loop {
            match f().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt + 1 < self.max_attempts => {
                    tokio::time::sleep(self.delay_for_attempt(attempt)).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_exponentially_and_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
        };
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for_attempt(10), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn retries_until_success() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        };
        let mut calls = 0;
        let result = policy
            .run(|| {
                calls += 1;
                let this_call = calls;
                async move {
                    if this_call < 3 {
                        Err(RetrievalError::UpstreamUnavailable("boom".into()))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn non_retryable_errors_stop_immediately() {
        let policy = RetryPolicy::default();
        let mut calls = 0;
        let result: Result<(), RetrievalError> = policy
            .run(|| {
                calls += 1;
                async { Err(RetrievalError::InvalidInput("bad".into())) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
