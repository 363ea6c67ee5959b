//! Bounded exponential backoff for provider calls.

use std::future::Future;
use std::time::Duration;

use super::{ProviderError, ProviderKind};

/// Exponential backoff applied to transient provider failures only.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt before giving up.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Cap for exponential growth.
    pub max_backoff: Duration,
    /// Multiplier applied to the backoff after each retry.
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_secs(4),
            max_backoff: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    #[cfg(test)]
    pub(crate) fn without_delay(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            backoff_multiplier: 1.0,
        }
    }

    /// True when the error is transient and retries remain
    pub fn should_retry(&self, error: &ProviderError, retry_count: u32) -> bool {
        error.is_transient() && retry_count < self.max_retries
    }

    /// `initial_backoff * multiplier^retry_count`, capped at `max_backoff`
    pub fn backoff(&self, retry_count: u32) -> Duration {
        let exponent = i32::try_from(retry_count).unwrap_or(i32::MAX);
        let secs = self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        Duration::try_from_secs_f64(secs)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    /// Runs `op` until it succeeds, fails non-transiently, or attempts run out.
    pub async fn run<T, F, Fut>(&self, provider: ProviderKind, mut op: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut retry_count = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if self.should_retry(&e, retry_count) => {
                    let delay = self.backoff(retry_count);
                    tracing::warn!(
                        provider = %provider,
                        retry = retry_count + 1,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient provider failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    retry_count += 1;
                }
                Err(e) => {
                    tracing::error!(
                        provider = %provider,
                        attempts = retry_count + 1,
                        error = %e,
                        "Provider call failed"
                    );
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_default_policy_allows_three_attempts() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 2);
        assert_eq!(policy.initial_backoff, Duration::from_secs(4));
        assert_eq!(policy.max_backoff, Duration::from_secs(10));
    }

    #[test]
    fn test_should_retry() {
        let policy = RetryPolicy::default();
        let reset = ProviderError::Transport("connection reset".to_string());
        let rate_limited = ProviderError::Status {
            status: 429,
            message: "slow down".to_string(),
        };

        assert!(policy.should_retry(&reset, 0));
        assert!(policy.should_retry(&reset, 1));
        assert!(!policy.should_retry(&reset, 2));
        assert!(!policy.should_retry(&rate_limited, 0));
    }

    #[test]
    fn test_custom_multiplier() {
        let policy = RetryPolicy {
            max_retries: 5,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(100),
            backoff_multiplier: 3.0,
        };
        assert_eq!(policy.backoff(0), Duration::from_secs(1));
        assert_eq!(policy.backoff(2), Duration::from_secs(9));
    }

    #[test]
    fn test_backoff_is_exponential_and_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0), Duration::from_secs(4));
        assert_eq!(policy.backoff(1), Duration::from_secs(8));
        assert_eq!(policy.backoff(2), Duration::from_secs(10));
        assert_eq!(policy.backoff(40), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_transient_errors_retry_until_exhausted() {
        let policy = RetryPolicy::without_delay(2);
        let calls = Arc::new(AtomicU32::new(0));

        let counter = calls.clone();
        let result: Result<String, _> = policy
            .run(ProviderKind::Claude, || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(ProviderError::Transport("connection reset".to_string()))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_transient_error_is_not_retried() {
        let policy = RetryPolicy::without_delay(2);
        let calls = Arc::new(AtomicU32::new(0));

        let counter = calls.clone();
        let result: Result<String, _> = policy
            .run(ProviderKind::OpenAi, || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(ProviderError::Status {
                        status: 401,
                        message: "invalid api key".to_string(),
                    })
                }
            })
            .await;

        assert_eq!(
            result,
            Err(ProviderError::Status {
                status: 401,
                message: "invalid api key".to_string()
            })
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failure() {
        let policy = RetryPolicy::without_delay(2);
        let calls = Arc::new(AtomicU32::new(0));

        let counter = calls.clone();
        let result = policy
            .run(ProviderKind::Gemini, || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(ProviderError::Status {
                            status: 502,
                            message: "bad gateway".to_string(),
                        })
                    } else {
                        Ok("{\"recommendations\": []}".to_string())
                    }
                }
            })
            .await;

        tokio_test::assert_ok!(&result);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
