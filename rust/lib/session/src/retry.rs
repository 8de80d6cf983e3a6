//! Bounded retry for read-only operations.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::config::RetrySettings;
use crate::error::SessionError;

/// Upper bound on a single backoff delay.
pub const MAX_DELAY: Duration = Duration::from_secs(30);

/// Retry schedule: `attempts` tries in total, waiting `initial_delay`
/// before the second and doubling after that, capped at [`MAX_DELAY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub initial_delay: Duration,
}

impl RetryPolicy {
    /// Single attempt, no retry.
    pub const NONE: RetryPolicy = RetryPolicy {
        attempts: 1,
        initial_delay: Duration::ZERO,
    };

    /// Delay before retry number `n` (1-based).
    pub fn delay_for(&self, n: u32) -> Duration {
        let factor = 1u32.checked_shl(n.saturating_sub(1)).unwrap_or(u32::MAX);
        self.initial_delay.saturating_mul(factor).min(MAX_DELAY)
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(s: &RetrySettings) -> Self {
        Self {
            attempts: s.attempts.max(1),
            initial_delay: Duration::from_millis(s.delay_ms),
        }
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy's attempts are used up. Only `Timeout` and `Transport` failures
/// are retried.
pub async fn retry_read<F, Fut, T>(policy: RetryPolicy, operation: &str, mut op: F) -> Result<T, SessionError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SessionError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation, attempt, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if !err.is_retryable() => return Err(err),
            Err(err) if attempt >= policy.attempts => {
                if policy.attempts > 1 {
                    error!(operation, attempt, error = %err, "giving up after retries");
                }
                return Err(err);
            }
            Err(err) => {
                let delay = policy.delay_for(attempt);
                warn!(operation, attempt, error = %err, delay_ms = delay.as_millis() as u64, "retrying");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn fast(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            initial_delay: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let p = RetryPolicy {
            attempts: 10,
            initial_delay: Duration::from_millis(1000),
        };
        assert_eq!(p.delay_for(1), Duration::from_millis(1000));
        assert_eq!(p.delay_for(2), Duration::from_millis(2000));
        assert_eq!(p.delay_for(3), Duration::from_millis(4000));
        assert_eq!(p.delay_for(10), MAX_DELAY);
        assert_eq!(p.delay_for(40), MAX_DELAY);
    }

    #[test]
    fn test_zero_attempts_means_one() {
        let p = RetryPolicy::from(&RetrySettings { attempts: 0, delay_ms: 5 });
        assert_eq!(p.attempts, 1);
    }

    #[tokio::test]
    async fn test_retries_transport_then_succeeds() {
        let calls = AtomicU32::new(0);
        let out = retry_read(fast(3), "search_read", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(SessionError::Transport("refused".into()))
                } else {
                    Ok(n)
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(out, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_stops_after_attempts() {
        let calls = AtomicU32::new(0);
        let err = retry_read(fast(2), "search_count", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(SessionError::Timeout(Duration::from_millis(1))) }
        })
        .await
        .unwrap_err();
        assert!(matches!(err, SessionError::Timeout(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_server_error_not_retried() {
        let calls = AtomicU32::new(0);
        let err = retry_read(fast(5), "search_read", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(SessionError::server(Some("Access Denied".into()), None, None)) }
        })
        .await
        .unwrap_err();
        assert!(matches!(err, SessionError::Server { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
