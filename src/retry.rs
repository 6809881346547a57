/// Retry logic for durable-storage operations
///
/// One combinator shared by every call site that crosses an asynchronous
/// storage boundary. The policy is an attempt count plus a delay function
/// mapping the zero-based attempt number to the pause before the next try.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

/// Delay before retry number `attempt + 1`: 100ms x 2^attempt
pub fn exponential_backoff(attempt: u32) -> Duration {
    Duration::from_millis(100u64.saturating_mul(1u64 << attempt.min(16)))
}

/// No pause between attempts (tests)
pub fn no_delay(_attempt: u32) -> Duration {
    Duration::ZERO
}

/// How many times to try an operation and how long to wait in between
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first (at least one is always made)
    pub attempts: u32,
    pub delay: fn(u32) -> Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: exponential_backoff,
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: fn(u32) -> Duration) -> Self {
        Self { attempts, delay }
    }

    /// Same attempt count, no waiting
    #[must_use]
    pub fn without_delay(mut self) -> Self {
        self.delay = no_delay;
        self
    }

    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        (self.delay)(attempt)
    }
}

/// Run `operation` until it succeeds or the policy's attempts are used up
///
/// The closure receives the zero-based attempt number. The last error is
/// returned when every attempt fails.
pub async fn with_retry<F, Fut, T, E>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation(attempt).await {
            Ok(result) => {
                if attempt > 0 {
                    debug!("{} succeeded after {} retries", operation_name, attempt);
                }
                return Ok(result);
            }
            Err(e) if attempt + 1 < attempts => {
                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    "{} failed (attempt {}/{}): {}, retrying in {:?}",
                    operation_name,
                    attempt + 1,
                    attempts,
                    e,
                    delay
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                warn!("{} failed after {} attempts: {}", operation_name, attempts, e);
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_backoff_doubles() {
        assert_eq!(exponential_backoff(0), Duration::from_millis(100));
        assert_eq!(exponential_backoff(1), Duration::from_millis(200));
        assert_eq!(exponential_backoff(2), Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_succeeds_on_last_attempt() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::default().without_delay();

        let result: Result<u32, String> = with_retry(&policy, "flaky", |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(format!("boom {}", attempt))
                } else {
                    Ok(7)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_returns_last_error() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(2, no_delay);

        let result: Result<(), String> = with_retry(&policy, "always_fails", |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Err(format!("attempt {}", attempt)) }
        })
        .await;

        assert_eq!(result, Err("attempt 1".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_zero_attempts_still_runs_once() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(0, no_delay);

        let result: Result<(), String> = tokio_test::block_on(with_retry(&policy, "once", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("nope".to_string()) }
        }));

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
