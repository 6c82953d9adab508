use std::fmt;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Call budget applied to every collaborator call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemotePolicy {
    pub timeout: Duration,
    /// Total attempts for idempotent store reads (1 disables retries).
    pub attempts: u32,
    pub base_delay: Duration,
}

impl RemotePolicy {
    pub fn new(timeout: Duration, attempts: u32, base_delay: Duration) -> Self {
        Self {
            timeout,
            attempts: attempts.max(1),
            base_delay,
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

impl Default for RemotePolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), 3, Duration::from_millis(100))
    }
}

/// Outcome of a bounded collaborator call that did not succeed.
#[derive(Debug)]
pub enum CallFailure<E> {
    TimedOut(Duration),
    Failed(E),
}

impl<E: fmt::Display> fmt::Display for CallFailure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallFailure::TimedOut(limit) => write!(f, "timed out after {}ms", limit.as_millis()),
            CallFailure::Failed(err) => write!(f, "{err}"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for CallFailure<E> {}

pub(crate) async fn call_with_timeout<T, E, Fut>(
    limit: Duration,
    call: Fut,
) -> Result<T, CallFailure<E>>
where
    Fut: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(CallFailure::Failed(err)),
        Err(_) => Err(CallFailure::TimedOut(limit)),
    }
}

/// Run an idempotent read with per-attempt timeout and exponential backoff.
/// The last failure is returned once attempts are exhausted.
pub(crate) async fn call_with_retry<T, E, F, Fut>(
    policy: &RemotePolicy,
    operation: &'static str,
    mut call: F,
) -> Result<T, CallFailure<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let mut attempt = 1;
    loop {
        match call_with_timeout(policy.timeout, call()).await {
            Ok(value) => return Ok(value),
            Err(failure) if attempt < policy.attempts => {
                let delay = policy.backoff(attempt);
                warn!(
                    operation,
                    attempt,
                    error = %failure,
                    delay_ms = delay.as_millis() as u64,
                    "collaborator call failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(failure) => return Err(failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(attempts: u32) -> RemotePolicy {
        RemotePolicy::new(Duration::from_millis(50), attempts, Duration::ZERO)
    }

    #[tokio::test]
    async fn retries_until_success() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, CallFailure<String>> =
            call_with_retry(&fast_policy(3), "flaky", || {
                let attempt = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if attempt < 3 {
                        Err(format!("attempt {attempt} failed"))
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;

        assert_eq!(result.expect("third attempt succeeds"), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn returns_last_failure_when_exhausted() {
        let calls = AtomicU32::new(0);
        let result: Result<(), CallFailure<String>> =
            call_with_retry(&fast_policy(2), "broken", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("unavailable".to_string()) }
            })
            .await;

        match result {
            Err(CallFailure::Failed(message)) => assert_eq!(message, "unavailable"),
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn slow_calls_time_out() {
        let result: Result<(), CallFailure<String>> =
            call_with_timeout(Duration::from_millis(10), async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(CallFailure::TimedOut(_))));
    }

    #[test]
    fn zero_attempts_are_clamped_to_one() {
        let policy = RemotePolicy::new(Duration::from_secs(1), 0, Duration::from_millis(10));
        assert_eq!(policy.attempts, 1);
        assert_eq!(policy.backoff(3), Duration::from_millis(40));
    }
}
