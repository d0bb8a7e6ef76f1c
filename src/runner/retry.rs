use crate::config::RetryPolicy;
use crate::error::IsRetryable;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug)]
pub enum RetryError<E> {
    /// Last error once the attempts ran out, or a permanent failure under
    /// `stop_on_permanent`
    GaveUp(E),
    Cancelled,
}

/// Result of a retried operation along with the attempts it consumed
#[derive(Debug)]
pub struct Retried<T, E> {
    pub attempts: u32,
    pub result: Result<T, RetryError<E>>,
}

/// Execute an async operation until it succeeds, runs out of attempts, or
/// `cancel` fires.
///
/// Every failure is retried unless `policy.stop_on_permanent` is set, in
/// which case errors that are not retryable end the loop early. Both the
/// operation and the wait between attempts race against `cancel`.
pub async fn retry_with_backoff<F, Fut, T, E>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut operation: F,
) -> Retried<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let max_attempts = policy.max_attempts();
    let mut attempts = 0;

    loop {
        if cancel.is_cancelled() {
            return Retried {
                attempts,
                result: Err(RetryError::Cancelled),
            };
        }

        attempts += 1;

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Retried {
                    attempts,
                    result: Err(RetryError::Cancelled),
                };
            }
            outcome = operation() => outcome,
        };

        match outcome {
            Ok(value) => {
                if attempts > 1 {
                    info!(attempts, "Operation succeeded after retry");
                }
                return Retried {
                    attempts,
                    result: Ok(value),
                };
            }
            Err(e) if policy.stop_on_permanent && !e.is_retryable() => {
                warn!(error = %e, attempts, "Permanent failure, not retrying");
                return Retried {
                    attempts,
                    result: Err(RetryError::GaveUp(e)),
                };
            }
            Err(e) if attempts >= max_attempts => {
                warn!("All {} attempts failed: {}", attempts, e);
                return Retried {
                    attempts,
                    result: Err(RetryError::GaveUp(e)),
                };
            }
            Err(e) => {
                let delay = jittered_delay(policy, attempts);

                warn!(
                    "Attempt {}/{} failed: {}. Retrying in {:?}...",
                    attempts, max_attempts, e, delay
                );

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        return Retried {
                            attempts,
                            result: Err(RetryError::Cancelled),
                        };
                    }
                    _ = sleep(delay) => {}
                }
            }
        }
    }
}

fn jittered_delay(policy: &RetryPolicy, retry: u32) -> Duration {
    let delay = policy.delay_for(retry);
    if policy.jitter && policy.delay_ms > 0 {
        let jitter = rand::random::<u64>() % policy.delay_ms;
        delay + Duration::from_millis(jitter)
    } else {
        delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Debug)]
    struct Flaky(bool);

    impl std::fmt::Display for Flaky {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "flaky (retryable: {})", self.0)
        }
    }

    impl IsRetryable for Flaky {
        fn is_retryable(&self) -> bool {
            self.0
        }
    }

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            delay_ms: 10,
            ..RetryPolicy::default()
        }
    }

    #[tokio::test]
    async fn test_retry_success_first_attempt() {
        let cancel = CancellationToken::new();

        let retried: Retried<i32, Flaky> =
            retry_with_backoff(&policy(3), &cancel, || async { Ok(42) }).await;

        assert_eq!(retried.attempts, 1);
        assert_eq!(retried.result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_retry_success_after_failures() {
        let cancel = CancellationToken::new();
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();

        let retried = retry_with_backoff(&policy(3), &cancel, || {
            let calls = calls_clone.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(Flaky(true))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(retried.result.unwrap(), 42);
        assert_eq!(retried.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_all_failures() {
        let cancel = CancellationToken::new();
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();

        let retried: Retried<(), Flaky> = retry_with_backoff(&policy(3), &cancel, || {
            let calls = calls_clone.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Flaky(true))
            }
        })
        .await;

        assert!(matches!(retried.result, Err(RetryError::GaveUp(_))));
        assert_eq!(retried.attempts, 4);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_zero_retries_means_single_attempt() {
        let cancel = CancellationToken::new();

        let retried: Retried<(), Flaky> =
            retry_with_backoff(&policy(0), &cancel, || async { Err(Flaky(true)) }).await;

        assert_eq!(retried.attempts, 1);
        assert!(retried.result.is_err());
    }

    #[tokio::test]
    async fn test_permanent_failure_retried_by_default() {
        let cancel = CancellationToken::new();

        let retried: Retried<(), Flaky> =
            retry_with_backoff(&policy(5), &cancel, || async { Err(Flaky(false)) }).await;

        assert_eq!(retried.attempts, 6);
        assert!(matches!(retried.result, Err(RetryError::GaveUp(Flaky(false)))));
    }

    #[tokio::test]
    async fn test_stop_on_permanent_gives_up_early() {
        let cancel = CancellationToken::new();
        let strict = RetryPolicy {
            stop_on_permanent: true,
            ..policy(5)
        };

        let retried: Retried<(), Flaky> =
            retry_with_backoff(&strict, &cancel, || async { Err(Flaky(false)) }).await;
        assert_eq!(retried.attempts, 1);
        assert!(matches!(retried.result, Err(RetryError::GaveUp(Flaky(false)))));

        let retried: Retried<(), Flaky> =
            retry_with_backoff(&strict, &cancel, || async { Err(Flaky(true)) }).await;
        assert_eq!(retried.attempts, 6);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_backoff_wait() {
        let cancel = CancellationToken::new();
        let slow = RetryPolicy {
            max_retries: 3,
            delay_ms: 60_000,
            ..RetryPolicy::default()
        };

        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let retried: Retried<(), Flaky> =
            retry_with_backoff(&slow, &cancel, || async { Err(Flaky(true)) }).await;

        assert!(matches!(retried.result, Err(RetryError::Cancelled)));
        assert_eq!(retried.attempts, 1);
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_already_cancelled_makes_no_attempt() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let retried: Retried<(), Flaky> =
            retry_with_backoff(&policy(3), &cancel, || async { Ok(()) }).await;

        assert_eq!(retried.attempts, 0);
        assert!(matches!(retried.result, Err(RetryError::Cancelled)));
    }

    #[test]
    fn test_jitter_stays_within_one_delay() {
        let policy = RetryPolicy {
            delay_ms: 100,
            jitter: true,
            ..RetryPolicy::default()
        };
        for _ in 0..50 {
            let delay = jittered_delay(&policy, 1);
            assert!(delay >= Duration::from_millis(100));
            assert!(delay < Duration::from_millis(200));
        }
    }
}
