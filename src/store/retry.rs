// Bounded retry with a fixed delay between attempts
use crate::config::{DEFAULT_RETRIES, DEFAULT_RETRY_DELAY_SECS};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// How many times to try and how long to wait between tries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one
    pub attempts: u32,
    /// Fixed delay between two consecutive attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_RETRIES,
            delay: Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    /// A single attempt, no waiting
    pub fn no_retry() -> Self {
        Self {
            attempts: 1,
            delay: Duration::ZERO,
        }
    }
}

/// Source of the pause between attempts
#[allow(async_fn_in_trait)]
pub trait Sleeper {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Why a retried operation gave up
#[derive(Debug)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error
    Exhausted { attempts: u32, last_error: E },
    /// An attempt failed with an error that must not be retried
    Aborted { attempt: u32, error: E },
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// `policy.attempts` attempts have failed. The operation receives the 1-based
/// attempt number. There is no pause after the final attempt.
pub async fn retry_with_fixed_delay<S, F, Fut, T, E, R>(
    policy: &RetryPolicy,
    sleeper: &S,
    operation_name: &str,
    is_retryable: R,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    S: Sleeper,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    R: Fn(&E) -> bool,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    debug!("{}: succeeded on attempt {}/{}", operation_name, attempt, attempts);
                }
                return Ok(value);
            }
            Err(error) if !is_retryable(&error) => {
                return Err(RetryError::Aborted { attempt, error });
            }
            Err(error) => {
                if attempt >= attempts {
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last_error: error,
                    });
                }
                warn!(
                    "{}: attempt {}/{} failed ({}), retrying in {:?}",
                    operation_name, attempt, attempts, error, policy.delay
                );
                sleeper.sleep(policy.delay).await;
                attempt += 1;
            }
        }
    }
}
