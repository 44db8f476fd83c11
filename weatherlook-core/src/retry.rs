//! Exponential-backoff retry around gateway calls.
//!
//! Transient failures (network, 5xx, unrecognised codes) are retried with a
//! doubling delay. Auth, not-found and rate-limit failures are returned on the
//! first hit since repeating the request cannot change the outcome.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ResolutionError;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles for each one after.
    pub initial_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay_ms: DEFAULT_INITIAL_DELAY_MS,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_delay_ms: u64) -> Self {
        Self { max_retries, initial_delay_ms }
    }

    /// No retries at all.
    pub fn none() -> Self {
        Self::new(0, 0)
    }

    /// Delay before retry number `retry` (0-based): 1s, 2s, 4s with defaults.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let factor = 2u64.saturating_pow(retry);
        Duration::from_millis(self.initial_delay_ms.saturating_mul(factor))
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error, or
    /// the retries run out. The error returned is always the last attempt's.
    pub async fn run<T, F, Fut>(&self, what: &str, mut operation: F) -> Result<T, ResolutionError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ResolutionError>>,
    {
        let mut retry = 0;
        loop {
            match operation().await {
                Ok(value) => {
                    if retry > 0 {
                        tracing::debug!("{what} succeeded after {retry} retries");
                    }
                    return Ok(value);
                }
                Err(err) if !err.kind().is_retryable() => {
                    tracing::debug!("{what} failed with non-retryable error: {err}");
                    return Err(err);
                }
                Err(err) if retry >= self.max_retries => {
                    tracing::warn!("{what} failed after {} attempts: {err}", retry + 1);
                    return Err(err);
                }
                Err(err) => {
                    let delay = self.delay_for_retry(retry);
                    retry += 1;
                    tracing::debug!(
                        "{what} failed ({err}), retry {retry} of {} in {delay:?}",
                        self.max_retries
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[test]
    fn default_delays_double_from_one_second() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_retry(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for_retry(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for_retry(2), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn three_transient_failures_then_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let start = Instant::now();

        let result = RetryPolicy::default()
            .run("test", move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 3 { Err(ResolutionError::new("boom", "503")) } else { Ok(n) }
            })
            .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(7) && elapsed < Duration::from_secs(8), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn fewer_failures_wait_only_for_the_retries_used() {
        for (failures, waited_secs) in [(0u32, 0u64), (1, 1), (2, 3)] {
            let counter = AtomicU32::new(0);
            let calls = &counter;
            let start = Instant::now();

            let result = RetryPolicy::default()
                .run("test", move || async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    if n < failures { Err(ResolutionError::new("boom", "502")) } else { Ok(n) }
                })
                .await;

            assert_eq!(result, Ok(failures));
            assert_eq!(calls.load(Ordering::SeqCst), failures + 1);
            let elapsed = start.elapsed();
            let expected = Duration::from_secs(waited_secs);
            assert!(
                elapsed >= expected && elapsed < expected + Duration::from_secs(1),
                "{failures} failures: {elapsed:?}"
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_return_last_error() {
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let result: Result<(), _> = RetryPolicy::default()
            .run("test", move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                Err(ResolutionError::new(format!("attempt {n}"), "500"))
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(result, Err(ResolutionError::new("attempt 3", "500")));
    }

    #[tokio::test(start_paused = true)]
    async fn auth_error_is_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let start = Instant::now();

        let result: Result<(), _> = RetryPolicy::default()
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ResolutionError::new("Invalid API key", "401"))
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(result.map_err(|e| e.code), Err("401".to_string()));
    }
}
