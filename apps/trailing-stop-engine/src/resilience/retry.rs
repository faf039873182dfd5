//! Bounded retry with exponential backoff for remote calls.
//!
//! Every remote collaborator a tick touches (heartbeat store, price source,
//! job store patch) is unreliable. [`RemoteRetryWrapper`] retries one call a
//! bounded number of times and then surfaces a [`TransientRemoteError`]; the
//! caller decides whether that error fails the tick or is swallowed.
//!
//! # Example
//!
//! ```rust,ignore
//! use trailing_stop_engine::resilience::{RemoteRetryWrapper, RetryPolicy};
//!
//! let retry = RemoteRetryWrapper::new(RetryPolicy::default());
//! let price = retry
//!     .execute("price_fetch", symbol.as_str(), move || source.live_price(symbol))
//!     .await?;
//! ```

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability;

/// Retry policy for one kind of remote call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total tries including the first one (default: 3).
    pub max_attempts: u32,
    /// Initial backoff duration (default: 200ms).
    pub initial_backoff: Duration,
    /// Maximum backoff duration (default: 5s).
    pub max_backoff: Duration,
    /// Backoff multiplier for exponential growth (default: 2.0).
    pub backoff_multiplier: f64,
    /// Jitter factor for randomization (default: 0.2 = ±20%).
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            jitter_factor: 0.2,
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy with custom settings.
    #[must_use]
    pub const fn new(
        max_attempts: u32,
        initial_backoff: Duration,
        max_backoff: Duration,
        backoff_multiplier: f64,
        jitter_factor: f64,
    ) -> Self {
        Self {
            max_attempts,
            initial_backoff,
            max_backoff,
            backoff_multiplier,
            jitter_factor,
        }
    }

    /// Single try, no retry.
    #[must_use]
    pub const fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            backoff_multiplier: 1.0,
            jitter_factor: 0.0,
        }
    }

    /// Retries without sleeping. Used by tests and local runs.
    #[must_use]
    pub const fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            backoff_multiplier: 1.0,
            jitter_factor: 0.0,
        }
    }
}

/// Calculator for exponential backoff with jitter.
#[derive(Debug)]
pub struct ExponentialBackoffCalculator {
    current_retry: u32,
    max_retries: u32,
    initial_backoff_ms: u64,
    max_backoff_ms: u64,
    backoff_multiplier: f64,
    jitter_factor: f64,
}

impl ExponentialBackoffCalculator {
    /// Create a new backoff calculator from a retry policy.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn new(policy: &RetryPolicy) -> Self {
        Self {
            current_retry: 0,
            max_retries: policy.max_attempts.saturating_sub(1),
            initial_backoff_ms: policy.initial_backoff.as_millis() as u64,
            max_backoff_ms: policy.max_backoff.as_millis() as u64,
            backoff_multiplier: policy.backoff_multiplier,
            jitter_factor: policy.jitter_factor,
        }
    }

    /// Get the delay before the next retry.
    ///
    /// Returns `None` once the retry budget is spent.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if self.current_retry >= self.max_retries {
            return None;
        }

        let base_backoff_ms = self.calculate_base_backoff_ms();
        let jittered_ms = self.apply_jitter(base_backoff_ms);
        let capped_ms = jittered_ms.min(self.max_backoff_ms);

        self.current_retry += 1;

        Some(Duration::from_millis(capped_ms))
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_possible_wrap,
        clippy::cast_precision_loss
    )]
    fn calculate_base_backoff_ms(&self) -> u64 {
        let multiplier = self.backoff_multiplier.powi(self.current_retry as i32);
        let backoff = (self.initial_backoff_ms as f64 * multiplier) as u64;
        backoff.min(self.max_backoff_ms)
    }

    /// Random value in `[backoff * (1 - jitter), backoff * (1 + jitter)]`.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn apply_jitter(&self, backoff_ms: u64) -> u64 {
        if backoff_ms == 0 || self.jitter_factor <= 0.0 {
            return backoff_ms;
        }
        let jitter_range = backoff_ms as f64 * self.jitter_factor;
        let min = (backoff_ms as f64 - jitter_range).max(0.0);
        let max = backoff_ms as f64 + jitter_range;
        rand::rng().random_range(min..=max) as u64
    }

    /// Retries handed out so far.
    #[must_use]
    pub const fn current_retry(&self) -> u32 {
        self.current_retry
    }

    /// Check if more retries are available.
    #[must_use]
    pub const fn has_remaining_retries(&self) -> bool {
        self.current_retry < self.max_retries
    }
}

/// A wrapped remote call exhausted its retries.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{operation} failed for {subject} after {attempts} attempt(s): {last_error}")]
pub struct TransientRemoteError {
    /// Operation name (e.g., "heartbeat", `"price_fetch"`).
    pub operation: &'static str,
    /// What the call was about (job id or symbol).
    pub subject: String,
    /// Tries made.
    pub attempts: u32,
    /// Last underlying error message.
    pub last_error: String,
}

/// Executes one remote call under a [`RetryPolicy`].
#[derive(Debug, Clone, Default)]
pub struct RemoteRetryWrapper {
    policy: RetryPolicy,
}

impl RemoteRetryWrapper {
    /// Create a wrapper for the given policy.
    #[must_use]
    pub const fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Policy in use.
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `call` until it succeeds or the policy is exhausted.
    ///
    /// `call` is invoked once per try and must build a fresh future each time.
    ///
    /// # Errors
    ///
    /// Returns [`TransientRemoteError`] carrying the last underlying error once
    /// every try failed.
    pub async fn execute<T, E, F, Fut>(
        &self,
        operation: &'static str,
        subject: &str,
        mut call: F,
    ) -> Result<T, TransientRemoteError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut backoff = ExponentialBackoffCalculator::new(&self.policy);
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let error = match call().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            let Some(delay) = backoff.next_backoff() else {
                observability::record_remote_exhausted(operation);
                tracing::warn!(
                    operation,
                    subject,
                    attempts,
                    error = %error,
                    "Remote call exhausted retries"
                );
                return Err(TransientRemoteError {
                    operation,
                    subject: subject.to_string(),
                    attempts,
                    last_error: error.to_string(),
                });
            };

            observability::record_remote_retry(operation);
            tracing::debug!(
                operation,
                subject,
                attempt = attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %error,
                "Remote call failed, retrying"
            );
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.initial_backoff, Duration::from_millis(200));
        assert_eq!(policy.max_backoff, Duration::from_secs(5));
        assert!((policy.backoff_multiplier - 2.0).abs() < f64::EPSILON);
        assert!((policy.jitter_factor - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn test_exponential_backoff_sequence() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(30),
            jitter_factor: 0.0,
            ..Default::default()
        };
        let mut backoff = ExponentialBackoffCalculator::new(&policy);

        // Five tries means four delays: 100ms, 200ms, 400ms, 800ms
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(100)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(200)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(400)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(800)));
        assert!(backoff.next_backoff().is_none());
        assert!(!backoff.has_remaining_retries());
    }

    #[test]
    fn test_max_backoff_cap() {
        let policy = RetryPolicy {
            max_attempts: 20,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(5),
            backoff_multiplier: 10.0,
            jitter_factor: 0.0,
        };
        let mut backoff = ExponentialBackoffCalculator::new(&policy);

        assert_eq!(backoff.next_backoff(), Some(Duration::from_secs(1)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_secs(5)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_secs(5)));
        assert_eq!(backoff.current_retry(), 3);
    }

    #[test]
    fn test_jitter_range() {
        let policy = RetryPolicy {
            initial_backoff: Duration::from_millis(100),
            jitter_factor: 0.2,
            ..Default::default()
        };

        for _ in 0..100 {
            let mut backoff = ExponentialBackoffCalculator::new(&policy);
            let duration = backoff
                .next_backoff()
                .expect("first backoff should always succeed");

            assert!(
                duration >= Duration::from_millis(80) && duration <= Duration::from_millis(120),
                "Duration {duration:?} not in expected range 80-120ms"
            );
        }
    }

    #[test]
    fn test_single_attempt_has_no_backoff() {
        let mut backoff = ExponentialBackoffCalculator::new(&RetryPolicy::no_retry());
        assert!(backoff.next_backoff().is_none());
    }

    #[tokio::test]
    async fn test_execute_returns_first_success() {
        let retry = RemoteRetryWrapper::new(RetryPolicy::immediate(3));
        let calls = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&calls);
        let result: Result<u32, TransientRemoteError> = retry
            .execute("heartbeat", "job-1", move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(7)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_execute_recovers_after_transient_failures() {
        let retry = RemoteRetryWrapper::new(RetryPolicy::immediate(3));
        let calls = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&calls);
        let result = retry
            .execute("price_fetch", "SPY250117P00450000", move || {
                let counter = Arc::clone(&counter);
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    if n < 3 {
                        Err(format!("timeout #{n}"))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_execute_exhaustion_carries_last_error() {
        let retry = RemoteRetryWrapper::new(RetryPolicy::immediate(4));
        let calls = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&calls);
        let err = retry
            .execute("price_fetch", "SPY250117C00480000", move || {
                let counter = Arc::clone(&counter);
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    Err::<(), _>(format!("503 #{n}"))
                }
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(err.operation, "price_fetch");
        assert_eq!(err.subject, "SPY250117C00480000");
        assert_eq!(err.attempts, 4);
        assert_eq!(err.last_error, "503 #4");
        assert_eq!(
            err.to_string(),
            "price_fetch failed for SPY250117C00480000 after 4 attempt(s): 503 #4"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_sleeps_between_tries() {
        let policy = RetryPolicy {
            max_attempts: 2,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(1),
            backoff_multiplier: 1.0,
            jitter_factor: 0.0,
        };
        let retry = RemoteRetryWrapper::new(policy);
        let started = tokio::time::Instant::now();

        let result = retry
            .execute("persistence_patch", "job-1", || async {
                Err::<(), _>("unavailable")
            })
            .await;

        assert!(result.is_err());
        assert!(started.elapsed() >= Duration::from_secs(1));
    }
}
