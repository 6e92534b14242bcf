//! Retry policy with exponential backoff and error classification.

use log::{debug, warn};
use std::future::Future;
use std::time::Duration;

use super::error::RequestError;

/// Default number of attempts, including the first one.
pub const MAX_ATTEMPTS: usize = 3;

/// Default delay before the first retry.
pub const BASE_DELAY: Duration = Duration::from_secs(1);

/// Default multiplier applied to the delay after each failed attempt.
pub const BACKOFF_FACTOR: u32 = 2;

/// How failed calls are retried.
///
/// A policy is a plain value: each [`RetryPolicy::run`] keeps its own attempt
/// counter and delay, so one policy can be shared by any number of calls.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: usize,
    base_delay: Duration,
    backoff: u32,
    retryable: fn(&RequestError) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            base_delay: BASE_DELAY,
            backoff: BACKOFF_FACTOR,
            retryable: is_transient,
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn none() -> Self {
        Self::default().with_max_attempts(1)
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_backoff(mut self, backoff: u32) -> Self {
        self.backoff = backoff;
        self
    }

    /// Replaces the predicate deciding which failures are worth another attempt.
    pub fn with_predicate(mut self, retryable: fn(&RequestError) -> bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn is_retryable(&self, error: &RequestError) -> bool {
        (self.retryable)(error)
    }

    /// Delay slept after the given (1-based) failed attempt:
    /// `base_delay * backoff^(attempt - 1)`.
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1).min(u32::MAX as usize) as u32;
        self.base_delay
            .saturating_mul(self.backoff.saturating_pow(exponent))
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable error,
    /// or runs out of attempts.
    pub async fn run<F, Fut, T>(&self, operation_name: &str, operation: F) -> Result<T, RequestError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, RequestError>>,
    {
        let mut attempt = 1;

        loop {
            let error = match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => e,
            };

            if !self.is_retryable(&error) {
                debug!("{}: non-retryable error: {}", operation_name, error);
                return Err(error);
            }

            if attempt >= self.max_attempts {
                warn!(
                    "{}: giving up after {} attempts ({})",
                    operation_name, attempt, error
                );
                return Err(RequestError::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(error),
                });
            }

            let delay = self.delay_for(attempt);
            warn!(
                "{}: attempt {}/{} failed ({}), retrying in {:?}...",
                operation_name, attempt, self.max_attempts, error, delay
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Default classification: timeouts, transport failures, 5xx and 429 are transient.
///
/// Other 4xx statuses will not change on retry and are returned as-is.
pub fn is_transient(error: &RequestError) -> bool {
    match error {
        RequestError::Timeout | RequestError::Transport(_) => true,
        RequestError::Http { status, .. } => *status >= 500 || *status == 429,
        _ => false,
    }
}

/// Retries every request-level failure, including all HTTP error statuses.
pub fn any_request_failure(error: &RequestError) -> bool {
    matches!(
        error,
        RequestError::Timeout
            | RequestError::Transport(_)
            | RequestError::Http { .. }
            | RequestError::Unauthorized
            | RequestError::Forbidden
    )
}
