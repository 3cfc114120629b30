//! Retrying HTTP plumbing shared by the brokerage adapters.
//!
//! Network errors and retryable statuses (429 with Retry-After, 5xx, 408)
//! are retried with exponential backoff; everything else is returned to the
//! adapter for backend-specific handling.

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use thiserror::Error;

use super::BrokerError;

/// Retry policy for backend HTTP calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts.
    pub max_attempts: u32,
    /// Initial backoff duration.
    pub initial_backoff: Duration,
    /// Backoff ceiling.
    pub max_backoff: Duration,
    /// Backoff multiplier.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

/// HTTP transport failure after retries were exhausted.
#[derive(Debug, Error, Clone)]
pub enum HttpError {
    /// Network-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// Retries exhausted.
    #[error("max retries exceeded after {attempts} attempts")]
    MaxRetriesExceeded {
        /// Attempts made before giving up.
        attempts: u32,
    },
}

impl From<HttpError> for BrokerError {
    fn from(err: HttpError) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Send a request, retrying transient failures per the policy.
///
/// `build` is called once per attempt so the request body is rebuilt fresh.
/// Non-retryable statuses are returned as-is for the caller to interpret.
pub async fn send_with_retry<F>(policy: &RetryPolicy, build: F) -> Result<Response, HttpError>
where
    F: Fn() -> RequestBuilder,
{
    let mut backoff = ExponentialBackoff::new(policy);

    loop {
        let response = match build().send().await {
            Ok(resp) => resp,
            Err(e) => {
                if let Some(delay) = backoff.next_backoff() {
                    tracing::warn!(
                        error = %e,
                        delay_ms = delay.as_millis(),
                        attempt = backoff.attempt,
                        "network error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                return Err(HttpError::Network(e.to_string()));
            }
        };

        let status = response.status();
        if !is_retryable_status(status) {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs);

        let delay = retry_after.or_else(|| backoff.next_backoff());
        let Some(delay) = delay else {
            return Err(HttpError::MaxRetriesExceeded {
                attempts: backoff.attempt,
            });
        };

        tracing::warn!(
            status = status.as_u16(),
            delay_ms = delay.as_millis(),
            "retryable status, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}

/// Whether a status warrants a retry.
#[must_use]
pub fn is_retryable_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 408 | 429 | 500 | 502 | 503 | 504)
}

/// Exponential backoff calculator.
#[derive(Debug)]
struct ExponentialBackoff {
    attempt: u32,
    max_attempts: u32,
    current: Duration,
    max: Duration,
    multiplier: f64,
}

impl ExponentialBackoff {
    const fn new(policy: &RetryPolicy) -> Self {
        Self {
            attempt: 0,
            max_attempts: policy.max_attempts,
            current: policy.initial_backoff,
            max: policy.max_backoff,
            multiplier: policy.multiplier,
        }
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        self.attempt += 1;
        if self.attempt >= self.max_attempts {
            return None;
        }

        let backoff = self.current;
        self.current = Duration::from_secs_f64(
            (self.current.as_secs_f64() * self.multiplier).min(self.max.as_secs_f64()),
        );
        Some(backoff)
    }
}
