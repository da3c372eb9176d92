//! Bounded retry logic with exponential backoff and jitter.
//!
//! Used by the HTTP translation adapter so a transient 5xx or reset connection
//! does not turn into a missing name for the whole run.

use anyhow::Result;
use rand::Rng;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first)
    pub max_attempts: u32,
    /// Base delay in milliseconds for exponential backoff
    pub base_delay_ms: u64,
    /// Cap for a single backoff delay
    pub max_delay_ms: u64,
    /// Maximum total elapsed time across all attempts
    pub max_elapsed_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
            max_delay_ms: 2000,
            max_elapsed_ms: 5000,
        }
    }
}

impl RetryPolicy {
    /// Load retry policy from environment variables with safe defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_attempts: std::env::var("TRANSLATE_RETRY_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n| n > 0 && n <= 10) // Safety: cap at 10
                .unwrap_or(defaults.max_attempts),
            base_delay_ms: std::env::var("TRANSLATE_RETRY_BASE_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n| n > 0)
                .unwrap_or(defaults.base_delay_ms),
            max_delay_ms: std::env::var("TRANSLATE_RETRY_MAX_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n| n > 0)
                .unwrap_or(defaults.max_delay_ms),
            max_elapsed_ms: std::env::var("TRANSLATE_RETRY_MAX_ELAPSED_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n| n > 0)
                .unwrap_or(defaults.max_elapsed_ms),
        }
    }

    /// A policy that never retries
    pub fn single_attempt() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    fn capped_backoff(&self, attempt: u32) -> u64 {
        let exponent = attempt.saturating_sub(1);
        let multiplier = if exponent >= 32 {
            u64::MAX
        } else {
            1u64 << exponent
        };
        self.base_delay_ms
            .saturating_mul(multiplier)
            .min(self.max_delay_ms)
    }

    /// Backoff delay for a given attempt with full jitter:
    /// random in `[0, min(max_delay, base * 2^(attempt-1)))`.
    pub fn backoff_ms(&self, attempt: u32) -> u64 {
        let capped = self.capped_backoff(attempt);
        if capped == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..capped)
        }
    }

    /// Backoff delay with caller-supplied jitter (for testing)
    #[cfg(test)]
    pub fn backoff_ms_with_jitter(&self, attempt: u32, jitter_fn: impl Fn(u64) -> u64) -> u64 {
        jitter_fn(self.capped_backoff(attempt))
    }
}

/// An HTTP error status, attached to an `anyhow::Error` so the retry loop can
/// classify it and honor `Retry-After`.
#[derive(Debug, Clone)]
pub struct HttpStatusError {
    pub status: u16,
    pub retry_after_secs: Option<u64>,
    pub body: String,
}

impl fmt::Display for HttpStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}: {}", self.status, self.body)
    }
}

impl std::error::Error for HttpStatusError {}

/// Retryable error information extracted from a failed attempt
#[derive(Debug)]
pub struct RetryableError {
    pub status_code: Option<u16>,
    pub retry_after_secs: Option<u64>,
    pub message: String,
}

impl RetryableError {
    pub fn from_status(status: u16, message: String) -> Self {
        Self {
            status_code: Some(status),
            retry_after_secs: None,
            message,
        }
    }

    pub fn from_network(message: String) -> Self {
        Self {
            status_code: None,
            retry_after_secs: None,
            message,
        }
    }

    /// Classify an error by inspecting the error chain
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let message = err.to_string();

        if let Some(http) = err.downcast_ref::<HttpStatusError>() {
            return Self {
                status_code: Some(http.status),
                retry_after_secs: http.retry_after_secs,
                message,
            };
        }

        if let Some(reqwest_err) = err.downcast_ref::<reqwest::Error>() {
            if let Some(status) = reqwest_err.status() {
                return Self::from_status(status.as_u16(), message);
            }
            if reqwest_err.is_decode() {
                // Malformed body: retrying returns the same body
                return Self::from_status(422, message);
            }
        }

        Self::from_network(message)
    }
}

/// Check if an error is retryable
///
/// Retryable: network/IO errors, 408, 425, 429 and 5xx.
/// Not retryable: other 4xx, undecodable responses.
pub fn is_retryable(err: &RetryableError) -> bool {
    match err.status_code {
        Some(status) => matches!(status, 408 | 425 | 429 | 500..=599),
        None => true,
    }
}

/// Retry a blocking operation with exponential backoff and jitter.
///
/// Returns the first success, or the last error once attempts or elapsed
/// time run out, or immediately for a non-retryable error.
pub fn retry_blocking<T, F>(policy: &RetryPolicy, op_name: &str, mut operation: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let start = Instant::now();
    let mut attempt = 1;

    loop {
        match operation() {
            Ok(value) => {
                if attempt > 1 {
                    debug!(
                        "retry op={} succeeded after {} attempts (elapsed={}ms)",
                        op_name,
                        attempt,
                        start.elapsed().as_millis()
                    );
                }
                return Ok(value);
            }
            Err(err) => {
                let retry_err = RetryableError::from_anyhow(&err);

                if !is_retryable(&retry_err) {
                    debug!(
                        "retry op={} non-retryable error: {}",
                        op_name, retry_err.message
                    );
                    return Err(err);
                }

                if attempt >= policy.max_attempts {
                    warn!(
                        "retry op={} failed after {} attempts (elapsed={}ms): {}",
                        op_name,
                        attempt,
                        start.elapsed().as_millis(),
                        retry_err.message
                    );
                    return Err(err);
                }

                let elapsed_ms = start.elapsed().as_millis() as u64;
                if elapsed_ms >= policy.max_elapsed_ms {
                    warn!(
                        "retry op={} timeout after {}ms (max={}ms): {}",
                        op_name, elapsed_ms, policy.max_elapsed_ms, retry_err.message
                    );
                    return Err(err);
                }

                let mut backoff_ms = match retry_err.retry_after_secs {
                    Some(retry_after) => retry_after
                        .saturating_mul(1000)
                        .min(policy.max_delay_ms),
                    None => policy.backoff_ms(attempt),
                };
                backoff_ms = backoff_ms.min(policy.max_elapsed_ms.saturating_sub(elapsed_ms));

                let reason = match retry_err.status_code {
                    Some(status) => format!("HTTP_{}", status),
                    None => "NETWORK".to_string(),
                };
                debug!(
                    "retry op={} attempt={} backoff_ms={} reason={}",
                    op_name, attempt, backoff_ms, reason
                );

                if backoff_ms > 0 {
                    std::thread::sleep(Duration::from_millis(backoff_ms));
                }

                attempt += 1;
            }
        }
    }
}
