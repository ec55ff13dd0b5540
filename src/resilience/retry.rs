// ABOUTME: Stateless exponential backoff calculator and retry executor.
// ABOUTME: delay = min(base * 2^attempt, max), optionally perturbed by +/-25% jitter.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

const JITTER_FRACTION: f64 = 0.25;

/// Backoff configuration. Immutable and cheap to copy, so one policy can be
/// handed to every component that retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "default_base_delay", with = "humantime_serde")]
    pub base_delay: Duration,

    #[serde(default = "default_max_delay", with = "humantime_serde")]
    pub max_delay: Duration,

    /// Total attempts including the first call. Zero is treated as one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

fn default_base_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_max_attempts() -> u32 {
    3
}

fn default_jitter() -> bool {
    true
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            base_delay: default_base_delay(),
            max_delay: default_max_delay(),
            max_attempts: default_max_attempts(),
            jitter: default_jitter(),
        }
    }
}

/// All attempts failed.
#[derive(Debug, thiserror::Error)]
#[error("retry exhausted after {attempts} attempts: {last_error}")]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

impl RetryPolicy {
    /// A policy that never sleeps between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        RetryPolicy {
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            max_attempts,
            jitter: false,
        }
    }

    /// Delay before the retry following the zero-indexed `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::ZERO;
        }

        let delay = 2u32
            .checked_pow(attempt)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .map_or(self.max_delay, |d| d.min(self.max_delay));

        if !self.jitter {
            return delay;
        }

        let factor = 1.0 + rand::rng().random_range(-JITTER_FRACTION..=JITTER_FRACTION);
        Duration::try_from_secs_f64((delay.as_secs_f64() * factor).max(0.0)).unwrap_or(delay)
    }

    /// Run `operation` until it succeeds or attempts run out, sleeping
    /// `delay_for(n)` after the n-th failure.
    ///
    /// # Errors
    ///
    /// Returns `RetryExhausted` with the last error once every attempt failed.
    pub async fn execute<T, E, F, Fut>(&self, mut operation: F) -> Result<T, RetryExhausted<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            tracing::debug!(attempt = attempt + 1, max_attempts, "attempting operation");

            match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::info!(attempt = attempt + 1, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => {
                    tracing::warn!(attempt = attempt + 1, max_attempts, error = %err, "attempt failed");

                    if attempt + 1 >= max_attempts {
                        return Err(RetryExhausted {
                            attempts: max_attempts,
                            last_error: err,
                        });
                    }

                    let delay = self.delay_for(attempt);
                    tracing::debug!(?delay, "waiting before retry");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
