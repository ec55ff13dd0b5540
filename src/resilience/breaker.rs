// ABOUTME: Three-state circuit breaker (closed, open, half-open) around fallible calls.
// ABOUTME: Opens after consecutive failures, probes again after a recovery timeout.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::{Duration, Instant};

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation; failures are counted.
    Closed,
    /// Calls are rejected without running the guarded operation.
    Open,
    /// Recovery probe; successes close the circuit, any failure reopens it.
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Breaker thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerConfig {
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    #[serde(default = "default_recovery_timeout", with = "humantime_serde")]
    pub recovery_timeout: Duration,

    #[serde(default = "default_success_threshold")]
    pub success_threshold: u32,
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_recovery_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_success_threshold() -> u32 {
    2
}

impl Default for BreakerConfig {
    fn default() -> Self {
        BreakerConfig {
            failure_threshold: default_failure_threshold(),
            recovery_timeout: default_recovery_timeout(),
            success_threshold: default_success_threshold(),
        }
    }
}

/// Outcome of a guarded call that did not succeed.
#[derive(Debug, thiserror::Error)]
pub enum BreakerError<E> {
    /// Rejected without running the operation.
    #[error("circuit breaker is open; retry in {:.1}s", .retry_in.as_secs_f64())]
    Open { retry_in: Duration },

    /// The operation ran and failed.
    #[error("{0}")]
    Inner(E),
}

/// Failure-suppression gate.
///
/// Mutated through `&mut self`: one logical caller drives it at a time.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    config: BreakerConfig,
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    last_failure: Option<Instant>,
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        CircuitBreaker {
            config,
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            last_failure: None,
        }
    }

    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }

    pub fn success_count(&self) -> u32 {
        self.success_count
    }

    pub fn is_open(&self) -> bool {
        self.state == CircuitState::Open
    }

    /// Admission check before running a guarded operation.
    ///
    /// While open and inside the recovery window, returns the remaining wait.
    /// Once the window has elapsed this call moves the breaker to half-open
    /// and admits the caller.
    pub fn try_acquire(&mut self) -> Result<(), Duration> {
        if self.state != CircuitState::Open {
            return Ok(());
        }

        let elapsed = self
            .last_failure
            .map_or(self.config.recovery_timeout, |at| at.elapsed());

        if elapsed >= self.config.recovery_timeout {
            tracing::info!("circuit breaker entering half-open state");
            self.state = CircuitState::HalfOpen;
            self.success_count = 0;
            Ok(())
        } else {
            Err(self.config.recovery_timeout - elapsed)
        }
    }

    pub fn record_success(&mut self) {
        match self.state {
            CircuitState::HalfOpen => {
                self.success_count += 1;
                if self.success_count >= self.config.success_threshold {
                    tracing::info!("circuit breaker recovered, closing");
                    self.state = CircuitState::Closed;
                    self.failure_count = 0;
                    self.success_count = 0;
                }
            }
            CircuitState::Closed => self.failure_count = 0,
            CircuitState::Open => {}
        }
    }

    pub fn record_failure(&mut self) {
        self.failure_count += 1;
        self.last_failure = Some(Instant::now());

        match self.state {
            CircuitState::HalfOpen => {
                tracing::warn!("circuit breaker recovery probe failed, reopening");
                self.state = CircuitState::Open;
                self.success_count = 0;
            }
            CircuitState::Closed if self.failure_count >= self.config.failure_threshold => {
                tracing::error!(
                    failures = self.failure_count,
                    "circuit breaker threshold reached, opening"
                );
                self.state = CircuitState::Open;
            }
            _ => {}
        }
    }

    /// Run `operation` behind the breaker.
    ///
    /// # Errors
    ///
    /// `BreakerError::Open` when rejected (the operation is not invoked),
    /// `BreakerError::Inner` when the operation itself failed.
    pub async fn call<T, E, F, Fut>(&mut self, operation: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.try_acquire()
            .map_err(|retry_in| BreakerError::Open { retry_in })?;

        match operation().await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(err) => {
                self.record_failure();
                Err(BreakerError::Inner(err))
            }
        }
    }

    /// Force the breaker closed with zero counters.
    pub fn reset(&mut self) {
        tracing::info!("circuit breaker manually reset");
        self.state = CircuitState::Closed;
        self.failure_count = 0;
        self.success_count = 0;
        self.last_failure = None;
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        CircuitBreaker::new(BreakerConfig::default())
    }
}
