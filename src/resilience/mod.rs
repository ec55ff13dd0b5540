// ABOUTME: Resilience primitives shared by deployment, testing, and remediation paths.
// ABOUTME: Exponential-backoff retry with jitter and a three-state circuit breaker.

mod breaker;
mod retry;

pub use breaker::{BreakerConfig, BreakerError, CircuitBreaker, CircuitState};
pub use retry::{RetryExhausted, RetryPolicy};
