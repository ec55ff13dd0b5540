// ABOUTME: Error types for provisioning backend calls.
// ABOUTME: One variant per backend operation plus timeout and availability failures.

use std::time::Duration;

/// Failures reported by a provisioning backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Template rejected by backend validation.
    #[error("template validation failed: {0}")]
    Validation(String),

    /// Provisioning call failed.
    #[error("provisioning failed: {0}")]
    Provision(String),

    /// Delete call failed.
    #[error("delete failed: {0}")]
    Delete(String),

    /// Existence lookup failed.
    #[error("existence check failed: {0}")]
    Lookup(String),

    /// Call did not finish in time.
    #[error("backend call timed out after {}s", .0.as_secs())]
    TimedOut(Duration),

    /// Backend could not be reached or is not set up for this operation.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}
