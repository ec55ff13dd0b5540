// ABOUTME: Error types for deployment runs.
// ABOUTME: Only plan-level problems are errors; per-resource failures live in the result.

use crate::graph::GraphError;

/// Reasons a deployment run cannot start or schedule its batches.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// Structurally invalid input: cycles, duplicate ids, specs outside the graph.
    #[error("invalid deployment plan: {0}")]
    Validation(String),

    /// Batching stalled on an acyclic graph.
    #[error("deployment scheduling failed: {0}")]
    Schedule(#[from] GraphError),
}
