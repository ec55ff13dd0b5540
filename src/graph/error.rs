// ABOUTME: Error types for dependency graph ordering.
// ABOUTME: Cycles are plan errors; a stalled batch decomposition is an invariant violation.

use crate::types::ResourceId;

/// The graph has no valid deployment order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("circular dependency detected: {}", render_path(.cycle_path))]
pub struct CyclicDependencyError {
    /// Representative cycle, first node repeated at the end when closed.
    pub cycle_path: Vec<ResourceId>,
}

fn render_path(path: &[ResourceId]) -> String {
    path.iter()
        .map(ResourceId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Errors from deriving a deployment schedule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error(transparent)]
    Cycle(#[from] CyclicDependencyError),

    /// Batching made no progress even though ordering succeeded.
    #[error("unable to form deployment batch: {remaining} resource(s) left unscheduled")]
    BatchStalled { remaining: usize },
}
