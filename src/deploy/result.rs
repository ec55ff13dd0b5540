// ABOUTME: Outcome of a deployment run.
// ABOUTME: Final per-resource states, namespaced outputs, errors, and rollback record.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

use super::{DeploymentSpec, DeploymentState, RollbackReport};
use crate::types::{ResourceId, RunId};

#[derive(Debug, Clone, Serialize)]
pub struct DeploymentResult {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    /// No errors and at least one resource succeeded.
    pub success: bool,
    /// Every input spec, in input order, with its final state.
    pub resources: Vec<DeploymentSpec>,
    /// Outputs of succeeded resources keyed `"<resource_id>/<output_key>"`.
    pub outputs: BTreeMap<String, String>,
    pub errors: Vec<String>,
    pub rollback: Option<RollbackReport>,
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
}

/// Resource counts by state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeploymentProgress {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl DeploymentProgress {
    /// Share of resources in a terminal state, 0 to 100.
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.succeeded + self.failed) as f64 / self.total as f64 * 100.0
    }
}

impl DeploymentResult {
    pub fn deployed(&self) -> impl Iterator<Item = &DeploymentSpec> {
        self.resources
            .iter()
            .filter(|spec| spec.state() == DeploymentState::Succeeded)
    }

    pub fn failed(&self) -> impl Iterator<Item = &DeploymentSpec> {
        self.resources
            .iter()
            .filter(|spec| spec.state() == DeploymentState::Failed)
    }

    pub fn succeeded_count(&self) -> usize {
        self.deployed().count()
    }

    /// Resources deleted by rollback, in deletion order.
    pub fn rolled_back(&self) -> &[ResourceId] {
        self.rollback
            .as_ref()
            .map(|report| report.deleted.as_slice())
            .unwrap_or(&[])
    }

    pub fn progress(&self) -> DeploymentProgress {
        let mut progress = DeploymentProgress {
            total: self.resources.len(),
            ..Default::default()
        };
        for spec in &self.resources {
            match spec.state() {
                DeploymentState::Pending => progress.pending += 1,
                DeploymentState::Validating | DeploymentState::Deploying => {
                    progress.in_progress += 1
                }
                DeploymentState::Succeeded => progress.succeeded += 1,
                DeploymentState::Failed => progress.failed += 1,
            }
        }
        progress
    }
}
