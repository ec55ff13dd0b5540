// ABOUTME: Best-effort deletion of resources provisioned by a failed run.
// ABOUTME: Deletes in reverse provisioning order and reports every failure.

use serde::Serialize;

use crate::backend::Provisioner;
use crate::types::ResourceId;

/// A resource that could not be deleted during rollback.
#[derive(Debug, Clone, Serialize)]
pub struct RollbackFailure {
    pub resource_id: ResourceId,
    pub error: String,
}

/// Outcome of a rollback pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RollbackReport {
    /// Deleted resources, in deletion order.
    pub deleted: Vec<ResourceId>,
    pub failed: Vec<RollbackFailure>,
}

impl RollbackReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Delete `provisioned` newest-first. A failed delete does not stop the pass.
pub(crate) async fn rollback_resources(
    provisioner: &dyn Provisioner,
    provisioned: &[ResourceId],
) -> RollbackReport {
    let mut report = RollbackReport::default();

    if provisioned.is_empty() {
        return report;
    }

    tracing::warn!(resources = provisioned.len(), "rolling back provisioned resources");

    for id in provisioned.iter().rev() {
        match provisioner.delete(id).await {
            Ok(()) => {
                tracing::info!(resource = %id, "rolled back");
                report.deleted.push(id.clone());
            }
            Err(e) => {
                tracing::error!(resource = %id, error = %e, "rollback failed");
                report.failed.push(RollbackFailure {
                    resource_id: id.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    report
}
