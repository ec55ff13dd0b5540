// ABOUTME: Deployment spec and its lifecycle state.
// ABOUTME: Only the deployer moves state; rollback is the one way back to Pending.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::backend::Outputs;
use crate::types::ResourceId;

/// Lifecycle of one resource within a deployment run.
///
/// Moves forward Pending, Validating, Deploying, then Succeeded or Failed.
/// Provisioning retries all happen inside Deploying. A resource deleted by
/// rollback returns to Pending with its outputs cleared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentState {
    #[default]
    Pending,
    Validating,
    Deploying,
    Succeeded,
    Failed,
}

impl DeploymentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentState::Pending => "pending",
            DeploymentState::Validating => "validating",
            DeploymentState::Deploying => "deploying",
            DeploymentState::Succeeded => "succeeded",
            DeploymentState::Failed => "failed",
        }
    }

    /// Succeeded and Failed are final for a run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeploymentState::Succeeded | DeploymentState::Failed)
    }

    /// Validating and Deploying.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, DeploymentState::Validating | DeploymentState::Deploying)
    }
}

impl fmt::Display for DeploymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of deployment: one template with its parameters.
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentSpec {
    pub id: ResourceId,
    pub resource_type: String,
    pub name: String,
    pub template: String,
    pub parameters: HashMap<String, String>,
    outputs: Outputs,
    state: DeploymentState,
}

impl DeploymentSpec {
    pub fn new(
        id: impl Into<ResourceId>,
        resource_type: impl Into<String>,
        name: impl Into<String>,
        template: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            resource_type: resource_type.into(),
            name: name.into(),
            template: template.into(),
            parameters: HashMap::new(),
            outputs: Outputs::new(),
            state: DeploymentState::Pending,
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn state(&self) -> DeploymentState {
        self.state
    }

    /// Outputs reported by the backend once provisioned.
    pub fn outputs(&self) -> &Outputs {
        &self.outputs
    }

    pub(crate) fn transition(&mut self, to: DeploymentState) {
        tracing::debug!(resource = %self.id, from = %self.state, to = %to, "resource state change");
        self.state = to;
    }

    pub(crate) fn record_outputs(&mut self, outputs: Outputs) {
        self.outputs.extend(outputs);
    }

    /// Back to Pending with no outputs, after the resource was deleted.
    pub(crate) fn reset(&mut self) {
        self.transition(DeploymentState::Pending);
        self.outputs.clear();
    }
}
