// ABOUTME: Provisioning backend capability trait consumed by the resource deployer.
// ABOUTME: Exists, validate, provision, and delete; implementations may be slow.

mod error;
mod script;

pub use error::BackendError;
pub use script::ScriptProvisioner;

use async_trait::async_trait;
use std::collections::HashMap;

use crate::deploy::DeploymentSpec;
use crate::types::ResourceId;

/// Values a successful provisioning call reports back (endpoints, keys, names).
pub type Outputs = HashMap<String, String>;

/// The system that actually creates and deletes resources.
///
/// The deployer wraps these calls in its own timeout and retry policy, so
/// implementations should report failures rather than retry internally.
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Whether the resource already exists.
    async fn exists(&self, id: &ResourceId) -> Result<bool, BackendError>;

    /// Validate the resource's template and parameters without deploying.
    async fn validate(&self, spec: &DeploymentSpec) -> Result<(), BackendError>;

    /// Deploy the resource's template, returning its outputs.
    async fn provision(&self, spec: &DeploymentSpec) -> Result<Outputs, BackendError>;

    /// Delete a previously provisioned resource.
    async fn delete(&self, id: &ResourceId) -> Result<(), BackendError>;
}
