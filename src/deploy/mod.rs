// ABOUTME: Resource deployment: specs, batched execution, and rollback.
// ABOUTME: Exports the deployer, its config, and its result types.

mod config;
mod deployer;
mod error;
mod result;
mod rollback;
mod spec;

pub use config::DeployerConfig;
pub use deployer::ResourceDeployer;
pub use error::DeployError;
pub use result::{DeploymentProgress, DeploymentResult};
pub use rollback::{RollbackFailure, RollbackReport};
pub use spec::{DeploymentSpec, DeploymentState};
