// ABOUTME: Deployer settings: concurrency bound, rollback, idempotency, per-attempt timeout.
// ABOUTME: Deserialized from the `deploy` config section.

use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_max_concurrent() -> usize {
    4
}

fn default_rollback() -> bool {
    true
}

fn default_provision_timeout() -> Duration {
    Duration::from_secs(600)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployerConfig {
    /// Upper bound on provisioning calls in flight at once.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Delete this run's resources after a failed batch.
    #[serde(default = "default_rollback")]
    pub rollback: bool,

    /// Provision even when the resource already exists.
    #[serde(default)]
    pub force_redeploy: bool,

    /// Limit for a single provisioning attempt.
    #[serde(default = "default_provision_timeout", with = "humantime_serde")]
    pub provision_timeout: Duration,
}

impl Default for DeployerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            rollback: default_rollback(),
            force_redeploy: false,
            provision_timeout: default_provision_timeout(),
        }
    }
}
