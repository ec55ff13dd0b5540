// ABOUTME: Configuration types and parsing for verity.yml.
// ABOUTME: Handles YAML parsing, env var interpolation, and deployment plan building.

mod env_value;
mod init;
mod source;

pub use env_value::{EnvValue, resolve_env_map};
pub use init::init_config;
pub use source::ConfigSource;

use crate::deploy::{DeployerConfig, DeploymentSpec};
use crate::error::{Error, Result};
use crate::fix::FixConfig;
use crate::graph::DependencyGraph;
use crate::resilience::RetryPolicy;
use crate::scripts::DEFAULT_SCRIPTS_DIR;
use crate::session::{DeploymentPlan, SessionConfig};
use crate::testing::Endpoint;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "verity.yml";
pub const CONFIG_FILENAME_ALT: &str = "verity.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".verity/config.yml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub project: String,

    #[serde(default)]
    pub deploy: DeployerConfig,

    #[serde(default)]
    pub retry: RetryPolicy,

    #[serde(default)]
    pub fix: FixConfig,

    #[serde(default)]
    pub testing: TestingConfig,

    /// Overall deadline for a validation session.
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,

    #[serde(default = "default_scripts_dir")]
    pub scripts: PathBuf,

    #[serde(default)]
    pub resources: Vec<ResourceConfig>,

    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceConfig {
    pub id: String,

    #[serde(rename = "type")]
    pub resource_type: String,

    /// Defaults to the id.
    #[serde(default)]
    pub name: Option<String>,

    pub template: String,

    #[serde(default)]
    pub parameters: HashMap<String, EnvValue>,

    #[serde(default)]
    pub depends_on: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TestingConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_test_concurrency")]
    pub max_concurrent: usize,

    /// Limit for a single endpoint test.
    #[serde(default = "default_test_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for TestingConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            max_concurrent: default_test_concurrency(),
            timeout: default_test_timeout(),
        }
    }
}

fn default_scripts_dir() -> PathBuf {
    PathBuf::from(DEFAULT_SCRIPTS_DIR)
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_test_concurrency() -> usize {
    10
}

fn default_test_timeout() -> Duration {
    Duration::from_secs(30)
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                tracing::debug!(path = %path.display(), "loading config");
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Structural checks that need no environment: ids and dependency references.
    fn validate(&self) -> Result<()> {
        if self.project.trim().is_empty() {
            return Err(Error::InvalidConfig("project name cannot be empty".to_string()));
        }

        let mut ids = HashSet::new();
        for resource in &self.resources {
            if resource.id.trim().is_empty() {
                return Err(Error::InvalidConfig("resource id cannot be empty".to_string()));
            }
            if !ids.insert(resource.id.as_str()) {
                return Err(Error::InvalidConfig(format!(
                    "duplicate resource id: {}",
                    resource.id
                )));
            }
        }

        for resource in &self.resources {
            if let Some(unknown) = resource
                .depends_on
                .iter()
                .find(|dep| !ids.contains(dep.as_str()))
            {
                return Err(Error::InvalidConfig(format!(
                    "resource {} depends on unknown resource {}",
                    resource.id, unknown
                )));
            }
        }

        Ok(())
    }

    /// Scripts directory, resolved against the project root when relative.
    pub fn scripts_dir(&self, root: &Path) -> PathBuf {
        if self.scripts.is_absolute() {
            self.scripts.clone()
        } else {
            root.join(&self.scripts)
        }
    }

    /// Dependency graph over the declared resources.
    pub fn graph(&self) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for resource in &self.resources {
            graph.add_node(resource.id.as_str().into());
            for dependency in &resource.depends_on {
                graph.add_dependency(resource.id.as_str().into(), dependency.as_str().into());
            }
        }
        graph
    }

    /// Resolve parameters and build specs, graph, and endpoints.
    ///
    /// # Errors
    ///
    /// `Error::MissingEnvVar` when an env-backed parameter has neither a
    /// value nor a default.
    pub fn plan(&self) -> Result<DeploymentPlan> {
        let specs = self
            .resources
            .iter()
            .map(|resource| {
                let mut spec = DeploymentSpec::new(
                    resource.id.as_str(),
                    resource.resource_type.clone(),
                    resource.name.clone().unwrap_or_else(|| resource.id.clone()),
                    resource.template.clone(),
                );
                spec.parameters = resolve_env_map(&resource.parameters)?;
                Ok(spec)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(DeploymentPlan {
            specs,
            graph: Some(self.graph()),
            endpoints: self.endpoints.clone(),
        })
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            deploy: self.deploy.clone(),
            retry: self.retry,
            fix: self.fix.clone(),
            timeout: self.timeout,
        }
    }
}
