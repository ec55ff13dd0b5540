// ABOUTME: Discovery and analysis backed by a loaded verity.yml.
// ABOUTME: One project per config; the plan comes straight from its resources.

use async_trait::async_trait;
use std::path::PathBuf;

use super::Config;
use crate::session::{Analyzer, CollaboratorError, DeploymentPlan, Discoverer, Project};

pub struct ConfigSource {
    config: Config,
    root: PathBuf,
}

impl ConfigSource {
    pub fn new(config: Config, root: impl Into<PathBuf>) -> Self {
        Self {
            config,
            root: root.into(),
        }
    }
}

#[async_trait]
impl Discoverer for ConfigSource {
    async fn discover(&self) -> Result<Vec<Project>, CollaboratorError> {
        Ok(vec![Project {
            name: self.config.project.clone(),
            root: self.root.clone(),
        }])
    }
}

#[async_trait]
impl Analyzer for ConfigSource {
    async fn analyze(&self, projects: &[Project]) -> Result<DeploymentPlan, CollaboratorError> {
        tracing::debug!(projects = projects.len(), "building plan from config");
        Ok(self.config.plan()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn discovers_configured_project() {
        let config = Config::from_yaml("project: demo").unwrap();
        let source = ConfigSource::new(config, "/srv/demo");
        let projects = source.discover().await.unwrap();
        assert_eq!(
            projects,
            vec![Project {
                name: "demo".to_string(),
                root: PathBuf::from("/srv/demo"),
            }]
        );
    }

    #[test]
    fn missing_env_parameter_fails_analysis() {
        let yaml = r#"
project: demo
resources:
  - id: db
    type: postgres
    template: db.bicep
    parameters:
      password: { env: VERITY_TEST_MISSING_DB_PASSWORD }
"#;
        let config = Config::from_yaml(yaml).unwrap();
        let source = ConfigSource::new(config, "/srv/demo");
        let result = temp_env::with_var_unset("VERITY_TEST_MISSING_DB_PASSWORD", || {
            futures::executor::block_on(source.analyze(&[]))
        });
        let err = result.unwrap_err();
        assert!(err.to_string().contains("VERITY_TEST_MISSING_DB_PASSWORD"));
    }
}
