// ABOUTME: Collaborators a validation session drives: discovery and analysis.
// ABOUTME: Analysis yields the deployment plan: specs, dependency graph, endpoints.

use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;

use crate::deploy::DeploymentSpec;
use crate::graph::DependencyGraph;
use crate::testing::Endpoint;

/// A project found by discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    pub name: String,
    pub root: PathBuf,
}

/// What to deploy and what to test afterwards.
#[derive(Debug, Clone, Default)]
pub struct DeploymentPlan {
    pub specs: Vec<DeploymentSpec>,
    pub graph: Option<DependencyGraph>,
    pub endpoints: Vec<Endpoint>,
}

/// Failure reported by a discovery or analysis collaborator.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct CollaboratorError {
    message: String,
}

impl CollaboratorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<crate::error::Error> for CollaboratorError {
    fn from(err: crate::error::Error) -> Self {
        Self::new(err.to_string())
    }
}

#[async_trait]
pub trait Discoverer: Send + Sync {
    async fn discover(&self) -> Result<Vec<Project>, CollaboratorError>;
}

#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, projects: &[Project]) -> Result<DeploymentPlan, CollaboratorError>;
}
