// ABOUTME: Resource deployer: runs dependency batches with bounded concurrency.
// ABOUTME: Skips existing resources, retries provisioning, and rolls back on failure.

use chrono::Utc;
use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

use super::rollback::rollback_resources;
use super::{DeployError, DeployerConfig, DeploymentResult, DeploymentSpec, DeploymentState, RollbackReport};
use crate::backend::{BackendError, Provisioner};
use crate::graph::DependencyGraph;
use crate::resilience::RetryPolicy;
use crate::types::{ResourceId, RunId};

/// Deploys specs batch by batch against a [`Provisioner`].
///
/// Batches run strictly in order. Specs within a batch run concurrently,
/// gated so at most `max_concurrent` backend calls are in flight. A failed
/// batch stops the run; later batches are never started.
pub struct ResourceDeployer {
    provisioner: Arc<dyn Provisioner>,
    config: DeployerConfig,
    retry: RetryPolicy,
    deadline: Option<Instant>,
}

impl ResourceDeployer {
    pub fn new(provisioner: Arc<dyn Provisioner>, config: DeployerConfig, retry: RetryPolicy) -> Self {
        Self {
            provisioner,
            config,
            retry,
            deadline: None,
        }
    }

    /// Refuse to start new batches once `deadline` has passed.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn config(&self) -> &DeployerConfig {
        &self.config
    }

    /// Deploy `specs`, ordered by `graph` when given, else as one batch.
    ///
    /// Per-resource failures are reported in the result, not as `Err`.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::Validation`] when the graph has a cycle, a spec id
    /// repeats, a spec is missing from the graph, or a spec depends on a graph
    /// node that has no spec.
    pub async fn deploy(
        &self,
        specs: Vec<DeploymentSpec>,
        graph: Option<&DependencyGraph>,
    ) -> Result<DeploymentResult, DeployError> {
        let run_id = RunId::generate();
        let started_at = Utc::now();
        let clock = Instant::now();

        let batches = plan_batches(&specs, graph)?;
        tracing::info!(
            run = %run_id,
            resources = specs.len(),
            batches = batches.len(),
            max_concurrent = self.config.max_concurrent,
            "starting deployment"
        );

        let input_order: Vec<ResourceId> = specs.iter().map(|spec| spec.id.clone()).collect();
        let mut waiting: HashMap<ResourceId, DeploymentSpec> = specs
            .into_iter()
            .map(|spec| (spec.id.clone(), spec))
            .collect();
        let mut finished: HashMap<ResourceId, DeploymentSpec> = HashMap::new();

        let gate = Semaphore::new(self.config.max_concurrent.max(1));
        let provisioned = Mutex::new(Vec::new());
        let mut errors = Vec::new();
        let mut halted = false;

        for (index, batch) in batches.iter().enumerate() {
            if let Some(deadline) = self.deadline
                && Instant::now() >= deadline
            {
                tracing::warn!(batch = index + 1, "deployment deadline exceeded");
                errors.push(format!(
                    "deployment deadline exceeded before batch {} of {}",
                    index + 1,
                    batches.len()
                ));
                halted = true;
                break;
            }

            let batch_specs: Vec<DeploymentSpec> =
                batch.iter().filter_map(|id| waiting.remove(id)).collect();
            tracing::info!(
                batch = index + 1,
                total = batches.len(),
                size = batch_specs.len(),
                "deploying batch"
            );

            let outcomes = join_all(
                batch_specs
                    .into_iter()
                    .map(|spec| self.deploy_one(spec, &gate, &provisioned)),
            )
            .await;

            let mut batch_failed = false;
            for (spec, outcome) in outcomes {
                if let Err(message) = outcome {
                    errors.push(message);
                    batch_failed = true;
                }
                finished.insert(spec.id.clone(), spec);
            }

            if batch_failed {
                tracing::error!(batch = index + 1, "batch failed; halting deployment");
                halted = true;
                break;
            }
        }

        let rollback = if halted && self.config.rollback {
            let ids = provisioned.lock().clone();
            let report = rollback_resources(self.provisioner.as_ref(), &ids).await;
            for id in &report.deleted {
                if let Some(spec) = finished.get_mut(id) {
                    spec.reset();
                }
            }
            for failure in &report.failed {
                errors.push(format!(
                    "rollback of {} failed: {}",
                    failure.resource_id, failure.error
                ));
            }
            Some(report)
        } else {
            None
        };

        let resources: Vec<DeploymentSpec> = input_order
            .iter()
            .filter_map(|id| finished.remove(id).or_else(|| waiting.remove(id)))
            .collect();

        let mut outputs = BTreeMap::new();
        for spec in resources
            .iter()
            .filter(|spec| spec.state() == DeploymentState::Succeeded)
        {
            for (key, value) in spec.outputs() {
                outputs.insert(format!("{}/{}", spec.id, key), value.clone());
            }
        }

        let succeeded = resources
            .iter()
            .filter(|spec| spec.state() == DeploymentState::Succeeded)
            .count();
        let success = errors.is_empty() && succeeded > 0;
        let duration = clock.elapsed();

        if success {
            tracing::info!(run = %run_id, succeeded, ?duration, "deployment succeeded");
        } else {
            tracing::warn!(run = %run_id, succeeded, errors = errors.len(), ?duration, "deployment did not succeed");
        }

        Ok(DeploymentResult {
            run_id,
            started_at,
            success,
            resources,
            outputs,
            errors,
            rollback,
            duration,
        })
    }

    /// Delete `ids` newest-first, as after a failed run.
    pub async fn rollback(&self, ids: &[ResourceId]) -> RollbackReport {
        rollback_resources(self.provisioner.as_ref(), ids).await
    }

    async fn deploy_one(
        &self,
        mut spec: DeploymentSpec,
        gate: &Semaphore,
        provisioned: &Mutex<Vec<ResourceId>>,
    ) -> (DeploymentSpec, Result<(), String>) {
        let Ok(_permit) = gate.acquire().await else {
            spec.transition(DeploymentState::Failed);
            let message = format!("{}: deployment gate closed", spec.id);
            return (spec, Err(message));
        };

        spec.transition(DeploymentState::Validating);

        if !self.config.force_redeploy {
            match self.provisioner.exists(&spec.id).await {
                Ok(true) => {
                    tracing::info!(resource = %spec.id, "already exists; skipping");
                    spec.transition(DeploymentState::Succeeded);
                    return (spec, Ok(()));
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::debug!(resource = %spec.id, error = %e, "existence check failed; deploying");
                }
            }
        }

        if let Err(e) = self.provisioner.validate(&spec).await {
            tracing::error!(resource = %spec.id, error = %e, "template validation failed");
            spec.transition(DeploymentState::Failed);
            let message = format!("{}: {}", spec.id, e);
            return (spec, Err(message));
        }

        spec.transition(DeploymentState::Deploying);

        let timeout = self.config.provision_timeout;
        let provisioner = self.provisioner.as_ref();
        let target = &spec;
        let outcome = self
            .retry
            .execute(move || async move {
                match tokio::time::timeout(timeout, provisioner.provision(target)).await {
                    Ok(result) => result,
                    Err(_) => Err(BackendError::TimedOut(timeout)),
                }
            })
            .await;

        match outcome {
            Ok(outputs) => {
                spec.record_outputs(outputs);
                spec.transition(DeploymentState::Succeeded);
                provisioned.lock().push(spec.id.clone());
                tracing::info!(resource = %spec.id, "provisioned");
                (spec, Ok(()))
            }
            Err(exhausted) => {
                tracing::error!(resource = %spec.id, error = %exhausted, "provisioning failed");
                spec.transition(DeploymentState::Failed);
                let message = format!("{}: {}", spec.id, exhausted);
                (spec, Err(message))
            }
        }
    }
}

/// Order spec ids into batches.
///
/// Graph nodes without a spec are skipped, but no spec may depend on one.
fn plan_batches(
    specs: &[DeploymentSpec],
    graph: Option<&DependencyGraph>,
) -> Result<Vec<Vec<ResourceId>>, DeployError> {
    let mut seen = HashSet::new();
    for spec in specs {
        if !seen.insert(&spec.id) {
            return Err(DeployError::Validation(format!(
                "duplicate resource id: {}",
                spec.id
            )));
        }
    }

    let Some(graph) = graph else {
        if specs.is_empty() {
            return Ok(Vec::new());
        }
        return Ok(vec![specs.iter().map(|spec| spec.id.clone()).collect()]);
    };

    if graph.has_cycle() {
        let path: Vec<String> = graph.cycle_path().iter().map(ToString::to_string).collect();
        return Err(DeployError::Validation(format!(
            "circular dependency detected: {}",
            path.join(" -> ")
        )));
    }

    if let Some(missing) = specs.iter().find(|spec| !graph.contains(&spec.id)) {
        return Err(DeployError::Validation(format!(
            "resource {} is not in the dependency graph",
            missing.id
        )));
    }

    for spec in specs {
        if let Some(dependency) = graph
            .dependencies(&spec.id)
            .iter()
            .find(|dependency| !seen.contains(dependency))
        {
            return Err(DeployError::Validation(format!(
                "resource {} depends on {}, which has no spec",
                spec.id, dependency
            )));
        }
    }

    let batches = graph
        .deployment_batches()?
        .into_iter()
        .map(|batch| {
            batch
                .into_iter()
                .filter(|id| {
                    let known = seen.contains(id);
                    if !known {
                        tracing::debug!(resource = %id, "graph node has no spec; skipping");
                    }
                    known
                })
                .collect::<Vec<_>>()
        })
        .filter(|batch| !batch.is_empty())
        .collect();

    Ok(batches)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(id: &str) -> DeploymentSpec {
        DeploymentSpec::new(id, "service", id, format!("{id}.bicep"))
    }

    #[test]
    fn no_graph_means_one_batch() {
        let batches = plan_batches(&[spec("a"), spec("b")], None).unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 2);
    }

    #[test]
    fn no_specs_means_no_batches() {
        assert!(plan_batches(&[], None).unwrap().is_empty());
    }

    #[test]
    fn duplicate_ids_rejected() {
        let err = plan_batches(&[spec("a"), spec("a")], None).unwrap_err();
        assert!(matches!(err, DeployError::Validation(_)));
        assert!(err.to_string().contains("duplicate resource id: a"));
    }

    #[test]
    fn cycle_rejected_with_path() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("a".into(), "b".into());
        graph.add_dependency("b".into(), "a".into());

        let err = plan_batches(&[spec("a"), spec("b")], Some(&graph)).unwrap_err();
        assert!(matches!(err, DeployError::Validation(_)));
        assert!(err.to_string().contains("circular dependency"));
    }

    #[test]
    fn spec_outside_graph_rejected() {
        let mut graph = DependencyGraph::new();
        graph.add_node("a".into());

        let err = plan_batches(&[spec("a"), spec("b")], Some(&graph)).unwrap_err();
        assert!(err.to_string().contains("resource b is not in the dependency graph"));
    }

    #[test]
    fn dependency_without_spec_rejected() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("app".into(), "network".into());

        let err = plan_batches(&[spec("app")], Some(&graph)).unwrap_err();
        assert!(matches!(err, DeployError::Validation(_)));
        assert_eq!(
            err.to_string(),
            "invalid deployment plan: resource app depends on network, which has no spec"
        );
    }

    #[test]
    fn unrelated_graph_nodes_are_skipped() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("app".into(), "db".into());
        graph.add_node("cache".into());

        let batches = plan_batches(&[spec("db"), spec("app")], Some(&graph)).unwrap();
        assert_eq!(
            batches,
            vec![vec![ResourceId::from("db")], vec![ResourceId::from("app")]]
        );
    }
}
