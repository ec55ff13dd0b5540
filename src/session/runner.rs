// ABOUTME: Validation session: discover, analyze, deploy, then test and fix in a bounded loop.
// ABOUTME: Always ends with a summary; failures short-circuit to the Failed stage.

use chrono::Utc;
use snafu::{ResultExt, ensure};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::error::{
    AnalysisSnafu, DeploymentFailedSnafu, DeploymentSnafu, DiscoverySnafu, NoProjectsSnafu,
    TestingSnafu, TestsFailingSnafu, TimeoutSnafu,
};
use super::{
    Analyzer, DeploymentPlan, Discoverer, Project, SessionError, ValidationStage, ValidationSummary,
};
use crate::backend::Provisioner;
use crate::deploy::{DeployerConfig, DeploymentResult, DeploymentSpec, ResourceDeployer};
use crate::diagnostics::{Diagnostics, Warning};
use crate::fix::{FixConfig, FixOrchestrator, TemplateFixer};
use crate::graph::DependencyGraph;
use crate::resilience::RetryPolicy;
use crate::testing::{Endpoint, EndpointTester, TestResult, TestStatus};
use crate::types::SessionId;

/// Everything a session calls out to.
#[derive(Clone)]
pub struct Collaborators {
    pub discoverer: Arc<dyn Discoverer>,
    pub analyzer: Arc<dyn Analyzer>,
    pub provisioner: Arc<dyn Provisioner>,
    pub tester: Arc<dyn EndpointTester>,
    /// Template-fix tool; UpdateTemplate fixes fail without one.
    pub fixer: Option<Arc<dyn TemplateFixer>>,
}

#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub deploy: DeployerConfig,
    /// Shared by provisioning and endpoint test runs.
    pub retry: RetryPolicy,
    pub fix: FixConfig,
    /// Overall deadline, checked between stages, rounds, and batches.
    pub timeout: Option<Duration>,
}

/// One end-to-end validation run.
pub struct ValidationSession {
    config: SessionConfig,
    collaborators: Collaborators,
    summary: ValidationSummary,
    fixes: FixOrchestrator,
    diagnostics: Diagnostics,
    deadline: Option<Instant>,
    deployment: Option<DeploymentResult>,
    test_results: Vec<TestResult>,
}

impl ValidationSession {
    pub fn new(config: SessionConfig, collaborators: Collaborators) -> Self {
        let fixes = FixOrchestrator::new(config.fix.clone(), collaborators.fixer.clone());
        Self {
            summary: ValidationSummary::new(SessionId::generate(), Utc::now()),
            config,
            collaborators,
            fixes,
            diagnostics: Diagnostics::default(),
            deadline: None,
            deployment: None,
            test_results: Vec::new(),
        }
    }

    pub fn summary(&self) -> &ValidationSummary {
        &self.summary
    }

    pub fn current_stage(&self) -> ValidationStage {
        self.summary.current_stage
    }

    /// Result of the deployment stage, once it has run.
    pub fn deployment(&self) -> Option<&DeploymentResult> {
        self.deployment.as_ref()
    }

    /// Results of the most recent test round.
    pub fn test_results(&self) -> &[TestResult] {
        &self.test_results
    }

    pub fn fixes(&self) -> &FixOrchestrator {
        &self.fixes
    }

    /// Run every stage and return the final summary.
    ///
    /// Never fails: stage errors are recorded in the summary with
    /// `success == false` and the Failed stage.
    pub async fn run(&mut self) -> ValidationSummary {
        let started = Instant::now();
        self.deadline = self.config.timeout.map(|timeout| started + timeout);

        tracing::info!(session = %self.summary.session_id, "starting validation session");
        self.complete(ValidationStage::Initializing);

        match self.run_stages().await {
            Ok(()) => {
                tracing::info!(session = %self.summary.session_id, "validation succeeded");
            }
            Err(err) => {
                tracing::error!(
                    session = %self.summary.session_id,
                    stage = %self.summary.current_stage,
                    error = %err,
                    "validation failed"
                );
                self.summary.fail(err.kind(), err.to_string());
            }
        }

        self.summary.warnings = self
            .diagnostics
            .warnings()
            .iter()
            .map(|w| w.message.clone())
            .collect();
        self.summary.finish(Utc::now(), started.elapsed());
        self.summary.clone()
    }

    async fn run_stages(&mut self) -> Result<(), SessionError> {
        let projects = self.discovery_stage().await?;
        let DeploymentPlan {
            specs,
            graph,
            endpoints,
        } = self.analysis_stage(&projects).await?;
        self.deployment_stage(specs, graph.as_ref()).await?;
        self.test_and_fix(&endpoints).await?;

        self.transition(ValidationStage::Completed);
        self.summary.success = true;
        Ok(())
    }

    fn transition(&mut self, stage: ValidationStage) {
        tracing::info!(from = %self.summary.current_stage, to = %stage, "stage transition");
        self.summary.current_stage = stage;
    }

    fn complete(&mut self, stage: ValidationStage) {
        self.summary.stages_completed.push(stage);
    }

    fn check_deadline(&self, stage: ValidationStage) -> Result<(), SessionError> {
        if let Some(deadline) = self.deadline {
            ensure!(Instant::now() < deadline, TimeoutSnafu { stage });
        }
        Ok(())
    }

    async fn discovery_stage(&mut self) -> Result<Vec<Project>, SessionError> {
        self.check_deadline(ValidationStage::Discovering)?;
        self.transition(ValidationStage::Discovering);

        let projects = self
            .collaborators
            .discoverer
            .discover()
            .await
            .context(DiscoverySnafu)?;
        self.summary.projects_discovered = projects.len();
        ensure!(!projects.is_empty(), NoProjectsSnafu);

        tracing::info!(projects = projects.len(), "discovered projects");
        self.complete(ValidationStage::Discovering);
        Ok(projects)
    }

    async fn analysis_stage(&mut self, projects: &[Project]) -> Result<DeploymentPlan, SessionError> {
        self.check_deadline(ValidationStage::Analyzing)?;
        self.transition(ValidationStage::Analyzing);

        let plan = self
            .collaborators
            .analyzer
            .analyze(projects)
            .await
            .context(AnalysisSnafu)?;
        self.summary.projects_analyzed = projects.len();

        tracing::info!(
            resources = plan.specs.len(),
            endpoints = plan.endpoints.len(),
            "analyzed projects"
        );
        self.complete(ValidationStage::Analyzing);
        Ok(plan)
    }

    async fn deployment_stage(
        &mut self,
        specs: Vec<DeploymentSpec>,
        graph: Option<&DependencyGraph>,
    ) -> Result<(), SessionError> {
        self.check_deadline(ValidationStage::Deploying)?;
        self.transition(ValidationStage::Deploying);

        if specs.is_empty() {
            self.diagnostics
                .warn(Warning::nothing_to_deploy("no resources to deploy; skipping deployment"));
            self.complete(ValidationStage::Deploying);
            return Ok(());
        }

        let mut deployer = ResourceDeployer::new(
            Arc::clone(&self.collaborators.provisioner),
            self.config.deploy.clone(),
            self.config.retry,
        );
        if let Some(deadline) = self.deadline {
            deployer = deployer.with_deadline(deadline);
        }

        let result = deployer.deploy(specs, graph).await.context(DeploymentSnafu)?;

        self.summary.resources_deployed = result.succeeded_count();
        self.summary.deployment_errors = result.errors.len();
        if let Some(report) = result.rollback.as_ref().filter(|r| !r.is_complete()) {
            self.diagnostics.warn(Warning::rollback_incomplete(format!(
                "rollback left {} resource(s) behind",
                report.failed.len()
            )));
        }

        let errors = result.errors.clone();
        let success = result.success;
        self.deployment = Some(result);
        ensure!(success, DeploymentFailedSnafu { errors });

        self.complete(ValidationStage::Deploying);
        Ok(())
    }

    async fn test_and_fix(&mut self, endpoints: &[Endpoint]) -> Result<(), SessionError> {
        let max_rounds = self.config.fix.max_attempts;

        for round in 0..=max_rounds {
            self.check_deadline(ValidationStage::Testing)?;
            let failures = self.testing_stage(endpoints).await?;

            if failures.is_empty() {
                tracing::info!(round, "all endpoint tests passed");
                return Ok(());
            }

            if round >= max_rounds {
                break;
            }
            if self.fixes.is_circuit_open() {
                self.diagnostics.warn(Warning::fix_circuit_open(
                    "fix circuit breaker is open; no further fixes attempted",
                ));
                break;
            }

            self.check_deadline(ValidationStage::Fixing)?;
            self.fixing_stage(&failures).await;
        }

        TestsFailingSnafu {
            failed: self.summary.tests_failed,
            fix_attempts: self.summary.fix_attempts,
        }
        .fail()
    }

    /// Run the tester once and return the failing results.
    async fn testing_stage(&mut self, endpoints: &[Endpoint]) -> Result<Vec<TestResult>, SessionError> {
        self.transition(ValidationStage::Testing);

        if endpoints.is_empty() {
            self.diagnostics
                .warn(Warning::no_endpoints("no endpoints to test; skipping tests"));
            self.complete(ValidationStage::Testing);
            return Ok(Vec::new());
        }

        let tester = Arc::clone(&self.collaborators.tester);
        let results = self
            .config
            .retry
            .execute(|| tester.run(endpoints))
            .await
            .context(TestingSnafu)?;

        self.summary.endpoints_tested = results.len();
        self.summary.tests_passed = results
            .iter()
            .filter(|r| r.status == TestStatus::Success)
            .count();
        self.summary.tests_skipped = results
            .iter()
            .filter(|r| r.status == TestStatus::Skipped)
            .count();
        let failures: Vec<TestResult> = results.iter().filter(|r| r.is_failure()).cloned().collect();
        self.summary.tests_failed = failures.len();

        tracing::info!(
            passed = self.summary.tests_passed,
            failed = self.summary.tests_failed,
            skipped = self.summary.tests_skipped,
            "endpoint tests finished"
        );

        self.test_results = results;
        self.complete(ValidationStage::Testing);
        Ok(failures)
    }

    async fn fixing_stage(&mut self, failures: &[TestResult]) {
        self.transition(ValidationStage::Fixing);

        let fixed = self.fixes.attempt_fix(failures, &[]).await;
        let fix_summary = self.fixes.summary();
        self.summary.fix_attempts = fix_summary.total_attempts;
        self.summary.fixes_successful = fix_summary.successful_fixes;

        if fixed {
            tracing::info!("fixes applied; retesting");
        } else {
            tracing::warn!("some fixes failed; retesting anyway");
        }
        self.complete(ValidationStage::Fixing);
    }
}
