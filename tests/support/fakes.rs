// ABOUTME: In-memory fakes for every session collaborator.
// ABOUTME: Record calls, fail on demand, and track provisioning concurrency.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use verity::backend::{BackendError, Outputs, Provisioner};
use verity::deploy::DeploymentSpec;
use verity::fix::{FixToolError, TemplateFixer};
use verity::graph::DependencyGraph;
use verity::session::{
    Analyzer, CollaboratorError, Collaborators, DeploymentPlan, Discoverer, Project,
};
use verity::testing::{Endpoint, EndpointTester, TestResult, TestStatus, TesterError};
use verity::types::ResourceId;

/// A backend call the fake provisioner saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Exists(String),
    Validate(String),
    Provision(String),
    Delete(String),
}

#[derive(Default)]
pub struct FakeProvisioner {
    existing: Mutex<HashSet<String>>,
    invalid: HashSet<String>,
    /// Remaining provision failures per resource; `usize::MAX` fails forever.
    provision_failures: Mutex<HashMap<String, usize>>,
    undeletable: HashSet<String>,
    outputs: HashMap<String, Outputs>,
    delay: Duration,
    calls: Mutex<Vec<Call>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_existing(self, id: &str) -> Self {
        self.existing.lock().insert(id.to_string());
        self
    }

    pub fn with_invalid(mut self, id: &str) -> Self {
        self.invalid.insert(id.to_string());
        self
    }

    pub fn failing(self, id: &str) -> Self {
        self.failing_times(id, usize::MAX)
    }

    pub fn failing_times(self, id: &str, times: usize) -> Self {
        self.provision_failures.lock().insert(id.to_string(), times);
        self
    }

    pub fn with_undeletable(mut self, id: &str) -> Self {
        self.undeletable.insert(id.to_string());
        self
    }

    pub fn with_output(mut self, id: &str, key: &str, value: &str) -> Self {
        self.outputs
            .entry(id.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn provisioned(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Provision(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Delete(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provisioner for FakeProvisioner {
    async fn exists(&self, id: &ResourceId) -> Result<bool, BackendError> {
        self.calls.lock().push(Call::Exists(id.to_string()));
        Ok(self.existing.lock().contains(id.as_str()))
    }

    async fn validate(&self, spec: &DeploymentSpec) -> Result<(), BackendError> {
        self.calls.lock().push(Call::Validate(spec.id.to_string()));
        if self.invalid.contains(spec.id.as_str()) {
            return Err(BackendError::Validation(format!(
                "template {} has a syntax error",
                spec.template
            )));
        }
        Ok(())
    }

    async fn provision(&self, spec: &DeploymentSpec) -> Result<Outputs, BackendError> {
        self.calls.lock().push(Call::Provision(spec.id.to_string()));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        {
            let mut failures = self.provision_failures.lock();
            if let Some(remaining) = failures.get_mut(spec.id.as_str())
                && *remaining > 0
            {
                if *remaining != usize::MAX {
                    *remaining -= 1;
                }
                return Err(BackendError::Provision(format!("{} quota exceeded", spec.id)));
            }
        }

        self.existing.lock().insert(spec.id.to_string());
        Ok(self.outputs.get(spec.id.as_str()).cloned().unwrap_or_default())
    }

    async fn delete(&self, id: &ResourceId) -> Result<(), BackendError> {
        self.calls.lock().push(Call::Delete(id.to_string()));
        if self.undeletable.contains(id.as_str()) {
            return Err(BackendError::Delete(format!("{id} is locked")));
        }
        self.existing.lock().remove(id.as_str());
        Ok(())
    }
}

/// Returns scripted statuses per round, repeating the last round forever.
pub struct FakeTester {
    rounds: Mutex<VecDeque<Vec<TestStatus>>>,
    last: Mutex<Vec<TestStatus>>,
    runs: AtomicUsize,
    crash: bool,
}

impl FakeTester {
    pub fn rounds(rounds: Vec<Vec<TestStatus>>) -> Self {
        Self {
            rounds: Mutex::new(rounds.into()),
            last: Mutex::new(Vec::new()),
            runs: AtomicUsize::new(0),
            crash: false,
        }
    }

    pub fn always(statuses: Vec<TestStatus>) -> Self {
        Self::rounds(vec![statuses])
    }

    pub fn crashing() -> Self {
        Self {
            crash: true,
            ..Self::rounds(Vec::new())
        }
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EndpointTester for FakeTester {
    async fn run(&self, endpoints: &[Endpoint]) -> Result<Vec<TestResult>, TesterError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if self.crash {
            return Err(TesterError::Run("connection pool closed".to_string()));
        }

        let statuses = match self.rounds.lock().pop_front() {
            Some(round) => {
                *self.last.lock() = round.clone();
                round
            }
            None => self.last.lock().clone(),
        };

        Ok(endpoints
            .iter()
            .enumerate()
            .map(|(i, endpoint)| {
                let status = statuses.get(i).copied().unwrap_or(TestStatus::Success);
                TestResult::new(endpoint.clone(), status)
            })
            .collect())
    }
}

/// Template fixer that records every issue it is handed.
#[derive(Default)]
pub struct FakeFixer {
    fail: bool,
    issues: Mutex<Vec<String>>,
}

impl FakeFixer {
    pub fn succeeding() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn issues(&self) -> Vec<String> {
        self.issues.lock().clone()
    }
}

#[async_trait]
impl TemplateFixer for FakeFixer {
    async fn fix(&self, issue: &str) -> Result<(), FixToolError> {
        self.issues.lock().push(issue.to_string());
        if self.fail {
            Err(FixToolError::Failed {
                code: Some(1),
                stderr: "could not repair template".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

/// Discovery and analysis from a fixed plan.
pub struct StaticSource {
    projects: Vec<Project>,
    plan: DeploymentPlan,
    fail_analysis: bool,
}

impl StaticSource {
    pub fn new(plan: DeploymentPlan) -> Self {
        Self {
            projects: vec![Project {
                name: "demo".to_string(),
                root: PathBuf::from("/srv/demo"),
            }],
            plan,
            fail_analysis: false,
        }
    }

    pub fn without_projects(mut self) -> Self {
        self.projects.clear();
        self
    }

    pub fn failing_analysis(mut self) -> Self {
        self.fail_analysis = true;
        self
    }
}

#[async_trait]
impl Discoverer for StaticSource {
    async fn discover(&self) -> Result<Vec<Project>, CollaboratorError> {
        Ok(self.projects.clone())
    }
}

#[async_trait]
impl Analyzer for StaticSource {
    async fn analyze(&self, _projects: &[Project]) -> Result<DeploymentPlan, CollaboratorError> {
        if self.fail_analysis {
            return Err(CollaboratorError::new("unreadable bicep file"));
        }
        Ok(self.plan.clone())
    }
}

pub fn spec(id: &str) -> DeploymentSpec {
    DeploymentSpec::new(id, "service", id, format!("infra/{id}.bicep"))
}

/// Graph where each id depends on the one before it.
pub fn chain(ids: &[&str]) -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    for id in ids {
        graph.add_node((*id).into());
    }
    for pair in ids.windows(2) {
        graph.add_dependency(pair[1].into(), pair[0].into());
    }
    graph
}

/// Plan over a linear chain with one endpoint per test status slot.
pub fn chain_plan(ids: &[&str], endpoints: usize) -> DeploymentPlan {
    DeploymentPlan {
        specs: ids.iter().map(|id| spec(id)).collect(),
        graph: Some(chain(ids)),
        endpoints: (0..endpoints)
            .map(|i| Endpoint::get(format!("/api/{i}")))
            .collect(),
    }
}

pub fn collaborators(
    source: StaticSource,
    provisioner: Arc<FakeProvisioner>,
    tester: Arc<FakeTester>,
    fixer: Option<Arc<FakeFixer>>,
) -> Collaborators {
    let source = Arc::new(source);
    Collaborators {
        discoverer: source.clone(),
        analyzer: source,
        provisioner,
        tester,
        fixer: fixer.map(|f| f as Arc<dyn TemplateFixer>),
    }
}
