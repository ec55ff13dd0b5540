// ABOUTME: Endpoint tester that runs the project's `test` script once per endpoint.
// ABOUTME: Runs are bounded by a semaphore; the HTTP status comes from the script's stdout.

use async_trait::async_trait;
use futures::future::join_all;
use std::collections::HashMap;
use std::time::Instant;
use tokio::sync::Semaphore;

use super::{Endpoint, EndpointTester, TestResult, TestStatus, TesterError};
use crate::scripts::{Script, ScriptRunner};

pub struct ScriptTester {
    runner: ScriptRunner,
    base_url: String,
    gate: Semaphore,
}

impl ScriptTester {
    pub fn new(runner: ScriptRunner, base_url: impl Into<String>, max_concurrent: usize) -> Self {
        Self {
            runner,
            base_url: base_url.into(),
            gate: Semaphore::new(max_concurrent.max(1)),
        }
    }

    fn endpoint_env(&self, endpoint: &Endpoint) -> HashMap<String, String> {
        let url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.path.trim_start_matches('/')
        );
        HashMap::from([
            ("VERITY_BASE_URL".to_string(), self.base_url.clone()),
            ("VERITY_ENDPOINT_METHOD".to_string(), endpoint.method.clone()),
            ("VERITY_ENDPOINT_PATH".to_string(), endpoint.path.clone()),
            ("VERITY_ENDPOINT_URL".to_string(), url),
            (
                "VERITY_REQUIRES_AUTH".to_string(),
                endpoint.requires_auth.to_string(),
            ),
        ])
    }

    async fn test_one(&self, endpoint: &Endpoint) -> TestResult {
        let Ok(_permit) = self.gate.acquire().await else {
            return TestResult::new(endpoint.clone(), TestStatus::Skipped)
                .with_error("tester shut down");
        };

        let started = Instant::now();
        let output = self.runner.run(Script::Test, &self.endpoint_env(endpoint)).await;
        let elapsed = started.elapsed();

        let Some(output) = output else {
            return TestResult::new(endpoint.clone(), TestStatus::Skipped)
                .with_error("test script disappeared");
        };

        let mut result = if output.timed_out {
            TestResult::new(endpoint.clone(), TestStatus::Timeout).with_error(output.failure_message())
        } else {
            match parse_status_code(&output.stdout) {
                Some(code) => {
                    let status = TestStatus::from_http_status(code);
                    let result = TestResult::new(endpoint.clone(), status).with_status_code(code);
                    if status.is_failure() && !output.stderr.trim().is_empty() {
                        result.with_error(output.stderr.trim())
                    } else {
                        result
                    }
                }
                None if output.success => TestResult::new(endpoint.clone(), TestStatus::Success),
                None => TestResult::new(endpoint.clone(), TestStatus::Failure)
                    .with_error(output.failure_message()),
            }
        };
        result.response_time = Some(elapsed);

        tracing::debug!(endpoint = %endpoint, status = %result.status, ?elapsed, "endpoint tested");
        result
    }
}

/// First whitespace-separated token of stdout, if it is an HTTP status code.
fn parse_status_code(stdout: &str) -> Option<u16> {
    stdout
        .split_whitespace()
        .next()
        .and_then(|token| token.parse::<u16>().ok())
        .filter(|code| (100..=599).contains(code))
}

#[async_trait]
impl EndpointTester for ScriptTester {
    async fn run(&self, endpoints: &[Endpoint]) -> Result<Vec<TestResult>, TesterError> {
        if !self.runner.exists(Script::Test) {
            return Err(TesterError::Unavailable(format!(
                "no test script in {}",
                self.runner.dir().display()
            )));
        }

        tracing::info!(endpoints = endpoints.len(), base_url = %self.base_url, "testing endpoints");
        Ok(join_all(endpoints.iter().map(|endpoint| self.test_one(endpoint))).await)
    }
}
