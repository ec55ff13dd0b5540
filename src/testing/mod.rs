// ABOUTME: Endpoint testing types and the tester collaborator trait.
// ABOUTME: HTTP status classification feeds the fix orchestrator's categories.

mod script;

pub use script::ScriptTester;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

fn default_method() -> String {
    "GET".to_string()
}

/// An HTTP endpoint exercised after deployment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    #[serde(default = "default_method")]
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub requires_auth: bool,
}

impl Endpoint {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            requires_auth: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new("GET", path)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    Success,
    Failure,
    Timeout,
    AuthError,
    ServerError,
    Skipped,
}

impl TestStatus {
    /// 2xx/3xx pass, 401/403 are auth errors, 5xx are server errors.
    pub fn from_http_status(code: u16) -> Self {
        match code {
            200..=399 => TestStatus::Success,
            401 | 403 => TestStatus::AuthError,
            500.. => TestStatus::ServerError,
            _ => TestStatus::Failure,
        }
    }

    /// Everything except Success and Skipped.
    pub fn is_failure(&self) -> bool {
        !matches!(self, TestStatus::Success | TestStatus::Skipped)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Success => "success",
            TestStatus::Failure => "failure",
            TestStatus::Timeout => "timeout",
            TestStatus::AuthError => "auth_error",
            TestStatus::ServerError => "server_error",
            TestStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of testing one endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResult {
    pub endpoint: Endpoint,
    pub status: TestStatus,
    pub status_code: Option<u16>,
    pub error: Option<String>,
    #[serde(with = "humantime_serde")]
    pub response_time: Option<Duration>,
}

impl TestResult {
    pub fn new(endpoint: Endpoint, status: TestStatus) -> Self {
        Self {
            endpoint,
            status,
            status_code: None,
            error: None,
            response_time: None,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_status_code(mut self, code: u16) -> Self {
        self.status_code = Some(code);
        self
    }

    pub fn is_failure(&self) -> bool {
        self.status.is_failure()
    }

    /// One-line description used when classifying failures.
    pub fn describe(&self) -> String {
        match (&self.error, self.status_code) {
            (Some(error), _) => format!("{}: {}", self.endpoint, error),
            (None, Some(code)) => format!("{}: HTTP {}", self.endpoint, code),
            (None, None) => format!("{}: {}", self.endpoint, self.status),
        }
    }
}

/// Failures of the tester itself, as opposed to failing endpoints.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TesterError {
    #[error("endpoint tester unavailable: {0}")]
    Unavailable(String),

    #[error("endpoint test run failed: {0}")]
    Run(String),
}

/// Exercises endpoints against the deployed environment.
#[async_trait]
pub trait EndpointTester: Send + Sync {
    /// Test every endpoint, one result per endpoint.
    async fn run(&self, endpoints: &[Endpoint]) -> Result<Vec<TestResult>, TesterError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_classification() {
        assert_eq!(TestStatus::from_http_status(200), TestStatus::Success);
        assert_eq!(TestStatus::from_http_status(302), TestStatus::Success);
        assert_eq!(TestStatus::from_http_status(401), TestStatus::AuthError);
        assert_eq!(TestStatus::from_http_status(403), TestStatus::AuthError);
        assert_eq!(TestStatus::from_http_status(404), TestStatus::Failure);
        assert_eq!(TestStatus::from_http_status(500), TestStatus::ServerError);
        assert_eq!(TestStatus::from_http_status(503), TestStatus::ServerError);
    }

    #[test]
    fn skipped_is_not_a_failure() {
        assert!(!TestStatus::Skipped.is_failure());
        assert!(!TestStatus::Success.is_failure());
        assert!(TestStatus::Timeout.is_failure());
    }

    #[test]
    fn endpoint_defaults_to_get() {
        let endpoint: Endpoint = serde_yaml::from_str("path: /health").unwrap();
        assert_eq!(endpoint, Endpoint::get("/health"));
        assert_eq!(endpoint.to_string(), "GET /health");
    }

    #[test]
    fn describe_prefers_error_text() {
        let result = TestResult::new(Endpoint::get("/a"), TestStatus::ServerError)
            .with_status_code(502)
            .with_error("bad gateway");
        assert_eq!(result.describe(), "GET /a: bad gateway");

        let result = TestResult::new(Endpoint::get("/a"), TestStatus::ServerError).with_status_code(502);
        assert_eq!(result.describe(), "GET /a: HTTP 502");
    }
}
