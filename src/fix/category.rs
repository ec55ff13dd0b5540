// ABOUTME: Failure categories, remediation strategies, and the mapping between them.
// ABOUTME: Classifies test statuses directly and deployment errors by keyword.

use serde::Serialize;
use std::fmt;

use crate::testing::TestStatus;

/// What kind of problem a failure points to.
///
/// Ordering is the order categories are remediated in within one fix attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Timeout,
    AuthError,
    ServerError,
    TemplateIssue,
    DependencyIssue,
    ConfigurationIssue,
    NetworkIssue,
    Unknown,
}

/// How a category of failure is remediated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FixStrategy {
    /// Nothing to change; the next test round is the retry.
    Retry,
    /// Hand the failures to the template-fix tool.
    UpdateTemplate,
    UpdateDependencies,
    Reconfigure,
    /// Cannot be fixed automatically.
    ManualIntervention,
}

/// Keyword sets searched in order; the first category with a match wins.
const DEPLOYMENT_KEYWORDS: &[(ErrorCategory, &[&str])] = &[
    (
        ErrorCategory::TemplateIssue,
        &["template", "bicep", "syntax", "validation", "schema"],
    ),
    (
        ErrorCategory::DependencyIssue,
        &["dependency", "resource not found", "does not exist"],
    ),
    (
        ErrorCategory::ConfigurationIssue,
        &["configuration", "setting", "parameter", "invalid value"],
    ),
    (
        ErrorCategory::NetworkIssue,
        &["network", "timeout", "connection", "unreachable"],
    ),
    (
        ErrorCategory::AuthError,
        &["auth", "permission", "forbidden", "unauthorized"],
    ),
];

impl ErrorCategory {
    pub fn strategy(self) -> FixStrategy {
        match self {
            ErrorCategory::Timeout => FixStrategy::Retry,
            ErrorCategory::AuthError => FixStrategy::Reconfigure,
            ErrorCategory::ServerError => FixStrategy::UpdateTemplate,
            ErrorCategory::TemplateIssue => FixStrategy::UpdateTemplate,
            ErrorCategory::DependencyIssue => FixStrategy::UpdateDependencies,
            ErrorCategory::ConfigurationIssue => FixStrategy::Reconfigure,
            ErrorCategory::NetworkIssue => FixStrategy::Retry,
            ErrorCategory::Unknown => FixStrategy::ManualIntervention,
        }
    }

    /// Category of a test outcome, or None when it is not a failure.
    pub fn from_test_status(status: TestStatus) -> Option<Self> {
        match status {
            TestStatus::Success | TestStatus::Skipped => None,
            TestStatus::Timeout => Some(ErrorCategory::Timeout),
            TestStatus::AuthError => Some(ErrorCategory::AuthError),
            TestStatus::ServerError => Some(ErrorCategory::ServerError),
            TestStatus::Failure => Some(ErrorCategory::Unknown),
        }
    }

    /// Case-insensitive keyword classification of a deployment error message.
    pub fn classify_deployment_error(message: &str) -> Self {
        let lowered = message.to_lowercase();
        DEPLOYMENT_KEYWORDS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
            .map_or(ErrorCategory::Unknown, |(category, _)| *category)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::AuthError => "auth_error",
            ErrorCategory::ServerError => "server_error",
            ErrorCategory::TemplateIssue => "template_issue",
            ErrorCategory::DependencyIssue => "dependency_issue",
            ErrorCategory::ConfigurationIssue => "configuration_issue",
            ErrorCategory::NetworkIssue => "network_issue",
            ErrorCategory::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FixStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FixStrategy::Retry => "retry",
            FixStrategy::UpdateTemplate => "update_template",
            FixStrategy::UpdateDependencies => "update_dependencies",
            FixStrategy::Reconfigure => "reconfigure",
            FixStrategy::ManualIntervention => "manual_intervention",
        }
    }
}

impl fmt::Display for FixStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_table() {
        assert_eq!(ErrorCategory::Timeout.strategy(), FixStrategy::Retry);
        assert_eq!(ErrorCategory::AuthError.strategy(), FixStrategy::Reconfigure);
        assert_eq!(ErrorCategory::ServerError.strategy(), FixStrategy::UpdateTemplate);
        assert_eq!(ErrorCategory::TemplateIssue.strategy(), FixStrategy::UpdateTemplate);
        assert_eq!(ErrorCategory::DependencyIssue.strategy(), FixStrategy::UpdateDependencies);
        assert_eq!(ErrorCategory::ConfigurationIssue.strategy(), FixStrategy::Reconfigure);
        assert_eq!(ErrorCategory::NetworkIssue.strategy(), FixStrategy::Retry);
        assert_eq!(ErrorCategory::Unknown.strategy(), FixStrategy::ManualIntervention);
    }

    #[test]
    fn test_status_categories() {
        assert_eq!(ErrorCategory::from_test_status(TestStatus::Success), None);
        assert_eq!(ErrorCategory::from_test_status(TestStatus::Skipped), None);
        assert_eq!(
            ErrorCategory::from_test_status(TestStatus::Failure),
            Some(ErrorCategory::Unknown)
        );
        assert_eq!(
            ErrorCategory::from_test_status(TestStatus::ServerError),
            Some(ErrorCategory::ServerError)
        );
    }

    #[test]
    fn keyword_classification() {
        let cases = [
            ("Bicep compile error on line 3", ErrorCategory::TemplateIssue),
            ("Resource not found: vnet-1", ErrorCategory::DependencyIssue),
            ("Invalid value for parameter sku", ErrorCategory::ConfigurationIssue),
            ("connection reset by peer", ErrorCategory::NetworkIssue),
            ("403 Forbidden", ErrorCategory::AuthError),
            ("something odd happened", ErrorCategory::Unknown),
        ];
        for (message, expected) in cases {
            assert_eq!(ErrorCategory::classify_deployment_error(message), expected, "{message}");
        }
    }

    #[test]
    fn first_matching_set_wins() {
        // "template" and "timeout" both match; template keywords are searched first.
        assert_eq!(
            ErrorCategory::classify_deployment_error("template deployment timeout"),
            ErrorCategory::TemplateIssue
        );
    }
}
