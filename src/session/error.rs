// ABOUTME: Session error types with SNAFU pattern.
// ABOUTME: One variant per stage failure, plus the kind used for exit codes.

use snafu::Snafu;

use super::{CollaboratorError, FailureKind, ValidationStage};
use crate::deploy::DeployError;
use crate::resilience::RetryExhausted;
use crate::testing::TesterError;

/// Why a validation session ended in Failed.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SessionError {
    #[snafu(display("project discovery failed: {source}"))]
    Discovery { source: CollaboratorError },

    #[snafu(display("no projects discovered"))]
    NoProjects,

    #[snafu(display("configuration analysis failed: {source}"))]
    Analysis { source: CollaboratorError },

    #[snafu(display("deployment could not start: {source}"))]
    Deployment { source: DeployError },

    #[snafu(display("deployment failed: {}", errors.join("; ")))]
    DeploymentFailed { errors: Vec<String> },

    #[snafu(display("endpoint testing failed: {source}"))]
    Testing { source: RetryExhausted<TesterError> },

    #[snafu(display("{failed} endpoint test(s) still failing after {fix_attempts} fix attempt(s)"))]
    TestsFailing { failed: usize, fix_attempts: usize },

    #[snafu(display("validation timed out during {stage}"))]
    Timeout { stage: ValidationStage },
}

impl SessionError {
    /// Deployment and test failures are validation verdicts; everything else
    /// means the session could not reach one.
    pub fn kind(&self) -> FailureKind {
        match self {
            SessionError::DeploymentFailed { .. } | SessionError::TestsFailing { .. } => {
                FailureKind::Validation
            }
            SessionError::Discovery { .. }
            | SessionError::NoProjects
            | SessionError::Analysis { .. }
            | SessionError::Deployment { .. }
            | SessionError::Testing { .. }
            | SessionError::Timeout { .. } => FailureKind::Orchestration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_exit_semantics() {
        let failing = SessionError::TestsFailing {
            failed: 2,
            fix_attempts: 3,
        };
        assert_eq!(failing.kind(), FailureKind::Validation);
        assert_eq!(
            failing.to_string(),
            "2 endpoint test(s) still failing after 3 fix attempt(s)"
        );

        let timeout = SessionError::Timeout {
            stage: ValidationStage::Testing,
        };
        assert_eq!(timeout.kind(), FailureKind::Orchestration);
        assert_eq!(timeout.to_string(), "validation timed out during testing");
    }

    #[test]
    fn deployment_failed_joins_errors() {
        let err = SessionError::DeploymentFailed {
            errors: vec!["db: boom".to_string(), "api: bang".to_string()],
        };
        assert_eq!(err.to_string(), "deployment failed: db: boom; api: bang");
        assert_eq!(err.kind(), FailureKind::Validation);
    }
}
