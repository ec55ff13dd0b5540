// ABOUTME: Terminal artifact of a validation session: stage history, counts, outcome.
// ABOUTME: Serializes to JSON for reports and maps to a process exit code.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::time::Duration;

use super::ValidationStage;
use crate::types::SessionId;

/// Why a session failed, for exit-code mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Deployment errors or failing endpoints. Exit code 1.
    Validation,
    /// The session could not run to a verdict. Exit code 2.
    Orchestration,
}

fn serialize_secs<S: Serializer>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
    match duration {
        Some(d) => serializer.serialize_some(&d.as_secs_f64()),
        None => serializer.serialize_none(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationSummary {
    pub session_id: SessionId,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    #[serde(rename = "duration_secs", serialize_with = "serialize_secs")]
    pub duration: Option<Duration>,
    pub current_stage: ValidationStage,
    pub stages_completed: Vec<ValidationStage>,
    pub projects_discovered: usize,
    pub projects_analyzed: usize,
    pub resources_deployed: usize,
    pub deployment_errors: usize,
    pub endpoints_tested: usize,
    pub tests_passed: usize,
    pub tests_failed: usize,
    pub tests_skipped: usize,
    pub fix_attempts: usize,
    pub fixes_successful: usize,
    pub success: bool,
    pub error_message: Option<String>,
    pub failure_kind: Option<FailureKind>,
    pub warnings: Vec<String>,
}

impl ValidationSummary {
    pub fn new(session_id: SessionId, start_time: DateTime<Utc>) -> Self {
        Self {
            session_id,
            start_time,
            end_time: None,
            duration: None,
            current_stage: ValidationStage::Initializing,
            stages_completed: Vec::new(),
            projects_discovered: 0,
            projects_analyzed: 0,
            resources_deployed: 0,
            deployment_errors: 0,
            endpoints_tested: 0,
            tests_passed: 0,
            tests_failed: 0,
            tests_skipped: 0,
            fix_attempts: 0,
            fixes_successful: 0,
            success: false,
            error_message: None,
            failure_kind: None,
            warnings: Vec::new(),
        }
    }

    /// 0 success, 1 validation failure, 2 orchestration failure.
    pub fn exit_code(&self) -> i32 {
        if self.success {
            return 0;
        }
        match self.failure_kind {
            Some(FailureKind::Validation) => 1,
            Some(FailureKind::Orchestration) | None => 2,
        }
    }

    /// Share of working stages completed at least once, 0 to 100.
    pub fn progress_percentage(&self) -> f64 {
        if self.current_stage == ValidationStage::Completed {
            return 100.0;
        }
        let done = ValidationStage::WORKING
            .iter()
            .filter(|stage| self.stages_completed.contains(stage))
            .count();
        done as f64 / ValidationStage::WORKING.len() as f64 * 100.0
    }

    pub(crate) fn fail(&mut self, kind: FailureKind, message: String) {
        self.current_stage = ValidationStage::Failed;
        self.success = false;
        self.failure_kind = Some(kind);
        self.error_message = Some(message);
    }

    pub(crate) fn finish(&mut self, end_time: DateTime<Utc>, duration: Duration) {
        self.end_time = Some(end_time);
        self.duration = Some(duration);
    }
}
