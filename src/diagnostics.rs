// ABOUTME: Diagnostics accumulator for non-fatal warnings during a validation session.
// ABOUTME: Collects warnings that shouldn't fail a session but should reach the summary.

/// Collects non-fatal warnings during a session.
#[derive(Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!(kind = ?warning.kind, "{}", warning.message);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// A non-fatal warning collected during a session.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    pub fn nothing_to_deploy(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::NothingToDeploy,
            message: message.into(),
        }
    }

    pub fn no_endpoints(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::NoEndpoints,
            message: message.into(),
        }
    }

    pub fn rollback_incomplete(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::RollbackIncomplete,
            message: message.into(),
        }
    }

    pub fn fix_circuit_open(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::FixCircuitOpen,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Analysis produced no resources; deployment was skipped.
    NothingToDeploy,
    /// Analysis produced no endpoints; testing was skipped.
    NoEndpoints,
    /// Some resources could not be deleted during rollback.
    RollbackIncomplete,
    /// The fix orchestrator stopped accepting work.
    FixCircuitOpen,
}
