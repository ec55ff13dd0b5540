// ABOUTME: Validation session stages.
// ABOUTME: Forward-only apart from the Testing and Fixing loop.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStage {
    Initializing,
    Discovering,
    Analyzing,
    Deploying,
    Testing,
    Fixing,
    Completed,
    Failed,
}

impl ValidationStage {
    /// Stages that do work, in the order a full session passes through them.
    pub const WORKING: [ValidationStage; 6] = [
        ValidationStage::Initializing,
        ValidationStage::Discovering,
        ValidationStage::Analyzing,
        ValidationStage::Deploying,
        ValidationStage::Testing,
        ValidationStage::Fixing,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(self, ValidationStage::Completed | ValidationStage::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStage::Initializing => "initializing",
            ValidationStage::Discovering => "discovering",
            ValidationStage::Analyzing => "analyzing",
            ValidationStage::Deploying => "deploying",
            ValidationStage::Testing => "testing",
            ValidationStage::Fixing => "fixing",
            ValidationStage::Completed => "completed",
            ValidationStage::Failed => "failed",
        }
    }
}

impl fmt::Display for ValidationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
