// ABOUTME: Validation session state machine and its terminal summary.
// ABOUTME: Drives discovery, analysis, deployment, and the test/fix loop.

mod collab;
mod error;
mod runner;
mod stage;
mod summary;

pub use collab::{Analyzer, CollaboratorError, DeploymentPlan, Discoverer, Project};
pub use error::SessionError;
pub use runner::{Collaborators, SessionConfig, ValidationSession};
pub use stage::ValidationStage;
pub use summary::{FailureKind, ValidationSummary};
