// ABOUTME: Automated remediation of failed tests and deployments.
// ABOUTME: Category classification, strategy dispatch, and the template-fix tool.

mod category;
mod orchestrator;
mod tool;

pub use category::{ErrorCategory, FixStrategy};
pub use orchestrator::{FixAttempt, FixConfig, FixOrchestrator, FixSummary};
pub use tool::{CommandFixer, FixCommandConfig, FixToolError, TemplateFixer};
