// ABOUTME: Template-fix collaborator trait and its external-command implementation.
// ABOUTME: The command receives the issue description via `--issue`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

#[derive(Debug, thiserror::Error)]
pub enum FixToolError {
    #[error("fix tool not found: {0}")]
    NotFound(String),

    #[error("fix tool exited with {}: {stderr}", describe_exit(.code))]
    Failed { code: Option<i32>, stderr: String },

    #[error("fix tool timed out after {}s", .0.as_secs())]
    TimedOut(Duration),

    #[error("failed to run fix tool: {0}")]
    Io(#[from] std::io::Error),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {code}"),
        None => "signal".to_string(),
    }
}

/// Repairs templates given a description of what is wrong.
#[async_trait]
pub trait TemplateFixer: Send + Sync {
    async fn fix(&self, issue: &str) -> Result<(), FixToolError>;
}

/// The `fix.tool` config section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixCommandConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Runs `program args... --issue <description>` in the project root.
#[derive(Debug, Clone)]
pub struct CommandFixer {
    program: String,
    args: Vec<String>,
    working_dir: PathBuf,
}

impl CommandFixer {
    pub fn new(program: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
        }
    }

    pub fn from_config(config: &FixCommandConfig, working_dir: impl Into<PathBuf>) -> Self {
        Self::new(config.program.clone(), working_dir).with_args(config.args.clone())
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }
}

#[async_trait]
impl TemplateFixer for CommandFixer {
    async fn fix(&self, issue: &str) -> Result<(), FixToolError> {
        tracing::info!(program = %self.program, "running template fix tool");

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg("--issue")
            .arg(issue)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => FixToolError::NotFound(self.program.clone()),
                _ => FixToolError::Io(e),
            })?;

        if output.status.success() {
            tracing::info!(program = %self.program, "fix tool succeeded");
            Ok(())
        } else {
            Err(FixToolError::Failed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_program_is_not_found() {
        let fixer = CommandFixer::new("verity-no-such-fix-tool", std::env::temp_dir());
        let err = fixer.fix("broken template").await.unwrap_err();
        assert!(matches!(err, FixToolError::NotFound(_)));
    }

    #[test]
    fn failed_message_includes_code() {
        let err = FixToolError::Failed {
            code: Some(2),
            stderr: "bad input".to_string(),
        };
        assert_eq!(err.to_string(), "fix tool exited with code 2: bad input");
    }

    #[test]
    fn command_config_args_default_empty() {
        let config: FixCommandConfig = serde_yaml::from_str("program: specify").unwrap();
        assert!(config.args.is_empty());
    }
}
