// ABOUTME: Runs project scripts that back the provisioning and testing collaborators.
// ABOUTME: Scripts get context through VERITY_* environment variables and are killed on timeout.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Default directory, relative to the project root, holding scripts.
pub const DEFAULT_SCRIPTS_DIR: &str = ".verity/scripts";

/// Well-known script names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    /// Exit 0 if the resource exists, 1 if not.
    Exists,
    /// Validate a template without deploying. Optional.
    Validate,
    /// Deploy a template, printing outputs as JSON on stdout.
    Provision,
    /// Delete a resource.
    Delete,
    /// Exercise one endpoint, printing the HTTP status on stdout.
    Test,
}

impl Script {
    pub fn filename(&self) -> &'static str {
        match self {
            Script::Exists => "exists",
            Script::Validate => "validate",
            Script::Provision => "provision",
            Script::Delete => "delete",
            Script::Test => "test",
        }
    }
}

/// Result of running a script.
#[derive(Debug, Clone)]
pub struct ScriptOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl ScriptOutput {
    fn spawn_failure(message: String) -> Self {
        Self {
            success: false,
            exit_code: None,
            stdout: String::new(),
            stderr: message,
            timed_out: false,
        }
    }

    /// Trimmed stderr, or a description of the exit status when stderr is empty.
    pub fn failure_message(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        match self.exit_code {
            Some(code) => format!("exited with code {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Discovers and runs scripts from one directory.
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    dir: PathBuf,
    timeout: Duration,
}

impl ScriptRunner {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            timeout: Duration::from_secs(300),
        }
    }

    /// Kill scripts that run longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn exists(&self, script: Script) -> bool {
        self.path(script).is_file()
    }

    fn path(&self, script: Script) -> PathBuf {
        self.dir.join(script.filename())
    }

    /// Run a script if it exists.
    ///
    /// Returns None if the script doesn't exist. Spawn failures and timeouts
    /// come back as an unsuccessful `ScriptOutput`.
    pub async fn run(&self, script: Script, env: &HashMap<String, String>) -> Option<ScriptOutput> {
        let path = self.path(script);

        if !path.is_file() {
            return None;
        }

        tracing::debug!(script = script.filename(), path = %path.display(), "running script");

        let child = Command::new(&path)
            .envs(env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, child).await {
            Ok(output) => output,
            Err(_) => {
                tracing::warn!(script = script.filename(), timeout = ?self.timeout, "script timed out");
                return Some(ScriptOutput {
                    timed_out: true,
                    ..ScriptOutput::spawn_failure(format!(
                        "{} timed out after {}s",
                        script.filename(),
                        self.timeout.as_secs()
                    ))
                });
            }
        };

        match output {
            Ok(output) => {
                let result = ScriptOutput {
                    success: output.status.success(),
                    exit_code: output.status.code(),
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                    timed_out: false,
                };

                if !result.success {
                    tracing::debug!(
                        script = script.filename(),
                        exit_code = ?result.exit_code,
                        "script exited unsuccessfully"
                    );
                }

                Some(result)
            }
            Err(e) => {
                tracing::error!(script = script.filename(), error = %e, "failed to execute script");
                Some(ScriptOutput::spawn_failure(e.to_string()))
            }
        }
    }
}
