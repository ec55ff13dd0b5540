// ABOUTME: Fix orchestrator: classifies failures and dispatches one strategy per category.
// ABOUTME: Bounded by an attempt budget that trips open until explicitly reset.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::{ErrorCategory, FixCommandConfig, FixStrategy, FixToolError, TemplateFixer};
use crate::resilience::{BreakerConfig, CircuitBreaker};
use crate::testing::TestResult;

fn default_max_attempts() -> u32 {
    3
}

fn default_template_fixes() -> bool {
    true
}

fn default_tool_timeout() -> Duration {
    Duration::from_secs(300)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixConfig {
    /// Fix attempts allowed before the orchestrator opens.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Whether UpdateTemplate may call the template-fix tool.
    #[serde(default = "default_template_fixes")]
    pub template_fixes: bool,

    #[serde(default)]
    pub tool: Option<FixCommandConfig>,

    #[serde(default = "default_tool_timeout", with = "humantime_serde")]
    pub tool_timeout: Duration,

    /// Guards the template-fix tool itself.
    #[serde(default)]
    pub breaker: BreakerConfig,
}

impl Default for FixConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            template_fixes: default_template_fixes(),
            tool: None,
            tool_timeout: default_tool_timeout(),
            breaker: BreakerConfig::default(),
        }
    }
}

/// One dispatched strategy and how it went.
#[derive(Debug, Clone, Serialize)]
pub struct FixAttempt {
    pub category: ErrorCategory,
    pub strategy: FixStrategy,
    pub description: String,
    pub success: bool,
    pub error: Option<String>,
}

impl fmt::Display for FixAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.success { "✓" } else { "✗" };
        write!(f, "{mark} {}", self.description)?;
        if let Some(ref error) = self.error {
            write!(f, " ({error})")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FixSummary {
    pub total_attempts: usize,
    pub successful_fixes: usize,
    pub failed_fixes: usize,
    pub circuit_open: bool,
    pub attempts: Vec<FixAttempt>,
}

/// Turns failures into remediation attempts.
///
/// Each call to [`attempt_fix`](Self::attempt_fix) groups failures by
/// category and runs the category's strategy once. Every dispatched
/// strategy is recorded as a [`FixAttempt`]. Once the number of recorded
/// attempts reaches `max_attempts` the orchestrator opens and does no
/// further work until [`reset_circuit_breaker`](Self::reset_circuit_breaker).
pub struct FixOrchestrator {
    config: FixConfig,
    fixer: Option<Arc<dyn TemplateFixer>>,
    tool_breaker: CircuitBreaker,
    attempts: Vec<FixAttempt>,
    circuit_open: bool,
}

impl FixOrchestrator {
    pub fn new(config: FixConfig, fixer: Option<Arc<dyn TemplateFixer>>) -> Self {
        let tool_breaker = CircuitBreaker::new(config.breaker);
        Self {
            config,
            fixer,
            tool_breaker,
            attempts: Vec::new(),
            circuit_open: false,
        }
    }

    pub fn is_circuit_open(&self) -> bool {
        self.circuit_open
    }

    pub fn attempts(&self) -> &[FixAttempt] {
        &self.attempts
    }

    pub fn summary(&self) -> FixSummary {
        let successful_fixes = self.attempts.iter().filter(|a| a.success).count();
        FixSummary {
            total_attempts: self.attempts.len(),
            successful_fixes,
            failed_fixes: self.attempts.len() - successful_fixes,
            circuit_open: self.circuit_open,
            attempts: self.attempts.clone(),
        }
    }

    /// Close the orchestrator and forget previous attempts.
    pub fn reset_circuit_breaker(&mut self) {
        tracing::info!("fix circuit breaker reset");
        self.circuit_open = false;
        self.attempts.clear();
        self.tool_breaker.reset();
    }

    /// Classify failures and run one strategy per category.
    ///
    /// Returns true only if every dispatched strategy succeeded. With
    /// nothing to classify it returns true; while open it returns false
    /// without doing any work.
    pub async fn attempt_fix(
        &mut self,
        test_failures: &[TestResult],
        deployment_errors: &[String],
    ) -> bool {
        if self.circuit_open {
            tracing::warn!("fix circuit breaker is open; skipping fix attempt");
            return false;
        }

        let max_attempts = self.config.max_attempts as usize;
        if self.attempts.len() >= max_attempts {
            tracing::warn!(max_attempts, "fix attempt budget exhausted; opening circuit");
            self.circuit_open = true;
            return false;
        }

        let classified = classify(test_failures, deployment_errors);
        if classified.is_empty() {
            tracing::info!("no fixable errors detected");
            return true;
        }

        tracing::info!(
            categories = classified.len(),
            previous_attempts = self.attempts.len(),
            "attempting fixes"
        );

        let mut all_succeeded = true;
        for (category, messages) in classified {
            let strategy = category.strategy();
            let outcome = self.apply(strategy, &messages).await;

            let attempt = FixAttempt {
                category,
                strategy,
                description: format!("{strategy} for {} {category} error(s)", messages.len()),
                success: outcome.is_ok(),
                error: outcome.err(),
            };

            if attempt.success {
                tracing::info!(%category, %strategy, "fix applied");
            } else {
                tracing::warn!(%category, %strategy, error = ?attempt.error, "fix failed");
                all_succeeded = false;
            }
            self.attempts.push(attempt);
        }

        if self.attempts.len() >= max_attempts {
            tracing::warn!(
                attempts = self.attempts.len(),
                "fix attempt budget reached; opening circuit"
            );
            self.circuit_open = true;
        }

        all_succeeded
    }

    async fn apply(&mut self, strategy: FixStrategy, messages: &[String]) -> Result<(), String> {
        match strategy {
            FixStrategy::Retry => {
                tracing::debug!("transient failure; next test round retries");
                Ok(())
            }
            FixStrategy::UpdateTemplate => self.fix_templates(messages).await,
            FixStrategy::UpdateDependencies | FixStrategy::Reconfigure => {
                Err(format!("no automated remediation for {strategy}"))
            }
            FixStrategy::ManualIntervention => Err("manual intervention required".to_string()),
        }
    }

    async fn fix_templates(&mut self, messages: &[String]) -> Result<(), String> {
        if !self.config.template_fixes {
            return Err("template fixes disabled".to_string());
        }
        let Some(fixer) = self.fixer.clone() else {
            return Err("no template fix tool configured".to_string());
        };

        let issue = messages.join(" | ");
        let timeout = self.config.tool_timeout;

        self.tool_breaker
            .call(move || async move {
                match tokio::time::timeout(timeout, fixer.fix(&issue)).await {
                    Ok(result) => result,
                    Err(_) => Err(FixToolError::TimedOut(timeout)),
                }
            })
            .await
            .map_err(|e| e.to_string())
    }
}

/// Group failure descriptions by category, in category order.
fn classify(
    test_failures: &[TestResult],
    deployment_errors: &[String],
) -> BTreeMap<ErrorCategory, Vec<String>> {
    let mut classified: BTreeMap<ErrorCategory, Vec<String>> = BTreeMap::new();

    for result in test_failures {
        if let Some(category) = ErrorCategory::from_test_status(result.status) {
            classified.entry(category).or_default().push(result.describe());
        }
    }

    for error in deployment_errors {
        classified
            .entry(ErrorCategory::classify_deployment_error(error))
            .or_default()
            .push(error.clone());
    }

    classified
}
