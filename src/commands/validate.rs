// ABOUTME: Validate command implementation.
// ABOUTME: Wires script-backed collaborators into a validation session and reports the summary.

use std::path::PathBuf;
use std::sync::Arc;
use verity::backend::ScriptProvisioner;
use verity::config::{Config, ConfigSource};
use verity::error::Result;
use verity::fix::{CommandFixer, TemplateFixer};
use verity::output::Output;
use verity::scripts::ScriptRunner;
use verity::session::{Collaborators, ValidationSession};
use verity::testing::ScriptTester;

/// Command-line overrides for a validation run.
pub struct ValidateOptions {
    pub max_fix_attempts: Option<u32>,
    pub no_fixes: bool,
    pub force_redeploy: bool,
    pub no_rollback: bool,
    pub report: Option<PathBuf>,
}

/// Run a validation session and return the process exit code.
pub async fn validate(
    config: Config,
    root: PathBuf,
    options: ValidateOptions,
    mut output: Output,
) -> Result<i32> {
    let mut session_config = config.session_config();
    if let Some(max) = options.max_fix_attempts {
        session_config.fix.max_attempts = max;
    }
    if options.no_fixes {
        session_config.fix.max_attempts = 0;
    }
    if options.force_redeploy {
        session_config.deploy.force_redeploy = true;
    }
    if options.no_rollback {
        session_config.deploy.rollback = false;
    }

    let scripts_dir = config.scripts_dir(&root);
    let provisioner = ScriptProvisioner::new(
        ScriptRunner::new(scripts_dir.clone()).with_timeout(session_config.deploy.provision_timeout),
    );
    let tester = ScriptTester::new(
        ScriptRunner::new(scripts_dir).with_timeout(config.testing.timeout),
        config.testing.base_url.clone(),
        config.testing.max_concurrent,
    );
    let fixer = config.fix.tool.as_ref().map(|tool| {
        Arc::new(CommandFixer::from_config(tool, root.clone())) as Arc<dyn TemplateFixer>
    });

    output.start_timer();
    output.progress(&format!(
        "Validating {} ({} resource(s), {} endpoint(s))",
        config.project,
        config.resources.len(),
        config.endpoints.len()
    ));

    let source = Arc::new(ConfigSource::new(config, root));
    let collaborators = Collaborators {
        discoverer: source.clone(),
        analyzer: source,
        provisioner: Arc::new(provisioner),
        tester: Arc::new(tester),
        fixer,
    };

    let mut session = ValidationSession::new(session_config, collaborators);
    let summary = session.run().await;
    output.summary(&summary);

    if let Some(path) = options.report {
        std::fs::write(&path, serde_json::to_string_pretty(&summary)?)?;
        output.progress(&format!("Report written to {}", path.display()));
    }

    Ok(summary.exit_code())
}
