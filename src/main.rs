// ABOUTME: Entry point for the verity CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use commands::ValidateOptions;
use std::env;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use verity::config::{self, CONFIG_FILENAME, Config};
use verity::error::Result;
use verity::output::{Output, OutputMode};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    let cwd = env::current_dir()?;

    match cli.command {
        Commands::Init { project, force } => {
            config::init_config(&cwd, project.as_deref(), force)?;
            println!("Created {CONFIG_FILENAME}");
            Ok(0)
        }
        Commands::Plan { config } => {
            let (config, _) = load_config(&cwd, config.as_deref())?;
            commands::plan(&config)?;
            Ok(0)
        }
        Commands::Validate {
            config,
            max_fix_attempts,
            no_fixes,
            force_redeploy,
            no_rollback,
            json,
            quiet,
            report,
        } => {
            let (config, root) = load_config(&cwd, config.as_deref())?;
            let mode = if json {
                OutputMode::Json
            } else if quiet {
                OutputMode::Quiet
            } else {
                OutputMode::Normal
            };
            let options = ValidateOptions {
                max_fix_attempts,
                no_fixes,
                force_redeploy,
                no_rollback,
                report,
            };
            commands::validate(config, root, options, Output::new(mode)).await
        }
    }
}

/// Load an explicit config file, or discover one in `cwd`.
///
/// Returns the config and the project root scripts resolve against.
fn load_config(cwd: &Path, path: Option<&Path>) -> Result<(Config, PathBuf)> {
    match path {
        Some(path) => {
            let config = Config::load(path)?;
            let root = path
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| cwd.to_path_buf());
            Ok((config, root))
        }
        None => Ok((Config::discover(cwd)?, cwd.to_path_buf())),
    }
}
