// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "verity")]
#[command(about = "Validate deployment rollouts: ordered deploys, endpoint tests, bounded auto-fixes")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new verity.yml configuration file
    Init {
        /// Project name (defaults to the directory name)
        #[arg(short, long)]
        project: Option<String>,

        /// Overwrite an existing verity.yml
        #[arg(short, long)]
        force: bool,
    },

    /// Show deployment order and parallel batches
    Plan {
        /// Config file (defaults to discovery in the current directory)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Deploy, test endpoints, and attempt fixes until passing or out of attempts
    Validate {
        /// Config file (defaults to discovery in the current directory)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override fix.max_attempts
        #[arg(long)]
        max_fix_attempts: Option<u32>,

        /// Test once without attempting fixes
        #[arg(long, conflicts_with = "max_fix_attempts")]
        no_fixes: bool,

        /// Provision resources even if they already exist
        #[arg(long)]
        force_redeploy: bool,

        /// Keep provisioned resources when a batch fails
        #[arg(long)]
        no_rollback: bool,

        /// Print the summary as JSON
        #[arg(long, conflicts_with = "quiet")]
        json: bool,

        /// Print only the final verdict
        #[arg(short, long)]
        quiet: bool,

        /// Write the JSON summary to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },
}
