//! CLI definition and command handling

pub mod commands;
pub mod output;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use lockstep_core::config::{load_config, load_config_or_default};
use lockstep_core::Config;

use commands::{GraphCommand, PlanCommand, PublishCommand};

/// lockstep - version and publish every package of a monorepo together
#[derive(Debug, Parser)]
#[command(name = "lockstep")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Working directory
    #[arg(short = 'C', long, global = true)]
    pub directory: Option<PathBuf>,

    /// Configuration file (default: search for lockstep.toml / lockstep.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Bump, commit, tag and publish dirty packages
    Publish(PublishCommand),

    /// Show what a publish would do without changing anything
    Plan(PlanCommand),

    /// Print the package dependency graph in publish order
    Graph(GraphCommand),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> anyhow::Result<()> {
        // Change to specified directory if provided
        if let Some(dir) = &self.directory {
            std::env::set_current_dir(dir)?;
        }

        match self.command {
            Commands::Publish(ref cmd) => cmd.execute(&self),
            Commands::Plan(ref cmd) => cmd.execute(&self),
            Commands::Graph(ref cmd) => cmd.execute(&self),
        }
    }

    /// Load the configuration for `root`, telling the user when defaults
    /// are in use
    pub fn load_config(&self, root: &Path) -> anyhow::Result<Config> {
        if let Some(path) = &self.config {
            return Ok(load_config(path)?);
        }

        let (config, path) = load_config_or_default(root)?;
        if path.is_none() && !self.quiet && self.format == OutputFormat::Text {
            output::warning("No configuration found, using defaults.");
        }
        Ok(config)
    }
}
