//! Publish command

use std::sync::Arc;

use clap::Args;
use dialoguer::Confirm;
use tracing::info;

use lockstep_core::monorepo::{NoOpCallback, PublishCallback, RegistryOptions};
use lockstep_core::{MarkdownChangelog, PublishPipeline, RegistryPublisher};

use super::shared::{Collaborators, ReleaseArgs};
use crate::cli::output::{self, ConsoleProgress};
use crate::cli::{Cli, OutputFormat};
use crate::exit_codes::CliError;

/// Bump, commit, tag and publish dirty packages
#[derive(Debug, Args)]
pub struct PublishCommand {
    #[command(flatten)]
    pub release: ReleaseArgs,

    /// Skip confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,
}

impl PublishCommand {
    /// Execute the publish command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(
            new_version = ?self.release.new_version,
            increment_by = ?self.release.increment_by,
            yes = self.yes,
            "executing publish command"
        );
        let root = std::env::current_dir()?;
        let config = self.release.config(cli, &root)?;
        let collaborators = Collaborators::open(&root)?;
        let request = self.release.request();
        let text = cli.format == OutputFormat::Text;

        let options = RegistryOptions::from_config(&config.publish, request.otp.clone());
        let command = collaborators.publisher.describe(&options);

        let progress: Arc<dyn PublishCallback> = if text && !cli.quiet {
            Arc::new(ConsoleProgress)
        } else {
            Arc::new(NoOpCallback)
        };
        let changelog = MarkdownChangelog::new();
        let pipeline = PublishPipeline::new(
            &config,
            request,
            &root,
            &collaborators.manifests,
            &collaborators.repo,
            collaborators.publisher.clone(),
        )
        .with_changelog(&changelog)
        .with_callback(progress);

        let plan = pipeline.plan()?;

        if plan.is_noop() {
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
                OutputFormat::Text => {
                    if !cli.quiet {
                        output::success("No package changed, nothing to publish.");
                    }
                }
            }
            return Ok(());
        }

        if text && !cli.quiet {
            output::print_plan(&plan, &command);
        }

        if !self.yes {
            let confirmed = Confirm::new()
                .with_prompt("Proceed with release?")
                .default(true)
                .interact()?;

            if !confirmed {
                return Err(CliError::Cancelled.into());
            }
        }

        let report = pipeline.execute(&plan)?;

        match cli.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            OutputFormat::Text => {
                if !cli.quiet {
                    output::print_report(&report);
                }
            }
        }

        if let Some(publish) = report.publish.as_ref().filter(|p| !p.success) {
            return Err(CliError::PublishFailed {
                failed: publish.failed().len(),
                not_reached: publish.not_reached().len(),
            }
            .into());
        }

        Ok(())
    }
}
