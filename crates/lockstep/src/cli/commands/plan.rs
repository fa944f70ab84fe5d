//! Plan command

use clap::Args;
use tracing::info;

use lockstep_core::monorepo::RegistryOptions;
use lockstep_core::{PublishPipeline, RegistryPublisher};

use super::shared::{Collaborators, ReleaseArgs};
use crate::cli::output;
use crate::cli::{Cli, OutputFormat};

/// Show what a publish would do without changing anything
#[derive(Debug, Args)]
pub struct PlanCommand {
    #[command(flatten)]
    pub release: ReleaseArgs,
}

impl PlanCommand {
    /// Execute the plan command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(
            new_version = ?self.release.new_version,
            increment_by = ?self.release.increment_by,
            "executing plan command"
        );
        let root = std::env::current_dir()?;
        let config = self.release.config(cli, &root)?;
        let collaborators = Collaborators::open(&root)?;
        let request = self.release.request();

        let options = RegistryOptions::from_config(&config.publish, request.otp.clone());
        let command = collaborators.publisher.describe(&options);

        let plan = PublishPipeline::new(
            &config,
            request,
            &root,
            &collaborators.manifests,
            &collaborators.repo,
            collaborators.publisher.clone(),
        )
        .plan()?;

        match cli.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
            OutputFormat::Text => {
                if plan.is_noop() {
                    output::success("No package changed, nothing to publish.");
                } else {
                    output::print_plan(&plan, &command);
                    output::info("Run `lockstep publish` to apply this plan.");
                }
            }
        }

        Ok(())
    }
}
