//! Graph command

use clap::Args;
use console::style;
use serde::Serialize;
use tracing::info;

use lockstep_core::error::{LockstepError, ManifestError};
use lockstep_core::monorepo::{PackageNode, MANIFEST_FILE};
use lockstep_core::{DependencyGraph, FsManifestStore, ManifestStore, Package};

use crate::cli::output;
use crate::cli::{Cli, OutputFormat};

/// Print the package dependency graph in publish order
#[derive(Debug, Args)]
pub struct GraphCommand {
    /// Glob of package directories
    #[arg(long, value_name = "GLOB")]
    pub src: Option<String>,

    /// Glob of package directories to leave out
    #[arg(long, value_name = "GLOB")]
    pub ignore_src: Option<String>,
}

#[derive(Serialize)]
struct GraphOutput<'a> {
    order: Vec<&'a PackageNode>,
    waves: Vec<Vec<String>>,
}

impl GraphCommand {
    /// Execute the graph command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(src = ?self.src, "executing graph command");
        let root = std::env::current_dir()?;
        let mut config = cli.load_config(&root)?;
        if let Some(src) = &self.src {
            config.packages.src = src.clone();
        }
        if let Some(ignore) = &self.ignore_src {
            config.packages.ignore_src = Some(ignore.clone());
        }

        let store = FsManifestStore::new(&root);
        let packages: Vec<Package> = if config.packages.single {
            let package = store.read(&root)?.ok_or_else(|| {
                LockstepError::from(ManifestError::NotFound(root.join(MANIFEST_FILE)))
            })?;
            vec![package]
        } else {
            store.discover(&config.packages.src, config.packages.ignore_src.as_deref())?
        };

        let graph = DependencyGraph::build(&packages)?;
        let order: Vec<&PackageNode> = graph
            .sorted()
            .iter()
            .filter_map(|name| graph.get(name))
            .collect();
        let waves = graph.waves(graph.sorted());

        match cli.format {
            OutputFormat::Json => {
                let out = GraphOutput { order, waves };
                println!("{}", serde_json::to_string_pretty(&out)?);
            }
            OutputFormat::Text => {
                if order.is_empty() {
                    output::warning(&format!("No packages match '{}'", config.packages.src));
                    return Ok(());
                }
                print_graph(&order, &waves);
            }
        }

        Ok(())
    }
}

fn print_graph(order: &[&PackageNode], waves: &[Vec<String>]) {
    println!(
        "{}",
        output::header(&format!("Packages in publish order ({})", order.len()))
    );
    for (i, node) in order.iter().enumerate() {
        let private = if node.private {
            style(" private").dim().to_string()
        } else {
            String::new()
        };
        println!(
            "  {:>3}. {}@{} {}{}",
            i + 1,
            output::package_style().apply_to(&node.name),
            node.version,
            style(format!("depth {}", node.depth)).dim(),
            private
        );
        if !node.dependencies.is_empty() {
            println!("       {} {}", style("depends on").dim(), node.dependencies.join(", "));
        }
    }
    println!();

    println!("{}", output::header("Waves"));
    for (i, wave) in waves.iter().enumerate() {
        println!("{}", output::key_value(&format!("{}", i + 1), &wave.join(", ")));
    }
}
