//! Output formatting utilities

use console::{style, Style};

use lockstep_core::monorepo::{PackagePublishResult, PublishCallback, PublishStatus};
use lockstep_core::{PipelineReport, ReleasePlan};

/// Print a success message
pub fn success(message: &str) {
    println!("{} {}", style("✓").green().bold(), message);
}

/// Print an error message
pub fn error(message: &str) {
    eprintln!("{} {}", style("✗").red().bold(), message);
}

/// Print a warning message
pub fn warning(message: &str) {
    println!("{} {}", style("!").yellow().bold(), message);
}

/// Print an info message
pub fn info(message: &str) {
    println!("{} {}", style("→").blue(), message);
}

/// Create a styled header
pub fn header(text: &str) -> String {
    style(text).bold().to_string()
}

/// Create a styled key-value line
pub fn key_value(key: &str, value: &str) -> String {
    format!("  {}: {}", style(key).dim(), value)
}

/// Style for version numbers
pub fn version_style() -> Style {
    Style::new().green().bold()
}

/// Style for tags
pub fn tag_style() -> Style {
    Style::new().yellow()
}

/// Style for package names
pub fn package_style() -> Style {
    Style::new().cyan()
}

/// Print a release preview
pub fn print_plan(plan: &ReleasePlan, publish_command: &str) {
    println!("{}", header("Release Preview"));
    println!();

    match &plan.version {
        Some(version) => {
            println!("{}", key_value("Current version", &version.previous));
            println!(
                "{}",
                key_value("Next version", &version_style().apply_to(&version.version).to_string())
            );
        }
        None => println!("{}", key_value("Next version", "unchanged")),
    }
    if let Some(tag) = &plan.tag {
        println!("{}", key_value("Tag", &tag_style().apply_to(tag).to_string()));
    }
    println!();

    println!(
        "{}",
        header(&format!(
            "Dirty packages ({} of {})",
            plan.dirty.len(),
            plan.packages.len()
        ))
    );
    for dirty in plan.dirty.iter() {
        println!(
            "  {} {}",
            package_style().apply_to(&dirty.name),
            style(format!("({})", dirty.reason)).dim()
        );
    }
    println!();

    if !plan.updates.is_empty() {
        println!("{}", header("Manifests to update"));
        for update in &plan.updates {
            let version = if update.version_changed() {
                format!("{} -> {}", update.previous_version, update.manifest.version)
            } else {
                update.previous_version.clone()
            };
            println!("  {} {}", package_style().apply_to(&update.name), version);
            for change in &update.changes {
                println!(
                    "    {} {}: {} -> {}",
                    style(change.section.to_string()).dim(),
                    change.dependency,
                    change.from,
                    change.to
                );
            }
        }
        println!();
    }

    if let Some(publish) = &plan.publish {
        println!("{}", header("Publish order"));
        for planned in &publish.packages {
            println!(
                "  {}. {}@{}",
                planned.order + 1,
                package_style().apply_to(&planned.name),
                planned.version
            );
        }
        for name in &publish.skipped_private {
            println!("  -  {} {}", name, style("(private, skipped)").dim());
        }
        if !publish.packages.is_empty() {
            println!("{}", key_value("Command", publish_command));
        }
        println!();
    }
}

/// Print the outcome of a run
pub fn print_report(report: &PipelineReport) {
    if !report.written.is_empty() {
        success(&format!("Updated {} manifest(s)", report.written.len()));
    }
    if let Some(path) = &report.changelog {
        success(&format!("Updated changelog at {}", path.display()));
    }
    if report.committed {
        match &report.tag {
            Some(tag) => success(&format!(
                "Committed, tagged {} and pushed",
                tag_style().apply_to(tag)
            )),
            None => success("Committed and pushed"),
        }
    }

    if let Some(publish) = &report.publish {
        for result in &publish.packages {
            match &result.status {
                PublishStatus::NotReached => warning(&format!("{} not reached", result.package)),
                PublishStatus::SkippedPrivate => {
                    info(&format!("{} is private, skipped", result.package))
                }
                _ => {}
            }
        }
        if publish.success {
            success(&format!(
                "Published {} package(s) in {:.1}s",
                publish.published().len(),
                publish.total_duration.as_secs_f64()
            ));
        }
    }

    if let Some(version) = &report.version {
        println!();
        success(&format!(
            "Released version {}",
            version_style().apply_to(version)
        ));
    }
}

/// Prints one line per publish as it happens
pub struct ConsoleProgress;

impl PublishCallback for ConsoleProgress {
    fn on_publish_start(&self, package: &str, version: &str) {
        info(&format!(
            "Publishing {}@{}",
            package_style().apply_to(package),
            version
        ));
    }

    fn on_publish_complete(&self, result: &PackagePublishResult) {
        match &result.status {
            PublishStatus::Published => success(&format!(
                "{}@{} ({:.1}s)",
                result.package,
                result.version,
                result.duration.as_secs_f64()
            )),
            PublishStatus::Failed(reason) => {
                error(&format!("{}@{}: {}", result.package, result.version, reason))
            }
            _ => {}
        }
    }
}
