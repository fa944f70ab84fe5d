//! Changelog writing

use std::path::Path;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::monorepo::{ChangeReason, DirtySet};
use crate::traits::ChangelogWriter;

/// One bumped package in a release section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangelogEntry {
    /// Package name
    pub package: String,
    /// Why the package was bumped
    pub reason: ChangeReason,
}

impl ChangelogEntry {
    /// Entries for every dirty package, in discovery order
    pub fn from_dirty(dirty: &DirtySet) -> Vec<Self> {
        dirty
            .iter()
            .map(|p| Self {
                package: p.name.clone(),
                reason: p.reason.clone(),
            })
            .collect()
    }
}

/// Prepends Markdown release sections to a changelog file
#[derive(Debug, Clone, Default)]
pub struct MarkdownChangelog {
    date: Option<NaiveDate>,
}

impl MarkdownChangelog {
    /// Writer dated today (UTC)
    pub fn new() -> Self {
        Self::default()
    }

    /// Writer with a fixed release date
    pub fn with_date(date: NaiveDate) -> Self {
        Self { date: Some(date) }
    }

    /// Render a release section headed by `release` (the release tag)
    pub fn render(&self, release: &str, entries: &[ChangelogEntry]) -> String {
        let date = self.date.unwrap_or_else(|| Utc::now().date_naive());
        let mut out = format!("## {} ({})\n\n", release, date.format("%Y-%m-%d"));
        for entry in entries {
            out.push_str(&format!("- `{}`: {}\n", entry.package, entry.reason));
        }
        out
    }
}

impl ChangelogWriter for MarkdownChangelog {
    fn write(&self, path: &Path, release: &str, entries: &[ChangelogEntry]) -> Result<()> {
        info!(path = %path.display(), release, entries = entries.len(), "writing changelog");
        let section = self.render(release, entries);

        let content = if path.exists() {
            let existing = std::fs::read_to_string(path)?;
            debug!(path = %path.display(), "prepending to existing changelog");
            prepend_section(&existing, &section)
        } else {
            format!("# Changelog\n\n{}", section)
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Insert below a leading `# ` title when there is one
fn prepend_section(existing: &str, section: &str) -> String {
    if existing.starts_with("# ") {
        let (title, rest) = existing.split_once('\n').unwrap_or((existing, ""));
        format!("{}\n\n{}\n{}", title, section, rest.trim_start_matches('\n'))
    } else {
        format!("{}\n{}", section, existing)
    }
}
