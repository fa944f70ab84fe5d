//! Configuration types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::types::BumpPolicy;

/// Main configuration for lockstep
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Package discovery
    pub packages: PackagesConfig,

    /// Repository state checks
    pub checks: ChecksConfig,

    /// Version bump and requirement rewriting
    pub versioning: VersioningConfig,

    /// Change detection
    pub changes: ChangesConfig,

    /// Git commit/tag/push
    pub git: GitConfig,

    /// Registry publishing
    pub publish: PublishConfig,

    /// Changelog generation
    pub changelog: ChangelogConfig,
}

/// Package discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PackagesConfig {
    /// Glob matching package directories, relative to the repository root
    pub src: String,

    /// Glob of package directories to leave out
    pub ignore_src: Option<String>,

    /// Treat the root manifest as the only package
    pub single: bool,
}

impl Default for PackagesConfig {
    fn default() -> Self {
        Self {
            src: "packages/*".to_string(),
            ignore_src: None,
            single: false,
        }
    }
}

/// Repository state checks run before anything is written
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChecksConfig {
    /// Master switch; `false` bypasses every check below
    pub enabled: bool,

    /// Require the current branch to be `master` or `main`
    pub master: bool,

    /// Refuse to run with uncommitted changes
    pub uncommitted: bool,

    /// Refuse to run when the remote has unpulled commits
    pub unpulled: bool,
}

impl Default for ChecksConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            master: true,
            uncommitted: true,
            unpulled: true,
        }
    }
}

/// Versioning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VersioningConfig {
    /// Bump versions and rewrite manifests; `false` publishes what is on disk
    pub bump: bool,

    /// Tag format (e.g., "v{version}")
    pub tag_format: String,

    /// How dependents' requirements on bumped packages are rewritten
    pub bump_dependent_reqs: BumpPolicy,

    /// Default increment when no explicit version is requested
    pub increment_by: Option<String>,
}

impl Default for VersioningConfig {
    fn default() -> Self {
        Self {
            bump: true,
            tag_format: "v{version}".to_string(),
            bump_dependent_reqs: BumpPolicy::default(),
            increment_by: None,
        }
    }
}

/// Change detection configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangesConfig {
    /// Files matching these globs never make a package dirty
    pub ignore: Vec<String>,
}

/// Git configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    /// Commit, tag and push after rewriting manifests
    pub commit: bool,

    /// Commit message template
    pub commit_message: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            commit: true,
            commit_message: "v{version}".to_string(),
        }
    }
}

/// Publishing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Whether to publish packages
    pub enabled: bool,

    /// Distribution tag (`--tag`)
    pub tag: Option<String>,

    /// Access level (`--access`); only `public` and `private` are passed on
    pub access: Option<String>,

    /// Maximum number of independent packages published at once
    pub concurrency: usize,

    /// Consider every non-private package for publication, dirty or not
    pub publish_all: bool,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tag: None,
            access: None,
            concurrency: 1,
            publish_all: false,
        }
    }
}

/// Changelog configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangelogConfig {
    /// Whether to update the changelog
    pub enabled: bool,

    /// Changelog file path, relative to the repository root
    pub file: PathBuf,
}

impl Default for ChangelogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            file: PathBuf::from("CHANGELOG.md"),
        }
    }
}

impl Config {
    /// Render the release tag for a version
    pub fn tag_name(&self, version: &str) -> String {
        self.versioning.tag_format.replace("{version}", version)
    }

    /// Render the release commit message for a version
    pub fn commit_message(&self, version: &str) -> String {
        self.git.commit_message.replace("{version}", version)
    }
}
