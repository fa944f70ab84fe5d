//! Flags and collaborators shared by `publish` and `plan`

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;

use lockstep_adapters::NpmPublisher;
use lockstep_core::config::validate_config;
use lockstep_core::error::LockstepError;
use lockstep_core::{BumpPolicy, Config, FsManifestStore, PublishRequest};
use lockstep_git::GitRepo;

use crate::cli::Cli;

/// Options controlling one release run. Each flag overrides the
/// configuration file.
#[derive(Debug, Clone, Default, Args)]
pub struct ReleaseArgs {
    /// Explicit version for every dirty package (wins over --increment-by)
    #[arg(long, value_name = "VERSION")]
    pub new_version: Option<String>,

    /// Increment: major, minor, patch, premajor, preminor, prepatch,
    /// prerelease, alpha, beta or rc
    #[arg(long, visible_alias = "increment-version-by", value_name = "KIND")]
    pub increment_by: Option<String>,

    /// Last released version (default: the root manifest's version)
    #[arg(long, value_name = "VERSION")]
    pub master_version: Option<String>,

    /// Glob of package directories
    #[arg(long, value_name = "GLOB")]
    pub src: Option<String>,

    /// Glob of package directories to leave out
    #[arg(long, value_name = "GLOB")]
    pub ignore_src: Option<String>,

    /// Treat the repository root as the only package
    #[arg(long)]
    pub single: bool,

    /// Skip every repository check
    #[arg(long)]
    pub no_checks: bool,

    /// Allow releasing from a branch other than master/main
    #[arg(long)]
    pub no_master: bool,

    /// Allow uncommitted changes
    #[arg(long)]
    pub no_check_uncommitted: bool,

    /// Allow unpulled upstream commits
    #[arg(long)]
    pub no_check_unpulled: bool,

    /// Publish manifests as they are, without bumping
    #[arg(long)]
    pub no_bump: bool,

    /// Write manifests but do not commit, tag or push
    #[arg(long)]
    pub no_git_commit: bool,

    /// Do not publish to the registry
    #[arg(long, visible_alias = "no-npm-publish")]
    pub no_publish: bool,

    /// How dependents' requirements are rewritten: exact, range or no
    #[arg(long, value_name = "POLICY")]
    pub bump_dependent_reqs: Option<BumpPolicy>,

    /// Distribution tag passed to the registry (--tag)
    #[arg(long, value_name = "TAG")]
    pub publish_tag: Option<String>,

    /// One-time password for the registry
    #[arg(long, env = "LOCKSTEP_OTP", hide_env_values = true)]
    pub otp: Option<String>,

    /// Access level: public or private
    #[arg(long)]
    pub access: Option<String>,

    /// Packages published at once, in dependency waves
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Publish every public package, dirty or not
    #[arg(long)]
    pub publish_all: bool,

    /// Update the changelog
    #[arg(long)]
    pub changelog: bool,

    /// Changelog file, relative to the repository root
    #[arg(long, value_name = "PATH")]
    pub changelog_path: Option<PathBuf>,
}

impl ReleaseArgs {
    /// Load the configuration, apply these flags and validate the result
    pub fn config(&self, cli: &Cli, root: &Path) -> anyhow::Result<Config> {
        let mut config = cli.load_config(root)?;
        self.apply(&mut config);
        validate_config(&config)?;
        Ok(config)
    }

    /// Override configuration values with the flags that were given
    pub fn apply(&self, config: &mut Config) {
        if let Some(src) = &self.src {
            config.packages.src = src.clone();
        }
        if let Some(ignore) = &self.ignore_src {
            config.packages.ignore_src = Some(ignore.clone());
        }
        if self.single {
            config.packages.single = true;
        }

        if self.no_checks {
            config.checks.enabled = false;
        }
        if self.no_master {
            config.checks.master = false;
        }
        if self.no_check_uncommitted {
            config.checks.uncommitted = false;
        }
        if self.no_check_unpulled {
            config.checks.unpulled = false;
        }

        if self.no_bump {
            config.versioning.bump = false;
        }
        if let Some(policy) = self.bump_dependent_reqs {
            config.versioning.bump_dependent_reqs = policy;
        }
        if self.no_git_commit {
            config.git.commit = false;
        }

        if self.no_publish {
            config.publish.enabled = false;
        }
        if let Some(tag) = &self.publish_tag {
            config.publish.tag = Some(tag.clone());
        }
        if let Some(access) = &self.access {
            config.publish.access = Some(access.clone());
        }
        if let Some(concurrency) = self.concurrency {
            config.publish.concurrency = concurrency;
        }
        if self.publish_all {
            config.publish.publish_all = true;
        }

        if self.changelog {
            config.changelog.enabled = true;
        }
        if let Some(path) = &self.changelog_path {
            config.changelog.file = path.clone();
        }
    }

    /// Per-invocation inputs for the pipeline
    pub fn request(&self) -> PublishRequest {
        PublishRequest {
            new_version: self.new_version.clone(),
            increment_by: self.increment_by.clone(),
            master_version: self.master_version.clone(),
            otp: self.otp.clone(),
        }
    }
}

/// Real collaborators for a repository rooted at `root`
pub struct Collaborators {
    pub manifests: FsManifestStore,
    pub repo: GitRepo,
    pub publisher: Arc<NpmPublisher>,
}

impl Collaborators {
    /// Open the git repository containing `root`
    pub fn open(root: &Path) -> anyhow::Result<Self> {
        let repo = GitRepo::discover(root).map_err(LockstepError::from)?;
        Ok(Self {
            manifests: FsManifestStore::new(root),
            repo,
            publisher: Arc::new(NpmPublisher::new()),
        })
    }
}
