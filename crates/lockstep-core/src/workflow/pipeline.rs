//! Publish pipeline orchestration
//!
//! A run is split in two. [`PublishPipeline::plan`] performs the repository
//! checks and computes everything in memory: packages, graph, dirty set,
//! version, manifest updates and publish order. [`PublishPipeline::execute`]
//! then writes manifests and the changelog, commits, tags, pushes, and
//! publishes. Nothing touches disk, git or the registry until `execute`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::config::{validate_config, Config};
use crate::error::{CheckError, ConfigError, ManifestError, Result};
use crate::monorepo::{
    ChangeDetector, ChangeFilter, DependencyGraph, DirtySet, ManifestRewriter, ManifestUpdate,
    NoOpCallback, Package, PublishCallback, PublishPlan, PublishResult, PublishSequencer,
    RegistryOptions, VersionDirective, VersionPlan, VersionPlanner, MANIFEST_FILE,
};
use crate::traits::{ChangelogWriter, ManifestStore, RegistryPublisher, VersionControl};

use super::changelog::ChangelogEntry;

/// Branches a release may be cut from
pub const RELEASE_BRANCHES: &[&str] = &["master", "main"];

/// Per-invocation inputs that do not live in the configuration file
#[derive(Debug, Clone, Default)]
pub struct PublishRequest {
    /// Explicit version; wins over any increment
    pub new_version: Option<String>,
    /// Increment directive (major, minor, patch, ..., rc)
    pub increment_by: Option<String>,
    /// Last released version, used as the baseline instead of the manifests
    pub master_version: Option<String>,
    /// One-time password for the registry
    pub otp: Option<String>,
}

impl PublishRequest {
    /// Set an explicit version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.new_version = Some(version.into());
        self
    }

    /// Set the increment directive
    pub fn with_increment(mut self, increment: impl Into<String>) -> Self {
        self.increment_by = Some(increment.into());
        self
    }

    /// Set the baseline version
    pub fn with_master_version(mut self, version: impl Into<String>) -> Self {
        self.master_version = Some(version.into());
        self
    }

    /// Set the one-time password
    pub fn with_otp(mut self, otp: impl Into<String>) -> Self {
        self.otp = Some(otp.into());
        self
    }
}

/// Everything a run will do, computed without side effects
#[derive(Debug, Clone, Serialize)]
pub struct ReleasePlan {
    /// Packages in discovery order
    pub packages: Vec<Package>,
    /// Dirty closure
    pub dirty: DirtySet,
    /// Planned version; `None` when bumping is off or nothing is dirty
    pub version: Option<VersionPlan>,
    /// Manifests to write, root first
    pub updates: Vec<ManifestUpdate>,
    /// Tag to create
    pub tag: Option<String>,
    /// Publish order; `None` when publishing is off
    pub publish: Option<PublishPlan>,
    #[serde(skip)]
    graph: DependencyGraph,
}

impl ReleasePlan {
    /// Whether running the plan would do nothing
    pub fn is_noop(&self) -> bool {
        self.updates.is_empty() && self.publish.as_ref().map_or(true, PublishPlan::is_empty)
    }

    /// The planned version string
    pub fn version(&self) -> Option<&str> {
        self.version.as_ref().map(|v| v.version.as_str())
    }

    /// Dependency graph of the discovered packages
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }
}

/// What a run did
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineReport {
    /// Version applied to the dirty packages
    pub version: Option<String>,
    /// Manifests written
    pub written: Vec<PathBuf>,
    /// Changelog updated
    pub changelog: Option<PathBuf>,
    /// Whether a commit was made and pushed
    pub committed: bool,
    /// Tag created
    pub tag: Option<String>,
    /// Publish outcome
    pub publish: Option<PublishResult>,
}

impl PipelineReport {
    /// Whether every attempted publish succeeded
    pub fn success(&self) -> bool {
        self.publish.as_ref().map_or(true, |p| p.success)
    }
}

/// Drives one publish run against its collaborators
pub struct PublishPipeline<'a> {
    config: &'a Config,
    request: PublishRequest,
    root: PathBuf,
    manifests: &'a dyn ManifestStore,
    vcs: &'a dyn VersionControl,
    publisher: Arc<dyn RegistryPublisher>,
    changelog: Option<&'a dyn ChangelogWriter>,
    callback: Arc<dyn PublishCallback>,
}

impl<'a> PublishPipeline<'a> {
    /// Create a pipeline for the repository at `root`
    pub fn new(
        config: &'a Config,
        request: PublishRequest,
        root: impl Into<PathBuf>,
        manifests: &'a dyn ManifestStore,
        vcs: &'a dyn VersionControl,
        publisher: Arc<dyn RegistryPublisher>,
    ) -> Self {
        Self {
            config,
            request,
            root: root.into(),
            manifests,
            vcs,
            publisher,
            changelog: None,
            callback: Arc::new(NoOpCallback),
        }
    }

    /// Use a changelog writer when changelogs are enabled
    pub fn with_changelog(mut self, writer: &'a dyn ChangelogWriter) -> Self {
        self.changelog = Some(writer);
        self
    }

    /// Receive publish progress events
    pub fn with_callback(mut self, callback: Arc<dyn PublishCallback>) -> Self {
        self.callback = callback;
        self
    }

    /// Run the checks and compute the release plan
    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub fn plan(&self) -> Result<ReleasePlan> {
        validate_config(self.config)?;

        // A malformed directive fails here; a missing one only once
        // something is dirty.
        let directive = if self.config.versioning.bump {
            self.directive()?
        } else {
            None
        };

        self.run_checks()?;

        let (packages, root) = self.load_packages()?;
        let graph = DependencyGraph::build(&packages)?;
        let baseline_source = if self.config.packages.single {
            packages.first()
        } else {
            root.as_ref()
        };
        let baseline = VersionPlanner::baseline(
            self.request.master_version.as_deref(),
            baseline_source,
            &packages,
        )?;

        let dirty = if self.config.packages.single {
            ChangeDetector::forced(&graph)
        } else {
            let reference = self.config.tag_name(&baseline.to_string());
            debug!(reference = %reference, "probing changes since tag");
            let detector = ChangeDetector::new(ChangeFilter::new(&self.config.changes.ignore)?);
            detector.detect(&graph, &packages, |pkg| {
                self.vcs.changed_since(&reference, &pkg.path)
            })?
        };

        let mut version = None;
        let mut updates = Vec::new();
        if self.config.versioning.bump && !dirty.is_empty() {
            let directive = directive.ok_or(ConfigError::MissingVersionDirective)?;
            let plan = VersionPlanner::plan(&baseline, &directive)?;
            let rewriter = ManifestRewriter::new(self.config.versioning.bump_dependent_reqs);
            if let Some(root) = &root {
                updates.push(rewriter.rewrite_root(root, &dirty, &plan.version));
            }
            updates.extend(rewriter.rewrite(&packages, &dirty, &plan.version));
            version = Some(plan);
        }

        let tag = version.as_ref().map(|v| self.config.tag_name(&v.version));

        let publish = self.config.publish.enabled.then(|| {
            self.sequencer().create_plan(
                &graph,
                &packages,
                &dirty,
                version.as_ref().map(|v| v.version.as_str()),
            )
        });

        info!(
            packages = packages.len(),
            dirty = dirty.len(),
            version = version.as_ref().map(|v| v.version.as_str()).unwrap_or("-"),
            manifests = updates.len(),
            to_publish = publish.as_ref().map_or(0, |p| p.packages.len()),
            "release planned"
        );

        Ok(ReleasePlan {
            packages,
            dirty,
            version,
            updates,
            tag,
            publish,
            graph,
        })
    }

    /// Carry out a plan
    #[instrument(skip(self, plan), fields(version = plan.version().unwrap_or("-")))]
    pub fn execute(&self, plan: &ReleasePlan) -> Result<PipelineReport> {
        let mut report = PipelineReport {
            version: plan.version().map(str::to_string),
            ..Default::default()
        };

        if plan.is_noop() {
            info!("nothing changed, nothing to publish");
            return Ok(report);
        }

        for update in &plan.updates {
            self.manifests.write(&update.manifest_path, &update.manifest)?;
            report.written.push(update.manifest_path.clone());
        }
        if !plan.updates.is_empty() {
            info!(count = plan.updates.len(), "manifests written");
        }

        if let Some(version) = plan.version() {
            report.changelog = self.write_changelog(&self.config.tag_name(version), &plan.dirty)?;

            if self.config.git.commit {
                let message = self.config.commit_message(version);
                self.vcs.commit_changes(&message)?;
                if let Some(tag) = &plan.tag {
                    self.vcs.add_tag(tag, &message)?;
                    report.tag = Some(tag.clone());
                }
                self.vcs.push_with_tags()?;
                report.committed = true;
                info!(tag = ?report.tag, "committed, tagged and pushed");
            }
        }

        if let Some(publish) = &plan.publish {
            report.publish = Some(self.publish(plan, publish)?);
        }

        Ok(report)
    }

    /// Plan and execute in one go
    pub fn run(&self) -> Result<PipelineReport> {
        let plan = self.plan()?;
        self.execute(&plan)
    }

    fn directive(&self) -> Result<Option<VersionDirective>> {
        let increment = self
            .request
            .increment_by
            .as_deref()
            .or(self.config.versioning.increment_by.as_deref());
        VersionDirective::from_request(self.request.new_version.as_deref(), increment)
    }

    fn run_checks(&self) -> Result<()> {
        let checks = &self.config.checks;
        if !checks.enabled {
            debug!("repository checks disabled");
            return Ok(());
        }

        if checks.master {
            let branch = self.vcs.current_branch()?;
            if !RELEASE_BRANCHES.contains(&branch.as_str()) {
                return Err(CheckError::BranchCheckFailed { branch }.into());
            }
        }

        if checks.uncommitted {
            let diff = self.vcs.uncommitted_changes()?;
            if !diff.trim().is_empty() {
                return Err(CheckError::UncommittedCheckFailed { diff }.into());
            }
        }

        if checks.unpulled {
            let diff = self.vcs.unpulled_changes()?;
            if !diff.trim().is_empty() {
                return Err(CheckError::UnpulledCheckFailed { diff }.into());
            }
        }

        debug!("repository checks passed");
        Ok(())
    }

    /// Packages and, in monorepo mode, the root manifest
    fn load_packages(&self) -> Result<(Vec<Package>, Option<Package>)> {
        let root = self.manifests.read(&self.root)?;

        if self.config.packages.single {
            let root =
                root.ok_or_else(|| ManifestError::NotFound(self.root.join(MANIFEST_FILE)))?;
            debug!(package = %root.name, "single-package mode");
            return Ok((vec![root], None));
        }

        let packages = self.manifests.discover(
            &self.config.packages.src,
            self.config.packages.ignore_src.as_deref(),
        )?;
        if packages.is_empty() {
            warn!(pattern = %self.config.packages.src, "no packages matched");
        }
        Ok((packages, root))
    }

    fn sequencer(&self) -> PublishSequencer {
        let options = RegistryOptions::from_config(&self.config.publish, self.request.otp.clone());
        PublishSequencer::new(options)
            .with_concurrency(self.config.publish.concurrency)
            .with_publish_all(self.config.publish.publish_all)
    }

    fn write_changelog(&self, release: &str, dirty: &DirtySet) -> Result<Option<PathBuf>> {
        if !self.config.changelog.enabled {
            return Ok(None);
        }
        let Some(writer) = self.changelog else {
            warn!("changelog enabled but no writer configured");
            return Ok(None);
        };

        let path = resolve(&self.root, &self.config.changelog.file);
        writer.write(&path, release, &ChangelogEntry::from_dirty(dirty))?;
        Ok(Some(path))
    }

    fn publish(&self, plan: &ReleasePlan, publish: &PublishPlan) -> Result<PublishResult> {
        let sequencer = self.sequencer();
        if sequencer.concurrency() > 1 && publish.packages.len() > 1 {
            let runtime = tokio::runtime::Runtime::new()?;
            Ok(runtime.block_on(sequencer.execute_concurrent(
                publish,
                &plan.graph,
                self.publisher.clone(),
                self.callback.clone(),
            )))
        } else {
            Ok(sequencer.execute(publish, self.publisher.as_ref(), self.callback.as_ref()))
        }
    }
}

fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
