//! Collaborator interfaces used by the publish pipeline
//!
//! The pipeline never touches the filesystem, version control or a registry
//! directly. Each concern sits behind one of these traits so a run can be
//! driven against real implementations or per-test fakes.

use std::path::Path;

use crate::error::Result;
use crate::monorepo::{Package, PackageManifest, RegistryOptions};
use crate::workflow::ChangelogEntry;

/// Loads and persists package manifests
pub trait ManifestStore {
    /// Packages whose directories match `pattern` (relative to the
    /// repository root) and not `ignore`, in discovery order
    fn discover(&self, pattern: &str, ignore: Option<&str>) -> Result<Vec<Package>>;

    /// The package whose manifest lives in `dir`, if any
    fn read(&self, dir: &Path) -> Result<Option<Package>>;

    /// Persist one manifest
    fn write(&self, manifest_path: &Path, manifest: &PackageManifest) -> Result<()>;
}

/// Version-control operations
pub trait VersionControl {
    /// Name of the checked-out branch
    fn current_branch(&self) -> Result<String>;

    /// Description of uncommitted changes; empty when clean
    fn uncommitted_changes(&self) -> Result<String>;

    /// Commits on the upstream not yet pulled; empty when up to date
    fn unpulled_changes(&self) -> Result<String>;

    /// Files under `path` changed since `reference`, one per line. When the
    /// reference does not exist every tracked file under `path` is listed.
    fn changed_since(&self, reference: &str, path: &Path) -> Result<String>;

    /// Stage everything and commit
    fn commit_changes(&self, message: &str) -> Result<()>;

    /// Create an annotated tag at HEAD
    fn add_tag(&self, tag: &str, message: &str) -> Result<()>;

    /// Push the current branch and its tags
    fn push_with_tags(&self) -> Result<()>;
}

/// Publishes one package directory to a registry
pub trait RegistryPublisher: Send + Sync {
    /// Publish the package at `path`
    fn publish(&self, path: &Path, options: &RegistryOptions) -> Result<()>;

    /// Human-readable command for previews
    fn describe(&self, options: &RegistryOptions) -> String {
        let _ = options;
        "publish".to_string()
    }
}

/// Records a release in a changelog
pub trait ChangelogWriter {
    /// Add a section headed by `release` (the rendered release tag)
    /// listing `entries`
    fn write(&self, path: &Path, release: &str, entries: &[ChangelogEntry]) -> Result<()>;
}
