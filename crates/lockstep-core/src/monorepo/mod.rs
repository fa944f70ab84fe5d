//! Monorepo release engine
//!
//! This module holds the pieces that decide what a release does:
//! - Package discovery with glob patterns
//! - Dependency graph with stable topological ordering and cycle detection
//! - Dirty-set resolution from per-package change probes
//! - Shared version planning
//! - Manifest rewriting under a bump policy
//! - Ordered publishing with halt-on-failure

pub mod changes;
pub mod discovery;
pub mod graph;
pub mod manifest;
pub mod publishing;
pub mod rewrite;
pub mod versioning;

pub use changes::{ChangeDetector, ChangeFilter, ChangeReason, DirtyPackage, DirtySet};
pub use discovery::{Package, PackageDiscovery, MANIFEST_FILE};
pub use graph::{DependencyGraph, PackageNode};
pub use manifest::{FsManifestStore, PackageManifest};
pub use publishing::{
    NoOpCallback, PackagePublishResult, PlannedPublish, PublishCallback, PublishPlan,
    PublishResult, PublishSequencer, PublishStatus, RegistryOptions,
};
pub use rewrite::{DependencySection, ManifestRewriter, ManifestUpdate, RequirementChange};
pub use versioning::{increment, VersionDirective, VersionPlan, VersionPlanner};
