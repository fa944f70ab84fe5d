//! lockstep core - lockstep versioning and publishing for monorepos
//!
//! This crate provides the data model, error handling, configuration, the
//! release engine (graph, dirty set, version planning, manifest rewriting,
//! publish ordering) and the pipeline that drives it through collaborator
//! traits.

pub mod config;
pub mod error;
pub mod monorepo;
pub mod traits;
pub mod types;
pub mod workflow;

pub use config::Config;
pub use error::{LockstepError, Result};
pub use monorepo::{
    DependencyGraph, DirtySet, FsManifestStore, Package, PackageManifest, PublishStatus,
    RegistryOptions,
};
pub use traits::{ChangelogWriter, ManifestStore, RegistryPublisher, VersionControl};
pub use types::{Access, BumpPolicy, IncrementKind};
pub use workflow::{
    MarkdownChangelog, PipelineReport, PublishPipeline, PublishRequest, ReleasePlan,
};
