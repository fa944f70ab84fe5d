//! Manifest rewriting for a planned version

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::BumpPolicy;

use super::changes::DirtySet;
use super::discovery::Package;
use super::manifest::PackageManifest;

/// Which dependency map a requirement lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DependencySection {
    /// `dependencies`
    Dependencies,
    /// `devDependencies`
    DevDependencies,
}

impl std::fmt::Display for DependencySection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dependencies => write!(f, "dependencies"),
            Self::DevDependencies => write!(f, "devDependencies"),
        }
    }
}

/// One rewritten requirement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementChange {
    /// Section holding the requirement
    pub section: DependencySection,
    /// Dependency name
    pub dependency: String,
    /// Requirement before
    pub from: String,
    /// Requirement after
    pub to: String,
}

/// A manifest the run will write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestUpdate {
    /// Package name
    pub name: String,
    /// Manifest to write to
    pub manifest_path: PathBuf,
    /// Full manifest after the update
    pub manifest: PackageManifest,
    /// Version before the update
    pub previous_version: String,
    /// Requirements that changed
    pub changes: Vec<RequirementChange>,
}

impl ManifestUpdate {
    /// Whether the package's own version changes
    pub fn version_changed(&self) -> bool {
        self.previous_version != self.manifest.version
    }
}

/// Rewrites versions and dependents' requirements. Pure: writing is up to
/// the manifest store.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestRewriter {
    policy: BumpPolicy,
}

impl ManifestRewriter {
    /// Create a rewriter for a bump policy
    pub fn new(policy: BumpPolicy) -> Self {
        Self { policy }
    }

    /// Updates for every package that is dirty or references a dirty
    /// package, in discovery order.
    pub fn rewrite(&self, packages: &[Package], dirty: &DirtySet, version: &str) -> Vec<ManifestUpdate> {
        let updates: Vec<ManifestUpdate> = packages
            .iter()
            .filter_map(|pkg| {
                let update = self.update_for(pkg, dirty, version, dirty.contains(&pkg.name));
                (update.version_changed() || !update.changes.is_empty()).then_some(update)
            })
            .collect();

        debug!(
            touched = updates.len(),
            policy = %self.policy,
            "manifests rewritten"
        );
        updates
    }

    /// Update for the repository root manifest. It always takes the new
    /// version.
    pub fn rewrite_root(&self, root: &Package, dirty: &DirtySet, version: &str) -> ManifestUpdate {
        self.update_for(root, dirty, version, true)
    }

    fn update_for(&self, pkg: &Package, dirty: &DirtySet, version: &str, bump: bool) -> ManifestUpdate {
        let mut changes = Vec::new();
        let dependencies = self.rewrite_section(
            &pkg.dependencies,
            DependencySection::Dependencies,
            dirty,
            version,
            &mut changes,
        );
        let dev_dependencies = self.rewrite_section(
            &pkg.dev_dependencies,
            DependencySection::DevDependencies,
            dirty,
            version,
            &mut changes,
        );

        ManifestUpdate {
            name: pkg.name.clone(),
            manifest_path: pkg.manifest_path.clone(),
            manifest: PackageManifest {
                name: pkg.name.clone(),
                version: if bump {
                    version.to_string()
                } else {
                    pkg.version.clone()
                },
                dependencies,
                dev_dependencies,
            },
            previous_version: pkg.version.clone(),
            changes,
        }
    }

    fn rewrite_section(
        &self,
        section: &BTreeMap<String, String>,
        kind: DependencySection,
        dirty: &DirtySet,
        version: &str,
        changes: &mut Vec<RequirementChange>,
    ) -> BTreeMap<String, String> {
        section
            .iter()
            .map(|(name, requirement)| {
                if !dirty.contains(name) {
                    return (name.clone(), requirement.clone());
                }
                let rewritten = self.policy.apply(requirement, version);
                if &rewritten != requirement {
                    changes.push(RequirementChange {
                        section: kind,
                        dependency: name.clone(),
                        from: requirement.clone(),
                        to: rewritten.clone(),
                    });
                }
                (name.clone(), rewritten)
            })
            .collect()
    }
}
