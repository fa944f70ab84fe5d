//! Manifest persistence

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::error::{ManifestError, Result};
use crate::traits::ManifestStore;

use super::discovery::{read_package, Package, PackageDiscovery};

/// The fields of a manifest the release process owns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageManifest {
    /// Package name
    pub name: String,
    /// Version to record
    pub version: String,
    /// Runtime dependencies (name -> requirement)
    pub dependencies: BTreeMap<String, String>,
    /// Development dependencies (name -> requirement)
    pub dev_dependencies: BTreeMap<String, String>,
}

impl From<&Package> for PackageManifest {
    fn from(pkg: &Package) -> Self {
        Self {
            name: pkg.name.clone(),
            version: pkg.version.clone(),
            dependencies: pkg.dependencies.clone(),
            dev_dependencies: pkg.dev_dependencies.clone(),
        }
    }
}

/// Filesystem-backed manifest store for `package.json` files
pub struct FsManifestStore {
    root: PathBuf,
}

impl FsManifestStore {
    /// Create a store rooted at the repository root
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ManifestStore for FsManifestStore {
    fn discover(&self, pattern: &str, ignore: Option<&str>) -> Result<Vec<Package>> {
        PackageDiscovery::new(&self.root).discover(pattern, ignore)
    }

    fn read(&self, dir: &Path) -> Result<Option<Package>> {
        read_package(dir)
    }

    /// Patch version and dependency requirements in place, leaving every
    /// other key and the key order untouched.
    #[instrument(skip(self, manifest), fields(package = %manifest.name))]
    fn write(&self, manifest_path: &Path, manifest: &PackageManifest) -> Result<()> {
        let content = std::fs::read_to_string(manifest_path)
            .map_err(|_| ManifestError::NotFound(manifest_path.to_path_buf()))?;
        let mut raw: Map<String, Value> =
            serde_json::from_str(&content).map_err(|e| ManifestError::ParseError {
                path: manifest_path.to_path_buf(),
                reason: e.to_string(),
            })?;

        raw.insert("version".to_string(), Value::String(manifest.version.clone()));
        patch_section(&mut raw, "dependencies", &manifest.dependencies);
        patch_section(&mut raw, "devDependencies", &manifest.dev_dependencies);

        let mut rendered =
            serde_json::to_string_pretty(&raw).map_err(|e| ManifestError::WriteError {
                path: manifest_path.to_path_buf(),
                reason: e.to_string(),
            })?;
        rendered.push('\n');

        std::fs::write(manifest_path, rendered).map_err(|e| ManifestError::WriteError {
            path: manifest_path.to_path_buf(),
            reason: e.to_string(),
        })?;

        debug!(path = %manifest_path.display(), version = %manifest.version, "manifest written");
        Ok(())
    }
}

fn patch_section(raw: &mut Map<String, Value>, key: &str, entries: &BTreeMap<String, String>) {
    match raw.get_mut(key) {
        Some(Value::Object(section)) => {
            for (name, requirement) in entries {
                section.insert(name.clone(), Value::String(requirement.clone()));
            }
        }
        _ if !entries.is_empty() => {
            let section = entries
                .iter()
                .map(|(name, req)| (name.clone(), Value::String(req.clone())))
                .collect();
            raw.insert(key.to_string(), Value::Object(section));
        }
        _ => {}
    }
}
