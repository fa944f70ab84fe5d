//! Package discovery in monorepos

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use glob::{glob, Pattern};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ManifestError, Result};

/// Manifest file name looked for in every package directory
pub const MANIFEST_FILE: &str = "package.json";

/// A package discovered in the repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    /// Package name, unique across the discovered set
    pub name: String,
    /// Version recorded in the manifest
    pub version: String,
    /// Runtime dependencies (name -> requirement)
    pub dependencies: BTreeMap<String, String>,
    /// Development dependencies (name -> requirement)
    pub dev_dependencies: BTreeMap<String, String>,
    /// Never published when set
    pub private: bool,
    /// Path to the package directory
    pub path: PathBuf,
    /// Path to the manifest file
    pub manifest_path: PathBuf,
}

impl Package {
    /// Create a package with no dependencies, located at `path`
    pub fn new(name: impl Into<String>, version: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: name.into(),
            version: version.into(),
            dependencies: BTreeMap::new(),
            dev_dependencies: BTreeMap::new(),
            private: false,
            manifest_path: path.join(MANIFEST_FILE),
            path,
        }
    }

    /// Add a runtime dependency
    pub fn with_dependency(mut self, name: impl Into<String>, requirement: impl Into<String>) -> Self {
        self.dependencies.insert(name.into(), requirement.into());
        self
    }

    /// Add a development dependency
    pub fn with_dev_dependency(
        mut self,
        name: impl Into<String>,
        requirement: impl Into<String>,
    ) -> Self {
        self.dev_dependencies.insert(name.into(), requirement.into());
        self
    }

    /// Mark the package private
    pub fn with_private(mut self, private: bool) -> Self {
        self.private = private;
        self
    }

    /// Names referenced from either dependency map, runtime first
    pub fn dependency_names(&self) -> impl Iterator<Item = &str> {
        self.dependencies
            .keys()
            .chain(self.dev_dependencies.keys())
            .map(String::as_str)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawManifest {
    name: Option<String>,
    version: Option<String>,
    #[serde(default)]
    private: bool,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
    #[serde(default)]
    dev_dependencies: BTreeMap<String, String>,
}

/// Parse the manifest inside `dir`. Returns `None` when there is no manifest
/// or it carries no name.
pub fn read_package(dir: &Path) -> Result<Option<Package>> {
    let manifest_path = dir.join(MANIFEST_FILE);
    if !manifest_path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(&manifest_path)?;
    let raw: RawManifest =
        serde_json::from_str(&content).map_err(|e| ManifestError::ParseError {
            path: manifest_path.clone(),
            reason: e.to_string(),
        })?;

    let Some(name) = raw.name else {
        warn!(path = %manifest_path.display(), "manifest has no name, skipping");
        return Ok(None);
    };

    let version = raw.version.unwrap_or_else(|| {
        debug!(package = %name, "manifest has no version, assuming 0.0.0");
        "0.0.0".to_string()
    });

    Ok(Some(Package {
        name,
        version,
        dependencies: raw.dependencies,
        dev_dependencies: raw.dev_dependencies,
        private: raw.private,
        path: dir.to_path_buf(),
        manifest_path,
    }))
}

/// Glob-based package discovery rooted at the repository root
pub struct PackageDiscovery {
    root: PathBuf,
}

impl PackageDiscovery {
    /// Create a discovery instance for a repository root
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Discover every package whose directory matches `pattern` and not
    /// `ignore`. Packages come back in path order, which is the discovery
    /// order used for every tie-break downstream.
    pub fn discover(&self, pattern: &str, ignore: Option<&str>) -> Result<Vec<Package>> {
        debug!(root = %self.root.display(), pattern, ?ignore, "discovering packages");

        let full_pattern = self.root.join(pattern).to_string_lossy().to_string();
        let ignore = ignore
            .map(|p| {
                Pattern::new(p).map_err(|e| ManifestError::InvalidPattern {
                    pattern: p.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        let entries = glob(&full_pattern).map_err(|e| ManifestError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        let mut dirs = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| ManifestError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?;
            let dir = if path.is_dir() {
                path
            } else if path.file_name().is_some_and(|f| f == MANIFEST_FILE) {
                match path.parent() {
                    Some(parent) => parent.to_path_buf(),
                    None => continue,
                }
            } else {
                continue;
            };

            if let Some(ignore) = &ignore {
                let relative = dir.strip_prefix(&self.root).unwrap_or(&dir);
                if ignore.matches_path(relative) {
                    debug!(dir = %relative.display(), "ignored by pattern");
                    continue;
                }
            }
            dirs.push(dir);
        }
        dirs.sort();
        dirs.dedup();

        let mut packages = Vec::new();
        for dir in dirs {
            if let Some(pkg) = read_package(&dir)? {
                debug!(package = %pkg.name, version = %pkg.version, "found package");
                packages.push(pkg);
            }
        }

        info!(count = packages.len(), "discovered packages");
        Ok(packages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_manifest(dir: &Path, json: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join(MANIFEST_FILE), json).unwrap();
    }

    fn create_repo() -> TempDir {
        let temp = TempDir::new().unwrap();
        write_manifest(temp.path(), r#"{"name": "root", "version": "0.8.2", "private": true}"#);
        write_manifest(
            &temp.path().join("packages/b"),
            r#"{"name": "b", "version": "0.8.2", "dependencies": {"a": "^0.8.2", "timm": "1.x"}}"#,
        );
        write_manifest(
            &temp.path().join("packages/a"),
            r#"{"name": "a", "version": "0.8.2", "devDependencies": {"xxl": "1.x"}}"#,
        );
        write_manifest(
            &temp.path().join("packages/internal"),
            r#"{"name": "internal", "version": "0.8.2", "private": true}"#,
        );
        std::fs::create_dir_all(temp.path().join("packages/empty")).unwrap();
        temp
    }

    #[test]
    fn test_discover_in_path_order() {
        let temp = create_repo();
        let packages = PackageDiscovery::new(temp.path())
            .discover("packages/*", None)
            .unwrap();

        let names: Vec<_> = packages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "internal"]);
    }

    #[test]
    fn test_discover_reads_fields() {
        let temp = create_repo();
        let packages = PackageDiscovery::new(temp.path())
            .discover("packages/*", None)
            .unwrap();

        let b = packages.iter().find(|p| p.name == "b").unwrap();
        assert_eq!(b.dependencies.get("a").map(String::as_str), Some("^0.8.2"));
        assert_eq!(b.manifest_path, temp.path().join("packages/b/package.json"));

        let a = packages.iter().find(|p| p.name == "a").unwrap();
        assert_eq!(a.dev_dependencies.get("xxl").map(String::as_str), Some("1.x"));

        let internal = packages.iter().find(|p| p.name == "internal").unwrap();
        assert!(internal.private);
    }

    #[test]
    fn test_discover_with_ignore() {
        let temp = create_repo();
        let packages = PackageDiscovery::new(temp.path())
            .discover("packages/*", Some("packages/int*"))
            .unwrap();

        assert!(packages.iter().all(|p| p.name != "internal"));
        assert_eq!(packages.len(), 2);
    }

    #[test]
    fn test_root_package() {
        let temp = create_repo();
        let root = read_package(temp.path()).unwrap().unwrap();
        assert_eq!(root.name, "root");
        assert!(root.private);
    }

    #[test]
    fn test_invalid_manifest_is_an_error() {
        let temp = TempDir::new().unwrap();
        write_manifest(&temp.path().join("packages/bad"), "{ not json");
        let result = PackageDiscovery::new(temp.path()).discover("packages/*", None);
        assert!(result.is_err());
    }

    #[test]
    fn test_dependency_names() {
        let pkg = Package::new("c", "1.0.0", "packages/c")
            .with_dependency("a", "^1.0.0")
            .with_dev_dependency("b", "~1.0.0");
        let names: Vec<_> = pkg.dependency_names().collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
