//! Change detection and dirty-set resolution

use std::collections::HashMap;

use glob::Pattern;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ConfigError, Result};

use super::discovery::Package;
use super::graph::DependencyGraph;

/// Reason why a package is considered dirty
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeReason {
    /// Direct file changes in the package
    DirectChanges,
    /// A local dependency (first one found, in discovery order) is dirty
    DependencyChanged(String),
    /// Included without consulting version control
    Forced,
}

impl std::fmt::Display for ChangeReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DirectChanges => write!(f, "direct changes"),
            Self::DependencyChanged(dep) => write!(f, "dependency '{}' changed", dep),
            Self::Forced => write!(f, "forced"),
        }
    }
}

/// A package in the dirty closure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirtyPackage {
    /// Package name
    pub name: String,
    /// Why it is dirty
    pub reason: ChangeReason,
}

/// The dirty closure, in discovery order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirtySet {
    packages: Vec<DirtyPackage>,
}

impl DirtySet {
    /// Whether a package is dirty
    pub fn contains(&self, name: &str) -> bool {
        self.packages.iter().any(|p| p.name == name)
    }

    /// Reason a package is dirty
    pub fn reason(&self, name: &str) -> Option<&ChangeReason> {
        self.packages.iter().find(|p| p.name == name).map(|p| &p.reason)
    }

    /// Number of dirty packages
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Whether nothing is dirty
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Dirty package names in discovery order
    pub fn names(&self) -> Vec<String> {
        self.packages.iter().map(|p| p.name.clone()).collect()
    }

    /// Iterate over dirty packages
    pub fn iter(&self) -> impl Iterator<Item = &DirtyPackage> {
        self.packages.iter()
    }
}

/// Filter for files that should never make a package dirty
#[derive(Debug, Clone, Default)]
pub struct ChangeFilter {
    ignore: Vec<Pattern>,
}

impl ChangeFilter {
    /// Build a filter from glob patterns
    pub fn new(patterns: &[String]) -> Result<Self> {
        let ignore = patterns
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|e| ConfigError::InvalidValue {
                    field: "changes.ignore".to_string(),
                    message: format!("invalid glob '{}': {}", p, e),
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { ignore })
    }

    /// Whether a changed file counts
    pub fn is_relevant(&self, file: &str) -> bool {
        !self.ignore.iter().any(|p| p.matches(file))
    }

    /// Whether a probe's output (one path per line) has any relevant file
    pub fn has_relevant_changes(&self, diff: &str) -> bool {
        diff.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .any(|line| self.is_relevant(line))
    }
}

/// Computes the dirty closure of a package graph
#[derive(Debug, Clone, Default)]
pub struct ChangeDetector {
    filter: ChangeFilter,
}

impl ChangeDetector {
    /// Create a detector with a change filter
    pub fn new(filter: ChangeFilter) -> Self {
        Self { filter }
    }

    /// Probe every package for direct changes, then propagate.
    ///
    /// `probe` returns the changed files of one package (empty when
    /// unchanged). It is called once per package, in discovery order.
    pub fn detect<F>(
        &self,
        graph: &DependencyGraph,
        packages: &[Package],
        mut probe: F,
    ) -> Result<DirtySet>
    where
        F: FnMut(&Package) -> Result<String>,
    {
        debug!(packages = packages.len(), "probing packages for changes");
        let mut changed: HashMap<&str, bool> = HashMap::new();
        for pkg in packages {
            let diff = probe(pkg)?;
            let relevant = self.filter.has_relevant_changes(&diff);
            debug!(package = %pkg.name, changed = relevant, "probed");
            changed.insert(pkg.name.as_str(), relevant);
        }

        let dirty = Self::resolve(graph, |name| changed.get(name).copied().unwrap_or(false));
        info!(dirty = dirty.len(), total = packages.len(), "change detection complete");
        Ok(dirty)
    }

    /// Propagate direct changes along reverse dependency edges.
    ///
    /// One pass in topological order reaches the fixpoint: when a package is
    /// visited, every one of its dependencies already has its final status.
    pub fn resolve<F>(graph: &DependencyGraph, is_changed: F) -> DirtySet
    where
        F: Fn(&str) -> bool,
    {
        let mut reasons: HashMap<&str, ChangeReason> = HashMap::new();

        for name in graph.sorted() {
            let reason = if is_changed(name) {
                Some(ChangeReason::DirectChanges)
            } else {
                graph
                    .dependencies(name)
                    .iter()
                    .find(|dep| reasons.contains_key(dep.as_str()))
                    .map(|dep| ChangeReason::DependencyChanged(dep.clone()))
            };
            if let Some(reason) = reason {
                reasons.insert(name.as_str(), reason);
            }
        }

        let packages = graph
            .nodes()
            .iter()
            .filter_map(|node| {
                reasons.remove(node.name.as_str()).map(|reason| DirtyPackage {
                    name: node.name.clone(),
                    reason,
                })
            })
            .collect();

        DirtySet { packages }
    }

    /// Mark every package dirty without probing
    pub fn forced(graph: &DependencyGraph) -> DirtySet {
        DirtySet {
            packages: graph
                .nodes()
                .iter()
                .map(|node| DirtyPackage {
                    name: node.name.clone(),
                    reason: ChangeReason::Forced,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pkg(name: &str, deps: &[&str]) -> Package {
        deps.iter().fold(
            Package::new(name, "0.8.2", format!("packages/{}", name)),
            |p, d| p.with_dependency(*d, "^0.8.2"),
        )
    }

    /// oao-d -> oao-c -> oao-b -> oao, plus an unrelated package
    fn chain() -> Vec<Package> {
        vec![
            pkg("oao", &[]),
            pkg("oao-b", &["oao"]),
            pkg("oao-c", &["oao-b"]),
            pkg("oao-d", &["oao-c"]),
            pkg("standalone", &[]),
        ]
    }

    #[test]
    fn test_deep_dependency_change_propagates() {
        let packages = chain();
        let graph = DependencyGraph::build(&packages).unwrap();
        let dirty = ChangeDetector::resolve(&graph, |name| name == "oao");

        assert_eq!(dirty.names(), vec!["oao", "oao-b", "oao-c", "oao-d"]);
        assert!(!dirty.contains("standalone"));
        assert_eq!(dirty.reason("oao"), Some(&ChangeReason::DirectChanges));
        assert_eq!(
            dirty.reason("oao-c"),
            Some(&ChangeReason::DependencyChanged("oao-b".to_string()))
        );
    }

    #[test]
    fn test_leaf_change_stays_local() {
        let packages = chain();
        let graph = DependencyGraph::build(&packages).unwrap();
        let dirty = ChangeDetector::resolve(&graph, |name| name == "oao-d");
        assert_eq!(dirty.names(), vec!["oao-d"]);
    }

    #[test]
    fn test_nothing_changed() {
        let packages = chain();
        let graph = DependencyGraph::build(&packages).unwrap();
        let dirty = ChangeDetector::resolve(&graph, |_| false);
        assert!(dirty.is_empty());
    }

    #[test]
    fn test_detect_uses_probe_and_filter() {
        let packages = chain();
        let graph = DependencyGraph::build(&packages).unwrap();
        let detector = ChangeDetector::new(ChangeFilter::new(&["*.md".to_string()]).unwrap());

        let dirty = detector
            .detect(&graph, &packages, |pkg| {
                Ok(match pkg.name.as_str() {
                    "oao-b" => "packages/oao-b/src/index.js\n".to_string(),
                    "standalone" => "packages/standalone/README.md\n".to_string(),
                    _ => String::new(),
                })
            })
            .unwrap();

        assert_eq!(dirty.names(), vec!["oao-b", "oao-c", "oao-d"]);
    }

    #[test]
    fn test_probe_error_propagates() {
        let packages = chain();
        let graph = DependencyGraph::build(&packages).unwrap();
        let result = ChangeDetector::default().detect(&graph, &packages, |_| {
            Err(crate::error::LockstepError::other("git unavailable"))
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_forced() {
        let packages = chain();
        let graph = DependencyGraph::build(&packages).unwrap();
        let dirty = ChangeDetector::forced(&graph);
        assert_eq!(dirty.len(), 5);
        assert!(dirty.iter().all(|p| p.reason == ChangeReason::Forced));
    }

    #[test]
    fn test_filter() {
        let filter = ChangeFilter::new(&["*.md".to_string(), "**/test/**".to_string()]).unwrap();
        assert!(!filter.is_relevant("packages/a/CHANGELOG.md"));
        assert!(!filter.is_relevant("packages/a/test/index.js"));
        assert!(filter.is_relevant("packages/a/src/index.js"));
        assert!(!filter.has_relevant_changes("\n  \n"));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;
        use std::collections::HashSet;

        fn graph_and_changes() -> impl Strategy<Value = (Vec<Package>, Vec<bool>)> {
            (1usize..10).prop_flat_map(|n| {
                (
                    proptest::collection::vec(proptest::collection::vec(any::<bool>(), n), n),
                    proptest::collection::vec(any::<bool>(), n),
                )
                    .prop_map(move |(matrix, changed)| {
                        let packages = (0..n)
                            .map(|i| {
                                let mut p = Package::new(format!("p{}", i), "1.0.0", format!("p{}", i));
                                for j in (i + 1)..n {
                                    if matrix[i][j] {
                                        p = p.with_dependency(format!("p{}", j), "^1.0.0");
                                    }
                                }
                                p
                            })
                            .collect();
                        (packages, changed)
                    })
            })
        }

        proptest! {
            #[test]
            fn dirty_iff_changed_or_depends_on_changed((packages, changed) in graph_and_changes()) {
                let graph = DependencyGraph::build(&packages).unwrap();
                let changed_names: HashSet<String> = packages
                    .iter()
                    .zip(&changed)
                    .filter(|(_, c)| **c)
                    .map(|(p, _)| p.name.clone())
                    .collect();

                let dirty = ChangeDetector::resolve(&graph, |name| changed_names.contains(name));

                for pkg in &packages {
                    let expected = changed_names.contains(&pkg.name)
                        || graph
                            .all_dependencies(&pkg.name)
                            .iter()
                            .any(|d| changed_names.contains(d));
                    prop_assert_eq!(dirty.contains(&pkg.name), expected);
                }
            }
        }
    }
}
