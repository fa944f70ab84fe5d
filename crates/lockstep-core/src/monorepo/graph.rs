//! Dependency graph for monorepo packages

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GraphError, Result};

use super::discovery::Package;

/// A node in the dependency graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageNode {
    /// Package name
    pub name: String,
    /// Package version
    pub version: String,
    /// Local packages this package depends on, in discovery order
    pub dependencies: Vec<String>,
    /// Local packages that depend on this package, in discovery order
    pub dependents: Vec<String>,
    /// Depth in the dependency tree (0 = no local dependencies)
    pub depth: usize,
    /// Whether the package is private
    pub private: bool,
    /// Position in discovery order
    pub index: usize,
}

/// Dependency graph over the discovered packages.
///
/// Edges run from dependent to dependency and come from both `dependencies`
/// and `devDependencies`. References to names outside the discovered set are
/// external and ignored.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// Nodes in discovery order
    nodes: Vec<PackageNode>,
    /// Name to position in `nodes`
    index: HashMap<String, usize>,
    /// Stable topological order (dependencies before dependents)
    sorted_order: Vec<String>,
}

impl DependencyGraph {
    /// Build a dependency graph from discovered packages.
    ///
    /// Fails on duplicate names, on a package listing itself, and on any
    /// cycle among local packages.
    pub fn build(packages: &[Package]) -> Result<Self> {
        let mut index: HashMap<String, usize> = HashMap::new();
        for (i, pkg) in packages.iter().enumerate() {
            if let Some(&first) = index.get(&pkg.name) {
                return Err(GraphError::DuplicatePackage {
                    name: pkg.name.clone(),
                    first: packages[first].manifest_path.clone(),
                    second: pkg.manifest_path.clone(),
                }
                .into());
            }
            index.insert(pkg.name.clone(), i);
        }

        let mut nodes: Vec<PackageNode> = Vec::with_capacity(packages.len());
        for (i, pkg) in packages.iter().enumerate() {
            let mut deps: Vec<usize> = Vec::new();
            for dep in pkg.dependency_names() {
                if dep == pkg.name {
                    return Err(GraphError::SelfDependency(pkg.name.clone()).into());
                }
                if let Some(&j) = index.get(dep) {
                    if !deps.contains(&j) {
                        deps.push(j);
                    }
                }
            }
            deps.sort_unstable();

            nodes.push(PackageNode {
                name: pkg.name.clone(),
                version: pkg.version.clone(),
                dependencies: deps.iter().map(|&j| packages[j].name.clone()).collect(),
                dependents: Vec::new(),
                depth: 0,
                private: pkg.private,
                index: i,
            });
        }

        // Reverse edges, visited in discovery order so dependents stay sorted
        for i in 0..nodes.len() {
            let name = nodes[i].name.clone();
            let deps = nodes[i].dependencies.clone();
            for dep in deps {
                if let Some(&j) = index.get(&dep) {
                    nodes[j].dependents.push(name.clone());
                }
            }
        }

        let mut graph = Self {
            nodes,
            index,
            sorted_order: Vec::new(),
        };

        let all: Vec<String> = graph.nodes.iter().map(|n| n.name.clone()).collect();
        let sorted = graph.topological_sort(&all, false);
        if sorted.len() != graph.nodes.len() {
            let members = graph.find_cycle(&sorted);
            return Err(GraphError::Cycle { members }.into());
        }
        graph.sorted_order = sorted;

        // Depths follow topological order
        for name in graph.sorted_order.clone() {
            let i = graph.index[&name];
            let depth = graph.nodes[i]
                .dependencies
                .iter()
                .filter_map(|d| graph.index.get(d))
                .map(|&j| graph.nodes[j].depth + 1)
                .max()
                .unwrap_or(0);
            graph.nodes[i].depth = depth;
        }

        debug!(
            packages = graph.nodes.len(),
            max_depth = graph.max_depth(),
            "dependency graph built"
        );
        Ok(graph)
    }

    /// Kahn's algorithm over `subset`, always taking the ready package that
    /// was discovered first. With `transitive` set, ordering constraints that
    /// pass through packages outside the subset are honoured as well.
    fn topological_sort(&self, subset: &[String], transitive: bool) -> Vec<String> {
        let members: HashSet<usize> = subset
            .iter()
            .filter_map(|name| self.index.get(name).copied())
            .collect();

        let constraints: HashMap<usize, Vec<usize>> = members
            .iter()
            .map(|&i| {
                let deps: Vec<usize> = if transitive {
                    self.all_dependencies(&self.nodes[i].name)
                        .iter()
                        .filter_map(|d| self.index.get(d).copied())
                        .filter(|j| members.contains(j))
                        .collect()
                } else {
                    self.nodes[i]
                        .dependencies
                        .iter()
                        .filter_map(|d| self.index.get(d).copied())
                        .filter(|j| members.contains(j))
                        .collect()
                };
                (i, deps)
            })
            .collect();

        let mut in_degree: HashMap<usize, usize> = HashMap::new();
        let mut unlocks: HashMap<usize, Vec<usize>> = HashMap::new();
        for (&i, deps) in &constraints {
            in_degree.insert(i, deps.len());
            for &d in deps {
                unlocks.entry(d).or_default().push(i);
            }
        }

        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(&i, _)| Reverse(i))
            .collect();

        let mut sorted = Vec::with_capacity(members.len());
        while let Some(Reverse(i)) = ready.pop() {
            sorted.push(self.nodes[i].name.clone());
            for &next in unlocks.get(&i).map(Vec::as_slice).unwrap_or_default() {
                if let Some(degree) = in_degree.get_mut(&next) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push(Reverse(next));
                    }
                }
            }
        }

        sorted
    }

    /// Walk dependency edges among the unsorted nodes until one repeats
    fn find_cycle(&self, sorted: &[String]) -> Vec<String> {
        let done: HashSet<&str> = sorted.iter().map(String::as_str).collect();
        let Some(start) = self.nodes.iter().find(|n| !done.contains(n.name.as_str())) else {
            return Vec::new();
        };

        let mut path: Vec<usize> = vec![start.index];
        loop {
            let current = &self.nodes[path[path.len() - 1]];
            let next = current
                .dependencies
                .iter()
                .filter_map(|d| self.index.get(d).copied())
                .find(|&j| !done.contains(self.nodes[j].name.as_str()));

            let Some(next) = next else {
                return path.iter().map(|&i| self.nodes[i].name.clone()).collect();
            };

            if let Some(pos) = path.iter().position(|&i| i == next) {
                let mut members: Vec<String> =
                    path[pos..].iter().map(|&i| self.nodes[i].name.clone()).collect();
                members.push(self.nodes[next].name.clone());
                return members;
            }
            path.push(next);
        }
    }

    /// Packages in stable topological order (dependencies first)
    pub fn sorted(&self) -> &[String] {
        &self.sorted_order
    }

    /// Stable topological order of a subset of packages. Constraints carried
    /// through packages outside the subset still apply.
    pub fn order(&self, subset: &[String]) -> Vec<String> {
        self.topological_sort(subset, true)
    }

    /// Group a subset into waves: every package in a wave only depends
    /// (transitively) on subset members from earlier waves.
    pub fn waves(&self, subset: &[String]) -> Vec<Vec<String>> {
        let ordered = self.order(subset);
        let members: HashSet<&str> = ordered.iter().map(String::as_str).collect();
        let mut level: HashMap<&str, usize> = HashMap::new();
        let mut waves: Vec<Vec<String>> = Vec::new();

        for name in &ordered {
            let wave = self
                .all_dependencies(name)
                .iter()
                .filter(|d| members.contains(d.as_str()))
                .filter_map(|d| level.get(d.as_str()))
                .map(|l| l + 1)
                .max()
                .unwrap_or(0);
            level.insert(name.as_str(), wave);
            if waves.len() <= wave {
                waves.resize_with(wave + 1, Vec::new);
            }
            waves[wave].push(name.clone());
        }

        waves
    }

    /// Get a package node
    pub fn get(&self, name: &str) -> Option<&PackageNode> {
        self.index.get(name).map(|&i| &self.nodes[i])
    }

    /// Whether a name belongs to a discovered package
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Nodes in discovery order
    pub fn nodes(&self) -> &[PackageNode] {
        &self.nodes
    }

    /// Number of packages
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Direct local dependencies of a package
    pub fn dependencies(&self, name: &str) -> &[String] {
        self.get(name).map(|n| n.dependencies.as_slice()).unwrap_or_default()
    }

    /// Direct local dependents of a package
    pub fn dependents(&self, name: &str) -> &[String] {
        self.get(name).map(|n| n.dependents.as_slice()).unwrap_or_default()
    }

    /// Get all transitive dependencies of a package
    pub fn all_dependencies(&self, name: &str) -> HashSet<String> {
        self.reachable(name, |node| &node.dependencies)
    }

    fn reachable<F>(&self, name: &str, edges: F) -> HashSet<String>
    where
        F: Fn(&PackageNode) -> &Vec<String>,
    {
        let mut seen = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.push_back(name);

        while let Some(current) = queue.pop_front() {
            if let Some(node) = self.get(current) {
                for next in edges(node) {
                    if seen.insert(next.clone()) {
                        queue.push_back(next);
                    }
                }
            }
        }

        seen.remove(name);
        seen
    }

    /// Get the maximum depth of the dependency tree
    pub fn max_depth(&self) -> usize {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LockstepError;

    fn pkg(name: &str, deps: &[&str]) -> Package {
        deps.iter().fold(
            Package::new(name, "1.0.0", format!("packages/{}", name)),
            |p, d| p.with_dependency(*d, "^1.0.0"),
        )
    }

    fn create_packages() -> Vec<Package> {
        vec![
            pkg("cli", &["core", "utils"]),
            pkg("core", &[]),
            pkg("utils", &["core", "left-pad"]),
        ]
    }

    #[test]
    fn test_build_graph() {
        let graph = DependencyGraph::build(&create_packages()).unwrap();
        assert_eq!(graph.len(), 3);
        assert_eq!(graph.sorted(), &["core", "utils", "cli"]);
    }

    #[test]
    fn test_external_dependencies_ignored() {
        let graph = DependencyGraph::build(&create_packages()).unwrap();
        assert_eq!(graph.dependencies("utils"), &["core"]);
        assert!(!graph.contains("left-pad"));
    }

    #[test]
    fn test_dev_dependencies_are_edges() {
        let packages = vec![
            Package::new("a", "1.0.0", "a").with_dev_dependency("b", "^1.0.0"),
            Package::new("b", "1.0.0", "b"),
        ];
        let graph = DependencyGraph::build(&packages).unwrap();
        assert_eq!(graph.sorted(), &["b", "a"]);
    }

    #[test]
    fn test_unrelated_packages_keep_discovery_order() {
        let packages = vec![pkg("z", &[]), pkg("m", &[]), pkg("a", &[])];
        let graph = DependencyGraph::build(&packages).unwrap();
        assert_eq!(graph.sorted(), &["z", "m", "a"]);
    }

    #[test]
    fn test_dependents() {
        let graph = DependencyGraph::build(&create_packages()).unwrap();
        assert_eq!(graph.dependents("core"), &["cli", "utils"]);
        assert_eq!(graph.dependents("utils"), &["cli"]);
        assert!(graph.dependents("cli").is_empty());
    }

    #[test]
    fn test_depth_calculation() {
        let graph = DependencyGraph::build(&create_packages()).unwrap();

        assert_eq!(graph.get("core").unwrap().depth, 0);
        assert_eq!(graph.get("utils").unwrap().depth, 1);
        assert_eq!(graph.get("cli").unwrap().depth, 2);
        assert_eq!(graph.max_depth(), 2);
    }

    #[test]
    fn test_cycle_detection() {
        let packages = vec![pkg("a", &["b"]), pkg("b", &["c"]), pkg("c", &["a"])];

        let err = DependencyGraph::build(&packages).unwrap_err();
        assert_eq!(err.code(), "DEPENDENCY_CYCLE");
        match err {
            LockstepError::Graph(GraphError::Cycle { members }) => {
                assert_eq!(members, vec!["a", "b", "c", "a"]);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_cycle_behind_acyclic_prefix() {
        let packages = vec![pkg("top", &["x"]), pkg("x", &["y"]), pkg("y", &["x"])];
        let err = DependencyGraph::build(&packages).unwrap_err();
        match err {
            LockstepError::Graph(GraphError::Cycle { members }) => {
                assert_eq!(members, vec!["x", "y", "x"]);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_self_dependency_rejected() {
        let packages = vec![pkg("a", &["a"])];
        let err = DependencyGraph::build(&packages).unwrap_err();
        assert_eq!(err.code(), "SELF_DEPENDENCY");
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let packages = vec![
            Package::new("a", "1.0.0", "one"),
            Package::new("a", "1.0.0", "two"),
        ];
        let err = DependencyGraph::build(&packages).unwrap_err();
        assert_eq!(err.code(), "DUPLICATE_PACKAGE");
    }

    #[test]
    fn test_order_of_subset_uses_discovery_order_for_ties() {
        // a depends on c; b is unrelated. Discovery order decides a before b.
        let packages = vec![pkg("a", &["c"]), pkg("b", &[]), pkg("c", &[])];
        let graph = DependencyGraph::build(&packages).unwrap();
        assert_eq!(graph.sorted(), &["b", "c", "a"]);
        assert_eq!(graph.order(&["a".into(), "b".into()]), vec!["a", "b"]);
    }

    #[test]
    fn test_order_keeps_transitive_constraints() {
        // top -> mid -> base, with mid left out of the subset
        let packages = vec![pkg("top", &["mid"]), pkg("mid", &["base"]), pkg("base", &[])];
        let graph = DependencyGraph::build(&packages).unwrap();
        assert_eq!(
            graph.order(&["top".into(), "base".into()]),
            vec!["base", "top"]
        );
    }

    #[test]
    fn test_waves() {
        let packages = vec![
            pkg("app", &["lib-a", "lib-b"]),
            pkg("lib-a", &["base"]),
            pkg("lib-b", &["base"]),
            pkg("base", &[]),
            pkg("tool", &[]),
        ];
        let graph = DependencyGraph::build(&packages).unwrap();
        let all: Vec<String> = graph.sorted().to_vec();
        let waves = graph.waves(&all);
        assert_eq!(waves.len(), 3);
        assert_eq!(waves[0], vec!["base", "tool"]);
        assert_eq!(waves[1], vec!["lib-a", "lib-b"]);
        assert_eq!(waves[2], vec!["app"]);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        /// Random DAG: package i may only depend on packages with a larger
        /// index, then the list is shuffled by reversing.
        fn dag_strategy() -> impl Strategy<Value = Vec<Package>> {
            (1usize..10).prop_flat_map(|n| {
                proptest::collection::vec(proptest::collection::vec(any::<bool>(), n), n).prop_map(
                    move |matrix| {
                        (0..n)
                            .map(|i| {
                                let mut p = Package::new(format!("p{}", i), "1.0.0", format!("p{}", i));
                                for j in (i + 1)..n {
                                    if matrix[i][j] {
                                        p = p.with_dependency(format!("p{}", j), "^1.0.0");
                                    }
                                }
                                p
                            })
                            .collect()
                    },
                )
            })
        }

        proptest! {
            #[test]
            fn sorted_respects_every_edge(packages in dag_strategy()) {
                let graph = DependencyGraph::build(&packages).unwrap();
                let position: HashMap<&str, usize> = graph
                    .sorted()
                    .iter()
                    .enumerate()
                    .map(|(i, n)| (n.as_str(), i))
                    .collect();
                prop_assert_eq!(position.len(), packages.len());
                for node in graph.nodes() {
                    for dep in &node.dependencies {
                        prop_assert!(position[dep.as_str()] < position[node.name.as_str()]);
                    }
                }
            }

            #[test]
            fn waves_never_pair_related_packages(packages in dag_strategy()) {
                let graph = DependencyGraph::build(&packages).unwrap();
                let all = graph.sorted().to_vec();
                for wave in graph.waves(&all) {
                    for a in &wave {
                        let deps = graph.all_dependencies(a);
                        for b in &wave {
                            prop_assert!(!deps.contains(b));
                        }
                    }
                }
            }
        }
    }
}
