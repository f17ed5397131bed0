//! Dependency graph: startup ordering and dependent propagation.

use std::collections::{HashMap, HashSet};

use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::error::{Error, Result};
use crate::package::Package;

/// Directed graph of package dependencies.
///
/// Cycles in the source data are tolerated: traversal carries a visited-set
/// guard and always terminates, producing some linear order consistent with
/// a cycle-breaking choice. Dependency names that do not resolve to a
/// workspace package are ignored during construction.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    graph: DiGraph<String, ()>,
    node_map: HashMap<String, NodeIndex>,
    packages: HashMap<String, Package>,
    /// Package names in registry declaration order.
    names: Vec<String>,
    /// Forward edges filtered to known names, in declaration order.
    deps: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Builds a graph from the registry snapshot.
    ///
    /// An edge `A -> B` means A depends on B. Dangling dependency names
    /// (declared deps outside the workspace) are excluded from traversal.
    pub fn new(packages: Vec<Package>) -> Self {
        let mut graph = DiGraph::new();
        let mut node_map = HashMap::new();
        let mut names = Vec::with_capacity(packages.len());

        for package in &packages {
            let node = graph.add_node(package.name.clone());
            node_map.insert(package.name.clone(), node);
            names.push(package.name.clone());
        }

        let mut deps: HashMap<String, Vec<String>> = HashMap::new();
        for package in &packages {
            let from = node_map[&package.name];
            let mut known = Vec::new();
            for dep_name in &package.internal_dependencies {
                match node_map.get(dep_name) {
                    Some(to) => {
                        graph.add_edge(from, *to, ());
                        known.push(dep_name.clone());
                    }
                    None => {
                        tracing::debug!(
                            package = %package.name,
                            dependency = %dep_name,
                            "ignoring dependency outside the workspace"
                        );
                    }
                }
            }
            deps.insert(package.name.clone(), known);
        }

        let packages = packages.into_iter().map(|p| (p.name.clone(), p)).collect();

        Self {
            graph,
            node_map,
            packages,
            names,
            deps,
        }
    }

    /// Retrieves a package by name.
    #[inline]
    pub fn get_package(&self, name: &str) -> Option<&Package> {
        self.packages.get(name)
    }

    /// Package names in registry declaration order.
    #[inline]
    pub fn package_names(&self) -> &[String] {
        &self.names
    }

    /// Returns true if the declared dependencies contain a cycle.
    ///
    /// Cycles are not an error anywhere in the core; this probe only backs
    /// an operator-facing diagnostic.
    pub fn has_cycle(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }

    /// Returns the startup order for `target`: every reachable dependency
    /// before any package that depends on it, target last.
    ///
    /// Packages with no transitive relationship to the target are excluded.
    /// On a cyclic input the traversal still terminates and lists each
    /// reachable package exactly once, but the dependencies-first guarantee
    /// holds only for packages off the cycle.
    ///
    /// # Errors
    ///
    /// Returns `PackageNotFound` if the target is not in the registry.
    pub fn startup_order(&self, target: &str) -> Result<Vec<String>> {
        if !self.node_map.contains_key(target) {
            return Err(self.not_found(target));
        }

        let mut order = Vec::new();
        let mut visited = HashSet::new();
        self.post_order_into(target, &mut visited, &mut order);
        Ok(order)
    }

    /// Whole-workspace topological order: the startup traversal seeded from
    /// every package in registry order, with a shared visited set.
    pub fn topological_order(&self) -> Vec<String> {
        let mut order = Vec::with_capacity(self.names.len());
        let mut visited = HashSet::new();
        for name in &self.names {
            self.post_order_into(name, &mut visited, &mut order);
        }
        order
    }

    /// Post-order DFS over declared dependencies, driven by an explicit work
    /// stack so pathological graphs cannot exhaust the call stack.
    fn post_order_into(
        &self,
        start: &str,
        visited: &mut HashSet<String>,
        order: &mut Vec<String>,
    ) {
        let mut stack = vec![(start.to_string(), false)];

        while let Some((name, children_done)) = stack.pop() {
            if children_done {
                order.push(name);
                continue;
            }
            if !visited.insert(name.clone()) {
                continue;
            }
            // Re-push the node behind its dependencies: it is appended only
            // after all of them have been fully visited.
            stack.push((name.clone(), true));
            if let Some(deps) = self.deps.get(&name) {
                for dep in deps.iter().rev() {
                    if !visited.contains(dep) {
                        stack.push((dep.clone(), false));
                    }
                }
            }
        }
    }

    /// Returns direct dependents of a package (packages that depend on it).
    ///
    /// # Errors
    ///
    /// Returns `PackageNotFound` if the package is not in the graph.
    pub fn dependents(&self, package_name: &str) -> Result<Vec<String>> {
        let node = self
            .node_map
            .get(package_name)
            .ok_or_else(|| self.not_found(package_name))?;

        let dependents: Vec<String> = self
            .graph
            .neighbors_directed(*node, Direction::Incoming)
            .map(|idx| self.graph[idx].clone())
            .collect();

        Ok(dependents)
    }

    /// Returns all transitive dependents of a package, excluding the
    /// package itself.
    ///
    /// # Errors
    ///
    /// Returns `PackageNotFound` if the package is not in the graph.
    pub fn all_dependents(&self, package_name: &str) -> Result<HashSet<String>> {
        let mut result = HashSet::new();
        let mut stack = vec![package_name.to_string()];

        while let Some(current) = stack.pop() {
            if !result.insert(current.clone()) {
                continue;
            }
            for dep in self.dependents(&current)? {
                if !result.contains(&dep) {
                    stack.push(dep);
                }
            }
        }

        result.remove(package_name);
        Ok(result)
    }

    fn not_found(&self, name: &str) -> Error {
        Error::PackageNotFound {
            name: name.to_string(),
            available: self.names.join(", "),
        }
    }
}
