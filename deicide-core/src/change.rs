//! Change detection for determining affected packages.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{Error, Result};
use crate::graph::DependencyGraph;

/// Maps changed files to the set of packages impacted by them.
pub struct ChangeDetector;

impl ChangeDetector {
    /// Returns the packages whose source was directly touched by any of the
    /// changed files, plus every transitive dependent of those packages.
    ///
    /// A changed file belongs to the first package in registry order whose
    /// relative location is a path prefix of it. Paths may be workspace-root
    /// relative or absolute; absolute paths outside the root are ignored.
    /// The result iterates in a deterministic (sorted) order.
    pub fn affected_packages(
        graph: &DependencyGraph,
        changed_files: &[impl AsRef<Path>],
        root: impl AsRef<Path>,
    ) -> Result<BTreeSet<String>> {
        let root = root.as_ref();
        let mut affected = BTreeSet::new();

        for file_path in changed_files {
            let path = file_path.as_ref();
            let relative = if path.is_absolute() {
                match path.strip_prefix(root) {
                    Ok(p) => p,
                    Err(_) => continue,
                }
            } else {
                path
            };

            if let Some(name) = Self::file_to_package(graph, relative) {
                if affected.insert(name.clone()) {
                    affected.extend(graph.all_dependents(&name)?);
                }
            }
        }

        Ok(affected)
    }

    /// First registry-order package containing the path. When one package's
    /// location is a prefix of another's, declaration order decides the
    /// match, not path specificity.
    fn file_to_package(graph: &DependencyGraph, relative: &Path) -> Option<String> {
        graph
            .package_names()
            .iter()
            .find(|name| {
                graph
                    .get_package(name.as_str())
                    .is_some_and(|pkg| relative.starts_with(&pkg.relative_location))
            })
            .cloned()
    }

    /// Queries version control for the changed files in the working tree.
    pub fn changed_files_from_status(root: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let output = Command::new("git")
            .arg("status")
            .arg("--porcelain")
            .current_dir(root.as_ref())
            .output()
            .map_err(|e| Error::Vcs(format!("Failed to run git status: {}", e)))?;

        if !output.status.success() {
            return Err(Error::Vcs(format!(
                "git status failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let files: Vec<PathBuf> = stdout
            .lines()
            .filter_map(|line| line.split_whitespace().last())
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .collect();

        Ok(files)
    }
}
