//! Workspace scanner for discovering packages.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::package::Package;

#[derive(Debug, Deserialize)]
struct RootManifest {
    #[serde(default)]
    workspaces: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PackageManifest {
    name: String,
    #[serde(default)]
    dependencies: HashMap<String, String>,
    #[serde(default, rename = "devDependencies")]
    dev_dependencies: HashMap<String, String>,
}

/// Discovers workspace packages from the root `package.json`.
///
/// Registry order is the order of the workspace patterns, then sorted glob
/// expansion within each pattern. That order is what downstream first-match
/// rules key off, so it must stay stable across runs.
pub struct Scanner {
    root: PathBuf,
}

impl Scanner {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Scans the workspace and returns the package snapshot.
    ///
    /// Declared dependencies are filtered to names that resolve to other
    /// scanned packages; external libraries are dropped.
    ///
    /// # Errors
    ///
    /// Returns `WorkspaceNotFound` if the root has no `package.json` or it
    /// declares no workspaces.
    pub fn scan(&self) -> Result<Vec<Package>> {
        let manifest_path = self.root.join("package.json");
        if !manifest_path.exists() {
            return Err(Error::WorkspaceNotFound(self.root.clone()));
        }

        let content = std::fs::read_to_string(&manifest_path)?;
        let manifest: RootManifest = serde_json::from_str(&content).map_err(|e| Error::Json {
            error: e,
            context: manifest_path.display().to_string(),
        })?;

        if manifest.workspaces.is_empty() {
            return Err(Error::WorkspaceNotFound(self.root.clone()));
        }

        let mut raw = Vec::new();
        for pattern in &manifest.workspaces {
            for path in self.expand_pattern(pattern)? {
                if let Some(entry) = self.read_member(&path)? {
                    raw.push(entry);
                }
            }
        }

        let known: HashSet<String> = raw.iter().map(|(name, _, _)| name.clone()).collect();

        let packages = raw
            .into_iter()
            .map(|(name, location, declared)| {
                let relative = location
                    .strip_prefix(&self.root)
                    .map(|p| p.to_path_buf())
                    .unwrap_or_else(|_| location.clone());
                let internal = declared
                    .into_iter()
                    .filter(|dep| known.contains(dep))
                    .collect();
                Package::new(name, location, relative, internal)
            })
            .collect();

        Ok(packages)
    }

    fn expand_pattern(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let full = self.root.join(pattern);
        let matches =
            glob::glob(&full.to_string_lossy()).map_err(|e| Error::InvalidPattern {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })?;

        let mut paths: Vec<PathBuf> = matches
            .filter_map(std::result::Result::ok)
            .filter(|p| p.is_dir())
            .collect();
        paths.sort();
        Ok(paths)
    }

    fn read_member(&self, path: &Path) -> Result<Option<(String, PathBuf, Vec<String>)>> {
        let manifest_path = path.join("package.json");
        if !manifest_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&manifest_path)?;
        let manifest: PackageManifest =
            serde_json::from_str(&content).map_err(|e| Error::Json {
                error: e,
                context: manifest_path.display().to_string(),
            })?;

        let mut declared: Vec<String> = manifest
            .dependencies
            .keys()
            .chain(manifest.dev_dependencies.keys())
            .cloned()
            .collect();
        declared.sort();
        declared.dedup();

        Ok(Some((manifest.name, path.to_path_buf(), declared)))
    }
}
