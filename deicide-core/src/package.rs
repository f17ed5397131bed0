//! Package data model.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// A workspace package: one buildable/runnable unit in the monorepo.
///
/// Packages are immutable snapshots for the duration of one command
/// invocation; the core only reads the list the scanner supplies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    /// Absolute filesystem location of the package directory.
    pub location: PathBuf,
    /// Location relative to the workspace root, used for matching changed
    /// files to packages.
    pub relative_location: PathBuf,
    /// Declared dependencies restricted to names that resolve to other
    /// workspace packages. External published libraries are excluded.
    pub internal_dependencies: SmallVec<[String; 4]>,
}

impl Package {
    pub fn new(
        name: String,
        location: PathBuf,
        relative_location: PathBuf,
        internal_dependencies: Vec<String>,
    ) -> Self {
        Self {
            name,
            location,
            relative_location,
            internal_dependencies: SmallVec::from_vec(internal_dependencies),
        }
    }
}
