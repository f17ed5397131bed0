//! Error types and result aliases.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error in {context}: {error}")]
    Json {
        error: serde_json::Error,
        context: String,
    },

    #[error("No workspace found at {0}. Expected a package.json with a 'workspaces' field.")]
    WorkspaceNotFound(PathBuf),

    #[error("Invalid workspace pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Package not found: {name}. Available packages: {available}")]
    PackageNotFound { name: String, available: String },

    #[error("Failed to spawn process for {package}: {source}")]
    Spawn {
        package: String,
        source: std::io::Error,
    },

    #[error("Task '{task}' failed for {package} (exit code {})", .code.map(|c| c.to_string()).unwrap_or_else(|| "unknown".to_string()))]
    TaskFailed {
        package: String,
        task: String,
        code: Option<i32>,
    },

    #[error("Version control error: {0}")]
    Vcs(String),
}

pub type Result<T> = std::result::Result<T, Error>;
