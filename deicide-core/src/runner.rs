//! CI task execution across packages.

use std::process::Command;

use crate::error::{Error, Result};
use crate::package::Package;

const DEFAULT_RUN_COMMAND: &str = "npm run";

/// Runs a fixed task in each package's directory, sequentially.
///
/// Unlike dev mode there is no multiplexing: output is inherited directly
/// by the operator's terminal. The first non-zero exit aborts the whole
/// run; remaining packages never execute.
pub struct TaskRunner {
    run_command: String,
}

impl TaskRunner {
    pub fn new() -> Self {
        Self {
            run_command: DEFAULT_RUN_COMMAND.to_string(),
        }
    }

    /// Overrides the command prefix the task name is appended to.
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.run_command = command.into();
        self
    }

    /// Runs `task` in every package, stopping on the first failure.
    ///
    /// # Errors
    ///
    /// Returns `Spawn` if a process cannot be created, `TaskFailed` on the
    /// first non-zero exit.
    pub fn run(&self, packages: &[&Package], task: &str) -> Result<()> {
        for package in packages {
            tracing::debug!(package = %package.name, task, "running task");

            let status = Command::new("sh")
                .arg("-c")
                .arg(format!("{} {}", self.run_command, task))
                .current_dir(&package.location)
                .status()
                .map_err(|e| Error::Spawn {
                    package: package.name.clone(),
                    source: e,
                })?;

            if !status.success() {
                return Err(Error::TaskFailed {
                    package: package.name.clone(),
                    task: task.to_string(),
                    code: status.code(),
                });
            }
        }

        Ok(())
    }
}

impl Default for TaskRunner {
    fn default() -> Self {
        Self::new()
    }
}
