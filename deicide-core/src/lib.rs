//! Core library for monorepo dev-workflow orchestration.

pub mod change;
pub mod error;
pub mod graph;
pub mod package;
pub mod runner;
pub mod scanner;
pub mod supervisor;

pub use change::ChangeDetector;
pub use error::{Error, Result};
pub use graph::DependencyGraph;
pub use package::Package;
pub use runner::TaskRunner;
pub use scanner::Scanner;
pub use supervisor::{OutputLine, ProcessState, Supervisor, READY_MARKER};
