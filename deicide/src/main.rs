mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;

#[derive(Parser)]
#[command(name = "deicide")]
#[command(about = "Monorepo dev-workflow orchestrator")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Workspace root containing the top-level package.json
    #[arg(long, default_value = ".")]
    root: PathBuf,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[arg(short, long, action)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an app and its transitive dependencies in dependency order
    Dev {
        /// App package name
        app: String,
        /// Dev task command run in each package directory
        #[arg(long)]
        command: Option<String>,
        /// Seconds to wait for the readiness marker before assuming ready
        #[arg(long)]
        ready_timeout: Option<u64>,
    },
    /// Run a task across packages, stopping on first failure
    Ci {
        /// Only run for packages affected by working-tree changes
        #[arg(long, action)]
        affected: bool,
        #[arg(long, default_value = "test")]
        task: String,
    },
    /// Show the whole-workspace topological order
    Graph {
        #[arg(long, action)]
        json: bool,
    },
    /// Show packages affected by changed files
    Affected {
        files: Vec<String>,
        /// Detect changed files from version control
        #[arg(long)]
        git: bool,
    },
    /// List workspace packages
    List {
        #[arg(long, action)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    tracing_subscriber::fmt().with_max_level(log_level).init();

    match cli.command {
        Commands::Dev {
            app,
            command,
            ready_timeout,
        } => commands::cmd_dev(cli.root, app, command, ready_timeout)?,
        Commands::Ci { affected, task } => commands::cmd_ci(cli.root, affected, task)?,
        Commands::Graph { json } => commands::cmd_graph(cli.root, json)?,
        Commands::Affected { files, git } => commands::cmd_affected(cli.root, files, git)?,
        Commands::List { json } => commands::cmd_list(cli.root, json)?,
    }

    Ok(())
}
