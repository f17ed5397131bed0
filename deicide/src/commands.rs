//! Command implementations for the CLI.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use deicide_core::{
    ChangeDetector, DependencyGraph, OutputLine, Package, Scanner, Supervisor, TaskRunner,
};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;

fn load_graph(root: &Path) -> Result<DependencyGraph> {
    let packages = Scanner::new(root).scan()?;
    let graph = DependencyGraph::new(packages);
    if graph.has_cycle() {
        tracing::warn!("dependency cycle detected; startup order is best-effort");
        eprintln!(
            "  {} Dependency cycle detected; ordering is best-effort",
            "WARNING:".yellow()
        );
    }
    Ok(graph)
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("Spinner template is valid"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

pub fn cmd_dev(
    root: PathBuf,
    app: String,
    command: Option<String>,
    ready_timeout: Option<u64>,
) -> Result<()> {
    let graph = load_graph(&root)?;
    let order = graph.startup_order(&app)?;
    let to_start: Vec<&Package> = order
        .iter()
        .filter_map(|name| graph.get_package(name))
        .collect();

    let mut supervisor = Supervisor::new();
    if let Some(command) = command {
        supervisor = supervisor.with_command(command);
    }
    if let Some(secs) = ready_timeout {
        supervisor = supervisor.with_ready_timeout(Duration::from_secs(secs));
    }

    let pb = spinner();
    pb.set_message(format!(
        "Starting {} packages for {}",
        to_start.len(),
        app
    ));

    let mut on_line = |line: &OutputLine| {
        let prefix = format!("[{}] ", line.package);
        if line.stderr {
            pb.println(format!("{}{}", prefix.bright_black(), line.line.bright_red()));
        } else {
            pb.println(format!("{}{}", prefix.bright_black(), line.line));
        }
    };

    for package in &to_start {
        pb.set_message(format!("Starting {}...", package.name));
        if let Err(e) = supervisor.start(package, &mut on_line) {
            pb.set_message("Tearing down...".to_string());
            supervisor.teardown();
            pb.abandon_with_message(format!("{} {}", "FAILED".red(), e));
            return Err(e.into());
        }
        pb.set_message(format!("{} started", package.name));
    }

    pb.println(format!(
        "  {} All dependencies for {} are up. Press Ctrl+C to stop.",
        "OK".green(),
        app.bold().white()
    ));
    pb.set_message("all up");

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        shutdown_flag.store(true, Ordering::SeqCst);
    })
    .map_err(|e| anyhow::anyhow!("Failed to set signal handler: {}", e))?;

    supervisor.supervise(&shutdown, &mut on_line)?;
    pb.finish_with_message("Shutdown complete");

    Ok(())
}

pub fn cmd_ci(root: PathBuf, affected: bool, task: String) -> Result<()> {
    let start = Instant::now();
    let graph = load_graph(&root)?;

    let to_run: Vec<&Package> = if affected {
        let changed = ChangeDetector::changed_files_from_status(&root)?;
        let affected_set = ChangeDetector::affected_packages(&graph, &changed, &root)?;
        if affected_set.is_empty() {
            println!("  {} No affected packages.", "OK".green());
            return Ok(());
        }
        affected_set
            .iter()
            .filter_map(|name| graph.get_package(name))
            .collect()
    } else {
        graph
            .package_names()
            .iter()
            .filter_map(|name| graph.get_package(name))
            .collect()
    };

    println!(
        "{}",
        format!("[Running {} on {} packages]", task, to_run.len())
            .bold()
            .cyan()
    );
    println!();

    let runner = TaskRunner::new();
    runner.run(&to_run, &task)?;

    let duration = start.elapsed();
    println!();
    println!("  {} CI complete", "OK".green());
    println!(
        "  {} Duration: {:.2}s",
        "TIME:".bright_black(),
        duration.as_secs_f64().to_string().bold()
    );

    Ok(())
}

pub fn cmd_graph(root: PathBuf, json: bool) -> Result<()> {
    let graph = load_graph(&root)?;
    let order = graph.topological_order();

    if json {
        println!("{}", serde_json::to_string_pretty(&order)?);
    } else {
        println!("{}", "[Dependency Graph]".bold().cyan());
        println!();

        if order.is_empty() {
            println!("  {} No packages found", "WARNING:".yellow());
        } else {
            println!(
                "  {} Topological order ({} packages):",
                "OK".green(),
                order.len().to_string().bold().cyan()
            );
            println!();
            for (idx, name) in order.iter().enumerate() {
                println!(
                    "  {} {}",
                    format!("{:2}", idx + 1).bright_black(),
                    name.bold().white()
                );
            }
        }
        println!();
    }

    Ok(())
}

pub fn cmd_affected(root: PathBuf, files: Vec<String>, git: bool) -> Result<()> {
    let graph = load_graph(&root)?;

    let changed: Vec<PathBuf> = if git {
        ChangeDetector::changed_files_from_status(&root)?
    } else if files.is_empty() {
        return Err(anyhow::anyhow!(
            "No files specified. Use --git to detect from version control or provide file paths."
        ));
    } else {
        files.iter().map(PathBuf::from).collect()
    };

    let affected = ChangeDetector::affected_packages(&graph, &changed, &root)?;

    println!("{}", "[Affected Packages]".bold().cyan());
    println!();

    if affected.is_empty() {
        println!("  {} No affected packages", "OK".green());
    } else {
        println!(
            "  {} {} {}",
            "WARNING:".yellow(),
            affected.len().to_string().bold().yellow(),
            "packages affected".bold()
        );
        println!();
        for name in affected {
            println!("  - {}", name.bold().yellow());
        }
    }
    println!();

    Ok(())
}

pub fn cmd_list(root: PathBuf, json: bool) -> Result<()> {
    let packages = Scanner::new(&root).scan()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&packages)?);
    } else {
        println!("{}", "[Workspace Packages]".bold().cyan());
        println!();

        if packages.is_empty() {
            println!("  {} No packages found", "WARNING:".yellow());
        } else {
            for pkg in packages {
                println!(
                    "  {} {}",
                    pkg.name.bold().white(),
                    format!("({})", pkg.relative_location.display()).bright_black()
                );
                if !pkg.internal_dependencies.is_empty() {
                    println!(
                        "     {} {}",
                        "deps:".bright_black(),
                        pkg.internal_dependencies.join(", ")
                    );
                }
            }
        }
        println!();
    }

    Ok(())
}
