use std::path::Path;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use deicide_core::error::Error;
use deicide_core::package::Package;
use deicide_core::supervisor::{OutputLine, ProcessState, Supervisor};

fn pkg(name: &str, location: &Path) -> Package {
    Package::new(name.to_string(), location.to_path_buf(), name.into(), vec![])
}

fn drop_line(_: &OutputLine) {}

#[test]
fn test_ready_on_marker() {
    let temp_dir = TempDir::new().unwrap();
    let package = pkg("server", temp_dir.path());

    let mut supervisor = Supervisor::new()
        .with_command("echo ready && sleep 30")
        .with_ready_timeout(Duration::from_secs(10));

    let start = Instant::now();
    supervisor.start(&package, &mut drop_line).unwrap();

    // The marker resolves the wait long before the timeout would.
    assert!(start.elapsed() < Duration::from_secs(5));
    assert_eq!(supervisor.state("server"), Some(ProcessState::Ready));

    supervisor.teardown();
    assert_eq!(supervisor.state("server"), Some(ProcessState::Terminated));
}

#[test]
fn test_timeout_is_optimistic_success() {
    let temp_dir = TempDir::new().unwrap();
    let a = pkg("silent-a", temp_dir.path());
    let b = pkg("silent-b", temp_dir.path());

    let mut supervisor = Supervisor::new()
        .with_command("sleep 30")
        .with_ready_timeout(Duration::from_millis(300));

    supervisor.start_all(&[&a, &b], &mut drop_line).unwrap();

    assert_eq!(supervisor.state("silent-a"), Some(ProcessState::Ready));
    assert_eq!(supervisor.state("silent-b"), Some(ProcessState::Ready));

    supervisor.teardown();
    assert_eq!(supervisor.state("silent-a"), Some(ProcessState::Terminated));
    assert_eq!(supervisor.state("silent-b"), Some(ProcessState::Terminated));
}

#[test]
fn test_marker_on_stderr_does_not_count() {
    let temp_dir = TempDir::new().unwrap();
    let package = pkg("noisy", temp_dir.path());

    let mut supervisor = Supervisor::new()
        .with_command("echo ready 1>&2 && sleep 30")
        .with_ready_timeout(Duration::from_millis(500));

    let start = Instant::now();
    supervisor.start(&package, &mut drop_line).unwrap();

    // Readiness came from the timeout, not the stderr line.
    assert!(start.elapsed() >= Duration::from_millis(400));
    assert_eq!(supervisor.state("noisy"), Some(ProcessState::Ready));
}

#[test]
fn test_spawn_failure_tears_down_started_processes() {
    let temp_dir = TempDir::new().unwrap();
    let good = pkg("good", temp_dir.path());
    let bad = pkg("bad", &temp_dir.path().join("does-not-exist"));

    let mut supervisor = Supervisor::new()
        .with_command("echo ready && sleep 30")
        .with_ready_timeout(Duration::from_secs(10));

    let err = supervisor.start_all(&[&good, &bad], &mut drop_line).unwrap_err();
    assert!(matches!(err, Error::Spawn { ref package, .. } if package == "bad"));

    assert_eq!(supervisor.state("good"), Some(ProcessState::Terminated));
    assert_eq!(supervisor.state("bad"), Some(ProcessState::Failed));
}

#[test]
fn test_output_is_tagged_and_forwarded() {
    let temp_dir = TempDir::new().unwrap();
    let package = pkg("logger", temp_dir.path());

    let mut supervisor = Supervisor::new()
        .with_command("echo hello && echo oops 1>&2 && echo ready && sleep 30")
        .with_ready_timeout(Duration::from_secs(10));

    let mut lines: Vec<(String, String, bool)> = Vec::new();
    supervisor
        .start(&package, &mut |line: &OutputLine| {
            lines.push((line.package.clone(), line.line.clone(), line.stderr));
        })
        .unwrap();

    assert!(lines
        .iter()
        .any(|(pkg, line, stderr)| pkg == "logger" && line == "hello" && !stderr));
    assert!(lines
        .iter()
        .any(|(pkg, line, stderr)| pkg == "logger" && line == "oops" && *stderr));
}

#[test]
fn test_supervise_stops_on_shutdown_flag() {
    use std::sync::atomic::{AtomicBool, Ordering};

    let temp_dir = TempDir::new().unwrap();
    let package = pkg("server", temp_dir.path());

    let mut supervisor = Supervisor::new()
        .with_command("echo ready && sleep 30")
        .with_ready_timeout(Duration::from_secs(10));
    supervisor.start(&package, &mut drop_line).unwrap();

    let shutdown = AtomicBool::new(true);
    shutdown.store(true, Ordering::SeqCst);
    supervisor.supervise(&shutdown, &mut drop_line).unwrap();

    assert_eq!(supervisor.state("server"), Some(ProcessState::Terminated));
}
