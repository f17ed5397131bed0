use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

fn create_workspace(root: &Path) {
    fs::write(
        root.join("package.json"),
        r#"{"name": "root", "workspaces": ["packages/*"]}"#,
    )
    .unwrap();

    let core = root.join("packages/core");
    fs::create_dir_all(&core).unwrap();
    fs::write(core.join("package.json"), r#"{"name": "core"}"#).unwrap();

    let web = root.join("packages/web");
    fs::create_dir_all(&web).unwrap();
    fs::write(
        web.join("package.json"),
        r#"{"name": "web", "dependencies": {"core": "*"}}"#,
    )
    .unwrap();
}

fn get_deicide_binary() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.pop();
    path.join("target").join("debug").join("deicide")
}

#[test]
#[ignore]
fn test_list_command() {
    let temp_dir = TempDir::new().unwrap();
    create_workspace(temp_dir.path());

    let output = Command::new(get_deicide_binary())
        .arg("list")
        .arg("--root")
        .arg(temp_dir.path())
        .output()
        .expect("Failed to execute deicide list");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("core"));
    assert!(stdout.contains("web"));
}

#[test]
#[ignore]
fn test_graph_command() {
    let temp_dir = TempDir::new().unwrap();
    create_workspace(temp_dir.path());

    let output = Command::new(get_deicide_binary())
        .arg("graph")
        .arg("--root")
        .arg(temp_dir.path())
        .output()
        .expect("Failed to execute deicide graph");

    assert!(output.status.success());
}

#[test]
#[ignore]
fn test_affected_command() {
    let temp_dir = TempDir::new().unwrap();
    create_workspace(temp_dir.path());

    let output = Command::new(get_deicide_binary())
        .arg("affected")
        .arg("packages/core/src/index.ts")
        .arg("--root")
        .arg(temp_dir.path())
        .output()
        .expect("Failed to execute deicide affected");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("core"));
    assert!(stdout.contains("web"));
}

#[test]
#[ignore]
fn test_dev_unknown_app_fails() {
    let temp_dir = TempDir::new().unwrap();
    create_workspace(temp_dir.path());

    let output = Command::new(get_deicide_binary())
        .arg("dev")
        .arg("nope")
        .arg("--root")
        .arg(temp_dir.path())
        .output()
        .expect("Failed to execute deicide dev");

    assert!(!output.status.success());
}
