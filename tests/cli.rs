//! End-to-end tests of the `t` binary

#![cfg(unix)]

mod common;

use assert_cmd::Command;
use common::{create_test_config, create_test_config_in_subdir, read_lines, wait_until};
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn t(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("t").unwrap();
    cmd.current_dir(dir).env("NO_COLOR", "1").env_remove("TRUN_LOG");
    cmd
}

const PROJECT: &str = r#"
vars:
  NAME: trun
tasks:
  clean:
    desc: Remove artifacts
    cmds: echo clean >> log.txt
  build:
    desc: Build everything
    deps: [clean]
    cmds: echo "build {{.NAME}}" >> log.txt
  broken:
    cmds:
      - "false"
      - echo unreachable >> log.txt
"#;

#[test]
fn test_run_task_with_dependencies() {
    let (dir, _) = create_test_config(PROJECT);

    t(dir.path())
        .arg("build")
        .assert()
        .success()
        .stderr(predicate::str::contains("Running task: build"))
        .stderr(predicate::str::contains("completed successfully"));

    assert_eq!(read_lines(dir.path(), "log.txt"), vec!["clean", "build trun"]);
}

#[test]
fn test_run_from_subdirectory_uses_config_dir() {
    let (dir, _, sub_dir) = create_test_config_in_subdir(PROJECT);

    t(&sub_dir).arg("clean").assert().success();

    assert_eq!(read_lines(dir.path(), "log.txt"), vec!["clean"]);
    assert!(!sub_dir.join("log.txt").exists());
}

#[test]
fn test_failing_task_exits_non_zero() {
    let (dir, _) = create_test_config(PROJECT);

    t(dir.path())
        .arg("broken")
        .assert()
        .failure()
        .stderr(predicate::str::contains("task 'broken' failed"));

    assert!(read_lines(dir.path(), "log.txt").is_empty());
}

#[test]
fn test_unknown_task() {
    let (dir, _) = create_test_config(PROJECT);

    t(dir.path())
        .arg("deploy")
        .assert()
        .failure()
        .stderr(predicate::str::contains("'deploy' is not defined"));
}

#[test]
fn test_unknown_tool_command() {
    let (dir, _) = create_test_config(PROJECT);

    t(dir.path())
        .arg(":frobnicate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown command ':frobnicate'"));
}

#[test]
fn test_list_tasks() {
    let (dir, _) = create_test_config(PROJECT);

    t(dir.path())
        .arg(":list")
        .assert()
        .success()
        .stdout(predicate::str::contains("build - Build everything"))
        .stdout(predicate::str::contains("(depends on: clean)"));
}

#[test]
fn test_explicit_config_file() {
    let (dir, _) = create_test_config(PROJECT);
    let elsewhere = TempDir::new().unwrap();

    t(elsewhere.path())
        .args(["-f", &dir.path().join("tasks.yaml").to_string_lossy(), "clean"])
        .assert()
        .success();

    assert_eq!(read_lines(dir.path(), "log.txt"), vec!["clean"]);
}

#[test]
fn test_quiet_suppresses_progress() {
    let (dir, _) = create_test_config(PROJECT);

    t(dir.path())
        .args(["-q", "clean"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Running task").not());
}

#[test]
fn test_parallel_reports_timing() {
    let (dir, _) = create_test_config(PROJECT);

    t(dir.path())
        .args([":parallel", "build"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Task 'build' completed in"));
}

#[test]
fn test_interactive_answers_from_stdin() {
    let (dir, _) = create_test_config(
        r#"
tasks:
  release:
    interactive:
      version:
        message: Version
        required: true
    cmds: echo "release $version" >> log.txt
"#,
    );

    t(dir.path())
        .arg("release")
        .write_stdin("2.0.0\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Version (required): "));

    assert_eq!(read_lines(dir.path(), "log.txt"), vec!["release 2.0.0"]);
}

#[test]
fn test_init_then_refuse() {
    let dir = TempDir::new().unwrap();

    t(dir.path()).arg(":init").assert().success();
    assert!(dir.path().join("tasks.yaml").is_file());

    t(dir.path())
        .arg(":init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_version() {
    let dir = TempDir::new().unwrap();

    t(dir.path())
        .arg(":version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_completions() {
    let (dir, _) = create_test_config(PROJECT);

    t(dir.path())
        .args([":completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("build"));
}

#[test]
fn test_ps_without_config() {
    let dir = TempDir::new().unwrap();

    t(dir.path())
        .arg(":ps")
        .assert()
        .success()
        .stdout(predicate::str::contains("No background tasks are running"));
}

#[test]
fn test_stop_unknown() {
    let dir = TempDir::new().unwrap();

    t(dir.path())
        .args([":stop", "nothing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No detached process found"));
}

#[test]
fn test_detach_ps_logs_stop() {
    let (dir, _) = create_test_config(
        r#"
tasks:
  server:
    cmds: echo ready; sleep 30
"#,
    );

    t(dir.path())
        .args([":detach", "server"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Started task 'server' in the background"));

    let processes = dir.path().join(".t-processes");
    assert_eq!(fs::read_dir(&processes).unwrap().count(), 1);

    t(dir.path())
        .arg(":ps")
        .assert()
        .success()
        .stdout(predicate::str::contains("server"))
        .stdout(predicate::str::contains("echo ready; sleep 30"));

    assert!(wait_until(|| {
        t(dir.path())
            .args([":logs", "server", "-n", "5"])
            .output()
            .map(|out| String::from_utf8_lossy(&out.stdout).contains("ready"))
            .unwrap_or(false)
    }));

    t(dir.path())
        .args([":stop", "server"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Stopped task 'server'"));

    t(dir.path())
        .arg(":ps")
        .assert()
        .success()
        .stdout(predicate::str::contains("No background tasks are running"));
}
