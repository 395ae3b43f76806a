//! Integration tests for the CLI interface.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_flag_shows_usage() {
    let mut cmd = Command::cargo_bin("octopoid").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("Commands:"));
}

#[test]
fn invalid_command_fails() {
    let mut cmd = Command::cargo_bin("octopoid").unwrap();
    cmd.arg("not-a-real-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn init_then_flow_list_shows_both_builtin_flows() {
    let dir = tempfile::tempdir().unwrap();

    Command::cargo_bin("octopoid")
        .unwrap()
        .arg("--path")
        .arg(dir.path())
        .arg("init")
        .assert()
        .success();

    Command::cargo_bin("octopoid")
        .unwrap()
        .arg("--path")
        .arg(dir.path())
        .arg("flow")
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("default"))
        .stdout(predicate::str::contains("project"));
}

#[test]
fn flow_validate_accepts_the_generated_default_flow() {
    let dir = tempfile::tempdir().unwrap();

    Command::cargo_bin("octopoid")
        .unwrap()
        .arg("--path")
        .arg(dir.path())
        .arg("init")
        .assert()
        .success();

    Command::cargo_bin("octopoid")
        .unwrap()
        .arg("--path")
        .arg(dir.path())
        .arg("flow")
        .arg("validate")
        .arg("default")
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid"));
}
