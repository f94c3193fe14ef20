//! Smoke tests for the `fl` binary.
//!
//! No network, no git: these only exercise argument parsing and help
//! output through the real binary.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_lists_commands() {
    Command::cargo_bin("fl")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("prs"))
        .stdout(predicate::str::contains("threads"))
        .stdout(predicate::str::contains("auth-status"));
}

#[test]
fn version_flag_works() {
    Command::cargo_bin("fl")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("fl"));
}

#[test]
fn unknown_command_fails() {
    Command::cargo_bin("fl")
        .unwrap()
        .arg("frobnicate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn comment_requires_body() {
    Command::cargo_bin("fl")
        .unwrap()
        .args(["comment", "42", "--path", "src/lib.rs", "--line", "3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--body"));
}
