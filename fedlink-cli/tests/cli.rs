//! Smoke tests for the fedlink binary.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_help_lists_setup_subcommand() {
    Command::cargo_bin("fedlink")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("setup"));
}

#[test]
fn test_setup_requires_all_arguments() {
    Command::cargo_bin("fedlink")
        .unwrap()
        .args(["setup", "--app-name", "ci-app"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--subscription-id"));
}

#[test]
fn test_mock_setup_provisions_end_to_end() {
    // Runs the full flow against the in-memory clients, including the
    // 10 second settle wait before confirmation.
    Command::cargo_bin("fedlink")
        .unwrap()
        .args([
            "setup",
            "--app-name",
            "ci-app",
            "--subscription-id",
            "sub-123",
            "--resource-group",
            "rg-1",
            "--repo",
            "org/repo",
            "--mock",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Federation setup complete"));
}
