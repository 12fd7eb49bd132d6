//! CLI integration tests

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;

/// Build command for the wireloom-cli binary (finds it in target/debug when run via cargo test).
fn wireloom_cli() -> Command {
    cargo_bin_cmd!("wireloom-cli")
}

/// Path to wireloom library test fixtures (relative to workspace).
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("wireloom")
        .join("tests")
        .join("fixtures")
}

#[test]
fn test_cli_help() {
    let mut cmd = wireloom_cli();

    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("harness"));
}

#[test]
fn test_cli_build_help_lists_searched_extensions() {
    let mut cmd = wireloom_cli();

    cmd.args(["build", "--help"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("directories searched for .yml/.yaml files"));
}

#[test]
fn test_cli_version() {
    let mut cmd = wireloom_cli();

    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_build_writes_outputs() {
    let out = tempfile::tempdir().unwrap();
    let mut cmd = wireloom_cli();

    cmd.arg("build")
        .arg(fixtures_dir().join("project").join("main_A.yml"))
        .arg("-o")
        .arg(out.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Built main_A"));

    for ext in ["tsv", "gv", "json"] {
        assert!(out.path().join(format!("main_A.{}", ext)).exists());
    }
    let dot = std::fs::read_to_string(out.path().join("main_A.gv")).unwrap();
    assert!(dot.starts_with("graph \"main_A\""));
    assert!(!out.path().join("shared_bom.tsv").exists());
}

#[test]
fn test_cli_build_shared_bom_with_multipliers() {
    let out = tempfile::tempdir().unwrap();
    let project = fixtures_dir().join("project");
    let mut cmd = wireloom_cli();

    cmd.arg("build")
        .arg(project.join("main_B.yml"))
        .arg(project.join("main_A.yml"))
        .arg("-o")
        .arg(out.path())
        .arg("--shared-bom")
        .arg("--multipliers")
        .arg(project.join("multipliers.json"));

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Shared BOM: 7 entries"));

    let tsv = std::fs::read_to_string(out.path().join("shared_bom.tsv")).unwrap();
    let lines: Vec<&str> = tsv.lines().collect();
    assert_eq!(lines.len(), 8);
    assert!(lines[0].starts_with("#\tQty"));
    assert!(lines[1].starts_with("1\t14\t"));
}

#[test]
fn test_cli_bom_tsv() {
    let mut cmd = wireloom_cli();

    cmd.arg("bom")
        .arg(fixtures_dir().join("project"))
        .arg("--format")
        .arg("tsv");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Per Harness"))
        .stdout(predicate::str::contains("main_A: 2, main_B: 1"));
}

#[test]
fn test_cli_bom_json() {
    let mut cmd = wireloom_cli();

    cmd.arg("bom")
        .arg(fixtures_dir().join("striped.yml"))
        .arg("--format")
        .arg("json");

    let output = cmd.output().unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["harnesses"][0], "striped");
    assert!(value["entries"].as_array().is_some_and(|e| !e.is_empty()));
}

#[test]
fn test_cli_bom_human() {
    let mut cmd = wireloom_cli();

    cmd.arg("bom").arg(fixtures_dir().join("striped.yml"));

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Description"))
        .stdout(predicate::str::contains("Per Harness").not());
}

#[test]
fn test_cli_colors() {
    let mut cmd = wireloom_cli();

    cmd.arg("colors");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("#ff0000"))
        .stdout(predicate::str::contains("T568B"));
}

#[test]
fn test_cli_unknown_pin_label() {
    let mut cmd = wireloom_cli();

    cmd.arg("bom").arg(fixtures_dir().join("bad_label.yml"));

    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("Error"))
        .stderr(predicate::str::contains("CAN_H"));
}

#[test]
fn test_cli_nonexistent_file() {
    let mut cmd = wireloom_cli();

    cmd.arg("build").arg("does_not_exist.yml");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_cli_multipliers_require_shared_bom() {
    let project = fixtures_dir().join("project");
    let mut cmd = wireloom_cli();

    cmd.arg("build")
        .arg(project.join("main_A.yml"))
        .arg("--multipliers")
        .arg(project.join("multipliers.json"));

    cmd.assert().failure();
}
