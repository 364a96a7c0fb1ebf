//! CLI integration tests for db-scripter.
//!
//! These tests verify argument parsing, help output, the offline `pretty`
//! command and exit codes for error conditions that need no database.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

/// Get a command for the db-scripter binary.
fn cmd() -> Command {
    Command::cargo_bin("db-scripter").unwrap()
}

const BUNDLE: &str = r#"{
  "Tables": ["CREATE TABLE [dbo].[Invoices]([Id] [int] NOT NULL)\nGO\n"],
  "Functions": ["CREATE FUNCTION dbo.GetTotal() RETURNS int AS BEGIN RETURN 1 END\nGO\n"],
  "StoredProcedures": [],
  "Sequences": ["CREATE SEQUENCE [dbo].[InvoiceNumbers]\nGO\n"]
}"#;

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("extract"))
        .stdout(predicate::str::contains("pretty"))
        .stdout(predicate::str::contains("health-check"));
}

#[test]
fn test_run_subcommand_help() {
    cmd()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--database"))
        .stdout(predicate::str::contains("--output"))
        .stdout(predicate::str::contains("--local"))
        .stdout(predicate::str::contains("--access-token"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("db-scripter"));
}

#[test]
fn test_global_flag_defaults() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("[default: config.yaml]"))
        .stdout(predicate::str::contains("[default: text]"))
        .stdout(predicate::str::contains("[default: info]"))
        .stdout(predicate::str::contains("--output-json"));
}

#[test]
fn test_no_subcommand_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

// =============================================================================
// Pretty Command Tests
// =============================================================================

#[test]
fn test_pretty_writes_concatenated_scripts() {
    let dir = tempfile::tempdir().unwrap();
    let json = dir.path().join("db.json");
    std::fs::write(&json, BUNDLE).unwrap();

    cmd()
        .args(["pretty", "--input", json.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("db.json.pretty"));

    let pretty = std::fs::read_to_string(dir.path().join("db.json.pretty")).unwrap();
    assert_eq!(
        pretty,
        "CREATE TABLE [dbo].[Invoices]([Id] [int] NOT NULL)\nGO\n\
         CREATE FUNCTION dbo.GetTotal() RETURNS int AS BEGIN RETURN 1 END\nGO\n\
         CREATE SEQUENCE [dbo].[InvoiceNumbers]\nGO\n"
    );
}

#[test]
fn test_pretty_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let json = dir.path().join("db.json");
    std::fs::write(&json, BUNDLE).unwrap();
    let pretty = dir.path().join("db.json.pretty");

    cmd().args(["pretty", "-i", json.to_str().unwrap()]).assert().success();
    let first = std::fs::read(&pretty).unwrap();
    cmd().args(["pretty", "-i", json.to_str().unwrap()]).assert().success();
    let second = std::fs::read(&pretty).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_pretty_does_not_need_config() {
    let dir = tempfile::tempdir().unwrap();
    let json = dir.path().join("db.json");
    std::fs::write(&json, BUNDLE).unwrap();

    cmd()
        .args([
            "--config",
            "nonexistent_config_file.yaml",
            "pretty",
            "--input",
            json.to_str().unwrap(),
        ])
        .assert()
        .success();
}

#[test]
fn test_pretty_malformed_json_exits_with_code_4() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{{ \"Tables\": [\"CREATE").unwrap();

    cmd()
        .args(["pretty", "--input", file.path().to_str().unwrap()])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("JSON error"));
}

#[test]
fn test_pretty_missing_input_exits_with_code_7() {
    cmd()
        .args(["pretty", "--input", "nonexistent_bundle.json"])
        .assert()
        .code(7);
}

// =============================================================================
// Exit Code Tests - Config Errors
// =============================================================================

#[test]
fn test_missing_config_exits_with_code_7() {
    // Missing file is an IO error (code 7), not config error (code 1)
    cmd()
        .args(["--config", "nonexistent_config_file.yaml", "health-check"])
        .assert()
        .code(7);
}

#[test]
fn test_invalid_yaml_exits_with_code_1() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "invalid: yaml: content: [").unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "extract"])
        .assert()
        .code(1);
}

#[test]
fn test_missing_required_fields_exits_with_code_1() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "source:").unwrap();
    writeln!(file, "  is_local: true").unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "run"])
        .assert()
        .code(1);
}

#[test]
fn test_database_override_applied_before_validation() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "source:").unwrap();
    writeln!(
        file,
        "  connection_string: \"Server=tcp:127.0.0.1,1;User Id=sa;Password=x\""
    )
    .unwrap();
    writeln!(file, "  database: \"\"").unwrap();

    // Passes validation and fails later, at connect time
    cmd()
        .env_remove("DB_SCRIPTER_ACCESS_TOKEN")
        .args([
            "--config",
            file.path().to_str().unwrap(),
            "extract",
            "--database",
            "Billing",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("source.database is required").not());
}

#[test]
fn test_token_with_local_override_exits_with_code_1() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "source:").unwrap();
    writeln!(
        file,
        "  connection_string: \"Server=tcp:localhost,1433;User Id=sa;Password=x\""
    )
    .unwrap();
    writeln!(file, "  database: Billing").unwrap();
    writeln!(file, "output:").unwrap();
    writeln!(file, "  path: db.json").unwrap();

    cmd()
        .env_remove("DB_SCRIPTER_ACCESS_TOKEN")
        .args([
            "--config",
            file.path().to_str().unwrap(),
            "extract",
            "--local",
            "--access-token",
            "abc",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("access_token"));
}
