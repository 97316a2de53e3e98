//! CLI integration tests for gallon.
//!
//! These tests verify command-line argument parsing, help output,
//! exit codes for error conditions and a real file-to-file run.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use std::path::Path;

/// Get a command for the gallon binary.
fn cmd() -> Command {
    Command::cargo_bin("gallon").unwrap()
}

fn write_config(dir: &Path, input: &Path, output: &Path, extra_output: &str) -> std::path::PathBuf {
    let path = dir.join("gallon.yaml");
    let yaml = format!(
        "input:\n  path: {}\noutput:\n  path: {}\n{}fields:\n  - name: id\n    type: string\n  - name: v\n    type: int\n",
        input.display(),
        output.display(),
        extra_output
    );
    std::fs::write(&path, yaml).unwrap();
    path
}

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
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("gallon"));
}

// =============================================================================
// Global Flags Tests
// =============================================================================

#[test]
fn test_output_json_flag_exists() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--output-json"));
}

#[test]
fn test_log_format_flag_exists() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--log-format"))
        .stdout(predicate::str::contains("[default: text]"));
}

#[test]
fn test_verbosity_flag_exists() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--verbosity"))
        .stdout(predicate::str::contains("[default: info]"));
}

#[test]
fn test_config_default_path() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("[default: gallon.yaml]"));
}

#[test]
fn test_short_config_flag() {
    cmd()
        .args(["-c", "some_config.yaml", "--help"])
        .assert()
        .success();
}

#[test]
fn test_no_subcommand_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

// =============================================================================
// Exit Code Tests
// =============================================================================

#[test]
fn test_missing_config_exits_with_code_7() {
    // Missing file is an IO error (code 7), not config error (code 1)
    cmd()
        .args(["--config", "nonexistent_gallon_config.yaml", "validate"])
        .assert()
        .code(7);
}

#[test]
fn test_invalid_yaml_exits_with_code_1() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "invalid: yaml: content: [").unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "validate"])
        .assert()
        .code(1);
}

#[test]
fn test_missing_required_fields_exits_with_code_1() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "input:").unwrap();
    writeln!(file, "  path: users.jsonl").unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "validate"])
        .assert()
        .code(1);
}

#[test]
fn test_missing_input_file_exits_with_code_2() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        dir.path(),
        &dir.path().join("missing.jsonl"),
        &dir.path().join("out.jsonl"),
        "",
    );

    cmd()
        .args(["--config", config.to_str().unwrap(), "run"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("file-input"));
}

// =============================================================================
// Command Tests
// =============================================================================

#[test]
fn test_validate_command_exists() {
    cmd()
        .args(["validate", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Validate the configuration file"));
}

#[test]
fn test_validate_accepts_good_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        dir.path(),
        &dir.path().join("in.jsonl"),
        &dir.path().join("out.jsonl"),
        "",
    );

    cmd()
        .args(["--config", config.to_str().unwrap(), "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"));
}

#[test]
fn test_run_copies_records() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.jsonl");
    let output = dir.path().join("out.jsonl");
    std::fs::write(
        &input,
        "{\"id\":\"a\",\"v\":1}\n{\"id\":\"b\",\"v\":2}\n{\"id\":\"c\",\"v\":3}\n",
    )
    .unwrap();
    let config = write_config(dir.path(), &input, &output, "");

    cmd()
        .args(["--config", config.to_str().unwrap(), "--output-json", "run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"completed\""));

    let written = std::fs::read_to_string(&output).unwrap();
    assert_eq!(
        written,
        "{\"id\":\"a\",\"v\":1}\n{\"id\":\"b\",\"v\":2}\n{\"id\":\"c\",\"v\":3}\n"
    );
}

#[test]
fn test_run_skips_malformed_line() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.jsonl");
    let output = dir.path().join("out.json");
    std::fs::write(&input, "{\"id\":\"a\",\"v\":1}\nnot json\n{\"id\":\"c\",\"v\":3}\n").unwrap();
    let config = write_config(dir.path(), &input, &output, "  format: json\n");

    cmd()
        .args(["--config", config.to_str().unwrap(), "run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Skipped: 1"));

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(written.as_array().unwrap().len(), 2);
}
