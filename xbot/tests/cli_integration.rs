//! Integration tests for the xbot command line

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const CREDENTIAL_VARS: [&str; 7] = [
    "API_KEY",
    "API_KEY_SECRET",
    "ACCESS_TOKEN",
    "ACCESS_TOKEN_SECRET",
    "BEARER_TOKEN",
    "OPENAI_API_KEY",
    "LLM_SECRET_WORD",
];

/// Helper to escape path for TOML on Windows
fn escape_path_for_toml(path: &str) -> String {
    path.replace('\\', "\\\\")
}

/// Temp dir with a config pointing every file into it
fn setup_test_env() -> (TempDir, String) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    let trusted_path = temp_dir.path().join("trusted_sources.txt");
    let log_path = temp_dir.path().join("bot.log");

    let config_content = format!(
        r#"
[trusted_sources]
path = "{}"

[logging]
file = "{}"
"#,
        escape_path_for_toml(&trusted_path.to_string_lossy()),
        escape_path_for_toml(&log_path.to_string_lossy())
    );
    fs::write(&config_path, config_content).unwrap();

    (temp_dir, config_path.to_string_lossy().to_string())
}

fn xbot(dir: &TempDir, config_path: &str) -> Command {
    let mut cmd = Command::cargo_bin("xbot").unwrap();
    cmd.current_dir(dir.path()).arg("--config").arg(config_path);
    for var in CREDENTIAL_VARS {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_help_lists_subcommands() {
    let mut cmd = Command::cargo_bin("xbot").unwrap();

    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("auto-like"))
        .stdout(predicate::str::contains("auto-retweet"))
        .stdout(predicate::str::contains("schedule"))
        .stdout(predicate::str::contains("sources"));
}

#[test]
fn test_sources_work_without_credentials() {
    let (dir, config_path) = setup_test_env();

    xbot(&dir, &config_path)
        .args(["sources", "add", "@rustlang"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added rustlang to trusted sources"));

    xbot(&dir, &config_path)
        .args(["sources", "add", "tokio_rs"])
        .assert()
        .success();

    xbot(&dir, &config_path)
        .args(["sources", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1. rustlang"))
        .stdout(predicate::str::contains("2. tokio_rs"));

    let stored = fs::read_to_string(dir.path().join("trusted_sources.txt")).unwrap();
    assert_eq!(stored.lines().collect::<Vec<_>>(), ["rustlang", "tokio_rs"]);
}

#[test]
fn test_sources_remove_by_position() {
    let (dir, config_path) = setup_test_env();
    fs::write(dir.path().join("trusted_sources.txt"), "alice\nbob\n").unwrap();

    xbot(&dir, &config_path)
        .args(["sources", "remove", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed alice from trusted sources"));

    xbot(&dir, &config_path)
        .args(["sources", "remove", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No trusted source at position 5"));

    let stored = fs::read_to_string(dir.path().join("trusted_sources.txt")).unwrap();
    assert_eq!(stored.trim(), "bob");
}

#[test]
fn test_missing_credentials_exit_code() {
    let (dir, config_path) = setup_test_env();

    xbot(&dir, &config_path)
        .args(["post", "hello"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("API_KEY"));
}

#[test]
fn test_unreadable_config_fails() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.toml");

    xbot(&dir, &missing.to_string_lossy())
        .args(["sources", "list"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to read config file"));
}
