//! The `tourney` admin binary.

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use std::path::Path;
use tempfile::TempDir;

const KEY: &str = "00112233445566778899aabbccddeeff00112233445566778899aabbccddeeff";

fn tourney(db: &Path) -> Command {
    let mut cmd = Command::cargo_bin("tourney").unwrap();
    cmd.arg("--db").arg(db).env_remove("ENCRYPTION_KEY");
    cmd
}

#[test]
fn test_suite_lifecycle() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("tourney.db");

    tourney(&db)
        .args(["suite", "create", "math", "--select"])
        .assert()
        .success();
    tourney(&db)
        .args(["suite", "current"])
        .assert()
        .success()
        .stdout(contains("math"));
    tourney(&db)
        .args(["suite", "rename", "math", "algebra"])
        .assert()
        .success();
    tourney(&db)
        .args(["--json", "suite", "list"])
        .assert()
        .success()
        .stdout(contains("\"count\":2"))
        .stdout(contains("algebra"));
    tourney(&db)
        .args(["suite", "delete", "algebra"])
        .assert()
        .success();
    tourney(&db)
        .args(["suite", "current"])
        .assert()
        .success()
        .stdout(contains("default"));
}

#[test]
fn test_errors_use_exit_codes() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("tourney.db");

    tourney(&db)
        .args(["--json", "suite", "select", "ghost"])
        .assert()
        .code(3)
        .stderr(contains("SUITE_NOT_FOUND"));
    tourney(&db)
        .args(["suite", "create", "default"])
        .assert()
        .code(5);
    tourney(&db)
        .args(["suite", "delete", "default"])
        .assert()
        .code(4);
}

#[test]
fn test_settings() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("tourney.db");

    tourney(&db)
        .args(["setting", "set", "cost_alert_threshold_usd", "5.00"])
        .assert()
        .success();
    tourney(&db)
        .args(["setting", "get", "cost_alert_threshold_usd"])
        .assert()
        .success()
        .stdout(contains("5.00"));
    tourney(&db)
        .args(["setting", "set", "api_key_openai", "plain"])
        .assert()
        .code(4);
}

#[test]
fn test_keys_need_secret_and_stay_masked() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("tourney.db");

    tourney(&db)
        .args(["key", "set", "openai", "sk-test-secret-1234"])
        .assert()
        .code(6);

    tourney(&db)
        .env("ENCRYPTION_KEY", KEY)
        .args(["key", "set", "openai", "sk-test-secret-1234"])
        .assert()
        .success();
    tourney(&db)
        .env("ENCRYPTION_KEY", KEY)
        .args(["key", "list"])
        .assert()
        .success()
        .stdout(contains("sk-...1234"))
        .stdout(contains("secret").not());
    tourney(&db)
        .env("ENCRYPTION_KEY", KEY)
        .args(["key", "get", "openai", "--reveal"])
        .assert()
        .success()
        .stdout(contains("sk-test-secret-1234"));
}

#[test]
fn test_generate_key_is_hex() {
    let output = Command::cargo_bin("tourney")
        .unwrap()
        .args(["key", "generate"])
        .output()
        .unwrap();
    assert!(output.status.success());
    // stdout is a pipe here, so the CLI answers in JSON.
    let payload: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let key = payload["encryption_key"].as_str().unwrap();
    assert_eq!(key.len(), 64);
    assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn test_stats() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("tourney.db");

    tourney(&db)
        .args(["--json", "stats"])
        .assert()
        .success()
        .stdout(contains("\"suite\":\"default\""))
        .stdout(contains("\"total\":0"));
    tourney(&db)
        .args(["stats", "--suite", "nope"])
        .assert()
        .code(3);
}
