//! End-to-end CLI tests for the subgrab binary.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::Mock;
use wiremock::matchers::method;

mod support;
use support::catalog::{CatalogResponder, subtitle_body};
use support::socket_guard::start_mock_server_or_skip;

/// Command with config discovery pointed at an empty directory.
fn subgrab(config_home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("subgrab").unwrap();
    cmd.env_remove("SUBGRAB_CONFIG")
        .env_remove("RUST_LOG")
        .env("XDG_CONFIG_HOME", config_home)
        .env("HOME", config_home);
    cmd
}

fn touch(path: &Path) {
    std::fs::write(path, b"").unwrap();
}

/// Test that --help displays usage information and exits with code 0.
#[test]
fn test_binary_help_displays_usage() {
    let config_home = TempDir::new().unwrap();
    subgrab(config_home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("English subtitles"))
        .stdout(predicate::str::contains("--dry-run"));
}

/// Test that --version displays version and exits with code 0.
#[test]
fn test_binary_version_displays_version() {
    let config_home = TempDir::new().unwrap();
    subgrab(config_home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("subgrab"));
}

/// Test that invalid flags cause non-zero exit.
#[test]
fn test_binary_invalid_flag_returns_error() {
    let config_home = TempDir::new().unwrap();
    subgrab(config_home.path())
        .arg("--invalid-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_binary_without_root_dir_fails() {
    let config_home = TempDir::new().unwrap();
    subgrab(config_home.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("No video directory"));
}

#[test]
fn test_binary_missing_root_dir_fails() {
    let config_home = TempDir::new().unwrap();
    let missing = config_home.path().join("does-not-exist");
    subgrab(config_home.path())
        .arg(&missing)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to scan"));
}

#[test]
fn test_binary_empty_directory_succeeds() {
    let config_home = TempDir::new().unwrap();
    let library = TempDir::new().unwrap();
    subgrab(config_home.path())
        .arg(library.path())
        .assert()
        .success();
}

#[test]
fn test_binary_empty_directory_still_writes_status_json() {
    let config_home = TempDir::new().unwrap();
    let library = TempDir::new().unwrap();
    let status_path = config_home.path().join("status.json");

    subgrab(config_home.path())
        .arg(library.path())
        .arg("--status-json")
        .arg(&status_path)
        .assert()
        .success();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&status_path).unwrap()).unwrap();
    assert_eq!(json["status"]["total"], 0);
    assert_eq!(json["status"]["processed"], 0);
    assert_eq!(json["status"]["running"], false);
    assert!(json["videos"].as_array().unwrap().is_empty());
}

#[test]
fn test_binary_concurrent_and_sequential_conflict() {
    let config_home = TempDir::new().unwrap();
    subgrab(config_home.path())
        .args(["/videos", "--concurrent", "--sequential"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_binary_concurrency_out_of_range_rejected() {
    let config_home = TempDir::new().unwrap();
    let library = TempDir::new().unwrap();
    subgrab(config_home.path())
        .arg(library.path())
        .args(["--concurrency", "0"])
        .assert()
        .failure();
}

#[test]
fn test_binary_invalid_config_is_reported() {
    let config_home = TempDir::new().unwrap();
    let library = TempDir::new().unwrap();
    let config = config_home.path().join("bad.toml");
    std::fs::write(&config, "concurrency = 500\n").unwrap();

    subgrab(config_home.path())
        .env("SUBGRAB_CONFIG", &config)
        .arg(library.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("concurrency"));
}

#[test]
fn test_binary_dry_run_writes_status_json() {
    let config_home = TempDir::new().unwrap();
    let library = TempDir::new().unwrap();
    touch(&library.path().join("ABW-255.mp4"));
    touch(&library.path().join("SSIS-001.mkv"));
    let status_path = library.path().join("status.json");

    let config = config_home.path().join("fast.toml");
    std::fs::write(&config, "dry_run_delay_ms = 0\n").unwrap();

    subgrab(config_home.path())
        .env("SUBGRAB_CONFIG", &config)
        .arg(library.path())
        .arg("--dry-run")
        .arg("--status-json")
        .arg(&status_path)
        .assert()
        .success();

    assert!(!library.path().join("ABW-255.srt").exists());
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&status_path).unwrap()).unwrap();
    assert_eq!(json["status"]["total"], 2);
    assert_eq!(json["status"]["downloaded"], 2);
    assert_eq!(json["status"]["failed"], 0);
    assert_eq!(json["videos"].as_array().unwrap().len(), 2);
    assert_eq!(json["videos"][0]["status"], "success");
}

/// One saved subtitle plus one video without identifier exits with code 2.
#[tokio::test(flavor = "multi_thread")]
async fn test_binary_partial_batch_exits_with_code_two() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .respond_with(CatalogResponder::new())
        .mount(&mock_server)
        .await;

    let config_home = TempDir::new().unwrap();
    let library = TempDir::new().unwrap();
    touch(&library.path().join("[ABW-255].mp4"));
    touch(&library.path().join("holiday.mp4"));

    let config = config_home.path().join("subgrab.toml");
    std::fs::write(
        &config,
        format!(
            "[[providers]]\nname = \"local\"\nbase_url = \"{}\"\n",
            mock_server.uri()
        ),
    )
    .unwrap();

    let library_path = library.path().to_path_buf();
    let config_home_path = config_home.path().to_path_buf();
    let output = tokio::task::spawn_blocking(move || {
        subgrab(&config_home_path)
            .env("SUBGRAB_CONFIG", &config)
            .arg(&library_path)
            .arg("--sequential")
            .output()
            .unwrap()
    })
    .await
    .unwrap();
    assert_eq!(output.status.code(), Some(2));

    let written = std::fs::read_to_string(library.path().join("[ABW-255].srt")).unwrap();
    assert_eq!(written, subtitle_body("ABW-255"));
    assert!(!library.path().join("holiday.srt").exists());
}
