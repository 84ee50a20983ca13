//! Integration tests for the `bmsdash` CLI binary.
//!
//! Argument parsing, completions and error exits run without a backend;
//! REST-backed commands run against a wiremock server.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a command for the `bmsdash` binary with env isolation.
///
/// Clears all `BMSDASH_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn bmsdash_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("bmsdash");
    cmd.env("HOME", "/tmp/bmsdash-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/bmsdash-cli-test-nonexistent")
        .env("NO_COLOR", "1")
        .env_remove("BMSDASH_PROFILE")
        .env_remove("BMSDASH_API_URL")
        .env_remove("BMSDASH_WS_URL")
        .env_remove("BMSDASH_TOKEN")
        .env_remove("BMSDASH_OUTPUT")
        .env_remove("RUST_LOG");
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = bmsdash_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_lists_commands() {
    bmsdash_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("watch")
            .and(predicate::str::contains("check-id"))
            .and(predicate::str::contains("units")),
    );
}

#[test]
fn test_version_flag() {
    bmsdash_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("bmsdash"));
}

#[test]
fn test_completions_zsh() {
    bmsdash_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_units_list_without_backend_config() {
    bmsdash_cmd()
        .args(["units", "list"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No backend configured"));
}

#[test]
fn test_unknown_protocol_is_a_usage_error() {
    let output = bmsdash_cmd()
        .args(["check-id", "1", "--protocol", "zigbee"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_watch_with_unsupported_scheme_is_fatal() {
    bmsdash_cmd()
        .args([
            "watch",
            "--api-url",
            "http://127.0.0.1:9",
            "--ws-url",
            "ftp://127.0.0.1:9/ws",
        ])
        .timeout(std::time::Duration::from_secs(20))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unsupported scheme"));
}

#[test]
fn test_check_id_for_simulator_needs_no_backend() {
    bmsdash_cmd()
        .args(["check-id", "SIM-1", "--protocol", "simulator"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no check required"));
}

// ── REST-backed commands ────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_check_id_taken_exits_with_conflict() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/hvac/config/exists"))
        .and(query_param("protocol", "BACNET"))
        .and(query_param("deviceId", "12345"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "exists": true })))
        .expect(1)
        .mount(&server)
        .await;

    bmsdash_cmd()
        .args(["check-id", "12345", "--api-url", &server.uri()])
        .assert()
        .code(6)
        .stdout(predicate::str::contains("already exists"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_check_id_available_as_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/hvac/config/exists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "exists": false })))
        .mount(&server)
        .await;

    let output = bmsdash_cmd()
        .args(["check-id", "777", "-o", "json", "--api-url", &server.uri()])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["deviceId"], "777");
    assert_eq!(value["protocol"], "BACNET");
    assert_eq!(value["status"], "available");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_units_list_plain() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/hvac/config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "deviceId": "AHU-1", "unitName": "Lobby", "protocol": "SIMULATOR", "enabled": true },
            { "id": 2, "deviceId": "12345", "unitName": "Roof", "protocol": "BACNET", "enabled": true }
        ])))
        .mount(&server)
        .await;

    bmsdash_cmd()
        .args(["units", "list", "-o", "plain", "--api-url", &server.uri()])
        .assert()
        .success()
        .stdout(predicate::str::diff("AHU-1\n12345\n"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_units_list_uses_profile_from_config_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/hvac/config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "deviceId": "AHU-1", "unitName": "Lobby", "protocol": "SIMULATOR", "enabled": true }
        ])))
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    let config_dir = home.path().join("bmsdash");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("config.toml"),
        format!(
            "default_profile = \"lab\"\n\n[profiles.lab]\napi_url = \"{}\"\n",
            server.uri()
        ),
    )
    .unwrap();

    bmsdash_cmd()
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path())
        .args(["units", "list", "-o", "plain"])
        .assert()
        .success()
        .stdout(predicate::str::diff("AHU-1\n"));

    bmsdash_cmd()
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path())
        .args(["config", "profiles"])
        .assert()
        .success()
        .stdout(predicate::str::contains("* lab"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_units_add_refuses_taken_bacnet_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/hvac/config/exists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "exists": true })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/hvac/config"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    bmsdash_cmd()
        .args([
            "units",
            "add",
            "--device-id",
            "12345",
            "--name",
            "AHU-7",
            "--protocol",
            "bacnet",
            "--api-url",
            &server.uri(),
        ])
        .assert()
        .code(6);
}
