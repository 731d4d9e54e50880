//! Binary smoke tests.

use assert_cmd::Command;
use tempfile::TempDir;

const SOURCE: &str = "3f2b8c9e-1d4a-4e6b-9c1f-7a2d5e8b0c3a";
const TARGET: &str = "9a8b7c6d-5e4f-4a3b-8c2d-1e0f9a8b7c6d";

/// The binary with config and credentials isolated in `dir`.
fn cms_sync(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("cms-sync").unwrap();
    cmd.env("CMS_SYNC_CONFIG", dir.path().join("config.json"))
        .env_remove("CMS_SYNC_TOKEN")
        .env_remove("CMS_SYNC_ROOT")
        .env_remove("CMS_SYNC_API_URL")
        .env_remove("CMS_SYNC_LEGACY_FOLDERS")
        .env_remove("CMS_SYNC_SOURCE")
        .env_remove("CMS_SYNC_TARGET")
        .env_remove("RUST_LOG");
    cmd
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_version_json() {
    let dir = TempDir::new().unwrap();
    let output = cms_sync(&dir).args(["version", "--json"]).output().unwrap();
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert!(json["config_file"].is_null());
}

#[test]
fn test_status_on_empty_root() {
    let dir = TempDir::new().unwrap();
    let output = cms_sync(&dir)
        .args(["status", "--source", SOURCE, "--json", "--root"])
        .arg(dir.path().join("store"))
        .output()
        .unwrap();
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["exists"], false);
    assert_eq!(json["locale"], "en-us");
    assert_eq!(json["kinds"].as_array().unwrap().len(), 7);
}

#[test]
fn test_invalid_kind_rejected() {
    let dir = TempDir::new().unwrap();
    let output = cms_sync(&dir)
        .args(["pull", "--source", SOURCE, "--kinds", "widgets", "--json"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    let err: serde_json::Value = serde_json::from_slice(&output.stderr).unwrap();
    assert_eq!(err["error"]["code"], "INVALID_KIND");
}

#[test]
fn test_invalid_instance_rejected() {
    let dir = TempDir::new().unwrap();
    let output = cms_sync(&dir)
        .args(["status", "--source", "not-a-guid", "--json"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
}

#[test]
fn test_missing_token_is_config_error() {
    let dir = TempDir::new().unwrap();
    let output = cms_sync(&dir)
        .args(["pull", "--source", SOURCE, "--json", "--root"])
        .arg(dir.path().join("store"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(7));
}

#[test]
fn test_push_without_snapshot_fails_before_any_call() {
    let dir = TempDir::new().unwrap();
    let output = cms_sync(&dir)
        .env("CMS_SYNC_TOKEN", "token")
        .env("CMS_SYNC_API_URL", "http://127.0.0.1:9")
        .args(["push", "--source", SOURCE, "--target", TARGET, "--json", "--root"])
        .arg(dir.path().join("store"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let err: serde_json::Value = serde_json::from_slice(&output.stderr).unwrap();
    assert_eq!(err["error"]["code"], "STORE_NOT_FOUND");
}
