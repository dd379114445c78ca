#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// `coyote` with the environment it reads cleared out.
fn coyote() -> Command {
    let mut cmd = Command::cargo_bin("coyote").unwrap();
    for var in [
        "COYOTE_CONFIG",
        "COYOTE_API",
        "OWNER_MAX_POWER",
        "COYOTE_BINDING_TIMEOUT_SECS",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn write_config(dir: &TempDir, yaml: &str) -> std::path::PathBuf {
    let path = dir.path().join("coyote.yaml");
    std::fs::write(&path, yaml).unwrap();
    path
}

// ---------------------------------------------------------------------------
// coyote config
// ---------------------------------------------------------------------------

#[test]
fn config_show_prints_defaults() {
    coyote()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("owner_max_power: 50"))
        .stdout(predicate::str::contains("port: 4567"));
}

#[test]
fn config_show_applies_env_override() {
    coyote()
        .env("OWNER_MAX_POWER", "35")
        .args(["config", "show", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"owner_max_power\": 35"));
}

#[test]
fn config_show_reads_file_from_env() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "api:\n  port: 9100\n");
    coyote()
        .env("COYOTE_CONFIG", &path)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("port: 9100"));
}

#[test]
fn config_validate_accepts_defaults() {
    coyote()
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Config is valid"));
}

#[test]
fn config_validate_fails_on_errors() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "owner_max_power: 150\n");
    coyote()
        .arg("--config")
        .arg(&path)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("owner_max_power=150"))
        .stderr(predicate::str::contains("config validation found errors"));
}

#[test]
fn config_validate_reports_warnings_without_failing() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "device:\n  heartbeat_secs: 0\n");
    coyote()
        .arg("--config")
        .arg(&path)
        .args(["config", "validate", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("heartbeat_secs=0"));
}

#[test]
fn serve_refuses_invalid_owner_max() {
    coyote()
        .args(["serve", "--port", "0", "--owner-max", "150"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("owner_max_power"));
}

// ---------------------------------------------------------------------------
// coyote shock
// ---------------------------------------------------------------------------

#[test]
fn shock_prints_summary_on_success() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/shock")
        .match_body(mockito::Matcher::Json(serde_json::json!({
            "channel": "A", "amp": 80, "freq": 20, "copies": 5
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            serde_json::json!({
                "ok": true,
                "mode": "pulse",
                "channel": "A",
                "amp_requested": 80,
                "amp_effective": 50,
                "owner_max": 50,
                "freq": 20,
                "copies": 5,
                "approx_duration_ms": 500
            })
            .to_string(),
        )
        .create();
    let url = server.url();

    coyote()
        .args(["shock", "a", "80", "--api", url.as_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Pulse A: amp=50 (req 80, owner max 50) freq=20 copies=5 (~500ms)",
        ));
    mock.assert();
}

#[test]
fn shock_json_prints_raw_receipt() {
    let mut server = mockito::Server::new();
    server
        .mock("POST", "/shock")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"ok":true,"channel":"B","amp_effective":10}"#)
        .create();

    coyote()
        .env("COYOTE_API", server.url())
        .args(["shock", "B", "10", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"amp_effective\": 10"));
}

#[test]
fn shock_clamps_high_freq_with_warning() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/shock")
        .match_body(mockito::Matcher::PartialJson(serde_json::json!({"freq": 200})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"channel":"A","amp_effective":10,"freq":200}"#)
        .create();
    let url = server.url();

    coyote()
        .args(["shock", "A", "10", "300", "--api", url.as_str()])
        .assert()
        .success()
        .stderr(predicate::str::contains("clamped to 200"));
    mock.assert();
}

#[test]
fn shock_reports_api_errors() {
    let mut server = mockito::Server::new();
    server
        .mock("POST", "/shock")
        .with_status(503)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":"Device/app not bound yet (pair the device first)"}"#)
        .create();
    let url = server.url();

    coyote()
        .args(["shock", "A", "10", "--api", url.as_str()])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "API error (503): Device/app not bound yet",
        ));
}

#[test]
fn shock_rejects_bad_arguments_before_sending() {
    let mut server = mockito::Server::new();
    let mock = server.mock("POST", "/shock").expect(0).create();
    let url = server.url();

    coyote()
        .args(["shock", "C", "10", "--api", url.as_str()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("channel must be A or B"));
    coyote()
        .args(["shock", "A", "10", "-5", "--api", url.as_str()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("freq must be >= 0"));
    coyote()
        .args(["shock", "A", "10", "20", "0", "--api", url.as_str()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("copies must be 1..100"));
    mock.assert();
}
