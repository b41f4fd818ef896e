//! Command-line surface tests. None of these reach a network service or
//! FFmpeg: they stop before providers are built.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn reelrun(settings_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("reelrun").unwrap();
    cmd.arg("--settings-dir")
        .arg(settings_dir.path())
        .env_remove("RUST_LOG")
        .env_remove("REELRUN_LOG_DIR");
    cmd
}

// =============================================================================
// timing
// =============================================================================

#[test]
fn test_timing_prints_table_spanning_duration() {
    let dir = TempDir::new().unwrap();
    reelrun(&dir)
        .args(["timing", "--text", "Mars has two moons", "--duration", "2"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("0.000|"))
        .stdout(predicate::str::ends_with("|2.000|moons\n"))
        .stdout(predicate::str::contains("|Mars\n"));
}

#[test]
fn test_timing_rejects_zero_duration() {
    let dir = TempDir::new().unwrap();
    reelrun(&dir)
        .args(["timing", "--text", "hello", "--duration", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Audio duration must be positive"));
}

// =============================================================================
// settings
// =============================================================================

#[test]
fn test_settings_prints_defaults_as_json() {
    let dir = TempDir::new().unwrap();
    let output = reelrun(&dir).arg("settings").assert().success();
    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();

    assert_eq!(json["version"], 1);
    assert_eq!(json["cache"]["enabled"], true);
    assert_eq!(json["timeouts"]["composeSecs"], 600);
}

#[test]
fn test_settings_reset_removes_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, r#"{"cache": {"enabled": false}}"#).unwrap();

    reelrun(&dir)
        .args(["settings", "--reset"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"enabled\": true"));
    assert!(!path.exists());
}

// =============================================================================
// generate
// =============================================================================

#[test]
fn test_generate_rejects_unknown_config_keys() {
    let dir = TempDir::new().unwrap();
    reelrun(&dir)
        .args(["generate", "--config-json", r#"{"topic": "space", "colour": "red"}"#])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid reel config JSON"));
}

#[test]
fn test_generate_rejects_invalid_output_name_before_running() {
    let dir = TempDir::new().unwrap();
    let output = reelrun(&dir)
        .args(["generate", "--topic", "space", "--output-name", "../escape.mp4"])
        .assert()
        .failure()
        .get_output()
        .stdout
        .clone();

    let summary: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(summary["finalStatus"], "failed");
    assert_eq!(summary["failure"]["stage"], "setup");
    assert_eq!(summary["failure"]["kind"], "invalid_input");
    assert!(summary["outputPath"].is_null());
}

#[test]
fn test_generate_config_flags_conflict() {
    let dir = TempDir::new().unwrap();
    reelrun(&dir)
        .args(["generate", "--config-json", "{}", "--config", "reel.json"])
        .assert()
        .failure();
}

// =============================================================================
// batch
// =============================================================================

#[test]
fn test_batch_rejects_empty_array() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("batch.json");
    std::fs::write(&file, "[]").unwrap();

    reelrun(&dir)
        .arg("batch")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("contains no configs"));
}
