//! Binary tests for the offline `tl` commands

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// `tl` with config, data and log dirs inside `home`
fn tl(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tl").expect("binary builds");
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("XDG_DATA_HOME", home.path().join("data"))
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_parse_duration_prints_minutes() {
    let home = TempDir::new().unwrap();
    tl(&home)
        .args(["parse", "duration", "1h 30m"])
        .assert()
        .success()
        .stdout("90\n");
}

#[test]
fn test_parse_duration_rejects_bad_minutes() {
    let home = TempDir::new().unwrap();
    tl(&home)
        .args(["parse", "duration", "1:75"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Minutes must be below 60"));
}

#[test]
fn test_parse_timezone() {
    let home = TempDir::new().unwrap();
    tl(&home)
        .args(["parse", "timezone", "Europe/Berlin"])
        .assert()
        .success()
        .stdout("Europe/Berlin\n");

    tl(&home)
        .args(["parse", "timezone", "Mars/Phobos"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown timezone 'Mars/Phobos'"));
}

#[test]
fn test_parse_location_normalizes() {
    let home = TempDir::new().unwrap();
    tl(&home)
        .args(["parse", "location", "Zoom call"])
        .assert()
        .success()
        .stdout("Zoom\n");
}

#[test]
fn test_parse_started_at_uses_timezone_flag() {
    let home = TempDir::new().unwrap();
    tl(&home)
        .args(["parse", "started_at", "2025-01-15 09:30", "--timezone", "UTC"])
        .assert()
        .success()
        .stdout("2025-01-15T09:30:00+00:00\n");

    tl(&home)
        .args(["parse", "started_at", "2025-01-15 09:30"])
        .assert()
        .success()
        .stdout("2025-01-15T09:30:00-08:00\n");
}

#[test]
fn test_parse_uses_configured_default_timezone() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("timelog.yml");
    std::fs::write(&config, "flow:\n  default-timezone: Asia/Tokyo\n").unwrap();

    tl(&home)
        .arg("--config")
        .arg(&config)
        .args(["parse", "started_at", "2025-01-15 09:30"])
        .assert()
        .success()
        .stdout("2025-01-15T09:30:00+09:00\n");
}

#[test]
fn test_parse_comments_decline() {
    let home = TempDir::new().unwrap();
    tl(&home)
        .args(["parse", "comments", "none"])
        .assert()
        .success()
        .stdout("(none)\n");
}

#[test]
fn test_unknown_field_is_usage_error() {
    let home = TempDir::new().unwrap();
    tl(&home)
        .args(["parse", "billable", "yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("billable"));
}
