use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};

fn temp_path(file_name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("taskboard-{nanos}-{file_name}"))
}

fn days_ago(days: i64) -> String {
    (OffsetDateTime::now_utc() - Duration::days(days))
        .format(&Rfc3339)
        .expect("format timestamp")
}

fn write_store(path: &Path, score: u64, last_reset: &str) {
    let content = serde_json::json!({
        "schema_version": 1,
        "records": {
            "tasks": "[]",
            "productivityScore": score.to_string(),
            "lastResetDate": last_reset,
        }
    });
    std::fs::write(path, serde_json::to_string_pretty(&content).unwrap()).unwrap();
}

fn stored_records(path: &Path) -> serde_json::Value {
    let stored: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    stored["records"].clone()
}

fn run(store_path: &Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_taskboard"))
        .args(args)
        .env("TASKBOARD_STORE_PATH", store_path)
        .env("TASKBOARD_CONFIG_PATH", temp_path("absent-config.json"))
        .output()
        .expect("failed to run taskboard")
}

#[test]
fn score_command_reports_tier() {
    let store_path = temp_path("cli-score.json");
    write_store(&store_path, 6, &days_ago(2));

    let output = run(&store_path, &["score", "--json"]);
    std::fs::remove_file(&store_path).ok();

    assert!(output.status.success());
    let payload: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(payload["score"], 6);
    assert_eq!(payload["tier"], "excellent");
    assert_eq!(payload["daysUntilReset"], 4);
}

#[test]
fn score_command_plain_text_shows_message() {
    let store_path = temp_path("cli-score-plain.json");
    write_store(&store_path, 0, &days_ago(1));

    let output = run(&store_path, &["score"]);
    std::fs::remove_file(&store_path).ok();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Productivity score: 0"));
    assert!(stdout.contains("Start completing tasks"));
}

#[test]
fn stale_score_resets_on_startup_and_persists() {
    let store_path = temp_path("cli-score-stale.json");
    write_store(&store_path, 5, &days_ago(8));

    let output = run(&store_path, &["score", "--json"]);
    let records = stored_records(&store_path);
    std::fs::remove_file(&store_path).ok();

    assert!(output.status.success());
    let payload: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(payload["score"], 0);
    assert_eq!(payload["tier"], "idle");
    assert_eq!(records["productivityScore"], "0");

    let reset_at = OffsetDateTime::parse(records["lastResetDate"].as_str().unwrap(), &Rfc3339)
        .expect("lastResetDate rfc3339");
    assert!(OffsetDateTime::now_utc() - reset_at < Duration::minutes(5));
}

#[test]
fn decay_window_override_keeps_score() {
    let store_path = temp_path("cli-score-override.json");
    write_store(&store_path, 5, &days_ago(8));

    let output = run(
        &store_path,
        &["--config-override", "decay_days=30", "score", "--json"],
    );
    std::fs::remove_file(&store_path).ok();

    assert!(output.status.success());
    let payload: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(payload["score"], 5);
}

#[test]
fn invalid_override_is_rejected() {
    let store_path = temp_path("cli-score-bad-override.json");
    let output = run(&store_path, &["--config-override", "decay_days=0", "score"]);
    std::fs::remove_file(&store_path).ok();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: validation"));
}

#[test]
fn theme_override_must_name_a_known_theme() {
    let store_path = temp_path("cli-score-theme.json");
    let rejected = run(&store_path, &["--config-override", "theme=sepia", "score"]);
    let accepted = run(
        &store_path,
        &["--config-override", "Theme=Noir", "score", "--json"],
    );
    std::fs::remove_file(&store_path).ok();

    assert!(!rejected.status.success());
    let stderr = String::from_utf8_lossy(&rejected.stderr);
    assert!(stderr.contains("ERROR: validation - unknown theme 'sepia'"));

    assert!(accepted.status.success());
    let payload: serde_json::Value = serde_json::from_slice(&accepted.stdout).unwrap();
    assert_eq!(payload["score"], 0);
}

#[test]
fn tick_command_reports_unchanged_score() {
    let store_path = temp_path("cli-tick.json");
    write_store(&store_path, 3, &days_ago(1));

    let output = run(&store_path, &["tick", "--json"]);
    std::fs::remove_file(&store_path).ok();

    assert!(output.status.success());
    let payload: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(payload["reset"], false);
    assert_eq!(payload["score"], 3);
}
