//! Basic CLI E2E tests.
//!
//! Each test runs the binary against its own data directory.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

fn hourglass(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("hourglass").expect("binary exists");
    cmd.env("HOURGLASS_DATA_DIR", dir.path())
        .env_remove("HOURGLASS_LOG")
        .env_remove("RUST_LOG");
    cmd
}

fn run_json(dir: &TempDir, args: &[&str]) -> Value {
    let output = hourglass(dir).args(args).output().expect("run hourglass");
    assert!(
        output.status.success(),
        "{args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("JSON on stdout")
}

#[test]
fn cli_displays_help() {
    let dir = TempDir::new().unwrap();
    hourglass(&dir).arg("--help").assert().success();
}

#[test]
fn project_create_and_list() {
    let dir = TempDir::new().unwrap();
    let created = run_json(&dir, &["project", "create", "Deep Work", "--color", "#3B82F6"]);
    assert_eq!(created["name"], "Deep Work");

    let projects = run_json(&dir, &["project", "list", "--json"]);
    assert_eq!(projects.as_array().unwrap().len(), 1);
    assert_eq!(projects[0]["id"], created["id"]);

    hourglass(&dir)
        .args(["project", "create", "deep work"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn project_archive_hides_from_default_list() {
    let dir = TempDir::new().unwrap();
    run_json(&dir, &["project", "create", "Admin"]);
    let archived = run_json(&dir, &["project", "archive", "admin"]);
    assert_eq!(archived["archived"], true);

    let visible = run_json(&dir, &["project", "list", "--json"]);
    assert!(visible.as_array().unwrap().is_empty());
    let all = run_json(&dir, &["project", "list", "--all", "--json"]);
    assert_eq!(all.as_array().unwrap().len(), 1);
}

#[test]
fn entry_add_and_list() {
    let dir = TempDir::new().unwrap();
    run_json(&dir, &["project", "create", "Deep Work"]);

    let entry = run_json(
        &dir,
        &[
            "entry", "add", "--project", "Deep Work", "--duration", "1h30m", "--date",
            "2024-06-01", "--notes", "Wrote the report", "--tag", "focus",
        ],
    );
    assert_eq!(entry["duration_secs"], 5400);
    assert_eq!(entry["source"], "manual");
    assert_eq!(entry["notion_sync_status"], "pending");

    let listed = run_json(&dir, &["entry", "list", "--json", "--from", "2024-06-01"]);
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["project_names"][0], "Deep Work");
    assert_eq!(listed[0]["tags"][0], "focus");

    hourglass(&dir)
        .args(["entry", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("01:30:00"));
}

#[test]
fn entry_add_from_start_and_end() {
    let dir = TempDir::new().unwrap();
    run_json(&dir, &["project", "create", "Meetings"]);

    let entry = run_json(
        &dir,
        &[
            "entry", "add", "-p", "meetings", "--date", "2024-06-01", "--start",
            "2024-06-01T09:00:00Z", "--end", "2024-06-01T09:45:00Z",
        ],
    );
    assert_eq!(entry["duration_secs"], 2700);
}

#[test]
fn entry_edit_and_delete() {
    let dir = TempDir::new().unwrap();
    run_json(&dir, &["project", "create", "Deep Work"]);
    let entry = run_json(
        &dir,
        &["entry", "add", "-p", "Deep Work", "-d", "30m", "--notes", "draft"],
    );
    let id = entry["id"].as_str().unwrap();

    let edited = run_json(&dir, &["entry", "edit", id, "-d", "45m", "--clear-notes"]);
    assert_eq!(edited["duration_secs"], 2700);
    assert_eq!(edited["notes"], Value::Null);

    hourglass(&dir).args(["entry", "delete", id]).assert().success();
    hourglass(&dir)
        .args(["entry", "show", id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn entry_requires_existing_project() {
    let dir = TempDir::new().unwrap();
    hourglass(&dir)
        .args(["entry", "add", "--project", "Nope", "--duration", "10m"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::starts_with("error:"));
}

#[test]
fn entry_rejects_zero_duration() {
    let dir = TempDir::new().unwrap();
    run_json(&dir, &["project", "create", "Admin"]);
    hourglass(&dir)
        .args(["entry", "add", "-p", "Admin", "-d", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("greater than zero"));
}

#[test]
fn entry_rejects_oversized_duration() {
    let dir = TempDir::new().unwrap();
    run_json(&dir, &["project", "create", "Admin"]);
    hourglass(&dir)
        .args(["entry", "add", "-p", "Admin", "-d", "9000000h"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("must be at most"));

    let entries = run_json(&dir, &["entry", "list", "--json"]);
    assert!(entries.as_array().unwrap().is_empty());
}

#[test]
fn timer_stop_records_entry() {
    let dir = TempDir::new().unwrap();
    run_json(&dir, &["project", "create", "Deep Work"]);

    let started = run_json(&dir, &["timer", "start"]);
    assert_eq!(started["type"], "TimerStarted");
    let status = run_json(&dir, &["timer", "status"]);
    assert_eq!(status["state"], "running");

    std::thread::sleep(std::time::Duration::from_millis(1200));

    let stopped = run_json(&dir, &["timer", "stop", "--project", "Deep Work"]);
    assert_eq!(stopped["event"]["type"], "TimerStopped");
    assert_eq!(stopped["entry"]["source"], "timer");
    assert!(stopped["entry"]["duration_secs"].as_u64().unwrap() >= 1);

    let status = run_json(&dir, &["timer", "status"]);
    assert_eq!(status["state"], "idle");
}

#[test]
fn timer_stop_when_idle_records_nothing() {
    let dir = TempDir::new().unwrap();
    run_json(&dir, &["project", "create", "Deep Work"]);

    hourglass(&dir)
        .args(["timer", "stop", "-p", "Deep Work"])
        .assert()
        .success()
        .stderr(predicate::str::contains("nothing recorded"));

    let entries = run_json(&dir, &["entry", "list", "--json"]);
    assert!(entries.as_array().unwrap().is_empty());
}

#[test]
fn timer_pause_twice_is_a_noop() {
    let dir = TempDir::new().unwrap();
    run_json(&dir, &["timer", "start"]);
    let paused = run_json(&dir, &["timer", "pause"]);
    assert_eq!(paused["type"], "TimerPaused");
    let again = run_json(&dir, &["timer", "pause"]);
    assert_eq!(again["type"], "StateSnapshot");
    assert_eq!(again["state"], "paused");

    let reset = run_json(&dir, &["timer", "reset"]);
    assert_eq!(reset["type"], "TimerReset");
}

#[test]
fn sync_status_without_integrations() {
    let dir = TempDir::new().unwrap();
    let status = run_json(&dir, &["sync", "status"]);
    assert_eq!(status["notion"]["configured"], false);
    assert_eq!(status["sheets"]["counts"]["pending"], 0);

    hourglass(&dir)
        .args(["sync", "notion"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Notion is not configured"));

    let all = run_json(&dir, &["sync", "all"]);
    assert_eq!(all["sheets"], "not configured");
}

#[test]
fn settings_mask_secrets() {
    let dir = TempDir::new().unwrap();
    hourglass(&dir)
        .args(["settings", "set", "notion_token", "secret_abcdefgh1234"])
        .assert()
        .success();
    hourglass(&dir)
        .args(["settings", "set", "notion_auto_sync", "false"])
        .assert()
        .success();

    let token = run_json(&dir, &["settings", "get", "notion_token"]);
    assert_eq!(token, "********1234");
    let all = run_json(&dir, &["settings", "list"]);
    assert_eq!(all["notion_auto_sync"], false);

    hourglass(&dir)
        .args(["settings", "set", "notion_colour", "x"])
        .assert()
        .success()
        .stderr(predicate::str::contains("not a recognised setting"));

    hourglass(&dir).args(["settings", "unset", "notion_token"]).assert().success();
    hourglass(&dir)
        .args(["settings", "get", "notion_token"])
        .assert()
        .failure();
}
