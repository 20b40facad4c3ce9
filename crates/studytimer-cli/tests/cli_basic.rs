//! Basic CLI E2E tests.
//!
//! Each test gets its own HOME so config and the SQLite store are isolated.

use std::path::Path;
use std::process::Command;

use serde_json::Value;

/// Run a CLI command against `home` and return (stdout, stderr, exit code).
fn run_cli(home: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_studytimer"))
        .args(args)
        .env("HOME", home)
        .env_remove("STUDYTIMER_ENV")
        .env_remove("STUDYTIMER_TOKEN")
        .env("STUDYTIMER_LOG", "off")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_ok(home: &Path, args: &[&str]) -> String {
    let (stdout, stderr, code) = run_cli(home, args);
    assert_eq!(code, 0, "CLI command failed: {args:?}\n{stderr}");
    stdout
}

/// Every JSON document printed to stdout, in order.
fn json_docs(stdout: &str) -> Vec<Value> {
    serde_json::Deserializer::from_str(stdout)
        .into_iter::<Value>()
        .collect::<Result<_, _>>()
        .expect("stdout is not a JSON stream")
}

fn day<'a>(id: &'a str, allocated: &'a str) -> Vec<&'a str> {
    vec!["--day", id, "--subject", "Chemistry", "--allocated", allocated]
}

fn timer(home: &Path, action: &str, extra: &[&str]) -> Vec<Value> {
    let mut args = vec!["timer", action];
    args.extend_from_slice(extra);
    json_docs(&run_ok(home, &args))
}

#[test]
fn test_config_defaults() {
    let home = tempfile::tempdir().unwrap();
    let out = run_ok(home.path(), &["config", "get", "api.base_url"]);
    assert_eq!(out.trim(), "http://localhost:3333");

    let list: Value = serde_json::from_str(&run_ok(home.path(), &["config", "list"])).unwrap();
    assert_eq!(list["timer"]["tick_interval_ms"], 1000);
    assert_eq!(list["storage"]["backend"], "sqlite");
}

#[test]
fn test_config_set_persists() {
    let home = tempfile::tempdir().unwrap();
    run_ok(home.path(), &["config", "set", "timer.tick_interval_ms", "250"]);
    let out = run_ok(home.path(), &["config", "get", "timer.tick_interval_ms"]);
    assert_eq!(out.trim(), "250");
}

#[test]
fn test_config_rejects_bad_values() {
    let home = tempfile::tempdir().unwrap();
    let (_, _, code) = run_cli(home.path(), &["config", "set", "timer.tick_interval_ms", "0"]);
    assert_ne!(code, 0);
    let (_, stderr, code) = run_cli(home.path(), &["config", "get", "no.such.key"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("unknown key"));
}

#[test]
fn test_status_seeds_from_study_day() {
    let home = tempfile::tempdir().unwrap();
    let mut args = day("d1", "30");
    args.extend(["--studied", "10.7"]);
    let docs = timer(home.path(), "status", &args);

    let snapshot = docs.last().unwrap();
    assert_eq!(snapshot["type"], "StateSnapshot");
    assert_eq!(snapshot["remaining_secs"], 1200);
    assert_eq!(snapshot["display"], "20:00");
    assert_eq!(snapshot["state"]["state"], "stopped");
}

#[test]
fn test_start_stop_cycle_with_banner() {
    let home = tempfile::tempdir().unwrap();
    let home = home.path();

    let docs = timer(home, "start", &day("d1", "30"));
    assert!(docs.iter().any(|d| d["type"] == "TimerStarted"));
    assert_eq!(docs.last().unwrap()["state"]["state"], "running");

    let banner = timer(home, "active", &[]);
    assert_eq!(banner[0]["session_id"], "d1");
    assert_eq!(banner[0]["subject"], "Chemistry");

    // Less than a minute elapsed: nothing is reported, so no token is needed.
    let docs = timer(home, "stop", &day("d1", "30"));
    let stopped = docs.iter().find(|d| d["type"] == "TimerStopped").unwrap();
    assert_eq!(stopped["credited_minutes"], 0);
    assert!(!docs.iter().any(|d| d["type"] == "ProgressReportFailed"));

    assert_eq!(timer(home, "active", &[]), vec![Value::Null]);
}

#[test]
fn test_second_start_conflicts_until_discarded() {
    let home = tempfile::tempdir().unwrap();
    let home = home.path();
    timer(home, "start", &day("d1", "30"));

    let mut args = vec!["timer", "start"];
    args.extend(day("d2", "45"));
    let (stdout, stderr, code) = run_cli(home, &args);
    assert_ne!(code, 0, "cancelled start must fail");
    assert!(stderr.contains("another timer is running"));
    let docs = json_docs(&stdout);
    assert!(docs.iter().any(|d| d["type"] == "ConflictDetected"));
    assert!(!docs.iter().any(|d| d["type"] == "TimerStarted"));
    assert!(!docs.iter().any(|d| d["type"] == "StateSnapshot"));
    assert_eq!(timer(home, "active", &[])[0]["session_id"], "d1");

    let mut args = day("d2", "45");
    args.extend(["--on-conflict", "discard"]);
    let docs = timer(home, "start", &args);
    assert!(docs.iter().any(|d| d["type"] == "TimerStarted"));
    assert_eq!(timer(home, "active", &[])[0]["session_id"], "d2");
}

#[test]
fn test_stop_without_running_timer_fails() {
    let home = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(
        home.path(),
        &["timer", "stop", "--day", "d9", "--allocated", "10"],
    );
    assert_ne!(code, 0);
    assert!(stderr.contains("not running"));
}

#[test]
fn test_start_with_navigate_prints_running_session() {
    let home = tempfile::tempdir().unwrap();
    let home = home.path();
    timer(home, "start", &day("d1", "30"));

    let mut args = day("d2", "45");
    args.extend(["--on-conflict", "navigate"]);
    let docs = timer(home, "start", &args);
    let banner = docs.last().unwrap();
    assert_eq!(banner["type"], "ActiveTimer");
    assert_eq!(banner["session_id"], "d1");
    assert!(!docs.iter().any(|d| d["type"] == "StateSnapshot"));
    assert!(!docs.iter().any(|d| d["type"] == "TimerStarted"));
}
