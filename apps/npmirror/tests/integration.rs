//! Integration tests for the npmirror CLI

use std::path::Path;
use std::process::{Command, Output};

fn npmirror(cache: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_npmirror"))
        .args(args)
        .env("CACHE_FOLDER", cache)
        .env_remove("RUST_LOG")
        .env_remove("CRON_TIME")
        .output()
        .expect("Failed to execute npmirror")
}

#[test]
fn test_cli_version() {
    let temp = tempfile::tempdir().unwrap();
    let output = npmirror(temp.path(), &["--version"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("npmirror"));
}

#[test]
fn test_cli_help_lists_commands() {
    let temp = tempfile::tempdir().unwrap();
    let output = npmirror(temp.path(), &["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["run", "daemon", "track", "untrack", "list"] {
        assert!(stdout.contains(command), "help is missing {command}");
    }
}

#[test]
fn test_cli_invalid_command() {
    let temp = tempfile::tempdir().unwrap();
    let output = npmirror(temp.path(), &["invalid-command"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unrecognized subcommand"));
}

#[test]
fn test_track_list_untrack_json() {
    let temp = tempfile::tempdir().unwrap();
    let cache = temp.path().join("cache");

    let output = npmirror(&cache, &["--json", "track", "left-pad", "@types/node"]);
    assert!(output.status.success());
    let tracked: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(tracked["changed"].as_array().map(Vec::len), Some(2));

    let output = npmirror(&cache, &["--json", "list"]);
    assert!(output.status.success());
    let listed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = listed["tracked"]
        .as_array()
        .unwrap()
        .iter()
        .map(|record| record["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["@types/node", "left-pad"]);

    let output = npmirror(&cache, &["--json", "untrack", "left-pad", "chalk"]);
    assert!(output.status.success());
    let untracked: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(untracked["changed"][0], "left-pad");
    assert_eq!(untracked["unchanged"][0], "chalk");
}

#[test]
fn test_invalid_cron_is_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let output = npmirror(temp.path(), &["daemon", "--cron", "every morning"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("schedule.cron"));
}
