mod support;

use predicates::prelude::*;
use std::fs;

use support::{
    assert_timestamp_log_names, cache_file, command_with_home, demo_fixture,
    new_command_with_temp_home, write_cache, write_settings,
};

const CACHED_ENTRY: &str = r#"{
  "app-checkout:cfg-release": {
    "value": [
      {"EnvName": "development", "EnvState": "ReadyForDeployment", "Flags": {"dark_mode": {"enabled": true}}, "Err": null},
      {"EnvName": "production", "EnvState": "ReadyForDeployment", "Flags": {}, "Err": "throttled"}
    ],
    "expires": "2001-01-01T00:00:00Z"
  }
}"#;

#[test]
fn root_help_lists_subcommands_and_global_flags() {
    let (mut command, _temp_home) = new_command_with_temp_home();
    command
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: lazyflags"))
        .stdout(predicate::str::contains("--diagnostics"))
        .stdout(predicate::str::contains("--fixture <PATH>"))
        .stdout(predicate::str::contains("doctor"))
        .stdout(predicate::str::contains("cache"));
}

#[test]
fn cache_help_lists_show_and_clear() {
    let (mut command, _temp_home) = new_command_with_temp_home();
    command
        .args(["cache", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("List cache entries"))
        .stdout(predicate::str::contains("Delete the cache file"));
}

#[test]
fn browser_is_gated_without_configuration_source() {
    let (mut command, _temp_home) = new_command_with_temp_home();
    command
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: "))
        .stderr(predicate::str::contains(
            "no configuration source configured",
        ));
}

#[test]
fn browser_reports_unreadable_fixture_before_terminal_setup() {
    let (mut command, temp_home) = new_command_with_temp_home();
    command
        .arg("--fixture")
        .arg(temp_home.path().join("missing.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to open fixture source"))
        .stderr(predicate::str::contains("missing.toml"));
}

#[test]
fn browser_reports_invalid_settings() {
    let (mut command, temp_home) = new_command_with_temp_home();
    write_settings(temp_home.path(), "version = 7\n");
    command
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load settings"));
}

#[test]
fn doctor_runs_without_settings() {
    let (mut command, _temp_home) = new_command_with_temp_home();
    command
        .arg("doctor")
        .assert()
        .success()
        .stdout(predicate::str::contains("settings path resolves"))
        .stdout(predicate::str::contains(".config/lazyflags/config.toml"))
        .stdout(predicate::str::contains("no settings file, using defaults"))
        .stdout(predicate::str::contains("FAIL"))
        .stdout(predicate::str::contains("1 failed"));
}

#[test]
fn doctor_loads_fixture_from_settings() {
    let (mut command, temp_home) = new_command_with_temp_home();
    write_settings(
        temp_home.path(),
        &format!(
            "version = 1\n\n[source]\nfixture = {:?}\n",
            demo_fixture().display().to_string()
        ),
    );

    command
        .arg("doctor")
        .assert()
        .success()
        .stdout(predicate::str::contains("with 2 applications"))
        .stdout(predicate::str::contains("0 failed"));
}

#[test]
fn doctor_flags_corrupt_cache() {
    let (mut command, temp_home) = new_command_with_temp_home();
    write_cache(temp_home.path(), "{not json");

    command
        .args(["doctor", "--fixture"])
        .arg(demo_fixture())
        .assert()
        .success()
        .stdout(predicate::str::contains("cache is corrupt"));
}

#[test]
fn cache_show_without_file_reports_no_entries() {
    let (mut command, _temp_home) = new_command_with_temp_home();
    command
        .args(["cache", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("LazyFlags/.cache"))
        .stdout(predicate::str::contains("No cache entries."));
}

#[test]
fn cache_show_lists_entries_with_expiry() {
    let (mut command, temp_home) = new_command_with_temp_home();
    write_cache(temp_home.path(), CACHED_ENTRY);

    command
        .args(["cache", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("app-checkout:cfg-release"))
        .stdout(predicate::str::contains("2001-01-01T00:00:00Z"))
        .stdout(predicate::str::contains("expired"));
}

#[test]
fn cache_clear_removes_file_and_is_idempotent() {
    let (mut command, temp_home) = new_command_with_temp_home();
    write_cache(temp_home.path(), CACHED_ENTRY);

    command
        .args(["cache", "clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared cache at"));
    assert!(!cache_file(temp_home.path()).exists());

    command_with_home(temp_home.path())
        .args(["cache", "clear"])
        .assert()
        .success();
}

#[test]
fn doctor_with_diagnostics_creates_log_file() {
    let (mut command, temp_home) = new_command_with_temp_home();
    command
        .args(["--diagnostics", "doctor"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Diagnostics enabled:"));

    let diagnostics_dir = temp_home.path().join(".config/lazyflags/diagnostics");
    let logs: Vec<_> = fs::read_dir(&diagnostics_dir)
        .expect("diagnostics dir")
        .filter_map(Result::ok)
        .collect();
    assert_timestamp_log_names(&logs);

    let contents = fs::read_to_string(logs[0].path()).expect("diagnostics log");
    assert!(contents.contains("lazyflags diagnostics start"));
}
