//! Argument handling, completions and help.

use crate::support::*;
use predicates::prelude::*;

#[test]
fn test_help_lists_commands() {
    let t = Test::new();

    t.cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("group"))
        .stdout(predicate::str::contains("upload"))
        .stdout(predicate::str::contains("Exit status"));
}

#[test]
fn test_unknown_subcommand_fails() {
    let t = Test::new();

    t.cmd()
        .arg("frobnicate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_device_command_requires_ip() {
    let t = Test::new();

    t.cmd()
        .arg("reboot")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--ip"));
}

#[test]
fn test_completions_bash() {
    let t = Test::new();

    t.cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fleetssh"));
}

#[test]
fn test_invalid_settings_file_is_reported() {
    let t = Test::new();
    std::fs::write(t.home.path().join("fleetssh.toml"), "[ssh]\nport = 0\n").unwrap();

    let output = t.group_list();
    assert_failure(&output);
    assert_stderr_contains(&output, "port");
}

#[test]
fn test_settings_file_is_optional_per_section() {
    let t = Test::with_registry(SAMPLE_REGISTRY);
    std::fs::write(t.home.path().join("fleetssh.toml"), "[status]\nping_timeout = 5\n").unwrap();

    assert_success(&t.group_list());
}
