//! Tests for `fleetssh example` and `fleetssh run`.

use crate::support::*;
use fleetssh::core::outcome::Status;
use predicates::prelude::*;

#[test]
fn test_example_writes_script() {
    let t = Test::new();

    t.cmd()
        .args(["example", "--dir"])
        .arg(t.dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("fleetssh_example.cfg"));

    let script = std::fs::read_to_string(t.dir.path().join("fleetssh_example.cfg")).unwrap();
    assert!(script.contains("upload-cfg = "));
    assert!(fleetssh::core::batch::parse(&script).is_ok());
}

#[test]
fn test_run_rejects_bad_script_before_connecting() {
    let t = Test::new();
    let script = t.local_file("bad.cfg", b"reboot\nwrite-excel\n");

    let output = t.run(&["run", script.to_str().unwrap(), "--ip", "10.0.0.1"]);
    assert_exit(&output, Status::Failure);
    assert_stderr_contains(&output, "line 2: 'write-excel' is not supported");
}

#[test]
fn test_run_missing_script() {
    let t = Test::new();

    let output = t.run(&["run", "absent.cfg", "--ip", "10.0.0.1"]);
    assert_exit(&output, Status::Failure);
}

#[test]
fn test_run_empty_script() {
    let t = Test::new();
    let script = t.local_file("empty.cfg", b"# nothing to do\n\n");

    let output = t.run(&["run", script.to_str().unwrap(), "--ip", "10.0.0.1"]);
    assert_success(&output);
    assert_stdout_contains(&output, "script has no commands");
}
