//! Tests for `fleetssh device remove` and commands that fail before
//! contacting a device.

use crate::support::*;
use fleetssh::core::outcome::Status;

#[test]
fn test_device_remove() {
    let t = Test::with_registry(SAMPLE_REGISTRY);

    let output = t.device_remove("SN-N1");
    assert_success(&output);
    assert_stdout_contains(&output, "Client 'SN-N1' (10.0.1.1) removed");
    assert!(!t.registry_content().contains("SN-N1"));
}

#[test]
fn test_device_remove_unknown_serial() {
    let t = Test::with_registry(SAMPLE_REGISTRY);

    let output = t.device_remove("SN-404");
    assert_exit(&output, Status::Failure);
    assert_stderr_contains(&output, "doesn't belong to any group");
    assert_eq!(t.registry_content(), SAMPLE_REGISTRY);
}

#[test]
fn test_client_add_rejects_bad_group_name() {
    let t = Test::new();

    let output = t.run(&["client", "add", "bad@@name", "10.0.0.1"]);
    assert_exit(&output, Status::Failure);
    assert_stderr_contains(&output, "invalid group");
    assert_eq!(t.registry_content(), "");
}

#[test]
fn test_upload_rejects_unknown_profile() {
    let t = Test::new();
    let cfg = t.local_file("site.cfg", PLAIN_CONFIG.as_bytes());

    let output = t.run(&[
        "upload",
        "cfg",
        "--ip",
        "10.0.0.1",
        cfg.to_str().unwrap(),
        "--profile",
        "alt7",
    ]);
    assert_exit(&output, Status::Failure);
    assert_stderr_contains(&output, "invalid profile 'alt7'");
}

#[test]
fn test_status_unknown_group() {
    let t = Test::with_registry(SAMPLE_REGISTRY);

    let output = t.run(&["status", "west"]);
    assert_exit(&output, Status::Failure);
    assert_stderr_contains(&output, "group 'west' doesn't exist");
}

#[test]
fn test_status_empty_group_json() {
    let t = Test::with_registry("@@empty@@\n");

    let output = t.run(&["status", "empty", "--json"]);
    assert_success(&output);
    let parsed: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("valid JSON");
    assert_eq!(parsed["offline"], 0);
    assert_eq!(parsed["members"].as_array().map(Vec::len), Some(0));
}
