//! Tests for `fleetssh group list/members/delete`.

use crate::support::*;
use fleetssh::core::outcome::Status;

#[test]
fn test_group_list_empty() {
    let t = Test::new();

    let output = t.group_list();
    assert_success(&output);
    assert_stdout_contains(&output, "no groups registered");
}

#[test]
fn test_group_list_shows_groups_in_order() {
    let t = Test::with_registry(SAMPLE_REGISTRY);

    let output = t.group_list();
    assert_success(&output);
    let out = stdout(&output);
    let north = out.find("north").expect("north listed");
    let south = out.find("south").expect("south listed");
    assert!(north < south);
    assert!(!out.contains("ORPHAN"));
}

#[test]
fn test_group_list_json_output() {
    let t = Test::with_registry(SAMPLE_REGISTRY);

    let output = t.group_list_json();
    assert_success(&output);

    let parsed: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("valid JSON");
    assert_eq!(parsed["count"], 2);
    assert_eq!(parsed["groups"][0], "north");
    assert_eq!(parsed["groups"][1], "south");
}

#[test]
fn test_group_members_json_output() {
    let t = Test::with_registry(SAMPLE_REGISTRY);

    let output = t.group_members_json("north");
    assert_success(&output);

    let parsed: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("valid JSON");
    assert_eq!(parsed["group"], "north");
    assert_eq!(parsed["count"], 2);
    assert_eq!(parsed["members"][0]["ip"], "10.0.1.1");
    assert_eq!(parsed["members"][0]["serial"], "SN-N1");
}

#[test]
fn test_group_members_text_output() {
    let t = Test::with_registry(SAMPLE_REGISTRY);

    let output = t.run(&["group", "members", "south"]);
    assert_success(&output);
    assert_stdout_contains(&output, "10.0.2.1");
    assert_stdout_contains(&output, "SN-S1");
}

#[test]
fn test_group_members_unknown_group() {
    let t = Test::with_registry(SAMPLE_REGISTRY);

    let output = t.group_members_json("west");
    assert_exit(&output, Status::Failure);
    assert_stderr_contains(&output, "group 'west' doesn't exist");
}

#[test]
fn test_group_delete() {
    let t = Test::with_registry(SAMPLE_REGISTRY);

    let output = t.group_delete("north");
    assert_success(&output);
    assert_stdout_contains(&output, "Group 'north' deleted (2 members)");

    assert!(!t.registry_content().contains("@@north@@"));
    assert!(t.registry_content().contains("@@south@@\n10.0.2.1:SN-S1\n"));
}

#[test]
fn test_group_delete_unknown_group() {
    let t = Test::with_registry(SAMPLE_REGISTRY);

    let output = t.group_delete("west");
    assert_exit(&output, Status::Failure);
    assert_eq!(t.registry_content(), SAMPLE_REGISTRY);
}
