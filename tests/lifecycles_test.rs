//! Integration tests for `weave lifecycles`

mod common;

use common::{stderr, stdout, TestProject};

#[test]
fn test_lifecycles_lists_default_phases() {
    let project = TestProject::new();
    let output = project.run(&["lifecycles"]);
    assert!(output.status.success());

    let text = stdout(&output);
    assert!(text.contains("clean"));
    assert!(text.contains("default"));
    assert!(text.contains("site"));
    assert!(text.contains("validate, initialize, sources, resources, compile"));
    assert!(text.contains("alias:  pre-clean -> before:clean"));
    assert!(!text.contains("generate-resources"));
}

#[test]
fn test_lifecycles_legacy_aliases() {
    let project = TestProject::new();
    let output = project.run(&["lifecycles", "--legacy-aliases"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("alias:  generate-resources -> resources"));
}

#[test]
fn test_lifecycles_json() {
    let project = TestProject::new();
    let output = project.run(&["--json", "lifecycles"]);
    assert!(output.status.success());

    let lifecycles: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("valid JSON");
    let default = lifecycles
        .as_array()
        .expect("array")
        .iter()
        .find(|l| l["id"] == "default")
        .expect("default lifecycle");
    assert_eq!(default["phases"][0], "validate");
    assert!(default["phases"]
        .as_array()
        .expect("phases")
        .iter()
        .any(|p| p == "package"));
}

#[test]
fn test_lifecycles_legacy_aliases_from_workspace() {
    let project = TestProject::with_workspace("[workspace]\nname = \"legacy\"\nlegacy-aliases = true\n");
    let output = project.run(&["lifecycles"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("alias:  generate-resources -> resources"));
}

#[test]
fn test_lifecycles_rejects_phase_flags() {
    let project = TestProject::new();
    let output = project.run(&["lifecycles", "--strict-phases"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_lifecycles_broken_workspace_fails() {
    let project = TestProject::with_workspace("[workspace\nname = ");
    let output = project.run(&["lifecycles"]);
    assert_eq!(output.status.code(), Some(1));
}
