use assert_cmd::Command;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_server_command_available() {
    let mut cmd = Command::cargo_bin("rulemorph").unwrap();
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicates::str::contains("server"));
}

#[test]
fn test_server_requires_rules() {
    let mut cmd = Command::cargo_bin("rulemorph").unwrap();
    cmd.arg("server");
    cmd.assert().failure();
}

#[test]
fn test_server_rejects_invalid_rules_before_binding() {
    let temp_dir = TempDir::new().unwrap();
    let rules = temp_dir.path().join("rules.json");
    fs::write(&rules, r#"[{"actions": []}]"#).unwrap();

    let mut cmd = Command::cargo_bin("rulemorph").unwrap();
    cmd.arg("server").arg("--rules").arg(&rules);
    cmd.assert()
        .failure()
        .stderr(predicates::str::contains("missing required field 'condition'"));
}
