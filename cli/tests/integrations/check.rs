use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_cli_check_summarises_rules() {
    let temp_dir = TempDir::new().unwrap();
    let rules = temp_dir.path().join("rules.json");
    fs::write(
        &rules,
        r#"[
            {"condition": {"path": "total", "operator": "gt", "value": 100},
             "actions": [{"action": "set", "path": "review", "value": true}]},
            {"condition": "always",
             "actions": [{"action": "function", "path": "name", "function": "shout"}]}
        ]"#,
    )
    .unwrap();

    Command::cargo_bin("rulemorph")
        .unwrap()
        .arg("check")
        .arg(&rules)
        .assert()
        .success()
        .stdout(predicate::str::contains("set review"))
        .stdout(predicate::str::contains("function 'shout' is not registered"))
        .stdout(predicate::str::contains("2 rule(s), 1 warning(s)"));
}

#[test]
fn test_cli_check_reports_location() {
    let temp_dir = TempDir::new().unwrap();
    let rules = temp_dir.path().join("rules.json");
    fs::write(
        &rules,
        r#"[{"condition": "always", "actions": [{"action": "set"}]}]"#,
    )
    .unwrap();

    Command::cargo_bin("rulemorph")
        .unwrap()
        .arg("check")
        .arg(&rules)
        .assert()
        .failure()
        .stderr(predicate::str::contains("rules[0].actions[0]"));
}
