use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_rules(dir: &Path) -> std::path::PathBuf {
    let rules = dir.join("rules.json");
    fs::write(
        &rules,
        json!([
            {
                "condition": {"path": "vendor", "operator": "contains", "value": "acme"},
                "actions": [{"action": "function", "path": "vendor", "function": "upper"}]
            },
            {
                "condition": "always",
                "actions": [{"action": "multiply", "path": "qty", "value": 2}]
            }
        ])
        .to_string(),
    )
    .unwrap();
    rules
}

#[test]
fn test_cli_run_single_document() {
    let temp_dir = TempDir::new().unwrap();
    let rules = write_rules(temp_dir.path());
    let input = temp_dir.path().join("doc.json");
    fs::write(&input, r#"{"vendor": "Acme Ltd", "qty": 3}"#).unwrap();

    let output = Command::cargo_bin("rulemorph")
        .unwrap()
        .arg("run")
        .arg(&rules)
        .arg(&input)
        .output()
        .unwrap();

    assert!(output.status.success());
    let document: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(document, json!([{"vendor": "ACME LTD", "qty": 6}]));
}

#[test]
fn test_cli_run_directory() {
    let temp_dir = TempDir::new().unwrap();
    let rules = write_rules(temp_dir.path());
    let docs = temp_dir.path().join("docs");
    fs::create_dir(&docs).unwrap();
    fs::write(docs.join("a.json"), r#"{"qty": 1}"#).unwrap();
    fs::write(docs.join("b.json"), r#"[{"qty": 2}, {"qty": 5}]"#).unwrap();
    fs::write(docs.join("notes.txt"), "ignored").unwrap();

    let output = Command::cargo_bin("rulemorph")
        .unwrap()
        .arg("run")
        .arg(&rules)
        .arg(&docs)
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines, vec![json!([{"qty": 2}]), json!([{"qty": 4}, {"qty": 10}])]);
}

#[test]
fn test_cli_run_without_builtins_skips_functions() {
    let temp_dir = TempDir::new().unwrap();
    let rules = write_rules(temp_dir.path());
    let input = temp_dir.path().join("doc.json");
    fs::write(&input, r#"{"vendor": "acme", "qty": 1}"#).unwrap();

    Command::cargo_bin("rulemorph")
        .unwrap()
        .arg("run")
        .arg(&rules)
        .arg(&input)
        .arg("--no-builtins")
        .arg("--pretty")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"vendor\": \"acme\""));
}

#[test]
fn test_cli_run_rejects_scalar_document() {
    let temp_dir = TempDir::new().unwrap();
    let rules = write_rules(temp_dir.path());
    let input = temp_dir.path().join("doc.json");
    fs::write(&input, "42").unwrap();

    Command::cargo_bin("rulemorph")
        .unwrap()
        .arg("run")
        .arg(&rules)
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid document"));
}

#[test]
fn test_cli_run_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let rules = write_rules(temp_dir.path());

    Command::cargo_bin("rulemorph")
        .unwrap()
        .arg("run")
        .arg(&rules)
        .arg(temp_dir.path().join("nope.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read"));
}
