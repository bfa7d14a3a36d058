use assert_cmd::Command;
use serde_json::{json, Value};

fn reconcile(args: [&str; 3]) -> Value {
    let output = Command::cargo_bin("rulemorph")
        .unwrap()
        .arg("reconcile")
        .args(args)
        .output()
        .unwrap();
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_cli_reconcile_derives_quantity() {
    assert_eq!(
        reconcile(["0", "10", "50"]),
        json!({"quantity": 5, "unitPrice": 10, "totalPrice": 50})
    );
}

#[test]
fn test_cli_reconcile_valid_line_is_echoed() {
    assert_eq!(
        reconcile(["2", "2.5", "5"]),
        json!({"quantity": 2, "unitPrice": 2.5, "totalPrice": 5})
    );
}
