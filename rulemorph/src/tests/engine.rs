use crate::engine::Engine;
use crate::functions::FunctionRegistry;
use crate::options::EngineOptions;
use crate::TransformError;
use serde_json::{json, Value};

fn engine(rules: Value) -> Engine {
    Engine::new(&rules, FunctionRegistry::with_builtins()).unwrap()
}

#[test]
fn test_empty_rules_wrap_single_record() {
    let engine = engine(json!([]));
    let mut document = json!({"a": 1});
    engine.transform(&mut document).unwrap();
    assert_eq!(document, json!([{"a": 1}]));
}

#[test]
fn test_rules_run_in_order() {
    let engine = engine(json!([
        {"condition": "always", "actions": [{"action": "set", "path": "total", "value": 2}]},
        {"condition": "always", "actions": [{"action": "multiply", "path": "total", "value": 5}]},
        {
            "condition": {"path": "total", "operator": "==", "value": 10},
            "actions": [{"action": "set", "path": "checked", "value": true}]
        }
    ]));
    let document = engine.transform_value(json!({})).unwrap();
    assert_eq!(document, json!([{"total": 10, "checked": true}]));
}

#[test]
fn test_later_rules_see_earlier_writes_per_record() {
    let engine = engine(json!([
        {
            "condition": {"path": "kind", "operator": "==", "value": "a"},
            "actions": [{"action": "set", "path": "flag", "value": 1}]
        },
        {
            "condition": {"path": "flag", "operator": "==", "value": 1},
            "actions": [{"action": "add", "path": "flag", "value": 1}]
        }
    ]));
    let document = engine
        .transform_value(json!([{"kind": "a"}, {"kind": "b"}]))
        .unwrap();
    assert_eq!(document, json!([{"kind": "a", "flag": 2}, {"kind": "b"}]));
}

#[test]
fn test_from_json_str() {
    let engine = Engine::from_json_str(
        r#"[{"condition": "always", "actions": [{"action": "delete", "path": "x"}]}]"#,
        FunctionRegistry::new(),
    )
    .unwrap();
    assert_eq!(engine.rules().len(), 1);

    let err = Engine::from_json_str("[{", FunctionRegistry::new()).unwrap_err();
    assert!(err.is_configuration_error());
}

#[test]
fn test_construction_rejects_bad_shape() {
    let err = Engine::new(
        &json!([{"condition": "always", "actions": [{"path": "x"}]}]),
        FunctionRegistry::new(),
    )
    .unwrap_err();
    match err {
        TransformError::Config { location, .. } => assert_eq!(location, "rules[0].actions[0]"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_path_depth_limit() {
    let options = EngineOptions {
        max_path_depth: 2,
        ..EngineOptions::default()
    };
    let rules = json!([{"condition": "always", "actions": [{"action": "delete", "path": "a.b.c"}]}]);
    assert!(Engine::with_options(&rules, FunctionRegistry::new(), options).is_err());
}

#[test]
fn test_engine_is_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Engine>();
}

#[test]
fn test_scalar_document_is_rejected_and_untouched() {
    let engine = engine(json!([]));
    let mut document = json!(42);
    let err = engine.transform(&mut document).unwrap_err();
    assert!(matches!(err, TransformError::InvalidDocument(_)));
    assert_eq!(document, json!(42));

    let mut document = json!([{"a": 1}, "loose"]);
    assert!(engine.transform(&mut document).is_err());
    assert_eq!(document, json!([{"a": 1}, "loose"]));
}
