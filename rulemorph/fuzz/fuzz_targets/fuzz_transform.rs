#![no_main]

use libfuzzer_sys::fuzz_target;
use rulemorph::{Engine, FunctionRegistry};
use serde_json::{json, Value};

fuzz_target!(|data: &[u8]| {
    let Ok(mut document) = serde_json::from_slice::<Value>(data) else {
        return;
    };

    let rules = json!([
        {
            "condition": {"path": "items.*.name", "operator": "similar_to", "value": "milk"},
            "actions": [
                {"action": "function", "path": "items.*.name", "function": "upper"},
                {"action": "multiply", "path": "items.*.qty", "valueFromField": "items.*.price", "newField": "items.*.total"}
            ]
        },
        {
            "condition": {"operator": "or", "conditions": [
                {"path": "vendor", "operator": "regex", "value": "/^a.*/i"},
                {"path": "total", "operator": "gt", "value": 10}
            ]},
            "actions": [
                {"action": "function", "path": "items", "function": "reconcile_quantities", "args": ["qty", "price", "total", true]},
                {"action": "function", "path": "", "function": "flatten_and_expand"}
            ]
        }
    ]);

    if let Ok(engine) = Engine::new(&rules, FunctionRegistry::with_builtins()) {
        let _ = engine.transform(&mut document);
    }
});
