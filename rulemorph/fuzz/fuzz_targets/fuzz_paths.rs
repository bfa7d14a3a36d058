#![no_main]

use libfuzzer_sys::fuzz_target;
use rulemorph::path::{self, Path};
use serde_json::json;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(parsed) = Path::parse(s) {
            let mut document = json!({"items": [{"a": 1}, {"a": [2, 3]}], "b": {"c": "d"}});
            let _ = path::get(&document, &parsed);
            path::set(&mut document, &parsed, json!("x"));
            path::delete(&mut document, &parsed);
        }
    }
});
