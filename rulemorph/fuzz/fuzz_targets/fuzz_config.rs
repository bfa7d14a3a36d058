#![no_main]

use libfuzzer_sys::fuzz_target;
use rulemorph::{Engine, FunctionRegistry};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = Engine::from_json_str(s, FunctionRegistry::with_builtins());
    }
});
