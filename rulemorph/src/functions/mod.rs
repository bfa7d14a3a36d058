//! Function registry for the `function` action
//!
//! A function receives the current value at the action's path and the
//! action's resolved arguments, and returns the value to write back.
//! [`FunctionRegistry::with_builtins`] pre-registers the library below;
//! callers add their own with [`FunctionRegistry::register`].

pub mod collections;
pub mod dates;
pub mod text;

use crate::value::{as_f64, as_text, is_truthy};
use crate::{TransformError, TransformResult};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A callable registered under a name
pub type NativeFunction = Arc<dyn Fn(&Value, &[Value]) -> TransformResult<Value> + Send + Sync>;

#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, NativeFunction>,
}

impl FunctionRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in function library
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        text::register(&mut registry);
        dates::register(&mut registry);
        collections::register(&mut registry);
        registry
    }

    /// Register a function, replacing any function of the same name
    pub fn register<F>(&mut self, name: impl Into<String>, function: F) -> &mut Self
    where
        F: Fn(&Value, &[Value]) -> TransformResult<Value> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(function));
        self
    }

    pub fn get(&self, name: &str) -> Option<&NativeFunction> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Registered names in alphabetical order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

/// Positional argument access for built-in functions
pub(crate) struct Args<'a> {
    function: &'static str,
    values: &'a [Value],
}

impl<'a> Args<'a> {
    pub(crate) fn new(function: &'static str, values: &'a [Value]) -> Self {
        Self { function, values }
    }

    /// The argument at `index`, treating null as absent
    pub(crate) fn get(&self, index: usize) -> Option<&'a Value> {
        self.values.get(index).filter(|v| !v.is_null())
    }

    pub(crate) fn required(&self, index: usize, name: &str) -> TransformResult<&'a Value> {
        self.get(index).ok_or_else(|| {
            TransformError::function(self.function, format!("missing argument '{}'", name))
        })
    }

    pub(crate) fn string(&self, index: usize, name: &str) -> TransformResult<String> {
        let value = self.required(index, name)?;
        as_text(value).ok_or_else(|| self.invalid(name, "a string", value))
    }

    pub(crate) fn string_or(&self, index: usize, default: &str) -> String {
        self.get(index)
            .and_then(as_text)
            .unwrap_or_else(|| default.to_string())
    }

    pub(crate) fn optional_string(&self, index: usize) -> Option<String> {
        self.get(index).and_then(as_text).filter(|s| !s.is_empty())
    }

    pub(crate) fn bool_or(&self, index: usize, default: bool) -> bool {
        self.get(index).map(is_truthy).unwrap_or(default)
    }

    pub(crate) fn number_or(&self, index: usize, name: &str, default: f64) -> TransformResult<f64> {
        match self.get(index) {
            None => Ok(default),
            Some(value) => as_f64(value).ok_or_else(|| self.invalid(name, "a number", value)),
        }
    }

    pub(crate) fn list(&self, index: usize, name: &str) -> TransformResult<&'a Vec<Value>> {
        let value = self.required(index, name)?;
        value.as_array().ok_or_else(|| self.invalid(name, "a list", value))
    }

    pub(crate) fn object(&self, index: usize, name: &str) -> TransformResult<&'a Map<String, Value>> {
        let value = self.required(index, name)?;
        value.as_object().ok_or_else(|| self.invalid(name, "an object", value))
    }

    pub(crate) fn error(&self, message: impl Into<String>) -> TransformError {
        TransformError::function(self.function, message)
    }

    fn invalid(&self, name: &str, expected: &str, got: &Value) -> TransformError {
        TransformError::function(
            self.function,
            format!("argument '{}' must be {}, got {}", name, expected, got),
        )
    }
}

/// Apply `f` to every string inside `value`, descending into containers.
/// Non-string scalars pass through unchanged.
pub(crate) fn map_strings<F>(value: &Value, f: &F) -> TransformResult<Value>
where
    F: Fn(&str) -> TransformResult<Value>,
{
    match value {
        Value::String(s) => f(s),
        Value::Array(items) => items
            .iter()
            .map(|item| map_strings(item, f))
            .collect::<TransformResult<Vec<_>>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, item) in map {
                out.insert(key.clone(), map_strings(item, f)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

/// Collapse whitespace runs to single spaces and trim
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_register_overrides_builtin() {
        let mut registry = FunctionRegistry::with_builtins();
        assert!(registry.contains("upper"));

        registry.register("upper", |_, _| Ok(json!("custom")));
        let upper = registry.get("upper").unwrap();
        assert_eq!(upper(&json!("a"), &[]).unwrap(), json!("custom"));
    }

    #[test]
    fn test_builtin_names() {
        let registry = FunctionRegistry::with_builtins();
        for name in [
            "lower",
            "upper",
            "trim",
            "round",
            "str_replace",
            "regex_replace",
            "explode",
            "concat",
            "prepend",
            "append",
            "remove_repeated_words",
            "dictionary_mapper",
            "regex_mapper",
            "date_format",
            "date_add_days",
            "date_diff",
            "convert_unit",
            "fuzzy_extract_one",
            "rename_keys",
            "remove_keys",
            "get",
            "sort_by_key",
            "set_if",
            "sum_if",
            "find",
            "flatten_and_expand",
            "reconcile_quantities",
        ] {
            assert!(registry.contains(name), "missing builtin {}", name);
        }
        assert!(FunctionRegistry::new().is_empty());
    }

    #[test]
    fn test_args_treat_null_as_absent() {
        let values = [json!("x"), Value::Null];
        let args = Args::new("demo", &values);
        assert_eq!(args.string_or(1, "default"), "default");
        assert!(args.required(1, "second").is_err());
        assert_eq!(args.string(0, "first").unwrap(), "x");
    }

    #[test]
    fn test_map_strings_descends_into_containers() {
        let value = json!({"a": " x ", "b": [" y ", 3]});
        let trimmed = map_strings(&value, &|s: &str| Ok(json!(s.trim()))).unwrap();
        assert_eq!(trimmed, json!({"a": "x", "b": ["y", 3]}));
    }
}
