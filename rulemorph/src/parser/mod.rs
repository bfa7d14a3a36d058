//! Rule configuration parsing
//!
//! Turns the JSON rule configuration into [`Rule`]s. This is the only place
//! the engine rejects input: any shape error is reported with its location
//! (for example `rules[2].actions[0]`) and building the engine fails.
//! Unknown operators and action keywords are not shape errors; they are kept
//! and fail when they run, which the evaluator contains.

pub mod actions;
pub mod conditions;

use crate::actions::Action;
use crate::conditions::Condition;
use crate::options::EngineOptions;
use crate::path::Path;
use crate::{TransformError, TransformResult};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A condition and the actions to run when it holds
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub condition: Condition,
    pub actions: Vec<Action>,
}

/// Parse a rule configuration: an array of `{"condition": ..., "actions": [...]}`
pub fn parse_rules(config: &Value, options: &EngineOptions) -> TransformResult<Vec<Rule>> {
    let rules = config
        .as_array()
        .ok_or_else(|| TransformError::config("rules", "expected an array of rules"))?;

    let context = Context { options };
    rules
        .iter()
        .enumerate()
        .map(|(index, rule)| context.rule(rule, &format!("rules[{}]", index)))
        .collect()
}

pub(crate) struct Context<'a> {
    options: &'a EngineOptions,
}

impl Context<'_> {
    fn rule(&self, rule: &Value, location: &str) -> TransformResult<Rule> {
        let object = rule
            .as_object()
            .ok_or_else(|| TransformError::config(location, "expected a rule object"))?;

        let condition = object.get("condition").ok_or_else(|| {
            TransformError::config(location, "missing required field 'condition'")
        })?;
        let condition = self.condition(condition, &format!("{}.condition", location))?;

        let actions = object
            .get("actions")
            .ok_or_else(|| TransformError::config(location, "missing required field 'actions'"))?
            .as_array()
            .ok_or_else(|| TransformError::config(format!("{}.actions", location), "expected an array"))?;
        let actions = actions
            .iter()
            .enumerate()
            .map(|(index, action)| self.action(action, &format!("{}.actions[{}]", location, index)))
            .collect::<TransformResult<Vec<_>>>()?;

        Ok(Rule { condition, actions })
    }

    /// Parse a configured path, enforcing the depth limit
    pub(crate) fn path(&self, text: &str, location: &str) -> TransformResult<Path> {
        let path = Path::parse(text).map_err(|e| TransformError::config(location, e.to_string()))?;
        if path.len() > self.options.max_path_depth {
            return Err(TransformError::config(
                location,
                format!(
                    "path '{}' has {} segments, more than the limit of {}",
                    text,
                    path.len(),
                    self.options.max_path_depth
                ),
            ));
        }
        Ok(path)
    }
}

/// Deserialize a field so that an explicit `null` is distinguishable from a
/// missing field: missing stays `None` (via `#[serde(default)]`), `null`
/// becomes `Some(Value::Null)`.
pub(crate) fn explicit<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Read a typed options struct, reporting serde errors at `location`
pub(crate) fn options<T>(value: &Value, location: &str) -> TransformResult<T>
where
    T: for<'de> Deserialize<'de>,
{
    T::deserialize(value).map_err(|e| TransformError::config(location, e.to_string()))
}

/// An empty string counts as not configured
pub(crate) fn non_empty(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rules_must_be_an_array() {
        let err = parse_rules(&json!({"condition": "always"}), &EngineOptions::default()).unwrap_err();
        assert!(matches!(err, TransformError::Config { ref location, .. } if location == "rules"));
    }

    #[test]
    fn test_missing_actions_reports_location() {
        let config = json!([
            {"condition": "always", "actions": []},
            {"condition": "always"}
        ]);
        let err = parse_rules(&config, &EngineOptions::default()).unwrap_err();
        assert_eq!(
            err,
            TransformError::config("rules[1]", "missing required field 'actions'")
        );
    }

    #[test]
    fn test_path_depth_limit() {
        let options = EngineOptions {
            max_path_depth: 2,
            ..EngineOptions::default()
        };
        let config = json!([{
            "condition": "always",
            "actions": [{"action": "delete", "path": "a.b.c"}]
        }]);
        let err = parse_rules(&config, &options).unwrap_err();
        assert!(matches!(err, TransformError::Config { ref location, .. } if location == "rules[0].actions[0].path"));
    }

    #[test]
    fn test_malformed_path_is_a_config_error() {
        let config = json!([{
            "condition": {"path": "a..b", "operator": "exists"},
            "actions": []
        }]);
        let err = parse_rules(&config, &EngineOptions::default()).unwrap_err();
        assert!(err.is_configuration_error());
        assert!(matches!(err, TransformError::Config { ref location, .. } if location == "rules[0].condition.path"));
    }
}
