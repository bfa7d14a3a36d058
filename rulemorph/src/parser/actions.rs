use super::{explicit, non_empty, options, Context};
use crate::actions::{
    Action, Argument, ArithmeticAction, ArithmeticOperation, ConditionalValue, DeleteAction,
    FunctionAction, SetAction, ValueSource,
};
use crate::path::Path;
use crate::{TransformError, TransformResult};
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetOptions {
    path: String,
    #[serde(default, deserialize_with = "explicit")]
    value: Option<Value>,
    #[serde(default)]
    value_from_field: Option<String>,
    #[serde(default)]
    value_mapping: Option<Value>,
    #[serde(default)]
    conditional_value: Option<Vec<ConditionalOptions>>,
    #[serde(default)]
    new_field: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConditionalOptions {
    condition: Value,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    value_from_field: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArithmeticOptions {
    path: String,
    #[serde(default, deserialize_with = "explicit")]
    value: Option<Value>,
    #[serde(default)]
    value_from_field: Option<String>,
    #[serde(default)]
    new_field: Option<String>,
}

#[derive(Deserialize)]
struct DeleteOptions {
    path: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FunctionOptions {
    path: String,
    function: String,
    #[serde(default)]
    args: Option<Vec<Value>>,
    #[serde(default)]
    new_field: Option<String>,
    #[serde(default)]
    strict: Option<bool>,
}

impl Context<'_> {
    pub(crate) fn action(&self, action: &Value, location: &str) -> TransformResult<Action> {
        let keyword = action
            .get("action")
            .and_then(Value::as_str)
            .ok_or_else(|| TransformError::config(location, "missing required field 'action'"))?;

        if let Some(operation) = ArithmeticOperation::from_name(keyword) {
            return self.arithmetic(operation, options(action, location)?, location);
        }

        match keyword {
            "set" => self.set(options(action, location)?, location),
            "delete" => {
                let parsed: DeleteOptions = options(action, location)?;
                Ok(Action::Delete(DeleteAction {
                    path: self.path(&parsed.path, &format!("{}.path", location))?,
                }))
            }
            "function" => self.function(options(action, location)?, location),
            other => Ok(Action::Unsupported {
                action: other.to_string(),
            }),
        }
    }

    /// Source path and target path (`newField`, defaulting to the source)
    fn paths(&self, path: &str, new_field: Option<String>, location: &str) -> TransformResult<(Path, Path)> {
        let source = self.path(path, &format!("{}.path", location))?;
        let target = match non_empty(new_field) {
            Some(field) => self.path(&field, &format!("{}.newField", location))?,
            None => source.clone(),
        };
        Ok((source, target))
    }

    fn value_source(
        &self,
        value: Option<Value>,
        value_from_field: Option<String>,
        location: &str,
    ) -> TransformResult<ValueSource> {
        if let Some(field) = non_empty(value_from_field) {
            return Ok(ValueSource::Field(
                self.path(&field, &format!("{}.valueFromField", location))?,
            ));
        }
        Ok(match value {
            Some(value) => ValueSource::Literal(value),
            None => ValueSource::Current,
        })
    }

    fn set(&self, parsed: SetOptions, location: &str) -> TransformResult<Action> {
        let (path, target) = self.paths(&parsed.path, parsed.new_field, location)?;
        let value = self.value_source(parsed.value, parsed.value_from_field, location)?;

        let mapping = match parsed.value_mapping {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map,
            Some(Value::Array(items)) if items.is_empty() => Map::new(),
            Some(other) => {
                return Err(TransformError::config(
                    format!("{}.valueMapping", location),
                    format!("expected an object, got {}", other),
                ))
            }
        };

        let conditional = parsed
            .conditional_value
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                let entry_location = format!("{}.conditionalValue[{}]", location, index);
                let condition = self.condition(&entry.condition, &format!("{}.condition", entry_location))?;
                let value = match non_empty(entry.value_from_field) {
                    Some(field) => ValueSource::Field(
                        self.path(&field, &format!("{}.valueFromField", entry_location))?,
                    ),
                    None => ValueSource::Literal(entry.value),
                };
                Ok(ConditionalValue { condition, value })
            })
            .collect::<TransformResult<Vec<_>>>()?;

        Ok(Action::Set(SetAction {
            path,
            target,
            value,
            mapping,
            conditional,
        }))
    }

    fn arithmetic(
        &self,
        operation: ArithmeticOperation,
        parsed: ArithmeticOptions,
        location: &str,
    ) -> TransformResult<Action> {
        let (path, target) = self.paths(&parsed.path, parsed.new_field, location)?;
        let operand = match self.value_source(parsed.value, parsed.value_from_field, location)? {
            ValueSource::Current => ValueSource::Literal(Value::Null),
            source => source,
        };
        Ok(Action::Arithmetic(ArithmeticAction {
            operation,
            path,
            target,
            operand,
        }))
    }

    fn function(&self, parsed: FunctionOptions, location: &str) -> TransformResult<Action> {
        let (path, target) = self.paths(&parsed.path, parsed.new_field, location)?;
        if parsed.function.is_empty() {
            return Err(TransformError::config(
                format!("{}.function", location),
                "function name must not be empty",
            ));
        }

        let args = parsed
            .args
            .unwrap_or_default()
            .iter()
            .enumerate()
            .map(|(index, arg)| self.argument(arg, &format!("{}.args[{}]", location, index)))
            .collect::<TransformResult<Vec<_>>>()?;

        Ok(Action::Function(FunctionAction {
            path,
            target,
            function: parsed.function,
            args,
            strict: parsed.strict.unwrap_or(false),
        }))
    }

    /// `{"path": "..."}` (and only that key) refers to the record; containers
    /// are searched for such references recursively. Containers without any
    /// reference stay literals.
    fn argument(&self, arg: &Value, location: &str) -> TransformResult<Argument> {
        match arg {
            Value::Object(object) if object.len() == 1 => match object.get("path") {
                Some(Value::String(path)) => Ok(Argument::Path(self.path(path, &format!("{}.path", location))?)),
                _ => self.object_argument(object, location),
            },
            Value::Object(object) => self.object_argument(object, location),
            Value::Array(items) => {
                let list = items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| self.argument(item, &format!("{}[{}]", location, index)))
                    .collect::<TransformResult<Vec<_>>>()?;
                if list.iter().all(|arg| matches!(arg, Argument::Literal(_))) {
                    return Ok(Argument::Literal(arg.clone()));
                }
                Ok(Argument::List(list))
            }
            other => Ok(Argument::Literal(other.clone())),
        }
    }

    fn object_argument(&self, object: &Map<String, Value>, location: &str) -> TransformResult<Argument> {
        let entries = object
            .iter()
            .map(|(key, value)| Ok((key.clone(), self.argument(value, &format!("{}.{}", location, key))?)))
            .collect::<TransformResult<Vec<_>>>()?;

        if entries.iter().all(|(_, arg)| matches!(arg, Argument::Literal(_))) {
            return Ok(Argument::Literal(Value::Object(object.clone())));
        }
        Ok(Argument::Object(entries))
    }
}
