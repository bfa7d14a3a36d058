use super::{apply_writes, plan_writes};
use crate::functions::FunctionRegistry;
use crate::path::{self, Path};
use crate::{TransformError, TransformResult};
use serde_json::{Map, Value};
use tracing::debug;

/// A function argument as configured
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Literal(Value),
    /// `{"path": "..."}`, read from the record when the action runs
    Path(Path),
    List(Vec<Argument>),
    Object(Vec<(String, Argument)>),
}

impl Argument {
    pub fn resolve(&self, record: &Value) -> Value {
        match self {
            Argument::Literal(value) => value.clone(),
            Argument::Path(path) => path::get(record, path).into_value(),
            Argument::List(items) => Value::Array(items.iter().map(|a| a.resolve(record)).collect()),
            Argument::Object(entries) => {
                let mut map = Map::with_capacity(entries.len());
                for (key, argument) in entries {
                    map.insert(key.clone(), argument.resolve(record));
                }
                Value::Object(map)
            }
        }
    }
}

/// Call a registered function on the value at `path`
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionAction {
    pub path: Path,
    pub target: Path,
    pub function: String,
    pub args: Vec<Argument>,
    /// Fail instead of skipping when the function is not registered
    pub strict: bool,
}

impl FunctionAction {
    pub fn execute(&self, record: &mut Value, functions: &FunctionRegistry) -> TransformResult<()> {
        let Some(function) = functions.get(&self.function) else {
            if self.strict {
                return Err(TransformError::UnknownFunction(self.function.clone()));
            }
            debug!(function = %self.function, "function not registered, skipping");
            return Ok(());
        };

        let writes = {
            let record: &Value = record;
            let args: Vec<Value> = self.args.iter().map(|a| a.resolve(record)).collect();
            plan_writes(record, &self.path, &self.target, |current, _| {
                function(current, &args)
            })?
        };
        apply_writes(record, writes);
        Ok(())
    }
}
