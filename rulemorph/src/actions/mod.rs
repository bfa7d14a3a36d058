//! Actions: the mutations a matching rule applies to a record
//!
//! Every action reads its source path first. When the path expands a
//! wildcard, the action works element by element and writes each result at
//! the target path with the wildcard replaced by that element's index. All
//! results are computed before anything is written, so an action that fails
//! halfway leaves the record as it found it.

pub mod arithmetic;
pub mod function;
pub mod set;

pub use arithmetic::{ArithmeticAction, ArithmeticOperation};
pub use function::{Argument, FunctionAction};
pub use set::{ConditionalValue, SetAction};

use crate::functions::FunctionRegistry;
use crate::path::{self, Path, Resolved};
use crate::{TransformError, TransformResult};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Set(SetAction),
    Arithmetic(ArithmeticAction),
    Delete(DeleteAction),
    Function(FunctionAction),
    /// An action keyword outside the vocabulary; fails whenever it runs
    Unsupported { action: String },
}

impl Action {
    /// The keyword this action was configured with
    pub fn kind(&self) -> &str {
        match self {
            Action::Set(_) => "set",
            Action::Arithmetic(action) => action.operation.name(),
            Action::Delete(_) => "delete",
            Action::Function(_) => "function",
            Action::Unsupported { action } => action,
        }
    }

    /// The path the action reads
    pub fn path(&self) -> Option<&Path> {
        match self {
            Action::Set(action) => Some(&action.path),
            Action::Arithmetic(action) => Some(&action.path),
            Action::Delete(action) => Some(&action.path),
            Action::Function(action) => Some(&action.path),
            Action::Unsupported { .. } => None,
        }
    }

    pub fn execute(&self, record: &mut Value, functions: &FunctionRegistry) -> TransformResult<()> {
        match self {
            Action::Set(action) => action.execute(record),
            Action::Arithmetic(action) => action.execute(record),
            Action::Delete(action) => {
                path::delete(record, &action.path);
                Ok(())
            }
            Action::Function(action) => action.execute(record, functions),
            Action::Unsupported { action } => {
                Err(TransformError::UnknownActionType(action.clone()))
            }
        }
    }
}

/// Where an action's value comes from
#[derive(Debug, Clone, PartialEq)]
pub enum ValueSource {
    /// Nothing configured: the value currently at the action's path
    Current,
    Literal(Value),
    /// `valueFromField`
    Field(Path),
}

impl ValueSource {
    /// Resolve against the record; `None` for [`ValueSource::Current`]
    pub fn resolve(&self, record: &Value) -> Option<Resolved> {
        match self {
            ValueSource::Current => None,
            ValueSource::Literal(value) => Some(Resolved::Single(value.clone())),
            ValueSource::Field(path) => Some(path::get(record, path)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteAction {
    pub path: Path,
}

/// Apply `f` to the value(s) at `source` and collect the writes to `target`
pub(crate) fn plan_writes<F>(
    record: &Value,
    source: &Path,
    target: &Path,
    mut f: F,
) -> TransformResult<Vec<(Path, Value)>>
where
    F: FnMut(&Value, Option<usize>) -> TransformResult<Value>,
{
    match path::get(record, source) {
        Resolved::Single(current) => Ok(vec![(target.clone(), f(&current, None)?)]),
        Resolved::Many(values) => values
            .iter()
            .enumerate()
            .map(|(index, current)| Ok((target.with_index(index), f(current, Some(index))?)))
            .collect(),
    }
}

pub(crate) fn apply_writes(record: &mut Value, writes: Vec<(Path, Value)>) {
    for (target, value) in writes {
        path::set(record, &target, value);
    }
}
