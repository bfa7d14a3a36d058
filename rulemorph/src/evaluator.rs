//! Applies rules to documents
//!
//! A document is one record (an object) or a list of records. Every record
//! goes through every rule in order; a record that is itself a list has each
//! action applied to its elements one by one. Afterwards records are
//! collected into the output list, and a record that an action turned into a
//! list is spliced in element by element.

use crate::actions::Action;
use crate::functions::FunctionRegistry;
use crate::options::EngineOptions;
use crate::parser::Rule;
use crate::reporter::{Diagnostic, Reporter};
use crate::{TransformError, TransformResult};
use serde_json::Value;
use tracing::trace;

pub(crate) struct Evaluator<'a> {
    pub rules: &'a [Rule],
    pub functions: &'a FunctionRegistry,
    pub reporter: &'a dyn Reporter,
    pub options: &'a EngineOptions,
}

/// Position of the step being run, for diagnostics
#[derive(Clone, Copy)]
struct Step {
    record: usize,
    rule: usize,
    action: Option<usize>,
    element: Option<usize>,
}

impl Evaluator<'_> {
    /// Transform a document in place. Only a malformed document is an error,
    /// in which case the document is left as it was.
    pub fn transform(&self, document: &mut Value) -> TransformResult<()> {
        validate(document)?;

        let records = match std::mem::take(document) {
            Value::Array(records) => records,
            record => vec![record],
        };

        let mut output = Vec::with_capacity(records.len());
        for (index, mut record) in records.into_iter().enumerate() {
            self.apply_rules(&mut record, index);
            match record {
                Value::Array(split) => output.extend(split),
                record => output.push(record),
            }
        }

        *document = Value::Array(output);
        Ok(())
    }

    fn apply_rules(&self, record: &mut Value, record_index: usize) {
        for (rule_index, rule) in self.rules.iter().enumerate() {
            let mut step = Step {
                record: record_index,
                rule: rule_index,
                action: None,
                element: None,
            };

            match rule.condition.evaluate(record) {
                Ok(true) => trace!(record = record_index, rule = rule_index, "rule matched"),
                Ok(false) => continue,
                Err(error) => {
                    self.report(step, error);
                    continue;
                }
            }

            for (action_index, action) in rule.actions.iter().enumerate() {
                step.action = Some(action_index);
                match record {
                    Value::Array(elements) => {
                        for (element_index, element) in elements.iter_mut().enumerate() {
                            step.element = Some(element_index);
                            self.run_action(action, element, step);
                        }
                        step.element = None;
                    }
                    _ => self.run_action(action, record, step),
                }
            }
        }
    }

    fn run_action(&self, action: &Action, target: &mut Value, step: Step) {
        let snapshot = self.options.snapshot_actions.then(|| target.clone());

        if let Err(error) = action.execute(target, self.functions) {
            if let Some(snapshot) = snapshot {
                *target = snapshot;
            }
            self.report(step, error);
        }
    }

    fn report(&self, step: Step, error: TransformError) {
        self.reporter.report(Diagnostic {
            record: step.record,
            rule: step.rule,
            action: step.action,
            element: step.element,
            error,
        });
    }
}

/// An object, or a list of objects and lists
fn validate(document: &Value) -> TransformResult<()> {
    match document {
        Value::Object(_) => Ok(()),
        Value::Array(records) => {
            match records
                .iter()
                .position(|record| !(record.is_object() || record.is_array()))
            {
                Some(index) => Err(TransformError::InvalidDocument(format!(
                    "record {} is {}, expected an object or a list",
                    index,
                    kind(&records[index])
                ))),
                None => Ok(()),
            }
        }
        other => Err(TransformError::InvalidDocument(format!(
            "expected an object or a list of records, got {}",
            kind(other)
        ))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
