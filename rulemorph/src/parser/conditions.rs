use super::{explicit, options, Context};
use crate::conditions::{
    CompositeCondition, Condition, LogicalOperator, Operand, Operator, SimilarityOptions,
    SimpleCondition, Subject,
};
use crate::value::as_f64;
use crate::{TransformError, TransformResult};
use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize)]
struct SimpleOptions {
    #[serde(default)]
    path: Option<String>,
    #[serde(default, deserialize_with = "explicit")]
    path_value: Option<Value>,
    operator: String,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    similarity_threshold: Option<Value>,
    #[serde(default)]
    similarity_tokenize: Option<bool>,
}

impl Context<'_> {
    pub(crate) fn condition(&self, condition: &Value, location: &str) -> TransformResult<Condition> {
        match condition {
            Value::String(s) if s.eq_ignore_ascii_case("always") => Ok(Condition::Always),
            Value::Object(object) => {
                let logical = object
                    .get("operator")
                    .and_then(Value::as_str)
                    .and_then(LogicalOperator::from_name);
                match logical {
                    Some(operator) => self.composite(operator, object.get("conditions"), location),
                    None => self.simple(condition, location),
                }
            }
            _ => Err(TransformError::config(
                location,
                "expected \"always\" or a condition object",
            )),
        }
    }

    fn composite(
        &self,
        operator: LogicalOperator,
        conditions: Option<&Value>,
        location: &str,
    ) -> TransformResult<Condition> {
        let conditions = conditions.and_then(Value::as_array).ok_or_else(|| {
            TransformError::config(
                location,
                format!("'{}' needs a 'conditions' array", operator),
            )
        })?;

        let conditions = conditions
            .iter()
            .enumerate()
            .map(|(index, child)| self.condition(child, &format!("{}.conditions[{}]", location, index)))
            .collect::<TransformResult<Vec<_>>>()?;

        Ok(Condition::Composite(CompositeCondition {
            operator,
            conditions,
        }))
    }

    fn simple(&self, condition: &Value, location: &str) -> TransformResult<Condition> {
        let parsed: SimpleOptions = options(condition, location)?;

        let subject = match (parsed.path_value, parsed.path) {
            (Some(value), _) => Subject::Literal(value),
            (None, Some(path)) => Subject::Path(self.path(&path, &format!("{}.path", location))?),
            (None, None) => {
                return Err(TransformError::config(
                    location,
                    "a condition needs either 'path' or 'path_value'",
                ))
            }
        };

        let value = match &parsed.value {
            Value::Object(object) if object.len() == 1 && object.contains_key("path") => {
                let path = object
                    .get("path")
                    .and_then(Value::as_str)
                    .ok_or_else(|| TransformError::config(format!("{}.value.path", location), "expected a string"))?;
                Operand::Path(self.path(path, &format!("{}.value.path", location))?)
            }
            other => Operand::Literal(other.clone()),
        };

        let threshold = match &parsed.similarity_threshold {
            None | Some(Value::Null) => None,
            Some(raw) => Some(as_f64(raw).ok_or_else(|| {
                TransformError::config(
                    format!("{}.similarity_threshold", location),
                    format!("expected a number, got {}", raw),
                )
            })?),
        };

        Ok(Condition::Simple(SimpleCondition {
            subject,
            operator: Operator::from_name(&parsed.operator),
            value,
            similarity: SimilarityOptions {
                threshold,
                tokenize: parsed.similarity_tokenize.unwrap_or(false),
            },
        }))
    }
}
