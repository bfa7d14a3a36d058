//! Condition evaluation
//!
//! A [`Condition`] is built once from the rule configuration and evaluated
//! against every record the engine sees. Evaluation never mutates the record.

pub mod operators;
pub mod similarity;

pub use operators::{compare, Operator, SimilarityOptions, DEFAULT_SIMILARITY_THRESHOLD};
pub use similarity::{similarity, SimilarityMethod};

use crate::path::{self, Path, Resolved};
use crate::TransformResult;
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// The literal `"always"` condition
    Always,
    Simple(SimpleCondition),
    Composite(CompositeCondition),
}

/// What a simple condition compares
#[derive(Debug, Clone, PartialEq)]
pub enum Subject {
    /// Resolved from the record; wildcard paths make the condition existential
    Path(Path),
    /// Given inline as `path_value`
    Literal(Value),
}

/// What the subject is compared against
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(Value),
    /// `{"path": "..."}`, resolved from the record at evaluation time
    Path(Path),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimpleCondition {
    pub subject: Subject,
    pub operator: Operator,
    pub value: Operand,
    pub similarity: SimilarityOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

impl LogicalOperator {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "and" => Some(Self::And),
            "or" => Some(Self::Or),
            _ => None,
        }
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalOperator::And => write!(f, "and"),
            LogicalOperator::Or => write!(f, "or"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompositeCondition {
    pub operator: LogicalOperator,
    pub conditions: Vec<Condition>,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Always => write!(f, "always"),
            Condition::Simple(simple) => {
                match &simple.subject {
                    Subject::Path(path) if path.is_root() => write!(f, "<record>")?,
                    Subject::Path(path) => write!(f, "{}", path)?,
                    Subject::Literal(value) => write!(f, "{}", value)?,
                }
                write!(f, " {} ", simple.operator)?;
                match &simple.value {
                    Operand::Literal(value) => write!(f, "{}", value),
                    Operand::Path(path) => write!(f, "{{path: {}}}", path),
                }
            }
            Condition::Composite(composite) => {
                write!(f, "(")?;
                for (i, child) in composite.conditions.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {} ", composite.operator)?;
                    }
                    write!(f, "{}", child)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl Condition {
    /// Evaluate the condition against a record
    pub fn evaluate(&self, record: &Value) -> TransformResult<bool> {
        match self {
            Condition::Always => Ok(true),
            Condition::Simple(simple) => simple.evaluate(record),
            Condition::Composite(composite) => {
                composite.combine(|child| child.evaluate(record))
            }
        }
    }

    /// Evaluate with `current` standing in for every subject.
    ///
    /// Used by conditional values, whose conditions test the value being
    /// replaced rather than a path of the record. Operand paths still
    /// resolve against `record`.
    pub fn matches_value(&self, current: &Value, record: &Value) -> TransformResult<bool> {
        match self {
            Condition::Always => Ok(true),
            Condition::Simple(simple) => {
                let value = simple.operand(record);
                compare(current, &simple.operator, &value, simple.similarity)
            }
            Condition::Composite(composite) => {
                composite.combine(|child| child.matches_value(current, record))
            }
        }
    }
}

impl SimpleCondition {
    pub fn evaluate(&self, record: &Value) -> TransformResult<bool> {
        let value = self.operand(record);

        match &self.subject {
            Subject::Literal(subject) => {
                compare(subject, &self.operator, &value, self.similarity)
            }
            Subject::Path(path) => match path::get(record, path) {
                Resolved::Single(subject) => {
                    compare(&subject, &self.operator, &value, self.similarity)
                }
                Resolved::Many(subjects) => {
                    for subject in &subjects {
                        if compare(subject, &self.operator, &value, self.similarity)? {
                            return Ok(true);
                        }
                    }
                    Ok(false)
                }
            },
        }
    }

    fn operand(&self, record: &Value) -> Value {
        match &self.value {
            Operand::Literal(value) => value.clone(),
            Operand::Path(path) => path::get(record, path).into_value(),
        }
    }
}

impl CompositeCondition {
    /// Every child is evaluated; the first error aborts the whole condition
    fn combine<F>(&self, mut evaluate: F) -> TransformResult<bool>
    where
        F: FnMut(&Condition) -> TransformResult<bool>,
    {
        let results = self
            .conditions
            .iter()
            .map(&mut evaluate)
            .collect::<TransformResult<Vec<bool>>>()?;

        Ok(match self.operator {
            LogicalOperator::And => results.iter().all(|r| *r),
            LogicalOperator::Or => results.iter().any(|r| *r),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TransformError;
    use serde_json::json;

    fn simple(path: &str, operator: &str, value: Value) -> Condition {
        Condition::Simple(SimpleCondition {
            subject: Subject::Path(Path::parse(path).unwrap()),
            operator: Operator::from_name(operator),
            value: Operand::Literal(value),
            similarity: SimilarityOptions::default(),
        })
    }

    fn literal(result: bool) -> Condition {
        Condition::Simple(SimpleCondition {
            subject: Subject::Literal(json!(result)),
            operator: Operator::True,
            value: Operand::Literal(Value::Null),
            similarity: SimilarityOptions::default(),
        })
    }

    #[test]
    fn test_wildcard_subject_is_existential() {
        let record = json!({"items": [{"qty": 1}, {"qty": 12}]});
        assert!(simple("items.*.qty", "gt", json!(10)).evaluate(&record).unwrap());
        assert!(!simple("items.*.qty", "gt", json!(20)).evaluate(&record).unwrap());
        assert!(!simple("missing.*.qty", "gt", json!(0)).evaluate(&record).unwrap());
    }

    #[test]
    fn test_operand_from_path() {
        let record = json!({"a": 5, "b": "5"});
        let condition = Condition::Simple(SimpleCondition {
            subject: Subject::Path(Path::parse("a").unwrap()),
            operator: Operator::Equal,
            value: Operand::Path(Path::parse("b").unwrap()),
            similarity: SimilarityOptions::default(),
        });
        assert!(condition.evaluate(&record).unwrap());
    }

    #[test]
    fn test_composite_semantics() {
        let and = Condition::Composite(CompositeCondition {
            operator: LogicalOperator::And,
            conditions: vec![literal(true), literal(true), literal(false)],
        });
        let or = Condition::Composite(CompositeCondition {
            operator: LogicalOperator::Or,
            conditions: vec![literal(false), literal(false), literal(true)],
        });
        assert!(!and.evaluate(&json!({})).unwrap());
        assert!(or.evaluate(&json!({})).unwrap());
    }

    #[test]
    fn test_composite_propagates_operator_errors() {
        let or = Condition::Composite(CompositeCondition {
            operator: LogicalOperator::Or,
            conditions: vec![literal(true), simple("a", "between", json!(1))],
        });
        assert_eq!(
            or.evaluate(&json!({"a": 1})),
            Err(TransformError::UnknownOperator("between".to_string()))
        );
    }

    #[test]
    fn test_matches_value_ignores_condition_path() {
        let condition = simple("unrelated", "==", json!("kg"));
        assert!(condition.matches_value(&json!("KG"), &json!({})).unwrap());
        assert!(!condition.matches_value(&json!("ltr"), &json!({})).unwrap());
    }

    #[test]
    fn test_logical_operator_is_case_insensitive() {
        assert_eq!(LogicalOperator::from_name("AND"), Some(LogicalOperator::And));
        assert_eq!(LogicalOperator::from_name("Or"), Some(LogicalOperator::Or));
        assert_eq!(LogicalOperator::from_name("xor"), None);
    }

    #[test]
    fn test_display_summarises_condition() {
        let condition = Condition::Composite(CompositeCondition {
            operator: LogicalOperator::Or,
            conditions: vec![simple("vendor.name", "==", json!("acme")), Condition::Always],
        });
        assert_eq!(condition.to_string(), "(vendor.name == \"acme\" or always)");
    }
}
