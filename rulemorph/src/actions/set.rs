use super::{apply_writes, plan_writes, ValueSource};
use crate::conditions::Condition;
use crate::path::{Path, Resolved};
use crate::value::mapping_key;
use crate::TransformResult;
use serde_json::{Map, Value};

/// One entry of a Set action's `conditionalValue` list
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalValue {
    pub condition: Condition,
    /// A literal or a `valueFromField` path; never [`ValueSource::Current`]
    pub value: ValueSource,
}

/// Assign a value, chosen by mapping, by conditions, or directly.
///
/// Precedence per element: a `valueMapping` entry keyed by the value to
/// set (or, outside a wildcard, by the value being replaced); otherwise the
/// last matching `conditionalValue` entry (the current value stays when none
/// match); otherwise the value to set itself. Inside a wildcard a list value
/// contributes its element at the iteration index.
#[derive(Debug, Clone, PartialEq)]
pub struct SetAction {
    pub path: Path,
    pub target: Path,
    pub value: ValueSource,
    pub mapping: Map<String, Value>,
    pub conditional: Vec<ConditionalValue>,
}

impl SetAction {
    pub fn execute(&self, record: &mut Value) -> TransformResult<()> {
        let writes = self.plan(record)?;
        apply_writes(record, writes);
        Ok(())
    }

    fn plan(&self, record: &Value) -> TransformResult<Vec<(Path, Value)>> {
        let value_to_set = self.value.resolve(record);
        let conditional_sources: Vec<Option<Resolved>> = self
            .conditional
            .iter()
            .map(|entry| entry.value.resolve(record))
            .collect();

        plan_writes(record, &self.path, &self.target, |current, index| {
            let candidate = match (&value_to_set, index) {
                (None, _) => current.clone(),
                (Some(resolved), Some(index)) => resolved.aligned(index),
                (Some(resolved), None) => resolved.clone().into_value(),
            };
            self.choose(candidate, current, record, index, &conditional_sources)
        })
    }

    fn choose(
        &self,
        candidate: Value,
        current: &Value,
        record: &Value,
        index: Option<usize>,
        conditional_sources: &[Option<Resolved>],
    ) -> TransformResult<Value> {
        let lookup = |value: &Value| mapping_key(value).and_then(|key| self.mapping.get(&key));
        // Outside a wildcard the value being replaced is a mapping key too
        let mapped = lookup(&candidate).or_else(|| index.is_none().then(|| lookup(current)).flatten());
        if let Some(mapped) = mapped {
            return Ok(mapped.clone());
        }

        if self.conditional.is_empty() {
            return Ok(candidate);
        }

        let mut chosen = current.clone();
        for (entry, source) in self.conditional.iter().zip(conditional_sources) {
            if !entry.condition.matches_value(current, record)? {
                continue;
            }
            chosen = match (source, index) {
                (Some(resolved), Some(index)) => resolved.aligned(index),
                (Some(resolved), None) => resolved.clone().into_value(),
                (None, _) => current.clone(),
            };
        }
        Ok(chosen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::{Operand, Operator, SimilarityOptions, SimpleCondition, Subject};
    use serde_json::json;

    fn set(path: &str, value: ValueSource) -> SetAction {
        SetAction {
            path: Path::parse(path).unwrap(),
            target: Path::parse(path).unwrap(),
            value,
            mapping: Map::new(),
            conditional: Vec::new(),
        }
    }

    fn equals(value: Value) -> Condition {
        Condition::Simple(SimpleCondition {
            subject: Subject::Literal(Value::Null),
            operator: Operator::Equal,
            value: Operand::Literal(value),
            similarity: SimilarityOptions::default(),
        })
    }

    #[test]
    fn test_literal_broadcast_over_wildcard() {
        let mut record = json!({"items": [{"p": 1}, {"p": 2}]});
        set("items.*.p", ValueSource::Literal(json!(9))).execute(&mut record).unwrap();
        assert_eq!(record, json!({"items": [{"p": 9}, {"p": 9}]}));
    }

    #[test]
    fn test_value_from_field_aligns_by_index() {
        let mut record = json!({"items": [{"a": 1, "b": "x"}, {"a": 2, "b": "y"}]});
        let mut action = set("items.*.a", ValueSource::Field(Path::parse("items.*.b").unwrap()));
        action.target = Path::parse("items.*.c").unwrap();
        action.execute(&mut record).unwrap();
        assert_eq!(
            record,
            json!({"items": [{"a": 1, "b": "x", "c": "x"}, {"a": 2, "b": "y", "c": "y"}]})
        );
    }

    #[test]
    fn test_list_operand_aligns_by_index() {
        let mut record = json!({"codes": ["a", "b"], "items": [{"n": 1}, {"n": 1}]});
        set("items.*.code", ValueSource::Field(Path::parse("codes").unwrap()))
            .execute(&mut record)
            .unwrap();
        assert_eq!(record["items"], json!([{"n": 1, "code": "a"}, {"n": 1, "code": "b"}]));

        let mut record = json!({"items": [{}, {}, {}]});
        set("items.*.tag", ValueSource::Literal(json!(["x", "y"])))
            .execute(&mut record)
            .unwrap();
        assert_eq!(record["items"], json!([{"tag": "x"}, {"tag": "y"}, {}]));
    }

    #[test]
    fn test_mapping_uses_current_value_without_literal() {
        let mut record = json!({"unit": "KG", "other": "pcs"});
        let mut action = set("unit", ValueSource::Current);
        action.mapping = json!({"KG": "kilogram"}).as_object().unwrap().clone();
        action.execute(&mut record).unwrap();
        assert_eq!(record["unit"], json!("kilogram"));

        let mut action = set("other", ValueSource::Current);
        action.mapping = json!({"KG": "kilogram"}).as_object().unwrap().clone();
        action.execute(&mut record).unwrap();
        assert_eq!(record["other"], json!("pcs"));
    }

    #[test]
    fn test_mapping_keyed_by_replaced_value_outside_wildcards() {
        let mut record = json!({"unit": "ctn", "items": [{"u": "ctn"}]});
        let mut action = set("unit", ValueSource::Literal(json!("box")));
        action.mapping = json!({"ctn": "carton"}).as_object().unwrap().clone();
        action.execute(&mut record).unwrap();
        assert_eq!(record["unit"], json!("carton"));

        let mut action = set("items.*.u", ValueSource::Literal(json!("box")));
        action.mapping = json!({"ctn": "carton"}).as_object().unwrap().clone();
        action.execute(&mut record).unwrap();
        assert_eq!(record["items"][0]["u"], json!("box"));
    }

    #[test]
    fn test_mapping_wins_over_conditional_value() {
        let mut record = json!({"unit": "kg"});
        let mut action = set("unit", ValueSource::Current);
        action.mapping = json!({"kg": "mapped"}).as_object().unwrap().clone();
        action.conditional = vec![ConditionalValue {
            condition: Condition::Always,
            value: ValueSource::Literal(json!("conditional")),
        }];
        action.execute(&mut record).unwrap();
        assert_eq!(record["unit"], json!("mapped"));
    }

    #[test]
    fn test_conditional_value_last_match_wins() {
        let mut record = json!({"items": [{"u": "kg"}, {"u": "ltr"}, {"u": "pcs"}]});
        let mut action = set("items.*.u", ValueSource::Current);
        action.conditional = vec![
            ConditionalValue {
                condition: equals(json!("kg")),
                value: ValueSource::Literal(json!("weight")),
            },
            ConditionalValue {
                condition: equals(json!("ltr")),
                value: ValueSource::Literal(json!("volume")),
            },
            ConditionalValue {
                condition: equals(json!("kg")),
                value: ValueSource::Literal(json!("mass")),
            },
        ];
        action.execute(&mut record).unwrap();
        assert_eq!(
            record,
            json!({"items": [{"u": "mass"}, {"u": "volume"}, {"u": "pcs"}]})
        );
    }

    #[test]
    fn test_conditional_value_from_field() {
        let mut record = json!({"items": [{"u": "kg", "alt": "A"}, {"u": "x", "alt": "B"}]});
        let mut action = set("items.*.u", ValueSource::Current);
        action.conditional = vec![ConditionalValue {
            condition: equals(json!("kg")),
            value: ValueSource::Field(Path::parse("items.*.alt").unwrap()),
        }];
        action.execute(&mut record).unwrap();
        assert_eq!(record["items"][0]["u"], json!("A"));
        assert_eq!(record["items"][1]["u"], json!("x"));
    }

    #[test]
    fn test_set_list_without_wildcard_writes_whole_list() {
        let mut record = json!({});
        set("tags", ValueSource::Literal(json!(["a", "b"]))).execute(&mut record).unwrap();
        assert_eq!(record, json!({"tags": ["a", "b"]}));
    }
}
