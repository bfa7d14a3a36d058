//! Helpers over lists of records: lookups, sums, renames, sorting, reshaping,
//! and the numeric helpers that work on a whole line-item list at once.

use super::{Args, FunctionRegistry};
use crate::conditions::{compare, similarity, Operator, SimilarityMethod, SimilarityOptions};
use crate::path::{self, Path, Resolved};
use crate::reconcile::{reconcile_line_items, LineItemPaths};
use crate::units;
use crate::value::{as_f64, as_text, from_decimal, is_empty, to_decimal};
use crate::{TransformError, TransformResult};
use rust_decimal::Decimal;
use serde_json::{Map, Number, Value};
use std::cmp::Ordering;

const DEFAULT_THRESHOLD: f64 = 80.0;
const DEFAULT_MIN_SCORE: f64 = 50.0;

pub(super) fn register(registry: &mut FunctionRegistry) {
    registry
        .register("convert_unit", convert_unit)
        .register("fuzzy_extract_one", fuzzy_extract_one)
        .register("rename_keys", rename_keys)
        .register("remove_keys", remove_keys)
        .register("get", get)
        .register("sort_by_key", sort_by_key)
        .register("set_if", set_if)
        .register("sum_if", sum_if)
        .register("find", find)
        .register("flatten_and_expand", |current, _| Ok(flatten_and_expand(current)))
        .register("reconcile_quantities", reconcile_quantities);
}

fn float_value(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        return Value::from(value as i64);
    }
    Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
}

fn convert_unit(current: &Value, args: &[Value]) -> TransformResult<Value> {
    let args = Args::new("convert_unit", args);
    let table = units::parse_table(args.required(0, "table")?)?;
    let from = args.string(1, "from")?;
    let to = args.string(2, "to")?;
    let invert = args.bool_or(3, false);

    convert_each(current, &table, &from, &to, invert)
}

fn convert_each(
    current: &Value,
    table: &[units::Conversion],
    from: &str,
    to: &str,
    invert: bool,
) -> TransformResult<Value> {
    match current {
        Value::Array(items) => items
            .iter()
            .map(|item| convert_each(item, table, from, to, invert))
            .collect::<TransformResult<Vec<_>>>()
            .map(Value::Array),
        value if is_empty(value) => Ok(value.clone()),
        value => {
            let quantity =
                as_f64(value).ok_or_else(|| TransformError::not_numeric("convert_unit", value))?;
            Ok(float_value(units::convert(table, quantity, from, to, invert)))
        }
    }
}

fn fuzzy_extract_one(current: &Value, args: &[Value]) -> TransformResult<Value> {
    let args = Args::new("fuzzy_extract_one", args);
    let choices: Vec<String> = args.list(0, "choices")?.iter().filter_map(as_text).collect();
    let min_score = args.number_or(1, "min_score", DEFAULT_MIN_SCORE)?;
    let default = args.get(2).cloned().unwrap_or_else(|| Value::from(""));
    let method = match args.optional_string(3) {
        Some(name) => SimilarityMethod::from_name(&name)
            .ok_or_else(|| args.error(format!("unknown method '{}'", name)))?,
        None => SimilarityMethod::TokenSetRatio,
    };

    let extract = |query: &Value| -> Value {
        let Some(query) = as_text(query) else {
            return default.clone();
        };
        let mut best: Option<(&String, u8)> = None;
        for choice in &choices {
            let score = similarity(&query.to_lowercase(), &choice.to_lowercase(), method);
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((choice, score));
            }
        }
        match best {
            Some((choice, score)) if f64::from(score) >= min_score => Value::from(choice.as_str()),
            _ => default.clone(),
        }
    };

    Ok(match current {
        Value::Array(items) => Value::Array(items.iter().map(extract).collect()),
        other => extract(other),
    })
}

fn rename_keys(current: &Value, args: &[Value]) -> TransformResult<Value> {
    let args = Args::new("rename_keys", args);
    let key_map = args.object(0, "key_map")?;

    let rename = |object: &Map<String, Value>| -> Map<String, Value> {
        let mut object = object.clone();
        for (old, new) in key_map {
            let Some(new) = as_text(new) else { continue };
            if *old == new {
                continue;
            }
            if let Some(value) = object.shift_remove(old) {
                object.insert(new, value);
            }
        }
        object
    };

    Ok(match current {
        Value::Object(object) => Value::Object(rename(object)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| match item {
                    Value::Object(object) => Value::Object(rename(object)),
                    other => other.clone(),
                })
                .collect(),
        ),
        other => other.clone(),
    })
}

fn remove_keys(current: &Value, args: &[Value]) -> TransformResult<Value> {
    let args = Args::new("remove_keys", args);
    let keys: Vec<String> = args.list(0, "keys")?.iter().filter_map(as_text).collect();

    let remove = |object: &Map<String, Value>| -> Value {
        let mut object = object.clone();
        for key in &keys {
            object.shift_remove(key);
        }
        Value::Object(object)
    };

    Ok(match current {
        Value::Object(object) => remove(object),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| match item {
                    Value::Object(object) => remove(object),
                    other => other.clone(),
                })
                .collect(),
        ),
        other => other.clone(),
    })
}

/// A key of the current object, or a path into it; empty text when absent
fn get(current: &Value, args: &[Value]) -> TransformResult<Value> {
    let args = Args::new("get", args);
    let key = args.string(0, "key")?;
    if let Some(value) = current.as_object().and_then(|object| object.get(&key)) {
        return Ok(value.clone());
    }

    Ok(match path::get(current, &Path::parse(&key)?) {
        Resolved::Single(Value::Null) => Value::from(""),
        resolved => resolved.into_value(),
    })
}

/// Stable sort of a record list by one field, ascending unless `desc`.
///
/// Numbers (numeric text included) order before other text, which orders
/// before anything else. Records without the field keep their relative
/// order after the rest.
fn sort_by_key(current: &Value, args: &[Value]) -> TransformResult<Value> {
    let args = Args::new("sort_by_key", args);
    let key = args.string(0, "key")?;
    let descending = match args.string_or(1, "asc").to_lowercase().as_str() {
        "asc" => false,
        "desc" => true,
        other => return Err(args.error(format!("unknown direction '{}'", other))),
    };

    let Value::Array(items) = current else {
        return Ok(current.clone());
    };
    let field = |item: &Value| item.get(&key).filter(|value| !value.is_null()).cloned();

    let mut items = items.clone();
    items.sort_by(|a, b| match (field(a), field(b)) {
        (Some(a), Some(b)) if descending => order_values(&b, &a),
        (Some(a), Some(b)) => order_values(&a, &b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    Ok(Value::Array(items))
}

fn order_values(a: &Value, b: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match (as_f64(value), value) {
            (Some(_), _) => 0,
            (None, Value::String(_)) => 1,
            _ => 2,
        }
    }

    match (as_f64(a), as_f64(b)) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        _ => rank(a).cmp(&rank(b)).then_with(|| match (a, b) {
            (Value::String(x), Value::String(y)) => x.cmp(y),
            _ => a.to_string().cmp(&b.to_string()),
        }),
    }
}

/// Write `target_value` at `target_field` of every record matching the filter
fn set_if(current: &Value, args: &[Value]) -> TransformResult<Value> {
    let args = Args::new("set_if", args);
    let filter = Filter::from_args(&args, 5, None)?;
    let target = Path::parse(&args.string(3, "target_field")?)?;
    let value = args.get(4).cloned().unwrap_or(Value::Null);

    let mut current = current.clone();
    match &mut current {
        Value::Array(items) => {
            for item in items.iter_mut().filter(|item| item.is_object()) {
                if filter.matches(item)? {
                    path::set(item, &target, value.clone());
                }
            }
        }
        record @ Value::Object(_) => {
            if filter.matches(record)? {
                path::set(record, &target, value);
            }
        }
        _ => {}
    }
    Ok(current)
}

/// The `field, operator, value, threshold` filter shared by `sum_if`, `find`
/// and `set_if`
struct Filter {
    field: String,
    operator: Operator,
    value: Value,
    options: SimilarityOptions,
}

impl Filter {
    fn from_args(
        args: &Args,
        threshold_index: usize,
        tokenize_index: Option<usize>,
    ) -> TransformResult<Self> {
        Ok(Self {
            field: args.string(0, "field")?,
            operator: Operator::from_name(&args.string(1, "operator")?),
            value: args.get(2).cloned().unwrap_or(Value::Null),
            options: SimilarityOptions {
                threshold: Some(args.number_or(threshold_index, "threshold", DEFAULT_THRESHOLD)?),
                tokenize: tokenize_index.is_some_and(|index| args.bool_or(index, false)),
            },
        })
    }

    fn matches(&self, item: &Value) -> TransformResult<bool> {
        let subject = item.get(&self.field).unwrap_or(&Value::Null);
        compare(subject, &self.operator, &self.value, self.options)
    }
}

fn sum_if(current: &Value, args: &[Value]) -> TransformResult<Value> {
    let args = Args::new("sum_if", args);
    let filter = Filter::from_args(&args, 3, None)?;
    let sum_field = args.optional_string(4).unwrap_or_else(|| filter.field.clone());

    let mut sum = Decimal::ZERO;
    if let Value::Array(items) = current {
        for item in items.iter().filter(|item| item.is_object()) {
            if !filter.matches(item)? {
                continue;
            }
            let addend = item.get(&sum_field).unwrap_or(&Value::Null);
            if addend.is_null() {
                continue;
            }
            sum += to_decimal(addend).ok_or_else(|| TransformError::not_numeric("sum_if", addend))?;
        }
    }
    Ok(from_decimal(sum))
}

fn find(current: &Value, args: &[Value]) -> TransformResult<Value> {
    let args = Args::new("find", args);
    let filter = Filter::from_args(&args, 3, Some(4))?;
    let return_key = args.optional_string(5);
    find_in(current, &filter, return_key.as_deref())
}

/// First matching record of a list; a list of lists yields one result per inner list
fn find_in(current: &Value, filter: &Filter, return_key: Option<&str>) -> TransformResult<Value> {
    let Value::Array(items) = current else {
        return Ok(Value::Null);
    };
    let Some(first) = items.first() else {
        return Ok(Value::Null);
    };

    if first.get(&filter.field).is_some() {
        for item in items {
            if filter.matches(item)? {
                return Ok(match return_key {
                    Some(key) => item.get(key).cloned().unwrap_or(Value::Null),
                    None => item.clone(),
                });
            }
        }
        return Ok(Value::Null);
    }

    items
        .iter()
        .map(|item| find_in(item, filter, return_key))
        .collect::<TransformResult<Vec<_>>>()
        .map(Value::Array)
}

/// Flatten nested objects into dotted keys, then turn every list-valued key
/// into one record per element, each carrying the record's other fields.
pub fn flatten_and_expand(current: &Value) -> Value {
    match current {
        Value::Object(object) => {
            Value::Array(expand(&Value::Object(flatten(object, "")), None, &Map::new()))
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .flat_map(|item| match item {
                    Value::Object(object) => {
                        expand(&Value::Object(flatten(object, "")), None, &Map::new())
                    }
                    other => vec![other.clone()],
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

fn flatten(object: &Map<String, Value>, prefix: &str) -> Map<String, Value> {
    let mut flattened = Map::new();
    for (key, value) in object {
        let name = format!("{}{}", prefix, key);
        match value {
            Value::Object(inner) => flattened.extend(flatten(inner, &format!("{}.", name))),
            Value::Array(items) => {
                let items = items
                    .iter()
                    .map(|item| match item {
                        Value::Object(inner) => Value::Object(flatten(inner, "")),
                        other => other.clone(),
                    })
                    .collect();
                flattened.insert(name, Value::Array(items));
            }
            other => {
                flattened.insert(name, other.clone());
            }
        }
    }
    flattened
}

fn expand(data: &Value, prefix: Option<&str>, siblings: &Map<String, Value>) -> Vec<Value> {
    let key_for = |key: &str| match prefix {
        Some(prefix) => format!("{}.{}", prefix, key),
        None => key.to_string(),
    };

    match data {
        Value::Array(items) => items
            .iter()
            .flat_map(|item| expand(item, prefix, siblings))
            .collect(),
        Value::Object(object) => {
            let mut scalars = siblings.clone();
            let mut lists = Vec::new();
            for (key, value) in object {
                match value {
                    Value::Array(_) => lists.push((key_for(key), value)),
                    other => {
                        scalars.insert(key_for(key), other.clone());
                    }
                }
            }
            if lists.is_empty() {
                return vec![Value::Object(scalars)];
            }
            lists
                .into_iter()
                .flat_map(|(key, value)| expand(value, Some(&key), &scalars))
                .collect()
        }
        scalar => {
            let mut record = siblings.clone();
            record.insert(prefix.unwrap_or("value").to_string(), scalar.clone());
            vec![Value::Object(record)]
        }
    }
}

fn reconcile_quantities(current: &Value, args: &[Value]) -> TransformResult<Value> {
    let args = Args::new("reconcile_quantities", args);
    let paths = LineItemPaths {
        quantity: Path::parse(&args.string(0, "quantity_path")?)?,
        unit_price: Path::parse(&args.string(1, "unit_price_path")?)?,
        total_price: Path::parse(&args.string(2, "total_price_path")?)?,
    };
    let audit = args.bool_or(3, false);

    let mut items = current.clone();
    reconcile_line_items(&mut items, &paths, audit);
    Ok(items)
}
