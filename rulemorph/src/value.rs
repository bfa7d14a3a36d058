//! Loose value semantics shared by conditions, actions and the reconciler
//!
//! Documents come from upstream extraction and rarely carry clean types: a
//! quantity may arrive as `"3"`, a flag as `0`, a missing price as `""`. The
//! helpers here give those values one consistent reading.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde_json::{Number, Value};
use std::cmp::Ordering;
use std::str::FromStr;

/// Whether a value counts as empty: null, false, zero, `""`, `"0"`, `[]` or `{}`
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

pub fn is_truthy(value: &Value) -> bool {
    !is_empty(value)
}

/// Lower-case text and collapse every whitespace run to a single space
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Normalize a comparison operand; only strings are affected
pub fn normalize(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(normalize_text(s)),
        other => other.clone(),
    }
}

/// Read a value as a float, accepting numeric strings
pub fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Read a value as a decimal, accepting numeric strings
pub fn to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => parse_decimal(&n.to_string()).or_else(|| n.as_f64().and_then(Decimal::from_f64)),
        Value::String(s) => parse_decimal(s.trim()),
        _ => None,
    }
}

pub fn parse_decimal(text: &str) -> Option<Decimal> {
    if text.is_empty() {
        return None;
    }
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

/// Convert a decimal back into a JSON number, integral results become integers
pub fn from_decimal(decimal: Decimal) -> Value {
    let decimal = decimal.normalize();
    if decimal.fract().is_zero() {
        if let Some(i) = decimal.to_i64() {
            return Value::from(i);
        }
    }
    decimal
        .to_f64()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Render a scalar as text; containers have no text form
pub fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("1".to_string()),
        Value::Bool(false) | Value::Null => Some(String::new()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Key used to look a value up in a string-keyed mapping
pub fn mapping_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Equality after type juggling: numeric strings equal numbers, booleans
/// compare by truthiness and null equals any empty scalar.
pub fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Null, Value::String(s)) | (Value::String(s), Value::Null) => s.is_empty(),
        (Value::Null, other) | (other, Value::Null) => is_empty(other),
        (Value::Bool(b), other) | (other, Value::Bool(b)) => *b == is_truthy(other),
        (Value::Number(_), Value::Number(_)) => as_f64(left) == as_f64(right),
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            match as_f64(&Value::String(s.clone())) {
                Some(f) => n.as_f64() == Some(f),
                None => n.to_string() == *s,
            }
        }
        (Value::String(l), Value::String(r)) => match (as_f64(left), as_f64(right)) {
            (Some(x), Some(y)) => x == y,
            _ => l == r,
        },
        (Value::Array(l), Value::Array(r)) => {
            l.len() == r.len() && l.iter().zip(r).all(|(a, b)| loose_eq(a, b))
        }
        (Value::Object(l), Value::Object(r)) => {
            l.len() == r.len()
                && l
                    .iter()
                    .all(|(key, value)| r.get(key).is_some_and(|other| loose_eq(value, other)))
        }
        _ => false,
    }
}

/// Ordering after type juggling, `None` when the operands are not comparable
pub fn loose_cmp(left: &Value, right: &Value) -> Option<Ordering> {
    if let (Some(l), Some(r)) = (as_f64(left), as_f64(right)) {
        return l.partial_cmp(&r);
    }
    match (left, right) {
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        (Value::Number(n), Value::String(s)) => Some(n.to_string().as_str().cmp(s.as_str())),
        (Value::String(s), Value::Number(n)) => Some(s.as_str().cmp(n.to_string().as_str())),
        (Value::Null | Value::Bool(_), _) | (_, Value::Null | Value::Bool(_)) => {
            Some(is_truthy(left).cmp(&is_truthy(right)))
        }
        _ => None,
    }
}
