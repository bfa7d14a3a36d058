//! Comparison operators for simple conditions
//!
//! String operands are lower-cased and whitespace-collapsed before any
//! operator runs; numbers, booleans and containers are compared as given.

use super::similarity::{similarity, SimilarityMethod};
use crate::value::{as_text, is_truthy, loose_cmp, loose_eq, normalize};
use crate::{TransformError, TransformResult};
use regex::{Regex, RegexBuilder};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

/// Threshold used by `similar_to` when a condition does not configure one
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 80.0;

/// Comparison operators
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Contains,
    NotContains,
    Exists,
    NotExists,
    Regex,
    In,
    NotIn,
    InListAll,
    NotInListAll,
    InListAny,
    NotInListAny,
    True,
    False,
    Like,
    SimilarTo,
    /// Kept from the configuration so the failure surfaces when the rule runs
    Unsupported(String),
}

impl Operator {
    pub fn from_name(name: &str) -> Self {
        match normalize_operator(name).as_str() {
            "==" => Operator::Equal,
            "!=" => Operator::NotEqual,
            "gt" => Operator::GreaterThan,
            "gte" => Operator::GreaterThanOrEqual,
            "lt" => Operator::LessThan,
            "lte" => Operator::LessThanOrEqual,
            "contains" => Operator::Contains,
            "not contains" => Operator::NotContains,
            "exists" => Operator::Exists,
            "not exists" => Operator::NotExists,
            "regex" => Operator::Regex,
            "in" => Operator::In,
            "not in" => Operator::NotIn,
            "in list all" => Operator::InListAll,
            "not in list all" => Operator::NotInListAll,
            "in list any" => Operator::InListAny,
            "not in list any" => Operator::NotInListAny,
            "true" => Operator::True,
            "false" => Operator::False,
            "like" => Operator::Like,
            "similar_to" => Operator::SimilarTo,
            _ => Operator::Unsupported(name.to_string()),
        }
    }

    /// The operator as written in rule configurations
    pub fn name(&self) -> &str {
        match self {
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::GreaterThan => "gt",
            Operator::GreaterThanOrEqual => "gte",
            Operator::LessThan => "lt",
            Operator::LessThanOrEqual => "lte",
            Operator::Contains => "contains",
            Operator::NotContains => "not contains",
            Operator::Exists => "exists",
            Operator::NotExists => "not exists",
            Operator::Regex => "regex",
            Operator::In => "in",
            Operator::NotIn => "not in",
            Operator::InListAll => "in list all",
            Operator::NotInListAll => "not in list all",
            Operator::InListAny => "in list any",
            Operator::NotInListAny => "not in list any",
            Operator::True => "true",
            Operator::False => "false",
            Operator::Like => "like",
            Operator::SimilarTo => "similar_to",
            Operator::Unsupported(name) => name,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn normalize_operator(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Options for the `similar_to` operator
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SimilarityOptions {
    /// Minimum score (0-100); [`DEFAULT_SIMILARITY_THRESHOLD`] when unset
    pub threshold: Option<f64>,
    /// Compare sorted tokens instead of raw strings
    pub tokenize: bool,
}

/// Compare a subject against a value with the given operator.
///
/// Both sides are normalised (whitespace collapsed, lower-cased) first, except
/// a `regex` pattern, which is used as written against the lower-cased
/// subject. Patterns should be lower-case or carry the `/i` flag.
///
/// # Examples
/// ```text
/// "Fresh  MILK" contains "milk"        = true
/// ["", 0, null] exists                 = false
/// "1 crate of milk" in list any [crate] = true
/// 10 gte "9"                           = true
/// ```
pub fn compare(
    subject: &Value,
    operator: &Operator,
    value: &Value,
    options: SimilarityOptions,
) -> TransformResult<bool> {
    let raw_value = value;
    let subject = normalize(subject);
    let value = normalize(value);

    let result = match operator {
        Operator::Equal => loose_eq(&subject, &value),
        Operator::NotEqual => !loose_eq(&subject, &value),
        Operator::GreaterThan => loose_cmp(&subject, &value) == Some(Ordering::Greater),
        Operator::GreaterThanOrEqual => matches!(
            loose_cmp(&subject, &value),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        Operator::LessThan => loose_cmp(&subject, &value) == Some(Ordering::Less),
        Operator::LessThanOrEqual => matches!(
            loose_cmp(&subject, &value),
            Some(Ordering::Less | Ordering::Equal)
        ),
        Operator::Contains => contains(&subject, &value),
        Operator::NotContains => !contains(&subject, &value),
        Operator::Exists => exists(&subject),
        Operator::NotExists => !exists(&subject),
        Operator::Regex => {
            // Pattern case is kept; only the subject was lower-cased
            let pattern = as_text(raw_value).unwrap_or_default();
            match as_text(&subject) {
                Some(text) => compile_pattern(&pattern)?.is_match(&text),
                None => false,
            }
        }
        Operator::In => members(&value).iter().any(|m| loose_eq(&subject, m)),
        Operator::NotIn => !members(&value).iter().any(|m| loose_eq(&subject, m)),
        Operator::InListAll => {
            let matched = list_matches(&subject, &value)?;
            matched.iter().all(|m| *m)
        }
        Operator::InListAny => list_matches(&subject, &value)?.contains(&true),
        Operator::NotInListAll | Operator::NotInListAny => {
            !list_matches(&subject, &value)?.contains(&true)
        }
        Operator::True => subject == Value::Bool(true),
        Operator::False => subject == Value::Bool(false),
        Operator::Like => {
            let pattern = as_text(&value).unwrap_or_default();
            match as_text(&subject) {
                Some(text) => like_pattern(&pattern)?.is_match(&text),
                None => false,
            }
        }
        Operator::SimilarTo => {
            let (Some(left), Some(right)) = (as_text(&subject), as_text(&value)) else {
                return Ok(false);
            };
            let method = if options.tokenize {
                SimilarityMethod::TokenSortPartialRatio
            } else {
                SimilarityMethod::PartialRatio
            };
            let threshold = options.threshold.unwrap_or(DEFAULT_SIMILARITY_THRESHOLD);
            f64::from(similarity(&left, &right, method)) >= threshold
        }
        Operator::Unsupported(name) => {
            return Err(TransformError::UnknownOperator(name.clone()));
        }
    };

    Ok(result)
}

fn contains(subject: &Value, value: &Value) -> bool {
    if !is_truthy(subject) || !is_truthy(value) {
        return false;
    }
    match (as_text(subject), as_text(value)) {
        (Some(haystack), Some(needle)) => haystack.contains(&needle),
        _ => false,
    }
}

/// Arrays drop their falsy elements first; integer zero counts as present
fn exists(subject: &Value) -> bool {
    let subject = match subject {
        Value::Array(items) => {
            Value::Array(items.iter().filter(|v| is_truthy(v)).cloned().collect())
        }
        other => other.clone(),
    };
    let is_integer_zero = subject.is_i64() && subject.as_i64() == Some(0);
    is_integer_zero || is_truthy(&subject)
}

/// The comparison value coerced to a list of normalized members
fn members(value: &Value) -> Vec<Value> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().map(normalize).collect(),
        Value::Object(map) => map.values().map(normalize).collect(),
        scalar => vec![scalar.clone()],
    }
}

/// For every list entry, whether it occurs in the subject (case-insensitive)
fn list_matches(subject: &Value, value: &Value) -> TransformResult<Vec<bool>> {
    let haystack = as_text(subject).unwrap_or_default();
    let entries: Vec<String> = match value {
        Value::Array(items) => items.iter().filter_map(as_text).collect(),
        other => as_text(other).into_iter().collect(),
    };

    entries
        .iter()
        .map(|entry| {
            let literal = regex::escape(&decode_entities(entry));
            RegexBuilder::new(&literal)
                .case_insensitive(true)
                .build()
                .map(|re| re.is_match(&haystack))
                .map_err(|e| TransformError::InvalidPattern {
                    pattern: entry.clone(),
                    message: e.to_string(),
                })
        })
        .collect()
}

/// Compile a regex, accepting `/pattern/flags` delimiters
pub(crate) fn compile_pattern(pattern: &str) -> TransformResult<Regex> {
    let (body, flags) = split_delimiters(pattern);
    let mut builder = RegexBuilder::new(body);
    for flag in flags.chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'x' => builder.ignore_whitespace(true),
            'u' => builder.unicode(true),
            _ => &mut builder,
        };
    }
    builder.build().map_err(|e| TransformError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

fn split_delimiters(pattern: &str) -> (&str, &str) {
    if let Some(rest) = pattern.strip_prefix('/') {
        if let Some(end) = rest.rfind('/') {
            let flags = &rest[end + 1..];
            if flags.chars().all(|c| c.is_ascii_alphabetic()) {
                return (&rest[..end], flags);
            }
        }
    }
    (pattern, "")
}

/// SQL-style pattern: `%` matches any run of characters, all else is literal
fn like_pattern(pattern: &str) -> TransformResult<Regex> {
    let body = pattern
        .split('%')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&body).map_err(|e| TransformError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

/// Decode the HTML entities that extraction tools commonly leave behind
pub(crate) fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#039;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn check(subject: Value, operator: &str, value: Value) -> bool {
        compare(
            &subject,
            &Operator::from_name(operator),
            &value,
            SimilarityOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_operator_names_round_trip() {
        for name in ["==", "gte", "not  contains", "In List Any", "similar_to"] {
            let op = Operator::from_name(name);
            assert!(!matches!(op, Operator::Unsupported(_)), "{}", name);
            assert_eq!(Operator::from_name(op.name()), op);
        }
        assert_eq!(
            Operator::from_name("between"),
            Operator::Unsupported("between".to_string())
        );
    }

    #[test]
    fn test_equality_normalizes_strings() {
        assert!(check(json!("  Fresh   MILK "), "==", json!("fresh milk")));
        assert!(check(json!("5"), "==", json!(5)));
        assert!(check(json!("a"), "!=", json!("b")));
    }

    #[test]
    fn test_ordering() {
        assert!(check(json!(10), "gt", json!("9")));
        assert!(check(json!(10), "gte", json!(10)));
        assert!(check(json!(1.5), "lt", json!(2)));
        assert!(check(json!("2"), "lte", json!(2)));
        assert!(!check(json!([1]), "lt", json!(2)));
    }

    #[test]
    fn test_contains_requires_non_empty_operands() {
        assert!(check(json!("Fresh Milk 500ML"), "contains", json!("milk")));
        assert!(!check(json!(""), "contains", json!("")));
        assert!(!check(json!("milk"), "contains", json!("")));
        assert!(check(json!("milk"), "not contains", json!("")));
        assert!(check(json!("milk"), "not contains", json!("bread")));
    }

    #[test]
    fn test_exists() {
        assert!(check(json!(0), "exists", json!(null)));
        assert!(check(json!("x"), "exists", json!(null)));
        assert!(!check(json!(""), "exists", json!(null)));
        assert!(!check(json!(null), "exists", json!(null)));
        assert!(!check(json!(["", 0, null]), "exists", json!(null)));
        assert!(check(json!(["", "a"]), "exists", json!(null)));
        assert!(check(json!([]), "not exists", json!(null)));
    }

    #[test]
    fn test_regex_with_delimiters() {
        assert!(check(json!("INV-2024-001"), "regex", json!("/^inv-\\d{4}/")));
        assert!(check(json!("INV-2024-001"), "regex", json!("/^INV/i")));
        assert!(!check(json!("INV-2024-001"), "regex", json!("^INV")));
        assert!(check(json!("abc"), "regex", json!("^a.c$")));
        assert!(!check(json!("abc"), "regex", json!("^b")));
    }

    #[test]
    fn test_regex_pattern_case_is_kept() {
        assert!(check(json!("INV-7"), "regex", json!("/^INV/i")));
        assert!(check(json!("INV-7"), "regex", json!("/^inv/")));
        assert!(!check(json!("INV-7"), "regex", json!("/^INV/")));
    }

    #[test]
    fn test_invalid_regex_is_an_error() {
        let result = compare(
            &json!("abc"),
            &Operator::Regex,
            &json!("(unclosed"),
            SimilarityOptions::default(),
        );
        assert!(matches!(result, Err(TransformError::InvalidPattern { .. })));
    }

    #[test]
    fn test_membership() {
        assert!(check(json!("Kg"), "in", json!(["KG", "ltr"])));
        assert!(check(json!(3), "in", json!(["1", "3"])));
        assert!(check(json!("pcs"), "not in", json!(["kg", "ltr"])));
        assert!(check(json!("kg"), "in", json!("kg")));
        assert!(!check(json!("kg"), "in", json!(null)));
    }

    #[test]
    fn test_list_operators() {
        let subject = json!("Milk & Bread (2 pcs)");
        assert!(check(subject.clone(), "in list all", json!(["milk", "bread"])));
        assert!(!check(subject.clone(), "in list all", json!(["milk", "eggs"])));
        assert!(check(subject.clone(), "in list any", json!(["eggs", "(2 pcs)"])));
        assert!(check(subject.clone(), "in list any", json!(["milk &amp; bread"])));
        assert!(check(subject.clone(), "not in list any", json!(["eggs", "butter"])));
        assert!(!check(subject.clone(), "not in list any", json!(["eggs", "milk"])));
        assert!(check(subject.clone(), "not in list all", json!(["eggs", "butter"])));
        assert!(check(subject, "in list any", json!("bread")));
    }

    #[test]
    fn test_boolean_identity() {
        assert!(check(json!(true), "true", json!(null)));
        assert!(!check(json!(1), "true", json!(null)));
        assert!(check(json!(false), "false", json!(null)));
        assert!(!check(json!(0), "false", json!(null)));
    }

    #[test]
    fn test_like() {
        assert!(check(json!("Invoice 42"), "like", json!("invoice%")));
        assert!(check(json!("a.b"), "like", json!("a.b")));
        assert!(!check(json!("axb"), "like", json!("a.b")));
    }

    #[test]
    fn test_similar_to() {
        let strict = SimilarityOptions {
            threshold: Some(90.0),
            tokenize: false,
        };
        assert!(compare(&json!("fresh milk 1l"), &Operator::SimilarTo, &json!("Fresh Milk"), strict).unwrap());
        assert!(!compare(&json!("bread"), &Operator::SimilarTo, &json!("milk"), strict).unwrap());

        let tokenized = SimilarityOptions {
            threshold: Some(100.0),
            tokenize: true,
        };
        assert!(compare(&json!("milk fresh"), &Operator::SimilarTo, &json!("fresh milk"), tokenized).unwrap());
    }

    #[test]
    fn test_unknown_operator_fails() {
        let result = compare(
            &json!(1),
            &Operator::from_name("between"),
            &json!(2),
            SimilarityOptions::default(),
        );
        assert_eq!(
            result,
            Err(TransformError::UnknownOperator("between".to_string()))
        );
    }
}
