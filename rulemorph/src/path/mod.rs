//! Dotted path addressing into nested documents
//!
//! A path is a sequence of segments separated by `.`. Each segment is either a
//! literal key (an object key, or an index when the container is an array) or
//! the wildcard `*`, which fans out over every index of the array at that
//! position. Reading through a wildcard yields one value per index, in index
//! order; writing through a wildcard either broadcasts a scalar to every index
//! or writes element `i` of a list at index `i`.

use crate::{TransformError, TransformResult};
use pest::Parser;
use pest_derive::Parser;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

#[derive(Parser)]
#[grammar = "src/path/path.pest"]
struct PathParser;

/// One step of a path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Key(String),
    Wildcard,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) => write!(f, "{}", key),
            Segment::Wildcard => write!(f, "*"),
        }
    }
}

/// A parsed dotted path. The empty path addresses the record itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    pub fn parse(text: &str) -> TransformResult<Self> {
        let pairs = PathParser::parse(Rule::path, text).map_err(|e| TransformError::InvalidPath {
            path: text.to_string(),
            message: e.variant.message().to_string(),
        })?;

        let mut segments = Vec::new();
        for pair in pairs.flatten() {
            match pair.as_rule() {
                Rule::wildcard => segments.push(Segment::Wildcard),
                Rule::key => segments.push(Segment::Key(pair.as_str().to_string())),
                _ => {}
            }
        }
        Ok(Self { segments })
    }

    /// The path addressing the record itself
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn has_wildcard(&self) -> bool {
        self.segments.contains(&Segment::Wildcard)
    }

    /// Replace the first wildcard with a literal index.
    ///
    /// Used when writing the result computed for element `index` of a
    /// wildcard read, so that parallel arrays stay aligned.
    pub fn with_index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        if let Some(slot) = segments.iter_mut().find(|s| **s == Segment::Wildcard) {
            *slot = Segment::Key(index.to_string());
        }
        Self { segments }
    }
}

impl FromStr for Path {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

/// The result of reading a path
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    /// No wildcard was expanded
    Single(Value),
    /// A wildcard expanded over an array: one value per index
    Many(Vec<Value>),
}

impl Resolved {
    pub fn is_many(&self) -> bool {
        matches!(self, Resolved::Many(_))
    }

    /// Collapse into one value, an expansion becomes an array
    pub fn into_value(self) -> Value {
        match self {
            Resolved::Single(value) => value,
            Resolved::Many(values) => Value::Array(values),
        }
    }

    /// The value aligned with wildcard index `index`.
    ///
    /// An expansion or a single list yields its element at `index`, or null
    /// past its end. Any other single value is shared by every index.
    pub fn aligned(&self, index: usize) -> Value {
        match self {
            Resolved::Single(Value::Array(values)) | Resolved::Many(values) => {
                values.get(index).cloned().unwrap_or(Value::Null)
            }
            Resolved::Single(value) => value.clone(),
        }
    }
}

/// Read the value(s) at `path`. Missing paths resolve to null, never an error.
pub fn get(document: &Value, path: &Path) -> Resolved {
    resolve(document, path.segments())
}

fn resolve(value: &Value, segments: &[Segment]) -> Resolved {
    match segments.split_first() {
        None => Resolved::Single(value.clone()),
        Some((Segment::Wildcard, rest)) => match value {
            Value::Array(items) => Resolved::Many(
                items
                    .iter()
                    .map(|item| resolve(item, rest).into_value())
                    .collect(),
            ),
            _ => Resolved::Single(Value::Null),
        },
        Some((Segment::Key(key), rest)) => match child(value, key) {
            Some(next) => resolve(next, rest),
            None => Resolved::Single(Value::Null),
        },
    }
}

fn child<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

/// Write `value` at `path`.
///
/// Missing intermediate objects are created. A wildcard only targets indices
/// that already exist: a list value is written element-wise, anything else is
/// broadcast to every index. Null only replaces keys that already exist; a
/// null aimed at a missing key or through a scalar is dropped.
pub fn set(document: &mut Value, path: &Path, value: Value) {
    assign(document, path.segments(), value);
}

fn assign(target: &mut Value, segments: &[Segment], value: Value) {
    let Some((first, rest)) = segments.split_first() else {
        *target = value;
        return;
    };

    match first {
        Segment::Wildcard => {
            let Value::Array(items) = target else {
                return;
            };
            match value {
                Value::Array(values) => {
                    for (item, element) in items.iter_mut().zip(values) {
                        assign(item, rest, element);
                    }
                }
                scalar => {
                    for item in items.iter_mut() {
                        assign(item, rest, scalar.clone());
                    }
                }
            }
        }
        Segment::Key(key) => {
            // Null never creates structure, so writing back a read is a no-op
            if value.is_null() && child(target, key).is_none() {
                return;
            }
            if let Value::Array(items) = target {
                if let Some(item) = key.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
                    assign(item, rest, value);
                }
                return;
            }
            if !target.is_object() {
                *target = Value::Object(Map::new());
            }
            let Value::Object(map) = target else {
                return;
            };
            if !map.contains_key(key) && rest.first() == Some(&Segment::Wildcard) {
                return;
            }
            let entry = map.entry(key.clone()).or_insert(Value::Null);
            assign(entry, rest, value);
        }
    }
}

/// Remove the key or index at `path`; absent targets are ignored.
pub fn delete(document: &mut Value, path: &Path) {
    remove(document, path.segments());
}

fn remove(target: &mut Value, segments: &[Segment]) {
    match segments {
        [] => *target = Value::Null,
        [Segment::Wildcard] => {
            if let Value::Array(items) = target {
                items.clear();
            }
        }
        [Segment::Key(key)] => match target {
            Value::Object(map) => {
                map.shift_remove(key);
            }
            Value::Array(items) => {
                if let Some(index) = key.parse::<usize>().ok().filter(|i| *i < items.len()) {
                    items.remove(index);
                }
            }
            _ => {}
        },
        [Segment::Wildcard, rest @ ..] => {
            if let Value::Array(items) = target {
                for item in items.iter_mut() {
                    remove(item, rest);
                }
            }
        }
        [Segment::Key(key), rest @ ..] => {
            let next = match target {
                Value::Object(map) => map.get_mut(key.as_str()),
                Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
                _ => None,
            };
            if let Some(next) = next {
                remove(next, rest);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(text: &str) -> Path {
        Path::parse(text).unwrap()
    }

    #[test]
    fn test_parse_segments() {
        let p = path("items.*.unit price");
        assert_eq!(
            p.segments(),
            &[
                Segment::Key("items".to_string()),
                Segment::Wildcard,
                Segment::Key("unit price".to_string()),
            ]
        );
        assert!(p.has_wildcard());
        assert_eq!(p.to_string(), "items.*.unit price");
    }

    #[test]
    fn test_parse_root_and_errors() {
        assert!(path("").is_root());
        assert!(Path::parse("a..b").is_err());
        assert!(Path::parse("a.").is_err());
        assert!(Path::parse(".a").is_err());
        assert_eq!(path("a*b").segments(), &[Segment::Key("a*b".to_string())]);
    }

    #[test]
    fn test_with_index_replaces_first_wildcard() {
        assert_eq!(path("a.*.b.*").with_index(3).to_string(), "a.3.b.*");
        assert_eq!(path("a.b").with_index(3).to_string(), "a.b");
    }

    #[test]
    fn test_get_missing_is_null() {
        let doc = json!({"a": {"b": 1}});
        assert_eq!(get(&doc, &path("a.c.d")), Resolved::Single(Value::Null));
        assert_eq!(get(&doc, &path("a.b.*")), Resolved::Single(Value::Null));
    }

    #[test]
    fn test_get_array_index() {
        let doc = json!({"items": [{"price": 1}, {"price": 2}]});
        assert_eq!(get(&doc, &path("items.1.price")), Resolved::Single(json!(2)));
    }

    #[test]
    fn test_wildcard_alignment() {
        let mut doc = json!({"items": [{"price": 1}, {"price": 2}]});
        let p = path("items.*.price");
        assert_eq!(get(&doc, &p), Resolved::Many(vec![json!(1), json!(2)]));

        set(&mut doc, &p, json!(9));
        assert_eq!(get(&doc, &p), Resolved::Many(vec![json!(9), json!(9)]));

        set(&mut doc, &p, json!([5, 6]));
        assert_eq!(get(&doc, &p), Resolved::Many(vec![json!(5), json!(6)]));
    }

    #[test]
    fn test_nested_wildcards() {
        let doc = json!({"orders": [{"items": [{"q": 1}, {"q": 2}]}, {"items": [{"q": 3}]}]});
        assert_eq!(
            get(&doc, &path("orders.*.items.*.q")),
            Resolved::Many(vec![json!([1, 2]), json!([3])])
        );
    }

    #[test]
    fn test_set_creates_intermediate_objects() {
        let mut doc = json!({"a": 1});
        set(&mut doc, &path("b.c.d"), json!("x"));
        assert_eq!(doc, json!({"a": 1, "b": {"c": {"d": "x"}}}));
    }

    #[test]
    fn test_set_list_without_wildcard_writes_whole_list() {
        let mut doc = json!({});
        set(&mut doc, &path("tags"), json!(["a", "b"]));
        assert_eq!(doc, json!({"tags": ["a", "b"]}));
    }

    #[test]
    fn test_wildcard_write_does_not_create_arrays() {
        let mut doc = json!({"a": 1});
        set(&mut doc, &path("items.*.price"), json!(3));
        assert_eq!(doc, json!({"a": 1}));

        let mut doc = json!({"items": []});
        set(&mut doc, &path("items.0"), json!(3));
        assert_eq!(doc, json!({"items": []}));
    }

    #[test]
    fn test_null_does_not_create_structure() {
        let mut doc = json!({"a": 1});
        let value = get(&doc, &path("a.b")).into_value();
        set(&mut doc, &path("a.b"), value);
        assert_eq!(doc, json!({"a": 1}));

        set(&mut doc, &path("missing"), Value::Null);
        assert_eq!(doc, json!({"a": 1}));

        let mut doc = json!({"a": 1, "items": [{"p": 1}, {}]});
        set(&mut doc, &path("a"), Value::Null);
        set(&mut doc, &path("items.*.p"), Value::Null);
        assert_eq!(doc, json!({"a": null, "items": [{"p": null}, {}]}));
    }

    #[test]
    fn test_set_root_replaces_record() {
        let mut doc = json!({"a": 1});
        set(&mut doc, &Path::root(), json!([{"a": 1}, {"a": 2}]));
        assert_eq!(doc, json!([{"a": 1}, {"a": 2}]));
    }

    #[test]
    fn test_delete() {
        let mut doc = json!({"a": 1, "b": 2, "items": [{"x": 1, "y": 2}, {"x": 3}]});
        delete(&mut doc, &path("a"));
        delete(&mut doc, &path("missing.key"));
        delete(&mut doc, &path("items.*.x"));
        assert_eq!(doc, json!({"b": 2, "items": [{"y": 2}, {}]}));

        delete(&mut doc, &path("items.0"));
        assert_eq!(doc, json!({"b": 2, "items": [{}]}));

        delete(&mut doc, &path("items.*"));
        assert_eq!(doc, json!({"b": 2, "items": []}));
    }

    #[test]
    fn test_delete_preserves_key_order() {
        let mut doc = json!({"a": 1, "b": 2, "c": 3});
        delete(&mut doc, &path("a"));
        let keys: Vec<_> = doc.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["b", "c"]);
    }
}
