//! String helpers
//!
//! Every helper here descends into arrays and objects and leaves non-string
//! scalars untouched, so the same function works on a single field and on a
//! wildcard-free path that points at a whole list.

use super::{collapse_whitespace, map_strings, Args, FunctionRegistry};
use crate::conditions::operators::{compile_pattern, decode_entities};
use crate::value::{as_text, from_decimal, mapping_key, to_decimal};
use crate::TransformResult;
use regex::RegexBuilder;
use rust_decimal::RoundingStrategy;
use serde_json::Value;
use std::collections::HashSet;

pub(super) fn register(registry: &mut FunctionRegistry) {
    registry
        .register("lower", |current, _| {
            map_strings(current, &|s: &str| Ok(Value::from(s.to_lowercase())))
        })
        .register("upper", |current, _| {
            map_strings(current, &|s: &str| Ok(Value::from(s.to_uppercase())))
        })
        .register("trim", |current, _| {
            map_strings(current, &|s: &str| Ok(Value::from(s.trim())))
        })
        .register("round", round)
        .register("str_replace", str_replace)
        .register("regex_replace", regex_replace)
        .register("explode", explode)
        .register("concat", concat)
        .register("prepend", prepend)
        .register("append", append)
        .register("remove_repeated_words", |current, _| {
            map_strings(current, &|s: &str| Ok(Value::from(remove_repeated_words(s))))
        })
        .register("dictionary_mapper", dictionary_mapper)
        .register("regex_mapper", regex_mapper);
}

fn round(current: &Value, args: &[Value]) -> TransformResult<Value> {
    let args = Args::new("round", args);
    let places = args.number_or(0, "places", 0.0)?;
    if places < 0.0 {
        return Err(args.error("places must not be negative"));
    }
    Ok(round_value(current, places as u32))
}

fn round_value(value: &Value, places: u32) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(|v| round_value(v, places)).collect()),
        Value::Number(_) | Value::String(_) => match to_decimal(value) {
            Some(decimal) => from_decimal(
                decimal.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero),
            ),
            None => value.clone(),
        },
        other => other.clone(),
    }
}

fn str_replace(current: &Value, args: &[Value]) -> TransformResult<Value> {
    let args = Args::new("str_replace", args);
    let search = args.string(0, "search")?;
    let replacement = args.string_or(1, "");

    map_strings(current, &|subject: &str| {
        // Replacing "kg" with "kgs" must not turn "kgs" into "kgss"
        if !replacement.is_empty() && subject.contains(replacement.as_str()) {
            return Ok(Value::from(collapse_whitespace(subject)));
        }
        if search.is_empty() {
            return Ok(Value::from(collapse_whitespace(subject)));
        }
        Ok(Value::from(collapse_whitespace(
            &subject.replace(search.as_str(), &replacement),
        )))
    })
}

fn regex_replace(current: &Value, args: &[Value]) -> TransformResult<Value> {
    let args = Args::new("regex_replace", args);
    let pattern = args.string(0, "pattern")?;
    let replacement = args.string_or(1, "");
    let add_spacer = args.bool_or(2, true);
    let case_sensitive = args.bool_or(3, false);

    let regex = RegexBuilder::new(&pattern)
        .case_insensitive(!case_sensitive)
        .build()
        .map_err(|e| args.error(format!("invalid pattern '{}': {}", pattern, e)))?;
    let replacement = if add_spacer {
        format!(" {} ", replacement)
    } else {
        replacement
    };

    map_strings(current, &|subject: &str| {
        if !regex.is_match(subject) {
            return Ok(Value::from(subject));
        }
        let replaced = regex.replace_all(subject, replacement.as_str());
        Ok(Value::from(collapse_whitespace(&replaced)))
    })
}

fn explode(current: &Value, args: &[Value]) -> TransformResult<Value> {
    let args = Args::new("explode", args);
    let separator = args.string(0, "separator")?;
    if separator.is_empty() {
        return Err(args.error("separator must not be empty"));
    }
    Ok(split_value(current, &separator))
}

fn split_value(current: &Value, separator: &str) -> Value {
    match current {
        Value::String(s) => Value::Array(s.split(separator).map(Value::from).collect()),
        Value::Array(items) => {
            Value::Array(items.iter().map(|item| split_value(item, separator)).collect())
        }
        other => other.clone(),
    }
}

/// Join the textual parts, padding the separator with spaces
fn join_parts(parts: &[Value], separator: &str) -> String {
    let padded = format!(" {} ", separator);
    let texts: Vec<String> = parts
        .iter()
        .filter_map(part_text)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .collect();
    collapse_whitespace(&texts.join(&padded))
}

fn part_text(part: &Value) -> Option<String> {
    match part {
        Value::Array(items) => {
            let texts: Vec<String> = items.iter().filter_map(as_text).collect();
            Some(texts.join(" "))
        }
        other => as_text(other),
    }
}

fn concat(_current: &Value, args: &[Value]) -> TransformResult<Value> {
    let args = Args::new("concat", args);
    let parts = args.list(0, "parts")?;
    let separator = args.string_or(1, " ");
    Ok(Value::from(join_parts(parts, &separator)))
}

fn prepend(current: &Value, args: &[Value]) -> TransformResult<Value> {
    let args = Args::new("prepend", args);
    let parts = args.list(0, "parts")?;
    let separator = args.string_or(1, " ");
    let prefix = join_parts(parts, &separator);

    attach(current, &|text: &str| {
        collapse_whitespace(&format!("{} {} {}", prefix, separator, text))
    })
}

fn append(current: &Value, args: &[Value]) -> TransformResult<Value> {
    let args = Args::new("append", args);
    let parts = args.list(0, "parts")?;
    let separator = args.string_or(1, " ");
    let suffix = join_parts(parts, &separator);

    attach(current, &|text: &str| {
        collapse_whitespace(&format!("{} {} {}", text, separator, suffix))
    })
}

/// Apply `f` to a scalar's text, or to every element of a list
fn attach<F>(current: &Value, f: &F) -> TransformResult<Value>
where
    F: Fn(&str) -> String,
{
    match current {
        Value::Array(items) => items
            .iter()
            .map(|item| attach(item, f))
            .collect::<TransformResult<Vec<_>>>()
            .map(Value::Array),
        Value::Object(_) => Ok(current.clone()),
        other => Ok(Value::from(f(&as_text(other).unwrap_or_default()))),
    }
}

pub(crate) fn remove_repeated_words(text: &str) -> String {
    let mut seen = HashSet::new();
    let words: Vec<&str> = text
        .split(' ')
        .filter(|word| seen.insert(word.to_lowercase()))
        .collect();
    collapse_whitespace(&words.join(" "))
}

fn dictionary_mapper(current: &Value, args: &[Value]) -> TransformResult<Value> {
    let args = Args::new("dictionary_mapper", args);
    let mappings = args.object(0, "mappings")?;
    let lowered: Vec<(String, &Value)> = mappings
        .iter()
        .map(|(key, value)| (key.to_lowercase(), value))
        .collect();

    Ok(map_dictionary(current, &lowered))
}

fn map_dictionary(current: &Value, mappings: &[(String, &Value)]) -> Value {
    match current {
        Value::Array(items) => {
            Value::Array(items.iter().map(|item| map_dictionary(item, mappings)).collect())
        }
        other => {
            let Some(key) = mapping_key(other).map(|k| k.to_lowercase()) else {
                return other.clone();
            };
            mappings
                .iter()
                .find(|(candidate, _)| *candidate == key)
                .map(|(_, value)| (*value).clone())
                .unwrap_or_else(|| other.clone())
        }
    }
}

fn regex_mapper(current: &Value, args: &[Value]) -> TransformResult<Value> {
    let args = Args::new("regex_mapper", args);
    let mappings = args.object(0, "mappings")?;
    let case_sensitive = args.bool_or(1, false);

    let mut rules = Vec::with_capacity(mappings.len());
    for (pattern, replacement) in mappings {
        let decoded = decode_entities(pattern);
        let flags = if case_sensitive { "" } else { "i" };
        let regex = compile_pattern(&format!("/{}/{}", decoded, flags))?;
        rules.push((regex, as_text(replacement).unwrap_or_default()));
    }

    map_strings(current, &|subject: &str| {
        let mut text = subject.to_string();
        for (regex, replacement) in &rules {
            text = regex.replace_all(&text, replacement.as_str()).into_owned();
        }
        Ok(Value::from(collapse_whitespace(&text)))
    })
}
