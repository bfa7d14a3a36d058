//! Date helpers
//!
//! All dates are read and written in UTC. Input may be RFC 3339, one of a
//! handful of common day-first or year-first layouts, or unix seconds.

use super::{Args, FunctionRegistry};
use crate::value::{as_f64, as_text, is_empty};
use crate::TransformResult;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Datelike, Duration as ChronoDuration, NaiveDate, NaiveDateTime};
use serde_json::Value;

const DEFAULT_FORMAT: &str = "%Y-%m-%d";
const MONTHS_PER_YEAR: i64 = 12;
/// Wider than any date chrono can represent
const MAX_DAYS: f64 = 1e9;

const DATETIME_LAYOUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_LAYOUTS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
];

pub(super) fn register(registry: &mut FunctionRegistry) {
    registry
        .register("date_format", date_format)
        .register("date_add_days", date_add_days)
        .register("date_diff", date_diff);
}

/// Parse a date or datetime, `None` when no known layout fits
pub fn parse_datetime(value: &Value) -> Option<NaiveDateTime> {
    if let Value::Number(_) = value {
        let seconds = as_f64(value)? as i64;
        return DateTime::from_timestamp(seconds, 0).map(|dt| dt.naive_utc());
    }

    let text = as_text(value)?;
    let text = text.trim();

    if let Ok(dt) = text.parse::<DateTime<chrono::FixedOffset>>() {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = text.parse::<NaiveDateTime>() {
        return Some(dt);
    }
    for layout in DATETIME_LAYOUTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, layout) {
            return Some(dt);
        }
    }
    for layout in DATE_LAYOUTS {
        if let Ok(date) = NaiveDate::parse_from_str(text, layout) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    if text.chars().all(|c| c.is_ascii_digit()) {
        let seconds: i64 = text.parse().ok()?;
        return DateTime::from_timestamp(seconds, 0).map(|dt| dt.naive_utc());
    }
    None
}

/// Format with a strftime pattern, rejecting patterns chrono cannot render
fn format_datetime(datetime: &NaiveDateTime, format: &str, args: &Args) -> TransformResult<String> {
    let items: Vec<Item> = StrftimeItems::new(format).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(args.error(format!("invalid date format '{}'", format)));
    }
    Ok(datetime.format_with_items(items.into_iter()).to_string())
}

fn date_format(current: &Value, args: &[Value]) -> TransformResult<Value> {
    let args = Args::new("date_format", args);
    let format = args.string_or(0, DEFAULT_FORMAT);
    map_dates(current, &|value| {
        if is_empty(value) {
            return Ok(Value::from(""));
        }
        let datetime = parse_datetime(value)
            .ok_or_else(|| args.error(format!("unrecognised date {}", value)))?;
        format_datetime(&datetime, &format, &args).map(Value::from)
    })
}

fn date_add_days(current: &Value, args: &[Value]) -> TransformResult<Value> {
    let args = Args::new("date_add_days", args);
    let days = args.number_or(0, "days", 0.0)?;
    if !days.is_finite() || days.abs() > MAX_DAYS {
        return Err(args.error("days out of range"));
    }
    let days = days as i64;
    let days = match args.string_or(1, "add").to_lowercase().as_str() {
        "add" => days,
        "subtract" | "sub" => -days,
        other => return Err(args.error(format!("unknown operator '{}'", other))),
    };
    let format = args.string_or(2, DEFAULT_FORMAT);

    map_dates(current, &|value| {
        let datetime = parse_datetime(value)
            .ok_or_else(|| args.error(format!("unrecognised date {}", value)))?;
        let shifted = datetime
            .checked_add_signed(
                ChronoDuration::try_days(days).ok_or_else(|| args.error("days out of range"))?,
            )
            .ok_or_else(|| args.error("date overflow"))?;
        format_datetime(&shifted, &format, &args).map(Value::from)
    })
}

fn date_diff(current: &Value, args: &[Value]) -> TransformResult<Value> {
    let args = Args::new("date_diff", args);
    let end = args.required(0, "end")?;
    let period = args.string_or(1, "d");

    let start = parse_datetime(current)
        .ok_or_else(|| args.error(format!("unrecognised date {}", current)))?;
    let end = parse_datetime(end).ok_or_else(|| args.error(format!("unrecognised date {}", end)))?;
    let (earlier, later) = if start <= end { (start, end) } else { (end, start) };
    let elapsed = later - earlier;

    let difference = match period.as_str() {
        "y" => whole_months(&earlier, &later) / MONTHS_PER_YEAR,
        "m" => whole_months(&earlier, &later),
        "d" => elapsed.num_days(),
        "h" => elapsed.num_hours(),
        "i" => elapsed.num_minutes(),
        "s" => elapsed.num_seconds(),
        other => return Err(args.error(format!("unknown period '{}'", other))),
    };
    Ok(Value::from(difference))
}

/// Complete calendar months from `earlier` to `later`
fn whole_months(earlier: &NaiveDateTime, later: &NaiveDateTime) -> i64 {
    let mut months = (i64::from(later.year()) - i64::from(earlier.year())) * MONTHS_PER_YEAR
        + i64::from(later.month())
        - i64::from(earlier.month());
    if (later.day(), later.time()) < (earlier.day(), earlier.time()) {
        months -= 1;
    }
    months.max(0)
}

fn map_dates<F>(value: &Value, f: &F) -> TransformResult<Value>
where
    F: Fn(&Value) -> TransformResult<Value>,
{
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| map_dates(item, f))
            .collect::<TransformResult<Vec<_>>>()
            .map(Value::Array),
        other => f(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TransformError;
    use serde_json::json;

    fn call(name: &str, current: Value, args: Value) -> TransformResult<Value> {
        let registry = FunctionRegistry::with_builtins();
        let function = registry.get(name).unwrap();
        function(&current, args.as_array().unwrap())
    }

    #[test]
    fn test_parse_common_layouts() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        for input in ["2024-03-05", "05/03/2024", "05.03.2024", "5 March 2024", "Mar 5, 2024"] {
            assert_eq!(parse_datetime(&json!(input)), Some(expected), "{}", input);
        }
        assert_eq!(parse_datetime(&json!("not a date")), None);
    }

    #[test]
    fn test_parse_unix_seconds() {
        let parsed = parse_datetime(&json!(86400)).unwrap();
        assert_eq!(parsed.date(), NaiveDate::from_ymd_opt(1970, 1, 2).unwrap());
    }

    #[test]
    fn test_date_format() {
        assert_eq!(
            call("date_format", json!("2024-03-05T10:30:00Z"), json!(["%d/%m/%Y %H:%M"])).unwrap(),
            json!("05/03/2024 10:30")
        );
        assert_eq!(call("date_format", json!("05/03/2024"), json!([])).unwrap(), json!("2024-03-05"));
        assert_eq!(call("date_format", json!(""), json!([])).unwrap(), json!(""));
        assert_eq!(
            call("date_format", json!(["2024-03-05", ""]), json!(["%Y"])).unwrap(),
            json!(["2024", ""])
        );
    }

    #[test]
    fn test_date_format_errors() {
        assert!(matches!(
            call("date_format", json!("someday"), json!([])),
            Err(TransformError::Function { .. })
        ));
        assert!(matches!(
            call("date_format", json!("2024-03-05"), json!(["%Q"])),
            Err(TransformError::Function { .. })
        ));
    }

    #[test]
    fn test_date_add_days() {
        assert_eq!(
            call("date_add_days", json!("2024-02-27"), json!([3])).unwrap(),
            json!("2024-03-01")
        );
        assert_eq!(
            call("date_add_days", json!("2024-03-01"), json!([1, "subtract"])).unwrap(),
            json!("2024-02-29")
        );
    }

    #[test]
    fn test_date_add_days_out_of_range() {
        for days in [json!(1e18), json!(-1e18), json!(5_000_000_000i64), json!(1e9)] {
            assert!(matches!(
                call("date_add_days", json!("2024-01-01"), json!([days])),
                Err(TransformError::Function { .. })
            ));
        }
    }

    #[test]
    fn test_date_diff() {
        assert_eq!(
            call("date_diff", json!("2024-01-01"), json!(["2024-03-01"])).unwrap(),
            json!(60)
        );
        assert_eq!(
            call("date_diff", json!("2024-03-01"), json!(["2024-01-01", "m"])).unwrap(),
            json!(2)
        );
        assert_eq!(
            call("date_diff", json!("2020-06-15"), json!(["2024-06-14", "y"])).unwrap(),
            json!(3)
        );
        assert_eq!(
            call("date_diff", json!("2024-01-01 00:00:00"), json!(["2024-01-01 02:30:00", "i"]))
                .unwrap(),
            json!(150)
        );
    }
}
