//! Built-in transforms
//!
//! Every function here follows the same contract: input the resolved value
//! (`null` when the source path was absent) plus the call arguments, output
//! the replacement value. Recoverable oddities (unparsable numbers, bad date
//! patterns) return the input unchanged rather than raising.
//!
//! Copyright (c) 2025 Relaymap Team
//! Licensed under the Apache-2.0 license

use super::types::{is_truthy, value_to_text, TransformError, TransformFunction};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use chrono::format::{Item, StrftimeItems};
use regex::Regex;
use serde_json::{Number, Value};
use std::fmt::Write;
use std::sync::OnceLock;

/// Default pattern for `DATE_FORMAT` without arguments
pub const DEFAULT_DATE_PATTERN: &str = "%Y-%m-%d";

/// Name/function pairs registered by default
pub fn all() -> [(&'static str, TransformFunction); 7] {
    [
        ("UPPERCASE", uppercase),
        ("LOWERCASE", lowercase),
        ("TRIM", trim),
        ("REMOVE_PUNCTUATION", remove_punctuation),
        ("ROUND", round),
        ("DATE_FORMAT", date_format),
        ("DEFAULT", default),
    ]
}

fn map_text(value: &Value, f: impl FnOnce(&str) -> String) -> Value {
    if !is_truthy(value) {
        return value.clone();
    }
    Value::String(f(&value_to_text(value)))
}

/// `UPPERCASE`
pub fn uppercase(value: &Value, _args: &[String]) -> Result<Value, TransformError> {
    Ok(map_text(value, str::to_uppercase))
}

/// `LOWERCASE`
pub fn lowercase(value: &Value, _args: &[String]) -> Result<Value, TransformError> {
    Ok(map_text(value, str::to_lowercase))
}

/// `TRIM`
pub fn trim(value: &Value, _args: &[String]) -> Result<Value, TransformError> {
    Ok(map_text(value, |text| text.trim().to_string()))
}

fn punctuation() -> &'static Regex {
    static PUNCTUATION: OnceLock<Regex> = OnceLock::new();
    PUNCTUATION.get_or_init(|| Regex::new(r"[^\w\s]").expect("Valid regex pattern"))
}

/// `REMOVE_PUNCTUATION`: drop everything that is neither a word char nor whitespace
pub fn remove_punctuation(value: &Value, _args: &[String]) -> Result<Value, TransformError> {
    Ok(map_text(value, |text| punctuation().replace_all(text, "").into_owned()))
}

fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn round_to(x: f64, precision: i32) -> f64 {
    let factor = 10f64.powi(precision.saturating_abs());
    let rounded = if precision >= 0 {
        (x * factor).round_ties_even() / factor
    } else {
        (x / factor).round_ties_even() * factor
    };
    if rounded.is_finite() {
        rounded
    } else {
        x
    }
}

/// `ROUND(precision)`: numeric rounding, half to even, default precision 0
pub fn round(value: &Value, args: &[String]) -> Result<Value, TransformError> {
    let precision = match args.first() {
        Some(raw) => match raw.parse::<i32>() {
            Ok(precision) => precision,
            Err(_) => return Ok(value.clone()),
        },
        None => 0,
    };

    Ok(as_float(value)
        .and_then(|x| Number::from_f64(round_to(x, precision)))
        .map(Value::Number)
        .unwrap_or_else(|| value.clone()))
}

enum Timestamp {
    Zoned(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
}

const NAIVE_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const ZONED_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M%:z", "%Y-%m-%d %H:%M%:z"];

fn parse_iso(raw: &str) -> Option<Timestamp> {
    let normalized = raw.trim().replace('Z', "+00:00");

    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
        return Some(Timestamp::Zoned(dt));
    }
    for format in ZONED_DATETIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&normalized, format) {
            return Some(Timestamp::Zoned(dt));
        }
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&normalized, format) {
            return Some(Timestamp::Naive(dt));
        }
    }
    NaiveDate::parse_from_str(&normalized, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(Timestamp::Naive)
}

fn render(timestamp: &Timestamp, pattern: &str) -> Option<String> {
    let items: Vec<Item<'_>> = StrftimeItems::new(pattern).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return None;
    }

    // A Display error here means the pattern asked for something the
    // timestamp cannot provide (e.g. an offset on a naive time).
    let mut out = String::new();
    let written = match timestamp {
        Timestamp::Zoned(dt) => write!(out, "{}", dt.format_with_items(items.iter())),
        Timestamp::Naive(dt) => write!(out, "{}", dt.format_with_items(items.iter())),
    };
    written.ok().map(|_| out)
}

/// `DATE_FORMAT(pattern)`: reformat an ISO-8601 timestamp with a strftime pattern
pub fn date_format(value: &Value, args: &[String]) -> Result<Value, TransformError> {
    let pattern = args.first().map(String::as_str).unwrap_or(DEFAULT_DATE_PATTERN);

    let formatted = value
        .as_str()
        .and_then(parse_iso)
        .and_then(|timestamp| render(&timestamp, pattern));

    Ok(formatted.map(Value::String).unwrap_or_else(|| value.clone()))
}

/// `DEFAULT(fallback)`: keep truthy values, otherwise the fallback text
pub fn default(value: &Value, args: &[String]) -> Result<Value, TransformError> {
    if is_truthy(value) {
        return Ok(value.clone());
    }
    Ok(args
        .first()
        .map(|fallback| Value::String(fallback.clone()))
        .unwrap_or(Value::Null))
}
