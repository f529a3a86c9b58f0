//! Condition comparers.
//!
//! A condition compares the row's current value for a field (`actual`, absent
//! when the column is missing) with the literal stored in the rule
//! (`expected`). Rows come from forms, so numbers and booleans frequently
//! arrive as text; comparisons are therefore *loose*:
//!
//! ```text
//! equality  : both numeric  -> numeric ==
//!             otherwise     -> canonical text ==   (null == "" == missing)
//! ordering  : both numeric  -> f64 order
//!             both dates    -> chronological
//!             otherwise     -> lexicographic text
//! text ops  : case-insensitive on the canonical text; arrays test members
//! ```
//!
//! A missing value is empty: the emptiness checks and `=` against an empty
//! literal hold for it. Negated comparers (`!=`, `not_contains`) are the
//! exact negation of their positive form, so they hold for a missing value
//! too. Every other comparison against a missing value is false.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::Value;
use std::cmp::Ordering;

/// A condition operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparer {
    Equals,
    NotEquals,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Contains,
    NotContains,
    BeginsWith,
    EndsWith,
    IsEmpty,
    IsNotEmpty,
    /// `expected` is a regular expression matched against the text form.
    Matches,
    Before,
    After,
    /// Same calendar day.
    On,
}

impl Comparer {
    /// Parse a persisted comparer key (symbolic or named form).
    pub fn parse(key: &str) -> Option<Self> {
        let comparer = match key.trim().to_ascii_lowercase().as_str() {
            "=" | "==" | "equals" | "equal" | "is" => Comparer::Equals,
            "!=" | "<>" | "not_equal" | "not_equals" | "is_not" => Comparer::NotEquals,
            "<" | "less" | "less_than" => Comparer::Less,
            "<=" | "less_or_equal" | "less_than_or_equal" => Comparer::LessOrEqual,
            ">" | "greater" | "greater_than" => Comparer::Greater,
            ">=" | "greater_or_equal" | "greater_than_or_equal" => Comparer::GreaterOrEqual,
            "contains" | "contain" => Comparer::Contains,
            "not_contains" | "not_contain" => Comparer::NotContains,
            "begins_with" | "starts_with" => Comparer::BeginsWith,
            "ends_with" => Comparer::EndsWith,
            "is_empty" | "is_null" => Comparer::IsEmpty,
            "is_not_empty" | "is_not_null" => Comparer::IsNotEmpty,
            "matches" | "regex" => Comparer::Matches,
            "before" | "before_date" => Comparer::Before,
            "after" | "after_date" => Comparer::After,
            "on" | "on_date" => Comparer::On,
            _ => return None,
        };
        Some(comparer)
    }

    /// Evaluate `actual <op> expected`. `pattern` is the compiled form of
    /// `expected` for [`Comparer::Matches`].
    pub fn evaluate(self, actual: Option<&Value>, expected: &Value, pattern: Option<&Regex>) -> bool {
        let present = actual.filter(|a| !is_empty_value(a));
        let actual_or_null = actual.unwrap_or(&Value::Null);

        match self {
            Comparer::IsEmpty => present.is_none(),
            Comparer::IsNotEmpty => present.is_some(),
            Comparer::Equals => loose_eq(actual_or_null, expected),
            Comparer::NotEquals => !loose_eq(actual_or_null, expected),
            Comparer::Less => present.is_some_and(|a| ordering(a, expected) == Some(Ordering::Less)),
            Comparer::LessOrEqual => {
                present.is_some_and(|a| matches!(ordering(a, expected), Some(Ordering::Less | Ordering::Equal)))
            }
            Comparer::Greater => present.is_some_and(|a| ordering(a, expected) == Some(Ordering::Greater)),
            Comparer::GreaterOrEqual => {
                present.is_some_and(|a| matches!(ordering(a, expected), Some(Ordering::Greater | Ordering::Equal)))
            }
            Comparer::Contains => present.is_some_and(|a| contains(a, expected)),
            Comparer::NotContains => !present.is_some_and(|a| contains(a, expected)),
            Comparer::BeginsWith => {
                present.and_then(|a| text_pair(a, expected)).is_some_and(|(a, e)| a.starts_with(&e))
            }
            Comparer::EndsWith => present.and_then(|a| text_pair(a, expected)).is_some_and(|(a, e)| a.ends_with(&e)),
            Comparer::Matches => {
                pattern.zip(present.and_then(value_text)).is_some_and(|(re, text)| re.is_match(&text))
            }
            Comparer::Before => present.and_then(|a| dates(a, expected)).is_some_and(|(a, e)| a < e),
            Comparer::After => present.and_then(|a| dates(a, expected)).is_some_and(|(a, e)| a > e),
            Comparer::On => present.and_then(|a| dates(a, expected)).is_some_and(|(a, e)| a.date() == e.date()),
        }
    }
}

/// Canonical text of a scalar: integral floats lose their `.0`, `null` has none.
pub(crate) fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => Some(format!("{}", f as i64)),
            _ => Some(n.to_string()),
        },
        other => Some(other.to_string()),
    }
}

/// Numeric reading of a number or numeric string.
pub(crate) fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// `null`, `""` (after trimming), `[]` and `{}` are empty.
pub(crate) fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Read a date or date-time: RFC 3339, `YYYY-MM-DD HH:MM:SS`,
/// `YYYY-MM-DDTHH:MM:SS` or a bare `YYYY-MM-DD` (midnight).
pub(crate) fn parse_datetime(value: &Value) -> Option<NaiveDateTime> {
    let text = value.as_str()?.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok().and_then(|d| d.and_hms_opt(0, 0, 0))
}

pub(crate) fn loose_eq(actual: &Value, expected: &Value) -> bool {
    if is_empty_value(actual) && is_empty_value(expected) {
        return true;
    }
    if let (Some(a), Some(e)) = (as_number(actual), as_number(expected)) {
        return a == e;
    }
    match (value_text(actual), value_text(expected)) {
        (Some(a), Some(e)) => a == e,
        _ => false,
    }
}

fn ordering(actual: &Value, expected: &Value) -> Option<Ordering> {
    if let (Some(a), Some(e)) = (as_number(actual), as_number(expected)) {
        return a.partial_cmp(&e);
    }
    if let Some((a, e)) = dates(actual, expected) {
        return Some(a.cmp(&e));
    }
    Some(value_text(actual)?.cmp(&value_text(expected)?))
}

fn dates(actual: &Value, expected: &Value) -> Option<(NaiveDateTime, NaiveDateTime)> {
    Some((parse_datetime(actual)?, parse_datetime(expected)?))
}

/// Lowercased canonical texts of both sides.
fn text_pair(actual: &Value, expected: &Value) -> Option<(String, String)> {
    Some((value_text(actual)?.to_lowercase(), value_text(expected)?.to_lowercase()))
}

fn contains(actual: &Value, expected: &Value) -> bool {
    match actual {
        Value::Array(items) => items.iter().any(|item| loose_eq(item, expected)),
        _ => text_pair(actual, expected).is_some_and(|(a, e)| a.contains(&e)),
    }
}
