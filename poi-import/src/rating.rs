//! Rating parsing
//!
//! Turns whatever a source file calls "ratings" into an ordered list of
//! finite decimals:
//! - delimited text: a braced comma list, `"{3.0,4.0,5.0}"`
//! - structured text: an array of numbers (or numeric strings), `[2, 3, 1]`
//! - markup: plain comma-joined text, `"1,1,3,1"`
//!
//! Bad tokens never fail the record. [`try_parse`] returns `None` for them
//! and the caller skips the token. Decimals keep the source precision, so the
//! average is not subject to binary float drift.

use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;
use std::str::FromStr;
use tracing::trace;

/// Decimal places kept on the average rating
pub const AVERAGE_DECIMAL_PLACES: u32 = 2;

/// Loosely typed rating value as it arrives from a source row
#[derive(Debug, Clone, PartialEq)]
pub enum RatingValue {
    /// Field absent or null
    Missing,
    /// Textual form, optionally braced: `"{3,4,5}"`, `"3, 4, 5"`, `"7.75"`
    Text(String),
    /// Single numeric scalar
    Number(Decimal),
    /// Sequence of values, each parsed on its own
    List(Vec<RatingValue>),
}

impl From<&str> for RatingValue {
    fn from(text: &str) -> Self {
        RatingValue::Text(text.to_string())
    }
}

impl From<String> for RatingValue {
    fn from(text: String) -> Self {
        RatingValue::Text(text)
    }
}

impl From<Decimal> for RatingValue {
    fn from(value: Decimal) -> Self {
        RatingValue::Number(value)
    }
}

impl From<i64> for RatingValue {
    fn from(value: i64) -> Self {
        RatingValue::Number(Decimal::from(value))
    }
}

impl From<f64> for RatingValue {
    /// Converted through the shortest round-trip text form, so `7.5` becomes
    /// exactly `7.5`. Non-finite floats become [`RatingValue::Missing`].
    fn from(value: f64) -> Self {
        if !value.is_finite() {
            return RatingValue::Missing;
        }
        match try_parse(&value.to_string()) {
            Some(decimal) => RatingValue::Number(decimal),
            None => RatingValue::Missing,
        }
    }
}

impl<T: Into<RatingValue>> From<Option<T>> for RatingValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(RatingValue::Missing)
    }
}

impl<T: Into<RatingValue>> From<Vec<T>> for RatingValue {
    fn from(values: Vec<T>) -> Self {
        RatingValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl From<&Value> for RatingValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => RatingValue::Missing,
            Value::String(text) => RatingValue::Text(text.clone()),
            // serde_json prints numbers in their source form ("2.0", "3")
            Value::Number(number) => match try_parse(&number.to_string()) {
                Some(decimal) => RatingValue::Number(decimal),
                None => RatingValue::Missing,
            },
            Value::Array(items) => RatingValue::List(items.iter().map(RatingValue::from).collect()),
            // Booleans and objects carry no rating
            Value::Bool(_) | Value::Object(_) => RatingValue::Missing,
        }
    }
}

/// Parse a single token into a finite decimal
///
/// Surrounding whitespace is ignored. Returns `None` for empty, non-numeric
/// and non-finite tokens (`NaN`, `Infinity`); `Decimal` has no representation
/// for the latter, so they can never slip through.
pub fn try_parse(token: &str) -> Option<Decimal> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }

    let parsed = Decimal::from_str(token).ok().or_else(|| {
        if token.contains(['e', 'E']) {
            Decimal::from_scientific(token).ok()
        } else {
            None
        }
    });

    if parsed.is_none() {
        trace!(token, "Dropping non-numeric rating token");
    }
    parsed
}

/// Normalize a rating value into an ordered list of decimals
///
/// Order and duplicates are preserved. Nested lists inside a list are not
/// flattened; such elements are dropped like any other unparseable token.
pub fn parse_ratings(raw: &RatingValue) -> Vec<Decimal> {
    match raw {
        RatingValue::Missing => Vec::new(),
        RatingValue::Number(value) => vec![*value],
        RatingValue::Text(text) => parse_text(text),
        RatingValue::List(items) => items
            .iter()
            .filter_map(|item| match item {
                RatingValue::Number(value) => Some(*value),
                RatingValue::Text(text) => try_parse(text),
                RatingValue::Missing | RatingValue::List(_) => None,
            })
            .collect(),
    }
}

/// Split textual ratings on commas after removing one pair of outer braces
fn parse_text(text: &str) -> Vec<Decimal> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let inner = strip_braces(trimmed);
    inner.split(',').filter_map(try_parse).collect()
}

fn strip_braces(text: &str) -> &str {
    text.strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
        .unwrap_or(text)
}

/// Arithmetic mean rounded to two decimal places, `None` for no ratings
///
/// Half-way cases round to even. Returns `None` (and logs) in the
/// practically unreachable case of a sum overflowing `Decimal`.
pub fn average(ratings: &[Decimal]) -> Option<Decimal> {
    if ratings.is_empty() {
        return None;
    }

    let mut sum = Decimal::ZERO;
    for rating in ratings {
        match sum.checked_add(*rating) {
            Some(total) => sum = total,
            None => {
                tracing::warn!(count = ratings.len(), "Rating sum overflowed, average dropped");
                return None;
            }
        }
    }

    let mean = sum.checked_div(Decimal::from(ratings.len()))?;
    Some(mean.round_dp_with_strategy(AVERAGE_DECIMAL_PLACES, RoundingStrategy::MidpointNearestEven))
}
