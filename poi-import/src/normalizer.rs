//! Per-format mapping of raw rows onto [`CanonicalRecord`]
//!
//! | canonical   | delimited       | structured                | markup       |
//! |-------------|-----------------|---------------------------|--------------|
//! | external_id | `poi_id`        | `id`                      | `pid`        |
//! | name        | `poi_name`      | `name`                    | `pname`      |
//! | category    | `poi_category`  | `category`                | `pcategory`  |
//! | latitude    | `poi_latitude`  | `coordinates.latitude`    | `platitude`  |
//! | longitude   | `poi_longitude` | `coordinates.longitude`   | `plongitude` |
//! | ratings     | `poi_ratings`   | `ratings`                 | `pratings`   |
//!
//! Structured rows may also carry `coordinates` as a positional `[lat, lon]`
//! array.

use crate::error::ImportResult;
use crate::rating::{parse_ratings, RatingValue};
use crate::record::{CanonicalRecord, RawRow};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, trace};

/// Source key for each canonical field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMap {
    pub external_id: &'static str,
    pub name: &'static str,
    pub category: &'static str,
    pub latitude: &'static str,
    pub longitude: &'static str,
    pub ratings: &'static str,
}

/// Delimited-text column names
pub const DELIMITED_FIELDS: FieldMap = FieldMap {
    external_id: "poi_id",
    name: "poi_name",
    category: "poi_category",
    latitude: "poi_latitude",
    longitude: "poi_longitude",
    ratings: "poi_ratings",
};

/// Structured-text keys; `latitude`/`longitude` live under [`COORDINATES_KEY`]
pub const STRUCTURED_FIELDS: FieldMap = FieldMap {
    external_id: "id",
    name: "name",
    category: "category",
    latitude: "latitude",
    longitude: "longitude",
    ratings: "ratings",
};

/// Structured-text key holding the coordinate object or `[lat, lon]` pair
pub const COORDINATES_KEY: &str = "coordinates";

/// Markup element names (matched lower-cased)
pub const MARKUP_FIELDS: FieldMap = FieldMap {
    external_id: "pid",
    name: "pname",
    category: "pcategory",
    latitude: "platitude",
    longitude: "plongitude",
    ratings: "pratings",
};

/// Map a raw row onto the canonical schema
///
/// Returns `None` for rows without a usable external identifier; such rows
/// are skipped, not reported as errors.
pub fn normalize(row: &RawRow) -> Option<CanonicalRecord> {
    let record = match row {
        RawRow::Delimited(cells) => normalize_cells(cells, &DELIMITED_FIELDS),
        RawRow::Structured(object) => normalize_structured(object),
        RawRow::Markup(elements) => normalize_cells(elements, &MARKUP_FIELDS),
    };

    if record.is_none() {
        trace!(format = %row.format(), "Skipping row without external identifier");
    }
    record
}

/// Normalize loosely typed fields tagged with a format name
///
/// An unknown tag is a caller bug and fails with
/// [`ImportError::UnsupportedFormat`](crate::error::ImportError::UnsupportedFormat);
/// an invalid row is `Ok(None)`.
pub fn normalize_tagged(
    tag: &str,
    fields: Map<String, Value>,
) -> ImportResult<Option<CanonicalRecord>> {
    let row = RawRow::from_tagged(tag, fields)?;
    Ok(normalize(&row))
}

/// Shared mapping for the text-keyed formats (delimited and markup)
fn normalize_cells(cells: &HashMap<String, String>, fields: &FieldMap) -> Option<CanonicalRecord> {
    let text = |key: &str| cells.get(key).map(String::as_str).unwrap_or("");

    let ratings = match cells.get(fields.ratings) {
        Some(cell) => RatingValue::Text(cell.clone()),
        None => RatingValue::Missing,
    };

    CanonicalRecord::new(
        text(fields.external_id),
        text(fields.name),
        text(fields.category),
        parse_coordinate(text(fields.latitude)),
        parse_coordinate(text(fields.longitude)),
        parse_ratings(&ratings),
    )
}

fn normalize_structured(object: &Map<String, Value>) -> Option<CanonicalRecord> {
    let fields = &STRUCTURED_FIELDS;
    let (latitude, longitude) = structured_coordinates(object.get(COORDINATES_KEY), fields);

    let ratings = object
        .get(fields.ratings)
        .map(RatingValue::from)
        .unwrap_or(RatingValue::Missing);

    CanonicalRecord::new(
        &scalar_text(object.get(fields.external_id)),
        &scalar_text(object.get(fields.name)),
        &scalar_text(object.get(fields.category)),
        latitude,
        longitude,
        parse_ratings(&ratings),
    )
}

/// Keyed `{latitude, longitude}` object or positional `[lat, lon]` pair
fn structured_coordinates(value: Option<&Value>, fields: &FieldMap) -> (Option<f64>, Option<f64>) {
    match value {
        Some(Value::Object(coords)) => (
            coordinate_value(coords.get(fields.latitude)),
            coordinate_value(coords.get(fields.longitude)),
        ),
        Some(Value::Array(pair)) => (coordinate_value(pair.first()), coordinate_value(pair.get(1))),
        _ => (None, None),
    }
}

fn coordinate_value(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(number) => number.as_f64().filter(|v| v.is_finite()),
        Value::String(text) => parse_coordinate(text),
        _ => None,
    }
}

/// Parse coordinate text; empty, unparseable and non-finite values are absent
fn parse_coordinate(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    match text.parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        _ => {
            debug!(value = text, "Ignoring unparseable coordinate");
            None
        }
    }
}

/// Text of a string or number; anything else counts as absent
fn scalar_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        _ => String::new(),
    }
}
