//! Canonical record and raw per-format rows

use crate::error::{ImportError, ImportResult};
use crate::rating::average;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Source format of a raw row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    /// Delimited text (CSV)
    Delimited,
    /// Structured text (JSON)
    Structured,
    /// Markup (XML)
    Markup,
}

impl SourceFormat {
    /// Short tag used in logs and by loosely typed callers
    pub fn tag(self) -> &'static str {
        match self {
            SourceFormat::Delimited => "csv",
            SourceFormat::Structured => "json",
            SourceFormat::Markup => "xml",
        }
    }

    /// Pick the format from a file extension (case-insensitive)
    pub fn from_path(path: &Path) -> ImportResult<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();

        extension
            .parse()
            .map_err(|_| ImportError::UnsupportedFormat(format!(".{}", extension)))
    }
}

impl FromStr for SourceFormat {
    type Err = ImportError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(SourceFormat::Delimited),
            "json" => Ok(SourceFormat::Structured),
            "xml" => Ok(SourceFormat::Markup),
            other => Err(ImportError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One raw row as produced by a format reader
///
/// Each variant is mapped by its own function in
/// [`normalizer`](crate::normalizer), so adding a format forces a new mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRow {
    /// Column header → cell text
    Delimited(HashMap<String, String>),
    /// One JSON object
    Structured(Map<String, Value>),
    /// Lower-cased child element tag → trimmed text
    Markup(HashMap<String, String>),
}

impl RawRow {
    /// Format this row came from
    pub fn format(&self) -> SourceFormat {
        match self {
            RawRow::Delimited(_) => SourceFormat::Delimited,
            RawRow::Structured(_) => SourceFormat::Structured,
            RawRow::Markup(_) => SourceFormat::Markup,
        }
    }

    /// Build a row from a format tag and loosely typed fields
    ///
    /// Fails with [`ImportError::UnsupportedFormat`] for unknown tags. For the
    /// text-keyed formats, non-string scalars are rendered to text and nulls
    /// are dropped.
    pub fn from_tagged(tag: &str, fields: Map<String, Value>) -> ImportResult<Self> {
        let format: SourceFormat = tag.parse()?;
        Ok(match format {
            SourceFormat::Structured => RawRow::Structured(fields),
            SourceFormat::Delimited => RawRow::Delimited(text_fields(fields, false)),
            SourceFormat::Markup => RawRow::Markup(text_fields(fields, true)),
        })
    }
}

fn text_fields(fields: Map<String, Value>, lowercase_keys: bool) -> HashMap<String, String> {
    fields
        .into_iter()
        .filter_map(|(key, value)| {
            let text = match value {
                Value::Null => return None,
                Value::String(text) => text,
                other => other.to_string(),
            };
            let key = if lowercase_keys { key.to_lowercase() } else { key };
            Some((key, text))
        })
        .collect()
}

/// Format-independent representation of one point of interest
///
/// Fields are private so `avg_rating` can only come from `ratings`.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    external_id: String,
    name: String,
    category: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    ratings: Vec<Decimal>,
    avg_rating: Option<Decimal>,
}

impl CanonicalRecord {
    /// Build a record, trimming strings and deriving the average
    ///
    /// Returns `None` when the identifier is empty after trimming. Non-finite
    /// coordinates are stored as absent.
    pub fn new(
        external_id: &str,
        name: &str,
        category: &str,
        latitude: Option<f64>,
        longitude: Option<f64>,
        ratings: Vec<Decimal>,
    ) -> Option<Self> {
        let external_id = external_id.trim();
        if external_id.is_empty() {
            return None;
        }

        let avg_rating = average(&ratings);
        Some(Self {
            external_id: external_id.to_string(),
            name: name.trim().to_string(),
            category: category.trim().to_string(),
            latitude: latitude.filter(|v| v.is_finite()),
            longitude: longitude.filter(|v| v.is_finite()),
            ratings,
            avg_rating,
        })
    }

    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn latitude(&self) -> Option<f64> {
        self.latitude
    }

    pub fn longitude(&self) -> Option<f64> {
        self.longitude
    }

    pub fn ratings(&self) -> &[Decimal] {
        &self.ratings
    }

    /// Mean of `ratings` rounded to two places
    pub fn avg_rating(&self) -> Option<Decimal> {
        self.avg_rating
    }

    /// Average as stored in the `REAL` column
    ///
    /// Always converted the same way, so a re-import compares equal to what
    /// the previous import wrote.
    pub fn avg_rating_f64(&self) -> Option<f64> {
        self.avg_rating.and_then(|avg| avg.to_f64())
    }
}
