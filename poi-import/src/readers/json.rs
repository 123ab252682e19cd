//! Structured-text reader
//!
//! Accepts an array at the root, or an object holding the array under
//! `items` or `pois` (first non-empty one). Entries that are not objects are
//! skipped.

use crate::error::ImportResult;
use crate::record::RawRow;
use serde_json::Value;
use std::io::Read;
use tracing::debug;

/// Keys checked, in order, when the root is an object
const CONTAINER_KEYS: [&str; 2] = ["items", "pois"];

/// Read all rows from JSON input
pub fn read_structured<R: Read>(reader: R) -> ImportResult<Vec<RawRow>> {
    let data: Value = serde_json::from_reader(reader)?;
    Ok(rows_from_value(data))
}

fn rows_from_value(data: Value) -> Vec<RawRow> {
    let items = match data {
        Value::Array(items) => items,
        Value::Object(mut root) => CONTAINER_KEYS
            .iter()
            .find_map(|key| match root.remove(*key) {
                Some(Value::Array(items)) if !items.is_empty() => Some(items),
                _ => None,
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    };

    let total = items.len();
    let rows: Vec<RawRow> = items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(object) => Some(RawRow::Structured(object)),
            _ => None,
        })
        .collect();

    if rows.len() < total {
        debug!(skipped = total - rows.len(), "Skipped non-object entries");
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ImportError;

    #[test]
    fn test_root_array() {
        let rows = read_structured(r#"[{"id": 1}, {"id": 2}, 3]"#.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_container_keys() {
        let rows = read_structured(r#"{"items": [{"id": 1}]}"#.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);

        let rows = read_structured(r#"{"items": [], "pois": [{"id": 1}, {"id": 2}]}"#.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);

        let rows = read_structured(r#"{"other": [{"id": 1}]}"#.as_bytes()).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_malformed_json() {
        let err = read_structured("[{".as_bytes()).unwrap_err();
        assert!(matches!(err, ImportError::Json(_)));
    }
}
