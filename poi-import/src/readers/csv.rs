//! Delimited-text reader
//!
//! Expects a header row; each data row becomes header → cell. Short rows
//! simply lack the trailing columns.

use crate::error::ImportResult;
use crate::record::RawRow;
use std::collections::HashMap;
use std::io::Read;

/// Read all rows from CSV input
pub fn read_delimited<R: Read>(reader: R) -> ImportResult<Vec<RawRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let mut rows = Vec::new();

    for result in rdr.records() {
        let record = result?;
        let cells: HashMap<String, String> = headers
            .iter()
            .zip(record.iter())
            .map(|(header, cell)| (header.to_string(), cell.to_string()))
            .collect();
        rows.push(RawRow::Delimited(cells));
    }

    tracing::debug!(rows = rows.len(), "Read delimited rows");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_rows_by_header() {
        let input = "poi_id, poi_name ,poi_ratings\n1,Cafe,\"{3.0,4.0}\"\n2,Mill\n";
        let rows = read_delimited(input.as_bytes()).unwrap();

        assert_eq!(rows.len(), 2);
        let RawRow::Delimited(first) = &rows[0] else { panic!("expected delimited row") };
        assert_eq!(first.get("poi_id").map(String::as_str), Some("1"));
        assert_eq!(first.get("poi_name").map(String::as_str), Some("Cafe"));
        assert_eq!(first.get("poi_ratings").map(String::as_str), Some("{3.0,4.0}"));

        let RawRow::Delimited(second) = &rows[1] else { panic!("expected delimited row") };
        assert!(!second.contains_key("poi_ratings"));
    }

    #[test]
    fn test_header_only() {
        let rows = read_delimited("poi_id,poi_name\n".as_bytes()).unwrap();
        assert!(rows.is_empty());
    }
}
