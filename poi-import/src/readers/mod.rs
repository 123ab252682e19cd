//! Source format readers
//!
//! Each reader turns a whole file into raw rows of its [`RawRow`] variant.
//! Files are read completely before normalization: batch sizing needs the
//! total record count up front.

pub mod csv;
pub mod json;
pub mod xml;

use crate::error::ImportResult;
use crate::record::{RawRow, SourceFormat};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Read every row of `path` as `format`
pub fn read_rows(path: &Path, format: SourceFormat) -> ImportResult<Vec<RawRow>> {
    match format {
        SourceFormat::Delimited => csv::read_delimited(BufReader::new(File::open(path)?)),
        SourceFormat::Structured => json::read_structured(BufReader::new(File::open(path)?)),
        SourceFormat::Markup => xml::read_markup(&std::fs::read_to_string(path)?),
    }
}
