//! Markup reader
//!
//! Records are the `DATA_RECORD` elements anywhere below the root. Documents
//! without any `DATA_RECORD` use the direct children of the root instead.
//! Each record's child elements become lower-cased tag → trimmed text; a tag
//! repeated within one record keeps its last value.

use crate::error::{ImportError, ImportResult};
use crate::record::RawRow;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;

/// Element name marking one record
const RECORD_TAG: &str = "DATA_RECORD";

/// Minimal element tree, enough to locate records and their fields
#[derive(Debug, Default)]
struct Element {
    name: String,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn collect_named<'a>(&'a self, name: &str, out: &mut Vec<&'a Element>) {
        for child in &self.children {
            if child.name == name {
                out.push(child);
            }
            child.collect_named(name, out);
        }
    }

    fn fields(&self) -> HashMap<String, String> {
        self.children
            .iter()
            .map(|child| (child.name.trim().to_lowercase(), child.text.trim().to_string()))
            .collect()
    }
}

/// Read all rows from XML text
pub fn read_markup(content: &str) -> ImportResult<Vec<RawRow>> {
    let root = parse_tree(content)?;

    let mut records = Vec::new();
    root.collect_named(RECORD_TAG, &mut records);
    if records.is_empty() {
        records = root.children.iter().collect();
    }

    let rows: Vec<RawRow> = records
        .into_iter()
        .map(|record| RawRow::Markup(record.fields()))
        .collect();

    tracing::debug!(rows = rows.len(), root = %root.name, "Read markup rows");
    Ok(rows)
}

fn parse_tree(content: &str) -> ImportResult<Element> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                stack.push(Element {
                    name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
                    ..Default::default()
                });
            }
            Event::Empty(start) => {
                let element = Element {
                    name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
                    ..Default::default()
                };
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    let text = text
                        .unescape()
                        .map_err(|e| ImportError::Xml(e.to_string()))?;
                    current.text.push_str(&text);
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| ImportError::Xml("unexpected closing tag".to_string()))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(ImportError::Xml("unexpected end of document".to_string()));
    }
    root.ok_or_else(|| ImportError::Xml("document has no root element".to_string()))
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> ImportResult<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(ImportError::Xml("multiple root elements".to_string())),
    }
    Ok(())
}
