//! JSON parser

use super::{read_text, FormatParser};
use crate::record::{document_records, into_record, Record};
use fileshipper_common::{Result, ShipperError};
use serde_json::Value;
use std::path::Path;

/// Decodes the whole file as one JSON document
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonParser;

impl JsonParser {
    /// Decode JSON text; a syntax error never yields partial records
    pub fn parse_str(&self, path: &Path, content: &str) -> Result<Vec<Value>> {
        let document: Value = serde_json::from_str(content).map_err(|e| {
            ShipperError::data_format(path, format!("Unable to load JSON data: {}", e))
        })?;
        document_records(path, document)
    }
}

impl FormatParser for JsonParser {
    type Raw = Value;

    fn parse(&self, path: &Path) -> Result<Vec<Value>> {
        let content = read_text(path)?;
        self.parse_str(path, &content)
    }

    fn normalize(&self, path: &Path, index: usize, raw: Value) -> Result<Record> {
        into_record(path, index, raw)
    }
}
