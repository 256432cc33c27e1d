//! CSV parser
//!
//! The first non-blank line names the columns. Every following line must have
//! exactly as many fields as the header; empty fields become `null`.

use super::{CsvOptions, FormatParser};
use crate::record::Record;
use fileshipper_common::{Result, ShipperError};
use serde_json::Value;
use std::io::Read;
use std::path::Path;

/// Parser for delimiter-separated files
#[derive(Debug, Clone, Copy)]
pub struct CsvParser {
    options: CsvOptions,
}

impl CsvParser {
    pub fn new(options: CsvOptions) -> Self {
        Self { options }
    }

    /// Parse CSV from any reader; `path` is only used in error messages
    pub fn parse_reader<R: Read>(&self, path: &Path, input: R) -> Result<Vec<Record>> {
        let mut reader = ::csv::ReaderBuilder::new()
            .delimiter(self.options.delimiter)
            .quote(self.options.enclosure)
            .has_headers(false)
            .flexible(true)
            .from_reader(input);

        let mut rows = reader.records();

        let headers: Vec<String> = match rows.next() {
            None => return Ok(Vec::new()),
            Some(header) => header
                .map_err(|e| csv_error(path, e))?
                .iter()
                .enumerate()
                .map(|(i, name)| if i == 0 { name.trim_start_matches('\u{feff}') } else { name })
                .map(str::to_string)
                .collect(),
        };

        if let Some(position) = headers.iter().position(String::is_empty) {
            return Err(ShipperError::data_format(
                path,
                format!("Header row has an empty column name at position {}", position + 1),
            ));
        }

        let mut records = Vec::new();

        for (index, row) in rows.enumerate() {
            let row = row.map_err(|e| csv_error(path, e))?;
            let row_number = index + 1;

            if row.len() != headers.len() {
                let line = row.position().map(|p| p.line()).unwrap_or_default();
                return Err(ShipperError::data_format(
                    path,
                    format!(
                        "Column count in row {} (line {}) does not match columns in header row: expected {}, found {}",
                        row_number,
                        line,
                        headers.len(),
                        row.len()
                    ),
                ));
            }

            let record: Record = headers
                .iter()
                .zip(row.iter())
                .map(|(name, value)| {
                    let value = if value.is_empty() {
                        Value::Null
                    } else {
                        Value::String(value.to_string())
                    };
                    (name.clone(), value)
                })
                .collect();

            records.push(record);
        }

        Ok(records)
    }
}

impl FormatParser for CsvParser {
    type Raw = Record;

    fn parse(&self, path: &Path) -> Result<Vec<Record>> {
        let file = std::fs::File::open(path).map_err(|e| ShipperError::io_at(path, e))?;
        self.parse_reader(path, file)
    }

    fn normalize(&self, _path: &Path, _index: usize, raw: Record) -> Result<Record> {
        Ok(raw)
    }
}

fn csv_error(path: &Path, err: ::csv::Error) -> ShipperError {
    let message = err.to_string();
    match err.into_kind() {
        ::csv::ErrorKind::Io(io) => ShipperError::io_at(path, io),
        _ => ShipperError::data_format(path, message),
    }
}
