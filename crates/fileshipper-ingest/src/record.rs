//! Canonical record shape shared by every format
//!
//! A [`Record`] is an insertion-ordered map from column name to a JSON value
//! (null, string, number, boolean, nested object or array). `serde_json` is
//! built with `preserve_order`, so column order follows the source file.

use fileshipper_common::{Result, ShipperError};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// One normalized row
pub type Record = Map<String, Value>;

/// Outcome of a fetch
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FetchResult {
    /// Records of a single file
    Records(Vec<Record>),
    /// Wildcard fetch: records per file, ordered by file name
    Files(BTreeMap<String, Vec<Record>>),
}

impl FetchResult {
    /// First record in file-name order, if any file produced one
    pub fn first_record(&self) -> Option<&Record> {
        match self {
            FetchResult::Records(records) => records.first(),
            FetchResult::Files(files) => files.values().find_map(|records| records.first()),
        }
    }

    /// Total number of records across all files
    pub fn record_count(&self) -> usize {
        match self {
            FetchResult::Records(records) => records.len(),
            FetchResult::Files(files) => files.values().map(Vec::len).sum(),
        }
    }
}

/// Split a decoded JSON or YAML document into its top-level records
///
/// - an array yields its elements
/// - an object whose values are all objects is a keyed collection and yields its values
/// - any other non-empty object is a single record
/// - `null` or an empty object yields nothing
pub fn document_records(file: &Path, document: Value) -> Result<Vec<Value>> {
    match document {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(items),
        Value::Object(map) if map.is_empty() => Ok(Vec::new()),
        Value::Object(map) if map.values().all(Value::is_object) => {
            Ok(map.into_iter().map(|(_, value)| value).collect())
        },
        Value::Object(map) => Ok(vec![Value::Object(map)]),
        other => Err(ShipperError::data_format(
            file,
            format!(
                "Expected a list or a map of records at the top level, found {}",
                kind_of(&other)
            ),
        )),
    }
}

/// Require a top-level entry to be an object
pub fn into_record(file: &Path, index: usize, value: Value) -> Result<Record> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ShipperError::data_format(
            file,
            format!("Record {} is {}, expected an object", index + 1, kind_of(&other)),
        )),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
