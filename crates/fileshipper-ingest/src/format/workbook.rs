//! Spreadsheet workbook parser
//!
//! Reads one worksheet, addressed by 1-based position or by name. Rows are
//! positional from column A. The first row whose column A cell holds a value
//! is the header row; rows above it are discarded. Every later row is zipped
//! against the header. Columns whose header cell is blank, `0`, `"0"` or
//! `false` are dropped.

use super::{FormatParser, WorksheetSelector};
use crate::record::Record;
use calamine::{open_workbook_auto, Data, Reader};
use chrono::NaiveDateTime;
use fileshipper_common::{Result, ShipperError};
use serde_json::{Number, Value};
use std::path::Path;
use tracing::debug;

/// Reads one worksheet of a workbook
#[derive(Debug, Clone)]
pub struct WorkbookParser {
    selector: WorksheetSelector,
}

impl WorkbookParser {
    pub fn new(selector: WorksheetSelector) -> Self {
        Self { selector }
    }
}

impl FormatParser for WorkbookParser {
    type Raw = Record;

    fn parse(&self, path: &Path) -> Result<Vec<Record>> {
        let rows = read_sheet(path, &self.selector)?;
        Ok(rows_to_records(rows))
    }

    fn normalize(&self, _path: &Path, _index: usize, raw: Record) -> Result<Record> {
        Ok(raw)
    }
}

/// Worksheet names in workbook order
pub fn sheet_names(path: &Path) -> Result<Vec<String>> {
    let workbook = open_workbook_auto(path).map_err(|e| workbook_error(path, e))?;
    Ok(workbook.sheet_names())
}

/// Read the selected sheet as rows of cell values, aligned on column A
pub fn read_sheet(path: &Path, selector: &WorksheetSelector) -> Result<Vec<Vec<Value>>> {
    let mut workbook = open_workbook_auto(path).map_err(|e| workbook_error(path, e))?;
    let names = workbook.sheet_names();

    let name = match selector {
        WorksheetSelector::Position(position) => {
            match position.checked_sub(1).and_then(|i| names.get(i)) {
                Some(name) => name.clone(),
                None => {
                    return Err(ShipperError::config(format!(
                        "Worksheet position {} does not exist in '{}' ({} sheets)",
                        position,
                        path.display(),
                        names.len()
                    )))
                },
            }
        },
        WorksheetSelector::Name(name) => {
            if !names.contains(name) {
                return Err(ShipperError::config(format!(
                    "Worksheet '{}' does not exist in '{}', available: {}",
                    name,
                    path.display(),
                    names.join(", ")
                )));
            }
            name.clone()
        },
    };

    let range = workbook
        .worksheet_range(&name)
        .map_err(|e| workbook_error(path, e))?;

    // calamine trims leading empty columns; put them back so column A stays first
    let leading_columns = range.start().map(|(_, col)| col as usize).unwrap_or(0);

    let rows: Vec<Vec<Value>> = range
        .rows()
        .map(|row| {
            let mut cells = vec![Value::Null; leading_columns];
            cells.extend(row.iter().map(cell_value));
            cells
        })
        .collect();

    debug!(sheet = %name, rows = rows.len(), "Read worksheet");
    Ok(rows)
}

/// Apply header detection to positional rows
pub fn rows_to_records<I>(rows: I) -> Vec<Record>
where
    I: IntoIterator<Item = Vec<Value>>,
{
    let mut headers: Option<Vec<Option<String>>> = None;
    let mut records = Vec::new();

    for row in rows {
        let Some(columns) = headers.as_ref() else {
            if row.first().is_some_and(|cell| !cell.is_null()) {
                headers = Some(row.iter().map(header_name).collect());
            }
            continue;
        };

        let record: Record = row
            .into_iter()
            .enumerate()
            .filter_map(|(i, cell)| match columns.get(i) {
                Some(Some(name)) => Some((name.clone(), cell)),
                _ => None,
            })
            .collect();

        records.push(record);
    }

    records
}

fn header_name(cell: &Value) -> Option<String> {
    let name = match cell {
        Value::Null | Value::Bool(false) => return None,
        Value::Number(n) if n.as_f64() == Some(0.0) => return None,
        Value::String(s) if s == "0" => return None,
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    };
    (!name.is_empty()).then_some(name)
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Int(i) => Value::from(*i),
        Data::Float(f) => float_value(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(datetime) => Value::String(iso_datetime(datetime)),
            None => float_value(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::String(s.clone()),
    }
}

/// Whole numbers are stored as floats in most workbooks
fn float_value(f: f64) -> Value {
    if f.fract() == 0.0 && f.abs() < 9.0e15 {
        Value::from(f as i64)
    } else {
        Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
    }
}

fn iso_datetime(datetime: NaiveDateTime) -> String {
    datetime.format("%Y-%m-%dT%H:%M:%S").to_string()
}

fn workbook_error(path: &Path, err: calamine::Error) -> ShipperError {
    match err {
        calamine::Error::Io(io) => ShipperError::io_at(path, io),
        other => ShipperError::data_format(path, format!("Unable to read workbook: {}", other)),
    }
}
