//! File format parsers
//!
//! Each supported format implements [`FormatParser`]: `parse` turns a file on
//! local storage into raw records, `normalize` turns one raw record into the
//! canonical [`Record`]. [`read_file`] picks the parser for a [`Format`].
//!
//! YAML, XML and workbook support depend on optional libraries (the `yaml`,
//! `xml` and `xlsx` features). [`Format::available`] lists what this build can read.

pub mod csv;
pub mod json;
#[cfg(feature = "xlsx")]
pub mod workbook;
#[cfg(feature = "xml")]
pub mod xml;
#[cfg(feature = "yaml")]
pub mod yaml;

use crate::record::Record;
use fileshipper_common::{Result, ShipperError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Supported file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Csv,
    Json,
    Yaml,
    Xml,
    /// Spreadsheet workbook (xlsx, xls, ods)
    #[serde(rename = "xlsx", alias = "xslx")]
    Workbook,
}

impl Format {
    /// Every format this crate knows about, in presentation order
    pub const ALL: [Format; 5] = [
        Format::Csv,
        Format::Json,
        Format::Workbook,
        Format::Xml,
        Format::Yaml,
    ];

    /// Identifier used in settings and on the command line
    pub fn as_str(self) -> &'static str {
        match self {
            Format::Csv => "csv",
            Format::Json => "json",
            Format::Yaml => "yaml",
            Format::Xml => "xml",
            Format::Workbook => "xlsx",
        }
    }

    /// Human readable label for format pickers
    pub fn label(self) -> &'static str {
        match self {
            Format::Csv => "CSV (Comma Separated Value)",
            Format::Json => "JSON (JavaScript Object Notation)",
            Format::Yaml => "YAML (Ain't Markup Language)",
            Format::Xml => "XML (Extensible Markup Language)",
            Format::Workbook => "XLSX (Microsoft Excel 2007+)",
        }
    }

    /// Whether the library needed for this format was compiled in
    pub fn is_available(self) -> bool {
        match self {
            Format::Csv | Format::Json => true,
            Format::Yaml => cfg!(feature = "yaml"),
            Format::Xml => cfg!(feature = "xml"),
            Format::Workbook => cfg!(feature = "xlsx"),
        }
    }

    /// Formats readable by this build
    pub fn available() -> Vec<Format> {
        Self::ALL.into_iter().filter(|f| f.is_available()).collect()
    }

    /// Fail with a configuration error when the format was compiled out
    pub fn ensure_available(self) -> Result<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(ShipperError::config(format!(
                "The {} format is not available in this build",
                self
            )))
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Format {
    type Err = ShipperError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(Format::Csv),
            "json" => Ok(Format::Json),
            "yaml" | "yml" => Ok(Format::Yaml),
            "xml" => Ok(Format::Xml),
            "xlsx" | "xslx" => Ok(Format::Workbook),
            _ => Err(ShipperError::config(format!("Unsupported file format: {}", s))),
        }
    }
}

/// CSV field delimiter and value enclosure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvOptions {
    pub delimiter: u8,
    pub enclosure: u8,
}

impl CsvOptions {
    /// Build from the textual settings, each of which must be one ASCII character
    pub fn new(delimiter: &str, enclosure: &str) -> Result<Self> {
        Ok(Self {
            delimiter: single_ascii("csv_delimiter", delimiter)?,
            enclosure: single_ascii("csv_enclosure", enclosure)?,
        })
    }
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            enclosure: b'"',
        }
    }
}

fn single_ascii(setting: &str, value: &str) -> Result<u8> {
    match value.as_bytes() {
        [byte] if byte.is_ascii() => Ok(*byte),
        _ => Err(ShipperError::config(format!(
            "{} must be exactly one ASCII character, got '{}'",
            setting, value
        ))),
    }
}

/// How a worksheet is picked out of a workbook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorksheetSelector {
    /// 1-based sheet position
    Position(usize),
    /// Sheet name
    Name(String),
}

impl Default for WorksheetSelector {
    fn default() -> Self {
        WorksheetSelector::Position(1)
    }
}

/// Format-specific parse parameters for one fetch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatOptions {
    pub csv: CsvOptions,
    pub worksheet: WorksheetSelector,
}

/// A parser for one file format
pub trait FormatParser {
    /// Parser-native record before normalization
    type Raw;

    /// Read the file at `path` into raw records, in file order
    fn parse(&self, path: &Path) -> Result<Vec<Self::Raw>>;

    /// Turn the raw record at position `index` into a canonical record
    fn normalize(&self, path: &Path, index: usize, raw: Self::Raw) -> Result<Record>;
}

fn parse_and_normalize<P: FormatParser>(parser: &P, path: &Path) -> Result<Vec<Record>> {
    parser
        .parse(path)?
        .into_iter()
        .enumerate()
        .map(|(index, raw)| parser.normalize(path, index, raw))
        .collect()
}

/// Parse and normalize a local file
pub fn read_file(format: Format, path: &Path, options: &FormatOptions) -> Result<Vec<Record>> {
    format.ensure_available()?;
    debug!(format = %format, path = %path.display(), "Reading file");

    match format {
        Format::Csv => parse_and_normalize(&csv::CsvParser::new(options.csv), path),
        Format::Json => parse_and_normalize(&json::JsonParser, path),
        #[cfg(feature = "yaml")]
        Format::Yaml => parse_and_normalize(&yaml::YamlParser, path),
        #[cfg(feature = "xml")]
        Format::Xml => parse_and_normalize(&xml::XmlParser, path),
        #[cfg(feature = "xlsx")]
        Format::Workbook => parse_and_normalize(
            &workbook::WorkbookParser::new(options.worksheet.clone()),
            path,
        ),
        #[allow(unreachable_patterns)]
        other => Err(ShipperError::config(format!(
            "The {} format is not available in this build",
            other
        ))),
    }
}

/// Read a whole file as UTF-8 text
pub(crate) fn read_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| ShipperError::io_at(path, e))?;
    String::from_utf8(bytes)
        .map_err(|e| ShipperError::data_format(path, format!("File is not valid UTF-8: {}", e)))
}
