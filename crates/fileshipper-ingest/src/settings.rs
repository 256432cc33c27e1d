//! Fetch requests and the stored import settings they are built from

use crate::format::{CsvOptions, Format, FormatOptions, WorksheetSelector};
use fileshipper_common::{Result, ShipperError};
use serde::{Deserialize, Deserializer, Serialize};

/// File name that selects every file of a base location
pub const WILDCARD: &str = "*";

/// How the worksheet of a workbook is chosen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorksheetAddressing {
    #[default]
    ByPosition,
    ByName,
}

/// Import settings as stored by the import source form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSettings {
    pub basedir: String,
    pub file_name: String,
    pub file_format: String,
    #[serde(default = "default_delimiter")]
    pub csv_delimiter: String,
    #[serde(default = "default_enclosure")]
    pub csv_enclosure: String,
    #[serde(default)]
    pub worksheet_addressing: WorksheetAddressing,
    #[serde(default = "default_position", deserialize_with = "position_from_any")]
    pub worksheet_position: usize,
    #[serde(default)]
    pub worksheet_name: Option<String>,
}

fn default_delimiter() -> String {
    ",".to_string()
}

fn default_enclosure() -> String {
    "\"".to_string()
}

fn default_position() -> usize {
    1
}

/// Form values arrive as strings; accept `"2"` as well as `2`
fn position_from_any<'de, D>(deserializer: D) -> std::result::Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Position {
        Number(usize),
        Text(String),
    }

    match Position::deserialize(deserializer)? {
        Position::Number(n) => Ok(n),
        Position::Text(s) => s.trim().parse().map_err(|_| {
            serde::de::Error::custom(format!("worksheet_position must be a number, got '{}'", s))
        }),
    }
}

impl ImportSettings {
    pub fn new(
        basedir: impl Into<String>,
        file_name: impl Into<String>,
        file_format: impl Into<String>,
    ) -> Self {
        Self {
            basedir: basedir.into(),
            file_name: file_name.into(),
            file_format: file_format.into(),
            csv_delimiter: default_delimiter(),
            csv_enclosure: default_enclosure(),
            worksheet_addressing: WorksheetAddressing::default(),
            worksheet_position: default_position(),
            worksheet_name: None,
        }
    }

    /// Decode settings from their JSON form
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| ShipperError::config(format!("Invalid import settings: {}", e)))
    }

    /// Validate and convert into a fetch request
    pub fn to_request(&self) -> Result<FetchRequest> {
        if self.basedir.is_empty() {
            return Err(ShipperError::config("The basedir setting is required"));
        }
        if self.file_name.is_empty() {
            return Err(ShipperError::config("The file_name setting is required"));
        }

        let format: Format = self.file_format.parse()?;

        let worksheet = match self.worksheet_addressing {
            WorksheetAddressing::ByPosition => WorksheetSelector::Position(self.worksheet_position),
            WorksheetAddressing::ByName => match self.worksheet_name.as_deref() {
                Some(name) if !name.is_empty() => WorksheetSelector::Name(name.to_string()),
                _ => {
                    return Err(ShipperError::config(
                        "The worksheet_name setting is required when addressing worksheets by name",
                    ))
                },
            },
        };

        Ok(FetchRequest {
            basedir: self.basedir.clone(),
            file_name: self.file_name.clone(),
            format,
            options: FormatOptions {
                csv: CsvOptions::new(&self.csv_delimiter, &self.csv_enclosure)?,
                worksheet,
            },
        })
    }
}

/// One validated fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub basedir: String,
    /// A file name, or [`WILDCARD`] for every file
    pub file_name: String,
    pub format: Format,
    pub options: FormatOptions,
}

impl FetchRequest {
    pub fn new(basedir: impl Into<String>, file_name: impl Into<String>, format: Format) -> Self {
        Self {
            basedir: basedir.into(),
            file_name: file_name.into(),
            format,
            options: FormatOptions::default(),
        }
    }

    pub fn with_options(mut self, options: FormatOptions) -> Self {
        self.options = options;
        self
    }

    pub fn is_wildcard(&self) -> bool {
        self.file_name == WILDCARD
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_minimal_json() {
        let settings = ImportSettings::from_json(
            r#"{"basedir": "/data", "file_name": "hosts.csv", "file_format": "csv"}"#,
        )
        .unwrap();
        let request = settings.to_request().unwrap();
        assert_eq!(request.format, Format::Csv);
        assert_eq!(request.options, FormatOptions::default());
        assert!(!request.is_wildcard());
    }

    #[test]
    fn test_worksheet_by_name() {
        let settings = ImportSettings::from_json(
            r#"{"basedir": "/data", "file_name": "*", "file_format": "xslx",
                "worksheet_addressing": "by_name", "worksheet_name": "Hosts"}"#,
        )
        .unwrap();
        let request = settings.to_request().unwrap();
        assert_eq!(request.format, Format::Workbook);
        assert_eq!(request.options.worksheet, WorksheetSelector::Name("Hosts".into()));
        assert!(request.is_wildcard());
    }

    #[test]
    fn test_worksheet_position_as_string() {
        let settings = ImportSettings::from_json(
            r#"{"basedir": "/data", "file_name": "a.xlsx", "file_format": "xlsx",
                "worksheet_position": "3"}"#,
        )
        .unwrap();
        assert_eq!(settings.worksheet_position, 3);
    }

    #[test]
    fn test_by_name_without_name_is_config_error() {
        let mut settings = ImportSettings::new("/data", "a.xlsx", "xlsx");
        settings.worksheet_addressing = WorksheetAddressing::ByName;
        assert!(settings.to_request().unwrap_err().is_config());
    }

    #[test]
    fn test_unknown_format_is_config_error() {
        let err = ImportSettings::new("/data", "a.ods", "ods").to_request().unwrap_err();
        assert!(err.to_string().contains("Unsupported file format: ods"));
    }

    #[test]
    fn test_custom_csv_settings() {
        let mut settings = ImportSettings::new("/data", "a.csv", "csv");
        settings.csv_delimiter = ";".into();
        settings.csv_enclosure = "'".into();
        let request = settings.to_request().unwrap();
        assert_eq!(request.options.csv, CsvOptions { delimiter: b';', enclosure: b'\'' });

        settings.csv_delimiter = "tab".into();
        assert!(settings.to_request().is_err());
    }
}
