//! Fileshipper Ingest Library
//!
//! Reads structured files from configured base locations and normalizes them
//! into ordered records for an import pipeline.
//!
//! # Base locations
//!
//! Each section of `imports.ini` names a base directory. Local sections read
//! the directory directly; remote sections download each file over SFTP into
//! the base directory right before it is parsed.
//!
//! # Supported formats
//!
//! - **CSV**: header row plus data rows, configurable delimiter and enclosure
//! - **JSON** and **YAML**: a list of records or a keyed collection
//! - **XML**: every child of the root element is a record
//! - **Workbook**: one worksheet of an xlsx/xls/ods file, header row detected
//!
//! # Example
//!
//! ```no_run
//! use fileshipper_ingest::{Format, FetchRequest, IniFile, SourceResolver};
//!
//! fn main() -> anyhow::Result<()> {
//!     let resolver = SourceResolver::new(IniFile::new("/etc/fileshipper/imports.ini"));
//!     let request = FetchRequest::new("/var/lib/fileshipper/hosts", "*", Format::Csv);
//!     let result = resolver.fetch(&request)?;
//!     println!("{}", serde_json::to_string_pretty(&result)?);
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod config;
pub mod format;
pub mod record;
pub mod resolver;
pub mod settings;
pub mod transport;

pub use config::{ConfigLoader, ImportsConfig, IniFile, SourceSection};
pub use format::{CsvOptions, Format, FormatOptions, WorksheetSelector};
pub use record::{FetchResult, Record};
pub use resolver::SourceResolver;
pub use settings::{FetchRequest, ImportSettings, WorksheetAddressing, WILDCARD};
pub use transport::{FileTransport, StandardTransports, TransportFactory};
