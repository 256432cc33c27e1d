//! Error types for fileshipper
//!
//! Every message is meant for an operator: it names the file, the row or the
//! configuration key involved so the problem can be fixed without reading code.

use std::path::Path;
use thiserror::Error;

/// Result type alias for fileshipper operations
pub type Result<T> = std::result::Result<T, ShipperError>;

/// Main error type for fileshipper
#[derive(Error, Debug)]
pub enum ShipperError {
    /// Missing or ambiguous configuration, unknown format or remote type
    #[error("Configuration error: {0}")]
    Config(String),

    /// The remote endpoint refused the supplied credentials
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// A file was readable but its content could not be turned into records
    #[error("Invalid data in '{file}': {message}")]
    DataFormat { file: String, message: String },

    /// I/O failure tied to a known path
    #[error("IO error on '{path}': {source}")]
    IoAt {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O or network failure without further context
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ShipperError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an authentication error
    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a data format error for `file`
    pub fn data_format(file: impl AsRef<Path>, msg: impl Into<String>) -> Self {
        Self::DataFormat {
            file: file.as_ref().display().to_string(),
            message: msg.into(),
        }
    }

    /// Attach a path to an I/O error
    pub fn io_at(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::IoAt {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// Whether this error came from configuration rather than data or transport
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Whether this error is a data format error
    pub fn is_data_format(&self) -> bool {
        matches!(self, Self::DataFormat { .. })
    }

    /// Whether this error is an I/O error, with or without a path
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_) | Self::IoAt { .. })
    }
}
