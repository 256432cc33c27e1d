//! Shared pieces of the fileshipper workspace
//!
//! - [`ShipperError`] and the [`Result`] alias returned by every library call
//! - [`logging`], the `tracing` setup used by the binaries
//!
//! ```no_run
//! use fileshipper_common::{Result, ShipperError};
//!
//! fn require_host(host: Option<&str>) -> Result<&str> {
//!     host.ok_or_else(|| ShipperError::config("The host is missing in the imports configuration"))
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod error;
pub mod logging;

pub use error::{Result, ShipperError};
