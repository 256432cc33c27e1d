//! Access to the files of a base location
//!
//! A [`FileTransport`] lists the files a base location offers and makes one of
//! them resident under the local base directory. Local sections list their
//! directory and have nothing to download; remote sections talk SFTP.

pub mod local;
#[cfg(feature = "sftp")]
pub mod sftp;

use crate::config::SourceSection;
use fileshipper_common::{Result, ShipperError};
use regex::Regex;
use std::collections::BTreeSet;
use tracing::debug;

pub use local::LocalTransport;

/// Remote type identifier for SFTP sections
pub const SFTP_TYPE: &str = "sftp";

/// File access for one base location
pub trait FileTransport {
    /// File names available at the location, sorted
    fn list_files(&self) -> Result<BTreeSet<String>>;

    /// Place `file_name` at `<basedir>/<file_name>`, replacing any local copy
    fn download(&self, file_name: &str) -> Result<()>;
}

/// Chooses the transport serving a section
pub trait TransportFactory {
    fn transport_for(&self, section: &SourceSection) -> Result<Box<dyn FileTransport>>;
}

/// Local directories, and SFTP for remote sections
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardTransports;

impl TransportFactory for StandardTransports {
    fn transport_for(&self, section: &SourceSection) -> Result<Box<dyn FileTransport>> {
        for_section(section)
    }
}

/// Pick the transport for a section
pub fn for_section(section: &SourceSection) -> Result<Box<dyn FileTransport>> {
    if !section.remote {
        return Ok(Box::new(LocalTransport::new(section.basedir_path()?)));
    }

    match section.remote_type.as_deref().map(str::trim) {
        None | Some("") => Err(ShipperError::config(format!(
            "The remote type is missing in section [{}]",
            section.name
        ))),
        Some(kind) if kind.eq_ignore_ascii_case(SFTP_TYPE) => sftp_transport(section),
        Some(kind) => Err(ShipperError::config(format!(
            "Unsupported remote type '{}' in section [{}], only '{}' is supported",
            kind, section.name, SFTP_TYPE
        ))),
    }
}

#[cfg(feature = "sftp")]
fn sftp_transport(section: &SourceSection) -> Result<Box<dyn FileTransport>> {
    let settings = sftp::SftpSettings::from_section(section)?;
    Ok(Box::new(sftp::SftpTransport::new(settings)))
}

#[cfg(not(feature = "sftp"))]
fn sftp_transport(section: &SourceSection) -> Result<Box<dyn FileTransport>> {
    Err(ShipperError::config(format!(
        "Section [{}] is remote but SFTP support is not available in this build",
        section.name
    )))
}

/// Keep the names matching `filter`, dropping `.` and `..`
pub fn filter_listing<I>(names: I, filter: &Regex) -> BTreeSet<String>
where
    I: IntoIterator<Item = String>,
{
    names
        .into_iter()
        .filter(|name| name != "." && name != "..")
        .filter(|name| {
            let keep = filter.is_match(name);
            if !keep {
                debug!(file = %name, filter = %filter, "Skipping file not matching filter");
            }
            keep
        })
        .collect()
}

/// Reject names that would escape the base directory
pub fn validate_file_name(file_name: &str) -> Result<()> {
    let invalid = file_name.is_empty()
        || file_name == "."
        || file_name == ".."
        || file_name.contains('/')
        || file_name.contains('\\')
        || file_name.contains('\0');

    if invalid {
        Err(ShipperError::config(format!(
            "Invalid file name '{}': expected a plain file name inside the base directory",
            file_name
        )))
    } else {
        Ok(())
    }
}
