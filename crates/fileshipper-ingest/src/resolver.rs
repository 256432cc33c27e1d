//! Source resolution and fetching
//!
//! [`SourceResolver`] maps a base directory to its configuration section,
//! lists the files it offers and turns one file (or all of them) into
//! records. The configuration is loaded afresh on every call, and the
//! transport is chosen once per call from the resolved section.

use crate::config::{ConfigLoader, ImportsConfig, SourceSection};
use crate::format::read_file;
use crate::record::{FetchResult, Record};
use crate::settings::{FetchRequest, WILDCARD};
use crate::transport::{validate_file_name, FileTransport, StandardTransports, TransportFactory};
use fileshipper_common::{Result, ShipperError};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Resolves base locations and fetches their records
#[derive(Debug, Clone)]
pub struct SourceResolver<L, T = StandardTransports> {
    loader: L,
    transports: T,
}

impl<L: ConfigLoader> SourceResolver<L> {
    pub fn new(loader: L) -> Self {
        Self::with_transports(loader, StandardTransports)
    }
}

impl<L: ConfigLoader, T: TransportFactory> SourceResolver<L, T> {
    pub fn with_transports(loader: L, transports: T) -> Self {
        Self { loader, transports }
    }

    /// The available section configured for `basedir`
    pub fn resolve(&self, basedir: &str) -> Result<SourceSection> {
        let config = self.loader.load()?;
        resolve_in(&config, basedir).cloned()
    }

    /// Sorted file names available at `basedir`
    pub fn list_files(&self, basedir: &str) -> Result<Vec<String>> {
        let section = self.resolve(basedir)?;
        let files = self.transports.transport_for(&section)?.list_files()?;
        Ok(files.into_iter().collect())
    }

    /// File choices for a picker: the wildcard followed by every file
    pub fn enum_files(&self, basedir: &str) -> Result<Vec<String>> {
        let mut choices = vec![WILDCARD.to_string()];
        choices.extend(self.list_files(basedir)?);
        Ok(choices)
    }

    /// Available base directories mapped to their section names
    pub fn list_base_directories(&self) -> Result<BTreeMap<String, String>> {
        let config = self.loader.load()?;
        Ok(config
            .sections()
            .filter(|section| section.is_available())
            .filter_map(|section| {
                section
                    .basedir
                    .clone()
                    .map(|basedir| (basedir, section.name.clone()))
            })
            .collect())
    }

    /// Fetch one file, or every file for the wildcard
    pub fn fetch(&self, request: &FetchRequest) -> Result<FetchResult> {
        request.format.ensure_available()?;

        let section = self.resolve(&request.basedir)?;
        let transport = self.transports.transport_for(&section)?;

        info!(
            basedir = %request.basedir,
            file = %request.file_name,
            format = %request.format,
            section = %section.name,
            "Fetching"
        );

        let result = if request.is_wildcard() {
            let mut files = BTreeMap::new();
            for file_name in transport.list_files()? {
                let records = fetch_file(&section, transport.as_ref(), &file_name, request)?;
                files.insert(file_name, records);
            }
            FetchResult::Files(files)
        } else {
            validate_file_name(&request.file_name)?;
            let records = fetch_file(&section, transport.as_ref(), &request.file_name, request)?;
            FetchResult::Records(records)
        };

        info!(records = result.record_count(), "Fetch complete");
        Ok(result)
    }

    /// Column names of the first record of a fetch
    pub fn list_columns(&self, request: &FetchRequest) -> Result<Vec<String>> {
        let result = self.fetch(request)?;
        Ok(result
            .first_record()
            .map(|record| record.keys().cloned().collect())
            .unwrap_or_default())
    }
}

fn resolve_in<'a>(config: &'a ImportsConfig, basedir: &str) -> Result<&'a SourceSection> {
    let section = config.find(basedir)?;
    if !section.is_available() {
        return Err(ShipperError::config(format!(
            "The basedir \"{}\" of section [{}] does not exist",
            basedir, section.name
        )));
    }
    debug!(basedir = %basedir, section = %section.name, remote = section.remote, "Resolved base directory");
    Ok(section)
}

fn fetch_file(
    section: &SourceSection,
    transport: &dyn FileTransport,
    file_name: &str,
    request: &FetchRequest,
) -> Result<Vec<Record>> {
    transport.download(file_name)?;
    let path = section.local_path(file_name)?;
    let records = read_file(request.format, &path, &request.options)?;
    debug!(file = %file_name, records = records.len(), "Read file");
    Ok(records)
}
