//! Imports configuration
//!
//! `imports.ini` holds one section per base location:
//!
//! ```ini
//! [hosts]
//! basedir = /var/lib/fileshipper/hosts
//!
//! [partner-feed]
//! basedir = /var/lib/fileshipper/partner
//! remote = true
//! type = sftp
//! host = sftp.example.com
//! username = import
//! privkeyfile = ~/.ssh/id_ed25519
//! remotedir = /outgoing
//! filter = ^data_.*\.csv$
//! ```
//!
//! Values are taken literally: backslashes are not escapes, so a filter regex
//! is written as-is. Surrounding quotes are stripped.
//! Environment variables named `FILESHIPPER__<SECTION>__<KEY>` override file values.
//! Section names are case-insensitive and reported in lower case.

use ::config::{ConfigError, Map, Source, Value as ConfigValue, ValueKind};
use fileshipper_common::{Result, ShipperError};
use ini::{Ini, ParseOption};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ============================================================================
// Defaults
// ============================================================================

/// Default location of the imports configuration
pub const DEFAULT_IMPORTS_PATH: &str = "/etc/fileshipper/imports.ini";

/// Default SSH port
pub const DEFAULT_PORT: u16 = 22;

/// Default remote filename filter (match everything)
pub const DEFAULT_FILTER: &str = ".*";

/// Default remote session I/O timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Environment prefix for overrides
pub const ENV_PREFIX: &str = "FILESHIPPER";

/// One configured base location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSection {
    /// Section name in `imports.ini`
    #[serde(skip)]
    pub name: String,
    pub basedir: Option<String>,
    #[serde(default)]
    pub remote: bool,
    #[serde(rename = "type")]
    pub remote_type: Option<String>,
    pub host: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub privkeyfile: Option<String>,
    pub passphrase: Option<String>,
    pub remotedir: Option<String>,
    #[serde(default = "default_filter")]
    pub filter: String,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_filter() -> String {
    DEFAULT_FILTER.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl SourceSection {
    /// A local section for `basedir`
    pub fn local(name: impl Into<String>, basedir: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            basedir: Some(basedir.into()),
            remote: false,
            remote_type: None,
            host: None,
            port: DEFAULT_PORT,
            username: None,
            password: None,
            privkeyfile: None,
            passphrase: None,
            remotedir: None,
            filter: DEFAULT_FILTER.to_string(),
            timeout: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Whether this section can currently serve files
    ///
    /// Remote sections always can; their directory is created on first download.
    /// Local sections need their directory to exist.
    pub fn is_available(&self) -> bool {
        match &self.basedir {
            None => false,
            Some(_) if self.remote => true,
            Some(dir) => Path::new(dir).is_dir(),
        }
    }

    /// Local base directory
    pub fn basedir_path(&self) -> Result<PathBuf> {
        self.basedir.as_deref().map(PathBuf::from).ok_or_else(|| {
            ShipperError::config(format!("The basedir is missing in section [{}]", self.name))
        })
    }

    /// Local path of `file_name` inside the base directory
    pub fn local_path(&self, file_name: &str) -> Result<PathBuf> {
        Ok(self.basedir_path()?.join(file_name))
    }

    /// Compiled remote filename filter
    pub fn filter_regex(&self) -> Result<Regex> {
        Regex::new(&self.filter).map_err(|e| {
            ShipperError::config(format!(
                "Invalid filter '{}' in section [{}]: {}",
                self.filter, self.name, e
            ))
        })
    }

    /// Private key path with a leading `~/` expanded against `$HOME`
    pub fn privkey_path(&self) -> Option<PathBuf> {
        let keyfile = self.privkeyfile.as_deref().filter(|k| !k.is_empty())?;
        match (keyfile.strip_prefix("~/"), std::env::var_os("HOME")) {
            (Some(rest), Some(home)) => Some(PathBuf::from(home).join(rest)),
            _ => Some(PathBuf::from(keyfile)),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

/// All configured sections, keyed by section name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportsConfig {
    sections: BTreeMap<String, SourceSection>,
}

impl ImportsConfig {
    /// Build from already constructed sections
    pub fn from_sections<I>(sections: I) -> Self
    where
        I: IntoIterator<Item = SourceSection>,
    {
        Self {
            sections: sections
                .into_iter()
                .map(|section| (section.name.clone(), section))
                .collect(),
        }
    }

    /// Load an INI file and apply environment overrides
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ShipperError::config(format!("Unable to load '{}': {}", path.display(), e))
        })?;
        let source = IniSource::new(content).with_origin(path.display().to_string());
        Self::build(source)
            .map_err(|e| ShipperError::config(format!("Unable to load '{}': {}", path.display(), e)))
    }

    /// Parse INI text; environment overrides apply here too
    pub fn from_ini_str(content: &str) -> Result<Self> {
        Self::build(IniSource::new(content))
            .map_err(|e| ShipperError::config(format!("Unable to parse imports configuration: {}", e)))
    }

    fn build<S>(source: S) -> std::result::Result<Self, ::config::ConfigError>
    where
        S: ::config::Source + Send + Sync + 'static,
    {
        let settings = ::config::Config::builder()
            .add_source(source)
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let mut sections: BTreeMap<String, SourceSection> = settings.try_deserialize()?;
        for (name, section) in sections.iter_mut() {
            section.name = name.clone();
        }

        Ok(Self { sections })
    }

    /// Sections in name order
    pub fn sections(&self) -> impl Iterator<Item = &SourceSection> {
        self.sections.values()
    }

    pub fn section(&self, name: &str) -> Option<&SourceSection> {
        self.sections.get(name)
    }

    /// The one section whose `basedir` equals `basedir`
    ///
    /// This is a pure lookup; availability is checked separately with
    /// [`SourceSection::is_available`].
    pub fn find(&self, basedir: &str) -> Result<&SourceSection> {
        let mut matches = self
            .sections
            .values()
            .filter(|section| section.basedir.as_deref() == Some(basedir));

        match (matches.next(), matches.next()) {
            (Some(section), None) => Ok(section),
            (None, _) => Err(ShipperError::config(format!(
                "The basedir \"{}\" is not in the imports configuration",
                basedir
            ))),
            (Some(first), Some(second)) => {
                let mut names = vec![first.name.as_str(), second.name.as_str()];
                names.extend(matches.map(|s| s.name.as_str()));
                Err(ShipperError::config(format!(
                    "The basedir \"{}\" is configured more than once: [{}]",
                    basedir,
                    names.join("], [")
                )))
            },
        }
    }
}

/// INI text as a `config` source, one table per section
///
/// Escape processing is off, so `\.` in a value stays `\.`. Keys outside any
/// section are ignored. Section and key names are lower-cased.
#[derive(Debug, Clone)]
struct IniSource {
    content: String,
    origin: Option<String>,
}

impl IniSource {
    fn new(content: impl Into<String>) -> Self {
        Self { content: content.into(), origin: None }
    }

    fn with_origin(mut self, origin: String) -> Self {
        self.origin = Some(origin);
        self
    }
}

impl Source for IniSource {
    fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
        Box::new(self.clone())
    }

    fn collect(&self) -> std::result::Result<Map<String, ConfigValue>, ConfigError> {
        let options = ParseOption { enabled_escape: false, ..ParseOption::default() };
        let ini = Ini::load_from_str_opt(&self.content, options)
            .map_err(|e| ConfigError::Foreign(Box::new(e)))?;
        let origin = self.origin.as_ref();

        let mut tables = Map::new();
        for (section, properties) in ini.iter() {
            let Some(section) = section else { continue };
            let table: Map<String, ConfigValue> = properties
                .iter()
                .map(|(key, value)| {
                    (key.to_lowercase(), ConfigValue::new(origin, ValueKind::String(value.to_string())))
                })
                .collect();
            tables.insert(section.to_lowercase(), ConfigValue::new(origin, ValueKind::Table(table)));
        }

        Ok(tables)
    }
}

/// Supplies the imports configuration on demand
pub trait ConfigLoader {
    fn load(&self) -> Result<ImportsConfig>;
}

/// Reads `imports.ini` from disk on every call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IniFile {
    path: PathBuf,
}

impl IniFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for IniFile {
    fn default() -> Self {
        Self::new(DEFAULT_IMPORTS_PATH)
    }
}

impl ConfigLoader for IniFile {
    fn load(&self) -> Result<ImportsConfig> {
        ImportsConfig::load(&self.path)
    }
}

impl ConfigLoader for ImportsConfig {
    fn load(&self) -> Result<ImportsConfig> {
        Ok(self.clone())
    }
}
