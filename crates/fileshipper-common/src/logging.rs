//! Logging setup for the fileshipper binaries
//!
//! Log lines go to stderr, to a daily-rotated file, or to both. Stdout is left
//! alone because the CLI prints fetched records there.
//!
//! Library code only emits `tracing` events with structured fields:
//!
//! ```rust,ignore
//! info!(basedir = %basedir, file = %name, records = rows.len(), "Parsed file");
//! ```
//!
//! Binaries pick a starting configuration, let the environment override it
//! and install it once:
//!
//! ```no_run
//! use fileshipper_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = LogConfig::for_verbosity(false).merge_env()?;
//!     let _guard = init_logging(&config)?;
//!     tracing::warn!("Only warnings and errors are shown by default");
//!     Ok(())
//! }
//! ```

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// Environment variables read by [`LogConfig::merge_env`]
pub const ENV_LEVEL: &str = "FILESHIPPER_LOG_LEVEL";
pub const ENV_OUTPUT: &str = "FILESHIPPER_LOG_OUTPUT";
pub const ENV_FORMAT: &str = "FILESHIPPER_LOG_FORMAT";
pub const ENV_DIR: &str = "FILESHIPPER_LOG_DIR";
pub const ENV_FILTER: &str = "FILESHIPPER_LOG_FILTER";

/// Look `value` up in a table of accepted spellings
fn parse_choice<T: Copy>(what: &str, value: &str, choices: &[(&str, T)]) -> Result<T> {
    let wanted = value.trim().to_ascii_lowercase();
    choices
        .iter()
        .find(|(name, _)| *name == wanted)
        .map(|(_, choice)| *choice)
        .ok_or_else(|| {
            let names: Vec<&str> = choices.iter().map(|(name, _)| *name).collect();
            anyhow!("Invalid log {} '{}', expected one of: {}", what, value, names.join(", "))
        })
}

/// Minimum severity that is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_choice(
            "level",
            s,
            &[
                ("trace", LogLevel::Trace),
                ("debug", LogLevel::Debug),
                ("info", LogLevel::Info),
                ("warn", LogLevel::Warn),
                ("warning", LogLevel::Warn),
                ("error", LogLevel::Error),
            ],
        )
    }
}

/// Where log lines are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stderr,
    /// Daily-rotated file in the log directory
    File,
    Both,
}

impl LogOutput {
    fn to_stderr(self) -> bool {
        self != LogOutput::File
    }

    fn to_file(self) -> bool {
        self != LogOutput::Stderr
    }
}

impl std::str::FromStr for LogOutput {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_choice(
            "output",
            s,
            &[
                ("stderr", LogOutput::Stderr),
                ("console", LogOutput::Stderr),
                ("file", LogOutput::File),
                ("both", LogOutput::Both),
            ],
        )
    }
}

/// Line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_choice("format", s, &[("text", LogFormat::Text), ("json", LogFormat::Json)])
    }
}

/// How the binaries log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: LogLevel,
    pub output: LogOutput,
    pub format: LogFormat,
    /// Directory of the rotated log files
    pub log_dir: PathBuf,
    /// File name prefix, `fileshipper` gives `fileshipper.2026-10-19`
    pub log_file_prefix: String,
    /// Extra `EnvFilter` directives, comma separated
    pub filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            output: LogOutput::default(),
            format: LogFormat::default(),
            log_dir: PathBuf::from("/var/log/fileshipper"),
            log_file_prefix: "fileshipper".to_string(),
            filter: None,
        }
    }
}

impl LogConfig {
    /// Warnings only, or everything down to debug with `verbose`
    pub fn for_verbosity(verbose: bool) -> Self {
        Self {
            level: if verbose { LogLevel::Debug } else { LogLevel::Warn },
            ..Self::default()
        }
    }

    pub fn with_filter(mut self, directives: impl Into<String>) -> Self {
        self.filter = Some(directives.into());
        self
    }

    /// Override fields from `FILESHIPPER_LOG_*` variables that are set
    pub fn merge_env(mut self) -> Result<Self> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        if let Some(level) = var(ENV_LEVEL) {
            self.level = level.parse()?;
        }
        if let Some(output) = var(ENV_OUTPUT) {
            self.output = output.parse()?;
        }
        if let Some(format) = var(ENV_FORMAT) {
            self.format = format.parse()?;
        }
        if let Some(dir) = var(ENV_DIR) {
            self.log_dir = PathBuf::from(dir);
        }
        if let Some(filter) = var(ENV_FILTER) {
            self.filter = Some(filter);
        }

        Ok(self)
    }

    fn env_filter(&self) -> Result<EnvFilter> {
        let base = EnvFilter::builder()
            .with_default_directive(Level::from(self.level).into())
            .from_env_lossy();

        let Some(directives) = self.filter.as_deref() else {
            return Ok(base);
        };

        directives
            .split(',')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .try_fold(base, |filter, directive| {
                let directive = directive
                    .parse()
                    .with_context(|| format!("Invalid log filter directive '{}'", directive))?;
                Ok(filter.add_directive(directive))
            })
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn layer_for<W>(format: LogFormat, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer().with_writer(writer).with_ansi(ansi).with_target(true);
    match format {
        LogFormat::Text => layer.compact().boxed(),
        LogFormat::Json => layer.json().with_current_span(false).boxed(),
    }
}

/// Install the global subscriber
///
/// Hold the returned guard until exit when file output is on; dropping it
/// flushes the background writer.
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let filter = config.env_filter()?;
    let mut layers: Vec<BoxedLayer> = Vec::new();
    let mut guard = None;

    if config.output.to_stderr() {
        layers.push(layer_for(config.format, std::io::stderr, true));
    }

    if config.output.to_file() {
        std::fs::create_dir_all(&config.log_dir)
            .with_context(|| format!("Cannot create log directory {}", config.log_dir.display()))?;
        let appender = tracing_appender::rolling::daily(&config.log_dir, &config.log_file_prefix);
        let (writer, worker_guard) = tracing_appender::non_blocking(appender);
        layers.push(layer_for(config.format, writer, false));
        guard = Some(worker_guard);
    }

    tracing_subscriber::registry()
        .with(layers.with_filter(filter))
        .try_init()
        .context("A global logger is already installed")?;

    Ok(guard)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_parse_choices() {
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!(" json ".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("console".parse::<LogOutput>().unwrap(), LogOutput::Stderr);

        let err = "stdout".parse::<LogOutput>().unwrap_err();
        assert!(err.to_string().contains("expected one of: stderr, console, file, both"));
    }

    #[test]
    fn test_output_targets() {
        assert!(LogOutput::Stderr.to_stderr());
        assert!(!LogOutput::Stderr.to_file());
        assert!(!LogOutput::File.to_stderr());
        assert!(LogOutput::Both.to_stderr() && LogOutput::Both.to_file());
    }

    #[test]
    fn test_verbosity() {
        assert_eq!(LogConfig::for_verbosity(false).level, LogLevel::Warn);
        assert_eq!(LogConfig::for_verbosity(true).level, LogLevel::Debug);
    }

    #[test]
    fn test_invalid_filter_directive() {
        let config = LogConfig::default().with_filter("fileshipper_ingest=verbose");
        let err = config.env_filter().unwrap_err();
        assert!(err.to_string().contains("fileshipper_ingest=verbose"));
    }

    #[test]
    #[serial]
    fn test_environment_overrides() {
        std::env::set_var(ENV_LEVEL, "error");
        std::env::set_var(ENV_OUTPUT, "both");
        std::env::set_var(ENV_FILTER, "");

        let config = LogConfig::for_verbosity(true)
            .with_filter("ssh2=off")
            .merge_env();

        std::env::remove_var(ENV_LEVEL);
        std::env::remove_var(ENV_OUTPUT);
        std::env::remove_var(ENV_FILTER);

        let config = config.unwrap();
        assert_eq!(config.level, LogLevel::Error);
        assert_eq!(config.output, LogOutput::Both);
        assert_eq!(config.filter.as_deref(), Some("ssh2=off"));
    }

    #[test]
    #[serial]
    fn test_bad_environment_value_is_rejected() {
        std::env::set_var(ENV_FORMAT, "xml");
        let result = LogConfig::default().merge_env();
        std::env::remove_var(ENV_FORMAT);
        assert!(result.is_err());
    }
}
