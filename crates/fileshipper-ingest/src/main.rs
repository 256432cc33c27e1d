//! Fileshipper - fetch and normalize files from configured import sources

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use fileshipper_common::logging::{init_logging, LogConfig};
use fileshipper_ingest::config::DEFAULT_IMPORTS_PATH;
use fileshipper_ingest::{
    Format, FetchRequest, ImportSettings, IniFile, SourceResolver, WorksheetAddressing,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "fileshipper")]
#[command(author, version, about = "Fetch and normalize files from configured import sources")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Imports configuration file
    #[arg(
        short,
        long,
        global = true,
        env = "FILESHIPPER_IMPORTS",
        default_value = DEFAULT_IMPORTS_PATH
    )]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch records and print them as JSON
    Fetch(RequestArgs),

    /// Print the column names of the first fetched record
    Columns(RequestArgs),

    /// List the formats this build can read
    Formats,

    /// List the configured base directories that are available
    Basedirs,

    /// List the files of a base directory, `*` first
    Files {
        /// Base directory as configured in the imports file
        #[arg(long)]
        basedir: String,
    },

    /// List the worksheets of a workbook
    Sheets {
        /// Workbook file
        #[arg(long)]
        path: PathBuf,
    },
}

#[derive(Args, Debug)]
struct RequestArgs {
    /// Stored import settings as JSON, instead of the individual options
    #[arg(long, conflicts_with_all = ["basedir", "file", "format"])]
    settings: Option<String>,

    /// Base directory as configured in the imports file
    #[arg(long, required_unless_present = "settings")]
    basedir: Option<String>,

    /// File name, or `*` for every file
    #[arg(long, required_unless_present = "settings")]
    file: Option<String>,

    /// csv, json, yaml, xml or xlsx
    #[arg(long, required_unless_present = "settings")]
    format: Option<String>,

    /// CSV field delimiter
    #[arg(long, default_value = ",")]
    delimiter: String,

    /// CSV value enclosure
    #[arg(long, default_value = "\"")]
    enclosure: String,

    /// Worksheet position, starting at 1
    #[arg(long, conflicts_with = "sheet_name")]
    sheet_position: Option<usize>,

    /// Worksheet name
    #[arg(long)]
    sheet_name: Option<String>,
}

impl RequestArgs {
    fn to_request(&self) -> Result<FetchRequest> {
        let settings = match &self.settings {
            Some(json) => ImportSettings::from_json(json)?,
            None => {
                let mut settings = ImportSettings::new(
                    self.basedir.clone().unwrap_or_default(),
                    self.file.clone().unwrap_or_default(),
                    self.format.clone().unwrap_or_default(),
                );
                settings.csv_delimiter = self.delimiter.clone();
                settings.csv_enclosure = self.enclosure.clone();
                if let Some(position) = self.sheet_position {
                    settings.worksheet_position = position;
                }
                if let Some(name) = &self.sheet_name {
                    settings.worksheet_addressing = WorksheetAddressing::ByName;
                    settings.worksheet_name = Some(name.clone());
                }
                settings
            },
        };

        Ok(settings.to_request()?)
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_config = LogConfig::for_verbosity(cli.verbose).merge_env()?;
    let _guard = init_logging(&log_config)?;

    debug!(config = %cli.config.display(), "Using imports configuration");
    let resolver = SourceResolver::new(IniFile::new(&cli.config));

    match cli.command {
        Command::Fetch(args) => {
            let result = resolver.fetch(&args.to_request()?)?;
            print_json(&result)?;
        },
        Command::Columns(args) => {
            let columns = resolver.list_columns(&args.to_request()?)?;
            print_json(&columns)?;
        },
        Command::Formats => {
            let formats: serde_json::Map<String, serde_json::Value> = Format::available()
                .into_iter()
                .map(|format| (format.as_str().to_string(), format.label().into()))
                .collect();
            print_json(&formats)?;
        },
        Command::Basedirs => {
            print_json(&resolver.list_base_directories()?)?;
        },
        Command::Files { basedir } => {
            print_json(&resolver.enum_files(&basedir)?)?;
        },
        Command::Sheets { path } => {
            print_json(&sheet_names(&path)?)?;
        },
    }

    Ok(())
}

#[cfg(feature = "xlsx")]
fn sheet_names(path: &std::path::Path) -> Result<Vec<String>> {
    Ok(fileshipper_ingest::format::workbook::sheet_names(path)?)
}

#[cfg(not(feature = "xlsx"))]
fn sheet_names(_path: &std::path::Path) -> Result<Vec<String>> {
    Format::Workbook.ensure_available()?;
    Ok(Vec::new())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
