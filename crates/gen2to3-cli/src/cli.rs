//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use gen2to3_cli::logging::LogFormat;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(
    name = "gen2to3",
    version,
    about = "Convert a Gen2 data repository into a Gen3 dataset registry",
    long_about = "Walk a Gen2 repository, translate every legacy data ID into a Gen3\n\
                  data ID with an ordered rule catalog, and register the datasets\n\
                  in a destination repository."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Convert a Gen2 repository.
    Convert(ConvertArgs),

    /// Translate a single legacy data ID and print the result.
    Translate(TranslateArgs),

    /// Show the effective rule catalog.
    Rules(RulesArgs),
}

#[derive(Parser)]
pub struct ConvertArgs {
    /// Root of the Gen2 repository.
    #[arg(value_name = "SOURCE_ROOT")]
    pub source: PathBuf,

    /// Root of the destination repository.
    #[arg(value_name = "DEST_ROOT")]
    pub dest: PathBuf,

    /// Output run for dataset types the catalog does not route
    /// (default: <INSTRUMENT>/gen2).
    #[arg(long = "collection", value_name = "RUN")]
    pub collection: Option<String>,

    #[command(flatten)]
    pub catalog: CatalogArgs,

    /// How payload files reach the destination.
    #[arg(long = "transfer", value_enum, default_value = "none")]
    pub transfer: TransferArg,

    /// Worker threads used for translation.
    #[arg(long = "jobs", short = 'j', value_name = "N", default_value_t = 1)]
    pub jobs: usize,

    /// Translate and check for duplicates without writing anything.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

#[derive(Parser)]
pub struct TranslateArgs {
    /// Gen2 dataset type of the record (e.g. raw, calexp, flat).
    #[arg(value_name = "DATASET_TYPE")]
    pub dataset_type: String,

    /// Legacy data ID as KEY=VALUE pairs.
    #[arg(value_name = "KEY=VALUE", required = true)]
    pub pairs: Vec<String>,

    #[command(flatten)]
    pub catalog: CatalogArgs,

    /// Show every rule that fired and the consumed keys.
    #[arg(long = "explain")]
    pub explain: bool,

    /// Output format.
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormatArg,
}

#[derive(Parser)]
pub struct RulesArgs {
    #[command(flatten)]
    pub catalog: CatalogArgs,

    /// Output format.
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormatArg,
}

/// Catalog selection shared by every command.
#[derive(Parser)]
pub struct CatalogArgs {
    /// Override catalog, layered on the built-in one (repeatable).
    #[arg(long = "config", value_name = "PATH")]
    pub config: Vec<PathBuf>,

    /// Instrument name (default: the catalog's instrument).
    #[arg(long = "instrument", value_name = "NAME")]
    pub instrument: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum TransferArg {
    None,
    Copy,
    Hardlink,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormatArg {
    Text,
    Json,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

impl From<LogLevelArg> for LevelFilter {
    fn from(level: LogLevelArg) -> Self {
        match level {
            LogLevelArg::Error => Self::ERROR,
            LogLevelArg::Warn => Self::WARN,
            LogLevelArg::Info => Self::INFO,
            LogLevelArg::Debug => Self::DEBUG,
            LogLevelArg::Trace => Self::TRACE,
        }
    }
}

impl From<LogFormatArg> for LogFormat {
    fn from(format: LogFormatArg) -> Self {
        match format {
            LogFormatArg::Pretty => Self::Pretty,
            LogFormatArg::Compact => Self::Compact,
            LogFormatArg::Json => Self::Json,
        }
    }
}
