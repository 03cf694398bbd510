//! CLI argument definitions for the voyage column mapper.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "voyage-mapper",
    version,
    about = "Copy consumption report columns into the VOYAGE sheet of a workbook",
    long_about = "Copy consumption report columns into the VOYAGE sheet of a workbook.\n\n\
                  Reads the source sheet (XLSX, XLS, ODS or CSV), renames the mapped\n\
                  columns, fills missing values with 0 and writes them under the matching\n\
                  headers of the target sheet, starting on row 2."
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

    /// Prefix log lines with a timestamp.
    #[arg(long = "log-timestamps", global = true)]
    pub log_timestamps: bool,

    /// Include the module path in log lines.
    #[arg(long = "log-target", global = true)]
    pub log_target: bool,

    /// Omit span close events from JSON logs.
    #[arg(long = "no-log-spans", global = true)]
    pub no_log_spans: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Map a source sheet into the target workbook.
    Transfer(TransferArgs),

    /// Print the active column mapping.
    Mapping(MappingArgs),
}

#[derive(Parser)]
pub struct TransferArgs {
    /// Source spreadsheet (XLSX, XLSM, XLSB, XLS, ODS or CSV).
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Target workbook containing the sheet to fill.
    #[arg(value_name = "TARGET")]
    pub target: PathBuf,

    /// Where to write the result (default: the configured output file name
    /// in the current directory).
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// TOML configuration file.
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Target sheet name (default: VOYAGE).
    #[arg(long = "sheet", value_name = "NAME")]
    pub sheet: Option<String>,

    /// Source sheet name (default: the first sheet).
    #[arg(long = "source-sheet", value_name = "NAME")]
    pub source_sheet: Option<String>,

    /// Number of mapped rows to preview.
    #[arg(long = "preview", value_name = "N", default_value_t = 10)]
    pub preview: usize,

    /// Run the transfer and report without writing the output file.
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Print the transfer report as JSON instead of tables.
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Parser)]
pub struct MappingArgs {
    /// TOML configuration file whose `[[mapping]]` entries replace the built-in mapping.
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,
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
