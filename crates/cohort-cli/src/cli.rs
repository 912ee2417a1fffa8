//! CLI argument definitions for the cohort explorer.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use cohort_cli::selector::{TableSelector, VariableSelector};

#[derive(Parser)]
#[command(
    name = "cohort-explorer",
    version,
    about = "Cohort Explorer - Browse, select and harmonise cohort metadata",
    long_about = "Load cohort metadata CSV files, browse and select variables across cohorts,\n\
                  and use a text-generation service to discover, match and harmonise them."
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

    /// TOML file with generation-service settings.
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// List ingested cohorts and any files that failed to load.
    Cohorts(InputArgs),

    /// Browse variables with optional facets.
    Browse(BrowseArgs),

    /// Ask a research question and get variable suggestions.
    Discover(DiscoverArgs),

    /// Find variables in other cohorts similar to one variable.
    Similar(SimilarArgs),

    /// Group selected variables into cross-cohort concepts.
    Harmonise(SelectionArgs),

    /// Write selected variables to a CSV file.
    Export(ExportArgs),
}

#[derive(Args)]
pub struct InputArgs {
    /// Metadata CSV files or folders containing them.
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,
}

#[derive(Args)]
pub struct BrowseArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Case-insensitive text matched against name and description.
    #[arg(long = "search", short = 's')]
    pub search: Option<String>,

    /// Only this cohort.
    #[arg(long = "cohort")]
    pub cohort: Option<String>,

    /// Only this table.
    #[arg(long = "table")]
    pub table: Option<String>,

    /// Minimum completeness percentage.
    #[arg(long = "min-completeness", default_value_t = 0.0)]
    pub min_completeness: f64,
}

#[derive(Args)]
pub struct DiscoverArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// The research question.
    #[arg(long = "question")]
    pub question: String,
}

#[derive(Args)]
pub struct SimilarArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[arg(long = "cohort")]
    pub cohort: String,

    #[arg(long = "table")]
    pub table: String,

    #[arg(long = "variable")]
    pub variable: String,
}

#[derive(Args)]
pub struct SelectionArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Select one variable (repeatable).
    #[arg(long = "select", value_name = "COHORT/TABLE/VARIABLE")]
    pub select: Vec<VariableSelector>,

    /// Select every variable of a table (repeatable).
    #[arg(long = "select-table", value_name = "COHORT/TABLE")]
    pub select_table: Vec<TableSelector>,
}

#[derive(Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Output file (default: selected_variables.csv).
    #[arg(long = "output", short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,
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
