use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::io_utils::parse_delimiter;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Normalize, bin, rank and correlate locale-formatted census tables",
    long_about = None
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// YAML configuration file (built-in census configuration when omitted)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, global = true, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding candidates for the input, tried in order
    #[arg(long = "input-encoding", global = true, action = clap::ArgAction::Append)]
    pub input_encoding: Vec<String>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Normalize a census table and write it back as CSV (numbers rounded to two decimals)
    Clean(CleanArgs),
    /// Classify a numeric column into adaptive size groups
    Porte(PorteArgs),
    /// Show the top, middle and bottom entities by an aggregated metric
    Rank(RankArgs),
    /// Rank pairs of numeric columns by correlation strength
    Correlate(CorrelateArgs),
}

#[derive(Debug, Args)]
pub struct CleanArgs {
    /// Input census file ('-' for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Print the first N normalized rows as a table instead of writing CSV
    #[arg(long)]
    pub preview: Option<usize>,
}

#[derive(Debug, Args)]
pub struct PorteArgs {
    /// Input census file ('-' for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Numeric column to classify
    #[arg(short = 'c', long = "column")]
    pub column: String,
    /// Number of groups requested (defaults to the configured value)
    #[arg(long)]
    pub groups: Option<usize>,
    /// Emit the classification as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct RankArgs {
    /// Input census file ('-' for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Column holding the entity to rank (e.g. NOM_TERR)
    #[arg(long = "by")]
    pub by: String,
    /// Numeric column to sum per entity, or `count` to count rows
    #[arg(long, default_value = "count")]
    pub metric: String,
    /// Average the metric instead of summing it (requires a numeric --metric)
    #[arg(long)]
    pub mean: bool,
    /// Entities per view
    #[arg(short = 'n', long = "top", default_value_t = 3)]
    pub n: usize,
    /// Only rows belonging to this region
    #[arg(long)]
    pub region: Option<String>,
    /// Emit the rank set as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct CorrelateArgs {
    /// Input census file ('-' for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Restrict to these numeric columns (defaults to every numeric column)
    #[arg(short = 'C', long = "columns", value_delimiter = ',', action = clap::ArgAction::Append)]
    pub columns: Vec<String>,
    /// Number of pairs to show
    #[arg(long, default_value_t = 10)]
    pub top: usize,
    /// Emit the pairs as JSON
    #[arg(long)]
    pub json: bool,
}
