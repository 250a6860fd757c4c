use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Validate supply-chain operations CSV files and summarise them",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the required columns and how each is interpreted
    Required,
    /// Run the intake pipeline once with the supplied answers and report the outcome
    Check(CheckArgs),
    /// Run the intake pipeline and render derived metrics for the cleaned data
    Dashboard(DashboardArgs),
    /// Run the intake pipeline, prompting on the terminal whenever it pauses
    Interactive(InteractiveArgs),
}

#[derive(Debug, Args)]
pub struct InputArgs {
    /// Uploaded CSV file (`-` reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Print the uploaded table (after header normalization and mapping)
    #[arg(long = "show-raw")]
    pub show_raw: bool,
}

#[derive(Debug, Args)]
pub struct ChoiceArgs {
    /// Map a missing required field onto an existing column: `FIELD=COLUMN`
    #[arg(long = "map", action = clap::ArgAction::Append)]
    pub map: Vec<String>,
    /// YAML file with previously chosen mappings (`mappings: {field: column}`)
    #[arg(long = "mapping")]
    pub mapping: Option<PathBuf>,
    /// Drop rows with missing required values and continue
    #[arg(long = "confirm-missing", conflicts_with = "decline_missing")]
    pub confirm_missing: bool,
    /// Stop when required values are missing
    #[arg(long = "decline-missing")]
    pub decline_missing: bool,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[command(flatten)]
    pub choices: ChoiceArgs,
}

#[derive(Debug, Args)]
pub struct DashboardArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[command(flatten)]
    pub choices: ChoiceArgs,
    /// Output format for the dashboard
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
    /// Number of cleaned rows (with derived values) to include in table output
    #[arg(long, default_value_t = 0)]
    pub rows: usize,
}

#[derive(Debug, Args)]
pub struct InteractiveArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Output format for the dashboard
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
    /// Number of cleaned rows (with derived values) to include in table output
    #[arg(long, default_value_t = 0)]
    pub rows: usize,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
