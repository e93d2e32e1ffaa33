use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::sink::ConflictPolicy;

pub const DEFAULT_WORK_TABLE: &str = "tb_work_reviews_all";
pub const DEFAULT_RAW_TABLE: &str = "tb_raw_reviews_all";

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Coerce, normalize, validate and load survey review files",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the full pipeline and write the validated table to the database
    Run(RunArgs),
    /// Land the input file unchanged in the database
    Raw(RawArgs),
    /// Coerce, normalize and validate without writing anything
    Check(CheckArgs),
    /// Show the first rows of the normalized table
    Preview(PreviewArgs),
}

#[derive(Debug, Args)]
pub struct InputArgs {
    /// Input CSV file ('-' reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct TransformArgs {
    /// JSON or YAML file mapping column names to int, float, string or bool
    #[arg(short = 't', long = "types")]
    pub types: PathBuf,
    /// YAML contract describing the validated table
    #[arg(short = 'c', long = "contract")]
    pub contract: PathBuf,
}

#[derive(Debug, Args)]
pub struct SinkArgs {
    /// SQLite database file receiving the table
    #[arg(long = "database", env = "SURVEY_INGEST_DATABASE")]
    pub database: PathBuf,
    /// Destination table name
    #[arg(long = "table", env = "SURVEY_INGEST_TABLE")]
    pub table: Option<String>,
    /// What to do when the destination table already exists
    #[arg(
        long = "if-exists",
        env = "SURVEY_INGEST_IF_EXISTS",
        value_enum,
        default_value_t = ConflictPolicy::Replace
    )]
    pub if_exists: ConflictPolicy,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[command(flatten)]
    pub transform: TransformArgs,
    #[command(flatten)]
    pub sink: SinkArgs,
}

#[derive(Debug, Args)]
pub struct RawArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[command(flatten)]
    pub sink: SinkArgs,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[command(flatten)]
    pub transform: TransformArgs,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// JSON or YAML file mapping column names to int, float, string or bool
    #[arg(short = 't', long = "types")]
    pub types: Option<PathBuf>,
    /// Number of rows to display
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
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
