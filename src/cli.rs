use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about = "Infer, edit and validate CSV column value types", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the registered value types
    Types(TypesArgs),
    /// Guess a value type for every column of a CSV file
    Guess(GuessArgs),
    /// Check a CSV file against stored column definitions
    Validate(ValidateArgs),
    /// Interactively edit the options of one stored column definition
    Edit(EditArgs),
}

#[derive(Debug, Args)]
pub struct TypesArgs {
    /// Print the type picker markup instead of a table
    #[arg(long)]
    pub html: bool,
    /// Value type preselected in the picker markup
    #[arg(long, requires = "html")]
    pub current: Option<String>,
}

#[derive(Debug, Args)]
pub struct CsvArgs {
    /// Input CSV file (`-` for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Treat the first record as data and name columns field_1, field_2, ...
    #[arg(long = "no-header")]
    pub no_header: bool,
    /// Keep records whose fields are all empty
    #[arg(long = "keep-empty-lines")]
    pub keep_empty_lines: bool,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct GuessArgs {
    #[command(flatten)]
    pub csv: CsvArgs,
    /// Write the guessed column definitions to this YAML file
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// YAML file with `sampleSize` and per-type `thresholds`
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Number of leading rows each detector inspects
    #[arg(long = "sample-size")]
    pub sample_size: Option<usize>,
    /// Minimum confidence for a type, as `id=value` (repeatable)
    #[arg(long = "threshold", value_parser = parse_threshold, action = clap::ArgAction::Append)]
    pub thresholds: Vec<(String, f64)>,
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub csv: CsvArgs,
    /// Column definitions YAML produced by `guess`
    #[arg(short = 'd', long = "definitions")]
    pub definitions: PathBuf,
    /// Exit with an error when any row is invalid
    #[arg(long)]
    pub strict: bool,
}

#[derive(Debug, Args)]
pub struct EditArgs {
    /// Column definitions YAML to update
    #[arg(short = 'd', long = "definitions")]
    pub definitions: PathBuf,
    /// Name of the column to edit
    #[arg(short = 'c', long = "column")]
    pub column: String,
    /// Switch the column to this value type before editing
    #[arg(long = "type")]
    pub type_id: Option<String>,
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

pub fn parse_threshold(value: &str) -> Result<(String, f64), String> {
    let (id, threshold) = value
        .split_once('=')
        .ok_or_else(|| format!("Threshold '{value}' must look like id=value"))?;
    let id = id.trim();
    if id.is_empty() {
        return Err("Threshold type id cannot be empty".to_string());
    }
    let threshold = threshold
        .trim()
        .parse::<f64>()
        .map_err(|err| format!("Invalid threshold for '{id}': {err}"))?;
    Ok((id.to_string(), threshold))
}
