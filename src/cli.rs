use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Reconcile two bills of materials by code, revision and quantity",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Compare an original (full) list against a partial list
    Compare(CompareArgs),
    /// Apply a rule sheet to a single list and write the cleaned rows
    Apply(ApplyArgs),
    /// Show how a rule sheet is interpreted
    Rules(RulesArgs),
    /// Preview the first rows of a list and the guessed column mapping
    Preview(PreviewArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
    Table,
}

#[derive(Debug, Args)]
pub struct CompareArgs {
    /// Original (full) list
    #[arg(short = 's', long = "original")]
    pub original: PathBuf,
    /// Partial list checked against the original
    #[arg(short = 'p', long = "partial")]
    pub partial: PathBuf,
    /// YAML job file with mappings and options (flags override it)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// Rule sheet applied to both lists before comparing
    #[arg(short = 'r', long = "rules")]
    pub rules: Option<PathBuf>,
    /// Rows to skip before the header row of the rule sheet
    #[arg(long = "rules-skip-rows")]
    pub rules_skip_rows: Option<usize>,
    /// Rows to skip before the header row of the original list
    #[arg(long = "original-skip-rows")]
    pub original_skip_rows: Option<usize>,
    /// Rows to skip before the header row of the partial list
    #[arg(long = "partial-skip-rows")]
    pub partial_skip_rows: Option<usize>,
    /// Original list column holding the part code
    #[arg(long = "original-code")]
    pub original_code: Option<String>,
    /// Original list column holding the quantity
    #[arg(long = "original-quantity")]
    pub original_quantity: Option<String>,
    /// Original list column holding the description
    #[arg(long = "original-description")]
    pub original_description: Option<String>,
    /// Original list column holding the revision
    #[arg(long = "original-revision")]
    pub original_revision: Option<String>,
    /// Original list column holding the category
    #[arg(long = "original-category")]
    pub original_category: Option<String>,
    /// Partial list column holding the part code
    #[arg(long = "partial-code")]
    pub partial_code: Option<String>,
    /// Partial list column holding the quantity
    #[arg(long = "partial-quantity")]
    pub partial_quantity: Option<String>,
    /// Partial list column holding the description
    #[arg(long = "partial-description")]
    pub partial_description: Option<String>,
    /// Partial list column holding the revision
    #[arg(long = "partial-revision")]
    pub partial_revision: Option<String>,
    /// Partial list column holding the category
    #[arg(long = "partial-category")]
    pub partial_category: Option<String>,
    /// Group original rows sharing a key before comparing
    #[arg(long)]
    pub aggregate: bool,
    /// Match on code alone, ignoring revisions
    #[arg(long = "ignore-revision")]
    pub ignore_revision: bool,
    /// Treat every code match as equal regardless of quantity
    #[arg(long = "ignore-quantity")]
    pub ignore_quantity: bool,
    /// Output file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Output format
    #[arg(long, value_enum, default_value = "csv")]
    pub format: OutputFormat,
    /// Print per-status counts after the results
    #[arg(long)]
    pub summary: bool,
    /// Exit with an error when any result is not QUANTITY_EQUAL
    #[arg(long = "fail-on-discrepancy")]
    pub fail_on_discrepancy: bool,
    /// Write the effective settings to a YAML job file
    #[arg(long = "save-config")]
    pub save_config: Option<PathBuf>,
    /// Delimiter for all inputs (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Delimiter for CSV output (defaults to the input delimiter)
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    /// Character encoding of the inputs (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// List to clean
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Rule sheet
    #[arg(short = 'r', long = "rules")]
    pub rules: PathBuf,
    /// Rows to skip before the header row of the input
    #[arg(long = "skip-rows", default_value_t = 0)]
    pub skip_rows: usize,
    /// Rows to skip before the header row of the rule sheet
    #[arg(long = "rules-skip-rows", default_value_t = 0)]
    pub rules_skip_rows: usize,
    /// Column holding the part code (guessed when omitted)
    #[arg(long)]
    pub code: Option<String>,
    /// Column holding the quantity (guessed when omitted)
    #[arg(long)]
    pub quantity: Option<String>,
    /// Column holding the description
    #[arg(long)]
    pub description: Option<String>,
    /// Column holding the category
    #[arg(long)]
    pub category: Option<String>,
    /// Output file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Render the cleaned rows as a table instead of CSV
    #[arg(long)]
    pub table: bool,
    /// Delimiter for inputs (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Delimiter for CSV output (defaults to the input delimiter)
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    /// Character encoding of the inputs (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct RulesArgs {
    /// Rule sheet to interpret
    #[arg(short = 'r', long = "rules")]
    pub rules: PathBuf,
    /// Rows to skip before the header row
    #[arg(long = "skip-rows", default_value_t = 0)]
    pub skip_rows: usize,
    /// Emit the parsed rules as JSON instead of a table
    #[arg(long)]
    pub json: bool,
    /// Delimiter (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    /// List to preview
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Number of rows to display
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
    /// Rows to skip before the header row
    #[arg(long = "skip-rows", default_value_t = 0)]
    pub skip_rows: usize,
    /// Delimiter (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "pipe" | "|" => Ok(b'|'),
        "semicolon" | ";" => Ok(b';'),
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
