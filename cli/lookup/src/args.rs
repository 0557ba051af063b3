//! CLI argument definitions for fm-lookup.

use clap::{Parser, ValueEnum};
pub use fm_cli_common::LogLevel;
use fm_types::{HttpMethod, MapFormat, RefreshMode};
use std::path::PathBuf;

/// Field-substitution lookup over NDJSON events.
///
/// Reads one JSON event per line from stdin, replaces configured field values
/// using a lookup map loaded from a file or a web service, and writes the
/// events to stdout.
///
/// ## Examples
///
/// Map HTTP status codes using a YAML file:
///   fm-lookup --field status --path status.yml < events.ndjson
///
/// Single field into a destination, with a fallback:
///   fm-lookup --field code --destination reason --fallback "unknown %{code}" --path codes.csv
///
/// Several lookups from config files:
///   fm-lookup --config status.yml --config hosts.json
#[derive(Parser, Debug)]
#[command(name = "fm-lookup")]
#[command(version, about, long_about = None)]
pub struct Cli {
    // === Config files ===
    /// Lookup config file (YAML, or JSON by extension). Repeat for several lookups
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    pub configs: Vec<PathBuf>,

    // === Inline lookup ===
    /// Field to look up. Repeat for multi-field lookups
    #[arg(short = 'f', long = "field", value_name = "FIELD")]
    pub fields: Vec<String>,

    /// Write the result of a single-field lookup into this field
    #[arg(long, conflicts_with_all = ["result_key", "overwrite_source"])]
    pub destination: Option<String>,

    /// Nest multi-field results under this key
    #[arg(long, conflicts_with = "overwrite_source")]
    pub result_key: Option<String>,

    /// Replace the looked-up fields in place
    #[arg(long)]
    pub overwrite_source: bool,

    /// Overwrite an existing destination field
    #[arg(long = "override")]
    pub override_existing: bool,

    /// Map file path
    #[arg(long, conflicts_with = "url")]
    pub path: Option<String>,

    /// Map web service URL
    #[arg(long, env = "FM_MAP_URL")]
    pub url: Option<String>,

    /// HTTP method for --url
    #[arg(long, value_enum, default_value = "get")]
    pub method: MethodArg,

    /// HTTP header for --url, as NAME=VALUE
    #[arg(long = "header", value_name = "NAME=VALUE", value_parser = parse_key_val)]
    pub headers: Vec<(String, String)>,

    /// Request parameter for --url, as NAME=VALUE
    #[arg(long = "param", value_name = "NAME=VALUE", value_parser = parse_key_val)]
    pub params: Vec<(String, String)>,

    /// HTTP timeout in seconds
    #[arg(long, default_value = "30", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// Directory to cache downloaded maps in
    #[arg(long, env = "FM_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Map format (inferred from the path or URL when omitted)
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,

    /// Seconds between map refreshes
    #[arg(long, default_value = "300", value_parser = clap::value_parser!(u64).range(1..))]
    pub refresh_interval: u64,

    /// How refreshed maps are applied
    #[arg(long, value_enum, default_value = "merge")]
    pub refresh_mode: RefreshModeArg,

    /// Fallback template written when a value is not in the map
    #[arg(long)]
    pub fallback: Option<String>,

    /// Per-field fallback template, as FIELD=TEMPLATE
    #[arg(long = "default-value", value_name = "FIELD=TEMPLATE", value_parser = parse_key_val)]
    pub default_values: Vec<(String, String)>,

    /// Tag added to matched events. Repeatable
    #[arg(long = "add-tag", value_name = "TAG")]
    pub add_tags: Vec<String>,

    // === Output ===
    /// Output format for events
    #[arg(long, value_enum, default_value = "compact")]
    pub output_format: OutputFormat,

    // === Logging ===
    /// Log level
    #[arg(short = 'l', long, value_enum, default_value = "info")]
    pub log_level: LogLevel,
}

/// HTTP method.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MethodArg {
    Get,
    Post,
}

impl From<MethodArg> for HttpMethod {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::Get => HttpMethod::Get,
            MethodArg::Post => HttpMethod::Post,
        }
    }
}

/// Map format.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FormatArg {
    #[value(alias = "yml")]
    Yaml,
    Json,
    Csv,
}

impl From<FormatArg> for MapFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Yaml => MapFormat::Yaml,
            FormatArg::Json => MapFormat::Json,
            FormatArg::Csv => MapFormat::Csv,
        }
    }
}

/// Refresh mode.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RefreshModeArg {
    /// Union new entries into the table
    Merge,
    /// Swap in the new table
    Replace,
}

impl From<RefreshModeArg> for RefreshMode {
    fn from(arg: RefreshModeArg) -> Self {
        match arg {
            RefreshModeArg::Merge => RefreshMode::Merge,
            RefreshModeArg::Replace => RefreshMode::Replace,
        }
    }
}

/// Output format for events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One JSON object per line
    Compact,
    /// Pretty-printed JSON
    Pretty,
}

/// Parse a NAME=VALUE pair.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("'{s}' is not in NAME=VALUE form"))?;
    if key.is_empty() {
        return Err(format!("'{s}' has an empty name"));
    }
    Ok((key.to_string(), value.to_string()))
}
