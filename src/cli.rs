//! Command-line interface definitions for docsift.
//!
//! Global options (verbosity, colour, cache location) apply to every
//! subcommand.
//!
//! # Example
//!
//! ```bash
//! # Group the scans in a folder
//! docsift scan ~/Scans --ext png --ext tiff
//!
//! # Tighter grouping, JSON output
//! docsift scan ~/Scans --threshold 4 --output json
//!
//! # Only the look-alike groups, as CSV
//! docsift scan ~/Scans --clusters-only --output csv
//!
//! # Persist the grouping threshold
//! docsift threshold 6
//!
//! # Cache maintenance
//! docsift cache-info
//! docsift clear-cache
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::orchestrator::DEFAULT_CONCURRENCY;

/// Cluster near-duplicate documents by first-page appearance.
///
/// docsift fingerprints the first page of every document in a folder,
/// sorts the documents so that look-alikes sit next to each other, and
/// splits the list into groups by Hamming distance.
#[derive(Debug, Parser)]
#[command(name = "docsift")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Print errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Cache directory (default: <temp dir>/docsift-cache)
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Cache size budget (e.g. 100MiB, 20MB)
    #[arg(long, global = true, value_name = "SIZE", value_parser = parse_size)]
    pub cache_budget: Option<u64>,

    /// Preferences file (default: platform config directory)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Fingerprint, sort and group the documents in a folder
    Scan(ScanArgs),
    /// Show or set the persisted grouping threshold
    Threshold(ThresholdArgs),
    /// Delete every cached fingerprint and thumbnail
    ClearCache,
    /// Show cache usage against its budget
    CacheInfo,
    /// Move documents to the trash
    Trash(PathsArgs),
    /// Show documents in the file browser
    Reveal(PathsArgs),
    /// Open a document with its default application
    Open(OpenArgs),
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Folder to scan (not recursive)
    #[arg(value_name = "DIR")]
    pub path: PathBuf,

    /// Document extensions to include, without the dot (repeatable)
    ///
    /// Defaults to PDF and every raster image format the built-in
    /// rasterizers read.
    #[arg(short, long = "ext", value_name = "EXT")]
    pub extensions: Vec<String>,

    /// Hamming-distance threshold for this run (not persisted)
    #[arg(short, long, value_name = "BITS", value_parser = clap::value_parser!(u32).range(0..=64))]
    pub threshold: Option<u32>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Also render thumbnails into the cache
    #[arg(long)]
    pub thumbnails: bool,

    /// Only list groups with more than one document
    #[arg(long)]
    pub clusters_only: bool,

    /// Thumbnails rendered concurrently
    #[arg(long, value_name = "N", default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Do not read or write the cache
    #[arg(long)]
    pub no_cache: bool,
}

/// Arguments for the threshold subcommand.
#[derive(Debug, Args)]
pub struct ThresholdArgs {
    /// New threshold to persist; omit to print the current one
    #[arg(value_name = "BITS", value_parser = clap::value_parser!(u32).range(0..=64))]
    pub value: Option<u32>,
}

/// Arguments naming one or more documents.
#[derive(Debug, Args)]
pub struct PathsArgs {
    /// Documents to act on
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,
}

/// Arguments for the open subcommand.
#[derive(Debug, Args)]
pub struct OpenArgs {
    /// Document to open
    #[arg(value_name = "PATH")]
    pub path: PathBuf,
}

/// Output format for scan results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Grouped human-readable listing
    Text,
    /// JSON output for scripting
    Json,
    /// CSV output for spreadsheets
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Parse a human-readable size string into bytes.
///
/// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
/// Case-insensitive. Numbers without suffix are treated as bytes.
///
/// # Examples
///
/// ```
/// use docsift::cli::parse_size;
///
/// assert_eq!(parse_size("1024").unwrap(), 1024);
/// assert_eq!(parse_size("1KB").unwrap(), 1000);
/// assert_eq!(parse_size("100MiB").unwrap(), 104_857_600);
/// ```
/// # Errors
///
/// Returns an error if the string is empty, contains an invalid number,
/// a negative number, or an unknown size suffix.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    if num < 0.0 {
        return Err("Size cannot be negative".to_string());
    }

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1_073_741_824,
        "TB" | "T" => 1_000_000_000_000,
        "TIB" => 1_099_511_627_776,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    Ok((num * multiplier as f64) as u64)
}
