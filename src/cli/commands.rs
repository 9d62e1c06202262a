//! CLI commands and argument parsing

use crate::connectors::DEFAULT_CATALOG;
use crate::types::LogLevel;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Incremental extractor for the Aircall REST API
#[derive(Parser, Debug)]
#[command(name = "tap-aircall")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Catalog to sync: a built-in name or a YAML file
    #[arg(short, long, global = true, default_value = DEFAULT_CATALOG)]
    pub catalog: PathBuf,

    /// Configuration file (JSON)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Inline config JSON (takes precedence over --config)
    #[arg(long, global = true)]
    pub config_json: Option<String>,

    /// State file (JSON), read at start and rewritten as bookmarks advance
    #[arg(short, long, global = true)]
    pub state: Option<PathBuf>,

    /// Inline state JSON
    #[arg(long, global = true)]
    pub state_json: Option<String>,

    /// Log level
    #[arg(long, global = true, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Verbose output (same as --log-level debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Effective log level after applying `--verbose`
    pub fn effective_log_level(&self) -> LogLevel {
        match self.log_level {
            LogLevel::Trace => LogLevel::Trace,
            _ if self.verbose => LogLevel::Debug,
            level => level,
        }
    }
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the catalog's streams with keys and sync modes
    Discover,

    /// Extract records, writing RECORD, STATE and SYNC_SUMMARY lines to stdout
    Sync {
        /// Streams to sync (comma-separated, empty = all)
        #[arg(long)]
        streams: Option<String>,
    },

    /// Validate the catalog (and the config, when one is given)
    Validate,

    /// List built-in catalogs
    List,
}

/// Split a `--streams` value into names
pub fn parse_stream_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
