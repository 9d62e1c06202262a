//! CLI module
//!
//! Command-line interface for the tap.
//!
//! # Commands
//!
//! - `discover` - List the catalog's streams
//! - `sync` - Extract records and bookmarks
//! - `validate` - Check the catalog and config
//! - `list` - List built-in catalogs

mod commands;
mod runner;

pub use commands::{parse_stream_list, Cli, Commands};
pub use runner::Runner;
