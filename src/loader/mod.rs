//! YAML Loader module
//!
//! Parse stream catalogs from YAML files.
//!
//! # Overview
//!
//! The loader module provides:
//! - `Catalog` - Declarative list of streams
//! - YAML parsing with validation and topological ordering
//! - `DiscoveredStream` - Discovery output per stream

mod parser;
mod types;

pub use parser::{load_catalog, load_catalog_from_str};
pub use types::{Catalog, DiscoveredStream};
