//! Partitioning module
//!
//! Supports: time windows for root streams, parent contexts for child streams
//!
//! # Overview
//!
//! Partitions split one stream into independent sub-queries:
//! - Time windows keep a single query under the API's result ceiling
//! - Sync contexts carry the parent identifiers a child resource path needs

mod context;
mod types;
mod windows;

pub use context::{extract_json_path, ContextSpec};
pub use types::{SyncContext, TimeWindow};
pub use windows::{
    parse_datetime, partition, partition_from, resolve_interval, resolve_start,
    DEFAULT_INTERVAL_HOURS, DEFAULT_LOOKBACK_DAYS,
};
