//! Output module
//!
//! Everything the tap writes to stdout goes through here.
//!
//! # Overview
//!
//! This module provides:
//! - `Message` - RECORD, STATE and SYNC_SUMMARY protocol lines
//! - `RecordSink` - Where extracted records go
//! - `JsonLinesSink` - Sink writing one JSON message per line (stdout in the CLI)
//! - `MemorySink` - Sink collecting records in memory

mod message;
mod sink;

pub use message::Message;
pub use sink::{JsonLinesSink, MemorySink, RecordSink};
