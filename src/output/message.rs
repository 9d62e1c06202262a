//! Protocol messages
//!
//! One JSON object per line on stdout:
//!
//! ```text
//! {"type":"RECORD","stream":"users","record":{...},"time_extracted":"..."}
//! {"type":"STATE","value":{"streams":{...}}}
//! {"type":"SYNC_SUMMARY","summary":{...}}
//! ```

use crate::error::Result;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

/// A line of tap output
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    /// One extracted record
    Record {
        stream: String,
        record: Value,
        time_extracted: String,
    },
    /// Bookmark state to resume from
    State { value: Value },
    /// Per-unit outcomes of a run
    SyncSummary { summary: Value },
}

impl Message {
    /// Create a record message stamped with the current time
    pub fn record(stream: impl Into<String>, record: Value) -> Self {
        Self::Record {
            stream: stream.into(),
            record,
            time_extracted: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    /// Create a state message
    pub fn state(value: Value) -> Self {
        Self::State { value }
    }

    /// Create a summary message from anything serializable
    pub fn summary(summary: &impl Serialize) -> Result<Self> {
        Ok(Self::SyncSummary {
            summary: serde_json::to_value(summary)?,
        })
    }

    /// Check if this is a record message
    pub fn is_record(&self) -> bool {
        matches!(self, Self::Record { .. })
    }

    /// Check if this is a state message
    pub fn is_state(&self) -> bool {
        matches!(self, Self::State { .. })
    }

    /// Serialize as a single line
    pub fn to_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
