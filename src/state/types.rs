//! State types for tracking sync progress
//!
//! These types are serialized to JSON and persisted between runs:
//!
//! ```json
//! { "streams": { "calls": { "bookmark": 1704153600 },
//!                "user":  { "contexts": { "{\"user_id\":1}": { "bookmark": "..." } } } } }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Complete state for the tap
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Per-stream state
    #[serde(default)]
    pub streams: BTreeMap<String, StreamState>,
}

impl State {
    /// Create a new empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get state for a stream
    pub fn get_stream(&self, stream: &str) -> Option<&StreamState> {
        self.streams.get(stream)
    }

    /// Get mutable state for a stream, creating if needed
    pub fn get_stream_mut(&mut self, stream: &str) -> &mut StreamState {
        self.streams.entry(stream.to_string()).or_default()
    }

    /// Get the bookmark for a (stream, context) key
    ///
    /// The empty context key addresses the stream-level bookmark.
    pub fn get_bookmark(&self, stream: &str, context_key: &str) -> Option<&Value> {
        let stream_state = self.streams.get(stream)?;
        if context_key.is_empty() {
            stream_state.bookmark.as_ref()
        } else {
            stream_state.contexts.get(context_key)?.bookmark.as_ref()
        }
    }

    /// Set the bookmark for a (stream, context) key
    pub fn set_bookmark(&mut self, stream: &str, context_key: &str, value: Value) {
        let stream_state = self.get_stream_mut(stream);
        if context_key.is_empty() {
            stream_state.bookmark = Some(value);
        } else {
            stream_state
                .contexts
                .entry(context_key.to_string())
                .or_default()
                .bookmark = Some(value);
        }
    }
}

/// State for a single stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamState {
    /// Stream-level bookmark (root streams)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bookmark: Option<Value>,

    /// Per-context bookmarks (child streams)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub contexts: BTreeMap<String, ContextState>,
}

/// State for a single child context
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bookmark: Option<Value>,
}
