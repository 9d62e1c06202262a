//! Partition types
//!
//! Defines the window and context values handed to the fetcher.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A half-open time range `[from, to)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeWindow {
    /// Create a new window
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// Window start as epoch seconds
    pub fn from_epoch(&self) -> i64 {
        self.from.timestamp()
    }

    /// Window end as epoch seconds
    pub fn to_epoch(&self) -> i64 {
        self.to.timestamp()
    }

    /// Check if an instant falls inside the window
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from <= at && at < self.to
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.from.to_rfc3339(), self.to.to_rfc3339())
    }
}

/// Values derived from one parent record that parameterize a child fetch
///
/// Root streams run with the empty context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncContext {
    values: BTreeMap<String, Value>,
}

impl SyncContext {
    /// The empty context used by root streams
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add a value to the context
    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Get a value by key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// All context values
    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    /// Field names in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Stable key used to address per-context state
    ///
    /// The empty context maps to `""`; otherwise the compact JSON object with
    /// sorted keys, e.g. `{"user_id":1}`.
    pub fn key(&self) -> String {
        if self.values.is_empty() {
            return String::new();
        }
        let map: serde_json::Map<String, Value> = self
            .values
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Value::Object(map).to_string()
    }

    /// Context as a JSON object for output messages
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

impl fmt::Display for SyncContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.values.is_empty() {
            f.write_str("root")
        } else {
            f.write_str(&self.key())
        }
    }
}
