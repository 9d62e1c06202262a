//! Replication key tracking
//!
//! One [`ReplicationKeyTracker`] lives per (stream, context) unit and holds
//! the maximum replication-key value seen so far. It is seeded with the
//! persisted bookmark, so its value never moves backwards across runs.

use crate::partition::{extract_json_path, parse_datetime};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::cmp::Ordering;
use tracing::warn;

/// A comparable replication-key value
#[derive(Debug, Clone, PartialEq)]
pub enum ReplicationValue {
    Integer(i64),
    Float(f64),
    Timestamp(DateTime<Utc>),
    Text(String),
}

impl ReplicationValue {
    /// Interpret a JSON value; `None` for null, bool, arrays and objects
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .map(Self::Integer)
                .or_else(|| n.as_f64().map(Self::Float)),
            Value::String(s) => Some(
                parse_datetime(s)
                    .map(Self::Timestamp)
                    .unwrap_or_else(|| Self::Text(s.clone())),
            ),
            _ => None,
        }
    }

    /// Order two values of compatible kinds
    ///
    /// Integers and floats compare numerically; other mixed kinds are
    /// incomparable.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
            (Self::Integer(a), Self::Float(b)) => (*a as f64).partial_cmp(b),
            (Self::Float(a), Self::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Timestamp(a), Self::Timestamp(b)) => Some(a.cmp(b)),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// The value as an instant, treating numbers as epoch seconds
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Integer(secs) => DateTime::from_timestamp(*secs, 0),
            Self::Float(secs) => DateTime::from_timestamp(secs.floor() as i64, 0),
            Self::Timestamp(dt) => Some(*dt),
            Self::Text(_) => None,
        }
    }

    /// The value as epoch seconds
    pub fn as_epoch_seconds(&self) -> Option<i64> {
        self.as_datetime().map(|dt| dt.timestamp())
    }
}

/// Tracks the maximum replication-key value for one (stream, context)
#[derive(Debug, Clone)]
pub struct ReplicationKeyTracker {
    key: String,
    /// Parsed maximum and the raw JSON it came from
    max: Option<(ReplicationValue, Value)>,
    initial: Option<Value>,
}

impl ReplicationKeyTracker {
    /// Create a tracker seeded with a previously persisted bookmark
    pub fn new(key: impl Into<String>, initial: Option<Value>) -> Self {
        let max = initial
            .as_ref()
            .and_then(|raw| ReplicationValue::from_json(raw).map(|v| (v, raw.clone())));
        Self {
            key: key.into(),
            max,
            initial,
        }
    }

    /// Replication key path
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Observe one record
    pub fn observe(&mut self, record: &Value) {
        if let Some(raw) = extract_json_path(record, &self.key) {
            self.observe_value(raw);
        }
    }

    /// Observe a raw replication-key value
    pub fn observe_value(&mut self, raw: Value) {
        let Some(candidate) = ReplicationValue::from_json(&raw) else {
            return;
        };

        match &self.max {
            None => self.max = Some((candidate, raw)),
            Some((current, _)) => match candidate.compare(current) {
                Some(Ordering::Greater) => self.max = Some((candidate, raw)),
                Some(_) => {}
                None => warn!(
                    key = %self.key,
                    value = %raw,
                    "Replication key value not comparable with current bookmark, ignoring"
                ),
            },
        }
    }

    /// Fold another tracker's maximum into this one
    pub fn merge(&mut self, other: &ReplicationKeyTracker) {
        if let Some((_, raw)) = &other.max {
            self.observe_value(raw.clone());
        }
    }

    /// Current bookmark value
    pub fn bookmark(&self) -> Option<&Value> {
        self.max.as_ref().map(|(_, raw)| raw)
    }

    /// Current bookmark, parsed
    pub fn bookmark_value(&self) -> Option<&ReplicationValue> {
        self.max.as_ref().map(|(value, _)| value)
    }

    /// Whether the bookmark moved past the seeded value
    pub fn has_advanced(&self) -> bool {
        self.bookmark() != self.initial.as_ref()
    }
}
