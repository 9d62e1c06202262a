//! Engine types
//!
//! Sync configuration, per-unit outcomes and run statistics.

use crate::config::{TapConfig, DEFAULT_RESULT_CEILING};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Configuration for a sync run
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Earliest timestamp for windowed streams
    pub start_date: Option<String>,
    /// Window width in hours
    pub interval_hours: Option<f64>,
    /// Concurrent windows or child contexts
    pub max_concurrency: usize,
    /// Records per unit before it is truncated
    pub result_ceiling: usize,
    /// Page size for streams declaring a page size parameter
    pub per_page: Option<u32>,
    /// Fixed clock, for reproducible windows
    pub now: Option<DateTime<Utc>>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            start_date: None,
            interval_hours: None,
            max_concurrency: 1,
            result_ceiling: DEFAULT_RESULT_CEILING,
            per_page: None,
            now: None,
        }
    }
}

impl SyncConfig {
    /// Create a new sync config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_start_date(mut self, start_date: impl Into<String>) -> Self {
        self.start_date = Some(start_date.into());
        self
    }

    #[must_use]
    pub fn with_interval_hours(mut self, hours: f64) -> Self {
        self.interval_hours = Some(hours);
        self
    }

    /// Set concurrency; zero is treated as one
    #[must_use]
    pub fn with_max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = n.max(1);
        self
    }

    #[must_use]
    pub fn with_result_ceiling(mut self, ceiling: usize) -> Self {
        self.result_ceiling = ceiling;
        self
    }

    #[must_use]
    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page);
        self
    }

    #[must_use]
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }
}

impl From<&TapConfig> for SyncConfig {
    fn from(config: &TapConfig) -> Self {
        Self {
            start_date: config.start_date.clone(),
            interval_hours: config.interval_hours,
            max_concurrency: config.max_concurrency.max(1),
            result_ceiling: config.result_ceiling,
            per_page: Some(config.per_page),
            now: None,
        }
    }
}

/// How a (stream, context, window) unit ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitStatus {
    Succeeded,
    /// Stopped at the result ceiling; fetched records are valid
    Truncated,
    Failed,
}

/// Outcome of one unit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitReport {
    pub stream: String,
    /// Context key; empty for root streams
    pub context: String,
    /// Window as `[from, to)`, for windowed streams
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<String>,
    pub status: UnitStatus,
    pub records: usize,
    pub pages: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UnitReport {
    pub fn is_failed(&self) -> bool {
        self.status == UnitStatus::Failed
    }

    /// Human label for logs: `calls [from, to)`, `user {"user_id":1}`
    pub fn label(&self) -> String {
        let mut label = self.stream.clone();
        if !self.context.is_empty() {
            label.push(' ');
            label.push_str(&self.context);
        }
        if let Some(window) = &self.window {
            label.push(' ');
            label.push_str(window);
        }
        label
    }
}

/// Statistics from a sync operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    /// Total records emitted
    pub records_synced: usize,
    /// Total pages fetched
    pub pages_fetched: usize,
    /// Streams with at least one unit
    pub streams_synced: usize,
    /// Units run
    pub units: usize,
    /// Units stopped at the result ceiling
    pub truncated: usize,
    /// Units that failed
    pub errors: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl SyncStats {
    /// Tally unit reports
    pub fn from_reports(reports: &[UnitReport]) -> Self {
        let mut stats = Self::default();
        let mut streams = std::collections::BTreeSet::new();
        for report in reports {
            streams.insert(report.stream.as_str());
            stats.units += 1;
            stats.records_synced += report.records;
            stats.pages_fetched += report.pages;
            match report.status {
                UnitStatus::Succeeded => {}
                UnitStatus::Truncated => stats.truncated += 1,
                UnitStatus::Failed => stats.errors += 1,
            }
        }
        stats.streams_synced = streams.len();
        stats
    }

    /// Set duration
    pub fn set_duration(&mut self, ms: u64) {
        self.duration_ms = ms;
    }
}

/// Result of a whole run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncSummary {
    /// SUCCEEDED, PARTIAL or FAILED
    pub status: &'static str,
    pub succeeded: usize,
    pub truncated: usize,
    pub failed: usize,
    pub stats: SyncStats,
    pub units: Vec<UnitReport>,
}

impl SyncSummary {
    /// Build a summary from unit reports in run order
    pub fn new(units: Vec<UnitReport>, duration_ms: u64) -> Self {
        let mut stats = SyncStats::from_reports(&units);
        stats.set_duration(duration_ms);

        let failed = stats.errors;
        let truncated = stats.truncated;
        let succeeded = units.len() - failed - truncated;
        let status = if failed == 0 {
            "SUCCEEDED"
        } else if failed == units.len() {
            "FAILED"
        } else {
            "PARTIAL"
        };

        Self {
            status,
            succeeded,
            truncated,
            failed,
            stats,
            units,
        }
    }

    /// Whether any unit failed; the CLI exits non-zero then
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Reports of one stream
    pub fn units_for<'a>(&'a self, stream: &'a str) -> impl Iterator<Item = &'a UnitReport> {
        self.units.iter().filter(move |u| u.stream == stream)
    }
}
