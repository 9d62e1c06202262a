//! Time window partitioning
//!
//! Splits `[start, now]` into contiguous half-open windows of a fixed width.
//! Windows are generated by repeated addition while the window start is
//! `<= now`, so the last window may end after `now`. A step that would
//! overflow the calendar closes the last window at the latest instant.

use super::types::TimeWindow;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use tracing::info;

/// Lookback applied when the configured start date cannot be parsed
pub const DEFAULT_LOOKBACK_DAYS: i64 = 30;

/// Window width used when the configured interval is unusable
pub const DEFAULT_INTERVAL_HOURS: f64 = 24.0;

/// Partition `[start_date, now]` into windows of `interval_hours`
///
/// Returns no windows when `start_date` is absent; the caller falls back to
/// an unwindowed fetch in that case.
pub fn partition(
    start_date: Option<&str>,
    interval_hours: Option<f64>,
    now: DateTime<Utc>,
) -> Vec<TimeWindow> {
    let Some(start) = resolve_start(start_date, now) else {
        return Vec::new();
    };
    partition_from(start, resolve_interval(interval_hours), now)
}

/// Partition from an already resolved start instant
pub fn partition_from(start: DateTime<Utc>, step: Duration, now: DateTime<Utc>) -> Vec<TimeWindow> {
    let mut windows = Vec::new();
    if step <= Duration::zero() {
        return windows;
    }

    let mut current = start;
    while current <= now {
        let Some(next) = current.checked_add_signed(step) else {
            windows.push(TimeWindow::new(current, DateTime::<Utc>::MAX_UTC));
            break;
        };
        windows.push(TimeWindow::new(current, next));
        current = next;
    }

    windows
}

/// Resolve the configured start date
///
/// `None` when unset or blank. An unparsable value falls back to
/// `now - DEFAULT_LOOKBACK_DAYS` and is logged, never raised.
pub fn resolve_start(start_date: Option<&str>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let raw = start_date.map(str::trim).filter(|s| !s.is_empty())?;

    match parse_datetime(raw) {
        Some(start) => Some(start),
        None => {
            let fallback = now - Duration::days(DEFAULT_LOOKBACK_DAYS);
            info!(
                event = "ConfigDefaultApplied",
                field = "start_date",
                value = raw,
                default = %fallback.to_rfc3339(),
                "Unparsable start_date, using default lookback"
            );
            Some(fallback)
        }
    }
}

/// Resolve the configured window width
///
/// Unset, zero, negative or non-finite values fall back to
/// `DEFAULT_INTERVAL_HOURS`.
pub fn resolve_interval(interval_hours: Option<f64>) -> Duration {
    let requested = interval_hours.filter(|h| h.is_finite() && *h > 0.0);

    let step = requested.and_then(|hours| {
        let millis = (hours * 3_600_000.0).round();
        if millis >= 1.0 && millis < i64::MAX as f64 {
            Duration::try_milliseconds(millis as i64)
        } else {
            None
        }
    });

    match step {
        Some(step) => step,
        None => {
            if let Some(raw) = interval_hours {
                info!(
                    event = "ConfigDefaultApplied",
                    field = "interval_hours",
                    value = raw,
                    default = DEFAULT_INTERVAL_HOURS,
                    "Unusable interval_hours, using default"
                );
            }
            hours(DEFAULT_INTERVAL_HOURS)
        }
    }
}

fn hours(h: f64) -> Duration {
    Duration::seconds((h * 3600.0) as i64)
}

/// Parse a datetime string into UTC
///
/// Accepts RFC 3339 first, then a few common naive formats interpreted as UTC.
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    let formats = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d",
        "%Y/%m/%d",
    ];

    for fmt in formats {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(DateTime::from_naive_utc_and_offset(ndt, Utc));
        }
        if let Ok(nd) = NaiveDate::parse_from_str(s, fmt) {
            let ndt = nd.and_hms_opt(0, 0, 0)?;
            return Some(DateTime::from_naive_utc_and_offset(ndt, Utc));
        }
    }

    None
}
