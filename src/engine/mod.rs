//! Execution engine module
//!
//! Main read loop and stream orchestration.
//!
//! # Overview
//!
//! The engine module provides:
//! - `SyncEngine` - Runs a catalog: windows, parent/child contexts, bookmarks
//! - `PaginatedFetcher` - One pagination sequence for one unit
//! - `SyncSummary` - Per-unit outcomes of a run
//!
//! A *unit* is one (stream, context, window) fetch. Units of a windowed
//! stream, and the child units of one parent, run up to `max_concurrency`
//! at a time. Bookmarks are written when a unit completes, never for a
//! failed unit, and never for streams that opt out of bookmarking.

mod fetch;
mod types;

pub use fetch::{FetchError, FetchOutcome, PaginatedFetcher};
pub use types::{SyncConfig, SyncStats, SyncSummary, UnitReport, UnitStatus};

use crate::error::{Error, Result};
use crate::http::Transport;
use crate::loader::Catalog;
use crate::output::RecordSink;
use crate::partition::{partition_from, resolve_interval, resolve_start, SyncContext, TimeWindow};
use crate::state::{BookmarkStore, ReplicationKeyTracker, ReplicationValue};
use crate::stream::{RequestParams, StreamDefinition};
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Contexts derived from parent records, per child stream, in yield order
type ChildContexts = BTreeMap<String, Vec<Result<SyncContext>>>;

/// Which streams a run touches
struct SyncPlan<'a> {
    catalog: &'a Catalog,
    /// Streams whose records and bookmarks are emitted
    emit: BTreeSet<String>,
    /// Emitted streams plus the ancestors they need for contexts
    include: BTreeSet<String>,
    now: DateTime<Utc>,
}

impl<'a> SyncPlan<'a> {
    fn emits(&self, stream: &str) -> bool {
        self.emit.contains(stream)
    }

    fn children(&self, parent: &str) -> Vec<&'a StreamDefinition> {
        self.catalog
            .children_of(parent)
            .into_iter()
            .filter(|s| self.include.contains(&s.name))
            .collect()
    }
}

/// Result of one unit, before bookmarks are committed
struct UnitRun {
    report: UnitReport,
    tracker: Option<ReplicationKeyTracker>,
    contexts: ChildContexts,
}

enum ChildUnit {
    Run(SyncContext),
    Invalid(UnitReport),
}

/// Sync engine for orchestrating data extraction
pub struct SyncEngine {
    transport: Arc<dyn Transport>,
    store: Arc<dyn BookmarkStore>,
    sink: Arc<dyn RecordSink>,
    config: SyncConfig,
}

impl SyncEngine {
    /// Create a new sync engine
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn BookmarkStore>,
        sink: Arc<dyn RecordSink>,
    ) -> Self {
        Self {
            transport,
            store,
            sink,
            config: SyncConfig::default(),
        }
    }

    /// Set sync configuration
    #[must_use]
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the sync configuration
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Sync the catalog, or only the selected streams
    ///
    /// A selected child pulls in its ancestors; they are fetched for their
    /// contexts but neither emitted nor bookmarked. Unit failures end up in
    /// the summary; only an unknown stream name is an `Err`.
    pub async fn sync(&self, catalog: &Catalog, selection: Option<&[String]>) -> Result<SyncSummary> {
        let start = Instant::now();

        let emit: BTreeSet<String> = match selection {
            Some(names) if !names.is_empty() => {
                for name in names {
                    if !catalog.contains(name) {
                        return Err(Error::config(format!(
                            "Unknown stream '{name}'. Available: {}",
                            catalog.names().join(", ")
                        )));
                    }
                }
                names.iter().cloned().collect()
            }
            _ => catalog.streams.iter().map(|s| s.name.clone()).collect(),
        };

        let plan = SyncPlan {
            catalog,
            include: catalog.closure(&emit),
            emit,
            now: self.config.now.unwrap_or_else(Utc::now),
        };

        let mut reports = Vec::new();
        for root in catalog.roots().filter(|s| plan.include.contains(&s.name)) {
            info!(
                stream = %root.name,
                emit = plan.emits(&root.name),
                "Starting sync for stream"
            );
            reports.extend(self.sync_root(&plan, root).await);
        }

        let summary = SyncSummary::new(reports, start.elapsed().as_millis() as u64);
        info!(
            status = summary.status,
            succeeded = summary.succeeded,
            truncated = summary.truncated,
            failed = summary.failed,
            records = summary.stats.records_synced,
            duration_ms = summary.stats.duration_ms,
            "Sync finished"
        );
        Ok(summary)
    }

    /// Sync a root stream, then its descendants
    async fn sync_root(&self, plan: &SyncPlan<'_>, stream: &StreamDefinition) -> Vec<UnitReport> {
        let persist = stream.should_persist_bookmark() && plan.emits(&stream.name);
        let stored = if persist {
            self.load_bookmark(stream, "").await
        } else {
            None
        };

        let windows = if stream.is_windowed() {
            self.windows_for(stream, stored.as_ref(), plan.now)
        } else {
            None
        };

        let runs: Vec<UnitRun> = match windows {
            Some(windows) => {
                info!(stream = %stream.name, windows = windows.len(), "Partitioned into windows");
                futures::stream::iter(windows)
                    .map(|window| {
                        self.run_unit(plan, stream, SyncContext::empty(), Some(window), stored.clone())
                    })
                    .buffered(self.config.max_concurrency.max(1))
                    .collect()
                    .await
            }
            None => vec![
                self.run_unit(plan, stream, SyncContext::empty(), None, stored.clone())
                    .await,
            ],
        };

        if persist {
            self.commit_bookmark(stream, "", stored, &runs).await;
        }

        let mut reports = Vec::with_capacity(runs.len());
        let mut contexts = ChildContexts::new();
        for run in runs {
            reports.push(run.report);
            for (child, derived) in run.contexts {
                contexts.entry(child).or_default().extend(derived);
            }
        }

        reports.extend(self.sync_children(plan, stream, contexts).await);
        reports
    }

    /// One child unit per distinct context, then recurse
    fn sync_children<'a>(
        &'a self,
        plan: &'a SyncPlan<'a>,
        parent: &'a StreamDefinition,
        mut contexts: ChildContexts,
    ) -> BoxFuture<'a, Vec<UnitReport>> {
        async move {
            let mut reports = Vec::new();

            for child in plan.children(&parent.name) {
                let derived = contexts.remove(&child.name).unwrap_or_default();
                let mut seen = HashSet::new();
                let mut units = Vec::new();

                for (index, result) in derived.into_iter().enumerate() {
                    match result {
                        Ok(context) => {
                            if seen.insert(context.key()) {
                                units.push(ChildUnit::Run(context));
                            }
                        }
                        Err(e) => {
                            warn!(stream = %child.name, parent = %parent.name, index, error = %e, "Cannot derive child context");
                            units.push(ChildUnit::Invalid(UnitReport {
                                stream: child.name.clone(),
                                context: format!("{} record #{index}", parent.name),
                                window: None,
                                status: UnitStatus::Failed,
                                records: 0,
                                pages: 0,
                                error: Some(e.to_string()),
                            }));
                        }
                    }
                }

                info!(
                    stream = %child.name,
                    parent = %parent.name,
                    contexts = seen.len(),
                    "Syncing child stream"
                );

                let nested: Vec<Vec<UnitReport>> = futures::stream::iter(units)
                    .map(move |unit| async move {
                        match unit {
                            ChildUnit::Run(context) => self.sync_context(plan, child, context).await,
                            ChildUnit::Invalid(report) => vec![report],
                        }
                    })
                    .buffered(self.config.max_concurrency.max(1))
                    .collect()
                    .await;

                reports.extend(nested.into_iter().flatten());
            }

            reports
        }
        .boxed()
    }

    /// Sync a child stream for one context
    async fn sync_context(
        &self,
        plan: &SyncPlan<'_>,
        child: &StreamDefinition,
        context: SyncContext,
    ) -> Vec<UnitReport> {
        let key = context.key();
        let persist = child.should_persist_bookmark() && plan.emits(&child.name);
        let stored = if persist {
            self.load_bookmark(child, &key).await
        } else {
            None
        };

        let run = self
            .run_unit(plan, child, context, None, stored.clone())
            .await;

        if persist {
            self.commit_bookmark(child, &key, stored, std::slice::from_ref(&run))
                .await;
        }

        let UnitRun {
            report, contexts, ..
        } = run;
        let mut reports = vec![report];
        reports.extend(self.sync_children(plan, child, contexts).await);
        reports
    }

    /// Fetch one unit: emit records, track the bookmark, collect child contexts
    async fn run_unit(
        &self,
        plan: &SyncPlan<'_>,
        stream: &StreamDefinition,
        context: SyncContext,
        window: Option<TimeWindow>,
        stored: Option<Value>,
    ) -> UnitRun {
        let emit = plan.emits(&stream.name);
        let children = plan.children(&stream.name);

        let mut report = UnitReport {
            stream: stream.name.clone(),
            context: context.key(),
            window: window.as_ref().map(ToString::to_string),
            status: UnitStatus::Succeeded,
            records: 0,
            pages: 0,
            error: None,
        };
        let label = report.label();

        let mut tracker = stream
            .replication_key
            .as_ref()
            .map(|key| ReplicationKeyTracker::new(key, stored.clone()));
        let mut contexts = ChildContexts::new();

        let request = match self.request_for(stream, &context, window.as_ref(), stored.as_ref()) {
            Ok(request) => request,
            Err(e) => {
                error!(unit = %label, error = %e, "Cannot build request");
                report.status = UnitStatus::Failed;
                report.error = Some(e.to_string());
                return UnitRun {
                    report,
                    tracker: None,
                    contexts,
                };
            }
        };

        let fetcher = PaginatedFetcher::new(self.transport.as_ref(), stream, self.config.result_ceiling);
        let sink = self.sink.as_ref();

        let result = fetcher
            .fetch(request, &label, |record| {
                if let Some(tracker) = tracker.as_mut() {
                    tracker.observe(&record);
                }
                for child in &children {
                    if let Some(spec) = child.context_spec() {
                        contexts
                            .entry(child.name.clone())
                            .or_default()
                            .push(spec.derive(&child.name, &record));
                    }
                }
                if emit {
                    sink.emit(&stream.name, &record)?;
                }
                Ok(())
            })
            .await;

        match result {
            Ok(outcome) => {
                report.records = outcome.records;
                report.pages = outcome.pages;
                if outcome.truncated {
                    report.status = UnitStatus::Truncated;
                }
                debug!(unit = %label, records = outcome.records, pages = outcome.pages, "Unit complete");
            }
            Err(FetchError { error, partial }) => {
                error!(
                    unit = %label,
                    records = partial.records,
                    unit_scoped = error.is_unit_scoped(),
                    error = %error,
                    "Unit failed"
                );
                report.records = partial.records;
                report.pages = partial.pages;
                report.status = UnitStatus::Failed;
                report.error = Some(error.to_string());
            }
        }

        UnitRun {
            report,
            tracker,
            contexts,
        }
    }

    /// Render the first request of a unit
    fn request_for(
        &self,
        stream: &StreamDefinition,
        context: &SyncContext,
        window: Option<&TimeWindow>,
        stored: Option<&Value>,
    ) -> Result<RequestParams> {
        let mut request = stream.build_request_parameters(context, window)?;

        if let (Some(param), Some(per_page)) = (&stream.page_size_param, self.config.per_page) {
            request = request.with_query(param, per_page.to_string());
        }

        if window.is_none() {
            let since = stored
                .and_then(ReplicationValue::from_json)
                .and_then(|v| v.as_epoch_seconds());
            if let (Some(param), Some(since)) = (&stream.since_param, since) {
                request = request.with_query(param, since.to_string());
            }
        }

        Ok(request)
    }

    /// Windows for a windowed stream, resuming from the stored bookmark
    ///
    /// `None` when there is neither a start date nor a bookmark; the stream
    /// is then fetched unwindowed.
    fn windows_for(
        &self,
        stream: &StreamDefinition,
        stored: Option<&Value>,
        now: DateTime<Utc>,
    ) -> Option<Vec<TimeWindow>> {
        let configured = resolve_start(self.config.start_date.as_deref(), now);
        let resumed = stored
            .and_then(ReplicationValue::from_json)
            .and_then(|v| v.as_datetime());

        let start = match (configured, resumed) {
            (Some(configured), Some(resumed)) => configured.max(resumed),
            (configured, resumed) => configured.or(resumed)?,
        };

        let windows = partition_from(start, resolve_interval(self.config.interval_hours), now);
        if windows.is_empty() {
            info!(stream = %stream.name, start = %start, "Start is in the future, nothing to fetch");
        }
        Some(windows)
    }

    /// Advance a bookmark over the leading clean units
    ///
    /// Units are folded in order; folding stops at the first failure, and
    /// right after a truncated unit.
    async fn commit_bookmark(
        &self,
        stream: &StreamDefinition,
        context_key: &str,
        stored: Option<Value>,
        runs: &[UnitRun],
    ) {
        let Some(key) = &stream.replication_key else {
            return;
        };

        let mut tracker = ReplicationKeyTracker::new(key, stored);
        for run in runs {
            if run.report.is_failed() {
                break;
            }
            if let Some(unit_tracker) = &run.tracker {
                tracker.merge(unit_tracker);
            }
            if run.report.status == UnitStatus::Truncated {
                break;
            }
        }

        if !tracker.has_advanced() {
            return;
        }
        if let Some(bookmark) = tracker.bookmark() {
            match self
                .store
                .save(&stream.name, context_key, bookmark.clone())
                .await
            {
                Ok(()) => debug!(stream = %stream.name, context = context_key, %bookmark, "Bookmark advanced"),
                Err(e) => error!(stream = %stream.name, context = context_key, error = %e, "Failed to save bookmark"),
            }
        }
    }

    async fn load_bookmark(&self, stream: &StreamDefinition, context_key: &str) -> Option<Value> {
        match self.store.load(&stream.name, context_key).await {
            Ok(bookmark) => bookmark,
            Err(e) => {
                warn!(stream = %stream.name, context = context_key, error = %e, "Cannot read bookmark, starting fresh");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests;
