//! Tests for the sync engine

use super::*;
use crate::loader::load_catalog_from_str;
use crate::output::MemorySink;
use crate::state::StateManager;
use crate::types::{Method, QueryParams};
use async_trait::async_trait;
use chrono::TimeZone;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Mutex;

// ============================================================================
// Fixtures
// ============================================================================

type Handler = Box<dyn Fn(&str, &QueryParams) -> Result<Value> + Send + Sync>;

/// Transport answering from a closure and recording every request
struct MockTransport {
    handler: Handler,
    calls: Mutex<Vec<(String, QueryParams)>>,
}

impl MockTransport {
    fn new(handler: impl Fn(&str, &QueryParams) -> Result<Value> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<(String, QueryParams)> {
        self.calls.lock().unwrap().clone()
    }

    fn paths(&self) -> Vec<String> {
        self.calls().into_iter().map(|(path, _)| path).collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn request(&self, _method: Method, path: &str, query: &QueryParams) -> Result<Value> {
        self.calls
            .lock()
            .unwrap()
            .push((path.to_string(), query.clone()));
        (self.handler)(path, query)
    }
}

/// Bookmark store recording every save
struct CountingStore {
    inner: StateManager,
    saves: Mutex<Vec<(String, String, Value)>>,
}

impl CountingStore {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: StateManager::in_memory(),
            saves: Mutex::new(Vec::new()),
        })
    }

    fn saves_for(&self, stream: &str) -> Vec<(String, Value)> {
        self.saves
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _, _)| s == stream)
            .map(|(_, key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

#[async_trait]
impl BookmarkStore for CountingStore {
    async fn load(&self, stream: &str, context_key: &str) -> Result<Option<Value>> {
        BookmarkStore::load(&self.inner, stream, context_key).await
    }

    async fn save(&self, stream: &str, context_key: &str, value: Value) -> Result<()> {
        self.saves
            .lock()
            .unwrap()
            .push((stream.to_string(), context_key.to_string(), value.clone()));
        BookmarkStore::save(&self.inner, stream, context_key, value).await
    }
}

fn param<'a>(query: &'a QueryParams, key: &str) -> Option<&'a str> {
    query
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn epoch(query: &QueryParams, key: &str) -> i64 {
    param(query, key).unwrap().parse().unwrap()
}

fn ts(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

const CALLS_CATALOG: &str = r#"
name: test
streams:
  - name: calls
    path: v1/calls
    records: $.calls[*]
    primary_key: [id]
    replication_key: started_at
    pagination:
      type: next_url
      path: meta.next_page_link
    partitioning:
      type: windowed
"#;

fn users_catalog(bookmarkable: bool) -> Catalog {
    load_catalog_from_str(&format!(
        r#"
name: test
streams:
  - name: users
    path: v1/users
    records: $.users[*]
    primary_key: [id]
    replication_key: created_at
  - name: user
    path: v1/users/{{user_id}}
    records: $.user
    primary_key: [id]
    replication_key: created_at
    bookmarkable: {bookmarkable}
    partitioning:
      type: child
      parent: users
      context:
        user_id: id
"#
    ))
    .unwrap()
}

/// `v1/users` lists the given parents; `v1/users/{id}` returns one user
fn users_handler(parents: Vec<Value>) -> impl Fn(&str, &QueryParams) -> Result<Value> + Send + Sync {
    move |path, _query| {
        if path == "v1/users" {
            return Ok(json!({"users": parents, "meta": {"next_page_link": null}}));
        }
        let id: i64 = path.trim_start_matches("v1/users/").parse().unwrap();
        Ok(json!({"user": {"id": id, "created_at": format!("2024-02-0{id}T00:00:00Z")}}))
    }
}

fn engine(
    transport: Arc<MockTransport>,
    store: Arc<dyn BookmarkStore>,
    sink: Arc<MemorySink>,
    config: SyncConfig,
) -> SyncEngine {
    SyncEngine::new(transport, store, sink).with_config(config)
}

// ============================================================================
// Windowed Streams
// ============================================================================

#[tokio::test]
async fn test_windowed_stream_fetches_each_window() {
    let catalog = load_catalog_from_str(CALLS_CATALOG).unwrap();
    let transport = MockTransport::new(|_path, query| {
        let from = epoch(query, "from");
        Ok(json!({
            "calls": [{"id": from, "started_at": from + 60}],
            "meta": {"next_page_link": null}
        }))
    });
    let state = StateManager::in_memory();
    let sink = Arc::new(MemorySink::new());
    let config = SyncConfig::new()
        .with_start_date("2024-01-01T00:00:00Z")
        .with_interval_hours(24.0)
        .with_now(Utc.with_ymd_and_hms(2024, 1, 3, 12, 0, 0).unwrap());

    let summary = engine(transport.clone(), Arc::new(state.clone()), sink.clone(), config)
        .sync(&catalog, None)
        .await
        .unwrap();

    let bounds: Vec<(i64, i64)> = transport
        .calls()
        .iter()
        .map(|(_, q)| (epoch(q, "from"), epoch(q, "to")))
        .collect();
    assert_eq!(
        bounds,
        vec![
            (ts(2024, 1, 1, 0).timestamp(), ts(2024, 1, 2, 0).timestamp()),
            (ts(2024, 1, 2, 0).timestamp(), ts(2024, 1, 3, 0).timestamp()),
            (ts(2024, 1, 3, 0).timestamp(), ts(2024, 1, 4, 0).timestamp()),
        ]
    );

    assert_eq!(sink.records_for("calls").len(), 3);
    assert_eq!(summary.succeeded, 3);
    assert!(!summary.has_failures());
    assert_eq!(
        state.get_bookmark("calls", "").await,
        Some(json!(ts(2024, 1, 3, 0).timestamp() + 60))
    );
}

#[tokio::test]
async fn test_windowed_stream_resumes_from_bookmark() {
    let catalog = load_catalog_from_str(CALLS_CATALOG).unwrap();
    let transport = MockTransport::new(|_path, _query| Ok(json!({"calls": []})));
    let state = StateManager::from_json(
        r#"{"streams": {"calls": {"bookmark": "2024-01-02T06:00:00Z"}}}"#,
    )
    .unwrap();
    let config = SyncConfig::new()
        .with_start_date("2024-01-01T00:00:00Z")
        .with_now(ts(2024, 1, 3, 12));

    engine(transport.clone(), Arc::new(state.clone()), Arc::new(MemorySink::new()), config)
        .sync(&catalog, None)
        .await
        .unwrap();

    let froms: Vec<i64> = transport.calls().iter().map(|(_, q)| epoch(q, "from")).collect();
    assert_eq!(
        froms,
        vec![ts(2024, 1, 2, 6).timestamp(), ts(2024, 1, 3, 6).timestamp()]
    );
    assert_eq!(
        state.get_bookmark("calls", "").await,
        Some(json!("2024-01-02T06:00:00Z"))
    );
}

#[tokio::test]
async fn test_failed_window_holds_back_bookmark() {
    let catalog = load_catalog_from_str(CALLS_CATALOG).unwrap();
    let second = ts(2024, 1, 2, 0).timestamp();
    let transport = MockTransport::new(move |_path, query| {
        let from = epoch(query, "from");
        if from == second {
            return Err(Error::http_status(503, "unavailable"));
        }
        Ok(json!({"calls": [{"id": from, "started_at": from + 60}]}))
    });
    let state = StateManager::in_memory();
    let sink = Arc::new(MemorySink::new());
    let config = SyncConfig::new()
        .with_start_date("2024-01-01")
        .with_max_concurrency(2)
        .with_now(ts(2024, 1, 3, 12));

    let summary = engine(transport.clone(), Arc::new(state.clone()), sink.clone(), config)
        .sync(&catalog, None)
        .await
        .unwrap();

    assert_eq!(transport.calls().len(), 3);
    assert_eq!(sink.records_for("calls").len(), 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.status, "PARTIAL");
    assert!(summary.has_failures());

    let failed = summary.units.iter().find(|u| u.is_failed()).unwrap();
    assert!(failed.error.as_deref().unwrap().contains("HTTP 503"));
    assert_eq!(
        state.get_bookmark("calls", "").await,
        Some(json!(ts(2024, 1, 1, 0).timestamp() + 60))
    );
}

#[tokio::test]
async fn test_result_ceiling_truncates_window_and_run_continues() {
    let catalog = load_catalog_from_str(CALLS_CATALOG).unwrap();
    let first = ts(2024, 1, 1, 0).timestamp();
    let transport = MockTransport::new(move |path, query| {
        let from = epoch(query, "from");
        if from != first {
            let records: Vec<Value> = (0..10)
                .map(|i| json!({"id": from + i, "started_at": from + i}))
                .collect();
            return Ok(json!({"calls": records, "meta": {"next_page_link": null}}));
        }

        let page: i64 = path
            .split("page=")
            .nth(1)
            .map_or(1, |p| p.parse().unwrap());
        let records: Vec<Value> = (0..100)
            .map(|i| {
                let n = (page - 1) * 100 + i;
                json!({"id": n, "started_at": from + n})
            })
            .collect();
        let next = if page < 3 {
            json!(format!("v1/calls?page={}", page + 1))
        } else {
            Value::Null
        };
        Ok(json!({"calls": records, "meta": {"next_page_link": next}}))
    });
    let state = StateManager::in_memory();
    let sink = Arc::new(MemorySink::new());
    let config = SyncConfig::new()
        .with_start_date("2024-01-01T00:00:00Z")
        .with_result_ceiling(250)
        .with_now(ts(2024, 1, 2, 12));

    let summary = engine(transport.clone(), Arc::new(state.clone()), sink.clone(), config)
        .sync(&catalog, None)
        .await
        .unwrap();

    let units: Vec<(UnitStatus, usize, usize)> = summary
        .units
        .iter()
        .map(|u| (u.status, u.records, u.pages))
        .collect();
    assert_eq!(
        units,
        vec![(UnitStatus::Truncated, 250, 3), (UnitStatus::Succeeded, 10, 1)]
    );
    assert_eq!(sink.records_for("calls").len(), 260);
    assert!(!summary.has_failures());

    // Follow-up pages keep the window bounds the link does not carry
    let (path, query) = &transport.calls()[1];
    assert_eq!(path, "v1/calls?page=2");
    assert_eq!(epoch(query, "from"), first);

    assert_eq!(state.get_bookmark("calls", "").await, Some(json!(first + 249)));
}

#[tokio::test]
async fn test_windowed_stream_without_start_date_fetches_once() {
    let catalog = load_catalog_from_str(CALLS_CATALOG).unwrap();
    let transport = MockTransport::new(|_path, _query| Ok(json!({"calls": [{"id": 1}]})));

    let summary = engine(
        transport.clone(),
        Arc::new(StateManager::in_memory()),
        Arc::new(MemorySink::new()),
        SyncConfig::new(),
    )
    .sync(&catalog, None)
    .await
    .unwrap();

    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(param(&calls[0].1, "from"), None);
    assert_eq!(summary.units[0].window, None);
}

#[tokio::test]
async fn test_future_start_date_fetches_nothing() {
    let catalog = load_catalog_from_str(CALLS_CATALOG).unwrap();
    let transport = MockTransport::new(|_path, _query| Ok(json!({"calls": []})));
    let config = SyncConfig::new()
        .with_start_date("2030-01-01T00:00:00Z")
        .with_now(ts(2024, 1, 1, 0));

    let summary = engine(
        transport.clone(),
        Arc::new(StateManager::in_memory()),
        Arc::new(MemorySink::new()),
        config,
    )
    .sync(&catalog, None)
    .await
    .unwrap();

    assert!(transport.calls().is_empty());
    assert!(summary.units.is_empty());
    assert_eq!(summary.status, "SUCCEEDED");
}

// ============================================================================
// Parent / Child
// ============================================================================

#[tokio::test]
async fn test_child_fetch_per_parent_record() {
    let transport = MockTransport::new(users_handler(vec![
        json!({"id": 1, "created_at": "2024-01-01T00:00:00Z", "name": "Ada"}),
        json!({"id": 2, "created_at": "2024-01-02T00:00:00Z", "name": "Grace"}),
    ]));
    let store = CountingStore::new();
    let sink = Arc::new(MemorySink::new());

    let summary = engine(transport.clone(), store.clone(), sink.clone(), SyncConfig::new())
        .sync(&users_catalog(true), None)
        .await
        .unwrap();

    assert_eq!(transport.paths(), vec!["v1/users", "v1/users/1", "v1/users/2"]);
    assert_eq!(sink.records_for("users").len(), 2);
    assert_eq!(sink.records_for("user").len(), 2);

    let contexts: Vec<&str> = summary
        .units_for("user")
        .map(|u| u.context.as_str())
        .collect();
    assert_eq!(contexts, vec![r#"{"user_id":1}"#, r#"{"user_id":2}"#]);

    assert_eq!(
        store.saves_for("user"),
        vec![
            (r#"{"user_id":1}"#.to_string(), json!("2024-02-01T00:00:00Z")),
            (r#"{"user_id":2}"#.to_string(), json!("2024-02-02T00:00:00Z")),
        ]
    );
    assert_eq!(
        store.saves_for("users"),
        vec![(String::new(), json!("2024-01-02T00:00:00Z"))]
    );
}

#[tokio::test]
async fn test_non_bookmarkable_child_never_writes_bookmarks() {
    let transport = MockTransport::new(users_handler(vec![json!({"id": 1}), json!({"id": 2})]));
    let store = CountingStore::new();
    let sink = Arc::new(MemorySink::new());

    let summary = engine(transport, store.clone(), sink.clone(), SyncConfig::new())
        .sync(&users_catalog(false), None)
        .await
        .unwrap();

    assert_eq!(summary.units_for("user").count(), 2);
    assert_eq!(sink.records_for("user").len(), 2);
    assert!(store.saves_for("user").is_empty());
}

#[tokio::test]
async fn test_duplicate_parents_share_one_child_fetch() {
    let transport = MockTransport::new(users_handler(vec![
        json!({"id": 1}),
        json!({"id": 1}),
        json!({"id": 2}),
    ]));

    engine(
        transport.clone(),
        CountingStore::new(),
        Arc::new(MemorySink::new()),
        SyncConfig::new(),
    )
    .sync(&users_catalog(false), None)
    .await
    .unwrap();

    assert_eq!(transport.paths(), vec!["v1/users", "v1/users/1", "v1/users/2"]);
}

#[tokio::test]
async fn test_missing_context_field_fails_only_that_child() {
    let transport = MockTransport::new(users_handler(vec![
        json!({"id": 1}),
        json!({"name": "no id"}),
    ]));
    let sink = Arc::new(MemorySink::new());

    let summary = engine(transport.clone(), CountingStore::new(), sink.clone(), SyncConfig::new())
        .sync(&users_catalog(false), None)
        .await
        .unwrap();

    assert_eq!(transport.paths(), vec!["v1/users", "v1/users/1"]);
    assert_eq!(sink.records_for("user").len(), 1);
    assert_eq!(summary.failed, 1);

    let failed = summary.units.iter().find(|u| u.is_failed()).unwrap();
    assert_eq!(failed.stream, "user");
    assert!(failed.error.as_deref().unwrap().contains("user_id"));
}

#[tokio::test]
async fn test_child_failure_is_isolated() {
    let transport = MockTransport::new(|path, _query| match path {
        "v1/users" => Ok(json!({"users": [{"id": 1}, {"id": 2}]})),
        "v1/users/1" => Err(Error::http_status(404, "not found")),
        _ => Ok(json!({"user": {"id": 2, "created_at": "2024-03-01T00:00:00Z"}})),
    });
    let store = CountingStore::new();
    let sink = Arc::new(MemorySink::new());
    let config = SyncConfig::new().with_max_concurrency(4);

    let summary = engine(transport, store.clone(), sink.clone(), config)
        .sync(&users_catalog(true), None)
        .await
        .unwrap();

    let statuses: Vec<(String, UnitStatus)> = summary
        .units_for("user")
        .map(|u| (u.context.clone(), u.status))
        .collect();
    assert_eq!(
        statuses,
        vec![
            (r#"{"user_id":1}"#.to_string(), UnitStatus::Failed),
            (r#"{"user_id":2}"#.to_string(), UnitStatus::Succeeded),
        ]
    );
    assert_eq!(sink.records_for("user").len(), 1);
    assert_eq!(
        store.saves_for("user"),
        vec![(r#"{"user_id":2}"#.to_string(), json!("2024-03-01T00:00:00Z"))]
    );
}

#[tokio::test]
async fn test_grandchildren_follow_their_parent() {
    let catalog = load_catalog_from_str(
        r#"
name: test
streams:
  - name: teams
    path: v1/teams
    records: $.teams[*]
  - name: team
    path: v1/teams/{team_id}
    records: $.team.users[*]
    partitioning:
      type: child
      parent: teams
      context:
        team_id: id
  - name: user
    path: v1/users/{user_id}
    records: $.user
    partitioning:
      type: child
      parent: team
      context:
        user_id: id
"#,
    )
    .unwrap();
    let transport = MockTransport::new(|path, _query| match path {
        "v1/teams" => Ok(json!({"teams": [{"id": 7}]})),
        "v1/teams/7" => Ok(json!({"team": {"users": [{"id": 1}, {"id": 2}]}})),
        _ => Ok(json!({"user": {"id": 0}})),
    });

    let summary = engine(
        transport.clone(),
        CountingStore::new(),
        Arc::new(MemorySink::new()),
        SyncConfig::new(),
    )
    .sync(&catalog, None)
    .await
    .unwrap();

    assert_eq!(
        transport.paths(),
        vec!["v1/teams", "v1/teams/7", "v1/users/1", "v1/users/2"]
    );
    assert_eq!(summary.stats.units, 4);
}

// ============================================================================
// Selection and Requests
// ============================================================================

#[tokio::test]
async fn test_selected_child_fetches_parent_silently() {
    let transport = MockTransport::new(users_handler(vec![json!({
        "id": 1,
        "created_at": "2024-01-01T00:00:00Z"
    })]));
    let store = CountingStore::new();
    let sink = Arc::new(MemorySink::new());

    engine(transport.clone(), store.clone(), sink.clone(), SyncConfig::new())
        .sync(&users_catalog(true), Some(&["user".to_string()]))
        .await
        .unwrap();

    assert_eq!(transport.paths(), vec!["v1/users", "v1/users/1"]);
    assert!(sink.records_for("users").is_empty());
    assert_eq!(sink.records_for("user").len(), 1);
    assert!(store.saves_for("users").is_empty());
    assert_eq!(store.saves_for("user").len(), 1);
}

#[tokio::test]
async fn test_unknown_stream_selection() {
    let transport = MockTransport::new(|_path, _query| Ok(json!({})));
    let err = engine(
        transport,
        CountingStore::new(),
        Arc::new(MemorySink::new()),
        SyncConfig::new(),
    )
    .sync(&users_catalog(true), Some(&["teams".to_string()]))
    .await
    .unwrap_err();

    assert!(err.to_string().contains("Unknown stream 'teams'"));
}

#[tokio::test]
async fn test_since_and_page_size_params() {
    let catalog = load_catalog_from_str(
        r#"
name: test
streams:
  - name: users
    path: v1/users
    records: $.users[*]
    replication_key: created_at
    page_size_param: per_page
    since_param: from
"#,
    )
    .unwrap();
    let transport = MockTransport::new(|_path, _query| Ok(json!({"users": []})));
    let state = StateManager::from_json(
        r#"{"streams": {"users": {"bookmark": "2024-01-01T00:00:00Z"}}}"#,
    )
    .unwrap();

    engine(
        transport.clone(),
        Arc::new(state),
        Arc::new(MemorySink::new()),
        SyncConfig::new().with_per_page(50),
    )
    .sync(&catalog, None)
    .await
    .unwrap();

    let (_, query) = &transport.calls()[0];
    assert_eq!(param(query, "per_page"), Some("50"));
    assert_eq!(epoch(query, "from"), ts(2024, 1, 1, 0).timestamp());
}

#[tokio::test]
async fn test_malformed_response_fails_unit() {
    let catalog = users_catalog(false);
    let transport = MockTransport::new(|_path, _query| Ok(json!({"meta": {}})));
    let store = CountingStore::new();

    let summary = engine(transport.clone(), store.clone(), Arc::new(MemorySink::new()), SyncConfig::new())
        .sync(&catalog, None)
        .await
        .unwrap();

    assert_eq!(transport.paths(), vec!["v1/users"]);
    assert_eq!(summary.status, "FAILED");
    assert!(summary.units[0]
        .error
        .as_deref()
        .unwrap()
        .contains("Malformed response"));
    assert!(store.saves_for("users").is_empty());
}
