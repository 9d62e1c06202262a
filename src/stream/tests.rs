//! Tests for stream module

use super::*;
use crate::error::Error;
use crate::partition::{ContextSpec, SyncContext, TimeWindow};
use crate::types::SyncMode;
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;
use test_case::test_case;

fn locator(raw: &str) -> RecordLocator {
    RecordLocator::parse(raw).unwrap()
}

fn calls_stream() -> StreamDefinition {
    StreamDefinition::new("calls", "v1/calls", locator("$.calls[*]"))
        .with_primary_key(&["id"])
        .with_replication_key("started_at")
        .with_param("order", "asc")
        .with_partitioning(Partitioning::Windowed {
            from_param: "from".to_string(),
            to_param: "to".to_string(),
        })
}

fn user_stream() -> StreamDefinition {
    StreamDefinition::new("user", "v1/users/{user_id}", locator("$.user"))
        .with_replication_key("created_at")
        .with_bookmarkable(false)
        .with_partitioning(Partitioning::Child {
            parent: "users".to_string(),
            context: ContextSpec::new().with_field("user_id", "id"),
        })
}

// ============================================================================
// Record Locator Tests
// ============================================================================

#[test]
fn test_array_locator_extracts_records() {
    let records = locator("$.users[*]")
        .extract("users", &json!({"users": [{"id": 1}, {"id": 2}], "meta": {}}))
        .unwrap();
    assert_eq!(records, vec![json!({"id": 1}), json!({"id": 2})]);
}

#[test]
fn test_array_locator_accepts_empty_array() {
    let records = locator("$.users[*]")
        .extract("users", &json!({"users": []}))
        .unwrap();
    assert!(records.is_empty());
}

#[test_case(json!({"meta": {}}) ; "missing container")]
#[test_case(json!({"users": null}) ; "null container")]
#[test_case(json!({"users": {"id": 1}}) ; "object instead of array")]
#[test_case(json!("oops") ; "scalar body")]
fn test_array_locator_malformed(body: serde_json::Value) {
    let err = locator("$.users[*]").extract("users", &body).unwrap_err();
    assert!(matches!(err, Error::MalformedResponse { ref stream, .. } if stream == "users"));
}

#[test]
fn test_single_object_locator() {
    let l = locator("$.user");
    assert!(!l.selects_many());
    let records = l
        .extract("user", &json!({"user": {"id": 7, "name": "Ada"}}))
        .unwrap();
    assert_eq!(records, vec![json!({"id": 7, "name": "Ada"})]);

    assert!(l.extract("user", &json!({"users": []})).is_err());
}

#[test]
fn test_nested_and_root_locators() {
    let nested = locator("data.items[*]")
        .extract("s", &json!({"data": {"items": [1, 2]}}))
        .unwrap();
    assert_eq!(nested, vec![json!(1), json!(2)]);

    let root = locator("$[*]").extract("s", &json!([{"id": 1}])).unwrap();
    assert_eq!(root, vec![json!({"id": 1})]);
}

#[test]
fn test_expression_locator_uses_jsonpath() {
    let l = locator("$.users[?(@.available == true)]");
    assert!(l.selects_many());
    let records = l
        .extract(
            "users",
            &json!({"users": [{"id": 1, "available": true}, {"id": 2, "available": false}]}),
        )
        .unwrap();
    assert_eq!(records, vec![json!({"id": 1, "available": true})]);
}

#[test]
fn test_bracket_locator_extracts_records() {
    let l = locator("$['users'][*]");
    let records = l
        .extract("users", &json!({"users": [{"id": 1}, {"id": 2}]}))
        .unwrap();
    assert_eq!(records, vec![json!({"id": 1}), json!({"id": 2})]);

    assert!(l.extract("users", &json!({"users": []})).unwrap().is_empty());
}

#[test_case(json!({"meta": {}}) ; "missing container")]
#[test_case(json!({"users": null}) ; "null container")]
#[test_case(json!({"users": {"id": 1}}) ; "object instead of array")]
fn test_bracket_locator_malformed(body: serde_json::Value) {
    let err = locator("$['users'][*]").extract("users", &body).unwrap_err();
    assert!(matches!(err, Error::MalformedResponse { ref stream, .. } if stream == "users"));
}

#[test]
fn test_locator_rejects_empty() {
    assert!(RecordLocator::parse("  ").is_err());
}

#[test]
fn test_locator_serde() {
    let l: RecordLocator = serde_yaml::from_str("\"$.calls[*]\"").unwrap();
    assert_eq!(l.as_str(), "$.calls[*]");
    assert_eq!(serde_json::to_value(&l).unwrap(), json!("$.calls[*]"));
}

// ============================================================================
// Stream Definition Tests
// ============================================================================

#[test]
fn test_windowed_request_parameters() {
    let window = TimeWindow::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
    );
    let params = calls_stream()
        .build_request_parameters(&SyncContext::empty(), Some(&window))
        .unwrap();

    assert_eq!(params.path, "v1/calls");
    assert_eq!(
        params.query,
        vec![
            ("order".to_string(), "asc".to_string()),
            ("from".to_string(), "1704067200".to_string()),
            ("to".to_string(), "1704153600".to_string()),
        ]
    );
}

#[test]
fn test_windowed_without_window_omits_bounds() {
    let params = calls_stream()
        .build_request_parameters(&SyncContext::empty(), None)
        .unwrap();
    assert_eq!(params.query, vec![("order".to_string(), "asc".to_string())]);
}

#[test]
fn test_child_path_rendered_from_context() {
    let ctx = SyncContext::empty().with_value("user_id", 42);
    let params = user_stream().build_request_parameters(&ctx, None).unwrap();
    assert_eq!(params.path, "v1/users/42");
    assert!(params.query.is_empty());

    let err = user_stream()
        .build_request_parameters(&SyncContext::empty(), None)
        .unwrap_err();
    assert!(matches!(err, Error::UndefinedVariable { .. }));
}

#[test]
fn test_bookmark_flags() {
    let calls = calls_stream();
    assert!(calls.is_incremental());
    assert!(calls.should_persist_bookmark());
    assert_eq!(calls.sync_modes(), vec![SyncMode::FullRefresh, SyncMode::Incremental]);

    let user = user_stream();
    assert!(user.is_incremental());
    assert!(!user.should_persist_bookmark());
    assert_eq!(user.parent(), Some("users"));

    let full_table = StreamDefinition::new("teams", "v1/teams", locator("$.teams[*]"));
    assert!(!full_table.is_incremental());
    assert!(!full_table.should_persist_bookmark());
    assert_eq!(full_table.sync_modes(), vec![SyncMode::FullRefresh]);
}

#[test]
fn test_required_context_fields_include_params() {
    let stream = user_stream().with_param("team", "{team_id}");
    let fields: Vec<_> = stream.required_context_fields().into_iter().collect();
    assert_eq!(fields, vec!["team_id", "user_id"]);
}

#[test]
fn test_stream_from_yaml() {
    let yaml = r#"
name: user
path: v1/users/{user_id}
records: $.user
primary_key: [id]
replication_key: created_at
bookmarkable: false
partitioning:
  type: child
  parent: users
  context:
    user_id: id
"#;
    let stream: StreamDefinition = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(stream, user_stream().with_primary_key(&["id"]));
    assert_eq!(stream.partitioning.kind(), "child");
}

#[test]
fn test_windowed_defaults_from_yaml() {
    let yaml = "name: calls\npath: v1/calls\nrecords: $.calls[*]\npartitioning:\n  type: windowed\n";
    let stream: StreamDefinition = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(
        stream.partitioning,
        Partitioning::Windowed {
            from_param: "from".to_string(),
            to_param: "to".to_string()
        }
    );
    assert!(stream.bookmarkable);
}
