//! Tests for the HTTP client module

use super::*;
use crate::auth::AuthConfig;
use crate::error::Error;
use crate::types::{BackoffType, Method, QueryParams};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_config(base_url: &str) -> HttpClientConfig {
    HttpClientConfig::builder()
        .base_url(base_url)
        .max_retries(2)
        .backoff(
            BackoffType::Constant,
            Duration::from_millis(10),
            Duration::from_secs(1),
        )
        .no_rate_limit()
        .build()
}

fn no_query() -> QueryParams {
    Vec::new()
}

#[test]
fn test_http_client_config_default() {
    let config = HttpClientConfig::default();
    assert_eq!(config.timeout, Duration::from_secs(30));
    assert_eq!(config.max_retries, 3);
    assert!(config.base_url.is_none());
    assert_eq!(config.rate_limit, Some(RateLimiterConfig::per_minute(60)));
}

#[test]
fn test_http_client_config_builder() {
    let config = HttpClientConfig::builder()
        .base_url("https://api.aircall.io")
        .timeout(Duration::from_secs(60))
        .max_retries(5)
        .backoff(
            BackoffType::Linear,
            Duration::from_millis(200),
            Duration::from_secs(30),
        )
        .rate_limit(RateLimiterConfig::per_minute(120))
        .user_agent("test-agent/1.0")
        .build();

    assert_eq!(config.base_url, Some("https://api.aircall.io".to_string()));
    assert_eq!(config.timeout, Duration::from_secs(60));
    assert_eq!(config.max_retries, 5);
    assert_eq!(config.backoff_type, BackoffType::Linear);
    assert_eq!(config.initial_backoff, Duration::from_millis(200));
    assert_eq!(config.rate_limit.unwrap().requests_per_minute, 120);
    assert_eq!(config.user_agent, "test-agent/1.0");
}

#[tokio::test]
async fn test_transport_get_json_with_query() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/calls"))
        .and(query_param("from", "1704067200"))
        .and(query_param("to", "1704153600"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "calls": [{"id": 1}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = HttpClient::with_config(fast_config(&mock_server.uri())).unwrap();
    let query = vec![
        ("from".to_string(), "1704067200".to_string()),
        ("to".to_string(), "1704153600".to_string()),
    ];
    let body = Transport::request(&client, Method::GET, "v1/calls", &query)
        .await
        .unwrap();

    assert_eq!(body["calls"][0]["id"], 1);
}

#[tokio::test]
async fn test_transport_applies_auth() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/users"))
        .and(header("Authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"users": []})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = HttpClient::with_auth(
        fast_config(&mock_server.uri()),
        AuthConfig::Bearer {
            token: "tok".to_string(),
        },
    )
    .unwrap();
    let body = client.get_json("/v1/users", &no_query()).await.unwrap();
    assert_eq!(body, json!({"users": []}));
}

#[tokio::test]
async fn test_absolute_url_passes_through() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/users"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"users": []})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = HttpClient::with_config(fast_config("https://unused.invalid")).unwrap();
    let next = format!("{}/v1/users?page=2", mock_server.uri());
    client.get_json(&next, &no_query()).await.unwrap();
}

#[tokio::test]
async fn test_http_client_404_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/users/9"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not found"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = HttpClient::with_config(fast_config(&mock_server.uri())).unwrap();
    let err = client.get_json("v1/users/9", &no_query()).await.unwrap_err();

    assert!(matches!(err, Error::HttpStatus { status: 404, ref body } if body == "Not found"));
}

#[tokio::test]
async fn test_http_client_retry_on_500() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&mock_server)
        .await;

    let client = HttpClient::with_config(fast_config(&mock_server.uri())).unwrap();
    let body = client.get_json("/v1/flaky", &no_query()).await.unwrap();

    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn test_http_client_rate_limit_retry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/limited"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "0")
                .set_body_string("Rate limited"),
        )
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/limited"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&mock_server)
        .await;

    let client = HttpClient::with_config(fast_config(&mock_server.uri())).unwrap();
    let body = client.get_json("/v1/limited", &no_query()).await.unwrap();

    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn test_http_client_retries_exhausted() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/always-fail"))
        .respond_with(ResponseTemplate::new(503).set_body_string("down"))
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = HttpClient::with_config(fast_config(&mock_server.uri())).unwrap();
    let err = client
        .get_json("/v1/always-fail", &no_query())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::HttpStatus { status: 503, .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_invalid_json_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&mock_server)
        .await;

    let client = HttpClient::with_config(fast_config(&mock_server.uri())).unwrap();
    let err = client.get_json("/v1/users", &no_query()).await.unwrap_err();
    assert!(matches!(err, Error::JsonParse(_)));
}

#[test]
fn test_build_url() {
    let client = HttpClient::with_config(fast_config("https://api.aircall.io/")).unwrap();
    assert_eq!(
        client.build_url("/v1/users"),
        "https://api.aircall.io/v1/users"
    );
    assert_eq!(
        client.build_url("v1/users/1"),
        "https://api.aircall.io/v1/users/1"
    );
    assert_eq!(
        client.build_url("https://api.aircall.io/v1/users?page=2"),
        "https://api.aircall.io/v1/users?page=2"
    );
}

#[test]
fn test_calculate_backoff() {
    let linear = HttpClient::with_config(
        HttpClientConfig::builder()
            .backoff(
                BackoffType::Linear,
                Duration::from_millis(100),
                Duration::from_secs(10),
            )
            .no_rate_limit()
            .build(),
    )
    .unwrap();
    assert_eq!(linear.calculate_backoff(0), Duration::from_millis(100));
    assert_eq!(linear.calculate_backoff(2), Duration::from_millis(300));

    let exponential = HttpClient::with_config(
        HttpClientConfig::builder()
            .backoff(
                BackoffType::Exponential,
                Duration::from_millis(100),
                Duration::from_millis(500),
            )
            .no_rate_limit()
            .build(),
    )
    .unwrap();
    assert_eq!(exponential.calculate_backoff(0), Duration::from_millis(100));
    assert_eq!(exponential.calculate_backoff(2), Duration::from_millis(400));
    assert_eq!(exponential.calculate_backoff(3), Duration::from_millis(500));
}
