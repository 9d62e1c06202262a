//! Transport seam between the extraction engine and HTTP

use super::client::{parse_body, HttpClient};
use crate::error::Result;
use crate::types::{Method, QueryParams};
use async_trait::async_trait;
use serde_json::Value;

/// Issues one request and returns the decoded JSON body.
///
/// Auth and transient retries are already applied by the implementation.
/// `path` may be relative to the base URL or an absolute next-page link.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, method: Method, path: &str, query: &QueryParams) -> Result<Value>;
}

#[async_trait]
impl Transport for HttpClient {
    async fn request(&self, method: Method, path: &str, query: &QueryParams) -> Result<Value> {
        let response = HttpClient::request(self, method.into(), path, query).await?;
        parse_body(response).await
    }
}
