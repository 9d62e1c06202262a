//! Pagination types and traits
//!
//! Defines the core pagination abstractions used by all strategies.

use super::strategies::{CursorPaginator, NextUrlPaginator, NoPaginator, PageNumberPaginator};
use crate::partition::extract_json_path;
use crate::types::QueryParams;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of the next page computation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextPage {
    /// More pages available
    Continue {
        /// Query parameters to add/replace
        query_params: QueryParams,
        /// Optional new URL (for next_url pagination)
        url: Option<String>,
    },
    /// No more pages
    Done,
}

impl NextPage {
    /// Create a continuation with query parameters
    pub fn with_params(params: QueryParams) -> Self {
        Self::Continue {
            query_params: params,
            url: None,
        }
    }

    /// Create a continuation with a single parameter
    pub fn with_param(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::with_params(vec![(key.into(), value.into())])
    }

    /// Create a continuation with a new URL
    pub fn with_url(url: impl Into<String>) -> Self {
        Self::Continue {
            query_params: Vec::new(),
            url: Some(url.into()),
        }
    }

    /// Check if this is a done result
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// Pagination strategy as declared in a stream catalog
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaginationConfig {
    /// No pagination
    #[default]
    None,

    /// Cursor value from the body bound into the next request
    Cursor {
        /// Query parameter name for the cursor
        cursor_param: String,
        /// Path to the cursor in the response
        cursor_path: String,
        #[serde(default)]
        stop_condition: StopCondition,
    },

    /// Page number pagination
    PageNumber {
        /// Query parameter name for page number
        page_param: String,
        /// First page number (usually 0 or 1)
        #[serde(default = "default_start_page")]
        start_page: u32,
        #[serde(default)]
        stop_condition: StopCondition,
    },

    /// Next URL in response body
    NextUrl {
        /// Path to the next-page URL in the response
        path: String,
    },
}

fn default_start_page() -> u32 {
    1
}

impl PaginationConfig {
    /// Build the strategy for one pagination sequence
    pub fn build(&self) -> Box<dyn Paginator> {
        match self {
            Self::None => Box::new(NoPaginator),
            Self::Cursor {
                cursor_param,
                cursor_path,
                stop_condition,
            } => Box::new(CursorPaginator::new(
                cursor_param,
                cursor_path,
                stop_condition.clone(),
            )),
            Self::PageNumber {
                page_param,
                start_page,
                stop_condition,
            } => Box::new(
                PageNumberPaginator::new(page_param, *start_page)
                    .with_stop_condition(stop_condition.clone()),
            ),
            Self::NextUrl { path } => Box::new(NextUrlPaginator::new(path)),
        }
    }

    /// Short name for logs and discovery
    pub fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Cursor { .. } => "cursor",
            Self::PageNumber { .. } => "page_number",
            Self::NextUrl { .. } => "next_url",
        }
    }
}

/// Stop conditions for pagination
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StopCondition {
    /// Stop when page is empty (no records)
    #[default]
    EmptyPage,

    /// Stop when a field has a specific value
    Field {
        /// Path to the field
        path: String,
        /// Value that ends pagination
        value: Value,
    },

    /// Stop when page number reaches total pages
    TotalPages {
        /// Path to total pages field
        path: String,
    },
}

impl StopCondition {
    /// Create a field-based stop condition
    pub fn field(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Field {
            path: path.into(),
            value: value.into(),
        }
    }

    /// Check the condition against a response
    pub fn should_stop(&self, body: &Value, records_count: usize, state: &PaginationState) -> bool {
        match self {
            Self::EmptyPage => records_count == 0,
            Self::Field { path, value } => {
                extract_json_path(body, path).is_some_and(|found| &found == value)
            }
            Self::TotalPages { path } => scalar_at(body, path)
                .and_then(|s| s.parse::<u32>().ok())
                .is_some_and(|total| state.page >= total),
        }
    }
}

/// Tracks pagination state during one sequence
#[derive(Debug, Clone, Default)]
pub struct PaginationState {
    /// Current page number (for page-based pagination)
    pub page: u32,
    /// Current cursor value
    pub cursor: Option<String>,
    /// Total records fetched so far
    pub total_fetched: u64,
    /// Pages fetched so far
    pub pages: u32,
    /// Is pagination complete?
    pub done: bool,
}

impl PaginationState {
    /// Create a new pagination state
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark pagination as complete
    pub fn mark_done(&mut self) {
        self.done = true;
    }

    /// Record one fetched page
    pub fn add_page(&mut self, records: usize) {
        self.pages += 1;
        self.total_fetched += records as u64;
    }
}

/// Core trait for pagination strategies
pub trait Paginator: Send + Sync {
    /// Query parameters for the first request
    fn initial_params(&self, state: &mut PaginationState) -> QueryParams;

    /// Process a response and determine if there's a next page
    fn process_response(
        &self,
        body: &Value,
        records_count: usize,
        state: &mut PaginationState,
    ) -> NextPage;
}

/// Read a non-empty scalar at `path` as a string
pub(crate) fn scalar_at(body: &Value, path: &str) -> Option<String> {
    match extract_json_path(body, path)? {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
