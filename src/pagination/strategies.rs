//! Pagination strategy implementations
//!
//! Each strategy handles a specific pagination pattern.

use super::types::{scalar_at, NextPage, PaginationState, Paginator, StopCondition};
use crate::types::QueryParams;
use serde_json::Value;

// ============================================================================
// Cursor Pagination
// ============================================================================

/// Cursor-based pagination
///
/// Uses a cursor value from the response to fetch the next page, e.g.
/// `?cursor=abc123`.
#[derive(Debug, Clone)]
pub struct CursorPaginator {
    pub cursor_param: String,
    pub cursor_path: String,
    pub stop_condition: StopCondition,
}

impl CursorPaginator {
    /// Create a new cursor paginator
    pub fn new(
        cursor_param: impl Into<String>,
        cursor_path: impl Into<String>,
        stop_condition: StopCondition,
    ) -> Self {
        Self {
            cursor_param: cursor_param.into(),
            cursor_path: cursor_path.into(),
            stop_condition,
        }
    }
}

impl Paginator for CursorPaginator {
    fn initial_params(&self, state: &mut PaginationState) -> QueryParams {
        state
            .cursor
            .as_ref()
            .map(|cursor| vec![(self.cursor_param.clone(), cursor.clone())])
            .unwrap_or_default()
    }

    fn process_response(
        &self,
        body: &Value,
        records_count: usize,
        state: &mut PaginationState,
    ) -> NextPage {
        state.add_page(records_count);

        if self.stop_condition.should_stop(body, records_count, state) {
            state.mark_done();
            return NextPage::Done;
        }

        match scalar_at(body, &self.cursor_path) {
            Some(cursor) if state.cursor.as_deref() != Some(cursor.as_str()) => {
                state.cursor = Some(cursor.clone());
                NextPage::with_param(&self.cursor_param, cursor)
            }
            _ => {
                state.mark_done();
                NextPage::Done
            }
        }
    }
}

// ============================================================================
// Page Number Pagination
// ============================================================================

/// Page number pagination, e.g. `?page=2`
#[derive(Debug, Clone)]
pub struct PageNumberPaginator {
    pub page_param: String,
    /// First page number (usually 0 or 1)
    pub start_page: u32,
    pub stop_condition: StopCondition,
}

impl PageNumberPaginator {
    /// Create a new page number paginator
    pub fn new(page_param: impl Into<String>, start_page: u32) -> Self {
        Self {
            page_param: page_param.into(),
            start_page,
            stop_condition: StopCondition::EmptyPage,
        }
    }

    /// Set stop condition
    #[must_use]
    pub fn with_stop_condition(mut self, condition: StopCondition) -> Self {
        self.stop_condition = condition;
        self
    }
}

impl Paginator for PageNumberPaginator {
    fn initial_params(&self, state: &mut PaginationState) -> QueryParams {
        state.page = self.start_page;
        vec![(self.page_param.clone(), state.page.to_string())]
    }

    fn process_response(
        &self,
        body: &Value,
        records_count: usize,
        state: &mut PaginationState,
    ) -> NextPage {
        state.add_page(records_count);

        if self.stop_condition.should_stop(body, records_count, state) {
            state.mark_done();
            return NextPage::Done;
        }

        state.page += 1;
        NextPage::with_param(&self.page_param, state.page.to_string())
    }
}

// ============================================================================
// Next URL Pagination
// ============================================================================

/// Next URL in the response body
///
/// Aircall shape: `{ "meta": { "next_page_link": "https://...?page=2" } }`;
/// a null or empty link ends the sequence.
#[derive(Debug, Clone)]
pub struct NextUrlPaginator {
    pub path: String,
}

impl NextUrlPaginator {
    /// Create a new next URL paginator
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl Paginator for NextUrlPaginator {
    fn initial_params(&self, _state: &mut PaginationState) -> QueryParams {
        Vec::new()
    }

    fn process_response(
        &self,
        body: &Value,
        records_count: usize,
        state: &mut PaginationState,
    ) -> NextPage {
        state.add_page(records_count);

        match scalar_at(body, &self.path) {
            Some(next_url) if state.cursor.as_deref() != Some(next_url.as_str()) => {
                state.cursor = Some(next_url.clone());
                state.page += 1;
                NextPage::with_url(next_url)
            }
            _ => {
                state.mark_done();
                NextPage::Done
            }
        }
    }
}

// ============================================================================
// No Pagination
// ============================================================================

/// No pagination - single request
#[derive(Debug, Clone, Default)]
pub struct NoPaginator;

impl Paginator for NoPaginator {
    fn initial_params(&self, _state: &mut PaginationState) -> QueryParams {
        Vec::new()
    }

    fn process_response(
        &self,
        _body: &Value,
        records_count: usize,
        state: &mut PaginationState,
    ) -> NextPage {
        state.add_page(records_count);
        state.mark_done();
        NextPage::Done
    }
}
