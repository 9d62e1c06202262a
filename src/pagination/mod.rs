//! Pagination module
//!
//! Supports: Cursor, Page Number, Next URL, or a single request
//!
//! # Overview
//!
//! Each strategy reads the continuation signal from a response body and
//! decides whether another request follows. The set is closed; streams pick
//! one through [`PaginationConfig`].

mod strategies;
mod types;

pub use strategies::{CursorPaginator, NextUrlPaginator, NoPaginator, PageNumberPaginator};
pub use types::{NextPage, PaginationConfig, PaginationState, Paginator, StopCondition};
