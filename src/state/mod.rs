//! State management module
//!
//! Handles bookmark tracking and persistence.
//! State is persisted between sync runs to enable incremental syncs.
//!
//! # Overview
//!
//! The state module provides:
//! - `State` - Core state structure with per-stream and per-context bookmarks
//! - `BookmarkStore` - Load/save contract used by the engine
//! - `StateManager` - File-based `BookmarkStore` with atomic writes
//! - `ReplicationKeyTracker` - Running maximum of a stream's replication key

mod manager;
mod store;
mod tracker;
mod types;

pub use manager::StateManager;
pub use store::BookmarkStore;
pub use tracker::{ReplicationKeyTracker, ReplicationValue};
pub use types::{ContextState, State, StreamState};
