//! # tap-aircall
//!
//! Incremental extraction of Aircall REST API data as JSON-lines messages.
//!
//! ## Features
//!
//! - **Declarative catalog**: streams, parents and windows described in YAML
//! - **Time windows**: large streams are split into `[from, to)` slices that
//!   stay under the API's per-query result ceiling
//! - **Parent/child streams**: each parent record yields a context for its
//!   child streams (`users` -> `user`)
//! - **Bookmarks**: per (stream, context) high-water marks, advanced only
//!   over units that finished
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tap_aircall::engine::{SyncConfig, SyncEngine};
//! use tap_aircall::http::HttpClient;
//! use tap_aircall::output::JsonLinesSink;
//! use tap_aircall::state::StateManager;
//! use tap_aircall::{load_catalog, Result, TapConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = TapConfig::from_file("config.json")?;
//!     let catalog = load_catalog("aircall")?;
//!     let client = HttpClient::with_auth(config.http_config(), config.auth_config())?;
//!
//!     let engine = SyncEngine::new(
//!         Arc::new(client),
//!         Arc::new(StateManager::from_file("state.json")?),
//!         Arc::new(JsonLinesSink::stdout()),
//!     )
//!     .with_config(SyncConfig::from(&config));
//!
//!     let summary = engine.sync(&catalog, None).await?;
//!     println!("{}", summary.status);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          SyncEngine                             │
//! │  catalog (topological) → units (stream, context, window)        │
//! │  → records to sink, bookmarks to store, reports to summary      │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────┬───────────┬───────┴───────┬───────────┬─────────────┐
//! │   Auth   │   HTTP    │   Paginate    │ Partition │   State     │
//! ├──────────┼───────────┼───────────────┼───────────┼─────────────┤
//! │ Basic    │ GET/POST  │ Next URL      │ Windows   │ Bookmarks   │
//! │ Bearer   │ Retry     │ Cursor        │ Contexts  │ Trackers    │
//! │          │ Rate Limit│ Page Number   │           │ JSON file   │
//! └──────────┴───────────┴───────────────┴───────────┴─────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Authentication
pub mod auth;

/// HTTP client with retry and rate limiting
pub mod http;

/// Pagination strategies
pub mod pagination;

/// Time windows and parent/child contexts
pub mod partition;

/// Bookmark storage and replication-key tracking
pub mod state;

/// Stream definitions and record locators
pub mod stream;

/// Protocol messages and record sinks
pub mod output;

/// Main execution engine
pub mod engine;

/// Tap configuration
pub mod config;

/// YAML catalog loader
pub mod loader;

/// Template interpolation
pub mod template;

/// Command-line interface
pub mod cli;

/// Built-in catalogs
pub mod connectors;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::TapConfig;
pub use error::{Error, Result};
pub use types::*;

pub use loader::{load_catalog, load_catalog_from_str, Catalog};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
