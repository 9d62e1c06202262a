//! Bookmark store trait definition.

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Storage contract for replication bookmarks.
///
/// Bookmarks are addressed by `(stream, context_key)`, where the empty
/// context key is the stream-level bookmark. Implementations must be
/// `Send + Sync` for use behind `Arc<dyn BookmarkStore>`.
#[async_trait]
pub trait BookmarkStore: Send + Sync {
    /// Read the bookmark for a (stream, context) pair.
    ///
    /// Returns `Ok(None)` when nothing has been persisted yet.
    async fn load(&self, stream: &str, context_key: &str) -> Result<Option<Value>>;

    /// Upsert the bookmark for a (stream, context) pair.
    async fn save(&self, stream: &str, context_key: &str, value: Value) -> Result<()>;
}
