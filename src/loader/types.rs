//! Catalog types
//!
//! A catalog is the declarative list of streams a tap can sync. After
//! loading, `streams` is in topological order: every parent precedes its
//! children.

use crate::stream::StreamDefinition;
use crate::types::SyncMode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A validated set of stream definitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Catalog name (e.g., "aircall")
    pub name: String,

    /// Catalog version
    #[serde(default = "default_version")]
    pub version: String,

    /// Human-readable description
    #[serde(default)]
    pub description: Option<String>,

    /// Stream definitions
    #[serde(default)]
    pub streams: Vec<StreamDefinition>,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

impl Catalog {
    /// Look up a stream by name
    pub fn get(&self, name: &str) -> Option<&StreamDefinition> {
        self.streams.iter().find(|s| s.name == name)
    }

    /// Whether a stream exists
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Stream names in sync order
    pub fn names(&self) -> Vec<&str> {
        self.streams.iter().map(|s| s.name.as_str()).collect()
    }

    /// Streams without a parent
    pub fn roots(&self) -> impl Iterator<Item = &StreamDefinition> {
        self.streams.iter().filter(|s| s.parent().is_none())
    }

    /// Direct children of a stream, in catalog order
    pub fn children_of(&self, parent: &str) -> Vec<&StreamDefinition> {
        self.streams
            .iter()
            .filter(|s| s.parent() == Some(parent))
            .collect()
    }

    /// Names of every ancestor of a stream, nearest first
    pub fn ancestors(&self, name: &str) -> Vec<String> {
        let mut ancestors = Vec::new();
        let mut current = self.get(name).and_then(StreamDefinition::parent);
        while let Some(parent) = current {
            if ancestors.iter().any(|a| a == parent) {
                break;
            }
            ancestors.push(parent.to_string());
            current = self.get(parent).and_then(StreamDefinition::parent);
        }
        ancestors
    }

    /// Selected streams plus the ancestors needed for their contexts
    pub fn closure(&self, selected: &BTreeSet<String>) -> BTreeSet<String> {
        let mut included = selected.clone();
        for name in selected {
            included.extend(self.ancestors(name));
        }
        included
    }

    /// Discovery entries, in sync order
    pub fn discover(&self) -> Vec<DiscoveredStream> {
        self.streams.iter().map(DiscoveredStream::from).collect()
    }
}

/// One stream as reported by `discover`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveredStream {
    pub name: String,
    pub path: String,
    pub primary_key: Vec<String>,
    pub replication_key: Option<String>,
    pub sync_modes: Vec<SyncMode>,
    pub parent: Option<String>,
    pub partitioning: &'static str,
    pub bookmarkable: bool,
    pub pagination: &'static str,
}

impl From<&StreamDefinition> for DiscoveredStream {
    fn from(stream: &StreamDefinition) -> Self {
        Self {
            name: stream.name.clone(),
            path: stream.path.clone(),
            primary_key: stream.primary_key.clone(),
            replication_key: stream.replication_key.clone(),
            sync_modes: stream.sync_modes(),
            parent: stream.parent().map(ToString::to_string),
            partitioning: stream.partitioning.kind(),
            bookmarkable: stream.should_persist_bookmark(),
            pagination: stream.pagination.kind(),
        }
    }
}
