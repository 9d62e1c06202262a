//! Stream definitions
//!
//! Streams are data: a resource path, a record locator, keys and a
//! partitioning choice. The engine runs every stream through the same
//! fetch loop.

use super::locator::RecordLocator;
use crate::error::Result;
use crate::pagination::PaginationConfig;
use crate::partition::{ContextSpec, SyncContext, TimeWindow};
use crate::template;
use crate::types::{Method, QueryParams, SyncMode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// How a stream is split into independent fetch units
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Partitioning {
    /// One unit with the empty context
    #[default]
    None,

    /// Time windows bound as query parameters (epoch seconds)
    Windowed {
        #[serde(default = "default_from_param")]
        from_param: String,
        #[serde(default = "default_to_param")]
        to_param: String,
    },

    /// One unit per parent record
    Child {
        /// Parent stream name
        parent: String,
        /// Context fields and their source paths in the parent record
        context: ContextSpec,
    },
}

fn default_from_param() -> String {
    "from".to_string()
}

fn default_to_param() -> String {
    "to".to_string()
}

impl Partitioning {
    /// Short name for discovery output
    pub fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Windowed { .. } => "windowed",
            Self::Child { .. } => "child",
        }
    }
}

/// A single stream of the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StreamDefinition {
    /// Stream name (unique within a catalog)
    pub name: String,
    /// Resource path, may contain `{name}` placeholders
    pub path: String,
    /// HTTP method
    #[serde(default)]
    pub method: Method,
    /// Records selector
    pub records: RecordLocator,
    /// Primary key fields
    #[serde(default)]
    pub primary_key: Vec<String>,
    /// Replication key; absent means full table
    #[serde(default)]
    pub replication_key: Option<String>,
    /// Whether bookmarks are persisted for this stream
    #[serde(default = "default_true")]
    pub bookmarkable: bool,
    /// Static query parameters, values may contain placeholders
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    /// Query parameter carrying the page size
    #[serde(default)]
    pub page_size_param: Option<String>,
    /// Query parameter carrying the bookmark (epoch seconds) for unwindowed streams
    #[serde(default)]
    pub since_param: Option<String>,
    /// Pagination strategy
    #[serde(default)]
    pub pagination: PaginationConfig,
    /// Partitioning strategy
    #[serde(default)]
    pub partitioning: Partitioning,
}

fn default_true() -> bool {
    true
}

/// Path and query of one request before pagination is applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestParams {
    pub path: String,
    pub query: QueryParams,
}

impl RequestParams {
    /// Add a query parameter
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

impl StreamDefinition {
    /// Create a minimal unpartitioned stream
    pub fn new(name: impl Into<String>, path: impl Into<String>, records: RecordLocator) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            method: Method::GET,
            records,
            primary_key: Vec::new(),
            replication_key: None,
            bookmarkable: true,
            params: BTreeMap::new(),
            page_size_param: None,
            since_param: None,
            pagination: PaginationConfig::None,
            partitioning: Partitioning::None,
        }
    }

    #[must_use]
    pub fn with_primary_key(mut self, fields: &[&str]) -> Self {
        self.primary_key = fields.iter().map(ToString::to_string).collect();
        self
    }

    #[must_use]
    pub fn with_replication_key(mut self, key: impl Into<String>) -> Self {
        self.replication_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_bookmarkable(mut self, bookmarkable: bool) -> Self {
        self.bookmarkable = bookmarkable;
        self
    }

    #[must_use]
    pub fn with_pagination(mut self, pagination: PaginationConfig) -> Self {
        self.pagination = pagination;
        self
    }

    #[must_use]
    pub fn with_partitioning(mut self, partitioning: Partitioning) -> Self {
        self.partitioning = partitioning;
        self
    }

    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Whether a replication key is declared
    pub fn is_incremental(&self) -> bool {
        self.replication_key.is_some()
    }

    /// Whether bookmarks for this stream are written
    pub fn should_persist_bookmark(&self) -> bool {
        self.is_incremental() && self.bookmarkable
    }

    pub fn is_windowed(&self) -> bool {
        matches!(self.partitioning, Partitioning::Windowed { .. })
    }

    /// Parent stream name, for child streams
    pub fn parent(&self) -> Option<&str> {
        match &self.partitioning {
            Partitioning::Child { parent, .. } => Some(parent),
            _ => None,
        }
    }

    /// Context spec, for child streams
    pub fn context_spec(&self) -> Option<&ContextSpec> {
        match &self.partitioning {
            Partitioning::Child { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Placeholders referenced by the path and the query parameters
    pub fn required_context_fields(&self) -> BTreeSet<String> {
        let mut fields = template::extract_variables(&self.path);
        for value in self.params.values() {
            fields.extend(template::extract_variables(value));
        }
        fields
    }

    /// Supported sync modes for discovery
    pub fn sync_modes(&self) -> Vec<SyncMode> {
        if self.is_incremental() {
            vec![SyncMode::FullRefresh, SyncMode::Incremental]
        } else {
            vec![SyncMode::FullRefresh]
        }
    }

    /// Render the request for one (context, window) unit
    ///
    /// Placeholders are filled from the context; windowed streams also get
    /// their `from`/`to` parameters as epoch seconds.
    pub fn build_request_parameters(
        &self,
        context: &SyncContext,
        window: Option<&TimeWindow>,
    ) -> Result<RequestParams> {
        let path = template::render(&self.path, context.values())?;

        let mut query = QueryParams::new();
        for (key, value) in &self.params {
            query.push((key.clone(), template::render(value, context.values())?));
        }

        if let (Partitioning::Windowed { from_param, to_param }, Some(window)) =
            (&self.partitioning, window)
        {
            query.push((from_param.clone(), window.from_epoch().to_string()));
            query.push((to_param.clone(), window.to_epoch().to_string()));
        }

        Ok(RequestParams { path, query })
    }

    /// Apply the record locator to a response body
    pub fn extract_records(&self, body: &Value) -> Result<Vec<Value>> {
        self.records.extract(&self.name, body)
    }
}
