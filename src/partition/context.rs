//! Parent/child context derivation
//!
//! A [`ContextSpec`] declares, for one child stream, which fields its
//! resource path needs and where each comes from in the parent record.

use super::types::SyncContext;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Mapping of child context field -> dotted path in the parent record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextSpec {
    fields: BTreeMap<String, String>,
}

impl ContextSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a context field sourced from `parent_path`
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>, parent_path: impl Into<String>) -> Self {
        self.fields.insert(field.into(), parent_path.into());
        self
    }

    /// Declared field names in sorted order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// `(field, parent_path)` pairs
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Derive the child context from one parent record
    ///
    /// The result holds exactly the declared fields. A missing, null or
    /// non-scalar source value is an error for that record only.
    pub fn derive(&self, child_stream: &str, record: &Value) -> Result<SyncContext> {
        let mut context = SyncContext::empty();
        for (field, path) in &self.fields {
            let value = extract_json_path(record, path)
                .filter(|v| matches!(v, Value::String(_) | Value::Number(_) | Value::Bool(_)))
                .ok_or_else(|| Error::MissingContextField {
                    stream: child_stream.to_string(),
                    field: field.clone(),
                })?;
            context = context.with_value(field.clone(), value);
        }
        Ok(context)
    }
}

/// Extract a value from JSON using a simple path (e.g., "id", "data.id", "items[0]")
pub fn extract_json_path(value: &Value, path: &str) -> Option<Value> {
    let path = path.strip_prefix("$.").unwrap_or(path);
    if path.is_empty() || path == "$" {
        return Some(value.clone());
    }

    let mut current = value;
    for part in path.split('.') {
        if let Some(bracket_pos) = part.find('[') {
            let key = &part[..bracket_pos];
            let idx = part[bracket_pos + 1..].strip_suffix(']')?.parse::<usize>().ok()?;
            if !key.is_empty() {
                current = current.get(key)?;
            }
            current = current.get(idx)?;
        } else {
            current = current.get(part)?;
        }
    }

    Some(current.clone())
}
