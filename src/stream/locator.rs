//! Record locators
//!
//! A locator selects the records inside a response body. Two shapes cover
//! the Aircall API:
//! - `$.users[*]` selects every element of an array. The array must exist;
//!   an empty one is fine.
//! - `$.user` selects one object as a single record.
//!
//! Anything fancier (filters, recursive descent) is handed to jsonpath-rust.
//! An expression ending in `[*]` still needs its container to match an array.

use crate::error::{Error, Result};
use crate::partition::extract_json_path;
use jsonpath_rust::JsonPath;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Path expression selecting the records of a response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordLocator {
    raw: String,
    shape: LocatorShape,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LocatorShape {
    /// Every element of the array at a dotted path
    Array(String),
    /// The value at a dotted path as one record
    Single(String),
    /// A general JSONPath expression; `container` is set for `...[*]`
    /// forms and must match an array
    Expression { container: Option<String> },
}

impl RecordLocator {
    /// Parse and validate a locator
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::json_path("record locator cannot be empty"));
        }

        let shape = if let Some(container) = trimmed.strip_suffix("[*]") {
            let normalized = normalize(container);
            if is_simple_path(normalized) {
                LocatorShape::Array(normalized.to_string())
            } else {
                compile(container)?;
                LocatorShape::Expression {
                    container: Some(container.to_string()),
                }
            }
        } else {
            let path = normalize(trimmed);
            if is_simple_path(path) {
                LocatorShape::Single(path.to_string())
            } else {
                compile(trimmed)?;
                LocatorShape::Expression { container: None }
            }
        };

        Ok(Self {
            raw: trimmed.to_string(),
            shape,
        })
    }

    /// The locator as written
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether the locator selects an array of records
    pub fn selects_many(&self) -> bool {
        !matches!(self.shape, LocatorShape::Single(_))
    }

    /// Extract the records of one response
    ///
    /// Fails with `MalformedResponse` when the selected container is missing
    /// or has the wrong shape.
    pub fn extract(&self, stream: &str, body: &Value) -> Result<Vec<Value>> {
        match &self.shape {
            LocatorShape::Array(container) => match extract_json_path(body, container) {
                Some(Value::Array(records)) => Ok(records),
                _ => Err(Error::malformed(stream, &self.raw)),
            },
            LocatorShape::Single(path) => match extract_json_path(body, path) {
                Some(record @ Value::Object(_)) => Ok(vec![record]),
                Some(Value::Array(records)) => Ok(records),
                _ => Err(Error::malformed(stream, &self.raw)),
            },
            LocatorShape::Expression {
                container: Some(container),
            } => {
                let jp = compile(container)?;
                let matches = jp.find_slice_ptr(body);
                if matches.is_empty() || !matches.iter().all(|m| m.is_array()) {
                    return Err(Error::malformed(stream, &self.raw));
                }
                Ok(matches
                    .iter()
                    .filter_map(|m| m.as_array())
                    .flatten()
                    .cloned()
                    .collect())
            }
            LocatorShape::Expression { container: None } => {
                let jp = compile(&self.raw)?;
                match jp.find(body) {
                    Value::Array(records) => Ok(records),
                    Value::Null => Ok(Vec::new()),
                    other => Ok(vec![other]),
                }
            }
        }
    }
}

fn compile(path: &str) -> Result<JsonPath> {
    JsonPath::try_from(path).map_err(|e| Error::json_path(format!("Invalid JSONPath '{path}': {e}")))
}

/// Strip the `$` root and a leading dot
fn normalize(path: &str) -> &str {
    let path = path.strip_prefix('$').unwrap_or(path);
    path.strip_prefix('.').unwrap_or(path)
}

/// Dotted identifiers, e.g. `data.users`; empty means the root
fn is_simple_path(path: &str) -> bool {
    path.is_empty()
        || path.split('.').all(|part| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        })
}

impl TryFrom<String> for RecordLocator {
    type Error = Error;

    fn try_from(raw: String) -> Result<Self> {
        Self::parse(raw)
    }
}

impl From<RecordLocator> for String {
    fn from(locator: RecordLocator) -> Self {
        locator.raw
    }
}

impl fmt::Display for RecordLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
