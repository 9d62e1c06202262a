//! Resource path templating
//!
//! Handles `{name}` placeholders in stream resource paths such as
//! `v1/users/{user_id}`. Values come from the child's [`SyncContext`].
//!
//! [`SyncContext`]: crate::partition::SyncContext

use crate::error::{Error, Result};
use regex::Regex;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

/// Regex for matching path placeholders: {name}
static PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\s*([a-zA-Z_][a-zA-Z0-9_]*)\s*\}").unwrap());

/// Render a path template, failing on the first unresolved placeholder set
pub fn render(template: &str, vars: &BTreeMap<String, Value>) -> Result<String> {
    let mut missing = Vec::new();

    let rendered = PLACEHOLDER_REGEX.replace_all(template, |cap: &regex::Captures<'_>| {
        let name = &cap[1];
        match vars.get(name) {
            Some(value) => value_to_string(value),
            None => {
                missing.push(name.to_string());
                String::new()
            }
        }
    });

    if missing.is_empty() {
        Ok(rendered.into_owned())
    } else {
        Err(Error::undefined_var(missing.join(", ")))
    }
}

/// Check if a string contains placeholders
pub fn has_templates(s: &str) -> bool {
    PLACEHOLDER_REGEX.is_match(s)
}

/// Extract the distinct placeholder names from a template
pub fn extract_variables(template: &str) -> BTreeSet<String> {
    PLACEHOLDER_REGEX
        .captures_iter(template)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// Convert a JSON scalar to its path representation
pub(crate) fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => value.to_string(),
    }
}
