//! YAML parser for stream catalogs
//!
//! Parses and validates catalog YAML files.
//! Supports both built-in catalogs (by name) and custom YAML files (by path).

use crate::connectors;
use crate::error::{Error, Result};
use crate::loader::types::Catalog;
use crate::stream::StreamDefinition;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::Path;

/// Load a catalog from a built-in name or a file path
///
/// ```ignore
/// let catalog = load_catalog("aircall")?;
/// let catalog = load_catalog("./my-catalog.yaml")?;
/// ```
pub fn load_catalog(path: impl AsRef<Path>) -> Result<Catalog> {
    let path = path.as_ref();
    let path_str = path.to_string_lossy();

    if !path_str.contains('/')
        && !path_str.contains('\\')
        && !path_str.ends_with(".yaml")
        && !path_str.ends_with(".yml")
    {
        if let Some(yaml) = connectors::get_builtin(&path_str) {
            return load_catalog_from_str(yaml);
        }
    }

    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            let builtin_list = connectors::list_builtin().join(", ");
            Error::config(format!(
                "Catalog '{}' not found. Built-in catalogs: {}. Or provide a path to a YAML file.",
                path.display(),
                builtin_list
            ))
        } else {
            Error::config(format!(
                "Failed to read catalog file '{}': {}",
                path.display(),
                e
            ))
        }
    })?;
    load_catalog_from_str(&content)
}

/// Load a catalog from a YAML string
pub fn load_catalog_from_str(yaml: &str) -> Result<Catalog> {
    let mut catalog: Catalog = serde_yaml::from_str(yaml)
        .map_err(|e| Error::catalog(format!("Failed to parse catalog YAML: {e}")))?;

    validate_catalog(&catalog)?;
    catalog.streams = topological_order(catalog.streams)?;
    Ok(catalog)
}

/// Validate a catalog
fn validate_catalog(catalog: &Catalog) -> Result<()> {
    if catalog.name.trim().is_empty() {
        return Err(Error::catalog("Catalog name cannot be empty"));
    }

    if catalog.streams.is_empty() {
        return Err(Error::catalog("Catalog must have at least one stream"));
    }

    let mut names = HashSet::new();
    for stream in &catalog.streams {
        if !names.insert(stream.name.as_str()) {
            return Err(Error::catalog(format!(
                "Duplicate stream name '{}'",
                stream.name
            )));
        }
    }

    for stream in &catalog.streams {
        validate_stream(stream, &names)?;
    }

    Ok(())
}

/// Validate a stream definition
fn validate_stream(stream: &StreamDefinition, names: &HashSet<&str>) -> Result<()> {
    if stream.name.trim().is_empty() {
        return Err(Error::catalog("Stream name cannot be empty"));
    }

    if stream.path.trim().is_empty() {
        return Err(Error::catalog(format!(
            "Stream '{}' path cannot be empty",
            stream.name
        )));
    }

    let placeholders = stream.required_context_fields();

    match (stream.parent(), stream.context_spec()) {
        (Some(parent), Some(context)) => {
            if parent == stream.name {
                return Err(Error::catalog(format!(
                    "Stream '{}' cannot be its own parent",
                    stream.name
                )));
            }
            if !names.contains(parent) {
                return Err(Error::catalog(format!(
                    "Stream '{}' has unknown parent '{parent}'",
                    stream.name
                )));
            }
            if context.is_empty() {
                return Err(Error::catalog(format!(
                    "Child stream '{}' must declare at least one context field",
                    stream.name
                )));
            }

            let fields: BTreeSet<String> = context.field_names().map(String::from).collect();
            if fields != placeholders {
                return Err(Error::catalog(format!(
                    "Stream '{}' context fields {:?} do not match its placeholders {:?}",
                    stream.name, fields, placeholders
                )));
            }
        }
        _ => {
            if !placeholders.is_empty() {
                return Err(Error::catalog(format!(
                    "Stream '{}' uses placeholders {:?} but has no parent to fill them",
                    stream.name, placeholders
                )));
            }
        }
    }

    if stream.bookmarkable && stream.replication_key.is_none() {
        tracing::debug!(
            stream = %stream.name,
            "Stream has no replication key, syncing as full table"
        );
    }

    Ok(())
}

/// Order streams so every parent precedes its children
///
/// Declaration order is kept among streams at the same depth. Fails when
/// the parent links form a cycle.
fn topological_order(streams: Vec<StreamDefinition>) -> Result<Vec<StreamDefinition>> {
    let index: HashMap<String, usize> = streams
        .iter()
        .enumerate()
        .map(|(i, s)| (s.name.clone(), i))
        .collect();

    let mut placed = vec![false; streams.len()];
    let mut order = Vec::with_capacity(streams.len());

    while order.len() < streams.len() {
        let before = order.len();
        for (i, stream) in streams.iter().enumerate() {
            if placed[i] {
                continue;
            }
            let ready = match stream.parent() {
                None => true,
                Some(parent) => index.get(parent).is_some_and(|&p| placed[p]),
            };
            if ready {
                placed[i] = true;
                order.push(i);
            }
        }
        if order.len() == before {
            let stuck: Vec<&str> = streams
                .iter()
                .enumerate()
                .filter(|(i, _)| !placed[*i])
                .map(|(_, s)| s.name.as_str())
                .collect();
            return Err(Error::catalog(format!(
                "Parent links form a cycle between streams: {}",
                stuck.join(", ")
            )));
        }
    }

    let mut slots: Vec<Option<StreamDefinition>> = streams.into_iter().map(Some).collect();
    Ok(order.into_iter().filter_map(|i| slots[i].take()).collect())
}
