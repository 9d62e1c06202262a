//! Built-in catalogs embedded in the binary
//!
//! Lets users pass `--catalog aircall` instead of a file path.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Built-in catalog YAML definitions
pub static BUILTIN_CATALOGS: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| {
        let mut m = HashMap::new();
        m.insert("aircall", include_str!("../connectors/aircall.yaml"));
        m
    });

/// Catalog used when none is given
pub const DEFAULT_CATALOG: &str = "aircall";

/// Get a built-in catalog by name
pub fn get_builtin(name: &str) -> Option<&'static str> {
    BUILTIN_CATALOGS.get(name).copied()
}

/// Check if a name refers to a built-in catalog
pub fn is_builtin(name: &str) -> bool {
    BUILTIN_CATALOGS.contains_key(name)
}

/// List all built-in catalog names
pub fn list_builtin() -> Vec<&'static str> {
    let mut names: Vec<_> = BUILTIN_CATALOGS.keys().copied().collect();
    names.sort_unstable();
    names
}
