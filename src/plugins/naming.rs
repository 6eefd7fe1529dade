//! Registry name derivation.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{PluginError, Result};

static PLUGIN_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("plugin name regex compiles"));

/// Derive the registry name from a class name by lowercasing exactly the
/// first character: `"MathPlugin"` becomes `"mathPlugin"`.
pub fn derive_plugin_name(class_name: &str) -> Result<String> {
    if class_name.trim().is_empty() {
        return Err(PluginError::invalid("Class name cannot be null or empty"));
    }
    let mut chars = class_name.chars();
    let Some(first) = chars.next() else {
        return Err(PluginError::invalid("Class name cannot be null or empty"));
    };
    Ok(first.to_lowercase().chain(chars).collect())
}

/// Whether `name` is an identifier-shaped plugin name.
pub fn is_valid_plugin_name(name: &str) -> bool {
    PLUGIN_NAME.is_match(name)
}
