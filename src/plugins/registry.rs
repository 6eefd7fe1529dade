//! Plugin registry: the named, concurrent store of loaded artifacts.
//!
//! One registry may be shared by several services through an `Arc`; removal
//! or clearing through any of them is visible to all.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use super::traits::{Artifact, PluginInfo};
use crate::error::{PluginError, Result};

/// A named, loaded artifact.
///
/// Entries are never mutated. Replacing a plugin means registering a new
/// entry under the same name.
#[derive(Debug, Clone)]
pub struct PluginEntry {
    name: String,
    artifact: Arc<dyn Artifact>,
    loaded_at: DateTime<Utc>,
}

impl PluginEntry {
    pub fn new(name: impl Into<String>, artifact: Arc<dyn Artifact>) -> Self {
        Self {
            name: name.into(),
            artifact,
            loaded_at: Utc::now(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn artifact(&self) -> &Arc<dyn Artifact> {
        &self.artifact
    }

    pub fn class_name(&self) -> &str {
        self.artifact.class_name()
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn info(&self) -> PluginInfo {
        PluginInfo {
            name: self.name.clone(),
            class_name: self.class_name().to_string(),
            loaded_at: self.loaded_at,
        }
    }
}

/// Two entries are equal when they hold the same artifact under the same name.
impl PartialEq for PluginEntry {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.loaded_at == other.loaded_at
            && std::ptr::addr_eq(Arc::as_ptr(&self.artifact), Arc::as_ptr(&other.artifact))
    }
}

impl Eq for PluginEntry {}

fn require_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(PluginError::invalid("Plugin name cannot be null or empty"));
    }
    Ok(())
}

/// Registry of loaded plugins keyed by name.
///
/// Thread-safe for concurrent access from multiple services and callers.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: RwLock<HashMap<String, PluginEntry>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry ready to be shared between services.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Insert `entry`, returning whatever entry previously held its name.
    pub fn register(&self, entry: PluginEntry) -> Result<Option<PluginEntry>> {
        require_name(&entry.name)?;
        let name = entry.name.clone();
        let previous = self.plugins.write().insert(name.clone(), entry);
        tracing::debug!(
            plugin = %name,
            replaced = previous.is_some(),
            "Inserted plugin entry"
        );
        Ok(previous)
    }

    /// Get a plugin entry by name.
    pub fn get(&self, name: &str) -> Result<Option<PluginEntry>> {
        require_name(name)?;
        Ok(self.plugins.read().get(name).cloned())
    }

    pub fn remove(&self, name: &str) -> Result<Option<PluginEntry>> {
        require_name(name)?;
        let removed = self.plugins.write().remove(name);
        if removed.is_some() {
            tracing::debug!(plugin = %name, "Removed plugin");
        }
        Ok(removed)
    }

    pub fn contains(&self, name: &str) -> Result<bool> {
        require_name(name)?;
        Ok(self.plugins.read().contains_key(name))
    }

    /// Snapshot of every registered entry, in no particular order.
    pub fn list(&self) -> Vec<PluginEntry> {
        self.plugins.read().values().cloned().collect()
    }

    /// List all registered plugin names.
    pub fn names(&self) -> Vec<String> {
        self.plugins.read().keys().cloned().collect()
    }

    pub fn size(&self) -> usize {
        self.plugins.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.read().is_empty()
    }

    /// Remove every entry unconditionally.
    pub fn clear(&self) {
        let mut plugins = self.plugins.write();
        let count = plugins.len();
        plugins.clear();
        tracing::debug!(removed = count, "Cleared plugin registry");
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugin_count", &self.plugins.read().len())
            .finish_non_exhaustive()
    }
}
