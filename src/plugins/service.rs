//! Plugin service: the single entry point front ends should use.
//!
//! Each call walks `Validating → Compiling → InstantiationProbe →
//! NameDerivation → Registering`. A failure at any stage aborts the rest, and
//! an entry only becomes visible through the final atomic insert.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use super::naming::derive_plugin_name;
use super::registry::{PluginEntry, PluginRegistry};
use super::traits::{Artifact, Toolchain};
use crate::error::{PluginError, Result};
use crate::security::{PolicyConfig, SourceGate};

/// Recognized plugin source extension.
pub const SOURCE_EXTENSION: &str = "java";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Validating,
    Compiling,
    InstantiationProbe,
    NameDerivation,
    Registering,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Validating => "validating",
            Stage::Compiling => "compiling",
            Stage::InstantiationProbe => "instantiation_probe",
            Stage::NameDerivation => "name_derivation",
            Stage::Registering => "registering",
        })
    }
}

/// Validates, compiles, probes and registers plugin source.
pub struct PluginService {
    toolchain: Arc<dyn Toolchain>,
    registry: Arc<PluginRegistry>,
    gate: SourceGate,
}

impl PluginService {
    /// Private registry, strict policy.
    pub fn new(toolchain: Arc<dyn Toolchain>) -> Self {
        Self::with_policy(toolchain, PolicyConfig::strict())
    }

    /// Private registry, custom policy.
    pub fn with_policy(toolchain: Arc<dyn Toolchain>, policy: PolicyConfig) -> Self {
        Self::with_registry(toolchain, Arc::new(PluginRegistry::new()), policy)
    }

    /// Shared registry: every service built on `registry` sees the same entries.
    pub fn with_registry(
        toolchain: Arc<dyn Toolchain>,
        registry: Arc<PluginRegistry>,
        policy: PolicyConfig,
    ) -> Self {
        Self::with_gate(toolchain, registry, SourceGate::new(policy))
    }

    /// Fully custom gate, e.g. one built over an extended symbol table.
    pub fn with_gate(
        toolchain: Arc<dyn Toolchain>,
        registry: Arc<PluginRegistry>,
        gate: SourceGate,
    ) -> Self {
        tracing::debug!(
            policy = ?gate.policy(),
            "Created plugin service"
        );
        Self {
            toolchain,
            registry,
            gate,
        }
    }

    pub fn policy(&self) -> &PolicyConfig {
        self.gate.policy()
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// Compile inline source and register it under the derived name.
    pub fn compile_and_register(&self, class_name: &str, source: &str) -> Result<PluginEntry> {
        if class_name.trim().is_empty() {
            return Err(PluginError::invalid("Class name cannot be null or empty"));
        }
        if source.trim().is_empty() {
            return Err(PluginError::invalid("Java code cannot be null or empty"));
        }

        let entry = self
            .build_entry(class_name, source, Some(class_name), |toolchain| {
                toolchain.compile_from_text(class_name, source)
            })
            .inspect_err(|e| log_failure(class_name, e))?;
        self.publish(entry)
    }

    /// Load a source file and register it under the derived name.
    pub fn load_and_register(&self, path: impl AsRef<Path>) -> Result<PluginEntry> {
        let path = path.as_ref();
        let entry = self
            .load_entry(path)
            .inspect_err(|e| log_failure(&path.display().to_string(), e))?;
        self.publish(entry)
    }

    /// Run the file pipeline but return the entry unregistered; the caller
    /// owns its lifecycle.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<PluginEntry> {
        let path = path.as_ref();
        let entry = self
            .load_entry(path)
            .inspect_err(|e| log_failure(&path.display().to_string(), e))?;
        tracing::info!(
            plugin = %entry.name(),
            path = %path.display(),
            "Loaded plugin without registering"
        );
        Ok(entry)
    }

    pub fn get(&self, name: &str) -> Result<Option<PluginEntry>> {
        self.registry.get(name)
    }

    pub fn remove(&self, name: &str) -> Result<Option<PluginEntry>> {
        self.registry.remove(name)
    }

    pub fn list(&self) -> Vec<PluginEntry> {
        self.registry.list()
    }

    pub fn contains(&self, name: &str) -> Result<bool> {
        self.registry.contains(name)
    }

    pub fn size(&self) -> usize {
        self.registry.size()
    }

    pub fn clear(&self) {
        self.registry.clear();
    }

    /// Invoke `operation` on the plugin registered as `name`.
    ///
    /// Returns `Ok(None)` when no such plugin is registered.
    pub fn invoke(
        &self,
        name: &str,
        operation: &str,
        args: &[serde_json::Value],
    ) -> Result<Option<serde_json::Value>> {
        if operation.trim().is_empty() {
            return Err(PluginError::invalid("Operation name cannot be null or empty"));
        }
        let Some(entry) = self.registry.get(name)? else {
            return Ok(None);
        };
        tracing::debug!(
            plugin = %name,
            operation = %operation,
            arity = args.len(),
            "Invoking plugin"
        );
        Ok(Some(entry.artifact().invoke(operation, args)?))
    }

    fn load_entry(&self, path: &Path) -> Result<PluginEntry> {
        check_source_path(path)?;
        let source = std::fs::read_to_string(path).map_err(|source| PluginError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let class_name = source_class_name(path)?;
        self.build_entry(&path.display().to_string(), &source, None, |toolchain| {
            toolchain.compile_from_text(class_name, &source)
        })
    }

    /// Every stage up to, not including, registration.
    fn build_entry<F>(
        &self,
        unit: &str,
        source: &str,
        class_name: Option<&str>,
        compile: F,
    ) -> Result<PluginEntry>
    where
        F: FnOnce(&dyn Toolchain) -> Result<Arc<dyn Artifact>>,
    {
        tracing::debug!(plugin = %unit, stage = %Stage::Validating, "Plugin pipeline stage");
        self.gate.admit(source)?;

        tracing::debug!(plugin = %unit, stage = %Stage::Compiling, "Plugin pipeline stage");
        let artifact = compile(self.toolchain.as_ref())?;

        tracing::debug!(
            plugin = %unit,
            stage = %Stage::InstantiationProbe,
            "Plugin pipeline stage"
        );
        artifact.instantiate()?;

        tracing::debug!(plugin = %unit, stage = %Stage::NameDerivation, "Plugin pipeline stage");
        let name = derive_plugin_name(class_name.unwrap_or_else(|| artifact.class_name()))?;

        Ok(PluginEntry::new(name, artifact))
    }

    fn publish(&self, entry: PluginEntry) -> Result<PluginEntry> {
        tracing::debug!(
            plugin = %entry.name(),
            stage = %Stage::Registering,
            "Plugin pipeline stage"
        );
        match self.registry.register(entry.clone())? {
            Some(previous) => tracing::info!(
                plugin = %entry.name(),
                class = %entry.class_name(),
                previous_class = %previous.class_name(),
                "Replaced registered plugin"
            ),
            None => tracing::info!(
                plugin = %entry.name(),
                class = %entry.class_name(),
                "Registered plugin"
            ),
        }
        Ok(entry)
    }
}

impl fmt::Debug for PluginService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginService")
            .field("policy", self.gate.policy())
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// Path checks shared by every file-based entry point.
pub(crate) fn check_source_path(path: &Path) -> Result<()> {
    if path.as_os_str().to_string_lossy().trim().is_empty() {
        return Err(PluginError::invalid("Java file path cannot be null or empty"));
    }
    if !path.exists() {
        return Err(PluginError::invalid(format!(
            "Java file does not exist: {}",
            path.display()
        )));
    }
    if path.extension().and_then(|e| e.to_str()) != Some(SOURCE_EXTENSION) {
        return Err(PluginError::invalid(format!(
            "File must be a Java source file (.java): {}",
            path.display()
        )));
    }
    Ok(())
}

/// Main class name implied by a source file: its stem.
pub(crate) fn source_class_name(path: &Path) -> Result<&str> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.trim().is_empty())
        .ok_or_else(|| PluginError::invalid(format!("no class name in {}", path.display())))
}

fn log_failure(unit: &str, error: &PluginError) {
    match error {
        PluginError::Security(violation) => tracing::warn!(
            plugin = %unit,
            kind = violation.kind.label(),
            detail = %violation.detail,
            "Rejected plugin source"
        ),
        PluginError::InvalidArgument(_) => {
            tracing::debug!(plugin = %unit, error = %error, "Invalid plugin request");
        }
        _ => tracing::warn!(plugin = %unit, error = %error, "Plugin pipeline failed"),
    }
}
