//! Seams between the trust pipeline and the external compiler/loader.
//!
//! The pipeline only ever sees an artifact's class name, its instantiation
//! probe and named invocation. Everything else belongs to the toolchain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::error::{InvokeError, LoadError, Result};

/// A loaded, instantiable executable unit.
pub trait Artifact: Send + Sync + fmt::Debug {
    /// Simple name of the main class.
    fn class_name(&self) -> &str;

    /// Construct one instance with no arguments and discard it.
    fn instantiate(&self) -> Result<(), LoadError>;

    /// Invoke `operation` on a fresh instance.
    fn invoke(
        &self,
        operation: &str,
        args: &[serde_json::Value],
    ) -> Result<serde_json::Value, InvokeError>;
}

/// Compiles plugin source into artifacts.
///
/// Implementations must give each call its own workspace and remove it on
/// every exit path.
pub trait Toolchain: Send + Sync {
    /// Compile inline source whose main class is `logical_name`.
    fn compile_from_text(&self, logical_name: &str, source: &str) -> Result<Arc<dyn Artifact>>;

    /// Compile a source file; the logical name is the file stem.
    fn compile_from_file(&self, path: &Path) -> Result<Arc<dyn Artifact>>;
}

/// Serializable summary of a plugin entry, for front ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    /// Registry key (e.g., "mathPlugin")
    pub name: String,
    /// Main class name (e.g., "MathPlugin")
    pub class_name: String,
    /// When the artifact passed its instantiation probe
    pub loaded_at: DateTime<Utc>,
}
