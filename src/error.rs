//! Error types for the plugin pipeline.

use std::path::PathBuf;
use thiserror::Error;

use crate::security::Violation;

pub type Result<T, E = PluginError> = std::result::Result<T, E>;

/// Errors surfaced by every pipeline operation.
///
/// A registry miss is never an error; lookups return `None`.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum PluginError {
    /// Missing or blank required input. Always a caller bug.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Source rejected before compilation.
    #[error("security violation: {0}")]
    Security(#[from] Violation),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Load(#[from] LoadError),

    /// A registered plugin's operation could not be invoked.
    #[error(transparent)]
    Invoke(#[from] InvokeError),

    /// A plugin source file exists but could not be read.
    #[error("failed to read plugin source {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PluginError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

/// The external toolchain could not turn source into an artifact.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("toolchain unavailable: {0}")]
    ToolchainUnavailable(String),

    #[error("compilation failed for {unit}: {diagnostics}")]
    Rejected { unit: String, diagnostics: String },

    #[error("compile workspace I/O failed: {0}")]
    Workspace(#[from] std::io::Error),
}

/// A compiled artifact could not be located or constructed.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("compiled class {class} not found after compilation")]
    NotFound { class: String },

    #[error("class {class} cannot be instantiated: {reason}")]
    Instantiation { class: String, reason: String },
}

/// Dynamic invocation of a named operation failed.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("{class} has no operation {operation} taking {arity} argument(s)")]
    NoSuchOperation {
        class: String,
        operation: String,
        arity: usize,
    },

    #[error("unsupported argument at position {index}: {reason}")]
    UnsupportedArgument { index: usize, reason: String },

    #[error("{class}.{operation} failed: {reason}")]
    Failed {
        class: String,
        operation: String,
        reason: String,
    },

    #[error("invocation I/O failed: {0}")]
    Io(#[from] std::io::Error),
}
