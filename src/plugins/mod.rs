//! Runtime plugin pipeline.
//!
//! Untrusted source moves through a fixed sequence before anything can run it:
//!
//! 1. **Gate**: [`SourceGate`](crate::security::SourceGate) screens the text
//!    against the service's policy. Nothing is compiled on rejection.
//! 2. **Compile**: a [`Toolchain`] turns the source into an [`Artifact`] in a
//!    private scratch workspace that is removed afterwards.
//! 3. **Probe**: the artifact must construct with no arguments.
//! 4. **Register**: the entry is published under its derived name
//!    (`MathPlugin` → `mathPlugin`) in a [`PluginRegistry`] that any number of
//!    services may share.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use dynaplug::plugins::{JvmToolchain, PluginService};
//!
//! # fn main() -> dynaplug::Result<()> {
//! let service = PluginService::new(Arc::new(JvmToolchain::from_path()?));
//! let entry = service.compile_and_register(
//!     "MathPlugin",
//!     "public class MathPlugin { public int sum(int a, int b) { return a + b; } }",
//! )?;
//! let eight = service.invoke(entry.name(), "sum", &[5.into(), 3.into()])?;
//! assert_eq!(eight, Some(8.into()));
//! # Ok(())
//! # }
//! ```

pub mod compiler;
pub mod loader;
pub mod naming;
pub mod registry;
pub mod service;
pub mod traits;
mod workspace;

pub use compiler::JvmToolchain;
pub use loader::JvmArtifact;
pub use naming::{derive_plugin_name, is_valid_plugin_name};
pub use registry::{PluginEntry, PluginRegistry};
pub use service::{PluginService, SOURCE_EXTENSION};
pub use traits::{Artifact, PluginInfo, Toolchain};
