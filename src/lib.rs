//! Validate, compile and register untrusted plugin source at runtime.

pub mod config;
pub mod error;
pub mod plugins;
pub mod security;

pub use config::{Config, ToolchainConfig};
pub use error::{CompileError, InvokeError, LoadError, PluginError, Result};
pub use plugins::{
    Artifact, JvmToolchain, PluginEntry, PluginInfo, PluginRegistry, PluginService, Toolchain,
};
pub use security::{Capability, PolicyConfig, PolicyPreset, SourceGate, Violation, ViolationKind};
