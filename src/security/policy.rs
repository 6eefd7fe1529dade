//! Execution policy: which capabilities untrusted source may touch and how
//! large it may be.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroUsize;

/// A class of operations a policy may allow or deny.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Filesystem entries, file streams, path utilities
    File,
    /// Sockets and URL connections
    Network,
    /// Dynamic class lookup and reflective invocation
    Introspection,
    /// Process spawning and runtime control
    Process,
    /// Database connections and driver managers
    Database,
}

impl Capability {
    /// Every category, in the order the validator checks them.
    pub const ALL: [Capability; 5] = [
        Capability::File,
        Capability::Network,
        Capability::Introspection,
        Capability::Process,
        Capability::Database,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Capability::File => "file",
            Capability::Network => "network",
            Capability::Introspection => "introspection",
            Capability::Process => "process",
            Capability::Database => "database",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named, immutable policy presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PolicyPreset {
    Strict,
    Moderate,
    Permissive,
}

impl PolicyPreset {
    pub fn policy(self) -> PolicyConfig {
        match self {
            PolicyPreset::Strict => PolicyConfig::strict(),
            PolicyPreset::Moderate => PolicyConfig::moderate(),
            PolicyPreset::Permissive => PolicyConfig::permissive(),
        }
    }
}

impl std::str::FromStr for PolicyPreset {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(PolicyPreset::Strict),
            "moderate" => Ok(PolicyPreset::Moderate),
            "permissive" => Ok(PolicyPreset::Permissive),
            other => Err(PolicyError::UnknownPreset(other.to_string())),
        }
    }
}

/// Errors raised while building a custom policy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    #[error("{field} must be greater than zero")]
    ZeroLimit { field: &'static str },
    #[error("unknown policy preset '{0}' (expected strict, moderate or permissive)")]
    UnknownPreset(String),
}

/// What an execution environment permits.
///
/// Values are immutable: a different policy means a new value, and a service
/// built on a policy keeps it for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PolicyConfig {
    enable_validation: bool,
    allow_file_ops: bool,
    allow_network_ops: bool,
    allow_introspection: bool,
    allow_process_ops: bool,
    allow_database_ops: bool,
    max_source_length: NonZeroUsize,
    max_complexity: NonZeroUsize,
}

const fn limit(value: usize) -> NonZeroUsize {
    match NonZeroUsize::new(value) {
        Some(v) => v,
        None => panic!("preset limits are non-zero"),
    }
}

impl PolicyConfig {
    const fn preset(allow: bool, max_source_length: usize, max_complexity: usize) -> Self {
        Self {
            enable_validation: true,
            allow_file_ops: allow,
            allow_network_ops: allow,
            allow_introspection: allow,
            allow_process_ops: allow,
            allow_database_ops: allow,
            max_source_length: limit(max_source_length),
            max_complexity: limit(max_complexity),
        }
    }

    /// Every capability denied, low limits. For untrusted environments.
    pub const fn strict() -> Self {
        Self::preset(false, 500, 5)
    }

    /// Every capability denied, default limits.
    pub const fn moderate() -> Self {
        Self::preset(false, 1000, 10)
    }

    /// Every capability allowed, high limits. For trusted environments only.
    pub const fn permissive() -> Self {
        Self::preset(true, 10_000, 50)
    }

    /// Start a custom policy from this one.
    pub fn to_builder(self) -> PolicyBuilder {
        PolicyBuilder {
            base: self,
            max_source_length: self.max_source_length.get(),
            max_complexity: self.max_complexity.get(),
        }
    }

    pub fn enable_validation(&self) -> bool {
        self.enable_validation
    }

    pub fn max_source_length(&self) -> usize {
        self.max_source_length.get()
    }

    pub fn max_complexity(&self) -> usize {
        self.max_complexity.get()
    }

    /// Whether source may use primitives of the given category.
    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::File => self.allow_file_ops,
            Capability::Network => self.allow_network_ops,
            Capability::Introspection => self.allow_introspection,
            Capability::Process => self.allow_process_ops,
            Capability::Database => self.allow_database_ops,
        }
    }

    /// Denied categories, in check order.
    pub fn denied_capabilities(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::ALL.into_iter().filter(|c| !self.allows(*c))
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self::moderate()
    }
}

/// Builder for custom policies.
#[derive(Debug, Clone)]
pub struct PolicyBuilder {
    base: PolicyConfig,
    max_source_length: usize,
    max_complexity: usize,
}

impl PolicyBuilder {
    pub fn enable_validation(mut self, enabled: bool) -> Self {
        self.base.enable_validation = enabled;
        self
    }

    pub fn allow(self, capability: Capability) -> Self {
        self.set(capability, true)
    }

    pub fn deny(self, capability: Capability) -> Self {
        self.set(capability, false)
    }

    pub fn set(mut self, capability: Capability, allowed: bool) -> Self {
        let flag = match capability {
            Capability::File => &mut self.base.allow_file_ops,
            Capability::Network => &mut self.base.allow_network_ops,
            Capability::Introspection => &mut self.base.allow_introspection,
            Capability::Process => &mut self.base.allow_process_ops,
            Capability::Database => &mut self.base.allow_database_ops,
        };
        *flag = allowed;
        self
    }

    pub fn max_source_length(mut self, value: usize) -> Self {
        self.max_source_length = value;
        self
    }

    pub fn max_complexity(mut self, value: usize) -> Self {
        self.max_complexity = value;
        self
    }

    pub fn build(self) -> Result<PolicyConfig, PolicyError> {
        let max_source_length =
            NonZeroUsize::new(self.max_source_length).ok_or(PolicyError::ZeroLimit {
                field: "max_source_length",
            })?;
        let max_complexity =
            NonZeroUsize::new(self.max_complexity).ok_or(PolicyError::ZeroLimit {
                field: "max_complexity",
            })?;
        Ok(PolicyConfig {
            max_source_length,
            max_complexity,
            ..self.base
        })
    }
}
