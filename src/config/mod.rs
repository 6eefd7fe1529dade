//! TOML configuration for embedding applications.
//!
//! ```toml
//! [policy]
//! preset = "moderate"
//! allow_network_ops = true
//! max_complexity = 20
//!
//! [toolchain]
//! javac = "/opt/jdk/bin/javac"
//! javac_args = ["--release", "17"]
//! ```

mod schema;

pub use schema::json_schema;

use anyhow::{Context, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::security::{Capability, PolicyConfig, PolicyError, PolicyPreset};

/// Environment variable that replaces the configured policy preset.
pub const POLICY_ENV: &str = "DYNAPLUG_POLICY";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub policy: PolicySection,
    pub toolchain: ToolchainConfig,
}

impl Config {
    /// Resolve the `[policy]` table into an immutable policy.
    pub fn policy_config(&self) -> Result<PolicyConfig, PolicyError> {
        self.policy.resolve()
    }

    /// Replace the preset with `value` when present, ignoring blank values.
    pub fn apply_policy_override(&mut self, value: Option<&str>) -> Result<(), PolicyError> {
        if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
            self.policy.preset = Some(value.parse()?);
        }
        Ok(())
    }
}

/// A preset plus optional per-field overrides.
///
/// Without a preset the strict policy is the base.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct PolicySection {
    pub preset: Option<PolicyPreset>,
    pub enable_validation: Option<bool>,
    pub allow_file_ops: Option<bool>,
    pub allow_network_ops: Option<bool>,
    pub allow_introspection: Option<bool>,
    pub allow_process_ops: Option<bool>,
    pub allow_database_ops: Option<bool>,
    pub max_source_length: Option<usize>,
    pub max_complexity: Option<usize>,
}

impl PolicySection {
    pub fn resolve(&self) -> Result<PolicyConfig, PolicyError> {
        let base = self.preset.unwrap_or(PolicyPreset::Strict).policy();
        let mut builder = base.to_builder();
        if let Some(enabled) = self.enable_validation {
            builder = builder.enable_validation(enabled);
        }
        for (capability, allowed) in [
            (Capability::File, self.allow_file_ops),
            (Capability::Network, self.allow_network_ops),
            (Capability::Introspection, self.allow_introspection),
            (Capability::Process, self.allow_process_ops),
            (Capability::Database, self.allow_database_ops),
        ] {
            if let Some(allowed) = allowed {
                builder = builder.set(capability, allowed);
            }
        }
        if let Some(limit) = self.max_source_length {
            builder = builder.max_source_length(limit);
        }
        if let Some(limit) = self.max_complexity {
            builder = builder.max_complexity(limit);
        }
        builder.build()
    }
}

/// Where to find the JDK and where to put scratch directories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct ToolchainConfig {
    /// Compiler name or path, resolved through `PATH`.
    pub javac: String,
    /// Launcher name or path, resolved through `PATH`.
    pub java: String,
    /// Extra arguments placed before `-d` on every compile.
    pub javac_args: Vec<String>,
    /// Parent for per-call workspaces; the system temp dir when unset.
    pub workspace_root: Option<PathBuf>,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            javac: "javac".into(),
            java: "java".into(),
            javac_args: Vec::new(),
            workspace_root: None,
        }
    }
}

/// `<config dir>/dynaplug/config.toml` for the current user, if a home
/// directory can be determined.
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "dynaplug")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Parse a TOML document and check that its policy resolves.
pub fn parse_config(text: &str) -> Result<Config> {
    let config: Config = toml::from_str(text).context("Failed to parse dynaplug config")?;
    config
        .policy_config()
        .context("Invalid [policy] section")?;
    Ok(config)
}

/// Load `path`, then apply the [`POLICY_ENV`] override.
pub fn load_config(path: &Path) -> Result<Config> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let mut config =
        parse_config(&text).with_context(|| format!("In config file: {}", path.display()))?;
    apply_env(&mut config)?;
    tracing::debug!(path = %path.display(), "Loaded dynaplug config");
    Ok(config)
}

/// Load the per-user config file, falling back to defaults when it is absent.
pub fn load_default_config() -> Result<Config> {
    match default_config_path() {
        Some(path) if path.exists() => load_config(&path),
        _ => {
            let mut config = Config::default();
            apply_env(&mut config)?;
            Ok(config)
        }
    }
}

fn apply_env(config: &mut Config) -> Result<()> {
    let value = std::env::var(POLICY_ENV).ok();
    config
        .apply_policy_override(value.as_deref())
        .with_context(|| format!("Invalid {POLICY_ENV}"))?;
    if let Some(preset) = value.as_deref().filter(|v| !v.trim().is_empty()) {
        tracing::info!(preset = %preset.trim(), "Policy preset overridden from environment");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_strict_with_default_tools() {
        let config = parse_config("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.policy_config().unwrap(), PolicyConfig::strict());
        assert_eq!(config.toolchain.javac, "javac");
        assert_eq!(config.toolchain.java, "java");
    }

    #[test]
    fn preset_with_overrides() {
        let config = parse_config(
            r#"
            [policy]
            preset = "moderate"
            allow_network_ops = true
            max_complexity = 20

            [toolchain]
            javac_args = ["--release", "17"]
            workspace_root = "/var/tmp/dynaplug"
            "#,
        )
        .unwrap();
        let policy = config.policy_config().unwrap();
        assert!(policy.allows(Capability::Network));
        assert!(!policy.allows(Capability::Process));
        assert_eq!(policy.max_source_length(), 1000);
        assert_eq!(policy.max_complexity(), 20);
        assert_eq!(config.toolchain.javac_args, vec!["--release", "17"]);
        assert_eq!(
            config.toolchain.workspace_root.as_deref(),
            Some(Path::new("/var/tmp/dynaplug"))
        );
    }

    #[test]
    fn rejects_bad_documents() {
        assert!(parse_config("[policy]\npreset = \"lenient\"").is_err());
        assert!(parse_config("[policy]\nmax_source_length = 0").is_err());
        assert!(parse_config("[plugins]\nenabled = true").is_err());
    }

    #[test]
    fn policy_override_replaces_preset() {
        let mut config = parse_config("[policy]\npreset = \"strict\"\nmax_complexity = 7").unwrap();
        config.apply_policy_override(Some("Permissive")).unwrap();
        let policy = config.policy_config().unwrap();
        assert!(policy.allows(Capability::File));
        assert_eq!(policy.max_complexity(), 7);

        config.apply_policy_override(Some("  ")).unwrap();
        config.apply_policy_override(None).unwrap();
        assert_eq!(config.policy.preset, Some(PolicyPreset::Permissive));

        assert!(matches!(
            config.apply_policy_override(Some("open")),
            Err(PolicyError::UnknownPreset(_))
        ));
    }

    #[test]
    fn load_config_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("config.toml");
        let err = load_config(&missing).unwrap_err();
        assert!(format!("{err:#}").contains("config.toml"));

        std::fs::write(&missing, "[policy]\npreset = \"moderate\"\n").unwrap();
        let config = load_config(&missing).unwrap();
        assert!(config.policy.preset.is_some());
    }

    #[test]
    fn default_path_ends_in_config_toml() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("config.toml"));
        }
    }
}
