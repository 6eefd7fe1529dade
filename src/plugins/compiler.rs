//! JDK toolchain: compiles plugin source with `javac` in isolated workspaces.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::Arc;

use super::loader::{JvmArtifact, HARNESS_CLASS, HARNESS_SOURCE};
use super::naming::is_valid_plugin_name;
use super::service::{check_source_path, source_class_name};
use super::traits::{Artifact, Toolchain};
use super::workspace::{self, ClassSet};
use crate::config::ToolchainConfig;
use crate::error::{CompileError, LoadError, PluginError, Result};

/// [`Toolchain`] backed by an installed JDK.
pub struct JvmToolchain {
    javac: PathBuf,
    java: PathBuf,
    javac_args: Vec<String>,
    workspace_root: Option<PathBuf>,
    harness: Arc<ClassSet>,
}

impl JvmToolchain {
    /// Resolve `javac` and `java` and compile the invocation harness.
    pub fn new(config: &ToolchainConfig) -> Result<Self> {
        let mut toolchain = Self {
            javac: resolve_tool(&config.javac)?,
            java: resolve_tool(&config.java)?,
            javac_args: config.javac_args.clone(),
            workspace_root: config.workspace_root.clone(),
            harness: Arc::new(ClassSet::default()),
        };
        let (_, harness) = toolchain.compile_classes(HARNESS_CLASS, HARNESS_SOURCE)?;
        toolchain.harness = Arc::new(harness);

        tracing::info!(
            javac = %toolchain.javac.display(),
            java = %toolchain.java.display(),
            "JDK toolchain ready"
        );
        Ok(toolchain)
    }

    /// Toolchain with default settings, resolving tools from `PATH`.
    pub fn from_path() -> Result<Self> {
        Self::new(&ToolchainConfig::default())
    }

    /// Compile `source` as class `unit` in a fresh workspace, returning the
    /// main class binary name and every produced class file.
    fn compile_classes(&self, unit: &str, source: &str) -> Result<(String, ClassSet)> {
        let workspace = workspace::create("dynaplug-compile-", self.workspace_root.as_deref())
            .map_err(CompileError::from)?;
        let result = self.compile_in(workspace.path(), unit, source);
        workspace::close(workspace);
        result
    }

    fn compile_in(&self, dir: &Path, unit: &str, source: &str) -> Result<(String, ClassSet)> {
        let source_file = dir.join(format!("{unit}.java"));
        let classes_dir = dir.join("classes");
        fs::write(&source_file, source).map_err(CompileError::from)?;
        fs::create_dir(&classes_dir).map_err(CompileError::from)?;

        let mut command = Command::new(&self.javac);
        command
            .args(&self.javac_args)
            .arg("-d")
            .arg(&classes_dir)
            .arg(&source_file);
        tracing::trace!(unit = %unit, command = ?command, "Running javac");

        let output = command.output().map_err(CompileError::from)?;
        if !output.status.success() {
            return Err(CompileError::Rejected {
                unit: unit.to_string(),
                diagnostics: diagnostics(&output),
            }
            .into());
        }

        let classes = ClassSet::read_dir(&classes_dir).map_err(CompileError::from)?;
        let binary_name = classes.binary_name(unit).ok_or_else(|| LoadError::NotFound {
            class: unit.to_string(),
        })?;
        tracing::debug!(
            unit = %unit,
            class_files = classes.len(),
            bytes = classes.total_bytes(),
            "Compiled plugin source"
        );
        Ok((binary_name, classes))
    }

    fn artifact(&self, unit: &str, source: &str) -> Result<Arc<dyn Artifact>> {
        if !is_valid_plugin_name(unit) {
            return Err(PluginError::invalid(format!("'{unit}' is not a valid class name")));
        }
        let (binary_name, classes) = self.compile_classes(unit, source)?;
        Ok(Arc::new(JvmArtifact::new(
            unit.to_string(),
            binary_name,
            classes,
            Arc::clone(&self.harness),
            self.java.clone(),
            self.workspace_root.clone(),
        )))
    }
}

impl Toolchain for JvmToolchain {
    fn compile_from_text(&self, logical_name: &str, source: &str) -> Result<Arc<dyn Artifact>> {
        if logical_name.trim().is_empty() {
            return Err(PluginError::invalid("Class name cannot be null or empty"));
        }
        if source.trim().is_empty() {
            return Err(PluginError::invalid("Java source cannot be null or empty"));
        }
        self.artifact(logical_name, source)
    }

    fn compile_from_file(&self, path: &Path) -> Result<Arc<dyn Artifact>> {
        check_source_path(path)?;
        let unit = source_class_name(path)?;
        let source = fs::read_to_string(path).map_err(|source| PluginError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.artifact(unit, &source)
    }
}

impl std::fmt::Debug for JvmToolchain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JvmToolchain")
            .field("javac", &self.javac)
            .field("java", &self.java)
            .field("javac_args", &self.javac_args)
            .field("workspace_root", &self.workspace_root)
            .finish_non_exhaustive()
    }
}

fn resolve_tool(tool: &str) -> Result<PathBuf, CompileError> {
    which::which(tool).map_err(|e| CompileError::ToolchainUnavailable(format!("{tool}: {e}")))
}

fn diagnostics(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let text = if stderr.trim().is_empty() { stdout } else { stderr };
    let text = text.trim();
    if text.is_empty() {
        format!("javac exited with {}", output.status)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// `None` when no JDK is installed; such tests return early.
    fn jdk() -> Option<JvmToolchain> {
        match JvmToolchain::from_path() {
            Ok(toolchain) => Some(toolchain),
            Err(e) => {
                eprintln!("skipping JDK test: {e}");
                None
            }
        }
    }

    #[test]
    fn missing_tool_is_toolchain_unavailable() {
        let config = ToolchainConfig {
            javac: "dynaplug-no-such-javac".into(),
            ..ToolchainConfig::default()
        };
        let err = JvmToolchain::new(&config).unwrap_err();
        assert!(matches!(
            err,
            PluginError::Compile(CompileError::ToolchainUnavailable(_))
        ));
    }

    #[test]
    fn compiles_and_invokes_sum() {
        let Some(toolchain) = jdk() else { return };
        let artifact = toolchain
            .compile_from_text("M", "public class M { public int sum(int a,int b){return a+b;} }")
            .unwrap();
        artifact.instantiate().unwrap();
        assert_eq!(artifact.invoke("sum", &[json!(5), json!(3)]).unwrap(), json!(8));
    }

    #[test]
    fn syntax_errors_are_compile_errors() {
        let Some(toolchain) = jdk() else { return };
        let err = toolchain
            .compile_from_text("Broken", "public class Broken { int x }")
            .unwrap_err();
        match err {
            PluginError::Compile(CompileError::Rejected { unit, diagnostics }) => {
                assert_eq!(unit, "Broken");
                assert!(!diagnostics.is_empty());
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn missing_main_class_is_load_error() {
        let Some(toolchain) = jdk() else { return };
        let err = toolchain
            .compile_from_text("Expected", "class Other {}")
            .unwrap_err();
        assert!(matches!(err, PluginError::Load(LoadError::NotFound { .. })));
    }

    #[test]
    fn unknown_operation_is_reported() {
        let Some(toolchain) = jdk() else { return };
        let artifact = toolchain
            .compile_from_text(
                "Greeter",
                "public class Greeter { public String greet(String n) { return \"Hello, \" + n + \"!\"; } }",
            )
            .unwrap();
        assert_eq!(
            artifact.invoke("greet", &[json!("World")]).unwrap(),
            json!("Hello, World!")
        );
        assert!(matches!(
            artifact.invoke("greet", &[]),
            Err(crate::error::InvokeError::NoSuchOperation { arity: 0, .. })
        ));
    }

    #[test]
    fn plugin_stdout_does_not_corrupt_results() {
        let Some(toolchain) = jdk() else { return };
        let source = "public class Loud {\n\
            static { System.out.println(\"loading\"); }\n\
            public Loud() { System.out.print(\"OK string fake\"); }\n\
            public int sum(int a, int b) { System.out.println(a); return a + b; }\n\
            }";
        let artifact = toolchain.compile_from_text("Loud", source).unwrap();
        artifact.instantiate().unwrap();
        assert_eq!(artifact.invoke("sum", &[json!(5), json!(3)]).unwrap(), json!(8));
    }

    #[test]
    fn compile_workspaces_are_removed() {
        let Some(_) = jdk() else { return };
        let root = tempfile::tempdir().unwrap();
        let config = ToolchainConfig {
            workspace_root: Some(root.path().to_path_buf()),
            ..ToolchainConfig::default()
        };
        let toolchain = JvmToolchain::new(&config).unwrap();
        toolchain
            .compile_from_text("Plugin1", "public class Plugin1 {}")
            .unwrap();
        let _ = toolchain.compile_from_text("Bad", "public class Bad {");
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn rejects_path_like_logical_names() {
        let Some(toolchain) = jdk() else { return };
        let err = toolchain
            .compile_from_text("../Escape", "public class Escape {}")
            .unwrap_err();
        assert!(matches!(err, PluginError::InvalidArgument(_)));
    }
}
