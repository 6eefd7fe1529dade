//! JVM-backed artifacts.
//!
//! Class bytes live in memory. Each probe or invocation materializes them into
//! a fresh run directory next to a small reflection harness and starts one
//! `java` process, so instances never outlive a single call.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::Arc;
use uuid::Uuid;

use super::traits::Artifact;
use super::workspace::{self, ClassSet};
use crate::error::{InvokeError, LoadError};

/// Main class of the invocation harness.
pub(crate) const HARNESS_CLASS: &str = "DynaplugHarness";

/// Harness protocol: `probe <class>` or `invoke <class> <operation> <args..>`.
///
/// Plugin writes to `System.out` are redirected to stderr. Exit 0 prints
/// `OK <kind> [value]` on the original stdout. Exit 2 means the class could
/// not be constructed, 3 that no public method matched name and arity, 4 that
/// the method threw.
pub(crate) const HARNESS_SOURCE: &str = r#"import java.io.PrintStream;
import java.lang.reflect.InvocationTargetException;
import java.lang.reflect.Method;
import java.lang.reflect.Modifier;

public final class DynaplugHarness {
    private static final PrintStream RESULT = System.out;

    public static void main(String[] args) throws Exception {
        System.setOut(System.err);
        Class<?> type = Class.forName(args[1]);
        Object instance;
        try {
            instance = type.getDeclaredConstructor().newInstance();
        } catch (ReflectiveOperationException | RuntimeException e) {
            System.err.println("INSTANTIATION " + describe(e));
            System.exit(2);
            return;
        }
        if (args[0].equals("probe")) {
            emit("OK void");
            return;
        }
        String operation = args[2];
        int arity = args.length - 3;
        for (Method method : type.getMethods()) {
            if (!method.getName().equals(operation) || method.getParameterCount() != arity) {
                continue;
            }
            Class<?>[] types = method.getParameterTypes();
            Object[] values = new Object[arity];
            for (int i = 0; i < arity; i++) {
                values[i] = convert(types[i], args[3 + i]);
            }
            Object result;
            try {
                Object target = Modifier.isStatic(method.getModifiers()) ? null : instance;
                result = method.invoke(target, values);
            } catch (InvocationTargetException e) {
                System.err.println("FAILED " + describe(e.getCause()));
                System.exit(4);
                return;
            }
            Class<?> returns = method.getReturnType();
            if (returns == void.class) {
                emit("OK void");
            } else if (result == null) {
                emit("OK null");
            } else {
                emit("OK " + kind(returns) + " " + result);
            }
            return;
        }
        System.err.println("MISSING " + operation + "/" + arity);
        System.exit(3);
    }

    private static void emit(String line) {
        RESULT.print(line);
        RESULT.flush();
    }

    private static Object convert(Class<?> type, String raw) {
        if (type == int.class || type == Integer.class) return Integer.parseInt(raw);
        if (type == long.class || type == Long.class) return Long.parseLong(raw);
        if (type == short.class || type == Short.class) return Short.parseShort(raw);
        if (type == byte.class || type == Byte.class) return Byte.parseByte(raw);
        if (type == double.class || type == Double.class) return Double.parseDouble(raw);
        if (type == float.class || type == Float.class) return Float.parseFloat(raw);
        if (type == boolean.class || type == Boolean.class) return Boolean.parseBoolean(raw);
        if (type == char.class || type == Character.class) return raw.charAt(0);
        return raw;
    }

    private static String kind(Class<?> type) {
        if (type == int.class || type == long.class || type == short.class
                || type == byte.class || type == Integer.class || type == Long.class
                || type == Short.class || type == Byte.class) {
            return "int";
        }
        if (type == double.class || type == float.class
                || type == Double.class || type == Float.class) {
            return "float";
        }
        if (type == boolean.class || type == Boolean.class) {
            return "bool";
        }
        return "string";
    }

    private static String describe(Throwable t) {
        return t == null ? "unknown" : t.getClass().getName() + ": " + t.getMessage();
    }
}
"#;

const EXIT_INSTANTIATION: i32 = 2;
const EXIT_MISSING: i32 = 3;

/// A compiled plugin class together with everything needed to run it.
pub struct JvmArtifact {
    id: Uuid,
    class_name: String,
    binary_name: String,
    classes: ClassSet,
    harness: Arc<ClassSet>,
    java: PathBuf,
    workspace_root: Option<PathBuf>,
}

impl JvmArtifact {
    pub(crate) fn new(
        class_name: String,
        binary_name: String,
        classes: ClassSet,
        harness: Arc<ClassSet>,
        java: PathBuf,
        workspace_root: Option<PathBuf>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            class_name,
            binary_name,
            classes,
            harness,
            java,
            workspace_root,
        }
    }

    /// Unique id for this compilation, used in logs.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Fully qualified binary name, including any package.
    pub fn binary_name(&self) -> &str {
        &self.binary_name
    }

    /// Run the harness in a fresh class path directory.
    fn run_harness(&self, args: &[String]) -> std::io::Result<Output> {
        let run_dir = workspace::create("dynaplug-run-", self.workspace_root.as_deref())?;
        let result = self.run_in(run_dir.path(), args);
        workspace::close(run_dir);
        result
    }

    fn run_in(&self, dir: &Path, args: &[String]) -> std::io::Result<Output> {
        self.classes.write_to(dir)?;
        self.harness.write_to(dir)?;
        let mut command = Command::new(&self.java);
        command.arg("-cp").arg(dir).arg(HARNESS_CLASS).args(args);
        tracing::trace!(
            artifact = %self.id,
            class = %self.binary_name,
            command = ?command,
            "Starting plugin harness"
        );
        command.output()
    }
}

impl Artifact for JvmArtifact {
    fn class_name(&self) -> &str {
        &self.class_name
    }

    fn instantiate(&self) -> Result<(), LoadError> {
        let output = self
            .run_harness(&["probe".to_string(), self.binary_name.clone()])
            .map_err(|e| LoadError::Instantiation {
                class: self.class_name.clone(),
                reason: e.to_string(),
            })?;
        if output.status.success() {
            return Ok(());
        }
        Err(LoadError::Instantiation {
            class: self.class_name.clone(),
            reason: stderr_text(&output),
        })
    }

    fn invoke(
        &self,
        operation: &str,
        args: &[serde_json::Value],
    ) -> Result<serde_json::Value, InvokeError> {
        let mut argv = vec![
            "invoke".to_string(),
            self.binary_name.clone(),
            operation.to_string(),
        ];
        for (index, arg) in args.iter().enumerate() {
            argv.push(encode_argument(index, arg)?);
        }

        let output = self.run_harness(&argv)?;
        let failed = |reason: String| InvokeError::Failed {
            class: self.class_name.clone(),
            operation: operation.to_string(),
            reason,
        };
        match output.status.code() {
            Some(0) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                decode_result(&stdout)
                    .ok_or_else(|| failed(format!("unexpected harness output: {stdout}")))
            }
            Some(EXIT_MISSING) => Err(InvokeError::NoSuchOperation {
                class: self.class_name.clone(),
                operation: operation.to_string(),
                arity: args.len(),
            }),
            Some(EXIT_INSTANTIATION) => Err(failed(format!(
                "instance construction failed: {}",
                stderr_text(&output)
            ))),
            _ => Err(failed(stderr_text(&output))),
        }
    }
}

impl std::fmt::Debug for JvmArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JvmArtifact")
            .field("id", &self.id)
            .field("class_name", &self.class_name)
            .field("binary_name", &self.binary_name)
            .field("class_files", &self.classes.len())
            .finish_non_exhaustive()
    }
}

fn encode_argument(index: usize, value: &serde_json::Value) -> Result<String, InvokeError> {
    match value {
        serde_json::Value::String(s) => Ok(s.clone()),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Bool(b) => Ok(b.to_string()),
        other => Err(InvokeError::UnsupportedArgument {
            index,
            reason: format!("only strings, numbers and booleans can be passed, got {other}"),
        }),
    }
}

/// Parse `OK <kind> [value]` harness output.
fn decode_result(stdout: &str) -> Option<serde_json::Value> {
    let rest = stdout.strip_prefix("OK ")?;
    let (kind, value) = rest.split_once(' ').unwrap_or((rest, ""));
    match kind {
        "void" | "null" => Some(serde_json::Value::Null),
        "int" => value.trim().parse::<i64>().ok().map(serde_json::Value::from),
        "float" => value
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(serde_json::Value::Number),
        "bool" => value.trim().parse::<bool>().ok().map(serde_json::Value::Bool),
        "string" => Some(serde_json::Value::String(value.to_string())),
        _ => None,
    }
}

fn stderr_text(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if stderr.is_empty() {
        format!("harness exited with {}", output.status)
    } else {
        stderr
    }
}
