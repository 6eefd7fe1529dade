#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dynaplug::{Artifact, CompileError, InvokeError, LoadError, Result, Toolchain};
use serde_json::Value;

/// Artifact that understands a couple of arithmetic operations.
#[derive(Debug)]
pub struct Calculator {
    class: String,
}

impl Artifact for Calculator {
    fn class_name(&self) -> &str {
        &self.class
    }

    fn instantiate(&self) -> std::result::Result<(), LoadError> {
        Ok(())
    }

    fn invoke(&self, operation: &str, args: &[Value]) -> std::result::Result<Value, InvokeError> {
        let ints: Vec<i64> = args.iter().filter_map(Value::as_i64).collect();
        match (operation, ints.as_slice()) {
            ("sum", [a, b]) => Ok(Value::from(a + b)),
            ("negate", [a]) => Ok(Value::from(-a)),
            _ => Err(InvokeError::NoSuchOperation {
                class: self.class.clone(),
                operation: operation.to_string(),
                arity: args.len(),
            }),
        }
    }
}

/// Toolchain that "compiles" whatever it is given and counts calls.
///
/// Source containing `int x }` is rejected like a syntax error.
#[derive(Debug, Default)]
pub struct FakeToolchain {
    calls: AtomicUsize,
}

impl FakeToolchain {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Toolchain for FakeToolchain {
    fn compile_from_text(&self, logical_name: &str, source: &str) -> Result<Arc<dyn Artifact>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if source.contains("int x }") {
            return Err(CompileError::Rejected {
                unit: logical_name.to_string(),
                diagnostics: format!("{logical_name}.java:1: error: ';' expected"),
            }
            .into());
        }
        Ok(Arc::new(Calculator {
            class: logical_name.to_string(),
        }))
    }

    fn compile_from_file(&self, path: &Path) -> Result<Arc<dyn Artifact>> {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let source = std::fs::read_to_string(path).unwrap_or_default();
        self.compile_from_text(&stem, &source)
    }
}

/// Route pipeline logs to the test harness; filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub const SUM_SOURCE: &str = "public class M { public int sum(int a,int b){return a+b;} }";

pub const SPAWN_SOURCE: &str = r#"public class Spawner {
    public void run() throws Exception {
        new ProcessBuilder("ls").start();
    }
}"#;

/// Write `source` to `<dir>/<file_name>`.
pub fn write_source(dir: &Path, file_name: &str, source: &str) -> std::path::PathBuf {
    let path = dir.join(file_name);
    std::fs::write(&path, source).unwrap();
    path
}
