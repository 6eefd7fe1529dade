//! Per-call scratch directories and the class files moved through them.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Create a uniquely named scratch directory under `root` (or the system
/// temp dir).
pub(crate) fn create(prefix: &str, root: Option<&Path>) -> io::Result<TempDir> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(prefix);
    match root {
        Some(root) => builder.tempdir_in(root),
        None => builder.tempdir(),
    }
}

/// Remove a scratch directory. Failures are logged, never returned.
pub(crate) fn close(workspace: TempDir) {
    let path = workspace.path().to_path_buf();
    if let Err(e) = workspace.close() {
        tracing::warn!(
            workspace = %path.display(),
            error = %e,
            "Could not clean up plugin workspace"
        );
    }
}

/// One compiled class file, addressed relative to the class path root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ClassFile {
    relative: PathBuf,
    bytes: Vec<u8>,
}

/// Every class file a compilation produced, held in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ClassSet {
    files: Vec<ClassFile>,
}

impl ClassSet {
    /// Read every `.class` file below `root`.
    pub(crate) fn read_dir(root: &Path) -> io::Result<Self> {
        let mut files = Vec::new();
        collect(root, root, &mut files)?;
        files.sort_by(|a, b| a.relative.cmp(&b.relative));
        Ok(Self { files })
    }

    /// Write every class file below `root`, recreating package directories.
    pub(crate) fn write_to(&self, root: &Path) -> io::Result<()> {
        for file in &self.files {
            let target = root.join(&file.relative);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(target, &file.bytes)?;
        }
        Ok(())
    }

    /// Binary name (`pkg.Name`) of the top-level class with simple name `simple`.
    pub(crate) fn binary_name(&self, simple: &str) -> Option<String> {
        let file_name = format!("{simple}.class");
        self.files
            .iter()
            .find(|f| f.relative.file_name().and_then(|n| n.to_str()) == Some(file_name.as_str()))
            .map(|f| {
                f.relative
                    .with_extension("")
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join(".")
            })
    }

    pub(crate) fn len(&self) -> usize {
        self.files.len()
    }

    pub(crate) fn total_bytes(&self) -> usize {
        self.files.iter().map(|f| f.bytes.len()).sum()
    }
}

fn collect(root: &Path, dir: &Path, out: &mut Vec<ClassFile>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect(root, &path, out)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some("class") {
            let relative = path
                .strip_prefix(root)
                .map_err(|e| io::Error::other(e.to_string()))?
                .to_path_buf();
            out.push(ClassFile {
                relative,
                bytes: fs::read(&path)?,
            });
        }
    }
    Ok(())
}
