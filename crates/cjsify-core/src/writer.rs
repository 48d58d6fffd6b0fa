//! Buffered output.
//!
//! Descriptors are collected while a group converts and only written once
//! the whole group succeeded, so a failing conversion leaves no partial
//! output behind.

use crate::codegen::ExportMode;
use crate::error::{ConvertError, Result};
use crate::graph::ModuleIdx;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// One file to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDescriptor {
    /// Destination path
    pub path: PathBuf,
    /// File contents
    pub contents: String,
    /// How the module exposes its exports
    pub export_mode: ExportMode,
    /// Source module
    pub module: PathBuf,
}

/// Pending output of one group.
#[derive(Debug, Default)]
pub struct OutputWriter {
    pending: Vec<OutputDescriptor>,
}

impl OutputWriter {
    /// Empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a descriptor.
    pub fn push(&mut self, descriptor: OutputDescriptor) {
        self.pending.push(descriptor);
    }

    /// Number of queued files
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Nothing queued?
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Queued descriptors, in push order
    pub fn descriptors(&self) -> &[OutputDescriptor] {
        &self.pending
    }

    /// Write every queued file, creating directories as needed.
    pub async fn commit(self) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(self.pending.len());
        for descriptor in self.pending {
            write_file(&descriptor.path, &descriptor.contents).await?;
            debug!(
                path = %descriptor.path.display(),
                mode = %descriptor.export_mode,
                "Wrote module"
            );
            written.push(descriptor.path);
        }
        Ok(written)
    }
}

async fn write_file(path: &Path, contents: &str) -> Result<()> {
    let failed = |source| ConvertError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(failed)?;
    }
    fs::write(path, contents).await.map_err(failed)
}

/// Output path of module `source` under `out_dir`, mirroring its position
/// below `root`.
pub fn output_path(source: &Path, root: &Path, out_dir: &Path, extension: &str) -> PathBuf {
    let relative = source
        .strip_prefix(root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| source.file_name().map(PathBuf::from).unwrap_or_default());
    out_dir.join(relative).with_extension(extension)
}

/// Deepest directory containing every path.
pub fn common_root<'a>(paths: impl IntoIterator<Item = &'a Path>) -> Option<PathBuf> {
    let mut root: Option<PathBuf> = None;
    for path in paths {
        let dir = path.parent().unwrap_or(path);
        root = Some(match root {
            None => dir.to_path_buf(),
            Some(current) => {
                let mut shared = PathBuf::new();
                for (a, b) in current.components().zip(dir.components()) {
                    if a != b {
                        break;
                    }
                    shared.push(a);
                }
                shared
            }
        });
    }
    root
}

/// Indices of included modules paired with their output paths.
pub fn plan_outputs(
    modules: &[(ModuleIdx, &Path)],
    out_dir: &Path,
    extension: &str,
) -> Vec<(ModuleIdx, PathBuf)> {
    let root = common_root(modules.iter().map(|(_, p)| *p)).unwrap_or_default();
    modules
        .iter()
        .map(|(m, path)| (*m, output_path(path, &root, out_dir, extension)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_root() {
        let paths = [
            Path::new("/p/lib/index.js"),
            Path::new("/p/lib/__tests/basic.js"),
            Path::new("/p/lib/utils/names.js"),
        ];
        assert_eq!(common_root(paths), Some(PathBuf::from("/p/lib")));
        assert_eq!(common_root([Path::new("/p/lib/a.js")]), Some(PathBuf::from("/p/lib")));
        assert_eq!(common_root(std::iter::empty::<&Path>()), None);
    }

    #[test]
    fn test_output_path_mirrors_layout() {
        assert_eq!(
            output_path(
                Path::new("/p/lib/__tests/basic.js"),
                Path::new("/p/lib"),
                Path::new("/p/cjs"),
                "cjs"
            ),
            PathBuf::from("/p/cjs/__tests/basic.cjs")
        );
        assert_eq!(
            output_path(Path::new("/p/lib/a.mjs"), Path::new("/p/lib"), Path::new("out"), "js"),
            PathBuf::from("out/a.js")
        );
    }

    #[test]
    fn test_plan_outputs() {
        let modules = [(0, Path::new("/p/lib/index.js")), (2, Path::new("/p/lib/x/y.js"))];
        assert_eq!(
            plan_outputs(&modules, Path::new("/o"), "cjs"),
            vec![
                (0, PathBuf::from("/o/index.cjs")),
                (2, PathBuf::from("/o/x/y.cjs"))
            ]
        );
    }

    #[tokio::test]
    async fn test_commit_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = OutputWriter::new();
        writer.push(OutputDescriptor {
            path: dir.path().join("out/nested/a.cjs"),
            contents: "'use strict';\n".to_string(),
            export_mode: ExportMode::None,
            module: PathBuf::from("/p/lib/nested/a.js"),
        });
        assert_eq!(writer.len(), 1);

        let written = writer.commit().await.unwrap();
        assert_eq!(written, vec![dir.path().join("out/nested/a.cjs")]);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("out/nested/a.cjs")).unwrap(),
            "'use strict';\n"
        );
    }

    #[tokio::test]
    async fn test_write_failure_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "").unwrap();

        let mut writer = OutputWriter::new();
        writer.push(OutputDescriptor {
            path: blocker.join("a.cjs"),
            contents: String::new(),
            export_mode: ExportMode::Named,
            module: PathBuf::from("/p/a.js"),
        });
        match writer.commit().await {
            Err(ConvertError::Write { path, .. }) => assert_eq!(path, blocker.join("a.cjs")),
            other => panic!("expected write error, got {other:?}"),
        }
    }
}
