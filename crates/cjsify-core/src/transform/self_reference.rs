//! Self-reference patch for test modules.
//!
//! Tests import the package by its published name. When the package cannot
//! resolve itself (no `exports["./package.json"]` and no `node_modules`
//! link), the converted tests would fail to load, so the bare name is
//! replaced by a relative path to the root entry.

use super::TransformPass;
use crate::config::SelfReferenceMode;
use crate::resolver::SelfResolver;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Whether the patch is active for this run.
///
/// `Auto` consults the resolver once; any resolution error enables the patch.
pub fn decide_self_reference(
    mode: SelfReferenceMode,
    package_name: Option<&str>,
    resolver: &dyn SelfResolver,
) -> bool {
    let Some(name) = package_name else {
        return false;
    };
    match mode {
        SelfReferenceMode::Always => true,
        SelfReferenceMode::Never => false,
        SelfReferenceMode::Auto => match resolver.resolve_self(name) {
            Ok(path) => {
                tracing::debug!(package = name, path = %path.display(), "Package resolves itself");
                false
            }
            Err(err) => {
                tracing::debug!(package = name, error = %err, "Package cannot resolve itself");
                true
            }
        },
    }
}

/// Rewrites `from '<package>'` in test modules to a relative path.
#[derive(Debug, Clone)]
pub struct SelfReferencePatch {
    import: Regex,
    tests: Regex,
    target: PathBuf,
}

impl SelfReferencePatch {
    /// Patch imports of `package_name` in modules matching `tests_pattern`
    /// so they point at `target`.
    pub fn new(package_name: &str, tests_pattern: &str, target: impl Into<PathBuf>) -> crate::Result<Self> {
        let name = regex::escape(package_name);
        let import = Regex::new(&format!(r#"\bfrom(\s*)(?:'{name}'|"{name}")"#))?;
        Ok(Self {
            import,
            tests: Regex::new(tests_pattern)?,
            target: target.into(),
        })
    }

    /// Is `id` a test module?
    pub fn is_test_module(&self, id: &Path) -> bool {
        let id = id.to_string_lossy().replace('\\', "/");
        self.tests.is_match(&id)
    }

    fn relative_target(&self, id: &Path) -> Option<String> {
        let from = id.parent()?;
        let relative = pathdiff::diff_paths(&self.target, from)?;
        let relative = relative.to_string_lossy().replace('\\', "/");
        Some(if relative.starts_with("../") || relative.starts_with("./") {
            relative
        } else {
            format!("./{relative}")
        })
    }
}

impl TransformPass for SelfReferencePatch {
    fn name(&self) -> &'static str {
        "self-reference-patch"
    }

    fn transform(&self, code: &str, id: &Path) -> Option<String> {
        if !self.is_test_module(id) || !self.import.is_match(code) {
            return None;
        }
        let relative = self.relative_target(id)?;
        let patched = self
            .import
            .replace_all(code, |caps: &regex::Captures<'_>| format!("from{}'{relative}'", &caps[1]));
        Some(patched.into_owned())
    }
}
