//! Removal of the `createRequire` shim.
//!
//! ESM sources that need `require` declare it with
//!
//! ```js
//! import { createRequire } from 'module';
//! const require = createRequire(import.meta.url);
//! ```
//!
//! In CommonJS `require` already exists, and redeclaring it is an error.

use super::TransformPass;
use crate::error::Result;
use regex::Regex;
use std::path::Path;

/// Deletes the shim import and declaration lines independently.
#[derive(Debug, Clone)]
pub struct CreateRequireRemoval {
    import: Regex,
    declaration: Regex,
}

impl CreateRequireRemoval {
    /// Compile the shim patterns
    pub fn new() -> Result<Self> {
        Ok(Self {
            import: Regex::new(r#"import \{ createRequire \} from ['"](?:node:)?module['"];\n?"#)?,
            declaration: Regex::new(r"const require = createRequire\(.+?\);\n?")?,
        })
    }
}

impl TransformPass for CreateRequireRemoval {
    fn name(&self) -> &'static str {
        "create-require-removal"
    }

    fn transform(&self, code: &str, _id: &Path) -> Option<String> {
        if !code.contains("createRequire") {
            return None;
        }
        let without_import = self.import.replace_all(code, "");
        let without_shim = self.declaration.replace_all(&without_import, "");
        (without_shim != code).then(|| without_shim.into_owned())
    }
}
