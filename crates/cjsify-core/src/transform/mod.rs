// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Source transforms applied to every module before analysis.
//!
//! A pass sees the raw text and the module id and either returns rewritten
//! text or `None` to leave the module untouched. Passes run in order; each
//! sees the output of the previous one.

mod create_require;
mod self_reference;

pub use create_require::CreateRequireRemoval;
pub use self_reference::{decide_self_reference, SelfReferencePatch};

use std::path::Path;

/// A text-to-text rewrite of one module.
pub trait TransformPass: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Rewrite `code` of module `id`, or `None` if nothing changes.
    fn transform(&self, code: &str, id: &Path) -> Option<String>;
}

/// Ordered list of passes.
#[derive(Default)]
pub struct TransformPipeline {
    passes: Vec<Box<dyn TransformPass>>,
}

impl TransformPipeline {
    /// Empty pipeline
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pass
    pub fn with(mut self, pass: impl TransformPass + 'static) -> Self {
        self.passes.push(Box::new(pass));
        self
    }

    /// Number of passes
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    /// No passes?
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Run every pass over `code`.
    pub fn apply(&self, code: String, id: &Path) -> String {
        self.passes.iter().fold(code, |code, pass| {
            match pass.transform(&code, id) {
                Some(rewritten) => {
                    tracing::debug!(pass = pass.name(), module = %id.display(), "Transformed");
                    rewritten
                }
                None => code,
            }
        })
    }
}
