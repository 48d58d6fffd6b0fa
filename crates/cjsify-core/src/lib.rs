// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # cjsify-core
//!
//! Converts ES modules to CommonJS while keeping module boundaries: every
//! reachable input module becomes exactly one output module, and
//! cross-module references become `require` calls between the outputs.
//!
//! - Entry sets from a root file plus (directory, pattern) pairs
//! - External specifiers left as runtime `require` calls
//! - Statement-level tree-shaking (`smallest`, `safest`, `none`)
//! - Per-module export mode: `module.exports = value` for default-only
//!   modules, `exports.name` otherwise
//! - Source passes run before analysis (`createRequire` shim removal and the
//!   test self-reference patch)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cjsify_core::{Config, Converter, RunOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::discover(std::path::Path::new("."))?;
//!     Converter::new(config, RunOptions::default())?.run().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codegen;
pub mod config;
pub mod convert;
pub mod entries;
pub mod error;
pub mod external;
pub mod graph;
pub mod lexer;
pub mod resolver;
pub mod shake;
pub mod syntax;
pub mod transform;
pub mod writer;

pub use codegen::{render_graph, ExportMode, RenderedModule};
pub use config::{
    Config, EntryDir, ExternalPattern, GroupConfig, SelfReferenceMode, TreeShake, CONFIG_FILE,
};
pub use convert::{Converter, GroupReport, RunOptions};
pub use entries::resolve_entries;
pub use error::{ConvertError, Result};
pub use external::{Classification, ExternalClassifier};
pub use graph::{GraphBuilder, ModuleGraph};
pub use shake::{shake, ShakeResult};
pub use writer::{OutputDescriptor, OutputWriter};

/// Version of the converter
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
