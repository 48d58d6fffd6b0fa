// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the converter

use std::path::PathBuf;
use thiserror::Error;

/// Result type for conversion operations
pub type Result<T> = std::result::Result<T, ConvertError>;

/// Errors that abort a conversion run
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Entry file or entry directory does not exist
    #[error("Path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    /// Import that is neither external nor part of the graph
    #[error("Could not resolve '{specifier}' from {}", .importer.display())]
    UnresolvedModule {
        /// Module containing the import
        importer: PathBuf,
        /// The specifier as written
        specifier: String,
    },

    /// Source is not a valid ES module
    #[error("SyntaxError: {message} ({}:{line}:{column})", .module.display())]
    Parse {
        /// Module being parsed
        module: PathBuf,
        /// 1-based line
        line: usize,
        /// 1-based column
        column: usize,
        /// What went wrong
        message: String,
    },

    /// Import of a name the target module does not export
    #[error("'{name}' is not exported by {}", .module.display())]
    MissingExport {
        /// Module that lacks the export
        module: PathBuf,
        /// Requested export name
        name: String,
    },

    /// Output file could not be written
    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        /// Destination path
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// File system error while reading sources
    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML parse error
    #[error("Invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON parse error (package.json)
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid regular expression in a pattern
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl ConvertError {
    /// Create a parse error, computing line and column from a byte offset
    pub fn parse(module: impl Into<PathBuf>, source: &str, offset: usize, message: impl Into<String>) -> Self {
        let (line, column) = line_column(source, offset);
        Self::Parse {
            module: module.into(),
            line,
            column,
            message: message.into(),
        }
    }

    /// Create an unresolved module error
    pub fn unresolved(importer: impl Into<PathBuf>, specifier: impl Into<String>) -> Self {
        Self::UnresolvedModule {
            importer: importer.into(),
            specifier: specifier.into(),
        }
    }
}

/// 1-based line and column of a byte offset
pub fn line_column(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let before = &source[..floor_char_boundary(source, offset)];
    let line = before.matches('\n').count() + 1;
    let column = match before.rfind('\n') {
        Some(nl) => before[nl + 1..].chars().count() + 1,
        None => before.chars().count() + 1,
    };
    (line, column)
}

fn floor_char_boundary(source: &str, mut offset: usize) -> usize {
    while offset > 0 && !source.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_column() {
        let src = "import a from 'a';\nconst x = ;\n";
        assert_eq!(line_column(src, 0), (1, 1));
        assert_eq!(line_column(src, 19), (2, 1));
        assert_eq!(line_column(src, 29), (2, 11));
    }

    #[test]
    fn test_parse_error_message() {
        let err = ConvertError::parse("/p/lib/a.js", "x\n  y", 4, "Unexpected token");
        assert_eq!(err.to_string(), "SyntaxError: Unexpected token (/p/lib/a.js:2:3)");
    }
}
