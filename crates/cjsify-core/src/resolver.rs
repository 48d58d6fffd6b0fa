// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! File resolution for internal imports and the package self-reference check

use crate::error::{ConvertError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Resolves relative and absolute specifiers to source files
#[derive(Debug, Clone)]
pub struct ModuleResolver {
    /// File extensions to try
    extensions: Vec<String>,
}

impl ModuleResolver {
    /// Create a new module resolver
    pub fn new() -> Self {
        Self {
            extensions: vec![".js".to_string(), ".mjs".to_string()],
        }
    }

    /// Is this specifier a file path rather than a package name?
    pub fn is_path_specifier(specifier: &str) -> bool {
        specifier.starts_with("./")
            || specifier.starts_with("../")
            || specifier == "."
            || specifier == ".."
            || specifier.starts_with('/')
            || (cfg!(windows) && specifier.chars().nth(1) == Some(':'))
    }

    /// Resolve `specifier` as imported by the module at `importer`
    pub fn resolve(&self, specifier: &str, importer: &Path) -> Option<PathBuf> {
        if !Self::is_path_specifier(specifier) {
            return None;
        }
        let parent_dir = importer.parent().unwrap_or(Path::new("."));
        let path = parent_dir.join(specifier);

        if path.is_file() {
            return Some(canonical(&path));
        }

        if let Some(name) = path.file_name() {
            for ext in &self.extensions {
                let mut file_name = name.to_os_string();
                file_name.push(ext);
                let with_ext = path.with_file_name(file_name);
                if with_ext.is_file() {
                    return Some(canonical(&with_ext));
                }
            }
        }

        if path.is_dir() {
            return self.resolve_directory(&path);
        }

        None
    }

    /// Index file of a directory
    fn resolve_directory(&self, dir: &Path) -> Option<PathBuf> {
        self.extensions
            .iter()
            .map(|ext| dir.join(format!("index{ext}")))
            .find(|index| index.is_file())
            .map(|index| canonical(&index))
    }
}

impl Default for ModuleResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Absolute, symlink-free form of an existing path
pub fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Split a package specifier into name and optional subpath
pub fn parse_package_specifier(specifier: &str) -> (&str, Option<&str>) {
    if let Some(scoped) = specifier.strip_prefix('@') {
        // Scoped package: @scope/name or @scope/name/subpath
        if let Some(slash_pos) = scoped.find('/') {
            let after_scope = &scoped[slash_pos + 1..];
            if let Some(subpath_pos) = after_scope.find('/') {
                let name_end = slash_pos + 2 + subpath_pos;
                return (&specifier[..name_end], Some(&specifier[name_end + 1..]));
            }
        }
        (specifier, None)
    } else if let Some(slash_pos) = specifier.find('/') {
        (&specifier[..slash_pos], Some(&specifier[slash_pos + 1..]))
    } else {
        (specifier, None)
    }
}

/// The parts of package.json the converter reads
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageJson {
    /// Package name
    pub name: Option<String>,
    /// Conditional exports map
    #[serde(default)]
    pub exports: Option<serde_json::Value>,
}

impl PackageJson {
    /// Read and parse a package.json file
    pub fn read(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(ConvertError::PathNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Does the `exports` map expose `subpath` (for example `./package.json`)?
    pub fn exports_subpath(&self, subpath: &str) -> bool {
        let Some(serde_json::Value::Object(map)) = &self.exports else {
            return false;
        };
        map.iter().any(|(key, target)| {
            if target.is_null() {
                return false;
            }
            if key == subpath {
                return true;
            }
            match key.split_once('*') {
                Some((prefix, suffix)) => {
                    subpath.len() >= prefix.len() + suffix.len()
                        && subpath.starts_with(prefix)
                        && subpath.ends_with(suffix)
                }
                None => false,
            }
        })
    }
}

/// Decides whether the package can import itself by name
pub trait SelfResolver {
    /// Resolve `<name>/package.json` the way Node would from the package root
    fn resolve_self(&self, name: &str) -> Result<PathBuf>;
}

/// Self resolution against the real file system
#[derive(Debug, Clone)]
pub struct NodeSelfResolver {
    root: PathBuf,
}

impl NodeSelfResolver {
    /// Resolver for the package rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl SelfResolver for NodeSelfResolver {
    fn resolve_self(&self, name: &str) -> Result<PathBuf> {
        let specifier = format!("{name}/package.json");

        // Self-reference through the package's own "exports"
        let own = self.root.join("package.json");
        if own.is_file() {
            let pkg = PackageJson::read(&own)?;
            if pkg.name.as_deref() == Some(name) && pkg.exports_subpath("./package.json") {
                return Ok(own);
            }
        }

        // Walk up directory tree looking for node_modules
        let mut current = Some(self.root.as_path());
        while let Some(dir) = current {
            let candidate = dir.join("node_modules").join(name).join("package.json");
            if candidate.is_file() {
                let pkg = PackageJson::read(&candidate)?;
                if pkg.exports.is_none() || pkg.exports_subpath("./package.json") {
                    return Ok(candidate);
                }
            }
            current = dir.parent();
        }

        Err(ConvertError::unresolved(&own, specifier))
    }
}
