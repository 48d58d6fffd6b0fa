// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Conversion settings, read from `cjsify.toml`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{ConvertError, Result};

/// Default config file name
pub const CONFIG_FILE: &str = "cjsify.toml";

/// Output file extension
pub const DEFAULT_EXTENSION: &str = "cjs";

/// Modules whose path matches this are test sources
pub const DEFAULT_TESTS_PATTERN: &str = "/__tests/";

/// File name filter for entry directories
pub const DEFAULT_ENTRY_PATTERN: &str = r"\.js$";

/// Tree-shaking level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeShake {
    /// Keep only what the entries' exports need
    #[default]
    Smallest,
    /// Keep every reachable module and all side-effect imports
    Safest,
    /// Keep everything
    None,
}

impl FromStr for TreeShake {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "smallest" => Ok(Self::Smallest),
            "safest" => Ok(Self::Safest),
            "none" | "false" => Ok(Self::None),
            other => Err(format!("unknown tree-shaking level '{other}'")),
        }
    }
}

impl fmt::Display for TreeShake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Smallest => "smallest",
            Self::Safest => "safest",
            Self::None => "none",
        })
    }
}

/// When to rewrite test imports of the package's own name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelfReferenceMode {
    /// Rewrite only if the package cannot resolve itself
    #[default]
    Auto,
    /// Always rewrite
    Always,
    /// Never rewrite
    Never,
}

impl FromStr for SelfReferenceMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            "always" | "true" => Ok(Self::Always),
            "never" | "false" => Ok(Self::Never),
            other => Err(format!("unknown self-reference mode '{other}'")),
        }
    }
}

/// A rule marking specifiers as external.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExternalPattern {
    /// Exact specifier
    Exact(String),
    /// Specifier prefix
    Prefix {
        /// Leading text
        prefix: String,
    },
    /// Regular expression over the specifier
    Regex {
        /// Pattern source
        regex: String,
    },
}

impl ExternalPattern {
    /// Parses a CLI value: `re:PATTERN`, `prefix:TEXT` or an exact name.
    pub fn parse_flag(value: &str) -> Self {
        if let Some(regex) = value.strip_prefix("re:") {
            Self::Regex { regex: regex.to_string() }
        } else if let Some(prefix) = value.strip_prefix("prefix:") {
            Self::Prefix { prefix: prefix.to_string() }
        } else {
            Self::Exact(value.to_string())
        }
    }
}

/// A directory whose matching files are entry points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryDir {
    /// Directory to list
    pub dir: PathBuf,
    /// Regex over file names
    #[serde(default = "default_entry_pattern")]
    pub pattern: String,
}

impl EntryDir {
    /// Parses `DIR[:PATTERN]`.
    pub fn parse_flag(value: &str) -> Self {
        match value.split_once(':') {
            Some((dir, pattern)) if !pattern.is_empty() => Self {
                dir: PathBuf::from(dir),
                pattern: pattern.to_string(),
            },
            _ => Self {
                dir: PathBuf::from(value.trim_end_matches(':')),
                pattern: default_entry_pattern(),
            },
        }
    }
}

fn default_entry_pattern() -> String {
    DEFAULT_ENTRY_PATTERN.to_string()
}

/// One conversion: a root entry, entry directories and an output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConfig {
    /// Root entry file
    pub entry: PathBuf,
    /// Output directory
    pub output: PathBuf,
    /// Additional entry directories
    #[serde(default)]
    pub dirs: Vec<EntryDir>,
}

/// Conversion settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Package metadata file
    pub package: PathBuf,

    /// Output file extension, without the dot
    pub extension: String,

    /// Tree-shaking level
    pub treeshake: TreeShake,

    /// Self-reference patch mode
    pub self_reference: SelfReferenceMode,

    /// Regex selecting test modules
    pub tests_pattern: String,

    /// Module the package name stands for in patched tests; the first
    /// group's entry when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_entry: Option<PathBuf>,

    /// External specifier rules
    pub external: Vec<ExternalPattern>,

    /// Conversion groups, run in order
    pub groups: Vec<GroupConfig>,

    /// Directory relative paths are resolved against
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            package: PathBuf::from("package.json"),
            extension: DEFAULT_EXTENSION.to_string(),
            treeshake: TreeShake::default(),
            self_reference: SelfReferenceMode::default(),
            tests_pattern: DEFAULT_TESTS_PATTERN.to_string(),
            package_entry: None,
            external: Vec::new(),
            groups: Vec::new(),
            base_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Parses TOML text; relative paths resolve against `base_dir`.
    pub fn from_toml(text: &str, base_dir: impl Into<PathBuf>) -> Result<Self> {
        let mut config: Config = toml::from_str(text)?;
        config.base_dir = base_dir.into();
        Ok(config)
    }

    /// Loads a config file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(ConvertError::PathNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        let base_dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        tracing::debug!(path = %path.display(), "Loading config");
        Self::from_toml(&text, base_dir)
    }

    /// Loads `cjsify.toml` from `dir` if present, defaults otherwise.
    pub fn discover(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        if path.is_file() {
            Self::load(&path)
        } else {
            Ok(Self {
                base_dir: dir.to_path_buf(),
                ..Self::default()
            })
        }
    }

    /// Resolves a configured path against the config directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Resolved self-reference target: `package_entry`, else the first group's entry.
    pub fn package_entry(&self) -> Option<PathBuf> {
        self.package_entry
            .as_ref()
            .or_else(|| self.groups.first().map(|g| &g.entry))
            .map(|entry| self.resolve(entry))
    }

    /// Checks settings that serde cannot.
    pub fn validate(&self) -> Result<()> {
        if self.extension.is_empty() || self.extension.contains(['/', '\\']) {
            return Err(ConvertError::Config(format!(
                "invalid output extension '{}'",
                self.extension
            )));
        }
        if self.groups.is_empty() {
            return Err(ConvertError::Config(
                "no conversion groups configured (use [[groups]] or --entry)".to_string(),
            ));
        }
        regex::Regex::new(&self.tests_pattern)?;
        for group in &self.groups {
            for dir in &group.dirs {
                regex::Regex::new(&dir.pattern)?;
            }
        }
        Ok(())
    }
}
