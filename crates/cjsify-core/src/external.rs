// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! External dependency classification.
//!
//! An external specifier stays a `require(...)` of the same string in the
//! output; everything else has to be part of the module graph.

use crate::config::ExternalPattern;
use crate::error::Result;
use crate::resolver::parse_package_specifier;
use regex::Regex;
use rustc_hash::FxHashMap;

/// Where a specifier's module comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Left to the runtime
    External,
    /// Bundled into the output graph
    Internal,
}

#[derive(Debug)]
enum Matcher {
    Exact(String),
    Prefix(String),
    Regex(Regex),
}

impl Matcher {
    fn matches(&self, specifier: &str) -> bool {
        match self {
            Self::Exact(name) => name == specifier,
            Self::Prefix(prefix) => specifier.starts_with(prefix.as_str()),
            Self::Regex(regex) => regex.is_match(specifier),
        }
    }
}

/// Classifies module specifiers, remembering every answer.
#[derive(Debug)]
pub struct ExternalClassifier {
    matchers: Vec<Matcher>,
    package_name: Option<String>,
    cache: FxHashMap<String, Classification>,
}

impl ExternalClassifier {
    /// Compile the configured rules. Imports of `package_name` (and its
    /// subpaths) are always external.
    pub fn new(patterns: &[ExternalPattern], package_name: Option<&str>) -> Result<Self> {
        let matchers = patterns
            .iter()
            .map(|pattern| {
                Ok(match pattern {
                    ExternalPattern::Exact(name) => Matcher::Exact(name.clone()),
                    ExternalPattern::Prefix { prefix } => Matcher::Prefix(prefix.clone()),
                    ExternalPattern::Regex { regex } => Matcher::Regex(Regex::new(regex)?),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            matchers,
            package_name: package_name.map(str::to_string),
            cache: FxHashMap::default(),
        })
    }

    /// Classify one specifier.
    pub fn classify(&mut self, specifier: &str) -> Classification {
        if let Some(&known) = self.cache.get(specifier) {
            return known;
        }
        let result = self.evaluate(specifier);
        tracing::trace!(specifier, ?result, "Classified specifier");
        self.cache.insert(specifier.to_string(), result);
        result
    }

    /// Convenience wrapper over [`classify`](Self::classify).
    pub fn is_external(&mut self, specifier: &str) -> bool {
        self.classify(specifier) == Classification::External
    }

    fn evaluate(&self, specifier: &str) -> Classification {
        if specifier.starts_with("node:") || self.matchers.iter().any(|m| m.matches(specifier)) {
            return Classification::External;
        }
        if let Some(own) = &self.package_name {
            let (name, _) = parse_package_specifier(specifier);
            if name == own {
                return Classification::External;
            }
        }
        Classification::Internal
    }
}
