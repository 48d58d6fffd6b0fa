// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module graph construction.
//!
//! Modules are discovered breadth-first from the entries. A module is
//! registered in the id table before its imports are followed, so import
//! cycles terminate: the second visit finds the module already loaded.

use crate::error::{ConvertError, Result};
use crate::external::{Classification, ExternalClassifier};
use crate::resolver::{canonical, ModuleResolver};
use crate::syntax::{self, ExportEntry, ModuleSyntax};
use crate::transform::TransformPipeline;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// Index of a module in the graph
pub type ModuleIdx = usize;

/// Where a module request leads.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Resolution {
    /// Another module of the graph
    Internal(ModuleIdx),
    /// Left to the runtime
    External(String),
}

/// A loaded module.
#[derive(Debug, Clone)]
pub struct Module {
    /// Absolute path
    pub id: PathBuf,
    /// Source after the transform passes
    pub source: String,
    /// Analysed syntax
    pub syntax: ModuleSyntax,
    /// Resolution of every static import record
    pub records: Vec<Resolution>,
    /// Resolution of every dynamic import with a literal specifier
    pub dynamic: Vec<Option<Resolution>>,
    /// Is this module an entry?
    pub is_entry: bool,
}

/// Where an exported name comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportOrigin {
    /// Entry of the module's own export table
    Explicit(usize),
    /// Provided through `export * from` (record index)
    Star(usize),
}

/// All modules reachable from a set of entries.
#[derive(Debug, Default)]
pub struct ModuleGraph {
    /// Modules in discovery order
    pub modules: Vec<Module>,
    /// Entry modules, in entry order
    pub entries: Vec<ModuleIdx>,
    index: FxHashMap<PathBuf, ModuleIdx>,
}

impl ModuleGraph {
    /// Index of the module with this id
    pub fn get(&self, id: &Path) -> Option<ModuleIdx> {
        self.index.get(id).copied()
    }

    /// Number of modules
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Empty graph?
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Explicit export entry by name
    pub fn explicit_export(&self, m: ModuleIdx, name: &str) -> Option<&ExportEntry> {
        self.modules[m].syntax.exports.iter().find(|e| e.exported == name)
    }

    /// Every name module `m` exports, with its origin.
    ///
    /// Explicit exports come first in source order, followed by names
    /// provided by internal `export *` targets; the first provider of a name
    /// wins and `default` is never star-exported. Names behind external star
    /// exports cannot be known statically and are not listed.
    pub fn export_names(&self, m: ModuleIdx) -> Vec<(String, ExportOrigin)> {
        let mut seen = FxHashSet::default();
        let mut names = Vec::new();
        for (i, entry) in self.modules[m].syntax.exports.iter().enumerate() {
            if seen.insert(entry.exported.clone()) {
                names.push((entry.exported.clone(), ExportOrigin::Explicit(i)));
            }
        }

        let mut visiting = FxHashSet::default();
        visiting.insert(m);
        for &record in &self.modules[m].syntax.star_exports {
            if let Resolution::Internal(target) = self.modules[m].records[record] {
                let mut provided = Vec::new();
                self.star_names(target, &mut visiting, &mut provided);
                for name in provided {
                    if seen.insert(name.clone()) {
                        names.push((name, ExportOrigin::Star(record)));
                    }
                }
            }
        }
        names
    }

    fn star_names(&self, m: ModuleIdx, visiting: &mut FxHashSet<ModuleIdx>, out: &mut Vec<String>) {
        if !visiting.insert(m) {
            return;
        }
        let module = &self.modules[m];
        out.extend(
            module
                .syntax
                .exports
                .iter()
                .filter(|e| e.exported != "default")
                .map(|e| e.exported.clone()),
        );
        for &record in &module.syntax.star_exports {
            if let Resolution::Internal(target) = module.records[record] {
                self.star_names(target, visiting, out);
            }
        }
    }

    /// Does module `m` (transitively) re-export an external namespace?
    pub fn has_external_star(&self, m: ModuleIdx) -> bool {
        self.modules[m]
            .syntax
            .star_exports
            .iter()
            .any(|&r| matches!(self.modules[m].records[r], Resolution::External(_)))
    }
}

/// Builds a [`ModuleGraph`] from entry files.
pub struct GraphBuilder<'a> {
    classifier: &'a mut ExternalClassifier,
    pipeline: &'a TransformPipeline,
    resolver: ModuleResolver,
    graph: ModuleGraph,
}

impl<'a> GraphBuilder<'a> {
    /// New builder
    pub fn new(classifier: &'a mut ExternalClassifier, pipeline: &'a TransformPipeline) -> Self {
        Self {
            classifier,
            pipeline,
            resolver: ModuleResolver::new(),
            graph: ModuleGraph::default(),
        }
    }

    /// Load the entries and everything they import.
    pub fn build(mut self, entries: &[PathBuf]) -> Result<ModuleGraph> {
        let mut queue = VecDeque::new();
        for entry in entries {
            let (idx, fresh) = self.load(entry)?;
            self.graph.modules[idx].is_entry = true;
            if !self.graph.entries.contains(&idx) {
                self.graph.entries.push(idx);
            }
            if fresh {
                queue.push_back(idx);
            }
        }

        while let Some(idx) = queue.pop_front() {
            let importer = self.graph.modules[idx].id.clone();
            let specifiers: Vec<String> = self.graph.modules[idx]
                .syntax
                .imports
                .iter()
                .map(|r| r.specifier.clone())
                .collect();
            let dynamic: Vec<Option<String>> = self.graph.modules[idx]
                .syntax
                .dynamic_imports
                .iter()
                .map(|d| d.specifier.clone())
                .collect();

            let mut records = Vec::with_capacity(specifiers.len());
            for specifier in &specifiers {
                records.push(self.resolve(specifier, &importer, &mut queue)?);
            }
            let mut dynamic_records = Vec::with_capacity(dynamic.len());
            for specifier in &dynamic {
                dynamic_records.push(match specifier {
                    Some(specifier) => Some(self.resolve(specifier, &importer, &mut queue)?),
                    None => None,
                });
            }

            let module = &mut self.graph.modules[idx];
            module.records = records;
            module.dynamic = dynamic_records;
        }

        tracing::debug!(modules = self.graph.len(), "Module graph built");
        Ok(self.graph)
    }

    fn resolve(
        &mut self,
        specifier: &str,
        importer: &Path,
        queue: &mut VecDeque<ModuleIdx>,
    ) -> Result<Resolution> {
        if self.classifier.classify(specifier) == Classification::External {
            return Ok(Resolution::External(specifier.to_string()));
        }
        let path = self
            .resolver
            .resolve(specifier, importer)
            .ok_or_else(|| ConvertError::unresolved(importer, specifier))?;
        let (idx, fresh) = self.load(&path)?;
        if fresh {
            queue.push_back(idx);
        }
        Ok(Resolution::Internal(idx))
    }

    /// Load a module once; returns its index and whether it was new.
    fn load(&mut self, path: &Path) -> Result<(ModuleIdx, bool)> {
        let id = canonical(path);
        if let Some(idx) = self.graph.get(&id) {
            return Ok((idx, false));
        }
        if !id.is_file() {
            return Err(ConvertError::PathNotFound(id));
        }

        let raw = std::fs::read_to_string(&id)?;
        let source = self.pipeline.apply(raw, &id);
        let syntax = syntax::analyse(&source)
            .map_err(|e| ConvertError::parse(&id, &source, e.offset, e.message))?;
        tracing::trace!(module = %id.display(), imports = syntax.imports.len(), "Loaded module");

        let idx = self.graph.modules.len();
        self.graph.index.insert(id.clone(), idx);
        self.graph.modules.push(Module {
            id,
            source,
            syntax,
            records: Vec::new(),
            dynamic: Vec::new(),
            is_entry: false,
        });
        Ok((idx, true))
    }
}
