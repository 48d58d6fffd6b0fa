// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Tree-shaking.
//!
//! Inclusion is computed as a fixed point over a worklist. Entries export
//! everything; every other module is included only once something it
//! exports is needed (or, above the `smallest` level, once it is imported at
//! all). Statements with side effects are kept whenever their module is.

use crate::config::TreeShake;
use crate::error::{ConvertError, Result};
use crate::graph::{ExportOrigin, ModuleGraph, ModuleIdx, Resolution};
use crate::syntax::{Binding, ExportTarget, Imported, RecordKind};
use std::collections::VecDeque;

/// What survives of one module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleInclusion {
    /// Module produces an output file
    pub included: bool,
    /// Kept statements
    pub statements: Vec<bool>,
    /// Kept import records
    pub records: Vec<bool>,
    /// Exported names that are used, in export order
    pub used_exports: Vec<String>,
    /// The namespace object is needed as a whole
    pub namespace_used: bool,
}

impl ModuleInclusion {
    /// Is `name` a used export?
    pub fn uses(&self, name: &str) -> bool {
        self.used_exports.iter().any(|n| n == name)
    }
}

/// Result of tree-shaking a graph.
#[derive(Debug, Clone, Default)]
pub struct ShakeResult {
    /// Per module, indexed like the graph
    pub modules: Vec<ModuleInclusion>,
}

impl ShakeResult {
    /// Included module indices in graph order
    pub fn included(&self) -> impl Iterator<Item = ModuleIdx> + '_ {
        self.modules
            .iter()
            .enumerate()
            .filter(|(_, m)| m.included)
            .map(|(i, _)| i)
    }
}

#[derive(Debug)]
enum Task {
    Module(ModuleIdx),
    Export(ModuleIdx, String),
    Namespace(ModuleIdx),
    Local(ModuleIdx, String),
    Statement(ModuleIdx, usize),
}

/// Computes inclusion for every module of `graph`.
pub fn shake(graph: &ModuleGraph, level: TreeShake) -> Result<ShakeResult> {
    let mut shaker = Shaker {
        graph,
        level,
        result: ShakeResult {
            modules: graph
                .modules
                .iter()
                .map(|m| ModuleInclusion {
                    included: false,
                    statements: vec![false; m.syntax.statements.len()],
                    records: vec![false; m.records.len()],
                    used_exports: Vec::new(),
                    namespace_used: false,
                })
                .collect(),
        },
        queue: VecDeque::new(),
    };

    for &entry in &graph.entries {
        shaker.queue.push_back(Task::Namespace(entry));
    }
    shaker.run()?;
    shaker.order_exports();

    let kept = shaker.result.included().count();
    tracing::debug!(kept, total = graph.len(), %level, "Tree-shaking done");
    Ok(shaker.result)
}

struct Shaker<'a> {
    graph: &'a ModuleGraph,
    level: TreeShake,
    result: ShakeResult,
    queue: VecDeque<Task>,
}

impl Shaker<'_> {
    fn run(&mut self) -> Result<()> {
        while let Some(task) = self.queue.pop_front() {
            match task {
                Task::Module(m) => self.include_module(m),
                Task::Export(m, name) => self.use_export(m, name)?,
                Task::Namespace(m) => self.use_namespace(m),
                Task::Local(m, name) => self.use_local(m, &name),
                Task::Statement(m, s) => self.include_statement(m, s),
            }
        }
        Ok(())
    }

    fn include_module(&mut self, m: ModuleIdx) {
        let graph = self.graph;
        if self.result.modules[m].included {
            return;
        }
        self.result.modules[m].included = true;
        let module = &graph.modules[m];

        for (s, statement) in module.syntax.statements.iter().enumerate() {
            let keep = match self.level {
                TreeShake::None => !statement.is_module_syntax(),
                _ => !statement.is_module_syntax() && !statement.pure,
            };
            if keep {
                self.queue.push_back(Task::Statement(m, s));
            }
        }

        // Under `smallest` module side effects count for nothing: a record is
        // kept only once one of its bindings is used.
        if self.level != TreeShake::Smallest {
            for (r, record) in module.syntax.imports.iter().enumerate() {
                if record.kind == RecordKind::Import {
                    self.keep_record(m, r);
                }
            }
        }

        if self.level == TreeShake::None {
            self.queue.push_back(Task::Namespace(m));
        }
    }

    /// Keeps a record; an internal target becomes part of the output.
    fn keep_record(&mut self, m: ModuleIdx, r: usize) {
        let graph = self.graph;
        self.result.modules[m].records[r] = true;
        if let Resolution::Internal(target) = graph.modules[m].records[r] {
            self.queue.push_back(Task::Module(target));
        }
    }

    fn mark_export(&mut self, m: ModuleIdx, name: &str) -> bool {
        let inclusion = &mut self.result.modules[m];
        if inclusion.uses(name) {
            return false;
        }
        inclusion.used_exports.push(name.to_string());
        true
    }

    fn use_export(&mut self, m: ModuleIdx, name: String) -> Result<()> {
        let graph = self.graph;
        if !self.mark_export(m, &name) {
            return Ok(());
        }
        self.queue.push_back(Task::Module(m));

        let origin = self
            .graph
            .export_names(m)
            .into_iter()
            .find(|(n, _)| *n == name)
            .map(|(_, origin)| origin);

        match origin {
            Some(ExportOrigin::Explicit(i)) => {
                let entry = &graph.modules[m].syntax.exports[i];
                match &entry.target {
                    ExportTarget::Local(local) => {
                        self.queue.push_back(Task::Local(m, local.clone()));
                    }
                    ExportTarget::ReExport { record, imported } => {
                        self.use_import(m, *record, imported);
                    }
                }
            }
            Some(ExportOrigin::Star(record)) => {
                self.use_import(m, record, &Imported::Named(name));
            }
            None if graph.has_external_star(m) && name != "default" => {
                self.keep_external_stars(m);
            }
            None => {
                let module = &graph.modules[m];
                return Err(ConvertError::MissingExport {
                    module: module.id.clone(),
                    name,
                });
            }
        }
        Ok(())
    }

    fn keep_external_stars(&mut self, m: ModuleIdx) {
        let graph = self.graph;
        let stars = graph.modules[m].syntax.star_exports.clone();
        for r in stars {
            if matches!(graph.modules[m].records[r], Resolution::External(_)) {
                self.keep_record(m, r);
            }
        }
    }

    fn use_namespace(&mut self, m: ModuleIdx) {
        let graph = self.graph;
        if self.result.modules[m].namespace_used {
            return;
        }
        self.result.modules[m].namespace_used = true;
        self.queue.push_back(Task::Module(m));
        for (name, _) in graph.export_names(m) {
            self.queue.push_back(Task::Export(m, name));
        }
        self.keep_external_stars(m);
    }

    /// Something in module `m` needs `imported` from record `r`.
    fn use_import(&mut self, m: ModuleIdx, r: usize, imported: &Imported) {
        let graph = self.graph;
        self.keep_record(m, r);
        if let Resolution::Internal(target) = graph.modules[m].records[r] {
            self.queue.push_back(match imported {
                Imported::Named(name) => Task::Export(target, name.clone()),
                Imported::Namespace => Task::Namespace(target),
            });
        }
    }

    fn use_local(&mut self, m: ModuleIdx, name: &str) {
        let graph = self.graph;
        match graph.modules[m].syntax.bindings.get(name) {
            Some(Binding::Declared(statements)) => {
                for &s in statements {
                    self.queue.push_back(Task::Statement(m, s));
                }
            }
            Some(Binding::Imported { record, imported }) => {
                self.use_import(m, *record, imported);
            }
            None => {}
        }
    }

    fn include_statement(&mut self, m: ModuleIdx, s: usize) {
        let graph = self.graph;
        if self.result.modules[m].statements[s] {
            return;
        }
        self.result.modules[m].statements[s] = true;
        self.queue.push_back(Task::Module(m));

        let module = &graph.modules[m];
        let statement = &module.syntax.statements[s];
        for &t in &statement.references {
            let name = module.syntax.token_text(&module.source, t).to_string();
            self.queue.push_back(Task::Local(m, name));
        }
        for (d, dynamic) in module.syntax.dynamic_imports.iter().enumerate() {
            if dynamic.statement != s {
                continue;
            }
            if let Some(Resolution::Internal(target)) = module.dynamic[d] {
                self.queue.push_back(Task::Namespace(target));
            }
        }
    }

    /// Sorts used exports into the module's export order.
    fn order_exports(&mut self) {
        for (m, inclusion) in self.result.modules.iter_mut().enumerate() {
            if inclusion.used_exports.len() < 2 {
                continue;
            }
            let order: Vec<String> = self
                .graph
                .export_names(m)
                .into_iter()
                .map(|(name, _)| name)
                .collect();
            inclusion
                .used_exports
                .sort_by_key(|name| order.iter().position(|n| n == name).unwrap_or(usize::MAX));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::ExternalClassifier;
    use crate::graph::GraphBuilder;
    use crate::transform::TransformPipeline;
    use std::fs;
    use std::path::{Path, PathBuf};

    fn graph(root: &Path, files: &[(&str, &str)], entries: &[&str]) -> ModuleGraph {
        for (path, content) in files {
            let path = root.join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        let mut classifier = ExternalClassifier::new(
            &[crate::config::ExternalPattern::Exact("fs".into())],
            None,
        )
        .unwrap();
        let pipeline = TransformPipeline::new();
        let entries: Vec<PathBuf> = entries.iter().map(|e| root.join(e)).collect();
        GraphBuilder::new(&mut classifier, &pipeline).build(&entries).unwrap()
    }

    #[test]
    fn test_unused_export_chain_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let g = graph(
            dir.path(),
            &[
                ("index.js", "import { used } from './util.js';\nexport const run = () => used();"),
                ("util.js", "import { helper } from './helper.js';\nexport const used = () => 1;\nexport const unused = () => helper();"),
                ("helper.js", "export const helper = () => 2;"),
            ],
            &["index.js"],
        );
        let result = shake(&g, TreeShake::Smallest).unwrap();
        let included: Vec<ModuleIdx> = result.included().collect();
        assert_eq!(included, vec![0, 1]);
        assert_eq!(result.modules[1].used_exports, ["used"]);
        assert_eq!(result.modules[1].statements, [false, true, false]);
        assert_eq!(result.modules[1].records, [false]);

        let result = shake(&g, TreeShake::Safest).unwrap();
        assert_eq!(result.included().count(), 3);
    }

    #[test]
    fn test_module_side_effects_by_level() {
        let dir = tempfile::tempdir().unwrap();
        let g = graph(
            dir.path(),
            &[
                ("index.js", "import './setup.js';\nimport { a } from './a.js';\nconsole.log(a);"),
                ("setup.js", "globalThis.ready = true;"),
                ("a.js", "export const a = 1;\nregister();\nconst pure = 2;"),
            ],
            &["index.js"],
        );
        let result = shake(&g, TreeShake::Smallest).unwrap();
        let included: Vec<ModuleIdx> = result.included().collect();
        assert_eq!(included, vec![0, 2]);
        assert_eq!(result.modules[0].records, [false, true]);
        assert_eq!(result.modules[2].statements, [true, true, false]);

        let result = shake(&g, TreeShake::Safest).unwrap();
        assert_eq!(result.included().count(), 3);
        assert_eq!(result.modules[0].records, [true, true]);
        assert_eq!(result.modules[1].statements, [true]);
    }

    #[test]
    fn test_entry_exports_everything_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let g = graph(
            dir.path(),
            &[
                ("index.js", "export * from './names.js';\nexport default 1;\nexport const z = 2;"),
                ("names.js", "export const b = 1, a = 2;"),
            ],
            &["index.js"],
        );
        let result = shake(&g, TreeShake::Smallest).unwrap();
        assert!(result.modules[0].namespace_used);
        assert_eq!(result.modules[0].used_exports, ["default", "z", "b", "a"]);
        assert_eq!(result.modules[1].used_exports, ["b", "a"]);
        assert!(!result.modules[1].namespace_used);
    }

    #[test]
    fn test_cycle_and_dynamic_import() {
        let dir = tempfile::tempdir().unwrap();
        let g = graph(
            dir.path(),
            &[
                ("a.js", "import { b } from './b.js';\nexport const a = () => b();\nexport const load = () => import('./lazy.js');"),
                ("b.js", "import { a } from './a.js';\nexport const b = () => a;"),
                ("lazy.js", "export const lazy = 1;"),
            ],
            &["a.js"],
        );
        let result = shake(&g, TreeShake::Smallest).unwrap();
        assert_eq!(result.included().count(), 3);
        assert!(result.modules[2].namespace_used);
        assert_eq!(result.modules[1].used_exports, ["b"]);
    }

    #[test]
    fn test_missing_export_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let g = graph(
            dir.path(),
            &[
                ("index.js", "import { nope } from './a.js';\nexport default nope;"),
                ("a.js", "export const a = 1;"),
            ],
            &["index.js"],
        );
        let err = shake(&g, TreeShake::Smallest).unwrap_err();
        assert!(matches!(err, ConvertError::MissingExport { ref name, .. } if name == "nope"));
    }

    #[test]
    fn test_none_keeps_everything() {
        let dir = tempfile::tempdir().unwrap();
        let g = graph(
            dir.path(),
            &[
                ("index.js", "import { a } from './a.js';\nconst unused = 1;"),
                ("a.js", "export const a = 1;\nexport const b = 2;"),
            ],
            &["index.js"],
        );
        let result = shake(&g, TreeShake::None).unwrap();
        assert_eq!(result.modules[0].statements, [false, true]);
        assert_eq!(result.modules[1].used_exports, ["a", "b"]);
    }
}
