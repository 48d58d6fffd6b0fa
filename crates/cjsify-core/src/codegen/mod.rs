// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! CommonJS code generation.
//!
//! Each included module is rendered from its own source text: module syntax
//! is removed, references to imports become property reads on `require`
//! results, and the export interface is appended as assignments to
//! `exports` (or a single `module.exports` for default-only modules).
//!
//! The output shape:
//!
//! ```js
//! 'use strict';
//!
//! const fs = require('fs');
//! const util = require('./util.cjs');
//!
//! function read(file) { return util.parse(fs.readFileSync(file, 'utf8')); }
//!
//! exports.read = read;
//! ```

mod edit;
mod names;

pub use edit::{removal_end, EditBuffer};
pub use names::{is_identifier_name, js_string, legal_name, property_access, NameScope};

use crate::graph::{ExportOrigin, ModuleGraph, ModuleIdx, Resolution};
use crate::shake::ShakeResult;
use crate::syntax::{
    Binding, ExportTarget, Imported, RecordKind, StatementKind, DEFAULT_LOCAL,
};
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;
use std::path::{Path, PathBuf};

/// How a module's exports are exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportMode {
    /// Nothing is exported
    #[default]
    None,
    /// `module.exports` is the default export itself
    Default,
    /// Properties of `exports`
    Named,
}

impl fmt::Display for ExportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Default => "default",
            Self::Named => "named",
        })
    }
}

/// Export mode of an included module.
pub fn export_mode(graph: &ModuleGraph, shake: &ShakeResult, m: ModuleIdx) -> ExportMode {
    let inclusion = &shake.modules[m];
    let external_star = graph.modules[m]
        .syntax
        .star_exports
        .iter()
        .any(|&r| inclusion.records[r] && matches!(graph.modules[m].records[r], Resolution::External(_)));
    if external_star {
        return ExportMode::Named;
    }
    match inclusion.used_exports.as_slice() {
        [] => ExportMode::None,
        [only]
            if only == "default"
                && (graph.modules[m].is_entry || !inclusion.namespace_used)
                && !live_default(graph, m) =>
        {
            ExportMode::Default
        }
        _ => ExportMode::Named,
    }
}

/// `export { x as default }` of a binding that is reassigned later: a plain
/// `module.exports = x` would freeze its value.
fn live_default(graph: &ModuleGraph, m: ModuleIdx) -> bool {
    let syntax = &graph.modules[m].syntax;
    match graph.explicit_export(m, "default").map(|e| &e.target) {
        Some(ExportTarget::Local(local)) => syntax.mutated.contains(local),
        _ => false,
    }
}

/// `require` specifier for `to` as seen from the output file `from`.
pub fn relative_specifier(from: &Path, to: &Path) -> String {
    let base = from.parent().unwrap_or(Path::new(""));
    let relative = pathdiff::diff_paths(to, base).unwrap_or_else(|| to.to_path_buf());
    let relative = relative.to_string_lossy().replace('\\', "/");
    if relative.starts_with("../") || relative.starts_with("./") {
        relative
    } else {
        format!("./{relative}")
    }
}

/// One rendered output module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedModule {
    /// Graph index
    pub module: ModuleIdx,
    /// CommonJS text
    pub code: String,
    /// Export mode
    pub mode: ExportMode,
}

/// Renders every included module. `outputs` holds the output path of each
/// included module, indexed like the graph.
pub fn render_graph(
    graph: &ModuleGraph,
    shake: &ShakeResult,
    outputs: &[Option<PathBuf>],
) -> Vec<RenderedModule> {
    let modes: Vec<ExportMode> = (0..graph.len())
        .map(|m| {
            if shake.modules[m].included {
                export_mode(graph, shake, m)
            } else {
                ExportMode::None
            }
        })
        .collect();

    shake
        .included()
        .map(|m| {
            let renderer = Renderer {
                graph,
                shake,
                outputs,
                modes: &modes,
                module: m,
            };
            RenderedModule {
                module: m,
                code: renderer.render(),
                mode: modes[m],
            }
        })
        .collect()
}

/// A `require` call of the rendered module.
#[derive(Debug)]
struct Dependency {
    /// Argument of `require`
    specifier: String,
    /// Internal target, if any
    target: Option<ModuleIdx>,
    /// Binding holding the result, if anything reads it
    var: Option<String>,
}

struct Renderer<'a> {
    graph: &'a ModuleGraph,
    shake: &'a ShakeResult,
    outputs: &'a [Option<PathBuf>],
    modes: &'a [ExportMode],
    module: ModuleIdx,
}

impl Renderer<'_> {
    fn render(&self) -> String {
        let module = &self.graph.modules[self.module];
        let inclusion = &self.shake.modules[self.module];
        let syntax = &module.syntax;
        let source = module.source.as_str();
        let mut scope = NameScope::new(&syntax.identifiers);

        let used_locals = self.used_locals();
        let (deps, record_dep) = self.dependencies(&used_locals, &mut scope);

        let default_name = syntax
            .statements
            .iter()
            .enumerate()
            .any(|(s, st)| {
                inclusion.statements[s]
                    && matches!(
                        st.kind,
                        StatementKind::DefaultExpression { .. }
                            | StatementKind::DefaultDeclaration { name: None, .. }
                    )
            })
            .then(|| scope.fresh(&names::module_base(&module.id)));

        let access = |record: usize, imported: &Imported| -> Option<String> {
            let dep = &deps[*record_dep.get(&record)?];
            let var = dep.var.as_deref()?;
            Some(self.access(dep, var, imported))
        };

        let mut buffer = EditBuffer::new(source);
        for (s, statement) in syntax.statements.iter().enumerate() {
            if !inclusion.statements[s] || statement.is_module_syntax() {
                buffer.remove(statement.span.start, removal_end(source, statement.span.end));
                continue;
            }

            match &statement.kind {
                StatementKind::Declaration {
                    export_keyword: Some(span),
                    ..
                } => buffer.remove(span.start, span.end),
                StatementKind::DefaultExpression { prefix, semicolon } => {
                    let name = default_name.as_deref().unwrap_or(DEFAULT_LOCAL);
                    buffer.replace(prefix.start, prefix.end, format!("const {name} = "));
                    if !semicolon {
                        buffer.insert(statement.span.end, ";");
                    }
                }
                StatementKind::DefaultDeclaration {
                    prefix,
                    name,
                    name_insert,
                } => {
                    buffer.remove(prefix.start, prefix.end);
                    if name.is_none() {
                        let name = default_name.as_deref().unwrap_or(DEFAULT_LOCAL);
                        buffer.insert(*name_insert, format!(" {name}"));
                    }
                }
                _ => {}
            }

            for &t in &statement.references {
                let text = syntax.token_text(source, t);
                let Some(Binding::Imported { record, imported }) = syntax.bindings.get(text) else {
                    continue;
                };
                let Some(replacement) = access(*record, imported) else {
                    continue;
                };
                let span = syntax.tokens[t].span;
                if syntax.shorthand.contains(&t) {
                    buffer.replace(span.start, span.end, format!("{text}: {replacement}"));
                } else if replacement != text {
                    buffer.replace(span.start, span.end, replacement);
                }
            }

            for (d, dynamic) in syntax.dynamic_imports.iter().enumerate() {
                if dynamic.statement != s {
                    continue;
                }
                let start = syntax.tokens[dynamic.import_token].span.start;
                let open = syntax.tokens[dynamic.import_token + 1].span.end;
                let close = syntax.tokens[dynamic.close_paren].span;
                let literal = match &module.dynamic[d] {
                    Some(Resolution::Internal(target)) => {
                        self.output_specifier(*target).map(|s| {
                            let call = format!("require({})", js_string(&s));
                            if self.modes[*target] == ExportMode::Default {
                                format!("{{ default: {call} }}")
                            } else {
                                call
                            }
                        })
                    }
                    Some(Resolution::External(specifier)) => {
                        Some(format!("require({})", js_string(specifier)))
                    }
                    None => None,
                };
                match literal {
                    Some(value) => buffer.replace(
                        start,
                        close.end,
                        format!("Promise.resolve().then(function () {{ return {value}; }})"),
                    ),
                    None => {
                        buffer.replace(start, open, "Promise.resolve().then(function () { return require(");
                        buffer.insert(close.end, "; })");
                    }
                }
            }

            for meta in syntax.meta_properties.iter().filter(|p| p.statement == s) {
                let start = syntax.tokens[meta.import_token].span.start;
                let end = syntax.tokens[meta.end_token].span.end;
                let url = "require('url').pathToFileURL(__filename).href";
                if meta.url {
                    buffer.replace(start, end, url);
                } else {
                    buffer.replace(start, end, format!("({{ url: {url} }})"));
                }
            }
        }

        let body = buffer.apply();
        let body = body.trim();

        let mut out = String::from("'use strict';\n");

        let requires: Vec<String> = deps
            .iter()
            .map(|dep| match &dep.var {
                Some(var) => format!("const {var} = require({});", js_string(&dep.specifier)),
                None => format!("require({});", js_string(&dep.specifier)),
            })
            .collect();
        if !requires.is_empty() {
            out.push('\n');
            for line in requires {
                out.push_str(&line);
                out.push('\n');
            }
        }

        if !body.is_empty() {
            out.push('\n');
            out.push_str(body);
            out.push('\n');
        }

        let exports = self.exports(&deps, &record_dep, default_name.as_deref());
        if !exports.is_empty() {
            out.push('\n');
            out.push_str(&exports);
        }
        out
    }

    /// Module-scope names read by kept code or by the export interface.
    fn used_locals(&self) -> FxHashSet<String> {
        let module = &self.graph.modules[self.module];
        let inclusion = &self.shake.modules[self.module];
        let syntax = &module.syntax;
        let mut used = FxHashSet::default();
        for (s, statement) in syntax.statements.iter().enumerate() {
            if inclusion.statements[s] {
                used.extend(
                    statement
                        .references
                        .iter()
                        .map(|&t| syntax.token_text(&module.source, t).to_string()),
                );
            }
        }
        for entry in &syntax.exports {
            if let ExportTarget::Local(local) = &entry.target {
                if inclusion.uses(&entry.exported) {
                    used.insert(local.clone());
                }
            }
        }
        used
    }

    /// Output path of `target` relative to this module's output.
    fn output_specifier(&self, target: ModuleIdx) -> Option<String> {
        let from = self.outputs[self.module].as_deref()?;
        let to = self.outputs[target].as_deref()?;
        Some(relative_specifier(from, to))
    }

    /// One dependency per distinct kept request, in first-request order.
    fn dependencies(
        &self,
        used_locals: &FxHashSet<String>,
        scope: &mut NameScope,
    ) -> (Vec<Dependency>, FxHashMap<usize, usize>) {
        let module = &self.graph.modules[self.module];
        let inclusion = &self.shake.modules[self.module];
        let syntax = &module.syntax;

        let mut deps: Vec<Dependency> = Vec::new();
        let mut by_resolution: FxHashMap<Resolution, usize> = FxHashMap::default();
        let mut record_dep = FxHashMap::default();
        let mut needs_var: Vec<bool> = Vec::new();
        let mut preferred: Vec<Option<String>> = Vec::new();

        for (r, record) in syntax.imports.iter().enumerate() {
            if !inclusion.records[r] {
                continue;
            }
            let resolution = &module.records[r];
            let index = match by_resolution.get(resolution) {
                Some(&index) => index,
                None => {
                    let (specifier, target) = match resolution {
                        Resolution::Internal(target) => {
                            let Some(specifier) = self.output_specifier(*target) else {
                                continue;
                            };
                            (specifier, Some(*target))
                        }
                        Resolution::External(specifier) => (specifier.clone(), None),
                    };
                    deps.push(Dependency {
                        specifier,
                        target,
                        var: None,
                    });
                    needs_var.push(false);
                    preferred.push(None);
                    by_resolution.insert(resolution.clone(), deps.len() - 1);
                    deps.len() - 1
                }
            };
            record_dep.insert(r, index);

            if record.kind != RecordKind::Import {
                needs_var[index] = true;
                continue;
            }
            for binding in &record.bindings {
                if !used_locals.contains(&binding.local) {
                    continue;
                }
                needs_var[index] = true;
                let default_is_whole = self.default_is_whole(&deps[index]);
                let whole_value = match &binding.imported {
                    Imported::Namespace => !default_is_whole || deps[index].target.is_none(),
                    Imported::Named(name) => name == "default" && default_is_whole,
                };
                let better = matches!(binding.imported, Imported::Namespace)
                    || preferred[index].is_none();
                if whole_value && better {
                    preferred[index] = Some(binding.local.clone());
                }
            }
        }

        for (index, dep) in deps.iter_mut().enumerate() {
            if !needs_var[index] {
                continue;
            }
            dep.var = Some(match preferred[index].take() {
                Some(local) => local,
                None => scope.fresh(&names::specifier_base(&dep.specifier)),
            });
        }

        (deps, record_dep)
    }

    /// Is a default import of `dep` the `require` result itself?
    fn default_is_whole(&self, dep: &Dependency) -> bool {
        match dep.target {
            Some(target) => self.modes[target] == ExportMode::Default,
            None => true,
        }
    }

    fn access(&self, dep: &Dependency, var: &str, imported: &Imported) -> String {
        match imported {
            Imported::Namespace if dep.target.is_some() && self.default_is_whole(dep) => {
                format!("({{ default: {var} }})")
            }
            Imported::Namespace => var.to_string(),
            Imported::Named(name) if name == "default" && self.default_is_whole(dep) => {
                var.to_string()
            }
            Imported::Named(name) => property_access(var, name),
        }
    }

    /// The export interface, appended after the body.
    fn exports(
        &self,
        deps: &[Dependency],
        record_dep: &FxHashMap<usize, usize>,
        default_name: Option<&str>,
    ) -> String {
        let module = &self.graph.modules[self.module];
        let inclusion = &self.shake.modules[self.module];
        let syntax = &module.syntax;
        let mode = self.modes[self.module];

        let access = |record: usize, imported: &Imported| -> Option<String> {
            let dep = &deps[*record_dep.get(&record)?];
            Some(self.access(dep, dep.var.as_deref()?, imported))
        };

        enum Value {
            Local(String),
            Live(String),
        }

        let origins = self.graph.export_names(self.module);
        let mut values = Vec::new();
        for name in &inclusion.used_exports {
            let Some((_, origin)) = origins.iter().find(|(n, _)| n == name) else {
                continue;
            };
            let value = match origin {
                ExportOrigin::Explicit(i) => match &syntax.exports[*i].target {
                    ExportTarget::Local(local) => match syntax.bindings.get(local) {
                        Some(Binding::Imported { record, imported }) => {
                            access(*record, imported).map(Value::Live)
                        }
                        _ if local == DEFAULT_LOCAL => {
                            Some(Value::Local(default_name.unwrap_or(DEFAULT_LOCAL).to_string()))
                        }
                        _ if syntax.mutated.contains(local) => Some(Value::Live(local.clone())),
                        _ => Some(Value::Local(local.clone())),
                    },
                    ExportTarget::ReExport { record, imported } => {
                        access(*record, imported).map(Value::Live)
                    }
                },
                ExportOrigin::Star(record) => {
                    access(*record, &Imported::Named(name.clone())).map(Value::Live)
                }
            };
            if let Some(value) = value {
                values.push((name.as_str(), value));
            }
        }

        let mut out = String::new();
        if mode == ExportMode::Default {
            if let Some((_, Value::Local(v) | Value::Live(v))) = values.first() {
                out.push_str(&format!("module.exports = {v};\n"));
            }
            return out;
        }

        for (name, value) in &values {
            match value {
                Value::Local(local) => {
                    out.push_str(&format!("{} = {local};\n", property_access("exports", name)));
                }
                Value::Live(expr) => {
                    out.push_str(&format!(
                        "Object.defineProperty(exports, {}, {{\n\tenumerable: true,\n\tget: function () {{ return {expr}; }}\n}});\n",
                        js_string(name)
                    ));
                }
            }
        }

        for &r in &syntax.star_exports {
            if !inclusion.records[r] || !matches!(module.records[r], Resolution::External(_)) {
                continue;
            }
            let Some(var) = record_dep.get(&r).and_then(|&d| deps[d].var.as_deref()) else {
                continue;
            };
            out.push_str(&format!(
                "Object.keys({var}).forEach(function (k) {{\n\tif (k !== 'default' && !Object.prototype.hasOwnProperty.call(exports, k)) Object.defineProperty(exports, k, {{\n\t\tenumerable: true,\n\t\tget: function () {{ return {var}[k]; }}\n\t}});\n}});\n"
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_specifier() {
        assert_eq!(
            relative_specifier(Path::new("/o/index.cjs"), Path::new("/o/util.cjs")),
            "./util.cjs"
        );
        assert_eq!(
            relative_specifier(Path::new("/o/__tests/a.cjs"), Path::new("/o/index.cjs")),
            "../index.cjs"
        );
        assert_eq!(
            relative_specifier(Path::new("/o/index.cjs"), Path::new("/o/syntax/parse.cjs")),
            "./syntax/parse.cjs"
        );
    }

    #[test]
    fn test_export_mode_display() {
        assert_eq!(ExportMode::Named.to_string(), "named");
        assert_eq!(ExportMode::default(), ExportMode::None);
    }
}
