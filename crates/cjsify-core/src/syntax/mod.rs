// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module-level syntax analysis.
//!
//! [`analyse`] turns ES module source into a [`ModuleSyntax`]: the top-level
//! statements with their spans, the import records, the export table, the
//! module-scope bindings and, per statement, the identifier tokens that refer
//! to those bindings. Nothing below statement level is represented as a tree.

mod parser;
mod scope;

use crate::lexer::{tokenize, Span, Token, TokenKind};
use parser::Parser;
use rustc_hash::{FxHashMap, FxHashSet};
use scope::Scopes;

/// Local name standing for an anonymous `export default` value.
pub const DEFAULT_LOCAL: &str = "*default*";

/// A syntax error at a byte offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    /// Byte offset of the offending token
    pub offset: usize,
    /// Description
    pub message: String,
}

impl SyntaxError {
    pub(crate) fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

/// What an import (or re-export) takes from its source module.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Imported {
    /// A single export; `default` included
    Named(String),
    /// The whole namespace object
    Namespace,
}

/// One local binding introduced by an import declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBinding {
    /// Local name
    pub local: String,
    /// Imported export
    pub imported: Imported,
}

/// How a module request appears in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// `import ... from 'x'` or `import 'x'`
    Import,
    /// `export { a } from 'x'` or `export * as ns from 'x'`
    ReExport,
    /// `export * from 'x'`
    Star,
}

/// A static module request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRecord {
    /// Specifier as written
    pub specifier: String,
    /// Kind of request
    pub kind: RecordKind,
    /// Statement the request belongs to
    pub statement: usize,
    /// Bindings (imports only)
    pub bindings: Vec<ImportBinding>,
}

/// A module-scope binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// Declared by these top-level statements
    Declared(Vec<usize>),
    /// Imported through a record
    Imported {
        /// Import record index
        record: usize,
        /// Imported export
        imported: Imported,
    },
}

/// Where an exported name gets its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportTarget {
    /// A module-scope binding
    Local(String),
    /// A binding of another module
    ReExport {
        /// Import record index
        record: usize,
        /// Re-exported export
        imported: Imported,
    },
}

/// One explicitly exported name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportEntry {
    /// Exported name
    pub exported: String,
    /// Value source
    pub target: ExportTarget,
}

/// An `import(...)` expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicImport {
    /// Token index of `import`
    pub import_token: usize,
    /// Token index of the closing parenthesis
    pub close_paren: usize,
    /// Literal specifier, if the argument is a plain string
    pub specifier: Option<String>,
    /// Statement containing the expression
    pub statement: usize,
}

/// An `import.meta` or `import.meta.url` expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaProperty {
    /// Token index of `import`
    pub import_token: usize,
    /// Token index of the last token (`meta` or `url`)
    pub end_token: usize,
    /// `import.meta.url`
    pub url: bool,
    /// Statement containing the expression
    pub statement: usize,
}

/// Classification of a top-level statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementKind {
    /// Import declaration
    Import,
    /// `export ... from` or `export *`
    ExportFrom,
    /// `export { ... }` without a source
    ExportList,
    /// Directive prologue entry or empty statement
    Directive,
    /// `var`/`let`/`const`/`function`/`class`, optionally exported
    Declaration {
        /// Bound names
        names: Vec<String>,
        /// Span of the leading `export ` keyword
        export_keyword: Option<Span>,
    },
    /// `export default <expression>`
    DefaultExpression {
        /// Span of `export default `
        prefix: Span,
        /// Statement ends with a semicolon
        semicolon: bool,
    },
    /// `export default function|class`
    DefaultDeclaration {
        /// Span of `export default `
        prefix: Span,
        /// Declared name, if any
        name: Option<String>,
        /// Offset where a generated name goes for anonymous declarations
        name_insert: usize,
    },
    /// Anything else
    Other,
}

/// A top-level statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Classification
    pub kind: StatementKind,
    /// First token index
    pub first: usize,
    /// Token index after the statement
    pub end: usize,
    /// Source span
    pub span: Span,
    /// Evaluating the statement has no observable effect
    pub pure: bool,
    /// Tokens referring to module-scope bindings
    pub references: Vec<usize>,
}

impl Statement {
    /// Does this statement only declare the module interface?
    pub fn is_module_syntax(&self) -> bool {
        matches!(
            self.kind,
            StatementKind::Import
                | StatementKind::ExportFrom
                | StatementKind::ExportList
                | StatementKind::Directive
        )
    }
}

/// The analysed form of one module.
#[derive(Debug, Clone)]
pub struct ModuleSyntax {
    /// All tokens, ending with `Eof`
    pub tokens: Vec<Token>,
    /// Top-level statements in source order
    pub statements: Vec<Statement>,
    /// Static module requests in source order
    pub imports: Vec<ImportRecord>,
    /// Explicit exports in source order
    pub exports: Vec<ExportEntry>,
    /// Records of `export * from`
    pub star_exports: Vec<usize>,
    /// Module-scope bindings
    pub bindings: FxHashMap<String, Binding>,
    /// Dynamic imports
    pub dynamic_imports: Vec<DynamicImport>,
    /// `import.meta` uses
    pub meta_properties: Vec<MetaProperty>,
    /// References written as shorthand properties
    pub shorthand: FxHashSet<usize>,
    /// Every identifier spelled anywhere in the module
    pub identifiers: FxHashSet<String>,
    /// Module-scope names assigned or updated after their declaration
    pub mutated: FxHashSet<String>,
}

impl ModuleSyntax {
    /// Source text of a token.
    pub fn token_text<'a>(&self, source: &'a str, index: usize) -> &'a str {
        self.tokens[index].span.text(source)
    }

    /// Index of the statement containing token `index`.
    pub fn statement_at(&self, index: usize) -> Option<usize> {
        let pos = self.statements.partition_point(|s| s.first <= index);
        let candidate = pos.checked_sub(1)?;
        (index < self.statements[candidate].end).then_some(candidate)
    }
}

/// Analyses an ES module.
pub fn analyse(source: &str) -> Result<ModuleSyntax, SyntaxError> {
    let tokens = tokenize(source).map_err(|e| SyntaxError::new(e.offset, e.message))?;
    let parser = Parser::new(source, &tokens)?;
    let top = parser.parse_module()?;
    let scopes = Scopes::build(&parser);

    let mut statements = top.statements;
    let mut shorthand = FxHashSet::default();
    let mut identifiers = FxHashSet::default();
    let mut mutated = FxHashSet::default();
    let mut dynamic_imports = Vec::new();
    let mut meta_properties = Vec::new();

    let owner = |index: usize, statements: &[Statement]| -> usize {
        statements.partition_point(|s| s.first <= index).saturating_sub(1)
    };

    for (t, tok) in tokens.iter().enumerate() {
        if !tok.is_identifier() {
            continue;
        }
        let text = parser.text(t);
        identifiers.insert(text.to_string());

        if text == "import" && !(t > 0 && parser.is_punct(t - 1, ".")) {
            if parser.is_punct(t + 1, "(") {
                let close = parser.closer[t + 1];
                let specifier = match &tokens[t + 2].kind {
                    TokenKind::String(value)
                        if parser.is_punct(t + 3, ")") || parser.is_punct(t + 3, ",") =>
                    {
                        Some(value.clone())
                    }
                    _ => None,
                };
                dynamic_imports.push(DynamicImport {
                    import_token: t,
                    close_paren: close,
                    specifier,
                    statement: owner(t, &statements),
                });
            } else if parser.is_punct(t + 1, ".") && parser.is_word(t + 2, "meta") {
                let url = parser.is_punct(t + 3, ".") && parser.is_word(t + 4, "url");
                meta_properties.push(MetaProperty {
                    import_token: t,
                    end_token: if url { t + 4 } else { t + 2 },
                    url,
                    statement: owner(t, &statements),
                });
            }
            continue;
        }

        if !top.bindings.contains_key(text) {
            continue;
        }
        if !scope::reference_position(&parser, &scopes, t) || scopes.shadowed(t, text) {
            continue;
        }
        let index = owner(t, &statements);
        if statements[index].is_module_syntax() {
            continue;
        }
        if scope::assignment_target(&parser, t) && !declarator_name(&parser, &statements[index], t) {
            mutated.insert(text.to_string());
        }
        let statement = &mut statements[index];
        statement.references.push(t);
        if scope::shorthand_position(&parser, &scopes, t) {
            shorthand.insert(t);
        }
    }

    Ok(ModuleSyntax {
        tokens,
        statements,
        imports: top.imports,
        exports: top.exports,
        star_exports: top.star_exports,
        bindings: top.bindings,
        dynamic_imports,
        meta_properties,
        shorthand,
        identifiers,
        mutated,
    })
}

/// Is `t` the name of a top-level `let`/`const`/`var` declarator of its own
/// statement (`let a = 1, b = 2`)?
fn declarator_name(parser: &Parser<'_>, statement: &Statement, t: usize) -> bool {
    if !matches!(statement.kind, StatementKind::Declaration { .. }) || t == 0 {
        return false;
    }
    parser.is_word(t - 1, "let")
        || parser.is_word(t - 1, "const")
        || parser.is_word(t - 1, "var")
        || (parser.is_punct(t - 1, ",") && parser.enclosing[t] == parser::NONE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(syntax: &ModuleSyntax) -> Vec<&StatementKind> {
        syntax.statements.iter().map(|s| &s.kind).collect()
    }

    fn reference_names(source: &str, syntax: &ModuleSyntax, statement: usize) -> Vec<String> {
        syntax.statements[statement]
            .references
            .iter()
            .map(|&t| syntax.token_text(source, t).to_string())
            .collect()
    }

    #[test]
    fn test_import_forms() {
        let src = r#"
import def, { a, b as c, "d-e" as d } from './x.js';
import * as ns from "fs";
import './side.js';
"#;
        let syntax = analyse(src).unwrap();
        assert_eq!(syntax.imports.len(), 3);
        assert_eq!(syntax.imports[0].specifier, "./x.js");
        assert_eq!(
            syntax.imports[0].bindings,
            vec![
                ImportBinding { local: "def".into(), imported: Imported::Named("default".into()) },
                ImportBinding { local: "a".into(), imported: Imported::Named("a".into()) },
                ImportBinding { local: "c".into(), imported: Imported::Named("b".into()) },
                ImportBinding { local: "d".into(), imported: Imported::Named("d-e".into()) },
            ]
        );
        assert_eq!(syntax.imports[1].bindings[0].imported, Imported::Namespace);
        assert!(syntax.imports[2].bindings.is_empty());
        assert_eq!(
            syntax.bindings.get("ns"),
            Some(&Binding::Imported { record: 1, imported: Imported::Namespace })
        );
        assert!(kinds(&syntax).iter().all(|k| **k == StatementKind::Import));
    }

    #[test]
    fn test_export_forms() {
        let src = r#"
export const x = 1, { y, z: [w] } = obj;
export function f() {}
export class K {}
export { x as renamed, f as default };
export { a as b } from './a.js';
export * from './star.js';
export * as space from './space.js';
"#;
        let syntax = analyse(src).unwrap();
        let names: Vec<&str> = syntax.exports.iter().map(|e| e.exported.as_str()).collect();
        assert_eq!(names, ["x", "y", "w", "f", "K", "renamed", "default", "b", "space"]);
        assert_eq!(syntax.star_exports, vec![1]);
        assert_eq!(syntax.imports[1].kind, RecordKind::Star);
        assert_eq!(
            syntax.exports[7].target,
            ExportTarget::ReExport { record: 0, imported: Imported::Named("a".into()) }
        );
        assert_eq!(syntax.statements.len(), 7);
        match &syntax.statements[0].kind {
            StatementKind::Declaration { names, export_keyword } => {
                assert_eq!(names, &["x", "y", "w"]);
                let span = export_keyword.unwrap();
                assert_eq!(span.text(src), "export ");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_default_exports() {
        let src = "export default function () {}\n";
        let syntax = analyse(src).unwrap();
        match &syntax.statements[0].kind {
            StatementKind::DefaultDeclaration { prefix, name, name_insert } => {
                assert_eq!(prefix.text(src), "export default ");
                assert_eq!(name, &None);
                assert_eq!(&src[..*name_insert], "export default function");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(syntax.bindings.contains_key(DEFAULT_LOCAL));

        let src = "export default class Foo extends Bar {}";
        let syntax = analyse(src).unwrap();
        assert_eq!(
            syntax.exports[0].target,
            ExportTarget::Local("Foo".into())
        );

        let src = "export default a + b\nfoo()";
        let syntax = analyse(src).unwrap();
        assert_eq!(syntax.statements.len(), 2);
        assert!(matches!(
            syntax.statements[0].kind,
            StatementKind::DefaultExpression { semicolon: false, .. }
        ));
    }

    #[test]
    fn test_statement_splitting() {
        let src = "'use strict';\nconst a = 1\nconst b = a\n  + 2;\nfoo(a)\n[1].map(x => x)\nif (a) {\n} else {\n}\nfunction g() {}\n(g)();\n";
        let syntax = analyse(src).unwrap();
        let texts: Vec<&str> = syntax.statements.iter().map(|s| s.span.text(src)).collect();
        assert_eq!(
            texts,
            [
                "'use strict';",
                "const a = 1",
                "const b = a\n  + 2;",
                "foo(a)\n[1].map(x => x)",
                "if (a) {\n} else {\n}",
                "function g() {}",
                "(g)();",
            ]
        );
        assert_eq!(syntax.statements[0].kind, StatementKind::Directive);
    }

    #[test]
    fn test_purity() {
        let src = r#"
const a = 1, b = [a, { c: 'x' }], f = () => sideEffect();
const d = compute();
let e = new Thing();
function g() { mutate(); }
class H { method() { call(); } static x = 1; }
class I extends mixin(Base) {}
export default { a, b };
const o = { run() { go(); }, get [k]() { return 1; }, *gen() { yield 1; } };
class J extends (setup(), Base) { m() {} }
"#;
        let syntax = analyse(src).unwrap();
        let pure: Vec<bool> = syntax.statements.iter().map(|s| s.pure).collect();
        assert_eq!(pure, [true, false, false, true, true, false, true, true, false]);
    }

    #[test]
    fn test_references() {
        let src = r#"
import { parse, walk } from './parser.js';
const cfg = { parse, depth: walk.depth, walk: 1 };
function run(parse) { return parse + walk(cfg); }
class Runner { parse() { return 1; } walk = 2; }
const o = obj.parse;
"#;
        let syntax = analyse(src).unwrap();
        assert_eq!(reference_names(src, &syntax, 1), ["cfg", "parse", "walk"]);
        assert_eq!(reference_names(src, &syntax, 2), ["walk", "cfg"]);
        assert_eq!(reference_names(src, &syntax, 3), Vec::<String>::new());
        assert_eq!(reference_names(src, &syntax, 4), ["o"]);

        let parse_token = syntax.statements[1].references[1];
        assert!(syntax.shorthand.contains(&parse_token));
    }

    #[test]
    fn test_mutated_bindings() {
        let src = r#"
export let count = 0, step = 1;
export let total = 0;
let seen = false;
var left = 3;
const fixed = 1;
export function inc() { count += step; seen = true; }
export function dec(left) { left--; }
++total;
"#;
        let syntax = analyse(src).unwrap();
        let mut mutated: Vec<_> = syntax.mutated.iter().map(String::as_str).collect();
        mutated.sort_unstable();
        assert_eq!(mutated, ["count", "seen", "total"]);
    }

    #[test]
    fn test_shadowing_scopes() {
        let src = r#"
import x from './x.js';
const a = (x) => x;
const b = function () { let x = 1; return x; };
const c = () => { try {} catch (x) { return x; } return x; };
const d = [1].map(({ x }) => x);
"#;
        let syntax = analyse(src).unwrap();
        assert_eq!(reference_names(src, &syntax, 1), ["a"]);
        assert_eq!(reference_names(src, &syntax, 2), ["b"]);
        assert_eq!(reference_names(src, &syntax, 3), ["c", "x"]);
        assert_eq!(reference_names(src, &syntax, 4), ["d"]);
    }

    #[test]
    fn test_dynamic_import_and_meta() {
        let src = "const m = import('./lazy.js');\nconst n = import(name);\nconst u = import.meta.url;\n";
        let syntax = analyse(src).unwrap();
        assert_eq!(syntax.dynamic_imports.len(), 2);
        assert_eq!(syntax.dynamic_imports[0].specifier.as_deref(), Some("./lazy.js"));
        assert_eq!(syntax.dynamic_imports[1].specifier, None);
        assert_eq!(syntax.dynamic_imports[1].statement, 1);
        assert_eq!(syntax.meta_properties.len(), 1);
        assert!(syntax.meta_properties[0].url);
        assert_eq!(syntax.meta_properties[0].statement, 2);
        assert!(syntax.imports.is_empty());
    }

    #[test]
    fn test_statement_at() {
        let syntax = analyse("const a = 1;\nfoo();").unwrap();
        assert_eq!(syntax.statement_at(0), Some(0));
        assert_eq!(syntax.statement_at(5), Some(1));
        assert_eq!(syntax.statement_at(syntax.tokens.len() - 1), None);
    }

    #[test]
    fn test_syntax_errors() {
        assert!(analyse("import { a from './a.js';").is_err());
        assert!(analyse("export nonsense;").is_err());
        assert!(analyse("foo(]").is_err());
        let err = analyse("const s = 'unterminated").unwrap_err();
        assert!(err.message.contains("Unterminated"));
    }
}
