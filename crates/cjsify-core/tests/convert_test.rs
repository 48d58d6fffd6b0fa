//! End-to-end conversion tests over temporary package layouts.

use cjsify_core::config::{EntryDir, ExternalPattern, GroupConfig};
use cjsify_core::resolver::SelfResolver;
use cjsify_core::{Config, ConvertError, Converter, RunOptions, SelfReferenceMode};
use std::fs;
use std::path::{Path, PathBuf};

const INDEX: &str = "\
import { helper } from './utils/helper.js';
import fs from 'fs';
import { unusedThing } from './dead.js';

export function read(file) {
  return helper(fs.readFileSync(file, 'utf8'));
}

export const version = '1.0.0';
";

const HELPER: &str = "\
export function helper(text) {
  return text.trim();
}

export function unused() {
  return 1;
}
";

const BASIC_TEST: &str = "\
import assert from 'assert';
import { read } from 'my-lib';

assert.equal(typeof read, 'function');
";

fn write_files(root: &Path, files: &[(&str, &str)]) {
    for (path, content) in files {
        let path = root.join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
}

/// The `index` + `__tests/basic` package.
fn fixture() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_files(
        dir.path(),
        &[
            ("package.json", r#"{ "name": "my-lib", "type": "module" }"#),
            ("lib/index.js", INDEX),
            ("lib/utils/helper.js", HELPER),
            ("lib/dead.js", "export const unusedThing = 1;\n"),
            ("lib/orphan.js", "export const nobody = 'imports me';\n"),
            ("lib/__tests/basic.js", BASIC_TEST),
        ],
    );
    dir
}

fn config(root: &Path, self_reference: SelfReferenceMode) -> Config {
    Config {
        self_reference,
        external: vec![
            ExternalPattern::Exact("fs".to_string()),
            ExternalPattern::Exact("assert".to_string()),
        ],
        groups: vec![GroupConfig {
            entry: PathBuf::from("lib/index.js"),
            output: PathBuf::from("cjs"),
            dirs: vec![EntryDir {
                dir: PathBuf::from("lib/__tests"),
                pattern: r"\.js$".to_string(),
            }],
        }],
        base_dir: root.to_path_buf(),
        ..Config::default()
    }
}

fn quiet() -> RunOptions {
    RunOptions {
        dry_run: false,
        quiet: true,
    }
}

async fn convert(config: Config) -> cjsify_core::Result<Vec<PathBuf>> {
    let mut converter = Converter::new(config, quiet())?;
    let mut reports = converter.run().await?;
    let mut files = reports.remove(0).files;
    files.sort();
    Ok(files)
}

fn read(path: PathBuf) -> String {
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("{}: {e}", path.display()))
}

struct Resolves(bool);

impl SelfResolver for Resolves {
    fn resolve_self(&self, name: &str) -> cjsify_core::Result<PathBuf> {
        if self.0 {
            Ok(PathBuf::from(format!("/node_modules/{name}/package.json")))
        } else {
            Err(ConvertError::unresolved("/package.json", format!("{name}/package.json")))
        }
    }
}

#[tokio::test]
async fn test_one_output_per_reachable_module() {
    let dir = fixture();
    let out = dir.path().join("cjs");
    let files = convert(config(dir.path(), SelfReferenceMode::Always)).await.unwrap();

    assert_eq!(
        files,
        vec![
            out.join("__tests/basic.cjs"),
            out.join("index.cjs"),
            out.join("utils/helper.cjs"),
        ]
    );
    assert!(!out.join("dead.cjs").exists());
    assert!(!out.join("orphan.cjs").exists());
}

#[tokio::test]
async fn test_index_output() {
    let dir = fixture();
    convert(config(dir.path(), SelfReferenceMode::Always)).await.unwrap();

    assert_eq!(
        read(dir.path().join("cjs/index.cjs")),
        "'use strict';

const helper$1 = require('./utils/helper.cjs');
const fs = require('fs');

function read(file) {
  return helper$1.helper(fs.readFileSync(file, 'utf8'));
}

const version = '1.0.0';

exports.read = read;
exports.version = version;
"
    );
    assert_eq!(
        read(dir.path().join("cjs/utils/helper.cjs")),
        "'use strict';

function helper(text) {
  return text.trim();
}

exports.helper = helper;
"
    );
}

#[tokio::test]
async fn test_self_reference_patched() {
    let dir = fixture();
    convert(config(dir.path(), SelfReferenceMode::Always)).await.unwrap();

    let test = read(dir.path().join("cjs/__tests/basic.cjs"));
    assert!(test.contains("const assert = require('assert');"), "{test}");
    assert!(test.contains("const index = require('../index.cjs');"), "{test}");
    assert!(test.contains("assert.equal(typeof index.read, 'function');"), "{test}");
    assert!(!test.contains("my-lib"), "{test}");
    assert!(!test.contains("exports"), "{test}");
}

#[tokio::test]
async fn test_self_reference_untouched_when_resolvable() {
    let dir = fixture();
    let mut converter = Converter::with_resolver(
        config(dir.path(), SelfReferenceMode::Auto),
        quiet(),
        &Resolves(true),
    )
    .unwrap();
    assert!(!converter.self_reference());
    converter.run().await.unwrap();

    let test = read(dir.path().join("cjs/__tests/basic.cjs"));
    assert!(test.contains("const myLib = require('my-lib');"), "{test}");
    assert!(test.contains("typeof myLib.read"), "{test}");
}

#[tokio::test]
async fn test_self_reference_auto_patches_on_failure() {
    let dir = fixture();
    let converter = Converter::with_resolver(
        config(dir.path(), SelfReferenceMode::Auto),
        quiet(),
        &Resolves(false),
    )
    .unwrap();
    assert!(converter.self_reference());
    assert_eq!(converter.package_name(), Some("my-lib"));
}

#[tokio::test]
async fn test_never_ignores_resolver() {
    let dir = fixture();
    let converter = Converter::with_resolver(
        config(dir.path(), SelfReferenceMode::Never),
        quiet(),
        &Resolves(false),
    )
    .unwrap();
    assert!(!converter.self_reference());
}

#[tokio::test]
async fn test_create_require_shim_removed() {
    let dir = tempfile::tempdir().unwrap();
    write_files(
        dir.path(),
        &[
            ("package.json", r#"{ "name": "shim" }"#),
            (
                "lib/index.js",
                "import { createRequire } from 'module';\nconst require = createRequire(import.meta.url);\nconst pkg = require('../package.json');\n\nexport const name = pkg.name;\n",
            ),
        ],
    );
    let mut config = config(dir.path(), SelfReferenceMode::Never);
    config.groups[0].dirs.clear();
    convert(config).await.unwrap();

    let out = read(dir.path().join("cjs/index.cjs"));
    assert!(!out.contains("createRequire"), "{out}");
    assert!(out.contains("const pkg = require('../package.json');"), "{out}");
    assert!(out.contains("exports.name = name;"), "{out}");
}

#[tokio::test]
async fn test_external_specifiers_preserved() {
    let dir = tempfile::tempdir().unwrap();
    write_files(
        dir.path(),
        &[(
            "lib/index.js",
            "import { join } from 'node:path';\nimport * as lexer from 'fs';\n\nexport const where = join('a', 'b');\nexport const api = lexer;\n",
        )],
    );
    let mut config = config(dir.path(), SelfReferenceMode::Never);
    config.groups[0].dirs.clear();
    convert(config).await.unwrap();

    let out = read(dir.path().join("cjs/index.cjs"));
    assert!(out.contains("const path = require('node:path');"), "{out}");
    assert!(out.contains("const lexer = require('fs');"), "{out}");
    assert!(out.contains("const where = path.join('a', 'b');"), "{out}");
    assert!(out.contains("Object.defineProperty(exports, 'api'") || out.contains("exports.api = api;"), "{out}");
}

#[tokio::test]
async fn test_default_only_module_uses_module_exports() {
    let dir = tempfile::tempdir().unwrap();
    write_files(
        dir.path(),
        &[
            (
                "lib/index.js",
                "import greet from './greet.js';\n\nexport const hello = greet('x');\n",
            ),
            (
                "lib/greet.js",
                "export default function greet(name) {\n  return 'hi ' + name;\n}\n",
            ),
        ],
    );
    let mut config = config(dir.path(), SelfReferenceMode::Never);
    config.groups[0].dirs.clear();
    convert(config).await.unwrap();

    let index = read(dir.path().join("cjs/index.cjs"));
    assert!(index.contains("const greet = require('./greet.cjs');"), "{index}");
    assert!(index.contains("const hello = greet('x');"), "{index}");

    let greet = read(dir.path().join("cjs/greet.cjs"));
    assert!(greet.contains("function greet(name) {"), "{greet}");
    assert!(greet.ends_with("module.exports = greet;\n"), "{greet}");
}

#[tokio::test]
async fn test_cycle_converts() {
    let dir = tempfile::tempdir().unwrap();
    write_files(
        dir.path(),
        &[
            (
                "lib/a.js",
                "import { b } from './b.js';\n\nexport const a = 'a';\nexport function both() {\n  return a + b;\n}\n",
            ),
            (
                "lib/b.js",
                "import { a } from './a.js';\n\nexport const b = 'b';\nexport function other() {\n  return a;\n}\n",
            ),
        ],
    );
    let mut config = config(dir.path(), SelfReferenceMode::Never);
    config.groups[0].entry = PathBuf::from("lib/a.js");
    config.groups[0].dirs = vec![EntryDir {
        dir: PathBuf::from("lib"),
        pattern: r"^b\.js$".to_string(),
    }];
    let files = convert(config).await.unwrap();
    assert_eq!(files.len(), 2);

    let a = read(dir.path().join("cjs/a.cjs"));
    let b = read(dir.path().join("cjs/b.cjs"));
    assert!(a.contains("const b$1 = require('./b.cjs');"), "{a}");
    assert!(a.contains("return a + b$1.b;"), "{a}");
    assert!(a.contains("exports.a = a;"), "{a}");
    assert!(b.contains("const a$1 = require('./a.cjs');"), "{b}");
    assert!(b.contains("return a$1.a;"), "{b}");
    assert!(b.contains("exports.b = b;"), "{b}");
}

#[tokio::test]
async fn test_reassigned_export_is_live() {
    let dir = tempfile::tempdir().unwrap();
    write_files(
        dir.path(),
        &[
            (
                "lib/index.js",
                "import { count, inc } from './counter.js';\nimport mode from './mode.js';\n\nexport function bump() {\n  inc();\n  return count;\n}\nexport const current = () => mode;\n",
            ),
            (
                "lib/mode.js",
                "let mode = 'a';\nsetTimeout(() => {\n  mode = 'b';\n});\nexport { mode as default };\n",
            ),
            (
                "lib/counter.js",
                "export let count = 0;\nexport function inc() {\n  count++;\n}\n",
            ),
        ],
    );
    let mut config = config(dir.path(), SelfReferenceMode::Never);
    config.groups[0].dirs.clear();
    convert(config).await.unwrap();

    let counter = read(dir.path().join("cjs/counter.cjs"));
    assert!(counter.contains("let count = 0;"), "{counter}");
    assert!(
        counter.contains(
            "Object.defineProperty(exports, 'count', {\n\tenumerable: true,\n\tget: function () { return count; }\n});"
        ),
        "{counter}"
    );
    assert!(!counter.contains("exports.count = count;"), "{counter}");
    assert!(counter.contains("exports.inc = inc;"), "{counter}");

    let index = read(dir.path().join("cjs/index.cjs"));
    assert!(index.contains("const counter = require('./counter.cjs');"), "{index}");
    assert!(index.contains("counter.inc();\n  return counter.count;"), "{index}");
    assert!(index.contains("const current = () => mode$1.default;"), "{index}");

    let mode = read(dir.path().join("cjs/mode.cjs"));
    assert!(!mode.contains("module.exports"), "{mode}");
    assert!(
        mode.contains("Object.defineProperty(exports, 'default', {\n\tenumerable: true,\n\tget: function () { return mode; }\n});"),
        "{mode}"
    );
}

#[tokio::test]
async fn test_groups_convert_in_order() {
    let dir = fixture();
    write_files(
        dir.path(),
        &[(
            "lib/cli.js",
            "import { read } from './index.js';\n\nexport function main(args) {\n  return read(args[0]);\n}\n",
        )],
    );
    let mut config = config(dir.path(), SelfReferenceMode::Always);
    config.groups.push(GroupConfig {
        entry: PathBuf::from("lib/cli.js"),
        output: PathBuf::from("bin"),
        dirs: vec![EntryDir {
            dir: PathBuf::from("lib/__tests"),
            pattern: r"\.js$".to_string(),
        }],
    });
    let mut converter = Converter::new(config, quiet()).unwrap();
    let reports = converter.run().await.unwrap();

    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].output, dir.path().join("cjs"));
    assert_eq!(reports[1].output, dir.path().join("bin"));
    let mut second = reports[1].files.clone();
    second.sort();
    let bin = dir.path().join("bin");
    assert_eq!(
        second,
        vec![
            bin.join("__tests/basic.cjs"),
            bin.join("cli.cjs"),
            bin.join("index.cjs"),
            bin.join("utils/helper.cjs"),
        ]
    );
    assert!(!dir.path().join("cjs/cli.cjs").exists());

    let cli = read(bin.join("cli.cjs"));
    assert!(cli.contains("const index = require('./index.cjs');"), "{cli}");
    assert!(cli.contains("return index.read(args[0]);"), "{cli}");

    // The package name still stands for the first group's entry.
    let test = read(bin.join("__tests/basic.cjs"));
    assert!(test.contains("const index = require('../index.cjs');"), "{test}");
    assert!(!test.contains("cli.cjs"), "{test}");
}

#[tokio::test]
async fn test_output_is_deterministic() {
    let dir = fixture();
    let mut first = config(dir.path(), SelfReferenceMode::Always);
    first.groups[0].output = PathBuf::from("first");
    let mut second = config(dir.path(), SelfReferenceMode::Always);
    second.groups[0].output = PathBuf::from("second");

    let a = convert(first).await.unwrap();
    let b = convert(second).await.unwrap();
    assert_eq!(a.len(), b.len());
    for (a, b) in a.into_iter().zip(b) {
        assert_eq!(fs::read(a).unwrap(), fs::read(b).unwrap());
    }
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let dir = fixture();
    let mut converter = Converter::new(
        config(dir.path(), SelfReferenceMode::Always),
        RunOptions {
            dry_run: true,
            quiet: true,
        },
    )
    .unwrap();
    let reports = converter.run().await.unwrap();
    assert_eq!(reports[0].files.len(), 3);
    assert_eq!(reports[0].modules, 4);
    assert!(!dir.path().join("cjs").exists());
}

#[tokio::test]
async fn test_unresolved_import_fails_without_output() {
    let dir = tempfile::tempdir().unwrap();
    write_files(
        dir.path(),
        &[("lib/index.js", "import { x } from './missing.js';\nexport { x };\n")],
    );
    let mut config = config(dir.path(), SelfReferenceMode::Never);
    config.groups[0].dirs.clear();

    match convert(config).await {
        Err(ConvertError::UnresolvedModule { specifier, .. }) => {
            assert_eq!(specifier, "./missing.js");
        }
        other => panic!("expected unresolved module, got {other:?}"),
    }
    assert!(!dir.path().join("cjs").exists());
}

#[tokio::test]
async fn test_missing_entry() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), SelfReferenceMode::Never);
    assert!(matches!(
        convert(config).await,
        Err(ConvertError::PathNotFound(_))
    ));
}
