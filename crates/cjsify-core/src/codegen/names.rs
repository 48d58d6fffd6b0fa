//! Identifier generation and JavaScript literal helpers.

use crate::lexer::is_reserved;
use rustc_hash::FxHashSet;
use std::path::Path;
use unicode_xid::UnicodeXID;

/// Names CommonJS provides to every module.
const COMMONJS_NAMES: &[&str] = &["require", "module", "exports", "__filename", "__dirname"];

/// Is `name` a valid identifier name (reserved words allowed)?
pub fn is_identifier_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '$' || c == '_' || UnicodeXID::is_xid_start(c) => {}
        _ => return false,
    }
    chars.all(|c| c == '$' || UnicodeXID::is_xid_continue(c))
}

/// Turns arbitrary text into a usable binding name: `css-tree` -> `cssTree`.
pub fn legal_name(text: &str) -> String {
    let mut name = String::with_capacity(text.len());
    let mut upper_next = false;
    for c in text.chars() {
        if c == '$' || c == '_' || UnicodeXID::is_xid_continue(c) {
            if upper_next && !name.is_empty() {
                name.extend(c.to_uppercase());
            } else {
                name.push(c);
            }
            upper_next = false;
        } else {
            upper_next = true;
        }
    }
    if name.is_empty() {
        return "module".to_string();
    }
    let starts_ok = name
        .chars()
        .next()
        .is_some_and(|c| c == '$' || c == '_' || UnicodeXID::is_xid_start(c));
    if !starts_ok || is_reserved(&name) || COMMONJS_NAMES.contains(&name.as_str()) {
        name.insert(0, '_');
    }
    name
}

/// Strips a known module extension from a file name.
fn strip_extension(file: &str) -> &str {
    [".js", ".mjs", ".cjs", ".json"]
        .iter()
        .find_map(|ext| file.strip_suffix(ext))
        .unwrap_or(file)
}

/// Binding name for the value of a `require(specifier)`.
pub fn specifier_base(specifier: &str) -> String {
    let specifier = specifier.rsplit(':').next().unwrap_or(specifier);
    let mut segments = specifier
        .trim_end_matches('/')
        .rsplit('/')
        .filter(|s| !s.is_empty() && *s != "." && *s != "..");
    let last = segments.next().unwrap_or("module");
    let stem = strip_extension(last);
    if stem == "index" {
        if let Some(parent) = segments.next() {
            return legal_name(parent.trim_start_matches('@'));
        }
    }
    legal_name(stem)
}

/// Binding name derived from a module's file name.
pub fn module_base(path: &Path) -> String {
    let file = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    legal_name(strip_extension(&file))
}

/// Single-quoted JavaScript string literal.
pub fn js_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// `object.name`, or `object['name']` when `name` is not an identifier.
pub fn property_access(object: &str, name: &str) -> String {
    if is_identifier_name(name) {
        format!("{object}.{name}")
    } else {
        format!("{object}[{}]", js_string(name))
    }
}

/// Names already spoken for in one output module.
#[derive(Debug, Clone)]
pub struct NameScope {
    taken: FxHashSet<String>,
}

impl NameScope {
    /// Scope that avoids `used` and the CommonJS wrapper names.
    pub fn new(used: &FxHashSet<String>) -> Self {
        let mut taken = used.clone();
        taken.extend(COMMONJS_NAMES.iter().map(|n| n.to_string()));
        Self { taken }
    }

    /// Reserve a name derived from `base`, suffixing `$1`, `$2`, ... on clashes.
    pub fn fresh(&mut self, base: &str) -> String {
        if self.taken.insert(base.to_string()) {
            return base.to_string();
        }
        let mut n = 1;
        loop {
            let candidate = format!("{base}${n}");
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legal_name() {
        assert_eq!(legal_name("css-tree"), "cssTree");
        assert_eq!(legal_name("source-map-js"), "sourceMapJs");
        assert_eq!(legal_name("2d"), "_2d");
        assert_eq!(legal_name("class"), "_class");
        assert_eq!(legal_name("module"), "_module");
        assert_eq!(legal_name("---"), "module");
    }

    #[test]
    fn test_specifier_base() {
        assert_eq!(specifier_base("fs"), "fs");
        assert_eq!(specifier_base("node:fs"), "fs");
        assert_eq!(specifier_base("./utils/names.js"), "names");
        assert_eq!(specifier_base("./syntax/index.js"), "syntax");
        assert_eq!(specifier_base("../index.js"), "index");
        assert_eq!(specifier_base("@scope/pkg"), "pkg");
        assert_eq!(specifier_base("json-to-ast"), "jsonToAst");
    }

    #[test]
    fn test_module_base() {
        assert_eq!(module_base(Path::new("/p/lib/clean-up.js")), "cleanUp");
    }

    #[test]
    fn test_literals() {
        assert_eq!(js_string("it's"), r"'it\'s'");
        assert_eq!(property_access("dep", "name"), "dep.name");
        assert_eq!(property_access("dep", "default"), "dep.default");
        assert_eq!(property_access("dep", "a-b"), "dep['a-b']");
        assert!(is_identifier_name("$el"));
        assert!(!is_identifier_name("1x"));
    }

    #[test]
    fn test_name_scope() {
        let used: FxHashSet<String> = ["util".to_string()].into_iter().collect();
        let mut scope = NameScope::new(&used);
        assert_eq!(scope.fresh("util"), "util$1");
        assert_eq!(scope.fresh("util"), "util$2");
        assert_eq!(scope.fresh("fs"), "fs");
        assert_eq!(scope.fresh("exports"), "exports$1");
    }
}
