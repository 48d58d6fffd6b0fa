//! Top-level statement parser.
//!
//! The parser never builds expression trees. It walks the token stream with a
//! precomputed bracket table, splits the module body into top-level
//! statements and fully parses only the declarative parts the converter has
//! to understand: `import`, `export` and top-level bindings.

use super::{
    Binding, ExportEntry, ExportTarget, ImportBinding, ImportRecord, Imported, RecordKind,
    Statement, StatementKind, SyntaxError, DEFAULT_LOCAL,
};
use crate::lexer::{is_reserved, Span, Token, TokenKind};
use rustc_hash::FxHashMap;

/// Marker for "no matching token".
pub(super) const NONE: usize = usize::MAX;

/// Keywords that consume an operand, so the expression continues after them.
const OPERATOR_WORDS: &[&str] = &[
    "typeof", "instanceof", "in", "of", "new", "delete", "void", "return", "case", "else", "do",
    "yield", "await", "throw", "extends", "let", "const", "var", "import", "export", "async",
];

/// Words that keep a statement going when they start the next line.
const CONTINUATION_WORDS: &[&str] = &["in", "instanceof", "of", "else", "catch", "finally", "as"];

/// Control keywords whose parenthesised head may be followed by a block.
pub(super) const CONTROL_WORDS: &[&str] =
    &["if", "for", "while", "switch", "catch", "with", "function"];

/// Everything the top-level pass extracts.
#[derive(Debug, Default)]
pub(super) struct TopLevel {
    pub statements: Vec<Statement>,
    pub imports: Vec<ImportRecord>,
    pub exports: Vec<ExportEntry>,
    pub star_exports: Vec<usize>,
    pub bindings: FxHashMap<String, Binding>,
}

pub(super) struct Parser<'a> {
    pub source: &'a str,
    pub tokens: &'a [Token],
    /// Opener index -> closer index
    pub closer: Vec<usize>,
    /// Closer index -> opener index
    pub opener: Vec<usize>,
    /// Innermost enclosing opener of every token
    pub enclosing: Vec<usize>,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str, tokens: &'a [Token]) -> Result<Self, SyntaxError> {
        let mut closer = vec![NONE; tokens.len()];
        let mut opener = vec![NONE; tokens.len()];
        let mut enclosing = vec![NONE; tokens.len()];
        let mut stack: Vec<usize> = Vec::new();

        for (i, tok) in tokens.iter().enumerate() {
            if tok.closes() {
                let Some(open) = stack.pop() else {
                    return Err(SyntaxError::new(tok.span.start, "Unexpected token"));
                };
                if !pairs(&tokens[open], tok) {
                    return Err(SyntaxError::new(tok.span.start, "Mismatched bracket"));
                }
                closer[open] = i;
                opener[i] = open;
            }
            enclosing[i] = stack.last().copied().unwrap_or(NONE);
            if tok.opens() {
                stack.push(i);
            }
        }

        if let Some(&open) = stack.last() {
            return Err(SyntaxError::new(tokens[open].span.start, "Unclosed bracket"));
        }

        Ok(Self {
            source,
            tokens,
            closer,
            opener,
            enclosing,
        })
    }

    pub fn text(&self, i: usize) -> &'a str {
        self.tokens[i].span.text(self.source)
    }

    pub fn is_word(&self, i: usize, word: &str) -> bool {
        self.tokens.get(i).is_some_and(|t| t.is_word(self.source, word))
    }

    pub fn is_punct(&self, i: usize, p: &str) -> bool {
        self.tokens.get(i).is_some_and(|t| t.is_punct(p))
    }

    fn is_eof(&self, i: usize) -> bool {
        self.tokens[i].kind == TokenKind::Eof
    }

    fn unexpected(&self, i: usize, context: &str) -> SyntaxError {
        let tok = &self.tokens[i];
        if tok.kind == TokenKind::Eof {
            SyntaxError::new(tok.span.start, format!("Unexpected end of input in {context}"))
        } else {
            SyntaxError::new(
                tok.span.start,
                format!("Unexpected token '{}' in {context}", self.text(i)),
            )
        }
    }

    /// Index after token `i`, jumping over a whole bracketed group.
    pub fn skip(&self, i: usize) -> usize {
        if !self.tokens[i].opens() {
            return i + 1;
        }
        let mut j = self.closer[i];
        // Template chunks between substitutions close one group and open the next
        while self.tokens[j].opens() {
            j = self.closer[j];
        }
        j + 1
    }

    /// Can this token end an expression?
    fn ends_expression(&self, i: usize) -> bool {
        let tok = &self.tokens[i];
        match tok.kind {
            TokenKind::Identifier => !OPERATOR_WORDS.contains(&self.text(i)),
            TokenKind::PrivateName
            | TokenKind::String(_)
            | TokenKind::Number
            | TokenKind::RegExp => true,
            TokenKind::Template { tail, .. } => tail,
            TokenKind::Punct(p) => matches!(p, ")" | "]" | "}" | "++" | "--"),
            TokenKind::Eof => false,
        }
    }

    /// Can this token continue the expression of the previous line?
    fn continues(&self, i: usize) -> bool {
        let tok = &self.tokens[i];
        match tok.kind {
            TokenKind::Punct(p) => !matches!(p, "{" | "++" | "--" | "!" | "~"),
            TokenKind::Identifier => CONTINUATION_WORDS.contains(&self.text(i)),
            TokenKind::Template { head, .. } => head,
            _ => false,
        }
    }

    /// Automatic semicolon insertion before token `i`.
    pub fn asi_break(&self, i: usize) -> bool {
        i > 0
            && self.tokens[i].newline_before
            && self.ends_expression(i - 1)
            && !self.continues(i)
    }

    /// Index after the last token of a generic statement starting at `start`.
    pub fn statement_end(&self, start: usize) -> usize {
        let mut i = start;
        loop {
            let tok = &self.tokens[i];
            if tok.kind == TokenKind::Eof || (tok.closes() && i > start) {
                return i;
            }
            if i > start && self.asi_break(i) {
                return i;
            }
            if tok.is_punct(";") {
                return i + 1;
            }
            i = self.skip(i);
        }
    }

    /// Index of the first token that is not part of the expression at `start`.
    pub fn skip_expression(&self, start: usize) -> usize {
        let mut i = start;
        loop {
            let tok = &self.tokens[i];
            if tok.kind == TokenKind::Eof || tok.is_punct(",") || tok.is_punct(";") || tok.closes() {
                return i;
            }
            if i > start && self.asi_break(i) {
                return i;
            }
            i = self.skip(i);
        }
    }

    /// Index of the `(` that starts the parameter list of the function at `k`.
    pub fn function_params(&self, k: usize) -> Option<usize> {
        let mut j = k + 1;
        if self.is_punct(j, "*") {
            j += 1;
        }
        if self.tokens[j].is_identifier() {
            j += 1;
        }
        self.is_punct(j, "(").then_some(j)
    }

    /// Index after the body of the function whose `function` keyword is at `k`.
    pub fn function_end(&self, k: usize) -> Result<usize, SyntaxError> {
        let params = self
            .function_params(k)
            .ok_or_else(|| self.unexpected(k + 1, "function declaration"))?;
        let body = self.closer[params] + 1;
        if !self.is_punct(body, "{") {
            return Err(self.unexpected(body, "function declaration"));
        }
        Ok(self.closer[body] + 1)
    }

    /// Body opener of the class whose `class` keyword is at `k`.
    pub fn class_body(&self, k: usize) -> Result<usize, SyntaxError> {
        let mut j = k + 1;
        while !self.is_punct(j, "{") {
            if self.is_eof(j) {
                return Err(self.unexpected(j, "class declaration"));
            }
            j = self.skip(j);
        }
        Ok(j)
    }

    /// Index after the body of an arrow function whose `=>` is at `k`.
    pub fn arrow_end(&self, k: usize) -> usize {
        if self.is_punct(k + 1, "{") {
            self.closer[k + 1] + 1
        } else {
            self.skip_expression(k + 1)
        }
    }

    /// Is the `(` at `p` the parameter list of a method (`name(...) { ... }`)?
    pub fn is_method_paren(&self, p: usize) -> bool {
        if !self.is_punct(p, "(") || p == 0 {
            return false;
        }
        let close = self.closer[p];
        if !self.is_punct(close + 1, "{") {
            return false;
        }
        let callee = &self.tokens[p - 1];
        match callee.kind {
            TokenKind::Identifier => !CONTROL_WORDS.contains(&self.text(p - 1)),
            TokenKind::String(_) | TokenKind::Number | TokenKind::PrivateName => true,
            TokenKind::Punct("]") => true,
            _ => false,
        }
    }

    /// Collects the names bound by the pattern at `i`; returns the index after it.
    pub fn pattern(&self, i: usize, names: &mut Vec<String>) -> Result<usize, SyntaxError> {
        let tok = &self.tokens[i];
        match tok.kind {
            TokenKind::Identifier if !is_reserved(self.text(i)) => {
                names.push(self.text(i).to_string());
                Ok(i + 1)
            }
            TokenKind::Punct("[") => {
                let close = self.closer[i];
                let mut j = i + 1;
                while j < close {
                    if self.is_punct(j, ",") {
                        j += 1;
                        continue;
                    }
                    if self.is_punct(j, "...") {
                        j += 1;
                    }
                    j = self.pattern(j, names)?;
                    if self.is_punct(j, "=") {
                        j = self.skip_expression(j + 1);
                    }
                    if j < close && !self.is_punct(j, ",") {
                        return Err(self.unexpected(j, "array pattern"));
                    }
                }
                Ok(close + 1)
            }
            TokenKind::Punct("{") => {
                let close = self.closer[i];
                let mut j = i + 1;
                while j < close {
                    if self.is_punct(j, ",") {
                        j += 1;
                        continue;
                    }
                    if self.is_punct(j, "...") {
                        j = self.pattern(j + 1, names)?;
                        continue;
                    }
                    let key = j;
                    j = self.skip(j);
                    if self.is_punct(j, ":") {
                        j = self.pattern(j + 1, names)?;
                    } else if self.tokens[key].is_identifier() {
                        names.push(self.text(key).to_string());
                    } else {
                        return Err(self.unexpected(key, "object pattern"));
                    }
                    if self.is_punct(j, "=") {
                        j = self.skip_expression(j + 1);
                    }
                }
                Ok(close + 1)
            }
            _ => Err(self.unexpected(i, "binding pattern")),
        }
    }

    /// Names bound by a parameter list opening at `p`.
    pub fn parameters(&self, p: usize) -> Result<Vec<String>, SyntaxError> {
        let close = self.closer[p];
        let mut names = Vec::new();
        let mut j = p + 1;
        while j < close {
            if self.is_punct(j, ",") || self.is_punct(j, "...") {
                j += 1;
                continue;
            }
            j = self.pattern(j, &mut names)?;
            if self.is_punct(j, "=") {
                j = self.skip_expression(j + 1);
            }
        }
        Ok(names)
    }

    /// Parses `let|const|var` declarators after the keyword at `k`.
    ///
    /// Returns the bound names, the initializer token ranges and the index
    /// after the declaration (semicolon excluded).
    pub fn declarators(
        &self,
        k: usize,
    ) -> Result<(Vec<String>, Vec<(usize, usize)>, usize), SyntaxError> {
        let mut names = Vec::new();
        let mut initializers = Vec::new();
        let mut j = k + 1;
        loop {
            j = self.pattern(j, &mut names)?;
            if self.is_punct(j, "=") {
                let end = self.skip_expression(j + 1);
                initializers.push((j + 1, end));
                j = end;
            }
            if self.is_punct(j, ",") {
                j += 1;
                continue;
            }
            return Ok((names, initializers, j));
        }
    }

    /// Is a callee-like token (call or tagged template follows)?
    fn callable(&self, i: usize) -> bool {
        let tok = &self.tokens[i];
        match tok.kind {
            TokenKind::Identifier => !OPERATOR_WORDS.contains(&self.text(i)),
            TokenKind::Punct(p) => matches!(p, ")" | "]" | "?."),
            TokenKind::Template { tail, .. } => tail,
            TokenKind::String(_) | TokenKind::PrivateName => true,
            _ => false,
        }
    }

    /// Side-effect analysis of the tokens `a..b`.
    ///
    /// Function bodies are never executed by a declaration, so they are
    /// skipped. Calls, `new`, assignments, updates, `delete`, `await`,
    /// `yield` and dynamic imports are effects; property reads are not.
    pub fn is_pure_range(&self, a: usize, b: usize) -> bool {
        let mut i = a;
        while i < b {
            let tok = &self.tokens[i];
            match &tok.kind {
                TokenKind::Identifier => match self.text(i) {
                    "function" => match self.function_end(i) {
                        Ok(end) => {
                            i = end;
                            continue;
                        }
                        Err(_) => return false,
                    },
                    "class" => {
                        let Ok(body) = self.class_body(i) else {
                            return false;
                        };
                        if !self.is_pure_class(i, body) {
                            return false;
                        }
                        i = self.closer[body] + 1;
                        continue;
                    }
                    "new" | "delete" | "await" | "yield" | "import" | "super" | "throw" => {
                        return false;
                    }
                    _ => {}
                },
                TokenKind::Punct("(") => {
                    let close = self.closer[i];
                    if self.is_punct(close + 1, "=>") {
                        i = self.arrow_end(close + 1);
                        continue;
                    }
                    if close + 1 < b && self.is_object_method(i) {
                        i = self.closer[close + 1] + 1;
                        continue;
                    }
                    if i > a && self.callable(i - 1) {
                        return false;
                    }
                }
                TokenKind::Punct("=>") => {
                    i = self.arrow_end(i);
                    continue;
                }
                TokenKind::Punct(p) if is_assignment(p) || *p == "++" || *p == "--" => {
                    return false;
                }
                TokenKind::Template { head: true, .. } if i > a && self.callable(i - 1) => {
                    return false;
                }
                _ => {}
            }
            i += 1;
        }
        true
    }

    /// Is the `(` at `p` the parameter list of a method in an object literal
    /// (`{ name() {} }`, `{ get [key]() {} }`)?
    fn is_object_method(&self, p: usize) -> bool {
        if p < 2 || !self.is_method_paren(p) {
            return false;
        }
        let open = self.enclosing[p];
        if open == NONE || !self.is_punct(open, "{") {
            return false;
        }
        let name_start = if self.is_punct(p - 1, "]") {
            self.opener[p - 1]
        } else {
            p - 1
        };
        if name_start == 0 || name_start == NONE {
            return false;
        }
        let before = name_start - 1;
        self.is_punct(before, "{")
            || self.is_punct(before, ",")
            || self.is_punct(before, "*")
            || self.is_word(before, "get")
            || self.is_word(before, "set")
            || self.is_word(before, "async")
    }

    /// A class definition is pure when its heritage and static members are.
    pub fn is_pure_class(&self, k: usize, body: usize) -> bool {
        let heritage = (k + 1..body).find(|&j| self.is_word(j, "extends"));
        if let Some(extends) = heritage {
            if !self.is_pure_range(extends + 1, body) {
                return false;
            }
        }
        let close = self.closer[body];
        let mut j = body + 1;
        while j < close {
            if self.is_word(j, "static") {
                if self.is_punct(j + 1, "{") {
                    return false;
                }
                let eq = self.skip(j + 1);
                if self.is_punct(eq, "=") {
                    let end = self.skip_expression(eq + 1);
                    if !self.is_pure_range(eq + 1, end) {
                        return false;
                    }
                }
            }
            j = self.skip(j);
        }
        true
    }

    /// Splits the module body into statements and extracts the module interface.
    pub fn parse_module(&self) -> Result<TopLevel, SyntaxError> {
        let mut top = TopLevel::default();
        let mut i = 0;
        while !self.is_eof(i) {
            let index = top.statements.len();
            let (kind, end, pure) = self.parse_statement(i, index, &mut top)?;
            if end <= i {
                return Err(self.unexpected(i, "module body"));
            }
            let span = Span::new(self.tokens[i].span.start, self.tokens[end - 1].span.end);
            top.statements.push(Statement {
                kind,
                first: i,
                end,
                span,
                pure,
                references: Vec::new(),
            });
            i = end;
        }
        Ok(top)
    }

    fn parse_statement(
        &self,
        i: usize,
        index: usize,
        top: &mut TopLevel,
    ) -> Result<(StatementKind, usize, bool), SyntaxError> {
        let tok = &self.tokens[i];

        if tok.is_punct(";") {
            return Ok((StatementKind::Directive, i + 1, true));
        }

        if let TokenKind::String(_) = tok.kind {
            let end = self.statement_end(i);
            let simple = end == i + 1 || (end == i + 2 && self.is_punct(i + 1, ";"));
            if simple {
                return Ok((StatementKind::Directive, end, true));
            }
            return Ok((StatementKind::Other, end, false));
        }

        if !tok.is_identifier() {
            return Ok((StatementKind::Other, self.statement_end(i), false));
        }

        match self.text(i) {
            "import" if !self.is_punct(i + 1, "(") && !self.is_punct(i + 1, ".") => {
                let end = self.parse_import(i, index, top)?;
                Ok((StatementKind::Import, end, true))
            }
            "export" => self.parse_export(i, index, top),
            "const" | "var" => self.parse_declaration(i, i, None, index, top),
            "let" if matches!(self.tokens[i + 1].kind, TokenKind::Identifier | TokenKind::Punct("[") | TokenKind::Punct("{")) => {
                self.parse_declaration(i, i, None, index, top)
            }
            "function" | "class" | "async" if self.declaration_keyword(i).is_some() => {
                self.parse_declaration(i, i, None, index, top)
            }
            _ => Ok((StatementKind::Other, self.statement_end(i), false)),
        }
    }

    /// `function`/`class` keyword index of a declaration starting at `i`.
    fn declaration_keyword(&self, i: usize) -> Option<usize> {
        if self.is_word(i, "function") || self.is_word(i, "class") {
            return Some(i);
        }
        (self.is_word(i, "async")
            && self.is_word(i + 1, "function")
            && !self.tokens[i + 1].newline_before)
            .then_some(i + 1)
    }

    /// Declaration at `k` (keyword) belonging to the statement starting at `start`.
    fn parse_declaration(
        &self,
        start: usize,
        k: usize,
        export_keyword: Option<Span>,
        index: usize,
        top: &mut TopLevel,
    ) -> Result<(StatementKind, usize, bool), SyntaxError> {
        let (names, mut end, pure) = match self.declaration_keyword(k) {
            Some(kw) => {
                let name_at = if self.is_word(kw, "function") && self.is_punct(kw + 1, "*") {
                    kw + 2
                } else {
                    kw + 1
                };
                if !self.tokens[name_at].is_identifier() || self.is_word(name_at, "extends") {
                    return Err(self.unexpected(name_at, "declaration"));
                }
                let name = self.text(name_at).to_string();
                if self.is_word(kw, "function") {
                    (vec![name], self.function_end(kw)?, true)
                } else {
                    let body = self.class_body(kw)?;
                    let pure = self.is_pure_class(kw, body);
                    (vec![name], self.closer[body] + 1, pure)
                }
            }
            None => {
                let (names, initializers, end) = self.declarators(k)?;
                let pure = initializers.iter().all(|&(a, b)| self.is_pure_range(a, b));
                (names, end, pure)
            }
        };
        if self.is_punct(end, ";") {
            end += 1;
        }
        debug_assert!(end > start);

        for name in &names {
            declare(top, name, index);
            if export_keyword.is_some() {
                top.exports.push(ExportEntry {
                    exported: name.clone(),
                    target: ExportTarget::Local(name.clone()),
                });
            }
        }
        Ok((StatementKind::Declaration { names, export_keyword }, end, pure))
    }

    /// Reads a module export/import name (identifier or string literal).
    fn module_name(&self, i: usize, context: &str) -> Result<String, SyntaxError> {
        match &self.tokens[i].kind {
            TokenKind::Identifier => Ok(self.text(i).to_string()),
            TokenKind::String(value) => Ok(value.clone()),
            _ => Err(self.unexpected(i, context)),
        }
    }

    fn specifier(&self, i: usize, context: &str) -> Result<String, SyntaxError> {
        match &self.tokens[i].kind {
            TokenKind::String(value) => Ok(value.clone()),
            _ => Err(self.unexpected(i, context)),
        }
    }

    /// Skips import attributes and the terminating semicolon.
    fn finish_module_request(&self, mut j: usize) -> usize {
        if (self.is_word(j, "with") || self.is_word(j, "assert"))
            && !self.tokens[j].newline_before
            && self.is_punct(j + 1, "{")
        {
            j = self.closer[j + 1] + 1;
        }
        if self.is_punct(j, ";") {
            j += 1;
        }
        j
    }

    fn parse_import(&self, i: usize, index: usize, top: &mut TopLevel) -> Result<usize, SyntaxError> {
        const CONTEXT: &str = "import declaration";
        let mut j = i + 1;
        let mut bindings = Vec::new();

        if let TokenKind::String(_) = self.tokens[j].kind {
            let specifier = self.specifier(j, CONTEXT)?;
            top.imports.push(ImportRecord {
                specifier,
                kind: RecordKind::Import,
                statement: index,
                bindings,
            });
            return Ok(self.finish_module_request(j + 1));
        }

        if self.tokens[j].is_identifier() && (self.is_punct(j + 1, ",") || self.is_word(j + 1, "from")) {
            bindings.push(ImportBinding {
                local: self.text(j).to_string(),
                imported: Imported::Named("default".to_string()),
            });
            j += 1;
            if self.is_punct(j, ",") {
                j += 1;
            }
        }

        if self.is_punct(j, "*") {
            if !self.is_word(j + 1, "as") || !self.tokens[j + 2].is_identifier() {
                return Err(self.unexpected(j + 1, CONTEXT));
            }
            bindings.push(ImportBinding {
                local: self.text(j + 2).to_string(),
                imported: Imported::Namespace,
            });
            j += 3;
        } else if self.is_punct(j, "{") {
            let close = self.closer[j];
            let mut k = j + 1;
            while k < close {
                let imported = self.module_name(k, CONTEXT)?;
                let local = if self.is_word(k + 1, "as") {
                    if !self.tokens[k + 2].is_identifier() {
                        return Err(self.unexpected(k + 2, CONTEXT));
                    }
                    k += 3;
                    self.text(k - 1).to_string()
                } else {
                    k += 1;
                    imported.clone()
                };
                bindings.push(ImportBinding {
                    local,
                    imported: Imported::Named(imported),
                });
                if self.is_punct(k, ",") {
                    k += 1;
                } else if k < close {
                    return Err(self.unexpected(k, CONTEXT));
                }
            }
            j = close + 1;
        }

        if bindings.is_empty() || !self.is_word(j, "from") {
            return Err(self.unexpected(j, CONTEXT));
        }
        let specifier = self.specifier(j + 1, CONTEXT)?;

        let record = top.imports.len();
        for binding in &bindings {
            top.bindings.insert(
                binding.local.clone(),
                Binding::Imported {
                    record,
                    imported: binding.imported.clone(),
                },
            );
        }
        top.imports.push(ImportRecord {
            specifier,
            kind: RecordKind::Import,
            statement: index,
            bindings,
        });
        Ok(self.finish_module_request(j + 2))
    }

    fn parse_export(
        &self,
        i: usize,
        index: usize,
        top: &mut TopLevel,
    ) -> Result<(StatementKind, usize, bool), SyntaxError> {
        const CONTEXT: &str = "export declaration";
        let j = i + 1;
        let start = self.tokens[i].span.start;

        if self.is_word(j, "default") {
            let k = j + 1;
            let prefix = Span::new(start, self.tokens[k].span.start);
            if let Some(kw) = self.declaration_keyword(k) {
                let is_function = self.is_word(kw, "function");
                let mut name_at = kw + 1;
                if is_function && self.is_punct(name_at, "*") {
                    name_at += 1;
                }
                let named = self.tokens[name_at].is_identifier()
                    && !self.is_word(name_at, "extends");
                let (mut end, pure) = if is_function {
                    (self.function_end(kw)?, true)
                } else {
                    let body = self.class_body(kw)?;
                    (self.closer[body] + 1, self.is_pure_class(kw, body))
                };
                if self.is_punct(end, ";") {
                    end += 1;
                }
                let local = if named {
                    self.text(name_at).to_string()
                } else {
                    DEFAULT_LOCAL.to_string()
                };
                declare(top, &local, index);
                top.exports.push(ExportEntry {
                    exported: "default".to_string(),
                    target: ExportTarget::Local(local.clone()),
                });
                let name_insert = self.tokens[name_at - 1].span.end;
                return Ok((
                    StatementKind::DefaultDeclaration {
                        prefix,
                        name: named.then_some(local),
                        name_insert,
                    },
                    end,
                    pure,
                ));
            }

            let end = self.statement_end(k);
            if end <= k {
                return Err(self.unexpected(k, CONTEXT));
            }
            let semicolon = self.is_punct(end - 1, ";");
            let expr_end = if semicolon { end - 1 } else { end };
            let pure = self.is_pure_range(k, expr_end);
            declare(top, DEFAULT_LOCAL, index);
            top.exports.push(ExportEntry {
                exported: "default".to_string(),
                target: ExportTarget::Local(DEFAULT_LOCAL.to_string()),
            });
            return Ok((StatementKind::DefaultExpression { prefix, semicolon }, end, pure));
        }

        if self.is_punct(j, "*") {
            let record = top.imports.len();
            if self.is_word(j + 1, "as") {
                let exported = self.module_name(j + 2, CONTEXT)?;
                if !self.is_word(j + 3, "from") {
                    return Err(self.unexpected(j + 3, CONTEXT));
                }
                let specifier = self.specifier(j + 4, CONTEXT)?;
                top.imports.push(ImportRecord {
                    specifier,
                    kind: RecordKind::ReExport,
                    statement: index,
                    bindings: Vec::new(),
                });
                top.exports.push(ExportEntry {
                    exported,
                    target: ExportTarget::ReExport {
                        record,
                        imported: Imported::Namespace,
                    },
                });
                return Ok((StatementKind::ExportFrom, self.finish_module_request(j + 5), true));
            }
            if !self.is_word(j + 1, "from") {
                return Err(self.unexpected(j + 1, CONTEXT));
            }
            let specifier = self.specifier(j + 2, CONTEXT)?;
            top.imports.push(ImportRecord {
                specifier,
                kind: RecordKind::Star,
                statement: index,
                bindings: Vec::new(),
            });
            top.star_exports.push(record);
            return Ok((StatementKind::ExportFrom, self.finish_module_request(j + 3), true));
        }

        if self.is_punct(j, "{") {
            let close = self.closer[j];
            let mut pairs = Vec::new();
            let mut k = j + 1;
            while k < close {
                let local = self.module_name(k, CONTEXT)?;
                let exported = if self.is_word(k + 1, "as") {
                    k += 3;
                    self.module_name(k - 1, CONTEXT)?
                } else {
                    k += 1;
                    local.clone()
                };
                pairs.push((local, exported));
                if self.is_punct(k, ",") {
                    k += 1;
                } else if k < close {
                    return Err(self.unexpected(k, CONTEXT));
                }
            }

            if self.is_word(close + 1, "from") {
                let specifier = self.specifier(close + 2, CONTEXT)?;
                let record = top.imports.len();
                top.imports.push(ImportRecord {
                    specifier,
                    kind: RecordKind::ReExport,
                    statement: index,
                    bindings: Vec::new(),
                });
                for (imported, exported) in pairs {
                    top.exports.push(ExportEntry {
                        exported,
                        target: ExportTarget::ReExport {
                            record,
                            imported: Imported::Named(imported),
                        },
                    });
                }
                return Ok((StatementKind::ExportFrom, self.finish_module_request(close + 3), true));
            }

            for (local, exported) in pairs {
                top.exports.push(ExportEntry {
                    exported,
                    target: ExportTarget::Local(local),
                });
            }
            let end = if self.is_punct(close + 1, ";") { close + 2 } else { close + 1 };
            return Ok((StatementKind::ExportList, end, true));
        }

        let keyword = Some(Span::new(start, self.tokens[j].span.start));
        match self.text(j) {
            "const" | "let" | "var" => self.parse_declaration(i, j, keyword, index, top),
            "function" | "class" | "async" if self.declaration_keyword(j).is_some() => {
                self.parse_declaration(i, j, keyword, index, top)
            }
            _ => Err(self.unexpected(j, CONTEXT)),
        }
    }
}

fn declare(top: &mut TopLevel, name: &str, statement: usize) {
    match top.bindings.get_mut(name) {
        Some(Binding::Declared(statements)) => statements.push(statement),
        _ => {
            top.bindings
                .insert(name.to_string(), Binding::Declared(vec![statement]));
        }
    }
}

fn pairs(open: &Token, close: &Token) -> bool {
    match (&open.kind, &close.kind) {
        (TokenKind::Punct("{"), TokenKind::Punct("}"))
        | (TokenKind::Punct("("), TokenKind::Punct(")"))
        | (TokenKind::Punct("["), TokenKind::Punct("]")) => true,
        (TokenKind::Template { .. }, TokenKind::Template { .. }) => true,
        _ => false,
    }
}

/// Assignment operators.
pub(super) fn is_assignment(p: &str) -> bool {
    matches!(
        p,
        "=" | "+=" | "-=" | "*=" | "/=" | "%=" | "**=" | "<<=" | ">>=" | ">>>=" | "&=" | "|="
            | "^=" | "&&=" | "||=" | "??="
    )
}
