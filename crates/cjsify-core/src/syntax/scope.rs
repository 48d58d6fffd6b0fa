//! Nested scopes and reference classification.
//!
//! Only module-level names matter to the converter, so scopes record which
//! names they shadow and nothing else.

use super::parser::{is_assignment, Parser, CONTROL_WORDS, NONE};
use crate::lexer::{is_reserved, TokenKind};
use rustc_hash::{FxHashMap, FxHashSet};

/// Modifier words that may precede a class or object member name.
const MODIFIERS: &[&str] = &["get", "set", "static", "async"];

#[derive(Debug)]
struct Scope {
    start: usize,
    end: usize,
    names: FxHashSet<String>,
}

/// Every nested scope of a module with the names it declares.
pub(super) struct Scopes {
    scopes: Vec<Scope>,
    /// Block opener index -> scope index
    blocks: FxHashMap<usize, usize>,
    /// Openers of class bodies
    class_bodies: FxHashSet<usize>,
}

impl Scopes {
    pub fn build(parser: &Parser<'_>) -> Self {
        let mut this = Self {
            scopes: Vec::new(),
            blocks: FxHashMap::default(),
            class_bodies: FxHashSet::default(),
        };
        let tokens = parser.tokens;

        for (i, tok) in tokens.iter().enumerate() {
            if tok.is_punct("{") {
                let index = this.push(i, parser.closer[i], Vec::new());
                this.blocks.insert(i, index);
            }
        }

        let mut function_parens = FxHashSet::default();
        for i in 0..tokens.len() {
            let tok = &tokens[i];
            match tok.kind {
                TokenKind::Identifier => match parser.text(i) {
                    "function" => {
                        let Some(p) = parser.function_params(i) else {
                            continue;
                        };
                        function_parens.insert(p);
                        let body = parser.closer[p] + 1;
                        if !parser.is_punct(body, "{") {
                            continue;
                        }
                        let mut names = parser.parameters(p).unwrap_or_default();
                        let name_at = if parser.is_punct(i + 1, "*") { i + 2 } else { i + 1 };
                        if name_at < p {
                            let name = parser.text(name_at).to_string();
                            if statement_position(parser, i) {
                                this.declare_in_block(parser, i, name);
                            } else {
                                names.push(name);
                            }
                        }
                        this.push(p, parser.closer[body], names);
                    }
                    "class" => {
                        let Ok(body) = parser.class_body(i) else {
                            continue;
                        };
                        this.class_bodies.insert(body);
                        let named = tokens[i + 1].is_identifier() && !parser.is_word(i + 1, "extends");
                        if named {
                            let name = parser.text(i + 1).to_string();
                            if statement_position(parser, i) {
                                this.declare_in_block(parser, i, name);
                            } else {
                                this.push(body, parser.closer[body], vec![name]);
                            }
                        }
                    }
                    "let" | "const" | "var" => {
                        let declares = matches!(
                            tokens[i + 1].kind,
                            TokenKind::Identifier | TokenKind::Punct("[") | TokenKind::Punct("{")
                        );
                        if !declares || (i > 0 && parser.is_punct(i - 1, ".")) {
                            continue;
                        }
                        if let Ok((names, _, _)) = parser.declarators(i) {
                            for name in names {
                                this.declare_in_block(parser, i, name);
                            }
                        }
                    }
                    _ => {}
                },
                TokenKind::Punct("=>") if i > 0 => {
                    let end = parser.arrow_end(i).saturating_sub(1);
                    let prev = i - 1;
                    if tokens[prev].is_punct(")") {
                        let p = parser.opener[prev];
                        let names = parser.parameters(p).unwrap_or_default();
                        this.push(p, end, names);
                    } else if tokens[prev].is_identifier() {
                        this.push(prev, end, vec![parser.text(prev).to_string()]);
                    }
                }
                _ => {}
            }
        }

        // Methods and catch clauses: `name(params) { body }`
        for p in 0..tokens.len() {
            if function_parens.contains(&p) || !tokens[p].is_punct("(") || p == 0 {
                continue;
            }
            let body = parser.closer[p] + 1;
            if !parser.is_punct(body, "{") {
                continue;
            }
            let catch = parser.is_word(p - 1, "catch");
            if catch || parser.is_method_paren(p) {
                let names = parser.parameters(p).unwrap_or_default();
                this.push(p, parser.closer[body], names);
            }
        }

        this
    }

    fn push(&mut self, start: usize, end: usize, names: Vec<String>) -> usize {
        self.scopes.push(Scope {
            start,
            end,
            names: names.into_iter().collect(),
        });
        self.scopes.len() - 1
    }

    /// Declares `name` in the innermost block around token `i`.
    ///
    /// Nothing happens at module level: those names are module bindings.
    fn declare_in_block(&mut self, parser: &Parser<'_>, i: usize, name: String) {
        let mut open = parser.enclosing[i];
        while open != NONE {
            if let Some(&index) = self.blocks.get(&open) {
                self.scopes[index].names.insert(name);
                return;
            }
            open = parser.enclosing[open];
        }
    }

    /// Is `name` at token `i` bound by a nested scope?
    pub fn shadowed(&self, i: usize, name: &str) -> bool {
        self.scopes
            .iter()
            .any(|s| s.start <= i && i <= s.end && s.names.contains(name))
    }

    /// Is the brace at `open` the body of a class?
    pub fn is_class_body(&self, open: usize) -> bool {
        self.class_bodies.contains(&open)
    }
}

/// Is the declaration keyword at `i` at the start of a statement?
fn statement_position(parser: &Parser<'_>, mut i: usize) -> bool {
    if i > 0 && parser.is_word(i - 1, "async") {
        i -= 1;
    }
    if i == 0 {
        return true;
    }
    let prev = &parser.tokens[i - 1];
    match prev.kind {
        TokenKind::Punct(p) => matches!(p, ";" | "{" | "}"),
        TokenKind::Identifier => {
            matches!(parser.text(i - 1), "default" | "export" | "else") || parser.asi_break(i)
        }
        _ => parser.asi_break(i),
    }
}

/// Can the identifier at `t` refer to a binding (rather than naming a property)?
pub(super) fn reference_position(parser: &Parser<'_>, scopes: &Scopes, t: usize) -> bool {
    let text = parser.text(t);
    if is_reserved(text) || t + 1 >= parser.tokens.len() {
        return false;
    }
    let next = &parser.tokens[t + 1];

    if t > 0 {
        let prev = &parser.tokens[t - 1];
        if prev.is_punct(".") || prev.is_punct("?.") {
            return false;
        }
        if matches!(parser.text(t - 1), "function" | "class" | "break" | "continue") && prev.is_identifier() {
            return false;
        }
        if prev.is_punct("*") && t > 1 && parser.is_word(t - 2, "function") {
            return false;
        }
        if next.is_punct(":") && (prev.is_punct("{") || prev.is_punct(",")) {
            return false;
        }
        let open = parser.enclosing[t];
        if open != NONE && scopes.is_class_body(open) {
            let member_start = prev.is_punct("{")
                || prev.is_punct(";")
                || prev.is_punct("}")
                || prev.is_punct("*")
                || (prev.is_identifier() && MODIFIERS.contains(&parser.text(t - 1)));
            if member_start {
                return false;
            }
        }
    }

    if next.is_punct("(") && parser.is_method_paren(t + 1) && !CONTROL_WORDS.contains(&text) {
        return false;
    }

    if MODIFIERS.contains(&text) && !next.newline_before {
        let modifies = match next.kind {
            TokenKind::Identifier
            | TokenKind::PrivateName
            | TokenKind::String(_)
            | TokenKind::Number => true,
            TokenKind::Punct(p) => p == "[" || p == "*",
            _ => false,
        };
        if modifies {
            return false;
        }
    }

    true
}

/// Is the reference at `t` written to (`x = 1`, `x += 1`, `x++`, `--x`)?
pub(super) fn assignment_target(parser: &Parser<'_>, t: usize) -> bool {
    let next = &parser.tokens[t + 1];
    if let TokenKind::Punct(p) = next.kind {
        if is_assignment(p) {
            return true;
        }
        if (p == "++" || p == "--") && !next.newline_before {
            return true;
        }
    }
    t > 0 && (parser.is_punct(t - 1, "++") || parser.is_punct(t - 1, "--"))
}

/// Is the reference at `t` a shorthand property (`{ name }`)?
pub(super) fn shorthand_position(parser: &Parser<'_>, scopes: &Scopes, t: usize) -> bool {
    if t == 0 {
        return false;
    }
    let open = parser.enclosing[t];
    if open == NONE || !parser.is_punct(open, "{") || scopes.is_class_body(open) {
        return false;
    }
    let prev = &parser.tokens[t - 1];
    let next = &parser.tokens[t + 1];
    (prev.is_punct("{") || prev.is_punct(","))
        && (next.is_punct("}") || next.is_punct(","))
}
