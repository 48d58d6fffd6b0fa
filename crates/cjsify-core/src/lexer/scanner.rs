//! The scanner that produces tokens from module source text.

use super::{Span, Token, TokenKind};
use unicode_xid::UnicodeXID;

/// Punctuators, longest first so the greedy match picks the right one.
const PUNCTUATORS: &[&str] = &[
    ">>>=", "...", "===", "!==", "**=", "<<=", ">>=", ">>>", "&&=", "||=", "??=", "=>", "==",
    "!=", "<=", ">=", "&&", "||", "??", "?.", "++", "--", "+=", "-=", "*=", "%=", "&=", "|=",
    "^=", "**", "<<", ">>", "{", "}", "(", ")", "[", "]", ";", ",", "<", ">", "+", "-", "*", "%",
    "&", "|", "^", "!", "~", "?", ":", "=", ".", "@",
];

/// Keywords after which a `/` starts a regular expression.
const REGEX_AFTER: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case", "do",
    "else", "yield", "await",
];

/// A lexical error at a byte offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    /// Byte offset of the offending character
    pub offset: usize,
    /// Description
    pub message: String,
}

impl LexError {
    fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Open {
    Brace,
    Substitution,
}

/// A scanner that tokenizes ES module source code.
pub struct Scanner<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    current_pos: usize,
    braces: Vec<Open>,
    previous: Option<(TokenKind, Span)>,
}

impl<'a> Scanner<'a> {
    /// Creates a new scanner for the given source code.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            current_pos: 0,
            braces: Vec::new(),
            previous: None,
        }
    }

    /// Tokenizes the whole input. The last token is always `Eof`.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    /// Returns the next token from the source.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        let newline_before = self.skip_whitespace_and_comments()?;
        let start = self.current_pos;

        let Some((_, ch)) = self.advance() else {
            if let Some(open) = self.braces.last() {
                let what = match open {
                    Open::Brace => "Unclosed '{'",
                    Open::Substitution => "Unterminated template literal",
                };
                return Err(LexError::new(start, what));
            }
            return Ok(Token::new(TokenKind::Eof, Span::new(start, start), newline_before));
        };

        let kind = match ch {
            '"' | '\'' => self.scan_string(ch, start)?,
            '`' => self.scan_template(true, start)?,
            '}' => match self.braces.pop() {
                Some(Open::Substitution) => self.scan_template(false, start)?,
                Some(Open::Brace) => TokenKind::Punct("}"),
                None => return Err(LexError::new(start, "Unexpected '}'")),
            },
            '{' => {
                self.braces.push(Open::Brace);
                TokenKind::Punct("{")
            }
            '0'..='9' => self.scan_number(),
            '.' if self.peek().is_some_and(|c| c.is_ascii_digit()) => self.scan_number(),
            '/' if self.regex_allowed() => self.scan_regex(start)?,
            '/' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::Punct("/=")
                } else {
                    TokenKind::Punct("/")
                }
            }
            '#' => {
                self.scan_identifier_rest();
                TokenKind::PrivateName
            }
            _ if is_id_start(ch) => {
                self.scan_identifier_rest();
                TokenKind::Identifier
            }
            _ => self.scan_punctuator(start)?,
        };

        let span = Span::new(start, self.current_pos);
        self.previous = Some((kind.clone(), span));
        Ok(Token::new(kind, span, newline_before))
    }

    fn advance(&mut self) -> Option<(usize, char)> {
        let result = self.chars.next();
        if let Some((pos, ch)) = result {
            self.current_pos = pos + ch.len_utf8();
        }
        result
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, ch)| *ch)
    }

    fn peek_next(&self) -> Option<char> {
        let mut iter = self.chars.clone();
        iter.next();
        iter.next().map(|(_, ch)| ch)
    }

    /// Skips trivia, reporting whether a line terminator was crossed.
    fn skip_whitespace_and_comments(&mut self) -> Result<bool, LexError> {
        let mut newline = false;
        loop {
            match self.peek() {
                Some(ch) if is_line_terminator(ch) => {
                    newline = true;
                    self.advance();
                }
                Some(ch) if ch.is_whitespace() || ch == '\u{feff}' => {
                    self.advance();
                }
                Some('/') => match self.peek_next() {
                    Some('/') => {
                        while let Some(ch) = self.peek() {
                            if is_line_terminator(ch) {
                                break;
                            }
                            self.advance();
                        }
                    }
                    Some('*') => {
                        let start = self.current_pos;
                        self.advance();
                        self.advance();
                        let mut prev = ' ';
                        loop {
                            let Some((_, ch)) = self.advance() else {
                                return Err(LexError::new(start, "Unterminated comment"));
                            };
                            if is_line_terminator(ch) {
                                newline = true;
                            }
                            if prev == '*' && ch == '/' {
                                break;
                            }
                            prev = ch;
                        }
                    }
                    _ => break,
                },
                // Hashbang
                Some('#') if self.current_pos == 0 && self.peek_next() == Some('!') => {
                    while let Some(ch) = self.peek() {
                        if is_line_terminator(ch) {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
        Ok(newline)
    }

    /// Decides between division and a regular expression from the previous token.
    fn regex_allowed(&self) -> bool {
        let Some((kind, span)) = &self.previous else {
            return true;
        };
        match kind {
            TokenKind::Identifier => REGEX_AFTER.contains(&span.text(self.source)),
            TokenKind::Punct(p) => !matches!(*p, ")" | "]" | "++" | "--"),
            TokenKind::Template { tail, .. } => !tail,
            _ => false,
        }
    }

    fn scan_string(&mut self, quote: char, start: usize) -> Result<TokenKind, LexError> {
        let mut value = String::new();
        loop {
            let Some((_, ch)) = self.advance() else {
                return Err(LexError::new(start, "Unterminated string literal"));
            };
            match ch {
                c if c == quote => return Ok(TokenKind::String(value)),
                '\\' => {
                    let Some((_, esc)) = self.advance() else {
                        return Err(LexError::new(start, "Unterminated string literal"));
                    };
                    match esc {
                        'n' => value.push('\n'),
                        't' => value.push('\t'),
                        'r' => value.push('\r'),
                        'b' => value.push('\u{8}'),
                        'f' => value.push('\u{c}'),
                        'v' => value.push('\u{b}'),
                        '0' => value.push('\0'),
                        '\r' => {
                            if self.peek() == Some('\n') {
                                self.advance();
                            }
                        }
                        c if is_line_terminator(c) => {}
                        c => value.push(c),
                    }
                }
                c if c == '\n' || c == '\r' => {
                    return Err(LexError::new(start, "Unterminated string literal"));
                }
                c => value.push(c),
            }
        }
    }

    fn scan_template(&mut self, head: bool, start: usize) -> Result<TokenKind, LexError> {
        loop {
            let Some((_, ch)) = self.advance() else {
                return Err(LexError::new(start, "Unterminated template literal"));
            };
            match ch {
                '`' => return Ok(TokenKind::Template { head, tail: true }),
                '\\' => {
                    self.advance();
                }
                '$' if self.peek() == Some('{') => {
                    self.advance();
                    self.braces.push(Open::Substitution);
                    return Ok(TokenKind::Template { head, tail: false });
                }
                _ => {}
            }
        }
    }

    fn scan_regex(&mut self, start: usize) -> Result<TokenKind, LexError> {
        let mut in_class = false;
        loop {
            let Some((_, ch)) = self.advance() else {
                return Err(LexError::new(start, "Unterminated regular expression"));
            };
            match ch {
                '\\' => {
                    if self.advance().is_none_or(|(_, c)| is_line_terminator(c)) {
                        return Err(LexError::new(start, "Unterminated regular expression"));
                    }
                }
                '[' => in_class = true,
                ']' => in_class = false,
                '/' if !in_class => break,
                c if is_line_terminator(c) => {
                    return Err(LexError::new(start, "Unterminated regular expression"));
                }
                _ => {}
            }
        }
        self.scan_identifier_rest();
        Ok(TokenKind::RegExp)
    }

    fn scan_number(&mut self) -> TokenKind {
        let mut prev = ' ';
        while let Some(ch) = self.peek() {
            let exponent_sign = (ch == '+' || ch == '-') && matches!(prev, 'e' | 'E');
            if ch.is_ascii_alphanumeric() || ch == '_' || ch == '.' || exponent_sign {
                // `1..toString()` style member access
                if ch == '.' && prev == '.' {
                    break;
                }
                prev = ch;
                self.advance();
            } else {
                break;
            }
        }
        TokenKind::Number
    }

    fn scan_identifier_rest(&mut self) {
        while let Some(ch) = self.peek() {
            if is_id_continue(ch) {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn scan_punctuator(&mut self, start: usize) -> Result<TokenKind, LexError> {
        let rest = &self.source[start..];
        let Some(punct) = PUNCTUATORS.iter().find(|p| rest.starts_with(**p)) else {
            let ch = rest.chars().next().unwrap_or_default();
            return Err(LexError::new(start, format!("Unexpected character '{ch}'")));
        };
        // `a?.5:b` is a conditional, not optional chaining
        let punct = if *punct == "?." && rest[2..].starts_with(|c: char| c.is_ascii_digit()) {
            "?"
        } else {
            *punct
        };
        for _ in 1..punct.len() {
            self.advance();
        }
        Ok(TokenKind::Punct(punct))
    }
}

/// Convenience wrapper around [`Scanner::tokenize`].
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Scanner::new(source).tokenize()
}

fn is_line_terminator(ch: char) -> bool {
    matches!(ch, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

fn is_id_start(ch: char) -> bool {
    ch == '$' || ch == '_' || ch == '\\' || ch.is_xid_start()
}

fn is_id_continue(ch: char) -> bool {
    ch == '$' || ch == '_' || ch == '\\' || ch == '\u{200c}' || ch == '\u{200d}' || ch.is_xid_continue()
}
