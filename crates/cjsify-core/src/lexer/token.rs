//! Token definitions for the module lexer.

/// A span in the source code, representing a range of bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Start byte offset (inclusive)
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
}

impl Span {
    /// Creates a new span.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Returns the source text covered by this span.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }
}

/// The token classes the converter distinguishes.
///
/// Keywords are reported as identifiers; the syntax layer decides from
/// context whether `from`, `as` or `default` act as keywords.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier or keyword
    Identifier,
    /// Private class member name (`#name`)
    PrivateName,
    /// String literal with its cooked value
    String(String),
    /// Template literal chunk
    Template {
        /// Chunk starts with a backtick (otherwise with `}`)
        head: bool,
        /// Chunk ends with a backtick (otherwise with `${`)
        tail: bool,
    },
    /// Numeric or BigInt literal
    Number,
    /// Regular expression literal
    RegExp,
    /// Punctuator or operator
    Punct(&'static str),
    /// End of input
    Eof,
}

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// The span in the source code
    pub span: Span,
    /// A line terminator precedes this token
    pub newline_before: bool,
}

impl Token {
    /// Creates a new token.
    pub fn new(kind: TokenKind, span: Span, newline_before: bool) -> Self {
        Self {
            kind,
            span,
            newline_before,
        }
    }

    /// Is this the punctuator `p`?
    pub fn is_punct(&self, p: &str) -> bool {
        matches!(self.kind, TokenKind::Punct(q) if q == p)
    }

    /// Is this the identifier or keyword `word`?
    pub fn is_word(&self, source: &str, word: &str) -> bool {
        self.kind == TokenKind::Identifier && self.span.text(source) == word
    }

    /// Is this an identifier or keyword?
    pub fn is_identifier(&self) -> bool {
        self.kind == TokenKind::Identifier
    }

    /// Does this token open a bracket (or a template substitution)?
    pub fn opens(&self) -> bool {
        match self.kind {
            TokenKind::Punct(p) => matches!(p, "{" | "(" | "["),
            TokenKind::Template { tail, .. } => !tail,
            _ => false,
        }
    }

    /// Does this token close a bracket (or a template substitution)?
    pub fn closes(&self) -> bool {
        match self.kind {
            TokenKind::Punct(p) => matches!(p, "}" | ")" | "]"),
            TokenKind::Template { head, .. } => !head,
            _ => false,
        }
    }
}

/// Reserved words that can never name a binding.
pub const RESERVED_WORDS: &[&str] = &[
    "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for", "function",
    "if", "import", "in", "instanceof", "new", "null", "return", "super", "switch", "this",
    "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

/// Returns true if `word` is a reserved word.
pub fn is_reserved(word: &str) -> bool {
    RESERVED_WORDS.contains(&word)
}
