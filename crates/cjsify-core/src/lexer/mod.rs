//! Lexical analysis for ES module source text.
//!
//! The converter never evaluates code, so the lexer only has to be precise
//! about token boundaries: strings, template literals (including nested
//! substitutions), regular expressions and comments must never be mistaken
//! for code. Keywords are left as identifiers.
//!
//! ```rust
//! use cjsify_core::lexer::{tokenize, TokenKind};
//!
//! let tokens = tokenize("import fs from 'fs';").unwrap();
//! assert_eq!(tokens[3].kind, TokenKind::String("fs".to_string()));
//! ```

mod scanner;
mod token;

pub use scanner::{tokenize, LexError, Scanner};
pub use token::{is_reserved, Span, Token, TokenKind, RESERVED_WORDS};
