//! aclc-lex - Lexical analysis for Accele modules.
//!
//! Converts the character buffer of one module into a stream of [`Token`]s:
//!
//! - [`cursor`] - a byte cursor tracking 1-based line/column positions,
//!   counting `\r`, `\n`, and `\r\n` as exactly one line each.
//! - [`token`] - [`TokenKind`] with the fixed keyword, symbol, and meta-tag
//!   tables, and the [`Token`] value record. String tokens carry a map from
//!   byte offsets within their decoded text to captured interpolation source.
//! - [`lexer`] - the [`Lexer`] itself: greedy longest-match symbols with
//!   putback, keyword/`?`/`!` composition (`try?`, `as!`, ...), all numeric
//!   literal sub-forms, strings with escape decoding and brace-balanced
//!   interpolation capture, `@` meta tags, and comments. Lexical errors are
//!   reported once to the shared diagnostics handler, the input is skipped to
//!   the next recovery sentinel, and a synthetic NL token is produced so the
//!   parser can resume at a statement boundary.
//! - [`relexer`] - splits a compound token (`>>`, `?.`, `...`) into shorter
//!   tokens when the parser needs finer granularity; concatenating the split
//!   texts always reproduces the original text.

pub mod cursor;
pub mod lexer;
pub mod relexer;
pub mod token;

pub use cursor::Cursor;
pub use lexer::Lexer;
pub use relexer::Relexer;
pub use token::{Token, TokenKind};
