//! Context-sensitive token splitting.
//!
//! The lexer's greedy longest match sometimes produces a token that is too
//! coarse for the parser's context: `>>` while closing nested generics, `?.`
//! where a type suffix `?` is followed by an access `.`, or `..`/`...` in a
//! parent-relative import path. The [`Relexer`] splits such a token into an
//! ordered sequence of shorter tokens whose concatenated text equals the
//! original; the parser then replaces the token in its look-ahead buffer with
//! the split.

use crate::token::{symbol_kind, Token};

/// Splits one compound symbol token into shorter tokens.
pub struct Relexer<'a> {
    original: &'a Token,
}

impl<'a> Relexer<'a> {
    /// Create a relexer for `original`.
    pub fn new(original: &'a Token) -> Self {
        Self { original }
    }

    /// Produce the split, or an empty vector when the token cannot be split
    /// (single-character tokens, non-symbol tokens). The first piece is the
    /// one-character prefix; the remainder is re-lexed greedily.
    pub fn relex(&self) -> Vec<Token> {
        let text = &self.original.text;
        if text.chars().count() < 2 {
            return Vec::new();
        }

        let mut pieces = Vec::new();
        let mut rest = text.as_str();
        let mut col = self.original.meta.col;

        // Force the first piece down to a single character; the parser asked
        // for a relex precisely because the greedy match was too long.
        let first_len = match self.split_prefix(rest, 1) {
            Some(len) => len,
            None => return Vec::new(),
        };
        self.push_piece(&mut pieces, rest, first_len, &mut col);
        rest = &rest[first_len..];

        while !rest.is_empty() {
            let len = match self.split_prefix(rest, rest.len()) {
                Some(len) => len,
                None => return Vec::new(),
            };
            self.push_piece(&mut pieces, rest, len, &mut col);
            rest = &rest[len..];
        }

        pieces
    }

    /// Length of the longest valid symbol prefix of `text`, capped at `max`.
    fn split_prefix(&self, text: &str, max: usize) -> Option<usize> {
        let mut len = max.min(text.len());
        while len > 0 {
            if text.is_char_boundary(len) && symbol_kind(&text[..len]).is_some() {
                return Some(len);
            }
            len -= 1;
        }
        None
    }

    fn push_piece(&self, pieces: &mut Vec<Token>, text: &str, len: usize, col: &mut u32) {
        let piece = &text[..len];
        let kind = symbol_kind(piece).expect("split prefix is a valid symbol");
        let mut meta = self.original.meta;
        meta.col = *col;
        pieces.push(Token::new(kind, piece, meta));
        *col += len as u32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind;
    use aclc_util::span::SourceMeta;

    fn sym(text: &str) -> Token {
        Token::new(
            symbol_kind(text).expect("valid symbol"),
            text,
            SourceMeta::new(Default::default(), 1, 10),
        )
    }

    fn relex(text: &str) -> Vec<Token> {
        Relexer::new(&sym(text)).relex()
    }

    #[test]
    fn test_shift_assign_split() {
        // S2: `>>=` where the parser expects `>` yields `>` then `>=`.
        let pieces = relex(">>=");
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].kind, TokenKind::Gt);
        assert_eq!(pieces[0].text, ">");
        assert_eq!(pieces[1].kind, TokenKind::GtEquals);
        assert_eq!(pieces[1].text, ">=");
    }

    #[test]
    fn test_round_trip_property() {
        for text in [">>", ">>=", "??", "?.", "**", "**=", "..", "...", "<=>"] {
            let pieces = relex(text);
            assert!(!pieces.is_empty(), "{:?} should split", text);
            let joined: String = pieces.iter().map(|t| t.text.as_str()).collect();
            assert_eq!(joined, text);
        }
    }

    #[test]
    fn test_columns_advance_across_pieces() {
        let pieces = relex("?.");
        assert_eq!(pieces[0].meta.col, 10);
        assert_eq!(pieces[1].meta.col, 11);
        assert_eq!(pieces[0].meta.line, 1);
    }

    #[test]
    fn test_single_char_token_does_not_split() {
        assert!(relex(">").is_empty());
    }

    #[test]
    fn test_non_symbol_token_does_not_split() {
        let t = Token::new(TokenKind::Id, "abc", SourceMeta::DUMMY);
        assert!(Relexer::new(&t).relex().is_empty());
    }

    #[test]
    fn test_triple_dot_splits_into_dot_then_double_dot() {
        let pieces = relex("...");
        assert_eq!(pieces[0].kind, TokenKind::Dot);
        assert_eq!(pieces[1].kind, TokenKind::DoubleDot);
    }
}
