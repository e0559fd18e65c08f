//! Property tests for the lexer and relexer.

use aclc_lex::{Lexer, Relexer, Token, TokenKind};
use aclc_util::span::ModuleId;
use aclc_util::Handler;
use proptest::prelude::*;

fn lex_to_eof(source: &str) -> Vec<Token> {
    let handler = Handler::new();
    let mut lexer = Lexer::new(ModuleId(0), source, &handler);
    let mut tokens = Vec::new();
    // Generous bound: every call must consume input or return EOF.
    for _ in 0..source.len() * 2 + 16 {
        let t = lexer.next_token();
        let done = t.kind == TokenKind::Eof;
        tokens.push(t);
        if done {
            return tokens;
        }
    }
    panic!("lexer stalled on {:?}", source);
}

proptest! {
    /// Lexer totality: for every input, the lexer reaches EOF without
    /// stalling or panicking.
    #[test]
    fn lexer_terminates_on_arbitrary_input(source in "\\PC{0,64}") {
        let tokens = lex_to_eof(&source);
        prop_assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
    }

    /// Token text fidelity: every non-synthetic, non-string token's text
    /// equals the source bytes at its recorded line and column.
    #[test]
    fn token_text_matches_source(source in "[ a-z0-9+*<>=.?!({\\[\\]})\n]{0,48}") {
        let lines: Vec<&str> = source.split('\n').collect();
        for t in lex_to_eof(&source) {
            if t.text.is_empty()
                || matches!(t.kind, TokenKind::Eof | TokenKind::Nl | TokenKind::StringLiteral)
            {
                continue;
            }
            let line = lines[(t.meta.line - 1) as usize];
            let start = (t.meta.col - 1) as usize;
            prop_assert_eq!(&line[start..start + t.text.len()], t.text.as_str());
        }
    }

    /// Relexer round trip: concatenating the split texts reproduces the
    /// original token text.
    #[test]
    fn relex_round_trip(text in "(>>=|<<=|\\*\\*=|>>|<<|\\*\\*|\\?\\?|\\?\\.|\\.\\.\\.|\\.\\.|<=>|->|=>|==|!=)") {
        let tokens = lex_to_eof(&text);
        let first = &tokens[0];
        let pieces = Relexer::new(first).relex();
        if !pieces.is_empty() {
            let joined: String = pieces.iter().map(|t| t.text.as_str()).collect();
            prop_assert_eq!(joined, first.text.clone());
        }
    }
}
