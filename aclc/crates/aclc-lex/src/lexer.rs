//! The lexer: one module's character buffer in, a token stream out.
//!
//! `next_token` always makes progress: it returns a real token, or reports
//! exactly one diagnostic, skips to the next recovery sentinel, and returns a
//! synthetic NL so the parser can resynchronize at a statement boundary.

use crate::cursor::Cursor;
use crate::token::{
    is_binary_digit, is_identifier_part, is_identifier_start, is_newline_char, is_octal_digit,
    is_simple_escape_character, is_symbol_part, is_symbol_start, keyword_kind, meta_kind,
    symbol_kind, Interpolation, Token, TokenKind,
};
use aclc_util::diagnostic::{ErrorCode, Handler};
use aclc_util::span::{ModuleId, SourceMeta};

/// Internal failure signal. The diagnostic has already been recorded by the
/// time this is raised; the caller only decides how to resynchronize.
struct LexFail;

type LexResult<T> = Result<T, LexFail>;

/// Default recovery sentinel set: statement-boundary characters.
const DEFAULT_SENTINELS: [char; 4] = ['\r', '\n', ';', '}'];

/// Lexer for a single module.
pub struct Lexer<'a> {
    module: ModuleId,
    cursor: Cursor<'a>,
    handler: &'a Handler,
    sentinels: Vec<char>,
}

impl<'a> Lexer<'a> {
    /// Create a lexer over `source`, reporting into `handler`.
    pub fn new(module: ModuleId, source: &'a str, handler: &'a Handler) -> Self {
        Self {
            module,
            cursor: Cursor::new(source),
            handler,
            sentinels: DEFAULT_SENTINELS.to_vec(),
        }
    }

    /// Replace the recovery sentinel set.
    pub fn set_recovery_sentinels(&mut self, sentinels: &[char]) {
        self.sentinels = sentinels.to_vec();
    }

    /// True while more input remains before EOF.
    pub fn has_next(&self) -> bool {
        !self.cursor.is_at_end()
    }

    /// The module this lexer reads.
    pub fn module(&self) -> ModuleId {
        self.module
    }

    fn meta(&self) -> SourceMeta {
        SourceMeta::new(self.module, self.cursor.line(), self.cursor.col())
    }

    fn error(&self, code: ErrorCode, meta: SourceMeta, highlight_len: usize, message: String) {
        self.handler.report(code, meta, highlight_len, message);
    }

    /// Produce the next token.
    pub fn next_token(&mut self) -> Token {
        loop {
            if self.cursor.is_at_end() {
                return Token::new(TokenKind::Eof, "", self.meta());
            }

            let c = self.cursor.current_char();

            if c == ' ' || c == '\t' || c == '\x0B' || c == '\x0C' {
                self.cursor.advance();
                continue;
            }

            if is_newline_char(c) {
                return self.lex_newline();
            }

            if c == '/' && self.cursor.char_at(1) == '/' {
                self.skip_line_comment();
                continue;
            }

            if c == '/' && self.cursor.char_at(1) == '*' {
                match self.skip_block_comment() {
                    Ok(()) => continue,
                    Err(LexFail) => return self.recover(),
                }
            }

            let result = if is_symbol_start(c) {
                self.lex_symbol()
            } else if c.is_ascii_digit() {
                self.lex_number()
            } else if is_identifier_start(c) {
                Ok(self.lex_identifier())
            } else if c == '\'' || c == '"' {
                self.lex_string(c)
            } else if c == '@' {
                self.lex_meta()
            } else {
                let meta = self.meta();
                self.cursor.advance();
                self.error(
                    ErrorCode::InvalidInput,
                    meta,
                    1,
                    format!("invalid input character {:?}", c),
                );
                Err(LexFail)
            };

            return match result {
                Ok(token) => token,
                Err(LexFail) => self.recover(),
            };
        }
    }

    /// Skip forward to the next recovery sentinel and emit a synthetic NL.
    fn recover(&mut self) -> Token {
        while !self.cursor.is_at_end() && !self.sentinels.contains(&self.cursor.current_char()) {
            self.cursor.advance();
        }
        Token::synthetic_nl(self.meta())
    }

    fn lex_newline(&mut self) -> Token {
        let meta = self.meta();
        let text = if self.cursor.current_char() == '\r' && self.cursor.char_at(1) == '\n' {
            "\r\n"
        } else if self.cursor.current_char() == '\r' {
            "\r"
        } else {
            "\n"
        };
        self.cursor.advance();
        Token::new(TokenKind::Nl, text, meta)
    }

    fn skip_line_comment(&mut self) {
        while !self.cursor.is_at_end() && !is_newline_char(self.cursor.current_char()) {
            self.cursor.advance();
        }
    }

    fn skip_block_comment(&mut self) -> LexResult<()> {
        let meta = self.meta();
        self.cursor.advance(); // '/'
        self.cursor.advance(); // '*'
        while !self.cursor.is_at_end() {
            if self.cursor.current_char() == '*' && self.cursor.char_at(1) == '/' {
                self.cursor.advance();
                self.cursor.advance();
                return Ok(());
            }
            self.cursor.advance();
        }
        self.error(
            ErrorCode::InvalidCommentBlockEnd,
            meta,
            2,
            "unterminated block comment".into(),
        );
        Err(LexFail)
    }

    /// Greedy longest-match over the symbol table, backtracking one character
    /// at a time when the collected text matches no symbol.
    fn lex_symbol(&mut self) -> LexResult<Token> {
        let meta = self.meta();
        let mut content = String::new();
        content.push(self.cursor.advance());
        while is_symbol_part(self.cursor.current_char()) {
            content.push(self.cursor.advance());
        }

        loop {
            if let Some(kind) = symbol_kind(&content) {
                return Ok(Token::new(kind, content, meta));
            }
            if content.len() == 1 {
                self.error(
                    ErrorCode::InvalidLexicalSymbol,
                    meta,
                    1,
                    format!("invalid symbol {:?}", content),
                );
                return Err(LexFail);
            }
            content.pop();
            self.cursor.retract();
        }
    }

    fn lex_identifier(&mut self) -> Token {
        let meta = self.meta();
        let mut content = String::new();
        content.push(self.cursor.advance());
        while is_identifier_part(self.cursor.current_char()) {
            content.push(self.cursor.advance());
        }

        let mut kind = keyword_kind(&content).unwrap_or(TokenKind::Id);

        // `try` and `as` compose greedily with an immediately following
        // `?` or `!` into their optional/unwrapped forms.
        let next = self.cursor.current_char();
        match (kind, next) {
            (TokenKind::Try, '?') => {
                kind = TokenKind::TryOptional;
                content.push(self.cursor.advance());
            }
            (TokenKind::Try, '!') => {
                kind = TokenKind::TryUnwrapped;
                content.push(self.cursor.advance());
            }
            (TokenKind::As, '?') => {
                kind = TokenKind::AsOptional;
                content.push(self.cursor.advance());
            }
            (TokenKind::As, '!') => {
                kind = TokenKind::AsUnwrapped;
                content.push(self.cursor.advance());
            }
            _ => {}
        }

        Token::new(kind, content, meta)
    }

    fn lex_meta(&mut self) -> LexResult<Token> {
        let meta = self.meta();
        let mut content = String::new();
        content.push(self.cursor.advance()); // '@'
        while is_identifier_part(self.cursor.current_char()) {
            content.push(self.cursor.advance());
        }

        match meta_kind(&content) {
            Some(kind) => Ok(Token::new(kind, content, meta)),
            None => {
                self.error(
                    ErrorCode::InvalidTag,
                    meta,
                    content.len(),
                    format!("unknown meta tag {:?}", content),
                );
                Err(LexFail)
            }
        }
    }

    fn lex_number(&mut self) -> LexResult<Token> {
        let meta = self.meta();

        if self.cursor.current_char() == '0' {
            match self.cursor.char_at(1) {
                'x' => {
                    return self.lex_radix_literal(
                        meta,
                        TokenKind::HexLiteral,
                        ErrorCode::InvalidHexLiteral,
                        |c| c.is_ascii_hexdigit(),
                    )
                }
                'o' => {
                    return self.lex_radix_literal(
                        meta,
                        TokenKind::OctalLiteral,
                        ErrorCode::InvalidOctalLiteral,
                        is_octal_digit,
                    )
                }
                'b' => {
                    return self.lex_radix_literal(
                        meta,
                        TokenKind::BinaryLiteral,
                        ErrorCode::InvalidBinaryLiteral,
                        is_binary_digit,
                    )
                }
                _ => {}
            }
        }

        let mut content = String::new();
        while self.cursor.current_char().is_ascii_digit() {
            content.push(self.cursor.advance());
        }

        let mut is_float = false;

        if self.cursor.current_char() == '.' && self.cursor.char_at(1).is_ascii_digit() {
            is_float = true;
            content.push(self.cursor.advance()); // '.'
            while self.cursor.current_char().is_ascii_digit() {
                content.push(self.cursor.advance());
            }
        }

        if self.cursor.current_char() == 'e' || self.cursor.current_char() == 'E' {
            is_float = true;
            content.push(self.cursor.advance());
            if self.cursor.current_char() == '+' || self.cursor.current_char() == '-' {
                content.push(self.cursor.advance());
            }
            if !self.cursor.current_char().is_ascii_digit() {
                self.error(
                    ErrorCode::InvalidFloatLiteral,
                    meta,
                    content.len(),
                    "expected digits in float exponent".into(),
                );
                return Err(LexFail);
            }
            while self.cursor.current_char().is_ascii_digit() {
                content.push(self.cursor.advance());
            }
        }

        let kind = if is_float {
            TokenKind::FloatLiteral
        } else {
            TokenKind::IntegerLiteral
        };
        Ok(Token::new(kind, content, meta))
    }

    fn lex_radix_literal(
        &mut self,
        meta: SourceMeta,
        kind: TokenKind,
        code: ErrorCode,
        is_digit: impl Fn(char) -> bool,
    ) -> LexResult<Token> {
        let mut content = String::new();
        content.push(self.cursor.advance()); // '0'
        content.push(self.cursor.advance()); // radix marker

        if !is_digit(self.cursor.current_char()) {
            self.error(
                code,
                meta,
                content.len(),
                format!("expected digits after {:?}", content),
            );
            return Err(LexFail);
        }
        while is_digit(self.cursor.current_char()) {
            content.push(self.cursor.advance());
        }
        Ok(Token::new(kind, content, meta))
    }

    fn lex_string(&mut self, delimiter: char) -> LexResult<Token> {
        let meta = self.meta();
        self.cursor.advance(); // opening delimiter

        let mut decoded = String::new();
        let mut interpolations = Vec::new();

        loop {
            if self.cursor.is_at_end() {
                self.error(
                    ErrorCode::InvalidStringLiteralEnd,
                    meta,
                    1,
                    "unterminated string literal".into(),
                );
                return Err(LexFail);
            }

            let c = self.cursor.current_char();
            if c == delimiter {
                self.cursor.advance();
                return Ok(Token::string(decoded, meta, interpolations));
            }

            if c == '\\' {
                self.lex_escape_sequence(&mut decoded, &mut interpolations)?;
            } else {
                decoded.push(self.cursor.advance());
            }
        }
    }

    fn lex_escape_sequence(
        &mut self,
        decoded: &mut String,
        interpolations: &mut Vec<Interpolation>,
    ) -> LexResult<()> {
        let meta = self.meta();
        self.cursor.advance(); // '\\'

        let c = self.cursor.current_char();
        if is_simple_escape_character(c) {
            self.cursor.advance();
            decoded.push(match c {
                'a' => '\x07',
                'b' => '\x08',
                'f' => '\x0C',
                'n' => '\n',
                'r' => '\r',
                't' => '\t',
                'v' => '\x0B',
                other => other, // quote or backslash
            });
            Ok(())
        } else if c == 'u' {
            self.cursor.advance();
            self.lex_unicode_escape(decoded, meta, 4)
        } else if c == 'U' {
            self.cursor.advance();
            self.lex_unicode_escape(decoded, meta, 8)
        } else if is_octal_digit(c) {
            let mut value: u32 = 0;
            for _ in 0..3 {
                if !is_octal_digit(self.cursor.current_char()) {
                    break;
                }
                value = value * 8 + self.cursor.advance().to_digit(8).unwrap();
            }
            // Three octal digits max out at 0o777, always a valid scalar.
            decoded.push(char::from_u32(value).unwrap_or('\0'));
            Ok(())
        } else if c == '{' {
            self.lex_interpolation(decoded.len(), meta, interpolations)
        } else {
            self.error(
                ErrorCode::InvalidEscapeSequence,
                meta,
                2,
                format!("invalid escape character {:?}", c),
            );
            Err(LexFail)
        }
    }

    fn lex_unicode_escape(
        &mut self,
        decoded: &mut String,
        meta: SourceMeta,
        n: usize,
    ) -> LexResult<()> {
        let mut value: u32 = 0;
        for _ in 0..n {
            let c = self.cursor.current_char();
            if !c.is_ascii_hexdigit() {
                self.error(
                    ErrorCode::InvalidUnicodeEscapeSequence,
                    meta,
                    2,
                    format!("expected {} hex digits in unicode escape", n),
                );
                return Err(LexFail);
            }
            value = value.wrapping_mul(16) + self.cursor.advance().to_digit(16).unwrap();
        }
        match char::from_u32(value) {
            Some(c) => {
                decoded.push(c);
                Ok(())
            }
            None => {
                self.error(
                    ErrorCode::InvalidUnicodeEscapeSequence,
                    meta,
                    2 + n,
                    format!("U+{:04X} is not a valid scalar value", value),
                );
                Err(LexFail)
            }
        }
    }

    /// Capture the brace-balanced source of a `\{ expr }` interpolation.
    /// The cursor sits on the `{`. Newlines inside the interpolation advance
    /// the outer line counter, which the cursor already does.
    fn lex_interpolation(
        &mut self,
        offset: usize,
        meta: SourceMeta,
        interpolations: &mut Vec<Interpolation>,
    ) -> LexResult<()> {
        self.cursor.advance(); // '{'
        let mut source = String::new();
        let mut depth = 1usize;

        loop {
            if self.cursor.is_at_end() {
                self.error(
                    ErrorCode::InvalidInterpolation,
                    meta,
                    2,
                    "unterminated string interpolation".into(),
                );
                return Err(LexFail);
            }

            let c = self.cursor.current_char();
            if c == '{' {
                depth += 1;
            } else if c == '}' {
                depth -= 1;
                if depth == 0 {
                    self.cursor.advance();
                    interpolations.push(Interpolation { offset, source });
                    return Ok(());
                }
            }
            source.push(self.cursor.advance());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_all(source: &str) -> (Vec<Token>, Handler) {
        let handler = Handler::new();
        let mut tokens = Vec::new();
        {
            let mut lexer = Lexer::new(ModuleId(0), source, &handler);
            loop {
                let t = lexer.next_token();
                let done = t.kind == TokenKind::Eof;
                tokens.push(t);
                if done {
                    break;
                }
            }
        }
        (tokens, handler)
    }

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_try_optional_composition() {
        // S1: `try? + 2`
        let (tokens, handler) = lex_all("try? + 2");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::TryOptional,
                TokenKind::Plus,
                TokenKind::IntegerLiteral,
                TokenKind::Eof,
            ]
        );
        assert_eq!(tokens[0].text, "try?");
        assert_eq!(tokens[2].text, "2");
        assert_eq!(handler.count(), 0);
    }

    #[test]
    fn test_composition_requires_adjacency() {
        let (tokens, _) = lex_all("try ?");
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::Try, TokenKind::QuestionMark, TokenKind::Eof]
        );

        let (tokens, _) = lex_all("as!x");
        assert_eq!(tokens[0].kind, TokenKind::AsUnwrapped);
        assert_eq!(tokens[1].kind, TokenKind::Id);
    }

    #[test]
    fn test_symbol_longest_match() {
        let (tokens, _) = lex_all("<=> <<= >>= **= ?? ?. ... ..");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Compare,
                TokenKind::DoubleLtEquals,
                TokenKind::DoubleGtEquals,
                TokenKind::DoubleAsteriskEquals,
                TokenKind::DoubleQuestionMark,
                TokenKind::QuestionMarkDot,
                TokenKind::TripleDot,
                TokenKind::DoubleDot,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_symbol_backtracking() {
        // `(=` is not a symbol; the lexer must back off to `(` then lex `=`.
        let (tokens, handler) = lex_all("(=");
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::LParen, TokenKind::Equals, TokenKind::Eof]
        );
        assert_eq!(handler.count(), 0);
    }

    #[test]
    fn test_numeric_literals() {
        let (tokens, handler) = lex_all("12 0x1f 0o17 0b101 1.5 2e10 3.25e-2");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::IntegerLiteral,
                TokenKind::HexLiteral,
                TokenKind::OctalLiteral,
                TokenKind::BinaryLiteral,
                TokenKind::FloatLiteral,
                TokenKind::FloatLiteral,
                TokenKind::FloatLiteral,
                TokenKind::Eof,
            ]
        );
        assert_eq!(handler.count(), 0);
    }

    #[test]
    fn test_integer_then_range_operator() {
        let (tokens, _) = lex_all("1..2");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::IntegerLiteral,
                TokenKind::DoubleDot,
                TokenKind::IntegerLiteral,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_invalid_hex_literal_recovers() {
        let (tokens, handler) = lex_all("0x zz\nok");
        assert_eq!(handler.count(), 1);
        assert_eq!(handler.diagnostics()[0].code, ErrorCode::InvalidHexLiteral);
        // Recovery emits a synthetic NL and resumes on the next line.
        assert!(tokens.iter().any(|t| t.kind == TokenKind::Nl));
        assert!(tokens
            .iter()
            .any(|t| t.kind == TokenKind::Id && t.text == "ok"));
    }

    #[test]
    fn test_string_escapes_decoded() {
        let (tokens, handler) = lex_all(r#"'a\tb\n' "q\\" '\u0041'"#);
        assert_eq!(handler.count(), 0);
        assert_eq!(tokens[0].text, "a\tb\n");
        assert_eq!(tokens[1].text, "q\\");
        assert_eq!(tokens[2].text, "A");
    }

    #[test]
    fn test_octal_escape() {
        let (tokens, _) = lex_all(r"'\101\7'");
        assert_eq!(tokens[0].text, "A\x07");
    }

    #[test]
    fn test_interpolation_capture() {
        let (tokens, handler) = lex_all(r"'x = \{a + f({1})}!'");
        assert_eq!(handler.count(), 0);
        let t = &tokens[0];
        assert_eq!(t.text, "x = !");
        assert_eq!(t.interpolations.len(), 1);
        assert_eq!(t.interpolations[0].offset, 4);
        // Brace-balanced capture: nested braces are counted.
        assert_eq!(t.interpolations[0].source, "a + f({1})");
    }

    #[test]
    fn test_interpolation_newline_advances_outer_line() {
        let (tokens, _) = lex_all("'\\{a\n+ b}' z");
        let z = tokens
            .iter()
            .find(|t| t.kind == TokenKind::Id)
            .expect("id token");
        assert_eq!(z.meta.line, 2);
    }

    #[test]
    fn test_unterminated_string() {
        let (_, handler) = lex_all("'abc");
        assert_eq!(
            handler.diagnostics()[0].code,
            ErrorCode::InvalidStringLiteralEnd
        );
    }

    #[test]
    fn test_meta_tags() {
        let (tokens, handler) = lex_all("@srclock @deprecated @nobuiltins");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::MetaSrclock,
                TokenKind::MetaDeprecated,
                TokenKind::MetaNobuiltins,
                TokenKind::Eof,
            ]
        );
        assert_eq!(handler.count(), 0);
    }

    #[test]
    fn test_unknown_meta_tag() {
        let (_, handler) = lex_all("@wat");
        assert_eq!(handler.diagnostics()[0].code, ErrorCode::InvalidTag);
    }

    #[test]
    fn test_comments_are_skipped() {
        let (tokens, handler) = lex_all("a // trailing\nb /* inline */ c");
        let ids: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Id)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(handler.count(), 0);
    }

    #[test]
    fn test_unterminated_block_comment() {
        let (_, handler) = lex_all("/* never closed");
        assert_eq!(
            handler.diagnostics()[0].code,
            ErrorCode::InvalidCommentBlockEnd
        );
    }

    #[test]
    fn test_newline_tokens_and_positions() {
        let (tokens, _) = lex_all("a\r\nb");
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::Id, TokenKind::Nl, TokenKind::Id, TokenKind::Eof]
        );
        assert_eq!(tokens[1].text, "\r\n");
        assert_eq!(tokens[2].meta.line, 2);
        assert_eq!(tokens[2].meta.col, 1);
    }

    #[test]
    fn test_token_text_matches_source_range() {
        let source = "fun add(a: Int) -> Int";
        let (tokens, _) = lex_all(source);
        let lines: Vec<&str> = source.lines().collect();
        for t in tokens.iter().filter(|t| !t.text.is_empty()) {
            if t.kind == TokenKind::Eof || t.kind == TokenKind::Nl {
                continue;
            }
            let line = lines[(t.meta.line - 1) as usize];
            let start = (t.meta.col - 1) as usize;
            assert_eq!(&line[start..start + t.text.len()], t.text);
        }
    }

    #[test]
    fn test_invalid_input_recovers_with_synthetic_nl() {
        let (tokens, handler) = lex_all("\u{1}\u{2}; x");
        assert_eq!(handler.diagnostics()[0].code, ErrorCode::InvalidInput);
        // One diagnostic, then a synthetic NL at the sentinel.
        assert_eq!(handler.count(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Nl);
        assert!(tokens[0].text.is_empty());
    }
}
