//! Type reference parsing.
//!
//! A type reference is a base (tuple, map, `global.`-prefixed chain, or a
//! dotted identifier chain with per-segment generics) followed by zero or
//! more suffixes: `?`, `!`, `*`, `...`, `-> T`, and `[]`/`[K]`. Compound
//! symbol tokens that begin with a suffix character (`??`, `?.`, `**`, `*=`,
//! `**=`) are relexed so the first piece can be consumed as the suffix.

use crate::ast::*;
use crate::{is_generics_start, is_type_suffix_start, PResult, Parser};
use aclc_lex::TokenKind;
use aclc_util::diagnostic::ErrorCode;

use TokenKind::*;

impl<'a> Parser<'a> {
    pub(crate) fn parse_type_ref(&mut self) -> PResult<TypeRefId> {
        let mut result = if self.lh_kind(0) == LParen
            && self.lh_kind(1) == RParen
            && self.lh_kind(2) == MinusArrow
        {
            self.parse_function_type_ref(None)?
        } else {
            self.parse_type_base()?
        };
        while is_type_suffix_start(self.lh_kind(0)) {
            result = self.parse_type_suffix(result)?;
        }
        Ok(result)
    }

    fn parse_type_base(&mut self) -> PResult<TypeRefId> {
        match self.lh_kind(0) {
            LParen => {
                let meta = self.lh(0).meta;
                self.advance();
                let mut elements = vec![self.parse_type_ref()?];
                while self.lh_kind(0) == Comma {
                    self.advance();
                    elements.push(self.parse_type_ref()?);
                }
                self.expect(RParen)?;
                Ok(self.store.add_type_ref(meta, TypeRefKind::Tuple { elements }))
            }
            LBracket => {
                let meta = self.lh(0).meta;
                self.advance();
                let key = self.parse_type_ref()?;
                self.expect(Colon)?;
                let value = self.parse_type_ref()?;
                self.expect(RBracket)?;
                Ok(self.store.add_type_ref(meta, TypeRefKind::Map { key, value }))
            }
            Global => {
                let global = self.take();
                self.skip_newlines(false);
                self.expect(Dot)?;
                self.skip_newlines(false);
                let meta = global.meta;
                let parent = self.store.add_type_ref(
                    meta,
                    TypeRefKind::Simple {
                        parent: None,
                        name: global,
                        generics: Vec::new(),
                        referent: None,
                    },
                );
                self.parse_simple_type_base(Some(parent))
            }
            _ => self.parse_simple_type_base(None),
        }
    }

    fn parse_simple_type_base(&mut self, parent: Option<TypeRefId>) -> PResult<TypeRefId> {
        let id = self.match_kind(Id)?;
        let mut generics = Vec::new();
        if is_generics_start(self.lh_kind(0)) {
            generics = self.parse_generic_impl()?;
        }

        let meta = id.meta;
        let result = self.store.add_type_ref(
            meta,
            TypeRefKind::Simple {
                parent,
                name: id,
                generics,
                referent: None,
            },
        );

        if self.lh_kind(0) == Dot {
            self.advance();
            return self.parse_simple_type_base(Some(result));
        }

        Ok(result)
    }

    fn parse_type_suffix(&mut self, base: TypeRefId) -> PResult<TypeRefId> {
        match self.lh_kind(0) {
            MinusArrow => self.parse_function_type_ref(Some(base)),
            LBracket => self.parse_subscript_type_ref(base),
            TripleDot | ExclamationPoint | QuestionMark | Asterisk => {
                let suffix = self.take();
                let meta = suffix.meta;
                Ok(self
                    .store
                    .add_type_ref(meta, TypeRefKind::Suffix { base, suffix }))
            }
            DoubleQuestionMark | QuestionMarkDot | DoubleAsterisk | AsteriskEquals
            | DoubleAsteriskEquals => {
                self.relex();
                let suffix = self.take();
                let meta = suffix.meta;
                Ok(self
                    .store
                    .add_type_ref(meta, TypeRefKind::Suffix { base, suffix }))
            }
            _ => {
                let t = self.lh(0).clone();
                self.report(
                    ErrorCode::Unknown,
                    t.meta,
                    t.highlight_len(),
                    "invalid type reference suffix".into(),
                );
                Err(self.panic())
            }
        }
    }

    /// `-> R` after a base. A tuple base becomes the parameter list; any
    /// other base becomes a single parameter; no base means `()`.
    fn parse_function_type_ref(&mut self, parameters: Option<TypeRefId>) -> PResult<TypeRefId> {
        let params = match parameters {
            Some(base) => match &self.store.type_refs[base].kind {
                TypeRefKind::Tuple { elements } => elements.clone(),
                _ => vec![base],
            },
            None => {
                self.expect(LParen)?;
                self.expect(RParen)?;
                Vec::new()
            }
        };
        let meta = self.lh(0).meta;
        self.expect(MinusArrow)?;
        let ret = self.parse_type_ref()?;
        Ok(self
            .store
            .add_type_ref(meta, TypeRefKind::Function { params, ret }))
    }

    /// `[]` (array) or `[K]` (map keyed by `K`).
    fn parse_subscript_type_ref(&mut self, base: TypeRefId) -> PResult<TypeRefId> {
        let meta = self.lh(0).meta;
        self.expect(LBracket)?;
        let mut key = None;
        if self.lh_kind(0) != RBracket {
            key = Some(self.parse_type_ref()?);
        }
        self.expect(RBracket)?;
        Ok(match key {
            Some(key) => self
                .store
                .add_type_ref(meta, TypeRefKind::Map { key, value: base }),
            None => self
                .store
                .add_type_ref(meta, TypeRefKind::Array { element: base }),
        })
    }

    /// Generic arguments after an identifier or type segment: `<T, U>`.
    /// Relexes `<<`-style compounds on entry and `>>`-style compounds before
    /// the closing `>` so nested generics terminate correctly.
    pub(crate) fn parse_generic_impl(&mut self) -> PResult<Vec<TypeRefId>> {
        if self.lh_kind(0) != Lt {
            self.relex();
        }
        self.expect(Lt)?;
        self.skip_newlines(false);
        let mut dest = vec![self.parse_type_ref()?];
        self.skip_newlines(false);
        while self.lh_kind(0) == Comma {
            self.advance();
            self.skip_newlines(false);
            dest.push(self.parse_type_ref()?);
            self.skip_newlines(false);
        }
        if self.lh_kind(0) != Gt {
            self.relex();
        }
        self.expect(Gt)?;
        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aclc_lex::Lexer;
    use aclc_util::span::ModuleId;
    use aclc_util::Handler;

    fn parse_type(source: &str) -> (AstStore, Option<TypeRefId>, Handler) {
        let handler = Handler::new();
        let mut store = AstStore::new();
        let ty = {
            let lexer = Lexer::new(ModuleId(0), source, &handler);
            let mut parser = Parser::new(&mut store, lexer, &handler);
            parser.parse_type_ref().ok()
        };
        (store, ty, handler)
    }

    fn text(source: &str) -> String {
        let (store, ty, handler) = parse_type(source);
        assert_eq!(handler.count(), 0, "{:?}", handler.diagnostics());
        store.type_ref_text(ty.expect("type parsed"))
    }

    #[test]
    fn test_simple_chain_with_generics() {
        assert_eq!(text("Foo<T, U>.Bar<V>"), "Foo<T, U>.Bar<V>");
    }

    #[test]
    fn test_suffixes() {
        assert_eq!(text("Int?"), "Int?");
        assert_eq!(text("Int!*"), "Int!*");
        assert_eq!(text("Int[]"), "Int[]");
        assert_eq!(text("Int..."), "Int...");
    }

    #[test]
    fn test_nested_generics_relex() {
        // The `>>` closing both lists must be split by the relexer.
        assert_eq!(text("Map<String, Array<Int>>"), "Map<String, Array<Int>>");
    }

    #[test]
    fn test_double_optional_relex() {
        // `??` must be split into two optional suffixes.
        assert_eq!(text("Int??"), "Int??");
    }

    #[test]
    fn test_double_pointer_relex() {
        assert_eq!(text("Int**"), "Int**");
    }

    #[test]
    fn test_map_forms() {
        assert_eq!(text("[String: Int]"), "[String: Int]");
        // Subscript form: `V[K]` keys V by K.
        let (store, ty, _) = parse_type("Int[String]");
        match &store.type_refs[ty.unwrap()].kind {
            TypeRefKind::Map { key, value } => {
                assert_eq!(store.type_ref_text(*key), "String");
                assert_eq!(store.type_ref_text(*value), "Int");
            }
            other => panic!("expected map, got {:?}", other),
        }
    }

    #[test]
    fn test_function_types() {
        assert_eq!(text("() -> Void"), "() -> Void");
        assert_eq!(text("Int -> Bool"), "(Int) -> Bool");
        assert_eq!(text("(Int, String) -> Bool"), "(Int, String) -> Bool");
    }

    #[test]
    fn test_tuple_type() {
        assert_eq!(text("(Int, String)"), "(Int, String)");
    }

    #[test]
    fn test_global_prefix() {
        let (store, ty, handler) = parse_type("global.Foo");
        assert_eq!(handler.count(), 0);
        match &store.type_refs[ty.unwrap()].kind {
            TypeRefKind::Simple { parent, name, .. } => {
                assert_eq!(name.text, "Foo");
                let parent = parent.expect("global parent");
                match &store.type_refs[parent].kind {
                    TypeRefKind::Simple { name, .. } => {
                        assert_eq!(name.kind, TokenKind::Global)
                    }
                    other => panic!("expected global segment, got {:?}", other),
                }
            }
            other => panic!("expected simple ref, got {:?}", other),
        }
    }
}
