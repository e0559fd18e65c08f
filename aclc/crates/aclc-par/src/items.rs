//! Declaration parsing: functions, variables, types, namespaces, imports.
//!
//! Each declaration site has a fixed modifier allowlist; a modifier outside
//! the list for its site is INVALID_MODIFIER.

use crate::ast::*;
use crate::{is_function_operator, PResult, Parser};
use aclc_lex::TokenKind;
use aclc_util::diagnostic::ErrorCode;

use TokenKind::*;

pub(crate) const GLOBAL_FUNCTION_MODIFIERS: &[TokenKind] = &[
    Internal,
    Unsafe,
    Throwing,
    Noexcept,
    Async,
    Extern,
    MetaNoreturn,
    MetaDeprecated,
    MetaEnablewarning,
    MetaDisablewarning,
];

pub(crate) const LAMBDA_MODIFIERS: &[TokenKind] = &[Async, Unsafe];

pub(crate) const GLOBAL_VARIABLE_MODIFIERS: &[TokenKind] = &[
    Internal,
    Atomic,
    Greedy,
    Strong,
    Weak,
    Unsafe,
    MetaDeprecated,
    MetaEnablewarning,
    MetaDisablewarning,
];

pub(crate) const GLOBAL_ALIAS_MODIFIERS: &[TokenKind] =
    &[Internal, MetaDeprecated, MetaEnablewarning, MetaDisablewarning];

pub(crate) const PARAMETER_MODIFIERS: &[TokenKind] = &[
    Atomic,
    Greedy,
    Strong,
    Weak,
    Ref,
    Const,
    MetaEnablewarning,
    MetaDisablewarning,
];

pub(crate) const FUNCTION_BLOCK_MODIFIERS: &[TokenKind] =
    &[Unsafe, MetaEnablewarning, MetaDisablewarning];

pub(crate) const LOCAL_VARIABLE_MODIFIERS: &[TokenKind] = &[
    Ref,
    Atomic,
    Greedy,
    Strong,
    Weak,
    Unsafe,
    MetaEnablewarning,
    MetaDisablewarning,
];

pub(crate) const LOCAL_ALIAS_MODIFIERS: &[TokenKind] = &[MetaEnablewarning, MetaDisablewarning];

pub(crate) const GLOBAL_CLASS_MODIFIERS: &[TokenKind] = &[
    Internal,
    Final,
    MetaLaxthrow,
    MetaDeprecated,
    MetaEnablewarning,
    MetaDisablewarning,
];

pub(crate) const GLOBAL_STRUCT_MODIFIERS: &[TokenKind] = &[
    Internal,
    MetaLaxthrow,
    MetaDeprecated,
    MetaEnablewarning,
    MetaDisablewarning,
];

pub(crate) const GLOBAL_TEMPLATE_MODIFIERS: &[TokenKind] =
    &[Internal, MetaDeprecated, MetaEnablewarning, MetaDisablewarning];

pub(crate) const GLOBAL_ENUM_MODIFIERS: &[TokenKind] =
    &[Internal, MetaDeprecated, MetaEnablewarning, MetaDisablewarning];

pub(crate) const GLOBAL_NAMESPACE_MODIFIERS: &[TokenKind] =
    &[Internal, MetaDeprecated, MetaEnablewarning, MetaDisablewarning];

pub(crate) const CLASS_CLASS_MODIFIERS: &[TokenKind] = &[
    Internal,
    Final,
    MetaLaxthrow,
    MetaDeprecated,
    MetaEnablewarning,
    MetaDisablewarning,
    Public,
    Private,
    Protected,
];

pub(crate) const CLASS_STRUCT_MODIFIERS: &[TokenKind] = &[
    Internal,
    MetaLaxthrow,
    MetaDeprecated,
    MetaEnablewarning,
    MetaDisablewarning,
    Public,
    Private,
    Protected,
];

pub(crate) const CLASS_TEMPLATE_MODIFIERS: &[TokenKind] = &[
    Internal,
    MetaDeprecated,
    MetaEnablewarning,
    MetaDisablewarning,
    Public,
    Private,
    Protected,
];

pub(crate) const CLASS_ENUM_MODIFIERS: &[TokenKind] = &[
    Internal,
    MetaDeprecated,
    MetaEnablewarning,
    MetaDisablewarning,
    Public,
    Private,
    Protected,
];

pub(crate) const CLASS_NAMESPACE_MODIFIERS: &[TokenKind] = &[
    Internal,
    MetaDeprecated,
    MetaEnablewarning,
    MetaDisablewarning,
    Public,
    Private,
    Protected,
];

pub(crate) const NAMESPACE_CLASS_MODIFIERS: &[TokenKind] = &[
    Internal,
    Final,
    MetaLaxthrow,
    MetaDeprecated,
    MetaEnablewarning,
    MetaDisablewarning,
    Public,
    Private,
];

pub(crate) const NAMESPACE_STRUCT_MODIFIERS: &[TokenKind] = &[
    Internal,
    MetaLaxthrow,
    MetaDeprecated,
    MetaEnablewarning,
    MetaDisablewarning,
    Public,
    Private,
];

pub(crate) const NAMESPACE_TEMPLATE_MODIFIERS: &[TokenKind] = &[
    Internal,
    MetaDeprecated,
    MetaEnablewarning,
    MetaDisablewarning,
    Public,
    Private,
];

pub(crate) const NAMESPACE_ENUM_MODIFIERS: &[TokenKind] = &[
    Internal,
    MetaDeprecated,
    MetaEnablewarning,
    MetaDisablewarning,
    Public,
    Private,
];

pub(crate) const NAMESPACE_NAMESPACE_MODIFIERS: &[TokenKind] = &[
    Internal,
    MetaDeprecated,
    MetaEnablewarning,
    MetaDisablewarning,
    Public,
    Private,
];

pub(crate) const CLASS_VARIABLE_MODIFIERS: &[TokenKind] = &[
    Internal,
    Atomic,
    Greedy,
    Strong,
    Weak,
    Unsafe,
    MetaDeprecated,
    MetaEnablewarning,
    MetaDisablewarning,
    Public,
    Private,
    Protected,
    Static,
];

pub(crate) const CLASS_ALIAS_MODIFIERS: &[TokenKind] = &[
    Internal,
    MetaDeprecated,
    MetaEnablewarning,
    MetaDisablewarning,
    Public,
    Private,
    Protected,
];

pub(crate) const NAMESPACE_ALIAS_MODIFIERS: &[TokenKind] = &[
    Internal,
    MetaDeprecated,
    MetaEnablewarning,
    MetaDisablewarning,
    Public,
    Private,
];

pub(crate) const NAMESPACE_VARIABLE_MODIFIERS: &[TokenKind] = &[
    Internal,
    Atomic,
    Greedy,
    Strong,
    Weak,
    Unsafe,
    MetaDeprecated,
    MetaEnablewarning,
    MetaDisablewarning,
    Public,
    Private,
];

pub(crate) const NAMESPACE_FUNCTION_MODIFIERS: &[TokenKind] = &[
    Internal,
    Unsafe,
    Throwing,
    Noexcept,
    Async,
    Extern,
    MetaNoreturn,
    MetaDeprecated,
    MetaEnablewarning,
    MetaDisablewarning,
    Public,
    Private,
];

pub(crate) const ENUM_CASE_MODIFIERS: &[TokenKind] = &[
    Internal,
    Public,
    Private,
    Unsafe,
    MetaDeprecated,
    MetaEnablewarning,
    MetaDisablewarning,
];

pub(crate) const CLASS_FUNCTION_MODIFIERS: &[TokenKind] = &[
    Internal,
    Unsafe,
    Throwing,
    Noexcept,
    Async,
    Extern,
    MetaNoreturn,
    MetaDeprecated,
    MetaEnablewarning,
    MetaDisablewarning,
    Public,
    Private,
    Protected,
    Static,
    Final,
    Override,
    Infix,
    Prefix,
    Postfix,
];

pub(crate) const TEMPLATE_FUNCTION_MODIFIERS: &[TokenKind] = &[
    Internal,
    Unsafe,
    Throwing,
    Noexcept,
    Async,
    Extern,
    MetaNoreturn,
    MetaDeprecated,
    MetaEnablewarning,
    MetaDisablewarning,
    Public,
    Private,
    Protected,
    Static,
    Override,
    Infix,
    Prefix,
    Postfix,
];

pub(crate) const ENUM_FUNCTION_MODIFIERS: &[TokenKind] = &[
    Internal,
    Unsafe,
    Throwing,
    Noexcept,
    Async,
    Extern,
    MetaNoreturn,
    MetaDeprecated,
    MetaEnablewarning,
    MetaDisablewarning,
    Public,
    Private,
    Static,
    Override,
    Infix,
    Prefix,
    Postfix,
];

pub(crate) const CONSTRUCTOR_MODIFIERS: &[TokenKind] = &[
    Internal,
    Unsafe,
    Throwing,
    Noexcept,
    MetaDeprecated,
    MetaEnablewarning,
    MetaDisablewarning,
    Public,
    Private,
    Protected,
];

pub(crate) const DESTRUCTOR_MODIFIERS: &[TokenKind] = &[MetaEnablewarning, MetaDisablewarning];

pub(crate) const GET_BLOCK_MODIFIERS: &[TokenKind] = &[
    Internal,
    Unsafe,
    Throwing,
    Noexcept,
    Async,
    MetaDeprecated,
    MetaEnablewarning,
    MetaDisablewarning,
    Public,
    Private,
    Protected,
];

pub(crate) const SET_BLOCK_MODIFIERS: &[TokenKind] = &[
    Internal,
    Unsafe,
    Throwing,
    Noexcept,
    Async,
    MetaDeprecated,
    MetaEnablewarning,
    MetaDisablewarning,
    Public,
    Private,
    Protected,
];

pub(crate) const INIT_BLOCK_MODIFIERS: &[TokenKind] = &[MetaEnablewarning, MetaDisablewarning];

/// Which type-declaration form is being parsed; they differ only in keyword,
/// content dispatch, and symbol kind.
#[derive(Clone, Copy, PartialEq, Eq)]
enum TypeDeclForm {
    Class,
    Struct,
    Template,
    Enum,
}

impl<'a> Parser<'a> {
    // ----- Modifiers ----- //

    pub(crate) fn parse_modifiers(&mut self, allowed: &[TokenKind]) -> PResult<Vec<Modifier>> {
        let mut dest = Vec::new();
        self.skip_newlines(false);
        loop {
            let kind = self.lh_kind(0);
            if !crate::is_modifier(kind) {
                break;
            }
            if allowed.contains(&kind) {
                if kind == MetaEnablewarning || kind == MetaDisablewarning {
                    dest.push(self.parse_warning_meta_modifier()?);
                } else {
                    dest.push(Modifier::plain(self.take()));
                }
            } else {
                if !self.is_speculating() {
                    let t = self.lh(0).clone();
                    self.handler.report(
                        ErrorCode::InvalidModifier,
                        t.meta,
                        t.highlight_len(),
                        format!("modifier `{}` is not allowed here", t.text),
                    );
                }
                return Err(self.panic());
            }
            self.skip_newlines(false);
        }
        Ok(dest)
    }

    /// `@enablewarning("id", ...)` / `@disablewarning("id", ...)`
    pub(crate) fn parse_warning_meta_modifier(&mut self) -> PResult<Modifier> {
        let token = self.take();
        self.expect(LParen)?;
        let mut args = Vec::new();
        args.push(self.match_kind(StringLiteral)?);
        while self.lh_kind(0) == Comma {
            self.advance();
            args.push(self.match_kind(StringLiteral)?);
        }
        self.expect(RParen)?;
        Ok(Modifier { token, args })
    }

    // ----- Functions ----- //

    pub(crate) fn parse_function(
        &mut self,
        allowed: &[TokenKind],
        allow_operator_ids: bool,
    ) -> PResult<SymbolId> {
        let modifiers = self.parse_modifiers(allowed)?;
        self.expect(Fun)?;

        // Only class-like bodies may declare operator functions.
        let id = if allow_operator_ids && is_function_operator(self.lh_kind(0)) {
            self.take()
        } else {
            self.match_kind(Id)?
        };

        let generics = if self.lh_kind(0) == Lt {
            self.parse_generics()?
        } else {
            Vec::new()
        };

        self.expect(LParen)?;
        let parameters = self.parse_parameters()?;
        self.expect(RParen)?;

        let mut declared_return_type = None;
        if self.lh_kind(0) == MinusArrow {
            self.advance();
            declared_return_type = Some(self.parse_type_ref()?);
        }

        let scope = self
            .store
            .new_scope(Some(self.current_scope), ScopeKind::Function);
        let symbol = self.store.new_symbol(
            id,
            modifiers,
            Some(scope),
            SymbolKind::Function {
                generics: generics.clone(),
                parameters: parameters.clone(),
                declared_return_type,
                body: Vec::new(),
                has_body: false,
                actual_return_type: None,
            },
        );
        self.declare_current(symbol)?;

        self.with_scope(scope, |p| {
            for &g in &generics {
                p.declare_in(scope, g)?;
            }
            for &param in &parameters {
                p.declare_in(scope, param)?;
            }

            if p.lh_kind(0) == Equals {
                let meta = p.lh(0).meta;
                p.advance();
                let value = p.parse_expression()?;
                let ret = p.store.add_stmt(meta, Stmt::Return { value: Some(value) });
                p.set_function_body(symbol, vec![ret]);
                p.parse_newline_equiv()?;
            } else if p.lh_kind(0) == LBrace {
                p.advance();
                let body = p.parse_function_block_content();
                p.expect(RBrace)?;
                p.set_function_body(symbol, body);
            } else {
                p.parse_newline_equiv()?;
            }
            Ok(())
        })?;

        Ok(symbol)
    }

    fn set_function_body(&mut self, symbol: SymbolId, new_body: Vec<StmtId>) {
        match &mut self.store.symbols[symbol].kind {
            SymbolKind::Function { body, has_body, .. } => {
                *body = new_body;
                *has_body = true;
            }
            _ => unreachable!("not a function"),
        }
    }

    // ----- Parameters and generics ----- //

    pub(crate) fn parse_parameters(&mut self) -> PResult<Vec<SymbolId>> {
        let mut dest = Vec::new();
        self.skip_newlines(false);
        if self.lh_kind(0) != RParen {
            dest.push(self.parse_parameter()?);
            self.skip_newlines(false);
            while self.lh_kind(0) == Comma {
                self.advance();
                self.skip_newlines(false);
                dest.push(self.parse_parameter()?);
                self.skip_newlines(false);
            }
        }
        Ok(dest)
    }

    /// Parse one parameter. The caller is responsible for declaring the
    /// symbol into whatever scope accepts it.
    pub(crate) fn parse_parameter(&mut self) -> PResult<SymbolId> {
        let modifiers = self.parse_modifiers(PARAMETER_MODIFIERS)?;
        let id = self.match_kind(Id)?;

        let mut declared_type = None;
        if self.lh_kind(0) == Colon {
            self.advance();
            declared_type = Some(self.parse_type_ref()?);
        }

        Ok(self.store.new_symbol(
            id,
            modifiers,
            None,
            SymbolKind::Parameter {
                declared_type,
                actual_type: None,
            },
        ))
    }

    pub(crate) fn parse_generics(&mut self) -> PResult<Vec<SymbolId>> {
        let mut dest = Vec::new();
        self.skip_newlines(false);
        self.expect(Lt)?;
        self.skip_newlines(false);
        dest.push(self.parse_generic_type()?);
        self.skip_newlines(false);
        while self.lh_kind(0) == Comma {
            self.advance();
            self.skip_newlines(false);
            dest.push(self.parse_generic_type()?);
            self.skip_newlines(false);
        }
        self.expect(Gt)?;
        Ok(dest)
    }

    fn parse_generic_type(&mut self) -> PResult<SymbolId> {
        let id = self.match_kind(Id)?;
        self.skip_newlines(false);
        let mut declared_parent = None;
        if self.lh_kind(0) == Colon {
            self.advance();
            self.skip_newlines(false);
            declared_parent = Some(self.parse_type_ref()?);
        }
        Ok(self.store.new_symbol(
            id,
            Vec::new(),
            None,
            SymbolKind::GenericType {
                declared_parent,
                actual_parent: None,
            },
        ))
    }

    // ----- Variables and constants ----- //

    pub(crate) fn parse_non_class_variable(&mut self, allowed: &[TokenKind]) -> PResult<SymbolId> {
        let modifiers = self.parse_modifiers(allowed)?;
        self.expect(Var)?;
        let id = self.match_kind(Id)?;

        let mut declared_type = None;
        if self.lh_kind(0) == Colon {
            self.advance();
            declared_type = Some(self.parse_type_ref()?);
        }

        let mut value = None;
        if self.lh_kind(0) == Equals {
            self.advance();
            value = Some(VariableValue::Expr(self.parse_expression()?));
        }
        self.parse_newline_equiv()?;

        let symbol = self.store.new_symbol(
            id,
            modifiers,
            None,
            SymbolKind::Variable {
                constant: false,
                declared_type,
                value,
                actual_type: None,
            },
        );
        self.declare_current(symbol)?;
        Ok(symbol)
    }

    pub(crate) fn parse_non_class_constant(&mut self, allowed: &[TokenKind]) -> PResult<SymbolId> {
        let modifiers = self.parse_modifiers(allowed)?;
        self.expect(Const)?;
        let id = self.match_kind(Id)?;

        let mut declared_type = None;
        if self.lh_kind(0) == Colon {
            self.advance();
            declared_type = Some(self.parse_type_ref()?);
        }

        self.expect(Equals)?;
        let value = Some(VariableValue::Expr(self.parse_expression()?));
        self.parse_newline_equiv()?;

        let symbol = self.store.new_symbol(
            id,
            modifiers,
            None,
            SymbolKind::Variable {
                constant: true,
                declared_type,
                value,
                actual_type: None,
            },
        );
        self.declare_current(symbol)?;
        Ok(symbol)
    }

    fn parse_class_variable_or_constant(&mut self, constant: bool) -> PResult<SymbolId> {
        let modifiers = self.parse_modifiers(CLASS_VARIABLE_MODIFIERS)?;
        self.expect(if constant { Const } else { Var })?;
        let id = self.match_kind(Id)?;

        let mut declared_type = None;
        if self.lh_kind(0) == Colon {
            self.advance();
            declared_type = Some(self.parse_type_ref()?);
        }

        let mut value = None;
        if self.lh_kind(0) == Equals {
            self.advance();
            value = Some(VariableValue::Expr(self.parse_expression()?));
            self.parse_newline_equiv()?;
        } else if self.lh_kind(0) == LBrace {
            self.advance();
            self.skip_newlines(false);
            value = Some(VariableValue::Block(self.parse_variable_block()?));
            self.skip_newlines(false);
            self.expect(RBrace)?;
        } else {
            self.parse_newline_equiv()?;
        }

        let symbol = self.store.new_symbol(
            id,
            modifiers,
            None,
            SymbolKind::Variable {
                constant,
                declared_type,
                value,
                actual_type: None,
            },
        );
        self.declare_current(symbol)?;
        Ok(symbol)
    }

    pub(crate) fn parse_class_variable(&mut self) -> PResult<SymbolId> {
        self.parse_class_variable_or_constant(false)
    }

    pub(crate) fn parse_class_constant(&mut self) -> PResult<SymbolId> {
        self.parse_class_variable_or_constant(true)
    }

    fn parse_template_variable_or_constant(&mut self, constant: bool) -> PResult<SymbolId> {
        let modifiers = self.parse_modifiers(CLASS_VARIABLE_MODIFIERS)?;

        if !modifiers.iter().any(|m| m.kind() == Static) {
            if !self.is_speculating() {
                let t = self.lh(0).clone();
                self.handler.report(
                    ErrorCode::NonstaticTemplateVariable,
                    t.meta,
                    t.highlight_len(),
                    "template variables must be static",
                );
            }
            return Err(self.panic());
        }

        self.expect(if constant { Const } else { Var })?;
        let id = self.match_kind(Id)?;

        let mut declared_type = None;
        if self.lh_kind(0) == Colon {
            self.advance();
            declared_type = Some(self.parse_type_ref()?);
        }

        let mut value = None;
        if constant {
            self.expect(Equals)?;
            value = Some(VariableValue::Expr(self.parse_expression()?));
        } else if self.lh_kind(0) == Equals {
            self.advance();
            value = Some(VariableValue::Expr(self.parse_expression()?));
        }
        self.parse_newline_equiv()?;

        let symbol = self.store.new_symbol(
            id,
            modifiers,
            None,
            SymbolKind::Variable {
                constant,
                declared_type,
                value,
                actual_type: None,
            },
        );
        self.declare_current(symbol)?;
        Ok(symbol)
    }

    // ----- Variable accessor blocks ----- //

    pub(crate) fn parse_variable_block(&mut self) -> PResult<VariableBlock> {
        let mut get_block = None;
        let mut set_block = None;
        let mut init_block = None;

        self.skip_newlines(true);
        while self.lh_kind(0) != RBrace && self.lh_kind(0) != Eof {
            let t = self.peek_past_modifiers();
            if t == Get && get_block.is_some() {
                return Err(self.duplicate_variable_block("get"));
            } else if t == Get {
                get_block = Some(self.parse_get_block()?);
            } else if t == Set && set_block.is_some() {
                return Err(self.duplicate_variable_block("set"));
            } else if t == Set {
                set_block = Some(self.parse_set_block()?);
            } else if t == Init && init_block.is_some() {
                return Err(self.duplicate_variable_block("init"));
            } else {
                init_block = Some(self.parse_init_block()?);
            }
            self.skip_newlines(true);
        }

        Ok(VariableBlock {
            get_block,
            set_block,
            init_block,
        })
    }

    fn duplicate_variable_block(&mut self, which: &str) -> crate::ParseFail {
        if !self.is_speculating() {
            let t = self.lh(0).clone();
            self.handler.report(
                ErrorCode::DuplicateVariableBlock,
                t.meta,
                t.highlight_len(),
                format!("duplicate {} block", which),
            );
        }
        // The rest of the accessor group is garbage; skip to the block end.
        self.panic_terminator = crate::PanicTerminator::BlockEnd;
        self.panic()
    }

    fn parse_get_block(&mut self) -> PResult<Block> {
        let modifiers = self.parse_modifiers(GET_BLOCK_MODIFIERS)?;
        self.skip_newlines(false);
        let meta = self.lh(0).meta;
        self.expect(Get)?;
        self.skip_newlines(false);

        let scope = self
            .store
            .new_scope(Some(self.current_scope), ScopeKind::GetBlock);
        let mut body = Vec::new();
        if self.lh_kind(0) == LBrace {
            body = self.with_scope(scope, |p| {
                p.expect(LBrace)?;
                let body = p.parse_function_block_content();
                p.expect(RBrace)?;
                Ok(body)
            })?;
        }

        Ok(Block {
            meta,
            scope,
            modifiers,
            body,
        })
    }

    fn parse_set_block(&mut self) -> PResult<SetBlock> {
        let modifiers = self.parse_modifiers(SET_BLOCK_MODIFIERS)?;
        self.skip_newlines(false);
        let meta = self.lh(0).meta;
        self.expect(Set)?;
        self.skip_newlines(false);

        let mut parameter = None;
        if self.lh_kind(0) == LParen {
            self.advance();
            self.skip_newlines(false);
            parameter = Some(self.parse_parameter()?);
            self.skip_newlines(false);
            self.expect(RParen)?;
            self.skip_newlines(false);
        }

        let scope = self
            .store
            .new_scope(Some(self.current_scope), ScopeKind::SetBlock);
        let mut body = Vec::new();
        if let Some(param) = parameter {
            body = self.with_scope(scope, |p| {
                p.declare_in(scope, param)?;
                p.expect(LBrace)?;
                let body = p.parse_function_block_content();
                p.expect(RBrace)?;
                Ok(body)
            })?;
        }

        Ok(SetBlock {
            meta,
            modifiers,
            parameter,
            scope,
            body,
        })
    }

    fn parse_init_block(&mut self) -> PResult<Block> {
        let modifiers = self.parse_modifiers(INIT_BLOCK_MODIFIERS)?;
        self.skip_newlines(false);
        let meta = self.lh(0).meta;
        self.expect(Init)?;
        self.skip_newlines(false);

        let scope = self
            .store
            .new_scope(Some(self.current_scope), ScopeKind::InitBlock);
        let body = self.with_scope(scope, |p| {
            p.expect(LBrace)?;
            let body = p.parse_function_block_content();
            p.expect(RBrace)?;
            Ok(body)
        })?;

        Ok(Block {
            meta,
            scope,
            modifiers,
            body,
        })
    }

    // ----- Constructors and destructors ----- //

    pub(crate) fn parse_constructor(&mut self) -> PResult<SymbolId> {
        let modifiers = self.parse_modifiers(CONSTRUCTOR_MODIFIERS)?;
        self.skip_newlines(false);
        let id = self.match_kind(Construct)?;
        self.skip_newlines(false);
        self.expect(LParen)?;
        let parameters = self.parse_parameters()?;
        self.expect(RParen)?;
        self.skip_newlines(false);

        let scope = self
            .store
            .new_scope(Some(self.current_scope), ScopeKind::Constructor);
        let symbol = self.store.new_symbol(
            id,
            modifiers,
            Some(scope),
            SymbolKind::Constructor {
                parameters: parameters.clone(),
                body: Vec::new(),
            },
        );
        self.declare_current(symbol)?;

        let body = self.with_scope(scope, |p| {
            for &param in &parameters {
                p.declare_in(scope, param)?;
            }
            p.expect(LBrace)?;
            let body = p.parse_function_block_content();
            p.expect(RBrace)?;
            Ok(body)
        })?;

        if let SymbolKind::Constructor { body: dest, .. } = &mut self.store.symbols[symbol].kind {
            *dest = body;
        }
        Ok(symbol)
    }

    pub(crate) fn parse_destructor(&mut self) -> PResult<SymbolId> {
        let modifiers = self.parse_modifiers(DESTRUCTOR_MODIFIERS)?;
        self.skip_newlines(false);
        let id = self.match_kind(Destruct)?;
        self.skip_newlines(false);

        let scope = self
            .store
            .new_scope(Some(self.current_scope), ScopeKind::Destructor);
        let symbol = self.store.new_symbol(
            id,
            modifiers,
            Some(scope),
            SymbolKind::Destructor { body: Vec::new() },
        );

        let body = self.with_scope(scope, |p| {
            p.expect(LBrace)?;
            let body = p.parse_function_block_content();
            p.expect(RBrace)?;
            Ok(body)
        })?;

        if let SymbolKind::Destructor { body: dest } = &mut self.store.symbols[symbol].kind {
            *dest = body;
        }
        Ok(symbol)
    }

    // ----- Enum cases ----- //

    pub(crate) fn parse_enum_case(&mut self) -> PResult<SymbolId> {
        let modifiers = self.parse_modifiers(ENUM_CASE_MODIFIERS)?;
        self.expect(Case)?;
        let id = self.match_kind(Id)?;
        self.skip_newlines(false);

        let mut args = Vec::new();
        if self.lh_kind(0) == LParen {
            self.advance();
            self.skip_newlines(false);
            if self.lh_kind(0) != RParen {
                args = self.parse_expression_list()?;
                self.skip_newlines(false);
            }
            self.expect(RParen)?;
        }

        self.parse_newline_equiv()?;

        let owner = self.store.scopes[self.current_scope]
            .owner
            .expect("enum case outside an enum scope");
        let symbol = self.store.new_symbol(
            id,
            modifiers,
            None,
            SymbolKind::EnumCase { args, owner },
        );
        self.declare_current(symbol)?;
        Ok(symbol)
    }

    // ----- Aliases ----- //

    pub(crate) fn parse_alias(&mut self, allowed: &[TokenKind]) -> PResult<SymbolId> {
        let modifiers = self.parse_modifiers(allowed)?;
        self.expect(Alias)?;
        let id = self.match_kind(Id)?;

        let generics = if self.lh_kind(0) == Lt {
            self.parse_generics()?
        } else {
            Vec::new()
        };

        self.expect(Equals)?;
        let value = self.parse_type_ref()?;
        self.parse_newline_equiv()?;

        let scope = self
            .store
            .new_scope(Some(self.current_scope), ScopeKind::Alias);
        let symbol = self.store.new_symbol(
            id,
            modifiers,
            Some(scope),
            SymbolKind::Alias {
                generics: generics.clone(),
                value,
            },
        );
        for &g in &generics {
            self.store.scopes[scope].symbols.push(g);
        }
        self.declare_current(symbol)?;
        Ok(symbol)
    }

    // ----- Type declarations ----- //

    fn parse_type_declaration(
        &mut self,
        form: TypeDeclForm,
        allowed: &[TokenKind],
    ) -> PResult<SymbolId> {
        let modifiers = self.parse_modifiers(allowed)?;
        let keyword = match form {
            TypeDeclForm::Class => Class,
            TypeDeclForm::Struct => Struct,
            TypeDeclForm::Template => Template,
            TypeDeclForm::Enum => Enum,
        };
        self.expect(keyword)?;

        let id = self.match_kind(Id)?;

        let generics = if self.lh_kind(0) == Lt {
            self.parse_generics()?
        } else {
            Vec::new()
        };

        self.skip_newlines(false);

        let mut parent_types = Vec::new();
        if self.lh_kind(0) == Colon {
            self.advance();
            self.skip_newlines(false);
            parent_types.push(self.parse_type_ref()?);
            self.skip_newlines(false);
            while self.lh_kind(0) == Comma {
                self.advance();
                self.skip_newlines(false);
                parent_types.push(self.parse_type_ref()?);
                self.skip_newlines(false);
            }
        }

        self.expect(LBrace)?;

        let scope = self
            .store
            .new_scope(Some(self.current_scope), ScopeKind::Type);
        let kind = match form {
            TypeDeclForm::Class => SymbolKind::Class {
                generics: generics.clone(),
                parent_types,
                content: Vec::new(),
            },
            TypeDeclForm::Struct => SymbolKind::Struct {
                generics: generics.clone(),
                parent_types,
                content: Vec::new(),
            },
            TypeDeclForm::Template => SymbolKind::Template {
                generics: generics.clone(),
                parent_types,
                content: Vec::new(),
            },
            TypeDeclForm::Enum => SymbolKind::Enum {
                generics: generics.clone(),
                parent_types,
                content: Vec::new(),
            },
        };
        let symbol = self.store.new_symbol(id, modifiers, Some(scope), kind);
        self.declare_current(symbol)?;

        let content = self.with_scope(scope, |p| {
            for &g in &generics {
                p.declare_in(scope, g)?;
            }
            Ok(match form {
                TypeDeclForm::Class | TypeDeclForm::Struct => p.parse_class_content(),
                TypeDeclForm::Template => p.parse_template_content(),
                TypeDeclForm::Enum => p.parse_enum_content(),
            })
        })?;

        self.set_type_content(symbol, content);
        self.expect(RBrace)?;
        Ok(symbol)
    }

    fn set_type_content(&mut self, symbol: SymbolId, new_content: Vec<Item>) {
        match &mut self.store.symbols[symbol].kind {
            SymbolKind::Class { content, .. }
            | SymbolKind::Struct { content, .. }
            | SymbolKind::Template { content, .. }
            | SymbolKind::Enum { content, .. }
            | SymbolKind::Namespace { content, .. } => *content = new_content,
            _ => unreachable!("not a type declaration"),
        }
    }

    pub(crate) fn parse_class(&mut self, allowed: &[TokenKind]) -> PResult<SymbolId> {
        self.parse_type_declaration(TypeDeclForm::Class, allowed)
    }

    pub(crate) fn parse_struct(&mut self, allowed: &[TokenKind]) -> PResult<SymbolId> {
        self.parse_type_declaration(TypeDeclForm::Struct, allowed)
    }

    pub(crate) fn parse_template(&mut self, allowed: &[TokenKind]) -> PResult<SymbolId> {
        self.parse_type_declaration(TypeDeclForm::Template, allowed)
    }

    pub(crate) fn parse_enum(&mut self, allowed: &[TokenKind]) -> PResult<SymbolId> {
        self.parse_type_declaration(TypeDeclForm::Enum, allowed)
    }

    pub(crate) fn parse_namespace(&mut self, allowed: &[TokenKind]) -> PResult<SymbolId> {
        let modifiers = self.parse_modifiers(allowed)?;
        self.expect(Namespace)?;
        let id = self.match_kind(Id)?;

        let generics = if self.lh_kind(0) == Lt {
            self.parse_generics()?
        } else {
            Vec::new()
        };

        self.skip_newlines(false);
        self.expect(LBrace)?;

        let scope = self
            .store
            .new_scope(Some(self.current_scope), ScopeKind::Namespace);
        let symbol = self.store.new_symbol(
            id,
            modifiers,
            Some(scope),
            SymbolKind::Namespace {
                generics: generics.clone(),
                content: Vec::new(),
            },
        );
        self.declare_current(symbol)?;

        let content = self.with_scope(scope, |p| {
            for &g in &generics {
                p.declare_in(scope, g)?;
            }
            Ok(p.parse_namespace_content())
        })?;

        self.set_type_content(symbol, content);
        self.expect(RBrace)?;
        Ok(symbol)
    }

    // ----- Content loops ----- //

    fn parse_content_loop(
        &mut self,
        parse_one: fn(&mut Self) -> PResult<Item>,
    ) -> Vec<Item> {
        self.set_lexer_sentinels(&['}', '\r', '\n', ';']);
        let mut dest = Vec::new();
        self.skip_newlines(true);
        while self.lh_kind(0) != RBrace && self.lh_kind(0) != Eof {
            match parse_one(self) {
                Ok(item) => dest.push(item),
                Err(_) => self.panicking = false,
            }
            self.skip_newlines(true);
        }
        dest
    }

    pub(crate) fn parse_class_content(&mut self) -> Vec<Item> {
        self.parse_content_loop(Self::parse_single_class_content)
    }

    fn parse_single_class_content(&mut self) -> PResult<Item> {
        match self.peek_past_modifiers() {
            Var => self.parse_class_variable().map(Item::Decl),
            Const => self.parse_class_constant().map(Item::Decl),
            Alias => self.parse_alias(CLASS_ALIAS_MODIFIERS).map(Item::Decl),
            Class => self.parse_class(CLASS_CLASS_MODIFIERS).map(Item::Decl),
            Struct => self.parse_struct(CLASS_STRUCT_MODIFIERS).map(Item::Decl),
            Template => self
                .parse_template(CLASS_TEMPLATE_MODIFIERS)
                .map(Item::Decl),
            Enum => self.parse_enum(CLASS_ENUM_MODIFIERS).map(Item::Decl),
            Namespace => self
                .parse_namespace(CLASS_NAMESPACE_MODIFIERS)
                .map(Item::Decl),
            Fun => self
                .parse_function(CLASS_FUNCTION_MODIFIERS, true)
                .map(Item::Decl),
            Construct => self.parse_constructor().map(Item::Decl),
            Destruct => self.parse_destructor().map(Item::Decl),
            _ => {
                self.diagnose_expected("class member");
                Err(self.panic())
            }
        }
    }

    pub(crate) fn parse_template_content(&mut self) -> Vec<Item> {
        self.parse_content_loop(Self::parse_single_template_content)
    }

    fn parse_single_template_content(&mut self) -> PResult<Item> {
        match self.peek_past_modifiers() {
            Var => self.parse_template_variable_or_constant(false).map(Item::Decl),
            Const => self.parse_template_variable_or_constant(true).map(Item::Decl),
            Alias => self.parse_alias(CLASS_ALIAS_MODIFIERS).map(Item::Decl),
            Class => self.parse_class(CLASS_CLASS_MODIFIERS).map(Item::Decl),
            Struct => self.parse_struct(CLASS_STRUCT_MODIFIERS).map(Item::Decl),
            Template => self
                .parse_template(CLASS_TEMPLATE_MODIFIERS)
                .map(Item::Decl),
            Enum => self.parse_enum(CLASS_ENUM_MODIFIERS).map(Item::Decl),
            Namespace => self
                .parse_namespace(CLASS_NAMESPACE_MODIFIERS)
                .map(Item::Decl),
            Fun => self
                .parse_function(TEMPLATE_FUNCTION_MODIFIERS, true)
                .map(Item::Decl),
            _ => {
                self.diagnose_expected("template member");
                Err(self.panic())
            }
        }
    }

    pub(crate) fn parse_enum_content(&mut self) -> Vec<Item> {
        self.parse_content_loop(Self::parse_single_enum_content)
    }

    fn parse_single_enum_content(&mut self) -> PResult<Item> {
        match self.peek_past_modifiers() {
            Var => self.parse_class_variable().map(Item::Decl),
            Const => self.parse_class_constant().map(Item::Decl),
            Alias => self
                .parse_alias(NAMESPACE_ALIAS_MODIFIERS)
                .map(Item::Decl),
            Class => self.parse_class(NAMESPACE_CLASS_MODIFIERS).map(Item::Decl),
            Struct => self
                .parse_struct(NAMESPACE_STRUCT_MODIFIERS)
                .map(Item::Decl),
            Template => self
                .parse_template(NAMESPACE_TEMPLATE_MODIFIERS)
                .map(Item::Decl),
            Enum => self.parse_enum(NAMESPACE_ENUM_MODIFIERS).map(Item::Decl),
            Namespace => self
                .parse_namespace(NAMESPACE_NAMESPACE_MODIFIERS)
                .map(Item::Decl),
            Fun => self
                .parse_function(ENUM_FUNCTION_MODIFIERS, true)
                .map(Item::Decl),
            Construct => self.parse_constructor().map(Item::Decl),
            Destruct => self.parse_destructor().map(Item::Decl),
            Case => self.parse_enum_case().map(Item::Decl),
            _ => {
                self.diagnose_expected("enum member");
                Err(self.panic())
            }
        }
    }

    pub(crate) fn parse_namespace_content(&mut self) -> Vec<Item> {
        self.parse_content_loop(Self::parse_single_namespace_content)
    }

    fn parse_single_namespace_content(&mut self) -> PResult<Item> {
        match self.peek_past_modifiers() {
            Var => self
                .parse_non_class_variable(NAMESPACE_VARIABLE_MODIFIERS)
                .map(Item::Decl),
            Const => self
                .parse_non_class_constant(NAMESPACE_VARIABLE_MODIFIERS)
                .map(Item::Decl),
            Alias => self
                .parse_alias(NAMESPACE_ALIAS_MODIFIERS)
                .map(Item::Decl),
            Class => self.parse_class(NAMESPACE_CLASS_MODIFIERS).map(Item::Decl),
            Struct => self
                .parse_struct(NAMESPACE_STRUCT_MODIFIERS)
                .map(Item::Decl),
            Template => self
                .parse_template(NAMESPACE_TEMPLATE_MODIFIERS)
                .map(Item::Decl),
            Enum => self.parse_enum(NAMESPACE_ENUM_MODIFIERS).map(Item::Decl),
            Namespace => self
                .parse_namespace(NAMESPACE_NAMESPACE_MODIFIERS)
                .map(Item::Decl),
            Fun => self
                .parse_function(NAMESPACE_FUNCTION_MODIFIERS, false)
                .map(Item::Decl),
            _ => {
                self.diagnose_expected("namespace member");
                Err(self.panic())
            }
        }
    }

    // ----- Imports ----- //

    pub(crate) fn parse_import(&mut self) -> PResult<SymbolId> {
        self.expect(Import)?;
        self.skip_newlines(false);

        let symbol = if self.lh_kind(0) == LBrace {
            self.parse_from_import()?
        } else if self.lh_kind(0) == StringLiteral {
            self.parse_standard_import()?
        } else {
            let mut k = 1;
            while self.lh_kind(k) == Nl {
                k += 1;
            }
            if self.lh_kind(k) == Colon || self.lh_kind(k) == From {
                self.parse_from_import()?
            } else {
                self.parse_standard_import()?
            }
        };

        self.add_import(symbol)?;
        Ok(symbol)
    }

    fn parse_standard_import(&mut self) -> PResult<SymbolId> {
        let (source, mut skipped) = self.parse_import_source()?;
        if skipped == 0 {
            skipped = self.skip_newlines(false);
        }

        let mut alias = None;
        let mut found_as = false;
        if self.lh_kind(0) == As {
            self.advance();
            alias = Some(self.match_kind(Id)?);
            found_as = true;
        }
        if skipped == 0 && !found_as {
            self.parse_newline_equiv()?;
        }

        Ok(self.make_import(source, alias, Vec::new()))
    }

    fn parse_from_import(&mut self) -> PResult<SymbolId> {
        let mut targets = Vec::new();
        if self.lh_kind(0) == LBrace {
            self.advance();
            self.skip_newlines(false);
            targets.push(self.parse_import_target()?);
            self.skip_newlines(false);
            while self.lh_kind(0) == Comma {
                self.advance();
                self.skip_newlines(false);
                targets.push(self.parse_import_target()?);
                self.skip_newlines(false);
            }
            self.expect(RBrace)?;
            self.skip_newlines(false);
        } else {
            targets.push(self.parse_import_target()?);
            self.skip_newlines(false);
        }

        self.expect(From)?;
        self.skip_newlines(false);

        let (source, skipped) = self.parse_import_source()?;
        if skipped == 0 {
            self.parse_newline_equiv()?;
        }

        // Duplicate target names within one import are rejected outright.
        for i in 1..targets.len() {
            if targets[..i]
                .iter()
                .any(|t| t.name.text == targets[i].name.text)
            {
                let meta = targets[i].name.meta;
                let len = targets[i].name.highlight_len();
                let message = format!("`{}` is imported more than once", targets[i].name.text);
                self.report(ErrorCode::DuplicateSymbol, meta, len, message);
                return Err(self.panic());
            }
        }

        Ok(self.make_import(source, None, targets))
    }

    /// Parse an import source: a string literal, or a dotted identifier path
    /// with an optional `.`/`..`/`...` relative prefix. A run of N leading
    /// dots means "relative, climbing N-1 parents"; the relexer splits the
    /// multi-dot tokens into single dots.
    fn parse_import_source(&mut self) -> PResult<(ImportSource, usize)> {
        if self.lh_kind(0) == StringLiteral {
            let literal = self.take();
            return Ok((
                ImportSource {
                    string_literal: Some(literal),
                    parent_climbs: 0,
                    relative: false,
                    segments: Vec::new(),
                },
                0,
            ));
        }

        let mut relative = false;
        let mut dots: u32 = 0;
        while matches!(self.lh_kind(0), Dot | DoubleDot | TripleDot) {
            if self.lh_kind(0) != Dot {
                self.relex();
            }
            self.expect(Dot)?;
            relative = true;
            dots += 1;
        }

        let mut segments = vec![self.match_kind(Id)?];
        let mut skipped = self.skip_newlines(false);
        while self.lh_kind(0) == Dot {
            self.advance();
            self.skip_newlines(false);
            segments.push(self.match_kind(Id)?);
            skipped = self.skip_newlines(false);
        }

        Ok((
            ImportSource {
                string_literal: None,
                parent_climbs: dots.saturating_sub(1),
                relative,
                segments,
            },
            skipped,
        ))
    }

    fn parse_import_target(&mut self) -> PResult<ImportTarget> {
        let name = self.match_kind(Id)?;
        self.skip_newlines(false);

        let mut declared_type = None;
        if self.lh_kind(0) == Colon {
            self.advance();
            self.skip_newlines(false);
            declared_type = Some(self.parse_type_ref()?);
        }

        Ok(ImportTarget {
            name,
            declared_type,
            referents: Vec::new(),
        })
    }

    fn make_import(
        &mut self,
        source: ImportSource,
        alias: Option<aclc_lex::Token>,
        targets: Vec<ImportTarget>,
    ) -> SymbolId {
        // The import is referenced by its alias when present, else by the
        // final path segment (or the literal text for path imports).
        let name = alias
            .clone()
            .or_else(|| source.segments.last().cloned())
            .or_else(|| source.string_literal.clone())
            .expect("import source has no name");

        self.store.new_symbol(
            name,
            Vec::new(),
            None,
            SymbolKind::Import {
                source,
                alias,
                targets,
                referent: None,
                referent_module: None,
            },
        )
    }

    fn add_import(&mut self, symbol: SymbolId) -> PResult<()> {
        let global = self.store.global_scope_of(self.current_scope);
        let name = self.store.symbols[symbol].name.text.clone();
        let duplicate_name = self.store.scopes[global]
            .imports
            .iter()
            .any(|&existing| self.store.symbols[existing].name.text == name);
        if duplicate_name {
            if !self.is_speculating() {
                let meta = self.store.symbols[symbol].meta;
                let len = self.store.symbols[symbol].name.highlight_len();
                self.handler.report(
                    ErrorCode::DuplicateImportAlias,
                    meta,
                    len,
                    format!("an import named `{}` already exists", name),
                );
            }
            return Err(self.panic());
        }

        // Two imports naming the same source are a duplicate regardless of
        // aliasing. Differently-spelled paths reaching the same module are
        // caught again by the import handler once sources resolve to files.
        let source_key = self.import_source_key(symbol);
        let duplicate_source = self.store.scopes[global]
            .imports
            .iter()
            .any(|&existing| self.import_source_key(existing) == source_key);
        if duplicate_source {
            if !self.is_speculating() {
                let meta = self.store.symbols[symbol].meta;
                let len = self.store.symbols[symbol].name.highlight_len();
                self.handler.report(
                    ErrorCode::DuplicateImport,
                    meta,
                    len,
                    "the target of this import has already been imported".to_string(),
                );
            }
            return Err(self.panic());
        }

        self.store.scopes[global].imports.push(symbol);
        self.store.scopes[global].symbols.push(symbol);
        Ok(())
    }

    /// Normalized spelling of an import's source, for duplicate detection.
    fn import_source_key(&self, symbol: SymbolId) -> String {
        match &self.store.symbols[symbol].kind {
            SymbolKind::Import { source, .. } => match &source.string_literal {
                Some(literal) => format!("\"{}\"", literal.text),
                None => {
                    let segments: Vec<&str> =
                        source.segments.iter().map(|t| t.text.as_str()).collect();
                    format!(
                        "{}:{}:{}",
                        source.relative,
                        source.parent_climbs,
                        segments.join(".")
                    )
                }
            },
            _ => String::new(),
        }
    }
}
