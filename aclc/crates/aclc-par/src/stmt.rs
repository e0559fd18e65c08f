//! Statement parsing inside function bodies.
//!
//! Control statements accept either a braced block or, after a comma, a
//! single statement (`if cond, return x`). `else` and the `try` body always
//! take a single statement, which may itself be a braced block.

use crate::ast::*;
use crate::items::{FUNCTION_BLOCK_MODIFIERS, LOCAL_ALIAS_MODIFIERS, LOCAL_VARIABLE_MODIFIERS};
use crate::{is_modifier, is_newline_equivalent, PanicTerminator, PResult, Parser};
use aclc_lex::TokenKind;
use aclc_util::diagnostic::ErrorCode;

use TokenKind::*;

impl<'a> Parser<'a> {
    /// Parse statements until the closing `}` of the enclosing block.
    pub(crate) fn parse_function_block_content(&mut self) -> Vec<StmtId> {
        self.set_lexer_sentinels(&['}', '\r', '\n', ';']);
        let mut dest = Vec::new();
        self.skip_newlines(true);
        while self.lh_kind(0) != RBrace && self.lh_kind(0) != Eof {
            match self.parse_single_function_block_content() {
                Ok(stmt) => dest.push(stmt),
                Err(_) => self.panicking = false,
            }
            self.skip_newlines(true);
        }
        dest
    }

    pub(crate) fn parse_single_function_block_content(&mut self) -> PResult<StmtId> {
        self.panic_terminator = PanicTerminator::StatementEnd;

        match self.lh_kind(0) {
            If => self.parse_if_stmt(),
            While => self.parse_while_stmt(),
            Repeat => self.parse_repeat_stmt(),
            For => self.parse_for_stmt(),
            Switch => self.parse_switch_stmt(),
            Try => self.parse_try_stmt(),
            LBrace => {
                let block = self.parse_function_block()?;
                let meta = block.meta;
                Ok(self.store.add_stmt(meta, Stmt::Block(block)))
            }
            Break | Continue | Fall => {
                let token = self.take();
                self.parse_newline_equiv()?;
                let meta = token.meta;
                Ok(self.store.add_stmt(meta, Stmt::SingleToken { token }))
            }
            Var => self.parse_local_variable(false),
            Const => self.parse_local_variable(true),
            Alias => {
                let symbol = self.parse_alias(LOCAL_ALIAS_MODIFIERS)?;
                let meta = self.store.symbols[symbol].meta;
                Ok(self.store.add_stmt(meta, Stmt::Decl(symbol)))
            }
            MetaEnablewarning | MetaDisablewarning => self.parse_local_warning_meta(),
            k if is_modifier(k) => match self.peek_past_modifiers() {
                Const => self.parse_local_variable(true),
                Var => self.parse_local_variable(false),
                Alias => {
                    let symbol = self.parse_alias(LOCAL_ALIAS_MODIFIERS)?;
                    let meta = self.store.symbols[symbol].meta;
                    Ok(self.store.add_stmt(meta, Stmt::Decl(symbol)))
                }
                _ => {
                    let block = self.parse_function_block()?;
                    let meta = block.meta;
                    Ok(self.store.add_stmt(meta, Stmt::Block(block)))
                }
            },
            Throw => self.parse_throw_stmt(),
            Return => self.parse_return_stmt(),
            _ => {
                let expr = self.parse_expression()?;
                self.parse_newline_equiv()?;
                let meta = self.store.exprs[expr].meta;
                Ok(self.store.add_stmt(meta, Stmt::Expr(expr)))
            }
        }
    }

    /// A braced `{ ... }` block with optional block modifiers.
    pub(crate) fn parse_function_block(&mut self) -> PResult<Block> {
        self.skip_newlines(true);
        let modifiers = self.parse_modifiers(FUNCTION_BLOCK_MODIFIERS)?;
        self.skip_newlines(false);
        let meta = self.lh(0).meta;
        self.expect(LBrace)?;

        let scope = self
            .store
            .new_scope(Some(self.current_scope), ScopeKind::Block);
        let body = self.with_scope(scope, |p| {
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

    /// A block body that is either braced or, after a comma, one statement.
    fn parse_block_or_single(&mut self) -> PResult<Block> {
        self.skip_newlines(false);
        if self.lh_kind(0) == Comma {
            self.advance();
            self.skip_newlines(false);
            self.parse_single_stmt_block()
        } else {
            self.parse_function_block()
        }
    }

    /// A one-statement block with its own scope.
    fn parse_single_stmt_block(&mut self) -> PResult<Block> {
        let meta = self.lh(0).meta;
        let scope = self
            .store
            .new_scope(Some(self.current_scope), ScopeKind::Block);
        let body = self.with_scope(scope, |p| {
            let stmt = p.parse_single_function_block_content()?;
            Ok(vec![stmt])
        })?;
        Ok(Block {
            meta,
            scope,
            modifiers: Vec::new(),
            body,
        })
    }

    fn parse_if_stmt(&mut self) -> PResult<StmtId> {
        let meta = self.lh(0).meta;
        self.expect(If)?;
        let condition = self.parse_expression()?;
        let block = self.parse_block_or_single()?;
        let mut branches = vec![CondBlock {
            meta,
            condition,
            block,
        }];

        self.skip_newlines(false);
        while self.lh_kind(0) == Elif {
            let elif_meta = self.lh(0).meta;
            self.advance();
            let condition = self.parse_expression()?;
            let block = self.parse_block_or_single()?;
            branches.push(CondBlock {
                meta: elif_meta,
                condition,
                block,
            });
            self.skip_newlines(false);
        }

        let mut else_block = None;
        if self.lh_kind(0) == Else {
            self.advance();
            self.skip_newlines(false);
            else_block = Some(self.parse_single_stmt_block()?);
        }

        Ok(self.store.add_stmt(
            meta,
            Stmt::If {
                branches,
                else_block,
            },
        ))
    }

    fn parse_while_stmt(&mut self) -> PResult<StmtId> {
        let meta = self.lh(0).meta;
        self.expect(While)?;
        let condition = self.parse_expression()?;
        let block = self.parse_block_or_single()?;
        Ok(self
            .store
            .add_stmt(meta, Stmt::While { condition, block }))
    }

    /// `repeat <stmt> while cond`
    fn parse_repeat_stmt(&mut self) -> PResult<StmtId> {
        let meta = self.lh(0).meta;
        self.expect(Repeat)?;
        self.skip_newlines(false);
        let block = self.parse_single_stmt_block()?;
        self.skip_newlines(true);
        self.expect(While)?;
        let condition = self.parse_expression()?;
        self.parse_newline_equiv()?;
        Ok(self
            .store
            .add_stmt(meta, Stmt::Repeat { condition, block }))
    }

    fn parse_for_stmt(&mut self) -> PResult<StmtId> {
        let meta = self.lh(0).meta;
        self.expect(For)?;
        self.skip_newlines(false);
        let iterator = self.parse_parameter()?;
        self.skip_newlines(false);
        self.expect(In)?;
        self.skip_newlines(false);
        let iteratee = self.parse_expression()?;

        let block = self.parse_block_or_single()?;
        // The iterator is scoped to the loop body.
        self.store.scopes[block.scope].symbols.insert(0, iterator);

        Ok(self.store.add_stmt(
            meta,
            Stmt::For {
                iterator,
                iteratee,
                block,
            },
        ))
    }

    fn parse_switch_stmt(&mut self) -> PResult<StmtId> {
        let meta = self.lh(0).meta;
        self.expect(Switch)?;
        self.skip_newlines(false);
        let condition = self.parse_expression()?;
        self.skip_newlines(false);
        self.expect(LBrace)?;
        let cases = self.parse_switch_cases()?;
        self.expect(RBrace)?;
        Ok(self
            .store
            .add_stmt(meta, Stmt::Switch { condition, cases }))
    }

    fn parse_switch_cases(&mut self) -> PResult<Vec<SwitchCase>> {
        let mut dest = Vec::new();
        self.skip_newlines(true);
        let mut found_default = false;
        while self.lh_kind(0) != RBrace && self.lh_kind(0) != Eof {
            if self.lh_kind(0) == Case {
                let case_token = self.match_kind(Case)?;
                self.skip_newlines(false);
                let condition = Some(self.parse_expression()?);
                self.skip_newlines(false);
                self.expect(Colon)?;
                self.skip_newlines(false);
                let block = self.parse_case_block(case_token.meta)?;
                dest.push(SwitchCase {
                    case_token,
                    condition,
                    block,
                });
            } else if self.lh_kind(0) == Default && found_default {
                if !self.is_speculating() {
                    let t = self.lh(0).clone();
                    self.handler.report(
                        ErrorCode::DuplicateDefaultCase,
                        t.meta,
                        t.highlight_len(),
                        "a switch may have at most one default case",
                    );
                }
                // Skip the rest of the switch body.
                self.panic_terminator = PanicTerminator::BlockEnd;
                return Err(self.panic());
            } else {
                let case_token = self.match_kind(Default)?;
                self.skip_newlines(false);
                self.expect(Colon)?;
                self.skip_newlines(false);
                let block = self.parse_case_block(case_token.meta)?;
                dest.push(SwitchCase {
                    case_token,
                    condition: None,
                    block,
                });
                found_default = true;
            }
            self.skip_newlines(true);
        }
        Ok(dest)
    }

    /// Case content runs until the next `case`, `default`, or the switch's
    /// closing brace.
    fn parse_case_block(&mut self, meta: aclc_util::span::SourceMeta) -> PResult<Block> {
        let scope = self
            .store
            .new_scope(Some(self.current_scope), ScopeKind::Block);
        let body = self.with_scope(scope, |p| {
            let mut body = Vec::new();
            p.skip_newlines(true);
            while !matches!(p.lh_kind(0), Case | Default | RBrace | Eof) {
                match p.parse_single_function_block_content() {
                    Ok(stmt) => body.push(stmt),
                    Err(_) => p.panicking = false,
                }
                p.skip_newlines(true);
            }
            Ok(body)
        })?;
        Ok(Block {
            meta,
            scope,
            modifiers: Vec::new(),
            body,
        })
    }

    fn parse_try_stmt(&mut self) -> PResult<StmtId> {
        let meta = self.lh(0).meta;
        self.expect(Try)?;
        self.skip_newlines(false);
        let block = self.parse_single_stmt_block()?;
        self.skip_newlines(true);

        let mut catches = Vec::new();
        while self.lh_kind(0) == Catch {
            let catch_meta = self.lh(0).meta;
            self.advance();
            self.skip_newlines(false);
            let exception = self.parse_parameter()?;
            self.skip_newlines(false);
            let catch_block = self.parse_function_block()?;
            self.store.scopes[catch_block.scope]
                .symbols
                .insert(0, exception);
            catches.push(CatchBlock {
                meta: catch_meta,
                exception,
                block: catch_block,
            });
            self.skip_newlines(false);
        }

        Ok(self.store.add_stmt(meta, Stmt::Try { block, catches }))
    }

    fn parse_local_variable(&mut self, constant: bool) -> PResult<StmtId> {
        let modifiers = self.parse_modifiers(LOCAL_VARIABLE_MODIFIERS)?;
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
        let meta = self.store.symbols[symbol].meta;
        Ok(self.store.add_stmt(meta, Stmt::Decl(symbol)))
    }

    fn parse_throw_stmt(&mut self) -> PResult<StmtId> {
        let meta = self.lh(0).meta;
        self.expect(Throw)?;
        self.skip_newlines(false);
        let value = self.parse_expression()?;
        self.parse_newline_equiv()?;
        Ok(self.store.add_stmt(meta, Stmt::Throw { value }))
    }

    fn parse_return_stmt(&mut self) -> PResult<StmtId> {
        let meta = self.lh(0).meta;
        self.expect(Return)?;
        let mut value = None;
        if !is_newline_equivalent(self.lh_kind(0))
            && self.lh_kind(0) != Nl
            && self.lh_kind(0) != Semicolon
        {
            value = Some(self.parse_expression()?);
        }
        self.parse_newline_equiv()?;
        Ok(self.store.add_stmt(meta, Stmt::Return { value }))
    }

    fn parse_local_warning_meta(&mut self) -> PResult<StmtId> {
        let modifier = self.parse_warning_meta_modifier()?;
        self.skip_newlines(false);
        let target = self.parse_single_function_block_content()?;
        let meta = modifier.token.meta;
        Ok(self
            .store
            .add_stmt(meta, Stmt::WarningMeta { modifier, target }))
    }
}

#[cfg(test)]
mod tests {
    use crate::tests::parse_module;
    use crate::*;

    fn body_of(store: &AstStore, result: &ParseResult, name: &str) -> Vec<StmtId> {
        for &s in &store.scopes[result.global_scope].symbols {
            if store.symbols[s].name.text == name {
                if let SymbolKind::Function { body, .. } = &store.symbols[s].kind {
                    return body.clone();
                }
            }
        }
        panic!("no function named {}", name);
    }

    #[test]
    fn test_if_elif_else() {
        let source = "\
fun f(x: Int) {
    if x > 0 {
        return
    } elif x < 0, return
    else return
}
";
        let (store, result, handler) = parse_module(source);
        assert_eq!(handler.count(), 0, "{:?}", handler.diagnostics());
        let body = body_of(&store, &result, "f");
        assert_eq!(body.len(), 1);
        match &store.stmts[body[0]].kind {
            Stmt::If {
                branches,
                else_block,
            } => {
                assert_eq!(branches.len(), 2);
                assert!(else_block.is_some());
            }
            other => panic!("expected if, got {:?}", other),
        }
    }

    #[test]
    fn test_while_and_repeat() {
        let source = "\
fun f() {
    while true {
        break
    }
    repeat {
        continue
    } while false
}
";
        let (store, result, handler) = parse_module(source);
        assert_eq!(handler.count(), 0, "{:?}", handler.diagnostics());
        let body = body_of(&store, &result, "f");
        assert_eq!(body.len(), 2);
        assert!(matches!(store.stmts[body[0]].kind, Stmt::While { .. }));
        assert!(matches!(store.stmts[body[1]].kind, Stmt::Repeat { .. }));
    }

    #[test]
    fn test_for_loop_scopes_iterator() {
        let source = "\
fun f(xs: Int[]) {
    for x in xs {
        x
    }
}
";
        let (store, result, handler) = parse_module(source);
        assert_eq!(handler.count(), 0, "{:?}", handler.diagnostics());
        let body = body_of(&store, &result, "f");
        match &store.stmts[body[0]].kind {
            Stmt::For {
                iterator, block, ..
            } => {
                assert!(store.scopes[block.scope].symbols.contains(iterator));
            }
            other => panic!("expected for, got {:?}", other),
        }
    }

    #[test]
    fn test_switch_cases_and_fall() {
        let source = "\
fun f(x: Int) {
    switch x {
        case 1:
            fall
        case 2:
            break
        default:
            break
    }
}
";
        let (store, result, handler) = parse_module(source);
        assert_eq!(handler.count(), 0, "{:?}", handler.diagnostics());
        let body = body_of(&store, &result, "f");
        match &store.stmts[body[0]].kind {
            Stmt::Switch { cases, .. } => {
                assert_eq!(cases.len(), 3);
                assert!(cases[0].condition.is_some());
                assert!(cases[2].condition.is_none());
            }
            other => panic!("expected switch, got {:?}", other),
        }
    }

    #[test]
    fn test_try_catch() {
        let source = "\
fun f() {
    try {
        g()
    }
    catch e: Error {
        throw e
    }
}
";
        let (store, result, handler) = parse_module(source);
        assert_eq!(handler.count(), 0, "{:?}", handler.diagnostics());
        let body = body_of(&store, &result, "f");
        match &store.stmts[body[0]].kind {
            Stmt::Try { catches, .. } => {
                assert_eq!(catches.len(), 1);
                assert_eq!(store.symbols[catches[0].exception].name.text, "e");
            }
            other => panic!("expected try, got {:?}", other),
        }
    }

    #[test]
    fn test_local_declarations_and_unsafe_block() {
        let source = "\
fun f() {
    var x: Int = 1
    const y = 2
    unsafe {
        x = y
    }
}
";
        let (store, result, handler) = parse_module(source);
        assert_eq!(handler.count(), 0, "{:?}", handler.diagnostics());
        let body = body_of(&store, &result, "f");
        assert_eq!(body.len(), 3);
        assert!(matches!(store.stmts[body[0]].kind, Stmt::Decl(_)));
        assert!(matches!(store.stmts[body[1]].kind, Stmt::Decl(_)));
        match &store.stmts[body[2]].kind {
            Stmt::Block(block) => {
                assert_eq!(block.modifiers.len(), 1);
                assert_eq!(block.modifiers[0].kind(), aclc_lex::TokenKind::Unsafe);
            }
            other => panic!("expected block, got {:?}", other),
        }
    }

    #[test]
    fn test_local_warning_meta_wraps_statement() {
        let source = "\
fun f() {
    @disablewarning(\"static-access-via-instance\")
    g()
}
";
        let (store, result, handler) = parse_module(source);
        assert_eq!(handler.count(), 0, "{:?}", handler.diagnostics());
        let body = body_of(&store, &result, "f");
        assert!(matches!(
            store.stmts[body[0]].kind,
            Stmt::WarningMeta { .. }
        ));
    }
}
