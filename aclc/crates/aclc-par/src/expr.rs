//! Expression parsing.
//!
//! Recursive descent over the precedence ladder, lowest first: assignment
//! (right-associative), lambda (tried speculatively), ternary, logical
//! or/and, bitwise or/xor/and, equality, relational, nil-coalescing,
//! casting (right-hand side is a type reference), range, bitshift, additive,
//! multiplicative, exponential (right-associative), prefix, postfix,
//! access/call, primary.

use crate::ast::*;
use crate::items::LAMBDA_MODIFIERS;
use crate::{
    is_access_operator, is_additive_operator, is_assignment_operator, is_bitshift_operator,
    is_call_operator, is_casting_operator, is_equality_operator, is_literal,
    is_multiplicative_operator, is_postfix_operator, is_prefix_operator, is_range_operator,
    is_relational_operator, PResult, Parser,
};
use aclc_lex::TokenKind;

use TokenKind::*;

impl<'a> Parser<'a> {
    pub(crate) fn parse_expression(&mut self) -> PResult<ExprId> {
        self.parse_assignment_expression()
    }

    pub(crate) fn parse_expression_list(&mut self) -> PResult<Vec<ExprId>> {
        let mut dest = vec![self.parse_expression()?];
        while self.lh_kind(0) == Comma {
            self.advance();
            dest.push(self.parse_expression()?);
        }
        Ok(dest)
    }

    fn parse_assignment_expression(&mut self) -> PResult<ExprId> {
        let left = self.parse_l2_expression()?;
        if is_assignment_operator(self.lh_kind(0)) {
            let op = self.take();
            let right = self.parse_assignment_expression()?;
            let meta = op.meta;
            return Ok(self
                .store
                .add_expr(meta, ExprKind::Binary { op, left, right }));
        }
        Ok(left)
    }

    /// Lambdas are tried first under a mark so that `(a, b) => expr` is
    /// recognized without committing; on failure the parser rewinds and
    /// re-parses as an ordinary expression.
    fn parse_l2_expression(&mut self) -> PResult<ExprId> {
        let saved_scope = self.current_scope;
        self.mark();
        match self.parse_lambda_expression() {
            Ok(result) => {
                self.pop_mark();
                Ok(result)
            }
            Err(_) => {
                self.reset_to_mark();
                self.current_scope = saved_scope;
                self.panicking = false;
                self.parse_ternary_expression()
            }
        }
    }

    fn parse_lambda_expression(&mut self) -> PResult<ExprId> {
        let modifiers = self.parse_modifiers(LAMBDA_MODIFIERS)?;

        let mut parameters = Vec::new();
        if self.lh_kind(0) == LParen {
            self.advance();
            if self.lh_kind(0) != RParen {
                parameters = self.parse_parameters()?;
            }
            self.expect(RParen)?;
        } else {
            parameters.push(self.parse_parameter()?);
        }

        let meta = self.lh(0).meta;
        self.expect(EqualsArrow)?;

        let scope = self
            .store
            .new_scope(Some(self.current_scope), ScopeKind::Lambda);
        let body = self.with_scope(scope, |p| {
            for &param in &parameters {
                p.declare_in(scope, param)?;
            }
            p.skip_newlines(false);
            if p.lh_kind(0) == LBrace {
                p.advance();
                let body = p.parse_function_block_content();
                p.expect(RBrace)?;
                Ok(body)
            } else {
                let stmt_meta = p.lh(0).meta;
                let value = p.parse_expression()?;
                Ok(vec![p.store.add_stmt(
                    stmt_meta,
                    Stmt::Return { value: Some(value) },
                )])
            }
        })?;

        Ok(self.store.add_expr(
            meta,
            ExprKind::Lambda {
                modifiers,
                parameters,
                scope,
                body,
            },
        ))
    }

    fn parse_ternary_expression(&mut self) -> PResult<ExprId> {
        let condition = self.parse_logical_or_expression()?;
        if self.lh_kind(0) == QuestionMark {
            let meta = self.lh(0).meta;
            self.advance();
            let then_value = self.parse_expression()?;
            self.expect(Colon)?;
            let else_value = self.parse_expression()?;
            return Ok(self.store.add_expr(
                meta,
                ExprKind::Ternary {
                    condition,
                    then_value,
                    else_value,
                },
            ));
        }
        Ok(condition)
    }

    fn parse_binary_chain(
        &mut self,
        accepts: fn(TokenKind) -> bool,
        next: fn(&mut Self) -> PResult<ExprId>,
    ) -> PResult<ExprId> {
        let mut left = next(self)?;
        while accepts(self.lh_kind(0)) {
            let op = self.take();
            let right = next(self)?;
            let meta = op.meta;
            left = self
                .store
                .add_expr(meta, ExprKind::Binary { op, left, right });
        }
        Ok(left)
    }

    fn parse_logical_or_expression(&mut self) -> PResult<ExprId> {
        self.parse_binary_chain(
            |k| k == DoublePipe || k == Or,
            Self::parse_logical_and_expression,
        )
    }

    fn parse_logical_and_expression(&mut self) -> PResult<ExprId> {
        self.parse_binary_chain(
            |k| k == DoubleAmpersand || k == And,
            Self::parse_bitwise_or_expression,
        )
    }

    fn parse_bitwise_or_expression(&mut self) -> PResult<ExprId> {
        self.parse_binary_chain(|k| k == Pipe, Self::parse_bitwise_xor_expression)
    }

    fn parse_bitwise_xor_expression(&mut self) -> PResult<ExprId> {
        self.parse_binary_chain(|k| k == Caret, Self::parse_bitwise_and_expression)
    }

    fn parse_bitwise_and_expression(&mut self) -> PResult<ExprId> {
        self.parse_binary_chain(|k| k == Ampersand, Self::parse_equality_expression)
    }

    fn parse_equality_expression(&mut self) -> PResult<ExprId> {
        self.parse_binary_chain(is_equality_operator, Self::parse_relational_expression)
    }

    fn parse_relational_expression(&mut self) -> PResult<ExprId> {
        self.parse_binary_chain(
            is_relational_operator,
            Self::parse_nil_coalescing_expression,
        )
    }

    fn parse_nil_coalescing_expression(&mut self) -> PResult<ExprId> {
        self.parse_binary_chain(|k| k == DoubleQuestionMark, Self::parse_casting_expression)
    }

    fn parse_casting_expression(&mut self) -> PResult<ExprId> {
        let mut left = self.parse_range_expression()?;
        while is_casting_operator(self.lh_kind(0)) {
            let op = self.take();
            let ty = self.parse_type_ref()?;
            let meta = op.meta;
            left = self
                .store
                .add_expr(meta, ExprKind::Casting { op, left, ty });
        }
        Ok(left)
    }

    fn parse_range_expression(&mut self) -> PResult<ExprId> {
        self.parse_binary_chain(is_range_operator, Self::parse_bitshift_expression)
    }

    fn parse_bitshift_expression(&mut self) -> PResult<ExprId> {
        self.parse_binary_chain(is_bitshift_operator, Self::parse_additive_expression)
    }

    fn parse_additive_expression(&mut self) -> PResult<ExprId> {
        self.parse_binary_chain(is_additive_operator, Self::parse_multiplicative_expression)
    }

    fn parse_multiplicative_expression(&mut self) -> PResult<ExprId> {
        self.parse_binary_chain(is_multiplicative_operator, Self::parse_exponential_expression)
    }

    fn parse_exponential_expression(&mut self) -> PResult<ExprId> {
        let left = self.parse_prefix_expression()?;
        if self.lh_kind(0) == DoubleAsterisk {
            let op = self.take();
            let right = self.parse_exponential_expression()?;
            let meta = op.meta;
            return Ok(self
                .store
                .add_expr(meta, ExprKind::Binary { op, left, right }));
        }
        Ok(left)
    }

    fn parse_prefix_expression(&mut self) -> PResult<ExprId> {
        let mut operators = Vec::new();
        while is_prefix_operator(self.lh_kind(0)) {
            operators.push(self.take());
        }
        let mut arg = self.parse_postfix_expression()?;
        while let Some(op) = operators.pop() {
            let meta = op.meta;
            arg = self
                .store
                .add_expr(meta, ExprKind::UnaryPrefix { op, arg });
        }
        Ok(arg)
    }

    fn parse_postfix_expression(&mut self) -> PResult<ExprId> {
        let mut arg = self.parse_access_call_expression()?;
        while is_postfix_operator(self.lh_kind(0)) {
            let op = self.take();
            let meta = op.meta;
            arg = self
                .store
                .add_expr(meta, ExprKind::UnaryPostfix { op, arg });
        }
        Ok(arg)
    }

    fn parse_access_call_expression(&mut self) -> PResult<ExprId> {
        let mut left = self.parse_primary_expression()?;
        while is_access_operator(self.lh_kind(0)) || is_call_operator(self.lh_kind(0)) {
            if is_access_operator(self.lh_kind(0)) {
                let op = self.take();
                let right = self.parse_primary_expression()?;
                let meta = op.meta;
                left = self
                    .store
                    .add_expr(meta, ExprKind::Binary { op, left, right });
            } else {
                left = self.parse_call_expression_end(left)?;
            }
        }
        Ok(left)
    }

    fn parse_call_expression_end(&mut self, caller: ExprId) -> PResult<ExprId> {
        if self.lh_kind(0) == LParen {
            let meta = self.lh(0).meta;
            self.advance();
            self.skip_newlines(false);
            let mut args = Vec::new();
            if self.lh_kind(0) != RParen {
                args = self.parse_expression_list()?;
            }
            self.expect(RParen)?;
            return Ok(self
                .store
                .add_expr(meta, ExprKind::FunctionCall { caller, args }));
        }

        let meta = self.lh(0).meta;
        self.expect(LBracket)?;
        let index = self.parse_expression()?;
        self.expect(RBracket)?;
        Ok(self.store.add_expr(
            meta,
            ExprKind::Subscript {
                target: caller,
                index,
            },
        ))
    }

    fn parse_primary_expression(&mut self) -> PResult<ExprId> {
        let kind = self.lh_kind(0);

        if is_literal(kind) {
            let token = self.take();
            let meta = token.meta;
            return Ok(self.store.add_expr(meta, ExprKind::Literal { token }));
        }
        if kind == Global || kind == Id {
            return self.parse_identifier_expression();
        }
        if kind == LBracket {
            return self.parse_array_or_map_literal_expression();
        }

        let meta = self.lh(0).meta;
        self.expect(LParen)?;
        let expr = self.parse_expression()?;
        if self.lh_kind(0) == Comma {
            let mut elements = vec![expr];
            while self.lh_kind(0) == Comma {
                self.advance();
                elements.push(self.parse_expression()?);
            }
            self.expect(RParen)?;
            return Ok(self
                .store
                .add_expr(meta, ExprKind::TupleLiteral { elements }));
        }
        self.expect(RParen)?;
        Ok(expr)
    }

    fn parse_identifier_expression(&mut self) -> PResult<ExprId> {
        let mut global_prefix = false;
        if self.lh_kind(0) == Global {
            self.advance();
            self.expect(Dot)?;
            global_prefix = true;
        }
        let name = self.match_kind(Id)?;

        // Generics after an identifier are speculative: `f<a, b>(c)` is a
        // generic call, but `f < a` is a comparison. If the `<...>` does not
        // parse, or the stream afterwards continues with another primary
        // expression instead of a call/access/terminator, the mark is reset
        // and `<` is re-interpreted as a relational operator.
        let mut generics = Vec::new();
        if self.lh_kind(0) == Lt {
            self.mark();
            match self.parse_generic_impl() {
                Ok(parsed) => {
                    let next = self.lh_kind(0);
                    if is_literal(next) || next == Id || next == Global {
                        self.reset_to_mark();
                    } else {
                        self.pop_mark();
                        generics = parsed;
                    }
                }
                Err(_) => {
                    self.reset_to_mark();
                    self.panicking = false;
                }
            }
        }

        let meta = name.meta;
        Ok(self.store.add_expr(
            meta,
            ExprKind::Identifier {
                name,
                generics,
                global_prefix,
                referent: None,
                possible_referents: Vec::new(),
            },
        ))
    }

    fn parse_array_or_map_literal_expression(&mut self) -> PResult<ExprId> {
        let meta = self.lh(0).meta;
        self.expect(LBracket)?;
        self.skip_newlines(false);

        let mut keys = Vec::new();
        let mut values = Vec::new();
        let mut map_literal = false;

        if self.lh_kind(0) != RBracket {
            keys.push(self.parse_expression()?);
            self.skip_newlines(false);

            if self.lh_kind(0) == Colon {
                self.advance();
                values.push(self.parse_expression()?);
                map_literal = true;
                self.skip_newlines(false);
            }
        }

        while self.lh_kind(0) == Comma {
            self.advance();
            self.skip_newlines(false);
            keys.push(self.parse_expression()?);
            self.skip_newlines(false);

            if map_literal {
                self.expect(Colon)?;
                self.skip_newlines(false);
                values.push(self.parse_expression()?);
                self.skip_newlines(false);
            }
        }

        self.expect(RBracket)?;

        if map_literal {
            return Ok(self
                .store
                .add_expr(meta, ExprKind::MapLiteral { keys, values }));
        }
        Ok(self
            .store
            .add_expr(meta, ExprKind::ArrayLiteral { elements: keys }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aclc_lex::Lexer;
    use aclc_util::span::ModuleId;
    use aclc_util::Handler;

    fn parse_expr(source: &str) -> (AstStore, ExprId) {
        let handler = Handler::new();
        let mut store = AstStore::new();
        let expr = {
            let lexer = Lexer::new(ModuleId(0), source, &handler);
            let mut parser = Parser::new(&mut store, lexer, &handler);
            parser.parse_expression().ok()
        };
        assert_eq!(handler.count(), 0, "{:?}", handler.diagnostics());
        (store, expr.expect("expression parsed"))
    }

    /// Render the tree with explicit grouping so precedence is visible.
    fn render(store: &AstStore, expr: ExprId) -> String {
        match &store.exprs[expr].kind {
            ExprKind::Literal { token } => token.text.clone(),
            ExprKind::Identifier { name, generics, .. } => {
                if generics.is_empty() {
                    name.text.clone()
                } else {
                    let parts: Vec<_> =
                        generics.iter().map(|g| store.type_ref_text(*g)).collect();
                    format!("{}<{}>", name.text, parts.join(", "))
                }
            }
            ExprKind::Binary { op, left, right } => format!(
                "({} {} {})",
                render(store, *left),
                op.text,
                render(store, *right)
            ),
            ExprKind::UnaryPrefix { op, arg } => {
                format!("({}{})", op.text, render(store, *arg))
            }
            ExprKind::UnaryPostfix { op, arg } => {
                format!("({}{})", render(store, *arg), op.text)
            }
            ExprKind::Ternary {
                condition,
                then_value,
                else_value,
            } => format!(
                "({} ? {} : {})",
                render(store, *condition),
                render(store, *then_value),
                render(store, *else_value)
            ),
            ExprKind::FunctionCall { caller, args } => {
                let parts: Vec<_> = args.iter().map(|a| render(store, *a)).collect();
                format!("{}({})", render(store, *caller), parts.join(", "))
            }
            ExprKind::Subscript { target, index } => {
                format!("{}[{}]", render(store, *target), render(store, *index))
            }
            ExprKind::Casting { op, left, ty } => format!(
                "({} {} {})",
                render(store, *left),
                op.text,
                store.type_ref_text(*ty)
            ),
            ExprKind::Lambda { parameters, .. } => format!("lambda/{}", parameters.len()),
            ExprKind::ArrayLiteral { elements } => {
                let parts: Vec<_> = elements.iter().map(|e| render(store, *e)).collect();
                format!("[{}]", parts.join(", "))
            }
            ExprKind::MapLiteral { keys, values } => {
                let parts: Vec<_> = keys
                    .iter()
                    .zip(values)
                    .map(|(k, v)| format!("{}: {}", render(store, *k), render(store, *v)))
                    .collect();
                format!("[{}]", parts.join(", "))
            }
            ExprKind::TupleLiteral { elements } => {
                let parts: Vec<_> = elements.iter().map(|e| render(store, *e)).collect();
                format!("({})", parts.join(", "))
            }
        }
    }

    fn rendered(source: &str) -> String {
        let (store, expr) = parse_expr(source);
        render(&store, expr)
    }

    #[test]
    fn test_precedence_multiplicative_over_additive() {
        assert_eq!(rendered("a + b * c"), "(a + (b * c))");
    }

    #[test]
    fn test_exponent_binds_tighter_than_multiply() {
        assert_eq!(rendered("a * b ** c"), "(a * (b ** c))");
    }

    #[test]
    fn test_exponent_right_associative() {
        assert_eq!(rendered("a ** b ** c"), "(a ** (b ** c))");
    }

    #[test]
    fn test_assignment_right_associative() {
        assert_eq!(rendered("a = b = c"), "(a = (b = c))");
        assert_eq!(rendered("a += b"), "(a += b)");
    }

    #[test]
    fn test_ternary() {
        assert_eq!(rendered("a ? b : c"), "(a ? b : c)");
    }

    #[test]
    fn test_nil_coalescing_vs_logical() {
        assert_eq!(rendered("a ?? b || c"), "((a ?? b) || c)");
    }

    #[test]
    fn test_casting_with_type_rhs() {
        assert_eq!(rendered("x as? Int"), "(x as? Int)");
        assert_eq!(rendered("x is String"), "(x is String)");
    }

    #[test]
    fn test_prefix_and_postfix() {
        assert_eq!(rendered("-x++"), "(-(x++))");
        assert_eq!(rendered("try? f()"), "(try?f())");
        assert_eq!(rendered("await g()"), "(awaitg())");
    }

    #[test]
    fn test_access_and_call_chain() {
        assert_eq!(rendered("a.b(c)[d]"), "(a . b)(c)[d]");
        assert_eq!(rendered("x?.y"), "(x ?. y)");
    }

    #[test]
    fn test_lambda_speculation() {
        assert_eq!(rendered("(a, b) => a"), "lambda/2");
        assert_eq!(rendered("x => x"), "lambda/1");
        // Not a lambda; must rewind and parse as a parenthesized expression.
        assert_eq!(rendered("(a)"), "a");
    }

    #[test]
    fn test_generics_speculation() {
        // A generic call keeps its generic arguments.
        assert_eq!(rendered("f<Int>(x)"), "f<Int>(x)");
        // A comparison chain re-interprets `<` as relational: after the
        // speculative `<b>` parse, `c` continues as another primary, so the
        // mark is reset.
        assert_eq!(rendered("a < b"), "(a < b)");
        assert_eq!(rendered("a < b > c"), "((a < b) > c)");
    }

    #[test]
    fn test_array_and_map_literals() {
        assert_eq!(rendered("[1, 2, 3]"), "[1, 2, 3]");
        assert_eq!(rendered("['a': 1, 'b': 2]"), "[a: 1, b: 2]");
        assert_eq!(rendered("(1, 'two')"), "(1, two)");
    }

    #[test]
    fn test_logical_keyword_operators() {
        assert_eq!(rendered("a and b or not c"), "((a and b) or (notc))");
    }
}
