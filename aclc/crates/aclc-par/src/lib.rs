//! aclc-par - Parser (syntactic analysis) for Accele modules.
//!
//! A predictive recursive-descent parser with speculative marks. The parser
//! pulls tokens on demand from the lexer into a look-ahead buffer, builds the
//! AST in the shared [`AstStore`] arenas, and grows the lexical scope tree as
//! declarations are parsed.
//!
//! Two failure disciplines coexist:
//!
//! - While **speculating** (at least one mark active), diagnostics are
//!   suppressed and any mismatch unwinds as an ordinary `Err` that the
//!   speculation site catches before rolling the token position back.
//! - Outside speculation, a mismatch reports exactly one diagnostic and then
//!   **panics**: the parser scans forward to the context's terminator set
//!   (statement end or block end) and resumes, so one bad statement never
//!   cascades into a wall of errors.

pub mod ast;
mod expr;
mod items;
mod stmt;
mod types;

pub use ast::*;

use aclc_lex::{Lexer, Relexer, Token, TokenKind};
use aclc_util::diagnostic::{ErrorCode, Handler};
use aclc_util::span::SourceMeta;

/// Internal parse-failure signal. Any diagnostic has already been recorded
/// (or suppressed, while speculating) by the time this value exists.
pub(crate) struct ParseFail;

pub(crate) type PResult<T> = Result<T, ParseFail>;

/// Token classes the panic scan stops at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PanicTerminator {
    StatementEnd,
    BlockEnd,
}

impl PanicTerminator {
    fn kinds(self) -> &'static [TokenKind] {
        match self {
            PanicTerminator::StatementEnd => &[
                TokenKind::Nl,
                TokenKind::Semicolon,
                TokenKind::Eof,
                TokenKind::RBrace,
            ],
            PanicTerminator::BlockEnd => &[TokenKind::RBrace],
        }
    }
}

/// Result of parsing one module.
#[derive(Clone, Copy, Debug)]
pub struct ParseResult {
    /// The module's global scope.
    pub global_scope: ScopeId,
    /// The symbol owning the global scope.
    pub global_symbol: SymbolId,
    /// True if any non-speculative panic fired; the driver exits non-zero.
    pub did_panic: bool,
}

/// The parser for one module.
pub struct Parser<'a> {
    pub(crate) store: &'a mut AstStore,
    lexer: Lexer<'a>,
    pub(crate) handler: &'a Handler,
    buffer: Vec<Token>,
    current: usize,
    marks: Vec<usize>,
    pub(crate) current_scope: ScopeId,
    global_scope: ScopeId,
    global_symbol: SymbolId,
    pub(crate) panic_terminator: PanicTerminator,
    pub(crate) panicking: bool,
    did_panic: bool,
}

impl<'a> Parser<'a> {
    /// Create a parser feeding from `lexer` into `store`.
    pub fn new(store: &'a mut AstStore, lexer: Lexer<'a>, handler: &'a Handler) -> Self {
        let module = lexer.module();
        let meta = SourceMeta::new(module, 1, 1);
        let global_scope = store.new_scope(None, ScopeKind::Global);
        let global_symbol = store.new_symbol(
            Token::new(TokenKind::Id, "<global>", meta),
            Vec::new(),
            Some(global_scope),
            SymbolKind::GlobalScope {
                content: Vec::new(),
            },
        );
        Self {
            store,
            lexer,
            handler,
            buffer: Vec::new(),
            current: 0,
            marks: Vec::new(),
            current_scope: global_scope,
            global_scope,
            global_symbol,
            panic_terminator: PanicTerminator::StatementEnd,
            panicking: false,
            did_panic: false,
        }
    }

    // ----- Token buffer mechanics ----- //

    fn sync(&mut self, pos: usize) {
        while self.current + pos >= self.buffer.len() {
            let t = self.lexer.next_token();
            self.buffer.push(t);
        }
    }

    /// Peek the `pos`-th upcoming token.
    pub(crate) fn lh(&mut self, pos: usize) -> &Token {
        self.sync(pos);
        &self.buffer[self.current + pos]
    }

    /// Peek the kind of the `pos`-th upcoming token.
    pub(crate) fn lh_kind(&mut self, pos: usize) -> TokenKind {
        self.lh(pos).kind
    }

    pub(crate) fn advance(&mut self) {
        self.current += 1;
        if self.current == self.buffer.len() && self.marks.is_empty() {
            self.buffer.clear();
            self.current = 0;
        }
        self.sync(0);
    }

    /// Consume and return the current token.
    pub(crate) fn take(&mut self) -> Token {
        self.sync(0);
        let t = self.buffer[self.current].clone();
        self.advance();
        t
    }

    /// Consume the current token if it has `kind`, else diagnose and panic.
    pub(crate) fn match_kind(&mut self, kind: TokenKind) -> PResult<Token> {
        if self.lh_kind(0) == kind {
            Ok(self.take())
        } else {
            if !self.is_speculating() {
                let t = self.lh(0).clone();
                self.handler.report(
                    ErrorCode::InvalidToken,
                    t.meta,
                    t.highlight_len(),
                    format!("expected {:?}, found {:?}", kind, t.kind),
                );
            }
            Err(self.panic())
        }
    }

    /// Consume the current token if it has `kind`, discarding it.
    pub(crate) fn expect(&mut self, kind: TokenKind) -> PResult<()> {
        self.match_kind(kind).map(|_| ())
    }

    pub(crate) fn has_next(&mut self) -> bool {
        self.lh_kind(0) != TokenKind::Eof
    }

    // ----- Speculation ----- //

    pub(crate) fn mark(&mut self) {
        self.marks.push(self.current);
    }

    pub(crate) fn reset_to_mark(&mut self) {
        self.current = self.marks.pop().expect("reset without mark");
    }

    pub(crate) fn pop_mark(&mut self) {
        self.marks.pop().expect("pop without mark");
    }

    pub(crate) fn is_speculating(&self) -> bool {
        !self.marks.is_empty()
    }

    // ----- Panic and resynchronization ----- //

    /// Scan forward to the current panic terminator set and return the
    /// failure signal for propagation.
    pub(crate) fn panic(&mut self) -> ParseFail {
        let targets = self.panic_terminator.kinds();
        while self.has_next() && !targets.contains(&self.lh_kind(0)) {
            self.advance();
        }
        self.panicking = true;
        if !self.is_speculating() {
            self.did_panic = true;
        }
        ParseFail
    }

    pub(crate) fn diagnose_expected(&mut self, what: &str) {
        if !self.is_speculating() {
            let t = self.lh(0).clone();
            self.handler.report(
                ErrorCode::InvalidToken,
                t.meta,
                t.highlight_len(),
                format!("expected {}, found {:?}", what, t.kind),
            );
        }
    }

    pub(crate) fn report(
        &mut self,
        code: ErrorCode,
        meta: SourceMeta,
        highlight_len: usize,
        message: String,
    ) {
        if !self.is_speculating() {
            self.handler.report(code, meta, highlight_len, message);
        }
    }

    /// Reconfigure the lexer's recovery sentinels for the current context.
    pub(crate) fn set_lexer_sentinels(&mut self, sentinels: &[char]) {
        self.lexer.set_recovery_sentinels(sentinels);
    }

    // ----- Relexing ----- //

    /// Split the current look-ahead token via the relexer, replacing it in
    /// the buffer with its pieces. No-op when the token cannot be split.
    pub(crate) fn relex(&mut self) {
        self.sync(0);
        let pieces = Relexer::new(&self.buffer[self.current]).relex();
        if !pieces.is_empty() {
            self.buffer.splice(self.current..self.current + 1, pieces);
        }
    }

    // ----- Scope management ----- //

    /// Run `f` with `scope` as the current scope, restoring the previous
    /// scope afterwards even when `f` fails mid-way through nested scopes.
    /// Function-like scopes are pruned on the way out: everything but
    /// parameters and generic types is dropped, and locals are re-declared
    /// in declaration order during resolution.
    pub(crate) fn with_scope<T>(
        &mut self,
        scope: ScopeId,
        f: impl FnOnce(&mut Self) -> PResult<T>,
    ) -> PResult<T> {
        let saved = self.current_scope;
        self.current_scope = scope;
        let result = f(self);
        self.prune_scope(scope);
        self.current_scope = saved;
        result
    }

    /// Drop everything but parameters and generic types from a
    /// function-like scope.
    pub(crate) fn prune_scope(&mut self, scope: ScopeId) {
        if !self.store.scopes[scope].kind.is_function_scope() {
            return;
        }
        let keep: Vec<SymbolId> = self.store.scopes[scope]
            .symbols
            .iter()
            .copied()
            .filter(|&s| {
                matches!(
                    self.store.symbols[s].kind,
                    SymbolKind::Parameter { .. } | SymbolKind::GenericType { .. }
                )
            })
            .collect();
        self.store.scopes[scope].symbols = keep;
    }

    /// Declare `symbol` in `scope`, diagnosing duplicates.
    pub(crate) fn declare_in(&mut self, scope: ScopeId, symbol: SymbolId) -> PResult<()> {
        match self.store.declare(scope, symbol) {
            Ok(()) => Ok(()),
            Err(original) => {
                if !self.is_speculating() {
                    let dup = &self.store.symbols[symbol];
                    let orig = &self.store.symbols[original];
                    let message = format!(
                        "duplicate symbol `{}`; previously declared at {}:{}",
                        dup.name.text, orig.meta.line, orig.meta.col
                    );
                    let meta = dup.meta;
                    let len = dup.name.highlight_len();
                    self.handler
                        .report(ErrorCode::DuplicateSymbol, meta, len, message);
                }
                Err(self.panic())
            }
        }
    }

    /// Declare `symbol` in the current scope.
    pub(crate) fn declare_current(&mut self, symbol: SymbolId) -> PResult<()> {
        self.declare_in(self.current_scope, symbol)
    }

    // ----- Newline handling ----- //

    /// Consume a statement terminator: NL or `;` (greedily), or accept a
    /// newline-equivalent closing token without consuming it.
    pub(crate) fn parse_newline_equiv(&mut self) -> PResult<()> {
        let k = self.lh_kind(0);
        if k == TokenKind::Nl || k == TokenKind::Semicolon {
            self.advance();
            while matches!(self.lh_kind(0), TokenKind::Nl | TokenKind::Semicolon) {
                self.advance();
            }
            Ok(())
        } else if is_newline_equivalent(k) {
            Ok(())
        } else {
            self.diagnose_expected("newline or newline-equivalent token");
            Err(self.panic())
        }
    }

    pub(crate) fn skip_newlines(&mut self, include_semicolons: bool) -> usize {
        let mut count = 0;
        while self.lh_kind(0) == TokenKind::Nl
            || (include_semicolons && self.lh_kind(0) == TokenKind::Semicolon)
        {
            self.advance();
            count += 1;
        }
        count
    }

    /// Look past any run of modifiers (and newlines) to the token that
    /// decides which declaration form follows.
    pub(crate) fn peek_past_modifiers(&mut self) -> TokenKind {
        let mut k = 0usize;
        let mut t = self.lh_kind(0);
        while is_modifier(t) || t == TokenKind::Nl {
            if t == TokenKind::MetaEnablewarning || t == TokenKind::MetaDisablewarning {
                // 3 for keyword, lparen, and initial string literal
                k += 3;
                // 2 for comma and next string literal
                while self.lh_kind(k) == TokenKind::Comma {
                    k += 2;
                }
                k += 1;
                t = self.lh_kind(k);
            } else {
                k += 1;
                t = self.lh_kind(k);
            }
        }
        t
    }

    // ----- Top level ----- //

    /// Parse the whole module.
    pub fn parse(mut self) -> ParseResult {
        self.lexer.set_recovery_sentinels(&['\r', '\n', ';']);
        self.panic_terminator = PanicTerminator::StatementEnd;

        let mut content: Vec<Item> = Vec::new();
        self.skip_newlines(true);
        while self.has_next() {
            self.lexer.set_recovery_sentinels(&['\r', '\n', ';']);
            match self.parse_global_content(content.len()) {
                Ok(item) => content.push(item),
                Err(ParseFail) => {
                    self.panicking = false;
                    if self.lh_kind(0) == TokenKind::RBrace {
                        self.advance();
                    }
                }
            }
            self.skip_newlines(true);
        }

        if let SymbolKind::GlobalScope { content: dest } =
            &mut self.store.symbols[self.global_symbol].kind
        {
            *dest = content;
        }

        ParseResult {
            global_scope: self.global_scope,
            global_symbol: self.global_symbol,
            did_panic: self.did_panic,
        }
    }

    fn parse_global_content(&mut self, items_so_far: usize) -> PResult<Item> {
        self.panic_terminator = PanicTerminator::StatementEnd;
        self.skip_newlines(true);

        match self.peek_past_modifiers() {
            TokenKind::Fun => self
                .parse_function(items::GLOBAL_FUNCTION_MODIFIERS, false)
                .map(Item::Decl),
            TokenKind::MetaEnablewarning | TokenKind::MetaDisablewarning => {
                let modifier = self.parse_warning_meta_modifier()?;
                self.parse_newline_equiv()?;
                Ok(Item::WarningMeta(modifier))
            }
            TokenKind::MetaNobuiltins => {
                let token = self.take();
                self.parse_newline_equiv()?;
                Ok(Item::NoBuiltins(token))
            }
            TokenKind::Var => self
                .parse_non_class_variable(items::GLOBAL_VARIABLE_MODIFIERS)
                .map(Item::Decl),
            TokenKind::Const => self
                .parse_non_class_constant(items::GLOBAL_VARIABLE_MODIFIERS)
                .map(Item::Decl),
            TokenKind::Alias => self
                .parse_alias(items::GLOBAL_ALIAS_MODIFIERS)
                .map(Item::Decl),
            TokenKind::Class => self
                .parse_class(items::GLOBAL_CLASS_MODIFIERS)
                .map(Item::Decl),
            TokenKind::Struct => self
                .parse_struct(items::GLOBAL_STRUCT_MODIFIERS)
                .map(Item::Decl),
            TokenKind::Template => self
                .parse_template(items::GLOBAL_TEMPLATE_MODIFIERS)
                .map(Item::Decl),
            TokenKind::Enum => self
                .parse_enum(items::GLOBAL_ENUM_MODIFIERS)
                .map(Item::Decl),
            TokenKind::Namespace => self
                .parse_namespace(items::GLOBAL_NAMESPACE_MODIFIERS)
                .map(Item::Decl),
            TokenKind::Import => self.parse_import().map(Item::Decl),
            TokenKind::MetaSrclock => {
                let token = self.match_kind(TokenKind::MetaSrclock)?;
                if items_so_far > 0 {
                    let meta = token.meta;
                    let len = token.highlight_len();
                    self.report(
                        ErrorCode::NonfrontedSourceLock,
                        meta,
                        len,
                        "@srclock must appear at the top of the module".into(),
                    );
                }
                Ok(Item::SourceLock(token))
            }
            other => {
                let t = self.lh(0).clone();
                self.report(
                    ErrorCode::InvalidToken,
                    t.meta,
                    t.highlight_len(),
                    format!("unexpected token {:?} in global scope", other),
                );
                Err(self.panic())
            }
        }
    }
}

// ----- Token classification ----- //

pub(crate) fn is_modifier(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Internal
            | TokenKind::Public
            | TokenKind::Private
            | TokenKind::Protected
            | TokenKind::Static
            | TokenKind::Unsafe
            | TokenKind::Atomic
            | TokenKind::Ref
            | TokenKind::Strong
            | TokenKind::Weak
            | TokenKind::Greedy
            | TokenKind::Final
            | TokenKind::Override
            | TokenKind::Infix
            | TokenKind::Prefix
            | TokenKind::Postfix
            | TokenKind::Throwing
            | TokenKind::Noexcept
            | TokenKind::Async
            | TokenKind::Extern
            | TokenKind::MetaDeprecated
            | TokenKind::MetaExternalinit
            | TokenKind::MetaStackalloc
            | TokenKind::MetaLaxthrow
            | TokenKind::MetaNoreturn
            | TokenKind::MetaEnablewarning
            | TokenKind::MetaDisablewarning
    )
}

pub(crate) fn is_newline_equivalent(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::RBrace
            | TokenKind::RBracket
            | TokenKind::RParen
            | TokenKind::Comma
            | TokenKind::Eof
    )
}

pub(crate) fn is_type_suffix_start(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::LBracket
            | TokenKind::TripleDot
            | TokenKind::MinusArrow
            | TokenKind::QuestionMark
            | TokenKind::DoubleQuestionMark
            | TokenKind::QuestionMarkDot
            | TokenKind::ExclamationPoint
            | TokenKind::Asterisk
            | TokenKind::DoubleAsterisk
            | TokenKind::AsteriskEquals
            | TokenKind::DoubleAsteriskEquals
    )
}

pub(crate) fn is_generics_start(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Lt | TokenKind::DoubleLt | TokenKind::DoubleLtEquals | TokenKind::LtEquals
    )
}

pub(crate) fn is_assignment_operator(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Equals
            | TokenKind::PipeEquals
            | TokenKind::PlusEquals
            | TokenKind::CaretEquals
            | TokenKind::MinusEquals
            | TokenKind::SlashEquals
            | TokenKind::TildeEquals
            | TokenKind::PercentEquals
            | TokenKind::AsteriskEquals
            | TokenKind::AmpersandEquals
            | TokenKind::DoubleGtEquals
            | TokenKind::DoubleLtEquals
            | TokenKind::DoubleAsteriskEquals
    )
}

pub(crate) fn is_equality_operator(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::DoubleEquals
            | TokenKind::TripleEquals
            | TokenKind::ExclamationPointEquals
            | TokenKind::ExclamationPointDoubleEquals
    )
}

pub(crate) fn is_relational_operator(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Lt
            | TokenKind::Gt
            | TokenKind::LtEquals
            | TokenKind::GtEquals
            | TokenKind::Compare
    )
}

pub(crate) fn is_casting_operator(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::As | TokenKind::AsOptional | TokenKind::AsUnwrapped | TokenKind::Is
    )
}

pub(crate) fn is_range_operator(kind: TokenKind) -> bool {
    matches!(kind, TokenKind::DoubleDot | TokenKind::TripleDot)
}

pub(crate) fn is_bitshift_operator(kind: TokenKind) -> bool {
    matches!(kind, TokenKind::DoubleLt | TokenKind::DoubleGt)
}

pub(crate) fn is_additive_operator(kind: TokenKind) -> bool {
    matches!(kind, TokenKind::Plus | TokenKind::Minus)
}

pub(crate) fn is_multiplicative_operator(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Asterisk | TokenKind::Slash | TokenKind::Percent
    )
}

pub(crate) fn is_prefix_operator(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::DoublePlus
            | TokenKind::DoubleMinus
            | TokenKind::Tilde
            | TokenKind::ExclamationPoint
            | TokenKind::Asterisk
            | TokenKind::Ampersand
            | TokenKind::Release
            | TokenKind::TryOptional
            | TokenKind::TryUnwrapped
            | TokenKind::Await
            | TokenKind::Not
    )
}

pub(crate) fn is_postfix_operator(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::DoublePlus | TokenKind::DoubleMinus | TokenKind::ExclamationPoint
    )
}

pub(crate) fn is_access_operator(kind: TokenKind) -> bool {
    matches!(kind, TokenKind::Dot | TokenKind::QuestionMarkDot)
}

pub(crate) fn is_call_operator(kind: TokenKind) -> bool {
    matches!(kind, TokenKind::LParen | TokenKind::LBracket)
}

pub(crate) fn is_literal(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::HexLiteral
            | TokenKind::NilLiteral
            | TokenKind::FloatLiteral
            | TokenKind::OctalLiteral
            | TokenKind::BinaryLiteral
            | TokenKind::StringLiteral
            | TokenKind::BooleanLiteral
            | TokenKind::IntegerLiteral
            | TokenKind::SelfKw
            | TokenKind::Super
    )
}

pub(crate) fn is_function_operator(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Tilde
            | TokenKind::ExclamationPoint
            | TokenKind::Percent
            | TokenKind::Caret
            | TokenKind::Ampersand
            | TokenKind::Asterisk
            | TokenKind::Minus
            | TokenKind::Plus
            | TokenKind::Pipe
            | TokenKind::Lt
            | TokenKind::Gt
            | TokenKind::Slash
            | TokenKind::DoubleEquals
            | TokenKind::ExclamationPointEquals
            | TokenKind::Not
            | TokenKind::As
            | TokenKind::DoubleAsterisk
            | TokenKind::DoubleMinus
            | TokenKind::DoublePlus
            | TokenKind::DoubleLt
            | TokenKind::DoubleGt
            | TokenKind::DoubleDot
            | TokenKind::TripleDot
            | TokenKind::Compare
    )
}
