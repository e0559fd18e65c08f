//! AST node definitions and the arena store.
//!
//! Every node lives in one of the [`AstStore`] arenas and is addressed by a
//! typed index. Cross-references between nodes (a scope's parent, a type
//! reference's referent, an import's resolved global scope) are plain
//! indices, so the ownership tree is exactly the arena itself: the store is
//! owned by the compilation session, and dropping it drops every module's
//! AST at once.

use aclc_lex::{Token, TokenKind};
use aclc_util::span::{ModuleId, SourceMeta};
use aclc_util::{define_idx, IndexVec};

define_idx!(
    /// Index of an expression in [`AstStore::exprs`].
    ExprId
);
define_idx!(
    /// Index of a type reference in [`AstStore::type_refs`].
    TypeRefId
);
define_idx!(
    /// Index of a symbol in [`AstStore::symbols`].
    SymbolId
);
define_idx!(
    /// Index of a scope in [`AstStore::scopes`].
    ScopeId
);
define_idx!(
    /// Index of a statement in [`AstStore::stmts`].
    StmtId
);

/// Resolution progress of one module's AST.
///
/// The resolver advances a module monotonically through these stages; a stage
/// observes that all lower stages have completed on every reachable module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ResolutionStage {
    Unresolved,
    InternalTypes,
    InternalNonRecursive,
    InternalAll,
    ExternalTypes,
    ExternalNonRecursive,
    Resolved,
}

impl ResolutionStage {
    /// The next stage; saturates at `Resolved`.
    pub fn next(self) -> ResolutionStage {
        use ResolutionStage::*;
        match self {
            Unresolved => InternalTypes,
            InternalTypes => InternalNonRecursive,
            InternalNonRecursive => InternalAll,
            InternalAll => ExternalTypes,
            ExternalTypes => ExternalNonRecursive,
            ExternalNonRecursive | Resolved => Resolved,
        }
    }
}

/// A modifier attached to a declaration. `args` is non-empty only for the
/// warning metas `@enablewarning(...)` / `@disablewarning(...)`.
#[derive(Clone, Debug)]
pub struct Modifier {
    pub token: Token,
    pub args: Vec<Token>,
}

impl Modifier {
    pub fn plain(token: Token) -> Self {
        Self {
            token,
            args: Vec::new(),
        }
    }

    pub fn kind(&self) -> TokenKind {
        self.token.kind
    }
}

/// Provenance of a resolved symbol relative to the reference site.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    /// Declared inside a function-like scope.
    Local,
    /// Declared statically in its owning scope.
    Static,
    /// Reached through a parent type of the starting scope.
    TypeHierarchy,
}

/// One symbol-lookup candidate.
#[derive(Clone, Copy, Debug)]
pub struct SearchResult {
    pub symbol: SymbolId,
    pub owning_scope: ScopeId,
    pub origin: Origin,
}

/// What kind of construct a scope belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Type,
    Namespace,
    Alias,
    Function,
    Constructor,
    Destructor,
    Lambda,
    Block,
    GetBlock,
    InitBlock,
    SetBlock,
}

impl ScopeKind {
    /// True for scopes whose locals disappear when the scope is popped.
    pub fn is_function_scope(self) -> bool {
        matches!(
            self,
            ScopeKind::Function
                | ScopeKind::Constructor
                | ScopeKind::Destructor
                | ScopeKind::Lambda
                | ScopeKind::Block
                | ScopeKind::GetBlock
                | ScopeKind::InitBlock
                | ScopeKind::SetBlock
        )
    }

    /// True for scopes that delimit an own function body for `return`.
    pub fn is_owning_function_scope(self) -> bool {
        matches!(
            self,
            ScopeKind::Function
                | ScopeKind::Constructor
                | ScopeKind::Destructor
                | ScopeKind::Lambda
                | ScopeKind::GetBlock
                | ScopeKind::InitBlock
                | ScopeKind::SetBlock
        )
    }
}

/// A container of symbols with an optional parent link.
///
/// Invariant: the parent chain of every non-global scope terminates at its
/// module's global scope.
#[derive(Clone, Debug)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub kind: ScopeKind,
    /// Declared symbols, in declaration order.
    pub symbols: Vec<SymbolId>,
    /// The symbol this scope belongs to, when it has one.
    pub owner: Option<SymbolId>,
    /// Imports declared in this scope; only global scopes carry any.
    pub imports: Vec<SymbolId>,
}

/// A syntactic reference to a type, resolved to `actual_type` during
/// semantic analysis.
#[derive(Clone, Debug)]
pub struct TypeRef {
    pub meta: SourceMeta,
    pub kind: TypeRefKind,
    /// The type symbol this reference resolves to.
    pub actual_type: Option<SymbolId>,
    /// Resolved generic arguments (element types, key/value types, ...).
    pub actual_generics: Vec<TypeRefId>,
}

#[derive(Clone, Debug)]
pub enum TypeRefKind {
    /// `Foo<T>.Bar` or `global.Foo`; `referent` may be a namespace or module
    /// alias for intermediate segments.
    Simple {
        parent: Option<TypeRefId>,
        name: Token,
        generics: Vec<TypeRefId>,
        referent: Option<SymbolId>,
    },
    /// `T[]`
    Array { element: TypeRefId },
    /// `[K: V]` or `T[K]`
    Map { key: TypeRefId, value: TypeRefId },
    /// `(T1, T2)`
    Tuple { elements: Vec<TypeRefId> },
    /// `(T1, T2) -> R`
    Function { params: Vec<TypeRefId>, ret: TypeRefId },
    /// `T?`, `T!`, `T*`, `T...`
    Suffix { base: TypeRefId, suffix: Token },
    /// Placeholder for `super` until the parent type is known.
    Super { child: SymbolId },
}

/// An expression, typed during resolution.
#[derive(Clone, Debug)]
pub struct Expr {
    pub meta: SourceMeta,
    pub kind: ExprKind,
    pub value_type: Option<TypeRefId>,
}

#[derive(Clone, Debug)]
pub enum ExprKind {
    Literal {
        token: Token,
    },
    Identifier {
        name: Token,
        generics: Vec<TypeRefId>,
        global_prefix: bool,
        referent: Option<SymbolId>,
        /// Candidates collected by a non-exact lookup, consumed by function
        /// call overload resolution.
        possible_referents: Vec<SearchResult>,
    },
    Binary {
        op: Token,
        left: ExprId,
        right: ExprId,
    },
    UnaryPrefix {
        op: Token,
        arg: ExprId,
    },
    UnaryPostfix {
        op: Token,
        arg: ExprId,
    },
    Ternary {
        condition: ExprId,
        then_value: ExprId,
        else_value: ExprId,
    },
    FunctionCall {
        caller: ExprId,
        args: Vec<ExprId>,
    },
    Subscript {
        target: ExprId,
        index: ExprId,
    },
    Casting {
        op: Token,
        left: ExprId,
        ty: TypeRefId,
    },
    Lambda {
        modifiers: Vec<Modifier>,
        parameters: Vec<SymbolId>,
        scope: ScopeId,
        body: Vec<StmtId>,
    },
    ArrayLiteral {
        elements: Vec<ExprId>,
    },
    MapLiteral {
        keys: Vec<ExprId>,
        values: Vec<ExprId>,
    },
    TupleLiteral {
        elements: Vec<ExprId>,
    },
}

/// A braced (or single-statement) block with its own scope.
#[derive(Clone, Debug)]
pub struct Block {
    pub meta: SourceMeta,
    pub scope: ScopeId,
    pub modifiers: Vec<Modifier>,
    pub body: Vec<StmtId>,
}

/// One `if`/`elif` arm.
#[derive(Clone, Debug)]
pub struct CondBlock {
    pub meta: SourceMeta,
    pub condition: ExprId,
    pub block: Block,
}

/// One `case expr:` or `default:` arm of a switch.
#[derive(Clone, Debug)]
pub struct SwitchCase {
    pub case_token: Token,
    /// `None` for the default case.
    pub condition: Option<ExprId>,
    pub block: Block,
}

/// One `catch` arm of a try statement.
#[derive(Clone, Debug)]
pub struct CatchBlock {
    pub meta: SourceMeta,
    pub exception: SymbolId,
    pub block: Block,
}

/// A `set [(param)] { ... }` accessor block.
#[derive(Clone, Debug)]
pub struct SetBlock {
    pub meta: SourceMeta,
    pub modifiers: Vec<Modifier>,
    pub parameter: Option<SymbolId>,
    pub scope: ScopeId,
    pub body: Vec<StmtId>,
}

/// The `{ get ... set ... init ... }` group of a class variable.
#[derive(Clone, Debug)]
pub struct VariableBlock {
    pub get_block: Option<Block>,
    pub set_block: Option<SetBlock>,
    pub init_block: Option<Block>,
}

/// Initializer of a variable: a plain expression or an accessor group.
#[derive(Clone, Debug)]
pub enum VariableValue {
    Expr(ExprId),
    Block(VariableBlock),
}

/// A statement node.
#[derive(Clone, Debug)]
pub struct StmtNode {
    pub meta: SourceMeta,
    pub kind: Stmt,
}

#[derive(Clone, Debug)]
pub enum Stmt {
    /// A local declaration (variable, constant, alias).
    Decl(SymbolId),
    /// An expression statement.
    Expr(ExprId),
    /// A bare `{ ... }` block (possibly `unsafe`).
    Block(Block),
    If {
        branches: Vec<CondBlock>,
        else_block: Option<Block>,
    },
    While {
        condition: ExprId,
        block: Block,
    },
    Repeat {
        condition: ExprId,
        block: Block,
    },
    For {
        iterator: SymbolId,
        iteratee: ExprId,
        block: Block,
    },
    Switch {
        condition: ExprId,
        cases: Vec<SwitchCase>,
    },
    Try {
        block: Block,
        catches: Vec<CatchBlock>,
    },
    Return {
        value: Option<ExprId>,
    },
    Throw {
        value: ExprId,
    },
    /// `break`, `continue`, or `fall`.
    SingleToken {
        token: Token,
    },
    /// `@enablewarning(...)` / `@disablewarning(...)` applied to the
    /// following statement.
    WarningMeta {
        modifier: Modifier,
        target: StmtId,
    },
}

/// One item of global, type, or namespace content.
#[derive(Clone, Debug)]
pub enum Item {
    Decl(SymbolId),
    SourceLock(Token),
    NoBuiltins(Token),
    WarningMeta(Modifier),
}

/// The path part of an import declaration.
#[derive(Clone, Debug)]
pub struct ImportSource {
    /// Explicit filesystem path form (`import "lib/foo.accele"`).
    pub string_literal: Option<Token>,
    /// Number of parent-directory climbs (`..foo` climbs once).
    pub parent_climbs: u32,
    /// Whether the path was written with a leading dot form.
    pub relative: bool,
    /// Dotted identifier segments.
    pub segments: Vec<Token>,
}

/// One named target of a `import {a, b} from X` declaration.
#[derive(Clone, Debug)]
pub struct ImportTarget {
    pub name: Token,
    pub declared_type: Option<TypeRefId>,
    pub referents: Vec<SymbolId>,
}

/// The data specific to each symbol kind.
#[derive(Clone, Debug)]
pub enum SymbolKind {
    /// The root scope of a module.
    GlobalScope { content: Vec<Item> },
    Variable {
        constant: bool,
        declared_type: Option<TypeRefId>,
        value: Option<VariableValue>,
        actual_type: Option<TypeRefId>,
    },
    Parameter {
        declared_type: Option<TypeRefId>,
        actual_type: Option<TypeRefId>,
    },
    Function {
        generics: Vec<SymbolId>,
        parameters: Vec<SymbolId>,
        declared_return_type: Option<TypeRefId>,
        body: Vec<StmtId>,
        has_body: bool,
        actual_return_type: Option<TypeRefId>,
    },
    Constructor {
        parameters: Vec<SymbolId>,
        body: Vec<StmtId>,
    },
    Destructor { body: Vec<StmtId> },
    Class {
        generics: Vec<SymbolId>,
        parent_types: Vec<TypeRefId>,
        content: Vec<Item>,
    },
    Struct {
        generics: Vec<SymbolId>,
        parent_types: Vec<TypeRefId>,
        content: Vec<Item>,
    },
    Template {
        generics: Vec<SymbolId>,
        parent_types: Vec<TypeRefId>,
        content: Vec<Item>,
    },
    Enum {
        generics: Vec<SymbolId>,
        parent_types: Vec<TypeRefId>,
        content: Vec<Item>,
    },
    EnumCase {
        args: Vec<ExprId>,
        owner: SymbolId,
    },
    Alias {
        generics: Vec<SymbolId>,
        value: TypeRefId,
    },
    /// A generic parameter. Cannot itself declare generics.
    GenericType {
        declared_parent: Option<TypeRefId>,
        actual_parent: Option<TypeRefId>,
    },
    Namespace {
        generics: Vec<SymbolId>,
        content: Vec<Item>,
    },
    Import {
        source: ImportSource,
        alias: Option<Token>,
        targets: Vec<ImportTarget>,
        /// Global scope of the imported module, bound by the import handler.
        referent: Option<ScopeId>,
        /// The imported module, once known.
        referent_module: Option<ModuleId>,
    },
    /// An invariant (built-in) type, always resolvable.
    BuiltinType {
        parent_types: Vec<TypeRefId>,
        generic_arity: u8,
    },
}

impl SymbolKind {
    /// True for the type-declaring kinds.
    pub fn is_type(&self) -> bool {
        matches!(
            self,
            SymbolKind::Class { .. }
                | SymbolKind::Struct { .. }
                | SymbolKind::Template { .. }
                | SymbolKind::Enum { .. }
                | SymbolKind::Alias { .. }
                | SymbolKind::GenericType { .. }
                | SymbolKind::BuiltinType { .. }
        )
    }

    /// True for the value-like kinds (the VARIABLE search target).
    pub fn is_variable_like(&self) -> bool {
        matches!(
            self,
            SymbolKind::Variable { .. }
                | SymbolKind::Parameter { .. }
                | SymbolKind::Function { .. }
                | SymbolKind::Constructor { .. }
                | SymbolKind::EnumCase { .. }
        )
    }

    /// Generic parameters declared by this symbol, if any.
    pub fn generics(&self) -> &[SymbolId] {
        match self {
            SymbolKind::Function { generics, .. }
            | SymbolKind::Class { generics, .. }
            | SymbolKind::Struct { generics, .. }
            | SymbolKind::Template { generics, .. }
            | SymbolKind::Enum { generics, .. }
            | SymbolKind::Alias { generics, .. }
            | SymbolKind::Namespace { generics, .. } => generics,
            _ => &[],
        }
    }
}

/// A nameable declaration.
#[derive(Clone, Debug)]
pub struct Symbol {
    /// The identifier token (synthesized for global scopes and destructors).
    pub name: Token,
    pub meta: SourceMeta,
    pub modifiers: Vec<Modifier>,
    /// The nested scope this symbol introduces, when it has one.
    pub scope: Option<ScopeId>,
    pub kind: SymbolKind,
}

impl Symbol {
    /// True if the symbol carries the given modifier.
    pub fn has_modifier(&self, kind: TokenKind) -> bool {
        self.modifiers.iter().any(|m| m.kind() == kind)
    }

    /// The declared visibility modifier, if one is present.
    pub fn visibility_modifier(&self) -> Option<TokenKind> {
        self.modifiers.iter().map(|m| m.kind()).find(|k| {
            matches!(
                k,
                TokenKind::Public
                    | TokenKind::Private
                    | TokenKind::Protected
                    | TokenKind::Internal
            )
        })
    }
}

/// The arena store holding every AST node of the compilation session.
#[derive(Debug, Default)]
pub struct AstStore {
    pub exprs: IndexVec<ExprId, Expr>,
    pub type_refs: IndexVec<TypeRefId, TypeRef>,
    pub symbols: IndexVec<SymbolId, Symbol>,
    pub scopes: IndexVec<ScopeId, Scope>,
    pub stmts: IndexVec<StmtId, StmtNode>,
}

impl AstStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new scope.
    pub fn new_scope(&mut self, parent: Option<ScopeId>, kind: ScopeKind) -> ScopeId {
        self.scopes.push(Scope {
            parent,
            kind,
            symbols: Vec::new(),
            owner: None,
            imports: Vec::new(),
        })
    }

    /// Allocate a new symbol. When `scope` is given, the scope's owner is
    /// pointed back at the symbol.
    pub fn new_symbol(
        &mut self,
        name: Token,
        modifiers: Vec<Modifier>,
        scope: Option<ScopeId>,
        kind: SymbolKind,
    ) -> SymbolId {
        let meta = name.meta;
        let id = self.symbols.push(Symbol {
            name,
            meta,
            modifiers,
            scope,
            kind,
        });
        if let Some(scope) = scope {
            self.scopes[scope].owner = Some(id);
        }
        id
    }

    pub fn add_expr(&mut self, meta: SourceMeta, kind: ExprKind) -> ExprId {
        self.exprs.push(Expr {
            meta,
            kind,
            value_type: None,
        })
    }

    pub fn add_type_ref(&mut self, meta: SourceMeta, kind: TypeRefKind) -> TypeRefId {
        self.type_refs.push(TypeRef {
            meta,
            kind,
            actual_type: None,
            actual_generics: Vec::new(),
        })
    }

    pub fn add_stmt(&mut self, meta: SourceMeta, kind: Stmt) -> StmtId {
        self.stmts.push(StmtNode { meta, kind })
    }

    /// Declare `symbol` in `scope`.
    ///
    /// Two symbols with the same name may coexist only when both are
    /// callable overloads with distinct parameter signatures; otherwise the
    /// original symbol is returned as the duplicate's witness and the new
    /// symbol is not added.
    pub fn declare(&mut self, scope: ScopeId, symbol: SymbolId) -> Result<(), SymbolId> {
        let name = self.symbols[symbol].name.text.clone();
        for &existing in &self.scopes[scope].symbols {
            if self.symbols[existing].name.text != name {
                continue;
            }
            let both_callable = self.is_callable(existing) && self.is_callable(symbol);
            if both_callable && self.signature_text(existing) != self.signature_text(symbol) {
                continue;
            }
            return Err(existing);
        }
        self.scopes[scope].symbols.push(symbol);
        Ok(())
    }

    fn is_callable(&self, symbol: SymbolId) -> bool {
        matches!(
            self.symbols[symbol].kind,
            SymbolKind::Function { .. } | SymbolKind::Constructor { .. }
        )
    }

    /// The parameter signature of a callable, as source-like text.
    pub fn signature_text(&self, symbol: SymbolId) -> String {
        let params = match &self.symbols[symbol].kind {
            SymbolKind::Function { parameters, .. }
            | SymbolKind::Constructor { parameters, .. } => parameters.clone(),
            _ => return String::new(),
        };
        let mut parts = Vec::new();
        for p in params {
            match &self.symbols[p].kind {
                SymbolKind::Parameter {
                    declared_type: Some(t),
                    ..
                } => parts.push(self.type_ref_text(*t)),
                _ => parts.push("_".to_string()),
            }
        }
        parts.join(",")
    }

    /// Walk the parent chain up to the module's global scope.
    pub fn global_scope_of(&self, scope: ScopeId) -> ScopeId {
        let mut current = scope;
        while let Some(parent) = self.scopes[current].parent {
            current = parent;
        }
        current
    }

    /// Render a type reference back to source-like text.
    pub fn type_ref_text(&self, id: TypeRefId) -> String {
        match &self.type_refs[id].kind {
            TypeRefKind::Simple {
                parent,
                name,
                generics,
                ..
            } => {
                let mut out = String::new();
                if let Some(parent) = parent {
                    out.push_str(&self.type_ref_text(*parent));
                    out.push('.');
                }
                out.push_str(&name.text);
                if !generics.is_empty() {
                    out.push('<');
                    let parts: Vec<_> =
                        generics.iter().map(|g| self.type_ref_text(*g)).collect();
                    out.push_str(&parts.join(", "));
                    out.push('>');
                }
                out
            }
            TypeRefKind::Array { element } => format!("{}[]", self.type_ref_text(*element)),
            TypeRefKind::Map { key, value } => format!(
                "[{}: {}]",
                self.type_ref_text(*key),
                self.type_ref_text(*value)
            ),
            TypeRefKind::Tuple { elements } => {
                let parts: Vec<_> = elements.iter().map(|e| self.type_ref_text(*e)).collect();
                format!("({})", parts.join(", "))
            }
            TypeRefKind::Function { params, ret } => {
                let parts: Vec<_> = params.iter().map(|p| self.type_ref_text(*p)).collect();
                format!("({}) -> {}", parts.join(", "), self.type_ref_text(*ret))
            }
            TypeRefKind::Suffix { base, suffix } => {
                format!("{}{}", self.type_ref_text(*base), suffix.text)
            }
            TypeRefKind::Super { .. } => "super".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aclc_util::span::SourceMeta;

    fn id_token(text: &str) -> Token {
        Token::new(TokenKind::Id, text, SourceMeta::DUMMY)
    }

    #[test]
    fn test_stage_progression() {
        let mut stage = ResolutionStage::Unresolved;
        let mut seen = vec![stage];
        while stage != ResolutionStage::Resolved {
            stage = stage.next();
            seen.push(stage);
        }
        assert_eq!(seen.len(), 7);
        assert_eq!(ResolutionStage::Resolved.next(), ResolutionStage::Resolved);
        assert!(ResolutionStage::InternalTypes < ResolutionStage::ExternalTypes);
    }

    #[test]
    fn test_declare_rejects_duplicates() {
        let mut store = AstStore::new();
        let scope = store.new_scope(None, ScopeKind::Global);
        let a = store.new_symbol(
            id_token("x"),
            vec![],
            None,
            SymbolKind::Variable {
                constant: false,
                declared_type: None,
                value: None,
                actual_type: None,
            },
        );
        let b = store.new_symbol(
            id_token("x"),
            vec![],
            None,
            SymbolKind::Variable {
                constant: true,
                declared_type: None,
                value: None,
                actual_type: None,
            },
        );
        assert!(store.declare(scope, a).is_ok());
        assert_eq!(store.declare(scope, b), Err(a));
        assert_eq!(store.scopes[scope].symbols, vec![a]);
    }

    #[test]
    fn test_declare_allows_distinct_overloads() {
        let mut store = AstStore::new();
        let scope = store.new_scope(None, ScopeKind::Global);

        let int_ref = store.add_type_ref(
            SourceMeta::DUMMY,
            TypeRefKind::Simple {
                parent: None,
                name: id_token("Int"),
                generics: vec![],
                referent: None,
            },
        );
        let p1 = store.new_symbol(
            id_token("a"),
            vec![],
            None,
            SymbolKind::Parameter {
                declared_type: Some(int_ref),
                actual_type: None,
            },
        );
        let f1 = store.new_symbol(
            id_token("f"),
            vec![],
            None,
            SymbolKind::Function {
                generics: vec![],
                parameters: vec![p1],
                declared_return_type: None,
                body: vec![],
                has_body: true,
                actual_return_type: None,
            },
        );
        let f2 = store.new_symbol(
            id_token("f"),
            vec![],
            None,
            SymbolKind::Function {
                generics: vec![],
                parameters: vec![],
                declared_return_type: None,
                body: vec![],
                has_body: true,
                actual_return_type: None,
            },
        );
        assert!(store.declare(scope, f1).is_ok());
        assert!(store.declare(scope, f2).is_ok());

        // Same signature text is a duplicate.
        let f3 = store.new_symbol(
            id_token("f"),
            vec![],
            None,
            SymbolKind::Function {
                generics: vec![],
                parameters: vec![],
                declared_return_type: None,
                body: vec![],
                has_body: true,
                actual_return_type: None,
            },
        );
        assert_eq!(store.declare(scope, f3), Err(f2));
    }

    #[test]
    fn test_global_scope_of_walks_parent_chain() {
        let mut store = AstStore::new();
        let global = store.new_scope(None, ScopeKind::Global);
        let class = store.new_scope(Some(global), ScopeKind::Type);
        let body = store.new_scope(Some(class), ScopeKind::Function);
        assert_eq!(store.global_scope_of(body), global);
        assert_eq!(store.global_scope_of(global), global);
    }

    #[test]
    fn test_type_ref_text_rendering() {
        let mut store = AstStore::new();
        let int_ref = store.add_type_ref(
            SourceMeta::DUMMY,
            TypeRefKind::Simple {
                parent: None,
                name: id_token("Int"),
                generics: vec![],
                referent: None,
            },
        );
        let arr = store.add_type_ref(SourceMeta::DUMMY, TypeRefKind::Array { element: int_ref });
        let opt = store.add_type_ref(
            SourceMeta::DUMMY,
            TypeRefKind::Suffix {
                base: arr,
                suffix: Token::new(TokenKind::QuestionMark, "?", SourceMeta::DUMMY),
            },
        );
        assert_eq!(store.type_ref_text(opt), "Int[]?");

        let f = store.add_type_ref(
            SourceMeta::DUMMY,
            TypeRefKind::Function {
                params: vec![int_ref, int_ref],
                ret: int_ref,
            },
        );
        assert_eq!(store.type_ref_text(f), "(Int, Int) -> Int");
    }
}
