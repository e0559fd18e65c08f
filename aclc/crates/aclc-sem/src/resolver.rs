//! Multi-stage semantic analysis.
//!
//! The resolver walks a module's AST once per stage, binding identifiers to
//! symbols and expressions to types. Stage order breaks resolution cycles:
//! internal type references first, then non-recursive expressions, then all
//! in-module expressions, then the import handler and the external variants
//! of the first two stages. Resolution is idempotent per node: anything
//! already bound is skipped, so re-walking at a later stage only touches
//! what earlier stages could not finish.
//!
//! Two internal signals flow as `Result` values, never as diagnostics:
//! `Failed` (a node could not be resolved now; a diagnostic has been emitted
//! if this module has reached its external stages) and `Recursive` (a cyclic
//! inference chain; caught at the nearest function or return statement,
//! which substitutes a fresh synthetic generic parameter).

use crate::builtins::Builtins;
use crate::context::CompilerContext;
use crate::lookup::{
    self, AccessKind, CandidateProblem, SearchCriteria, SearchTarget,
};
use crate::{imports, tyref, types};
use aclc_lex::{Token, TokenKind};
use aclc_par::{
    Block, ExprId, ExprKind, Item, ResolutionStage, ScopeId, ScopeKind, SearchResult, SetBlock,
    Stmt, StmtId, SymbolId, SymbolKind, TypeRefId, TypeRefKind, VariableBlock, VariableValue,
};
use aclc_util::diagnostic::ErrorCode;
use aclc_util::span::{ModuleId, SourceMeta};
use aclc_util::FxHashSet;

/// Internal resolution signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolveSignal {
    /// The node cannot be resolved yet; continue best-effort.
    Failed,
    /// A cyclic inference chain was hit; caught at Function/Return.
    Recursive,
}

type RResult<T> = Result<T, ResolveSignal>;

/// Dispatch tag; lets match arms call `&mut self` methods without holding a
/// borrow into the store.
#[derive(Clone, Copy, PartialEq, Eq)]
enum SymbolTag {
    TypeDecl,
    Namespace,
    Alias,
    Variable,
    EnumCase,
    Constructor,
    Destructor,
    Function,
    Other,
}

/// Why a call candidate was rejected, for diagnostic selection.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Reject {
    None,
    NotEnough,
    TooMany,
    Mismatch,
}

/// The resolver for one module.
pub struct Resolver<'a> {
    ctx: &'a mut CompilerContext,
    module: ModuleId,
    max_stage: ResolutionStage,
    /// Scope stack; the flag records whether the scope was entered lexically
    /// (false for access-expression scope hops).
    scopes: Vec<(ScopeId, bool)>,
    /// Symbols currently being resolved, for cycle detection.
    symbol_stack: Vec<SymbolId>,
    reported_exprs: FxHashSet<ExprId>,
    reported_types: FxHashSet<TypeRefId>,
    /// (code, location) pairs already reported; later stages re-walk nodes
    /// that earlier stages could not finish, and must not repeat themselves.
    reported: FxHashSet<(u16, SourceMeta)>,
}

impl<'a> Resolver<'a> {
    pub fn new(ctx: &'a mut CompilerContext, module: ModuleId, max_stage: ResolutionStage) -> Self {
        Self {
            ctx,
            module,
            max_stage,
            scopes: Vec::new(),
            symbol_stack: Vec::new(),
            reported_exprs: FxHashSet::default(),
            reported_types: FxHashSet::default(),
            reported: FxHashSet::default(),
        }
    }

    /// Emit a diagnostic at most once per (code, location) for this run.
    fn report_once(
        &mut self,
        code: ErrorCode,
        meta: SourceMeta,
        highlight_len: usize,
        message: String,
    ) {
        if self.reported.insert((code.code(), meta)) {
            self.ctx.handler.report(code, meta, highlight_len, message);
        }
    }

    /// Advance the module through the stages up to the configured maximum.
    /// A no-op on an already-resolved module, and on a module whose resolver
    /// is already active further up the call chain (import cycles lead back
    /// here when a dependency is completed mid-import).
    pub fn resolve(&mut self) {
        if self.ctx.modules[self.module].resolving {
            return;
        }
        self.ctx.modules[self.module].resolving = true;
        while self.ctx.modules[self.module].stage < self.max_stage {
            let next = self.ctx.modules[self.module].stage.next();
            if next == ResolutionStage::ExternalTypes {
                imports::resolve_imports(self.ctx, self.module);
            }
            self.ctx.modules[self.module].stage = next;
            if next != ResolutionStage::Resolved {
                self.resolve_global_scope();
            }
        }
        self.ctx.modules[self.module].resolving = false;
    }

    // ----- Small helpers ----- //

    fn stage(&self) -> ResolutionStage {
        self.ctx.modules[self.module].stage
    }

    fn allow_external(&self) -> bool {
        self.stage() > ResolutionStage::InternalAll
    }

    fn builtins_for_lookup(&self) -> Option<&Builtins> {
        if self.ctx.options.no_builtins || self.ctx.modules[self.module].no_builtins {
            None
        } else {
            Some(&self.ctx.builtins)
        }
    }

    fn push_scope(&mut self, scope: ScopeId, lexical: bool) {
        self.scopes.push((scope, lexical));
    }

    fn pop_scope(&mut self) {
        let (scope, _) = self.scopes.pop().expect("scope stack underflow");
        // Locals are re-declared per walk; drop them on the way out so the
        // next stage sees a clean function scope again.
        if self.ctx.store.scopes[scope].kind.is_function_scope() {
            let keep: Vec<SymbolId> = self.ctx.store.scopes[scope]
                .symbols
                .iter()
                .copied()
                .filter(|&s| {
                    matches!(
                        self.ctx.store.symbols[s].kind,
                        SymbolKind::Parameter { .. } | SymbolKind::GenericType { .. }
                    )
                })
                .collect();
            self.ctx.store.scopes[scope].symbols = keep;
        }
    }

    fn peek_scope(&self) -> ScopeId {
        self.scopes.last().expect("empty scope stack").0
    }

    fn lexical_scope(&self) -> ScopeId {
        self.scopes
            .iter()
            .rev()
            .find(|(_, lexical)| *lexical)
            .map(|(scope, _)| *scope)
            .unwrap_or_else(|| self.peek_scope())
    }

    fn push_symbol(&mut self, symbol: SymbolId) {
        self.symbol_stack.push(symbol);
    }

    fn pop_symbol(&mut self) {
        self.symbol_stack.pop();
    }

    fn stack_contains(&self, symbol: SymbolId) -> bool {
        self.symbol_stack.contains(&symbol)
    }

    fn tag_of(&self, symbol: SymbolId) -> SymbolTag {
        match &self.ctx.store.symbols[symbol].kind {
            SymbolKind::Class { .. }
            | SymbolKind::Struct { .. }
            | SymbolKind::Template { .. }
            | SymbolKind::Enum { .. } => SymbolTag::TypeDecl,
            SymbolKind::Namespace { .. } => SymbolTag::Namespace,
            SymbolKind::Alias { .. } => SymbolTag::Alias,
            SymbolKind::Variable { .. } => SymbolTag::Variable,
            SymbolKind::EnumCase { .. } => SymbolTag::EnumCase,
            SymbolKind::Constructor { .. } => SymbolTag::Constructor,
            SymbolKind::Destructor { .. } => SymbolTag::Destructor,
            SymbolKind::Function { .. } => SymbolTag::Function,
            _ => SymbolTag::Other,
        }
    }

    fn emit_problems(&mut self, problems: &[CandidateProblem]) {
        for problem in problems {
            self.report_once(
                problem.code,
                problem.meta,
                1,
                problem.code.id().replace('-', " "),
            );
        }
    }

    /// An unresolved reference: silent before the external stages (the
    /// import handler may still bring the symbol in), a diagnostic after.
    fn unresolved_expr(&mut self, expr: ExprId, name: &str) -> ResolveSignal {
        if self.stage() >= ResolutionStage::ExternalTypes && self.reported_exprs.insert(expr) {
            let meta = self.ctx.store.exprs[expr].meta;
            self.report_once(
                ErrorCode::UnresolvedSymbol,
                meta,
                name.len().max(1),
                format!("unresolved symbol `{}`", name),
            );
        }
        ResolveSignal::Failed
    }

    fn unresolved_type(&mut self, tr: TypeRefId, name: &str) -> ResolveSignal {
        if self.stage() >= ResolutionStage::ExternalTypes && self.reported_types.insert(tr) {
            let meta = self.ctx.store.type_refs[tr].meta;
            self.report_once(
                ErrorCode::UnresolvedSymbol,
                meta,
                name.len().max(1),
                format!("unresolved type `{}`", name),
            );
        }
        ResolveSignal::Failed
    }

    fn expr_type(&self, expr: ExprId) -> RResult<TypeRefId> {
        self.ctx.store.exprs[expr]
            .value_type
            .ok_or(ResolveSignal::Failed)
    }

    // ----- Global traversal ----- //

    fn resolve_global_scope(&mut self) {
        let global = self.ctx.modules[self.module].global_scope;
        let decls = self.content_decls(self.ctx.modules[self.module].global_symbol);
        self.push_scope(global, true);
        for decl in decls {
            let _ = self.resolve_non_local(decl);
        }
        self.pop_scope();
    }

    fn content_decls(&self, symbol: SymbolId) -> Vec<SymbolId> {
        let content: &[Item] = match &self.ctx.store.symbols[symbol].kind {
            SymbolKind::GlobalScope { content }
            | SymbolKind::Class { content, .. }
            | SymbolKind::Struct { content, .. }
            | SymbolKind::Template { content, .. }
            | SymbolKind::Enum { content, .. }
            | SymbolKind::Namespace { content, .. } => content,
            _ => return Vec::new(),
        };
        content
            .iter()
            .filter_map(|item| match item {
                Item::Decl(symbol) => Some(*symbol),
                _ => None,
            })
            .collect()
    }

    fn resolve_non_local(&mut self, symbol: SymbolId) -> RResult<()> {
        match self.tag_of(symbol) {
            SymbolTag::TypeDecl => self.resolve_type_decl(symbol),
            SymbolTag::Namespace => self.resolve_namespace(symbol),
            SymbolTag::Alias => self.resolve_alias(symbol),
            SymbolTag::Variable => self.resolve_variable(symbol),
            SymbolTag::EnumCase => self.resolve_enum_case(symbol),
            SymbolTag::Constructor => self.resolve_constructor(symbol),
            SymbolTag::Destructor => self.resolve_destructor(symbol),
            SymbolTag::Function => self.resolve_function(symbol),
            SymbolTag::Other => Ok(()),
        }
    }

    fn resolve_type_decl(&mut self, symbol: SymbolId) -> RResult<()> {
        let scope = self.ctx.store.symbols[symbol].scope.expect("type scope");
        let generics = self.ctx.store.symbols[symbol].kind.generics().to_vec();
        let parents: Vec<TypeRefId> = match &self.ctx.store.symbols[symbol].kind {
            SymbolKind::Class { parent_types, .. }
            | SymbolKind::Struct { parent_types, .. }
            | SymbolKind::Template { parent_types, .. }
            | SymbolKind::Enum { parent_types, .. } => parent_types.clone(),
            _ => Vec::new(),
        };
        let decls = self.content_decls(symbol);

        self.push_scope(scope, true);
        for generic in generics {
            let _ = self.resolve_generic_type(generic);
        }
        for parent in parents {
            let _ = self.resolve_type_ref(parent);
        }
        for decl in decls {
            let _ = self.resolve_non_local(decl);
        }
        self.pop_scope();
        Ok(())
    }

    fn resolve_namespace(&mut self, symbol: SymbolId) -> RResult<()> {
        let scope = self.ctx.store.symbols[symbol].scope.expect("namespace scope");
        let generics = self.ctx.store.symbols[symbol].kind.generics().to_vec();
        let decls = self.content_decls(symbol);

        self.push_scope(scope, true);
        for generic in generics {
            let _ = self.resolve_generic_type(generic);
        }
        for decl in decls {
            let _ = self.resolve_non_local(decl);
        }
        self.pop_scope();
        Ok(())
    }

    fn resolve_alias(&mut self, symbol: SymbolId) -> RResult<()> {
        let scope = self.ctx.store.symbols[symbol].scope.expect("alias scope");
        let (generics, value) = match &self.ctx.store.symbols[symbol].kind {
            SymbolKind::Alias { generics, value } => (generics.clone(), *value),
            _ => return Ok(()),
        };

        self.push_scope(scope, true);
        for generic in generics {
            let _ = self.resolve_generic_type(generic);
        }
        let result = self.resolve_type_ref(value);
        self.pop_scope();
        result
    }

    fn resolve_generic_type(&mut self, symbol: SymbolId) -> RResult<()> {
        let declared = match &self.ctx.store.symbols[symbol].kind {
            SymbolKind::GenericType {
                actual_parent: Some(_),
                ..
            } => return Ok(()),
            SymbolKind::GenericType { declared_parent, .. } => *declared_parent,
            _ => return Ok(()),
        };

        let actual = match declared {
            Some(declared) => {
                self.resolve_type_ref(declared)?;
                declared
            }
            None => {
                let meta = self.ctx.store.symbols[symbol].meta;
                let any = self.ctx.builtins.any;
                tyref::base(&mut self.ctx.store, any, Vec::new(), meta)
            }
        };
        if let SymbolKind::GenericType { actual_parent, .. } =
            &mut self.ctx.store.symbols[symbol].kind
        {
            *actual_parent = Some(actual);
        }
        Ok(())
    }

    fn resolve_variable(&mut self, symbol: SymbolId) -> RResult<()> {
        self.push_symbol(symbol);
        let result = self.resolve_variable_inner(symbol);
        self.pop_symbol();
        result
    }

    fn resolve_variable_inner(&mut self, symbol: SymbolId) -> RResult<()> {
        let (declared, actual, value) = match &self.ctx.store.symbols[symbol].kind {
            SymbolKind::Variable {
                declared_type,
                actual_type,
                value,
                ..
            } => (*declared_type, *actual_type, value.clone()),
            _ => return Ok(()),
        };

        if actual.is_none() {
            if let Some(declared) = declared {
                self.resolve_type_ref(declared)?;
                self.set_variable_type(symbol, declared);
            }
        }

        if self.stage() == ResolutionStage::InternalTypes
            || self.stage() == ResolutionStage::ExternalTypes
        {
            return Ok(());
        }

        match value {
            Some(VariableValue::Expr(expr)) => {
                self.resolve_expression(expr)?;
                if self.variable_type(symbol).is_none() {
                    if let Some(value_type) = self.ctx.store.exprs[expr].value_type {
                        self.set_variable_type(symbol, value_type);
                    }
                }
            }
            Some(VariableValue::Block(block)) => {
                let inferred = self.resolve_variable_block(symbol, &block)?;
                if self.variable_type(symbol).is_none() {
                    if let Some(inferred) = inferred {
                        self.set_variable_type(symbol, inferred);
                    } else if self.stage() >= ResolutionStage::InternalAll {
                        let meta = self.ctx.store.symbols[symbol].meta;
                        let any = self.ctx.builtins.any;
                        let any_ref = tyref::base(&mut self.ctx.store, any, Vec::new(), meta);
                        self.set_variable_type(symbol, any_ref);
                    }
                }
            }
            None => {
                if self.variable_type(symbol).is_none()
                    && self.stage() >= ResolutionStage::InternalAll
                {
                    let meta = self.ctx.store.symbols[symbol].meta;
                    let any = self.ctx.builtins.any;
                    let any_ref = tyref::base(&mut self.ctx.store, any, Vec::new(), meta);
                    self.set_variable_type(symbol, any_ref);
                }
            }
        }
        Ok(())
    }

    fn variable_type(&self, symbol: SymbolId) -> Option<TypeRefId> {
        match &self.ctx.store.symbols[symbol].kind {
            SymbolKind::Variable { actual_type, .. } => *actual_type,
            _ => None,
        }
    }

    fn set_variable_type(&mut self, symbol: SymbolId, ty: TypeRefId) {
        if let SymbolKind::Variable { actual_type, .. } = &mut self.ctx.store.symbols[symbol].kind {
            *actual_type = Some(ty);
        }
    }

    /// Resolve a `{ get set init }` accessor group; returns the get block's
    /// inferred return type for variables without a declared type.
    fn resolve_variable_block(
        &mut self,
        symbol: SymbolId,
        block: &VariableBlock,
    ) -> RResult<Option<TypeRefId>> {
        let mut inferred = None;

        if let Some(get) = &block.get_block {
            let mut return_type = None;
            self.resolve_block_stmts(get, &mut return_type)?;
            inferred = return_type;
        }
        if let Some(set) = &block.set_block {
            self.resolve_set_block(symbol, set)?;
        }
        if let Some(init) = &block.init_block {
            let mut ignored = None;
            self.resolve_block_stmts(init, &mut ignored)?;
        }
        Ok(inferred)
    }

    fn resolve_set_block(&mut self, symbol: SymbolId, set: &SetBlock) -> RResult<()> {
        self.push_scope(set.scope, true);
        let result = (|| {
            if let Some(parameter) = set.parameter {
                let intended = self.variable_type(symbol);
                self.resolve_parameter(parameter, intended)?;
            }
            let mut ignored = None;
            for &stmt in &set.body {
                match self.resolve_local_content(stmt, &mut ignored) {
                    Err(ResolveSignal::Recursive) => return Err(ResolveSignal::Recursive),
                    _ => continue,
                }
            }
            Ok(())
        })();
        self.pop_scope();
        result
    }

    fn resolve_enum_case(&mut self, symbol: SymbolId) -> RResult<()> {
        if self.stage() == ResolutionStage::InternalTypes
            || self.stage() == ResolutionStage::ExternalTypes
        {
            return Ok(());
        }
        let args = match &self.ctx.store.symbols[symbol].kind {
            SymbolKind::EnumCase { args, .. } => args.clone(),
            _ => return Ok(()),
        };
        for arg in args {
            let _ = self.resolve_expression(arg);
        }
        Ok(())
    }

    fn resolve_constructor(&mut self, symbol: SymbolId) -> RResult<()> {
        let scope = self.ctx.store.symbols[symbol].scope.expect("ctor scope");
        let (parameters, body) = match &self.ctx.store.symbols[symbol].kind {
            SymbolKind::Constructor { parameters, body } => (parameters.clone(), body.clone()),
            _ => return Ok(()),
        };

        self.push_scope(scope, true);
        for &parameter in &parameters {
            let _ = self.resolve_parameter(parameter, None);
        }
        self.check_variadic_order(&parameters);

        if self.stage() != ResolutionStage::InternalTypes
            && self.stage() != ResolutionStage::ExternalTypes
        {
            let mut ignored = None;
            for stmt in body {
                match self.resolve_local_content(stmt, &mut ignored) {
                    Err(ResolveSignal::Recursive) => break,
                    _ => continue,
                }
            }
        }
        self.pop_scope();
        Ok(())
    }

    fn resolve_destructor(&mut self, symbol: SymbolId) -> RResult<()> {
        let scope = self.ctx.store.symbols[symbol].scope.expect("dtor scope");
        let body = match &self.ctx.store.symbols[symbol].kind {
            SymbolKind::Destructor { body } => body.clone(),
            _ => return Ok(()),
        };

        if self.stage() == ResolutionStage::InternalTypes
            || self.stage() == ResolutionStage::ExternalTypes
        {
            return Ok(());
        }

        self.push_scope(scope, true);
        let mut ignored = None;
        for stmt in body {
            match self.resolve_local_content(stmt, &mut ignored) {
                Err(ResolveSignal::Recursive) => break,
                _ => continue,
            }
        }
        self.pop_scope();
        Ok(())
    }

    fn resolve_function(&mut self, symbol: SymbolId) -> RResult<()> {
        let scope = self.ctx.store.symbols[symbol].scope.expect("fn scope");
        let (generics, parameters, declared_return, body, has_body, actual_return) =
            match &self.ctx.store.symbols[symbol].kind {
                SymbolKind::Function {
                    generics,
                    parameters,
                    declared_return_type,
                    body,
                    has_body,
                    actual_return_type,
                } => (
                    generics.clone(),
                    parameters.clone(),
                    *declared_return_type,
                    body.clone(),
                    *has_body,
                    *actual_return_type,
                ),
                _ => return Ok(()),
            };

        self.push_symbol(symbol);
        self.push_scope(scope, true);

        for generic in generics {
            let _ = self.resolve_generic_type(generic);
        }
        for &parameter in &parameters {
            let _ = self.resolve_parameter(parameter, None);
        }
        self.check_variadic_order(&parameters);

        if actual_return.is_none() {
            if let Some(declared) = declared_return {
                if self.resolve_type_ref(declared).is_ok() {
                    self.set_function_return(symbol, declared);
                }
            } else if !has_body {
                let meta = self.ctx.store.symbols[symbol].meta;
                let void = self.ctx.builtins.void;
                let void_ref = tyref::base(&mut self.ctx.store, void, Vec::new(), meta);
                self.set_function_return(symbol, void_ref);
            }
        }

        if self.stage() != ResolutionStage::InternalTypes
            && self.stage() != ResolutionStage::ExternalTypes
        {
            let mut return_type = None;
            let mut body_clean = true;
            for stmt in body {
                match self.resolve_local_content(stmt, &mut return_type) {
                    // A surviving recursive signal means the chain could not
                    // be broken at this stage; the next walk retries.
                    Err(ResolveSignal::Recursive) => {
                        body_clean = false;
                        break;
                    }
                    Err(ResolveSignal::Failed) => body_clean = false,
                    Ok(()) => {}
                }
            }
            if self.function_return(symbol).is_none() {
                if let Some(return_type) = return_type {
                    self.set_function_return(symbol, return_type);
                } else if declared_return.is_none()
                    && ((body_clean && self.stage() >= ResolutionStage::InternalAll)
                        || self.stage() >= ResolutionStage::ExternalNonRecursive)
                {
                    // No returns at all: the function yields Void. A body
                    // with statements that could not resolve yet gets one
                    // more chance at the external stages before committing.
                    let meta = self.ctx.store.symbols[symbol].meta;
                    let void = self.ctx.builtins.void;
                    let void_ref = tyref::base(&mut self.ctx.store, void, Vec::new(), meta);
                    self.set_function_return(symbol, void_ref);
                }
            }
        }

        self.pop_scope();
        self.pop_symbol();
        Ok(())
    }

    fn function_return(&self, symbol: SymbolId) -> Option<TypeRefId> {
        match &self.ctx.store.symbols[symbol].kind {
            SymbolKind::Function {
                actual_return_type, ..
            } => *actual_return_type,
            _ => None,
        }
    }

    fn set_function_return(&mut self, symbol: SymbolId, ty: TypeRefId) {
        if let SymbolKind::Function {
            actual_return_type, ..
        } = &mut self.ctx.store.symbols[symbol].kind
        {
            *actual_return_type = Some(ty);
        }
    }

    /// At most one variadic parameter, and it must be last.
    fn check_variadic_order(&mut self, parameters: &[SymbolId]) {
        for (i, &parameter) in parameters.iter().enumerate() {
            if i + 1 == parameters.len() {
                break;
            }
            if let Some(ty) = self.parameter_type(parameter) {
                if self.is_variadic_ref(ty) {
                    let meta = self.ctx.store.type_refs[ty].meta;
                    self.report_once(
                        ErrorCode::NonfinalVariadicParameter,
                        meta,
                        3,
                        "a variadic parameter must be the final parameter".to_string(),
                    );
                }
            }
        }
    }

    fn parameter_type(&self, symbol: SymbolId) -> Option<TypeRefId> {
        match &self.ctx.store.symbols[symbol].kind {
            SymbolKind::Parameter {
                actual_type,
                declared_type,
            } => actual_type.or(*declared_type),
            _ => None,
        }
    }

    fn is_variadic_ref(&self, ty: TypeRefId) -> bool {
        matches!(
            &self.ctx.store.type_refs[ty].kind,
            TypeRefKind::Suffix { suffix, .. } if suffix.kind == TokenKind::TripleDot
        )
    }

    fn resolve_parameter(&mut self, symbol: SymbolId, intended: Option<TypeRefId>) -> RResult<()> {
        let declared = match &self.ctx.store.symbols[symbol].kind {
            SymbolKind::Parameter {
                actual_type: Some(_),
                ..
            } => return Ok(()),
            SymbolKind::Parameter { declared_type, .. } => *declared_type,
            _ => return Ok(()),
        };

        let actual = if let Some(declared) = declared {
            self.resolve_type_ref(declared)?;
            declared
        } else if let Some(intended) = intended {
            // Copy the intended type so the parameter owns its own reference.
            let meta = self.ctx.store.symbols[symbol].meta;
            match self.ctx.store.type_refs[intended].actual_type {
                Some(target) => {
                    let generics = self.ctx.store.type_refs[intended].actual_generics.clone();
                    tyref::base(&mut self.ctx.store, target, generics, meta)
                }
                None => return Err(ResolveSignal::Failed),
            }
        } else if let Some(function) = self.enclosing_function_symbol() {
            let meta = self.ctx.store.symbols[symbol].meta;
            self.generate_generic(function, meta)
        } else {
            let meta = self.ctx.store.symbols[symbol].meta;
            let any = self.ctx.builtins.any;
            tyref::base(&mut self.ctx.store, any, Vec::new(), meta)
        };

        if let SymbolKind::Parameter { actual_type, .. } = &mut self.ctx.store.symbols[symbol].kind
        {
            *actual_type = Some(actual);
        }
        Ok(())
    }

    /// The Function symbol owning the current scope, if the current scope is
    /// a function body.
    fn enclosing_function_symbol(&self) -> Option<SymbolId> {
        let scope = self.peek_scope();
        let owner = self.ctx.store.scopes[scope].owner?;
        match self.ctx.store.symbols[owner].kind {
            SymbolKind::Function { .. } => Some(owner),
            _ => None,
        }
    }

    /// Synthesize a fresh generic parameter (`T`, `T1`, ...) on `function`
    /// and return a reference to it.
    fn generate_generic(&mut self, function: SymbolId, ref_meta: SourceMeta) -> TypeRefId {
        let existing: Vec<String> = self.ctx.store.symbols[function]
            .kind
            .generics()
            .iter()
            .map(|&g| self.ctx.store.symbols[g].name.text.clone())
            .collect();
        let mut name = "T".to_string();
        let mut suffix = 1;
        while existing.contains(&name) {
            name = format!("T{}", suffix);
            suffix += 1;
        }

        let fn_meta = self.ctx.store.symbols[function].meta;
        let generic = self.ctx.store.new_symbol(
            Token::new(TokenKind::Id, name, fn_meta),
            Vec::new(),
            None,
            SymbolKind::GenericType {
                declared_parent: None,
                actual_parent: None,
            },
        );
        if let SymbolKind::Function { generics, .. } = &mut self.ctx.store.symbols[function].kind {
            generics.push(generic);
        }
        if let Some(scope) = self.ctx.store.symbols[function].scope {
            self.ctx.store.scopes[scope].symbols.push(generic);
        }
        tyref::base(&mut self.ctx.store, generic, Vec::new(), ref_meta)
    }

    // ----- Statements ----- //

    fn resolve_local_content(
        &mut self,
        stmt: StmtId,
        dest_return: &mut Option<TypeRefId>,
    ) -> RResult<()> {
        let kind = self.ctx.store.stmts[stmt].kind.clone();
        let meta = self.ctx.store.stmts[stmt].meta;
        match kind {
            Stmt::Decl(symbol) => {
                // Locals become visible at their declaration statement.
                let scope = self.peek_scope();
                if !self.ctx.store.scopes[scope].symbols.contains(&symbol) {
                    self.ctx.store.scopes[scope].symbols.push(symbol);
                }
                match self.tag_of(symbol) {
                    SymbolTag::Variable => self.resolve_variable(symbol),
                    SymbolTag::Alias => self.resolve_alias(symbol),
                    _ => Ok(()),
                }
            }
            Stmt::Expr(expr) => self.resolve_expression(expr),
            Stmt::Block(block) => self.resolve_block_stmts(&block, dest_return),
            Stmt::If {
                branches,
                else_block,
            } => {
                for branch in &branches {
                    self.push_scope(branch.block.scope, true);
                    let result = self
                        .resolve_expression(branch.condition)
                        .and_then(|_| self.check_bool_condition(branch.condition))
                        .and_then(|_| self.resolve_stmt_list(&branch.block.body, dest_return));
                    self.pop_scope();
                    result?;
                }
                if let Some(else_block) = &else_block {
                    self.resolve_block_stmts(else_block, dest_return)?;
                }
                Ok(())
            }
            Stmt::While { condition, block } | Stmt::Repeat { condition, block } => {
                self.push_scope(block.scope, true);
                let result = self
                    .resolve_expression(condition)
                    .and_then(|_| self.check_bool_condition(condition))
                    .and_then(|_| self.resolve_stmt_list(&block.body, dest_return));
                self.pop_scope();
                result
            }
            Stmt::For {
                iterator,
                iteratee,
                block,
            } => {
                self.push_scope(block.scope, true);
                let result = (|| {
                    self.resolve_expression(iteratee)?;
                    let element = self
                        .ctx
                        .store
                        .exprs[iteratee]
                        .value_type
                        .and_then(|ty| self.iterator_element_type(ty));
                    self.resolve_parameter(iterator, element)?;
                    self.resolve_stmt_list(&block.body, dest_return)
                })();
                self.pop_scope();
                result
            }
            Stmt::Switch { condition, cases } => {
                self.resolve_expression(condition)?;
                for case in &cases {
                    if let Some(case_condition) = case.condition {
                        let _ = self.resolve_expression(case_condition);
                    }
                    self.resolve_block_stmts(&case.block, dest_return)?;
                }
                Ok(())
            }
            Stmt::Try { block, catches } => {
                self.resolve_block_stmts(&block, dest_return)?;
                for catch in &catches {
                    self.push_scope(catch.block.scope, true);
                    let result = self
                        .resolve_parameter(catch.exception, None)
                        .and_then(|_| self.resolve_stmt_list(&catch.block.body, dest_return));
                    self.pop_scope();
                    result?;
                }
                Ok(())
            }
            Stmt::Return { value } => self.resolve_return(meta, value, dest_return),
            Stmt::Throw { value } => self.resolve_expression(value),
            Stmt::SingleToken { .. } => Ok(()),
            Stmt::WarningMeta { target, .. } => self.resolve_local_content(target, dest_return),
        }
    }

    fn resolve_block_stmts(
        &mut self,
        block: &Block,
        dest_return: &mut Option<TypeRefId>,
    ) -> RResult<()> {
        self.push_scope(block.scope, true);
        let result = self.resolve_stmt_list(&block.body, dest_return);
        self.pop_scope();
        result
    }

    fn resolve_stmt_list(
        &mut self,
        stmts: &[StmtId],
        dest_return: &mut Option<TypeRefId>,
    ) -> RResult<()> {
        for &stmt in stmts {
            match self.resolve_local_content(stmt, dest_return) {
                Err(ResolveSignal::Recursive) => return Err(ResolveSignal::Recursive),
                // A failed statement was already reported; carry on.
                _ => continue,
            }
        }
        Ok(())
    }

    fn check_bool_condition(&mut self, condition: ExprId) -> RResult<()> {
        let value_type = self.expr_type(condition)?;
        let meta = self.ctx.store.exprs[condition].meta;
        let bool_sym = self.ctx.builtins.bool_;
        let bool_ref = tyref::base(&mut self.ctx.store, bool_sym, Vec::new(), meta);
        if !types::can_cast_to(&self.ctx.store, &self.ctx.builtins, value_type, bool_ref) {
            self.report_once(
                ErrorCode::ArgumentTypeMismatch,
                meta,
                1,
                "condition must be castable to Bool".to_string(),
            );
            return Err(ResolveSignal::Failed);
        }
        Ok(())
    }

    fn iterator_element_type(&self, ty: TypeRefId) -> Option<TypeRefId> {
        let actual = types::actual_type_of(&self.ctx.store, ty)?;
        let generics = &self.ctx.store.type_refs[ty].actual_generics;
        if actual == self.ctx.builtins.array {
            generics.first().copied()
        } else if actual == self.ctx.builtins.map {
            generics.first().copied()
        } else {
            None
        }
    }

    fn resolve_return(
        &mut self,
        meta: SourceMeta,
        value: Option<ExprId>,
        dest_return: &mut Option<TypeRefId>,
    ) -> RResult<()> {
        let owning = self.owning_function_symbol();

        let return_type = match value {
            Some(expr) => {
                if let Some(value_type) = self.ctx.store.exprs[expr].value_type {
                    value_type
                } else {
                    match self.resolve_expression(expr) {
                        Ok(()) => self.expr_type(expr)?,
                        Err(ResolveSignal::Recursive) => {
                            if self.stage() != ResolutionStage::InternalAll
                                && self.stage() != ResolutionStage::Resolved
                                && self.stage() != ResolutionStage::ExternalNonRecursive
                            {
                                return Err(ResolveSignal::Recursive);
                            }
                            // Break the cycle with a synthetic generic on
                            // the owning function.
                            match owning {
                                Some(function)
                                    if matches!(
                                        self.ctx.store.symbols[function].kind,
                                        SymbolKind::Function { .. }
                                    ) =>
                                {
                                    self.generate_generic(function, meta)
                                }
                                _ => {
                                    let any = self.ctx.builtins.any;
                                    tyref::base(&mut self.ctx.store, any, Vec::new(), meta)
                                }
                            }
                        }
                        Err(ResolveSignal::Failed) => return Err(ResolveSignal::Failed),
                    }
                }
            }
            None => {
                let void = self.ctx.builtins.void;
                tyref::base(&mut self.ctx.store, void, Vec::new(), meta)
            }
        };

        // A declared return type constrains every return statement; an
        // inferred one folds the returns via the minimal common type.
        if let Some(function) = owning {
            if let SymbolKind::Function {
                declared_return_type: Some(declared),
                ..
            } = self.ctx.store.symbols[function].kind
            {
                if !types::can_cast_to(&self.ctx.store, &self.ctx.builtins, return_type, declared)
                {
                    self.report_once(
                        ErrorCode::InvalidReturnStatement,
                        meta,
                        6,
                        "returned value does not match the declared return type".to_string(),
                    );
                    return Err(ResolveSignal::Failed);
                }
                return Ok(());
            }
        }

        self.merge_return_type(meta, return_type, dest_return)
    }

    fn merge_return_type(
        &mut self,
        meta: SourceMeta,
        return_type: TypeRefId,
        dest_return: &mut Option<TypeRefId>,
    ) -> RResult<()> {
        let void = self.ctx.builtins.void;
        let is_void =
            |store: &aclc_par::AstStore, ty: TypeRefId| types::actual_type_of(store, ty) == Some(void);

        match dest_return {
            None => {
                *dest_return = Some(return_type);
                Ok(())
            }
            Some(existing) => {
                let existing = *existing;
                let existing_void = is_void(&self.ctx.store, existing);
                let new_void = is_void(&self.ctx.store, return_type);
                if existing_void != new_void {
                    self.report_once(
                        ErrorCode::InvalidReturnStatement,
                        meta,
                        6,
                        "cannot return void and non-void values in the same function".to_string(),
                    );
                    return Err(ResolveSignal::Failed);
                }
                if !new_void {
                    let merged = types::min_common_type(
                        &mut self.ctx.store,
                        &self.ctx.builtins,
                        existing,
                        return_type,
                    );
                    *dest_return = Some(merged);
                }
                Ok(())
            }
        }
    }

    /// The nearest enclosing scope that delimits a function body, mapped to
    /// its owner symbol.
    fn owning_function_symbol(&self) -> Option<SymbolId> {
        for &(scope, _) in self.scopes.iter().rev() {
            if self.ctx.store.scopes[scope].kind.is_owning_function_scope() {
                return self.ctx.store.scopes[scope].owner;
            }
        }
        None
    }

    // ----- Type references ----- //

    fn resolve_type_ref(&mut self, tr: TypeRefId) -> RResult<()> {
        if self.ctx.store.type_refs[tr].actual_type.is_some() {
            return Ok(());
        }

        let kind = self.ctx.store.type_refs[tr].kind.clone();
        match kind {
            TypeRefKind::Simple { .. } => self.resolve_simple_type_ref(tr),
            TypeRefKind::Array { element } => {
                self.resolve_type_ref(element)?;
                let array = self.ctx.builtins.array;
                self.bind_type_ref(tr, array, vec![element]);
                Ok(())
            }
            TypeRefKind::Map { key, value } => {
                self.resolve_type_ref(key)?;
                self.resolve_type_ref(value)?;
                let map = self.ctx.builtins.map;
                self.bind_type_ref(tr, map, vec![key, value]);
                Ok(())
            }
            TypeRefKind::Tuple { elements } => {
                for &element in &elements {
                    self.resolve_type_ref(element)?;
                }
                let tuple = self.ctx.builtins.tuple;
                self.bind_type_ref(tr, tuple, elements);
                Ok(())
            }
            TypeRefKind::Function { params, ret } => {
                self.resolve_type_ref(ret)?;
                let mut generics = vec![ret];
                for &param in &params {
                    self.resolve_type_ref(param)?;
                    generics.push(param);
                }
                let function = self.ctx.builtins.function;
                self.bind_type_ref(tr, function, generics);
                Ok(())
            }
            TypeRefKind::Suffix { base, suffix } => {
                self.resolve_type_ref(base)?;
                let target = match suffix.kind {
                    TokenKind::QuestionMark => self.ctx.builtins.optional,
                    TokenKind::ExclamationPoint => self.ctx.builtins.unwrapped_optional,
                    TokenKind::Asterisk => self.ctx.builtins.pointer,
                    TokenKind::TripleDot => self.ctx.builtins.array,
                    _ => {
                        return Err(self.unresolved_type(tr, &suffix.text));
                    }
                };
                self.bind_type_ref(tr, target, vec![base]);
                Ok(())
            }
            TypeRefKind::Super { child } => {
                let parent = types::parent_symbols(&self.ctx.store, child)
                    .first()
                    .copied()
                    .unwrap_or(self.ctx.builtins.any);
                self.bind_type_ref(tr, parent, Vec::new());
                Ok(())
            }
        }
    }

    fn bind_type_ref(&mut self, tr: TypeRefId, target: SymbolId, generics: Vec<TypeRefId>) {
        let node = &mut self.ctx.store.type_refs[tr];
        node.actual_type = Some(target);
        node.actual_generics = generics;
    }

    fn resolve_simple_type_ref(&mut self, tr: TypeRefId) -> RResult<()> {
        let (parent, name, generics) = match &self.ctx.store.type_refs[tr].kind {
            TypeRefKind::Simple {
                parent,
                name,
                generics,
                ..
            } => (*parent, name.clone(), generics.clone()),
            _ => return Ok(()),
        };

        for &generic in &generics {
            self.resolve_type_ref(generic)?;
        }

        let (scope, recursive) = match parent {
            Some(parent) => (self.resolve_simple_parent(parent)?, false),
            None => (self.peek_scope(), true),
        };

        let criteria = SearchCriteria {
            recursive,
            allow_external: self.allow_external(),
            targets: vec![SearchTarget::Type],
            require_exact_match: true,
            modifiable: false,
        };
        let mut results = Vec::new();
        lookup::resolve_symbol(
            &self.ctx.store,
            self.builtins_for_lookup(),
            scope,
            &name,
            criteria.recursive,
            criteria.allow_external,
            &criteria.targets,
            &mut results,
        );
        if results.is_empty() {
            return Err(self.unresolved_type(tr, &name.text));
        }

        let meta = self.ctx.store.type_refs[tr].meta;
        let lexical = self.lexical_scope();
        let (referent, problems) = lookup::select_referent(
            &self.ctx.store,
            &self.ctx.builtins,
            &results,
            &generics,
            &criteria,
            meta,
            lexical,
            AccessKind::Plain,
        )
        .expect("non-empty results");
        self.emit_problems(&problems);

        if let TypeRefKind::Simple {
            referent: slot, ..
        } = &mut self.ctx.store.type_refs[tr].kind
        {
            *slot = Some(referent);
        }
        if self.ctx.store.symbols[referent].kind.is_type() {
            self.ctx.store.type_refs[tr].actual_type = Some(referent);
            self.ctx.store.type_refs[tr].actual_generics = generics;
        }
        Ok(())
    }

    /// Resolve an intermediate segment of a dotted type reference, which may
    /// name a type or a namespace, and return the scope to search next.
    fn resolve_simple_parent(&mut self, tr: TypeRefId) -> RResult<ScopeId> {
        let (parent, name, generics) = match &self.ctx.store.type_refs[tr].kind {
            TypeRefKind::Simple {
                parent,
                name,
                generics,
                ..
            } => (*parent, name.clone(), generics.clone()),
            _ => return Err(ResolveSignal::Failed),
        };

        for &generic in &generics {
            self.resolve_type_ref(generic)?;
        }

        let (scope, recursive) = match parent {
            Some(parent) => (self.resolve_simple_parent(parent)?, false),
            None => (self.peek_scope(), true),
        };

        let criteria = SearchCriteria {
            recursive,
            allow_external: self.allow_external(),
            targets: vec![SearchTarget::Type, SearchTarget::Namespace],
            require_exact_match: true,
            modifiable: false,
        };
        let mut results = Vec::new();
        lookup::resolve_symbol(
            &self.ctx.store,
            self.builtins_for_lookup(),
            scope,
            &name,
            criteria.recursive,
            criteria.allow_external,
            &criteria.targets,
            &mut results,
        );
        if results.is_empty() {
            return Err(self.unresolved_type(tr, &name.text));
        }

        let meta = self.ctx.store.type_refs[tr].meta;
        let lexical = self.lexical_scope();
        let (referent, problems) = lookup::select_referent(
            &self.ctx.store,
            &self.ctx.builtins,
            &results,
            &generics,
            &criteria,
            meta,
            lexical,
            AccessKind::Plain,
        )
        .expect("non-empty results");
        self.emit_problems(&problems);

        if let TypeRefKind::Simple {
            referent: slot, ..
        } = &mut self.ctx.store.type_refs[tr].kind
        {
            *slot = Some(referent);
        }
        if self.ctx.store.symbols[referent].kind.is_type() {
            self.ctx.store.type_refs[tr].actual_type = Some(referent);
        }

        self.scope_of_symbol(referent)
            .ok_or(ResolveSignal::Failed)
    }

    /// The scope a symbol opens for member lookup.
    fn scope_of_symbol(&self, symbol: SymbolId) -> Option<ScopeId> {
        match &self.ctx.store.symbols[symbol].kind {
            SymbolKind::Import { referent, .. } => *referent,
            SymbolKind::Alias { .. } => {
                let unfolded = types::unfold_alias(&self.ctx.store, symbol);
                if unfolded == symbol {
                    None
                } else {
                    self.scope_of_symbol(unfolded)
                }
            }
            _ => self.ctx.store.symbols[symbol].scope,
        }
    }

    // ----- Expressions ----- //

    fn resolve_expression(&mut self, expr: ExprId) -> RResult<()> {
        self.resolve_expression0(expr, None, AccessKind::Plain)
            .map(|_| ())
    }

    /// Resolve one expression. When the lookup criteria forbid an exact
    /// match, the identifier expression awaiting overload selection is
    /// returned instead of being bound.
    fn resolve_expression0(
        &mut self,
        expr: ExprId,
        criteria: Option<&SearchCriteria>,
        access: AccessKind,
    ) -> RResult<Option<ExprId>> {
        if self.ctx.store.exprs[expr].value_type.is_some() {
            return Ok(None);
        }

        let kind = self.ctx.store.exprs[expr].kind.clone();
        match kind {
            ExprKind::FunctionCall { caller, args } => {
                self.resolve_function_call(expr, caller, &args, criteria)?;
                Ok(None)
            }
            ExprKind::Ternary {
                condition,
                then_value,
                else_value,
            } => {
                self.resolve_ternary(expr, condition, then_value, else_value)?;
                Ok(None)
            }
            ExprKind::Binary { op, left, right } => {
                if matches!(op.kind, TokenKind::Dot | TokenKind::QuestionMarkDot) {
                    self.resolve_access(expr, &op, left, right, criteria)
                } else {
                    self.resolve_plain_binary(expr, &op, left, right)?;
                    Ok(None)
                }
            }
            ExprKind::UnaryPrefix { op, arg } => {
                self.resolve_prefix(expr, &op, arg)?;
                Ok(None)
            }
            ExprKind::UnaryPostfix { op, arg } => {
                self.resolve_postfix(expr, &op, arg)?;
                Ok(None)
            }
            ExprKind::Subscript { target, index } => {
                self.resolve_subscript(expr, target, index)?;
                Ok(None)
            }
            ExprKind::Identifier { .. } => self.resolve_identifier(expr, criteria, access),
            ExprKind::ArrayLiteral { elements } => {
                self.resolve_array_literal(expr, &elements)?;
                Ok(None)
            }
            ExprKind::MapLiteral { keys, values } => {
                self.resolve_map_literal(expr, &keys, &values)?;
                Ok(None)
            }
            ExprKind::TupleLiteral { elements } => {
                self.resolve_tuple_literal(expr, &elements)?;
                Ok(None)
            }
            ExprKind::Literal { token } => {
                self.resolve_literal(expr, &token)?;
                Ok(None)
            }
            ExprKind::Lambda {
                parameters,
                scope,
                body,
                ..
            } => {
                self.resolve_lambda(expr, &parameters, scope, &body)?;
                Ok(None)
            }
            ExprKind::Casting { op, left, ty } => {
                self.resolve_casting(expr, &op, left, ty)?;
                Ok(None)
            }
        }
    }

    fn set_expr_type(&mut self, expr: ExprId, ty: TypeRefId) {
        self.ctx.store.exprs[expr].value_type = Some(ty);
    }

    fn resolve_ternary(
        &mut self,
        expr: ExprId,
        condition: ExprId,
        then_value: ExprId,
        else_value: ExprId,
    ) -> RResult<()> {
        self.resolve_expression(condition)?;
        self.check_bool_condition(condition)?;
        self.resolve_expression(then_value)?;
        self.resolve_expression(else_value)?;

        let a = self.expr_type(then_value)?;
        let b = self.expr_type(else_value)?;
        let merged = types::min_common_type(&mut self.ctx.store, &self.ctx.builtins, a, b);
        self.set_expr_type(expr, merged);
        Ok(())
    }

    fn resolve_access(
        &mut self,
        expr: ExprId,
        op: &Token,
        left: ExprId,
        right: ExprId,
        criteria: Option<&SearchCriteria>,
    ) -> RResult<Option<ExprId>> {
        let left_criteria = SearchCriteria {
            recursive: true,
            allow_external: self.allow_external(),
            targets: vec![
                SearchTarget::Namespace,
                SearchTarget::Variable,
                SearchTarget::Type,
            ],
            require_exact_match: true,
            modifiable: false,
        };
        self.resolve_expression0(left, Some(&left_criteria), AccessKind::Plain)?;

        let (member_scope, wrapper) = if op.kind == TokenKind::Dot {
            (self.scope_from_expression(left), None)
        } else {
            // `?.` requires an optional left-hand side and propagates its
            // wrapper to the result.
            let left_type = self.expr_type(left)?;
            let actual = types::actual_type_of(&self.ctx.store, left_type);
            match actual {
                Some(sym) if self.ctx.builtins.is_optional_wrapper(sym) => {
                    let wrapped = self.ctx.store.type_refs[left_type]
                        .actual_generics
                        .first()
                        .copied();
                    (
                        wrapped.and_then(|w| self.scope_from_type_ref(w)),
                        Some(sym),
                    )
                }
                _ => {
                    let meta = self.ctx.store.exprs[left].meta;
                    self.report_once(
                        ErrorCode::ArgumentTypeMismatch,
                        meta,
                        1,
                        "expected an optional value on the left of `?.`".to_string(),
                    );
                    return Err(ResolveSignal::Failed);
                }
            }
        };

        let member_scope = match member_scope {
            Some(scope) => scope,
            None => {
                let name = self.access_expr_name(left);
                return Err(self.unresolved_expr(expr, &name));
            }
        };

        let access = self.access_kind_of(left);
        let right_criteria = SearchCriteria {
            recursive: false,
            allow_external: self.allow_external(),
            targets: criteria.map(|c| c.targets.clone()).unwrap_or_else(|| {
                vec![
                    SearchTarget::Namespace,
                    SearchTarget::Variable,
                    SearchTarget::Type,
                ]
            }),
            require_exact_match: criteria.map(|c| c.require_exact_match).unwrap_or(true),
            modifiable: criteria.map(|c| c.modifiable).unwrap_or(false),
        };

        self.push_scope(member_scope, false);
        let dest = self.resolve_expression0(right, Some(&right_criteria), access);
        self.pop_scope();
        let dest = dest?;

        if let Some(right_type) = self.ctx.store.exprs[right].value_type {
            let value = match wrapper {
                Some(sym) if sym == self.ctx.builtins.optional => {
                    let optional = self.ctx.builtins.optional;
                    tyref::optional(&mut self.ctx.store, optional, right_type)
                }
                Some(_) => {
                    let unwrapped = self.ctx.builtins.unwrapped_optional;
                    tyref::unwrapped_optional(&mut self.ctx.store, unwrapped, right_type)
                }
                None => right_type,
            };
            self.set_expr_type(expr, value);
        }
        Ok(dest)
    }

    fn access_expr_name(&self, expr: ExprId) -> String {
        match &self.ctx.store.exprs[expr].kind {
            ExprKind::Identifier { name, .. } => name.text.clone(),
            _ => String::from("<expression>"),
        }
    }

    /// Whether an access through this expression is static (through a type
    /// or namespace name) or through an instance value.
    fn access_kind_of(&self, left: ExprId) -> AccessKind {
        if let ExprKind::Binary { op, right, .. } = &self.ctx.store.exprs[left].kind {
            if matches!(op.kind, TokenKind::Dot | TokenKind::QuestionMarkDot) {
                return self.access_kind_of(*right);
            }
        }
        if let ExprKind::Identifier {
            referent: Some(referent),
            ..
        } = &self.ctx.store.exprs[left].kind
        {
            let kind = &self.ctx.store.symbols[*referent].kind;
            if kind.is_type()
                || matches!(
                    kind,
                    SymbolKind::Namespace { .. }
                        | SymbolKind::Import { .. }
                        | SymbolKind::GlobalScope { .. }
                )
            {
                return AccessKind::Static;
            }
        }
        AccessKind::Instance
    }

    /// The scope opened by the value of an expression, for member lookup.
    fn scope_from_expression(&self, expr: ExprId) -> Option<ScopeId> {
        // An access chain opens the scope of its final segment.
        if let ExprKind::Binary { op, right, .. } = &self.ctx.store.exprs[expr].kind {
            if matches!(op.kind, TokenKind::Dot | TokenKind::QuestionMarkDot) {
                return self.scope_from_expression(*right);
            }
        }
        if let ExprKind::Identifier {
            referent: Some(referent),
            ..
        } = &self.ctx.store.exprs[expr].kind
        {
            let kind = &self.ctx.store.symbols[*referent].kind;
            if kind.is_type()
                || matches!(
                    kind,
                    SymbolKind::Namespace { .. }
                        | SymbolKind::Import { .. }
                        | SymbolKind::GlobalScope { .. }
                )
            {
                return self.scope_of_symbol(*referent);
            }
        }
        self.ctx.store.exprs[expr]
            .value_type
            .and_then(|ty| self.scope_from_type_ref(ty))
    }

    fn scope_from_type_ref(&self, ty: TypeRefId) -> Option<ScopeId> {
        let actual = types::actual_type_of(&self.ctx.store, ty)?;
        self.scope_of_symbol(actual)
    }

    fn resolve_plain_binary(
        &mut self,
        expr: ExprId,
        op: &Token,
        left: ExprId,
        right: ExprId,
    ) -> RResult<()> {
        self.resolve_expression(left)?;
        self.resolve_expression(right)?;
        let left_type = self.expr_type(left)?;
        let right_type = self.expr_type(right)?;
        let meta = self.ctx.store.exprs[expr].meta;

        let value = match op.kind {
            k if crate::resolver::is_assignment_kind(k) => left_type,
            TokenKind::DoubleAmpersand | TokenKind::DoublePipe | TokenKind::And | TokenKind::Or => {
                let bool_sym = self.ctx.builtins.bool_;
                tyref::base(&mut self.ctx.store, bool_sym, Vec::new(), meta)
            }
            TokenKind::DoubleEquals
            | TokenKind::TripleEquals
            | TokenKind::ExclamationPointEquals
            | TokenKind::ExclamationPointDoubleEquals
            | TokenKind::Lt
            | TokenKind::Gt
            | TokenKind::LtEquals
            | TokenKind::GtEquals => {
                let bool_sym = self.ctx.builtins.bool_;
                tyref::base(&mut self.ctx.store, bool_sym, Vec::new(), meta)
            }
            TokenKind::Compare => {
                let int = self.ctx.builtins.int;
                tyref::base(&mut self.ctx.store, int, Vec::new(), meta)
            }
            TokenKind::DoubleQuestionMark => {
                // `??` between non-optional operands is a type error.
                let actual = types::actual_type_of(&self.ctx.store, left_type);
                match actual {
                    Some(sym) if self.ctx.builtins.is_optional_wrapper(sym) => {
                        let wrapped = self.ctx.store.type_refs[left_type]
                            .actual_generics
                            .first()
                            .copied()
                            .unwrap_or(right_type);
                        types::min_common_type(
                            &mut self.ctx.store,
                            &self.ctx.builtins,
                            wrapped,
                            right_type,
                        )
                    }
                    _ => {
                        self.report_once(
                            ErrorCode::ArgumentTypeMismatch,
                            self.ctx.store.exprs[left].meta,
                            1,
                            "the left operand of `??` must be optional".to_string(),
                        );
                        return Err(ResolveSignal::Failed);
                    }
                }
            }
            TokenKind::DoubleDot | TokenKind::TripleDot => {
                let element = types::min_common_type(
                    &mut self.ctx.store,
                    &self.ctx.builtins,
                    left_type,
                    right_type,
                );
                let array = self.ctx.builtins.array;
                tyref::array(&mut self.ctx.store, array, element)
            }
            _ => types::min_common_type(
                &mut self.ctx.store,
                &self.ctx.builtins,
                left_type,
                right_type,
            ),
        };
        self.set_expr_type(expr, value);
        Ok(())
    }

    fn resolve_prefix(&mut self, expr: ExprId, op: &Token, arg: ExprId) -> RResult<()> {
        self.resolve_expression(arg)?;
        let arg_type = self.expr_type(arg)?;
        let meta = self.ctx.store.exprs[expr].meta;

        let value = match op.kind {
            TokenKind::ExclamationPoint | TokenKind::Not => {
                let bool_sym = self.ctx.builtins.bool_;
                tyref::base(&mut self.ctx.store, bool_sym, Vec::new(), meta)
            }
            TokenKind::Ampersand => {
                let pointer = self.ctx.builtins.pointer;
                tyref::pointer(&mut self.ctx.store, pointer, arg_type)
            }
            TokenKind::Asterisk => {
                let actual = types::actual_type_of(&self.ctx.store, arg_type);
                if actual == Some(self.ctx.builtins.pointer) {
                    self.ctx.store.type_refs[arg_type]
                        .actual_generics
                        .first()
                        .copied()
                        .unwrap_or(arg_type)
                } else {
                    arg_type
                }
            }
            TokenKind::TryOptional => {
                let optional = self.ctx.builtins.optional;
                tyref::optional(&mut self.ctx.store, optional, arg_type)
            }
            TokenKind::TryUnwrapped => {
                let unwrapped = self.ctx.builtins.unwrapped_optional;
                tyref::unwrapped_optional(&mut self.ctx.store, unwrapped, arg_type)
            }
            _ => arg_type,
        };
        self.set_expr_type(expr, value);
        Ok(())
    }

    fn resolve_postfix(&mut self, expr: ExprId, op: &Token, arg: ExprId) -> RResult<()> {
        self.resolve_expression(arg)?;
        let arg_type = self.expr_type(arg)?;

        let value = match op.kind {
            TokenKind::ExclamationPoint => {
                let actual = types::actual_type_of(&self.ctx.store, arg_type);
                match actual {
                    Some(sym) if self.ctx.builtins.is_optional_wrapper(sym) => self
                        .ctx
                        .store
                        .type_refs[arg_type]
                        .actual_generics
                        .first()
                        .copied()
                        .unwrap_or(arg_type),
                    _ => arg_type,
                }
            }
            _ => arg_type,
        };
        self.set_expr_type(expr, value);
        Ok(())
    }

    fn resolve_subscript(&mut self, expr: ExprId, target: ExprId, index: ExprId) -> RResult<()> {
        self.resolve_expression(target)?;
        self.resolve_expression(index)?;
        let target_type = self.expr_type(target)?;
        let meta = self.ctx.store.exprs[expr].meta;

        let actual = types::actual_type_of(&self.ctx.store, target_type);
        let generics = self.ctx.store.type_refs[target_type].actual_generics.clone();
        let value = if actual == Some(self.ctx.builtins.array) {
            generics.first().copied()
        } else if actual == Some(self.ctx.builtins.map) {
            generics.get(1).copied()
        } else if actual == Some(self.ctx.builtins.pointer) {
            generics.first().copied()
        } else {
            None
        };

        let value = match value {
            Some(value) => value,
            None => {
                let any = self.ctx.builtins.any;
                tyref::base(&mut self.ctx.store, any, Vec::new(), meta)
            }
        };
        self.set_expr_type(expr, value);
        Ok(())
    }

    fn resolve_identifier(
        &mut self,
        expr: ExprId,
        criteria: Option<&SearchCriteria>,
        access: AccessKind,
    ) -> RResult<Option<ExprId>> {
        let (name, generics, global_prefix) = match &self.ctx.store.exprs[expr].kind {
            ExprKind::Identifier {
                name,
                generics,
                global_prefix,
                ..
            } => (name.clone(), generics.clone(), *global_prefix),
            _ => return Ok(None),
        };

        for &generic in &generics {
            self.resolve_type_ref(generic)?;
        }

        let scope = if global_prefix {
            self.ctx.store.global_scope_of(self.peek_scope())
        } else {
            self.peek_scope()
        };

        let actual_criteria = SearchCriteria {
            recursive: criteria.map(|c| c.recursive).unwrap_or(true),
            allow_external: self.allow_external(),
            targets: criteria
                .map(|c| c.targets.clone())
                .unwrap_or_else(|| vec![SearchTarget::Type, SearchTarget::Variable]),
            require_exact_match: criteria.map(|c| c.require_exact_match).unwrap_or(true),
            modifiable: criteria.map(|c| c.modifiable).unwrap_or(false),
        };

        let mut results = Vec::new();
        lookup::resolve_symbol(
            &self.ctx.store,
            self.builtins_for_lookup(),
            scope,
            &name,
            actual_criteria.recursive,
            actual_criteria.allow_external,
            &actual_criteria.targets,
            &mut results,
        );
        if results.is_empty() {
            return Err(self.unresolved_expr(expr, &name.text));
        }

        if actual_criteria.require_exact_match {
            let meta = self.ctx.store.exprs[expr].meta;
            let lexical = self.lexical_scope();
            let (referent, problems) = lookup::select_referent(
                &self.ctx.store,
                &self.ctx.builtins,
                &results,
                &generics,
                &actual_criteria,
                meta,
                lexical,
                access,
            )
            .expect("non-empty results");
            self.emit_problems(&problems);

            let value_type = self.symbol_value_type(referent, meta)?;
            if let ExprKind::Identifier {
                referent: slot, ..
            } = &mut self.ctx.store.exprs[expr].kind
            {
                *slot = Some(referent);
            }
            if let Some(value_type) = value_type {
                self.set_expr_type(expr, value_type);
            }
            Ok(None)
        } else {
            if let ExprKind::Identifier {
                possible_referents, ..
            } = &mut self.ctx.store.exprs[expr].kind
            {
                *possible_referents = results;
            }
            Ok(Some(expr))
        }
    }

    /// The type an expression referencing this symbol takes, or `None` for
    /// symbols (types, namespaces, imports) that only open a scope.
    fn symbol_value_type(
        &mut self,
        symbol: SymbolId,
        referer_meta: SourceMeta,
    ) -> RResult<Option<TypeRefId>> {
        match self.tag_of(symbol) {
            SymbolTag::Variable => {
                if self.variable_type(symbol).is_none() {
                    if self.stack_contains(symbol) {
                        self.report_once(
                            ErrorCode::UndefinedSymbol,
                            referer_meta,
                            1,
                            "cannot reference a variable before it is defined".to_string(),
                        );
                        return Err(ResolveSignal::Failed);
                    }
                    self.resolve_variable(symbol)?;
                }
                Ok(self.variable_type(symbol))
            }
            SymbolTag::EnumCase => {
                let owner = match &self.ctx.store.symbols[symbol].kind {
                    SymbolKind::EnumCase { owner, .. } => *owner,
                    _ => return Ok(None),
                };
                Ok(Some(tyref::base(
                    &mut self.ctx.store,
                    owner,
                    Vec::new(),
                    referer_meta,
                )))
            }
            SymbolTag::Function => Ok(Some(self.function_type_of(symbol)?)),
            SymbolTag::Other => {
                if matches!(
                    self.ctx.store.symbols[symbol].kind,
                    SymbolKind::Parameter { .. }
                ) {
                    self.resolve_parameter(symbol, None)?;
                    return Ok(self.parameter_type(symbol));
                }
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    /// The call signature of a function symbol, resolving it on demand and
    /// raising the recursion signal for cyclic inference chains.
    fn function_type_of(&mut self, symbol: SymbolId) -> RResult<TypeRefId> {
        if self.function_return(symbol).is_none() {
            if self.stack_contains(symbol) {
                return Err(ResolveSignal::Recursive);
            }
            self.resolve_function(symbol)?;
        }
        // Still unbound after resolving: a genuine cycle only when this
        // function is on the stack; otherwise it simply is not resolvable
        // yet and the caller retries at a later stage.
        let ret = match self.function_return(symbol) {
            Some(ret) => ret,
            None if self.stack_contains(symbol) => return Err(ResolveSignal::Recursive),
            None => return Err(ResolveSignal::Failed),
        };

        let parameters = match &self.ctx.store.symbols[symbol].kind {
            SymbolKind::Function { parameters, .. } => parameters.clone(),
            _ => return Err(ResolveSignal::Failed),
        };
        let mut params = Vec::new();
        for parameter in parameters {
            match self.parameter_type(parameter) {
                Some(ty) => params.push(ty),
                None => return Err(ResolveSignal::Failed),
            }
        }
        let function = self.ctx.builtins.function;
        Ok(tyref::function(&mut self.ctx.store, function, params, ret))
    }

    fn resolve_array_literal(&mut self, expr: ExprId, elements: &[ExprId]) -> RResult<()> {
        let mut element_type: Option<TypeRefId> = None;
        for &element in elements {
            self.resolve_expression(element)?;
            let ty = self.expr_type(element)?;
            element_type = Some(match element_type {
                None => ty,
                Some(existing) => {
                    types::min_common_type(&mut self.ctx.store, &self.ctx.builtins, existing, ty)
                }
            });
        }

        let meta = self.ctx.store.exprs[expr].meta;
        let element_type = match element_type {
            Some(ty) => ty,
            None => {
                let any = self.ctx.builtins.any;
                tyref::base(&mut self.ctx.store, any, Vec::new(), meta)
            }
        };
        let array = self.ctx.builtins.array;
        let value = tyref::array(&mut self.ctx.store, array, element_type);
        self.set_expr_type(expr, value);
        Ok(())
    }

    fn resolve_map_literal(
        &mut self,
        expr: ExprId,
        keys: &[ExprId],
        values: &[ExprId],
    ) -> RResult<()> {
        let meta = self.ctx.store.exprs[expr].meta;
        let mut fold = |resolver: &mut Self, exprs: &[ExprId]| -> RResult<TypeRefId> {
            let mut folded: Option<TypeRefId> = None;
            for &e in exprs {
                resolver.resolve_expression(e)?;
                let ty = resolver.expr_type(e)?;
                folded = Some(match folded {
                    None => ty,
                    Some(existing) => types::min_common_type(
                        &mut resolver.ctx.store,
                        &resolver.ctx.builtins,
                        existing,
                        ty,
                    ),
                });
            }
            Ok(match folded {
                Some(ty) => ty,
                None => {
                    let any = resolver.ctx.builtins.any;
                    tyref::base(&mut resolver.ctx.store, any, Vec::new(), meta)
                }
            })
        };

        let key_type = fold(self, keys)?;
        let value_type = fold(self, values)?;
        let map = self.ctx.builtins.map;
        let value = tyref::map(&mut self.ctx.store, map, key_type, value_type);
        self.set_expr_type(expr, value);
        Ok(())
    }

    fn resolve_tuple_literal(&mut self, expr: ExprId, elements: &[ExprId]) -> RResult<()> {
        let mut element_types = Vec::new();
        for &element in elements {
            self.resolve_expression(element)?;
            element_types.push(self.expr_type(element)?);
        }
        let tuple = self.ctx.builtins.tuple;
        let value = tyref::tuple(&mut self.ctx.store, tuple, element_types);
        self.set_expr_type(expr, value);
        Ok(())
    }

    fn resolve_literal(&mut self, expr: ExprId, token: &Token) -> RResult<()> {
        let meta = self.ctx.store.exprs[expr].meta;
        let value = match token.kind {
            TokenKind::FloatLiteral => {
                let double = self.ctx.builtins.double;
                tyref::base(&mut self.ctx.store, double, Vec::new(), meta)
            }
            TokenKind::BooleanLiteral => {
                let bool_sym = self.ctx.builtins.bool_;
                tyref::base(&mut self.ctx.store, bool_sym, Vec::new(), meta)
            }
            TokenKind::IntegerLiteral
            | TokenKind::HexLiteral
            | TokenKind::OctalLiteral
            | TokenKind::BinaryLiteral => {
                let int = self.ctx.builtins.int;
                tyref::base(&mut self.ctx.store, int, Vec::new(), meta)
            }
            TokenKind::NilLiteral => {
                let any = self.ctx.builtins.any;
                let any_ref = tyref::base(&mut self.ctx.store, any, Vec::new(), meta);
                let unwrapped = self.ctx.builtins.unwrapped_optional;
                tyref::unwrapped_optional(&mut self.ctx.store, unwrapped, any_ref)
            }
            TokenKind::StringLiteral => {
                let string = self.ctx.builtins.string;
                tyref::base(&mut self.ctx.store, string, Vec::new(), meta)
            }
            TokenKind::SelfKw => self.resolve_self_literal(meta, false)?,
            TokenKind::Super => self.resolve_self_literal(meta, true)?,
            _ => {
                return Err(self.unresolved_expr(expr, &token.text));
            }
        };
        self.set_expr_type(expr, value);
        Ok(())
    }

    fn resolve_self_literal(&mut self, meta: SourceMeta, is_super: bool) -> RResult<TypeRefId> {
        // Find the nearest enclosing type scope.
        let mut scope = self.peek_scope();
        let owner = loop {
            if self.ctx.store.scopes[scope].kind == ScopeKind::Type {
                break self.ctx.store.scopes[scope].owner;
            }
            match self.ctx.store.scopes[scope].parent {
                Some(parent) => scope = parent,
                None => break None,
            }
        };

        let owner = match owner {
            Some(owner) => owner,
            None => {
                self.report_once(
                    ErrorCode::InvalidSymbolForExpression,
                    meta,
                    if is_super { 5 } else { 4 },
                    format!(
                        "`{}` can only appear inside a type",
                        if is_super { "super" } else { "self" }
                    ),
                );
                return Err(ResolveSignal::Failed);
            }
        };

        if self.is_static_context() {
            let code = if is_super {
                ErrorCode::StaticSuper
            } else {
                ErrorCode::StaticSelf
            };
            self.report_once(
                code,
                meta,
                if is_super { 5 } else { 4 },
                format!(
                    "cannot reference `{}` in a static context",
                    if is_super { "super" } else { "self" }
                ),
            );
            return Err(ResolveSignal::Failed);
        }

        if is_super {
            let id = self
                .ctx
                .store
                .add_type_ref(meta, TypeRefKind::Super { child: owner });
            self.resolve_type_ref(id)?;
            Ok(id)
        } else {
            let generic_syms = self.ctx.store.symbols[owner].kind.generics().to_vec();
            let mut generics = Vec::new();
            for g in generic_syms {
                generics.push(tyref::base(&mut self.ctx.store, g, Vec::new(), meta));
            }
            Ok(tyref::base(&mut self.ctx.store, owner, generics, meta))
        }
    }

    /// Whether the innermost function-like context is static: top-level
    /// code, namespace members, and `static`-modified member functions.
    fn is_static_context(&self) -> bool {
        let mut scope = self.peek_scope();
        loop {
            if self.ctx.store.scopes[scope].kind == ScopeKind::Global {
                return true;
            }
            let parent = match self.ctx.store.scopes[scope].parent {
                Some(parent) => parent,
                None => return true,
            };
            if self.ctx.store.scopes[parent].kind == ScopeKind::Type {
                return match self.ctx.store.scopes[scope].owner {
                    Some(owner) => match &self.ctx.store.symbols[owner].kind {
                        SymbolKind::Function { .. } => self.ctx.store.symbols[owner]
                            .has_modifier(TokenKind::Static),
                        _ => false,
                    },
                    None => false,
                };
            }
            scope = parent;
        }
    }

    fn resolve_lambda(
        &mut self,
        expr: ExprId,
        parameters: &[SymbolId],
        scope: ScopeId,
        body: &[StmtId],
    ) -> RResult<()> {
        self.push_scope(scope, true);
        let result = (|| {
            let mut param_types = Vec::new();
            for &parameter in parameters {
                self.resolve_parameter(parameter, None)?;
                match self.parameter_type(parameter) {
                    Some(ty) => param_types.push(ty),
                    None => return Err(ResolveSignal::Failed),
                }
            }

            let mut return_type = None;
            self.resolve_stmt_list(body, &mut return_type)?;
            Ok((param_types, return_type))
        })();
        self.pop_scope();
        let (param_types, return_type) = result?;

        let meta = self.ctx.store.exprs[expr].meta;
        let ret = match return_type {
            Some(ret) => ret,
            None => {
                let void = self.ctx.builtins.void;
                tyref::base(&mut self.ctx.store, void, Vec::new(), meta)
            }
        };
        let function = self.ctx.builtins.function;
        let value = tyref::function(&mut self.ctx.store, function, param_types, ret);
        self.set_expr_type(expr, value);
        Ok(())
    }

    fn resolve_casting(
        &mut self,
        expr: ExprId,
        op: &Token,
        left: ExprId,
        ty: TypeRefId,
    ) -> RResult<()> {
        self.resolve_expression(left)?;
        self.resolve_type_ref(ty)?;

        let meta = self.ctx.store.exprs[expr].meta;
        let value = match op.kind {
            TokenKind::Is => {
                let bool_sym = self.ctx.builtins.bool_;
                tyref::base(&mut self.ctx.store, bool_sym, Vec::new(), meta)
            }
            TokenKind::As => ty,
            TokenKind::AsOptional => {
                let optional = self.ctx.builtins.optional;
                tyref::optional(&mut self.ctx.store, optional, ty)
            }
            TokenKind::AsUnwrapped => {
                let unwrapped = self.ctx.builtins.unwrapped_optional;
                tyref::unwrapped_optional(&mut self.ctx.store, unwrapped, ty)
            }
            _ => ty,
        };
        self.set_expr_type(expr, value);
        Ok(())
    }

    // ----- Function calls and overload resolution ----- //

    fn resolve_function_call(
        &mut self,
        expr: ExprId,
        caller: ExprId,
        args: &[ExprId],
        criteria: Option<&SearchCriteria>,
    ) -> RResult<()> {
        let caller_criteria = SearchCriteria {
            recursive: criteria.map(|c| c.recursive).unwrap_or(true),
            allow_external: self.allow_external(),
            targets: vec![SearchTarget::Variable, SearchTarget::Type],
            require_exact_match: false,
            modifiable: false,
        };
        let idexpr = self.resolve_expression0(caller, Some(&caller_criteria), AccessKind::Plain)?;

        let mut arg_types = Vec::new();
        for &arg in args {
            self.resolve_expression(arg)?;
            arg_types.push(self.expr_type(arg)?);
        }

        match idexpr {
            Some(id) => {
                let (symbol, fn_type) =
                    self.best_caller_for_args(id, &arg_types, &caller_criteria)?;
                let return_type = self.function_ref_return(fn_type);

                if let ExprKind::Identifier {
                    referent: slot, ..
                } = &mut self.ctx.store.exprs[id].kind
                {
                    *slot = Some(symbol);
                }
                self.set_expr_type(id, fn_type);
                if caller != id && self.ctx.store.exprs[caller].value_type.is_none() {
                    self.set_expr_type(caller, fn_type);
                }
                self.set_expr_type(expr, return_type);
                Ok(())
            }
            None => {
                // The caller is an arbitrary expression; it must already
                // carry a function type.
                let caller_type = self.expr_type(caller)?;
                if !matches!(
                    self.ctx.store.type_refs[caller_type].kind,
                    TypeRefKind::Function { .. }
                ) && types::actual_type_of(&self.ctx.store, caller_type)
                    != Some(self.ctx.builtins.function)
                {
                    let meta = self.ctx.store.exprs[caller].meta;
                    self.report_once(
                        ErrorCode::InvalidFunctionCaller,
                        meta,
                        1,
                        "this expression is not callable".to_string(),
                    );
                    return Err(ResolveSignal::Failed);
                }

                let (score, _, reject) = self.function_args_score(caller_type, &arg_types);
                if score < 0 {
                    let meta = self.ctx.store.exprs[expr].meta;
                    let (code, message) = match reject {
                        Reject::NotEnough => (
                            ErrorCode::InsufficientArguments,
                            "not enough arguments for this call",
                        ),
                        Reject::TooMany => {
                            (ErrorCode::TooManyArguments, "too many arguments for this call")
                        }
                        _ => (
                            ErrorCode::ArgumentTypeMismatch,
                            "argument types do not match the callee's signature",
                        ),
                    };
                    self.report_once(code, meta, 1, message.to_string());
                    return Err(ResolveSignal::Failed);
                }

                let return_type = self.function_ref_return(caller_type);
                self.set_expr_type(expr, return_type);
                Ok(())
            }
        }
    }

    fn function_ref_return(&self, fn_type: TypeRefId) -> TypeRefId {
        match &self.ctx.store.type_refs[fn_type].kind {
            TypeRefKind::Function { ret, .. } => *ret,
            _ => self.ctx.store.type_refs[fn_type]
                .actual_generics
                .first()
                .copied()
                .unwrap_or(fn_type),
        }
    }

    fn function_ref_params(&self, fn_type: TypeRefId) -> Vec<TypeRefId> {
        match &self.ctx.store.type_refs[fn_type].kind {
            TypeRefKind::Function { params, .. } => params.clone(),
            _ => self.ctx.store.type_refs[fn_type]
                .actual_generics
                .iter()
                .skip(1)
                .copied()
                .collect(),
        }
    }

    /// Score the actual argument types against a function signature.
    fn function_args_score(
        &self,
        fn_type: TypeRefId,
        args: &[TypeRefId],
    ) -> (i32, bool, Reject) {
        let params = self.function_ref_params(fn_type);
        let variadic = params
            .last()
            .map(|&p| self.is_variadic_ref(p))
            .unwrap_or(false);
        let required = if variadic {
            params.len() - 1
        } else {
            params.len()
        };

        if args.len() < required {
            return (-1, variadic, Reject::NotEnough);
        }

        let mut total = 0;
        for (i, &arg) in args.iter().enumerate() {
            let expected = if i >= params.len() {
                if !variadic {
                    return (-1, variadic, Reject::TooMany);
                }
                self.variadic_element(*params.last().unwrap())
            } else if variadic && i + 1 == params.len() {
                self.variadic_element(params[i])
            } else {
                params[i]
            };

            let score = types::type_match_score(&self.ctx.store, &self.ctx.builtins, arg, expected);
            if score < 0 {
                return (-1, variadic, Reject::Mismatch);
            }
            total += score;
        }
        (total, variadic, Reject::None)
    }

    fn variadic_element(&self, ty: TypeRefId) -> TypeRefId {
        match &self.ctx.store.type_refs[ty].kind {
            TypeRefKind::Suffix { base, suffix } if suffix.kind == TokenKind::TripleDot => *base,
            _ => ty,
        }
    }

    /// Derive one call-signature candidate set per possible referent, score
    /// them against the actual arguments, and pick the best valid one.
    fn best_caller_for_args(
        &mut self,
        idexpr: ExprId,
        args: &[TypeRefId],
        criteria: &SearchCriteria,
    ) -> RResult<(SymbolId, TypeRefId)> {
        let (referents, generics, meta) = match &self.ctx.store.exprs[idexpr].kind {
            ExprKind::Identifier {
                possible_referents,
                generics,
                ..
            } => (
                possible_referents.clone(),
                generics.clone(),
                self.ctx.store.exprs[idexpr].meta,
            ),
            _ => return Err(ResolveSignal::Failed),
        };

        let mut candidates: Vec<(SearchResult, SymbolId, TypeRefId)> = Vec::new();
        for result in &referents {
            self.collect_call_candidates(result, meta, &mut candidates)?;
        }

        if candidates.is_empty() {
            return Err(self.unresolved_expr(idexpr, &self.access_expr_name(idexpr)));
        }

        let mut scored: Vec<(usize, i32, bool, Reject)> = candidates
            .iter()
            .enumerate()
            .map(|(i, (_, _, fn_type))| {
                let (score, variadic, reject) = self.function_args_score(*fn_type, args);
                (i, score, variadic, reject)
            })
            .collect();

        // Non-variadic candidates take precedence, ascending by score.
        scored.sort_by_key(|&(i, score, variadic, _)| (variadic, score, i));

        for &(i, score, _, _) in &scored {
            if score < 0 {
                continue;
            }
            let (result, symbol, fn_type) = candidates[i].clone();
            let mut problems = Vec::new();
            lookup::find_candidate_problems(
                &self.ctx.store,
                &self.ctx.builtins,
                &result,
                &generics,
                criteria,
                meta,
                self.lexical_scope(),
                AccessKind::Plain,
                &mut problems,
            );
            if problems
                .iter()
                .all(|p| p.code.severity() != aclc_util::Level::Error)
            {
                self.emit_problems(&problems);
                return Ok((symbol, fn_type));
            }
        }

        // No candidate accepted the arguments.
        let reject = scored
            .iter()
            .map(|&(_, _, _, reject)| reject)
            .find(|&r| r != Reject::None)
            .unwrap_or(Reject::Mismatch);
        let (code, message) = match reject {
            Reject::NotEnough => (
                ErrorCode::InsufficientArguments,
                "no overload accepts this few arguments",
            ),
            Reject::TooMany => (
                ErrorCode::TooManyArguments,
                "no overload accepts this many arguments",
            ),
            _ => (
                ErrorCode::ArgumentTypeMismatch,
                "no candidate function accepts the provided arguments",
            ),
        };
        self.report_once(code, meta, 1, message.to_string());
        Err(ResolveSignal::Failed)
    }

    fn collect_call_candidates(
        &mut self,
        result: &SearchResult,
        meta: SourceMeta,
        dest: &mut Vec<(SearchResult, SymbolId, TypeRefId)>,
    ) -> RResult<()> {
        match self.tag_of(result.symbol) {
            SymbolTag::Variable => {
                if let Some(ty) = self.symbol_value_type(result.symbol, meta)? {
                    if matches!(
                        self.ctx.store.type_refs[ty].kind,
                        TypeRefKind::Function { .. }
                    ) {
                        dest.push((*result, result.symbol, ty));
                    }
                }
                Ok(())
            }
            SymbolTag::Function => {
                let fn_type = self.function_type_of(result.symbol)?;
                dest.push((*result, result.symbol, fn_type));
                Ok(())
            }
            SymbolTag::EnumCase => {
                self.report_once(
                    ErrorCode::InvalidFunctionCaller,
                    meta,
                    1,
                    "enum cases cannot be called".to_string(),
                );
                Err(ResolveSignal::Failed)
            }
            SymbolTag::Constructor => {
                let fn_type = self.constructor_type_of(result.symbol, meta)?;
                // The candidate's owning scope is the constructor's type.
                let ctor_scope = self.ctx.store.symbols[result.symbol]
                    .scope
                    .expect("ctor scope");
                let owning = self.ctx.store.scopes[ctor_scope]
                    .parent
                    .unwrap_or(result.owning_scope);
                dest.push((
                    SearchResult {
                        symbol: result.symbol,
                        owning_scope: owning,
                        origin: result.origin,
                    },
                    result.symbol,
                    fn_type,
                ));
                Ok(())
            }
            SymbolTag::TypeDecl | SymbolTag::Alias => {
                let type_symbol = types::unfold_alias(&self.ctx.store, result.symbol);
                if matches!(
                    self.ctx.store.symbols[type_symbol].kind,
                    SymbolKind::Template { .. }
                ) {
                    self.report_once(
                        ErrorCode::TemplateConstructor,
                        meta,
                        1,
                        "templates do not have constructors".to_string(),
                    );
                    return Err(ResolveSignal::Failed);
                }
                let scope = match self.ctx.store.symbols[type_symbol].scope {
                    Some(scope) => scope,
                    None => return Ok(()),
                };
                let members = self.ctx.store.scopes[scope].symbols.clone();
                for member in members {
                    if matches!(
                        self.ctx.store.symbols[member].kind,
                        SymbolKind::Constructor { .. }
                    ) {
                        let fn_type = self.constructor_type_of(member, meta)?;
                        dest.push((
                            SearchResult {
                                symbol: member,
                                owning_scope: scope,
                                origin: result.origin,
                            },
                            member,
                            fn_type,
                        ));
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// The call signature of a constructor: its parameters, returning the
    /// owning type.
    fn constructor_type_of(&mut self, symbol: SymbolId, meta: SourceMeta) -> RResult<TypeRefId> {
        let ctor_scope = self.ctx.store.symbols[symbol].scope.expect("ctor scope");
        let owning_type = self.ctx.store.scopes[ctor_scope]
            .parent
            .and_then(|p| self.ctx.store.scopes[p].owner)
            .ok_or(ResolveSignal::Failed)?;

        let parameters = match &self.ctx.store.symbols[symbol].kind {
            SymbolKind::Constructor { parameters, .. } => parameters.clone(),
            _ => return Err(ResolveSignal::Failed),
        };

        let mut params = Vec::new();
        for parameter in parameters {
            if self.parameter_type(parameter).is_none() {
                // Parameters resolve in the constructor's own scope.
                self.push_scope(ctor_scope, true);
                let outcome = self.resolve_parameter(parameter, None);
                self.pop_scope();
                outcome?;
            }
            match self.parameter_type(parameter) {
                Some(ty) => params.push(ty),
                None => return Err(ResolveSignal::Failed),
            }
        }

        let ret = tyref::base(&mut self.ctx.store, owning_type, Vec::new(), meta);
        let function = self.ctx.builtins.function;
        Ok(tyref::function(&mut self.ctx.store, function, params, ret))
    }
}

pub(crate) fn is_assignment_kind(kind: TokenKind) -> bool {
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
