//! Symbol lookup and candidate validation.
//!
//! `resolve_symbol` walks a scope (and, when asked, its parents, parent
//! types, import referents, and the invariant-type table) collecting every
//! symbol that matches a name and a set of search targets. Candidates are
//! then validated for visibility, staticness, and generics; the first clean
//! candidate wins, and when none is clean the first candidate is returned
//! with its problems emitted as diagnostics.

use crate::builtins::Builtins;
use crate::types;
use aclc_lex::{Token, TokenKind};
use aclc_par::{AstStore, Origin, ScopeId, ScopeKind, SearchResult, SymbolId, SymbolKind, TypeRefId};
use aclc_util::diagnostic::ErrorCode;
use aclc_util::span::SourceMeta;

/// What category of symbol a lookup is after.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchTarget {
    Variable,
    Type,
    Namespace,
}

/// Parameters of one symbol search.
#[derive(Clone, Debug)]
pub struct SearchCriteria {
    pub recursive: bool,
    pub allow_external: bool,
    pub targets: Vec<SearchTarget>,
    pub require_exact_match: bool,
    /// Set when searching for an lvalue rather than an rvalue.
    pub modifiable: bool,
}

/// How a candidate is being reached at the reference site.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessKind {
    /// A plain identifier, no explicit receiver.
    Plain,
    /// Reached through an instance value (`value.member`).
    Instance,
    /// Reached through a type name (`Type.member`).
    Static,
}

/// One validation problem found on a candidate.
#[derive(Clone, Copy, Debug)]
pub struct CandidateProblem {
    pub code: ErrorCode,
    pub meta: SourceMeta,
}

/// The search-target bucket a symbol belongs to.
pub fn search_target_of(store: &AstStore, symbol: SymbolId) -> SearchTarget {
    let kind = &store.symbols[symbol].kind;
    if kind.is_variable_like() {
        SearchTarget::Variable
    } else if kind.is_type() {
        SearchTarget::Type
    } else {
        SearchTarget::Namespace
    }
}

/// True when the symbol is reached statically from its owning scope: global
/// and namespace members always, type members when declared `static` (nested
/// types, aliases, and enum cases count as static members).
pub fn is_static_symbol(store: &AstStore, owning_scope: ScopeId, symbol: SymbolId) -> bool {
    match store.scopes[owning_scope].kind {
        ScopeKind::Global | ScopeKind::Namespace => true,
        ScopeKind::Type => {
            store.symbols[symbol].has_modifier(TokenKind::Static)
                || matches!(
                    store.symbols[symbol].kind,
                    SymbolKind::Class { .. }
                        | SymbolKind::Struct { .. }
                        | SymbolKind::Template { .. }
                        | SymbolKind::Enum { .. }
                        | SymbolKind::Alias { .. }
                        | SymbolKind::Namespace { .. }
                        | SymbolKind::EnumCase { .. }
                )
        }
        _ => false,
    }
}

fn result_origin(store: &AstStore, owning_scope: ScopeId, symbol: SymbolId) -> Origin {
    if store.scopes[owning_scope].kind.is_function_scope() {
        Origin::Local
    } else if is_static_symbol(store, owning_scope, symbol) {
        Origin::Static
    } else {
        Origin::TypeHierarchy
    }
}

fn resolve_symbol_in(
    store: &AstStore,
    scope: ScopeId,
    name: &str,
    recursive: bool,
    allow_external: bool,
    targets: &[SearchTarget],
    dest: &mut Vec<SearchResult>,
) {
    for &symbol in &store.scopes[scope].symbols {
        if store.symbols[symbol].name.text == name
            && targets.contains(&search_target_of(store, symbol))
        {
            dest.push(SearchResult {
                symbol,
                owning_scope: scope,
                origin: result_origin(store, scope, symbol),
            });
        }
    }

    // Probe the resolved parent types of a type scope, one level only.
    if store.scopes[scope].kind == ScopeKind::Type {
        if let Some(owner) = store.scopes[scope].owner {
            for parent in types::parent_symbols(store, owner) {
                if let Some(parent_scope) = store.symbols[parent].scope {
                    resolve_symbol_in(store, parent_scope, name, false, false, targets, dest);
                }
            }
        }
    }

    if recursive {
        if let Some(parent) = store.scopes[scope].parent {
            resolve_symbol_in(store, parent, name, true, allow_external, targets, dest);
        }
    }

    // At a global scope, probe each import's referent global scope.
    if allow_external && store.scopes[scope].kind == ScopeKind::Global {
        let imports = store.scopes[scope].imports.clone();
        for import in imports {
            if let SymbolKind::Import {
                referent: Some(referent),
                ..
            } = &store.symbols[import].kind
            {
                resolve_symbol_in(store, *referent, name, false, false, targets, dest);
            }
        }
    }
}

/// Collect every candidate for `name` starting from `scope`.
///
/// A `global` token short-circuits to the module's global scope. When the
/// search is recursive and includes the TYPE target, the invariant-type
/// table is probed as well (unless the module opted out via `@nobuiltins`).
#[allow(clippy::too_many_arguments)]
pub fn resolve_symbol(
    store: &AstStore,
    builtins: Option<&Builtins>,
    scope: ScopeId,
    name: &Token,
    recursive: bool,
    allow_external: bool,
    targets: &[SearchTarget],
    dest: &mut Vec<SearchResult>,
) {
    if name.kind == TokenKind::Global {
        let global = store.global_scope_of(scope);
        if let Some(owner) = store.scopes[global].owner {
            dest.push(SearchResult {
                symbol: owner,
                owning_scope: global,
                origin: Origin::Static,
            });
        }
        return;
    }

    resolve_symbol_in(
        store,
        scope,
        &name.text,
        recursive,
        allow_external,
        targets,
        dest,
    );

    if recursive && targets.contains(&SearchTarget::Type) {
        if let Some(builtins) = builtins {
            if let Some(symbol) = builtins.resolve(&name.text) {
                dest.push(SearchResult {
                    symbol,
                    owning_scope: builtins.scope,
                    origin: Origin::Static,
                });
            }
        }
    }
}

fn diagnose_visibility(
    store: &AstStore,
    candidate: &SearchResult,
    referer_meta: SourceMeta,
    lexical_scope: ScopeId,
    problems: &mut Vec<CandidateProblem>,
) {
    let symbol = &store.symbols[candidate.symbol];
    let visibility = symbol.visibility_modifier();

    match visibility {
        Some(TokenKind::Internal) => {
            // Internal symbols are only visible within their own module.
            let candidate_global = store.global_scope_of(candidate.owning_scope);
            let lexical_global = store.global_scope_of(lexical_scope);
            if candidate_global != lexical_global {
                problems.push(CandidateProblem {
                    code: ErrorCode::SymbolNotVisible,
                    meta: referer_meta,
                });
            }
        }
        Some(TokenKind::Protected) => {
            if store.scopes[candidate.owning_scope].kind != ScopeKind::Type {
                problems.push(CandidateProblem {
                    code: ErrorCode::InvalidModifier,
                    meta: symbol.meta,
                });
                return;
            }

            // Same lexical hierarchy passes outright.
            let mut current = Some(lexical_scope);
            while let Some(scope) = current {
                if scope == candidate.owning_scope {
                    return;
                }
                current = store.scopes[scope].parent;
            }

            // Otherwise the nearest enclosing type must inherit from the
            // candidate's owning type.
            let owning_type = store.scopes[candidate.owning_scope].owner;
            let mut enclosing_type = None;
            let mut current = Some(lexical_scope);
            while let Some(scope) = current {
                if store.scopes[scope].kind == ScopeKind::Type {
                    enclosing_type = store.scopes[scope].owner;
                    break;
                }
                current = store.scopes[scope].parent;
            }

            let inherits = match (enclosing_type, owning_type) {
                (Some(child), Some(parent)) => {
                    types::hierarchy_distance(store, child, parent).is_some()
                }
                _ => false,
            };
            if !inherits {
                problems.push(CandidateProblem {
                    code: ErrorCode::SymbolNotVisible,
                    meta: referer_meta,
                });
            }
        }
        Some(TokenKind::Private) => {
            if !matches!(
                store.scopes[candidate.owning_scope].kind,
                ScopeKind::Type | ScopeKind::Namespace
            ) {
                problems.push(CandidateProblem {
                    code: ErrorCode::InvalidModifier,
                    meta: symbol.meta,
                });
                return;
            }

            let mut current = Some(lexical_scope);
            while let Some(scope) = current {
                if scope == candidate.owning_scope {
                    return;
                }
                current = store.scopes[scope].parent;
            }
            problems.push(CandidateProblem {
                code: ErrorCode::SymbolNotVisible,
                meta: referer_meta,
            });
        }
        _ => {}
    }
}

fn diagnose_staticness(
    store: &AstStore,
    candidate: &SearchResult,
    access: AccessKind,
    referer_meta: SourceMeta,
    problems: &mut Vec<CandidateProblem>,
) {
    let is_static = is_static_symbol(store, candidate.owning_scope, candidate.symbol);
    match access {
        AccessKind::Instance => {
            if is_static {
                problems.push(CandidateProblem {
                    code: ErrorCode::StaticAccessViaInstance,
                    meta: referer_meta,
                });
            }
        }
        AccessKind::Static => {
            if !is_static && candidate.origin == Origin::TypeHierarchy {
                problems.push(CandidateProblem {
                    code: ErrorCode::InstanceAccessViaStatic,
                    meta: referer_meta,
                });
            }
        }
        AccessKind::Plain => {}
    }
}

fn diagnose_generics(
    store: &AstStore,
    builtins: &Builtins,
    candidate: &SearchResult,
    generics: &[TypeRefId],
    criteria: &SearchCriteria,
    referer_meta: SourceMeta,
    problems: &mut Vec<CandidateProblem>,
) {
    let last_meta = generics
        .last()
        .map(|&g| store.type_refs[g].meta)
        .unwrap_or(referer_meta);

    let check_bounds = |declared: &[SymbolId], problems: &mut Vec<CandidateProblem>| {
        for (i, &supplied) in generics.iter().enumerate() {
            if let Some(&param) = declared.get(i) {
                if !types::generic_accepts_type(store, builtins, param, supplied) {
                    problems.push(CandidateProblem {
                        code: ErrorCode::GenericsMismatch,
                        meta: store.type_refs[supplied].meta,
                    });
                }
            }
        }
    };

    match &store.symbols[candidate.symbol].kind {
        SymbolKind::Namespace {
            generics: declared, ..
        } => {
            if declared.len() < generics.len() {
                problems.push(CandidateProblem {
                    code: ErrorCode::TooManyGenerics,
                    meta: last_meta,
                });
            } else if declared.len() > generics.len() {
                problems.push(CandidateProblem {
                    code: ErrorCode::InsufficientGenerics,
                    meta: referer_meta,
                });
            } else {
                check_bounds(declared, problems);
            }
        }
        SymbolKind::GenericType { .. } => {
            // A generic parameter has no generics of its own.
            if !generics.is_empty() {
                problems.push(CandidateProblem {
                    code: ErrorCode::TooManyGenerics,
                    meta: last_meta,
                });
            }
        }
        SymbolKind::BuiltinType { generic_arity, .. } => {
            if (generics.len() as u32) > u32::from(*generic_arity) {
                problems.push(CandidateProblem {
                    code: ErrorCode::TooManyGenerics,
                    meta: last_meta,
                });
            }
        }
        SymbolKind::Function {
            generics: declared, ..
        } => {
            if declared.len() < generics.len() {
                problems.push(CandidateProblem {
                    code: ErrorCode::TooManyGenerics,
                    meta: last_meta,
                });
            }
            check_bounds(declared, problems);
        }
        SymbolKind::Constructor { .. } => {
            // A constructor's generics are those of its owning type.
            let owner_generics: Vec<SymbolId> = store.scopes
                [store.owning_type_scope_of(candidate.symbol)]
            .owner
            .map(|o| store.symbols[o].kind.generics().to_vec())
            .unwrap_or_default();
            if owner_generics.len() < generics.len() {
                problems.push(CandidateProblem {
                    code: ErrorCode::TooManyGenerics,
                    meta: last_meta,
                });
                return;
            }
            if criteria.require_exact_match && owner_generics.len() > generics.len() {
                problems.push(CandidateProblem {
                    code: ErrorCode::InsufficientGenerics,
                    meta: referer_meta,
                });
            }
            check_bounds(&owner_generics, problems);
        }
        kind if kind.is_type() => {
            let declared = kind.generics().to_vec();
            if declared.len() < generics.len() {
                problems.push(CandidateProblem {
                    code: ErrorCode::TooManyGenerics,
                    meta: last_meta,
                });
                return;
            }
            if criteria.require_exact_match && declared.len() > generics.len() {
                problems.push(CandidateProblem {
                    code: ErrorCode::InsufficientGenerics,
                    meta: referer_meta,
                });
            }
            check_bounds(&declared, problems);
        }
        _ => {
            if !generics.is_empty() {
                problems.push(CandidateProblem {
                    code: ErrorCode::TooManyGenerics,
                    meta: last_meta,
                });
            }
        }
    }
}

/// Validate one candidate: visibility, then staticness, then generics.
pub fn find_candidate_problems(
    store: &AstStore,
    builtins: &Builtins,
    candidate: &SearchResult,
    generics: &[TypeRefId],
    criteria: &SearchCriteria,
    referer_meta: SourceMeta,
    lexical_scope: ScopeId,
    access: AccessKind,
    problems: &mut Vec<CandidateProblem>,
) {
    diagnose_visibility(store, candidate, referer_meta, lexical_scope, problems);
    diagnose_staticness(store, candidate, access, referer_meta, problems);
    diagnose_generics(
        store,
        builtins,
        candidate,
        generics,
        criteria,
        referer_meta,
        problems,
    );
}

/// Pick the referent from a candidate list: the first problem-free
/// candidate, else the first candidate with its problems returned for
/// emission.
#[allow(clippy::too_many_arguments)]
pub fn select_referent(
    store: &AstStore,
    builtins: &Builtins,
    results: &[SearchResult],
    generics: &[TypeRefId],
    criteria: &SearchCriteria,
    referer_meta: SourceMeta,
    lexical_scope: ScopeId,
    access: AccessKind,
) -> Option<(SymbolId, Vec<CandidateProblem>)> {
    let first = results.first()?;

    let mut first_problems = Vec::new();
    for (i, candidate) in results.iter().enumerate() {
        let mut problems = Vec::new();
        find_candidate_problems(
            store,
            builtins,
            candidate,
            generics,
            criteria,
            referer_meta,
            lexical_scope,
            access,
            &mut problems,
        );
        if problems.is_empty() {
            return Some((candidate.symbol, Vec::new()));
        }
        if i == 0 {
            first_problems = problems;
        }
    }

    Some((first.symbol, first_problems))
}

trait ConstructorScopeExt {
    fn owning_type_scope_of(&self, constructor: SymbolId) -> ScopeId;
}

impl ConstructorScopeExt for AstStore {
    /// The owning type's scope of a constructor: the parent of the
    /// constructor's own scope.
    fn owning_type_scope_of(&self, constructor: SymbolId) -> ScopeId {
        let ctor_scope = self.symbols[constructor]
            .scope
            .expect("constructor has a scope");
        self.scopes[ctor_scope]
            .parent
            .expect("constructor scope has a parent")
    }
}
