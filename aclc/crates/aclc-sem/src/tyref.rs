//! Construction helpers for synthesized type references.
//!
//! The resolver frequently needs a reference to a known type symbol (`Bool`
//! for a condition check, `Void` for a bare return, a function signature for
//! an overload candidate). These helpers build already-resolved [`TypeRef`]s
//! directly in the arena.

use aclc_lex::{Token, TokenKind};
use aclc_par::{AstStore, SymbolId, TypeRefId, TypeRefKind};
use aclc_util::span::SourceMeta;

/// A resolved reference to `referent` with the given generic arguments.
pub fn base(
    store: &mut AstStore,
    referent: SymbolId,
    generics: Vec<TypeRefId>,
    meta: SourceMeta,
) -> TypeRefId {
    let name = store.symbols[referent].name.clone();
    let id = store.add_type_ref(
        meta,
        TypeRefKind::Simple {
            parent: None,
            name,
            generics: generics.clone(),
            referent: Some(referent),
        },
    );
    store.type_refs[id].actual_type = Some(referent);
    store.type_refs[id].actual_generics = generics;
    id
}

fn suffix(
    store: &mut AstStore,
    content: TypeRefId,
    symbol: SymbolId,
    kind: TokenKind,
    text: &str,
) -> TypeRefId {
    let meta = store.type_refs[content].meta;
    let id = store.add_type_ref(
        meta,
        TypeRefKind::Suffix {
            base: content,
            suffix: Token::new(kind, text, meta),
        },
    );
    store.type_refs[id].actual_type = Some(symbol);
    store.type_refs[id].actual_generics = vec![content];
    id
}

/// `T?` resolved to the Optional builtin.
pub fn optional(store: &mut AstStore, optional_sym: SymbolId, content: TypeRefId) -> TypeRefId {
    suffix(store, content, optional_sym, TokenKind::QuestionMark, "?")
}

/// `T!` resolved to the UnwrappedOptional builtin.
pub fn unwrapped_optional(
    store: &mut AstStore,
    unwrapped_sym: SymbolId,
    content: TypeRefId,
) -> TypeRefId {
    suffix(
        store,
        content,
        unwrapped_sym,
        TokenKind::ExclamationPoint,
        "!",
    )
}

/// `T*` resolved to the Pointer builtin.
pub fn pointer(store: &mut AstStore, pointer_sym: SymbolId, content: TypeRefId) -> TypeRefId {
    suffix(store, content, pointer_sym, TokenKind::Asterisk, "*")
}

/// `T[]` resolved to the Array builtin.
pub fn array(store: &mut AstStore, array_sym: SymbolId, element: TypeRefId) -> TypeRefId {
    let meta = store.type_refs[element].meta;
    let id = store.add_type_ref(meta, TypeRefKind::Array { element });
    store.type_refs[id].actual_type = Some(array_sym);
    store.type_refs[id].actual_generics = vec![element];
    id
}

/// `[K: V]` resolved to the Map builtin.
pub fn map(store: &mut AstStore, map_sym: SymbolId, key: TypeRefId, value: TypeRefId) -> TypeRefId {
    let meta = store.type_refs[key].meta;
    let id = store.add_type_ref(meta, TypeRefKind::Map { key, value });
    store.type_refs[id].actual_type = Some(map_sym);
    store.type_refs[id].actual_generics = vec![key, value];
    id
}

/// `(T1, T2)` resolved to the Tuple builtin.
pub fn tuple(store: &mut AstStore, tuple_sym: SymbolId, elements: Vec<TypeRefId>) -> TypeRefId {
    let meta = elements
        .first()
        .map(|&e| store.type_refs[e].meta)
        .unwrap_or(SourceMeta::DUMMY);
    let id = store.add_type_ref(
        meta,
        TypeRefKind::Tuple {
            elements: elements.clone(),
        },
    );
    store.type_refs[id].actual_type = Some(tuple_sym);
    store.type_refs[id].actual_generics = elements;
    id
}

/// `(params) -> ret` resolved to the Function builtin. The return type leads
/// the resolved generics, followed by the parameter types.
pub fn function(
    store: &mut AstStore,
    function_sym: SymbolId,
    params: Vec<TypeRefId>,
    ret: TypeRefId,
) -> TypeRefId {
    let meta = store.type_refs[ret].meta;
    let id = store.add_type_ref(
        meta,
        TypeRefKind::Function {
            params: params.clone(),
            ret,
        },
    );
    store.type_refs[id].actual_type = Some(function_sym);
    let mut generics = vec![ret];
    generics.extend(params);
    store.type_refs[id].actual_generics = generics;
    id
}
