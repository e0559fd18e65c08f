//! Type compatibility: matching, casting, match scoring, and the minimal
//! common type.
//!
//! All predicates operate on resolved type references; a reference whose
//! `actual_type` is still unbound is never compatible with anything.

use crate::builtins::{Builtins, NumericFamily};
use crate::tyref;
use aclc_par::{AstStore, SymbolId, SymbolKind, TypeRefId};
use aclc_util::FxHashMap;
use std::collections::VecDeque;

/// Follow alias symbols to the type they name.
pub fn unfold_alias(store: &AstStore, mut symbol: SymbolId) -> SymbolId {
    let mut hops = 0;
    while let SymbolKind::Alias { value, .. } = &store.symbols[symbol].kind {
        match store.type_refs[*value].actual_type {
            // Alias cycles are user errors; bail out rather than spin.
            Some(next) if hops < 64 => {
                symbol = next;
                hops += 1;
            }
            _ => break,
        }
    }
    symbol
}

/// Resolved target of a type reference, aliases unfolded.
pub fn actual_type_of(store: &AstStore, tr: TypeRefId) -> Option<SymbolId> {
    store.type_refs[tr]
        .actual_type
        .map(|t| unfold_alias(store, t))
}

/// Declared parent type symbols of a type symbol.
pub fn parent_symbols(store: &AstStore, symbol: SymbolId) -> Vec<SymbolId> {
    let refs: &[TypeRefId] = match &store.symbols[symbol].kind {
        SymbolKind::Class { parent_types, .. }
        | SymbolKind::Struct { parent_types, .. }
        | SymbolKind::Template { parent_types, .. }
        | SymbolKind::Enum { parent_types, .. }
        | SymbolKind::BuiltinType { parent_types, .. } => parent_types,
        SymbolKind::GenericType { actual_parent, .. } => {
            return actual_parent
                .and_then(|r| actual_type_of(store, r))
                .into_iter()
                .collect()
        }
        SymbolKind::Alias { value, .. } => {
            return actual_type_of(store, *value).into_iter().collect()
        }
        _ => return Vec::new(),
    };
    refs.iter()
        .filter_map(|&r| actual_type_of(store, r))
        .collect()
}

/// Breadth-first distance from `src` to `target` through the declared
/// hierarchy; `Some(0)` when equal, `None` when `target` is not an ancestor.
pub fn hierarchy_distance(store: &AstStore, src: SymbolId, target: SymbolId) -> Option<u32> {
    let src = unfold_alias(store, src);
    let target = unfold_alias(store, target);
    if src == target {
        return Some(0);
    }

    let mut queue = VecDeque::new();
    let mut seen = FxHashMap::default();
    queue.push_back((src, 0u32));
    seen.insert(src, 0u32);

    while let Some((sym, depth)) = queue.pop_front() {
        for parent in parent_symbols(store, sym) {
            if parent == target {
                return Some(depth + 1);
            }
            if seen.insert(parent, depth + 1).is_none() {
                queue.push_back((parent, depth + 1));
            }
        }
    }
    None
}

/// Structural equality after alias unfolding, generics included.
pub fn types_match(store: &AstStore, a: TypeRefId, b: TypeRefId) -> bool {
    let (sa, sb) = match (actual_type_of(store, a), actual_type_of(store, b)) {
        (Some(sa), Some(sb)) => (sa, sb),
        _ => return false,
    };
    if sa != sb {
        return false;
    }
    let ga = &store.type_refs[a].actual_generics;
    let gb = &store.type_refs[b].actual_generics;
    ga.len() == gb.len() && ga.iter().zip(gb).all(|(&x, &y)| types_match(store, x, y))
}

/// True when a numeric `src` widens to a numeric `target`.
fn numeric_widens(
    store: &AstStore,
    builtins: &Builtins,
    src: SymbolId,
    target: SymbolId,
) -> bool {
    let (src_fam, src_width) = match builtins.numeric_info(store, src) {
        Some(info) => info,
        None => return false,
    };
    if target == builtins.number {
        return true;
    }
    let (target_fam, target_width) = match builtins.numeric_info(store, target) {
        Some(info) => info,
        None => return false,
    };
    if target_width < src_width {
        return false;
    }
    // Within a family any widening goes; integers additionally widen into
    // floats of at least their width.
    src_fam == target_fam || target_fam == NumericFamily::Float
}

/// Returns true if `src` can be cast to `target`.
pub fn can_cast_to(
    store: &AstStore,
    builtins: &Builtins,
    src: TypeRefId,
    target: TypeRefId,
) -> bool {
    let (s, t) = match (actual_type_of(store, src), actual_type_of(store, target)) {
        (Some(s), Some(t)) => (s, t),
        _ => return false,
    };

    if s == t {
        return true;
    }
    if hierarchy_distance(store, s, t).is_some() {
        return true;
    }
    if numeric_widens(store, builtins, s, t) {
        return true;
    }
    if builtins.is_optional_wrapper(t) {
        if let Some(&wrapped) = store.type_refs[target].actual_generics.first() {
            return can_cast_to(store, builtins, src, wrapped);
        }
    }
    t == builtins.any
}

/// Cast distance for overload scoring: 0 for an exact match, higher for
/// each cast the argument needs; -1 when the types are unrelated.
pub fn type_match_score(
    store: &AstStore,
    builtins: &Builtins,
    src: TypeRefId,
    target: TypeRefId,
) -> i32 {
    let (s, t) = match (actual_type_of(store, src), actual_type_of(store, target)) {
        (Some(s), Some(t)) => (s, t),
        _ => return -1,
    };

    if s == t {
        return 0;
    }
    if let Some(distance) = hierarchy_distance(store, s, t) {
        return distance as i32;
    }
    if numeric_widens(store, builtins, s, t) {
        return 2;
    }
    if builtins.is_optional_wrapper(t) {
        if let Some(&wrapped) = store.type_refs[target].actual_generics.first() {
            let inner = type_match_score(store, builtins, src, wrapped);
            if inner >= 0 {
                return inner + 1;
            }
        }
    }
    if t == builtins.any {
        return 3;
    }
    -1
}

/// The nearest common ancestor of `a` and `b` in the declared hierarchy.
/// `Any` is the universal fallback, so a type always exists.
pub fn min_common_type(
    store: &mut AstStore,
    builtins: &Builtins,
    a: TypeRefId,
    b: TypeRefId,
) -> TypeRefId {
    let (sa, sb) = match (actual_type_of(store, a), actual_type_of(store, b)) {
        (Some(sa), Some(sb)) => (sa, sb),
        _ => return a,
    };

    // Depths of every ancestor of `a`.
    let mut a_depths = FxHashMap::default();
    let mut queue = VecDeque::new();
    queue.push_back((sa, 0u32));
    a_depths.insert(sa, 0u32);
    while let Some((sym, depth)) = queue.pop_front() {
        for parent in parent_symbols(store, sym) {
            if !a_depths.contains_key(&parent) {
                a_depths.insert(parent, depth + 1);
                queue.push_back((parent, depth + 1));
            }
        }
    }

    // First ancestor of `b` (breadth-first) that `a` also reaches.
    let mut seen = FxHashMap::default();
    queue.push_back((sb, 0u32));
    seen.insert(sb, 0u32);
    while let Some((sym, depth)) = queue.pop_front() {
        if a_depths.contains_key(&sym) {
            if sym == sa {
                return a;
            }
            if sym == sb {
                return b;
            }
            let meta = store.type_refs[a].meta;
            return tyref::base(store, sym, Vec::new(), meta);
        }
        for parent in parent_symbols(store, sym) {
            if !seen.contains_key(&parent) {
                seen.insert(parent, depth + 1);
                queue.push_back((parent, depth + 1));
            }
        }
    }

    let meta = store.type_refs[a].meta;
    tyref::base(store, builtins.any, Vec::new(), meta)
}

/// Does the supplied type satisfy a generic parameter's declared bound?
pub fn generic_accepts_type(
    store: &AstStore,
    builtins: &Builtins,
    generic: SymbolId,
    supplied: TypeRefId,
) -> bool {
    match &store.symbols[generic].kind {
        SymbolKind::GenericType { actual_parent, .. } => match actual_parent {
            Some(bound) => can_cast_to(store, builtins, supplied, *bound),
            // An unresolved or missing bound accepts anything.
            None => true,
        },
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aclc_util::span::SourceMeta;

    fn setup() -> (AstStore, Builtins) {
        let mut store = AstStore::new();
        let builtins = Builtins::install(&mut store);
        (store, builtins)
    }

    fn base_ref(store: &mut AstStore, sym: SymbolId) -> TypeRefId {
        tyref::base(store, sym, Vec::new(), SourceMeta::DUMMY)
    }

    #[test]
    fn test_identity_and_hierarchy_casts() {
        let (mut store, builtins) = setup();
        let int_ref = base_ref(&mut store, builtins.int);
        let number_ref = base_ref(&mut store, builtins.number);
        let any_ref = base_ref(&mut store, builtins.any);
        let string_ref = base_ref(&mut store, builtins.string);

        assert!(can_cast_to(&store, &builtins, int_ref, int_ref));
        assert!(can_cast_to(&store, &builtins, int_ref, number_ref));
        assert!(can_cast_to(&store, &builtins, int_ref, any_ref));
        assert!(!can_cast_to(&store, &builtins, int_ref, string_ref));
        assert!(!can_cast_to(&store, &builtins, number_ref, int_ref));
    }

    #[test]
    fn test_numeric_widening() {
        let (mut store, builtins) = setup();
        let int8 = builtins.resolve("Int8").unwrap();
        let int32 = builtins.resolve("Int32").unwrap();
        let uint8 = builtins.resolve("UInt8").unwrap();
        let double = builtins.double;

        let int8_ref = base_ref(&mut store, int8);
        let int32_ref = base_ref(&mut store, int32);
        let uint8_ref = base_ref(&mut store, uint8);
        let double_ref = base_ref(&mut store, double);

        assert!(can_cast_to(&store, &builtins, int8_ref, int32_ref));
        assert!(!can_cast_to(&store, &builtins, int32_ref, int8_ref));
        assert!(!can_cast_to(&store, &builtins, int8_ref, uint8_ref));
        assert!(can_cast_to(&store, &builtins, int8_ref, double_ref));
    }

    #[test]
    fn test_optional_wrapping() {
        let (mut store, builtins) = setup();
        let int_ref = base_ref(&mut store, builtins.int);
        let opt_int = tyref::optional(&mut store, builtins.optional, int_ref);
        assert!(can_cast_to(&store, &builtins, int_ref, opt_int));
        assert!(!can_cast_to(&store, &builtins, opt_int, int_ref));
    }

    #[test]
    fn test_match_scores_prefer_exact() {
        let (mut store, builtins) = setup();
        let int_ref = base_ref(&mut store, builtins.int);
        let number_ref = base_ref(&mut store, builtins.number);
        let double_ref = base_ref(&mut store, builtins.double);

        assert_eq!(type_match_score(&store, &builtins, int_ref, int_ref), 0);
        assert_eq!(type_match_score(&store, &builtins, int_ref, number_ref), 1);
        assert!(type_match_score(&store, &builtins, int_ref, double_ref) > 0);
        let string_ref = base_ref(&mut store, builtins.string);
        assert_eq!(
            type_match_score(&store, &builtins, int_ref, string_ref),
            -1
        );
    }

    #[test]
    fn test_min_common_type() {
        let (mut store, builtins) = setup();
        let int_ref = base_ref(&mut store, builtins.int);
        let double_ref = base_ref(&mut store, builtins.double);
        let string_ref = base_ref(&mut store, builtins.string);

        // Int and Double meet at Number.
        let common = min_common_type(&mut store, &builtins, int_ref, double_ref);
        assert_eq!(actual_type_of(&store, common), Some(builtins.number));

        // Int and String only meet at Any.
        let common = min_common_type(&mut store, &builtins, int_ref, string_ref);
        assert_eq!(actual_type_of(&store, common), Some(builtins.any));

        // A type meets itself at itself.
        let common = min_common_type(&mut store, &builtins, int_ref, int_ref);
        assert_eq!(actual_type_of(&store, common), Some(builtins.int));
    }

    #[test]
    fn test_types_match_compares_generics() {
        let (mut store, builtins) = setup();
        let int_ref = base_ref(&mut store, builtins.int);
        let string_ref = base_ref(&mut store, builtins.string);
        let arr_int = tyref::array(&mut store, builtins.array, int_ref);
        let arr_int2 = tyref::array(&mut store, builtins.array, int_ref);
        let arr_string = tyref::array(&mut store, builtins.array, string_ref);

        assert!(types_match(&store, arr_int, arr_int2));
        assert!(!types_match(&store, arr_int, arr_string));
    }
}
