//! The invariant (built-in) type registry.
//!
//! These types are always resolvable irrespective of imports, unless a
//! module opts out with `@nobuiltins`. The registry is installed once at
//! compile start and immutable afterwards; the resolver consults it through
//! shared references.

use crate::tyref;
use aclc_lex::{Token, TokenKind};
use aclc_par::{AstStore, ScopeId, ScopeKind, SymbolId, SymbolKind};
use aclc_util::span::SourceMeta;
use aclc_util::FxHashMap;

/// Classification of a numeric builtin, used by the widening rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NumericFamily {
    Signed,
    Unsigned,
    Float,
}

/// The installed invariant types.
#[derive(Debug)]
pub struct Builtins {
    /// The synthetic scope holding every builtin symbol.
    pub scope: ScopeId,
    names: FxHashMap<String, SymbolId>,

    pub any: SymbolId,
    pub number: SymbolId,
    pub int: SymbolId,
    pub bool_: SymbolId,
    pub string: SymbolId,
    pub void: SymbolId,
    pub double: SymbolId,
    pub array: SymbolId,
    pub map: SymbolId,
    pub tuple: SymbolId,
    pub function: SymbolId,
    pub optional: SymbolId,
    pub unwrapped_optional: SymbolId,
    pub pointer: SymbolId,
}

impl Builtins {
    /// Install the invariant types into `store`.
    pub fn install(store: &mut AstStore) -> Builtins {
        let scope = store.new_scope(None, ScopeKind::Global);
        let mut names = FxHashMap::default();

        let mut declare = |store: &mut AstStore,
                           names: &mut FxHashMap<String, SymbolId>,
                           name: &str,
                           parents: Vec<SymbolId>,
                           generic_arity: u8| {
            let parent_types = parents
                .into_iter()
                .map(|p| tyref::base(store, p, Vec::new(), SourceMeta::DUMMY))
                .collect();
            let own_scope = store.new_scope(Some(scope), ScopeKind::Type);
            let symbol = store.new_symbol(
                Token::new(TokenKind::Id, name, SourceMeta::DUMMY),
                Vec::new(),
                Some(own_scope),
                SymbolKind::BuiltinType {
                    parent_types,
                    generic_arity,
                },
            );
            store.scopes[scope].symbols.push(symbol);
            names.insert(name.to_string(), symbol);
            symbol
        };

        let any = declare(store, &mut names, "Any", vec![], 0);
        let number = declare(store, &mut names, "Number", vec![any], 0);
        let int = declare(store, &mut names, "Int", vec![number], 0);
        for name in ["Int8", "Int16", "Int32", "Int64"] {
            declare(store, &mut names, name, vec![number], 0);
        }
        for name in ["UInt", "UInt8", "UInt16", "UInt32", "UInt64"] {
            declare(store, &mut names, name, vec![number], 0);
        }
        let float = declare(store, &mut names, "Float", vec![number], 0);
        let double = declare(store, &mut names, "Double", vec![number], 0);
        declare(store, &mut names, "Float80", vec![number], 0);
        let bool_ = declare(store, &mut names, "Bool", vec![any], 0);
        let string = declare(store, &mut names, "String", vec![any], 0);
        let void = declare(store, &mut names, "Void", vec![any], 0);
        let array = declare(store, &mut names, "Array", vec![any], 1);
        let map = declare(store, &mut names, "Map", vec![any], 2);
        let tuple = declare(store, &mut names, "Tuple", vec![any], u8::MAX);
        let function = declare(store, &mut names, "Function", vec![any], u8::MAX);
        let optional = declare(store, &mut names, "Optional", vec![any], 1);
        let unwrapped_optional = declare(store, &mut names, "UnwrappedOptional", vec![any], 1);
        let pointer = declare(store, &mut names, "Pointer", vec![any], 1);
        let _ = float;

        Builtins {
            scope,
            names,
            any,
            number,
            int,
            bool_,
            string,
            void,
            double,
            array,
            map,
            tuple,
            function,
            optional,
            unwrapped_optional,
            pointer,
        }
    }

    /// Resolve a builtin by name.
    pub fn resolve(&self, name: &str) -> Option<SymbolId> {
        self.names.get(name).copied()
    }

    /// True for the optional wrappers (`T?`, `T!`).
    pub fn is_optional_wrapper(&self, symbol: SymbolId) -> bool {
        symbol == self.optional || symbol == self.unwrapped_optional
    }

    /// Family and bit width of a numeric builtin, or `None`.
    pub fn numeric_info(&self, store: &AstStore, symbol: SymbolId) -> Option<(NumericFamily, u32)> {
        if !matches!(
            store.symbols[symbol].kind,
            SymbolKind::BuiltinType { .. }
        ) {
            return None;
        }
        let info = match store.symbols[symbol].name.text.as_str() {
            "Int8" => (NumericFamily::Signed, 8),
            "Int16" => (NumericFamily::Signed, 16),
            "Int32" => (NumericFamily::Signed, 32),
            "Int64" | "Int" => (NumericFamily::Signed, 64),
            "UInt8" => (NumericFamily::Unsigned, 8),
            "UInt16" => (NumericFamily::Unsigned, 16),
            "UInt32" => (NumericFamily::Unsigned, 32),
            "UInt64" | "UInt" => (NumericFamily::Unsigned, 64),
            "Float" => (NumericFamily::Float, 32),
            "Double" => (NumericFamily::Float, 64),
            "Float80" => (NumericFamily::Float, 80),
            _ => return None,
        };
        Some(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_builtin_names_resolve() {
        let mut store = AstStore::new();
        let builtins = Builtins::install(&mut store);
        for name in [
            "Any",
            "Number",
            "Int",
            "Int8",
            "Int16",
            "Int32",
            "Int64",
            "UInt",
            "UInt8",
            "UInt16",
            "UInt32",
            "UInt64",
            "Float",
            "Double",
            "Float80",
            "Bool",
            "String",
            "Void",
            "Array",
            "Map",
            "Tuple",
            "Function",
            "Optional",
            "UnwrappedOptional",
            "Pointer",
        ] {
            assert!(builtins.resolve(name).is_some(), "{} missing", name);
        }
        assert!(builtins.resolve("NotAType").is_none());
    }

    #[test]
    fn test_parent_relationships() {
        let mut store = AstStore::new();
        let builtins = Builtins::install(&mut store);

        let parents = |sym: SymbolId| -> Vec<SymbolId> {
            match &store.symbols[sym].kind {
                SymbolKind::BuiltinType { parent_types, .. } => parent_types
                    .iter()
                    .filter_map(|&r| store.type_refs[r].actual_type)
                    .collect(),
                _ => panic!("not a builtin"),
            }
        };

        assert_eq!(parents(builtins.int), vec![builtins.number]);
        assert_eq!(parents(builtins.number), vec![builtins.any]);
        assert_eq!(parents(builtins.bool_), vec![builtins.any]);
        assert_eq!(parents(builtins.string), vec![builtins.any]);
        assert_eq!(parents(builtins.void), vec![builtins.any]);
        assert!(parents(builtins.any).is_empty());
    }

    #[test]
    fn test_numeric_info() {
        let mut store = AstStore::new();
        let builtins = Builtins::install(&mut store);
        assert_eq!(
            builtins.numeric_info(&store, builtins.int),
            Some((NumericFamily::Signed, 64))
        );
        assert_eq!(
            builtins.numeric_info(&store, builtins.double),
            Some((NumericFamily::Float, 64))
        );
        assert_eq!(builtins.numeric_info(&store, builtins.string), None);
    }
}
