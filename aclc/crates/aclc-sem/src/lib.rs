//! aclc-sem - Semantic analysis for Accele modules.
//!
//! This crate carries everything between the parser and code emission:
//!
//! - [`context`] - the [`CompilerContext`]: options, warning toggles, the
//!   module table, the shared AST arena, diagnostics, and builtins.
//! - [`builtins`] - the invariant-type registry (`Any`, `Int`, `Optional`,
//!   ...), always resolvable unless a module opts out with `@nobuiltins`.
//! - [`types`] - the type lattice: matching, casting, match scoring, and
//!   minimal common types.
//! - [`lookup`] - symbol search with origins and candidate validation
//!   (visibility, staticness, generics arity and bounds).
//! - [`imports`] - the import handler: locating dependency modules on disk
//!   and compiling them on demand, at most once each.
//! - [`resolver`] - the multi-stage [`Resolver`] driving it all to the
//!   RESOLVED fixed point.

pub mod builtins;
pub mod context;
pub mod imports;
pub mod lookup;
pub mod resolver;
pub mod tyref;
pub mod types;

pub use builtins::Builtins;
pub use context::{CompilerContext, CompilerOptions, Module, ModuleInfo};
pub use lookup::{AccessKind, SearchCriteria, SearchTarget};
pub use resolver::{ResolveSignal, Resolver};

#[cfg(test)]
mod tests {
    use super::*;
    use aclc_par::{ExprKind, Item, ResolutionStage, SymbolId, SymbolKind, TypeRefId};
    use aclc_util::diagnostic::ErrorCode;
    use std::path::Path;

    fn compile(source: &str) -> (CompilerContext, aclc_util::span::ModuleId) {
        let mut ctx = CompilerContext::new(CompilerOptions::default());
        let id = ctx.compile_module(
            Path::new("test.accele"),
            source,
            false,
            ResolutionStage::Resolved,
        );
        (ctx, id)
    }

    fn global_symbol_named(
        ctx: &CompilerContext,
        module: aclc_util::span::ModuleId,
        name: &str,
    ) -> SymbolId {
        let global = ctx.modules[module].global_scope;
        for &s in &ctx.store.scopes[global].symbols {
            if ctx.store.symbols[s].name.text == name {
                return s;
            }
        }
        panic!("no global symbol named {}", name);
    }

    fn function_return_name(ctx: &CompilerContext, symbol: SymbolId) -> String {
        match &ctx.store.symbols[symbol].kind {
            SymbolKind::Function {
                actual_return_type: Some(ret),
                ..
            } => {
                let actual = types::actual_type_of(&ctx.store, *ret).expect("bound return");
                ctx.store.symbols[actual].name.text.clone()
            }
            other => panic!("function has no resolved return type: {:?}", other),
        }
    }

    #[test]
    fn test_module_reaches_resolved_stage() {
        let (ctx, id) = compile("fun main() -> Void { }\n");
        assert_eq!(ctx.modules[id].stage, ResolutionStage::Resolved);
        assert!(!ctx.has_errors(), "{:?}", ctx.diagnostics());
    }

    #[test]
    fn test_variable_type_inference_from_initializer() {
        let (ctx, id) = compile("var count = 42\nvar name = 'x'\nvar half = 1.5\n");
        assert!(!ctx.has_errors(), "{:?}", ctx.diagnostics());

        let expect = |name: &str, type_name: &str| {
            let symbol = global_symbol_named(&ctx, id, name);
            match &ctx.store.symbols[symbol].kind {
                SymbolKind::Variable {
                    actual_type: Some(ty),
                    ..
                } => {
                    let actual = types::actual_type_of(&ctx.store, *ty).unwrap();
                    assert_eq!(ctx.store.symbols[actual].name.text, type_name);
                }
                other => panic!("{} not resolved: {:?}", name, other),
            }
        };
        expect("count", "Int");
        expect("name", "String");
        expect("half", "Double");
    }

    #[test]
    fn test_declared_types_bind_to_builtins() {
        let (ctx, id) = compile("var xs: Int[] = [1, 2]\n");
        assert!(!ctx.has_errors(), "{:?}", ctx.diagnostics());
        let symbol = global_symbol_named(&ctx, id, "xs");
        match &ctx.store.symbols[symbol].kind {
            SymbolKind::Variable {
                actual_type: Some(ty),
                ..
            } => {
                assert_eq!(
                    types::actual_type_of(&ctx.store, *ty),
                    Some(ctx.builtins.array)
                );
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_overload_resolution_prefers_exact_match() {
        // S5: `f(1)` resolves to the Int overload ahead of Double.
        let source = "\
fun f(x: Int) -> Int = x
fun f(x: Double) -> Double = x
fun main() {
    f(1)
}
";
        let (ctx, id) = compile(source);
        assert!(!ctx.has_errors(), "{:?}", ctx.diagnostics());

        let int_overload = {
            let global = ctx.modules[id].global_scope;
            ctx.store.scopes[global]
                .symbols
                .iter()
                .copied()
                .find(|&s| {
                    if ctx.store.symbols[s].name.text != "f" {
                        return false;
                    }
                    match &ctx.store.symbols[s].kind {
                        SymbolKind::Function { parameters, .. } => {
                            let p = parameters[0];
                            match &ctx.store.symbols[p].kind {
                                SymbolKind::Parameter {
                                    actual_type: Some(ty),
                                    ..
                                } => {
                                    types::actual_type_of(&ctx.store, *ty)
                                        == Some(ctx.builtins.int)
                                }
                                _ => false,
                            }
                        }
                        _ => false,
                    }
                })
                .expect("Int overload")
        };

        // Find the call expression's selected referent.
        let mut found = false;
        for expr in ctx.store.exprs.iter() {
            if let ExprKind::Identifier {
                name,
                referent: Some(referent),
                possible_referents,
                ..
            } = &expr.kind
            {
                if name.text == "f" && !possible_referents.is_empty() {
                    assert_eq!(*referent, int_overload);
                    found = true;
                }
            }
        }
        assert!(found, "no resolved call site for f");
    }

    #[test]
    fn test_mutually_recursive_return_inference_terminates() {
        // S6: both functions end with an inferred, synthesized-generic
        // return type and no diagnostics.
        let source = "\
fun a() { return b() }
fun b() { return a() }
";
        let (ctx, id) = compile(source);
        assert!(!ctx.has_errors(), "{:?}", ctx.diagnostics());

        for name in ["a", "b"] {
            let symbol = global_symbol_named(&ctx, id, name);
            match &ctx.store.symbols[symbol].kind {
                SymbolKind::Function {
                    actual_return_type: Some(ret),
                    ..
                } => {
                    let actual = types::actual_type_of(&ctx.store, *ret).unwrap();
                    assert!(
                        matches!(
                            ctx.store.symbols[actual].kind,
                            SymbolKind::GenericType { .. }
                        ),
                        "{} should infer a synthetic generic, got {}",
                        name,
                        ctx.store.symbols[actual].name.text
                    );
                }
                other => panic!("{} unresolved: {:?}", name, other),
            }
        }
    }

    #[test]
    fn test_resolution_fixed_point() {
        let source = "\
class Point {
    public var x: Int = 0
    public construct(x: Int) {
        self.x = x
    }
    public fun shifted(by: Int) -> Point = Point(x + by)
}

fun main() -> Int {
    var p = Point(3)
    return p.shifted(2).x
}
";
        let (ctx, _) = compile(source);
        assert!(!ctx.has_errors(), "{:?}", ctx.diagnostics());

        // Every expression that is not a bare type/namespace reference has
        // a bound value type.
        for expr in ctx.store.exprs.iter() {
            if let ExprKind::Identifier {
                referent: Some(referent),
                ..
            } = &expr.kind
            {
                let kind = &ctx.store.symbols[*referent].kind;
                if kind.is_type()
                    || matches!(
                        kind,
                        SymbolKind::Namespace { .. }
                            | SymbolKind::Import { .. }
                            | SymbolKind::GlobalScope { .. }
                    )
                {
                    continue;
                }
            }
            assert!(
                expr.value_type.is_some(),
                "unbound expression: {:?}",
                expr.kind
            );
        }
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let source = "fun f(x: Int) -> Int = x + 1\n";
        let (mut ctx, id) = compile(source);
        assert!(!ctx.has_errors());
        let diagnostics_before = ctx.handler.count();
        let exprs_before = ctx.store.exprs.len();
        let refs_before = ctx.store.type_refs.len();

        Resolver::new(&mut ctx, id, ResolutionStage::Resolved).resolve();

        assert_eq!(ctx.handler.count(), diagnostics_before);
        assert_eq!(ctx.store.exprs.len(), exprs_before);
        assert_eq!(ctx.store.type_refs.len(), refs_before);
        assert_eq!(ctx.modules[id].stage, ResolutionStage::Resolved);
    }

    #[test]
    fn test_undefined_symbol_diagnosed() {
        let (ctx, _) = compile("fun main() {\n    missing()\n}\n");
        assert!(ctx
            .diagnostics()
            .iter()
            .any(|d| d.code == ErrorCode::UnresolvedSymbol));
    }

    #[test]
    fn test_private_member_not_visible_outside() {
        let source = "\
class C {
    private var secret: Int = 1
}
fun main() -> Int {
    var c = C()
    return c.secret
}
";
        let (ctx, _) = compile(source);
        // The class has no constructor, so C() itself fails too; the
        // visibility check must fire for the member access as well when the
        // lookup path still resolves.
        let source_with_ctor = "\
class C {
    private var secret: Int = 1
    public construct() { }
}
fun main() -> Int {
    var c = C()
    return c.secret
}
";
        let (ctx2, _) = compile(source_with_ctor);
        let _ = ctx;
        assert!(
            ctx2.diagnostics()
                .iter()
                .any(|d| d.code == ErrorCode::SymbolNotVisible),
            "{:?}",
            ctx2.diagnostics()
        );
    }

    #[test]
    fn test_static_access_via_instance_warns() {
        let source = "\
class C {
    public static var shared: Int = 1
    public construct() { }
}
fun main() -> Int {
    var c = C()
    return c.shared
}
";
        let (ctx, _) = compile(source);
        assert!(
            ctx.diagnostics()
                .iter()
                .any(|d| d.code == ErrorCode::StaticAccessViaInstance),
            "{:?}",
            ctx.diagnostics()
        );
        assert!(!ctx.has_errors(), "warning must not fail the build");
    }

    #[test]
    fn test_instance_access_via_static_errors() {
        let source = "\
class C {
    public var field: Int = 1
}
fun main() -> Int {
    return C.field
}
";
        let (ctx, _) = compile(source);
        assert!(
            ctx.diagnostics()
                .iter()
                .any(|d| d.code == ErrorCode::InstanceAccessViaStatic),
            "{:?}",
            ctx.diagnostics()
        );
    }

    #[test]
    fn test_alias_unfolds_for_construction() {
        let source = "\
class Impl {
    public construct() { }
}
alias Handle = Impl
fun main() {
    Handle()
}
";
        let (ctx, _) = compile(source);
        assert!(!ctx.has_errors(), "{:?}", ctx.diagnostics());
    }

    #[test]
    fn test_template_constructor_rejected() {
        let source = "\
template Greeter {
    fun greet() -> String = 'hi'
}
fun main() {
    Greeter()
}
";
        let (ctx, _) = compile(source);
        assert!(ctx
            .diagnostics()
            .iter()
            .any(|d| d.code == ErrorCode::TemplateConstructor));
    }

    #[test]
    fn test_nobuiltins_disables_invariant_types() {
        let (ctx, _) = compile("@nobuiltins\nvar x: Int = 1\n");
        assert!(
            ctx.diagnostics()
                .iter()
                .any(|d| d.code == ErrorCode::UnresolvedSymbol),
            "{:?}",
            ctx.diagnostics()
        );
    }

    #[test]
    fn test_inferred_return_from_body() {
        let (ctx, id) = compile("fun one() { return 1 }\n");
        assert!(!ctx.has_errors(), "{:?}", ctx.diagnostics());
        let f = global_symbol_named(&ctx, id, "one");
        assert_eq!(function_return_name(&ctx, f), "Int");
    }

    #[test]
    fn test_mixed_numeric_returns_fold_to_common_ancestor() {
        let source = "\
fun pick(flag: Bool) {
    if flag {
        return 1
    }
    return 2.5
}
";
        let (ctx, id) = compile(source);
        assert!(!ctx.has_errors(), "{:?}", ctx.diagnostics());
        let f = global_symbol_named(&ctx, id, "pick");
        assert_eq!(function_return_name(&ctx, f), "Number");
    }

    #[test]
    fn test_return_against_declared_type_checked() {
        let (ctx, _) = compile("fun f() -> Int {\n    return 'nope'\n}\n");
        assert!(ctx
            .diagnostics()
            .iter()
            .any(|d| d.code == ErrorCode::InvalidReturnStatement));
    }

    #[test]
    fn test_void_and_value_returns_conflict() {
        let source = "\
fun f(flag: Bool) {
    if flag {
        return
    }
    return 1
}
";
        let (ctx, _) = compile(source);
        assert!(ctx
            .diagnostics()
            .iter()
            .any(|d| d.code == ErrorCode::InvalidReturnStatement));
    }

    #[test]
    fn test_nil_coalescing_requires_optional_left() {
        let (ctx, _) = compile("fun f(x: Int) -> Int = x ?? 1\n");
        assert!(ctx
            .diagnostics()
            .iter()
            .any(|d| d.code == ErrorCode::ArgumentTypeMismatch));

        let (ok_ctx, _) = compile("fun f(x: Int?) -> Int = x ?? 1\n");
        assert!(!ok_ctx.has_errors(), "{:?}", ok_ctx.diagnostics());
    }

    #[test]
    fn test_variadic_parameter_must_be_final() {
        let (ctx, _) = compile("fun f(xs: Int..., y: Int) { }\n");
        assert!(ctx
            .diagnostics()
            .iter()
            .any(|d| d.code == ErrorCode::NonfinalVariadicParameter));
    }

    #[test]
    fn test_variadic_call_accepts_extra_arguments() {
        let source = "\
fun sum(xs: Int...) -> Int = 0
fun main() {
    sum(1, 2, 3)
    sum()
}
";
        let (ctx, _) = compile(source);
        assert!(!ctx.has_errors(), "{:?}", ctx.diagnostics());
    }

    #[test]
    fn test_lambda_type_is_function() {
        let source = "fun main() {\n    var f = (a: Int) => a + 1\n}\n";
        let (ctx, _) = compile(source);
        assert!(!ctx.has_errors(), "{:?}", ctx.diagnostics());
        let lambda_type: Vec<Option<TypeRefId>> = ctx
            .store
            .exprs
            .iter()
            .filter(|e| matches!(e.kind, ExprKind::Lambda { .. }))
            .map(|e| e.value_type)
            .collect();
        assert_eq!(lambda_type.len(), 1);
        let ty = lambda_type[0].expect("lambda typed");
        assert_eq!(
            types::actual_type_of(&ctx.store, ty),
            Some(ctx.builtins.function)
        );
    }

    #[test]
    fn test_global_items_include_sourcelock() {
        let (ctx, id) = compile("@srclock\nvar x = 1\n");
        assert!(!ctx.has_errors());
        let global = ctx.modules[id].global_symbol;
        match &ctx.store.symbols[global].kind {
            SymbolKind::GlobalScope { content } => {
                assert!(matches!(content[0], Item::SourceLock(_)));
            }
            _ => panic!("global scope missing"),
        }
    }
}
