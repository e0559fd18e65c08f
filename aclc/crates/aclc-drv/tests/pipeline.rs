//! End-to-end pipeline tests over real module files.

use aclc_par::{ResolutionStage, SymbolKind};
use aclc_sem::{CompilerContext, CompilerOptions};
use aclc_util::diagnostic::ErrorCode;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_module(dir: &Path, name: &str, source: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, source).unwrap();
    path
}

fn compile_root(ctx: &mut CompilerContext, path: &Path) {
    let source = fs::read_to_string(path).unwrap();
    ctx.compile_module(path, &source, false, ResolutionStage::Resolved);
}

#[test]
fn test_import_compiles_dependency_once() {
    // S3: `import .b` from a.accele compiles b.accele; the module table
    // grows by one and the import's referent is b's global scope.
    let dir = TempDir::new().unwrap();
    write_module(dir.path(), "b.accele", "fun helper() -> Int = 1\n");
    let a = write_module(dir.path(), "a.accele", "import .b\n\nfun main() -> Int = 2\n");

    let mut ctx = CompilerContext::new(CompilerOptions::default());
    compile_root(&mut ctx, &a);

    assert!(!ctx.has_errors(), "{:?}", ctx.diagnostics());
    assert_eq!(ctx.modules.len(), 2);

    let a_id = ctx.module_for_path(&a).unwrap();
    let b_id = ctx.module_for_path(&dir.path().join("b.accele")).unwrap();
    let imports = &ctx.store.scopes[ctx.modules[a_id].global_scope].imports;
    assert_eq!(imports.len(), 1);
    match &ctx.store.symbols[imports[0]].kind {
        SymbolKind::Import {
            referent,
            referent_module,
            ..
        } => {
            assert_eq!(*referent, Some(ctx.modules[b_id].global_scope));
            assert_eq!(*referent_module, Some(b_id));
        }
        other => panic!("expected import, got {:?}", other),
    }
    // The dependency was discovered at INTERNAL_ALL and then completed once
    // the importing module entered its external stages.
    assert_eq!(ctx.modules[b_id].stage, ResolutionStage::Resolved);
    assert_eq!(ctx.modules[a_id].stage, ResolutionStage::Resolved);
}

#[test]
fn test_dependency_external_types_resolve() {
    // A dependency whose declarations use types from its own import still
    // binds them: resolving the import completes the dependency's stages.
    let dir = TempDir::new().unwrap();
    write_module(
        dir.path(),
        "c.accele",
        "class Thing {\n    public construct() { }\n}\n",
    );
    write_module(
        dir.path(),
        "b.accele",
        "import .c\n\nfun get() -> c.Thing = Thing()\n",
    );
    let a = write_module(
        dir.path(),
        "a.accele",
        "import .b\n\nfun main() {\n    get()\n}\n",
    );

    let mut ctx = CompilerContext::new(CompilerOptions::default());
    compile_root(&mut ctx, &a);
    assert!(!ctx.has_errors(), "{:?}", ctx.diagnostics());

    let b_id = ctx.module_for_path(&dir.path().join("b.accele")).unwrap();
    let c_id = ctx.module_for_path(&dir.path().join("c.accele")).unwrap();
    assert_eq!(ctx.modules[b_id].stage, ResolutionStage::Resolved);
    assert_eq!(ctx.modules[c_id].stage, ResolutionStage::Resolved);

    // get's declared return type is bound to c's Thing.
    let b_scope = ctx.modules[b_id].global_scope;
    let get = ctx.store.scopes[b_scope]
        .symbols
        .iter()
        .copied()
        .find(|&s| ctx.store.symbols[s].name.text == "get")
        .expect("get declared");
    match &ctx.store.symbols[get].kind {
        SymbolKind::Function {
            actual_return_type: Some(ret),
            ..
        } => {
            let thing = ctx.store.type_refs[*ret]
                .actual_type
                .expect("return type bound");
            assert_eq!(ctx.store.symbols[thing].name.text, "Thing");
        }
        other => panic!("get unresolved: {:?}", other),
    }
}

#[test]
fn test_import_cycle_terminates() {
    // Mutually importing modules complete without spinning; the resolving
    // flag breaks the re-entry loop.
    let dir = TempDir::new().unwrap();
    write_module(dir.path(), "x.accele", "import .y\n\nfun fx() -> Int = 1\n");
    write_module(dir.path(), "y.accele", "import .x\n\nfun fy() -> Int = 2\n");
    let x = dir.path().join("x.accele");

    let mut ctx = CompilerContext::new(CompilerOptions::default());
    compile_root(&mut ctx, &x);

    assert!(!ctx.has_errors(), "{:?}", ctx.diagnostics());
    assert_eq!(ctx.modules.len(), 2);
    for (_, module) in ctx.modules.iter_enumerated() {
        assert_eq!(module.stage, ResolutionStage::Resolved);
        assert!(!module.resolving);
    }
}

#[test]
fn test_shared_dependency_compiles_at_most_once() {
    let dir = TempDir::new().unwrap();
    write_module(dir.path(), "common.accele", "fun shared() -> Int = 1\n");
    let a = write_module(dir.path(), "a.accele", "import .common\n");
    let b = write_module(dir.path(), "b.accele", "import .common\n");

    let mut ctx = CompilerContext::new(CompilerOptions::default());
    compile_root(&mut ctx, &a);
    compile_root(&mut ctx, &b);

    assert!(!ctx.has_errors(), "{:?}", ctx.diagnostics());
    // a, b, and exactly one copy of common.
    assert_eq!(ctx.modules.len(), 3);
}

#[test]
fn test_cross_module_visibility() {
    // S4 shape: an internal class is not visible to the importing module,
    // but its public member produces no further diagnostic.
    let dir = TempDir::new().unwrap();
    write_module(
        dir.path(),
        "lib.accele",
        "internal class C {\n    public static var x: Int = 0\n}\n",
    );
    let main = write_module(
        dir.path(),
        "main.accele",
        "import .lib\n\nfun main() -> Int {\n    return lib.C.x\n}\n",
    );

    let mut ctx = CompilerContext::new(CompilerOptions::default());
    compile_root(&mut ctx, &main);

    let diags = ctx.diagnostics();
    let not_visible: Vec<_> = diags
        .iter()
        .filter(|d| d.code == ErrorCode::SymbolNotVisible)
        .collect();
    assert_eq!(not_visible.len(), 1, "{:?}", diags);
    // Exactly the one visibility error; nothing for `x`.
    assert_eq!(
        diags
            .iter()
            .filter(|d| d.code != ErrorCode::SymbolNotVisible)
            .count(),
        0,
        "{:?}",
        diags
    );
}

#[test]
fn test_cross_module_function_call_resolves() {
    let dir = TempDir::new().unwrap();
    write_module(
        dir.path(),
        "mathlib.accele",
        "fun double(x: Int) -> Int = x * 2\n",
    );
    let main = write_module(
        dir.path(),
        "main.accele",
        "import .mathlib\n\nfun main() -> Int {\n    return double(21)\n}\n",
    );

    let mut ctx = CompilerContext::new(CompilerOptions::default());
    compile_root(&mut ctx, &main);
    assert!(!ctx.has_errors(), "{:?}", ctx.diagnostics());
}

#[test]
fn test_from_import_targets_bind() {
    let dir = TempDir::new().unwrap();
    write_module(
        dir.path(),
        "shapes.accele",
        "class Circle {\n    public construct() { }\n}\nfun area() -> Double = 0.0\n",
    );
    let main = write_module(
        dir.path(),
        "main.accele",
        "import { Circle, area } from .shapes\n\nfun main() {\n    Circle()\n    area()\n}\n",
    );

    let mut ctx = CompilerContext::new(CompilerOptions::default());
    compile_root(&mut ctx, &main);
    assert!(!ctx.has_errors(), "{:?}", ctx.diagnostics());

    let main_id = ctx.module_for_path(&main).unwrap();
    let imports = &ctx.store.scopes[ctx.modules[main_id].global_scope].imports;
    match &ctx.store.symbols[imports[0]].kind {
        SymbolKind::Import { targets, .. } => {
            assert_eq!(targets.len(), 2);
            assert!(!targets[0].referents.is_empty());
            assert!(!targets[1].referents.is_empty());
        }
        other => panic!("expected import, got {:?}", other),
    }
}

#[test]
fn test_unknown_from_import_target_diagnosed() {
    let dir = TempDir::new().unwrap();
    write_module(dir.path(), "lib.accele", "fun real() -> Int = 1\n");
    let main = write_module(
        dir.path(),
        "main.accele",
        "import { imaginary } from .lib\n",
    );

    let mut ctx = CompilerContext::new(CompilerOptions::default());
    compile_root(&mut ctx, &main);
    assert!(ctx
        .diagnostics()
        .iter()
        .any(|d| d.code == ErrorCode::UnresolvedSymbol));
}

#[test]
fn test_unresolved_import_diagnosed() {
    let dir = TempDir::new().unwrap();
    let main = write_module(dir.path(), "main.accele", "import .missing\n");

    let mut ctx = CompilerContext::new(CompilerOptions::default());
    compile_root(&mut ctx, &main);
    assert!(ctx
        .diagnostics()
        .iter()
        .any(|d| d.code == ErrorCode::UnresolvedImport));
    assert!(ctx.has_errors());
}

#[test]
fn test_duplicate_import_diagnosed() {
    let dir = TempDir::new().unwrap();
    write_module(dir.path(), "dep.accele", "fun f() -> Int = 1\n");
    let main = write_module(
        dir.path(),
        "main.accele",
        "import .dep\nimport .dep as again\n",
    );

    let mut ctx = CompilerContext::new(CompilerOptions::default());
    compile_root(&mut ctx, &main);
    assert!(ctx
        .diagnostics()
        .iter()
        .any(|d| d.code == ErrorCode::DuplicateImport));
}

#[test]
fn test_duplicate_import_in_dependency_diagnosed() {
    // Duplicate imports are caught when a module is parsed, so they fire
    // even in modules only ever compiled as dependencies.
    let dir = TempDir::new().unwrap();
    write_module(dir.path(), "c.accele", "fun fc() -> Int = 1\n");
    write_module(
        dir.path(),
        "b.accele",
        "import .c\nimport .c as again\n",
    );
    let a = write_module(dir.path(), "a.accele", "import .b\n");

    let mut ctx = CompilerContext::new(CompilerOptions::default());
    compile_root(&mut ctx, &a);
    assert!(ctx
        .diagnostics()
        .iter()
        .any(|d| d.code == ErrorCode::DuplicateImport));
}

#[test]
fn test_import_directories_searched_in_order() {
    let dir = TempDir::new().unwrap();
    let libs = dir.path().join("libs");
    write_module(&libs, "vendored.accele", "fun vend() -> Int = 1\n");
    let main = write_module(
        dir.path(),
        "main.accele",
        "import vendored\n\nfun main() -> Int = vend()\n",
    );

    let mut ctx = CompilerContext::new(CompilerOptions {
        import_dirs: vec![libs],
        ..CompilerOptions::default()
    });
    compile_root(&mut ctx, &main);
    assert!(!ctx.has_errors(), "{:?}", ctx.diagnostics());
    assert_eq!(ctx.modules.len(), 2);
}

#[test]
fn test_parent_relative_import() {
    let dir = TempDir::new().unwrap();
    write_module(dir.path(), "util.accele", "fun u() -> Int = 1\n");
    let nested = write_module(
        &dir.path().join("nested"),
        "main.accele",
        "import ..util\n\nfun main() -> Int = u()\n",
    );

    let mut ctx = CompilerContext::new(CompilerOptions::default());
    compile_root(&mut ctx, &nested);
    assert!(!ctx.has_errors(), "{:?}", ctx.diagnostics());
}

#[test]
fn test_acldef_header_modules() {
    let dir = TempDir::new().unwrap();
    write_module(
        dir.path(),
        "header.acldef",
        "fun external_thing() -> Int\n",
    );
    let main = write_module(
        dir.path(),
        "main.accele",
        "import .header\n\nfun main() -> Int = external_thing()\n",
    );

    let mut ctx = CompilerContext::new(CompilerOptions::default());
    compile_root(&mut ctx, &main);
    assert!(!ctx.has_errors(), "{:?}", ctx.diagnostics());

    let header = ctx
        .module_for_path(&dir.path().join("header.acldef"))
        .unwrap();
    assert!(ctx.modules[header].header_only);
}

#[test]
fn test_string_literal_import_path() {
    let dir = TempDir::new().unwrap();
    write_module(dir.path(), "lit.accele", "fun lit() -> Int = 1\n");
    let main = write_module(
        dir.path(),
        "main.accele",
        "import 'lit.accele'\n\nfun main() -> Int = lit()\n",
    );

    let mut ctx = CompilerContext::new(CompilerOptions::default());
    compile_root(&mut ctx, &main);
    assert!(!ctx.has_errors(), "{:?}", ctx.diagnostics());
}
