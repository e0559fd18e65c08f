//! Import resolution: locating dependency modules on disk and compiling
//! them on demand.
//!
//! Source resolution order for a dotted import path:
//!
//! 1. A string-literal source is an explicit filesystem path.
//! 2. Otherwise the candidate base directories are: the importing module's
//!    directory; then, for non-relative paths, each `-I` directory and
//!    finally the global import directory.
//! 3. The parent-climb prefix and identifier segments are applied to each
//!    base, and `<tail>.accele` is probed before `<tail>.acldef`.
//!
//! A module is compiled at most once, keyed by canonical path. A dependency
//! discovered by an import is first compiled up to the INTERNAL_ALL stage;
//! once the importing module enters its external stages and the import is
//! bound, the dependency's resolver is re-entered and driven the rest of the
//! way to RESOLVED, so type references the dependency takes from its own
//! imports are bound (or diagnosed) as well. Import cycles terminate through
//! the per-module `resolving` flag: completing a dependency that leads back
//! to a module already mid-resolution is a no-op there.

use crate::context::CompilerContext;
use crate::resolver::Resolver;
use aclc_par::{ImportSource, ResolutionStage, SymbolId, SymbolKind};
use aclc_util::diagnostic::ErrorCode;
use aclc_util::span::{ModuleId, SourceMeta};
use std::path::{Path, PathBuf};

/// Resolve every import of `module`, compiling dependencies as needed.
pub fn resolve_imports(ctx: &mut CompilerContext, module: ModuleId) {
    let imports = ctx.store.scopes[ctx.modules[module].global_scope]
        .imports
        .clone();
    for import in imports {
        // Errors are reported per import; the rest still resolve.
        let _ = resolve_import(ctx, module, import);
    }
}

fn resolve_import(
    ctx: &mut CompilerContext,
    module: ModuleId,
    import: SymbolId,
) -> Result<(), ()> {
    let (source, meta) = match &ctx.store.symbols[import].kind {
        SymbolKind::Import {
            referent: Some(_), ..
        } => return Ok(()),
        SymbolKind::Import { source, .. } => (source.clone(), ctx.store.symbols[import].meta),
        _ => return Ok(()),
    };

    let target = resolve_import_source(ctx, module, &source, meta)?;
    let target_scope = ctx.modules[target].global_scope;

    // A module may be imported only once per importing module.
    let global = ctx.modules[module].global_scope;
    for &other in &ctx.store.scopes[global].imports {
        if other == import {
            continue;
        }
        if let SymbolKind::Import {
            referent: Some(scope),
            ..
        } = &ctx.store.symbols[other].kind
        {
            if *scope == target_scope {
                ctx.handler.report(
                    ErrorCode::DuplicateImport,
                    meta,
                    ctx.store.symbols[import].name.highlight_len(),
                    "the target of this import has already been imported".to_string(),
                );
                return Err(());
            }
        }
    }

    if let SymbolKind::Import {
        referent,
        referent_module,
        ..
    } = &mut ctx.store.symbols[import].kind
    {
        *referent = Some(target_scope);
        *referent_module = Some(target);
    }

    resolve_import_targets(ctx, import, target_scope);

    // Discovery compiled the dependency up to INTERNAL_ALL; now that an
    // importing module consumes it, complete its resolution so the type
    // references it takes from its own imports bind (or are diagnosed).
    if ctx.modules[target].stage < ResolutionStage::Resolved {
        Resolver::new(ctx, target, ResolutionStage::Resolved).resolve();
    }
    Ok(())
}

/// Bind each named target of a from-import to symbols in the imported
/// module's global scope, enforcing visibility.
fn resolve_import_targets(
    ctx: &mut CompilerContext,
    import: SymbolId,
    target_scope: aclc_par::ScopeId,
) {
    let targets = match &ctx.store.symbols[import].kind {
        SymbolKind::Import { targets, .. } => targets.clone(),
        _ => return,
    };
    if targets.is_empty() {
        return;
    }

    let exported: Vec<SymbolId> = ctx.store.scopes[target_scope].symbols.clone();
    let mut claimed: Vec<SymbolId> = Vec::new();
    let mut resolved = targets.clone();

    for target in resolved.iter_mut() {
        for &symbol in &exported {
            if ctx.store.symbols[symbol].name.text != target.name.text {
                continue;
            }
            // Internal and private symbols cannot be imported.
            let visibility = ctx.store.symbols[symbol].visibility_modifier();
            if matches!(
                visibility,
                Some(aclc_lex::TokenKind::Internal) | Some(aclc_lex::TokenKind::Private)
            ) {
                ctx.handler.report(
                    ErrorCode::UnresolvedSymbol,
                    target.name.meta,
                    target.name.highlight_len(),
                    format!("`{}` is not visible to importing modules", target.name.text),
                );
                continue;
            }
            if claimed.contains(&symbol) {
                ctx.handler.report(
                    ErrorCode::DuplicateSymbol,
                    target.name.meta,
                    target.name.highlight_len(),
                    format!("`{}` is imported more than once", target.name.text),
                );
                continue;
            }
            claimed.push(symbol);
            target.referents.push(symbol);
        }

        if target.referents.is_empty() {
            ctx.handler.report(
                ErrorCode::UnresolvedSymbol,
                target.name.meta,
                target.name.highlight_len(),
                format!(
                    "no importable symbol named `{}` in the imported module",
                    target.name.text
                ),
            );
        }
    }

    if let SymbolKind::Import { targets, .. } = &mut ctx.store.symbols[import].kind {
        *targets = resolved;
    }
}

fn resolve_import_source(
    ctx: &mut CompilerContext,
    module: ModuleId,
    source: &ImportSource,
    meta: SourceMeta,
) -> Result<ModuleId, ()> {
    if let Some(literal) = &source.string_literal {
        let mut path = PathBuf::from(&literal.text);
        if path.is_relative() {
            path = ctx.modules[module].info.dir.join(path);
        }
        return resolve_import_path(ctx, &path, meta);
    }

    let mut base_dirs = vec![ctx.modules[module].info.dir.clone()];
    if !source.relative {
        base_dirs.extend(ctx.options.import_dirs.iter().cloned());
        if let Some(global) = &ctx.options.global_import_dir {
            base_dirs.push(global.clone());
        }
    }

    for base in base_dirs {
        let mut dir = base;
        for _ in 0..source.parent_climbs {
            if let Some(parent) = dir.parent() {
                dir = parent.to_path_buf();
            }
        }
        for segment in &source.segments[..source.segments.len().saturating_sub(1)] {
            dir.push(&segment.text);
        }
        let stem = match source.segments.last() {
            Some(segment) => segment.text.clone(),
            None => continue,
        };

        for extension in ["accele", "acldef"] {
            let candidate = dir.join(format!("{}.{}", stem, extension));
            if candidate.is_file() {
                return resolve_import_path(ctx, &candidate, meta);
            }
        }
    }

    ctx.handler.report(
        ErrorCode::UnresolvedImport,
        meta,
        1,
        "unresolved import: no matching module on the search path".to_string(),
    );
    Err(())
}

fn resolve_import_path(
    ctx: &mut CompilerContext,
    path: &Path,
    meta: SourceMeta,
) -> Result<ModuleId, ()> {
    if !path.is_file() {
        ctx.handler.report(
            ErrorCode::UnresolvedImport,
            meta,
            1,
            format!("the imported module `{}` is not a file", path.display()),
        );
        return Err(());
    }

    if let Some(existing) = ctx.module_for_path(path) {
        return Ok(existing);
    }

    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            ctx.handler.report(
                ErrorCode::UnresolvedImport,
                meta,
                1,
                format!("cannot read `{}`: {}", path.display(), err),
            );
            return Err(());
        }
    };

    let header_only = path
        .extension()
        .map(|e| e == "acldef")
        .unwrap_or(false);

    Ok(ctx.compile_module(path, &source, header_only, ResolutionStage::InternalAll))
}
