//! Process-wide compilation state.
//!
//! The [`CompilerContext`] owns everything with session lifetime: the option
//! flags, the warning toggles, the module table, the shared AST arena, the
//! diagnostics handler, and the builtin-type registry. Only one parser or
//! resolver is ever active at a time; the resolver appends modules through
//! the import handler as it follows imports.

use crate::builtins::Builtins;
use crate::resolver::Resolver;
use aclc_lex::Lexer;
use aclc_par::{AstStore, Item, Parser, ResolutionStage, ScopeId, SymbolId, SymbolKind};
use aclc_util::diagnostic::{Diagnostic, ErrorCode, Level, ERROR_CODE_COUNT};
use aclc_util::span::{ModuleId, SourceMap};
use aclc_util::{Handler, IndexVec};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

/// Identity of a module on disk.
#[derive(Clone, Debug)]
pub struct ModuleInfo {
    pub dir: PathBuf,
    pub path: PathBuf,
    pub name: String,
}

impl ModuleInfo {
    pub fn for_path(path: &Path) -> ModuleInfo {
        let absolute = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        ModuleInfo {
            dir: absolute
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
            name: absolute
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path: absolute,
        }
    }
}

/// One compiled module.
#[derive(Clone, Debug)]
pub struct Module {
    pub info: ModuleInfo,
    pub global_scope: ScopeId,
    pub global_symbol: SymbolId,
    pub stage: ResolutionStage,
    /// `.acldef` declaration-only modules are never compilation outputs.
    pub header_only: bool,
    /// Set by a module-level `@nobuiltins`.
    pub no_builtins: bool,
    /// Whether the parser had to panic anywhere in this module.
    pub did_panic: bool,
    /// True while a resolver is active on this module; breaks import cycles
    /// when a dependency's resolution leads back here.
    pub resolving: bool,
}

/// Compiler options shared by every phase.
#[derive(Clone, Debug)]
pub struct CompilerOptions {
    /// Additional import search directories (`-I`).
    pub import_dirs: Vec<PathBuf>,
    /// The global import directory, searched last.
    pub global_import_dir: Option<PathBuf>,
    /// Disable the invariant-type table for every module.
    pub no_builtins: bool,
    /// Per-code warning toggles, indexed by numeric diagnostic id.
    pub warnings: Vec<bool>,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            import_dirs: Vec::new(),
            global_import_dir: None,
            no_builtins: false,
            warnings: vec![true; ERROR_CODE_COUNT],
        }
    }
}

/// The compilation session.
pub struct CompilerContext {
    pub options: CompilerOptions,
    pub store: AstStore,
    pub source_map: SourceMap,
    pub handler: Handler,
    pub builtins: Builtins,
    pub modules: IndexVec<ModuleId, Module>,
    /// Canonical path of every compiled module, insertion-ordered; a module
    /// is compiled at most once.
    module_paths: IndexMap<PathBuf, ModuleId>,
}

impl CompilerContext {
    pub fn new(options: CompilerOptions) -> Self {
        let mut store = AstStore::new();
        let builtins = Builtins::install(&mut store);
        Self {
            options,
            store,
            source_map: SourceMap::new(),
            handler: Handler::new(),
            builtins,
            modules: IndexVec::new(),
            module_paths: IndexMap::new(),
        }
    }

    /// The module previously compiled from `path`, if any.
    pub fn module_for_path(&self, path: &Path) -> Option<ModuleId> {
        let canonical = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        self.module_paths.get(&canonical).copied()
    }

    /// Register and parse one module. The module starts UNRESOLVED.
    pub fn add_module(&mut self, path: &Path, source: &str, header_only: bool) -> ModuleId {
        let info = ModuleInfo::for_path(path);
        let id = self
            .source_map
            .add_file(info.name.clone(), info.path.clone(), source);

        let result = {
            let lexer = Lexer::new(id, source, &self.handler);
            Parser::new(&mut self.store, lexer, &self.handler).parse()
        };

        let no_builtins = match &self.store.symbols[result.global_symbol].kind {
            SymbolKind::GlobalScope { content } => content
                .iter()
                .any(|item| matches!(item, Item::NoBuiltins(_))),
            _ => false,
        };

        let module = Module {
            info: info.clone(),
            global_scope: result.global_scope,
            global_symbol: result.global_symbol,
            stage: ResolutionStage::Unresolved,
            header_only,
            no_builtins,
            did_panic: result.did_panic,
            resolving: false,
        };
        let module_id = self.modules.push(module);
        debug_assert_eq!(module_id, id);
        self.module_paths.insert(info.path, module_id);
        module_id
    }

    /// Register, parse, and resolve one module up to `max_stage`.
    pub fn compile_module(
        &mut self,
        path: &Path,
        source: &str,
        header_only: bool,
        max_stage: ResolutionStage,
    ) -> ModuleId {
        let id = self.add_module(path, source, header_only);
        Resolver::new(self, id, max_stage).resolve();
        id
    }

    /// Is the given warning enabled?
    pub fn warning_enabled(&self, code: ErrorCode) -> bool {
        self.options
            .warnings
            .get(code.code() as usize)
            .copied()
            .unwrap_or(true)
    }

    /// Toggle a warning by code.
    pub fn set_warning(&mut self, code: ErrorCode, enabled: bool) {
        if let Some(slot) = self.options.warnings.get_mut(code.code() as usize) {
            *slot = enabled;
        }
    }

    /// All diagnostics, with disabled warnings filtered out. Errors are
    /// never filtered.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.handler
            .diagnostics()
            .into_iter()
            .filter(|d| d.level != Level::Warning || self.warning_enabled(d.code))
            .collect()
    }

    /// Whether any error-level diagnostic fired; drives the exit code.
    pub fn has_errors(&self) -> bool {
        self.handler.has_errors()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_toggles() {
        let mut ctx = CompilerContext::new(CompilerOptions::default());
        assert!(ctx.warning_enabled(ErrorCode::NonfrontedSourceLock));
        ctx.set_warning(ErrorCode::NonfrontedSourceLock, false);
        assert!(!ctx.warning_enabled(ErrorCode::NonfrontedSourceLock));
    }

    #[test]
    fn test_disabled_warnings_are_filtered() {
        let mut ctx = CompilerContext::new(CompilerOptions::default());
        ctx.set_warning(ErrorCode::NonfrontedSourceLock, false);
        ctx.handler.report(
            ErrorCode::NonfrontedSourceLock,
            aclc_util::span::SourceMeta::DUMMY,
            1,
            "late",
        );
        ctx.handler.report(
            ErrorCode::InvalidToken,
            aclc_util::span::SourceMeta::DUMMY,
            1,
            "bad",
        );
        let diags = ctx.diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, ErrorCode::InvalidToken);
    }

    #[test]
    fn test_add_module_parses_and_flags() {
        let mut ctx = CompilerContext::new(CompilerOptions::default());
        let id = ctx.add_module(
            Path::new("virtual.accele"),
            "@nobuiltins\nvar x = 1\n",
            false,
        );
        assert!(ctx.modules[id].no_builtins);
        assert_eq!(ctx.modules[id].stage, ResolutionStage::Unresolved);
        assert_eq!(ctx.modules.len(), 1);
    }
}
