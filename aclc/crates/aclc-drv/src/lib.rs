//! aclc-drv - Compiler driver.
//!
//! The driver is the outer surface of the front-end: it parses the command
//! line, reads the root modules, runs lex → parse → resolve to the RESOLVED
//! stage for each of them (dependencies compile on demand through the import
//! handler), renders the collected diagnostics with source-line snippets,
//! and reports the exit status: 0 on a clean run, 1 when any error-level
//! diagnostic fired.

use aclc_par::ResolutionStage;
use aclc_sem::{CompilerContext, CompilerOptions};
use aclc_util::diagnostic::{Diagnostic, ErrorCode, Level};
use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Options collected from the command line.
#[derive(Clone, Debug, Default)]
pub struct DriverOptions {
    /// Root modules to compile.
    pub inputs: Vec<PathBuf>,
    /// Additional import directories (`-I`).
    pub import_dirs: Vec<PathBuf>,
    /// The global import directory.
    pub global_import_dir: Option<PathBuf>,
    /// Disable the invariant-type table.
    pub no_builtins: bool,
    /// Warnings to enable, by kebab-case diagnostic id.
    pub enable_warnings: Vec<String>,
    /// Warnings to disable, by kebab-case diagnostic id.
    pub disable_warnings: Vec<String>,
}

/// Outcome of one driver run.
pub struct DriverOutput {
    /// Rendered diagnostics, one block per record, in emission order.
    pub rendered: Vec<String>,
    /// The process exit code: 0 clean, 1 on errors.
    pub exit_code: i32,
}

/// Compile every input module and render the resulting diagnostics.
pub fn run(options: &DriverOptions) -> Result<DriverOutput> {
    let mut compiler_options = CompilerOptions {
        import_dirs: options.import_dirs.clone(),
        global_import_dir: options.global_import_dir.clone(),
        no_builtins: options.no_builtins,
        ..CompilerOptions::default()
    };

    apply_warning_flags(&mut compiler_options, &options.enable_warnings, true);
    apply_warning_flags(&mut compiler_options, &options.disable_warnings, false);

    let mut ctx = CompilerContext::new(compiler_options);

    for input in &options.inputs {
        if ctx.module_for_path(input).is_some() {
            debug!(path = %input.display(), "module already compiled as a dependency");
            continue;
        }
        let source = std::fs::read_to_string(input)
            .with_context(|| format!("cannot read module `{}`", input.display()))?;
        let header_only = input
            .extension()
            .map(|ext| ext == "acldef")
            .unwrap_or(false);
        debug!(path = %input.display(), header_only, "compiling module");
        ctx.compile_module(input, &source, header_only, ResolutionStage::Resolved);
    }

    let rendered = ctx
        .diagnostics()
        .iter()
        .map(|d| render_diagnostic(&ctx, d))
        .collect();

    Ok(DriverOutput {
        rendered,
        exit_code: if ctx.has_errors() { 1 } else { 0 },
    })
}

fn apply_warning_flags(options: &mut CompilerOptions, ids: &[String], enabled: bool) {
    for id in ids {
        match ErrorCode::from_id(id) {
            Some(code) => {
                if let Some(slot) = options.warnings.get_mut(code.code() as usize) {
                    *slot = enabled;
                }
            }
            None => warn!(id = %id, "unknown diagnostic id in warning flag"),
        }
    }
}

/// Render one diagnostic as plain text with a source snippet.
///
/// ```text
/// error[ACL0028] invalid-token: expected Id, found RBracket
///   --> main.accele:3:5
///    |
///  3 | fun ] broken
///    |     ^
/// ```
pub fn render_diagnostic(ctx: &CompilerContext, diagnostic: &Diagnostic) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "{}[{}] {}: {}",
        diagnostic.level,
        diagnostic.code.as_str(),
        diagnostic.code.id(),
        diagnostic.message
    );

    if let Some(meta) = diagnostic.meta {
        if meta.line > 0 {
            let file = ctx.source_map.file(meta.module);
            let _ = write!(
                out,
                "\n  --> {}:{}:{}",
                file.name, meta.line, meta.col
            );
            if let Some(line) = ctx.source_map.line(meta.module, meta.line) {
                let gutter = format!("{}", meta.line);
                let pad = " ".repeat(gutter.len());
                let caret_pad = " ".repeat(meta.col.saturating_sub(1) as usize);
                let carets = "^".repeat(diagnostic.highlight_len.max(1));
                let _ = write!(
                    out,
                    "\n {} |\n {} | {}\n {} | {}{}",
                    pad, gutter, line, pad, caret_pad, carets
                );
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use aclc_util::span::SourceMeta;

    #[test]
    fn test_render_diagnostic_with_snippet() {
        let mut ctx = CompilerContext::new(CompilerOptions::default());
        let module = ctx.add_module(
            std::path::Path::new("snippet.accele"),
            "var x = ]\n",
            false,
        );
        let diagnostic = Diagnostic::new(
            ErrorCode::InvalidToken,
            SourceMeta::new(module, 1, 9),
            1,
            "expected an expression",
        );
        let rendered = render_diagnostic(&ctx, &diagnostic);
        assert!(rendered.contains("error[ACL0028]"));
        assert!(rendered.contains("invalid-token"));
        assert!(rendered.contains("snippet:1:9"));
        assert!(rendered.contains("var x = ]"));
        assert!(rendered.contains("^"));
    }

    #[test]
    fn test_render_bare_diagnostic() {
        let ctx = CompilerContext::new(CompilerOptions::default());
        let diagnostic = Diagnostic::bare(ErrorCode::UnresolvedImport, "no such module");
        let rendered = render_diagnostic(&ctx, &diagnostic);
        assert!(rendered.contains("unresolved-import"));
        assert!(!rendered.contains("-->"));
    }

    #[test]
    fn test_warning_flag_application() {
        let mut options = CompilerOptions::default();
        apply_warning_flags(
            &mut options,
            &["nonfronted-source-lock".to_string()],
            false,
        );
        assert!(!options.warnings[ErrorCode::NonfrontedSourceLock.code() as usize]);
        // Unknown ids are ignored with a log line, not an error.
        apply_warning_flags(&mut options, &["no-such-warning".to_string()], false);
    }

    #[test]
    fn test_missing_input_is_an_error() {
        let options = DriverOptions {
            inputs: vec![PathBuf::from("/definitely/not/here.accele")],
            ..DriverOptions::default()
        };
        assert!(run(&options).is_err());
    }

    #[test]
    fn test_level_is_part_of_rendering() {
        let ctx = CompilerContext::new(CompilerOptions::default());
        let warning = Diagnostic::bare(ErrorCode::NonfrontedSourceLock, "late");
        assert!(render_diagnostic(&ctx, &warning).starts_with("warning["));
        let info = Diagnostic::bare(ErrorCode::Unknown, "note").with_level(Level::Info);
        assert!(render_diagnostic(&ctx, &info).starts_with("info["));
    }
}
