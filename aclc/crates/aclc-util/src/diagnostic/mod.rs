//! Diagnostic module - Error and warning reporting infrastructure.
//!
//! Every stage of the front-end reports problems through the same channel: a
//! structured [`Diagnostic`] record pushed into a shared [`Handler`]. The
//! handler only collects; rendering (colorization, source snippets) is the
//! driver's concern.
//!
//! # Examples
//!
//! ```
//! use aclc_util::diagnostic::{Diagnostic, ErrorCode, Handler};
//! use aclc_util::span::SourceMeta;
//!
//! let handler = Handler::new();
//! handler.emit(Diagnostic::new(
//!     ErrorCode::InvalidToken,
//!     SourceMeta::DUMMY,
//!     1,
//!     "expected an identifier",
//! ));
//!
//! assert!(handler.has_errors());
//! assert_eq!(handler.error_count(), 1);
//! ```

mod codes;

pub use codes::{ErrorCode, ALL_ERROR_CODES, ERROR_CODE_COUNT};

use crate::span::SourceMeta;
use std::cell::RefCell;
use std::fmt;

/// Diagnostic severity level.
///
/// # Examples
///
/// ```
/// use aclc_util::diagnostic::Level;
///
/// assert_eq!(format!("{}", Level::Error), "error");
/// assert_eq!(format!("{}", Level::Warning), "warning");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// Informational output.
    Info,
    /// A warning that doesn't prevent compilation.
    Warning,
    /// An error that fails the compilation.
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Info => write!(f, "info"),
            Level::Warning => write!(f, "warning"),
            Level::Error => write!(f, "error"),
        }
    }
}

/// One structured diagnostic record.
///
/// The record carries everything a renderer needs: the stable code, the
/// severity, the source position, how many columns to highlight, and the
/// human-readable message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    /// The stable diagnostic code.
    pub code: ErrorCode,
    /// Severity; defaults to the code's own severity.
    pub level: Level,
    /// Source location, if the diagnostic has one.
    pub meta: Option<SourceMeta>,
    /// Number of source columns to highlight at `meta`.
    pub highlight_len: usize,
    /// Main diagnostic message.
    pub message: String,
}

impl Diagnostic {
    /// Create a diagnostic with a source location.
    pub fn new(
        code: ErrorCode,
        meta: SourceMeta,
        highlight_len: usize,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            level: code.severity(),
            meta: Some(meta),
            highlight_len,
            message: message.into(),
        }
    }

    /// Create a diagnostic with no source location.
    pub fn bare(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            level: code.severity(),
            meta: None,
            highlight_len: 0,
            message: message.into(),
        }
    }

    /// Override the severity.
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }
}

/// Collector for diagnostics emitted by the lexer, parser, and resolver.
///
/// Uses interior mutability so that phases holding shared references to the
/// compiler context can still report. Diagnostics are kept in emission order,
/// which is observable (spec'd traversal order).
pub struct Handler {
    diagnostics: RefCell<Vec<Diagnostic>>,
}

impl Handler {
    /// Create a new handler.
    pub fn new() -> Self {
        Self {
            diagnostics: RefCell::new(Vec::new()),
        }
    }

    /// Record a diagnostic.
    pub fn emit(&self, diagnostic: Diagnostic) {
        self.diagnostics.borrow_mut().push(diagnostic);
    }

    /// Shorthand: record `code` at `meta` with a message.
    pub fn report(
        &self,
        code: ErrorCode,
        meta: SourceMeta,
        highlight_len: usize,
        message: impl Into<String>,
    ) {
        self.emit(Diagnostic::new(code, meta, highlight_len, message));
    }

    /// Check if any error-level diagnostics have been recorded.
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .borrow()
            .iter()
            .any(|d| d.level == Level::Error)
    }

    /// Number of error-level diagnostics.
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .borrow()
            .iter()
            .filter(|d| d.level == Level::Error)
            .count()
    }

    /// Number of warning-level diagnostics.
    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .borrow()
            .iter()
            .filter(|d| d.level == Level::Warning)
            .count()
    }

    /// Total number of diagnostics.
    pub fn count(&self) -> usize {
        self.diagnostics.borrow().len()
    }

    /// Snapshot of all recorded diagnostics, in emission order.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow().clone()
    }

    /// Clear all recorded diagnostics.
    pub fn clear(&self) {
        self.diagnostics.borrow_mut().clear();
    }
}

impl Default for Handler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_display() {
        assert_eq!(format!("{}", Level::Info), "info");
        assert_eq!(format!("{}", Level::Warning), "warning");
        assert_eq!(format!("{}", Level::Error), "error");
    }

    #[test]
    fn test_diagnostic_defaults_to_code_severity() {
        let d = Diagnostic::new(ErrorCode::InvalidToken, SourceMeta::DUMMY, 1, "x");
        assert_eq!(d.level, Level::Error);

        let w = Diagnostic::new(ErrorCode::NonfrontedSourceLock, SourceMeta::DUMMY, 1, "x");
        assert_eq!(w.level, Level::Warning);
    }

    #[test]
    fn test_bare_diagnostic_has_no_meta() {
        let d = Diagnostic::bare(ErrorCode::UnresolvedImport, "no such module");
        assert!(d.meta.is_none());
        assert_eq!(d.highlight_len, 0);
    }

    #[test]
    fn test_handler_counts() {
        let handler = Handler::new();
        assert!(!handler.has_errors());

        handler.report(ErrorCode::InvalidToken, SourceMeta::DUMMY, 1, "bad");
        handler.report(ErrorCode::NonfrontedSourceLock, SourceMeta::DUMMY, 8, "late");

        assert!(handler.has_errors());
        assert_eq!(handler.error_count(), 1);
        assert_eq!(handler.warning_count(), 1);
        assert_eq!(handler.count(), 2);
    }

    #[test]
    fn test_handler_preserves_emission_order() {
        let handler = Handler::new();
        handler.report(ErrorCode::InvalidInput, SourceMeta::DUMMY, 1, "first");
        handler.report(ErrorCode::InvalidToken, SourceMeta::DUMMY, 1, "second");

        let diags = handler.diagnostics();
        assert_eq!(diags[0].message, "first");
        assert_eq!(diags[1].message, "second");
    }

    #[test]
    fn test_handler_clear() {
        let handler = Handler::new();
        handler.report(ErrorCode::InvalidInput, SourceMeta::DUMMY, 1, "x");
        handler.clear();
        assert_eq!(handler.count(), 0);
    }
}
