//! Span module - Source location tracking.
//!
//! This module provides [`SourceMeta`], the immutable line/column record
//! attached to every token and AST node, and [`SourceMap`], the per-module
//! source-line cache used when rendering diagnostic snippets.

use std::path::PathBuf;

/// A unique identifier for a compiled module.
///
/// ModuleIds are assigned sequentially as modules are registered with the
/// [`SourceMap`].
///
/// # Examples
///
/// ```
/// use aclc_util::span::ModuleId;
///
/// let id = ModuleId(0);
/// assert_eq!(id.index(), 0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(pub u32);

impl ModuleId {
    /// Get the raw index value.
    #[inline]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }

    /// A dummy ModuleId for testing.
    pub const DUMMY: ModuleId = ModuleId(0);
}

impl Default for ModuleId {
    #[inline]
    fn default() -> Self {
        Self::DUMMY
    }
}

impl crate::Idx for ModuleId {
    fn from_usize(idx: usize) -> Self {
        assert!(idx <= u32::MAX as usize);
        ModuleId(idx as u32)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Source position of a token or AST node.
///
/// Line and column are 1-based. A `SourceMeta` is a small `Copy` value;
/// many nodes share equal metas rather than pointing at a shared record.
///
/// # Examples
///
/// ```
/// use aclc_util::span::{ModuleId, SourceMeta};
///
/// let meta = SourceMeta::new(ModuleId(0), 3, 7);
/// assert_eq!(meta.line, 3);
/// assert_eq!(meta.col, 7);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SourceMeta {
    /// The module this position belongs to.
    pub module: ModuleId,
    /// Line number (1-based).
    pub line: u32,
    /// Column number (1-based).
    pub col: u32,
}

impl SourceMeta {
    /// Dummy meta for testing and synthesized nodes.
    pub const DUMMY: SourceMeta = SourceMeta {
        module: ModuleId::DUMMY,
        line: 0,
        col: 0,
    };

    /// Create a new source meta.
    #[inline]
    pub fn new(module: ModuleId, line: u32, col: u32) -> Self {
        Self { module, line, col }
    }
}

/// A registered source file.
#[derive(Clone, Debug)]
pub struct SourceFile {
    /// Module name (file stem).
    pub name: String,
    /// Full path to the file.
    pub path: PathBuf,
    /// Cached source lines, used for diagnostic snippets.
    pub lines: Vec<String>,
}

/// Registry of compiled source files.
///
/// The map owns each module's name, path, and line cache for the duration of
/// the compilation session.
///
/// # Examples
///
/// ```
/// use aclc_util::span::SourceMap;
///
/// let mut map = SourceMap::new();
/// let id = map.add_file("main", "main.accele", "var x = 1\n");
/// assert_eq!(map.file(id).name, "main");
/// assert_eq!(map.line(id, 1), Some("var x = 1"));
/// ```
#[derive(Debug, Default)]
pub struct SourceMap {
    files: Vec<SourceFile>,
}

impl SourceMap {
    /// Create an empty source map.
    pub fn new() -> Self {
        Self { files: Vec::new() }
    }

    /// Register a source file, returning its module id.
    pub fn add_file(
        &mut self,
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        source: &str,
    ) -> ModuleId {
        let id = ModuleId(self.files.len() as u32);
        self.files.push(SourceFile {
            name: name.into(),
            path: path.into(),
            lines: source.lines().map(str::to_owned).collect(),
        });
        id
    }

    /// Get a registered file.
    ///
    /// # Panics
    ///
    /// Panics if the id was not issued by this map.
    pub fn file(&self, id: ModuleId) -> &SourceFile {
        &self.files[id.index()]
    }

    /// Get a single source line (1-based), if present.
    pub fn line(&self, id: ModuleId, line: u32) -> Option<&str> {
        self.files
            .get(id.index())
            .and_then(|f| f.lines.get(line.saturating_sub(1) as usize))
            .map(String::as_str)
    }

    /// Number of registered files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns true if no files are registered.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_new() {
        let meta = SourceMeta::new(ModuleId(2), 10, 4);
        assert_eq!(meta.module, ModuleId(2));
        assert_eq!(meta.line, 10);
        assert_eq!(meta.col, 4);
    }

    #[test]
    fn test_meta_dummy() {
        assert_eq!(SourceMeta::DUMMY.line, 0);
        assert_eq!(SourceMeta::DUMMY.col, 0);
    }

    #[test]
    fn test_source_map_add_and_lookup() {
        let mut map = SourceMap::new();
        let a = map.add_file("a", "/tmp/a.accele", "one\ntwo\n");
        let b = map.add_file("b", "/tmp/b.accele", "");
        assert_eq!(map.len(), 2);
        assert_eq!(map.file(a).name, "a");
        assert_eq!(map.line(a, 1), Some("one"));
        assert_eq!(map.line(a, 2), Some("two"));
        assert_eq!(map.line(a, 3), None);
        assert_eq!(map.line(b, 1), None);
    }

    #[test]
    fn test_module_ids_sequential() {
        let mut map = SourceMap::new();
        assert_eq!(map.add_file("x", "x", ""), ModuleId(0));
        assert_eq!(map.add_file("y", "y", ""), ModuleId(1));
    }
}
