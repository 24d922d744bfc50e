#![allow(clippy::module_inception)]

use std::{fmt::Display, path::Path};

use crate::{
    arena::Arena,
    errors::diagnostics::Diagnostics,
    parser::parser::{parse, parse_file},
    pickle::PickleOptions,
    semantics::{asr::TranslationUnit, ast_to_asr::ast_to_asr},
    source::SourceReader,
};

pub mod arena;
pub mod ast;
pub mod errors;
pub mod lexer;
pub mod macros;
pub mod parser;
pub mod pickle;
pub mod semantics;
pub mod source;

extern crate regex;

/// Inclusive byte range `first..=last` into the source buffer.
///
/// A span always covers at least one byte, so a "point" span at offset `n`
/// is `Span { first: n, last: n }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub first: u32,
    pub last: u32,
}

impl Span {
    pub fn new(first: u32, last: u32) -> Self {
        debug_assert!(first <= last, "span {first}:{last} is reversed");
        Span { first, last }
    }

    /// Builds a span from a half-open byte range, clamping empty ranges to a
    /// single byte.
    pub fn from_range(start: usize, end: usize) -> Self {
        let first = start as u32;
        let last = if end > start { (end - 1) as u32 } else { first };
        Span { first, last }
    }

    pub fn point(offset: usize) -> Self {
        Span::from_range(offset, offset + 1)
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            first: self.first.min(other.first),
            last: self.last.max(other.last),
        }
    }

    pub fn len(&self) -> u32 {
        self.last - self.first + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, other: Span) -> bool {
        self.first <= other.first && other.last <= self.last
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.first, self.last)
    }
}

/// Knobs shared by the library pipeline and the `compy` binary.
#[derive(Debug, Clone, Copy)]
pub struct CompilerOptions {
    /// Top-level statements form the program entry point.
    pub main_module: bool,
    /// Stop semantic analysis after collecting top-level declarations.
    pub symtab_only: bool,
    /// Layout of the AST/ASR dumps.
    pub pickle: PickleOptions,
    /// Suffix token dumps with `FIRST:LAST` byte offsets.
    pub show_spans: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        CompilerOptions {
            main_module: true,
            symtab_only: false,
            pickle: PickleOptions::default(),
            show_spans: false,
        }
    }
}

/// Runs parsing and semantic analysis over one compilation unit.
///
/// Every node lands in `arena`; the caller drops it once the unit (and any
/// backend consuming the [`TranslationUnit`]) is done.
pub fn compile_source(
    arena: &mut Arena,
    source: &str,
    options: &CompilerOptions,
) -> Result<TranslationUnit, Diagnostics> {
    let module = parse(arena, source).map_err(Diagnostics::from)?;
    ast_to_asr(arena, &module, options.main_module, options.symtab_only)
}

/// Same as [`compile_source`], reading the unit through `reader`.
pub fn compile_file(
    arena: &mut Arena,
    path: &Path,
    reader: &dyn SourceReader,
    options: &CompilerOptions,
) -> Result<TranslationUnit, Diagnostics> {
    let module = parse_file(arena, path, reader).map_err(Diagnostics::from)?;
    ast_to_asr(arena, &module, options.main_module, options.symtab_only)
}

#[cfg(test)]
mod tests {
    use super::Span;

    #[test]
    fn test_span_from_range() {
        assert_eq!(Span::from_range(3, 7), Span::new(3, 6));
        assert_eq!(Span::from_range(4, 4), Span::new(4, 4));
        assert_eq!(Span::point(9).len(), 1);
    }

    #[test]
    fn test_span_merge_and_contains() {
        let merged = Span::new(2, 4).merge(Span::new(8, 10));
        assert_eq!(merged, Span::new(2, 10));
        assert!(merged.contains(Span::new(4, 8)));
        assert!(!merged.contains(Span::new(1, 3)));
        assert_eq!(merged.to_string(), "2:10");
    }
}
