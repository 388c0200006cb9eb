/*! Parses regular expressions and produces an Abstract Syntax Tree (AST).

The parser is the front end of the `pire` crate. It understands the surface
syntax of regular expressions (literals, `.`, alternation, concatenation,
repetitions, groups, character classes, anchors and, optionally, the `&`
and `~` operators for intersection and complement) and produces an [`Ast`]
that the lexer in `pire` lowers into a finite state machine.

The parser knows nothing about bytes, encodings or automata. Characters in
the AST are Unicode scalar values; it is the lowering step that decides
whether they are interpreted as Latin-1 bytes or as UTF-8 sequences.
 */

use std::fmt::{Display, Formatter};
use std::ops::Range;

pub use ast::*;
pub use errors::Error;
pub use parser::{Parser, MAX_REPETITION};

mod ast;
mod errors;
mod parser;
mod tokenizer;

/// Starting and ending positions of some token inside the pattern.
#[derive(Default, Clone, Debug, Hash, Eq, PartialEq)]
pub struct Span(pub Range<u32>);

impl From<logos::Span> for Span {
    fn from(value: logos::Span) -> Self {
        Self(value.start as u32..value.end as u32)
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}..{}]", self.start(), self.end())
    }
}

impl Span {
    const MAX: usize = u32::MAX as usize;

    /// Offset within the pattern (in bytes) were the span starts.
    #[inline]
    pub fn start(&self) -> usize {
        self.0.start as usize
    }

    /// Offset within the pattern (in bytes) where the span ends.
    #[inline]
    pub fn end(&self) -> usize {
        self.0.end as usize
    }

    /// Returns the span as a range of byte offsets.
    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.0.start as usize..self.0.end as usize
    }

    /// Returns a new [`Span`] that combines this span with `other`.
    ///
    /// The resulting span goes from `self.start()` to `other.end()`.
    pub fn combine(&self, other: &Self) -> Self {
        Self(self.0.start..other.0.end)
    }

    /// Displace the span to the left, incrementing both the starting and
    /// ending positions by the given offset
    ///
    /// ```
    /// # use pire_parser::Span;
    /// assert_eq!(Span(0..1).offset(1), Span(1..2))
    /// ```
    pub fn offset(mut self, offset: usize) -> Self {
        self.0.start = self.0.start.saturating_add(offset as u32);
        self.0.end = self.0.end.saturating_add(offset as u32);
        self
    }
}
