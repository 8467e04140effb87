//! Source locations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A byte range in the source text with its 1-based line and column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Byte offset of the first character.
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
    /// Line of `start` (1-based).
    pub line: u32,
    /// Column of `start` (1-based, in characters).
    pub column: u32,
}

impl Span {
    /// Create a new span.
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    /// Smallest span covering both `self` and `other`.
    ///
    /// The line and column are taken from whichever span starts first.
    #[must_use]
    pub fn to(self, other: Span) -> Span {
        let (first, _) = if self.start <= other.start {
            (self, other)
        } else {
            (other, self)
        };
        Span {
            start: first.start,
            end: self.end.max(other.end),
            line: first.line,
            column: first.column,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Maps byte offsets to line/column positions.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    /// Index the line starts of `source`.
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            source
                .char_indices()
                .filter(|&(_, c)| c == '\n')
                .map(|(i, _)| i + 1),
        );
        Self { line_starts }
    }

    /// Build a span for the byte range `start..end` of `source`.
    pub fn span(&self, source: &str, start: usize, end: usize) -> Span {
        let line = match self.line_starts.binary_search(&start) {
            Ok(exact) => exact,
            Err(next) => next - 1,
        };
        let line_start = self.line_starts[line];
        let column = source
            .get(line_start..start)
            .map_or(start - line_start, |prefix| prefix.chars().count());
        Span {
            start,
            end,
            line: u32::try_from(line + 1).unwrap_or(u32::MAX),
            column: u32::try_from(column + 1).unwrap_or(u32::MAX),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_index_positions() {
        let source = "let q = Register(2);\n  q.Superpose();\n";
        let index = LineIndex::new(source);

        let first = index.span(source, 0, 3);
        assert_eq!((first.line, first.column), (1, 1));

        let offset = source.find("q.Superpose").unwrap();
        let second = index.span(source, offset, offset + 1);
        assert_eq!((second.line, second.column), (2, 3));
        assert_eq!(second.to_string(), "2:3");
    }

    #[test]
    fn test_span_merge() {
        let a = Span::new(4, 8, 1, 5);
        let b = Span::new(10, 20, 2, 1);
        let merged = b.to(a);
        assert_eq!(merged.start, 4);
        assert_eq!(merged.end, 20);
        assert_eq!(merged.line, 1);
    }
}
