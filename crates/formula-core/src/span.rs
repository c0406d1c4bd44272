//! Source locations carried through reduction events into errors.

use std::fmt;

/// Where a reduced node came from in the formula text.
///
/// The front end fills these in; the backend only copies them onto
/// elements and errors.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed, byte-based).
    pub col: u32,
    /// Length in bytes.
    pub len: u32,
}

impl Span {
    #[inline]
    pub const fn new(line: u32, col: u32, len: u32) -> Self {
        Self { line, col, len }
    }

    /// A zero-length span at a position.
    #[inline]
    pub const fn point(line: u32, col: u32) -> Self {
        Self { line, col, len: 0 }
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub const fn len(&self) -> u32 {
        self.len
    }

    /// The smallest span covering both operands of a binary node.
    ///
    /// Spans on different lines keep the first position and sum lengths.
    pub fn merge(self, other: Span) -> Span {
        if self.line != other.line {
            return Span::new(self.line, self.col, self.len + other.len);
        }
        let start = self.col.min(other.col);
        let end = (self.col + self.len).max(other.col + other.len);
        Span::new(self.line, start, end - start)
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_is_empty() {
        assert!(Span::point(1, 4).is_empty());
        assert_eq!(Span::new(1, 4, 3).len(), 3);
    }

    #[test]
    fn display_is_line_col() {
        assert_eq!(Span::new(2, 9, 1).to_string(), "2:9");
    }

    #[test]
    fn merge_covers_both_operands() {
        // `a + bc` : `a` at col 1, `bc` at col 5
        let merged = Span::new(1, 1, 1).merge(Span::new(1, 5, 2));
        assert_eq!(merged, Span::new(1, 1, 6));
        // order of operands does not matter on one line
        assert_eq!(Span::new(1, 5, 2).merge(Span::new(1, 1, 1)), merged);
    }

    #[test]
    fn merge_across_lines_keeps_first_position() {
        let merged = Span::new(1, 8, 2).merge(Span::new(2, 1, 3));
        assert_eq!(merged, Span::new(1, 8, 5));
    }
}
