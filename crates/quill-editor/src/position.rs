//! Logical document positions.
//!
//! All coordinates are **0-indexed**. Row 0 is the first line, column 0 is the
//! first character. Columns count Unicode scalar values (chars), not bytes and
//! not screen cells. Screen cells are the viewport's business.
//!
//! The status line shows positions 1-indexed; that conversion lives in
//! `Display` and nowhere else.

use std::fmt;

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A position in a text buffer: (row, column), both 0-indexed.
///
/// `col` may equal the line length, meaning "after the last character".
///
/// # Ordering
///
/// Positions are ordered row first, then column, so
/// `Position { row: 0, col: 5 }` < `Position { row: 1, col: 0 }`. Finder
/// matches come out in this order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    /// The origin: row 0, column 0.
    pub const ZERO: Self = Self { row: 0, col: 0 };

    #[inline]
    #[must_use]
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl Ord for Position {
    #[inline]
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.row.cmp(&other.row).then(self.col.cmp(&other.col))
    }
}

impl PartialOrd for Position {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl From<(usize, usize)> for Position {
    #[inline]
    fn from((row, col): (usize, usize)) -> Self {
        Self { row, col }
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pos({}:{})", self.row, self.col)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 1-indexed, as shown in the status line.
        write!(f, "{}:{}", self.row + 1, self.col + 1)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
