//! Cursor — the edit point and its sticky column.
//!
//! The `Cursor` tracks a logical position in a [`TextBuffer`] and an
//! `anchor`: the column the user last chose on purpose. It does not own or
//! reference the buffer; the buffer is passed to each movement method.
//!
//! # Sticky column
//!
//! Horizontal movement (left, right, home, end) sets `anchor = col`.
//! Vertical movement (up, down, page up, page down) leaves the anchor alone
//! and lands on `min(anchor, line_length(target))`. Moving down through a
//! short line and back onto a long one therefore returns to the original
//! column.
//!
//! # Rendered position
//!
//! `rendered_row` / `rendered_col` are 0-indexed screen coordinates filled
//! in by [`Viewport::place_cursor`](crate::view::Viewport::place_cursor)
//! each frame. They are derived data and go stale after any edit or scroll.

use crate::buffer::TextBuffer;
use crate::position::Position;

/// The edit point in a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cursor {
    row: usize,
    col: usize,

    /// Desired column for vertical movement.
    anchor: usize,

    rendered_row: u16,
    rendered_col: u16,
}

impl Cursor {
    /// A cursor at the origin.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            row: 0,
            col: 0,
            anchor: 0,
            rendered_row: 0,
            rendered_col: 0,
        }
    }

    // -- Accessors ----------------------------------------------------------

    #[inline]
    #[must_use]
    pub const fn row(&self) -> usize {
        self.row
    }

    #[inline]
    #[must_use]
    pub const fn col(&self) -> usize {
        self.col
    }

    #[inline]
    #[must_use]
    pub const fn position(&self) -> Position {
        Position::new(self.row, self.col)
    }

    /// The sticky column.
    #[inline]
    #[must_use]
    pub const fn anchor(&self) -> usize {
        self.anchor
    }

    /// Screen coordinates from the last frame, 0-indexed `(x, y)`.
    #[inline]
    #[must_use]
    pub const fn rendered(&self) -> (u16, u16) {
        (self.rendered_col, self.rendered_row)
    }

    pub(crate) const fn set_rendered(&mut self, x: u16, y: u16) {
        self.rendered_col = x;
        self.rendered_row = y;
    }

    // -- Jumps --------------------------------------------------------------

    /// Jump to `pos` after an edit or a search hit, clamped to the buffer.
    /// The new column becomes the anchor.
    pub fn move_to(&mut self, pos: Position, buf: &TextBuffer) {
        self.row = pos.row.min(buf.line_count() - 1);
        self.col = pos.col.min(buf.line_length(self.row));
        self.anchor = self.col;
    }

    /// Pull the cursor back inside the buffer after lines were removed or
    /// shortened. Leaves the anchor alone.
    pub fn clamp(&mut self, buf: &TextBuffer) {
        self.row = self.row.min(buf.line_count() - 1);
        self.col = self.col.min(buf.line_length(self.row));
    }

    // -- Horizontal ---------------------------------------------------------

    /// One char left, wrapping to the end of the previous line.
    pub fn move_left(&mut self, buf: &TextBuffer) {
        if self.col > 0 {
            self.col -= 1;
        } else if self.row > 0 {
            self.row -= 1;
            self.col = buf.line_length(self.row);
        }
        self.anchor = self.col;
    }

    /// One char right, wrapping to the start of the next line.
    pub fn move_right(&mut self, buf: &TextBuffer) {
        if self.col < buf.line_length(self.row) {
            self.col += 1;
        } else if self.row + 1 < buf.line_count() {
            self.row += 1;
            self.col = 0;
        }
        self.anchor = self.col;
    }

    pub const fn move_home(&mut self) {
        self.col = 0;
        self.anchor = 0;
    }

    pub fn move_end(&mut self, buf: &TextBuffer) {
        self.col = buf.line_length(self.row);
        self.anchor = self.col;
    }

    // -- Vertical -----------------------------------------------------------

    pub fn move_up(&mut self, buf: &TextBuffer) {
        self.move_vertical(-1, buf);
    }

    pub fn move_down(&mut self, buf: &TextBuffer) {
        self.move_vertical(1, buf);
    }

    /// Up by `step` rows (at least one), stopping at the first line.
    pub fn page_up(&mut self, step: usize, buf: &TextBuffer) {
        self.move_vertical(-isize_from(step.max(1)), buf);
    }

    /// Down by `step` rows (at least one), stopping at the last line.
    pub fn page_down(&mut self, step: usize, buf: &TextBuffer) {
        self.move_vertical(isize_from(step.max(1)), buf);
    }

    fn move_vertical(&mut self, delta: isize, buf: &TextBuffer) {
        let last = buf.line_count() - 1;
        self.row = self.row.saturating_add_signed(delta).min(last);
        self.col = self.anchor.min(buf.line_length(self.row));
    }
}

fn isize_from(n: usize) -> isize {
    isize::try_from(n).unwrap_or(isize::MAX)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
