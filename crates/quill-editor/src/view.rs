//! Viewport — scroll state and full-screen rendering.
//!
//! The `Viewport` maps the logical document onto the terminal:
//!
//! - **Vertical scroll** — `row_offset` keeps the cursor at least
//!   `scroll_margin` rows away from the top and bottom of the text area
//! - **Horizontal scroll** — `col_offset` keeps the cursor's render column
//!   inside the text width
//! - **Line numbers** — a right-aligned gutter, `digits + 1` wide
//! - **Tab expansion** — the cursor's render column counts tabs to the next
//!   tab stop, matching each line's cached render string
//! - **Footer** — a hint bar and a status line below the text
//!
//! The viewport owns no document state. The buffer and cursor are passed
//! in, so the same viewport survives a reload.
//!
//! # Screen layout
//!
//! ```text
//! row 0            ┌──────────────────────────────────────┐
//!                  │ 1 first line                         │  text area:
//!                  │ 2 second line                        │  rows - top_margin
//!                  │ ~                                    │       - bottom_margin
//! rows - 2         │ Ctrl-S: Save | Ctrl-Q: Quit | ...    │  hint bar
//! rows - 1         │ [1:1] [lines: 2] [file: a.txt]  ...  │  status line
//!                  └──────────────────────────────────────┘
//! ```

use std::fmt::Write as _;
use std::io;
use std::ops::Range;

use quill_term::ansi;
use quill_term::output::OutputBuffer;
use quill_term::terminal::Size;
use tracing::debug;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::buffer::{Line, TextBuffer};
use crate::config::Config;
use crate::cursor::Cursor;
use crate::finder::Finder;

/// The centered banner in the status line.
pub const BANNER: &str = concat!("quill v", env!("CARGO_PKG_VERSION"));

/// Rows below the text area: hint bar and status line.
pub const FOOTER_ROWS: usize = 2;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Gutter width for line numbers: digits of the line count plus a space.
///
/// | Lines   | Gutter |
/// |---------|--------|
/// | 1–9     | 2      |
/// | 10–99   | 3      |
/// | 100–999 | 4      |
///
/// Returns 0 when `show_numbers` is false.
#[must_use]
pub fn gutter_width(line_count: usize, show_numbers: bool) -> usize {
    if !show_numbers {
        return 0;
    }
    // At least 1, so ilog10 doesn't panic on 0.
    let digits = line_count.max(1).ilog10() as usize + 1;
    digits + 1
}

/// Render column of logical column `col`: each char before it counts 1, and
/// each tab jumps to the next multiple of `tab_size`.
///
/// ```
/// use quill_editor::view::render_col;
///
/// let line: Vec<char> = "\tab\tc".chars().collect();
/// assert_eq!(render_col(&line, 0, 4), 0);
/// assert_eq!(render_col(&line, 1, 4), 4);
/// assert_eq!(render_col(&line, 4, 4), 8);
/// ```
#[must_use]
pub fn render_col(content: &[char], col: usize, tab_size: usize) -> usize {
    let tab_size = tab_size.max(1);
    content.iter().take(col).fold(0, |rcol, &ch| {
        if ch == '\t' {
            rcol + tab_size - (rcol % tab_size)
        } else {
            rcol + 1
        }
    })
}

/// The longest prefix of `s` that fits in `width` display columns.
#[must_use]
pub fn truncate_to_width(s: &str, width: usize) -> &str {
    let mut used = 0;
    for (idx, ch) in s.char_indices() {
        let w = ch.width().unwrap_or(0);
        if used + w > width {
            return &s[..idx];
        }
        used += w;
    }
    s
}

fn to_u16(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}

// ---------------------------------------------------------------------------
// Footer
// ---------------------------------------------------------------------------

/// What the footer shows this frame, supplied by the editor.
#[derive(Debug, Clone, Copy, Default)]
pub struct Footer<'a> {
    /// Hint bar text (registry hints or the find prompt).
    pub hint: &'a str,
    /// Current status message; empty for none.
    pub message: &'a str,
    /// Whether the line clipboard holds something.
    pub clipboard: bool,
}

// ---------------------------------------------------------------------------
// Viewport
// ---------------------------------------------------------------------------

/// Scroll offsets and margins for the single editing window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewport {
    rows: usize,
    cols: usize,
    row_offset: usize,
    col_offset: usize,
    top_margin: usize,
    bottom_margin: usize,
    left_margin: usize,
    scroll_margin: usize,
    show_line_numbers: bool,
}

impl Viewport {
    #[must_use]
    pub fn new(size: Size, config: &Config) -> Self {
        Self {
            rows: usize::from(size.rows),
            cols: usize::from(size.cols),
            row_offset: 0,
            col_offset: 0,
            top_margin: 0,
            bottom_margin: FOOTER_ROWS,
            left_margin: 0,
            scroll_margin: config.scroll_margin,
            show_line_numbers: config.show_line_numbers,
        }
    }

    /// Adopt a new terminal size. Scroll is recomputed on the next
    /// [`place_cursor`](Self::place_cursor).
    pub fn resize(&mut self, size: Size) {
        self.rows = usize::from(size.rows);
        self.cols = usize::from(size.cols);
    }

    // -- Geometry -----------------------------------------------------------

    #[inline]
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    #[must_use]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// First document row on screen.
    #[inline]
    #[must_use]
    pub const fn row_offset(&self) -> usize {
        self.row_offset
    }

    /// First render column on screen.
    #[inline]
    #[must_use]
    pub const fn col_offset(&self) -> usize {
        self.col_offset
    }

    /// Rows available for document text.
    #[must_use]
    pub const fn text_rows(&self) -> usize {
        self.rows
            .saturating_sub(self.top_margin)
            .saturating_sub(self.bottom_margin)
    }

    /// Columns available for document text, right of the gutter.
    #[must_use]
    pub const fn text_cols(&self) -> usize {
        self.cols.saturating_sub(self.left_margin)
    }

    /// Rows moved by PageUp/PageDown.
    #[must_use]
    pub fn page_step(&self) -> usize {
        self.text_rows().max(1)
    }

    /// The scroll margin actually kept: never more than fits on both sides
    /// of the cursor.
    #[must_use]
    pub fn effective_scroll_margin(&self) -> usize {
        self.scroll_margin
            .min(self.text_rows().saturating_sub(1) / 2)
    }

    // -- Scrolling ----------------------------------------------------------

    /// Step `row_offset` until `cursor_row` sits inside the margins.
    ///
    /// Never scrolls above the first line, and never further down than
    /// needed to keep the last line `scroll_margin` rows from the top.
    pub fn update_scroll(&mut self, cursor_row: usize, line_count: usize) {
        let margin = self.effective_scroll_margin();
        let top = self.top_margin + margin;
        let bottom = (self.rows - self.bottom_margin.min(self.rows)).saturating_sub(margin);
        let max_offset = line_count.saturating_sub(1 + self.top_margin + margin);
        let before = self.row_offset;

        if self.text_rows() == 0 {
            self.row_offset = cursor_row;
            return;
        }

        loop {
            if cursor_row < self.row_offset + top {
                if self.row_offset == 0 {
                    break;
                }
                self.row_offset -= 1;
            } else if cursor_row >= self.row_offset + bottom {
                if self.row_offset >= max_offset {
                    break;
                }
                self.row_offset += 1;
            } else {
                break;
            }
        }

        if self.row_offset != before {
            debug!(from = before, to = self.row_offset, "scrolled");
        }
    }

    /// Shift `col_offset` so render column `rcol` is visible.
    pub fn update_horizontal_scroll(&mut self, rcol: usize) {
        let width = self.text_cols().max(1);
        if rcol < self.col_offset {
            self.col_offset = rcol;
        } else if rcol >= self.col_offset + width {
            self.col_offset = rcol + 1 - width;
        }
    }

    /// Recompute gutter, scroll offsets and the cursor's screen position.
    ///
    /// Run once per frame after the cursor or the buffer changed.
    pub fn place_cursor(&mut self, cursor: &mut Cursor, buf: &TextBuffer) {
        self.left_margin = gutter_width(buf.line_count(), self.show_line_numbers);
        self.update_scroll(cursor.row(), buf.line_count());

        let content = buf.get_line(cursor.row()).unwrap_or_default();
        let rcol = render_col(content, cursor.col(), buf.tab_size());
        self.update_horizontal_scroll(rcol);

        let x = self.left_margin + rcol - self.col_offset;
        let y = cursor.row().saturating_sub(self.row_offset) + self.top_margin;
        cursor.set_rendered(to_u16(x), to_u16(y));
    }

    // -- Rendering ----------------------------------------------------------

    /// Paint the whole screen into `out`, from the top-left corner.
    ///
    /// `highlight` is the finder whose committed matches are drawn
    /// black-on-yellow; pass `None` outside find mode.
    ///
    /// # Errors
    ///
    /// Propagates write errors from `out`.
    pub fn render(
        &self,
        out: &mut OutputBuffer,
        buf: &TextBuffer,
        cursor: &Cursor,
        footer: &Footer<'_>,
        highlight: Option<&Finder>,
    ) -> io::Result<()> {
        for screen_row in 0..self.text_rows() {
            let row = self.row_offset + screen_row;
            match buf.line(row) {
                Some(line) => {
                    self.write_gutter(out, row, buf.line_count());
                    let spans = highlight
                        .map(|finder| highlight_spans(finder, row, line, buf.tab_size()))
                        .unwrap_or_default();
                    self.write_text(out, line, &spans)?;
                }
                None => out.push_str(truncate_to_width("~", self.cols)),
            }
            ansi::clear_line_right(out)?;
            out.push_str("\r\n");
        }

        if self.rows >= FOOTER_ROWS {
            self.write_hint_bar(out, footer.hint)?;
            self.write_status_line(out, buf, cursor, footer)?;
        }
        Ok(())
    }

    fn write_gutter(&self, out: &mut OutputBuffer, row: usize, line_count: usize) {
        if self.show_line_numbers {
            let digits = gutter_width(line_count, true) - 1;
            let label = format!("{:>digits$} ", row + 1);
            out.push_str(truncate_to_width(&label, self.cols));
        }
    }

    /// Visible slice of one line, starting at `col_offset`, with highlight
    /// spans given in render columns.
    fn write_text(&self, out: &mut OutputBuffer, line: &Line, spans: &[Range<usize>]) -> io::Result<()> {
        let width = self.text_cols();
        let mut used = 0;
        let mut lit = false;

        for (rcol, ch) in line.render().chars().enumerate().skip(self.col_offset) {
            let ch = if ch.is_control() { '?' } else { ch };
            let w = ch.width().unwrap_or(1);
            if used + w > width {
                break;
            }

            let in_span = spans.iter().any(|span| span.contains(&rcol));
            if in_span != lit {
                if in_span {
                    ansi::black_on_yellow(out)?;
                } else {
                    ansi::reset(out)?;
                }
                lit = in_span;
            }

            out.push_char(ch);
            used += w;
        }

        if lit {
            ansi::reset(out)?;
        }
        Ok(())
    }

    fn write_hint_bar(&self, out: &mut OutputBuffer, hint: &str) -> io::Result<()> {
        ansi::black_on_white(out)?;
        out.push_str(truncate_to_width(hint, self.cols));
        ansi::clear_line_right(out)?;
        ansi::reset(out)?;
        out.push_str("\r\n");
        Ok(())
    }

    fn write_status_line(
        &self,
        out: &mut OutputBuffer,
        buf: &TextBuffer,
        cursor: &Cursor,
        footer: &Footer<'_>,
    ) -> io::Result<()> {
        let line = status_line(self.cols, buf, cursor, footer);
        out.push_str(truncate_to_width(&line, self.cols));
        ansi::clear_line_right(out)
    }
}

/// Compose the status line: state on the left, banner centered, message on
/// the right.
#[must_use]
pub fn status_line(cols: usize, buf: &TextBuffer, cursor: &Cursor, footer: &Footer<'_>) -> String {
    let mut left = format!(
        "[{}] [lines: {}] [file: {}{}]",
        cursor.position(),
        buf.line_count(),
        buf.file_name(),
        if buf.is_dirty() { "*" } else { "" }
    );
    if footer.clipboard {
        left.push_str(" [clipboard: 1 line]");
    }

    let half = cols.saturating_sub(BANNER.width()) / 2;
    let left_pad = half.saturating_sub(left.width());
    let right_pad = half.saturating_sub(footer.message.width());

    let mut line = String::with_capacity(cols);
    let _ = write!(
        line,
        "{left}{:left_pad$}{BANNER}{:right_pad$}{}",
        "", "", footer.message
    );
    line
}

/// Render-column ranges of the committed matches on `row`.
fn highlight_spans(finder: &Finder, row: usize, line: &Line, tab_size: usize) -> Vec<Range<usize>> {
    finder
        .matches_on_row(row)
        .map(|cols| {
            let start = render_col(line.content(), cols.start, tab_size);
            let end = render_col(line.content(), cols.end, tab_size);
            start..end
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;
    use pretty_assertions::assert_eq;

    fn size(cols: u16, rows: u16) -> Size {
        Size { cols, rows }
    }

    fn config(scroll_margin: usize, show_line_numbers: bool) -> Config {
        Config {
            scroll_margin,
            show_line_numbers,
            ..Config::default()
        }
    }

    fn numbered(n: usize) -> TextBuffer {
        let text: String = (1..=n).map(|i| format!("line {i}\n")).collect();
        TextBuffer::from_text(&text)
    }

    fn cursor_at(row: usize, col: usize, buf: &TextBuffer) -> Cursor {
        let mut c = Cursor::new();
        c.move_to(Position::new(row, col), buf);
        c
    }

    fn rendered(view: &Viewport, buf: &TextBuffer, cursor: &Cursor, footer: &Footer<'_>, finder: Option<&Finder>) -> String {
        let mut out = OutputBuffer::new();
        view.render(&mut out, buf, cursor, footer, finder).unwrap();
        String::from_utf8(out.as_bytes().to_vec()).unwrap()
    }

    // -- Helpers ------------------------------------------------------------

    #[test]
    fn gutter_grows_with_digits() {
        assert_eq!(gutter_width(0, true), 2);
        assert_eq!(gutter_width(9, true), 2);
        assert_eq!(gutter_width(10, true), 3);
        assert_eq!(gutter_width(1000, true), 5);
        assert_eq!(gutter_width(1000, false), 0);
    }

    #[test]
    fn render_col_with_tabs() {
        let line: Vec<char> = "a\tb".chars().collect();
        assert_eq!(render_col(&line, 1, 4), 1);
        assert_eq!(render_col(&line, 2, 4), 4);
        assert_eq!(render_col(&line, 3, 4), 5);
        assert_eq!(render_col(&line, 2, 8), 8);
        // Past the end just stops counting.
        assert_eq!(render_col(&line, 99, 4), 5);
    }

    #[test]
    fn truncate_respects_wide_chars() {
        assert_eq!(truncate_to_width("hello", 3), "hel");
        assert_eq!(truncate_to_width("日本語", 3), "日");
        assert_eq!(truncate_to_width("ok", 10), "ok");
    }

    // -- Geometry -----------------------------------------------------------

    #[test]
    fn text_area_excludes_footer() {
        let view = Viewport::new(size(80, 24), &config(5, true));
        assert_eq!(view.text_rows(), 22);
        assert_eq!(view.page_step(), 22);
    }

    #[test]
    fn effective_margin_is_capped() {
        let view = Viewport::new(size(80, 7), &config(10, true));
        // 5 text rows → at most 2 rows each side.
        assert_eq!(view.effective_scroll_margin(), 2);
        let view = Viewport::new(size(80, 24), &config(3, true));
        assert_eq!(view.effective_scroll_margin(), 3);
    }

    // -- Vertical scroll ----------------------------------------------------

    #[test]
    fn no_scroll_while_inside_margins() {
        let mut view = Viewport::new(size(80, 12), &config(2, true));
        view.update_scroll(7, 100);
        assert_eq!(view.row_offset(), 0);
    }

    #[test]
    fn scrolls_down_to_keep_bottom_margin() {
        // 10 text rows, margin 2: cursor must stay at screen rows 2..8.
        let mut view = Viewport::new(size(80, 12), &config(2, true));
        view.update_scroll(8, 100);
        assert_eq!(view.row_offset(), 1);
        view.update_scroll(50, 100);
        assert_eq!(view.row_offset(), 43);
    }

    #[test]
    fn scrolls_up_to_keep_top_margin() {
        let mut view = Viewport::new(size(80, 12), &config(2, true));
        view.update_scroll(50, 100);
        view.update_scroll(44, 100);
        assert_eq!(view.row_offset(), 42);
        view.update_scroll(0, 100);
        assert_eq!(view.row_offset(), 0);
    }

    #[test]
    fn last_line_scrolls_just_enough() {
        let mut view = Viewport::new(size(80, 12), &config(2, true));
        view.update_scroll(99, 100);
        // Last line sits just above the bottom margin.
        assert_eq!(view.row_offset(), 92);
        view.update_scroll(99, 100);
        assert_eq!(view.row_offset(), 92);
    }

    #[test]
    fn short_document_never_scrolls() {
        let mut view = Viewport::new(size(80, 24), &config(5, true));
        view.update_scroll(3, 4);
        assert_eq!(view.row_offset(), 0);
    }

    #[test]
    fn margin_invariant_holds_for_every_row() {
        let mut view = Viewport::new(size(80, 14), &config(3, true));
        let lines = 200;
        let m = view.effective_scroll_margin();
        let text_rows = view.text_rows();
        let rows: Vec<usize> = (0..lines).chain((0..lines).rev()).collect();
        for row in rows {
            view.update_scroll(row, lines);
            let screen = row - view.row_offset();
            if row >= m && row + m < lines {
                assert!(screen >= m, "row {row}: screen {screen}");
                assert!(screen < text_rows - m, "row {row}: screen {screen}");
            }
        }
    }

    #[test]
    fn huge_margin_terminates() {
        let mut view = Viewport::new(size(80, 4), &config(50, true));
        view.update_scroll(30, 60);
        assert!(view.row_offset() <= 30);
        assert!(30 - view.row_offset() < view.text_rows());
    }

    // -- Horizontal scroll --------------------------------------------------

    #[test]
    fn horizontal_scroll_follows_cursor() {
        let mut view = Viewport::new(size(10, 5), &config(0, false));
        view.update_horizontal_scroll(5);
        assert_eq!(view.col_offset(), 0);
        view.update_horizontal_scroll(15);
        assert_eq!(view.col_offset(), 6);
        view.update_horizontal_scroll(2);
        assert_eq!(view.col_offset(), 2);
    }

    // -- place_cursor -------------------------------------------------------

    #[test]
    fn place_cursor_accounts_for_gutter_and_tabs() {
        let buf = TextBuffer::from_text("\tab\n");
        let mut view = Viewport::new(size(80, 24), &config(0, true));
        let mut cursor = cursor_at(0, 2, &buf);
        view.place_cursor(&mut cursor, &buf);
        // Gutter 2 + tab to col 4 + one char.
        assert_eq!(cursor.rendered(), (7, 0));
    }

    #[test]
    fn place_cursor_after_scroll() {
        let buf = numbered(100);
        let mut view = Viewport::new(size(80, 12), &config(2, false));
        let mut cursor = cursor_at(50, 3, &buf);
        view.place_cursor(&mut cursor, &buf);
        assert_eq!(view.row_offset(), 43);
        assert_eq!(cursor.rendered(), (3, 7));
    }

    // -- Rendering ----------------------------------------------------------

    #[test]
    fn render_draws_lines_tildes_and_footer() {
        let buf = TextBuffer::from_text("hello\nworld\n");
        let mut view = Viewport::new(size(60, 6), &config(0, true));
        let mut cursor = Cursor::new();
        view.place_cursor(&mut cursor, &buf);
        let footer = Footer {
            hint: "Ctrl-S: Save",
            message: "",
            clipboard: false,
        };
        let screen = rendered(&view, &buf, &cursor, &footer, None);

        let rows: Vec<&str> = screen.split("\r\n").collect();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0], "1 hello\x1b[K");
        assert_eq!(rows[1], "2 world\x1b[K");
        assert_eq!(rows[2], "~\x1b[K");
        assert_eq!(rows[3], "~\x1b[K");
        assert_eq!(rows[4], "\x1b[30;47mCtrl-S: Save\x1b[K\x1b[0m");
        assert!(rows[5].starts_with("[1:1] [lines: 2] [file: [No Name]]"));
        assert!(rows[5].contains(BANNER));
    }

    #[test]
    fn render_truncates_long_lines() {
        let buf = TextBuffer::from_text("abcdefghijklmnop\n");
        let mut view = Viewport::new(size(8, 4), &config(0, false));
        let mut cursor = Cursor::new();
        view.place_cursor(&mut cursor, &buf);
        let screen = rendered(&view, &buf, &cursor, &Footer::default(), None);
        assert!(screen.starts_with("abcdefgh\x1b[K\r\n"));
    }

    #[test]
    fn render_starts_at_col_offset() {
        let buf = TextBuffer::from_text("abcdefghijklmnop\n");
        let mut view = Viewport::new(size(8, 4), &config(0, false));
        let mut cursor = cursor_at(0, 12, &buf);
        view.place_cursor(&mut cursor, &buf);
        assert_eq!(view.col_offset(), 5);
        assert_eq!(cursor.rendered(), (7, 0));
        let screen = rendered(&view, &buf, &cursor, &Footer::default(), None);
        assert!(screen.starts_with("fghijklm\x1b[K\r\n"));
    }

    #[test]
    fn render_highlights_matches() {
        let buf = TextBuffer::from_text("a foo b\n");
        let mut finder = Finder::new();
        for ch in "foo".chars() {
            finder.push_char(ch);
        }
        finder.find(&buf);

        let mut view = Viewport::new(size(40, 4), &config(0, false));
        let mut cursor = Cursor::new();
        view.place_cursor(&mut cursor, &buf);
        let screen = rendered(&view, &buf, &cursor, &Footer::default(), Some(&finder));
        assert!(screen.starts_with("a \x1b[30;43mfoo\x1b[0m b\x1b[K"));
    }

    #[test]
    fn highlight_spans_follow_tabs() {
        let buf = TextBuffer::from_text("\tfoo\n");
        let mut finder = Finder::new();
        for ch in "foo".chars() {
            finder.push_char(ch);
        }
        finder.find(&buf);
        let spans = highlight_spans(&finder, 0, buf.line(0).unwrap(), 4);
        assert_eq!(spans, vec![4..7]);
    }

    #[test]
    fn control_chars_are_masked() {
        let buf = TextBuffer::from_text("a\x1bb\n");
        let mut view = Viewport::new(size(20, 4), &config(0, false));
        let mut cursor = Cursor::new();
        view.place_cursor(&mut cursor, &buf);
        let screen = rendered(&view, &buf, &cursor, &Footer::default(), None);
        assert!(screen.starts_with("a?b\x1b[K"));
    }

    // -- Status line --------------------------------------------------------

    #[test]
    fn status_line_layout() {
        let mut buf = TextBuffer::from_text("x\n");
        buf.set_path("notes.txt".into());
        buf.set_dirty();
        let cursor = cursor_at(0, 1, &buf);
        let footer = Footer {
            hint: "",
            message: "Saved",
            clipboard: true,
        };
        let line = status_line(200, &buf, &cursor, &footer);

        let left = "[1:2] [lines: 1] [file: notes.txt*] [clipboard: 1 line]";
        assert!(line.starts_with(left));
        assert!(line.ends_with("Saved"));

        let half = (200 - BANNER.len()) / 2;
        let banner_at = line.find(BANNER).unwrap();
        assert_eq!(banner_at, half);
        assert_eq!(line.len(), half * 2 + BANNER.len());
    }

    #[test]
    fn status_line_on_narrow_terminal_has_no_padding() {
        let buf = TextBuffer::new();
        let cursor = Cursor::new();
        let line = status_line(10, &buf, &cursor, &Footer::default());
        assert_eq!(line, format!("[1:1] [lines: 1] [file: [No Name]]{BANNER}"));
    }
}
