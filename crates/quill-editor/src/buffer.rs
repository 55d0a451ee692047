//! Text buffer — the document being edited.
//!
//! A `TextBuffer` is an ordered array of [`Line`]s. Each line keeps its raw
//! content as a `Vec<char>` (so columns are code-point offsets with O(1)
//! indexing) and a cached `render` string with tabs expanded to spaces.
//!
//! # Invariants
//!
//! - **Never empty.** A new or fully cleared buffer holds exactly one empty
//!   line. Removing the only line clears it instead.
//! - **Render is always fresh.** Every operation that touches `content`
//!   recomputes `render` with the current tab size before returning.
//! - **Bounds errors do not mutate.** Every coordinate is validated before
//!   anything changes.
//! - **Dirty means unsaved.** Each successful mutation sets the flag; a
//!   successful save clears it.
//!
//! # File format
//!
//! Plain text split on `\n`. A trailing `\r` on each line is dropped on
//! load. On save every line, including the last, is followed by one `\n`.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::BufferError;
use crate::position::Position;

/// Tab width used when no configuration says otherwise.
pub const DEFAULT_TAB_SIZE: usize = 4;

/// Display name for a buffer with no backing file.
pub const NO_NAME: &str = "[No Name]";

type Result<T> = std::result::Result<T, BufferError>;

// ---------------------------------------------------------------------------
// Tab rendering
// ---------------------------------------------------------------------------

/// Expand tabs to spaces up to the next multiple of `tab_size`.
///
/// ```
/// use quill_editor::buffer::render_tabs;
///
/// let line: Vec<char> = "a\tb".chars().collect();
/// assert_eq!(render_tabs(&line, 4), "a   b");
/// ```
#[must_use]
pub fn render_tabs(content: &[char], tab_size: usize) -> String {
    let tab_size = tab_size.max(1);
    let mut out = String::with_capacity(content.len());
    let mut col = 0;
    for &ch in content {
        if ch == '\t' {
            let n = tab_size - (col % tab_size);
            out.extend(std::iter::repeat_n(' ', n));
            col += n;
        } else {
            out.push(ch);
            col += 1;
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Line
// ---------------------------------------------------------------------------

/// One line of the document: raw content plus its tab-expanded rendering.
#[derive(Clone, PartialEq, Eq)]
pub struct Line {
    content: Vec<char>,
    render: String,
}

impl Line {
    fn new(content: Vec<char>, tab_size: usize) -> Self {
        let render = render_tabs(&content, tab_size);
        Self { content, render }
    }

    /// The raw characters, tabs included.
    #[inline]
    #[must_use]
    pub fn content(&self) -> &[char] {
        &self.content
    }

    /// The content with tabs expanded.
    #[inline]
    #[must_use]
    pub fn render(&self) -> &str {
        &self.render
    }

    /// Length in chars.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.content.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    fn set_content(&mut self, content: Vec<char>, tab_size: usize) {
        self.content = content;
        self.rerender(tab_size);
    }

    fn rerender(&mut self, tab_size: usize) {
        self.render = render_tabs(&self.content, tab_size);
    }
}

impl fmt::Debug for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text: String = self.content.iter().collect();
        write!(f, "Line({text:?})")
    }
}

// ---------------------------------------------------------------------------
// TextBuffer
// ---------------------------------------------------------------------------

/// The single document of an editing session.
///
/// # Coordinate system
///
/// `row` indexes lines, `col` indexes chars within a line. A column equal to
/// the line length is valid for insertion ("after the last character").
pub struct TextBuffer {
    lines: Vec<Line>,
    path: Option<PathBuf>,
    dirty: bool,
    tab_size: usize,
}

impl TextBuffer {
    // -- Construction -------------------------------------------------------

    /// An empty, unnamed buffer with one empty line.
    #[must_use]
    pub fn new() -> Self {
        Self::with_tab_size(DEFAULT_TAB_SIZE)
    }

    /// An empty buffer that renders tabs `tab_size` wide.
    #[must_use]
    pub fn with_tab_size(tab_size: usize) -> Self {
        let tab_size = tab_size.max(1);
        Self {
            lines: vec![Line::new(Vec::new(), tab_size)],
            path: None,
            dirty: false,
            tab_size,
        }
    }

    /// A clean buffer holding `text`, split the same way [`load`](Self::load)
    /// splits a file.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        let mut buf = Self::new();
        buf.replace_all(split_lines(text));
        buf
    }

    /// Open `path` for editing.
    ///
    /// A path that does not exist yields an empty buffer bound to that path;
    /// the file is created on first save.
    ///
    /// # Errors
    ///
    /// Returns an error if the path exists but cannot be read.
    pub fn open(path: &Path, tab_size: usize) -> Result<Self> {
        let mut buf = Self::with_tab_size(tab_size);
        buf.set_path(path.to_path_buf());

        match File::open(path) {
            Ok(file) => {
                buf.load(BufReader::new(file))?;
                debug!(path = %path.display(), lines = buf.line_count(), "loaded file");
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "new file");
            }
            Err(err) => return Err(err.into()),
        }
        Ok(buf)
    }

    // -- Queries ------------------------------------------------------------

    /// Number of lines. Always at least 1.
    #[inline]
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Length of `row` in chars, or 0 if `row` does not exist.
    #[inline]
    #[must_use]
    pub fn line_length(&self, row: usize) -> usize {
        self.lines.get(row).map_or(0, Line::len)
    }

    /// The raw content of `row`.
    ///
    /// # Errors
    ///
    /// [`BufferError::RowOutOfBounds`] if `row >= line_count()`.
    pub fn get_line(&self, row: usize) -> Result<&[char]> {
        self.check_row(row).map(|()| self.lines[row].content())
    }

    /// The whole [`Line`] at `row` (content and render), if it exists.
    #[inline]
    #[must_use]
    pub fn line(&self, row: usize) -> Option<&Line> {
        self.lines.get(row)
    }

    /// Iterate over all lines in order.
    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.lines.iter()
    }

    /// The full text, each line followed by `\n`. Exactly what
    /// [`save`](Self::save) writes.
    #[must_use]
    pub fn contents(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.extend(line.content.iter());
            out.push('\n');
        }
        out
    }

    // -- Line operations ----------------------------------------------------

    /// Insert a new line with `content` before `row`. `row == line_count()`
    /// appends.
    ///
    /// # Errors
    ///
    /// [`BufferError::RowOutOfBounds`] if `row > line_count()`,
    /// [`BufferError::EmbeddedNewline`] if `content` holds a line break.
    pub fn insert_line(&mut self, row: usize, content: Vec<char>) -> Result<()> {
        if row > self.lines.len() {
            return Err(self.row_error(row));
        }
        check_single_line(row, &content)?;
        self.lines.insert(row, Line::new(content, self.tab_size));
        self.set_dirty();
        Ok(())
    }

    /// Remove `row` and return its content.
    ///
    /// Removing the only line clears it, so the buffer never has zero lines.
    ///
    /// # Errors
    ///
    /// [`BufferError::RowOutOfBounds`] if `row >= line_count()`.
    pub fn remove_line(&mut self, row: usize) -> Result<Vec<char>> {
        self.check_row(row)?;
        let removed = if self.lines.len() == 1 {
            let old = std::mem::take(&mut self.lines[0].content);
            self.lines[0].rerender(self.tab_size);
            old
        } else {
            self.lines.remove(row).content
        };
        self.set_dirty();
        Ok(removed)
    }

    /// Replace the content of `row`.
    ///
    /// # Errors
    ///
    /// [`BufferError::RowOutOfBounds`] if `row >= line_count()`,
    /// [`BufferError::EmbeddedNewline`] if `content` holds a line break.
    pub fn replace_line(&mut self, row: usize, content: Vec<char>) -> Result<()> {
        self.check_row(row)?;
        check_single_line(row, &content)?;
        self.lines[row].set_content(content, self.tab_size);
        self.set_dirty();
        Ok(())
    }

    // -- Character operations -----------------------------------------------

    /// Insert `ch` at `(row, col)`, shifting the rest of the line right.
    ///
    /// Line breaks go through [`split_line_at`](Self::split_line_at).
    ///
    /// # Errors
    ///
    /// Bounds errors if `row` does not exist or `col > line_length(row)`.
    /// [`BufferError::EmbeddedNewline`] if `ch` is `\n` or `\r`.
    pub fn insert_character(&mut self, row: usize, col: usize, ch: char) -> Result<()> {
        self.check_col(row, col)?;
        if is_line_break(ch) {
            return Err(BufferError::EmbeddedNewline { row });
        }
        let line = &mut self.lines[row];
        line.content.insert(col, ch);
        line.rerender(self.tab_size);
        self.set_dirty();
        Ok(())
    }

    /// Remove the char just before `col` on `row` and return it.
    ///
    /// # Errors
    ///
    /// Bounds errors if `row` does not exist or `col` is not in
    /// `1..=line_length(row)`.
    pub fn delete_character_before(&mut self, row: usize, col: usize) -> Result<char> {
        self.check_col(row, col)?;
        if col == 0 {
            return Err(BufferError::ColumnOutOfBounds {
                row,
                col,
                len: self.lines[row].len(),
            });
        }
        let line = &mut self.lines[row];
        let removed = line.content.remove(col - 1);
        line.rerender(self.tab_size);
        self.set_dirty();
        Ok(removed)
    }

    /// Break `row` at `col`; everything from `col` on moves to a new line
    /// below.
    ///
    /// At column 0 this inserts an empty line above; at the end of the line
    /// it appends an empty line below. Either way the cursor belongs at the
    /// returned `(row + 1, 0)`.
    ///
    /// # Errors
    ///
    /// Bounds errors if `(row, col)` is not a valid cursor position.
    pub fn split_line_at(&mut self, row: usize, col: usize) -> Result<Position> {
        self.check_col(row, col)?;
        let len = self.lines[row].len();

        if col == 0 {
            self.lines.insert(row, Line::new(Vec::new(), self.tab_size));
        } else if col == len {
            self.lines.insert(row + 1, Line::new(Vec::new(), self.tab_size));
        } else {
            let tail = self.lines[row].content.split_off(col);
            self.lines[row].rerender(self.tab_size);
            self.lines.insert(row + 1, Line::new(tail, self.tab_size));
        }

        self.set_dirty();
        Ok(Position::new(row + 1, 0))
    }

    /// Join `row` onto the end of `row - 1` and return where the join
    /// happened, which is where the cursor belongs.
    ///
    /// Row 0 has nothing above it: returns `(0, 0)` and changes nothing.
    ///
    /// # Errors
    ///
    /// [`BufferError::RowOutOfBounds`] if `row >= line_count()`.
    pub fn merge_with_previous(&mut self, row: usize) -> Result<Position> {
        self.check_row(row)?;
        if row == 0 {
            return Ok(Position::ZERO);
        }

        let tail = self.lines.remove(row).content;
        let prev = &mut self.lines[row - 1];
        let join_col = prev.len();
        prev.content.extend(tail);
        prev.rerender(self.tab_size);

        self.set_dirty();
        Ok(Position::new(row - 1, join_col))
    }

    // -- I/O ----------------------------------------------------------------

    /// Replace every line with the contents of `reader`.
    ///
    /// Invalid UTF-8 is decoded lossily. Empty input leaves one empty line.
    /// The buffer is clean afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::Io`] if reading fails; the buffer is unchanged.
    pub fn load(&mut self, mut reader: impl BufRead) -> Result<()> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let text = String::from_utf8_lossy(&bytes);
        self.replace_all(split_lines(&text));
        Ok(())
    }

    /// Write every line followed by `\n` to `writer`. Returns the number of
    /// bytes written.
    ///
    /// Does not touch the dirty flag; [`save_to_file`](Self::save_to_file)
    /// does that once the bytes are on disk.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::Io`] if writing fails. Partial writes are
    /// possible.
    pub fn save(&self, mut writer: impl Write) -> Result<usize> {
        let text = self.contents();
        writer.write_all(text.as_bytes())?;
        writer.flush()?;
        Ok(text.len())
    }

    /// Write the buffer to its backing file, creating or truncating it, and
    /// mark the buffer clean.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer has no path or the write fails. The
    /// buffer stays dirty on failure.
    pub fn save_to_file(&mut self) -> Result<usize> {
        let path = self.path.as_deref().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "buffer has no file path")
        })?;
        let file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        let written = self.save(BufWriter::new(file))?;
        debug!(path = %path.display(), bytes = written, "saved file");
        self.mark_clean();
        Ok(written)
    }

    // -- Metadata -----------------------------------------------------------

    /// The backing file path, if any.
    #[inline]
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Bind the buffer to `path` for future saves.
    pub fn set_path(&mut self, path: PathBuf) {
        self.path = Some(path);
    }

    /// The name shown in the status line: the path as given, or
    /// [`NO_NAME`].
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .as_deref()
            .map_or_else(|| NO_NAME.to_owned(), |p| p.display().to_string())
    }

    /// True if the content differs from what was last loaded or saved.
    #[inline]
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    pub const fn set_dirty(&mut self) {
        self.dirty = true;
    }

    #[inline]
    pub const fn mark_clean(&mut self) {
        self.dirty = false;
    }

    #[inline]
    #[must_use]
    pub const fn tab_size(&self) -> usize {
        self.tab_size
    }

    /// Change the tab width and re-render every line.
    pub fn set_tab_size(&mut self, tab_size: usize) {
        self.tab_size = tab_size.max(1);
        for line in &mut self.lines {
            line.rerender(self.tab_size);
        }
    }

    // -- Internals ----------------------------------------------------------

    fn replace_all(&mut self, lines: Vec<Vec<char>>) {
        self.lines = lines
            .into_iter()
            .map(|content| Line::new(content, self.tab_size))
            .collect();
        if self.lines.is_empty() {
            self.lines.push(Line::new(Vec::new(), self.tab_size));
        }
        self.mark_clean();
    }

    fn row_error(&self, row: usize) -> BufferError {
        BufferError::RowOutOfBounds {
            row,
            line_count: self.lines.len(),
        }
    }

    fn check_row(&self, row: usize) -> Result<()> {
        if row < self.lines.len() {
            Ok(())
        } else {
            Err(self.row_error(row))
        }
    }

    fn check_col(&self, row: usize, col: usize) -> Result<()> {
        self.check_row(row)?;
        let len = self.lines[row].len();
        if col <= len {
            Ok(())
        } else {
            Err(BufferError::ColumnOutOfBounds { row, col, len })
        }
    }
}

#[inline]
const fn is_line_break(ch: char) -> bool {
    matches!(ch, '\n' | '\r')
}

/// A line's content may not contain `\n` or `\r`.
fn check_single_line(row: usize, content: &[char]) -> Result<()> {
    if content.iter().any(|&ch| is_line_break(ch)) {
        Err(BufferError::EmbeddedNewline { row })
    } else {
        Ok(())
    }
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TextBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextBuffer")
            .field("lines", &self.lines.len())
            .field("path", &self.path)
            .field("dirty", &self.dirty)
            .field("tab_size", &self.tab_size)
            .finish()
    }
}

/// Split text into lines on `\n`, dropping one trailing `\r` per line.
///
/// A final `\n` does not start another line, so `"a\n"` is one line.
fn split_lines(text: &str) -> Vec<Vec<char>> {
    let body = text.strip_suffix('\n').unwrap_or(text);
    if body.is_empty() && text.is_empty() {
        return Vec::new();
    }
    body.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line).chars().collect())
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
