//! Literal substring search with cyclic navigation.
//!
//! The query is edited one char at a time and only searched when the user
//! commits it, so typing never moves the cursor. Matches are recorded in
//! document order (row, then column) and do not overlap: after a hit the
//! scan resumes at the end of the match.
//!
//! `first` / `next` / `previous` return `None` when there are no matches.

use crate::buffer::TextBuffer;
use crate::position::Position;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Finder {
    query: String,
    /// The query as last committed with [`find`](Self::find).
    searched: Vec<char>,
    matches: Vec<Position>,
    current: usize,
}

impl Finder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -- Query editing ------------------------------------------------------

    /// The live query text.
    #[inline]
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Append `ch` if it is printable or a tab. Returns whether it was taken.
    pub fn push_char(&mut self, ch: char) -> bool {
        if ch == '\t' || !ch.is_control() {
            self.query.push(ch);
            true
        } else {
            false
        }
    }

    /// Drop the last char of the query, if any.
    pub fn pop_char(&mut self) {
        self.query.pop();
    }

    // -- Search -------------------------------------------------------------

    /// Search `buf` for the current query, replacing all previous matches.
    /// An empty query finds nothing. Returns the number of matches.
    pub fn find(&mut self, buf: &TextBuffer) -> usize {
        self.searched = self.query.chars().collect();
        self.matches.clear();
        self.current = 0;

        if self.searched.is_empty() {
            return 0;
        }

        for (row, line) in buf.lines().enumerate() {
            let mut from = 0;
            while let Some(col) = find_in(line.content(), &self.searched, from) {
                self.matches.push(Position::new(row, col));
                from = col + self.searched.len();
            }
        }
        self.matches.len()
    }

    /// Forget the query and every match.
    pub fn reset(&mut self) {
        self.query.clear();
        self.searched.clear();
        self.matches.clear();
        self.current = 0;
    }

    // -- Navigation ---------------------------------------------------------

    /// The first match, which also becomes the current one.
    pub fn first(&mut self) -> Option<Position> {
        self.current = 0;
        self.matches.first().copied()
    }

    /// The match after the current one, wrapping to the first.
    pub fn next(&mut self) -> Option<Position> {
        let n = self.matches.len();
        if n == 0 {
            return None;
        }
        self.current = (self.current + 1) % n;
        Some(self.matches[self.current])
    }

    /// The match before the current one, wrapping to the last.
    pub fn previous(&mut self) -> Option<Position> {
        let n = self.matches.len();
        if n == 0 {
            return None;
        }
        self.current = (self.current + n - 1) % n;
        Some(self.matches[self.current])
    }

    // -- Queries ------------------------------------------------------------

    #[inline]
    #[must_use]
    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    /// 0-based index of the current match, if there are any.
    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        (!self.matches.is_empty()).then_some(self.current)
    }

    #[inline]
    #[must_use]
    pub fn matches(&self) -> &[Position] {
        &self.matches
    }

    /// Length in chars of the committed query, i.e. of every match.
    #[inline]
    #[must_use]
    pub fn match_len(&self) -> usize {
        self.searched.len()
    }

    /// Matches on `row`, as column ranges.
    pub fn matches_on_row(&self, row: usize) -> impl Iterator<Item = std::ops::Range<usize>> + '_ {
        let len = self.match_len();
        self.matches
            .iter()
            .filter(move |m| m.row == row)
            .map(move |m| m.col..m.col + len)
    }
}

/// Index of the first occurrence of `needle` in `hay` at or after `from`.
fn find_in(hay: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.len() > hay.len() {
        return None;
    }
    (from..=hay.len() - needle.len()).find(|&i| hay[i..i + needle.len()] == *needle)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
