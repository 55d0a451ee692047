//! Error types for the editor core.
//!
//! Bounds errors are local and recoverable: the caller either ignores them
//! (the operation becomes a no-op) or turns them into a status message.
//! I/O errors are wrapped so load/save can surface them with context.

use std::io;

use thiserror::Error;

/// A failed [`TextBuffer`](crate::buffer::TextBuffer) operation.
///
/// A bounds error never leaves the buffer partially mutated.
#[derive(Debug, Error)]
pub enum BufferError {
    #[error("row {row} is out of bounds (buffer has {line_count} lines)")]
    RowOutOfBounds { row: usize, line_count: usize },

    #[error("column {col} is out of bounds for row {row} (length {len})")]
    ColumnOutOfBounds { row: usize, col: usize, len: usize },

    #[error("line content for row {row} contains a line break")]
    EmbeddedNewline { row: usize },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl BufferError {
    /// True for the two bounds errors, false for everything else.
    #[must_use]
    pub const fn is_bounds(&self) -> bool {
        matches!(
            self,
            Self::RowOutOfBounds { .. } | Self::ColumnOutOfBounds { .. }
        )
    }
}

/// A failed configuration read or write.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file error: {0}")]
    Io(#[from] io::Error),

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
}
