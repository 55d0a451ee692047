//! # quill-editor — Editor core for quill
//!
//! The building blocks the editor binary wires together:
//!
//! - **[`buffer`]** — `TextBuffer`, a line array with a tab-expanded render cache
//! - **[`position`]** — `Position` (row, col), 0-indexed, columns in chars
//! - **[`cursor`]** — edit point with a sticky column for vertical movement
//! - **[`view`]** — `Viewport`: scrolling, gutter, and full-screen rendering
//! - **[`finder`]** — literal substring search with cyclic navigation
//! - **[`command`]** — key-bound command registry, ordered for the hint bar
//! - **[`mode`]** — `Edit` and `Find`
//! - **[`config`]** — the `~/.quill.conf` file
//! - **[`error`]** — `BufferError` and `ConfigError`

pub mod buffer;
pub mod command;
pub mod config;
pub mod cursor;
pub mod error;
pub mod finder;
pub mod mode;
pub mod position;
pub mod view;
