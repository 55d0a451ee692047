// SPDX-License-Identifier: MIT
//
// quill-term — Terminal plumbing for the quill editor.
//
// Raw mode and the alternate screen via termios, a key decoder for the
// byte stream a VT100-style terminal sends, a background input task that
// feeds a bounded queue, a one-shot shutdown signal, and an event loop
// that repaints the whole screen through a single buffered write.
//
// No TUI framework sits underneath. Every escape sequence the editor
// emits comes from `ansi`, and every byte it reads goes through `input`.

pub mod ansi;
pub mod event_loop;
pub mod input;
pub mod output;
pub mod reader;
pub mod shutdown;
pub mod terminal;
