// SPDX-License-Identifier: MIT
//
// The editor controller — owns the document, cursor, viewport and finder,
// runs the Edit/Find mode machine, and implements the event loop's `App`.
//
// Each key goes through two stages:
//
//   1. The current mode's command registry. A bound key runs its command
//      and nothing else happens.
//   2. The mode's fallback: cursor movement and text entry in Edit mode,
//      query editing and match navigation in Find mode.
//
// Scroll offsets and the cursor's screen position are recomputed at paint
// time, after every key, so no handler has to remember to do it.

use std::io;
use std::path::Path;
use std::time::{Duration, Instant};

use quill_editor::buffer::TextBuffer;
use quill_editor::command::CommandRegistry;
use quill_editor::config::Config;
use quill_editor::cursor::Cursor;
use quill_editor::error::BufferError;
use quill_editor::finder::Finder;
use quill_editor::mode::Mode;
use quill_editor::position::Position;
use quill_editor::view::{Footer, Viewport};

use quill_term::event_loop::{Action, App};
use quill_term::input::{KeyCode, KeyEvent};
use quill_term::output::OutputBuffer;
use quill_term::shutdown::Shutdown;
use quill_term::terminal::Size;

use tracing::{debug, error, info, warn};

/// How long a status message stays on screen.
pub const STATUS_TTL: Duration = Duration::from_secs(3);

/// Shutdown message for a clean quit.
pub const QUIT_MESSAGE: &str = "Ctrl-Q";

const UNSAVED_WARNING: &str = "Unsaved changes! Press Ctrl-Q again to quit without saving.";

// ─── Status messages ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A transient message in the status line.
#[derive(Debug, Clone)]
struct Status {
    text: String,
    severity: Severity,
    since: Instant,
}

// ─── Editor ─────────────────────────────────────────────────────────────────

/// The editor application state.
pub struct Editor {
    buffer: TextBuffer,
    cursor: Cursor,
    view: Viewport,
    finder: Finder,
    config: Config,
    mode: Mode,

    edit_commands: CommandRegistry<Self>,
    find_commands: CommandRegistry<Self>,

    /// One cut or copied line, pasted above the cursor by Ctrl-V. Never
    /// holds an empty line.
    clipboard: Option<Vec<char>>,

    status: Option<Status>,

    /// Set by the first quit on a dirty buffer. Never cleared: any later
    /// quit goes through.
    quit_armed: bool,
}

impl Editor {
    /// An editor over `buffer`, sized for `size`.
    pub fn new(mut buffer: TextBuffer, config: Config, size: Size) -> Self {
        buffer.set_tab_size(config.tab_size);
        Self {
            view: Viewport::new(size, &config),
            buffer,
            cursor: Cursor::new(),
            finder: Finder::new(),
            config,
            mode: Mode::Edit,
            edit_commands: edit_commands(),
            find_commands: find_commands(),
            clipboard: None,
            status: None,
            quit_armed: false,
        }
    }

    /// Open `path` for editing. A missing file starts an empty buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn open(path: &Path, config: Config, size: Size) -> Result<Self, BufferError> {
        let buffer = TextBuffer::open(path, config.tab_size)?;
        Ok(Self::new(buffer, config, size))
    }

    // -- Accessors ----------------------------------------------------------

    pub const fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    pub const fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub const fn mode(&self) -> Mode {
        self.mode
    }

    pub const fn finder(&self) -> &Finder {
        &self.finder
    }

    pub const fn view(&self) -> &Viewport {
        &self.view
    }

    /// The status message on screen, if any.
    pub fn status(&self) -> Option<(&str, Severity)> {
        self.status.as_ref().map(|s| (s.text.as_str(), s.severity))
    }

    // -- Status -------------------------------------------------------------

    fn set_status(&mut self, severity: Severity, text: impl Into<String>) {
        let text = text.into();
        match severity {
            Severity::Info => debug!(status = %text),
            Severity::Warning => warn!(status = %text),
            Severity::Error => error!(status = %text),
        }
        self.status = Some(Status {
            text,
            severity,
            since: Instant::now(),
        });
    }

    /// Drop the status message once it is older than [`STATUS_TTL`].
    pub fn expire_status(&mut self, now: Instant) {
        if self
            .status
            .as_ref()
            .is_some_and(|s| now.saturating_duration_since(s.since) >= STATUS_TTL)
        {
            self.status = None;
        }
    }

    // -- Commands -----------------------------------------------------------

    fn commands_mut(&mut self, mode: Mode) -> &mut CommandRegistry<Self> {
        match mode {
            Mode::Edit => &mut self.edit_commands,
            Mode::Find => &mut self.find_commands,
        }
    }

    /// An empty line leaves nothing to paste.
    fn set_clipboard(&mut self, line: Vec<char>) {
        self.clipboard = (!line.is_empty()).then_some(line);
    }

    fn save(&mut self) -> Action {
        match self.buffer.save_to_file() {
            Ok(bytes) => {
                info!(bytes, file = %self.buffer.file_name(), "saved");
                self.set_status(Severity::Info, format!("{bytes} bytes written to disk"));
            }
            Err(err) => self.set_status(Severity::Error, format!("Save failed: {err}")),
        }
        Action::Continue
    }

    fn quit(&mut self) -> Action {
        if self.buffer.is_dirty() && !self.quit_armed {
            self.quit_armed = true;
            self.set_status(Severity::Warning, UNSAVED_WARNING);
            return Action::Continue;
        }
        Action::Quit(Shutdown::quit(QUIT_MESSAGE))
    }

    fn toggle_find(&mut self) -> Action {
        self.finder.reset();
        self.mode = self.mode.toggled();
        debug!(mode = %self.mode, "mode changed");
        Action::Continue
    }

    fn cut_line(&mut self) -> Action {
        let row = self.cursor.row();
        match self.buffer.remove_line(row) {
            Ok(line) => {
                self.set_clipboard(line);
                self.cursor.clamp(&self.buffer);
                self.set_status(Severity::Info, "Cut line");
            }
            Err(err) => warn!(%err, "cut rejected"),
        }
        Action::Continue
    }

    fn copy_line(&mut self) -> Action {
        match self.buffer.get_line(self.cursor.row()).map(<[char]>::to_vec) {
            Ok(line) => {
                self.set_clipboard(line);
                self.set_status(Severity::Info, "Copied line");
            }
            Err(err) => warn!(%err, "copy rejected"),
        }
        Action::Continue
    }

    fn paste_line(&mut self) -> Action {
        let Some(line) = self.clipboard.clone() else {
            self.set_status(Severity::Info, "Clipboard is empty");
            return Action::Continue;
        };
        let row = self.cursor.row();
        let result = self
            .buffer
            .insert_line(row, line)
            .map(|()| Position::new(row, 0));
        self.apply_edit(result);
        Action::Continue
    }

    // -- Edit mode ----------------------------------------------------------

    fn handle_edit(&mut self, key: KeyEvent) {
        let buf = &self.buffer;
        match key.code {
            KeyCode::Up => self.cursor.move_up(buf),
            KeyCode::Down => self.cursor.move_down(buf),
            KeyCode::Left => self.cursor.move_left(buf),
            KeyCode::Right => self.cursor.move_right(buf),
            KeyCode::Home => self.cursor.move_home(),
            KeyCode::End => self.cursor.move_end(buf),
            KeyCode::PageUp => self.cursor.page_up(self.view.page_step(), buf),
            KeyCode::PageDown => self.cursor.page_down(self.view.page_step(), buf),
            KeyCode::Backspace | KeyCode::Delete => self.backspace(),
            KeyCode::Enter => {
                let Position { row, col } = self.cursor.position();
                let result = self.buffer.split_line_at(row, col);
                self.apply_edit(result);
            }
            KeyCode::Tab => {
                for ch in self.config.indent().chars() {
                    self.insert_char(ch);
                }
            }
            _ => {
                if let Some(ch) = key.printable() {
                    self.insert_char(ch);
                }
            }
        }
    }

    fn insert_char(&mut self, ch: char) {
        let Position { row, col } = self.cursor.position();
        let result = self
            .buffer
            .insert_character(row, col, ch)
            .map(|()| Position::new(row, col + 1));
        self.apply_edit(result);
    }

    /// Delete left of the cursor, joining lines at column 0. A no-op at the
    /// very start of the buffer.
    fn backspace(&mut self) {
        let Position { row, col } = self.cursor.position();
        if col > 0 {
            let result = self
                .buffer
                .delete_character_before(row, col)
                .map(|_| Position::new(row, col - 1));
            self.apply_edit(result);
        } else if row > 0 {
            let result = self.buffer.merge_with_previous(row);
            self.apply_edit(result);
        }
    }

    /// Move to where an edit left the cursor, or log why it was refused.
    fn apply_edit(&mut self, result: Result<Position, BufferError>) {
        match result {
            Ok(pos) => {
                self.cursor.move_to(pos, &self.buffer);
                self.status = None;
            }
            Err(err) => warn!(%err, "edit rejected"),
        }
    }

    // -- Find mode ----------------------------------------------------------

    fn handle_find(&mut self, key: KeyEvent) {
        let hit = match key.code {
            KeyCode::Enter => {
                let count = self.finder.find(&self.buffer);
                debug!(query = self.finder.query(), count, "search");
                self.finder.first()
            }
            KeyCode::Right | KeyCode::Down => self.finder.next(),
            KeyCode::Left | KeyCode::Up => self.finder.previous(),
            KeyCode::Backspace | KeyCode::Delete => {
                self.finder.pop_char();
                None
            }
            KeyCode::Tab => {
                self.finder.push_char('\t');
                None
            }
            _ => {
                if let Some(ch) = key.printable() {
                    self.finder.push_char(ch);
                }
                None
            }
        };

        if let Some(pos) = hit {
            self.cursor.move_to(pos, &self.buffer);
        }
    }

    fn find_hint(&self) -> String {
        let mut hint = format!(
            "Ctrl-F: Exit find | Enter: Search | Next: →↓ | Prev: ←↑ | [searching for: {}_]",
            self.finder.query()
        );
        if let Some(idx) = self.finder.current_index() {
            hint.push_str(&format!(" [match: {}/{}]", idx + 1, self.finder.match_count()));
        }
        hint
    }
}

// ─── Command tables ─────────────────────────────────────────────────────────

fn edit_commands() -> CommandRegistry<Editor> {
    let mut reg = CommandRegistry::new();
    reg.register(KeyEvent::ctrl('s'), "Ctrl-S", "Save", Editor::save);
    reg.register(KeyEvent::ctrl('q'), "Ctrl-Q", "Quit", Editor::quit);
    reg.register(KeyEvent::ctrl('f'), "Ctrl-F", "Find", Editor::toggle_find);
    reg.register(KeyEvent::ctrl('x'), "Ctrl-X", "Cut line", Editor::cut_line);
    reg.register(KeyEvent::ctrl('c'), "Ctrl-C", "Copy line", Editor::copy_line);
    reg.register(KeyEvent::ctrl('v'), "Ctrl-V", "Paste line", Editor::paste_line);
    reg
}

fn find_commands() -> CommandRegistry<Editor> {
    let mut reg = CommandRegistry::new();
    reg.register(KeyEvent::ctrl('q'), "Ctrl-Q", "Quit", Editor::quit);
    reg.register(KeyEvent::ctrl('f'), "Ctrl-F", "Exit find", Editor::toggle_find);
    reg
}

// ─── App ────────────────────────────────────────────────────────────────────

impl App for Editor {
    fn on_key(&mut self, key: KeyEvent) -> Action {
        // Commands get `&mut self`, so the table is lent out while one runs.
        let mode = self.mode;
        let commands = std::mem::take(self.commands_mut(mode));
        let action = commands.execute(key, self);
        *self.commands_mut(mode) = commands;
        if let Some(action) = action {
            return action;
        }

        match self.mode {
            Mode::Edit => self.handle_edit(key),
            Mode::Find => self.handle_find(key),
        }
        Action::Continue
    }

    fn on_resize(&mut self, size: Size) {
        self.view.resize(size);
    }

    fn on_tick(&mut self) {
        self.expire_status(Instant::now());
    }

    fn paint(&mut self, out: &mut OutputBuffer, size: Size) -> io::Result<()> {
        self.view.resize(size);
        self.view.place_cursor(&mut self.cursor, &self.buffer);

        let hint = match self.mode {
            Mode::Edit => self.edit_commands.hint_line(),
            Mode::Find => self.find_hint(),
        };
        let footer = Footer {
            hint: &hint,
            message: self.status.as_ref().map_or("", |s| s.text.as_str()),
            clipboard: self.clipboard.is_some(),
        };
        let highlight = self.mode.is_find().then_some(&self.finder);

        self.view
            .render(out, &self.buffer, &self.cursor, &footer, highlight)
    }

    fn cursor(&self) -> Option<(u16, u16)> {
        Some(self.cursor.rendered())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    // ── Helpers ───────────────────────────────────────────────────────────

    const SIZE: Size = Size { cols: 200, rows: 24 };

    fn editor_with(text: &str) -> Editor {
        Editor::new(TextBuffer::from_text(text), Config::default(), SIZE)
    }

    fn press(ed: &mut Editor, code: KeyCode) -> Action {
        ed.on_key(KeyEvent::plain(code))
    }

    fn ctrl(ed: &mut Editor, ch: char) -> Action {
        ed.on_key(KeyEvent::ctrl(ch))
    }

    fn feed(ed: &mut Editor, text: &str) {
        for ch in text.chars() {
            press(ed, KeyCode::Char(ch));
        }
    }

    fn lines(ed: &Editor) -> Vec<String> {
        ed.buffer()
            .lines()
            .map(|l| l.content().iter().collect())
            .collect()
    }

    fn pos(ed: &Editor) -> Position {
        ed.cursor().position()
    }

    fn status_text(ed: &Editor) -> Option<&str> {
        ed.status().map(|(text, _)| text)
    }

    fn painted(ed: &mut Editor) -> String {
        let mut out = OutputBuffer::new();
        ed.paint(&mut out, SIZE).unwrap();
        String::from_utf8(out.as_bytes().to_vec()).unwrap()
    }

    // ── Typing ────────────────────────────────────────────────────────────

    #[test]
    fn typing_inserts_at_cursor() {
        let mut ed = editor_with("");
        feed(&mut ed, "hi");
        assert_eq!(lines(&ed), vec!["hi"]);
        assert_eq!(pos(&ed), Position::new(0, 2));
        assert!(ed.buffer().is_dirty());
    }

    #[test]
    fn return_at_end_of_line() {
        let mut ed = editor_with("ab\ncd\n");
        press(&mut ed, KeyCode::End);
        press(&mut ed, KeyCode::Enter);
        assert_eq!(lines(&ed), vec!["ab", "", "cd"]);
        assert_eq!(pos(&ed), Position::new(1, 0));
    }

    #[test]
    fn return_mid_line_splits() {
        let mut ed = editor_with("hello\n");
        press(&mut ed, KeyCode::Right);
        press(&mut ed, KeyCode::Right);
        press(&mut ed, KeyCode::Enter);
        assert_eq!(lines(&ed), vec!["he", "llo"]);
        assert_eq!(pos(&ed), Position::new(1, 0));
    }

    #[test]
    fn backspace_at_line_start_merges() {
        let mut ed = editor_with("ab\ncd\n");
        press(&mut ed, KeyCode::Down);
        press(&mut ed, KeyCode::Backspace);
        assert_eq!(lines(&ed), vec!["abcd"]);
        assert_eq!(pos(&ed), Position::new(0, 2));
    }

    #[test]
    fn backspace_mid_line_deletes() {
        let mut ed = editor_with("abc\n");
        press(&mut ed, KeyCode::End);
        press(&mut ed, KeyCode::Delete);
        assert_eq!(lines(&ed), vec!["ab"]);
        assert_eq!(pos(&ed), Position::new(0, 2));
    }

    #[test]
    fn backspace_at_origin_is_noop() {
        let mut ed = editor_with("abc\n");
        press(&mut ed, KeyCode::Backspace);
        assert_eq!(lines(&ed), vec!["abc"]);
        assert!(!ed.buffer().is_dirty());
    }

    #[test]
    fn tab_inserts_literal_tab_by_default() {
        let mut ed = editor_with("");
        press(&mut ed, KeyCode::Tab);
        assert_eq!(lines(&ed), vec!["\t"]);
        assert_eq!(pos(&ed), Position::new(0, 1));
    }

    #[test]
    fn tab_expands_when_configured() {
        let config = Config {
            expand_tabs: true,
            tab_size: 2,
            ..Config::default()
        };
        let mut ed = Editor::new(TextBuffer::new(), config, SIZE);
        press(&mut ed, KeyCode::Tab);
        assert_eq!(lines(&ed), vec!["  "]);
        assert_eq!(pos(&ed), Position::new(0, 2));
    }

    #[test]
    fn control_keys_without_binding_are_ignored() {
        let mut ed = editor_with("x\n");
        ctrl(&mut ed, 'z');
        press(&mut ed, KeyCode::Escape);
        assert_eq!(lines(&ed), vec!["x"]);
        assert!(!ed.buffer().is_dirty());
    }

    #[test]
    fn page_down_moves_by_text_height() {
        let text: String = (0..100).map(|i| format!("{i}\n")).collect();
        let mut ed = editor_with(&text);
        press(&mut ed, KeyCode::PageDown);
        assert_eq!(pos(&ed).row, 22);
        press(&mut ed, KeyCode::PageUp);
        assert_eq!(pos(&ed).row, 0);
    }

    // ── Save & quit ───────────────────────────────────────────────────────

    #[test]
    fn save_writes_file_and_reports_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let mut ed = Editor::open(&path, Config::default(), SIZE).unwrap();
        feed(&mut ed, "abc");

        assert_eq!(ctrl(&mut ed, 's'), Action::Continue);
        assert_eq!(fs::read_to_string(&path).unwrap(), "abc\n");
        assert!(!ed.buffer().is_dirty());
        assert_eq!(
            ed.status(),
            Some(("4 bytes written to disk", Severity::Info))
        );
    }

    #[test]
    fn save_failure_keeps_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("out.txt");
        let mut ed = Editor::open(&path, Config::default(), SIZE).unwrap();
        feed(&mut ed, "x");

        assert_eq!(ctrl(&mut ed, 's'), Action::Continue);
        let (text, severity) = ed.status().unwrap();
        assert!(text.starts_with("Save failed: "));
        assert_eq!(severity, Severity::Error);
        assert!(ed.buffer().is_dirty());
    }

    #[test]
    fn clean_buffer_quits_immediately() {
        let mut ed = editor_with("x\n");
        assert_eq!(
            ctrl(&mut ed, 'q'),
            Action::Quit(Shutdown::quit(QUIT_MESSAGE))
        );
    }

    #[test]
    fn dirty_buffer_needs_second_quit() {
        let mut ed = editor_with("");
        feed(&mut ed, "x");

        assert_eq!(ctrl(&mut ed, 'q'), Action::Continue);
        assert_eq!(
            ed.status(),
            Some((UNSAVED_WARNING, Severity::Warning))
        );

        // More typing does not disarm the confirmation.
        feed(&mut ed, "y");
        assert_eq!(
            ctrl(&mut ed, 'q'),
            Action::Quit(Shutdown::quit(QUIT_MESSAGE))
        );
    }

    #[test]
    fn quit_works_in_find_mode() {
        let mut ed = editor_with("x\n");
        ctrl(&mut ed, 'f');
        assert!(matches!(ctrl(&mut ed, 'q'), Action::Quit(_)));
    }

    // ── Status messages ───────────────────────────────────────────────────

    #[test]
    fn status_expires_after_ttl() {
        let mut ed = editor_with("x\n");
        ctrl(&mut ed, 'c');
        let now = Instant::now();
        ed.expire_status(now);
        assert_eq!(status_text(&ed), Some("Copied line"));
        ed.expire_status(now + STATUS_TTL + Duration::from_millis(1));
        assert_eq!(status_text(&ed), None);
    }

    #[test]
    fn mutation_clears_status() {
        let mut ed = editor_with("x\n");
        ctrl(&mut ed, 'c');
        feed(&mut ed, "a");
        assert_eq!(status_text(&ed), None);
    }

    // ── Clipboard ─────────────────────────────────────────────────────────

    #[test]
    fn cut_and_paste_line() {
        let mut ed = editor_with("one\ntwo\nthree\n");
        press(&mut ed, KeyCode::Down);
        ctrl(&mut ed, 'x');
        assert_eq!(lines(&ed), vec!["one", "three"]);
        assert_eq!(status_text(&ed), Some("Cut line"));
        assert!(ed.buffer().is_dirty());

        press(&mut ed, KeyCode::Up);
        ctrl(&mut ed, 'v');
        assert_eq!(lines(&ed), vec!["two", "one", "three"]);
        assert_eq!(pos(&ed), Position::new(0, 0));
    }

    #[test]
    fn cut_last_line_clamps_cursor() {
        let mut ed = editor_with("a\nlonger\n");
        press(&mut ed, KeyCode::Down);
        press(&mut ed, KeyCode::End);
        ctrl(&mut ed, 'x');
        assert_eq!(lines(&ed), vec!["a"]);
        assert_eq!(pos(&ed), Position::new(0, 1));
    }

    #[test]
    fn cut_only_line_leaves_empty_line() {
        let mut ed = editor_with("solo\n");
        ctrl(&mut ed, 'x');
        assert_eq!(lines(&ed), vec![""]);
        assert_eq!(pos(&ed), Position::ZERO);
    }

    #[test]
    fn copy_does_not_modify() {
        let mut ed = editor_with("keep\n");
        ctrl(&mut ed, 'c');
        assert!(!ed.buffer().is_dirty());
        ctrl(&mut ed, 'v');
        assert_eq!(lines(&ed), vec!["keep", "keep"]);
    }

    #[test]
    fn copying_empty_line_leaves_nothing_to_paste() {
        let mut ed = editor_with("text\n\nmore\n");
        ctrl(&mut ed, 'c');
        press(&mut ed, KeyCode::Down);
        ctrl(&mut ed, 'c');
        ctrl(&mut ed, 'v');
        assert_eq!(lines(&ed), vec!["text", "", "more"]);
        assert_eq!(status_text(&ed), Some("Clipboard is empty"));
        assert!(!ed.buffer().is_dirty());
        assert!(!painted(&mut ed).contains("[clipboard: 1 line]"));
    }

    #[test]
    fn commands_stay_bound_after_running() {
        let mut ed = editor_with("x\n");
        ctrl(&mut ed, 'f');
        ctrl(&mut ed, 'f');
        assert_eq!(ed.mode(), Mode::Edit);
        ctrl(&mut ed, 'f');
        assert_eq!(ed.mode(), Mode::Find);
        assert!(painted(&mut ed).contains("Ctrl-F: Exit find"));
        ctrl(&mut ed, 'f');
        assert!(painted(&mut ed).contains("Ctrl-S: Save | Ctrl-Q: Quit"));
    }

    #[test]
    fn paste_with_empty_clipboard() {
        let mut ed = editor_with("x\n");
        ctrl(&mut ed, 'v');
        assert_eq!(lines(&ed), vec!["x"]);
        assert_eq!(status_text(&ed), Some("Clipboard is empty"));
    }

    // ── Find mode ─────────────────────────────────────────────────────────

    #[test]
    fn find_cycles_matches() {
        let mut ed = editor_with("foo bar foo\n");
        ctrl(&mut ed, 'f');
        assert_eq!(ed.mode(), Mode::Find);

        feed(&mut ed, "foo");
        assert_eq!(pos(&ed), Position::ZERO);
        assert!(!ed.buffer().is_dirty());

        press(&mut ed, KeyCode::Enter);
        assert_eq!(pos(&ed), Position::new(0, 0));
        press(&mut ed, KeyCode::Right);
        assert_eq!(pos(&ed), Position::new(0, 8));
        press(&mut ed, KeyCode::Down);
        assert_eq!(pos(&ed), Position::new(0, 0));
        press(&mut ed, KeyCode::Left);
        assert_eq!(pos(&ed), Position::new(0, 8));
    }

    #[test]
    fn find_backspace_edits_query() {
        let mut ed = editor_with("abc\n");
        ctrl(&mut ed, 'f');
        feed(&mut ed, "xy");
        press(&mut ed, KeyCode::Backspace);
        assert_eq!(ed.finder().query(), "x");
    }

    #[test]
    fn exiting_find_resets_finder() {
        let mut ed = editor_with("abc\n");
        ctrl(&mut ed, 'f');
        feed(&mut ed, "b");
        press(&mut ed, KeyCode::Enter);
        assert_eq!(pos(&ed), Position::new(0, 1));

        ctrl(&mut ed, 'f');
        assert_eq!(ed.mode(), Mode::Edit);
        assert_eq!(ed.finder().query(), "");
        assert_eq!(ed.finder().match_count(), 0);
        // Cursor stays on the accepted match.
        assert_eq!(pos(&ed), Position::new(0, 1));
    }

    #[test]
    fn find_without_match_keeps_cursor() {
        let mut ed = editor_with("abc\n");
        press(&mut ed, KeyCode::End);
        ctrl(&mut ed, 'f');
        feed(&mut ed, "zz");
        press(&mut ed, KeyCode::Enter);
        press(&mut ed, KeyCode::Right);
        assert_eq!(pos(&ed), Position::new(0, 3));
    }

    #[test]
    fn edit_commands_are_not_bound_in_find_mode() {
        let mut ed = editor_with("abc\n");
        ctrl(&mut ed, 'f');
        ctrl(&mut ed, 'x');
        assert_eq!(lines(&ed), vec!["abc"]);
    }

    // ── Painting ──────────────────────────────────────────────────────────

    #[test]
    fn paint_shows_edit_hints_and_places_cursor() {
        let mut ed = editor_with("hello\n");
        feed(&mut ed, "ab");
        let screen = painted(&mut ed);
        assert!(screen.contains(
            "Ctrl-S: Save | Ctrl-Q: Quit | Ctrl-F: Find | Ctrl-X: Cut line | Ctrl-C: Copy line | Ctrl-V: Paste line"
        ));
        assert!(screen.contains("[1:3] [lines: 1] [file: [No Name]*]"));
        // Gutter "1 " then two chars.
        assert_eq!(App::cursor(&ed), Some((4, 0)));
    }

    #[test]
    fn paint_shows_find_prompt_and_match_count() {
        let mut ed = editor_with("foo bar foo\n");
        ctrl(&mut ed, 'f');
        feed(&mut ed, "foo");
        press(&mut ed, KeyCode::Enter);
        press(&mut ed, KeyCode::Right);
        let screen = painted(&mut ed);
        assert!(screen.contains(
            "Ctrl-F: Exit find | Enter: Search | Next: →↓ | Prev: ←↑ | [searching for: foo_] [match: 2/2]"
        ));
        assert!(screen.contains("\x1b[30;43mfoo\x1b[0m"));
    }

    #[test]
    fn paint_shows_clipboard_and_status() {
        let mut ed = editor_with("x\n");
        ctrl(&mut ed, 'c');
        let screen = painted(&mut ed);
        assert!(screen.contains("[clipboard: 1 line]"));
        assert!(screen.contains("Copied line"));
    }

    #[test]
    fn paint_after_resize_keeps_cursor_visible() {
        let text: String = (0..50).map(|i| format!("{i}\n")).collect();
        let mut ed = editor_with(&text);
        for _ in 0..40 {
            press(&mut ed, KeyCode::Down);
        }
        let small = Size { cols: 40, rows: 10 };
        ed.on_resize(small);
        let mut out = OutputBuffer::new();
        ed.paint(&mut out, small).unwrap();
        let (_, y) = ed.cursor().rendered();
        assert!(usize::from(y) < ed.view().text_rows());
    }
}
