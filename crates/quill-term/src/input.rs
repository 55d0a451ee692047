// SPDX-License-Identifier: MIT
//
// Terminal input decoding.
//
// Turns a raw byte stream into semantic key events, one key per call.
// Handles:
//
// - ASCII printable characters and multi-byte UTF-8
// - Control characters (Ctrl+letter, Tab, Enter, Backspace)
// - CSI navigation sequences (arrows, Home/End, PageUp/PageDown, Delete)
//
// # Design
//
// `KeyDecoder` pulls bytes from any `Read` source. It keeps the bytes of the
// last read in a small queue, so when it sees ESC it can peek at what the
// terminal already delivered without blocking. A terminal writes an escape
// sequence in one burst, so "ESC with nothing buffered behind it" is the
// Escape key itself and is reported immediately.
//
// Sequence table (bytes after `ESC [`):
//
// | Bytes              | Key                    |
// |--------------------|------------------------|
// | `A` `B` `C` `D`    | Up Down Right Left     |
// | `H`, `1~`, `7~`    | Home                   |
// | `F`, `4~`, `8~`    | End                    |
// | `5~` / `6~`        | PageUp / PageDown      |
// | `3~`               | Delete                 |
//
// Anything else after CSI decodes to Escape. A numeric sequence that is not
// closed by `~` is a `DecodeError::UnexpectedSequenceTerminator`.

use std::collections::VecDeque;
use std::io::{self, Read};

use bitflags::bitflags;
use thiserror::Error;

// ─── Key Types ──────────────────────────────────────────────────────────────

/// A decoded key press with its modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    /// Which key was pressed.
    pub code: KeyCode,
    /// Active modifier keys.
    pub modifiers: Modifiers,
}

impl KeyEvent {
    /// A key with explicit modifiers.
    #[inline]
    #[must_use]
    pub const fn new(code: KeyCode, modifiers: Modifiers) -> Self {
        Self { code, modifiers }
    }

    /// A key with no modifiers.
    #[inline]
    #[must_use]
    pub const fn plain(code: KeyCode) -> Self {
        Self::new(code, Modifiers::empty())
    }

    /// Ctrl + a lowercase letter, as produced by the control bytes 0x01..=0x1A.
    #[inline]
    #[must_use]
    pub const fn ctrl(ch: char) -> Self {
        Self::new(KeyCode::Char(ch), Modifiers::CTRL)
    }

    /// The character this key inserts as text, if any.
    ///
    /// Control characters and Ctrl/Alt chords insert nothing.
    #[must_use]
    pub fn printable(&self) -> Option<char> {
        match self.code {
            KeyCode::Char(ch)
                if !ch.is_control()
                    && !self.modifiers.intersects(Modifiers::CTRL | Modifiers::ALT) =>
            {
                Some(ch)
            }
            _ => None,
        }
    }
}

/// Identity of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A Unicode character.
    Char(char),
    // ── Named keys ──────────────────────────────────────────────
    Enter,
    Tab,
    Backspace,
    Escape,
    Delete,
    // ── Navigation ──────────────────────────────────────────────
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
}

bitflags! {
    /// Keyboard modifier flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0000_0001;
        const ALT   = 0b0000_0010;
        const CTRL  = 0b0000_0100;
    }
}

// ─── Errors ─────────────────────────────────────────────────────────────────

/// Failure to decode the next key.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// A numeric CSI sequence ended with something other than `~`.
    ///
    /// Recoverable: the caller treats it as a literal Escape.
    #[error("unexpected escape sequence terminator {0:#04x}")]
    UnexpectedSequenceTerminator(u8),

    /// The byte source failed or reached end of input.
    #[error("input stream error: {0}")]
    Io(#[from] io::Error),
}

impl DecodeError {
    /// Whether the input stream is unusable after this error.
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

// ─── KeyDecoder ─────────────────────────────────────────────────────────────

/// Read chunk size. A key press is 1-6 bytes; a paste can be kilobytes.
const READ_BUF_SIZE: usize = 4096;

/// Replacement for undecodable input bytes.
const REPLACEMENT: char = char::REPLACEMENT_CHARACTER;

/// Pull-based key decoder over a byte source.
///
/// Each call to [`next_key`](Self::next_key) blocks until one full key is
/// available and returns it.
///
/// # Example
///
/// ```
/// use quill_term::input::{KeyCode, KeyDecoder, KeyEvent};
///
/// let mut dec = KeyDecoder::new(&b"a\x1b[B"[..]);
/// assert_eq!(dec.next_key()?, KeyEvent::plain(KeyCode::Char('a')));
/// assert_eq!(dec.next_key()?, KeyEvent::plain(KeyCode::Down));
/// # Ok::<(), quill_term::input::DecodeError>(())
/// ```
pub struct KeyDecoder<R> {
    source: R,
    /// Bytes already read from `source` but not yet decoded.
    pending: VecDeque<u8>,
}

impl<R: Read> KeyDecoder<R> {
    /// Wrap a byte source.
    #[must_use]
    pub fn new(source: R) -> Self {
        Self {
            source,
            pending: VecDeque::with_capacity(64),
        }
    }

    /// Decode the next key.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::UnexpectedSequenceTerminator`] for a malformed
    ///   numeric escape sequence. The decoder stays usable.
    /// - [`DecodeError::Io`] if the source fails or is exhausted.
    pub fn next_key(&mut self) -> Result<KeyEvent, DecodeError> {
        let byte = self.next_byte()?;

        let key = match byte {
            0x1B => return self.decode_escape(),
            0x00 => KeyEvent::ctrl('@'),
            b @ (0x01..=0x07 | 0x0B..=0x0C | 0x0E..=0x1A) => {
                KeyEvent::ctrl(char::from(b + b'a' - 1))
            }
            0x08 | 0x7F => KeyEvent::plain(KeyCode::Backspace),
            0x09 => KeyEvent::plain(KeyCode::Tab),
            0x0A | 0x0D => KeyEvent::plain(KeyCode::Enter),
            // Ctrl+\ Ctrl+] Ctrl+^ Ctrl+_
            b @ 0x1C..=0x1F => KeyEvent::ctrl(char::from(b + 0x40)),
            b @ 0x20..=0x7E => KeyEvent::plain(KeyCode::Char(char::from(b))),
            lead => KeyEvent::plain(KeyCode::Char(self.decode_utf8(lead)?)),
        };

        Ok(key)
    }

    // ── Byte access ────────────────────────────────────────────────────

    /// Next byte, reading from the source if nothing is buffered.
    fn next_byte(&mut self) -> io::Result<u8> {
        loop {
            if let Some(b) = self.pending.pop_front() {
                return Ok(b);
            }
            self.fill()?;
        }
    }

    /// Read one chunk from the source into `pending`.
    fn fill(&mut self) -> io::Result<()> {
        let mut chunk = [0u8; READ_BUF_SIZE];
        loop {
            match self.source.read(&mut chunk) {
                Ok(0) => return Err(io::ErrorKind::UnexpectedEof.into()),
                Ok(n) => {
                    self.pending.extend(&chunk[..n]);
                    return Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }

    // ── Escape sequences ───────────────────────────────────────────────

    fn decode_escape(&mut self) -> Result<KeyEvent, DecodeError> {
        if self.pending.front() != Some(&b'[') {
            return Ok(KeyEvent::plain(KeyCode::Escape));
        }
        self.pending.pop_front();

        let code = match self.next_byte()? {
            b'A' => KeyCode::Up,
            b'B' => KeyCode::Down,
            b'C' => KeyCode::Right,
            b'D' => KeyCode::Left,
            b'H' => KeyCode::Home,
            b'F' => KeyCode::End,
            b'1' | b'7' => self.expect_tilde(KeyCode::Home)?,
            b'4' | b'8' => self.expect_tilde(KeyCode::End)?,
            b'5' => self.expect_tilde(KeyCode::PageUp)?,
            b'6' => self.expect_tilde(KeyCode::PageDown)?,
            b'3' => self.expect_tilde(KeyCode::Delete)?,
            _ => KeyCode::Escape,
        };

        Ok(KeyEvent::plain(code))
    }

    /// Consume the `~` that closes a numeric sequence.
    ///
    /// On any other byte, the buffered remainder of the sequence (parameter
    /// bytes up to and including a final byte) is discarded so it does not
    /// leak into the text as typed characters.
    fn expect_tilde(&mut self, code: KeyCode) -> Result<KeyCode, DecodeError> {
        let terminator = self.next_byte()?;
        if terminator == b'~' {
            return Ok(code);
        }

        if is_csi_parameter(terminator) {
            while let Some(b) = self.pending.pop_front() {
                if is_csi_final(b) {
                    break;
                }
            }
        }

        Err(DecodeError::UnexpectedSequenceTerminator(terminator))
    }

    // ── UTF-8 ──────────────────────────────────────────────────────────

    fn decode_utf8(&mut self, lead: u8) -> io::Result<char> {
        let len = utf8_char_len(lead);
        if len == 0 {
            return Ok(REPLACEMENT);
        }

        let mut bytes = [lead, 0, 0, 0];
        for slot in bytes.iter_mut().take(len).skip(1) {
            let b = self.next_byte()?;
            if b & 0xC0 != 0x80 {
                // Not a continuation byte: leave it for the next key.
                self.pending.push_front(b);
                return Ok(REPLACEMENT);
            }
            *slot = b;
        }

        Ok(std::str::from_utf8(&bytes[..len])
            .ok()
            .and_then(|s| s.chars().next())
            .unwrap_or(REPLACEMENT))
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────────

/// Expected byte length of a UTF-8 sequence from its lead byte (0 if invalid).
const fn utf8_char_len(lead: u8) -> usize {
    match lead {
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => 0,
    }
}

/// CSI parameter bytes: digits, `;`, `:`, `<`..`?`.
const fn is_csi_parameter(b: u8) -> bool {
    matches!(b, 0x30..=0x3F)
}

/// CSI final bytes: `@` through `~`.
const fn is_csi_final(b: u8) -> bool {
    matches!(b, 0x40..=0x7E)
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// A source that hands out one pre-split chunk per `read` call, the way a
    /// terminal delivers separate key presses.
    struct Chunks(VecDeque<Vec<u8>>);

    impl Chunks {
        fn new(chunks: &[&[u8]]) -> Self {
            Self(chunks.iter().map(|c| c.to_vec()).collect())
        }
    }

    impl Read for Chunks {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let Some(chunk) = self.0.pop_front() else {
                return Ok(0);
            };
            buf[..chunk.len()].copy_from_slice(&chunk);
            Ok(chunk.len())
        }
    }

    /// Helper: decode every key in `data` until end of input.
    fn decode_all(data: &[u8]) -> Vec<KeyEvent> {
        let mut dec = KeyDecoder::new(data);
        let mut keys = Vec::new();
        loop {
            match dec.next_key() {
                Ok(key) => keys.push(key),
                Err(DecodeError::Io(e)) => {
                    assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof);
                    return keys;
                }
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
    }

    /// Helper: decode exactly one key.
    fn decode_one(data: &[u8]) -> KeyEvent {
        let keys = decode_all(data);
        assert_eq!(keys.len(), 1, "expected 1 key, got {keys:?}");
        keys[0]
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::plain(code)
    }

    // ── Plain characters ────────────────────────────────────────────────

    #[test]
    fn ascii_passes_through() {
        assert_eq!(
            decode_all(b"ab~ "),
            vec![
                key(KeyCode::Char('a')),
                key(KeyCode::Char('b')),
                key(KeyCode::Char('~')),
                key(KeyCode::Char(' ')),
            ]
        );
    }

    #[test]
    fn utf8_multibyte() {
        assert_eq!(decode_one("é".as_bytes()), key(KeyCode::Char('é')));
        assert_eq!(decode_one("→".as_bytes()), key(KeyCode::Char('→')));
        assert_eq!(decode_one("🦀".as_bytes()), key(KeyCode::Char('🦀')));
    }

    #[test]
    fn utf8_split_across_reads() {
        let bytes = "→".as_bytes();
        let mut dec = KeyDecoder::new(Chunks::new(&[&bytes[..1], &bytes[1..]]));
        assert_eq!(dec.next_key().unwrap(), key(KeyCode::Char('→')));
    }

    #[test]
    fn stray_continuation_byte_is_replacement() {
        assert_eq!(decode_one(b"\x80"), key(KeyCode::Char(REPLACEMENT)));
    }

    #[test]
    fn truncated_utf8_keeps_following_byte() {
        assert_eq!(
            decode_all(b"\xC3a"),
            vec![key(KeyCode::Char(REPLACEMENT)), key(KeyCode::Char('a'))]
        );
    }

    // ── Control characters ──────────────────────────────────────────────

    #[test]
    fn ctrl_letters() {
        assert_eq!(decode_one(b"\x13"), KeyEvent::ctrl('s'));
        assert_eq!(decode_one(b"\x11"), KeyEvent::ctrl('q'));
        assert_eq!(decode_one(b"\x06"), KeyEvent::ctrl('f'));
        assert_eq!(decode_one(b"\x18"), KeyEvent::ctrl('x'));
        assert_eq!(decode_one(b"\x03"), KeyEvent::ctrl('c'));
        assert_eq!(decode_one(b"\x16"), KeyEvent::ctrl('v'));
    }

    #[test]
    fn named_control_bytes() {
        assert_eq!(decode_one(b"\r"), key(KeyCode::Enter));
        assert_eq!(decode_one(b"\n"), key(KeyCode::Enter));
        assert_eq!(decode_one(b"\t"), key(KeyCode::Tab));
        assert_eq!(decode_one(b"\x08"), key(KeyCode::Backspace));
        assert_eq!(decode_one(b"\x7f"), key(KeyCode::Backspace));
    }

    #[test]
    fn ctrl_punctuation() {
        assert_eq!(decode_one(b"\x00"), KeyEvent::ctrl('@'));
        assert_eq!(decode_one(b"\x1c"), KeyEvent::ctrl('\\'));
        assert_eq!(decode_one(b"\x1f"), KeyEvent::ctrl('_'));
    }

    // ── CSI sequences ───────────────────────────────────────────────────

    #[test]
    fn arrows() {
        assert_eq!(decode_one(b"\x1b[A"), key(KeyCode::Up));
        assert_eq!(decode_one(b"\x1b[B"), key(KeyCode::Down));
        assert_eq!(decode_one(b"\x1b[C"), key(KeyCode::Right));
        assert_eq!(decode_one(b"\x1b[D"), key(KeyCode::Left));
    }

    #[test]
    fn home_variants() {
        assert_eq!(decode_one(b"\x1b[H"), key(KeyCode::Home));
        assert_eq!(decode_one(b"\x1b[1~"), key(KeyCode::Home));
        assert_eq!(decode_one(b"\x1b[7~"), key(KeyCode::Home));
    }

    #[test]
    fn end_variants() {
        assert_eq!(decode_one(b"\x1b[F"), key(KeyCode::End));
        assert_eq!(decode_one(b"\x1b[4~"), key(KeyCode::End));
        assert_eq!(decode_one(b"\x1b[8~"), key(KeyCode::End));
    }

    #[test]
    fn paging_and_delete() {
        assert_eq!(decode_one(b"\x1b[5~"), key(KeyCode::PageUp));
        assert_eq!(decode_one(b"\x1b[6~"), key(KeyCode::PageDown));
        assert_eq!(decode_one(b"\x1b[3~"), key(KeyCode::Delete));
    }

    #[test]
    fn keys_after_sequence_decode_normally() {
        assert_eq!(
            decode_all(b"\x1b[Ax\x1b[6~"),
            vec![key(KeyCode::Up), key(KeyCode::Char('x')), key(KeyCode::PageDown)]
        );
    }

    #[test]
    fn unknown_csi_final_is_escape() {
        assert_eq!(decode_all(b"\x1b[Zq"), vec![key(KeyCode::Escape), key(KeyCode::Char('q'))]);
    }

    // ── Escape handling ─────────────────────────────────────────────────

    #[test]
    fn lone_escape_at_end_of_input() {
        assert_eq!(decode_one(b"\x1b"), key(KeyCode::Escape));
    }

    #[test]
    fn escape_followed_by_non_csi_keeps_next_byte() {
        assert_eq!(
            decode_all(b"\x1bx"),
            vec![key(KeyCode::Escape), key(KeyCode::Char('x'))]
        );
    }

    #[test]
    fn escape_does_not_wait_for_next_read() {
        let mut dec = KeyDecoder::new(Chunks::new(&[b"\x1b", b"[A"]));
        // The `[A` arrives in a later read, so it is not part of this key.
        assert_eq!(dec.next_key().unwrap(), key(KeyCode::Escape));
        assert_eq!(dec.next_key().unwrap(), key(KeyCode::Char('[')));
        assert_eq!(dec.next_key().unwrap(), key(KeyCode::Char('A')));
    }

    // ── Errors ──────────────────────────────────────────────────────────

    #[test]
    fn bad_terminator_is_reported() {
        let mut dec = KeyDecoder::new(&b"\x1b[5x"[..]);
        let err = dec.next_key().unwrap_err();
        assert!(matches!(err, DecodeError::UnexpectedSequenceTerminator(b'x')));
        assert!(!err.is_fatal());
    }

    #[test]
    fn bad_terminator_discards_sequence_tail() {
        // Ctrl+Right in xterm encoding: ESC [ 1 ; 5 C
        let mut dec = KeyDecoder::new(&b"\x1b[1;5Cz"[..]);
        assert!(matches!(
            dec.next_key(),
            Err(DecodeError::UnexpectedSequenceTerminator(b';'))
        ));
        assert_eq!(dec.next_key().unwrap(), key(KeyCode::Char('z')));
    }

    #[test]
    fn end_of_input_is_fatal() {
        let mut dec = KeyDecoder::new(&b""[..]);
        let err = dec.next_key().unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn source_error_propagates() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::other("tty gone"))
            }
        }
        let err = KeyDecoder::new(Broken).next_key().unwrap_err();
        assert!(matches!(err, DecodeError::Io(ref e) if e.to_string() == "tty gone"));
    }

    #[test]
    fn interrupted_read_is_retried() {
        struct Flaky(bool);
        impl Read for Flaky {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                if self.0 {
                    buf[0] = b'k';
                    Ok(1)
                } else {
                    self.0 = true;
                    Err(io::ErrorKind::Interrupted.into())
                }
            }
        }
        let mut dec = KeyDecoder::new(Flaky(false));
        assert_eq!(dec.next_key().unwrap(), key(KeyCode::Char('k')));
    }

    // ── KeyEvent ────────────────────────────────────────────────────────

    #[test]
    fn printable_filters_controls_and_chords() {
        assert_eq!(key(KeyCode::Char('a')).printable(), Some('a'));
        assert_eq!(key(KeyCode::Char('é')).printable(), Some('é'));
        assert_eq!(KeyEvent::ctrl('a').printable(), None);
        assert_eq!(KeyEvent::new(KeyCode::Char('a'), Modifiers::ALT).printable(), None);
        assert_eq!(
            KeyEvent::new(KeyCode::Char('A'), Modifiers::SHIFT).printable(),
            Some('A')
        );
        assert_eq!(key(KeyCode::Char('\u{7}')).printable(), None);
        assert_eq!(key(KeyCode::Enter).printable(), None);
    }
}
