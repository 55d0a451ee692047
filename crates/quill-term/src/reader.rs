// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Background input task — decodes terminal bytes into keys.
//
// A dedicated thread owns the `KeyDecoder` and pushes each decoded key into
// a bounded channel. The main loop is the only consumer, and the only
// writer of editor state.
//
// Why a dedicated thread? Because `read()` on stdin blocks, and the event
// loop must keep ticking (status expiry, resize) while the user is idle.
//
// Shutdown: `StdinSource` polls stdin with a short timeout and checks the
// shutdown signal between polls, so the thread is never stuck in a blocking
// `read()`. The enqueue side races the bounded `send` against the same
// signal, so a full queue cannot keep the thread alive past the session.

use std::any::Any;
use std::io::{self, Read};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{select, Receiver, Sender};
use tracing::{debug, error, warn};

use crate::input::{DecodeError, KeyCode, KeyDecoder, KeyEvent};
use crate::shutdown::{Shutdown, ShutdownSignal};

/// How often the stdin source re-checks the shutdown signal (milliseconds).
///
/// Shutdown latency for the input thread is at most this long.
#[cfg(unix)]
const POLL_TIMEOUT_MS: i32 = 50;

/// Default number of keys that may wait in the queue.
pub const KEY_QUEUE_CAPACITY: usize = 64;

// ─── StdinSource ─────────────────────────────────────────────────────────────

/// Stdin as a `Read` source that gives up once the session shuts down.
///
/// Reports end of input (`Ok(0)`) after the signal is set, which ends the
/// decoder's stream without an error message.
pub struct StdinSource {
    shutdown: ShutdownSignal,
}

impl StdinSource {
    /// A source bound to `shutdown`.
    #[must_use]
    pub const fn new(shutdown: ShutdownSignal) -> Self {
        Self { shutdown }
    }
}

#[cfg(unix)]
impl Read for StdinSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        use std::os::unix::io::AsRawFd;

        let fd = io::stdin().as_raw_fd();

        loop {
            if self.shutdown.is_triggered() {
                return Ok(0);
            }

            let ready = unsafe {
                let mut pfd = libc::pollfd {
                    fd,
                    events: libc::POLLIN,
                    revents: 0,
                };
                libc::poll(&raw mut pfd, 1, POLL_TIMEOUT_MS)
            };

            if ready == 0 {
                continue;
            }
            if ready < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(err);
            }

            let n = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
            if n < 0 {
                let err = io::Error::last_os_error();
                if matches!(
                    err.kind(),
                    io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
                ) {
                    continue;
                }
                return Err(err);
            }

            #[allow(clippy::cast_sign_loss)] // n >= 0 checked above.
            return Ok(n as usize);
        }
    }
}

#[cfg(not(unix))]
impl Read for StdinSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.shutdown.is_triggered() {
            return Ok(0);
        }
        io::stdin().read(buf)
    }
}

// ─── InputReader ─────────────────────────────────────────────────────────────

/// Handle to the background input thread.
///
/// The thread ends when the shutdown signal is set, when its source reports
/// end of input or an error (which sets the signal with a fatal reason), or
/// when the key receiver is dropped.
pub struct InputReader {
    handle: Option<JoinHandle<()>>,
    shutdown: ShutdownSignal,
}

impl InputReader {
    /// Spawn the input thread over `source`.
    ///
    /// Returns the handle and the receiving end of the key queue.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS cannot spawn a thread.
    pub fn spawn<R>(
        source: R,
        shutdown: ShutdownSignal,
        capacity: usize,
    ) -> io::Result<(Self, Receiver<KeyEvent>)>
    where
        R: Read + Send + 'static,
    {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        let task_shutdown = shutdown.clone();

        let handle = thread::Builder::new()
            .name("input".into())
            .spawn(move || input_loop(source, &tx, &task_shutdown))?;

        Ok((
            Self {
                handle: Some(handle),
                shutdown,
            },
            rx,
        ))
    }

    /// Wait for the thread to exit.
    ///
    /// Only blocks once the shutdown signal is set; before that the thread
    /// is left running. Idempotent.
    pub fn join(&mut self) {
        if !self.shutdown.is_triggered() {
            return;
        }
        if let Some(handle) = self.handle.take() {
            if let Err(payload) = handle.join() {
                error!(panic = panic_message(payload.as_ref()), "input thread panicked");
            }
        }
    }
}

/// The message a panic was raised with, when it is a string.
fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic payload>")
}

impl Drop for InputReader {
    fn drop(&mut self) {
        self.join();
    }
}

/// Decode keys from `source` and enqueue them until told to stop.
fn input_loop<R: Read>(source: R, tx: &Sender<KeyEvent>, shutdown: &ShutdownSignal) {
    let mut decoder = KeyDecoder::new(source);

    loop {
        let key = match decoder.next_key() {
            Ok(key) => key,
            Err(DecodeError::UnexpectedSequenceTerminator(byte)) => {
                warn!(byte, "malformed escape sequence, treating as Escape");
                KeyEvent::plain(KeyCode::Escape)
            }
            Err(DecodeError::Io(err)) => {
                if !shutdown.is_triggered() {
                    error!(%err, "input stream failed");
                    shutdown.trigger(Shutdown::fatal(format!("input error: {err}")));
                }
                debug!("input thread exiting");
                return;
            }
        };

        select! {
            send(tx, key) -> sent => {
                if sent.is_err() {
                    debug!("key receiver dropped, input thread exiting");
                    return;
                }
            }
            recv(shutdown.wakeup()) -> _ => return,
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
