// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Event loop — the heartbeat of the terminal application.
//
// Keys flow in from the background input task over a bounded queue. The
// loop takes one key (or times out), hands it to the application, and
// repaints the whole screen. One consumer, one writer: the application's
// state is only ever touched from this thread.
//
// # The wait
//
// Each iteration blocks on whichever comes first:
//
//   1. a key from the input queue,
//   2. the shutdown signal (set by a quit command or a fatal input error),
//   3. the tick interval (100 ms by default).
//
// The tick exists so time-based state (an expiring status message) is
// redrawn even while the user is idle.
//
// # SIGWINCH Handling
//
// Terminal resize is detected via a SIGWINCH handler that sets an
// `AtomicBool`. The loop checks this flag each iteration, so a resize is
// picked up within one tick.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::{select, Receiver};
use tracing::{debug, info};

use crate::ansi;
use crate::input::KeyEvent;
use crate::output::OutputBuffer;
use crate::reader::{InputReader, StdinSource, KEY_QUEUE_CAPACITY};
use crate::shutdown::{Shutdown, ShutdownSignal};
use crate::terminal::{Size, Terminal};

// ─── SIGWINCH ────────────────────────────────────────────────────────────────

/// Global flag set by the SIGWINCH handler. Checked each loop iteration.
static SIGWINCH_RECEIVED: AtomicBool = AtomicBool::new(false);

/// Install a signal handler for SIGWINCH (terminal resize).
///
/// The handler simply sets the [`SIGWINCH_RECEIVED`] flag. This is
/// async-signal-safe: writing to an atomic is one of the few operations
/// permitted inside signal handlers.
#[cfg(unix)]
fn install_sigwinch_handler() {
    unsafe {
        let mut sa: libc::sigaction = std::mem::zeroed();
        sa.sa_sigaction = sigwinch_handler as *const () as usize;
        sa.sa_flags = libc::SA_RESTART;
        libc::sigemptyset(&raw mut sa.sa_mask);
        libc::sigaction(libc::SIGWINCH, &raw const sa, std::ptr::null_mut());
    }
}

#[cfg(unix)]
extern "C" fn sigwinch_handler(_sig: libc::c_int) {
    SIGWINCH_RECEIVED.store(true, Ordering::Relaxed);
}

#[cfg(not(unix))]
fn install_sigwinch_handler() {
    // No-op on non-unix platforms.
}

// ─── App Trait ───────────────────────────────────────────────────────────────

/// What the application tells the event loop to do after handling a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Keep running.
    Continue,
    /// End the session with this reason.
    Quit(Shutdown),
}

/// Application interface for the event loop.
///
/// The event loop calls these methods in this order each iteration:
///
/// 1. [`on_key`](App::on_key) — if a key arrived before the tick
/// 2. [`on_resize`](App::on_resize) — if the terminal size changed
/// 3. [`on_tick`](App::on_tick) — every iteration
/// 4. [`paint`](App::paint) — every iteration, onto a cleared screen
/// 5. [`cursor`](App::cursor) — after paint, to place the hardware cursor
pub trait App {
    /// Handle one decoded key.
    ///
    /// Return [`Action::Quit`] to end the session.
    fn on_key(&mut self, key: KeyEvent) -> Action;

    /// Handle terminal resize.
    fn on_resize(&mut self, _size: Size) {}

    /// Called every loop iteration, even when no key arrived.
    fn on_tick(&mut self) {}

    /// Paint the full screen.
    ///
    /// The cursor is hidden and at the top-left corner when this is called.
    /// Every row should be drawn (or cleared) since nothing is diffed.
    ///
    /// # Errors
    ///
    /// Propagates write errors from `out`.
    fn paint(&mut self, out: &mut OutputBuffer, size: Size) -> io::Result<()>;

    /// Where to show the hardware cursor after painting, as 0-indexed
    /// `(x, y)`, or `None` to keep it hidden.
    fn cursor(&self) -> Option<(u16, u16)> {
        None
    }
}

// ─── Loop Config ─────────────────────────────────────────────────────────────

/// Timing and queue configuration for the event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopConfig {
    /// How long to wait for a key before ticking (milliseconds).
    pub tick_interval_ms: u64,
    /// Capacity of the key queue between the input task and the loop.
    pub queue_capacity: usize,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            queue_capacity: KEY_QUEUE_CAPACITY,
        }
    }
}

// ─── EventLoop ───────────────────────────────────────────────────────────────

/// The terminal event loop.
///
/// Owns the terminal and the shutdown signal. Call [`run`](Self::run) to
/// enter the loop; it returns the [`Shutdown`] that ended the session.
///
/// # Example
///
/// ```no_run
/// use std::io;
/// use quill_term::event_loop::{Action, App, EventLoop};
/// use quill_term::input::{KeyCode, KeyEvent};
/// use quill_term::output::OutputBuffer;
/// use quill_term::shutdown::Shutdown;
/// use quill_term::terminal::Size;
///
/// struct MyApp;
///
/// impl App for MyApp {
///     fn on_key(&mut self, key: KeyEvent) -> Action {
///         if key == KeyEvent::ctrl('q') {
///             return Action::Quit(Shutdown::quit("Ctrl-Q"));
///         }
///         Action::Continue
///     }
///
///     fn paint(&mut self, out: &mut OutputBuffer, _size: Size) -> io::Result<()> {
///         out.push_str("hello");
///         Ok(())
///     }
/// }
///
/// let mut event_loop = EventLoop::new();
/// let shutdown = event_loop.run(&mut MyApp)?;
/// println!("Exiting: {shutdown}");
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct EventLoop {
    terminal: Terminal,
    config: LoopConfig,
    shutdown: ShutdownSignal,
}

impl EventLoop {
    /// Create an event loop with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(LoopConfig::default())
    }

    /// Create an event loop with custom configuration.
    #[must_use]
    pub fn with_config(config: LoopConfig) -> Self {
        Self {
            terminal: Terminal::new(),
            config,
            shutdown: ShutdownSignal::new(),
        }
    }

    /// The current terminal size.
    #[inline]
    #[must_use]
    pub fn size(&self) -> Size {
        self.terminal.size()
    }

    /// A handle to this loop's shutdown signal.
    #[must_use]
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Run until the shutdown signal is set.
    ///
    /// This method:
    /// 1. Enters raw mode on the alternate screen
    /// 2. Installs the SIGWINCH handler
    /// 3. Spawns the background input task
    /// 4. Runs the key/tick loop
    /// 5. Stops the input task and restores the terminal (even on error)
    ///
    /// # Errors
    ///
    /// Returns an error if terminal setup, rendering, or restore fails.
    pub fn run(&mut self, app: &mut impl App) -> io::Result<Shutdown> {
        self.terminal.enter()?;
        install_sigwinch_handler();
        app.on_resize(self.terminal.size());

        let result = InputReader::spawn(
            StdinSource::new(self.shutdown.clone()),
            self.shutdown.clone(),
            self.config.queue_capacity,
        )
        .and_then(|(mut reader, keys)| {
            let result = self.run_inner(app, &keys);
            // The input task only exits once the signal is set.
            if result.is_err() {
                self.shutdown.trigger(Shutdown::fatal("render error"));
            }
            reader.join();
            result
        });

        // Always restore, even if the loop errored.
        self.terminal.leave()?;

        if let Ok(ref shutdown) = result {
            info!(code = shutdown.code, message = %shutdown.message, "session ended");
        }
        result
    }

    /// The inner loop, separated so cleanup runs regardless of outcome.
    fn run_inner(&mut self, app: &mut impl App, keys: &Receiver<KeyEvent>) -> io::Result<Shutdown> {
        let tick = Duration::from_millis(self.config.tick_interval_ms);
        let mut out = OutputBuffer::new();

        self.repaint(app, &mut out)?;

        loop {
            select! {
                recv(keys) -> key => match key {
                    Ok(key) => {
                        if let Action::Quit(reason) = app.on_key(key) {
                            self.shutdown.trigger(reason);
                        }
                    }
                    Err(_) => {
                        // The input task sets the reason before it hangs up.
                        self.shutdown.trigger(Shutdown::fatal("input stream closed"));
                    }
                },
                recv(self.shutdown.wakeup()) -> _ => {}
                default(tick) => {}
            }

            if let Some(reason) = self.shutdown.reason() {
                debug!(?reason, "shutdown requested");
                return Ok(reason.clone());
            }

            if SIGWINCH_RECEIVED.swap(false, Ordering::Relaxed) {
                let size = self.terminal.refresh_size();
                debug!(?size, "terminal resized");
                app.on_resize(size);
            }

            app.on_tick();
            self.repaint(app, &mut out)?;
        }
    }

    /// Draw one full frame and place the cursor.
    fn repaint(&self, app: &mut impl App, out: &mut OutputBuffer) -> io::Result<()> {
        out.clear();
        ansi::cursor_hide(out)?;
        ansi::cursor_home(out)?;
        app.paint(out, self.terminal.size())?;
        if let Some((x, y)) = app.cursor() {
            ansi::cursor_to(out, x, y)?;
            ansi::cursor_show(out)?;
        }
        out.flush_stdout()
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
