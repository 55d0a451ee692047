// SPDX-License-Identifier: MIT
//
// Session shutdown — the one and only way out of the event loop.
//
// A `ShutdownSignal` is set at most once. The first caller records the
// reason (message + exit code); every later call is ignored. Setting it
// drops the only sender of an internal channel, so every clone's
// `wakeup()` receiver becomes ready at the same moment. Anything blocked
// in a `select!` that includes `wakeup()` unblocks immediately: the main
// loop waiting for keys, and the input task waiting to enqueue one.

use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use crossbeam_channel::{Receiver, Sender};

// ─── Shutdown ────────────────────────────────────────────────────────────────

/// Why the session ended, and the process exit code that goes with it.
///
/// Not an error: a clean quit is a `Shutdown` with code 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shutdown {
    /// Human-readable reason, printed after the terminal is restored.
    pub message: String,
    /// Process exit code.
    pub code: i32,
}

impl Shutdown {
    /// A user-requested, successful exit (code 0).
    #[must_use]
    pub fn quit(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: 0,
        }
    }

    /// An unrecoverable failure (code 1).
    #[must_use]
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: 1,
        }
    }

    /// Whether this shutdown reports success.
    #[inline]
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code == 0
    }
}

impl fmt::Display for Shutdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

// ─── ShutdownSignal ──────────────────────────────────────────────────────────

struct Inner {
    reason: OnceLock<Shutdown>,
    /// Dropped on trigger; never used to send.
    trigger: Mutex<Option<Sender<()>>>,
    wakeup: Receiver<()>,
}

/// One-shot, clonable cancellation signal.
///
/// # Example
///
/// ```
/// use quill_term::shutdown::{Shutdown, ShutdownSignal};
///
/// let signal = ShutdownSignal::new();
/// let remote = signal.clone();
///
/// assert!(remote.trigger(Shutdown::quit("done")));
/// assert!(!signal.trigger(Shutdown::fatal("too late")));
/// assert_eq!(signal.reason(), Some(&Shutdown::quit("done")));
/// assert!(signal.wakeup().recv().is_err()); // disconnected = woken
/// ```
#[derive(Clone)]
pub struct ShutdownSignal {
    inner: Arc<Inner>,
}

impl ShutdownSignal {
    /// A fresh, untriggered signal.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::bounded(0);
        Self {
            inner: Arc::new(Inner {
                reason: OnceLock::new(),
                trigger: Mutex::new(Some(tx)),
                wakeup: rx,
            }),
        }
    }

    /// Record `reason` and wake every waiter.
    ///
    /// Returns `false` (and discards `reason`) if the signal was already set.
    pub fn trigger(&self, reason: Shutdown) -> bool {
        if self.inner.reason.set(reason).is_err() {
            return false;
        }

        let mut guard = self
            .inner
            .trigger
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        drop(guard.take());
        true
    }

    /// Whether the signal has been set.
    #[inline]
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.inner.reason.get().is_some()
    }

    /// The recorded reason, once set.
    #[inline]
    #[must_use]
    pub fn reason(&self) -> Option<&Shutdown> {
        self.inner.reason.get()
    }

    /// A receiver that becomes ready (disconnected) when the signal is set.
    ///
    /// Meant for `select!`: `recv(signal.wakeup()) -> _ => ...`.
    #[inline]
    #[must_use]
    pub fn wakeup(&self) -> &Receiver<()> {
        &self.inner.wakeup
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownSignal")
            .field("reason", &self.reason())
            .finish()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
