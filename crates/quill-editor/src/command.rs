//! Key-bound commands.
//!
//! A [`CommandRegistry`] maps a [`KeyEvent`] to a named [`Command`]. The
//! editor keeps one registry per mode and consults it before any fallback
//! key handling: if a binding fires, the fallback is skipped.
//!
//! Registration order is kept for the hint bar. Registering a key a second
//! time replaces its entry in place without moving it.
//!
//! The registry is generic over the context the actions mutate, so it knows
//! nothing about the editor it is wired into:
//!
//! ```
//! use quill_editor::command::CommandRegistry;
//! use quill_term::event_loop::Action;
//! use quill_term::input::KeyEvent;
//!
//! let mut reg: CommandRegistry<u32> = CommandRegistry::new();
//! reg.register(KeyEvent::ctrl('a'), "Ctrl-A", "Add", |n| {
//!     *n += 1;
//!     Action::Continue
//! });
//!
//! let mut count = 0;
//! assert_eq!(reg.execute(KeyEvent::ctrl('a'), &mut count), Some(Action::Continue));
//! assert_eq!(count, 1);
//! assert_eq!(reg.hint_line(), "Ctrl-A: Add");
//! ```

use std::collections::HashMap;
use std::fmt;

use quill_term::event_loop::Action;
use quill_term::input::KeyEvent;
use tracing::debug;

/// The function a command runs.
pub type CommandFn<C> = fn(&mut C) -> Action;

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// A named action bound to a key.
pub struct Command<C> {
    /// Short key label shown in the hint bar, e.g. `Ctrl-S`.
    pub name: &'static str,
    /// What it does, e.g. `Save`.
    pub description: &'static str,
    pub action: CommandFn<C>,
}

impl<C> Clone for Command<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for Command<C> {}

impl<C> fmt::Debug for Command<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// CommandRegistry
// ---------------------------------------------------------------------------

/// Ordered key → command table.
pub struct CommandRegistry<C> {
    commands: HashMap<KeyEvent, Command<C>>,
    order: Vec<KeyEvent>,
}

impl<C> CommandRegistry<C> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Bind `key` to a command. Rebinding a key keeps its original slot in
    /// the hint order.
    pub fn register(
        &mut self,
        key: KeyEvent,
        name: &'static str,
        description: &'static str,
        action: CommandFn<C>,
    ) {
        let command = Command {
            name,
            description,
            action,
        };
        if self.commands.insert(key, command).is_none() {
            self.order.push(key);
        }
    }

    /// The command bound to `key`, if any.
    #[must_use]
    pub fn get(&self, key: KeyEvent) -> Option<&Command<C>> {
        self.commands.get(&key)
    }

    /// Run the command bound to `key` against `ctx`.
    ///
    /// Returns `None` when nothing is bound, so the caller can fall back to
    /// its own handling.
    pub fn execute(&self, key: KeyEvent, ctx: &mut C) -> Option<Action> {
        let command = self.commands.get(&key)?;
        debug!(command = command.name, "run command");
        Some((command.action)(ctx))
    }

    /// Commands in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (KeyEvent, &Command<C>)> {
        self.order
            .iter()
            .filter_map(|key| self.commands.get(key).map(|cmd| (*key, cmd)))
    }

    /// `Name: Description` for every command, joined with ` | `.
    #[must_use]
    pub fn hint_line(&self) -> String {
        self.iter()
            .map(|(_, cmd)| format!("{}: {}", cmd.name, cmd.description))
            .collect::<Vec<_>>()
            .join(" | ")
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl<C> Default for CommandRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for CommandRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.iter().map(|(_, cmd)| cmd.name))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
