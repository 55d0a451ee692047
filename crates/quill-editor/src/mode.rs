//! Editor modes.
//!
//! The editor is always in exactly one [`Mode`]. The mode picks which
//! command registry is consulted and which fallback handles unbound keys:
//!
//! | Mode | Arrows               | Enter            | Printable input      |
//! |------|----------------------|------------------|----------------------|
//! | Edit | Move the cursor      | Split the line   | Inserted at cursor   |
//! | Find | Cycle through matches| Run the search   | Appended to query    |

use std::fmt;

/// The current editing mode.
///
/// Pure data: what mode we're in, not how keys are handled.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    #[default]
    Edit,
    Find,
}

impl Mode {
    /// The other mode. Ctrl-F toggles with this.
    #[inline]
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Edit => Self::Find,
            Self::Find => Self::Edit,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_find(self) -> bool {
        matches!(self, Self::Find)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Edit => f.write_str("EDIT"),
            Self::Find => f.write_str("FIND"),
        }
    }
}
