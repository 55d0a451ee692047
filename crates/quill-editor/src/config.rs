//! User configuration — `~/.quill.conf`.
//!
//! A small `key = value` file. Lines starting with `#` are comments, blank
//! lines are ignored, and keys and values are trimmed.
//!
//! | Key                 | Type          | Default |
//! |---------------------|---------------|---------|
//! | `show_line_numbers` | bool          | `true`  |
//! | `expand_tabs`       | bool          | `false` |
//! | `tab_size`          | integer > 0   | `4`     |
//! | `scroll_margin`     | integer >= 0  | `5`     |
//!
//! Booleans accept `true/false`, `1/0`, `yes/no` and `on/off`, in any case.
//!
//! Loading is forgiving: an unknown key or a bad value is logged and the
//! default stays in place. Only a file that exists but cannot be read is an
//! error.

use std::fmt::Write as _;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::ConfigError;

/// File name of the config file inside the home directory.
pub const CONFIG_FILE_NAME: &str = ".quill.conf";

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// One recognized configuration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ShowLineNumbers,
    ExpandTabs,
    TabSize,
    ScrollMargin,
}

impl Key {
    /// Every key, in file order.
    pub const ALL: [Self; 4] = [
        Self::ShowLineNumbers,
        Self::ExpandTabs,
        Self::TabSize,
        Self::ScrollMargin,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ShowLineNumbers => "show_line_numbers",
            Self::ExpandTabs => "expand_tabs",
            Self::TabSize => "tab_size",
            Self::ScrollMargin => "scroll_margin",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.name() == name)
    }

    /// Question asked by `config init`.
    #[must_use]
    pub const fn prompt(self) -> &'static str {
        match self {
            Self::ShowLineNumbers => "Show line numbers (true/false)",
            Self::ExpandTabs => "Expand tabs to spaces (true/false)",
            Self::TabSize => "Tab size (number > 0)",
            Self::ScrollMargin => "Scroll margin (number >= 0)",
        }
    }

    /// Hint printed when a prompt answer is rejected.
    #[must_use]
    pub const fn expected(self) -> &'static str {
        match self {
            Self::ShowLineNumbers | Self::ExpandTabs => "expected true or false",
            Self::TabSize => "expected a number greater than 0",
            Self::ScrollMargin => "expected a number 0 or greater",
        }
    }
}

// ---------------------------------------------------------------------------
// Value parsers
// ---------------------------------------------------------------------------

/// Parse a boolean the way the config file spells them.
#[must_use]
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_positive(value: &str) -> Option<usize> {
    value.trim().parse().ok().filter(|&n: &usize| n > 0)
}

fn parse_count(value: &str) -> Option<usize> {
    value.trim().parse().ok()
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub show_line_numbers: bool,
    pub expand_tabs: bool,
    pub tab_size: usize,
    pub scroll_margin: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            show_line_numbers: true,
            expand_tabs: false,
            tab_size: 4,
            scroll_margin: 5,
        }
    }
}

impl Config {
    /// `~/.quill.conf`, or `None` if there is no home directory.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(CONFIG_FILE_NAME))
    }

    /// Read `path`. A missing file gives the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file exists but cannot be read.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(text) => {
                debug!(path = %path.display(), "loaded config");
                Ok(Self::parse(&text))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Parse file text, warning about and skipping anything invalid.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut config = Self::default();
        for (idx, line) in text.lines().enumerate() {
            if let Err(err) = config.apply_line(idx + 1, line) {
                warn!(%err, "ignoring config line");
            }
        }
        config
    }

    /// Apply one line of a config file. Comments and blank lines are fine.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] if the line is not `key = value`, names an
    /// unknown key, or carries an invalid value. `self` is unchanged then.
    pub fn apply_line(&mut self, line_no: usize, line: &str) -> Result<(), ConfigError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(());
        }

        let parse_error = |message: String| ConfigError::Parse {
            line: line_no,
            message,
        };

        let (name, value) = line
            .split_once('=')
            .ok_or_else(|| parse_error("expected `key = value`".into()))?;
        let name = name.trim();
        let key = Key::from_name(name).ok_or_else(|| parse_error(format!("unknown key `{name}`")))?;

        self.set(key, value.trim())
            .map_err(|expected| parse_error(format!("{}: {expected}", key.name())))
    }

    /// Set `key` from its text form. On failure returns the hint for what
    /// was expected and leaves `self` unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Key::expected`] when `value` is not valid for `key`.
    pub fn set(&mut self, key: Key, value: &str) -> Result<(), &'static str> {
        match key {
            Key::ShowLineNumbers => self.show_line_numbers = parse_bool(value).ok_or(key.expected())?,
            Key::ExpandTabs => self.expand_tabs = parse_bool(value).ok_or(key.expected())?,
            Key::TabSize => self.tab_size = parse_positive(value).ok_or(key.expected())?,
            Key::ScrollMargin => self.scroll_margin = parse_count(value).ok_or(key.expected())?,
        }
        Ok(())
    }

    /// The value of `key` as it is written in the file.
    #[must_use]
    pub fn get(&self, key: Key) -> String {
        match key {
            Key::ShowLineNumbers => self.show_line_numbers.to_string(),
            Key::ExpandTabs => self.expand_tabs.to_string(),
            Key::TabSize => self.tab_size.to_string(),
            Key::ScrollMargin => self.scroll_margin.to_string(),
        }
    }

    /// Render as a config file that [`parse`](Self::parse) reads back.
    #[must_use]
    pub fn to_file_string(&self) -> String {
        let mut out = String::from("# quill configuration\n");
        for key in Key::ALL {
            let _ = writeln!(out, "{} = {}", key.name(), self.get(key));
        }
        out
    }

    /// Write [`to_file_string`](Self::to_file_string) to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the write fails.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        fs::write(path, self.to_file_string())?;
        debug!(path = %path.display(), "saved config");
        Ok(())
    }

    /// The text a Tab key press inserts.
    #[must_use]
    pub fn indent(&self) -> String {
        if self.expand_tabs {
            " ".repeat(self.tab_size)
        } else {
            "\t".to_owned()
        }
    }
}

// ---------------------------------------------------------------------------
// Interactive init
// ---------------------------------------------------------------------------

/// Ask for every key on `output`, reading answers from `input`.
///
/// Each prompt shows the default in brackets. An empty answer (or end of
/// input) keeps the default, and an invalid answer asks again.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if reading or writing fails.
pub fn prompt_config(mut input: impl BufRead, mut output: impl Write) -> Result<Config, ConfigError> {
    let mut config = Config::default();

    for key in Key::ALL {
        loop {
            write!(output, "{} [{}]: ", key.prompt(), config.get(key))?;
            output.flush()?;

            let mut answer = String::new();
            if input.read_line(&mut answer)? == 0 {
                writeln!(output)?;
                break;
            }
            let answer = answer.trim();
            if answer.is_empty() {
                break;
            }
            match config.set(key, answer) {
                Ok(()) => break,
                Err(expected) => writeln!(output, "Invalid input, {expected}.")?,
            }
        }
    }

    Ok(config)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
