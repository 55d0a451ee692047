// SPDX-License-Identifier: MIT
//
// quill — a small terminal text editor.
//
// This is the binary that wires the two library crates together:
//
//   quill-term   → raw mode, key decoding, input thread, event loop
//   quill-editor → text buffer, cursor, finder, viewport, config
//
// The Editor (src/editor.rs) implements quill-term's App trait. Each
// keypress flows through:
//
//   stdin → KeyDecoder → key queue → on_key → command registry / fallback
//   paint → viewport.render → output buffer → one write to stdout
//
// Layout:
//
//   ┌──────────────────────────────┐
//   │ gutter + text area           │  ← rows - 2 (managed by Viewport)
//   ├──────────────────────────────┤
//   │ hint bar (black on white)    │  ← 1 row
//   ├──────────────────────────────┤
//   │ status line                  │  ← 1 row
//   └──────────────────────────────┘

mod editor;

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Mutex;

use clap::{Parser, Subcommand};
use quill_editor::buffer::TextBuffer;
use quill_editor::config::{self, CONFIG_FILE_NAME, Config};
use quill_term::event_loop::EventLoop;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::editor::Editor;

const DEFAULT_LOG_FILTER: &str = "quill=debug,quill_editor=debug,quill_term=debug";

// ─── CLI ────────────────────────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(name = "quill", version, about = "A small terminal text editor")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// File to edit. Created on first save if it does not exist.
    file: Option<PathBuf>,

    /// Read configuration from PATH instead of ~/.quill.conf
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write a debug log to PATH
    #[arg(long, global = true, value_name = "PATH")]
    log: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Manage the configuration file
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Answer a prompt per setting and write the config file
    Init,
    /// Print the effective configuration
    Show,
}

// ─── Setup ──────────────────────────────────────────────────────────────────

/// Send tracing output to `path`. The terminal is in raw mode while the
/// editor runs, so nothing may be logged to it.
fn init_logging(path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    // A second init only happens in tests; the first subscriber wins.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
    Ok(())
}

fn config_path(cli: &Cli) -> Option<PathBuf> {
    cli.config.clone().or_else(Config::default_path)
}

/// The effective configuration. An unreadable file falls back to defaults.
fn load_config(path: Option<&Path>) -> Config {
    match path.map(Config::load) {
        Some(Ok(config)) => config,
        Some(Err(err)) => {
            eprintln!("quill: {err}; using defaults");
            Config::default()
        }
        None => Config::default(),
    }
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Exiting: {message}");
    process::exit(1);
}

// ─── Subcommands ────────────────────────────────────────────────────────────

fn config_init(path: Option<PathBuf>) {
    let Some(path) = path else {
        fail(format!("no home directory for {CONFIG_FILE_NAME}; pass --config"));
    };

    let stdin = io::stdin();
    let config = config::prompt_config(stdin.lock(), io::stdout())
        .unwrap_or_else(|err| fail(err));
    if let Err(err) = config.save(&path) {
        fail(err);
    }
    println!("Wrote {}", path.display());
}

fn config_show(path: Option<&Path>) {
    match path {
        Some(path) => println!("# {}", path.display()),
        None => println!("# (no config file)"),
    }
    print!("{}", load_config(path).to_file_string());
}

fn edit(file: Option<&Path>, config: Config) -> ! {
    let mut event_loop = EventLoop::new();
    let size = event_loop.size();

    let mut editor = match file {
        Some(path) => Editor::open(path, config, size).unwrap_or_else(|err| fail(err)),
        None => Editor::new(TextBuffer::with_tab_size(config.tab_size), config, size),
    };
    info!(file = %editor.buffer().file_name(), "editing");

    match event_loop.run(&mut editor) {
        Ok(shutdown) => {
            debug!(code = shutdown.code, "shutdown");
            println!("Exiting: {shutdown}");
            process::exit(shutdown.code);
        }
        Err(err) => fail(err),
    }
}

// ─── Entry point ────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    if let Some(log) = &cli.log {
        if let Err(err) = init_logging(log) {
            fail(format!("cannot open log {}: {err}", log.display()));
        }
    }

    let path = config_path(&cli);
    match cli.command {
        Some(Command::Config(ConfigCommand::Init)) => config_init(path),
        Some(Command::Config(ConfigCommand::Show)) => config_show(path.as_deref()),
        None => edit(cli.file.as_deref(), load_config(path.as_deref())),
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_file_argument() {
        let cli = Cli::try_parse_from(["quill", "notes.txt"]).unwrap();
        assert_eq!(cli.file, Some(PathBuf::from("notes.txt")));
        assert!(cli.command.is_none());
    }

    #[test]
    fn parses_config_subcommands() {
        let cli = Cli::try_parse_from(["quill", "config", "init"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Config(ConfigCommand::Init))));

        let cli = Cli::try_parse_from(["quill", "config", "show", "--config", "/tmp/q.conf"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Config(ConfigCommand::Show))));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/q.conf")));
    }

    #[test]
    fn global_options_before_file() {
        let cli = Cli::try_parse_from(["quill", "--log", "q.log", "a.txt"]).unwrap();
        assert_eq!(cli.log, Some(PathBuf::from("q.log")));
        assert_eq!(cli.file, Some(PathBuf::from("a.txt")));
    }

    #[test]
    fn explicit_config_path_wins() {
        let cli = Cli::try_parse_from(["quill", "--config", "x.conf"]).unwrap();
        assert_eq!(config_path(&cli), Some(PathBuf::from("x.conf")));
    }

    #[test]
    fn missing_config_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(&dir.path().join("absent.conf")));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn config_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("q.conf");
        std::fs::write(&path, "tab_size = 8\nshow_line_numbers = no\n").unwrap();
        let config = load_config(Some(&path));
        assert_eq!(config.tab_size, 8);
        assert!(!config.show_line_numbers);
    }
}
