//! CLI output formatting.
//!
//! Human-readable output by default, one JSON document per command with
//! `--json`, nothing but errors with `--quiet`.

use std::fmt::Display;
use std::sync::{OnceLock, RwLock};

use owo_colors::OwoColorize;
use serde::Serialize;

/// Runtime output configuration shared by CLI handlers.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    /// Emit machine-readable JSON instead of text.
    pub json: bool,
    /// Suppress non-essential output.
    pub quiet: bool,
}

static OUTPUT_CONFIG: OnceLock<RwLock<OutputConfig>> = OnceLock::new();

fn config_cell() -> &'static RwLock<OutputConfig> {
    OUTPUT_CONFIG.get_or_init(|| RwLock::new(OutputConfig::default()))
}

fn read_config() -> OutputConfig {
    match config_cell().read() {
        Ok(config) => *config,
        Err(poisoned) => *poisoned.into_inner(),
    }
}

/// Apply output settings from global CLI flags.
pub fn configure(config: OutputConfig) {
    match config_cell().write() {
        Ok(mut current) => *current = config,
        Err(poisoned) => *poisoned.into_inner() = config,
    }
}

#[must_use]
pub fn is_json() -> bool {
    read_config().json
}

fn suppressed() -> bool {
    let config = read_config();
    config.json || config.quiet
}

/// Print a serializable value as pretty JSON.
pub fn json_output<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => error(&format!("failed to serialize output: {e}")),
    }
}

/// Print the application header with name and version.
pub fn header() {
    if suppressed() {
        return;
    }
    println!("{} {}", "augur".bold(), env!("CARGO_PKG_VERSION").dimmed());
    println!();
}

/// Print a section header.
pub fn section(title: &str) {
    if suppressed() {
        return;
    }
    println!();
    println!("{}", title.bold());
}

/// Print a labeled value.
pub fn field(label: &str, value: impl Display) {
    if suppressed() {
        return;
    }
    println!("  {:<14} {}", label.dimmed(), value);
}

/// Print a block of preformatted text, such as a table.
pub fn block(text: impl Display) {
    if suppressed() {
        return;
    }
    println!("{text}");
}

pub fn success(message: &str) {
    if suppressed() {
        return;
    }
    println!("  {} {}", "✓".green(), message);
}

pub fn warning(message: &str) {
    if suppressed() {
        return;
    }
    println!("  {} {}", "⚠".yellow(), message);
}

/// Print an error line. Shown in every mode.
pub fn error(message: &str) {
    if is_json() {
        eprintln!("{}", serde_json::json!({ "error": message }));
        return;
    }
    eprintln!("  {} {}", "×".red(), message);
}
