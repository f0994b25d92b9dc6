//! Purpose: Prefixed status lines for the CLI, ANSI-colored when enabled.
//! Exports: `Console`, `error_text`.
//! Invariants: Progress and success lines go to stdout; errors go to stderr.
//! Invariants: With color disabled the output is plain text with the same prefixes.
use std::error::Error as StdError;

use resolve_glib_patch::core::error::{Error, ErrorKind};

#[derive(Copy, Clone, Debug)]
enum AnsiColor {
    Red,
    Yellow,
    Green,
    Blue,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
        AnsiColor::Green => "32",
        AnsiColor::Blue => "34",
    };
    format!("\u{1b}[1;{code}m{label}\u{1b}[0m")
}

#[derive(Copy, Clone, Debug)]
pub(crate) struct Console {
    color: bool,
}

impl Console {
    pub(crate) fn new(color: bool) -> Self {
        Self { color }
    }

    /// Action in progress.
    pub(crate) fn step(&self, message: impl AsRef<str>) {
        println!(
            "{} {}",
            colorize_label("==>", self.color, AnsiColor::Blue),
            message.as_ref()
        );
    }

    pub(crate) fn detail(&self, message: impl AsRef<str>) {
        println!("    {}", message.as_ref());
    }

    pub(crate) fn success(&self, message: impl AsRef<str>) {
        println!(
            "{} {}",
            colorize_label("ok:", self.color, AnsiColor::Green),
            message.as_ref()
        );
    }

    pub(crate) fn warn(&self, message: impl AsRef<str>) {
        println!(
            "{} {}",
            colorize_label("warning:", self.color, AnsiColor::Yellow),
            message.as_ref()
        );
    }

    pub(crate) fn error(&self, err: &Error) {
        eprintln!("{}", error_text(err, self.color));
    }
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::NotFound => "not found".to_string(),
        ErrorKind::Empty => "no matching libraries".to_string(),
        ErrorKind::Inconsistent => "inconsistent patch state".to_string(),
        ErrorKind::Permission => "permission denied".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

pub(crate) fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    ));

    if let Some(hint) = err.hint() {
        lines.push(format!(
            "{} {hint}",
            colorize_label("hint:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(path) = err.path() {
        lines.push(format!(
            "{} {}",
            colorize_label("path:", use_color, AnsiColor::Yellow),
            path.display()
        ));
    }

    let causes = error_causes(err);
    if let Some(cause) = causes.first() {
        lines.push(format!(
            "{} {cause}",
            colorize_label("caused by:", use_color, AnsiColor::Yellow)
        ));
    }

    lines.join("\n")
}
