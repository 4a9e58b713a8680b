//! ui::output
//!
//! Console output.
//!
//! Results go to stdout; progress, warnings and errors go to stderr so that
//! `got where` style output stays pipeable. Quiet mode silences everything
//! except results and errors.

use std::fmt::Display;

use crate::engine::RunEvent;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Debug,
}

impl Verbosity {
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }

    /// Default `log` filter for this level. `RUST_LOG` overrides it.
    pub fn log_filter(self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Debug => "debug",
        }
    }
}

/// A result line. Always printed.
pub fn result(message: impl Display) {
    println!("{}", message);
}

/// Progress and status (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("{}", message);
    }
}

/// Always shown.
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// Print a runner event.
///
/// Command output keeps its streams: captured stdout goes to stdout and
/// captured stderr to stderr.
pub fn run_event(event: &RunEvent, verbosity: Verbosity) {
    match event {
        RunEvent::Header { repospec, path } => {
            print(format!("==> {} ({})", repospec, path.display()), verbosity)
        }
        RunEvent::Output { output, .. } => {
            if !output.stdout.is_empty() {
                print!("{}", with_newline(&output.stdout));
            }
            if !output.stderr.is_empty() {
                eprint!("{}", with_newline(&output.stderr));
            }
        }
        RunEvent::Warning { repospec, message } => {
            warn(format!("{repospec}: {message}"), verbosity)
        }
        RunEvent::Skipped { repospec, reason } => {
            print(format!("{repospec}: skipped ({reason})"), verbosity)
        }
        RunEvent::IgnoredError { repospec, status } => warn(
            match status {
                Some(code) => format!("{repospec}: Ignored error (exit code {code})"),
                None => format!("{repospec}: Ignored error"),
            },
            verbosity,
        ),
    }
}

fn with_newline(text: &str) -> String {
    if text.ends_with('\n') {
        text.to_string()
    } else {
        format!("{text}\n")
    }
}

/// Format a list of items.
pub fn format_list<T: Display>(items: &[T], prefix: &str) -> String {
    items
        .iter()
        .map(|item| format!("{}{}", prefix, item))
        .collect::<Vec<_>>()
        .join("\n")
}
