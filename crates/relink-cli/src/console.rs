//! Migration log lines printed to the terminal.

use colored::Colorize;
use std::io::{IsTerminal, Write};
use std::sync::Mutex;

use relink_core::{LogTone, MigrationLog};

/// Writes each line to a writer, colouring success and error lines when
/// `ansi` is set.
pub struct ConsoleLog<W: Write> {
    out: Mutex<W>,
    ansi: bool,
}

impl ConsoleLog<std::io::Stdout> {
    /// Log to stdout, coloured when stdout is a terminal.
    pub fn stdout() -> Self {
        let out = std::io::stdout();
        let ansi = out.is_terminal();
        Self::new(out, ansi)
    }
}

impl<W: Write> ConsoleLog<W> {
    pub fn new(out: W, ansi: bool) -> Self {
        // colored only looks at stdout and the environment; `out` may be
        // anything, so colouring is forced on when asked for.
        if ansi {
            colored::control::set_override(true);
        }
        Self {
            out: Mutex::new(out),
            ansi,
        }
    }

    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write> MigrationLog for ConsoleLog<W> {
    fn write(&self, message: &str, tone: LogTone) {
        let mut out = match self.out.lock() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        };
        // A closed pipe must not abort the migration halfway.
        let _ = match (self.ansi, tone) {
            (true, LogTone::Success) => writeln!(out, "{}", message.green()),
            (true, LogTone::Error) => writeln!(out, "{}", message.red()),
            _ => writeln!(out, "{}", message),
        };
    }
}
