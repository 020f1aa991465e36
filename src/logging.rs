//! Console output for interactive and cron use.
//!
//! Everything goes to stderr so stdout stays clean for `check` output.

use std::fmt::Display;

#[derive(Clone, Copy, Debug, Default)]
pub struct Logger {
    verbose: u8,
    quiet: bool,
}

impl Logger {
    pub fn new(verbose: u8, quiet: bool) -> Self {
        Self { verbose, quiet }
    }

    pub fn info(&self, message: impl Display) {
        if !self.quiet {
            eprintln!("{message}");
        }
    }

    pub fn verbose(&self, level: u8, message: impl Display) {
        if self.enabled(level) {
            eprintln!("{message}");
        }
    }

    /// Errors are printed even in quiet mode.
    pub fn error(&self, message: impl Display) {
        eprintln!("Error: {message}");
    }

    pub fn enabled(&self, level: u8) -> bool {
        !self.quiet && self.verbose >= level
    }

    pub fn quiet(&self) -> bool {
        self.quiet
    }
}
