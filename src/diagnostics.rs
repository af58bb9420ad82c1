//! Error-reporting context threaded through scanning, parsing, resolution
//! and evaluation.
//!
//! One `Diagnostics` value is owned by whoever drives a run (the CLI, the
//! REPL, a test) and passed down explicitly.  It records every reported
//! error, renders it to standard error, and exposes the two flags the caller
//! uses to pick an exit status: "a syntax/semantic error occurred" and "a
//! runtime error occurred".

use log::debug;

use crate::error::LoxError;

#[derive(Debug, Default)]
pub struct Diagnostics {
    had_error: bool,
    had_runtime_error: bool,
    reports: Vec<LoxError>,
    silent: bool,
}

impl Diagnostics {
    /// A context that echoes every report to standard error.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context that only records reports.
    pub fn silent() -> Self {
        Self {
            silent: true,
            ..Self::default()
        }
    }

    /// Record `error` and raise the matching flag.
    pub fn report(&mut self, error: LoxError) {
        debug!("Reporting error: {:?}", error);

        if error.is_static() {
            self.had_error = true;
        } else {
            self.had_runtime_error = true;
        }

        if !self.silent {
            eprintln!("{}", error);
        }

        self.reports.push(error);
    }

    pub fn had_error(&self) -> bool {
        self.had_error
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    /// Errors reported since the last [`reset`](Self::reset), oldest first.
    pub fn reports(&self) -> &[LoxError] {
        &self.reports
    }

    /// Clear both flags and the recorded reports before the next unit of
    /// input (one file, or one REPL line).
    pub fn reset(&mut self) {
        self.had_error = false;
        self.had_runtime_error = false;
        self.reports.clear();
    }
}
