//! Plain-text interface for pipes, logs, and dumb terminals.

use std::io::{BufRead, Write};

use super::{interaction_error, reflow, ProgressUnit, UserInteraction, MAX_WIDTH};
use crate::error::{Result, ThrowError};

/// Writes re-flowed text to stdout and reads answers line by line from stdin.
/// No colours and no progress rendering.
#[derive(Debug, Default)]
pub struct DumbTerminal;

impl DumbTerminal {
    pub fn new() -> Self {
        Self
    }
}

impl UserInteraction for DumbTerminal {
    fn message(&self, text: &str) {
        println!("{}", reflow(text, MAX_WIDTH));
    }

    fn error(&self, text: &str) {
        eprintln!("{}", reflow(text, MAX_WIDTH));
    }

    fn new_section(&self) {
        println!("{}", "-".repeat(MAX_WIDTH));
    }

    fn read_line(&self, prompt: &str) -> Result<String> {
        let mut stdout = std::io::stdout().lock();
        write!(stdout, "{prompt}").map_err(interaction_error)?;
        stdout.flush().map_err(interaction_error)?;
        drop(stdout);

        let mut line = String::new();
        let read = std::io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(interaction_error)?;
        if read == 0 {
            return Err(ThrowError::Cancelled);
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn read_secret(&self, prompt: &str) -> Result<String> {
        let term = console::Term::stderr();
        if term.is_term() {
            term.write_str(prompt).map_err(interaction_error)?;
            return term.read_secure_line().map_err(interaction_error);
        }
        tracing::warn!("Input is not a terminal, the answer will be echoed");
        self.read_line(prompt)
    }

    fn start_progress(&self, _unit: ProgressUnit) {}

    fn update_progress(&self, done: u64, total: u64) {
        tracing::trace!(done, total, "Progress");
    }

    fn end_progress(&self) {}
}
