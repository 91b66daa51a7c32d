//! Colour terminal interface with interactive prompts and progress bars.

use std::cell::RefCell;

use console::{style, Term};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Password};
use indicatif::{ProgressBar, ProgressStyle};

use super::{interaction_error, reflow, ProgressUnit, UserInteraction, MAX_WIDTH};
use crate::error::{Result, ThrowError};

/// Interface for an interactive terminal: red errors, themed prompts,
/// hidden password entry, and a byte progress bar for uploads.
pub struct RichTerminal {
    term: Term,
    theme: ColorfulTheme,
    progress: RefCell<Option<ProgressBar>>,
}

impl RichTerminal {
    pub fn new() -> Self {
        Self {
            term: Term::stdout(),
            theme: ColorfulTheme::default(),
            progress: RefCell::new(None),
        }
    }

    /// Current wrap width: the terminal width, capped at [`MAX_WIDTH`].
    fn width(&self) -> usize {
        let (_rows, cols) = self.term.size();
        usize::from(cols).clamp(20, MAX_WIDTH)
    }
}

impl Default for RichTerminal {
    fn default() -> Self {
        Self::new()
    }
}

impl UserInteraction for RichTerminal {
    fn message(&self, text: &str) {
        println!("{}", reflow(text, self.width()));
    }

    fn error(&self, text: &str) {
        eprintln!("{}", style(reflow(text, self.width())).red());
    }

    fn new_section(&self) {
        println!("{}", style("-".repeat(self.width())).dim());
    }

    fn read_line(&self, prompt: &str) -> Result<String> {
        Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt.trim_end_matches([':', ' ']))
            .allow_empty(true)
            .interact_text()
            .map_err(prompt_error)
    }

    fn read_secret(&self, prompt: &str) -> Result<String> {
        Password::with_theme(&self.theme)
            .with_prompt(prompt.trim_end_matches([':', ' ']))
            .allow_empty_password(true)
            .interact()
            .map_err(prompt_error)
    }

    fn input_text(&self, prompt: &str, default: Option<&str>) -> Result<String> {
        let mut input = Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty(true);
        if let Some(d) = default {
            input = input.default(d.to_string());
        }
        input.interact_text().map_err(prompt_error)
    }

    fn input_boolean(&self, prompt: &str, default: Option<bool>) -> Result<bool> {
        let mut confirm = Confirm::with_theme(&self.theme).with_prompt(prompt);
        if let Some(d) = default {
            confirm = confirm.default(d);
        }
        confirm.interact().map_err(prompt_error)
    }

    fn start_progress(&self, unit: ProgressUnit) {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(progress_template(unit))
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        if let Some(old) = self.progress.replace(Some(pb)) {
            old.finish_and_clear();
        }
    }

    fn update_progress(&self, done: u64, total: u64) {
        if let Some(pb) = self.progress.borrow().as_ref() {
            pb.set_length(total);
            pb.set_position(done);
        }
    }

    fn end_progress(&self) {
        if let Some(pb) = self.progress.take() {
            pb.finish_and_clear();
        }
    }
}

fn progress_template(unit: ProgressUnit) -> &'static str {
    match unit {
        ProgressUnit::Bytes => {
            "{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})"
        }
        ProgressUnit::Files => "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} files",
    }
}

/// End of input and Ctrl-C at a prompt cancel the run; anything else is
/// an interaction failure.
fn prompt_error(e: dialoguer::Error) -> ThrowError {
    use std::io::ErrorKind;

    let cancelled = matches!(
        &e,
        dialoguer::Error::IO(io)
            if matches!(io.kind(), ErrorKind::UnexpectedEof | ErrorKind::Interrupted)
    );
    if cancelled {
        tracing::debug!(error = %e, "Prompt closed");
        ThrowError::Cancelled
    } else {
        interaction_error(e)
    }
}
