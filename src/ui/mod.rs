//! Terminal interaction: messages, prompts, and progress.
//!
//! Everything the library tells or asks the user goes through one
//! [`UserInteraction`] value, created once at startup by
//! [`select_interface`] and passed down by reference.

pub mod dumb;
pub mod rich;

use std::collections::BTreeMap;

use crate::error::{Result, ThrowError};

pub use dumb::DumbTerminal;
pub use rich::RichTerminal;

/// Maximum width of re-flowed message text.
pub const MAX_WIDTH: usize = 72;

/// The capabilities the library needs from a user interface.
///
/// Implementors supply the raw primitives; the typed prompts
/// (`input_*`) are built on top of [`UserInteraction::read_line`] and
/// may be overridden by richer front-ends.
pub trait UserInteraction {
    /// Show informational text. Paragraphs are separated by blank lines.
    fn message(&self, text: &str);

    /// Show an error.
    fn error(&self, text: &str);

    /// Visually separate what follows from what came before.
    fn new_section(&self);

    /// Show `prompt` and read one line. End of input is [`ThrowError::Cancelled`].
    fn read_line(&self, prompt: &str) -> Result<String>;

    /// Like [`UserInteraction::read_line`], without echoing the answer.
    fn read_secret(&self, prompt: &str) -> Result<String>;

    /// Begin a progress display counting `unit`s.
    fn start_progress(&self, unit: ProgressUnit);

    /// `done` of `total` units are complete.
    fn update_progress(&self, done: u64, total: u64);

    /// Close the progress display.
    fn end_progress(&self);

    /// Ask for a line of text. An empty answer selects `default`.
    fn input_text(&self, prompt: &str, default: Option<&str>) -> Result<String> {
        let full = match default {
            Some(d) => format!("{prompt} [{d}]: "),
            None => format!("{prompt}: "),
        };
        let answer = self.read_line(&full)?;
        match default {
            Some(d) if answer.is_empty() => Ok(d.to_string()),
            _ => Ok(answer),
        }
    }

    /// Ask a yes/no question until the answer starts with `y` or `n`.
    fn input_boolean(&self, prompt: &str, default: Option<bool>) -> Result<bool> {
        let default_str = default.map(|d| if d { "YES" } else { "NO" });
        loop {
            let answer = self.input_text(&format!("{prompt} (YES/NO)"), default_str)?;
            match answer.chars().next() {
                Some('y' | 'Y') => return Ok(true),
                Some('n' | 'N') => return Ok(false),
                _ => self.message(
                    "I'm afraid I didn't understand that: please type 'YES' or 'NO'.",
                ),
            }
        }
    }

    /// Ask for an integer until one is given.
    fn input_integer(&self, prompt: &str, default: Option<i64>) -> Result<i64> {
        let default_str = default.map(|d| d.to_string());
        loop {
            let answer = self.input_text(prompt, default_str.as_deref())?;
            match answer.trim().parse::<i64>() {
                Ok(n) => return Ok(n),
                Err(_) => self.error("I expected a number, try again."),
            }
        }
    }

    /// Ask for several fields in order, after an optional preamble.
    fn input_fields(&self, preamble: Option<&str>, fields: &[FieldSpec]) -> Result<FieldValues> {
        self.new_section();
        if let Some(preamble) = preamble {
            self.message(preamble);
        }
        if fields.iter().any(|f| f.default.is_some()) {
            self.message(
                "Some questions have default answers which can be selected by \
                 pressing 'Enter' at the prompt.",
            );
        }

        let mut values = FieldValues::new();
        for field in fields {
            let value = match field.kind {
                FieldKind::Text => {
                    let default = field.default.as_ref().and_then(FieldValue::as_str);
                    FieldValue::Text(self.input_text(&field.prompt, default)?)
                }
                FieldKind::Password => {
                    FieldValue::Text(self.read_secret(&format!("{}: ", field.prompt))?)
                }
                FieldKind::Boolean => {
                    let default = field.default.as_ref().and_then(FieldValue::as_bool);
                    FieldValue::Boolean(self.input_boolean(&field.prompt, default)?)
                }
                FieldKind::Integer => {
                    let default = field.default.as_ref().and_then(FieldValue::as_integer);
                    FieldValue::Integer(self.input_integer(&field.prompt, default)?)
                }
            };
            values.insert(field.name.clone(), value);
        }
        Ok(values)
    }
}

/// What a progress display counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressUnit {
    /// Bytes of one transfer.
    Bytes,
    /// Whole files.
    Files,
}

/// What kind of answer a field expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    /// Text that is not echoed.
    Password,
    Boolean,
    Integer,
}

/// One answer collected by [`UserInteraction::input_fields`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Boolean(bool),
    Integer(i64),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// The JSON form stored in configuration.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            FieldValue::Text(s) => serde_json::Value::from(s.as_str()),
            FieldValue::Boolean(b) => serde_json::Value::from(*b),
            FieldValue::Integer(n) => serde_json::Value::from(*n),
        }
    }
}

/// Answers keyed by field name.
pub type FieldValues = BTreeMap<String, FieldValue>;

/// A field to ask for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Key in the returned [`FieldValues`].
    pub name: String,
    /// What the user is shown.
    pub prompt: String,
    pub kind: FieldKind,
    pub default: Option<FieldValue>,
}

impl FieldSpec {
    pub fn new(name: &str, prompt: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            prompt: prompt.to_string(),
            kind,
            default: None,
        }
    }

    pub fn with_default(mut self, default: FieldValue) -> Self {
        self.default = Some(default);
        self
    }
}

/// Pick the interface variant: the rich one only when stdout is an
/// interactive terminal that is not `TERM=dumb`.
pub fn select_interface() -> Box<dyn UserInteraction> {
    let term = console::Term::stdout();
    let dumb_term = std::env::var("TERM").is_ok_and(|t| t == "dumb");
    if term.is_term() && !dumb_term {
        tracing::debug!("Using rich terminal interface");
        Box::new(RichTerminal::new())
    } else {
        tracing::debug!("Using dumb terminal interface");
        Box::new(DumbTerminal::new())
    }
}

/// Re-flow `text` into paragraphs no wider than `width`.
///
/// Paragraphs are separated by blank lines; whitespace inside a
/// paragraph is collapsed. Words longer than `width` are kept whole.
pub fn reflow(text: &str, width: usize) -> String {
    let mut out = String::new();
    for paragraph in text.split("\n\n") {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        if words.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        let mut line_len = 0;
        for word in words {
            if line_len > 0 && line_len + 1 + word.len() > width {
                out.push('\n');
                line_len = 0;
            } else if line_len > 0 {
                out.push(' ');
                line_len += 1;
            }
            out.push_str(word);
            line_len += word.len();
        }
        out.push('\n');
    }
    out
}

fn interaction_error(e: impl std::fmt::Display) -> ThrowError {
    ThrowError::Interaction(e.to_string())
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted interface for unit tests.

    use std::cell::RefCell;
    use std::collections::VecDeque;

    use super::*;

    #[derive(Default)]
    pub struct ScriptedUi {
        pub answers: RefCell<VecDeque<String>>,
        pub messages: RefCell<Vec<String>>,
        pub errors: RefCell<Vec<String>>,
        pub progress: RefCell<Vec<(u64, u64)>>,
        pub progress_units: RefCell<Vec<ProgressUnit>>,
    }

    impl ScriptedUi {
        pub fn with_answers(answers: &[&str]) -> Self {
            let ui = Self::default();
            ui.answers
                .borrow_mut()
                .extend(answers.iter().map(|a| a.to_string()));
            ui
        }
    }

    impl UserInteraction for ScriptedUi {
        fn message(&self, text: &str) {
            self.messages.borrow_mut().push(text.to_string());
        }
        fn error(&self, text: &str) {
            self.errors.borrow_mut().push(text.to_string());
        }
        fn new_section(&self) {}
        fn read_line(&self, _prompt: &str) -> Result<String> {
            self.answers
                .borrow_mut()
                .pop_front()
                .ok_or(ThrowError::Cancelled)
        }
        fn read_secret(&self, prompt: &str) -> Result<String> {
            self.read_line(prompt)
        }
        fn start_progress(&self, unit: ProgressUnit) {
            self.progress_units.borrow_mut().push(unit);
        }
        fn update_progress(&self, done: u64, total: u64) {
            self.progress.borrow_mut().push((done, total));
        }
        fn end_progress(&self) {}
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedUi;
    use super::*;

    #[test]
    fn test_reflow_wraps_and_collapses() {
        let text = "  one two   three\n four\n\nfive six  ";
        assert_eq!(reflow(text, 9), "one two\nthree\nfour\n\nfive six\n");
    }

    #[test]
    fn test_input_text_default() {
        let ui = ScriptedUi::with_answers(&["", "given"]);
        assert_eq!(ui.input_text("Port", Some("25")).unwrap(), "25");
        assert_eq!(ui.input_text("Host", Some("x")).unwrap(), "given");
    }

    #[test]
    fn test_input_boolean_retries() {
        let ui = ScriptedUi::with_answers(&["maybe", "Yes"]);
        assert!(ui.input_boolean("Save?", None).unwrap());
        assert_eq!(ui.messages.borrow().len(), 1);

        let ui = ScriptedUi::with_answers(&[""]);
        assert!(!ui.input_boolean("Save?", Some(false)).unwrap());
    }

    #[test]
    fn test_input_integer_retries() {
        let ui = ScriptedUi::with_answers(&["abc", "587"]);
        assert_eq!(ui.input_integer("Port", None).unwrap(), 587);
        assert_eq!(ui.errors.borrow().len(), 1);
    }

    #[test]
    fn test_input_fields_in_order() {
        let ui = ScriptedUi::with_answers(&["smtp.example.com", "", "n", "s3cret"]);
        let fields = [
            FieldSpec::new("host", "SMTP host", FieldKind::Text),
            FieldSpec::new("port", "SMTP port", FieldKind::Integer)
                .with_default(FieldValue::Integer(25)),
            FieldSpec::new("use_tls", "Use TLS", FieldKind::Boolean),
            FieldSpec::new("password", "Password", FieldKind::Password),
        ];
        let values = ui.input_fields(Some("SMTP settings"), &fields).unwrap();

        assert_eq!(values["host"], FieldValue::Text("smtp.example.com".into()));
        assert_eq!(values["port"], FieldValue::Integer(25));
        assert_eq!(values["use_tls"], FieldValue::Boolean(false));
        assert_eq!(values["password"].to_json(), serde_json::json!("s3cret"));
    }

    #[test]
    fn test_end_of_input_cancels() {
        let ui = ScriptedUi::default();
        assert!(matches!(
            ui.input_text("Anything", None),
            Err(ThrowError::Cancelled)
        ));
    }
}
