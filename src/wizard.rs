//! Interactive collection of whatever the command line did not provide.

use serde_json::Value;

use crate::config::ConfigStore;
use crate::error::{Result, ThrowError};
use crate::identity::{send_test_email, Identity};
use crate::transport::MailTransport;
use crate::ui::{FieldKind, FieldSpec, FieldValue, FieldValues, UserInteraction};

/// Ask for recipients until at least one is given. An empty answer ends the list.
pub fn collect_recipients(ui: &dyn UserInteraction) -> Result<Vec<String>> {
    ui.new_section();
    ui.message(
        "Before I can throw your files at a recipient, I need to know where to send them.\n\n\
         I'm going to ask you for a list of recipients. I'll keep going until you stop \
         giving me e-mail addresses by just pressing 'enter' at the prompt.",
    );

    loop {
        let mut recipients = Vec::new();
        loop {
            let answer = ui.input_text("E-mail address to send files to", None)?;
            let answer = answer.trim();
            if answer.is_empty() {
                break;
            }
            recipients.push(answer.to_string());
        }

        if !recipients.is_empty() {
            return Ok(recipients);
        }
        ui.error("You need to give me at least one recipient.");
    }
}

/// Ask for the user's name and address, offering a test e-mail.
pub fn input_identity(ui: &dyn UserInteraction, transport: &dyn MailTransport) -> Result<Identity> {
    let fields = [
        FieldSpec::new("name", "Your full name", FieldKind::Text),
        FieldSpec::new("email", "Your email address", FieldKind::Text),
    ];

    let identity = loop {
        let values = ui.input_fields(
            Some(
                "In order to send your files via email, I need to get your name and the \
                 email address you will be using to send the files.",
            ),
            &fields,
        )?;
        let name = text_value(&values, "name");
        let email = text_value(&values, "email");
        match Identity::new(name, &email) {
            Ok(identity) => break identity,
            Err(ThrowError::InvalidAddress(addr)) => {
                ui.error(&format!("'{addr}' doesn't look like an e-mail address, try again."));
            }
            Err(e) => return Err(e),
        }
    };

    if ui.input_boolean("Do you want to try sending a test email to yourself?", Some(false))? {
        match send_test_email(&identity, transport) {
            Ok(()) => ui.message("Test email sent. Check your inbox."),
            Err(e) => ui.error(&format!("The test email could not be sent: {e}")),
        }
    }

    Ok(identity)
}

/// Capture an identity and store it as the default.
pub fn set_identity(
    ui: &dyn UserInteraction,
    config: &mut dyn ConfigStore,
    transport: &dyn MailTransport,
) -> Result<Identity> {
    let identity = input_identity(ui, transport)?;
    identity.save(config)?;
    ui.new_section();
    ui.message(
        "Your default identity has been saved to the configuration.\n\n\
         If you want to modify this information at any future time, you can do so \
         with the following command:\n\n\
         throw --set identity",
    );
    Ok(identity)
}

/// The saved identity, or a new one captured interactively (and saved if
/// the user agrees).
pub fn default_identity(
    ui: &dyn UserInteraction,
    config: &mut dyn ConfigStore,
    transport: &dyn MailTransport,
) -> Result<Identity> {
    match Identity::load(config) {
        Ok(identity) => return Ok(identity),
        Err(ThrowError::MissingConfig { section, option }) => {
            tracing::info!(%section, %option, "No saved identity");
        }
        Err(e) => return Err(e),
    }

    let identity = input_identity(ui, transport)?;
    if ui.input_boolean("Save this information for next time?", Some(true))? {
        identity.save(config)?;
    }
    Ok(identity)
}

/// Ask for the SMTP settings and store them in the `smtp` section.
pub fn input_smtp(ui: &dyn UserInteraction, config: &mut dyn ConfigStore) -> Result<()> {
    let current = config.section_with_defaults("smtp");
    let text_default = |key: &str| {
        current
            .get(key)
            .and_then(Value::as_str)
            .map(|s| FieldValue::Text(s.to_string()))
    };
    let bool_default = |key: &str| {
        current
            .get(key)
            .and_then(Value::as_bool)
            .map(FieldValue::Boolean)
    };

    let mut fields = vec![
        with_optional_default(
            FieldSpec::new("host", "SMTP server host", FieldKind::Text),
            text_default("host"),
        ),
        with_optional_default(
            FieldSpec::new("port", "SMTP server port", FieldKind::Integer),
            current.get("port").and_then(Value::as_i64).map(FieldValue::Integer),
        ),
        with_optional_default(
            FieldSpec::new("use_tls", "Use STARTTLS", FieldKind::Boolean),
            bool_default("use_tls"),
        ),
        with_optional_default(
            FieldSpec::new("use_ssl", "Use SSL (SMTPS)", FieldKind::Boolean),
            bool_default("use_ssl"),
        ),
        with_optional_default(
            FieldSpec::new("username", "Username (empty for none)", FieldKind::Text),
            text_default("username"),
        ),
    ];
    fields.push(FieldSpec::new("password", "Password", FieldKind::Password));

    let values = ui.input_fields(
        Some(
            "When there is no mail server running on this machine, I send mail through \
             an SMTP server. Tell me which one to use.",
        ),
        &fields,
    )?;

    for (option, value) in &values {
        let json = match value {
            FieldValue::Text(s) if s.is_empty() => Value::Null,
            FieldValue::Integer(n) if option == "port" => match u16::try_from(*n) {
                Ok(port) => Value::from(port),
                Err(_) => {
                    ui.error(&format!("{n} is not a valid port, keeping the previous one."));
                    continue;
                }
            },
            other => other.to_json(),
        };
        config.set("smtp", option, json)?;
    }

    ui.message("Your SMTP settings have been saved.");
    Ok(())
}

fn with_optional_default(spec: FieldSpec, default: Option<FieldValue>) -> FieldSpec {
    match default {
        Some(d) => spec.with_default(d),
        None => spec,
    }
}

fn text_value(values: &FieldValues, key: &str) -> String {
    values
        .get(key)
        .and_then(FieldValue::as_str)
        .unwrap_or_default()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::config::{JsonConfigStore, SmtpConfig};
    use crate::transport::TransportError;
    use crate::ui::testing::ScriptedUi;

    #[derive(Default)]
    struct RecordingTransport {
        sent: RefCell<Vec<(String, Vec<String>)>>,
    }

    impl MailTransport for RecordingTransport {
        fn send(
            &self,
            from: &str,
            to: &[String],
            _message: &[u8],
        ) -> std::result::Result<(), TransportError> {
            self.sent.borrow_mut().push((from.to_string(), to.to_vec()));
            Ok(())
        }
    }

    #[test]
    fn test_collect_recipients_restarts_when_empty() {
        let ui = ScriptedUi::with_answers(&["", "x@example.com", " y@example.com ", ""]);
        let recipients = collect_recipients(&ui).unwrap();
        assert_eq!(recipients, ["x@example.com", "y@example.com"]);
        assert_eq!(ui.errors.borrow().len(), 1);
    }

    #[test]
    fn test_default_identity_prefers_saved() {
        let mut store = JsonConfigStore::in_memory();
        Identity::new("Ada", "ada@example.com")
            .unwrap()
            .save(&mut store)
            .unwrap();
        let ui = ScriptedUi::default();
        let id = default_identity(&ui, &mut store, &RecordingTransport::default()).unwrap();
        assert_eq!(id.email(), "ada@example.com");
    }

    #[test]
    fn test_default_identity_prompts_and_saves() {
        let mut store = JsonConfigStore::in_memory();
        let transport = RecordingTransport::default();
        let ui = ScriptedUi::with_answers(&[
            "Ada Lovelace",
            "bad address",
            "Ada Lovelace",
            "ada@example.com",
            "yes",
            "",
        ]);
        let id = default_identity(&ui, &mut store, &transport).unwrap();

        assert_eq!(id.name(), "Ada Lovelace");
        assert_eq!(ui.errors.borrow().len(), 1);
        assert_eq!(
            *transport.sent.borrow(),
            [("ada@example.com".to_string(), vec!["ada@example.com".to_string()])]
        );
        assert_eq!(Identity::load(&store).unwrap(), id);
    }

    #[test]
    fn test_input_smtp_saves_section() {
        let mut store = JsonConfigStore::in_memory();
        let ui = ScriptedUi::with_answers(&["smtp.example.com", "465", "no", "yes", "ada", "pw"]);
        input_smtp(&ui, &mut store).unwrap();

        let smtp = SmtpConfig::from_store(&store).unwrap();
        assert_eq!(smtp.host.as_deref(), Some("smtp.example.com"));
        assert_eq!(smtp.port, 465);
        assert!(!smtp.use_tls);
        assert!(smtp.use_ssl);
        assert_eq!(smtp.username.as_deref(), Some("ada"));
        assert_eq!(smtp.password.as_deref(), Some("pw"));
    }

    #[test]
    fn test_input_smtp_empty_username_clears() {
        let mut store = JsonConfigStore::in_memory();
        let ui = ScriptedUi::with_answers(&["mail.example.com", "", "", "", "", ""]);
        input_smtp(&ui, &mut store).unwrap();

        let smtp = SmtpConfig::from_store(&store).unwrap();
        assert_eq!(smtp.port, 25);
        assert_eq!(smtp.username, None);
        assert_eq!(smtp.password, None);
    }
}
