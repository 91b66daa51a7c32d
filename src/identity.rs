//! The sender identity: full name and e-mail address.

use lettre::message::Mailbox;
use lettre::Address;
use serde_json::Value;

use crate::config::ConfigStore;
use crate::error::{Result, ThrowError};
use crate::model::message::{BodyPart, RenderedMessage};
use crate::transport::MailTransport;

/// Who the files are sent from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    name: String,
    address: Address,
}

impl Identity {
    /// Create an identity. The address must be a valid bare e-mail address.
    pub fn new(name: impl Into<String>, email: &str) -> Result<Self> {
        let address = email
            .trim()
            .parse::<Address>()
            .map_err(|_| ThrowError::InvalidAddress(email.to_string()))?;
        let identity = Self {
            name: name.into().trim().to_string(),
            address,
        };
        tracing::info!(identity = %identity.rfc2822_address(), "Initialised identity");
        Ok(identity)
    }

    /// Load the default identity from the `user` section.
    pub fn load(config: &dyn ConfigStore) -> Result<Self> {
        let name = config.get_string("user", "name")?;
        let email = config.get_string("user", "email")?;
        Self::new(name, &email)
    }

    /// Store this identity as the default.
    pub fn save(&self, config: &mut dyn ConfigStore) -> Result<()> {
        config.set("user", "name", Value::from(self.name.as_str()))?;
        config.set("user", "email", Value::from(self.email()))?;
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The bare address, used as the envelope sender.
    pub fn email(&self) -> String {
        self.address.to_string()
    }

    /// `Name <user@host>`, quoting the name when needed.
    pub fn rfc2822_address(&self) -> String {
        let name = (!self.name.is_empty()).then(|| self.name.clone());
        Mailbox::new(name, self.address.clone()).to_string()
    }
}

/// Send a short message from `identity` to itself to check the mail setup.
pub fn send_test_email(identity: &Identity, transport: &dyn MailTransport) -> Result<()> {
    let mut message = RenderedMessage::single(BodyPart::text(
        "text/plain; charset=utf-8",
        "This is an example email from throw.",
    ));
    message.set_header("From", identity.rfc2822_address());
    message.set_header("To", identity.rfc2822_address());
    message.set_header("Subject", "A test email from throw");

    let bytes = message.to_bytes()?;
    transport.send(&identity.email(), &[identity.email()], &bytes)?;
    tracing::info!(to = %identity.email(), "Sent test email");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JsonConfigStore;

    #[test]
    fn test_rfc2822_address() {
        let id = Identity::new("Ada Lovelace", "ada@example.com").unwrap();
        let rendered = id.rfc2822_address();
        assert!(rendered.contains("Ada Lovelace"), "{rendered}");
        assert!(rendered.ends_with(" <ada@example.com>"), "{rendered}");
        assert_eq!(id.email(), "ada@example.com");

        let id = Identity::new("Lovelace, Ada", "ada@example.com").unwrap();
        let rendered = id.rfc2822_address();
        assert!(rendered.starts_with("\"Lovelace, Ada\""), "{rendered}");

        let id = Identity::new("", "ada@example.com").unwrap();
        assert_eq!(id.rfc2822_address(), "ada@example.com");
    }

    #[test]
    fn test_invalid_address() {
        assert!(matches!(
            Identity::new("Ada", "not-an-address"),
            Err(ThrowError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let mut store = JsonConfigStore::in_memory();
        assert!(matches!(
            Identity::load(&store),
            Err(ThrowError::MissingConfig { .. })
        ));

        let id = Identity::new("Ada Lovelace", "ada@example.com").unwrap();
        id.save(&mut store).unwrap();
        assert_eq!(Identity::load(&store).unwrap(), id);
    }
}
