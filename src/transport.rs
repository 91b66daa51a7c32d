//! Mail submission.
//!
//! [`SmtpMailTransport`] first tries an unauthenticated relay on
//! `localhost:25`, then falls back to the configured SMTP server.
//! Nothing is retried beyond that single fallback.

use std::time::Duration;

use lettre::address::{Address, Envelope};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{SmtpTransport, Transport};
use thiserror::Error;

use crate::config::SmtpConfig;

/// Connection timeout for each SMTP attempt.
const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for the local relay attempt; a missing relay should fail fast.
const LOCAL_RELAY_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors reported by a [`MailTransport`].
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("Invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Invalid envelope: {0}")]
    Envelope(String),

    /// The local relay failed and no SMTP host is configured.
    #[error("No SMTP host configured (local relay failed: {0})")]
    NotConfigured(String),

    /// The server refused the message.
    #[error("Message rejected: {0}")]
    Rejected(String),
}

/// Something that can deliver a serialized message.
pub trait MailTransport {
    /// Deliver `message` to every address in `to`, with `from` as envelope sender.
    fn send(&self, from: &str, to: &[String], message: &[u8]) -> Result<(), TransportError>;
}

/// SMTP delivery through `lettre`.
pub struct SmtpMailTransport {
    config: SmtpConfig,
}

impl SmtpMailTransport {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    fn local_relay(&self) -> SmtpTransport {
        SmtpTransport::builder_dangerous("localhost")
            .port(25)
            .timeout(Some(LOCAL_RELAY_TIMEOUT))
            .build()
    }

    fn configured_relay(&self, host: &str) -> Result<SmtpTransport, TransportError> {
        let builder = if self.config.use_ssl {
            SmtpTransport::relay(host)?
        } else if self.config.use_tls {
            SmtpTransport::starttls_relay(host)?
        } else {
            SmtpTransport::builder_dangerous(host)
        };

        let mut builder = builder
            .port(self.config.port)
            .timeout(Some(SMTP_TIMEOUT));
        if let Some(username) = &self.config.username {
            let password = self.config.password.clone().unwrap_or_default();
            builder = builder.credentials(Credentials::new(username.clone(), password));
        }
        Ok(builder.build())
    }
}

impl MailTransport for SmtpMailTransport {
    fn send(&self, from: &str, to: &[String], message: &[u8]) -> Result<(), TransportError> {
        let envelope = envelope(from, to)?;

        let local_failure = if self.config.try_local_relay {
            match self.local_relay().send_raw(&envelope, message) {
                Ok(_) => {
                    tracing::info!(recipients = to.len(), "Sent via local relay");
                    return Ok(());
                }
                Err(e) if e.is_permanent() => {
                    tracing::warn!(error = %e, "Local relay rejected the message");
                    return Err(TransportError::Smtp(e));
                }
                Err(e) => {
                    tracing::info!(error = %e, "Local relay unavailable, falling back");
                    e.to_string()
                }
            }
        } else {
            "disabled".to_string()
        };

        let host = self
            .config
            .host
            .as_deref()
            .ok_or(TransportError::NotConfigured(local_failure))?;
        self.configured_relay(host)?.send_raw(&envelope, message)?;
        tracing::info!(host, recipients = to.len(), "Sent via configured SMTP server");
        Ok(())
    }
}

/// Build the SMTP envelope. Addresses must be bare (`user@host`).
pub fn envelope(from: &str, to: &[String]) -> Result<Envelope, TransportError> {
    let from: Address = from.trim().parse()?;
    let to = to
        .iter()
        .map(|r| r.trim().parse::<Address>())
        .collect::<Result<Vec<_>, _>>()?;
    Envelope::new(Some(from), to).map_err(|e| TransportError::Envelope(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope() {
        let env = envelope("ada@example.com", &["x@example.com".into(), " y@example.org ".into()])
            .unwrap();
        assert_eq!(env.to().len(), 2);
        assert_eq!(env.from().map(|a| a.to_string()).as_deref(), Some("ada@example.com"));
    }

    #[test]
    fn test_envelope_rejects_bad_address() {
        assert!(matches!(
            envelope("ada@example.com", &["nobody".into()]),
            Err(TransportError::Address(_))
        ));
        assert!(matches!(
            envelope("ada@example.com", &[]),
            Err(TransportError::Envelope(_))
        ));
    }

    #[test]
    fn test_no_host_and_no_relay_is_not_configured() {
        let transport = SmtpMailTransport::new(SmtpConfig {
            try_local_relay: false,
            ..SmtpConfig::default()
        });
        let err = transport
            .send("ada@example.com", &["x@example.com".into()], b"Subject: x\r\n\r\nhi")
            .unwrap_err();
        assert!(matches!(err, TransportError::NotConfigured(_)));
    }
}
