//! Dispatch: expand the paths, pick a rendering strategy by total size,
//! address the message, and hand it to the mail transport.

pub mod content_type;
pub mod expand;

use std::path::Path;

use humansize::{format_size, DECIMAL};
use lettre::message::Mailbox;

use crate::error::{Result, ThrowError};
use crate::gallery::GalleryService;
use crate::identity::Identity;
use crate::model::message::RenderedMessage;
use crate::render::{AttachmentRenderer, GalleryRenderer, Renderer};
use crate::transport::MailTransport;
use crate::ui::UserInteraction;

use expand::expand_paths;

/// Payloads of this many bytes or more are uploaded instead of attached.
pub const MAX_EMAIL_SIZE: u64 = 500_000;

/// Subject line used for every dispatch.
pub const SUBJECT: &str = "Files thrown at you";

/// Which rendering strategy a dispatch uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchDecision {
    /// Attach the files to the message.
    InlineAttachment,
    /// Upload the files to a gallery and send links.
    RemoteGallery,
}

impl DispatchDecision {
    /// Decide purely from the total payload size.
    pub fn for_size(total_bytes: u64) -> Self {
        if total_bytes >= MAX_EMAIL_SIZE {
            DispatchDecision::RemoteGallery
        } else {
            DispatchDecision::InlineAttachment
        }
    }
}

/// A rendered, addressed message that has not been sent yet.
#[derive(Debug, Clone)]
pub struct PreparedDispatch {
    pub decision: DispatchDecision,
    pub file_count: usize,
    pub total_bytes: u64,
    /// Envelope sender.
    pub from_address: String,
    /// Envelope recipients, bare addresses.
    pub envelope_to: Vec<String>,
    pub message: RenderedMessage,
}

/// Sends files to recipients through the injected collaborators.
pub struct Dispatcher<'a> {
    ui: &'a dyn UserInteraction,
    gallery: &'a dyn GalleryService,
    transport: &'a dyn MailTransport,
    allow_empty: bool,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        ui: &'a dyn UserInteraction,
        gallery: &'a dyn GalleryService,
        transport: &'a dyn MailTransport,
    ) -> Self {
        Self {
            ui,
            gallery,
            transport,
            allow_empty: false,
        }
    }

    /// Whether an empty file set is sent anyway (default: rejected with
    /// [`ThrowError::NoFiles`]).
    pub fn allow_empty(mut self, allow: bool) -> Self {
        self.allow_empty = allow;
        self
    }

    /// Expand, render, and send. Returns the strategy that was used.
    pub fn dispatch_files<P: AsRef<Path>>(
        &self,
        inputs: &[P],
        recipients: &[String],
        collection_name: Option<&str>,
        identity: &Identity,
    ) -> Result<DispatchDecision> {
        let prepared = self.prepare(inputs, recipients, collection_name, identity)?;
        self.send(&prepared)?;
        Ok(prepared.decision)
    }

    /// Everything up to, but not including, the transport.
    pub fn prepare<P: AsRef<Path>>(
        &self,
        inputs: &[P],
        recipients: &[String],
        collection_name: Option<&str>,
        identity: &Identity,
    ) -> Result<PreparedDispatch> {
        let recipients: Vec<&str> = recipients
            .iter()
            .map(|r| r.trim())
            .filter(|r| !r.is_empty())
            .collect();
        if recipients.is_empty() {
            return Err(ThrowError::NoRecipients);
        }
        let envelope_to = recipients
            .iter()
            .map(|r| {
                r.parse::<Mailbox>()
                    .map(|m| m.email.to_string())
                    .map_err(|_| ThrowError::InvalidAddress(r.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        let files = expand_paths(inputs);
        if files.is_empty() && !self.allow_empty {
            return Err(ThrowError::NoFiles);
        }

        self.ui.new_section();
        self.ui.message(&format!(
            "You've asked me to throw {} file(s) with a total size of {}.",
            files.len(),
            format_size(files.total_bytes(), DECIMAL)
        ));

        let decision = DispatchDecision::for_size(files.total_bytes());
        tracing::info!(
            files = files.len(),
            total_bytes = files.total_bytes(),
            ?decision,
            "Dispatching"
        );

        let renderer: Box<dyn Renderer + '_> = match decision {
            DispatchDecision::InlineAttachment => Box::new(AttachmentRenderer),
            DispatchDecision::RemoteGallery => Box::new(GalleryRenderer::new(self.gallery)),
        };
        let mut message = renderer.render(&files, collection_name, self.ui)?;

        message.set_header("From", identity.rfc2822_address());
        message.set_header("To", recipients.join(", "));
        message.set_header(
            "Subject",
            match collection_name {
                Some(name) => format!("{SUBJECT}: {name}"),
                None => SUBJECT.to_string(),
            },
        );

        Ok(PreparedDispatch {
            decision,
            file_count: files.len(),
            total_bytes: files.total_bytes(),
            from_address: identity.email(),
            envelope_to,
            message,
        })
    }

    /// Serialize and hand a prepared message to the transport.
    /// Transport errors are returned as they are, without retry.
    pub fn send(&self, prepared: &PreparedDispatch) -> Result<()> {
        let bytes = prepared.message.to_bytes()?;
        self.transport
            .send(&prepared.from_address, &prepared.envelope_to, &bytes)
            .map_err(ThrowError::Transport)?;
        tracing::info!(
            recipients = prepared.envelope_to.len(),
            bytes = bytes.len(),
            "Message handed to transport"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_boundary() {
        assert_eq!(
            DispatchDecision::for_size(499_999),
            DispatchDecision::InlineAttachment
        );
        assert_eq!(
            DispatchDecision::for_size(500_000),
            DispatchDecision::RemoteGallery
        );
        assert_eq!(DispatchDecision::for_size(0), DispatchDecision::InlineAttachment);
    }
}
