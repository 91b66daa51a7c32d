//! Rendered message bodies and their RFC 5322 serialization.
//!
//! A renderer produces the body parts; the dispatcher adds the `From`,
//! `To` and `Subject` headers afterwards. Serialization goes through
//! `lettre`'s message builder, which also supplies `Date`,
//! `Message-ID` and `MIME-Version`.

use lettre::message::header::{ContentDisposition, ContentTransferEncoding, ContentType};
use lettre::message::{Mailbox, Mailboxes, MultiPart, SinglePart};

use crate::error::{Result, ThrowError};

/// Content of a body part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Binary(Vec<u8>),
}

impl Payload {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(s) => Some(s),
            Payload::Binary(_) => None,
        }
    }
}

/// Content-Transfer-Encoding requested for a part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// Let the MIME builder pick the smallest safe encoding.
    Auto,
    /// Always base64.
    Base64,
}

/// Content-Disposition of a part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Attachment { filename: String },
}

/// One MIME part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyPart {
    /// Full content type, parameters included (`text/plain; format=flowed`).
    pub content_type: String,
    pub disposition: Option<Disposition>,
    pub payload: Payload,
    pub transfer_encoding: TransferEncoding,
}

impl BodyPart {
    /// A plain-text part with no disposition.
    pub fn text(content_type: &str, text: impl Into<String>) -> Self {
        Self {
            content_type: content_type.to_string(),
            disposition: None,
            payload: Payload::Text(text.into()),
            transfer_encoding: TransferEncoding::Auto,
        }
    }

    /// Filename from the `attachment` disposition, if any.
    pub fn filename(&self) -> Option<&str> {
        match &self.disposition {
            Some(Disposition::Attachment { filename }) => Some(filename),
            None => None,
        }
    }

    fn to_single_part(&self) -> Result<SinglePart> {
        let content_type = ContentType::parse(&self.content_type).map_err(|e| {
            ThrowError::MessageBuild(format!("content type '{}': {e}", self.content_type))
        })?;

        let mut builder = SinglePart::builder().header(content_type);
        if let Some(Disposition::Attachment { filename }) = &self.disposition {
            builder = builder.header(ContentDisposition::attachment(filename));
        }
        if self.transfer_encoding == TransferEncoding::Base64 {
            builder = builder.header(ContentTransferEncoding::Base64);
        }

        Ok(match &self.payload {
            Payload::Text(text) => builder.body(text.clone()),
            Payload::Binary(bytes) => builder.body(bytes.clone()),
        })
    }
}

/// How the parts are assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyLayout {
    /// The message body is exactly one part.
    Single,
    /// A `multipart/mixed` container holding every part in order.
    Mixed,
}

/// A transport-ready message: body parts plus top-level headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    layout: BodyLayout,
    parts: Vec<BodyPart>,
    headers: Vec<(String, String)>,
}

impl RenderedMessage {
    /// A message whose whole body is `part`.
    pub fn single(part: BodyPart) -> Self {
        Self {
            layout: BodyLayout::Single,
            parts: vec![part],
            headers: Vec::new(),
        }
    }

    /// A `multipart/mixed` message.
    pub fn mixed(parts: Vec<BodyPart>) -> Self {
        Self {
            layout: BodyLayout::Mixed,
            parts,
            headers: Vec::new(),
        }
    }

    pub fn layout(&self) -> BodyLayout {
        self.layout
    }

    pub fn parts(&self) -> &[BodyPart] {
        &self.parts
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Set a header, replacing any previous value (names are case-insensitive).
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some(slot) => slot.1 = value,
            None => self.headers.push((name.to_string(), value)),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Serialize to RFC 5322 bytes.
    ///
    /// `From` and `To` must be set and parse as mailboxes. Only `From`,
    /// `To` and `Subject` are carried; other headers are dropped with a
    /// warning.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut builder = lettre::Message::builder();

        for (name, value) in &self.headers {
            match name.to_ascii_lowercase().as_str() {
                "from" => {
                    let from: Mailbox = value
                        .parse()
                        .map_err(|_| ThrowError::InvalidAddress(value.clone()))?;
                    builder = builder.from(from);
                }
                "to" => {
                    let to: Mailboxes = value
                        .parse()
                        .map_err(|_| ThrowError::InvalidAddress(value.clone()))?;
                    for mailbox in to {
                        builder = builder.to(mailbox);
                    }
                }
                "subject" => builder = builder.subject(value.clone()),
                other => {
                    tracing::warn!(header = other, "Header not carried by the serializer");
                }
            }
        }

        let message = match self.layout {
            BodyLayout::Single => {
                let part = self
                    .parts
                    .first()
                    .ok_or_else(|| ThrowError::MessageBuild("message has no body".into()))?;
                builder.singlepart(part.to_single_part()?)
            }
            BodyLayout::Mixed => {
                let mut parts = self.parts.iter();
                let first = parts
                    .next()
                    .ok_or_else(|| ThrowError::MessageBuild("message has no body".into()))?;
                let mut multipart = MultiPart::mixed().singlepart(first.to_single_part()?);
                for part in parts {
                    multipart = multipart.singlepart(part.to_single_part()?);
                }
                builder.multipart(multipart)
            }
        }
        .map_err(|e| ThrowError::MessageBuild(e.to_string()))?;

        Ok(message.formatted())
    }
}
