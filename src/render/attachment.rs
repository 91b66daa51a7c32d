//! Files carried inline as MIME attachments.

use crate::dispatch::content_type::decode_text;
use crate::error::Result;
use crate::model::file::{FileEntry, FileSet};
use crate::model::message::{BodyPart, Disposition, Payload, RenderedMessage, TransferEncoding};
use crate::ui::{ProgressUnit, UserInteraction};

use super::Renderer;

/// Text of the leading body part.
pub const PREAMBLE: &str = "Here are some files I've thrown at you.";

/// Builds a `multipart/mixed` message: a short text part, then one
/// attachment part per file, in [`FileSet`] order.
#[derive(Debug, Default, Clone, Copy)]
pub struct AttachmentRenderer;

impl Renderer for AttachmentRenderer {
    fn render(
        &self,
        files: &FileSet,
        _collection_name: Option<&str>,
        ui: &dyn UserInteraction,
    ) -> Result<RenderedMessage> {
        let mut parts = Vec::with_capacity(files.len() + 1);
        parts.push(BodyPart::text("text/plain; charset=utf-8", PREAMBLE));

        let total = files.len() as u64;
        ui.start_progress(ProgressUnit::Files);
        for (i, entry) in files.iter().enumerate() {
            if let Some(part) = attachment_part(entry) {
                parts.push(part);
            }
            ui.update_progress(i as u64 + 1, total);
        }
        ui.end_progress();

        Ok(RenderedMessage::mixed(parts))
    }
}

/// Build the part for one file, or `None` if it can no longer be read.
fn attachment_part(entry: &FileEntry) -> Option<BodyPart> {
    if !entry.path.is_file() {
        tracing::info!(path = %entry.path.display(), "No longer a regular file, skipping");
        return None;
    }
    let bytes = match std::fs::read(&entry.path) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(
                path = %entry.path.display(),
                error = %e,
                "Failed to read file, skipping"
            );
            return None;
        }
    };

    let class = &entry.content;
    let mime = class.mime();
    let (content_type, payload, transfer_encoding) = match class.main_type.as_str() {
        "image" | "audio" => (mime, Payload::Binary(bytes), TransferEncoding::Auto),
        "text" => match decode_text(&entry.path, &bytes) {
            Ok(text) => (
                format!("{mime}; charset=utf-8"),
                Payload::Text(text),
                TransferEncoding::Auto,
            ),
            Err(e) => {
                tracing::debug!(error = %e, "Sending text file as binary");
                (mime, Payload::Binary(bytes), TransferEncoding::Base64)
            }
        },
        _ => (mime, Payload::Binary(bytes), TransferEncoding::Base64),
    };

    Some(BodyPart {
        content_type,
        disposition: Some(Disposition::Attachment {
            filename: entry.file_name(),
        }),
        payload,
        transfer_encoding,
    })
}
