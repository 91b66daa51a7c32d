//! Strategies that turn a [`FileSet`] into a message body.
//!
//! Renderers know nothing about recipients: the dispatcher adds the
//! `From`, `To` and `Subject` headers to whatever they return.

pub mod attachment;
pub mod gallery;

use crate::error::Result;
use crate::model::file::FileSet;
use crate::model::message::RenderedMessage;
use crate::ui::UserInteraction;

pub use attachment::AttachmentRenderer;
pub use gallery::GalleryRenderer;

/// A message-body strategy.
pub trait Renderer {
    /// Render `files` into a message body. `collection_name` is the
    /// optional human name for the set of files.
    fn render(
        &self,
        files: &FileSet,
        collection_name: Option<&str>,
        ui: &dyn UserInteraction,
    ) -> Result<RenderedMessage>;
}
