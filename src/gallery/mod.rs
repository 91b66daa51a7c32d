//! Remote gallery hosting: the service contract and its HTTP client.

pub mod minus;

use thiserror::Error;

pub use minus::MinusClient;

/// Errors reported by a [`GalleryService`].
#[derive(Error, Debug)]
pub enum GalleryError {
    /// The HTTP request failed or returned an error status.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with something that is not the expected JSON.
    #[error("Malformed response from gallery service: {0}")]
    Malformed(String),

    /// The service understood the request but refused it.
    #[error("Gallery service refused the request: {0}")]
    Rejected(String),

    /// The background upload worker stopped without a result.
    #[error("Upload worker stopped unexpectedly")]
    WorkerPanicked,

    /// Reading the file to upload failed.
    #[error("Could not read '{path}': {source}")]
    Read {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
}

/// A freshly created gallery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gallery {
    /// Private identifier with write access.
    pub editor_id: String,
    /// Public identifier used in links.
    pub reader_id: String,
}

/// What the service reports about an uploaded item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedItem {
    pub remote_id: String,
    pub height: Option<u32>,
    pub width: Option<u32>,
    pub filesize: Option<u64>,
}

/// A remote gallery host. Every call is a single request; nothing is retried.
pub trait GalleryService {
    /// Allocate a new, empty gallery.
    fn create_gallery(&self) -> Result<Gallery, GalleryError>;

    /// Set the gallery's display name.
    fn save_gallery_name(&self, gallery: &Gallery, name: &str) -> Result<(), GalleryError>;

    /// Upload `data` as `filename` into `gallery`.
    ///
    /// `progress` receives `(bytes_sent, total_bytes)` for this item only.
    fn upload_item(
        &self,
        gallery: &Gallery,
        filename: &str,
        data: Vec<u8>,
        progress: &dyn Fn(u64, u64),
    ) -> Result<UploadedItem, GalleryError>;

    /// Public link to the whole gallery.
    fn gallery_link(&self, gallery: &Gallery) -> String;

    /// Direct download link for one item. `extension` includes the dot.
    fn item_link(&self, remote_id: &str, extension: &str) -> String;
}
