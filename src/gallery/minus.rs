//! Client for the min.us gallery JSON API.
//!
//! Three endpoints are used, all `POST`:
//! - `CreateGallery` → `{"editor_id": .., "reader_id": ..}`
//! - `SaveGallery` with form fields `name`, `id` (editor id), `items`
//! - `UploadItem?editor_id=..&filename=..` with the raw file as the body
//!   → `{"id": .., "height": .., "width": .., "filesize": ..}`

use std::io::{Cursor, Read};
use std::sync::mpsc;
use std::time::Duration;

use reqwest::blocking::{Body, Client};
use serde_json::Value;

use super::{Gallery, GalleryError, GalleryService, UploadedItem};
use crate::config::GalleryConfig;

/// Request timeout, generous enough for large uploads on slow links.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

/// Blocking HTTP client for the gallery service.
pub struct MinusClient {
    http: Client,
    config: GalleryConfig,
}

impl MinusClient {
    pub fn new(config: GalleryConfig) -> Result<Self, GalleryError> {
        let http = Client::builder()
            .user_agent(concat!("throw/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { http, config })
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/{name}", self.config.api_base.trim_end_matches('/'))
    }
}

impl GalleryService for MinusClient {
    fn create_gallery(&self) -> Result<Gallery, GalleryError> {
        let response: Value = self
            .http
            .post(self.endpoint("CreateGallery"))
            .send()?
            .error_for_status()?
            .json()?;
        let gallery = parse_gallery(&response)?;
        tracing::info!(reader_id = %gallery.reader_id, "Created gallery");
        Ok(gallery)
    }

    fn save_gallery_name(&self, gallery: &Gallery, name: &str) -> Result<(), GalleryError> {
        let response = self
            .http
            .post(self.endpoint("SaveGallery"))
            .form(&[
                ("name", name),
                ("id", gallery.editor_id.as_str()),
                ("items", "[]"),
            ])
            .send()?
            .error_for_status()?;
        tracing::info!(status = %response.status(), name, "Saved gallery name");
        Ok(())
    }

    fn upload_item(
        &self,
        gallery: &Gallery,
        filename: &str,
        data: Vec<u8>,
        progress: &dyn Fn(u64, u64),
    ) -> Result<UploadedItem, GalleryError> {
        let total = data.len() as u64;
        let (tx, rx) = mpsc::channel();
        let reader = ProgressReader {
            inner: Cursor::new(data),
            sent: 0,
            tx,
        };
        let request = self
            .http
            .post(self.endpoint("UploadItem"))
            .query(&[("editor_id", gallery.editor_id.as_str()), ("filename", filename)])
            .body(Body::sized(reader, total));

        // The body is streamed on a worker thread; progress is relayed
        // back here until the worker drops the reader.
        let outcome = std::thread::scope(|scope| {
            let worker = scope.spawn(move || request.send());
            progress(0, total);
            for sent in rx {
                progress(sent, total);
            }
            worker.join()
        });

        let response: Value = outcome
            .map_err(|_| GalleryError::WorkerPanicked)??
            .error_for_status()?
            .json()?;
        let item = parse_item(&response)?;
        tracing::info!(filename, remote_id = %item.remote_id, bytes = total, "Uploaded item");
        Ok(item)
    }

    fn gallery_link(&self, gallery: &Gallery) -> String {
        format!(
            "{}/m{}",
            self.config.page_base.trim_end_matches('/'),
            gallery.reader_id
        )
    }

    fn item_link(&self, remote_id: &str, extension: &str) -> String {
        format!(
            "{}/j{remote_id}{extension}",
            self.config.item_base.trim_end_matches('/')
        )
    }
}

/// Reader that reports the running byte count on a channel.
struct ProgressReader {
    inner: Cursor<Vec<u8>>,
    sent: u64,
    tx: mpsc::Sender<u64>,
}

impl Read for ProgressReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.sent += n as u64;
            // The receiver only disappears once the upload is over.
            let _ = self.tx.send(self.sent);
        }
        Ok(n)
    }
}

fn rejected_or_malformed(response: &Value, what: &str) -> GalleryError {
    match response.get("error").and_then(Value::as_str) {
        Some(err) => GalleryError::Rejected(err.to_string()),
        None => GalleryError::Malformed(format!("missing '{what}' in {response}")),
    }
}

/// A JSON field that may arrive as a string or a number.
fn id_field(response: &Value, key: &str) -> Option<String> {
    match response.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number_field(response: &Value, key: &str) -> Option<u64> {
    match response.get(key)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_gallery(response: &Value) -> Result<Gallery, GalleryError> {
    let editor_id = id_field(response, "editor_id")
        .ok_or_else(|| rejected_or_malformed(response, "editor_id"))?;
    let reader_id = id_field(response, "reader_id")
        .ok_or_else(|| rejected_or_malformed(response, "reader_id"))?;
    Ok(Gallery {
        editor_id,
        reader_id,
    })
}

fn parse_item(response: &Value) -> Result<UploadedItem, GalleryError> {
    let remote_id = id_field(response, "id").ok_or_else(|| rejected_or_malformed(response, "id"))?;
    Ok(UploadedItem {
        remote_id,
        height: number_field(response, "height").and_then(|n| u32::try_from(n).ok()),
        width: number_field(response, "width").and_then(|n| u32::try_from(n).ok()),
        filesize: number_field(response, "filesize"),
    })
}
