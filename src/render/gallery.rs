//! Files uploaded to a remote gallery and sent as links.

use crate::error::{Result, ThrowError};
use crate::gallery::{GalleryError, GalleryService};
use crate::model::file::FileSet;
use crate::model::message::{BodyPart, RenderedMessage};
use crate::ui::{reflow, ProgressUnit, UserInteraction, MAX_WIDTH};

use super::Renderer;

/// An uploaded file, kept only long enough to write its link.
#[derive(Debug, Clone, PartialEq, Eq)]
struct GalleryItem {
    remote_id: String,
    display_name: String,
    file_extension: String,
}

/// Uploads every file into a new gallery and builds a single
/// `format=flowed` text part with the gallery link followed by one
/// direct link per uploaded file.
///
/// Only gallery creation is fatal. A failed rename or a failed upload is
/// reported through the [`UserInteraction`] and the run continues; the
/// failed file is simply left out of the links.
pub struct GalleryRenderer<'a> {
    service: &'a dyn GalleryService,
}

impl<'a> GalleryRenderer<'a> {
    pub fn new(service: &'a dyn GalleryService) -> Self {
        Self { service }
    }
}

impl Renderer for GalleryRenderer<'_> {
    fn render(
        &self,
        files: &FileSet,
        collection_name: Option<&str>,
        ui: &dyn UserInteraction,
    ) -> Result<RenderedMessage> {
        let gallery = self
            .service
            .create_gallery()
            .map_err(ThrowError::UploadFailure)?;

        if let Some(name) = collection_name {
            if let Err(e) = self.service.save_gallery_name(&gallery, name) {
                tracing::warn!(name, error = %e, "Failed to name gallery");
                ui.error(&format!(
                    "I couldn't name the gallery '{name}' ({e}). The files will still be uploaded."
                ));
            }
        }

        let gallery_link = self.service.gallery_link(&gallery);
        ui.new_section();
        ui.message(&format!("Uploading files to {gallery_link}..."));

        let mut items = Vec::with_capacity(files.len());
        for entry in files {
            let display_name = entry.file_name();
            ui.message(&format!("Uploading {display_name}..."));

            let data = match std::fs::read(&entry.path) {
                Ok(data) => data,
                Err(source) => {
                    let e = GalleryError::Read {
                        path: entry.path.clone(),
                        source,
                    };
                    tracing::warn!(error = %e, "Skipping file");
                    ui.error(&format!("{e}"));
                    continue;
                }
            };

            ui.start_progress(ProgressUnit::Bytes);
            let uploaded = self.service.upload_item(
                &gallery,
                &display_name,
                data,
                &|done, total| ui.update_progress(done, total),
            );
            ui.end_progress();

            match uploaded {
                Ok(item) => items.push(GalleryItem {
                    remote_id: item.remote_id,
                    display_name,
                    file_extension: entry.extension(),
                }),
                Err(e) => {
                    tracing::warn!(file = %display_name, error = %e, "Upload failed");
                    ui.error(&format!("Failed to upload {display_name}: {e}"));
                }
            }
        }

        tracing::info!(
            uploaded = items.len(),
            requested = files.len(),
            "Gallery upload finished"
        );
        let body = self.compose(&gallery_link, &items);
        Ok(RenderedMessage::single(BodyPart::text(
            "text/plain; charset=utf-8; format=flowed",
            body,
        )))
    }
}

impl GalleryRenderer<'_> {
    fn compose(&self, gallery_link: &str, items: &[GalleryItem]) -> String {
        let mut body = flowed(
            "I've shared some files with you. They are viewable as a gallery at the \
             following link:",
        );
        body.push('\n');
        body.push_str(&format!(" - {gallery_link}\n\n"));
        body.push_str(&flowed(
            "The individual files can be downloaded from the following links:",
        ));
        body.push('\n');
        for item in items {
            let link = self.service.item_link(&item.remote_id, &item.file_extension);
            body.push_str(&format!(" - {link} {}\n", item.display_name));
        }
        body
    }
}

/// Wrap one paragraph for `format=flowed`: every line but the last ends
/// with a space, marking a soft break.
fn flowed(paragraph: &str) -> String {
    let wrapped = reflow(paragraph, MAX_WIDTH);
    let mut out = wrapped.lines().collect::<Vec<_>>().join(" \n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::dispatch::expand::expand_paths;
    use crate::gallery::{Gallery, UploadedItem};
    use crate::ui::testing::ScriptedUi;

    /// Records calls; fails uploads for names in `fail_uploads`.
    #[derive(Default)]
    struct FakeGallery {
        fail_create: bool,
        fail_rename: bool,
        fail_uploads: Vec<String>,
        calls: RefCell<Vec<String>>,
    }

    impl GalleryService for FakeGallery {
        fn create_gallery(&self) -> std::result::Result<Gallery, GalleryError> {
            self.calls.borrow_mut().push("create".into());
            if self.fail_create {
                return Err(GalleryError::Rejected("down".into()));
            }
            Ok(Gallery {
                editor_id: "ed".into(),
                reader_id: "rd".into(),
            })
        }

        fn save_gallery_name(
            &self,
            _gallery: &Gallery,
            name: &str,
        ) -> std::result::Result<(), GalleryError> {
            self.calls.borrow_mut().push(format!("name:{name}"));
            if self.fail_rename {
                return Err(GalleryError::Rejected("no".into()));
            }
            Ok(())
        }

        fn upload_item(
            &self,
            _gallery: &Gallery,
            filename: &str,
            data: Vec<u8>,
            progress: &dyn Fn(u64, u64),
        ) -> std::result::Result<UploadedItem, GalleryError> {
            self.calls.borrow_mut().push(format!("upload:{filename}"));
            let total = data.len() as u64;
            progress(total / 2, total);
            progress(total, total);
            if self.fail_uploads.iter().any(|f| f == filename) {
                return Err(GalleryError::Rejected("too big".into()));
            }
            Ok(UploadedItem {
                remote_id: format!("id{}", filename.len()),
                height: None,
                width: None,
                filesize: Some(total),
            })
        }

        fn gallery_link(&self, gallery: &Gallery) -> String {
            format!("http://gallery.test/m{}", gallery.reader_id)
        }

        fn item_link(&self, remote_id: &str, extension: &str) -> String {
            format!("http://i.gallery.test/j{remote_id}{extension}")
        }
    }

    fn file_set(names: &[&str]) -> (tempfile::TempDir, FileSet) {
        let tmp = tempfile::tempdir().unwrap();
        let paths: Vec<_> = names
            .iter()
            .map(|n| {
                let p = tmp.path().join(n);
                std::fs::write(&p, n.as_bytes()).unwrap();
                p
            })
            .collect();
        let set = expand_paths(&paths);
        (tmp, set)
    }

    fn link_lines(msg: &RenderedMessage) -> Vec<String> {
        msg.parts()[0]
            .payload
            .as_text()
            .unwrap()
            .lines()
            .filter(|l| l.starts_with(" - "))
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_single_flowed_part_with_links() {
        let (_tmp, files) = file_set(&["photo.jpg"]);
        let service = FakeGallery::default();
        let ui = ScriptedUi::default();
        let msg = GalleryRenderer::new(&service)
            .render(&files, None, &ui)
            .unwrap();

        assert_eq!(msg.parts().len(), 1);
        assert!(msg.parts()[0].content_type.contains("format=flowed"));
        assert_eq!(
            link_lines(&msg),
            [
                " - http://gallery.test/mrd",
                " - http://i.gallery.test/jid9.jpg photo.jpg"
            ]
        );
        assert_eq!(*ui.progress.borrow(), [(4, 9), (9, 9)]);
        assert_eq!(*ui.progress_units.borrow(), [ProgressUnit::Bytes]);
    }

    #[test]
    fn test_blank_line_after_each_heading() {
        let (_tmp, files) = file_set(&["photo.jpg"]);
        let msg = GalleryRenderer::new(&FakeGallery::default())
            .render(&files, None, &ScriptedUi::default())
            .unwrap();
        let body = msg.parts()[0].payload.as_text().unwrap();

        assert!(body.contains("following link:\n\n - http://gallery.test/mrd\n\n"));
        assert!(body.ends_with(
            "following links:\n\n - http://i.gallery.test/jid9.jpg photo.jpg\n"
        ));
    }

    #[test]
    fn test_one_failed_upload_is_left_out() {
        let names = ["a.txt", "bb.txt", "ccc.txt", "dddd.txt", "eeeee.txt"];
        let (_tmp, files) = file_set(&names);
        let service = FakeGallery {
            fail_uploads: vec!["ccc.txt".into()],
            ..FakeGallery::default()
        };
        let ui = ScriptedUi::default();
        let msg = GalleryRenderer::new(&service)
            .render(&files, None, &ui)
            .unwrap();

        let links = link_lines(&msg);
        assert_eq!(links.len(), 5, "gallery link plus four items");
        assert_eq!(links[0], " - http://gallery.test/mrd");
        let uploaded: Vec<String> = links[1..]
            .iter()
            .map(|l| l.rsplit(' ').next().unwrap().to_string())
            .collect();
        let expected: Vec<String> = files
            .iter()
            .map(|e| e.file_name())
            .filter(|n| n.as_str() != "ccc.txt")
            .collect();
        assert_eq!(uploaded, expected);
        assert_eq!(ui.errors.borrow().len(), 1);
    }

    #[test]
    fn test_create_failure_is_fatal_and_uploads_nothing() {
        let (_tmp, files) = file_set(&["a.txt", "b.txt"]);
        let service = FakeGallery {
            fail_create: true,
            ..FakeGallery::default()
        };
        let err = GalleryRenderer::new(&service)
            .render(&files, Some("Holiday"), &ScriptedUi::default())
            .unwrap_err();

        assert!(matches!(err, ThrowError::UploadFailure(_)));
        assert_eq!(*service.calls.borrow(), ["create"]);
    }

    #[test]
    fn test_rename_failure_is_not_fatal() {
        let (_tmp, files) = file_set(&["a.txt"]);
        let service = FakeGallery {
            fail_rename: true,
            ..FakeGallery::default()
        };
        let ui = ScriptedUi::default();
        let msg = GalleryRenderer::new(&service)
            .render(&files, Some("Holiday"), &ui)
            .unwrap();

        assert_eq!(link_lines(&msg).len(), 2);
        assert_eq!(
            *service.calls.borrow(),
            ["create", "name:Holiday", "upload:a.txt"]
        );
        assert_eq!(ui.errors.borrow().len(), 1);
    }

    #[test]
    fn test_flowed_soft_breaks() {
        let text = flowed(&"word ".repeat(30));
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines.len() > 1);
        assert!(lines[..lines.len() - 1].iter().all(|l| l.ends_with(' ')));
        assert!(!lines[lines.len() - 1].ends_with(' '));
    }
}
