//! Content-type classification of files by name.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::model::file::{ContentClass, EncodingHint};

/// Suffixes that name a content-encoding rather than a content type.
const ENCODING_SUFFIXES: &[&str] = &["gz", "z", "bz2", "xz", "br"];

/// Shorthand suffixes for compressed archives (`.tgz` is `.tar.gz`).
const COMPRESSED_ALIASES: &[&str] = &["tgz", "taz", "tz", "tbz2", "txz", "svgz"];

/// Classify `path` by its file name.
///
/// Unknown extensions, and names that carry a content-encoding such as
/// `.gz`, fall back to `application/octet-stream` with a
/// [`EncodingHint::Binary`] hint. `text/*` types get
/// [`EncodingHint::Text`]; that only means the renderer should *try* to
/// decode the file as text.
pub fn classify(path: &Path) -> ContentClass {
    if let Some(encoding) = content_encoding(path) {
        tracing::debug!(path = %path.display(), encoding, "Encoded file, sending as binary");
        return ContentClass::octet_stream();
    }

    let Some(mime) = mime_guess::from_path(path).first() else {
        return ContentClass::octet_stream();
    };

    let main_type = mime.type_().as_str().to_string();
    let sub_type = mime.subtype().as_str().to_string();
    let encoding = match main_type.as_str() {
        "text" => EncodingHint::Text,
        _ if main_type == "application" && sub_type == "octet-stream" => EncodingHint::Binary,
        _ => EncodingHint::Unknown,
    };

    ContentClass {
        main_type,
        sub_type,
        encoding,
    }
}

/// The content-encoding implied by the file name, if any (`"gzip"` for `x.tar.gz`).
pub fn content_encoding(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_string_lossy().to_ascii_lowercase();
    if COMPRESSED_ALIASES.contains(&ext.as_str()) {
        return Some(match ext.as_str() {
            "tbz2" => "bzip2",
            "txz" => "xz",
            "taz" | "tz" => "compress",
            _ => "gzip",
        });
    }
    if !ENCODING_SUFFIXES.contains(&ext.as_str()) {
        return None;
    }
    Some(match ext.as_str() {
        "gz" => "gzip",
        "z" => "compress",
        "bz2" => "bzip2",
        "xz" => "xz",
        _ => "br",
    })
}

/// A file classified as text whose bytes are not valid text.
///
/// Always recovered by re-sending the file as binary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("'{}' is not valid UTF-8 text", path.display())]
pub struct ContentDecodeError {
    pub path: PathBuf,
}

/// Strictly decode `bytes` as UTF-8 text. A leading BOM is dropped.
pub fn decode_text(path: &Path, bytes: &[u8]) -> Result<String, ContentDecodeError> {
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    encoding_rs::UTF_8
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(Cow::into_owned)
        .ok_or_else(|| ContentDecodeError {
            path: path.to_path_buf(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_common_types() {
        let c = classify(Path::new("/tmp/photo.jpg"));
        assert_eq!(c.mime(), "image/jpeg");
        assert_eq!(c.encoding, EncodingHint::Unknown);

        let c = classify(Path::new("notes.txt"));
        assert_eq!(c.mime(), "text/plain");
        assert_eq!(c.encoding, EncodingHint::Text);

        let c = classify(Path::new("song.mp3"));
        assert_eq!(c.main_type, "audio");
    }

    #[test]
    fn test_unknown_extension_is_octet_stream() {
        let c = classify(Path::new("data.zzqqxx"));
        assert_eq!(c, ContentClass::octet_stream());

        let c = classify(Path::new("Makefile"));
        assert_eq!(c.encoding, EncodingHint::Binary);
    }

    #[test]
    fn test_compressed_names_are_binary() {
        for name in ["backup.tar.gz", "notes.txt.gz", "dump.sql.bz2", "src.tgz", "x.svgz"] {
            let c = classify(Path::new(name));
            assert_eq!(c, ContentClass::octet_stream(), "{name}");
        }
        assert_eq!(content_encoding(Path::new("a.tar.gz")), Some("gzip"));
        assert_eq!(content_encoding(Path::new("a.tar")), None);
    }

    #[test]
    fn test_decode_text() {
        let p = Path::new("a.txt");
        assert_eq!(decode_text(p, "héllo".as_bytes()).unwrap(), "héllo");
        assert_eq!(decode_text(p, b"\xEF\xBB\xBFhi").unwrap(), "hi");
        assert!(decode_text(p, &[0x66, 0xFF, 0xFE, 0x00]).is_err());
    }

    #[test]
    fn test_decode_error_names_the_file() {
        let err = decode_text(Path::new("dir/broken.txt"), &[0xC3, 0x28]).unwrap_err();
        assert_eq!(err.path, Path::new("dir/broken.txt"));
        assert_eq!(err.to_string(), "'dir/broken.txt' is not valid UTF-8 text");

        let source: &dyn std::error::Error = &err;
        assert!(source.source().is_none());
    }
}
