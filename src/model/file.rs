//! Files selected for dispatch.

use std::path::{Path, PathBuf};

/// How the content of a file is expected to be carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingHint {
    /// A `text/*` type: try to carry it as decoded text first.
    Text,
    /// No usable type could be guessed: carry raw bytes, base64-encoded.
    Binary,
    /// A known non-text type; the renderer picks the carriage by main type.
    Unknown,
}

/// MIME classification of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentClass {
    /// Main type, e.g. `"image"`.
    pub main_type: String,
    /// Subtype, e.g. `"jpeg"`.
    pub sub_type: String,
    pub encoding: EncodingHint,
}

impl ContentClass {
    /// The generic bag-of-bits type.
    pub fn octet_stream() -> Self {
        Self {
            main_type: "application".to_string(),
            sub_type: "octet-stream".to_string(),
            encoding: EncodingHint::Binary,
        }
    }

    /// `main/sub` form.
    pub fn mime(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type)
    }
}

/// A regular file found during path expansion.
///
/// Immutable once classified. The size is the one observed at expansion
/// time; the file is read again only when a renderer consumes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Resolved absolute path.
    pub path: PathBuf,
    /// Size in bytes at expansion time.
    pub size: u64,
    pub content: ContentClass,
}

impl FileEntry {
    /// Base name of the file, without any directory component.
    pub fn file_name(&self) -> String {
        base_name(&self.path)
    }

    /// Extension including the leading dot (`".jpg"`), or an empty string.
    pub fn extension(&self) -> String {
        self.path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default()
    }
}

/// Base name of `path` as a string. Falls back to `"file"` for paths
/// with no final component.
pub fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string())
}

/// Ordered, deduplicated files to dispatch, with their aggregate size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    entries: Vec<FileEntry>,
    total_bytes: u64,
}

impl FileSet {
    /// Build a set from already-deduplicated entries. The total is computed once here.
    pub fn new(entries: Vec<FileEntry>) -> Self {
        let total_bytes = entries.iter().map(|e| e.size).sum();
        Self {
            entries,
            total_bytes,
        }
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FileEntry> {
        self.entries.iter()
    }

    /// Sum of every entry's size in bytes.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a FileSet {
    type Item = &'a FileEntry;
    type IntoIter = std::slice::Iter<'a, FileEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
