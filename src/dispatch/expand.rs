//! Expansion of file and directory arguments into a flat [`FileSet`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::content_type::classify;
use crate::model::file::{FileEntry, FileSet};

/// Resolve `inputs` into the regular files they name or contain.
///
/// - A regular file is included directly.
/// - A directory is walked depth-first, following symlinks. Symlink
///   loops are detected and skipped.
/// - Missing paths, special files, and entries that vanish or become
///   unreadable during the walk are skipped silently.
///
/// Entries are deduplicated by canonical path, keeping the first
/// occurrence. No sort is applied: order is argument order, then
/// directory-listing order.
pub fn expand_paths<P: AsRef<Path>>(inputs: &[P]) -> FileSet {
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut entries = Vec::new();

    for input in inputs {
        let input = input.as_ref();
        let metadata = match std::fs::metadata(input) {
            Ok(m) => m,
            Err(e) => {
                tracing::info!(path = %input.display(), error = %e, "Skipping unreadable path");
                continue;
            }
        };

        if metadata.is_file() {
            push_file(input, &mut seen, &mut entries);
        } else if metadata.is_dir() {
            walk_dir(input, &mut seen, &mut entries);
        } else {
            tracing::info!(path = %input.display(), "Skipping special file");
        }
    }

    let set = FileSet::new(entries);
    tracing::debug!(
        files = set.len(),
        total_bytes = set.total_bytes(),
        "Expanded input paths"
    );
    set
}

fn walk_dir(dir: &Path, seen: &mut HashSet<PathBuf>, entries: &mut Vec<FileEntry>) {
    for item in WalkDir::new(dir).follow_links(true) {
        match item {
            Ok(item) if item.file_type().is_file() => push_file(item.path(), seen, entries),
            Ok(_) => {}
            Err(e) => {
                if e.loop_ancestor().is_some() {
                    tracing::warn!(error = %e, "Skipping symlink loop");
                } else {
                    tracing::info!(error = %e, "Skipping entry during directory walk");
                }
            }
        }
    }
}

/// Add `path` if it is still a regular file and has not been seen before.
fn push_file(path: &Path, seen: &mut HashSet<PathBuf>, entries: &mut Vec<FileEntry>) {
    let resolved = match std::fs::canonicalize(path) {
        Ok(p) => p,
        Err(e) => {
            tracing::info!(path = %path.display(), error = %e, "File vanished, skipping");
            return;
        }
    };
    if seen.contains(&resolved) {
        tracing::debug!(path = %resolved.display(), "Duplicate path, skipping");
        return;
    }

    let size = match std::fs::metadata(&resolved) {
        Ok(m) if m.is_file() => m.len(),
        Ok(_) => return,
        Err(e) => {
            tracing::info!(path = %resolved.display(), error = %e, "File vanished, skipping");
            return;
        }
    };

    seen.insert(resolved.clone());
    entries.push(FileEntry {
        content: classify(&resolved),
        path: resolved,
        size,
    });
}
