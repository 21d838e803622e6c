//! Single-level directory catalog with entry classification.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("cannot open directory {}: {source}", path.display())]
    PathUnavailable {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Classification of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    /// Symlinks, sockets, devices — anything that is neither a regular
    /// file nor a directory. Entry types are read without following links.
    Other,
}

/// One entry of a cataloged directory.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub name: String,
    pub kind: EntryKind,
}

/// List the entries of `path`, skipping hidden names (leading `.`).
///
/// Ordering is whatever the filesystem reports — callers must not rely on
/// it for correctness, only for display. Any failure to open the directory
/// or stat one of its entries fails the whole call.
pub fn list(path: &Path) -> Result<Vec<CatalogEntry>, CatalogError> {
    let read_dir = fs::read_dir(path).map_err(|source| CatalogError::PathUnavailable {
        path: path.to_path_buf(),
        source,
    })?;

    let mut entries = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|source| CatalogError::PathUnavailable {
            path: path.to_path_buf(),
            source,
        })?;

        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }

        let file_type = entry
            .file_type()
            .map_err(|source| CatalogError::PathUnavailable {
                path: path.join(&name),
                source,
            })?;
        let kind = if file_type.is_file() {
            EntryKind::File
        } else if file_type.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::Other
        };

        entries.push(CatalogEntry { name, kind });
    }

    Ok(entries)
}
