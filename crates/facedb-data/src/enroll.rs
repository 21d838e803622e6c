//! Enrollment storage — persisting captured crops into the database tree.
//!
//! Captures land under `<root>/faces/<name>/` and `<root>/protraits/<name>/`
//! as JPEG files named `<unixTimestampSeconds>_<sequence>.jpg`. The
//! `protraits` spelling is part of the on-disk compatibility contract.

use chrono::Utc;
use image::GrayImage;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnrollError {
    #[error("invalid person name {0:?}")]
    InvalidName(String),
    #[error("cannot create enrollment directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot save enrollment image {}: {source}", path.display())]
    Save {
        path: PathBuf,
        source: image::ImageError,
    },
}

/// Writes face and portrait captures for one person with a session-wide
/// sequence counter shared between both kinds.
pub struct EnrollmentStore {
    faces_dir: PathBuf,
    portraits_dir: PathBuf,
    sequence: u32,
}

impl EnrollmentStore {
    /// Create the per-person directories and start a fresh session counter.
    ///
    /// The name becomes a path component, so empty names, names with path
    /// separators or whitespace, and hidden names are rejected.
    pub fn open(root: &Path, name: &str) -> Result<Self, EnrollError> {
        validate_name(name)?;

        let faces_dir = root.join("faces").join(name);
        let portraits_dir = root.join("protraits").join(name);
        for dir in [&faces_dir, &portraits_dir] {
            fs::create_dir_all(dir).map_err(|source| EnrollError::CreateDir {
                path: dir.clone(),
                source,
            })?;
        }

        Ok(Self {
            faces_dir,
            portraits_dir,
            sequence: 0,
        })
    }

    /// Persist a recognition-size face crop. Returns the written path.
    pub fn save_face(&mut self, image: &GrayImage) -> Result<PathBuf, EnrollError> {
        let dir = self.faces_dir.clone();
        self.save_into(&dir, image)
    }

    /// Persist a portrait crop. Returns the written path.
    pub fn save_portrait(&mut self, image: &GrayImage) -> Result<PathBuf, EnrollError> {
        let dir = self.portraits_dir.clone();
        self.save_into(&dir, image)
    }

    fn save_into(&mut self, dir: &Path, image: &GrayImage) -> Result<PathBuf, EnrollError> {
        let path = dir.join(format!("{}_{}.jpg", Utc::now().timestamp(), self.sequence));
        image.save(&path).map_err(|source| EnrollError::Save {
            path: path.clone(),
            source,
        })?;
        self.sequence += 1;
        tracing::info!(path = %path.display(), "enrollment image saved");
        Ok(path)
    }
}

fn validate_name(name: &str) -> Result<(), EnrollError> {
    let bad = name.is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\'])
        || name.contains(char::is_whitespace);
    if bad {
        return Err(EnrollError::InvalidName(name.to_string()));
    }
    Ok(())
}
