//! Labeled face dataset — loading, label registry, canonical sizing.
//!
//! The on-disk layout is `<root>/faces/<personName>/<imageFile>`. Every
//! person directory becomes one integer label; every readable image file
//! under it becomes one 64×64 grayscale training sample.

use crate::catalog::{self, CatalogError, EntryKind};
use image::imageops::FilterType;
use image::GrayImage;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Canonical edge length of recognition training samples.
pub const FACE_SAMPLE_SIZE: u32 = 64;
/// Canonical edge length of portrait crops.
pub const PORTRAIT_SIZE: u32 = 256;
/// Name reported for a predicted label with no registry entry.
pub const UNKNOWN_NAME: &str = "unknown";

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("face database unavailable: {0}")]
    Unavailable(#[from] CatalogError),
    #[error("cannot decode face image {}: {source}", path.display())]
    BadImage {
        path: PathBuf,
        source: image::ImageError,
    },
}

/// One normalized training sample. Immutable after creation.
#[derive(Debug, Clone)]
pub struct FaceSample {
    pub image: GrayImage,
    pub label: i32,
}

/// Bijective mapping between dense integer labels and person names.
///
/// Append-only during a live session. Lookups of absent labels return
/// `None`; display paths fall back to [`UNKNOWN_NAME`] instead of failing.
#[derive(Debug, Clone, Default)]
pub struct LabelRegistry {
    by_label: BTreeMap<i32, String>,
    by_name: BTreeMap<String, i32>,
}

impl LabelRegistry {
    /// Return the label for `name`, assigning the next unused one for a
    /// brand-new name: `max(existing) + 1`, or `0` for an empty registry.
    pub fn insert(&mut self, name: &str) -> i32 {
        if let Some(&label) = self.by_name.get(name) {
            return label;
        }
        let label = self
            .by_label
            .keys()
            .next_back()
            .map(|&max| max + 1)
            .unwrap_or(0);
        self.by_label.insert(label, name.to_string());
        self.by_name.insert(name.to_string(), label);
        label
    }

    pub fn name_of(&self, label: i32) -> Option<&str> {
        self.by_label.get(&label).map(String::as_str)
    }

    /// Name for display/reporting. Absent labels resolve to [`UNKNOWN_NAME`].
    pub fn display_name(&self, label: i32) -> &str {
        self.name_of(label).unwrap_or(UNKNOWN_NAME)
    }

    pub fn label_of(&self, name: &str) -> Option<i32> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.by_label.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_label.is_empty()
    }
}

/// Ordered sequence of face samples plus the label registry.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    samples: Vec<FaceSample>,
    registry: LabelRegistry,
}

impl Dataset {
    /// Load the face database under `<root>/faces`.
    ///
    /// Person directories are sorted lexicographically before labels are
    /// assigned, so the same tree always yields the same labels regardless
    /// of filesystem enumeration order. Non-directory entries under
    /// `faces` and non-file entries under a person directory are ignored.
    /// An unlistable path or an undecodable image fails the whole load —
    /// there is no partial dataset.
    pub fn load(root: &Path) -> Result<Self, DatasetError> {
        let faces_dir = root.join("faces");
        let entries = catalog::list(&faces_dir)?;

        let mut persons: Vec<String> = entries
            .into_iter()
            .filter(|e| e.kind == EntryKind::Directory)
            .map(|e| e.name)
            .collect();
        persons.sort();

        tracing::info!(
            path = %faces_dir.display(),
            persons = persons.len(),
            "loading face database"
        );

        let mut dataset = Dataset::default();
        for (index, person) in persons.iter().enumerate() {
            let label = dataset.registry.insert(person);
            let person_dir = faces_dir.join(person);
            let files = catalog::list(&person_dir)?;

            tracing::info!(
                person = %person,
                index = index + 1,
                total = persons.len(),
                "loading person directory"
            );

            for entry in files.iter().filter(|e| e.kind == EntryKind::File) {
                let image_path = person_dir.join(&entry.name);
                let decoded =
                    image::open(&image_path).map_err(|source| DatasetError::BadImage {
                        path: image_path.clone(),
                        source,
                    })?;
                let sample = image::imageops::resize(
                    &decoded.to_luma8(),
                    FACE_SAMPLE_SIZE,
                    FACE_SAMPLE_SIZE,
                    FilterType::CatmullRom,
                );
                tracing::debug!(file = %entry.name, "loaded sample");
                dataset.samples.push(FaceSample {
                    image: sample,
                    label,
                });
            }
        }

        Ok(dataset)
    }

    pub fn samples(&self) -> &[FaceSample] {
        &self.samples
    }

    pub fn registry(&self) -> &LabelRegistry {
        &self.registry
    }

    /// Append a capture-time sample for `name`, registering the name if it
    /// is new, and return the label it was stored under.
    pub fn enroll_sample(&mut self, name: &str, image: GrayImage) -> i32 {
        let label = self.registry.insert(name);
        self.samples.push(FaceSample { image, label });
        label
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of distinct labels among the samples (the trainer's view,
    /// which may lag the registry when a person directory holds no images).
    pub fn distinct_labels(&self) -> usize {
        let mut labels: Vec<i32> = self.samples.iter().map(|s| s.label).collect();
        labels.sort_unstable();
        labels.dedup();
        labels.len()
    }

    /// Dimensions shared by every sample, taken from the first one.
    /// Falls back to the canonical capture size for an empty dataset.
    pub fn canonical_size(&self) -> (u32, u32) {
        self.samples
            .first()
            .map(|s| s.image.dimensions())
            .unwrap_or((FACE_SAMPLE_SIZE, FACE_SAMPLE_SIZE))
    }
}
