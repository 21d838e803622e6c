//! facedb-data — Filesystem layer of the face database.
//!
//! Catalogs directory contents, loads the two-level `faces/<person>/<image>`
//! tree into an in-memory labeled dataset, and persists enrollment captures
//! back into the tree.

pub mod catalog;
pub mod dataset;
pub mod enroll;

pub use catalog::{CatalogEntry, CatalogError, EntryKind};
pub use dataset::{Dataset, DatasetError, FaceSample, LabelRegistry};
pub use enroll::{EnrollError, EnrollmentStore};
