//! Trainable recognition model — a labeled embedding gallery.
//!
//! Training extracts one embedding per dataset sample; prediction embeds
//! the probe crop and scans the whole gallery for the nearest neighbor.
//! The reported confidence is `1 − cosine similarity`: distance-like,
//! lower = more confident. Retraining rebuilds the gallery from the full
//! current dataset — a synchronous O(dataset) pass, the accepted cost of
//! immediate-consistency online enrollment.

use crate::recognizer::{Embedding, FaceEmbedder, RecognizerError};
use crate::types::Prediction;
use facedb_data::dataset::{Dataset, FACE_SAMPLE_SIZE};
use image::GrayImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error(
        "insufficient training data: {samples} sample(s), {labels} distinct label(s) \
         (need at least 1 sample and 2 labels)"
    )]
    InsufficientTrainingData { samples: usize, labels: usize },
    #[error("recognition model has not been trained")]
    Untrained,
    #[error(transparent)]
    Recognizer(#[from] RecognizerError),
}

/// Check the external trainer's preconditions without training. Callers
/// run this before spending time on model construction.
pub fn check_trainable(dataset: &Dataset) -> Result<(), ModelError> {
    let samples = dataset.len();
    let labels = dataset.distinct_labels();
    if samples < 1 || labels < 2 {
        return Err(ModelError::InsufficientTrainingData { samples, labels });
    }
    Ok(())
}

/// Recognition model: embedding network plus the labeled gallery derived
/// from the training dataset.
pub struct RecognitionModel {
    embedder: FaceEmbedder,
    gallery: Vec<(Embedding, i32)>,
    input_size: (u32, u32),
}

impl RecognitionModel {
    /// An untrained model wrapping the embedding network. `train` must
    /// succeed before `predict` answers.
    pub fn new(embedder: FaceEmbedder) -> Self {
        Self {
            embedder,
            gallery: Vec::new(),
            input_size: (FACE_SAMPLE_SIZE, FACE_SAMPLE_SIZE),
        }
    }

    /// (Re)train on the full dataset. Adopts the dataset's canonical
    /// dimensions as the probe input size and rebuilds the gallery from
    /// every sample. Fails without touching the previous gallery when the
    /// dataset does not meet the training preconditions.
    pub fn train(&mut self, dataset: &Dataset) -> Result<(), ModelError> {
        check_trainable(dataset)?;

        let mut gallery = Vec::with_capacity(dataset.len());
        for sample in dataset.samples() {
            gallery.push((self.embedder.embed(&sample.image)?, sample.label));
        }

        self.input_size = dataset.canonical_size();
        self.gallery = gallery;
        tracing::info!(
            samples = self.gallery.len(),
            labels = dataset.distinct_labels(),
            "recognition model trained"
        );
        Ok(())
    }

    pub fn is_trained(&self) -> bool {
        !self.gallery.is_empty()
    }

    /// Width and height probes are resized to before prediction — the
    /// trained dataset's canonical dimensions.
    pub fn input_size(&self) -> (u32, u32) {
        self.input_size
    }

    /// Predict the nearest gallery label for a face crop.
    pub fn predict(&mut self, face: &GrayImage) -> Result<Prediction, ModelError> {
        let probe = self.embedder.embed(face)?;
        let Some((label, similarity)) = nearest_label(&self.gallery, &probe) else {
            return Err(ModelError::Untrained);
        };
        Ok(Prediction {
            label,
            confidence: f64::from(1.0 - similarity),
        })
    }
}

impl crate::pipeline::Classify for RecognitionModel {
    fn input_size(&self) -> (u32, u32) {
        RecognitionModel::input_size(self)
    }

    fn predict(&mut self, face: &GrayImage) -> Result<Prediction, ModelError> {
        RecognitionModel::predict(self, face)
    }
}

/// Full-gallery nearest-neighbor scan; every entry is compared, no early
/// exit. Returns the best (label, similarity).
fn nearest_label(gallery: &[(Embedding, i32)], probe: &Embedding) -> Option<(i32, f32)> {
    let mut best: Option<(i32, f32)> = None;
    for (embedding, label) in gallery {
        let similarity = probe.similarity(embedding);
        if best.map_or(true, |(_, s)| similarity > s) {
            best = Some((*label, similarity));
        }
    }
    best
}
