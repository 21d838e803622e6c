//! Face embedding network adapter via ONNX Runtime.
//!
//! The network is opaque: a face crop goes in, an L2-normalized
//! 512-dimensional embedding comes out. Gallery construction and label
//! prediction on top of embeddings live in [`crate::model`].

use image::imageops::FilterType;
use image::GrayImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const EMBED_INPUT_SIZE: u32 = 112;
const EMBED_MEAN: f32 = 127.5;
const EMBED_STD: f32 = 127.5; // symmetric normalization, unlike the detector
const EMBED_DIM: usize = 512;

#[derive(Error, Debug)]
pub enum RecognizerError {
    #[error("embedding model not found: {0}")]
    ModelNotFound(String),
    #[error("embedding inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// An L2-normalized face embedding.
#[derive(Debug, Clone)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    /// Cosine similarity in [-1, 1]; higher = more similar. Always walks
    /// every dimension.
    pub fn similarity(&self, other: &Embedding) -> f32 {
        let mut dot = 0.0f32;
        let mut norm_a = 0.0f32;
        let mut norm_b = 0.0f32;

        for (a, b) in self.values.iter().zip(other.values.iter()) {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }

        let denom = norm_a.sqrt() * norm_b.sqrt();
        if denom > 0.0 {
            dot / denom
        } else {
            0.0
        }
    }
}

/// ONNX face embedding network.
pub struct FaceEmbedder {
    session: Session,
}

impl FaceEmbedder {
    /// Load the embedding network from the given path.
    pub fn load(model_path: &str) -> Result<Self, RecognizerError> {
        if !Path::new(model_path).exists() {
            return Err(RecognizerError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(path = model_path, "loaded embedding network");

        Ok(Self { session })
    }

    /// Embed a grayscale face crop of any size.
    pub fn embed(&mut self, face: &GrayImage) -> Result<Embedding, RecognizerError> {
        let input = Self::preprocess(face);

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| RecognizerError::InferenceFailed(format!("embedding extraction: {e}")))?;

        if raw.len() != EMBED_DIM {
            return Err(RecognizerError::InferenceFailed(format!(
                "expected {EMBED_DIM}-dim embedding, got {}",
                raw.len()
            )));
        }

        let norm: f32 = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
        let values = if norm > 0.0 {
            raw.iter().map(|x| x / norm).collect()
        } else {
            raw.to_vec()
        };

        Ok(Embedding { values })
    }

    /// Resize to the network input and build the normalized NCHW tensor,
    /// replicating grayscale across the three channels.
    fn preprocess(face: &GrayImage) -> Array4<f32> {
        let size = EMBED_INPUT_SIZE;
        let resized = if face.dimensions() == (size, size) {
            face.clone()
        } else {
            image::imageops::resize(face, size, size, FilterType::CatmullRom)
        };

        let side = size as usize;
        let mut tensor = Array4::<f32>::zeros((1, 3, side, side));
        for y in 0..side {
            for x in 0..side {
                let pixel = resized.get_pixel(x as u32, y as u32)[0] as f32;
                let normalized = (pixel - EMBED_MEAN) / EMBED_STD;
                tensor[[0, 0, y, x]] = normalized;
                tensor[[0, 1, y, x]] = normalized;
                tensor[[0, 2, y, x]] = normalized;
            }
        }

        tensor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_similarity_identical() {
        let a = Embedding {
            values: vec![1.0, 0.0, 0.0],
        };
        let b = Embedding {
            values: vec![1.0, 0.0, 0.0],
        };
        assert!((a.similarity(&b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_similarity_orthogonal() {
        let a = Embedding {
            values: vec![1.0, 0.0],
        };
        let b = Embedding {
            values: vec![0.0, 1.0],
        };
        assert!(a.similarity(&b).abs() < 1e-6);
    }

    #[test]
    fn test_similarity_opposite() {
        let a = Embedding {
            values: vec![1.0, 0.0],
        };
        let b = Embedding {
            values: vec![-1.0, 0.0],
        };
        assert!((a.similarity(&b) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_similarity_zero_vector() {
        let a = Embedding {
            values: vec![0.0, 0.0],
        };
        let b = Embedding {
            values: vec![1.0, 0.0],
        };
        assert_eq!(a.similarity(&b), 0.0);
    }

    #[test]
    fn test_preprocess_output_shape() {
        let face = GrayImage::new(64, 64);
        let tensor = FaceEmbedder::preprocess(&face);
        assert_eq!(
            tensor.shape(),
            &[1, 3, EMBED_INPUT_SIZE as usize, EMBED_INPUT_SIZE as usize]
        );
    }

    #[test]
    fn test_preprocess_normalization() {
        let face = GrayImage::from_pixel(EMBED_INPUT_SIZE, EMBED_INPUT_SIZE, image::Luma([128]));
        let tensor = FaceEmbedder::preprocess(&face);
        let expected = (128.0 - EMBED_MEAN) / EMBED_STD;
        assert!((tensor[[0, 0, 0, 0]] - expected).abs() < 1e-6);
    }

    #[test]
    fn test_preprocess_channels_identical() {
        let face = GrayImage::from_pixel(32, 32, image::Luma([100]));
        let tensor = FaceEmbedder::preprocess(&face);
        for y in [0usize, 55, 111] {
            for x in [0usize, 55, 111] {
                assert_eq!(tensor[[0, 0, y, x]], tensor[[0, 1, y, x]]);
                assert_eq!(tensor[[0, 1, y, x]], tensor[[0, 2, y, x]]);
            }
        }
    }
}
