//! facedb-core — Face detection and recognition for the face database tools.
//!
//! The detector and the embedding network are opaque ONNX models executed
//! through ONNX Runtime; the recognition model is a labeled embedding
//! gallery trained from the dataset each run. The pipeline ties them
//! together: detect, crop, normalize, classify, report.

pub mod annotate;
pub mod detector;
pub mod model;
pub mod pipeline;
pub mod recognizer;
pub mod types;

pub use detector::{DetectorError, FaceDetector};
pub use model::{ModelError, RecognitionModel};
pub use pipeline::{recognize, Classify, Detect, PipelineError};
pub use recognizer::{Embedding, FaceEmbedder, RecognizerError};
pub use types::{FaceRect, Prediction, RecognitionResult};
