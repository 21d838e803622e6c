//! Ambient configuration from `FACEDB_*` environment variables.
//!
//! Everything that is part of a tool's argument contract stays on the
//! command line; these are the settings shared across tools.

use std::path::PathBuf;

pub struct Config {
    /// Directory containing the embedding network.
    pub model_dir: PathBuf,
    /// Embedding network file name inside `model_dir`.
    pub embed_model: String,
    /// Caption font for annotated output.
    pub font_path: Option<PathBuf>,
    /// When set, the live loop writes its annotated preview frame here.
    pub preview_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration with defaults for every unset variable.
    pub fn from_env() -> Self {
        Self {
            model_dir: std::env::var("FACEDB_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("models")),
            embed_model: std::env::var("FACEDB_EMBED_MODEL")
                .unwrap_or_else(|_| "w600k_r50.onnx".to_string()),
            font_path: std::env::var("FACEDB_FONT").ok().map(PathBuf::from),
            preview_path: std::env::var("FACEDB_PREVIEW_PATH").ok().map(PathBuf::from),
        }
    }

    /// Path to the embedding network file.
    pub fn embed_model_path(&self) -> String {
        self.model_dir
            .join(&self.embed_model)
            .to_string_lossy()
            .into_owned()
    }
}
