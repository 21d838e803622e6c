//! Batch face recognition over a single image file.

use crate::config::Config;
use crate::output;
use anyhow::{bail, Context, Result};
use facedb_core::annotate::Annotator;
use facedb_core::detector::FaceDetector;
use facedb_core::model::{self, RecognitionModel};
use facedb_core::pipeline;
use facedb_core::recognizer::FaceEmbedder;
use facedb_data::dataset::Dataset;
use std::path::PathBuf;

/// Arguments for one batch-recognition run.
pub struct RecognizeImageArgs {
    /// Path to the pretrained face-detector definition.
    pub cascade: String,
    /// Face database root.
    pub data_path: PathBuf,
    pub input_image: PathBuf,
    pub output_info: PathBuf,
    pub output_image: Option<PathBuf>,
}

/// Load the database, train the model, recognize every face in the input
/// image, and write the JSON report (plus the optional annotated image).
pub fn run(args: &RecognizeImageArgs, config: &Config) -> Result<()> {
    let faces_dir = args.data_path.join("faces");
    if !faces_dir.is_dir() {
        bail!(
            "the face database path {} does not exist",
            faces_dir.display()
        );
    }

    let dataset =
        Dataset::load(&args.data_path).context("failed to load the face database")?;
    tracing::info!(
        samples = dataset.len(),
        persons = dataset.registry().len(),
        "face database loaded"
    );

    // The external trainer needs at least one sample across two labels;
    // check before any model file is even opened.
    model::check_trainable(&dataset)?;

    let (width, height) = dataset.canonical_size();
    tracing::info!(width, height, "standard face image size");

    let embedder = FaceEmbedder::load(&config.embed_model_path())
        .context("failed to load the embedding network")?;
    let mut model = RecognitionModel::new(embedder);
    model.train(&dataset)?;

    let mut detector =
        FaceDetector::load(&args.cascade).context("failed to load the face detector")?;

    let input = image::open(&args.input_image)
        .with_context(|| format!("cannot decode input image {}", args.input_image.display()))?;
    let gray = input.to_luma8();

    let results = pipeline::recognize(&gray, &mut detector, &mut model, dataset.registry())?;
    tracing::info!(faces = results.len(), "faces detected");
    for result in &results {
        tracing::info!(name = %result.name, confidence = result.confidence, "face recognized");
    }

    output::write_json(&args.output_info, &output::face_reports(&results))?;
    tracing::info!(path = %args.output_info.display(), "recognition report written");

    if let Some(out_image) = &args.output_image {
        let mut canvas = input.to_rgb8();
        Annotator::new(config.font_path.as_deref()).draw(&mut canvas, &results);
        canvas
            .save(out_image)
            .with_context(|| format!("cannot write output image {}", out_image.display()))?;
        tracing::info!(path = %out_image.display(), "annotated image written");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::fs;

    fn args(root: &std::path::Path) -> RecognizeImageArgs {
        RecognizeImageArgs {
            cascade: root.join("det.onnx").to_string_lossy().into_owned(),
            data_path: root.to_path_buf(),
            input_image: root.join("in.png"),
            output_info: root.join("out.json"),
            output_image: None,
        }
    }

    fn config() -> Config {
        Config {
            model_dir: PathBuf::from("models"),
            embed_model: "w600k_r50.onnx".into(),
            font_path: None,
            preview_path: None,
        }
    }

    #[test]
    fn test_missing_faces_directory_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(&args(dir.path()), &config()).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_insufficient_dataset_is_fatal_before_models_load() {
        let dir = tempfile::tempdir().unwrap();
        let person = dir.path().join("faces").join("alice");
        fs::create_dir_all(&person).unwrap();
        RgbImage::from_pixel(32, 32, Rgb([128, 128, 128]))
            .save(person.join("0.png"))
            .unwrap();

        // One person only: rejected before the embedding network (which
        // does not exist here) would be opened.
        let err = run(&args(dir.path()), &config()).unwrap_err();
        assert!(err.to_string().contains("insufficient training data"));
    }
}
