//! Live face collection — interactive capture with online enrollment.
//!
//! Pulls frames from a V4L2 device, detects at a fixed downscaled
//! resolution, classifies against the current model, and reacts to
//! keyboard intents: enroll a face sample (with a synchronous full
//! retrain), enroll a portrait, or end the session.

use crate::config::Config;
use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal;
use facedb_core::annotate::Annotator;
use facedb_core::detector::FaceDetector;
use facedb_core::model::{ModelError, RecognitionModel};
use facedb_core::pipeline;
use facedb_core::recognizer::FaceEmbedder;
use facedb_core::types::{FaceRect, RecognitionResult};
use facedb_data::dataset::{Dataset, FACE_SAMPLE_SIZE, PORTRAIT_SIZE};
use facedb_data::enroll::EnrollmentStore;
use facedb_hw::camera::Camera;
use image::imageops::{self, FilterType};
use image::GrayImage;
use std::path::PathBuf;
use std::time::Duration;

/// Detection runs at this fixed resolution; results map back to the full
/// frame through the inverse scale factors.
const DETECT_FRAME_WIDTH: u32 = 320;
const DETECT_FRAME_HEIGHT: u32 = 240;

/// Arguments for one collection session.
pub struct FaceCollectionArgs {
    /// Path to the pretrained face-detector definition.
    pub cascade: String,
    /// Face database root.
    pub data_path: PathBuf,
    /// Capture device id (`/dev/video<id>`).
    pub device_id: u32,
    /// Person this session enrolls.
    pub name: String,
}

enum Intent {
    SaveFace,
    SavePortrait,
    Exit,
}

/// Run the capture loop until the user ends the session.
///
/// A database that is too small to train (empty, or a single person)
/// starts detection-only; the model trains as soon as an enrollment makes
/// the dataset sufficient.
pub fn run(args: &FaceCollectionArgs, config: &Config) -> Result<()> {
    let mut store = EnrollmentStore::open(&args.data_path, &args.name)
        .context("cannot prepare the enrollment directories")?;

    let mut dataset =
        Dataset::load(&args.data_path).context("failed to load the face database")?;
    tracing::info!(
        samples = dataset.len(),
        persons = dataset.registry().len(),
        "face database loaded"
    );

    let embedder = FaceEmbedder::load(&config.embed_model_path())
        .context("failed to load the embedding network")?;
    let mut model = RecognitionModel::new(embedder);
    match model.train(&dataset) {
        Ok(()) => {}
        Err(ModelError::InsufficientTrainingData { samples, labels }) => {
            tracing::warn!(
                samples,
                labels,
                "not enough data to train yet; starting detection-only"
            );
        }
        Err(e) => return Err(e.into()),
    }

    let mut detector =
        FaceDetector::load(&args.cascade).context("failed to load the face detector")?;
    let annotator = Annotator::new(config.font_path.as_deref());

    let camera = Camera::open_id(args.device_id)?;
    let mut stream = camera.stream()?;

    // The first frame pins the inverse scale factors from detection space
    // back to full-resolution coordinates.
    let first = stream.next_frame()?;
    let inv_scale_x = f64::from(first.width) / f64::from(DETECT_FRAME_WIDTH);
    let inv_scale_y = f64::from(first.height) / f64::from(DETECT_FRAME_HEIGHT);

    let _raw_mode = RawModeGuard::enable()?;
    tracing::info!(
        name = %args.name,
        "collection session started: [space] save face, [p] save portrait, [esc]/[q] quit"
    );

    let mut save_face = false;
    let mut save_portrait = false;

    loop {
        match poll_intent()? {
            Some(Intent::Exit) => break,
            Some(Intent::SaveFace) => save_face = true,
            Some(Intent::SavePortrait) => save_portrait = true,
            None => {}
        }

        let frame = stream.next_frame()?;
        let full = GrayImage::from_raw(frame.width, frame.height, frame.data)
            .context("frame buffer does not match its dimensions")?;
        let detect_frame = imageops::resize(
            &full,
            DETECT_FRAME_WIDTH,
            DETECT_FRAME_HEIGHT,
            FilterType::CatmullRom,
        );

        let rects = detector.detect(&detect_frame)?;

        let results = if model.is_trained() {
            Some(pipeline::classify_rects(
                &detect_frame,
                &rects,
                &mut model,
                dataset.registry(),
            )?)
        } else {
            None
        };

        // Enrollment intents consume the first detected face of the frame;
        // with no face in view the intent stays armed for the next frame.
        if let Some(&target) = rects.first() {
            if save_face {
                enroll_face(
                    &detect_frame,
                    &target,
                    &mut store,
                    &mut dataset,
                    &mut model,
                    &args.name,
                )?;
                save_face = false;
            }
            if save_portrait {
                let crop = pipeline::crop_region(&detect_frame, &target);
                let portrait =
                    imageops::resize(&crop, PORTRAIT_SIZE, PORTRAIT_SIZE, FilterType::CatmullRom);
                let path = store.save_portrait(&portrait)?;
                tracing::info!(path = %path.display(), "portrait enrolled");
                save_portrait = false;
            }
        }

        match &results {
            Some(results) => {
                let display: Vec<RecognitionResult> = results
                    .iter()
                    .map(|r| RecognitionResult {
                        rect: r.rect.scaled(inv_scale_x, inv_scale_y),
                        ..r.clone()
                    })
                    .collect();
                for r in &display {
                    tracing::info!(
                        name = %r.name,
                        confidence = r.confidence,
                        x = r.rect.x,
                        y = r.rect.y,
                        width = r.rect.width,
                        height = r.rect.height,
                        "face recognized"
                    );
                }
                write_preview(config, &annotator, &full, Some(&display), &[]);
            }
            None => {
                let display: Vec<FaceRect> = rects
                    .iter()
                    .map(|r| r.scaled(inv_scale_x, inv_scale_y))
                    .collect();
                if !display.is_empty() {
                    tracing::info!(faces = display.len(), "faces detected (model untrained)");
                }
                write_preview(config, &annotator, &full, None, &display);
            }
        }
    }

    tracing::info!("collection session ended");
    Ok(())
}

/// Persist the face crop at the canonical recognition size, append it to
/// the in-memory dataset under the session label, and synchronously
/// retrain on the full updated dataset.
fn enroll_face(
    detect_frame: &GrayImage,
    target: &FaceRect,
    store: &mut EnrollmentStore,
    dataset: &mut Dataset,
    model: &mut RecognitionModel,
    name: &str,
) -> Result<()> {
    let crop = pipeline::crop_region(detect_frame, target);
    let sample = imageops::resize(&crop, FACE_SAMPLE_SIZE, FACE_SAMPLE_SIZE, FilterType::CatmullRom);

    let path = store.save_face(&sample)?;
    let label = dataset.enroll_sample(name, sample);
    tracing::info!(
        path = %path.display(),
        label,
        samples = dataset.len(),
        "face sample enrolled"
    );

    match model.train(dataset) {
        Ok(()) => {}
        Err(ModelError::InsufficientTrainingData { samples, labels }) => {
            tracing::warn!(samples, labels, "dataset still too small to train");
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// Write the annotated preview frame when a preview path is configured.
/// Preview failures are logged, never fatal.
fn write_preview(
    config: &Config,
    annotator: &Annotator,
    full: &GrayImage,
    results: Option<&[RecognitionResult]>,
    rects: &[FaceRect],
) {
    let Some(path) = &config.preview_path else {
        return;
    };
    let mut canvas = image::DynamicImage::ImageLuma8(full.clone()).to_rgb8();
    match results {
        Some(results) => annotator.draw(&mut canvas, results),
        None => annotator.draw_rects(&mut canvas, rects),
    }
    if let Err(e) = canvas.save(path) {
        tracing::warn!(path = %path.display(), error = %e, "cannot write the preview frame");
    }
}

/// Raw-mode guard: enabled for the session, restored on drop — including
/// early error returns out of the capture loop.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> Result<Self> {
        terminal::enable_raw_mode().context("cannot enable raw terminal mode")?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Drain pending key events without blocking; the last intent wins.
fn poll_intent() -> Result<Option<Intent>> {
    let mut intent = None;
    while event::poll(Duration::ZERO).context("keyboard poll failed")? {
        if let Event::Key(key) = event::read().context("keyboard read failed")? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Esc | KeyCode::Char('q') => intent = Some(Intent::Exit),
                KeyCode::Char('p') => intent = Some(Intent::SavePortrait),
                KeyCode::Char(' ') => intent = Some(Intent::SaveFace),
                _ => {}
            }
        }
    }
    Ok(intent)
}
