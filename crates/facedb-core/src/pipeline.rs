//! Recognition pipeline — detect, crop, normalize, classify, report.

use crate::detector::DetectorError;
use crate::model::ModelError;
use crate::types::{FaceRect, Prediction, RecognitionResult};
use facedb_data::dataset::LabelRegistry;
use image::imageops::{self, FilterType};
use image::GrayImage;
use thiserror::Error;

/// A failed detection or classification pass fails the whole frame; there
/// are no retries and no partial results.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("face detection failed: {0}")]
    Detection(#[from] DetectorError),
    #[error("face classification failed: {0}")]
    Classification(#[from] ModelError),
}

/// Detection seam: an image in, candidate rectangles out, in the
/// detector's own order.
pub trait Detect {
    fn detect(&mut self, frame: &GrayImage) -> Result<Vec<FaceRect>, DetectorError>;
}

/// Classification seam over a trained recognition model.
pub trait Classify {
    /// Width and height every probe crop is resized to before prediction.
    fn input_size(&self) -> (u32, u32);
    fn predict(&mut self, face: &GrayImage) -> Result<Prediction, ModelError>;
}

/// Run one full recognition pass over a grayscale frame.
///
/// One result per detected rectangle, in detection order. Zero detections
/// yield an empty result without touching the classifier.
pub fn recognize(
    frame: &GrayImage,
    detector: &mut impl Detect,
    model: &mut impl Classify,
    registry: &LabelRegistry,
) -> Result<Vec<RecognitionResult>, PipelineError> {
    let rects = detector.detect(frame)?;
    tracing::debug!(faces = rects.len(), "detection pass complete");
    classify_rects(frame, &rects, model, registry)
}

/// The classification stage of [`recognize`], split out so callers that
/// already ran detection (the live loop) can reuse it on their rectangles.
///
/// Each rectangle is reported unchanged; only the crop window is clamped
/// to the frame bounds. A predicted label missing from the registry
/// resolves to the defined unknown-name fallback instead of failing.
pub fn classify_rects(
    frame: &GrayImage,
    rects: &[FaceRect],
    model: &mut impl Classify,
    registry: &LabelRegistry,
) -> Result<Vec<RecognitionResult>, PipelineError> {
    let (probe_w, probe_h) = model.input_size();

    let mut results = Vec::with_capacity(rects.len());
    for &rect in rects {
        let crop = crop_region(frame, &rect);
        let probe = imageops::resize(&crop, probe_w, probe_h, FilterType::CatmullRom);
        let prediction = model.predict(&probe)?;
        let name = registry.display_name(prediction.label).to_string();

        tracing::debug!(
            name = %name,
            confidence = prediction.confidence,
            x = rect.x,
            y = rect.y,
            "face classified"
        );

        results.push(RecognitionResult {
            rect,
            label: prediction.label,
            name,
            confidence: prediction.confidence,
        });
    }

    Ok(results)
}

/// Crop `rect` out of `frame` with the window clamped to the frame bounds.
/// Degenerate windows produce a single black pixel so downstream resizing
/// stays defined.
pub fn crop_region(frame: &GrayImage, rect: &FaceRect) -> GrayImage {
    let fw = i64::from(frame.width());
    let fh = i64::from(frame.height());

    let x0 = i64::from(rect.x).clamp(0, fw);
    let y0 = i64::from(rect.y).clamp(0, fh);
    let x1 = (i64::from(rect.x) + i64::from(rect.width)).clamp(0, fw);
    let y1 = (i64::from(rect.y) + i64::from(rect.height)).clamp(0, fh);

    if x1 <= x0 || y1 <= y0 {
        return GrayImage::new(1, 1);
    }

    imageops::crop_imm(
        frame,
        x0 as u32,
        y0 as u32,
        (x1 - x0) as u32,
        (y1 - y0) as u32,
    )
    .to_image()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scripted detector returning a fixed set of rectangles.
    struct StubDetector {
        rects: Vec<FaceRect>,
        calls: usize,
    }

    impl StubDetector {
        fn new(rects: Vec<FaceRect>) -> Self {
            Self { rects, calls: 0 }
        }
    }

    impl Detect for StubDetector {
        fn detect(&mut self, _frame: &GrayImage) -> Result<Vec<FaceRect>, DetectorError> {
            self.calls += 1;
            Ok(self.rects.clone())
        }
    }

    /// Classifier stub that records every probe it receives.
    struct StubClassifier {
        input_size: (u32, u32),
        prediction: Prediction,
        seen: Vec<(u32, u32)>,
    }

    impl StubClassifier {
        fn new(input_size: (u32, u32), label: i32, confidence: f64) -> Self {
            Self {
                input_size,
                prediction: Prediction { label, confidence },
                seen: Vec::new(),
            }
        }
    }

    impl Classify for StubClassifier {
        fn input_size(&self) -> (u32, u32) {
            self.input_size
        }

        fn predict(&mut self, face: &GrayImage) -> Result<Prediction, ModelError> {
            self.seen.push(face.dimensions());
            Ok(self.prediction)
        }
    }

    struct FailingDetector;

    impl Detect for FailingDetector {
        fn detect(&mut self, _frame: &GrayImage) -> Result<Vec<FaceRect>, DetectorError> {
            Err(DetectorError::InferenceFailed("malformed frame".into()))
        }
    }

    fn registry_with(names: &[&str]) -> LabelRegistry {
        let mut registry = LabelRegistry::default();
        for name in names {
            registry.insert(name);
        }
        registry
    }

    fn rect(x: i32, y: i32, w: i32, h: i32) -> FaceRect {
        FaceRect {
            x,
            y,
            width: w,
            height: h,
        }
    }

    #[test]
    fn test_zero_detections_no_classification() {
        let frame = GrayImage::new(320, 240);
        let mut detector = StubDetector::new(vec![]);
        let mut classifier = StubClassifier::new((64, 64), 0, 10.0);

        let results = recognize(
            &frame,
            &mut detector,
            &mut classifier,
            &registry_with(&["alice"]),
        )
        .unwrap();

        assert!(results.is_empty());
        assert_eq!(detector.calls, 1);
        assert!(classifier.seen.is_empty());
    }

    #[test]
    fn test_in_bounds_rect_reported_unchanged() {
        let frame = GrayImage::new(320, 240);
        let detected = rect(40, 30, 100, 120);
        let mut detector = StubDetector::new(vec![detected]);
        let mut classifier = StubClassifier::new((64, 64), 0, 55.0);

        let results = recognize(
            &frame,
            &mut detector,
            &mut classifier,
            &registry_with(&["alice"]),
        )
        .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].rect, detected);
        assert_eq!(results[0].name, "alice");
        assert_eq!(results[0].label, 0);
        assert!((results[0].confidence - 55.0).abs() < 1e-9);
    }

    #[test]
    fn test_out_of_bounds_rect_reported_unchanged() {
        // The crop clamps; the report does not.
        let frame = GrayImage::new(100, 100);
        let detected = rect(-10, 80, 50, 50);
        let mut detector = StubDetector::new(vec![detected]);
        let mut classifier = StubClassifier::new((64, 64), 0, 1.0);

        let results = recognize(
            &frame,
            &mut detector,
            &mut classifier,
            &registry_with(&["alice"]),
        )
        .unwrap();

        assert_eq!(results[0].rect, detected);
        assert_eq!(classifier.seen, vec![(64, 64)]);
    }

    #[test]
    fn test_probes_resized_to_model_input() {
        let frame = GrayImage::new(320, 240);
        let mut detector = StubDetector::new(vec![rect(0, 0, 17, 23), rect(50, 50, 200, 100)]);
        let mut classifier = StubClassifier::new((48, 32), 1, 2.0);

        recognize(
            &frame,
            &mut detector,
            &mut classifier,
            &registry_with(&["alice", "bob"]),
        )
        .unwrap();

        assert_eq!(classifier.seen, vec![(48, 32), (48, 32)]);
    }

    #[test]
    fn test_detection_order_preserved() {
        let frame = GrayImage::new(320, 240);
        let first = rect(200, 10, 30, 30);
        let second = rect(5, 5, 30, 30);
        let mut detector = StubDetector::new(vec![first, second]);
        let mut classifier = StubClassifier::new((64, 64), 0, 3.0);

        let results = recognize(
            &frame,
            &mut detector,
            &mut classifier,
            &registry_with(&["alice"]),
        )
        .unwrap();

        assert_eq!(results[0].rect, first);
        assert_eq!(results[1].rect, second);
    }

    #[test]
    fn test_unknown_label_falls_back() {
        let frame = GrayImage::new(64, 64);
        let mut detector = StubDetector::new(vec![rect(0, 0, 64, 64)]);
        // Label 9 has no registry entry.
        let mut classifier = StubClassifier::new((64, 64), 9, 4.0);

        let results = recognize(
            &frame,
            &mut detector,
            &mut classifier,
            &registry_with(&["alice"]),
        )
        .unwrap();

        assert_eq!(results[0].name, facedb_data::dataset::UNKNOWN_NAME);
        assert_eq!(results[0].label, 9);
    }

    #[test]
    fn test_detector_failure_fails_the_pass() {
        let frame = GrayImage::new(64, 64);
        let mut classifier = StubClassifier::new((64, 64), 0, 0.0);

        let result = recognize(
            &frame,
            &mut FailingDetector,
            &mut classifier,
            &LabelRegistry::default(),
        );

        assert!(matches!(result, Err(PipelineError::Detection(_))));
        assert!(classifier.seen.is_empty());
    }

    #[test]
    fn test_crop_region_in_bounds() {
        let mut frame = GrayImage::new(10, 10);
        frame.put_pixel(3, 4, image::Luma([200]));

        let crop = crop_region(&frame, &rect(3, 4, 2, 2));
        assert_eq!(crop.dimensions(), (2, 2));
        assert_eq!(crop.get_pixel(0, 0)[0], 200);
    }

    #[test]
    fn test_crop_region_clamps_to_frame() {
        let frame = GrayImage::new(10, 10);
        let crop = crop_region(&frame, &rect(8, 8, 5, 5));
        assert_eq!(crop.dimensions(), (2, 2));
    }

    #[test]
    fn test_crop_region_degenerate() {
        let frame = GrayImage::new(10, 10);
        for bad in [rect(20, 20, 5, 5), rect(0, 0, 0, 0), rect(5, 5, -3, 4)] {
            let crop = crop_region(&frame, &bad);
            assert_eq!(crop.dimensions(), (1, 1));
        }
    }
}
