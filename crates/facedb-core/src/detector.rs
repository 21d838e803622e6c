//! Face detector adapter — SCRFD-family ONNX models via ONNX Runtime.
//!
//! The detector definition file is opaque to the rest of the system: it is
//! loaded once at startup and queried per frame. Decoding covers the
//! 3-stride anchor-free SCRFD layout with NMS post-processing; exports with
//! landmark heads (9 outputs) and without (6 outputs) are both accepted,
//! landmark tensors are ignored.

use crate::types::FaceRect;
use image::imageops::FilterType;
use image::GrayImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const DETECT_INPUT_SIZE: usize = 640;
const DETECT_MEAN: f32 = 127.5;
const DETECT_STD: f32 = 128.0;
const SCORE_THRESHOLD: f32 = 0.5;
const NMS_IOU_THRESHOLD: f32 = 0.4;
const STRIDES: [usize; 3] = [8, 16, 32];
const ANCHORS_PER_CELL: usize = 2;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("detector definition not found: {0}")]
    ModelNotFound(String),
    #[error("detector inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Candidate box in frame coordinates, pre-NMS.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    score: f32,
}

/// Metadata for mapping letterboxed coordinates back to the frame.
struct Letterbox {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
}

/// SCRFD-based face detector.
pub struct FaceDetector {
    session: Session,
    input_size: usize,
    /// (score, bbox) output tensor indices per stride, discovered at load.
    stride_outputs: [(usize, usize); 3],
}

impl FaceDetector {
    /// Load the detector definition from the given path.
    pub fn load(model_path: &str) -> Result<Self, DetectorError> {
        if !Path::new(model_path).exists() {
            return Err(DetectorError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        let output_names: Vec<String> =
            session.outputs().iter().map(|o| o.name().to_string()).collect();

        tracing::info!(
            path = model_path,
            outputs = ?output_names,
            "loaded face detector"
        );

        if output_names.len() < 6 {
            return Err(DetectorError::InferenceFailed(format!(
                "detector model requires at least 6 outputs (3 strides × score/bbox), got {}",
                output_names.len()
            )));
        }

        let stride_outputs = discover_stride_outputs(&output_names);
        tracing::debug!(?stride_outputs, "detector output tensor mapping");

        Ok(Self {
            session,
            input_size: DETECT_INPUT_SIZE,
            stride_outputs,
        })
    }

    /// Detect faces in a grayscale frame.
    ///
    /// Returns integer rectangles in frame coordinates, ordered by
    /// descending score — the detector-defined order downstream consumers
    /// preserve.
    pub fn detect(&mut self, frame: &GrayImage) -> Result<Vec<FaceRect>, DetectorError> {
        let (input, letterbox) = self.preprocess(frame);

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let mut candidates = Vec::new();
        for (pos, &stride) in STRIDES.iter().enumerate() {
            let (score_idx, bbox_idx) = self.stride_outputs[pos];

            let (_, scores) = outputs[score_idx]
                .try_extract_tensor::<f32>()
                .map_err(|e| DetectorError::InferenceFailed(format!("scores stride {stride}: {e}")))?;
            let (_, boxes) = outputs[bbox_idx]
                .try_extract_tensor::<f32>()
                .map_err(|e| DetectorError::InferenceFailed(format!("boxes stride {stride}: {e}")))?;

            decode_stride(
                scores,
                boxes,
                stride,
                self.input_size,
                &letterbox,
                &mut candidates,
            );
        }

        let kept = nms(candidates, NMS_IOU_THRESHOLD);
        Ok(kept
            .iter()
            .map(|c| FaceRect {
                x: c.x1.round() as i32,
                y: c.y1.round() as i32,
                width: (c.x2 - c.x1).round().max(0.0) as i32,
                height: (c.y2 - c.y1).round().max(0.0) as i32,
            })
            .collect())
    }

    /// Letterbox the frame into the square network input and normalize.
    /// Grayscale is replicated across the three input channels; padding
    /// uses the mean value so it normalizes to zero.
    fn preprocess(&self, frame: &GrayImage) -> (Array4<f32>, Letterbox) {
        let side = self.input_size as f32;
        let (w, h) = frame.dimensions();
        let scale = (side / w as f32).min(side / h as f32);
        let new_w = ((w as f32 * scale).round() as u32).max(1);
        let new_h = ((h as f32 * scale).round() as u32).max(1);
        let pad_x = (side - new_w as f32) / 2.0;
        let pad_y = (side - new_h as f32) / 2.0;

        let resized = image::imageops::resize(frame, new_w, new_h, FilterType::Triangle);

        let x0 = pad_x.floor() as usize;
        let y0 = pad_y.floor() as usize;
        let mut tensor = Array4::<f32>::zeros((1, 3, self.input_size, self.input_size));
        for y in 0..self.input_size {
            for x in 0..self.input_size {
                let pixel = if y >= y0
                    && y < y0 + new_h as usize
                    && x >= x0
                    && x < x0 + new_w as usize
                {
                    resized.get_pixel((x - x0) as u32, (y - y0) as u32)[0] as f32
                } else {
                    DETECT_MEAN
                };
                let normalized = (pixel - DETECT_MEAN) / DETECT_STD;
                tensor[[0, 0, y, x]] = normalized;
                tensor[[0, 1, y, x]] = normalized;
                tensor[[0, 2, y, x]] = normalized;
            }
        }

        (
            tensor,
            Letterbox {
                scale,
                pad_x,
                pad_y,
            },
        )
    }
}

impl crate::pipeline::Detect for FaceDetector {
    fn detect(&mut self, frame: &GrayImage) -> Result<Vec<FaceRect>, DetectorError> {
        FaceDetector::detect(self, frame)
    }
}

/// Discover (score, bbox) output indices per stride.
///
/// Named exports ("score_8", "bbox_16", ...) are mapped by name; anything
/// else falls back to the standard positional ordering
/// [0-2] = scores, [3-5] = bboxes (landmark tensors, if present, follow
/// and are ignored).
fn discover_stride_outputs(names: &[String]) -> [(usize, usize); 3] {
    let find = |prefix: &str, stride: usize| -> Option<usize> {
        let target = format!("{prefix}_{stride}");
        names.iter().position(|n| n == &target)
    };

    let named = STRIDES
        .iter()
        .all(|&stride| find("score", stride).is_some() && find("bbox", stride).is_some());

    if named {
        tracing::info!("detector: using name-based output tensor mapping");
        std::array::from_fn(|i| {
            let stride = STRIDES[i];
            (
                find("score", stride).unwrap(),
                find("bbox", stride).unwrap(),
            )
        })
    } else {
        tracing::info!(
            ?names,
            "detector: output names not recognized, using positional mapping [0-2]=scores, [3-5]=bboxes"
        );
        [(0, 3), (1, 4), (2, 5)]
    }
}

/// Decode one stride level into frame-space candidates.
fn decode_stride(
    scores: &[f32],
    boxes: &[f32],
    stride: usize,
    input_size: usize,
    letterbox: &Letterbox,
    out: &mut Vec<Candidate>,
) {
    let grid_w = input_size / stride;
    let grid_h = input_size / stride;
    let num_anchors = grid_w * grid_h * ANCHORS_PER_CELL;

    for idx in 0..num_anchors {
        let score = scores.get(idx).copied().unwrap_or(0.0);
        if score <= SCORE_THRESHOLD {
            continue;
        }

        let cell = idx / ANCHORS_PER_CELL;
        let anchor_cx = (cell % grid_w) as f32 * stride as f32;
        let anchor_cy = (cell / grid_w) as f32 * stride as f32;

        // Box head: [left, top, right, bottom] offsets in stride units.
        let off = idx * 4;
        if off + 3 >= boxes.len() {
            continue;
        }
        let x1 = anchor_cx - boxes[off] * stride as f32;
        let y1 = anchor_cy - boxes[off + 1] * stride as f32;
        let x2 = anchor_cx + boxes[off + 2] * stride as f32;
        let y2 = anchor_cy + boxes[off + 3] * stride as f32;

        out.push(Candidate {
            x1: (x1 - letterbox.pad_x) / letterbox.scale,
            y1: (y1 - letterbox.pad_y) / letterbox.scale,
            x2: (x2 - letterbox.pad_x) / letterbox.scale,
            y2: (y2 - letterbox.pad_y) / letterbox.scale,
            score,
        });
    }
}

/// Non-Maximum Suppression. Returns survivors sorted by descending score.
fn nms(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        if keep.iter().all(|k| iou(k, &candidate) <= iou_threshold) {
            keep.push(candidate);
        }
    }
    keep
}

/// Intersection-over-Union of two candidates.
fn iou(a: &Candidate, b: &Candidate) -> f32 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let area_a = (a.x2 - a.x1).max(0.0) * (a.y2 - a.y1).max(0.0);
    let area_b = (b.x2 - b.x1).max(0.0) * (b.y2 - b.y1).max(0.0);
    let union = area_a + area_b - inter;

    if union > 0.0 {
        inter / union
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(x1: f32, y1: f32, x2: f32, y2: f32, score: f32) -> Candidate {
        Candidate {
            x1,
            y1,
            x2,
            y2,
            score,
        }
    }

    #[test]
    fn test_iou_identical() {
        let a = candidate(0.0, 0.0, 100.0, 100.0, 1.0);
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_disjoint() {
        let a = candidate(0.0, 0.0, 10.0, 10.0, 1.0);
        let b = candidate(20.0, 20.0, 30.0, 30.0, 1.0);
        assert!(iou(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_iou_half_overlap() {
        let a = candidate(0.0, 0.0, 10.0, 10.0, 1.0);
        let b = candidate(5.0, 0.0, 15.0, 10.0, 1.0);
        // Overlap 5x10 = 50, union 100+100-50 = 150.
        assert!((iou(&a, &b) - 50.0 / 150.0).abs() < 1e-6);
    }

    #[test]
    fn test_nms_suppresses_overlapping() {
        let candidates = vec![
            candidate(0.0, 0.0, 100.0, 100.0, 0.9),
            candidate(5.0, 5.0, 105.0, 105.0, 0.8),
            candidate(200.0, 200.0, 250.0, 250.0, 0.7),
        ];
        let kept = nms(candidates, 0.4);
        assert_eq!(kept.len(), 2);
        assert!((kept[0].score - 0.9).abs() < 1e-6);
        assert!((kept[1].score - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_nms_orders_by_score() {
        let candidates = vec![
            candidate(0.0, 0.0, 10.0, 10.0, 0.6),
            candidate(50.0, 50.0, 60.0, 60.0, 0.9),
        ];
        let kept = nms(candidates, 0.4);
        assert_eq!(kept.len(), 2);
        assert!(kept[0].score > kept[1].score);
    }

    #[test]
    fn test_nms_empty() {
        assert!(nms(vec![], 0.4).is_empty());
    }

    #[test]
    fn test_discover_stride_outputs_named() {
        let names: Vec<String> = [
            "score_8", "score_16", "score_32", "bbox_8", "bbox_16", "bbox_32", "kps_8", "kps_16",
            "kps_32",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let mapping = discover_stride_outputs(&names);
        assert_eq!(mapping, [(0, 3), (1, 4), (2, 5)]);
    }

    #[test]
    fn test_discover_stride_outputs_shuffled_named() {
        let names: Vec<String> = [
            "bbox_8", "score_8", "bbox_16", "score_16", "bbox_32", "score_32",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let mapping = discover_stride_outputs(&names);
        assert_eq!(mapping, [(1, 0), (3, 2), (5, 4)]);
    }

    #[test]
    fn test_discover_stride_outputs_positional_fallback() {
        let names: Vec<String> = (0..9).map(|i: usize| i.to_string()).collect();
        assert_eq!(discover_stride_outputs(&names), [(0, 3), (1, 4), (2, 5)]);
    }

    #[test]
    fn test_decode_stride_maps_through_letterbox() {
        // One anchor above threshold at cell (1, 1) of a tiny 2x2 grid.
        let grid = 2usize;
        let stride = 8usize;
        let input = grid * stride;
        let anchors = grid * grid * ANCHORS_PER_CELL;

        let mut scores = vec![0.0f32; anchors];
        let mut boxes = vec![0.0f32; anchors * 4];
        let idx = (grid + 1) * ANCHORS_PER_CELL; // cell (1,1), anchor 0
        scores[idx] = 0.9;
        // one stride unit in every direction around the anchor center
        boxes[idx * 4..idx * 4 + 4].copy_from_slice(&[1.0, 1.0, 1.0, 1.0]);

        // Identity letterbox.
        let letterbox = Letterbox {
            scale: 1.0,
            pad_x: 0.0,
            pad_y: 0.0,
        };
        let mut out = Vec::new();
        decode_stride(&scores, &boxes, stride, input, &letterbox, &mut out);

        assert_eq!(out.len(), 1);
        let c = out[0];
        assert!((c.x1 - 0.0).abs() < 1e-6);
        assert!((c.y1 - 0.0).abs() < 1e-6);
        assert!((c.x2 - 16.0).abs() < 1e-6);
        assert!((c.y2 - 16.0).abs() < 1e-6);
        assert!((c.score - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_letterbox_roundtrip() {
        // 320x240 frame letterboxed into 640x640.
        let scale = (640.0f32 / 320.0).min(640.0 / 240.0);
        let new_w = (320.0 * scale).round();
        let new_h = (240.0 * scale).round();
        let letterbox = Letterbox {
            scale,
            pad_x: (640.0 - new_w) / 2.0,
            pad_y: (640.0 - new_h) / 2.0,
        };

        let (orig_x, orig_y) = (100.0f32, 50.0f32);
        let boxed_x = orig_x * letterbox.scale + letterbox.pad_x;
        let boxed_y = orig_y * letterbox.scale + letterbox.pad_y;
        let back_x = (boxed_x - letterbox.pad_x) / letterbox.scale;
        let back_y = (boxed_y - letterbox.pad_y) / letterbox.scale;

        assert!((back_x - orig_x).abs() < 0.1);
        assert!((back_y - orig_y).abs() < 0.1);
    }
}
