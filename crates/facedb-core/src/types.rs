//! Shared result types of the recognition pipeline.

/// Axis-aligned face rectangle in the coordinate space of the frame it was
/// detected in. Coordinates may extend past the frame edges; consumers
/// clamp where they must and report the rectangle unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl FaceRect {
    /// Map this rectangle into another coordinate space, e.g. from the
    /// fixed detection resolution back to full-frame coordinates.
    pub fn scaled(&self, sx: f64, sy: f64) -> FaceRect {
        FaceRect {
            x: (self.x as f64 * sx).round() as i32,
            y: (self.y as f64 * sy).round() as i32,
            width: (self.width as f64 * sx).round() as i32,
            height: (self.height as f64 * sy).round() as i32,
        }
    }
}

/// One classification outcome from the recognition model. The confidence
/// is distance-like: lower means more confident.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub label: i32,
    pub confidence: f64,
}

/// One recognized face: the detector's rectangle plus the model's verdict
/// with the label resolved to a person name.
#[derive(Debug, Clone)]
pub struct RecognitionResult {
    pub rect: FaceRect,
    pub label: i32,
    pub name: String,
    pub confidence: f64,
}
