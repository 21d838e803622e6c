//! Drawing recognition results onto an output image.

use crate::types::{FaceRect, RecognitionResult};
use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};

const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const CAPTION_SCALE: f32 = 14.0;
/// Caption offset above the box corner, clamped to the canvas.
const CAPTION_OFFSET: i32 = 10;

/// Font locations tried when the caller does not name one.
const FALLBACK_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
];

/// Draws face boxes and caption text. Boxes always draw; captions need a
/// usable font and are skipped (with a startup warning) without one.
pub struct Annotator {
    font: Option<FontVec>,
}

impl Annotator {
    /// Resolve the caption font: the explicit path first, then well-known
    /// system locations.
    pub fn new(font_path: Option<&Path>) -> Self {
        let font = load_font(font_path);
        if font.is_none() {
            tracing::warn!("no caption font found; drawing boxes without labels");
        }
        Self { font }
    }

    /// Draw every result: a hollow box plus a `name [confidence]` caption
    /// above its top-left corner.
    pub fn draw(&self, canvas: &mut RgbImage, results: &[RecognitionResult]) {
        for result in results {
            self.draw_box(canvas, &result.rect);
            if let Some(font) = &self.font {
                let caption = format!("{} [{:.2}]", result.name, result.confidence);
                let x = (result.rect.x - CAPTION_OFFSET).max(0);
                let y = (result.rect.y - CAPTION_OFFSET).max(0);
                draw_text_mut(
                    canvas,
                    BOX_COLOR,
                    x,
                    y,
                    PxScale::from(CAPTION_SCALE),
                    font,
                    &caption,
                );
            }
        }
    }

    /// Draw detection-only rectangles, no captions — used by the live
    /// preview before the model has trained.
    pub fn draw_rects(&self, canvas: &mut RgbImage, rects: &[FaceRect]) {
        for rect in rects {
            self.draw_box(canvas, rect);
        }
    }

    fn draw_box(&self, canvas: &mut RgbImage, rect: &FaceRect) {
        if rect.width <= 0 || rect.height <= 0 {
            return;
        }
        draw_hollow_rect_mut(
            canvas,
            Rect::at(rect.x, rect.y).of_size(rect.width as u32, rect.height as u32),
            BOX_COLOR,
        );
    }
}

fn load_font(explicit: Option<&Path>) -> Option<FontVec> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(path) = explicit {
        candidates.push(path.to_path_buf());
    }
    candidates.extend(FALLBACK_FONTS.iter().map(PathBuf::from));

    for path in candidates {
        let Ok(bytes) = std::fs::read(&path) else {
            continue;
        };
        match FontVec::try_from_vec(bytes) {
            Ok(font) => {
                tracing::debug!(path = %path.display(), "caption font loaded");
                return Some(font);
            }
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "unusable caption font"),
        }
    }
    None
}
