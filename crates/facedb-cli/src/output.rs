//! JSON output contracts for the tools.

use anyhow::{Context, Result};
use facedb_core::types::RecognitionResult;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// One face entry in the recognize-image report. Field names and nesting
/// are a wire contract — do not rename.
#[derive(Serialize)]
pub struct FaceReport<'a> {
    pub prediction: &'a str,
    pub confidence: f64,
    pub position: Position,
    pub size: Size,
}

#[derive(Serialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

#[derive(Serialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

/// Map recognition results to report entries, preserving order.
pub fn face_reports(results: &[RecognitionResult]) -> Vec<FaceReport<'_>> {
    results
        .iter()
        .map(|r| FaceReport {
            prediction: &r.name,
            confidence: r.confidence,
            position: Position {
                x: r.rect.x,
                y: r.rect.y,
            },
            size: Size {
                width: r.rect.width,
                height: r.rect.height,
            },
        })
        .collect()
}

/// Serialize `value` as a single JSON line into a freshly created file.
pub fn write_json(path: &Path, value: &impl Serialize) -> Result<()> {
    let mut file = File::create(path)
        .with_context(|| format!("cannot open the output file {}", path.display()))?;
    serde_json::to_writer(&mut file, value)
        .with_context(|| format!("cannot serialize report to {}", path.display()))?;
    writeln!(file).with_context(|| format!("cannot write to {}", path.display()))?;
    Ok(())
}
