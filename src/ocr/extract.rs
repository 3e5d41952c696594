//! License-plate text extraction.
//!
//! Crops the plate region out of the frame, hands the crop to the OCR
//! capability, and merges the returned fragments into one reading. A box that
//! only partially overlaps the frame is clamped, never rejected; the only
//! failure is a crop that is empty after clamping.

use anyhow::Result;
use image::{imageops, RgbImage};

use crate::detect::BoundingBox;
use crate::error::PipelineError;
use crate::ocr::OcrBackend;

/// Clamp a box to the frame. Returns `None` when nothing of the box remains.
pub fn clamp_crop(bbox: &BoundingBox, frame_w: u32, frame_h: u32) -> Option<BoundingBox> {
    if bbox.x >= frame_w || bbox.y >= frame_h {
        return None;
    }
    let w = bbox.w.min(frame_w - bbox.x);
    let h = bbox.h.min(frame_h - bbox.y);
    if w == 0 || h == 0 {
        return None;
    }
    Some(BoundingBox {
        x: bbox.x,
        y: bbox.y,
        w,
        h,
    })
}

/// Extract the text reading for a license-plate detection.
///
/// Recognized fragments are concatenated in the order the engine returned
/// them, separated by single spaces, with surrounding whitespace trimmed. An
/// empty OCR result yields an empty string, which is not an error.
pub fn extract_plate_text(
    frame: &RgbImage,
    bbox: &BoundingBox,
    ocr: &mut dyn OcrBackend,
) -> Result<String> {
    let (frame_w, frame_h) = frame.dimensions();
    let region = clamp_crop(bbox, frame_w, frame_h).ok_or(PipelineError::OutOfBoundsCrop)?;

    let crop = imageops::crop_imm(frame, region.x, region.y, region.w, region.h).to_image();
    let candidates = ocr.recognize(&crop)?;

    let mut text = String::new();
    for candidate in &candidates {
        let fragment = candidate.text.trim();
        if fragment.is_empty() {
            continue;
        }
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(fragment);
    }
    Ok(text)
}
