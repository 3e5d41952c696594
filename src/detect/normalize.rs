//! Raw detection normalization.
//!
//! Converts the two-corner raw form into a clamped `{x, y, w, h}` box and
//! casts the class id. Degenerate boxes (non-positive width/height from the
//! corners, or no overlap with the frame) are rejected; the coordinator drops
//! the offending detection and keeps the frame.

use crate::detect::class::ObjectClass;
use crate::detect::raw::RawDetection;
use crate::detect::result::{BoundingBox, Detection};
use crate::error::PipelineError;

/// Normalize one raw detection against a frame of `frame_w` x `frame_h`.
pub fn normalize(
    raw: &RawDetection,
    frame_w: u32,
    frame_h: u32,
) -> Result<Detection, PipelineError> {
    let x1 = raw.x1 as i64;
    let y1 = raw.y1 as i64;
    let x2 = raw.x2 as i64;
    let y2 = raw.y2 as i64;

    let w = x2 - x1;
    let h = y2 - y1;
    if w <= 0 || h <= 0 {
        return Err(PipelineError::DegenerateBox { w, h });
    }

    // Intersect with the frame rectangle.
    let cx1 = x1.clamp(0, frame_w as i64);
    let cy1 = y1.clamp(0, frame_h as i64);
    let cx2 = x2.clamp(0, frame_w as i64);
    let cy2 = y2.clamp(0, frame_h as i64);
    let cw = cx2 - cx1;
    let ch = cy2 - cy1;
    if cw <= 0 || ch <= 0 {
        return Err(PipelineError::DegenerateBox { w: cw, h: ch });
    }

    let bbox = BoundingBox {
        x: cx1 as u32,
        y: cy1 as u32,
        w: cw as u32,
        h: ch as u32,
    };
    let class = ObjectClass::from_class_id(raw.class_id as i64);
    Ok(Detection::new(bbox, class, raw.confidence))
}
