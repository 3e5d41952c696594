//! Validated detection records.

use serde::Serialize;

use crate::detect::class::{plate_label, ObjectClass};

/// Axis-aligned box in frame pixels. Always clamped to frame bounds with
/// positive width and height.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl BoundingBox {
    /// Reconstruct the two corner points. Exact inverse of the corner-to-rect
    /// conversion whenever `w, h > 0`.
    pub fn corners(&self) -> (u32, u32, u32, u32) {
        (self.x, self.y, self.x + self.w, self.y + self.h)
    }
}

/// One recognized object instance. Immutable once built; owned by the
/// `FrameResult` it belongs to.
#[derive(Clone, Debug)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub class: ObjectClass,
    pub confidence: f32,
    pub label: String,
    /// Non-empty only for `ObjectClass::LicensePlate`.
    pub recognized_text: String,
}

impl Detection {
    pub fn new(bbox: BoundingBox, class: ObjectClass, confidence: f32) -> Self {
        Self {
            bbox,
            class,
            confidence,
            label: class.label().to_string(),
            recognized_text: String::new(),
        }
    }

    /// Attach recognized plate text, rewriting the label to the
    /// `"License Plate: <text>"` form.
    pub fn with_plate_text(mut self, text: String) -> Self {
        debug_assert_eq!(self.class, ObjectClass::LicensePlate);
        self.label = plate_label(&text);
        self.recognized_text = text;
        self
    }
}
