//! Text-recognition capability.
//!
//! OCR is an opaque external engine behind a narrow contract: cropped RGB
//! region in, unordered `(text, confidence)` candidates out. The extractor in
//! this module owns the only pipeline logic around it: clamped cropping and
//! fragment merging.

mod extract;
#[cfg(feature = "ocr-ocrs")]
mod ocrs_engine;
mod stub;

pub use extract::{clamp_crop, extract_plate_text};
#[cfg(feature = "ocr-ocrs")]
pub use ocrs_engine::OcrsBackend;
pub use stub::{FixedOcr, ScriptedOcr};

use anyhow::Result;
use image::RgbImage;

/// One text fragment candidate from the OCR engine.
#[derive(Clone, Debug, PartialEq)]
pub struct OcrCandidate {
    pub text: String,
    pub confidence: f32,
}

impl OcrCandidate {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// OCR capability. Synchronous and blocking on the pipeline's critical path;
/// the deliberate latency trade-off keeps per-frame sequencing strict.
pub trait OcrBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Recognize text in a cropped region. The candidate order is whatever
    /// the engine returns; callers must not assume any ordering.
    fn recognize(&mut self, region: &RgbImage) -> Result<Vec<OcrCandidate>>;
}
