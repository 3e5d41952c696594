use std::collections::VecDeque;

use anyhow::Result;
use image::RgbImage;

use crate::ocr::{OcrBackend, OcrCandidate};

/// Scripted OCR backend for testing and `stub` runs.
///
/// Replays a queue of candidate sets, one set per `recognize` call, then
/// returns empty results. `calls` counts invocations so tests can assert that
/// non-plate detections never reach OCR.
pub struct ScriptedOcr {
    results: VecDeque<Vec<OcrCandidate>>,
    pub calls: u64,
}

impl ScriptedOcr {
    pub fn new() -> Self {
        Self {
            results: VecDeque::new(),
            calls: 0,
        }
    }

    pub fn with_results<I>(results: I) -> Self
    where
        I: IntoIterator<Item = Vec<OcrCandidate>>,
    {
        Self {
            results: results.into_iter().collect(),
            calls: 0,
        }
    }

    /// Backend that answers every call with the same single candidate.
    pub fn fixed(text: &str, confidence: f32) -> FixedOcr {
        FixedOcr {
            candidate: OcrCandidate::new(text, confidence),
            calls: 0,
        }
    }
}

impl Default for ScriptedOcr {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrBackend for ScriptedOcr {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn recognize(&mut self, _region: &RgbImage) -> Result<Vec<OcrCandidate>> {
        self.calls += 1;
        Ok(self.results.pop_front().unwrap_or_default())
    }
}

/// OCR stub that always reads the same text.
pub struct FixedOcr {
    candidate: OcrCandidate,
    pub calls: u64,
}

impl OcrBackend for FixedOcr {
    fn name(&self) -> &'static str {
        "stub-fixed"
    }

    fn recognize(&mut self, _region: &RgbImage) -> Result<Vec<OcrCandidate>> {
        self.calls += 1;
        Ok(vec![self.candidate.clone()])
    }
}
