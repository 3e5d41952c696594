#![cfg(feature = "ocr-ocrs")]

use std::path::Path;

use anyhow::{bail, Context, Result};
use image::RgbImage;
use ocrs::{ImageSource, OcrEngine, OcrEngineParams};
use rten::Model;

use crate::ocr::{OcrBackend, OcrCandidate};

// get_text does not expose per-fragment confidence, so readings carry a
// fixed nominal score.
const NOMINAL_CONFIDENCE: f32 = 0.9;

/// OCR backend built on the `ocrs` engine.
///
/// Loads the text detection and recognition models from the standard ocrs
/// cache directory (`~/.cache/ocrs`).
pub struct OcrsBackend {
    engine: OcrEngine,
}

impl OcrsBackend {
    /// Load models from the standard cache location.
    pub fn new() -> Result<Self> {
        let home_dir = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .context("cannot resolve home directory for ocrs model cache")?;
        let cache_dir = Path::new(&home_dir).join(".cache/ocrs");
        Self::with_model_dir(&cache_dir)
    }

    /// Load models from an explicit directory.
    pub fn with_model_dir(dir: &Path) -> Result<Self> {
        let detection_model_path = dir.join("text-detection.rten");
        let recognition_model_path = dir.join("text-recognition.rten");

        if !detection_model_path.exists() || !recognition_model_path.exists() {
            bail!(
                "OCR models not found. Expected:\n  - {}\n  - {}",
                detection_model_path.display(),
                recognition_model_path.display()
            );
        }

        let detection_model = Model::load_file(&detection_model_path)?;
        let recognition_model = Model::load_file(&recognition_model_path)?;

        let engine = OcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })?;

        Ok(Self { engine })
    }
}

impl OcrBackend for OcrsBackend {
    fn name(&self) -> &'static str {
        "ocrs"
    }

    fn recognize(&mut self, region: &RgbImage) -> Result<Vec<OcrCandidate>> {
        let source = ImageSource::from_bytes(region.as_raw(), region.dimensions())
            .context("prepare OCR image source")?;
        let input = self
            .engine
            .prepare_input(source)
            .context("prepare OCR input")?;
        let text = self.engine.get_text(&input).context("run OCR")?;

        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![OcrCandidate::new(text, NOMINAL_CONFIDENCE)])
    }
}
