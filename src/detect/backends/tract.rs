#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::{imageops, RgbImage};
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::raw::{RawDetection, RAW_DETECTION_ARITY};

/// Tract-based detection backend for ONNX models.
///
/// Loads a local model artifact and runs per-frame inference. Preprocessing
/// policy: plain RGB letterbox resize to the model input size, no grayscale
/// conversion and no histogram equalization. The output is expected to be a
/// row-per-detection tensor of `[x1, y1, x2, y2, confidence, class_id]` in
/// model-input coordinates; rows below the confidence threshold are dropped
/// and the remaining boxes are mapped back to frame coordinates.
pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>,
    input_width: u32,
    input_height: u32,
    confidence_threshold: f32,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, input_width: u32, input_height: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, input_height as usize, input_width as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            input_width,
            input_height,
            confidence_threshold: 0.5,
        })
    }

    /// Override the default confidence threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    fn letterbox(&self, frame: &RgbImage) -> (RgbImage, f32, u32, u32) {
        let (fw, fh) = frame.dimensions();
        let scale = (self.input_width as f32 / fw as f32)
            .min(self.input_height as f32 / fh as f32);
        let scaled_w = ((fw as f32 * scale) as u32).max(1);
        let scaled_h = ((fh as f32 * scale) as u32).max(1);
        let scaled = imageops::resize(frame, scaled_w, scaled_h, imageops::FilterType::Triangle);

        let pad_x = (self.input_width - scaled_w) / 2;
        let pad_y = (self.input_height - scaled_h) / 2;
        let mut canvas = RgbImage::new(self.input_width, self.input_height);
        imageops::overlay(&mut canvas, &scaled, pad_x as i64, pad_y as i64);
        (canvas, scale, pad_x, pad_y)
    }

    fn build_input(&self, canvas: &RgbImage) -> Tensor {
        let width = self.input_width as usize;
        let height = self.input_height as usize;
        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 3, height, width),
            |(_, channel, y, x)| {
                canvas.get_pixel(x as u32, y as u32).0[channel] as f32 / 255.0
            },
        );
        input.into_tensor()
    }

    fn decode_rows(
        &self,
        outputs: TVec<TValue>,
        scale: f32,
        pad_x: u32,
        pad_y: u32,
    ) -> Result<Vec<RawDetection>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let flat: Vec<f32> = view.iter().cloned().collect();
        if flat.len() % RAW_DETECTION_ARITY != 0 {
            return Err(anyhow!(
                "model output length {} is not a multiple of {}",
                flat.len(),
                RAW_DETECTION_ARITY
            ));
        }

        let mut detections = Vec::new();
        for row in flat.chunks_exact(RAW_DETECTION_ARITY) {
            let confidence = row[4];
            if confidence < self.confidence_threshold {
                continue;
            }
            // Undo the letterbox: remove padding, then unscale.
            let map = |v: f32, pad: u32| (v - pad as f32) / scale;
            let mapped = [
                map(row[0], pad_x),
                map(row[1], pad_y),
                map(row[2], pad_x),
                map(row[3], pad_y),
                confidence,
                row[5],
            ];
            detections.push(RawDetection::from_row(&mapped)?);
        }
        Ok(detections)
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<RawDetection>> {
        let (canvas, scale, pad_x, pad_y) = self.letterbox(frame);
        let input = self.build_input(&canvas);
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.decode_rows(outputs, scale, pad_x, pad_y)
    }
}
