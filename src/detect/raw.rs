//! Raw model output ingestion.
//!
//! Detection backends emit fixed-arity numeric rows: two corner points, a
//! confidence score, and a class id. `RawDetection` validates that shape once
//! at the boundary so the rest of the pipeline never touches positional
//! slices.

use crate::error::PipelineError;

/// Number of values in one raw detection row: x1, y1, x2, y2, confidence,
/// class id.
pub const RAW_DETECTION_ARITY: usize = 6;

/// One raw detection row as produced by the detection capability.
///
/// Corner coordinates are in frame pixels and may fall outside the frame;
/// normalization clamps them. The class id is carried as a float because
/// model output tensors are float-typed; it is cast during normalization.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawDetection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    pub class_id: f32,
}

impl RawDetection {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, confidence: f32, class_id: f32) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            confidence,
            class_id,
        }
    }

    /// Validate arity and numeric content of one raw output row.
    pub fn from_row(row: &[f32]) -> Result<Self, PipelineError> {
        if row.len() != RAW_DETECTION_ARITY {
            return Err(PipelineError::InvalidDetectionFormat(format!(
                "expected {} values, got {}",
                RAW_DETECTION_ARITY,
                row.len()
            )));
        }
        if let Some(value) = row.iter().find(|value| !value.is_finite()) {
            return Err(PipelineError::InvalidDetectionFormat(format!(
                "non-finite value {} in detection row",
                value
            )));
        }
        Ok(Self::new(row[0], row[1], row[2], row[3], row[4], row[5]))
    }
}
