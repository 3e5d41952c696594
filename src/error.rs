//! Typed pipeline errors.
//!
//! Per-frame failures (`InvalidDetectionFormat`, `DegenerateBox`,
//! `OutOfBoundsCrop`) are isolated by the coordinator: the frame ships with
//! whatever detections survived and the pipeline moves on. Session-level
//! failures (`Input`, `CaptureUnavailable`, `EmptyVideo`) surface to the
//! caller before or instead of producing output media. Collaborator failures
//! (`StorageUpload`, `MetadataPersist`) are logged and never propagated.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input media missing or unreadable. Raised before any pipeline work.
    #[error("input media unreadable: {0}")]
    Input(String),

    /// Capture device/source could not open. No retry.
    #[error("capture source unavailable: {0}")]
    CaptureUnavailable(String),

    /// Raw detection vector has the wrong arity or non-numeric entries.
    #[error("invalid raw detection: {0}")]
    InvalidDetectionFormat(String),

    /// Corner points define a box with non-positive width or height, or a
    /// box with no overlap with the frame.
    #[error("degenerate bounding box ({w}x{h})")]
    DegenerateBox { w: i64, h: i64 },

    /// License-plate crop region is empty after clamping to frame bounds.
    #[error("crop region is empty after clamping to frame bounds")]
    OutOfBoundsCrop,

    /// Buffered video source was exhausted before yielding a single frame.
    #[error("video source produced no frames")]
    EmptyVideo,

    /// Storage collaborator rejected the output media upload.
    #[error("storage upload failed: {0}")]
    StorageUpload(String),

    /// Metadata collaborator rejected the report record.
    #[error("metadata persist failed: {0}")]
    MetadataPersist(String),
}

impl PipelineError {
    /// True for failures the coordinator isolates to a single frame.
    pub fn is_frame_local(&self) -> bool {
        matches!(
            self,
            PipelineError::InvalidDetectionFormat(_)
                | PipelineError::DegenerateBox { .. }
                | PipelineError::OutOfBoundsCrop
        )
    }
}
