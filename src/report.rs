//! Per-frame results and the aggregated media report.
//!
//! The aggregator is pure assembly: ordered `FrameResult`s plus the output
//! media reference become one `MediaReport`, and the report flattens into the
//! boundary record shape exchanged with the storage and metadata
//! collaborators.

use serde::Serialize;

use crate::detect::{BoundingBox, Detection};

/// Detections reported for one processed frame. `frame_index` is strictly
/// increasing within a session.
#[derive(Clone, Debug, Default)]
pub struct FrameResult {
    pub frame_index: u64,
    pub detections: Vec<Detection>,
}

impl FrameResult {
    pub fn new(frame_index: u64) -> Self {
        Self {
            frame_index,
            detections: Vec::new(),
        }
    }
}

/// Reference to the produced output media.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MediaRef {
    Image(String),
    Video(String),
}

impl MediaRef {
    pub fn url(&self) -> &str {
        match self {
            MediaRef::Image(url) | MediaRef::Video(url) => url,
        }
    }
}

/// Aggregate output of one session: ordered frame results plus the output
/// media reference. Assembled once at pipeline completion.
#[derive(Clone, Debug)]
pub struct MediaReport {
    pub media_ref: MediaRef,
    pub frames: Vec<FrameResult>,
}

impl MediaReport {
    pub fn new(media_ref: MediaRef, frames: Vec<FrameResult>) -> Self {
        Self { media_ref, frames }
    }

    /// Flatten into the boundary record handed to collaborators.
    pub fn boundary_record(&self) -> BoundaryReport {
        let detections = self
            .frames
            .iter()
            .flat_map(|frame| frame.detections.iter())
            .map(DetectionRecord::from_detection)
            .collect();
        let (image_url, video_url) = match &self.media_ref {
            MediaRef::Image(url) => (Some(url.clone()), None),
            MediaRef::Video(url) => (None, Some(url.clone())),
        };
        BoundaryReport {
            image_url,
            video_url,
            detections,
        }
    }
}

/// One detection in the boundary JSON shape.
#[derive(Clone, Debug, Serialize)]
pub struct DetectionRecord {
    pub rect: BoundingBox,
    pub label: String,
    pub license_text: String,
}

impl DetectionRecord {
    pub fn from_detection(detection: &Detection) -> Self {
        Self {
            rect: detection.bbox,
            label: detection.label.clone(),
            license_text: detection.recognized_text.clone(),
        }
    }
}

/// Boundary report record: `{"image_url"|"video_url", "detections": [...]}`.
#[derive(Clone, Debug, Serialize)]
pub struct BoundaryReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    pub detections: Vec<DetectionRecord>,
}
