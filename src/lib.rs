//! Roadwatch
//!
//! Helmet and license-plate monitoring pipeline for road-safety cameras.
//!
//! # Architecture
//!
//! Media flows through one per-frame path regardless of where it came from:
//!
//! 1. A detection capability returns raw six-value rows per frame.
//! 2. The normalizer converts each row into a validated rectangle.
//! 3. The classifier maps the class id to Helmet, License Plate or No Helmet.
//! 4. Plate regions are cropped and handed to an OCR capability.
//! 5. The annotator draws boxes and labels onto the frame in place.
//! 6. The aggregator assembles frame results into one media report, which is
//!    uploaded and persisted by the storage collaborators.
//!
//! The coordinator in `pipeline` runs this path in three modes: single image,
//! cancellable continuous stream, and buffered video. Per-frame failures
//! degrade that frame only; collaborator failures at publish time are logged
//! and never abort a run.
//!
//! # Module Structure
//!
//! - `detect`: raw detections, normalization, region classes, backends
//! - `ocr`: plate text extraction and OCR backends
//! - `annotate`: box and label drawing
//! - `source`: frame sources (camera streams, video files, stubs)
//! - `output`: annotated image saving and video sinks
//! - `report`: frame results and the boundary report record
//! - `storage`: upload and metadata persistence collaborators
//! - `pipeline`: the mode coordinator

pub mod annotate;
pub mod config;
pub mod detect;
pub mod error;
pub mod ocr;
pub mod output;
pub mod pipeline;
pub mod report;
pub mod source;
pub mod storage;

pub use annotate::Annotator;
#[cfg(feature = "backend-tract")]
pub use detect::TractBackend;
pub use detect::{
    normalize, plate_label, BoundingBox, Detection, DetectorBackend, ObjectClass, RawDetection,
    ScriptedBackend,
};
pub use error::PipelineError;
#[cfg(feature = "ocr-ocrs")]
pub use ocr::OcrsBackend;
pub use ocr::{extract_plate_text, FixedOcr, OcrBackend, OcrCandidate, ScriptedOcr};
pub use output::{save_annotated_image, FrameSequenceSink, VideoSink};
pub use pipeline::{CancelToken, MediaKind, Pipeline, SessionState, StreamSession};
pub use report::{BoundaryReport, DetectionRecord, FrameResult, MediaRef, MediaReport};
pub use source::{
    CameraConfig, CameraSource, FrameSource, ScriptedSource, SourceStats, VideoConfig,
    VideoFileSource,
};
pub use storage::{
    InMemoryMetadataStore, LocalStorageSink, MetadataStore, SqliteMetadataStore, StorageSink,
};
