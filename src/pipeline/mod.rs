//! Media pipeline coordinator.
//!
//! Drives one frame at a time through detect, normalize, classify, extract,
//! annotate and aggregate. Three entry points share the per-frame path:
//!
//! - `process_image_file`: one frame, one report.
//! - `open_stream`: a cancellable session over a live source; results are
//!   emitted per frame and the source is released exactly once.
//! - `process_video`: buffers every annotated frame, then writes the output
//!   media and one aggregate report.
//!
//! Per-frame failures are contained: a detector, normalizer or extractor
//! failure degrades that frame (or that detection) and the session keeps
//! going. Only source-level failures end a session.

mod cancel;
mod session;

pub use cancel::CancelToken;
pub use session::SessionState;

use std::path::Path;

use anyhow::Result;
use image::RgbImage;

use crate::annotate::Annotator;
use crate::detect::{normalize, DetectorBackend, ObjectClass};
use crate::error::PipelineError;
use crate::ocr::{extract_plate_text, OcrBackend};
use crate::output::{annotated_image_path, save_annotated_image, VideoSink};
use crate::report::{FrameResult, MediaRef, MediaReport};
use crate::source::FrameSource;
use crate::storage::{MetadataStore, StorageSink};

/// Which kind of output media a report references.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

/// The coordinator. Owns the detection and OCR capabilities plus the
/// annotator; sources, sinks and collaborators are passed per run.
pub struct Pipeline {
    detector: Box<dyn DetectorBackend>,
    ocr: Box<dyn OcrBackend>,
    annotator: Annotator,
}

impl Pipeline {
    pub fn new(
        detector: Box<dyn DetectorBackend>,
        ocr: Box<dyn OcrBackend>,
        annotator: Annotator,
    ) -> Self {
        Self {
            detector,
            ocr,
            annotator,
        }
    }

    /// Run the full per-frame path: detect, normalize, extract plate text,
    /// annotate in place, and collect the reportable detections.
    ///
    /// A plate whose text was already admitted this session is still drawn on
    /// the frame but omitted from the result. Detections that fail
    /// normalization are dropped with a warning; a failing detector or
    /// extractor degrades the frame, never the session.
    pub fn process_frame(
        &mut self,
        frame: &mut RgbImage,
        frame_index: u64,
        session: &mut SessionState,
    ) -> FrameResult {
        let (frame_w, frame_h) = frame.dimensions();
        let raw = match self.detector.detect(frame) {
            Ok(raw) => raw,
            Err(err) => {
                log::warn!(
                    "frame {}: detector {} failed: {:#}",
                    frame_index,
                    self.detector.name(),
                    err
                );
                Vec::new()
            }
        };

        let mut result = FrameResult::new(frame_index);
        for row in &raw {
            let mut detection = match normalize(row, frame_w, frame_h) {
                Ok(detection) => detection,
                Err(err) => {
                    log::warn!("frame {}: dropped detection: {}", frame_index, err);
                    continue;
                }
            };

            if detection.class == ObjectClass::LicensePlate {
                let text = match extract_plate_text(frame, &detection.bbox, self.ocr.as_mut()) {
                    Ok(text) => text,
                    Err(err) => {
                        log::warn!(
                            "frame {}: plate text extraction failed: {:#}",
                            frame_index,
                            err
                        );
                        String::new()
                    }
                };
                // Plates always carry the "License Plate: <text>" label, even
                // when the reading came back empty.
                detection = detection.with_plate_text(text);
            }

            self.annotator.draw(frame, &detection);

            let reportable = detection.class != ObjectClass::LicensePlate
                || detection.recognized_text.is_empty()
                || session.admit(&detection.recognized_text);
            if reportable {
                result.detections.push(detection);
            } else {
                log::debug!(
                    "frame {}: suppressed duplicate plate {}",
                    frame_index,
                    detection.recognized_text
                );
            }
        }
        result
    }

    /// Single-image mode: read, process, save `output_<name>`, publish.
    pub fn process_image_file(
        &mut self,
        input: &Path,
        output_dir: &Path,
        storage: &mut dyn StorageSink,
        metadata: &mut dyn MetadataStore,
    ) -> Result<MediaReport> {
        let mut frame = image::open(input)
            .map_err(|e| {
                PipelineError::Input(format!("failed to read image {}: {}", input.display(), e))
            })?
            .to_rgb8();

        let mut session = SessionState::new();
        let result = self.process_frame(&mut frame, 0, &mut session);

        let output_path = annotated_image_path(output_dir, input)?;
        save_annotated_image(&frame, &output_path)?;

        Ok(publish_report(
            vec![result],
            &output_path,
            MediaKind::Image,
            storage,
            metadata,
        ))
    }

    /// Continuous-stream mode: open the source and hand back a session that
    /// yields one result per frame until exhaustion, error or cancellation.
    pub fn open_stream(
        &mut self,
        mut source: Box<dyn FrameSource>,
        cancel: CancelToken,
    ) -> Result<StreamSession<'_>> {
        if let Err(err) = source.open() {
            return Err(PipelineError::CaptureUnavailable(format!("{:#}", err)).into());
        }
        log::info!("stream session opened ({})", source.stats().origin);
        Ok(StreamSession {
            pipeline: self,
            source,
            cancel,
            session: SessionState::new(),
            frame_index: 0,
            closed: false,
        })
    }

    /// Buffered-video mode: drain the source, then write the annotated frames
    /// to the sink and publish one aggregate report.
    ///
    /// A source that yields no frames is an `EmptyVideo` error; nothing is
    /// written or published in that case. `max_frames` bounds buffering for
    /// pathological inputs.
    pub fn process_video(
        &mut self,
        mut source: Box<dyn FrameSource>,
        max_frames: u64,
        sink: &mut dyn VideoSink,
        storage: &mut dyn StorageSink,
        metadata: &mut dyn MetadataStore,
    ) -> Result<MediaReport> {
        if let Err(err) = source.open() {
            return Err(PipelineError::CaptureUnavailable(format!("{:#}", err)).into());
        }

        let collected = self.collect_video_frames(source.as_mut(), max_frames);
        source.close();
        let (frames, results) = collected?;

        if frames.is_empty() {
            return Err(PipelineError::EmptyVideo.into());
        }

        for frame in &frames {
            sink.write_frame(frame)?;
        }
        let output_path = sink.finalize()?;

        Ok(publish_report(
            results,
            &output_path,
            MediaKind::Video,
            storage,
            metadata,
        ))
    }

    fn collect_video_frames(
        &mut self,
        source: &mut dyn FrameSource,
        max_frames: u64,
    ) -> Result<(Vec<RgbImage>, Vec<FrameResult>)> {
        let mut session = SessionState::new();
        let mut frames = Vec::new();
        let mut results = Vec::new();
        loop {
            let index = frames.len() as u64;
            if index >= max_frames {
                log::warn!("video exceeds {} frames, truncating", max_frames);
                break;
            }
            let Some(mut frame) = source.next_frame()? else {
                break;
            };
            let result = self.process_frame(&mut frame, index, &mut session);
            frames.push(frame);
            results.push(result);
        }
        Ok((frames, results))
    }
}

/// One open continuous-stream session.
///
/// Yields the annotated frame and its result per call. The source is
/// released exactly once, whether the stream is exhausted, errors,
/// is cancelled, or the session is simply dropped.
pub struct StreamSession<'p> {
    pipeline: &'p mut Pipeline,
    source: Box<dyn FrameSource>,
    cancel: CancelToken,
    session: SessionState,
    frame_index: u64,
    closed: bool,
}

impl StreamSession<'_> {
    pub fn next_result(&mut self) -> Result<Option<(RgbImage, FrameResult)>> {
        if self.closed {
            return Ok(None);
        }
        if self.cancel.is_cancelled() {
            log::info!("stream session cancelled after {} frames", self.frame_index);
            self.release();
            return Ok(None);
        }
        match self.source.next_frame() {
            Ok(Some(mut frame)) => {
                let result =
                    self.pipeline
                        .process_frame(&mut frame, self.frame_index, &mut self.session);
                self.frame_index += 1;
                Ok(Some((frame, result)))
            }
            Ok(None) => {
                log::info!("stream exhausted after {} frames", self.frame_index);
                self.release();
                Ok(None)
            }
            Err(err) => {
                self.release();
                Err(err)
            }
        }
    }

    /// Release the underlying source. Safe to call more than once.
    pub fn release(&mut self) {
        if !self.closed {
            self.closed = true;
            self.source.close();
        }
    }

    pub fn frames_processed(&self) -> u64 {
        self.frame_index
    }
}

impl Drop for StreamSession<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

impl Iterator for StreamSession<'_> {
    type Item = Result<(RgbImage, FrameResult)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_result().transpose()
    }
}

/// Publish a finished run: upload the output media, assemble the report and
/// persist it. Collaborator failures are logged, never propagated; a failed
/// upload falls back to the local media path so the report stays usable.
pub fn publish_report(
    frames: Vec<FrameResult>,
    media_path: &Path,
    kind: MediaKind,
    storage: &mut dyn StorageSink,
    metadata: &mut dyn MetadataStore,
) -> MediaReport {
    let url = match storage.upload(media_path) {
        Ok(url) => url,
        Err(err) => {
            let err = PipelineError::StorageUpload(format!("{:#}", err));
            log::error!("{}; report keeps the local media path", err);
            media_path.display().to_string()
        }
    };
    let media_ref = match kind {
        MediaKind::Image => MediaRef::Image(url),
        MediaKind::Video => MediaRef::Video(url),
    };
    let report = MediaReport::new(media_ref, frames);
    if let Err(err) = metadata.persist_report(&report.boundary_record()) {
        let err = PipelineError::MetadataPersist(format!("{:#}", err));
        log::error!("{}; report is still returned to the caller", err);
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{RawDetection, ScriptedBackend};
    use crate::ocr::ScriptedOcr;

    fn raw(x1: f32, y1: f32, x2: f32, y2: f32, class_id: f32) -> RawDetection {
        RawDetection {
            x1,
            y1,
            x2,
            y2,
            confidence: 0.9,
            class_id,
        }
    }

    fn pipeline_with(detector: ScriptedBackend, ocr: impl OcrBackend + 'static) -> Pipeline {
        Pipeline::new(
            Box::new(detector),
            Box::new(ocr),
            Annotator::without_font(),
        )
    }

    #[test]
    fn helmet_detection_skips_ocr() {
        let detector = ScriptedBackend::with_batches(vec![vec![raw(10.0, 10.0, 50.0, 50.0, 0.0)]]);
        let mut pipeline = pipeline_with(detector, ScriptedOcr::fixed("SHOULD NOT APPEAR", 0.9));

        let mut frame = RgbImage::new(640, 480);
        let mut session = SessionState::new();
        let result = pipeline.process_frame(&mut frame, 0, &mut session);

        assert_eq!(result.detections.len(), 1);
        assert_eq!(result.detections[0].label, "Helmet");
        assert_eq!(result.detections[0].recognized_text, "");
    }

    #[test]
    fn plate_with_empty_reading_keeps_labeled_colon() {
        let detector = ScriptedBackend::with_batches(vec![vec![raw(10.0, 10.0, 50.0, 50.0, 1.0)]]);
        let mut pipeline = pipeline_with(detector, ScriptedOcr::new());

        let mut frame = RgbImage::new(640, 480);
        let mut session = SessionState::new();
        let result = pipeline.process_frame(&mut frame, 0, &mut session);

        assert_eq!(result.detections.len(), 1);
        assert_eq!(result.detections[0].label, "License Plate: ");
        assert_eq!(result.detections[0].recognized_text, "");
    }

    #[test]
    fn degenerate_detection_is_dropped_frame_survives() {
        let detector = ScriptedBackend::with_batches(vec![vec![
            raw(50.0, 50.0, 50.0, 80.0, 0.0),
            raw(10.0, 10.0, 40.0, 40.0, 0.0),
        ]]);
        let mut pipeline = pipeline_with(detector, ScriptedOcr::new());

        let mut frame = RgbImage::new(640, 480);
        let mut session = SessionState::new();
        let result = pipeline.process_frame(&mut frame, 0, &mut session);

        assert_eq!(result.detections.len(), 1);
        assert_eq!(result.detections[0].bbox.w, 30);
    }

    #[test]
    fn duplicate_plate_is_annotated_but_not_reported() {
        let plate = vec![raw(100.0, 100.0, 200.0, 140.0, 1.0)];
        let detector = ScriptedBackend::with_batches(vec![plate.clone(), plate]);
        let ocr = ScriptedOcr::fixed("KA01AB1234", 0.9);
        let mut pipeline = pipeline_with(detector, ocr);

        let mut session = SessionState::new();
        let mut frame0 = RgbImage::new(640, 480);
        let first = pipeline.process_frame(&mut frame0, 0, &mut session);
        assert_eq!(first.detections.len(), 1);

        let mut frame1 = RgbImage::new(640, 480);
        let second = pipeline.process_frame(&mut frame1, 1, &mut session);
        assert!(second.detections.is_empty());
        // The duplicate is still drawn on its frame.
        assert_ne!(frame1.as_raw(), RgbImage::new(640, 480).as_raw());
    }
}
