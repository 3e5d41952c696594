use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use image::RgbImage;

use roadwatch::{
    Annotator, BoundaryReport, CancelToken, DetectorBackend, FrameSequenceSink, FrameSource,
    InMemoryMetadataStore, MetadataStore, OcrBackend, OcrCandidate, Pipeline, PipelineError,
    RawDetection, ScriptedBackend, ScriptedOcr, ScriptedSource, SessionState, SourceStats,
    StorageSink,
};

fn raw(x1: f32, y1: f32, x2: f32, y2: f32, class_id: f32) -> RawDetection {
    RawDetection::new(x1, y1, x2, y2, 0.9, class_id)
}

fn frame() -> RgbImage {
    RgbImage::new(640, 480)
}

fn pipeline(detector: ScriptedBackend, ocr: impl OcrBackend + 'static) -> Pipeline {
    Pipeline::new(Box::new(detector), Box::new(ocr), Annotator::without_font())
}

/// Storage sink that records uploads without touching the filesystem.
struct RecordingSink {
    uploads: Vec<String>,
    fail: bool,
}

impl RecordingSink {
    fn new() -> Self {
        Self {
            uploads: Vec::new(),
            fail: false,
        }
    }

    fn failing() -> Self {
        Self {
            uploads: Vec::new(),
            fail: true,
        }
    }
}

impl StorageSink for RecordingSink {
    fn upload(&mut self, media_path: &Path) -> Result<String> {
        if self.fail {
            anyhow::bail!("bucket offline");
        }
        let url = format!("https://storage.test/{}", media_path.display());
        self.uploads.push(url.clone());
        Ok(url)
    }
}

struct FailingStore;

impl MetadataStore for FailingStore {
    fn persist_report(&mut self, _report: &BoundaryReport) -> Result<()> {
        anyhow::bail!("database locked")
    }
}

/// Detector that replays scripted per-frame outcomes, failures included.
struct FlakyDetector {
    outcomes: VecDeque<Result<Vec<RawDetection>>>,
}

impl DetectorBackend for FlakyDetector {
    fn name(&self) -> &'static str {
        "flaky"
    }

    fn detect(&mut self, _frame: &RgbImage) -> Result<Vec<RawDetection>> {
        self.outcomes.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
}

struct FailingOcr;

impl OcrBackend for FailingOcr {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn recognize(&mut self, _region: &RgbImage) -> Result<Vec<OcrCandidate>> {
        anyhow::bail!("ocr engine crashed")
    }
}

/// Source wrapper that counts how many frames were pulled from it.
struct CountingSource {
    inner: ScriptedSource,
    pulls: Arc<AtomicU64>,
}

impl FrameSource for CountingSource {
    fn open(&mut self) -> Result<()> {
        self.inner.open()
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        self.pulls.fetch_add(1, Ordering::SeqCst);
        self.inner.next_frame()
    }

    fn close(&mut self) {
        self.inner.close()
    }

    fn stats(&self) -> SourceStats {
        self.inner.stats()
    }
}

// ----------------------------------------------------------------------------
// Single-image mode
// ----------------------------------------------------------------------------

#[test]
fn image_mode_reports_plate_with_text_and_saves_annotated_copy() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("bike.png");
    frame().save(&input)?;
    let out_dir = dir.path().join("out");

    let detector = ScriptedBackend::with_batches(vec![vec![raw(10.0, 10.0, 50.0, 50.0, 1.0)]]);
    let mut pipeline = pipeline(detector, ScriptedOcr::fixed("ABC123", 0.9));
    let mut storage = RecordingSink::new();
    let mut metadata = InMemoryMetadataStore::new();

    let report = pipeline.process_image_file(&input, &out_dir, &mut storage, &mut metadata)?;
    let record = report.boundary_record();

    assert!(record.image_url.as_deref().unwrap().starts_with("https://storage.test/"));
    assert!(record.video_url.is_none());
    assert_eq!(record.detections.len(), 1);
    assert_eq!(record.detections[0].rect.x, 10);
    assert_eq!(record.detections[0].rect.y, 10);
    assert_eq!(record.detections[0].rect.w, 40);
    assert_eq!(record.detections[0].rect.h, 40);
    assert_eq!(record.detections[0].label, "License Plate: ABC123");
    assert_eq!(record.detections[0].license_text, "ABC123");

    assert!(out_dir.join("output_bike.png").exists());
    assert_eq!(metadata.records.len(), 1);
    assert_eq!(metadata.records[0]["detections"][0]["license_text"], "ABC123");
    Ok(())
}

#[test]
fn image_mode_fails_on_unreadable_input() {
    let detector = ScriptedBackend::new();
    let mut pipeline = pipeline(detector, ScriptedOcr::new());
    let mut storage = RecordingSink::new();
    let mut metadata = InMemoryMetadataStore::new();

    let err = pipeline
        .process_image_file(
            Path::new("/nonexistent/bike.png"),
            Path::new("out"),
            &mut storage,
            &mut metadata,
        )
        .unwrap_err();
    let err = err.downcast::<PipelineError>().expect("pipeline error");
    assert!(matches!(err, PipelineError::Input(_)));
    assert!(storage.uploads.is_empty());
    assert!(metadata.records.is_empty());
}

#[test]
fn collaborator_failures_do_not_abort_an_image_run() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("bike.png");
    frame().save(&input)?;
    let out_dir = dir.path().join("out");

    let detector = ScriptedBackend::with_batches(vec![vec![raw(10.0, 10.0, 50.0, 50.0, 0.0)]]);
    let mut pipeline = pipeline(detector, ScriptedOcr::new());
    let mut storage = RecordingSink::failing();
    let mut metadata = FailingStore;

    let report = pipeline.process_image_file(&input, &out_dir, &mut storage, &mut metadata)?;
    let record = report.boundary_record();

    // Upload failed, so the report falls back to the local output path.
    let url = record.image_url.unwrap();
    assert!(url.ends_with("output_bike.png"));
    assert_eq!(record.detections.len(), 1);
    assert_eq!(record.detections[0].label, "Helmet");
    Ok(())
}

// ----------------------------------------------------------------------------
// OCR scoping
// ----------------------------------------------------------------------------

/// OCR wrapper whose call count survives the move into the pipeline.
struct SharedCountOcr {
    calls: std::sync::Arc<std::sync::atomic::AtomicU64>,
}

impl OcrBackend for SharedCountOcr {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn recognize(&mut self, _region: &RgbImage) -> Result<Vec<OcrCandidate>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![OcrCandidate::new("XYZ789", 0.9)])
    }
}

#[test]
fn only_plate_regions_reach_ocr() {
    let calls = std::sync::Arc::new(std::sync::atomic::AtomicU64::new(0));
    let ocr = SharedCountOcr {
        calls: calls.clone(),
    };
    let detector = ScriptedBackend::with_batches(vec![vec![
        raw(10.0, 10.0, 50.0, 50.0, 0.0),
        raw(60.0, 10.0, 100.0, 50.0, 7.0),
        raw(120.0, 10.0, 200.0, 50.0, 1.0),
    ]]);
    let mut pipeline = pipeline(detector, ocr);

    let mut image = frame();
    let mut session = SessionState::new();
    let result = pipeline.process_frame(&mut image, 0, &mut session);

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.detections.len(), 3);
    assert_eq!(result.detections[0].label, "Helmet");
    assert_eq!(result.detections[1].label, "No Helmet");
    assert_eq!(result.detections[2].label, "License Plate: XYZ789");
}

#[test]
fn ocr_failure_reports_plate_with_empty_reading() {
    let detector = ScriptedBackend::with_batches(vec![vec![raw(10.0, 10.0, 50.0, 50.0, 1.0)]]);
    let mut pipeline = pipeline(detector, FailingOcr);

    let mut image = frame();
    let mut session = SessionState::new();
    let result = pipeline.process_frame(&mut image, 0, &mut session);

    // The extraction failure degrades the reading, not the detection.
    assert_eq!(result.detections.len(), 1);
    assert_eq!(result.detections[0].label, "License Plate: ");
    assert_eq!(result.detections[0].recognized_text, "");
}

// ----------------------------------------------------------------------------
// Per-frame failure isolation
// ----------------------------------------------------------------------------

#[test]
fn detector_failure_degrades_one_frame_only() -> Result<()> {
    let detector = FlakyDetector {
        outcomes: VecDeque::from([
            Err(anyhow::anyhow!("inference device lost")),
            Ok(vec![raw(10.0, 10.0, 50.0, 50.0, 0.0)]),
        ]),
    };
    let mut pipeline = Pipeline::new(
        Box::new(detector),
        Box::new(ScriptedOcr::new()),
        Annotator::without_font(),
    );

    let source = ScriptedSource::new(vec![frame(), frame()]);
    let close_count = source.close_count();
    let mut session = pipeline.open_stream(Box::new(source), CancelToken::new())?;

    // The failing frame ships empty; the session keeps going.
    let (_, first) = session.next_result()?.expect("first frame");
    assert!(first.detections.is_empty());
    let (_, second) = session.next_result()?.expect("second frame");
    assert_eq!(second.detections.len(), 1);
    assert_eq!(second.detections[0].label, "Helmet");

    assert!(session.next_result()?.is_none());
    assert_eq!(close_count.load(Ordering::SeqCst), 1);
    Ok(())
}

// ----------------------------------------------------------------------------
// Buffered-video mode
// ----------------------------------------------------------------------------

#[test]
fn empty_video_is_rejected_before_any_output() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let source = ScriptedSource::new(Vec::new());
    let close_count = source.close_count();

    let detector = ScriptedBackend::new();
    let mut pipeline = pipeline(detector, ScriptedOcr::new());
    let mut sink = FrameSequenceSink::new(dir.path().join("clip"))?;
    let mut storage = RecordingSink::new();
    let mut metadata = InMemoryMetadataStore::new();

    let err = pipeline
        .process_video(Box::new(source), 100, &mut sink, &mut storage, &mut metadata)
        .unwrap_err();
    let err = err.downcast::<PipelineError>().expect("pipeline error");

    assert!(matches!(err, PipelineError::EmptyVideo));
    assert_eq!(sink.frames_written(), 0);
    assert!(storage.uploads.is_empty());
    assert!(metadata.records.is_empty());
    assert_eq!(close_count.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn video_mode_buffers_all_frames_then_publishes_once() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let source = ScriptedSource::new(vec![frame(), frame(), frame()]);
    let close_count = source.close_count();

    let detector = ScriptedBackend::with_batches(vec![
        vec![raw(10.0, 10.0, 50.0, 50.0, 1.0)],
        vec![],
        vec![raw(20.0, 20.0, 60.0, 60.0, 0.0)],
    ]);
    let mut pipeline = pipeline(detector, ScriptedOcr::fixed("KA01AB1234", 0.9));
    let mut sink = FrameSequenceSink::new(dir.path().join("clip"))?;
    let mut storage = RecordingSink::new();
    let mut metadata = InMemoryMetadataStore::new();

    let report =
        pipeline.process_video(Box::new(source), 100, &mut sink, &mut storage, &mut metadata)?;
    let record = report.boundary_record();

    assert_eq!(sink.frames_written(), 3);
    assert_eq!(close_count.load(Ordering::SeqCst), 1);
    assert!(record.video_url.is_some());
    assert!(record.image_url.is_none());
    assert_eq!(record.detections.len(), 2);
    assert_eq!(record.detections[0].license_text, "KA01AB1234");
    assert_eq!(record.detections[1].label, "Helmet");
    assert_eq!(storage.uploads.len(), 1);
    assert_eq!(metadata.records.len(), 1);
    Ok(())
}

#[test]
fn video_mode_dedupes_plates_within_a_run_only() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let plate_batch = || vec![raw(10.0, 10.0, 50.0, 50.0, 1.0)];

    let mut run = |subdir: &str| -> Result<usize> {
        let source = ScriptedSource::new(vec![frame(), frame()]);
        let detector = ScriptedBackend::with_batches(vec![plate_batch(), plate_batch()]);
        let mut pipeline = pipeline(detector, ScriptedOcr::fixed("KA01AB1234", 0.9));
        let mut sink = FrameSequenceSink::new(dir.path().join(subdir))?;
        let mut storage = RecordingSink::new();
        let mut metadata = InMemoryMetadataStore::new();
        let report = pipeline.process_video(
            Box::new(source),
            100,
            &mut sink,
            &mut storage,
            &mut metadata,
        )?;
        Ok(report.boundary_record().detections.len())
    };

    // The same plate in both frames is reported once per run.
    assert_eq!(run("first")?, 1);
    // A fresh run starts with no memory of earlier plates.
    assert_eq!(run("second")?, 1);
    Ok(())
}

#[test]
fn video_mode_truncates_at_the_frame_cap() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let pulls = Arc::new(AtomicU64::new(0));
    let source = CountingSource {
        inner: ScriptedSource::new(vec![frame(), frame(), frame(), frame(), frame()]),
        pulls: pulls.clone(),
    };

    let detector = ScriptedBackend::new();
    let mut pipeline = pipeline(detector, ScriptedOcr::new());
    let mut sink = FrameSequenceSink::new(dir.path().join("clip"))?;
    let mut storage = RecordingSink::new();
    let mut metadata = InMemoryMetadataStore::new();

    let report =
        pipeline.process_video(Box::new(source), 3, &mut sink, &mut storage, &mut metadata)?;

    assert_eq!(report.frames.len(), 3);
    assert_eq!(sink.frames_written(), 3);
    // The cap stops decoding; nothing is pulled past it.
    assert_eq!(pulls.load(Ordering::SeqCst), 3);
    Ok(())
}

#[test]
fn unavailable_video_source_is_a_capture_error() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let source = ScriptedSource::unavailable();

    let detector = ScriptedBackend::new();
    let mut pipeline = pipeline(detector, ScriptedOcr::new());
    let mut sink = FrameSequenceSink::new(dir.path().join("clip"))?;
    let mut storage = RecordingSink::new();
    let mut metadata = InMemoryMetadataStore::new();

    let err = pipeline
        .process_video(Box::new(source), 100, &mut sink, &mut storage, &mut metadata)
        .unwrap_err();
    let err = err.downcast::<PipelineError>().expect("pipeline error");
    assert!(matches!(err, PipelineError::CaptureUnavailable(_)));
    Ok(())
}

// ----------------------------------------------------------------------------
// Continuous-stream mode
// ----------------------------------------------------------------------------

#[test]
fn stream_session_yields_per_frame_results_then_releases_once() -> Result<()> {
    let source = ScriptedSource::new(vec![frame(), frame(), frame()]);
    let close_count = source.close_count();

    let detector = ScriptedBackend::with_batches(vec![
        vec![raw(10.0, 10.0, 50.0, 50.0, 0.0)],
        vec![],
        vec![raw(10.0, 10.0, 50.0, 50.0, 2.0)],
    ]);
    let mut pipeline = pipeline(detector, ScriptedOcr::new());

    let mut session = pipeline.open_stream(Box::new(source), CancelToken::new())?;
    let mut labels = Vec::new();
    while let Some((_, result)) = session.next_result()? {
        labels.extend(result.detections.iter().map(|d| d.label.clone()));
    }

    assert_eq!(labels, vec!["Helmet", "No Helmet"]);
    assert_eq!(session.frames_processed(), 3);
    assert_eq!(close_count.load(Ordering::SeqCst), 1);

    // Exhausted sessions stay exhausted; drop does not release twice.
    assert!(session.next_result()?.is_none());
    drop(session);
    assert_eq!(close_count.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn cancellation_stops_a_stream_between_frames() -> Result<()> {
    let frames: Vec<RgbImage> = (0..100).map(|_| frame()).collect();
    let source = ScriptedSource::new(frames);
    let close_count = source.close_count();

    let detector = ScriptedBackend::new();
    let mut pipeline = pipeline(detector, ScriptedOcr::new());
    let cancel = CancelToken::new();

    let mut session = pipeline.open_stream(Box::new(source), cancel.clone())?;
    assert!(session.next_result()?.is_some());
    assert!(session.next_result()?.is_some());

    cancel.cancel();
    assert!(session.next_result()?.is_none());
    assert_eq!(session.frames_processed(), 2);
    assert_eq!(close_count.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn unavailable_stream_source_is_a_capture_error() {
    let detector = ScriptedBackend::new();
    let mut pipeline = pipeline(detector, ScriptedOcr::new());

    let err = pipeline
        .open_stream(Box::new(ScriptedSource::unavailable()), CancelToken::new())
        .err()
        .expect("open should fail");
    let err = err.downcast::<PipelineError>().expect("pipeline error");
    assert!(matches!(err, PipelineError::CaptureUnavailable(_)));
}

#[test]
fn dropping_a_live_session_releases_the_source() -> Result<()> {
    let source = ScriptedSource::new(vec![frame(), frame()]);
    let close_count = source.close_count();

    let detector = ScriptedBackend::new();
    let mut pipeline = pipeline(detector, ScriptedOcr::new());

    {
        let mut session = pipeline.open_stream(Box::new(source), CancelToken::new())?;
        assert!(session.next_result()?.is_some());
    }
    assert_eq!(close_count.load(Ordering::SeqCst), 1);
    Ok(())
}
