//! roadwatchd - helmet and license-plate monitoring daemon
//!
//! Runs the detection pipeline in one of three modes:
//! 1. `image`: annotate one image, publish and print its report
//! 2. `stream`: process a live camera stream until interrupted, printing
//!    per-frame detections as JSON lines
//! 3. `video`: buffer a whole clip, write the annotated output media,
//!    publish and print the aggregate report

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};

use roadwatch::config::{DetectorSettings, OcrSettings, RoadwatchConfig};
use roadwatch::{
    Annotator, CameraSource, CancelToken, DetectionRecord, DetectorBackend, FrameSequenceSink,
    LocalStorageSink, OcrBackend, Pipeline, ScriptedBackend, ScriptedOcr, SqliteMetadataStore,
    VideoConfig, VideoFileSource,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Process one image file.
    Image {
        /// Input image path.
        input: PathBuf,
    },
    /// Process a live camera stream until interrupted.
    Stream {
        /// Stream URL override (e.g. rtsp://host/stream or stub://camera).
        #[arg(long)]
        url: Option<String>,
    },
    /// Process a video clip (file, frame directory, or stub://N).
    Video {
        /// Input video path.
        input: String,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let cfg = RoadwatchConfig::load()?;

    let mut detector = build_detector(&cfg.detector)?;
    detector.warm_up()?;
    let ocr = build_ocr(&cfg.ocr)?;
    let mut pipeline = Pipeline::new(detector, ocr, Annotator::new());

    let mut storage = LocalStorageSink::new(&cfg.output.storage_root)?;
    let mut metadata = SqliteMetadataStore::open(&cfg.db_path)?;

    match args.mode {
        Mode::Image { input } => {
            let report = pipeline.process_image_file(
                &input,
                &cfg.output.dir,
                &mut storage,
                &mut metadata,
            )?;
            println!("{}", serde_json::to_string_pretty(&report.boundary_record())?);
        }
        Mode::Stream { url } => {
            let mut camera_cfg = cfg.camera.clone();
            if let Some(url) = url {
                camera_cfg.url = url;
            }

            let cancel = CancelToken::new();
            let handler_token = cancel.clone();
            ctrlc::set_handler(move || {
                log::info!("interrupt received, finishing current frame");
                handler_token.cancel();
            })?;

            let source = CameraSource::new(camera_cfg)?;
            let mut session = pipeline.open_stream(Box::new(source), cancel)?;
            while let Some((_, result)) = session.next_result()? {
                if result.detections.is_empty() {
                    continue;
                }
                let records: Vec<DetectionRecord> = result
                    .detections
                    .iter()
                    .map(DetectionRecord::from_detection)
                    .collect();
                let line = serde_json::json!({
                    "frame": result.frame_index,
                    "detections": records,
                });
                println!("{}", serde_json::to_string(&line)?);
            }
            log::info!("stream ended after {} frames", session.frames_processed());
        }
        Mode::Video { input } => {
            let source = VideoFileSource::new(VideoConfig {
                path: input.clone(),
                ..VideoConfig::default()
            })?;
            let mut sink = FrameSequenceSink::new(clip_output_dir(&cfg.output.dir, &input))?;
            let report = pipeline.process_video(
                Box::new(source),
                cfg.video.max_frames,
                &mut sink,
                &mut storage,
                &mut metadata,
            )?;
            println!("{}", serde_json::to_string_pretty(&report.boundary_record())?);
        }
    }
    Ok(())
}

fn clip_output_dir(out_dir: &Path, input: &str) -> PathBuf {
    let stem = Path::new(input)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("clip");
    out_dir.join(format!("output_{}", stem))
}

fn build_detector(settings: &DetectorSettings) -> Result<Box<dyn DetectorBackend>> {
    match settings.backend.as_str() {
        "stub" => Ok(Box::new(ScriptedBackend::new())),
        "tract" => {
            #[cfg(feature = "backend-tract")]
            {
                let backend = roadwatch::TractBackend::new(
                    &settings.model_path,
                    settings.input_width,
                    settings.input_height,
                )?
                .with_threshold(settings.confidence_threshold);
                Ok(Box::new(backend))
            }
            #[cfg(not(feature = "backend-tract"))]
            {
                Err(anyhow!(
                    "detector backend 'tract' requires the backend-tract feature"
                ))
            }
        }
        other => Err(anyhow!("unknown detector backend '{}'", other)),
    }
}

fn build_ocr(settings: &OcrSettings) -> Result<Box<dyn OcrBackend>> {
    match settings.backend.as_str() {
        "stub" => Ok(Box::new(ScriptedOcr::new())),
        "ocrs" => {
            #[cfg(feature = "ocr-ocrs")]
            {
                let backend = match &settings.model_dir {
                    Some(dir) => roadwatch::OcrsBackend::with_model_dir(dir)?,
                    None => roadwatch::OcrsBackend::new()?,
                };
                Ok(Box::new(backend))
            }
            #[cfg(not(feature = "ocr-ocrs"))]
            {
                Err(anyhow!("ocr backend 'ocrs' requires the ocr-ocrs feature"))
            }
        }
        other => Err(anyhow!("unknown ocr backend '{}'", other)),
    }
}
