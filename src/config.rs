use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::source::CameraConfig;

const DEFAULT_DB_PATH: &str = "roadwatch.db";
const DEFAULT_DETECTOR_BACKEND: &str = "stub";
const DEFAULT_MODEL_PATH: &str = "models/helmet_plate.onnx";
const DEFAULT_INPUT_WIDTH: u32 = 640;
const DEFAULT_INPUT_HEIGHT: u32 = 640;
const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;
const DEFAULT_OCR_BACKEND: &str = "stub";
const DEFAULT_CAMERA_URL: &str = "stub://camera";
const DEFAULT_CAMERA_FPS: u32 = 10;
const DEFAULT_CAMERA_WIDTH: u32 = 640;
const DEFAULT_CAMERA_HEIGHT: u32 = 480;
const DEFAULT_MAX_VIDEO_FRAMES: u64 = 10_000;
const DEFAULT_OUTPUT_DIR: &str = "out";
const DEFAULT_STORAGE_ROOT: &str = "storage";

#[derive(Debug, Deserialize, Default)]
struct RoadwatchConfigFile {
    db_path: Option<String>,
    detector: Option<DetectorConfigFile>,
    ocr: Option<OcrConfigFile>,
    camera: Option<CameraConfigFile>,
    video: Option<VideoConfigFile>,
    output: Option<OutputConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    model_path: Option<PathBuf>,
    input_width: Option<u32>,
    input_height: Option<u32>,
    confidence_threshold: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct OcrConfigFile {
    backend: Option<String>,
    model_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    url: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct VideoConfigFile {
    max_frames: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct OutputConfigFile {
    dir: Option<PathBuf>,
    storage_root: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct RoadwatchConfig {
    pub db_path: String,
    pub detector: DetectorSettings,
    pub ocr: OcrSettings,
    pub camera: CameraConfig,
    pub video: VideoSettings,
    pub output: OutputSettings,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub backend: String,
    pub model_path: PathBuf,
    pub input_width: u32,
    pub input_height: u32,
    pub confidence_threshold: f32,
}

#[derive(Debug, Clone)]
pub struct OcrSettings {
    pub backend: String,
    pub model_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct VideoSettings {
    pub max_frames: u64,
}

#[derive(Debug, Clone)]
pub struct OutputSettings {
    pub dir: PathBuf,
    pub storage_root: PathBuf,
}

impl RoadwatchConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("ROADWATCH_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: RoadwatchConfigFile) -> Self {
        let db_path = file.db_path.unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
        let detector = DetectorSettings {
            backend: file
                .detector
                .as_ref()
                .and_then(|detector| detector.backend.clone())
                .unwrap_or_else(|| DEFAULT_DETECTOR_BACKEND.to_string()),
            model_path: file
                .detector
                .as_ref()
                .and_then(|detector| detector.model_path.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
            input_width: file
                .detector
                .as_ref()
                .and_then(|detector| detector.input_width)
                .unwrap_or(DEFAULT_INPUT_WIDTH),
            input_height: file
                .detector
                .as_ref()
                .and_then(|detector| detector.input_height)
                .unwrap_or(DEFAULT_INPUT_HEIGHT),
            confidence_threshold: file
                .detector
                .as_ref()
                .and_then(|detector| detector.confidence_threshold)
                .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
        };
        let ocr = OcrSettings {
            backend: file
                .ocr
                .as_ref()
                .and_then(|ocr| ocr.backend.clone())
                .unwrap_or_else(|| DEFAULT_OCR_BACKEND.to_string()),
            model_dir: file.ocr.and_then(|ocr| ocr.model_dir),
        };
        let camera = CameraConfig {
            url: file
                .camera
                .as_ref()
                .and_then(|camera| camera.url.clone())
                .unwrap_or_else(|| DEFAULT_CAMERA_URL.to_string()),
            target_fps: file
                .camera
                .as_ref()
                .and_then(|camera| camera.target_fps)
                .unwrap_or(DEFAULT_CAMERA_FPS),
            width: file
                .camera
                .as_ref()
                .and_then(|camera| camera.width)
                .unwrap_or(DEFAULT_CAMERA_WIDTH),
            height: file
                .camera
                .as_ref()
                .and_then(|camera| camera.height)
                .unwrap_or(DEFAULT_CAMERA_HEIGHT),
        };
        let video = VideoSettings {
            max_frames: file
                .video
                .and_then(|video| video.max_frames)
                .unwrap_or(DEFAULT_MAX_VIDEO_FRAMES),
        };
        let output = OutputSettings {
            dir: file
                .output
                .as_ref()
                .and_then(|output| output.dir.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            storage_root: file
                .output
                .and_then(|output| output.storage_root)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_ROOT)),
        };
        Self {
            db_path,
            detector,
            ocr,
            camera,
            video,
            output,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var("ROADWATCH_DB_PATH") {
            if !path.trim().is_empty() {
                self.db_path = path;
            }
        }
        if let Ok(backend) = std::env::var("ROADWATCH_DETECTOR_BACKEND") {
            if !backend.trim().is_empty() {
                self.detector.backend = backend;
            }
        }
        if let Ok(path) = std::env::var("ROADWATCH_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.detector.model_path = PathBuf::from(path);
            }
        }
        if let Ok(threshold) = std::env::var("ROADWATCH_CONFIDENCE_THRESHOLD") {
            let parsed: f32 = threshold.parse().map_err(|_| {
                anyhow!("ROADWATCH_CONFIDENCE_THRESHOLD must be a number between 0 and 1")
            })?;
            self.detector.confidence_threshold = parsed;
        }
        if let Ok(backend) = std::env::var("ROADWATCH_OCR_BACKEND") {
            if !backend.trim().is_empty() {
                self.ocr.backend = backend;
            }
        }
        if let Ok(url) = std::env::var("ROADWATCH_CAMERA_URL") {
            if !url.trim().is_empty() {
                self.camera.url = url;
            }
        }
        if let Ok(max_frames) = std::env::var("ROADWATCH_MAX_VIDEO_FRAMES") {
            let parsed: u64 = max_frames
                .parse()
                .map_err(|_| anyhow!("ROADWATCH_MAX_VIDEO_FRAMES must be an integer"))?;
            self.video.max_frames = parsed;
        }
        if let Ok(dir) = std::env::var("ROADWATCH_OUTPUT_DIR") {
            if !dir.trim().is_empty() {
                self.output.dir = PathBuf::from(dir);
            }
        }
        if let Ok(root) = std::env::var("ROADWATCH_STORAGE_ROOT") {
            if !root.trim().is_empty() {
                self.output.storage_root = PathBuf::from(root);
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.detector.confidence_threshold) {
            return Err(anyhow!("confidence threshold must be between 0 and 1"));
        }
        if self.detector.input_width == 0 || self.detector.input_height == 0 {
            return Err(anyhow!("detector input dimensions must be greater than zero"));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("camera dimensions must be greater than zero"));
        }
        if self.video.max_frames == 0 {
            return Err(anyhow!("video max_frames must be greater than zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<RoadwatchConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
