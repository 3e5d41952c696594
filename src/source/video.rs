//! Video file source.
//!
//! `VideoFileSource` feeds the buffered-video mode. Three backends:
//! - `stub://N`: a synthetic clip of N frames (testing, demos)
//! - a directory of numbered image frames, decoded with the `image` crate
//! - full container decode behind the `video-ffmpeg` feature
//!
//! Exhaustion (`Ok(None)`) is the normal end-of-file signal in every backend.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use image::RgbImage;

use crate::source::{synthetic_frame, FrameSource, SourceStats};

const DEFAULT_STUB_FRAMES: u64 = 30;

/// Configuration for a video file source.
#[derive(Clone, Debug)]
pub struct VideoConfig {
    /// Local path (file or frame directory), or "stub://N" for a synthetic
    /// clip of N frames.
    pub path: String,
    /// Frame size for synthetic clips.
    pub width: u32,
    pub height: u32,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            width: 640,
            height: 480,
        }
    }
}

/// Video file frame source.
pub struct VideoFileSource {
    backend: VideoBackend,
}

enum VideoBackend {
    Synthetic(SyntheticVideoSource),
    FrameDir(FrameDirSource),
    #[cfg(feature = "video-ffmpeg")]
    Ffmpeg(ffmpeg_backend::FfmpegVideoSource),
}

impl VideoFileSource {
    pub fn new(config: VideoConfig) -> Result<Self> {
        if config.path.contains("://") && !config.path.starts_with("stub://") {
            return Err(anyhow!(
                "video ingestion only supports local paths (no URL schemes)"
            ));
        }
        if let Some(rest) = config.path.strip_prefix("stub://") {
            let frames = rest.parse::<u64>().unwrap_or(DEFAULT_STUB_FRAMES);
            return Ok(Self {
                backend: VideoBackend::Synthetic(SyntheticVideoSource::new(config, frames)),
            });
        }
        if Path::new(&config.path).is_dir() {
            return Ok(Self {
                backend: VideoBackend::FrameDir(FrameDirSource::new(config)),
            });
        }
        #[cfg(feature = "video-ffmpeg")]
        {
            Ok(Self {
                backend: VideoBackend::Ffmpeg(ffmpeg_backend::FfmpegVideoSource::new(config)?),
            })
        }
        #[cfg(not(feature = "video-ffmpeg"))]
        {
            Err(anyhow!(
                "decoding video containers requires the video-ffmpeg feature \
                 (frame directories and stub:// clips work without it)"
            ))
        }
    }
}

impl FrameSource for VideoFileSource {
    fn open(&mut self) -> Result<()> {
        match &mut self.backend {
            VideoBackend::Synthetic(source) => source.open(),
            VideoBackend::FrameDir(source) => source.open(),
            #[cfg(feature = "video-ffmpeg")]
            VideoBackend::Ffmpeg(source) => source.open(),
        }
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        match &mut self.backend {
            VideoBackend::Synthetic(source) => source.next_frame(),
            VideoBackend::FrameDir(source) => source.next_frame(),
            #[cfg(feature = "video-ffmpeg")]
            VideoBackend::Ffmpeg(source) => source.next_frame(),
        }
    }

    fn close(&mut self) {
        match &mut self.backend {
            VideoBackend::Synthetic(source) => source.close(),
            VideoBackend::FrameDir(source) => source.close(),
            #[cfg(feature = "video-ffmpeg")]
            VideoBackend::Ffmpeg(source) => source.close(),
        }
    }

    fn stats(&self) -> SourceStats {
        match &self.backend {
            VideoBackend::Synthetic(source) => source.stats(),
            VideoBackend::FrameDir(source) => source.stats(),
            #[cfg(feature = "video-ffmpeg")]
            VideoBackend::Ffmpeg(source) => source.stats(),
        }
    }
}

// ----------------------------------------------------------------------------
// Synthetic clip (stub://N) for tests and demos
// ----------------------------------------------------------------------------

struct SyntheticVideoSource {
    config: VideoConfig,
    total_frames: u64,
    frame_count: u64,
}

impl SyntheticVideoSource {
    fn new(config: VideoConfig, total_frames: u64) -> Self {
        Self {
            config,
            total_frames,
            frame_count: 0,
        }
    }

    fn open(&mut self) -> Result<()> {
        log::info!(
            "VideoFileSource: opened {} (synthetic, {} frames)",
            self.config.path,
            self.total_frames
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        if self.frame_count >= self.total_frames {
            return Ok(None);
        }
        self.frame_count += 1;
        Ok(Some(synthetic_frame(
            self.config.width,
            self.config.height,
            self.frame_count,
        )))
    }

    fn close(&mut self) {}

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            origin: self.config.path.clone(),
        }
    }
}

// ----------------------------------------------------------------------------
// Frame directory source
// ----------------------------------------------------------------------------

struct FrameDirSource {
    config: VideoConfig,
    frames: Vec<PathBuf>,
    next_index: usize,
    frame_count: u64,
}

impl FrameDirSource {
    fn new(config: VideoConfig) -> Self {
        Self {
            config,
            frames: Vec::new(),
            next_index: 0,
            frame_count: 0,
        }
    }

    fn open(&mut self) -> Result<()> {
        let dir = Path::new(&self.config.path);
        let mut frames: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("failed to open frame directory {}", dir.display()))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                matches!(
                    path.extension().and_then(|ext| ext.to_str()),
                    Some("jpg") | Some("jpeg") | Some("png")
                )
            })
            .collect();
        frames.sort();
        self.frames = frames;
        log::info!(
            "VideoFileSource: opened {} ({} frame files)",
            dir.display(),
            self.frames.len()
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        while self.next_index < self.frames.len() {
            let path = &self.frames[self.next_index];
            self.next_index += 1;
            match image::open(path) {
                Ok(img) => {
                    self.frame_count += 1;
                    return Ok(Some(img.to_rgb8()));
                }
                Err(e) => {
                    // A broken frame file does not end the clip.
                    log::warn!("skipping unreadable frame {}: {}", path.display(), e);
                }
            }
        }
        Ok(None)
    }

    fn close(&mut self) {}

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            origin: self.config.path.clone(),
        }
    }
}

// ----------------------------------------------------------------------------
// Container decode via FFmpeg
// ----------------------------------------------------------------------------

#[cfg(feature = "video-ffmpeg")]
mod ffmpeg_backend {
    use anyhow::{Context, Result};
    use ffmpeg_next as ffmpeg;
    use image::RgbImage;

    use super::{SourceStats, VideoConfig};

    pub(super) struct FfmpegVideoSource {
        config: VideoConfig,
        input: ffmpeg::format::context::Input,
        stream_index: usize,
        decoder: ffmpeg::codec::decoder::Video,
        scaler: ffmpeg::software::scaling::Context,
        frame_count: u64,
        drained: bool,
    }

    impl FfmpegVideoSource {
        pub(super) fn new(config: VideoConfig) -> Result<Self> {
            ffmpeg::init().context("initialize ffmpeg")?;
            let input = ffmpeg::format::input(&config.path).with_context(|| {
                format!("failed to open video '{}' with ffmpeg", config.path)
            })?;
            let input_stream = input
                .streams()
                .best(ffmpeg::media::Type::Video)
                .ok_or_else(|| anyhow::anyhow!("file has no video track"))?;
            let stream_index = input_stream.index();
            let context =
                ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
                    .context("load video decoder parameters")?;
            let decoder = context
                .decoder()
                .video()
                .context("open ffmpeg video decoder")?;

            let scaler = ffmpeg::software::scaling::context::Context::get(
                decoder.format(),
                decoder.width(),
                decoder.height(),
                ffmpeg::util::format::pixel::Pixel::RGB24,
                decoder.width(),
                decoder.height(),
                ffmpeg::software::scaling::flag::Flags::BILINEAR,
            )
            .context("create ffmpeg scaler")?;

            Ok(Self {
                config,
                input,
                stream_index,
                decoder,
                scaler,
                frame_count: 0,
                drained: false,
            })
        }

        pub(super) fn open(&mut self) -> Result<()> {
            log::info!("VideoFileSource: opened {} (ffmpeg)", self.config.path);
            Ok(())
        }

        pub(super) fn next_frame(&mut self) -> Result<Option<RgbImage>> {
            if self.drained {
                return Ok(None);
            }

            let mut decoded = ffmpeg::frame::Video::empty();
            let mut rgb_frame = ffmpeg::frame::Video::empty();

            for (stream, packet) in self.input.packets() {
                if stream.index() != self.stream_index {
                    continue;
                }

                self.decoder
                    .send_packet(&packet)
                    .context("send packet to ffmpeg decoder")?;

                if self.decoder.receive_frame(&mut decoded).is_ok() {
                    self.scaler
                        .run(&decoded, &mut rgb_frame)
                        .context("scale frame to RGB")?;
                    let (pixels, width, height) = frame_to_pixels(&rgb_frame)?;
                    self.frame_count += 1;
                    return RgbImage::from_raw(width, height, pixels)
                        .map(Some)
                        .ok_or_else(|| {
                            anyhow::anyhow!("decoded frame size does not match dimensions")
                        });
                }
            }

            // End of container: normal exhaustion, not an error.
            self.drained = true;
            Ok(None)
        }

        pub(super) fn close(&mut self) {}

        pub(super) fn stats(&self) -> SourceStats {
            SourceStats {
                frames_captured: self.frame_count,
                origin: self.config.path.clone(),
            }
        }
    }

    fn frame_to_pixels(frame: &ffmpeg::frame::Video) -> Result<(Vec<u8>, u32, u32)> {
        let width = frame.width();
        let height = frame.height();
        let row_bytes = (width as usize) * 3;
        let stride = frame.stride(0);
        let data = frame.data(0);

        if stride == row_bytes {
            return Ok((data.to_vec(), width, height));
        }

        let mut pixels = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height as usize {
            let start = row * stride;
            let end = start + row_bytes;
            pixels.extend_from_slice(
                data.get(start..end)
                    .context("ffmpeg frame row is out of bounds")?,
            );
        }

        Ok((pixels, width, height))
    }
}
