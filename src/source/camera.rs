//! Camera stream source.
//!
//! `CameraSource` feeds the continuous-stream mode. `stub://` URLs produce an
//! unbounded synthetic stream; real RTSP/IP-camera decode sits behind the
//! `stream-gstreamer` feature. The stream never ends on its own for live
//! cameras, so cancellation is handled by the session loop, not here.

use anyhow::Result;
#[cfg(feature = "stream-gstreamer")]
use anyhow::Context;
use image::RgbImage;

use crate::source::{synthetic_frame, FrameSource, SourceStats};

/// Configuration for a camera source.
#[derive(Clone, Debug)]
pub struct CameraConfig {
    /// Stream URL (e.g., "rtsp://192.168.1.100:554/stream" or "stub://front").
    pub url: String,
    /// Target frame rate (frames per second).
    pub target_fps: u32,
    /// Frame width for synthetic streams.
    pub width: u32,
    /// Frame height for synthetic streams.
    pub height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            url: "stub://camera".to_string(),
            target_fps: 10,
            width: 640,
            height: 480,
        }
    }
}

/// Camera frame source.
pub struct CameraSource {
    backend: CameraBackend,
}

enum CameraBackend {
    Synthetic(SyntheticCameraSource),
    #[cfg(feature = "stream-gstreamer")]
    Gstreamer(GstreamerCameraSource),
}

impl CameraSource {
    pub fn new(config: CameraConfig) -> Result<Self> {
        if config.url.starts_with("stub://") {
            Ok(Self {
                backend: CameraBackend::Synthetic(SyntheticCameraSource::new(config)),
            })
        } else {
            #[cfg(feature = "stream-gstreamer")]
            {
                Ok(Self {
                    backend: CameraBackend::Gstreamer(GstreamerCameraSource::new(config)?),
                })
            }
            #[cfg(not(feature = "stream-gstreamer"))]
            {
                anyhow::bail!("camera streams require the stream-gstreamer feature")
            }
        }
    }
}

impl FrameSource for CameraSource {
    fn open(&mut self) -> Result<()> {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.open(),
            #[cfg(feature = "stream-gstreamer")]
            CameraBackend::Gstreamer(source) => source.open(),
        }
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.next_frame(),
            #[cfg(feature = "stream-gstreamer")]
            CameraBackend::Gstreamer(source) => source.next_frame(),
        }
    }

    fn close(&mut self) {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.close(),
            #[cfg(feature = "stream-gstreamer")]
            CameraBackend::Gstreamer(source) => source.close(),
        }
    }

    fn stats(&self) -> SourceStats {
        match &self.backend {
            CameraBackend::Synthetic(source) => source.stats(),
            #[cfg(feature = "stream-gstreamer")]
            CameraBackend::Gstreamer(source) => source.stats(),
        }
    }
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for tests and demos
// ----------------------------------------------------------------------------

struct SyntheticCameraSource {
    config: CameraConfig,
    frame_count: u64,
    open: bool,
}

impl SyntheticCameraSource {
    fn new(config: CameraConfig) -> Self {
        Self {
            config,
            frame_count: 0,
            open: false,
        }
    }

    fn open(&mut self) -> Result<()> {
        self.open = true;
        log::info!("CameraSource: connected to {} (synthetic)", self.config.url);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        self.frame_count += 1;
        Ok(Some(synthetic_frame(
            self.config.width,
            self.config.height,
            self.frame_count,
        )))
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            log::info!("CameraSource: released {}", self.config.url);
        }
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            origin: self.config.url.clone(),
        }
    }
}

// ----------------------------------------------------------------------------
// Production camera source using GStreamer
// ----------------------------------------------------------------------------

#[cfg(feature = "stream-gstreamer")]
struct GstreamerCameraSource {
    config: CameraConfig,
    pipeline: gstreamer::Pipeline,
    appsink: gstreamer_app::AppSink,
    frame_count: u64,
    open: bool,
    reached_eos: bool,
}

#[cfg(feature = "stream-gstreamer")]
impl GstreamerCameraSource {
    fn new(config: CameraConfig) -> Result<Self> {
        gstreamer::init().context("initialize gstreamer")?;

        let pipeline_description = format!(
            "rtspsrc location={} latency=0 ! decodebin ! videoconvert ! video/x-raw,format=RGB ! \
             appsink name=appsink sync=false max-buffers=1 drop=true",
            config.url
        );
        let pipeline = gstreamer::parse_launch(&pipeline_description)
            .context("build camera pipeline")?
            .downcast::<gstreamer::Pipeline>()
            .map_err(|_| anyhow::anyhow!("camera pipeline is not a Pipeline"))?;

        let appsink = pipeline
            .by_name("appsink")
            .context("appsink element missing from pipeline")?
            .downcast::<gstreamer_app::AppSink>()
            .map_err(|_| anyhow::anyhow!("appsink element has unexpected type"))?;

        let caps = gstreamer::Caps::builder("video/x-raw")
            .field("format", "RGB")
            .build();
        appsink.set_caps(Some(&caps));
        appsink.set_max_buffers(1);
        appsink.set_drop(true);
        appsink.set_sync(false);

        Ok(Self {
            config,
            pipeline,
            appsink,
            frame_count: 0,
            open: false,
            reached_eos: false,
        })
    }

    fn open(&mut self) -> Result<()> {
        self.pipeline
            .set_state(gstreamer::State::Playing)
            .context("set camera pipeline to Playing")?;
        self.open = true;
        log::info!("CameraSource: connected to {}", self.config.url);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        if self.reached_eos {
            return Ok(None);
        }

        let timeout = self.frame_timeout();
        let sample = match self.appsink.try_pull_sample(timeout) {
            Some(sample) => sample,
            None => {
                if self.appsink.is_eos() {
                    self.reached_eos = true;
                    return Ok(None);
                }
                anyhow::bail!("camera stream stalled")
            }
        };

        let (pixels, width, height) = sample_to_pixels(&sample)?;
        self.frame_count += 1;

        RgbImage::from_raw(width, height, pixels)
            .map(Some)
            .ok_or_else(|| anyhow::anyhow!("camera sample size does not match dimensions"))
    }

    fn close(&mut self) {
        if self.open {
            let _ = self.pipeline.set_state(gstreamer::State::Null);
            self.open = false;
            log::info!("CameraSource: released {}", self.config.url);
        }
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            origin: self.config.url.clone(),
        }
    }

    fn frame_timeout(&self) -> gstreamer::ClockTime {
        let base_ms = if self.config.target_fps == 0 {
            500
        } else {
            (1000 / self.config.target_fps).saturating_mul(4).max(500)
        };
        gstreamer::ClockTime::from_mseconds(base_ms as u64)
    }
}

#[cfg(feature = "stream-gstreamer")]
fn sample_to_pixels(sample: &gstreamer::Sample) -> Result<(Vec<u8>, u32, u32)> {
    let buffer = sample.buffer().context("camera sample missing buffer")?;
    let caps = sample.caps().context("camera sample missing caps")?;
    let info =
        gstreamer_video::VideoInfo::from_caps(caps).context("parse camera caps as video info")?;

    let width = info.width();
    let height = info.height();
    let row_bytes = (width as usize) * 3;
    let stride = info.stride()[0] as usize;

    let map = buffer.map_readable().context("map camera buffer")?;
    let data = map.as_slice();

    if stride == row_bytes {
        return Ok((data.to_vec(), width, height));
    }

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        let end = start + row_bytes;
        pixels.extend_from_slice(
            data.get(start..end)
                .context("camera buffer row is out of bounds")?,
        );
    }

    Ok((pixels, width, height))
}
