//! Frame sources.
//!
//! This module provides the capture side of the pipeline:
//! - Camera streams (`stub://` synthetic, RTSP via feature `stream-gstreamer`)
//! - Video files (`stub://` synthetic clips, frame directories, full decode
//!   via feature `video-ffmpeg`)
//! - Scripted sources (testing)
//!
//! All sources produce owned RGB frame buffers. `next_frame` returning
//! `Ok(None)` is the normal exhaustion signal, never an error; a source that
//! cannot open reports that at `open` time. The active session owns its
//! source exclusively and must release it exactly once on every exit path.

mod camera;
mod stub;
mod video;

pub use camera::{CameraConfig, CameraSource};
pub use stub::ScriptedSource;
pub use video::{VideoConfig, VideoFileSource};

use anyhow::Result;
use image::RgbImage;

/// A capture source the coordinator pulls frames from.
pub trait FrameSource: Send {
    /// Acquire the underlying capture resource. Failure here means the
    /// source is unavailable; the pipeline surfaces it before any loop work.
    fn open(&mut self) -> Result<()>;

    /// Pull the next frame. `Ok(None)` signals normal exhaustion.
    fn next_frame(&mut self) -> Result<Option<RgbImage>>;

    /// Release the capture resource. Must be idempotent.
    fn close(&mut self);

    /// Capture statistics.
    fn stats(&self) -> SourceStats;
}

/// Statistics for a frame source.
#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub origin: String,
}

/// Synthetic RGB test pattern shared by the stub backends.
///
/// Mixes frame count and pixel position so consecutive frames differ, the way
/// a live scene would.
pub(crate) fn synthetic_frame(width: u32, height: u32, frame_count: u64) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let base = x as u64 + y as u64 + frame_count;
        image::Rgb([
            (base % 256) as u8,
            ((base / 3) % 256) as u8,
            ((base / 7) % 256) as u8,
        ])
    })
}
