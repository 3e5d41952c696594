//! Output media sinks.
//!
//! Annotated single images are saved directly with the `image` crate. For
//! buffered video the coordinator writes every annotated frame to a
//! `VideoSink` after the source is exhausted, then finalizes the sink into
//! the output media path handed to the storage collaborator.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::RgbImage;

use crate::error::PipelineError;

/// Save an annotated image, format chosen by extension.
pub fn save_annotated_image(frame: &RgbImage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create output directory {}", parent.display()))?;
        }
    }
    frame
        .save(path)
        .with_context(|| format!("failed to save annotated image {}", path.display()))
}

/// Output path for an annotated image: `<out_dir>/output_<input file name>`.
pub fn annotated_image_path(out_dir: &Path, input: &Path) -> Result<PathBuf> {
    let name = input
        .file_name()
        .ok_or_else(|| PipelineError::Input(format!("{} has no file name", input.display())))?;
    let mut file_name = std::ffi::OsString::from("output_");
    file_name.push(name);
    Ok(out_dir.join(file_name))
}

/// Sink that receives buffered annotated frames sequentially.
pub trait VideoSink: Send {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()>;

    /// Flush and return the path of the finished output media.
    fn finalize(&mut self) -> Result<PathBuf>;
}

/// Writes annotated frames as a numbered JPEG sequence in one directory.
///
/// The default sink: works with any build, and the sequence directory is the
/// output media object handed to storage.
pub struct FrameSequenceSink {
    dir: PathBuf,
    frames_written: u64,
}

impl FrameSequenceSink {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create sink directory {}", dir.display()))?;
        Ok(Self {
            dir,
            frames_written: 0,
        })
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }
}

impl VideoSink for FrameSequenceSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        let path = self.dir.join(format!("frame_{:05}.jpg", self.frames_written));
        frame
            .save(&path)
            .with_context(|| format!("failed to write frame {}", path.display()))?;
        self.frames_written += 1;
        Ok(())
    }

    fn finalize(&mut self) -> Result<PathBuf> {
        log::info!(
            "wrote {} annotated frames to {}",
            self.frames_written,
            self.dir.display()
        );
        Ok(self.dir.clone())
    }
}
