//! Scripted frame source for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use image::RgbImage;

use crate::source::{FrameSource, SourceStats};

/// Frame source that replays a fixed frame queue, then reports exhaustion.
///
/// `close_count` is shared so tests can assert the session released the
/// source exactly once; `fail_open` simulates an unavailable capture device.
pub struct ScriptedSource {
    frames: VecDeque<RgbImage>,
    frame_count: u64,
    fail_open: bool,
    close_count: Arc<AtomicU32>,
}

impl ScriptedSource {
    pub fn new<I>(frames: I) -> Self
    where
        I: IntoIterator<Item = RgbImage>,
    {
        Self {
            frames: frames.into_iter().collect(),
            frame_count: 0,
            fail_open: false,
            close_count: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Source whose `open` fails, as an unreachable capture device would.
    pub fn unavailable() -> Self {
        let mut source = Self::new(Vec::new());
        source.fail_open = true;
        source
    }

    /// Shared handle to the close counter.
    pub fn close_count(&self) -> Arc<AtomicU32> {
        self.close_count.clone()
    }
}

impl FrameSource for ScriptedSource {
    fn open(&mut self) -> Result<()> {
        if self.fail_open {
            return Err(anyhow!("scripted source configured as unavailable"));
        }
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        match self.frames.pop_front() {
            Some(frame) => {
                self.frame_count += 1;
                Ok(Some(frame))
            }
            None => Ok(None),
        }
    }

    fn close(&mut self) {
        self.close_count.fetch_add(1, Ordering::SeqCst);
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            origin: "scripted".to_string(),
        }
    }
}
