use std::collections::VecDeque;

use anyhow::Result;
use image::RgbImage;

use crate::detect::backend::DetectorBackend;
use crate::detect::raw::RawDetection;

/// Scripted backend for testing and `stub` runs.
///
/// Replays a queue of raw detection batches, one batch per frame. Once the
/// script is exhausted every further frame yields no detections.
pub struct ScriptedBackend {
    batches: VecDeque<Vec<RawDetection>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            batches: VecDeque::new(),
        }
    }

    /// Backend that replays the given batches in order.
    pub fn with_batches<I>(batches: I) -> Self
    where
        I: IntoIterator<Item = Vec<RawDetection>>,
    {
        Self {
            batches: batches.into_iter().collect(),
        }
    }

    /// Queue one more per-frame batch.
    pub fn push_batch(&mut self, batch: Vec<RawDetection>) {
        self.batches.push_back(batch);
    }
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, _frame: &RgbImage) -> Result<Vec<RawDetection>> {
        Ok(self.batches.pop_front().unwrap_or_default())
    }
}
