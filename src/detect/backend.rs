use anyhow::Result;
use image::RgbImage;

use crate::detect::raw::RawDetection;

/// Detection capability.
///
/// Backends are opaque pretrained models invoked once per frame. The contract
/// is narrow on purpose: RGB frame in, raw detection rows out. No latency or
/// thread-safety guarantees are assumed beyond "callable per frame", and the
/// call is synchronous on the pipeline's critical path.
///
/// Backends are constructed once and injected into the coordinator, so tests
/// substitute `ScriptedBackend` without touching pipeline code.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a frame, producing raw detection rows.
    ///
    /// Implementations must treat the frame as read-only and must not retain
    /// it beyond this call.
    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<RawDetection>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
