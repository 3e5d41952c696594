mod backend;
mod backends;
mod class;
mod normalize;
mod raw;
mod result;

pub use backend::DetectorBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use backends::ScriptedBackend;
pub use class::{plate_label, ObjectClass, COLOR_HELMET, COLOR_LICENSE_PLATE, COLOR_NO_HELMET};
pub use normalize::normalize;
pub use raw::{RawDetection, RAW_DETECTION_ARITY};
pub use result::{BoundingBox, Detection};
