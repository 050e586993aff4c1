//! Frame sources: the physical camera plus replayable stand-ins for it.

#[cfg(feature = "camera")]
pub mod camera;
pub mod scripted;
pub mod sequence;

#[cfg(feature = "camera")]
pub use camera::CameraSource;
pub use scripted::{BACKGROUND, ScriptStep, ScriptedSource, SyntheticWasher, render_washer_frame};
pub use sequence::ImageSequenceSource;
