use image::{GrayImage, RgbImage};
use crate::{
    error::Result,
    types::{Circle, ColorRange, StageStatus},
};

/// Trait for color segmentation algorithms
pub trait ColorMasker: Send + Sync {
    /// Produce a binary mask (255 = inside the range) with the frame's dimensions
    fn mask(&self, frame: &RgbImage, range: &ColorRange) -> Result<GrayImage>;
}

/// Trait for circle finding algorithms
pub trait CircleFinder: Send + Sync {
    /// Find circles in a smoothed single-channel image
    fn find_circles(&self, image: &GrayImage) -> Result<Vec<Circle>>;
}

/// A camera-like device yielding RGB frames.
///
/// Implementations own their device handle exclusively. `reinitialize` must
/// release the current handle before acquiring a new one.
pub trait FrameSource {
    /// Read the next frame
    fn read(&mut self) -> Result<RgbImage>;

    /// Release and reopen the underlying device
    fn reinitialize(&mut self) -> Result<()>;

    /// Human-readable description of the device
    fn description(&self) -> String;
}

/// Consumer of the annotated frame and stage flags, called at most once per processed frame
pub trait StatusSink {
    fn present(&mut self, frame: &RgbImage, status: &[StageStatus]) -> Result<()>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn read(&mut self) -> Result<RgbImage> {
        (**self).read()
    }

    fn reinitialize(&mut self) -> Result<()> {
        (**self).reinitialize()
    }

    fn description(&self) -> String {
        (**self).description()
    }
}

impl<K: StatusSink + ?Sized> StatusSink for Box<K> {
    fn present(&mut self, frame: &RgbImage, status: &[StageStatus]) -> Result<()> {
        (**self).present(frame, status)
    }
}
