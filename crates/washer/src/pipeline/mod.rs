pub mod builder;

use image::RgbImage;
use tracing::debug;

use crate::{
    algorithms::{GaussianSmoother, apply_mask, to_intensity},
    error::Result,
    traits::{CircleFinder, ColorMasker},
    types::{ColorRange, DetectionResult},
};

/// Color-gated circle detection: mask, intensity, smoothing, circle search
pub struct WasherDetector {
    masker: Box<dyn ColorMasker>,
    smoother: GaussianSmoother,
    circle_finder: Box<dyn CircleFinder>,
}

impl WasherDetector {
    /// Create a new detector builder
    pub fn builder() -> builder::DetectorBuilder {
        builder::DetectorBuilder::new()
    }

    pub fn new(
        masker: Box<dyn ColorMasker>,
        smoother: GaussianSmoother,
        circle_finder: Box<dyn CircleFinder>,
    ) -> Self {
        Self {
            masker,
            smoother,
            circle_finder,
        }
    }

    /// Run the full detection chain for one frame and one color range
    pub fn detect(&self, frame: &RgbImage, range: &ColorRange) -> Result<DetectionResult> {
        let mask = self.masker.mask(frame, range)?;
        let mask_frame = apply_mask(frame, &mask)?;

        let intensity = to_intensity(&mask_frame);
        let smoothed = self.smoother.smooth(&intensity);
        let circles = self.circle_finder.find_circles(&smoothed)?;

        debug!(
            lower = ?range.lower(),
            upper = ?range.upper(),
            circles = circles.len(),
            "detection pass"
        );

        Ok(DetectionResult { circles, mask_frame })
    }

    pub fn info(&self) -> String {
        format!(
            "Detector: HSV mask -> intensity -> gaussian blur (sigma {}) -> circle search",
            self.smoother.sigma
        )
    }
}

impl Default for WasherDetector {
    fn default() -> Self {
        builder::DetectorBuilder::new().build()
    }
}
