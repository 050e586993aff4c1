use image::{GrayImage, RgbImage};

/// Reduce a color frame to single-channel intensity
pub fn to_intensity(frame: &RgbImage) -> GrayImage {
    image::imageops::grayscale(frame)
}

/// Gaussian smoothing applied before edge detection.
///
/// The default sigma of 2.0 matches the 9x9 kernel the detector thresholds were tuned with.
#[derive(Debug, Clone)]
pub struct GaussianSmoother {
    pub sigma: f32,
}

impl Default for GaussianSmoother {
    fn default() -> Self {
        Self { sigma: 2.0 }
    }
}

impl GaussianSmoother {
    pub fn smooth(&self, image: &GrayImage) -> GrayImage {
        imageproc::filter::gaussian_blur_f32(image, self.sigma)
    }
}
