use image::{GrayImage, Luma, Rgb, RgbImage};
use crate::{
    error::{Result, WasherError},
    traits::ColorMasker,
    types::ColorRange,
};

/// Convert one RGB pixel to 8-bit HSV (hue halved into 0..=179).
pub fn rgb_to_hsv(rgb: [u8; 3]) -> [u8; 3] {
    let [r, g, b] = rgb.map(f32::from);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let saturation = if max > 0.0 { delta * 255.0 / max } else { 0.0 };

    let hue_degrees = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (g - b) / delta
    } else if max == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    let hue_degrees = if hue_degrees < 0.0 { hue_degrees + 360.0 } else { hue_degrees };

    let mut hue = (hue_degrees / 2.0).round() as u16;
    if hue >= 180 {
        hue -= 180;
    }

    [hue as u8, saturation.round() as u8, max as u8]
}

/// Thresholds every pixel's HSV representation against an inclusive range
#[derive(Debug, Clone, Default)]
pub struct HsvRangeMasker;

impl ColorMasker for HsvRangeMasker {
    fn mask(&self, frame: &RgbImage, range: &ColorRange) -> Result<GrayImage> {
        ensure_non_empty(frame)?;

        let mask = GrayImage::from_fn(frame.width(), frame.height(), |x, y| {
            let Rgb(rgb) = *frame.get_pixel(x, y);
            if range.contains(rgb_to_hsv(rgb)) {
                Luma([255u8])
            } else {
                Luma([0u8])
            }
        });

        Ok(mask)
    }
}

/// Zero every frame pixel whose mask value is 0
pub fn apply_mask(frame: &RgbImage, mask: &GrayImage) -> Result<RgbImage> {
    if frame.dimensions() != mask.dimensions() {
        return Err(WasherError::InvalidFrame(format!(
            "mask is {:?} but frame is {:?}",
            mask.dimensions(),
            frame.dimensions()
        )));
    }

    let mut masked = frame.clone();
    for (pixel, Luma([m])) in masked.pixels_mut().zip(mask.pixels()) {
        if *m == 0 {
            *pixel = Rgb([0, 0, 0]);
        }
    }
    Ok(masked)
}

pub(crate) fn ensure_non_empty(frame: &RgbImage) -> Result<()> {
    if frame.width() == 0 || frame.height() == 0 {
        return Err(WasherError::InvalidFrame(format!(
            "frame has empty dimensions {}x{}",
            frame.width(),
            frame.height()
        )));
    }
    Ok(())
}
