use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_circle_mut};

use crate::types::Circle;

pub const OUTLINE_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const CENTER_COLOR: Rgb<u8> = Rgb([255, 255, 0]);

/// Draws detected circles onto a display frame
#[derive(Debug, Clone)]
pub struct CircleAnnotator {
    pub outline_thickness: i32,
    pub center_radius: i32,
}

impl Default for CircleAnnotator {
    fn default() -> Self {
        Self {
            outline_thickness: 4,
            center_radius: 3,
        }
    }
}

impl CircleAnnotator {
    pub fn annotate(&self, frame: &mut RgbImage, circles: &[Circle]) {
        for circle in circles {
            let center = (circle.x, circle.y);
            // thickness grows outward from radius - 1, like a centred stroke
            for offset in 0..self.outline_thickness {
                let radius = circle.radius - 1 + offset;
                if radius > 0 {
                    draw_hollow_circle_mut(frame, center, radius, OUTLINE_COLOR);
                }
            }
            draw_filled_circle_mut(frame, center, self.center_radius, CENTER_COLOR);
        }
    }
}
