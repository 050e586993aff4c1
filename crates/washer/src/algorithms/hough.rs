use image::GrayImage;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
    error::{Result, WasherError},
    traits::CircleFinder,
    types::Circle,
};

/// Parameters of the gradient Hough circle transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HoughParams {
    /// Image-to-accumulator scale; values above 1 shrink the accumulator
    #[schemars(range(min = 1.0))]
    pub resolution_ratio: f32,
    /// Accepted centers closer than this (pixels) are treated as the same circle
    pub min_center_distance: f32,
    /// Canny high threshold; the low threshold is half of it
    pub edge_threshold: f32,
    /// Minimum accumulator votes for a center and minimum edge support for its radius
    pub vote_threshold: u32,
    pub min_radius: u32,
    pub max_radius: u32,
}

impl Default for HoughParams {
    fn default() -> Self {
        Self::small_washers()
    }
}

impl HoughParams {
    /// Close-range station tuning
    pub fn small_washers() -> Self {
        Self {
            resolution_ratio: 1.2,
            min_center_distance: 50.0,
            edge_threshold: 50.0,
            vote_threshold: 30,
            min_radius: 30,
            max_radius: 50,
        }
    }

    /// Wider radius band for general bench use
    pub fn general() -> Self {
        Self {
            min_radius: 20,
            max_radius: 150,
            ..Self::small_washers()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.resolution_ratio >= 1.0) {
            return Err(WasherError::InvalidDetectorConfig(format!(
                "resolution_ratio must be >= 1, got {}",
                self.resolution_ratio
            )));
        }
        if !(self.min_center_distance > 0.0) {
            return Err(WasherError::InvalidDetectorConfig(format!(
                "min_center_distance must be positive, got {}",
                self.min_center_distance
            )));
        }
        if self.min_radius > self.max_radius {
            return Err(WasherError::InvalidDetectorConfig(format!(
                "min_radius {} exceeds max_radius {}",
                self.min_radius, self.max_radius
            )));
        }
        if self.max_radius == 0 {
            return Err(WasherError::InvalidDetectorConfig(
                "max_radius must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Gradient-direction Hough transform over Canny edges
#[derive(Debug, Clone, Default)]
pub struct HoughCircleFinder {
    pub params: HoughParams,
}

impl HoughCircleFinder {
    pub fn new(params: HoughParams) -> Self {
        Self { params }
    }
}

struct Accumulator {
    width: usize,
    height: usize,
    votes: Vec<u32>,
}

impl Accumulator {
    fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            votes: vec![0; width * height],
        }
    }

    fn at(&self, x: usize, y: usize) -> u32 {
        self.votes[y * self.width + x]
    }

    /// Cells above `threshold` that are 4-neighbour local maxima, strongest first
    fn peaks(&self, threshold: u32) -> Vec<(u32, usize, usize)> {
        let mut peaks = Vec::new();
        for y in 1..self.height.saturating_sub(1) {
            for x in 1..self.width.saturating_sub(1) {
                let v = self.at(x, y);
                if v > threshold
                    && v > self.at(x - 1, y)
                    && v >= self.at(x + 1, y)
                    && v > self.at(x, y - 1)
                    && v >= self.at(x, y + 1)
                {
                    peaks.push((v, x, y));
                }
            }
        }
        peaks.sort_by(|a, b| b.0.cmp(&a.0));
        peaks
    }

    /// Vote-weighted centroid of the 3x3 neighbourhood, in accumulator units
    fn refine(&self, x: usize, y: usize) -> (f32, f32) {
        let mut total = 0.0;
        let mut sx = 0.0;
        let mut sy = 0.0;
        for ny in y - 1..=y + 1 {
            for nx in x - 1..=x + 1 {
                let w = self.at(nx, ny) as f32;
                total += w;
                sx += w * nx as f32;
                sy += w * ny as f32;
            }
        }
        (sx / total, sy / total)
    }
}

impl CircleFinder for HoughCircleFinder {
    fn find_circles(&self, image: &GrayImage) -> Result<Vec<Circle>> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(WasherError::InvalidFrame(format!(
                "cannot search an empty {width}x{height} image"
            )));
        }
        if width < 3 || height < 3 {
            return Ok(Vec::new());
        }

        let p = &self.params;
        let dp = p.resolution_ratio;

        let edges = imageproc::edges::canny(image, p.edge_threshold / 2.0, p.edge_threshold);
        let gx = imageproc::gradients::horizontal_sobel(image);
        let gy = imageproc::gradients::vertical_sobel(image);

        let mut acc = Accumulator::new(
            (width as f32 / dp).ceil() as usize + 2,
            (height as f32 / dp).ceil() as usize + 2,
        );
        let min_r = p.min_radius as f32 / dp;
        let max_r = p.max_radius as f32 / dp;
        let mut edge_points = Vec::new();

        for (x, y, pixel) in edges.enumerate_pixels() {
            if pixel[0] == 0 {
                continue;
            }
            let dx = gx.get_pixel(x, y)[0] as f32;
            let dy = gy.get_pixel(x, y)[0] as f32;
            let magnitude = (dx * dx + dy * dy).sqrt();
            if magnitude == 0.0 {
                continue;
            }
            edge_points.push((x as f32, y as f32));

            let (ux, uy) = (dx / magnitude, dy / magnitude);
            let (ax0, ay0) = (x as f32 / dp, y as f32 / dp);

            for sign in [1.0f32, -1.0] {
                let mut r = min_r;
                while r <= max_r {
                    let ax = (ax0 + sign * ux * r).round();
                    let ay = (ay0 + sign * uy * r).round();
                    if ax < 0.0 || ay < 0.0 || ax >= acc.width as f32 || ay >= acc.height as f32 {
                        break;
                    }
                    acc.votes[ay as usize * acc.width + ax as usize] += 1;
                    r += 1.0;
                }
            }
        }

        let peaks = acc.peaks(p.vote_threshold);
        trace!(edges = edge_points.len(), peaks = peaks.len(), "hough accumulator filled");

        let mut circles: Vec<Circle> = Vec::new();
        for (_, px, py) in peaks {
            let (rx, ry) = acc.refine(px, py);
            let (cx, cy) = (rx * dp, ry * dp);
            let candidate = Circle::new(cx.round() as i32, cy.round() as i32, 0);

            if circles
                .iter()
                .any(|c| c.center_distance(&candidate) < p.min_center_distance)
            {
                continue;
            }

            if let Some(radius) = best_radius(&edge_points, (cx, cy), p) {
                circles.push(Circle { radius, ..candidate });
            }
        }

        Ok(circles)
    }
}

/// Radius in `[min_radius, max_radius]` with the most edge points within one pixel of it.
/// Returns `None` when that support does not exceed the vote threshold.
fn best_radius(edge_points: &[(f32, f32)], center: (f32, f32), p: &HoughParams) -> Option<i32> {
    let max_r = p.max_radius as usize;
    let mut histogram = vec![0u32; max_r + 2];

    for &(x, y) in edge_points {
        let d = ((x - center.0).powi(2) + (y - center.1).powi(2)).sqrt();
        if d < p.min_radius as f32 - 0.5 || d > p.max_radius as f32 + 0.5 {
            continue;
        }
        histogram[d.round() as usize] += 1;
    }

    let (radius, support) = (p.min_radius as usize..=max_r)
        .map(|r| {
            let below = if r > 0 { histogram[r - 1] } else { 0 };
            (r, below + histogram[r] + histogram[r + 1])
        })
        .fold((0usize, 0u32), |best, cur| if cur.1 > best.1 { cur } else { best });

    (support > p.vote_threshold).then_some(radius as i32)
}
