use image::RgbImage;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WasherError};

/// Inclusive HSV bounds in the 8-bit convention (hue 0..=179, saturation and value 0..=255).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "RawColorRange", into = "RawColorRange")]
pub struct ColorRange {
    lower: [u8; 3],
    upper: [u8; 3],
}

/// Unvalidated wire form of [`ColorRange`]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RawColorRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl ColorRange {
    pub fn new(lower: [u8; 3], upper: [u8; 3]) -> Result<Self> {
        for (channel, (lo, hi)) in ["hue", "saturation", "value"]
            .iter()
            .zip(lower.iter().zip(upper.iter()))
        {
            if lo > hi {
                return Err(WasherError::InvalidColorRange(format!(
                    "{channel} lower bound {lo} exceeds upper bound {hi}"
                )));
            }
        }
        Ok(Self { lower, upper })
    }

    /// Caller guarantees `lower <= upper` on every channel
    pub(crate) const fn from_ordered_bounds(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    pub fn lower(&self) -> [u8; 3] {
        self.lower
    }

    pub fn upper(&self) -> [u8; 3] {
        self.upper
    }

    /// Check whether an HSV triple lies inside the bounds on every channel
    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|c| hsv[c] >= self.lower[c] && hsv[c] <= self.upper[c])
    }
}

impl TryFrom<RawColorRange> for ColorRange {
    type Error = WasherError;

    fn try_from(raw: RawColorRange) -> Result<Self> {
        Self::new(raw.lower, raw.upper)
    }
}

impl From<ColorRange> for RawColorRange {
    fn from(range: ColorRange) -> Self {
        Self {
            lower: range.lower,
            upper: range.upper,
        }
    }
}

/// A circle candidate in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Circle {
    pub x: i32,
    pub y: i32,
    pub radius: i32,
}

impl Circle {
    pub fn new(x: i32, y: i32, radius: i32) -> Self {
        Self { x, y, radius }
    }

    pub fn center_distance(&self, other: &Circle) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dy = (self.y - other.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Output of one detector invocation on one frame
#[derive(Debug, Clone)]
pub struct DetectionResult {
    /// Circles found in the masked frame, in no particular order
    pub circles: Vec<Circle>,
    /// The input frame with every pixel outside the color range zeroed
    pub mask_frame: RgbImage,
}

impl DetectionResult {
    pub fn is_empty(&self) -> bool {
        self.circles.is_empty()
    }
}

/// Per-stage detection flag as handed to presentation sinks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StageStatus {
    pub stage: String,
    pub detected: bool,
}

impl StageStatus {
    /// Operator-facing line, e.g. "Deep teal washer not detected"
    pub fn label(&self) -> String {
        let name = display_name(&self.stage);
        if self.detected {
            format!("{name} washer detected")
        } else {
            format!("{name} washer not detected")
        }
    }
}

/// Render a stage id for humans: underscores become spaces, first letter upper-cased.
pub fn display_name(stage: &str) -> String {
    let spaced = stage.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_range_rejects_inverted_bounds() {
        let err = ColorRange::new([100, 150, 50], [90, 255, 255]).unwrap_err();
        assert!(matches!(err, WasherError::InvalidColorRange(_)));
    }

    #[test]
    fn test_color_range_contains_is_inclusive() {
        let range = ColorRange::new([100, 150, 50], [140, 255, 255]).unwrap();
        assert!(range.contains([100, 150, 50]));
        assert!(range.contains([140, 255, 255]));
        assert!(!range.contains([99, 200, 200]));
        assert!(!range.contains([120, 149, 200]));
    }

    #[test]
    fn test_color_range_deserialize_validates() {
        let ok: ColorRange =
            serde_json::from_str(r#"{"lower":[0,150,50],"upper":[10,255,255]}"#).unwrap();
        assert_eq!(ok.upper(), [10, 255, 255]);

        let bad = serde_json::from_str::<ColorRange>(r#"{"lower":[20,0,0],"upper":[10,255,255]}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_stage_status_labels() {
        let status = StageStatus {
            stage: "deep_teal".to_string(),
            detected: false,
        };
        assert_eq!(status.label(), "Deep teal washer not detected");

        let status = StageStatus {
            stage: "blue".to_string(),
            detected: true,
        };
        assert_eq!(status.label(), "Blue washer detected");
    }
}
