use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};

use crate::{
    algorithms::{GaussianSmoother, HoughCircleFinder, HoughParams, HsvRangeMasker},
    error::{Result, WasherError},
    pipeline::WasherDetector,
    traits::{CircleFinder, ColorMasker},
};

/// Named radius tunings
#[derive(
    Debug, Clone, Copy, Default,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq, Eq
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DetectorProfile {
    /// Close-range station camera, radii 30..=50
    #[default]
    SmallWashers,
    /// Bench camera, radii 20..=150
    General,
}

impl DetectorProfile {
    pub fn hough_params(&self) -> HoughParams {
        match self {
            Self::SmallWashers => HoughParams::small_washers(),
            Self::General => HoughParams::general(),
        }
    }
}

/// Serializable detector settings. Explicit `hough` parameters win over `profile`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DetectorConfig {
    pub profile: DetectorProfile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hough: Option<HoughParams>,
    pub blur_sigma: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            profile: DetectorProfile::default(),
            hough: None,
            blur_sigma: GaussianSmoother::default().sigma,
        }
    }
}

impl DetectorConfig {
    pub fn effective_hough(&self) -> HoughParams {
        self.hough.clone().unwrap_or_else(|| self.profile.hough_params())
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.blur_sigma > 0.0) {
            return Err(WasherError::InvalidDetectorConfig(format!(
                "blur_sigma must be positive, got {}",
                self.blur_sigma
            )));
        }
        self.effective_hough().validate()
    }

    pub fn build(&self) -> Result<WasherDetector> {
        self.validate()?;
        Ok(DetectorBuilder::new()
            .with_blur_sigma(self.blur_sigma)
            .with_hough_params(self.effective_hough())
            .build())
    }
}

/// Builder for washer detectors with a fluent API
pub struct DetectorBuilder {
    masker: Option<Box<dyn ColorMasker>>,
    smoother: GaussianSmoother,
    circle_finder: Option<Box<dyn CircleFinder>>,
}

impl DetectorBuilder {
    pub fn new() -> Self {
        Self {
            masker: None,
            smoother: GaussianSmoother::default(),
            circle_finder: None,
        }
    }

    /// Set the color masker (replaces any existing one)
    pub fn set_masker<M>(mut self, masker: M) -> Self
    where
        M: ColorMasker + 'static,
    {
        self.masker = Some(Box::new(masker));
        self
    }

    /// Set the circle finder (replaces any existing one)
    pub fn set_circle_finder<F>(mut self, finder: F) -> Self
    where
        F: CircleFinder + 'static,
    {
        self.circle_finder = Some(Box::new(finder));
        self
    }

    pub fn with_blur_sigma(mut self, sigma: f32) -> Self {
        self.smoother = GaussianSmoother { sigma };
        self
    }

    /// Use the Hough finder with the given parameters
    pub fn with_hough_params(self, params: HoughParams) -> Self {
        self.set_circle_finder(HoughCircleFinder::new(params))
    }

    pub fn with_profile(self, profile: DetectorProfile) -> Self {
        self.with_hough_params(profile.hough_params())
    }

    /// Build the detector with default components if not specified
    pub fn build(self) -> WasherDetector {
        let masker = self.masker.unwrap_or_else(|| Box::new(HsvRangeMasker));
        let circle_finder = self
            .circle_finder
            .unwrap_or_else(|| Box::new(HoughCircleFinder::default()));

        WasherDetector::new(masker, self.smoother, circle_finder)
    }
}

impl Default for DetectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
