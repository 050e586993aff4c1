use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};
use thiserror::Error;
use washer::{
    DetectionSequencer, DetectorConfig, DetectorProfile, RetryPolicy, StageSpec, StageTable,
    WasherError,
    stage::{bench_stages, station_stages},
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Washer(#[from] WasherError),
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

/// Ready-made station setups
#[derive(
    Debug, Clone, Copy, Default,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq, Eq
)]
#[strum(serialize_all = "snake_case")]
pub enum Preset {
    /// Blue, teal, red with a camera reopen after blue; small-washer radii
    #[default]
    Station,
    /// Blue, deep teal, red; general radii, no camera reopen
    Bench,
}

/// Which capture device to open
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct CameraSection {
    pub index: u32,
}

/// Startup configuration for an assembly session
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct AssemblyConfig {
    #[serde(default)]
    pub camera: CameraSection,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub retry: RetryPolicy,
    pub stages: Vec<StageSpec>,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self::preset(Preset::Station)
    }
}

impl AssemblyConfig {
    pub fn preset(preset: Preset) -> Self {
        match preset {
            Preset::Station => Self {
                camera: CameraSection::default(),
                detector: DetectorConfig::default(),
                retry: RetryPolicy::default(),
                stages: station_stages(),
            },
            Preset::Bench => Self {
                camera: CameraSection::default(),
                detector: DetectorConfig {
                    profile: DetectorProfile::General,
                    ..DetectorConfig::default()
                },
                retry: RetryPolicy::default(),
                stages: bench_stages(),
            },
        }
    }

    /// Validate the whole configuration and build the state machine from it
    pub fn build_sequencer(&self) -> Result<DetectionSequencer, ConfigError> {
        if self.retry.max_retries == 0 {
            return Err(WasherError::InvalidDetectorConfig(
                "retry.max_retries must be at least 1".to_string(),
            )
            .into());
        }
        let table = StageTable::new(self.stages.clone())?;
        let detector = self.detector.build()?;
        Ok(DetectionSequencer::new(table, detector))
    }

    /// Get the JSON schema of the configuration file
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(AssemblyConfig)
    }

    /// Load configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load configuration from JSON string
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(ConfigError::UnsupportedFileFormat),
        }
    }

    /// Save configuration, picking the format from the file extension
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path_ref = path.as_ref();
        let content = match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => self.to_toml()?,
            Some("json") => self.to_json()?,
            _ => return Err(ConfigError::UnsupportedFileFormat),
        };
        fs::write(path_ref, content)?;
        Ok(())
    }

    /// Convert configuration to TOML string
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(&self)?)
    }

    /// Convert configuration to JSON string
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(&self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_default_is_station_preset() {
        let config = AssemblyConfig::default();
        let ids: Vec<&str> = config.stages.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["blue", "teal", "red"]);
        assert!(config.stages[0].reinitialize_after);
        assert_eq!(config.retry.max_retries, 10);
        assert_eq!(config.camera.index, 0);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = AssemblyConfig::preset(Preset::Bench);
        let text = config.to_toml().unwrap();
        assert_eq!(AssemblyConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_json_round_trip() {
        let config = AssemblyConfig::default();
        let text = config.to_json().unwrap();
        assert_eq!(AssemblyConfig::from_json(&text).unwrap(), config);
    }

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let text = r#"
            [[stages]]
            id = "blue"
            lower = [100, 150, 50]
            upper = [140, 255, 255]
            reinitialize_after = true

            [[stages]]
            id = "red"
            lower = [0, 150, 50]
            upper = [10, 255, 255]
            expected_count = 1
        "#;
        let config = AssemblyConfig::from_toml(text).unwrap();
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.detector, DetectorConfig::default());
        assert_eq!(config.stages[1].expected_count, Some(1));

        let sequencer = config.build_sequencer().unwrap();
        assert_eq!(sequencer.table().len(), 2);
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let text = r#"
            [[stages]]
            id = "blue"
            lower = [140, 150, 50]
            upper = [100, 255, 255]
        "#;
        assert!(AssemblyConfig::from_toml(text).is_err());
    }

    #[test]
    fn test_build_rejects_bad_tables() {
        let mut config = AssemblyConfig::default();
        config.stages.clear();
        assert!(matches!(
            config.build_sequencer(),
            Err(ConfigError::Washer(WasherError::InvalidStageTable(_)))
        ));

        let mut config = AssemblyConfig::default();
        config.retry.max_retries = 0;
        assert!(config.build_sequencer().is_err());
    }

    #[test]
    fn test_file_format_detection() {
        let dir = tempfile::tempdir().unwrap();
        let toml_path = dir.path().join("station.toml");
        let json_path = dir.path().join("station.json");

        let config = AssemblyConfig::default();
        config.to_file(&toml_path).unwrap();
        config.to_file(&json_path).unwrap();

        assert_eq!(AssemblyConfig::from_file(&toml_path).unwrap(), config);
        assert_eq!(AssemblyConfig::from_file(&json_path).unwrap(), config);
        assert!(matches!(
            AssemblyConfig::from_file(dir.path().join("station.yaml")),
            Err(ConfigError::UnsupportedFileFormat)
        ));
    }

    #[test]
    fn test_preset_names() {
        assert_eq!(Preset::from_str("bench").unwrap(), Preset::Bench);
        assert_eq!(Preset::Station.to_string(), "station");
    }

    #[test]
    fn test_schema_mentions_stages() {
        let schema = serde_json::to_string(&AssemblyConfig::schema()).unwrap();
        assert!(schema.contains("stages"));
        assert!(schema.contains("max_retries"));
    }
}
