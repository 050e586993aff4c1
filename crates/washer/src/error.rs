use thiserror::Error;

#[derive(Error, Debug)]
pub enum WasherError {
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Frame unavailable: {0}")]
    FrameUnavailable(String),

    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Gave up after {attempts} consecutive failed frame reads")]
    MaxRetriesExceeded { attempts: u32 },

    #[error("Invalid color range: {0}")]
    InvalidColorRange(String),

    #[error("Invalid stage table: {0}")]
    InvalidStageTable(String),

    #[error("Invalid detector configuration: {0}")]
    InvalidDetectorConfig(String),

    #[error("Failed to load image: {0}")]
    ImageLoad(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WasherError {
    /// Read failures the session loop retries instead of escalating.
    pub fn is_transient_read(&self) -> bool {
        matches!(self, Self::FrameUnavailable(_) | Self::InvalidFrame(_))
    }
}

pub type Result<T> = std::result::Result<T, WasherError>;
