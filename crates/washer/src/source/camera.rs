use image::RgbImage;
use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    utils::{CameraIndex, RequestedFormat, RequestedFormatType},
};
use tracing::{info, warn};

use crate::{
    error::{Result, WasherError},
    traits::FrameSource,
};

/// USB/built-in camera opened by index
pub struct CameraSource {
    index: u32,
    camera: Option<Camera>,
}

impl CameraSource {
    pub fn open(index: u32) -> Result<Self> {
        let camera = open_camera(index)?;
        info!("Opened camera {}: {}", index, camera.info().human_name());
        Ok(Self {
            index,
            camera: Some(camera),
        })
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    fn release(&mut self) {
        if let Some(mut camera) = self.camera.take() {
            if let Err(e) = camera.stop_stream() {
                warn!("Camera {} did not stop cleanly: {}", self.index, e);
            }
        }
    }
}

fn open_camera(index: u32) -> Result<Camera> {
    let requested =
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
    let mut camera = Camera::new(CameraIndex::Index(index), requested)
        .map_err(|e| WasherError::DeviceUnavailable(format!("camera {index}: {e}")))?;
    camera
        .open_stream()
        .map_err(|e| WasherError::DeviceUnavailable(format!("camera {index}: {e}")))?;
    Ok(camera)
}

impl FrameSource for CameraSource {
    fn read(&mut self) -> Result<RgbImage> {
        let camera = self.camera.as_mut().ok_or_else(|| {
            WasherError::FrameUnavailable(format!("camera {} is not open", self.index))
        })?;

        let buffer = camera
            .frame()
            .map_err(|e| WasherError::FrameUnavailable(e.to_string()))?;
        let decoded = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| WasherError::InvalidFrame(e.to_string()))?;

        let (width, height) = (decoded.width(), decoded.height());
        RgbImage::from_raw(width, height, decoded.into_raw()).ok_or_else(|| {
            WasherError::InvalidFrame(format!("camera buffer does not fit {width}x{height}"))
        })
    }

    fn reinitialize(&mut self) -> Result<()> {
        self.release();
        self.camera = Some(open_camera(self.index)?);
        info!("Camera {} reinitialized", self.index);
        Ok(())
    }

    fn description(&self) -> String {
        match &self.camera {
            Some(camera) => format!("Camera {}: {}", self.index, camera.info().human_name()),
            None => format!("Camera {} (closed)", self.index),
        }
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        self.release();
    }
}
