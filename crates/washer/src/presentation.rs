//! Headless status sinks. A UI plugs in by implementing [`StatusSink`].

use std::path::{Path, PathBuf};

use image::RgbImage;
use tracing::info;

use crate::{error::Result, traits::StatusSink, types::StageStatus};

/// Logs the status list whenever it changes
#[derive(Debug, Default)]
pub struct LogSink {
    last: Vec<StageStatus>,
}

impl StatusSink for LogSink {
    fn present(&mut self, _frame: &RgbImage, status: &[StageStatus]) -> Result<()> {
        if self.last.as_slice() != status {
            for entry in status {
                info!("{}", entry.label());
            }
            self.last = status.to_vec();
        }
        Ok(())
    }
}

/// Writes every presented frame as `frame_NNNNNN.png` and keeps `status.json` current
#[derive(Debug)]
pub struct FrameDirectorySink {
    dir: PathBuf,
    frames_written: usize,
}

impl FrameDirectorySink {
    pub fn create(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            frames_written: 0,
        })
    }

    pub fn frames_written(&self) -> usize {
        self.frames_written
    }

    pub fn status_path(&self) -> PathBuf {
        self.dir.join("status.json")
    }
}

impl StatusSink for FrameDirectorySink {
    fn present(&mut self, frame: &RgbImage, status: &[StageStatus]) -> Result<()> {
        let path = self.dir.join(format!("frame_{:06}.png", self.frames_written));
        frame.save(&path)?;
        self.frames_written += 1;

        std::fs::write(self.status_path(), serde_json::to_string_pretty(status)?)?;
        Ok(())
    }
}

/// Fans one presentation out to several sinks
#[derive(Default)]
pub struct MultiSink {
    sinks: Vec<Box<dyn StatusSink>>,
}

impl MultiSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<K: StatusSink + 'static>(mut self, sink: K) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }
}

impl StatusSink for MultiSink {
    fn present(&mut self, frame: &RgbImage, status: &[StageStatus]) -> Result<()> {
        for sink in &mut self.sinks {
            sink.present(frame, status)?;
        }
        Ok(())
    }
}
