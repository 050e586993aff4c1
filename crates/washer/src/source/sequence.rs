use std::path::{Path, PathBuf};

use image::RgbImage;
use tracing::debug;

use crate::{
    error::{Result, WasherError},
    traits::FrameSource,
};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Replays still images from a directory in file-name order, standing in for a camera
#[derive(Debug, Clone)]
pub struct ImageSequenceSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    position: usize,
}

impl ImageSequenceSource {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let files = scan(&dir)?;
        debug!(dir = %dir.display(), frames = files.len(), "opened image sequence");
        Ok(Self {
            dir,
            files,
            position: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn position(&self) -> usize {
        self.position
    }
}

fn scan(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        WasherError::DeviceUnavailable(format!("cannot open {}: {e}", dir.display()))
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        })
        .collect();
    files.sort();
    Ok(files)
}

impl FrameSource for ImageSequenceSource {
    fn read(&mut self) -> Result<RgbImage> {
        let Some(path) = self.files.get(self.position).cloned() else {
            return Err(WasherError::FrameUnavailable(format!(
                "no frames left in {}",
                self.dir.display()
            )));
        };
        self.position += 1;

        let image = image::open(&path).map_err(|e| {
            WasherError::InvalidFrame(format!("{}: {e}", path.display()))
        })?;
        Ok(image.to_rgb8())
    }

    /// Rescan the directory, keeping the read position
    fn reinitialize(&mut self) -> Result<()> {
        self.files = scan(&self.dir)?;
        Ok(())
    }

    fn description(&self) -> String {
        format!("Image sequence: {} ({} frames)", self.dir.display(), self.files.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn write_frame(dir: &Path, name: &str, color: Rgb<u8>) {
        RgbImage::from_pixel(8, 6, color)
            .save(dir.join(name))
            .unwrap();
    }

    #[test]
    fn test_reads_in_name_order_then_runs_dry() {
        let dir = tempfile::tempdir().unwrap();
        write_frame(dir.path(), "b.png", Rgb([0, 0, 200]));
        write_frame(dir.path(), "a.png", Rgb([200, 0, 0]));
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut source = ImageSequenceSource::open(dir.path()).unwrap();
        assert_eq!(source.len(), 2);

        assert_eq!(source.read().unwrap().get_pixel(0, 0), &Rgb([200, 0, 0]));
        assert_eq!(source.read().unwrap().get_pixel(0, 0), &Rgb([0, 0, 200]));
        assert!(matches!(source.read(), Err(WasherError::FrameUnavailable(_))));
    }

    #[test]
    fn test_corrupt_file_is_invalid_frame() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.png"), b"not a png").unwrap();

        let mut source = ImageSequenceSource::open(dir.path()).unwrap();
        assert!(matches!(source.read(), Err(WasherError::InvalidFrame(_))));
    }

    #[test]
    fn test_reinitialize_picks_up_new_frames() {
        let dir = tempfile::tempdir().unwrap();
        write_frame(dir.path(), "000.png", Rgb([1, 2, 3]));

        let mut source = ImageSequenceSource::open(dir.path()).unwrap();
        source.read().unwrap();
        write_frame(dir.path(), "001.png", Rgb([4, 5, 6]));

        source.reinitialize().unwrap();
        assert_eq!(source.position(), 1);
        assert_eq!(source.read().unwrap().get_pixel(0, 0), &Rgb([4, 5, 6]));
    }

    #[test]
    fn test_missing_directory_is_device_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            ImageSequenceSource::open(&missing),
            Err(WasherError::DeviceUnavailable(_))
        ));
    }
}
