//! Image-sequence decoder
//!
//! Treats a sorted list of image files as a frame sequence: file `i` is frame
//! `i`. Decoding uses the `image` crate and always yields RGBA8 frames.
//!
//! When a geometry is active, files of a different size fail to load rather
//! than being scaled.

use anyhow::{Context, bail};
use log::debug;
use std::path::{Path, PathBuf};

use crate::core::error::{FrameError, Result};
use crate::core::frame::Frame;
use crate::core::presets::FrameSize;
use crate::core::traits::FrameDecoder;

#[derive(Debug, Clone)]
pub struct ImageSequence {
    files: Vec<PathBuf>,
}

impl ImageSequence {
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self { files }
    }

    /// All files matching a glob pattern, sorted by path
    pub fn from_glob(pattern: &str) -> anyhow::Result<Self> {
        let mut files = glob::glob(pattern)
            .with_context(|| format!("Invalid glob pattern: {}", pattern))?
            .filter_map(|entry| entry.ok())
            .filter(|p| p.is_file())
            .collect::<Vec<_>>();
        if files.is_empty() {
            bail!("No files match {}", pattern);
        }
        files.sort();
        debug!("Sequence {}: {} files", pattern, files.len());
        Ok(Self { files })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn file(&self, index: i32) -> Option<&Path> {
        usize::try_from(index).ok().and_then(|i| self.files.get(i)).map(PathBuf::as_path)
    }

    /// Size of the first file, read from its header
    pub fn detect_size(&self) -> Option<FrameSize> {
        let first = self.files.first()?;
        let (w, h) = image::image_dimensions(first).ok()?;
        Some(FrameSize::new(w as i32, h as i32))
    }
}

impl FrameDecoder for ImageSequence {
    fn decode_frame(&self, index: i32, size: FrameSize) -> Result<Frame> {
        let path = self
            .file(index)
            .ok_or_else(|| FrameError::load(index, format!("sequence has {} frames", self.len())))?;

        let img = image::open(path)
            .map_err(|e| FrameError::load(index, format!("{}: {}", path.display(), e)))?
            .to_rgba8();
        let (width, height) = img.dimensions();

        if !size.is_unset() && FrameSize::new(width as i32, height as i32) != size {
            return Err(FrameError::load(
                index,
                format!("{} is {}x{}, expected {}", path.display(), width, height, size),
            ));
        }
        Frame::from_rgba8(index, width, height, img.into_raw())
    }

    fn frame_count(&self, _size: FrameSize) -> Option<usize> {
        Some(self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn temp_sequence(name: &str, count: u8, w: u32, h: u32) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("framecmp-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        for i in 0..count {
            RgbImage::from_pixel(w, h, Rgb([i * 20, 0, 0]))
                .save(dir.join(format!("frame_{:04}.png", i)))
                .unwrap();
        }
        dir
    }

    #[test]
    fn test_decode_sequence() {
        let dir = temp_sequence("decode", 3, 5, 4);
        let seq = ImageSequence::from_glob(&format!("{}/*.png", dir.display())).unwrap();
        assert_eq!(seq.len(), 3);
        assert_eq!(seq.detect_size(), Some(FrameSize::new(5, 4)));
        assert_eq!(seq.frame_count(FrameSize::UNSET), Some(3));

        let frame = seq.decode_frame(2, FrameSize::new(5, 4)).unwrap();
        assert_eq!(frame.index(), 2);
        assert_eq!(*frame.to_rgb8().get_pixel(0, 0), Rgb([40, 0, 0]));

        // Unset geometry accepts any size
        assert!(seq.decode_frame(0, FrameSize::UNSET).is_ok());

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_decode_failures() {
        let dir = temp_sequence("fail", 1, 5, 4);
        let seq = ImageSequence::from_glob(&format!("{}/*.png", dir.display())).unwrap();

        assert!(matches!(
            seq.decode_frame(0, FrameSize::new(6, 4)),
            Err(FrameError::LoadFailure { index: 0, .. })
        ));
        assert!(seq.decode_frame(1, FrameSize::UNSET).is_err());
        assert!(seq.decode_frame(-1, FrameSize::UNSET).is_err());

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_empty_glob() {
        assert!(ImageSequence::from_glob("/nonexistent-framecmp-dir/*.png").is_err());
    }
}
