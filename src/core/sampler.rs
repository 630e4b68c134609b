//! Per-pixel RGB access on materialized frames.
//!
//! Frames keep their decoder-native buffer. The first sample after the current
//! frame changes converts it once into an indexable `RgbImage`; the result is
//! tagged with the frame index and reused until a different index shows up or
//! `invalidate()` is called.

use glam::IVec2;
use image::{Rgb, RgbImage};
use log::trace;

use super::error::{FrameError, Result};
use super::frame::Frame;

/// Threshold below which all three channels count as "dark"
const DARK_LEVEL: u8 = 128;

#[derive(Debug)]
struct DerivedImage {
    frame_idx: i32,
    image: RgbImage,
}

/// Lazily derived RGB view of one frame
#[derive(Debug, Default)]
pub struct PixelSampler {
    derived: Option<DerivedImage>,
    conversions: u64,
}

impl PixelSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the derived buffer. Next access converts again.
    pub fn invalidate(&mut self) {
        self.derived = None;
    }

    /// Number of native -> RGB conversions performed so far
    pub fn conversions(&self) -> u64 {
        self.conversions
    }

    /// Indexable RGB buffer for `frame`, converting if the cached one belongs to another index.
    pub fn image(&mut self, frame: &Frame) -> &RgbImage {
        let stale = self
            .derived
            .as_ref()
            .is_none_or(|d| d.frame_idx != frame.index());
        if stale {
            self.derived = None;
        }
        let conversions = &mut self.conversions;
        let derived = self.derived.get_or_insert_with(|| {
            trace!("PixelSampler: converting frame {}", frame.index());
            *conversions += 1;
            DerivedImage {
                frame_idx: frame.index(),
                image: frame.to_rgb8(),
            }
        });
        &derived.image
    }

    pub fn sample(&mut self, frame: &Frame, x: i64, y: i64) -> Result<Rgb<u8>> {
        let img = self.image(frame);
        let (width, height) = img.dimensions();
        if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
            return Err(FrameError::OutOfRange { x, y, width, height });
        }
        Ok(*img.get_pixel(x as u32, y as u32))
    }

    pub fn sample_at(&mut self, frame: &Frame, point: IVec2) -> Result<Rgb<u8>> {
        self.sample(frame, point.x as i64, point.y as i64)
    }

    /// True when the pixel is dark enough to need light overlay text
    pub fn is_dark(&mut self, frame: &Frame, point: IVec2) -> Result<bool> {
        self.sample_at(frame, point).map(is_dark)
    }
}

pub fn is_dark(px: Rgb<u8>) -> bool {
    px.0.iter().all(|&c| c < DARK_LEVEL)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(index: i32) -> Frame {
        let img = RgbImage::from_fn(4, 2, |x, y| Rgb([x as u8 * 50, y as u8 * 100, 7]));
        Frame::from_rgb_image(index, &img)
    }

    #[test]
    fn test_sample_values() {
        let frame = gradient(0);
        let mut sampler = PixelSampler::new();
        assert_eq!(sampler.sample(&frame, 3, 1).unwrap(), Rgb([150, 100, 7]));
        assert_eq!(sampler.sample_at(&frame, IVec2::new(1, 0)).unwrap(), Rgb([50, 0, 7]));
    }

    #[test]
    fn test_out_of_range() {
        let frame = gradient(0);
        let mut sampler = PixelSampler::new();
        assert_eq!(
            sampler.sample(&frame, 4, 0),
            Err(FrameError::OutOfRange { x: 4, y: 0, width: 4, height: 2 })
        );
        assert!(sampler.sample(&frame, -1, 0).is_err());
        assert!(sampler.sample(&frame, 0, 2).is_err());
    }

    #[test]
    fn test_conversion_is_lazy_and_keyed_by_index() {
        let mut sampler = PixelSampler::new();
        assert_eq!(sampler.conversions(), 0);

        let a = gradient(1);
        sampler.sample(&a, 0, 0).unwrap();
        sampler.sample(&a, 1, 1).unwrap();
        assert_eq!(sampler.conversions(), 1);

        let b = Frame::solid(2, 4, 2, [9, 9, 9]);
        assert_eq!(sampler.sample(&b, 0, 0).unwrap(), Rgb([9, 9, 9]));
        assert_eq!(sampler.conversions(), 2);

        sampler.invalidate();
        sampler.sample(&b, 0, 0).unwrap();
        assert_eq!(sampler.conversions(), 3);
    }

    #[test]
    fn test_is_dark() {
        let mut sampler = PixelSampler::new();
        let dark = Frame::solid(0, 1, 1, [127, 127, 127]);
        assert!(sampler.is_dark(&dark, IVec2::ZERO).unwrap());
        assert!(!is_dark(Rgb([0, 128, 0])));
        assert!(is_dark(Rgb([0, 0, 0])));
    }
}
