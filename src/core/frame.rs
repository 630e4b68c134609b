//! Materialized frames with multi-format pixel buffers (U8, F16, F32)
//!
//! **Why**: Decoders hand back whatever precision they produce:
//! - 8-bit sources (PNG/JPEG, converted YUV): RGBA u8
//! - half-float sources: RGBA `half::f16`
//! - float sources: RGBA f32
//!
//! **Used by**: FrameCache (stored by index), PixelSampler (converted on demand
//! to an indexable RGB buffer), decoders (construction).
//!
//! A `Frame` is immutable once built. Cloning shares the buffer.

use half::f16 as F16;
use image::{Rgb, RgbImage};
use std::sync::Arc;

use super::error::{FrameError, Result};
use super::presets::FrameSize;

/// Pixel buffer in the decoder's native layout, always 4 channels (RGBA)
#[derive(Debug, Clone)]
pub enum PixelBuffer {
    U8(Vec<u8>),
    F16(Vec<F16>),
    F32(Vec<f32>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgba8,
    RgbaF16,
    RgbaF32,
}

impl PixelBuffer {
    fn len(&self) -> usize {
        match self {
            PixelBuffer::U8(v) => v.len(),
            PixelBuffer::F16(v) => v.len(),
            PixelBuffer::F32(v) => v.len(),
        }
    }

    fn format(&self) -> PixelFormat {
        match self {
            PixelBuffer::U8(_) => PixelFormat::Rgba8,
            PixelBuffer::F16(_) => PixelFormat::RgbaF16,
            PixelBuffer::F32(_) => PixelFormat::RgbaF32,
        }
    }
}

/// Fully decoded, displayable frame for one frame index
#[derive(Debug, Clone)]
pub struct Frame {
    index: i32,
    width: u32,
    height: u32,
    buffer: Arc<PixelBuffer>,
}

impl Frame {
    /// Wrap a native RGBA buffer. Fails if the buffer length does not match the size.
    pub fn new(index: i32, width: u32, height: u32, buffer: PixelBuffer) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if buffer.len() != expected {
            return Err(FrameError::load(
                index,
                format!(
                    "buffer holds {} samples, {}x{} RGBA needs {}",
                    buffer.len(),
                    width,
                    height,
                    expected
                ),
            ));
        }
        Ok(Self {
            index,
            width,
            height,
            buffer: Arc::new(buffer),
        })
    }

    pub fn from_rgba8(index: i32, width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        Self::new(index, width, height, PixelBuffer::U8(data))
    }

    /// Build an opaque RGBA8 frame from an RGB image
    pub fn from_rgb_image(index: i32, img: &RgbImage) -> Self {
        let (width, height) = img.dimensions();
        let mut data = Vec::with_capacity(width as usize * height as usize * 4);
        for px in img.pixels() {
            data.extend_from_slice(&[px[0], px[1], px[2], 255]);
        }
        Self {
            index,
            width,
            height,
            buffer: Arc::new(PixelBuffer::U8(data)),
        }
    }

    /// Single-colour frame
    pub fn solid(index: i32, width: u32, height: u32, rgb: [u8; 3]) -> Self {
        Self::from_rgb_image(index, &RgbImage::from_pixel(width, height, Rgb(rgb)))
    }

    pub fn index(&self) -> i32 {
        self.index
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> FrameSize {
        FrameSize::new(self.width as i32, self.height as i32)
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.buffer.format()
    }

    /// Memory size in bytes
    pub fn mem(&self) -> usize {
        match &*self.buffer {
            PixelBuffer::U8(v) => v.len(),
            PixelBuffer::F16(v) => v.len() * 2,
            PixelBuffer::F32(v) => v.len() * 4,
        }
    }

    /// Convert the native buffer into an 8-bit RGB image (alpha dropped,
    /// float channels clamped to 0..1 then scaled).
    pub fn to_rgb8(&self) -> RgbImage {
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize * 3);
        match &*self.buffer {
            PixelBuffer::U8(v) => {
                for px in v.chunks_exact(4) {
                    out.extend_from_slice(&px[..3]);
                }
            }
            PixelBuffer::F16(v) => {
                for px in v.chunks_exact(4) {
                    out.extend(px[..3].iter().map(|c| float_to_u8(c.to_f32())));
                }
            }
            PixelBuffer::F32(v) => {
                for px in v.chunks_exact(4) {
                    out.extend(px[..3].iter().map(|&c| float_to_u8(c)));
                }
            }
        }
        // Length is validated at construction
        RgbImage::from_raw(self.width, self.height, out)
            .unwrap_or_else(|| RgbImage::new(self.width, self.height))
    }
}

fn float_to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_size_validated() {
        let err = Frame::from_rgba8(3, 2, 2, vec![0; 15]).unwrap_err();
        assert!(matches!(err, FrameError::LoadFailure { index: 3, .. }));
        assert!(Frame::from_rgba8(3, 2, 2, vec![0; 16]).is_ok());
    }

    #[test]
    fn test_solid_frame() {
        let frame = Frame::solid(7, 4, 3, [10, 20, 30]);
        assert_eq!(frame.index(), 7);
        assert_eq!(frame.size(), FrameSize::new(4, 3));
        assert_eq!(frame.pixel_format(), PixelFormat::Rgba8);
        assert_eq!(frame.mem(), 4 * 3 * 4);
        assert_eq!(*frame.to_rgb8().get_pixel(3, 2), Rgb([10, 20, 30]));
    }

    #[test]
    fn test_float_conversion() {
        let f32_frame =
            Frame::new(0, 1, 1, PixelBuffer::F32(vec![1.0, 0.5, -2.0, 1.0])).unwrap();
        assert_eq!(*f32_frame.to_rgb8().get_pixel(0, 0), Rgb([255, 128, 0]));

        let half = [1.0f32, 0.0, 2.0, 1.0].map(F16::from_f32).to_vec();
        let f16_frame = Frame::new(0, 1, 1, PixelBuffer::F16(half)).unwrap();
        assert_eq!(f16_frame.mem(), 8);
        assert_eq!(*f16_frame.to_rgb8().get_pixel(0, 0), Rgb([255, 0, 255]));
    }
}
