//! Pixel value annotation at high zoom
//!
//! Above `ANNOTATION_ZOOM_THRESHOLD` every pixel cell is large enough to hold
//! its RGB values as text. Only the cells inside the viewport are labelled.
//!
//! # View space
//!
//! The frame is drawn centred on the origin, `zoom` view units per pixel.
//! The painter's world transform translates the origin to `world_offset`
//! in viewport coordinates (0,0 = top-left corner of the viewport).

use glam::{DVec2, IVec2};
use image::Rgb;

use super::presets::FrameSize;
use super::sampler::is_dark;

/// Minimum zoom (view units per pixel) at which values are drawn
pub const ANNOTATION_ZOOM_THRESHOLD: f64 = 64.0;

pub fn should_annotate(zoom: f64) -> bool {
    zoom >= ANNOTATION_ZOOM_THRESHOLD
}

/// Inclusive pixel range. Empty when a min exceeds its max.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRange {
    pub x_min: i32,
    pub x_max: i32,
    pub y_min: i32,
    pub y_max: i32,
}

impl PixelRange {
    pub const EMPTY: PixelRange = PixelRange { x_min: 0, x_max: -1, y_min: 0, y_max: -1 };

    pub fn is_empty(&self) -> bool {
        self.x_min > self.x_max || self.y_min > self.y_max
    }

    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            (self.x_max - self.x_min + 1) as usize * (self.y_max - self.y_min + 1) as usize
        }
    }

    /// Column-major walk: x outer, y inner
    pub fn iter(&self) -> impl Iterator<Item = IVec2> + use<> {
        let PixelRange { x_min, x_max, y_min, y_max } = *self;
        let ys = if self.is_empty() { 0..=-1 } else { y_min..=y_max };
        (x_min..=x_max).flat_map(move |x| ys.clone().map(move |y| IVec2::new(x, y)))
    }
}

/// Painter state needed to find the visible pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewTransform {
    /// Viewport width/height in view units
    pub viewport_size: DVec2,
    /// Translation of the view origin (frame centre) in viewport coordinates
    pub world_offset: DVec2,
}

impl ViewTransform {
    pub fn new(viewport_size: DVec2, world_offset: DVec2) -> Self {
        Self { viewport_size, world_offset }
    }

    /// Viewport of `viewport_size` with the frame centred in it
    pub fn centered(viewport_size: DVec2) -> Self {
        Self { viewport_size, world_offset: viewport_size / 2.0 }
    }

    pub fn visible_range(&self, zoom: f64, frame_size: FrameSize) -> PixelRange {
        visible_pixel_range(self.viewport_size, zoom, self.world_offset, frame_size)
    }
}

fn clip(v: i64, lo: i64, hi: i64) -> i64 {
    lo.max(hi.min(v))
}

/// Pixels of a `frame_size` frame visible in a viewport of `viewport_size`,
/// clipped to the frame.
pub fn visible_pixel_range(
    viewport_size: DVec2,
    zoom: f64,
    world_offset: DVec2,
    frame_size: FrameSize,
) -> PixelRange {
    if frame_size.area() == 0 || zoom <= 0.0 {
        return PixelRange::EMPTY;
    }

    // Half extent of the drawn frame, in whole view units
    let half_w = (frame_size.width as f64 * zoom).round() as i64 / 2;
    let half_h = (frame_size.height as f64 * zoom).round() as i64 / 2;

    let x_min = ((half_w as f64 - world_offset.x) / zoom) as i64;
    let y_min = ((half_h as f64 - world_offset.y) / zoom) as i64;
    let x_max = ((half_w as f64 - (world_offset.x - viewport_size.x)) / zoom) as i64;
    let y_max = ((half_h as f64 - (world_offset.y - viewport_size.y)) / zoom) as i64;

    let max_x = frame_size.width as i64 - 1;
    let max_y = frame_size.height as i64 - 1;
    PixelRange {
        x_min: clip(x_min, 0, max_x) as i32,
        x_max: clip(x_max, 0, max_x) as i32,
        y_min: clip(y_min, 0, max_y) as i32,
        y_max: clip(y_max, 0, max_y) as i32,
    }
}

/// Centre of pixel `(x, y)` in view space
pub fn pixel_center(pixel: IVec2, zoom: f64, frame_size: FrameSize) -> DVec2 {
    let frame = DVec2::new(frame_size.width as f64, frame_size.height as f64);
    let center_zero = (-frame * zoom + DVec2::splat(zoom)) / 2.0;
    center_zero + pixel.as_dvec2() * zoom
}

/// Text label for one pixel cell
#[derive(Debug, Clone, PartialEq)]
pub struct PixelLabel {
    pub pixel: IVec2,
    pub center: DVec2,
    pub value: Rgb<u8>,
    /// Draw white text (pixel is dark) instead of black
    pub light_text: bool,
}

impl PixelLabel {
    pub fn new(pixel: IVec2, zoom: f64, frame_size: FrameSize, value: Rgb<u8>) -> Self {
        Self {
            pixel,
            center: pixel_center(pixel, zoom, frame_size),
            value,
            light_text: is_dark(value),
        }
    }

    pub fn text(&self) -> String {
        format!("R{}\nG{}\nB{}", self.value[0], self.value[1], self.value[2])
    }
}
