//! RGB difference engine
//!
//! Compares two frames over their overlap rectangle
//! `[0, min(w1,w2)) x [0, min(h1,h2))`. Pixels outside the overlap are never read.
//!
//! Output modes for the difference image:
//! - mark only: channel is 255 where the delta is non-zero, else 0
//! - otherwise: `clip(128 + delta * amplification, 0, 255)`
//!
//! MSE is accumulated per channel in the same pass. Rows are processed in
//! parallel with rayon and the per-row sums reduced at the end.

use glam::IVec2;
use image::{Rgb, RgbImage};
use rayon::prelude::*;

use super::error::{FrameError, Result};

/// Mid-grey: zero difference in the re-centred view
const DIFF_CENTER: i32 = 128;

/// Mean squared error per channel over an overlap rectangle
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DifferenceStats {
    pub mse_r: f64,
    pub mse_g: f64,
    pub mse_b: f64,
    pub mse_all: f64,
    pub width: u32,
    pub height: u32,
}

impl DifferenceStats {
    fn from_sums(sums: [u64; 3], width: u32, height: u32) -> Self {
        let area = width as f64 * height as f64;
        let mse_r = sums[0] as f64 / area;
        let mse_g = sums[1] as f64 / area;
        let mse_b = sums[2] as f64 / area;
        Self {
            mse_r,
            mse_g,
            mse_b,
            mse_all: mse_r + mse_g + mse_b,
            width,
            height,
        }
    }

    /// Name/value pairs for the info panel
    pub fn info_items(&self) -> Vec<(String, String)> {
        vec![
            ("Difference Type".into(), "RGB".into()),
            ("MSE R".into(), self.mse_r.to_string()),
            ("MSE G".into(), self.mse_g.to_string()),
            ("MSE B".into(), self.mse_b.to_string()),
            ("MSE All".into(), self.mse_all.to_string()),
        ]
    }
}

/// Overlap rectangle of two images
pub fn overlap(a: &RgbImage, b: &RgbImage) -> (u32, u32) {
    (a.width().min(b.width()), a.height().min(b.height()))
}

#[inline]
fn deltas(p1: &Rgb<u8>, p2: &Rgb<u8>) -> [i32; 3] {
    [
        p1[0] as i32 - p2[0] as i32,
        p1[1] as i32 - p2[1] as i32,
        p1[2] as i32 - p2[2] as i32,
    ]
}

#[inline]
fn clip(v: i32, lo: i32, hi: i32) -> i32 {
    lo.max(hi.min(v))
}

#[inline]
fn map_delta(delta: i32, amplification: i32, mark_only: bool) -> u8 {
    if mark_only {
        if delta != 0 { 255 } else { 0 }
    } else {
        clip(DIFF_CENTER.saturating_add(delta.saturating_mul(amplification)), 0, 255) as u8
    }
}

/// Signed `A - B` per channel at `point`, or `None` outside the overlap.
pub fn pixel_difference(a: &RgbImage, b: &RgbImage, point: IVec2) -> Option<[i32; 3]> {
    let (width, height) = overlap(a, b);
    if point.x < 0 || point.y < 0 || point.x as u32 >= width || point.y as u32 >= height {
        return None;
    }
    let (x, y) = (point.x as u32, point.y as u32);
    Some(deltas(a.get_pixel(x, y), b.get_pixel(x, y)))
}

/// Re-centred difference colour of two pixels, as shown in the difference view.
pub fn difference_pixel(p1: Rgb<u8>, p2: Rgb<u8>) -> Rgb<u8> {
    let d = deltas(&p1, &p2);
    Rgb(d.map(|c| map_delta(c, 1, false)))
}

/// Difference image of the overlap plus MSE statistics.
pub fn difference_image(
    a: &RgbImage,
    b: &RgbImage,
    amplification: i32,
    mark_only: bool,
) -> Result<(RgbImage, DifferenceStats)> {
    let (width, height) = overlap(a, b);
    if width == 0 || height == 0 {
        return Err(FrameError::EmptyOverlap);
    }

    let row_len = width as usize * 3;
    let mut out = vec![0u8; row_len * height as usize];

    let sums = out
        .par_chunks_mut(row_len)
        .enumerate()
        .map(|(y, row)| {
            let y = y as u32;
            let mut acc = [0u64; 3];
            for x in 0..width {
                let d = deltas(a.get_pixel(x, y), b.get_pixel(x, y));
                let base = x as usize * 3;
                for c in 0..3 {
                    row[base + c] = map_delta(d[c], amplification, mark_only);
                    acc[c] += (d[c] * d[c]) as u64;
                }
            }
            acc
        })
        .reduce(|| [0u64; 3], |l, r| [l[0] + r[0], l[1] + r[1], l[2] + r[2]]);

    let img = RgbImage::from_raw(width, height, out).ok_or(FrameError::EmptyOverlap)?;
    Ok((img, DifferenceStats::from_sums(sums, width, height)))
}

/// Mean squared error over the first `count` samples of two byte buffers.
///
/// Returns 0 for `count == 0`. `count` is clamped to the shorter buffer.
pub fn compute_mse(a: &[u8], b: &[u8], count: usize) -> f32 {
    let n = count.min(a.len()).min(b.len());
    if n == 0 {
        return 0.0;
    }
    let sum: f32 = a[..n]
        .iter()
        .zip(&b[..n])
        .map(|(&x, &y)| {
            let d = x as f32 - y as f32;
            d * d
        })
        .sum();
    sum / n as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noise(w: u32, h: u32, seed: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| {
            let v = x.wrapping_mul(31) ^ y.wrapping_mul(17) ^ seed;
            Rgb([(v % 251) as u8, (v * 3 % 256) as u8, (v * 7 % 241) as u8])
        })
    }

    #[test]
    fn test_pixel_difference_antisymmetric() {
        let a = noise(6, 5, 1);
        let b = noise(4, 7, 99);
        for y in 0..5 {
            for x in 0..4 {
                let p = IVec2::new(x, y);
                let ab = pixel_difference(&a, &b, p).unwrap();
                let ba = pixel_difference(&b, &a, p).unwrap();
                assert_eq!(ab, ba.map(|c| -c));
            }
        }
    }

    #[test]
    fn test_pixel_difference_outside_overlap() {
        let a = noise(6, 5, 1);
        let b = noise(4, 7, 2);
        assert_eq!(pixel_difference(&a, &b, IVec2::new(4, 0)), None);
        assert_eq!(pixel_difference(&a, &b, IVec2::new(0, 5)), None);
        assert_eq!(pixel_difference(&a, &b, IVec2::new(-1, 0)), None);
    }

    #[test]
    fn test_identical_frames() {
        let a = noise(8, 8, 5);
        let (img, stats) = difference_image(&a, &a, 1, false).unwrap();
        assert!(img.pixels().all(|p| *p == Rgb([128, 128, 128])));
        assert_eq!((stats.mse_r, stats.mse_g, stats.mse_b, stats.mse_all), (0.0, 0.0, 0.0, 0.0));

        let (mask, _) = difference_image(&a, &a, 4, true).unwrap();
        assert!(mask.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn test_difference_modes() {
        let a = RgbImage::from_pixel(2, 2, Rgb([100, 50, 200]));
        let b = RgbImage::from_pixel(3, 2, Rgb([90, 50, 220]));

        // dR = 10, dG = 0, dB = -20
        let (plain, stats) = difference_image(&a, &b, 1, false).unwrap();
        assert_eq!(plain.dimensions(), (2, 2));
        assert_eq!(*plain.get_pixel(0, 0), Rgb([138, 128, 108]));
        assert_eq!(stats.mse_r, 100.0);
        assert_eq!(stats.mse_g, 0.0);
        assert_eq!(stats.mse_b, 400.0);
        assert_eq!(stats.mse_all, 500.0);

        let (amp, _) = difference_image(&a, &b, 10, false).unwrap();
        assert_eq!(*amp.get_pixel(1, 1), Rgb([228, 128, 0]));

        let (mask, _) = difference_image(&a, &b, 10, true).unwrap();
        assert_eq!(*mask.get_pixel(1, 0), Rgb([255, 0, 255]));
    }

    #[test]
    fn test_empty_overlap() {
        let a = RgbImage::new(0, 4);
        let b = RgbImage::new(4, 4);
        assert_eq!(difference_image(&a, &b, 1, false).unwrap_err(), FrameError::EmptyOverlap);
    }

    #[test]
    fn test_info_items() {
        let a = RgbImage::from_pixel(1, 1, Rgb([3, 0, 0]));
        let b = RgbImage::from_pixel(1, 1, Rgb([0, 0, 0]));
        let (_, stats) = difference_image(&a, &b, 1, false).unwrap();
        let items = stats.info_items();
        assert_eq!(items[0], ("Difference Type".to_string(), "RGB".to_string()));
        assert_eq!(items[1], ("MSE R".to_string(), "9".to_string()));
        assert_eq!(items[4], ("MSE All".to_string(), "9".to_string()));
    }

    #[test]
    fn test_difference_pixel() {
        assert_eq!(difference_pixel(Rgb([255, 0, 10]), Rgb([0, 255, 10])), Rgb([255, 0, 128]));
    }

    #[test]
    fn test_compute_mse() {
        let buf: Vec<u8> = (0..=255).collect();
        assert_eq!(compute_mse(&buf, &buf, buf.len()), 0.0);

        let shifted: Vec<u8> = buf.iter().map(|v| v.saturating_add(3)).collect();
        assert_eq!(compute_mse(&buf[..200], &shifted[..200], 200), 9.0);

        assert_eq!(compute_mse(&buf, &shifted, 0), 0.0);
    }
}
