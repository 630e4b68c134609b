//! Error taxonomy for the frame cache and comparison engine.
//!
//! None of these are fatal: load failures degrade to "nothing drawn this pass",
//! out-of-range samples to "no data for this pixel". Only `EmptyOverlap` is
//! surfaced to callers of the difference engine, since zero statistics would be
//! indistinguishable from two identical frames.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Pixel coordinate outside the frame. Callers are expected to clip first.
    #[error("pixel ({x},{y}) out of range for {width}x{height} frame")]
    OutOfRange {
        x: i64,
        y: i64,
        width: u32,
        height: u32,
    },

    /// Difference requested between frames that share no pixels.
    #[error("frames have no overlapping pixels")]
    EmptyOverlap,

    /// External decoder could not materialize the requested index.
    #[error("failed to load frame {index}: {reason}")]
    LoadFailure { index: i32, reason: String },
}

impl FrameError {
    pub fn load(index: i32, reason: impl Into<String>) -> Self {
        FrameError::LoadFailure {
            index,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
