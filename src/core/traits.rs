//! Seams to external collaborators.

use super::error::Result;
use super::frame::Frame;
use super::presets::FrameSize;

/// External decoder producing materialized frames.
///
/// Both calls are blocking and must be deterministic for a fixed
/// `(index, size)` pair. `size` is the geometry active when the decode
/// started; the cache holds the geometry lock for the whole caching decode.
pub trait FrameDecoder: Send + Sync {
    /// Decode a frame for immediate display.
    fn decode_frame(&self, index: i32, size: FrameSize) -> Result<Frame>;

    /// Decode a frame for the cache. Decoders with a separate caching path
    /// (own file handle, no display side effects) override this.
    fn decode_frame_for_caching(&self, index: i32, size: FrameSize) -> Result<Frame> {
        self.decode_frame(index, size)
    }

    /// Number of frames available under `size`, if known.
    fn frame_count(&self, _size: FrameSize) -> Option<usize> {
        None
    }
}

impl<F> FrameDecoder for F
where
    F: Fn(i32, FrameSize) -> Result<Frame> + Send + Sync,
{
    fn decode_frame(&self, index: i32, size: FrameSize) -> Result<Frame> {
        self(index, size)
    }
}
