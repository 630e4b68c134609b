//! Events emitted by `VideoHandler` and `FrameCache`.

/// Handler content changed.
///
/// Geometry changes emit `{ redraw: true, frame_limits_changed: true }`:
/// the picture must be redrawn and the number of frames in the sequence may
/// have changed with the new frame size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HandlerChangedEvent {
    pub redraw: bool,
    pub frame_limits_changed: bool,
}

/// Background caching changed the cache contents. Debounced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheChangedEvent {
    pub cached_frames: usize,
}
