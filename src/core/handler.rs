//! Video handler: current frame, cache and comparison for one sequence
//!
//! **Architecture**: The handler owns the foreground state (current frame slot
//! and its derived RGB buffer) and shares the `FrameCache` with background
//! workers through an `Arc`. Decoding is delegated to an external
//! `FrameDecoder`.
//!
//! **Used by**: renderers (`draw_frame`), comparison views (`calculate_difference`,
//! difference labels), info panels (`pixel_values*`), size controls.
//!
//! # Draw path
//!
//! 1. Requested index already current: use it
//! 2. Cached: make the cached frame current
//! 3. Otherwise decode in the foreground; on failure return `None` and keep
//!    the previous frame current (the display keeps its last state)
//!
//! # Frame size changes
//!
//! A size change writes the geometry, clears the cache (under the geometry
//! lock), invalidates the current frame and emits
//! `HandlerChangedEvent { redraw: true, frame_limits_changed: true }`.
//!
//! The handler keeps its own copy of the geometry, so the draw path never
//! waits on the cache's geometry lock. Only a size change does.

use glam::{DVec2, IVec2};
use image::{Rgb, RgbImage};
use log::{debug, info, trace, warn};
use std::sync::Arc;
use std::time::Duration;

use super::annotation::{ANNOTATION_ZOOM_THRESHOLD, PixelLabel, PixelRange, ViewTransform};
use super::diff::{self, DifferenceStats};
use super::error::{FrameError, Result};
use super::event_bus::EventEmitter;
use super::frame::Frame;
use super::frame_cache::FrameCache;
use super::handler_events::HandlerChangedEvent;
use super::presets::{FrameSize, FRAME_SIZE_PRESETS};
use super::sampler::PixelSampler;
use super::traits::FrameDecoder;
use super::workers::Workers;

/// Name/value pairs shown in info panels
pub type ValuePairList = Vec<(String, String)>;

/// Current-frame slot: at most one frame plus its lazily derived RGB buffer
#[derive(Debug, Default)]
struct CurrentFrame {
    frame: Option<Frame>,
    sampler: PixelSampler,
}

impl CurrentFrame {
    fn index(&self) -> Option<i32> {
        self.frame.as_ref().map(Frame::index)
    }

    fn set(&mut self, frame: Frame) {
        // Same index can come back with new content after a size change
        self.sampler.invalidate();
        self.frame = Some(frame);
    }

    fn invalidate(&mut self) {
        self.frame = None;
        self.sampler.invalidate();
    }

    fn sample(&mut self, point: IVec2) -> Option<Rgb<u8>> {
        let frame = self.frame.as_ref()?;
        self.sampler.sample_at(frame, point).ok()
    }

    fn image(&mut self) -> Option<&RgbImage> {
        let frame = self.frame.as_ref()?;
        Some(self.sampler.image(frame))
    }
}

/// What a renderer draws for one `draw_frame` call
#[derive(Debug, Clone)]
pub struct FramePaint {
    pub frame: Frame,
    /// Size of the frame rectangle in view units, centred on the origin
    pub video_rect_size: DVec2,
    /// Per-pixel value labels, empty below the annotation zoom threshold
    pub labels: Vec<PixelLabel>,
}

/// Output of `calculate_difference`
#[derive(Debug, Clone)]
pub struct DifferenceResult {
    pub image: RgbImage,
    pub stats: DifferenceStats,
    pub info: ValuePairList,
}

pub struct VideoHandler {
    cache: Arc<FrameCache>,
    decoder: Arc<dyn FrameDecoder>,
    current: CurrentFrame,
    // Foreground copy of the cache geometry. Only `set_frame_size` writes
    // both, so reading it never waits on a background decode.
    frame_size: FrameSize,
    emitter: Option<EventEmitter>,
    annotation_zoom: f64,
}

impl std::fmt::Debug for VideoHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoHandler")
            .field("frame_size", &self.frame_size())
            .field("current_frame", &self.current.index())
            .field("cached_frames", &self.cache.len())
            .finish()
    }
}

impl VideoHandler {
    /// Handler without event emission
    pub fn new(decoder: Arc<dyn FrameDecoder>, frame_size: FrameSize) -> Self {
        Self {
            cache: Arc::new(FrameCache::new(frame_size)),
            decoder,
            current: CurrentFrame::default(),
            frame_size,
            emitter: None,
            annotation_zoom: ANNOTATION_ZOOM_THRESHOLD,
        }
    }

    /// Handler emitting size changes immediately and cache changes at most once per `notify_interval`
    pub fn with_events(
        decoder: Arc<dyn FrameDecoder>,
        frame_size: FrameSize,
        emitter: EventEmitter,
        notify_interval: Duration,
    ) -> Self {
        let cache = FrameCache::with_notifications(frame_size, notify_interval, emitter.clone());
        Self {
            cache: Arc::new(cache),
            decoder,
            current: CurrentFrame::default(),
            frame_size,
            emitter: Some(emitter),
            annotation_zoom: ANNOTATION_ZOOM_THRESHOLD,
        }
    }

    /// Zoom from which `draw_frame` adds pixel labels
    pub fn set_annotation_zoom(&mut self, zoom: f64) {
        self.annotation_zoom = zoom;
    }

    pub fn annotation_zoom(&self) -> f64 {
        self.annotation_zoom
    }

    // ===== Geometry =====

    pub fn frame_size(&self) -> FrameSize {
        self.frame_size
    }

    /// Set the active frame size. Returns false if it did not change.
    ///
    /// `emit_signal = false` is for syncing the size from outside (e.g. a
    /// linked handler) without echoing a change event back.
    pub fn set_frame_size(&mut self, size: FrameSize, emit_signal: bool) -> bool {
        if !self.cache.set_frame_size(size) {
            return false;
        }
        self.frame_size = size;
        self.current.invalidate();
        info!("Frame size set to {}", size);
        if emit_signal {
            self.emit(HandlerChangedEvent {
                redraw: true,
                frame_limits_changed: true,
            });
        }
        true
    }

    /// Width/height entered by hand. Returns the matching preset index (0 = custom)
    /// for the size selector, whether or not the size changed.
    pub fn set_custom_size(&mut self, width: i32, height: i32) -> usize {
        let size = FrameSize::new(width, height);
        self.set_frame_size(size, true);
        FRAME_SIZE_PRESETS.find_index(size)
    }

    /// Preset picked from the size selector. "Custom Size" and the current size are ignored.
    pub fn select_preset(&mut self, index: usize) -> bool {
        let size = FRAME_SIZE_PRESETS.size_at(index);
        if size.is_unset() {
            return false;
        }
        self.set_frame_size(size, true)
    }

    /// Preset index matching the current size
    pub fn preset_index(&self) -> usize {
        FRAME_SIZE_PRESETS.find_index(self.frame_size())
    }

    /// Frames available under the current size, if the decoder knows
    pub fn frame_limits(&self) -> Option<usize> {
        self.decoder.frame_count(self.frame_size)
    }

    // ===== Current frame =====

    pub fn current_frame_index(&self) -> Option<i32> {
        self.current.index()
    }

    pub fn current_frame(&self) -> Option<&Frame> {
        self.current.frame.as_ref()
    }

    /// Decode `index` in the foreground and make it current.
    ///
    /// On failure the previous frame stays current and false is returned.
    pub fn load_frame(&mut self, index: i32) -> bool {
        match self.decoder.decode_frame(index, self.frame_size) {
            Ok(frame) => {
                trace!("Loaded frame {}", index);
                self.current.set(frame);
                true
            }
            Err(e) => {
                warn!("Loading frame {} failed: {}", index, e);
                false
            }
        }
    }

    /// Ensure the current frame is `index`: cache first, decoder second.
    pub fn make_current(&mut self, index: i32) -> bool {
        if self.current.index() == Some(index) {
            return true;
        }
        if let Some(frame) = self.cache.get(index) {
            trace!("Frame {} from cache", index);
            self.current.set(frame);
            return true;
        }
        self.load_frame(index) && self.current.index() == Some(index)
    }

    // ===== Drawing =====

    /// Prepare frame `index` for display at `zoom`.
    ///
    /// Returns `None` when the frame could not be loaded; callers keep
    /// showing whatever they drew last.
    pub fn draw_frame(&mut self, index: i32, zoom: f64, view: &ViewTransform) -> Option<FramePaint> {
        if !self.make_current(index) {
            return None;
        }
        let frame_size = self.frame_size;
        let labels = if zoom >= self.annotation_zoom {
            let range = view.visible_range(zoom, frame_size);
            self.pixel_labels(range, zoom, None)
        } else {
            Vec::new()
        };
        let frame = self.current.frame.clone()?;
        Some(FramePaint {
            video_rect_size: DVec2::new(frame_size.width as f64, frame_size.height as f64) * zoom,
            frame,
            labels,
        })
    }

    /// Labels for every pixel in `range`.
    ///
    /// With `other`, each label shows the re-centred difference to the other
    /// handler's current frame instead of the plain value. Pixels missing in
    /// either frame are skipped.
    pub fn pixel_labels(
        &mut self,
        range: PixelRange,
        zoom: f64,
        mut other: Option<&mut VideoHandler>,
    ) -> Vec<PixelLabel> {
        let frame_size = self.frame_size;
        let mut labels = Vec::with_capacity(range.len());
        for pixel in range.iter() {
            let Some(value) = self.current.sample(pixel) else {
                continue;
            };
            let value = match other.as_deref_mut() {
                Some(other) => match other.current.sample(pixel) {
                    Some(other_value) => diff::difference_pixel(value, other_value),
                    None => continue,
                },
                None => value,
            };
            labels.push(PixelLabel::new(pixel, zoom, frame_size, value));
        }
        labels
    }

    // ===== Comparison =====

    /// Difference of frame `index` in this handler against the same index in `other`.
    pub fn calculate_difference(
        &mut self,
        other: &mut VideoHandler,
        index: i32,
        amplification: i32,
        mark_only: bool,
    ) -> Result<DifferenceResult> {
        if !self.make_current(index) {
            return Err(FrameError::load(index, "first sequence"));
        }
        if !other.make_current(index) {
            return Err(FrameError::load(index, "second sequence"));
        }
        let (Some(a), Some(b)) = (self.current.image(), other.current.image()) else {
            return Err(FrameError::load(index, "no current frame"));
        };
        let (image, stats) = diff::difference_image(a, b, amplification, mark_only)?;
        debug!(
            "Difference frame {}: {}x{}, MSE all {}",
            index,
            stats.width,
            stats.height,
            stats.mse_all
        );
        Ok(DifferenceResult {
            image,
            info: stats.info_items(),
            stats,
        })
    }

    /// R/G/B of the current frame at `point`; empty if there is none.
    pub fn pixel_values(&mut self, point: IVec2) -> ValuePairList {
        match self.current.sample(point) {
            Some(px) => rgb_pairs([px[0] as i32, px[1] as i32, px[2] as i32]),
            None => Vec::new(),
        }
    }

    /// Signed R/G/B difference to `other` at `point`; empty outside the overlap.
    pub fn pixel_values_difference(&mut self, point: IVec2, other: &mut VideoHandler) -> ValuePairList {
        let (Some(a), Some(b)) = (self.current.image(), other.current.image()) else {
            return Vec::new();
        };
        diff::pixel_difference(a, b, point).map(rgb_pairs).unwrap_or_default()
    }

    /// Whether overlay text at `point` should be light. False without a frame.
    pub fn is_pixel_dark(&mut self, point: IVec2) -> bool {
        let Some(frame) = self.current.frame.as_ref() else {
            return false;
        };
        self.current.sampler.is_dark(frame, point).unwrap_or(false)
    }

    // ===== Caching =====

    pub fn cache(&self) -> &Arc<FrameCache> {
        &self.cache
    }

    pub fn is_cached(&self, index: i32) -> bool {
        self.cache.contains(index)
    }

    /// Put `index` into the cache on the calling thread
    pub fn cache_frame(&self, index: i32) -> Result<bool> {
        self.cache.ensure(index, &*self.decoder)
    }

    /// Queue caching jobs for `indices` on the worker pool
    pub fn cache_frames_in_background<I>(&self, workers: &Workers, indices: I)
    where
        I: IntoIterator<Item = i32>,
    {
        for index in indices {
            let cache = Arc::clone(&self.cache);
            let decoder = Arc::clone(&self.decoder);
            workers.execute(move || {
                // Failures are logged by the cache
                let _ = cache.ensure(index, &*decoder);
            });
        }
    }

    /// Eviction hook. No policy calls it yet.
    pub fn remove_frame_from_cache(&self, index: i32) {
        debug!("remove_frame_from_cache {}", index);
        self.cache.remove(index);
    }

    fn emit(&self, event: HandlerChangedEvent) {
        if let Some(emitter) = &self.emitter {
            emitter.emit(event);
        }
    }
}

fn rgb_pairs(values: [i32; 3]) -> ValuePairList {
    ["R", "G", "B"]
        .iter()
        .zip(values)
        .map(|(name, v)| (name.to_string(), v.to_string()))
        .collect()
}
