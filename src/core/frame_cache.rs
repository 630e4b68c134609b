//! Frame cache keyed by frame index, coherent with the active geometry
//!
//! **Why**: Scrubbing revisits the same frames; decoding them again is the
//! expensive part. Background workers fill the cache while the foreground
//! thread displays.
//!
//! **Used by**: VideoHandler (draw lookups, background caching), workers
//!
//! # Geometry lock
//!
//! The active `FrameSize` lives behind a mutex that is held:
//! - while the geometry is written (and the cache cleared, in the same critical section)
//! - for the whole decode-and-insert of `ensure()`
//!
//! So a frame decoded under an old geometry can never land in the cache after
//! the geometry changed: either the decode finished first and the clear removes
//! it, or the write happened first and the decode sees the new size.
//!
//! Lock order is always geometry -> frames.
//!
//! # Notifications
//!
//! Each insertion made by `ensure()` triggers a debounced `CacheChangedEvent`.
//! A burst of insertions inside one interval produces one event.
//!
//! There is no capacity bound. `remove()` is the hook for an eviction policy.

use log::{debug, trace, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use super::debounce::Debouncer;
use super::error::{FrameError, Result};
use super::event_bus::EventEmitter;
use super::frame::Frame;
use super::handler_events::CacheChangedEvent;
use super::presets::FrameSize;
use super::traits::FrameDecoder;

/// Default notification interval
pub const CACHE_NOTIFY_INTERVAL: Duration = Duration::from_secs(1);

/// Hit/miss counters for `ensure()` calls
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheStats {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.hits() + self.misses();
        if total == 0 { 0.0 } else { self.hits() as f64 / total as f64 }
    }
}

#[derive(Debug)]
pub struct FrameCache {
    frames: Arc<RwLock<HashMap<i32, Frame>>>,
    geometry: Mutex<FrameSize>,
    stats: CacheStats,
    notifier: Option<Debouncer>,
}

impl FrameCache {
    /// Cache without change notifications
    pub fn new(frame_size: FrameSize) -> Self {
        Self {
            frames: Arc::new(RwLock::new(HashMap::new())),
            geometry: Mutex::new(frame_size),
            stats: CacheStats::default(),
            notifier: None,
        }
    }

    /// Cache that emits `CacheChangedEvent` through `emitter`, at most once per `interval`
    pub fn with_notifications(frame_size: FrameSize, interval: Duration, emitter: EventEmitter) -> Self {
        let mut cache = Self::new(frame_size);
        let frames = Arc::clone(&cache.frames);
        cache.notifier = Some(Debouncer::new(interval, move || {
            let cached_frames = frames.read().unwrap_or_else(|e| e.into_inner()).len();
            emitter.emit(CacheChangedEvent { cached_frames });
        }));
        debug!(
            "FrameCache created: size={}, notify interval={}ms",
            frame_size,
            interval.as_millis()
        );
        cache
    }

    pub fn frame_size(&self) -> FrameSize {
        *self.geometry.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Change the active geometry and drop every cached frame.
    ///
    /// Returns false (and keeps the cache) if the size is unchanged.
    pub fn set_frame_size(&self, size: FrameSize) -> bool {
        let mut geometry = self.geometry.lock().unwrap_or_else(|e| e.into_inner());
        if *geometry == size {
            return false;
        }
        debug!("FrameCache geometry {} -> {}", *geometry, size);
        *geometry = size;
        self.frames.write().unwrap_or_else(|e| e.into_inner()).clear();
        true
    }

    /// Lookup without side effects
    pub fn get(&self, index: i32) -> Option<Frame> {
        self.frames
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&index)
            .cloned()
    }

    pub fn contains(&self, index: i32) -> bool {
        self.frames
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(&index)
    }

    /// Decode and insert `index` unless it is already cached.
    ///
    /// Returns `Ok(true)` if this call inserted the frame, `Ok(false)` on a hit.
    /// Decoder failures leave the cache untouched.
    pub fn ensure<D>(&self, index: i32, decoder: &D) -> Result<bool>
    where
        D: FrameDecoder + ?Sized,
    {
        if index < 0 {
            return Err(FrameError::load(index, "negative frame index"));
        }
        if self.contains(index) {
            self.stats.record_hit();
            return Ok(false);
        }

        let geometry = self.geometry.lock().unwrap_or_else(|e| e.into_inner());
        // Another worker may have inserted it while we waited for the lock
        if self.contains(index) {
            self.stats.record_hit();
            return Ok(false);
        }
        self.stats.record_miss();

        let frame = match decoder.decode_frame_for_caching(index, *geometry) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Caching frame {} failed: {}", index, e);
                return Err(e);
            }
        };
        self.frames
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(index)
            .or_insert(frame);
        drop(geometry);

        trace!("Cached frame {}", index);
        if let Some(notifier) = &self.notifier {
            notifier.trigger();
        }
        Ok(true)
    }

    /// Remove a single frame. No-op if absent.
    pub fn remove(&self, index: i32) -> Option<Frame> {
        let removed = self
            .frames
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&index);
        if removed.is_some() {
            trace!("Removed frame {} from cache", index);
        }
        removed
    }

    pub fn clear(&self) {
        let mut frames = self.frames.write().unwrap_or_else(|e| e.into_inner());
        if !frames.is_empty() {
            debug!("Cleared frame cache ({} frames)", frames.len());
        }
        frames.clear();
    }

    pub fn len(&self) -> usize {
        self.frames.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached indices in ascending order
    pub fn cached_indices(&self) -> Vec<i32> {
        let mut indices: Vec<i32> = self
            .frames
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .copied()
            .collect();
        indices.sort_unstable();
        indices
    }

    /// Total bytes held by cached frames
    pub fn mem(&self) -> usize {
        self.frames
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .map(Frame::mem)
            .sum()
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event_bus::{downcast_event, EventBus};
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    fn counting_decoder(calls: Arc<AtomicUsize>) -> impl Fn(i32, FrameSize) -> Result<Frame> + Send + Sync {
        move |index, size| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Frame::solid(index, size.width as u32, size.height as u32, [index as u8, 0, 0]))
        }
    }

    #[test]
    fn test_ensure_then_get() {
        let cache = FrameCache::new(FrameSize::new(4, 4));
        let calls = Arc::new(AtomicUsize::new(0));
        let decoder = counting_decoder(Arc::clone(&calls));

        assert!(cache.get(5).is_none());
        assert!(cache.ensure(5, &decoder).unwrap());
        let frame = cache.get(5).unwrap();
        assert_eq!(frame.index(), 5);
        assert_eq!(frame.size(), FrameSize::new(4, 4));

        // Second ensure is a hit, decoder not called again
        assert!(!cache.ensure(5, &decoder).unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().hits(), 1);
        assert_eq!(cache.stats().misses(), 1);
        assert_eq!(cache.stats().hit_rate(), 0.5);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_geometry_change_clears() {
        let cache = FrameCache::new(FrameSize::new(4, 4));
        let calls = Arc::new(AtomicUsize::new(0));
        let decoder = counting_decoder(calls);
        cache.ensure(5, &decoder).unwrap();

        assert!(!cache.set_frame_size(FrameSize::new(4, 4)));
        assert!(cache.get(5).is_some());

        assert!(cache.set_frame_size(FrameSize::new(8, 2)));
        assert!(cache.get(5).is_none());
        assert_eq!(cache.frame_size(), FrameSize::new(8, 2));

        // Re-decoded under the new geometry
        cache.ensure(5, &decoder).unwrap();
        assert_eq!(cache.get(5).unwrap().size(), FrameSize::new(8, 2));
    }

    #[test]
    fn test_decode_failure_leaves_cache_untouched() {
        let cache = FrameCache::new(FrameSize::new(2, 2));
        let failing = |index: i32, _size: FrameSize| -> Result<Frame> {
            Err(FrameError::load(index, "corrupt"))
        };
        let err = cache.ensure(3, &failing).unwrap_err();
        assert!(matches!(err, FrameError::LoadFailure { index: 3, .. }));
        assert!(cache.is_empty());
        assert!(cache.ensure(-1, &failing).is_err());
    }

    #[test]
    fn test_remove_and_clear() {
        let cache = FrameCache::new(FrameSize::new(2, 2));
        let decoder = counting_decoder(Arc::new(AtomicUsize::new(0)));
        for i in [3, 1, 2] {
            cache.ensure(i, &decoder).unwrap();
        }
        assert_eq!(cache.cached_indices(), vec![1, 2, 3]);
        assert_eq!(cache.mem(), 3 * 2 * 2 * 4);

        assert!(cache.remove(2).is_some());
        assert!(cache.remove(2).is_none());
        assert_eq!(cache.cached_indices(), vec![1, 3]);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_ensure_decodes_once() {
        let cache = Arc::new(FrameCache::new(FrameSize::new(2, 2)));
        let calls = Arc::new(AtomicUsize::new(0));
        let decoder = Arc::new(counting_decoder(Arc::clone(&calls)));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let decoder = Arc::clone(&decoder);
                thread::spawn(move || cache.ensure(9, &*decoder).unwrap())
            })
            .collect();
        let inserted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&inserted| inserted)
            .count();

        assert_eq!(inserted, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_size_change_during_background_ensure() {
        use crate::core::workers::Workers;

        let cache = Arc::new(FrameCache::new(FrameSize::new(4, 4)));
        let slow = Arc::new(|index: i32, size: FrameSize| -> Result<Frame> {
            thread::sleep(Duration::from_millis(2));
            Ok(Frame::solid(index, size.width as u32, size.height as u32, [1, 2, 3]))
        });

        let workers = Workers::new(4);
        for index in 0..200 {
            let cache = Arc::clone(&cache);
            let slow = Arc::clone(&slow);
            workers.execute(move || {
                let _ = cache.ensure(index, &*slow);
            });
        }

        let resizer = {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                let sizes = [FrameSize::new(2, 3), FrameSize::new(4, 4), FrameSize::new(5, 1)];
                for i in 0..30 {
                    cache.set_frame_size(sizes[i % sizes.len()]);
                    thread::sleep(Duration::from_millis(3));
                }
            })
        };
        resizer.join().unwrap();
        assert!(workers.wait_idle(Duration::from_secs(10)));

        cache.ensure(999, &*slow).unwrap();
        let geometry = cache.frame_size();
        for index in cache.cached_indices() {
            assert_eq!(cache.get(index).unwrap().size(), geometry, "frame {}", index);
        }
    }

    #[test]
    fn test_burst_of_insertions_notifies_once() {
        let bus = EventBus::new();
        let notified = Arc::new(AtomicUsize::new(0));
        let n = Arc::clone(&notified);
        bus.subscribe::<CacheChangedEvent, _>(move |_| {
            n.fetch_add(1, Ordering::SeqCst);
        });

        let cache = FrameCache::with_notifications(
            FrameSize::new(2, 2),
            Duration::from_millis(100),
            bus.emitter(),
        );
        let decoder = counting_decoder(Arc::new(AtomicUsize::new(0)));
        for i in 0..3 {
            cache.ensure(i, &decoder).unwrap();
        }
        thread::sleep(Duration::from_millis(400));

        assert_eq!(notified.load(Ordering::SeqCst), 1);
        let events = bus.poll();
        assert_eq!(events.len(), 1);
        assert_eq!(
            downcast_event::<CacheChangedEvent>(&events[0]),
            Some(&CacheChangedEvent { cached_frames: 3 })
        );
    }
}
