//! Core engine modules - frames, cache, comparison, events, workers
//!
//! These modules form the comparison engine, independent of any UI.

pub mod annotation;
pub mod debounce;
pub mod diff;
pub mod error;
pub mod event_bus;
pub mod frame;
pub mod frame_cache;
pub mod handler;
pub mod handler_events;
pub mod presets;
pub mod sampler;
pub mod traits;
pub mod workers;

// Re-exports for convenience
pub use annotation::{PixelLabel, PixelRange, ViewTransform};
pub use debounce::Debouncer;
pub use diff::DifferenceStats;
pub use error::{FrameError, Result};
pub use event_bus::{EventBus, EventEmitter};
pub use frame::{Frame, PixelBuffer, PixelFormat};
pub use frame_cache::{CacheStats, FrameCache};
pub use handler::{DifferenceResult, FramePaint, VideoHandler};
pub use handler_events::{CacheChangedEvent, HandlerChangedEvent};
pub use presets::{FrameSize, FRAME_SIZE_PRESETS};
pub use traits::FrameDecoder;
pub use workers::Workers;
