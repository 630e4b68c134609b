//! framecmp - frame-accurate comparison of image sequences
//!
//! Re-exports all modules for use by the binary target.

// Core engine (frames, cache, handler, events, workers)
pub mod core;

// App modules
pub mod cli;
pub mod config;
pub mod decoder;
pub mod runner;

// Re-export commonly used types from core
pub use core::event_bus::{downcast_event, BoxedEvent, EventBus, EventEmitter};
pub use core::frame_cache::FrameCache;
pub use core::handler::VideoHandler;
pub use core::presets::FrameSize;
pub use core::{Frame, FrameDecoder, FrameError};
pub use decoder::ImageSequence;
