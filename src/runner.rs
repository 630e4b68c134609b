//! Sequence comparison runner used by the `framecmp` binary.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::cli::Args;
use crate::config::Settings;
use crate::core::diff::DifferenceStats;
use crate::core::event_bus::EventBus;
use crate::core::handler::VideoHandler;
use crate::core::handler_events::CacheChangedEvent;
use crate::core::presets::FrameSize;
use crate::core::workers::Workers;
use crate::decoder::ImageSequence;

/// Upper bound for `--cache-ahead` before comparing anyway
const CACHE_AHEAD_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, Default)]
pub struct CompareOptions {
    pub size: Option<FrameSize>,
    pub frames: Option<usize>,
    pub amplification: i32,
    pub mark_only: bool,
    pub out_dir: Option<PathBuf>,
    pub cache_ahead: bool,
}

impl CompareOptions {
    /// CLI flags override settings
    pub fn from_args(args: &Args, settings: &Settings) -> Self {
        Self {
            size: args.size,
            frames: args.frames,
            amplification: args.amplify.unwrap_or(settings.amplification),
            mark_only: args.mark || settings.mark_differences,
            out_dir: args.out_dir.clone(),
            cache_ahead: args.cache_ahead,
        }
    }
}

/// Result for one frame index
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub index: i32,
    pub info: Vec<(String, String)>,
    pub stats: Option<DifferenceStats>,
    pub error: Option<String>,
}

/// Handler for one sequence with the user's settings applied
fn build_handler(
    sequence: ImageSequence,
    size: FrameSize,
    bus: &EventBus,
    settings: &Settings,
) -> VideoHandler {
    let mut handler = VideoHandler::with_events(
        Arc::new(sequence),
        size,
        bus.emitter(),
        settings.cache_notify_interval(),
    );
    handler.set_annotation_zoom(settings.annotation_zoom);
    handler
}

/// Compare `seq_a` against `seq_b` frame by frame.
///
/// Frames that fail to load or do not overlap are reported, not fatal.
pub fn compare_sequences(
    seq_a: ImageSequence,
    seq_b: ImageSequence,
    options: &CompareOptions,
    settings: &Settings,
) -> Result<Vec<FrameReport>> {
    let size = options
        .size
        .or_else(|| seq_a.detect_size())
        .unwrap_or(FrameSize::UNSET);
    let count = seq_a.len().min(seq_b.len());
    let count = options.frames.map_or(count, |n| n.min(count));
    info!("Comparing {} frames at {}", count, size);

    let bus = EventBus::new();
    bus.subscribe::<CacheChangedEvent, _>(|e| info!("Cache now holds {} frames", e.cached_frames));

    let mut handler_a = build_handler(seq_a, size, &bus, settings);
    let mut handler_b = build_handler(seq_b, size, &bus, settings);

    if options.cache_ahead {
        let workers = Workers::new(settings.worker_count());
        handler_a.cache_frames_in_background(&workers, 0..count as i32);
        handler_b.cache_frames_in_background(&workers, 0..count as i32);
        if !workers.wait_idle(CACHE_AHEAD_TIMEOUT) {
            warn!("Background caching still running after {}s", CACHE_AHEAD_TIMEOUT.as_secs());
        }
        info!(
            "Cached {} + {} frames",
            handler_a.cache().len(),
            handler_b.cache().len()
        );
    }

    if let Some(dir) = &options.out_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
    }

    let mut reports = Vec::with_capacity(count);
    for index in 0..count as i32 {
        match handler_a.calculate_difference(
            &mut handler_b,
            index,
            options.amplification,
            options.mark_only,
        ) {
            Ok(result) => {
                if let Some(dir) = &options.out_dir {
                    let path = dir.join(format!("diff_{:05}.png", index));
                    result
                        .image
                        .save(&path)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                }
                reports.push(FrameReport {
                    index,
                    info: result.info,
                    stats: Some(result.stats),
                    error: None,
                });
            }
            Err(e) => {
                warn!("Frame {}: {}", index, e);
                reports.push(FrameReport {
                    index,
                    info: Vec::new(),
                    stats: None,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    for (name, handler) in [("A", &handler_a), ("B", &handler_b)] {
        let stats = handler.cache().stats();
        debug!(
            "Sequence {} cache: {} hits, {} misses, hit rate {:.1}%",
            name,
            stats.hits(),
            stats.misses(),
            stats.hit_rate() * 100.0
        );
    }
    debug!("{} handler events emitted", bus.poll().len());
    Ok(reports)
}
