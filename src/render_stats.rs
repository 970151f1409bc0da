//! Pipeline statistics for debugging and performance analysis.
//!
//! Enable with the `render-stats` feature:
//! ```bash
//! cargo test --features render-stats
//! ```
//!
//! Counters are thread-local and cover:
//! - Layer cache hits and misses
//! - Frames rendered and skipped
//! - Draw calls issued and batches skipped
//!
//! Without the feature every function is an inlined no-op and
//! [`get_stats`] returns zeros.

/// Snapshot of accumulated statistics.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StatsSnapshot {
    pub layer_cache_hits: u64,
    pub layer_cache_misses: u64,
    pub frames_rendered: u64,
    pub frames_skipped: u64,
    pub draw_calls: u64,
    pub skipped_batches: u64,
}

impl StatsSnapshot {
    /// Fraction of layer draws served from cache, in percent.
    pub fn layer_hit_rate(&self) -> f64 {
        let total = self.layer_cache_hits + self.layer_cache_misses;
        if total == 0 {
            0.0
        } else {
            self.layer_cache_hits as f64 / total as f64 * 100.0
        }
    }
}

#[cfg(feature = "render-stats")]
mod inner {
    use super::StatsSnapshot;
    use std::cell::RefCell;

    thread_local! {
        static STATS: RefCell<StatsSnapshot> = RefCell::new(StatsSnapshot::default());
    }

    #[inline]
    pub fn record_layer_cache_hit() {
        STATS.with(|s| s.borrow_mut().layer_cache_hits += 1);
    }

    #[inline]
    pub fn record_layer_cache_miss() {
        STATS.with(|s| s.borrow_mut().layer_cache_misses += 1);
    }

    /// Record a submitted UI pass.
    #[inline]
    pub fn record_frame_rendered(draw_calls: u32, skipped_batches: u32) {
        STATS.with(|s| {
            let mut stats = s.borrow_mut();
            stats.frames_rendered += 1;
            stats.draw_calls += draw_calls as u64;
            stats.skipped_batches += skipped_batches as u64;
        });
    }

    /// Record a UI pass skipped because its view was not ready.
    #[inline]
    pub fn record_frame_skipped() {
        STATS.with(|s| s.borrow_mut().frames_skipped += 1);
    }

    pub fn get_stats() -> StatsSnapshot {
        STATS.with(|s| s.borrow().clone())
    }

    /// Reset all counters (for test isolation).
    pub fn reset_stats() {
        STATS.with(|s| *s.borrow_mut() = StatsSnapshot::default());
    }

    /// Log a one-line summary at debug level and reset.
    pub fn log_and_reset() {
        let stats = get_stats();
        log::debug!(
            "[Render Stats] frames rendered={} skipped={} draw_calls={} skipped_batches={} layer hit_rate={:.1}% ({} hits / {} misses)",
            stats.frames_rendered,
            stats.frames_skipped,
            stats.draw_calls,
            stats.skipped_batches,
            stats.layer_hit_rate(),
            stats.layer_cache_hits,
            stats.layer_cache_misses
        );
        reset_stats();
    }
}

#[cfg(feature = "render-stats")]
pub use inner::*;

// No-op implementations when feature is disabled - these get completely inlined away

#[cfg(not(feature = "render-stats"))]
#[inline(always)]
pub fn record_layer_cache_hit() {}

#[cfg(not(feature = "render-stats"))]
#[inline(always)]
pub fn record_layer_cache_miss() {}

#[cfg(not(feature = "render-stats"))]
#[inline(always)]
pub fn record_frame_rendered(_draw_calls: u32, _skipped_batches: u32) {}

#[cfg(not(feature = "render-stats"))]
#[inline(always)]
pub fn record_frame_skipped() {}

#[cfg(not(feature = "render-stats"))]
#[inline(always)]
pub fn get_stats() -> StatsSnapshot {
    StatsSnapshot::default()
}

#[cfg(not(feature = "render-stats"))]
#[inline(always)]
pub fn reset_stats() {}

#[cfg(not(feature = "render-stats"))]
#[inline(always)]
pub fn log_and_reset() {}
