//! Word Timing Module
//!
//! Produces the per-word start/end table that drives caption animation.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Word Timing                                │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  estimator.rs  - Proportional (character-weighted) estimation   │
//! │  table.rs      - `start|end|word` timing table read/write       │
//! │  WordAligner   - Seam for forced-alignment providers            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Aligners only produce boundaries; color tags are assigned afterwards by
//! the caption classifier, so any aligner can be swapped in without
//! changing the shape of [`WordTiming`].

mod estimator;
mod table;

use async_trait::async_trait;

pub use estimator::{ProportionalTimingEstimator, TimingWeights};
pub use table::{
    format_timing_table, parse_timing_table, write_timing_table, TimingTableAligner,
};

use crate::core::{CoreError, CoreResult, ScriptResult, TimeSec, WordTiming};

/// Tolerance used when comparing computed boundaries
pub const TIMING_EPSILON: f64 = 1e-6;

/// Source of word boundaries for a synthesized voiceover.
#[async_trait]
pub trait WordAligner: Send + Sync {
    /// Returns the aligner name (for logging)
    fn name(&self) -> &str;

    /// Computes one timing entry per word of `script.text`, in order.
    ///
    /// Implementations leave `color_tag` at its default.
    async fn align(&self, script: &ScriptResult) -> CoreResult<Vec<WordTiming>>;
}

/// Checks the invariants every caption renderer relies on.
///
/// Starts must be non-decreasing, the first word must start at zero and the
/// last word must end at `total_audio_seconds`.
pub fn validate_timings(
    timings: &[WordTiming],
    expected_words: usize,
    total_audio_seconds: TimeSec,
) -> CoreResult<()> {
    if timings.len() != expected_words {
        return Err(CoreError::CaptionTimingFailed(format!(
            "Expected {} timed words, got {}",
            expected_words,
            timings.len()
        )));
    }

    let Some(first) = timings.first() else {
        return Err(CoreError::CaptionTimingFailed(
            "Timing table is empty".to_string(),
        ));
    };
    if first.start_seconds.abs() > TIMING_EPSILON {
        return Err(CoreError::CaptionTimingFailed(format!(
            "First word starts at {:.3}s instead of 0",
            first.start_seconds
        )));
    }

    let mut previous_start = 0.0;
    for timing in timings {
        if !timing.start_seconds.is_finite() || !timing.end_seconds.is_finite() {
            return Err(CoreError::CaptionTimingFailed(format!(
                "Non-finite boundary for '{}'",
                timing.word
            )));
        }
        if timing.start_seconds + TIMING_EPSILON < previous_start
            || timing.end_seconds + TIMING_EPSILON < timing.start_seconds
        {
            return Err(CoreError::CaptionTimingFailed(format!(
                "Boundaries out of order at '{}' ({:.3}~{:.3}s)",
                timing.word, timing.start_seconds, timing.end_seconds
            )));
        }
        previous_start = timing.start_seconds;
    }

    let last_end = timings.last().map(|t| t.end_seconds).unwrap_or_default();
    if (last_end - total_audio_seconds).abs() > 1e-3 {
        return Err(CoreError::CaptionTimingFailed(format!(
            "Last word ends at {:.3}s but audio lasts {:.3}s",
            last_end, total_audio_seconds
        )));
    }

    Ok(())
}
