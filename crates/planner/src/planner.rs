//! Frame-step chunk planning.
//!
//! # Algorithm
//!
//! 1. Walk the range in windows of `step` frames starting at `range.start`.
//! 2. **Expand** each window by the overlap on both sides (if enabled).
//! 3. **Clamp** the expanded window to the range; drop it if it empties.
//! 4. Advance by `step` from the *unexpanded* window, so overlap widens
//!    chunk boundaries without changing the cadence.

use framebatch_common::error::{FrameBatchError, FrameBatchResult};
use framebatch_model::frame::{Chunk, ChunkPlan, FrameRange, SceneTimeline};
use framebatch_model::settings::ExportSettings;

/// Partition `range` into chunks of `step` frames.
///
/// The range must span more than one frame and `step` must be at least 1.
/// Adjacent chunks intersect by `2 * overlap_frames` when overlap is enabled,
/// less where clamping at the range edges cuts into them.
pub fn plan(
    range: FrameRange,
    step: i64,
    overlap_enabled: bool,
    overlap_frames: i64,
) -> FrameBatchResult<ChunkPlan> {
    if range.start() >= range.end() {
        return Err(FrameBatchError::invalid_range(range.start(), range.end()));
    }
    if step < 1 {
        return Err(FrameBatchError::invalid_parameter(format!(
            "step must be >= 1 (got {step})"
        )));
    }
    if overlap_enabled && overlap_frames < 0 {
        return Err(FrameBatchError::invalid_parameter(format!(
            "overlap frames must be >= 0 (got {overlap_frames})"
        )));
    }

    let overlap = if overlap_enabled { overlap_frames } else { 0 };

    let mut chunks = Vec::new();

    let mut f = range.start();
    while f <= range.end() {
        let start = f.saturating_sub(overlap).max(range.start());
        let end = f.saturating_add(step - 1).saturating_add(overlap).min(range.end());

        if start <= end {
            chunks.push(Chunk::new(start, end));
        }

        // Stepping past i64::MAX means the range is exhausted.
        match f.checked_add(step) {
            Some(next) => f = next,
            None => break,
        }
    }

    Ok(ChunkPlan::new(range, step, overlap, chunks))
}

/// Plan the batch described by `settings` over the scene range.
///
/// Requires batch export to be enabled in the settings.
pub fn prepare_batch(
    settings: &ExportSettings,
    scene: &SceneTimeline,
) -> FrameBatchResult<ChunkPlan> {
    if !settings.batch_enabled {
        return Err(FrameBatchError::batch("Enable batch export first"));
    }

    let range = scene.range()?;
    let params = &settings.batch;
    let chunk_plan = plan(
        range,
        params.step,
        params.overlap_enabled,
        params.overlap_frames,
    )?;

    tracing::info!(
        chunks = chunk_plan.len(),
        step = chunk_plan.step,
        overlap = chunk_plan.overlap,
        "Prepared {} chunks (step={}, overlap={})",
        chunk_plan.len(),
        chunk_plan.step,
        chunk_plan.overlap
    );

    Ok(chunk_plan)
}
