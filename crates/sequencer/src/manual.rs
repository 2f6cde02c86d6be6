//! Manual per-chunk driver: one export per explicit request.
//!
//! There is no completion inference here. Callers must not request the
//! next chunk before the previous export has finished.

use std::path::Path;

use framebatch_common::error::{FrameBatchError, FrameBatchResult};
use framebatch_model::frame::{Chunk, ChunkPlan, ManualCursor, SceneTimeline};
use framebatch_model::settings::ExportSettings;
use framebatch_planner::prepare_batch;

use crate::backend::{ExportBackend, ExportJob};

/// Result of a manual export request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManualExport {
    /// One chunk was handed to the exporter.
    Exported {
        chunk: Chunk,
        /// Zero-based position of the chunk in the plan.
        index: usize,
        total: usize,
        job: ExportJob,
    },
    /// Every chunk has already been exported.
    Exhausted { total: usize },
}

/// Export `plan[cursor.next_index]` and return the advanced cursor.
///
/// Fire-and-forget: the exporter is invoked exactly once and not awaited.
/// An exhausted cursor is reported as [`ManualExport::Exhausted`] with the
/// cursor unchanged.
pub fn export_next(
    plan: &ChunkPlan,
    cursor: ManualCursor,
    settings: &ExportSettings,
    working_dir: &Path,
    backend: &mut dyn ExportBackend,
) -> FrameBatchResult<(ManualExport, ManualCursor)> {
    if plan.is_empty() {
        return Err(FrameBatchError::batch(
            "No batch chunks prepared. Prepare batch chunks first.",
        ));
    }

    let Some(&chunk) = plan.get(cursor.next_index) else {
        return Ok((ManualExport::Exhausted { total: plan.len() }, cursor));
    };

    let job = ExportJob::new(
        settings.chunk_output_path(working_dir, chunk),
        chunk.start,
        chunk.end,
    );

    tracing::info!(
        chunk = cursor.next_index + 1,
        total = plan.len(),
        "Exporting chunk {}/{}: {} frames {}-{}",
        cursor.next_index + 1,
        plan.len(),
        job.filename(),
        chunk.start,
        chunk.end
    );

    backend.export(&job)?;

    let exported = ManualExport::Exported {
        chunk,
        index: cursor.next_index,
        total: plan.len(),
        job,
    };
    Ok((exported, cursor.advanced()))
}

/// The prepared plan together with its manual cursor.
#[derive(Debug, Clone, Default)]
pub struct ManualBatch {
    plan: Option<ChunkPlan>,
    cursor: ManualCursor,
}

impl ManualBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the plan with a fresh one and rewind the cursor.
    pub fn prepare(
        &mut self,
        settings: &ExportSettings,
        scene: &SceneTimeline,
    ) -> FrameBatchResult<&ChunkPlan> {
        let plan = prepare_batch(settings, scene)?;
        self.cursor.reset();
        Ok(self.plan.insert(plan))
    }

    /// Install an already computed plan and rewind the cursor.
    pub fn set_plan(&mut self, plan: ChunkPlan) {
        self.plan = Some(plan);
        self.cursor.reset();
    }

    pub fn plan(&self) -> Option<&ChunkPlan> {
        self.plan.as_ref()
    }

    pub fn cursor(&self) -> ManualCursor {
        self.cursor
    }

    /// The chunk the next request will export, if any.
    pub fn next_chunk(&self) -> Option<Chunk> {
        self.plan
            .as_ref()
            .and_then(|plan| plan.get(self.cursor.next_index).copied())
    }

    /// `(exported, total)` for display.
    pub fn progress(&self) -> (usize, usize) {
        let total = self.plan.as_ref().map_or(0, ChunkPlan::len);
        (self.cursor.next_index.min(total), total)
    }

    /// Export the next chunk and move the scene playhead to its start.
    pub fn export_next(
        &mut self,
        settings: &ExportSettings,
        scene: &mut SceneTimeline,
        working_dir: &Path,
        backend: &mut dyn ExportBackend,
    ) -> FrameBatchResult<ManualExport> {
        let plan = match &self.plan {
            Some(plan) if settings.batch_enabled && !plan.is_empty() => plan,
            _ => {
                return Err(FrameBatchError::batch(
                    "No batch chunks prepared. Prepare batch chunks first.",
                ))
            }
        };

        if let Some(chunk) = plan.get(self.cursor.next_index) {
            scene.current = chunk.start;
        }

        let (outcome, cursor) = export_next(plan, self.cursor, settings, working_dir, backend)?;
        if let ManualExport::Exhausted { .. } = outcome {
            tracing::info!("All batch chunks have already been exported");
        }
        self.cursor = cursor;
        Ok(outcome)
    }
}
