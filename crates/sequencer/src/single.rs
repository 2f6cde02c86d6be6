//! Single export of the whole active range.

use std::path::Path;

use framebatch_common::error::FrameBatchResult;
use framebatch_model::frame::SceneTimeline;
use framebatch_model::settings::ExportSettings;

use crate::backend::{ExportBackend, ExportJob};

/// Export the effective range (scene or custom) to one file.
///
/// With a custom range and `update_frame_range` set, the scene timeline is
/// moved to the custom range first.
pub fn export_single(
    settings: &ExportSettings,
    scene: &mut SceneTimeline,
    working_dir: &Path,
    backend: &mut dyn ExportBackend,
) -> FrameBatchResult<ExportJob> {
    let range = settings.effective_range(scene)?;
    if !settings.use_scene_range && settings.update_frame_range {
        scene.start = range.start();
        scene.end = range.end();
    }

    let job = ExportJob::new(
        settings.single_output_path(working_dir),
        range.start(),
        range.end(),
    );
    backend.export(&job)?;

    tracing::info!(
        output = %job.output_path.display(),
        backend = backend.name(),
        "Exported to {} (frames {}-{})",
        job.output_path.display(),
        job.frame_start,
        job.frame_end
    );
    Ok(job)
}
