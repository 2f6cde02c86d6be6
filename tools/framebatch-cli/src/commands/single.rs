//! Export a whole range to one file.

use framebatch_common::config::AppConfig;
use framebatch_sequencer::export_single;

use super::{command_backend, export_settings, BatchArgs, ExporterArgs, OutputArgs, RangeArgs};

pub fn run(
    config: &AppConfig,
    range: RangeArgs,
    output: OutputArgs,
    exporter: ExporterArgs,
) -> anyhow::Result<()> {
    let no_batch = BatchArgs {
        step: None,
        overlap: None,
        poll_delay: None,
        cooldown: None,
    };
    let mut settings = export_settings(config, &output, &no_batch)?;
    settings.batch_enabled = false;

    let mut scene = range.scene();
    settings.sync(&mut scene);

    let working_dir = output.working_dir()?;
    let mut backend = command_backend(config, exporter)?;

    let job = export_single(&settings, &mut scene, &working_dir, &mut backend)?;
    println!(
        "Export started: {} (frames {}-{})",
        job.output_path.display(),
        job.frame_start,
        job.frame_end
    );

    Ok(())
}
