//! Interactive manual batch: one chunk per Enter press.

use std::io::{self, BufRead, Write};

use framebatch_common::config::AppConfig;
use framebatch_sequencer::{ManualBatch, ManualExport};

use super::{
    command_backend, export_settings, BatchArgs, ExporterArgs, OutputArgs, PlanSource, RangeArgs,
};

pub fn run(
    config: &AppConfig,
    range: RangeArgs,
    output: OutputArgs,
    batch: BatchArgs,
    source: PlanSource,
    exporter: ExporterArgs,
) -> anyhow::Result<()> {
    let settings = export_settings(config, &output, &batch)?;
    let mut scene = range.scene();
    let working_dir = output.working_dir()?;
    let mut backend = command_backend(config, exporter)?;

    let mut manual = ManualBatch::new();
    manual.set_plan(source.resolve(&settings, &scene)?);
    let (_, total) = manual.progress();
    println!("Prepared {total} chunk(s). Wait for each export to finish before the next.");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    while let Some(chunk) = manual.next_chunk() {
        let (done, _) = manual.progress();
        print!(
            "[{}/{}] Enter to export frames {}-{}, q to quit: ",
            done + 1,
            total,
            chunk.start,
            chunk.end
        );
        io::stdout().flush()?;

        let Some(line) = lines.next().transpose()? else {
            break;
        };
        if line.trim().eq_ignore_ascii_case("q") {
            println!("Stopped at chunk {}/{}", done + 1, total);
            return Ok(());
        }

        match manual.export_next(&settings, &mut scene, &working_dir, &mut backend) {
            Ok(ManualExport::Exported { job, .. }) => {
                println!("  Export started: {}", job.output_path.display());
            }
            Ok(ManualExport::Exhausted { .. }) => break,
            Err(e) => println!("  Export failed: {e}"),
        }
    }

    let (done, total) = manual.progress();
    println!("\n{done}/{total} chunk(s) exported.");
    Ok(())
}
