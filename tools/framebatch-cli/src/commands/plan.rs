//! Print the chunk plan for a range.

use framebatch_common::config::AppConfig;
use framebatch_planner::prepare_batch;

use super::{export_settings, BatchArgs, OutputArgs, RangeArgs};

pub fn run(
    config: &AppConfig,
    range: RangeArgs,
    output: OutputArgs,
    batch: BatchArgs,
    json: bool,
) -> anyhow::Result<()> {
    let settings = export_settings(config, &output, &batch)?;
    let chunk_plan = prepare_batch(&settings, &range.scene())?;

    if json {
        println!("{}", chunk_plan.to_json()?);
        return Ok(());
    }

    let working_dir = output.working_dir()?;

    println!(
        "Frames {}-{}: {} chunk(s) (step={}, overlap={})",
        chunk_plan.range.start(),
        chunk_plan.range.end(),
        chunk_plan.len(),
        chunk_plan.step,
        chunk_plan.overlap
    );
    for (i, chunk) in chunk_plan.iter().enumerate() {
        let path = settings.chunk_output_path(&working_dir, *chunk);
        println!(
            "  {:>3}. {:>6}-{:<6} {}",
            i + 1,
            chunk.start,
            chunk.end,
            path.display()
        );
    }

    Ok(())
}
